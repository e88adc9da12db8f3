//! Runtime Trampoline Emitter (spec.md §4.7): built-in method bodies, the
//! three comparison handlers, and the deduplicated per-line error
//! trampolines.

use objlang_core::Label;

use crate::asm::{Instruction, Reg, Target};
use crate::env::Location;
use crate::generator::{Generator, OBJECT_SIZE_INDEX, VTABLE_INDEX, ATTRIBUTES_START_INDEX};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Relation {
    Eq,
    Le,
    Lt,
}

impl Relation {
    fn handler_label(self) -> &'static str {
        match self {
            Relation::Eq => "eq_handler",
            Relation::Le => "le_handler",
            Relation::Lt => "lt_handler",
        }
    }
}

impl<'a> Generator<'a> {
    /// Dispatch an `Internal("Class.method")` body to its hand-written
    /// implementation. Invoked both from `emit_methods` (a class's own
    /// internal method) and directly from `cgen` when an AST node embeds
    /// one (e.g. a default attribute initializer never reaches here, but a
    /// method body explicitly marked internal does).
    pub fn emit_internal_body(&mut self, name: &str) {
        match name {
            "Object.abort" => {
                self.emit(Instruction::La { reg: Reg::Acc, label: Label::named("cool_abort") });
                self.emit(Instruction::Syscall("IO.out_string".into()));
                self.emit(Instruction::Syscall("exit".into()));
            }
            "Object.type_name" => {
                self.cgen_new("String");
                self.emit(Instruction::Ld { dest: Reg::Temp, src: Reg::SelfObj, offset: VTABLE_INDEX });
                self.emit(Instruction::Ld { dest: Reg::Temp, src: Reg::Temp, offset: 0 });
                self.emit(Instruction::St { dest: Reg::Acc, offset: ATTRIBUTES_START_INDEX, src: Reg::Temp });
            }
            "Object.copy" => self.emit_object_copy(),
            "IO.out_int" => {
                self.cgen_identifier_raw("x");
                self.comment("Load unboxed int.");
                self.emit(Instruction::Ld { dest: Reg::Acc, src: Reg::Acc, offset: ATTRIBUTES_START_INDEX });
                self.emit(Instruction::Syscall(name.into()));
            }
            "IO.in_int" => {
                self.cgen_new("Int");
                self.emit(Instruction::Mov { dest: Reg::Temp, src: Reg::Acc });
                self.emit(Instruction::Syscall(name.into()));
                self.emit(Instruction::St { dest: Reg::Temp, offset: ATTRIBUTES_START_INDEX, src: Reg::Acc });
                self.emit(Instruction::Mov { dest: Reg::Acc, src: Reg::Temp });
            }
            "IO.out_string" => {
                self.cgen_identifier_raw("x");
                self.comment("Load unboxed string");
                self.emit(Instruction::Ld { dest: Reg::Acc, src: Reg::Acc, offset: ATTRIBUTES_START_INDEX });
                self.emit(Instruction::Syscall(name.into()));
                self.comment("IO.out_string returns self.");
                self.emit(Instruction::Mov { dest: Reg::Acc, src: Reg::SelfObj });
            }
            "IO.in_string" => {
                self.cgen_new("String");
                self.emit(Instruction::Mov { dest: Reg::Temp, src: Reg::Acc });
                self.emit(Instruction::Syscall(name.into()));
                self.emit(Instruction::St { dest: Reg::Temp, offset: ATTRIBUTES_START_INDEX, src: Reg::Acc });
                self.emit(Instruction::Mov { dest: Reg::Acc, src: Reg::Temp });
            }
            "String.length" => {
                self.cgen_new("Int");
                self.emit(Instruction::Mov { dest: Reg::Temp, src: Reg::Acc });
                self.emit(Instruction::Ld { dest: Reg::Acc, src: Reg::SelfObj, offset: ATTRIBUTES_START_INDEX });
                self.emit(Instruction::Syscall(name.into()));
                self.emit(Instruction::St { dest: Reg::Temp, offset: ATTRIBUTES_START_INDEX, src: Reg::Acc });
                self.emit(Instruction::Mov { dest: Reg::Acc, src: Reg::Temp });
            }
            "String.concat" => {
                self.cgen_new("String");
                self.emit(Instruction::Mov { dest: Reg::Temp2, src: Reg::Acc });
                self.cgen_identifier_raw("s");
                self.emit(Instruction::Ld { dest: Reg::Temp, src: Reg::Acc, offset: ATTRIBUTES_START_INDEX });
                self.emit(Instruction::Ld { dest: Reg::Acc, src: Reg::SelfObj, offset: ATTRIBUTES_START_INDEX });
                self.emit(Instruction::Syscall(name.into()));
                self.emit(Instruction::St { dest: Reg::Temp2, offset: ATTRIBUTES_START_INDEX, src: Reg::Acc });
                self.emit(Instruction::Mov { dest: Reg::Acc, src: Reg::Temp2 });
            }
            "String.substr" => {
                self.cgen_new("String");
                self.emit(Instruction::Mov { dest: Reg::Temp2, src: Reg::Acc });

                self.cgen_identifier_raw("l");
                self.emit(Instruction::Ld { dest: Reg::Temp, src: Reg::Acc, offset: ATTRIBUTES_START_INDEX });

                self.cgen_identifier_raw("i");
                self.emit(Instruction::Ld { dest: Reg::Acc, src: Reg::Acc, offset: ATTRIBUTES_START_INDEX });

                self.emit(Instruction::Ld { dest: Reg::SelfObj, src: Reg::SelfObj, offset: ATTRIBUTES_START_INDEX });
                self.emit(Instruction::Syscall(name.into()));

                let valid_label = self.fresh_label("substr_valid");
                self.emit(Instruction::Bnz { reg: Reg::Acc, label: valid_label.clone() });
                self.emit(Instruction::La { reg: Reg::Acc, label: Label::named("substr_bad") });
                self.emit(Instruction::Syscall("IO.out_string".into()));
                self.emit(Instruction::Syscall("exit".into()));

                self.emit(Instruction::Label(valid_label));
                self.emit(Instruction::St { dest: Reg::Temp2, offset: ATTRIBUTES_START_INDEX, src: Reg::Acc });
                self.emit(Instruction::Mov { dest: Reg::Acc, src: Reg::Temp2 });
            }
            other => unreachable!("unknown internal method body `{other}`"),
        }
    }

    /// A raw identifier lookup against the current scope, used by builtins
    /// that read their own formal parameters by name (`x`, `s`, `l`, `i`).
    fn cgen_identifier_raw(&mut self, name: &str) {
        match self.env.lookup(name) {
            Some(Location::Register(reg)) => self.emit(Instruction::Mov { dest: Reg::Acc, src: reg }),
            Some(Location::Offset(reg, offset)) => {
                self.emit(Instruction::Ld { dest: Reg::Acc, src: reg, offset })
            }
            None => panic!("internal method body references unbound formal `{name}`"),
        }
    }

    fn emit_object_copy(&mut self) {
        let loop_start = self.fresh_label("object_copy_loop_start");
        let loop_end = self.fresh_label("object_copy_loop_end");

        self.emit(Instruction::Ld { dest: Reg::Temp, src: Reg::SelfObj, offset: OBJECT_SIZE_INDEX });
        self.emit(Instruction::Alloc { dest: Reg::Acc, size: Reg::Temp });
        self.emit(Instruction::Push(Reg::Acc));
        self.emit(Instruction::Label(loop_start.clone()));
        self.emit(Instruction::Bz { reg: Reg::Temp, label: loop_end.clone() });
        self.emit(Instruction::Ld { dest: Reg::Temp2, src: Reg::SelfObj, offset: 0 });
        self.emit(Instruction::St { dest: Reg::Acc, offset: 0, src: Reg::Temp2 });

        self.emit(Instruction::Li { reg: Reg::Temp2, imm: 1 });
        self.emit(Instruction::Add { left: Reg::Temp2, right: Reg::SelfObj });
        self.emit(Instruction::Add { left: Reg::Temp2, right: Reg::Acc });

        self.emit(Instruction::Li { reg: Reg::Temp2, imm: 1 });
        self.emit(Instruction::Sub { left: Reg::Temp2, right: Reg::Temp });
        self.emit(Instruction::Jmp(loop_start));

        self.emit(Instruction::Label(loop_end));
        self.emit(Instruction::Pop(Reg::Acc));
    }

    /// Emit the string-constant pool, the deduplicated error trampolines
    /// (sorted by source line, spec.md §5's determinism contract), and the
    /// three comparison handlers, in that order.
    pub fn emit_runtime_tail(&mut self) {
        self.emit_string_constants();

        for line in self.dispatch_void_lines.clone() {
            self.emit_error_trampoline("dispatch_void", line, "dispatch on void");
        }
        for line in self.case_void_lines.clone() {
            self.emit_error_trampoline("case_void", line, "case on void");
        }
        for line in self.case_without_branch_lines.clone() {
            self.emit_error_trampoline("case_without_branch", line, "case without matching branch");
        }
        for line in self.divide_by_zero_lines.clone() {
            self.emit_error_trampoline("divide_by_zero", line, "division by zero");
        }

        for rel in [Relation::Eq, Relation::Le, Relation::Lt] {
            self.emit_comparison_handler(rel);
        }
    }

    fn emit_string_constants(&mut self) {
        self.section_comment("STRING CONSTANTS");
        self.emit(Instruction::Label(Label::named("the.empty.string")));
        self.emit(Instruction::ConstantString(String::new()));

        let entries: Vec<(Label, String)> =
            self.strings.iter().map(|(label, s)| (label, s.to_string())).collect();
        for (label, value) in entries {
            self.emit(Instruction::Label(label));
            self.emit(Instruction::ConstantString(value));
        }
    }

    fn emit_error_trampoline(&mut self, kind: &str, line: u32, description: &str) {
        let message = format!("ERROR: {line}: Exception: {description}\n");
        let message_label = self.strings.insert(&message);
        self.emit(Instruction::Label(Label::named(format!("{kind}_{line}"))));
        self.emit(Instruction::La { reg: Reg::Acc, label: message_label });
        self.emit(Instruction::Syscall("IO.out_string".into()));
        self.emit(Instruction::Syscall("exit".into()));
    }

    fn emit_comparison_handler(&mut self, rel: Relation) {
        self.comparison_prologue(rel);
        self.comparison_bool_arm(rel);
        self.comparison_int_arm(rel);
        self.comparison_string_arm(rel);
        if rel == Relation::Eq {
            self.comparison_identity_arm(rel);
        } else {
            self.comment("no tag matched; well-typed input never reaches this point for </ <=");
            self.emit(Instruction::Jmp(self.false_label(rel)));
        }
        self.comparison_false_arm(rel);
        self.comparison_true_arm(rel);
        self.comparison_epilogue(rel);
    }

    /// Fragment 1: read the three stack arguments (self, right, left, in
    /// that push order) without disturbing the caller's fp/self bracket;
    /// on the VM target popping the args *is* the callee-side cleanup, on
    /// x86 they are read non-destructively since the caller reclaims them.
    fn comparison_prologue(&mut self, rel: Relation) {
        self.emit(Instruction::Label(Label::named(rel.handler_label())));
        if self.target == Target::Vm {
            self.emit(Instruction::Pop(Reg::SelfObj));
            self.emit(Instruction::Pop(Reg::Acc));
            self.emit(Instruction::Pop(Reg::Temp));
            self.comment("save ra across the handler body; call set it, we still need it to return");
            self.emit(Instruction::Push(Reg::Ra));
        } else {
            self.emit(Instruction::Ld { dest: Reg::SelfObj, src: Reg::Sp, offset: 0 });
            self.emit(Instruction::Ld { dest: Reg::Acc, src: Reg::Sp, offset: 1 });
            self.emit(Instruction::Ld { dest: Reg::Temp, src: Reg::Sp, offset: 2 });
        }
        self.comment("temp = left, acc = right, self = receiver arg (pointer-identity fallback)");
        self.emit(Instruction::Ld { dest: Reg::Temp2, src: Reg::Temp, offset: crate::generator::TYPE_TAG_INDEX });
    }

    /// Raw-value arm shared by the Bool and Int tags: if `temp2` (the left
    /// operand's type tag) matches `tag`, unbox both operands from
    /// attribute slot 0 and branch on the relation; otherwise fall through
    /// to the next arm untouched.
    fn comparison_raw_arm(&mut self, rel: Relation, tag: i64, label_tag: &str) {
        let matched = self.fresh_label(&format!("{}_{label_tag}_matched", rel.handler_label()));
        let skip = self.fresh_label(&format!("{}_{label_tag}_skip", rel.handler_label()));
        self.emit(Instruction::Li { reg: Reg::SelfObj, imm: tag });
        self.emit(Instruction::Beq { left: Reg::Temp2, right: Reg::SelfObj, label: matched.clone() });
        self.emit(Instruction::Jmp(skip.clone()));

        self.emit(Instruction::Label(matched));
        self.emit(Instruction::Ld { dest: Reg::Temp, src: Reg::Temp, offset: ATTRIBUTES_START_INDEX });
        self.emit(Instruction::Ld { dest: Reg::Acc, src: Reg::Acc, offset: ATTRIBUTES_START_INDEX });
        match rel {
            Relation::Eq => {
                self.emit(Instruction::Beq { left: Reg::Temp, right: Reg::Acc, label: self.true_label(rel) })
            }
            Relation::Le => {
                self.emit(Instruction::Ble { left: Reg::Temp, right: Reg::Acc, label: self.true_label(rel) })
            }
            Relation::Lt => {
                self.emit(Instruction::Blt { left: Reg::Temp, right: Reg::Acc, label: self.true_label(rel) })
            }
        }
        self.emit(Instruction::Jmp(self.false_label(rel)));

        self.emit(Instruction::Label(skip));
    }

    fn comparison_bool_arm(&mut self, rel: Relation) {
        self.comparison_raw_arm(rel, bool_tag(), "bool");
    }

    fn comparison_int_arm(&mut self, rel: Relation) {
        self.comparison_raw_arm(rel, int_tag(), "int");
    }

    fn comparison_string_arm(&mut self, rel: Relation) {
        let matched = self.fresh_label(&format!("{}_string_matched", rel.handler_label()));
        let skip = self.fresh_label(&format!("{}_string_skip", rel.handler_label()));
        self.emit(Instruction::Li { reg: Reg::SelfObj, imm: string_tag() });
        self.emit(Instruction::Beq { left: Reg::Temp2, right: Reg::SelfObj, label: matched.clone() });
        self.emit(Instruction::Jmp(skip.clone()));

        self.emit(Instruction::Label(matched));
        self.comment("delegate to the runtime string-compare service");
        self.emit(Instruction::Ld { dest: Reg::Temp, src: Reg::Temp, offset: ATTRIBUTES_START_INDEX });
        self.emit(Instruction::Ld { dest: Reg::Acc, src: Reg::Acc, offset: ATTRIBUTES_START_INDEX });
        self.emit(Instruction::Syscall(format!("string_compare_{}", rel.handler_label())));
        self.emit(Instruction::Bnz { reg: Reg::Acc, label: self.true_label(rel) });
        self.emit(Instruction::Jmp(self.false_label(rel)));

        self.emit(Instruction::Label(skip));
    }

    /// `eq` alone falls back to pointer identity for any tag other than
    /// Int/Bool/String (spec.md §4.7).
    fn comparison_identity_arm(&mut self, rel: Relation) {
        self.comment("eq fallback: any other tag compares by pointer identity");
        self.emit(Instruction::Beq { left: Reg::Temp, right: Reg::Acc, label: self.true_label(rel) });
        self.emit(Instruction::Jmp(self.false_label(rel)));
    }

    fn comparison_false_arm(&mut self, rel: Relation) {
        self.emit(Instruction::Label(self.false_label(rel)));
        self.cgen_new("Bool");
        self.emit(Instruction::Jmp(self.result_label(rel)));
    }

    fn comparison_true_arm(&mut self, rel: Relation) {
        self.emit(Instruction::Label(self.true_label(rel)));
        self.cgen_new("Bool");
        self.emit(Instruction::Li { reg: Reg::SelfObj, imm: 1 });
        self.emit(Instruction::St { dest: Reg::Acc, offset: ATTRIBUTES_START_INDEX, src: Reg::SelfObj });
    }

    fn comparison_epilogue(&mut self, rel: Relation) {
        self.emit(Instruction::Label(self.result_label(rel)));
        if self.target == Target::Vm {
            self.comment("restore ra before returning to the dispatch call site");
            self.emit(Instruction::Pop(Reg::Ra));
            self.emit(Instruction::Li { reg: Reg::SelfObj, imm: 3 });
            self.emit(Instruction::Add { left: Reg::SelfObj, right: Reg::Sp });
        }
        self.emit(Instruction::Return);
    }

    fn true_label(&self, rel: Relation) -> Label {
        Label::named(format!("{}_true", rel.handler_label()))
    }
    fn false_label(&self, rel: Relation) -> Label {
        Label::named(format!("{}_false", rel.handler_label()))
    }
    fn result_label(&self, rel: Relation) -> Label {
        Label::named(format!("{}_result", rel.handler_label()))
    }
}

fn bool_tag() -> i64 {
    3
}
fn int_tag() -> i64 {
    1
}
fn string_tag() -> i64 {
    2
}
