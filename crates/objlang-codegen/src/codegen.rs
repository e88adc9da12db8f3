//! Expression Code Generator (spec.md §4.6) plus method emission and the
//! per-method prologue/epilogue that differs between VM-asm and x86-asm
//! calling conventions.

use objlang_core::Label;

use crate::ast::{ArithOp, CompareOp, Dispatch, Expr, MethodBody, Spanned};
use crate::asm::{Instruction, Reg, Target};
use crate::env::Location;
use crate::generator::{Generator, ATTRIBUTES_START_INDEX, VTABLE_INDEX};
use crate::layout::{constructor_label, method_label};

impl<'a> Generator<'a> {
    pub fn emit_methods(&mut self) {
        self.section_comment("METHODS");

        let entries: Vec<((String, String), usize, crate::ast::MethodImpl)> = self
            .impl_map
            .iter()
            .map(|((c, m), imp)| ((c.clone(), m.clone()), imp.formals.len(), imp.clone()))
            .collect();

        for ((class, method), num_args, imp) in entries {
            self.current_class = Some(class.clone());
            self.emit(Instruction::Label(method_label(&class, &method)));

            let body = match &imp.body {
                MethodBody::Expr(e) => Some(e.clone()),
                MethodBody::Internal(name) => {
                    self.emit_function_prologue(0);
                    self.env.push_scope();
                    self.install_attribute_scope(&class);
                    self.install_formal_scope(&class, &imp.formals, num_args);
                    self.emit_internal_body(name);
                    self.env.pop_scope();
                    self.emit_function_epilogue(num_args as i32);
                    continue;
                }
            };
            let body = body.expect("non-internal method must carry an expression body");

            self.temporaries_needed = compute_max_stack_depth(&body.node);
            self.emit_function_prologue(self.temporaries_needed);

            self.env.push_scope();
            self.install_attribute_scope(&class);
            self.install_formal_scope(&class, &imp.formals, num_args);

            self.comment("start code-genning method body");
            self.cgen(&body);
            self.comment("done code-genning method body");

            self.env.pop_scope();
            self.emit_function_epilogue(num_args as i32);
        }
    }

    fn install_attribute_scope(&mut self, class: &str) {
        let attrs = self.class_map.get(class).cloned().unwrap_or_default();
        for (i, attr) in attrs.iter().enumerate() {
            let offset = ATTRIBUTES_START_INDEX + i as i32;
            if i == 0 {
                self.comment("Setting up addresses for attributes (based off offsets from self reg)");
            }
            self.comment(format!("Setting up attribute, it lives in self[{offset}]"));
            self.env.insert(&attr.name, Location::Offset(Reg::SelfObj, offset));
        }
    }

    fn install_formal_scope(&mut self, _class: &str, formals: &[String], num_args: usize) {
        for (i, formal) in formals.iter().enumerate() {
            let index = i + 1;
            if i == 0 {
                self.comment("Getting args.");
            }
            let fp_offset = if self.target == Target::X86 {
                num_args as i32 - index as i32 + 1 + 1 + 1
            } else {
                num_args as i32 - index as i32 + 1 + 1
            };
            self.comment(format!("Add argument {formal} to symbol table, it lives in fp[{fp_offset}]"));
            self.env.insert(formal, Location::Offset(Reg::Fp, fp_offset));
        }
    }

    fn emit_function_prologue(&mut self, temporaries_needed: i32) {
        if self.target == Target::Vm {
            self.comment("FUNCTION START");
            self.emit(Instruction::Mov { dest: Reg::Fp, src: Reg::Sp });
            self.comment("Presumably, caller has pushed arguments, then receiver object, on stack.");
            self.comment("Load receiver object into self (receiver object is on top of stack).");
            self.emit(Instruction::Pop(Reg::SelfObj));

            self.emit(Instruction::Comment { text: "Stack room for temporaries".into(), top_level: false });
            self.emit(Instruction::Li { reg: Reg::Temp, imm: temporaries_needed as i64 + 1 });
            self.emit(Instruction::Sub { left: Reg::Temp, right: Reg::Sp });

            self.emit(Instruction::Push(Reg::Ra));
        } else {
            self.comment("x86: return address must sit below this frame pointer");
            self.emit(Instruction::Push(Reg::Fp));
            self.emit(Instruction::Mov { dest: Reg::Fp, src: Reg::Sp });
            self.emit(Instruction::Ld { dest: Reg::SelfObj, src: Reg::Sp, offset: 2 });

            self.comment("Temporaries");
            self.emit(Instruction::Li { reg: Reg::Temp, imm: temporaries_needed as i64 });
            self.emit(Instruction::Sub { left: Reg::Temp, right: Reg::Sp });
        }
    }

    fn emit_function_epilogue(&mut self, num_args: i32) {
        self.comment("FUNCTION CLEANUP");
        if self.target == Target::Vm {
            self.emit(Instruction::Pop(Reg::Ra));
            self.emit(Instruction::Li { reg: Reg::Temp, imm: (num_args + self.temporaries_needed + 1) as i64 });
            self.emit(Instruction::Add { left: Reg::Temp, right: Reg::Sp });
            self.emit(Instruction::Return);
        } else {
            self.emit(Instruction::Mov { dest: Reg::Sp, src: Reg::Fp });
            self.emit(Instruction::Pop(Reg::Fp));
            self.emit(Instruction::Return);
        }
        self.temporary_index = 0;
    }

    /// Construct a fresh instance of `type_name`, leaving it in the
    /// accumulator (the shared tail of every `New` site).
    pub fn cgen_new(&mut self, type_name: &str) {
        self.emit(Instruction::Push(Reg::Fp));
        self.emit(Instruction::Push(Reg::SelfObj));
        self.emit(Instruction::CallLabel(constructor_label(type_name)));
        self.emit(Instruction::Pop(Reg::SelfObj));
        self.emit(Instruction::Pop(Reg::Fp));
    }

    /// Code-generate `expr`, leaving its value in the accumulator and the
    /// stack pointer unchanged (spec.md §4.6's blanket post-condition).
    pub fn cgen(&mut self, expr: &Spanned<Expr>) {
        match &expr.node {
            Expr::IntLiteral { value } => {
                self.cgen_new("Int");
                self.comment(format!("put {value} in the first attribute for a boxed Int"));
                self.emit(Instruction::Li { reg: Reg::Temp, imm: *value });
                self.emit(Instruction::St { dest: Reg::Acc, offset: ATTRIBUTES_START_INDEX, src: Reg::Temp });
            }
            Expr::StringLiteral { value } => {
                self.cgen_new("String");
                let label = self.strings.insert(value);
                self.comment(format!("\"{value}\" points to label {label}"));
                self.emit(Instruction::La { reg: Reg::Temp, label });
                self.emit(Instruction::St { dest: Reg::Acc, offset: ATTRIBUTES_START_INDEX, src: Reg::Temp });
            }
            Expr::BoolLiteral { value } => {
                self.cgen_new("Bool");
                if *value {
                    self.emit(Instruction::Li { reg: Reg::Temp, imm: 1 });
                    self.emit(Instruction::St { dest: Reg::Acc, offset: ATTRIBUTES_START_INDEX, src: Reg::Temp });
                }
            }
            Expr::Identifier { name } => self.cgen_identifier(name),
            Expr::Assign { name, value } => {
                self.cgen(value);
                match self.env.lookup(name) {
                    Some(Location::Offset(reg, offset)) => {
                        self.emit(Instruction::St { dest: reg, offset, src: Reg::Acc });
                    }
                    Some(Location::Register(reg)) => {
                        self.emit(Instruction::Mov { dest: reg, src: Reg::Acc });
                    }
                    None => panic!("assignment to undeclared identifier `{name}`"),
                }
            }
            Expr::New { type_name } => self.cgen_new(type_name),
            Expr::IsVoid { expr } => self.cgen_isvoid(expr),
            Expr::Arith { op, left, right } => self.cgen_arith(*op, left, right),
            Expr::Compare { op, left, right } => self.cgen_compare(*op, left, right),
            Expr::Not { expr } => {
                self.cgen(expr);
                self.emit(Instruction::Ld { dest: Reg::Temp, src: Reg::Acc, offset: ATTRIBUTES_START_INDEX });
                self.emit(Instruction::Li { reg: Reg::Temp2, imm: 1 });
                self.emit(Instruction::Sub { left: Reg::Temp, right: Reg::Temp2 });
                self.cgen_new("Bool");
                self.emit(Instruction::St { dest: Reg::Acc, offset: ATTRIBUTES_START_INDEX, src: Reg::Temp2 });
            }
            Expr::Negate { expr } => {
                self.cgen(expr);
                self.emit(Instruction::Ld { dest: Reg::Temp, src: Reg::Acc, offset: ATTRIBUTES_START_INDEX });
                self.emit(Instruction::Li { reg: Reg::Temp2, imm: -1 });
                self.emit(Instruction::Mul { left: Reg::Temp2, right: Reg::Temp });
                self.cgen_new("Int");
                self.emit(Instruction::St { dest: Reg::Acc, offset: ATTRIBUTES_START_INDEX, src: Reg::Temp });
            }
            Expr::If { predicate, then_branch, else_branch } => {
                self.cgen_if(predicate, then_branch, else_branch)
            }
            Expr::While { predicate, body } => self.cgen_while(predicate, body),
            Expr::Block { body } => {
                for e in body {
                    self.cgen(e);
                }
            }
            Expr::Let { bindings, body } => self.cgen_let(bindings, body),
            Expr::Dispatch(dispatch) => self.cgen_dispatch(dispatch, expr.line),
            Expr::Case { discriminant, branches } => self.cgen_case(discriminant, branches, expr.line),
            Expr::Internal { name } => self.emit_internal_body(name),
        }
    }

    fn cgen_identifier(&mut self, name: &str) {
        match self.env.lookup(name) {
            Some(Location::Register(reg)) => {
                self.comment(format!("Found variable {name} in register {reg}"));
                self.emit(Instruction::Mov { dest: Reg::Acc, src: reg });
            }
            Some(Location::Offset(reg, offset)) => {
                self.comment(format!("Found variable {name} in register {reg} at offset {offset}"));
                self.emit(Instruction::Ld { dest: Reg::Acc, src: reg, offset });
            }
            None => panic!("could not find identifier `{name}`"),
        }
    }

    fn cgen_isvoid(&mut self, inner: &Spanned<Expr>) {
        let true_branch = self.fresh_label("isvoid_true_branch");
        let end_branch = self.fresh_label("isvoid_end_branch");

        self.cgen(inner);
        self.emit(Instruction::Bz { reg: Reg::Acc, label: true_branch.clone() });
        self.cgen_new("Bool");
        self.emit(Instruction::Jmp(end_branch.clone()));

        self.emit(Instruction::Label(true_branch));
        self.cgen_new("Bool");
        self.emit(Instruction::Li { reg: Reg::Temp, imm: 1 });
        self.emit(Instruction::St { dest: Reg::Acc, offset: ATTRIBUTES_START_INDEX, src: Reg::Temp });

        self.emit(Instruction::Label(end_branch));
    }

    fn cgen_arith(&mut self, op: ArithOp, left: &Spanned<Expr>, right: &Spanned<Expr>) {
        self.cgen(left);
        self.emit(Instruction::Push(Reg::Acc));

        let is_literal_zero_divide =
            op == ArithOp::Div && matches!(right.node, Expr::IntLiteral { value: 0 });
        if is_literal_zero_divide {
            self.divide_by_zero_lines.insert(right.line);
        }

        self.cgen(right);
        self.emit(Instruction::Pop(Reg::Temp));

        self.comment("Load unboxed integers.");
        self.emit(Instruction::Ld { dest: Reg::Acc, src: Reg::Acc, offset: ATTRIBUTES_START_INDEX });
        self.emit(Instruction::Ld { dest: Reg::Temp, src: Reg::Temp, offset: ATTRIBUTES_START_INDEX });

        if is_literal_zero_divide {
            self.emit(Instruction::Bz {
                reg: Reg::Acc,
                label: Label::named(format!("divide_by_zero_{}", right.line)),
            });
        }

        // Acc holds the right operand, Temp the left. `Sub`/`Div` render as
        // `right <- right OP left`, so the dividend/minuend must sit in
        // `right` to land `left - right` (not `right - left`) in the result.
        let result = match op {
            ArithOp::Add => {
                self.emit(Instruction::Add { left: Reg::Temp, right: Reg::Acc });
                Reg::Acc
            }
            ArithOp::Sub => {
                self.emit(Instruction::Sub { left: Reg::Acc, right: Reg::Temp });
                Reg::Temp
            }
            ArithOp::Mul => {
                self.emit(Instruction::Mul { left: Reg::Temp, right: Reg::Acc });
                Reg::Acc
            }
            ArithOp::Div => {
                self.emit(Instruction::Div { left: Reg::Acc, right: Reg::Temp });
                Reg::Temp
            }
        };

        self.emit(Instruction::Push(result));
        self.cgen_new("Int");
        self.emit(Instruction::Pop(Reg::Temp));
        self.emit(Instruction::St { dest: Reg::Acc, offset: ATTRIBUTES_START_INDEX, src: Reg::Temp });
    }

    fn cgen_compare(&mut self, op: CompareOp, left: &Spanned<Expr>, right: &Spanned<Expr>) {
        self.emit(Instruction::Push(Reg::SelfObj));
        self.emit(Instruction::Push(Reg::Fp));

        self.cgen(left);
        self.emit(Instruction::Push(Reg::Acc));
        self.cgen(right);
        self.emit(Instruction::Push(Reg::Acc));
        self.emit(Instruction::Push(Reg::SelfObj));

        let handler = match op {
            CompareOp::Lt => "lt_handler",
            CompareOp::Le => "le_handler",
            CompareOp::Eq => "eq_handler",
        };
        self.emit(Instruction::CallLabel(Label::named(handler)));

        if self.target == Target::X86 {
            self.comment("x86: deallocate two args and self.");
            self.emit(Instruction::Li { reg: Reg::Temp, imm: 3 });
            self.emit(Instruction::Add { left: Reg::Temp, right: Reg::Sp });
        }
        self.emit(Instruction::Pop(Reg::Fp));
        self.emit(Instruction::Pop(Reg::SelfObj));
    }

    fn cgen_if(&mut self, predicate: &Spanned<Expr>, then_branch: &Spanned<Expr>, else_branch: &Spanned<Expr>) {
        let then_label = self.fresh_label("true_branch");
        let else_label = self.fresh_label("false_branch");
        let end_label = self.fresh_label("end_branch");

        self.cgen(predicate);
        self.emit(Instruction::Ld { dest: Reg::Acc, src: Reg::Acc, offset: ATTRIBUTES_START_INDEX });
        self.emit(Instruction::Bnz { reg: Reg::Acc, label: then_label.clone() });

        self.section_comment("ELSE (False branch)");
        self.emit(Instruction::Label(else_label));
        self.cgen(else_branch);
        self.emit(Instruction::Jmp(end_label.clone()));

        self.section_comment("THEN (True branch)");
        self.emit(Instruction::Label(then_label));
        self.cgen(then_branch);

        self.section_comment("END of if conditional");
        self.emit(Instruction::Label(end_label));
    }

    fn cgen_while(&mut self, predicate: &Spanned<Expr>, body: &Spanned<Expr>) {
        let cond_label = self.fresh_label("while_predicate");
        let end_label = self.fresh_label("end_while");

        self.section_comment("WHILE (conditional)");
        self.emit(Instruction::Label(cond_label.clone()));
        self.cgen(predicate);
        self.emit(Instruction::Ld { dest: Reg::Acc, src: Reg::Acc, offset: ATTRIBUTES_START_INDEX });
        self.emit(Instruction::Bz { reg: Reg::Acc, label: end_label.clone() });

        self.section_comment("WHILE (body)");
        self.cgen(body);
        self.emit(Instruction::Jmp(cond_label));

        self.section_comment("WHILE (end)");
        self.emit(Instruction::Label(end_label));

        // Source-language semantics say `while` yields void; clear the
        // accumulator instead of leaving the final predicate value in it
        // (SPEC_FULL.md §11).
        self.cgen_new("Bool");
    }

    fn cgen_let(&mut self, bindings: &[crate::ast::LetBinding], body: &Spanned<Expr>) {
        self.env.push_scope();
        self.comment("Code generating let bindings.");
        for binding in bindings {
            match &binding.init {
                Some(init) => self.cgen(init),
                None => self.cgen_new(&binding.declared_type),
            }
            self.comment(format!("Storing default value for {} as offset from frame pointer.", binding.declared_type));
            let offset = self.temporary_index;
            self.emit(Instruction::St { dest: Reg::Fp, offset, src: Reg::Acc });
            self.env.insert(&binding.name, Location::Offset(Reg::Fp, offset));
            self.temporary_index -= 1;
        }
        self.comment("Code generating let body.");
        self.cgen(body);
        self.temporary_index = 0;
        self.env.pop_scope();
    }
}

/// Structural recursion computing the exact maximum number of concurrently
/// live temporaries a method body can require (SPEC_FULL.md §11 implements
/// the real algorithm rather than the conservative constant).
pub fn compute_max_stack_depth(expr: &Expr) -> i32 {
    match expr {
        Expr::Block { body } => body.iter().map(|e| compute_max_stack_depth(&e.node)).max().unwrap_or(0),
        Expr::Let { bindings, body } => bindings.len() as i32 + compute_max_stack_depth(&body.node),
        Expr::If { then_branch, else_branch, .. } => {
            compute_max_stack_depth(&then_branch.node).max(compute_max_stack_depth(&else_branch.node))
        }
        Expr::While { body, .. } => compute_max_stack_depth(&body.node),
        Expr::Case { branches, .. } => {
            1 + branches.iter().map(|b| compute_max_stack_depth(&b.body.node)).max().unwrap_or(0)
        }
        Expr::Assign { value, .. } => compute_max_stack_depth(&value.node),
        Expr::IsVoid { expr } | Expr::Not { expr } | Expr::Negate { expr } => compute_max_stack_depth(&expr.node),
        Expr::Arith { left, right, .. } | Expr::Compare { left, right, .. } => {
            compute_max_stack_depth(&left.node).max(compute_max_stack_depth(&right.node))
        }
        _ => 0,
    }
}

#[cfg(test)]
#[path = "codegen_tests.rs"]
mod codegen_tests;
