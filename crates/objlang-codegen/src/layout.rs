//! Object/VTable Layout Engine (spec.md §4.5).

use objlang_core::Label;

use crate::ast::{Attribute, MethodBody};
use crate::asm::{Instruction, Reg, Target};
use crate::generator::{
    Generator, ATTRIBUTES_START_INDEX, OBJECT_SIZE_INDEX, TYPE_TAG_INDEX, VTABLE_INDEX,
};

const RESERVED_TAGS: [&str; 6] = ["Object", "Int", "String", "Bool", "IO", "Main"];

impl<'a> Generator<'a> {
    /// Vtable-compatible dispatch depends on an inherited or overridden
    /// method keeping its ancestor's slot index, so classes must be walked
    /// parent-before-child: a subclass's slot assignment consults its
    /// parent's already-built table.
    pub fn emit_vtables(&mut self) {
        self.section_comment("VIRTUAL TABLES");

        let classes = self.classes_parent_first();
        for class in &classes {
            self.emit(Instruction::Label(vtable_label(class)));

            let name_label = self.strings.insert(class);
            self.emit(Instruction::ConstantLabel(name_label));

            self.emit(Instruction::ConstantLabel(constructor_label(class)));
            self.methods.insert(class, "new");

            let parent = self.parent_of(class).map(str::to_string);

            for ((owner, method_name), imp) in self.impl_map.iter() {
                if owner != class {
                    continue;
                }
                let builtin_method = match &imp.body {
                    MethodBody::Internal(target_name) => {
                        self.emit(Instruction::ConstantLabel(Label::named(target_name.clone())));
                        target_name.split('.').nth(1).unwrap_or(method_name).to_string()
                    }
                    MethodBody::Expr(_) => {
                        self.emit(Instruction::ConstantLabel(method_label(owner, method_name)));
                        method_name.clone()
                    }
                };

                let inherited_slot =
                    parent.as_deref().and_then(|p| self.methods.lookup(p, &builtin_method));
                match inherited_slot {
                    Some(slot) => self.methods.insert_at(owner, &builtin_method, slot),
                    None => {
                        self.methods.insert(owner, &builtin_method);
                    }
                }
            }

            self.methods.reset_cursor(class);
        }
    }

    /// Stable-sort `class_map`'s classes so every class appears after its
    /// direct parent (if any); classes with no recorded parent (or whose
    /// parent isn't itself a declared class) are treated as roots.
    fn classes_parent_first(&self) -> Vec<String> {
        let classes: Vec<String> = self.class_map.keys().cloned().collect();
        let total = classes.len() as u32;
        let depth = |class: &str| -> u32 {
            let mut d = 0;
            let mut current = class.to_string();
            while let Some(parent) = self.parent_of(&current) {
                if !self.class_map.contains_key(parent) {
                    break;
                }
                current = parent.to_string();
                d += 1;
                if d > total {
                    break; // malformed parent cycle; stop rather than loop forever
                }
            }
            d
        };
        let mut ordered = classes;
        ordered.sort_by_key(|c| depth(c));
        ordered
    }

    pub fn emit_constructors(&mut self) {
        self.section_comment("CONSTRUCTORS");
        self.section_comment("object will be in accumulator.");

        let classes: Vec<(String, Vec<Attribute>)> =
            self.class_map.iter().map(|(c, a)| (c.clone(), a.clone())).collect();

        for (class, attrs) in &classes {
            self.emit(Instruction::Label(constructor_label(class)));

            if self.target == Target::X86 {
                self.emit(Instruction::Push(Reg::Fp));
            }
            self.emit(Instruction::Mov { dest: Reg::Fp, src: Reg::Sp });
            if self.target == Target::Vm {
                self.emit(Instruction::Push(Reg::Ra));
            }

            if self.target == Target::X86 {
                self.comment("stack offset for 16 byte alignment");
                self.emit(Instruction::Li { reg: Reg::Temp, imm: 1 });
                self.emit(Instruction::Sub { left: Reg::Temp, right: Reg::Sp });
            }

            let size = attrs.len() as i64 + 3;
            self.comment(format!("allocating {size} words of memory for object layout for class {class}."));
            self.emit(Instruction::Li { reg: Reg::SelfObj, imm: size });
            self.emit(Instruction::Alloc { dest: Reg::SelfObj, size: Reg::SelfObj });

            let tag = if RESERVED_TAGS.contains(&class.as_str()) {
                self.tags.get(class)
            } else {
                self.tags.insert(class)
            };

            self.comment(format!("Store type tag ({tag} for {class}) at index {TYPE_TAG_INDEX}"));
            self.emit(Instruction::Li { reg: Reg::Temp, imm: tag as i64 });
            self.emit(Instruction::St { dest: Reg::SelfObj, offset: TYPE_TAG_INDEX, src: Reg::Temp });

            self.comment(format!("Store object size at index {OBJECT_SIZE_INDEX}"));
            self.emit(Instruction::Li { reg: Reg::Temp, imm: size });
            self.emit(Instruction::St { dest: Reg::SelfObj, offset: OBJECT_SIZE_INDEX, src: Reg::Temp });

            self.comment(format!("Store vtable pointer at index {VTABLE_INDEX}"));
            self.emit(Instruction::La { reg: Reg::Temp, label: vtable_label(class) });
            self.emit(Instruction::St { dest: Reg::SelfObj, offset: VTABLE_INDEX, src: Reg::Temp });

            for (i, attr) in attrs.iter().enumerate() {
                let offset = ATTRIBUTES_START_INDEX + i as i32;
                match (&attr.initializer, attr.type_name.as_str()) {
                    (None, "Unboxed_Int") => {
                        self.comment(format!("Store raw int 0 for attribute in {class}."));
                        self.emit(Instruction::Li { reg: Reg::Acc, imm: 0 });
                    }
                    (None, "Unboxed_String") => {
                        self.comment("Store raw string for attribute in String.");
                        self.emit(Instruction::La { reg: Reg::Acc, label: Label::named("the.empty.string") });
                    }
                    (None, ty) => {
                        self.cgen_new(ty);
                    }
                    (Some(init), _) => {
                        self.cgen(init);
                    }
                }
                self.emit(Instruction::St { dest: Reg::SelfObj, offset, src: Reg::Acc });
            }

            self.emit(Instruction::Mov { dest: Reg::Acc, src: Reg::SelfObj });

            self.comment("cleanup stuff");
            if self.target == Target::X86 {
                self.emit(Instruction::Mov { dest: Reg::Sp, src: Reg::Fp });
                self.emit(Instruction::Pop(Reg::Fp));
            } else {
                self.emit(Instruction::Pop(Reg::Ra));
            }
            self.emit(Instruction::Return);
        }
    }
}

pub fn vtable_label(class: &str) -> Label {
    Label::named(format!("{class}..vtable"))
}

pub fn constructor_label(class: &str) -> Label {
    Label::named(format!("{class}..new"))
}

pub fn method_label(class: &str, method: &str) -> Label {
    Label::named(format!("{class}.{method}"))
}
