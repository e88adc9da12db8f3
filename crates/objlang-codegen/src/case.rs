//! Case discrimination (spec.md §4.6.2), including the full ancestor-chain
//! subtype-routing walk (SPEC_FULL.md §11, resolving spec.md's Open
//! Question in favor of the fully correct multi-level walk).

use std::collections::HashMap;

use objlang_core::Label;

use crate::ast::{CaseBranch, Line, Spanned, Expr};
use crate::asm::{Instruction, Reg};
use crate::env::Location;
use crate::generator::{Generator, TYPE_TAG_INDEX};

impl<'a> Generator<'a> {
    pub fn cgen_case(&mut self, discriminant: &Spanned<Expr>, branches: &[CaseBranch], site_line: Line) {
        self.case_void_lines.insert(site_line);

        self.cgen(discriminant);
        self.emit(Instruction::St { dest: Reg::Fp, offset: 0, src: Reg::Acc });
        self.emit(Instruction::Bz { reg: Reg::Acc, label: Label::named(format!("case_void_{site_line}")) });
        self.emit(Instruction::Ld { dest: Reg::Acc, src: Reg::Fp, offset: TYPE_TAG_INDEX });

        let mut branch_labels: HashMap<String, Label> = HashMap::new();
        for branch in branches {
            let tag = self.tags.get(&branch.type_name);
            let label = self.fresh_label(&format!("case_exp_for_{}", branch.type_name));
            branch_labels.insert(branch.type_name.clone(), label.clone());
            self.emit(Instruction::Li { reg: Reg::Temp, imm: tag as i64 });
            self.emit(Instruction::Beq { left: Reg::Acc, right: Reg::Temp, label });
        }

        let classes: Vec<String> = self.class_map.keys().cloned().collect();
        for class in &classes {
            if branch_labels.contains_key(class) {
                continue;
            }
            if let Some(ancestor) = self.closest_listed_ancestor(class, |c| branch_labels.contains_key(c)) {
                let label = branch_labels[&ancestor].clone();
                let tag = self.tags.get(class);
                self.emit(Instruction::Li { reg: Reg::Temp, imm: tag as i64 });
                self.emit(Instruction::Beq { left: Reg::Acc, right: Reg::Temp, label });
            }
        }

        self.case_without_branch_lines.insert(site_line);
        let fallthrough_label = Label::named(format!("case_without_branch_{site_line}"));
        for class in &classes {
            let routed = branch_labels.contains_key(class)
                || self.closest_listed_ancestor(class, |c| branch_labels.contains_key(c)).is_some();
            if routed {
                continue;
            }
            let tag = self.tags.get(class);
            self.emit(Instruction::Li { reg: Reg::Temp, imm: tag as i64 });
            self.emit(Instruction::Beq { left: Reg::Acc, right: Reg::Temp, label: fallthrough_label.clone() });
        }
        self.emit(Instruction::Jmp(fallthrough_label));

        let end_label = self.fresh_label("case_exp_end");
        for branch in branches {
            let label = branch_labels[&branch.type_name].clone();
            self.emit(Instruction::Label(label));
            self.env.push_scope();
            self.env.insert(&branch.var_name, Location::Offset(Reg::Fp, 0));
            self.cgen(&branch.body);
            self.env.pop_scope();
            self.emit(Instruction::Jmp(end_label.clone()));
        }

        self.emit(Instruction::Label(end_label));
    }
}
