//! Dispatch sequence shared by dynamic, static, and self dispatch
//! (spec.md §4.6.1).

use objlang_core::Label;

use crate::ast::{Dispatch, Line};
use crate::asm::{Instruction, Reg, Target};
use crate::generator::{Generator, VTABLE_INDEX};
use crate::layout::vtable_label;

impl<'a> Generator<'a> {
    pub fn cgen_dispatch(&mut self, dispatch: &Dispatch, site_line: Line) {
        self.debug(Reg::Sp);
        self.emit(Instruction::Push(Reg::Fp));
        self.emit(Instruction::Push(Reg::SelfObj));

        let (receiver, static_type, method, args) = match dispatch {
            Dispatch::Dynamic { receiver, static_type, method, args } => {
                (Some(receiver.as_ref()), Some(static_type.clone()), method, args)
            }
            Dispatch::Static { receiver, target_type, method, args } => {
                (Some(receiver.as_ref()), Some(target_type.clone()), method, args)
            }
            Dispatch::SelfDispatch { method, args } => (None, None, method, args),
        };

        for arg in args {
            self.cgen(arg);
            self.comment("Push argument on the stack.");
            self.emit(Instruction::Push(Reg::Acc));
        }

        match receiver {
            Some(receiver_expr) => {
                self.cgen(receiver_expr);
                let non_void_label = self.fresh_label("non_void");
                self.emit(Instruction::Bnz { reg: Reg::Acc, label: non_void_label.clone() });
                self.dispatch_void_lines.insert(site_line);
                self.emit(Instruction::Jmp(Label::named(format!("dispatch_void_{site_line}"))));
                self.emit(Instruction::Label(non_void_label));
            }
            None => {
                self.comment("Move receiver to accumulator.");
                self.emit(Instruction::Mov { dest: Reg::Acc, src: Reg::SelfObj });
            }
        };

        self.comment("Push receiver on the stack.");
        self.emit(Instruction::Push(Reg::Acc));

        self.comment("Loading v table.");
        let is_static = matches!(dispatch, Dispatch::Static { .. });
        if is_static {
            let ty = static_type.clone().expect("static dispatch always has a target type");
            self.emit(Instruction::La { reg: Reg::Temp, label: vtable_label(&ty) });
        } else {
            self.emit(Instruction::Ld { dest: Reg::Temp, src: Reg::Acc, offset: VTABLE_INDEX });
        }

        let lookup_class = match dispatch {
            Dispatch::Dynamic { .. } => static_type.expect("dynamic dispatch carries an annotated static type"),
            Dispatch::Static { .. } => static_type.expect("static dispatch carries a target type"),
            Dispatch::SelfDispatch { .. } => self
                .current_class
                .clone()
                .expect("self dispatch is only emitted inside a method body"),
        };

        let slot = self
            .methods
            .lookup(&lookup_class, method)
            .unwrap_or_else(|| panic!("no vtable slot recorded for {lookup_class}.{method}"));

        self.comment(format!("{lookup_class}.{method} lives at vindex {slot}, loading the address."));
        self.emit(Instruction::Ld { dest: Reg::Temp, src: Reg::Temp, offset: slot });
        self.comment("Indirectly call the method.");
        self.emit(Instruction::CallReg(Reg::Temp));

        if self.target == Target::X86 {
            self.comment("x86: clean up stack.");
            self.emit(Instruction::Li { reg: Reg::Temp, imm: args.len() as i64 + 1 });
            self.emit(Instruction::Add { left: Reg::Temp, right: Reg::Sp });
        }

        self.emit(Instruction::Pop(Reg::SelfObj));
        self.emit(Instruction::Pop(Reg::Fp));
        self.debug(Reg::Sp);
    }
}
