//! Top-level driver: wires the layout engine, method emitter, and runtime
//! tail into the single pass spec.md §6 describes an external reader as
//! driving.

use crate::ast::{Attribute, Dispatch, Expr, MethodBody, Program, Spanned};
use crate::asm::{Instruction, Target};
use crate::error::CodegenError;
use crate::generator::Generator;

/// Generate the full instruction stream for `program`, targeting `target`.
///
/// Order matches the teacher's own `__init__`/driver sequence: prime the
/// hidden boxed-primitive attribute, lay out vtables and constructors, emit
/// every method body, then the runtime tail (string pool, error trampolines,
/// comparison handlers), and finally the `start` entry point.
pub fn generate(program: &Program, target: Target) -> Result<Vec<Instruction>, CodegenError> {
    let mut program = program.clone();
    prime_boxed_primitives(&mut program.class_map);
    validate(&program)?;

    let mut r#gen = Generator::new(&program, target);
    r#gen.emit_vtables();
    r#gen.emit_constructors();
    r#gen.emit_methods();
    r#gen.emit_runtime_tail();
    emit_start(&mut r#gen);

    Ok(r#gen.instructions)
}

/// `Int`, `String`, and `Bool` each carry a single hidden attribute holding
/// their unboxed payload at attribute slot 0 (spec.md §3) - every other
/// attribute a user class declares sits after it. Boxed primitives don't
/// appear in the wire format's class list with this attribute already
/// present, so the driver appends it before layout runs.
fn prime_boxed_primitives(class_map: &mut crate::ast::ClassMap) {
    for (class, unboxed_type) in [("Int", "Unboxed_Int"), ("Bool", "Unboxed_Int"), ("String", "Unboxed_String")] {
        let attrs = class_map.entry(class.to_string()).or_default();
        if attrs.is_empty() {
            attrs.push(Attribute { name: "val".into(), type_name: unboxed_type.into(), initializer: None });
        }
    }
}

/// `start: call Main..new; push acc; call Main.main; syscall exit` (spec.md
/// §6) - the fixed entry sequence every emitted program ends with.
fn emit_start(r#gen: &mut Generator<'_>) {
    use crate::asm::Reg;
    use crate::layout::{constructor_label, method_label};
    use objlang_core::Label;

    r#gen.section_comment("START");
    r#gen.emit(Instruction::Label(Label::named("start")));
    r#gen.emit(Instruction::CallLabel(constructor_label("Main")));
    r#gen.emit(Instruction::Push(Reg::Acc));
    r#gen.emit(Instruction::CallLabel(method_label("Main", "main")));
    r#gen.emit(Instruction::Syscall("exit".into()));
}

/// Walk every `New`, dispatch, and `case` branch in the program and confirm
/// it names a class the class map actually declares (spec.md §4.8). A
/// well-typed program never trips this, but the wire format is untrusted
/// input from outside the core.
fn validate(program: &Program) -> Result<(), CodegenError> {
    for imp in program.impl_map.values() {
        if let MethodBody::Expr(body) = &imp.body {
            validate_expr(program, body)?;
        }
    }
    for attrs in program.class_map.values() {
        for attr in attrs {
            if let Some(init) = &attr.initializer {
                validate_expr(program, init)?;
            }
        }
    }
    Ok(())
}

fn validate_expr(program: &Program, expr: &Spanned<Expr>) -> Result<(), CodegenError> {
    let known = |class: &str| {
        matches!(class, "SELF_TYPE" | "Object" | "IO") || program.class_map.contains_key(class)
    };

    match &expr.node {
        Expr::New { type_name } => {
            if !known(type_name) {
                return Err(CodegenError::UnknownClass { site: "new", class: type_name.clone() });
            }
        }
        Expr::Dispatch(Dispatch::Dynamic { receiver, static_type, args, .. }) => {
            if !known(static_type) {
                return Err(CodegenError::UnknownClass { site: "dispatch", class: static_type.clone() });
            }
            validate_expr(program, receiver)?;
            for arg in args {
                validate_expr(program, arg)?;
            }
        }
        Expr::Dispatch(Dispatch::Static { receiver, target_type, args, .. }) => {
            if !known(target_type) {
                return Err(CodegenError::UnknownClass { site: "static dispatch", class: target_type.clone() });
            }
            validate_expr(program, receiver)?;
            for arg in args {
                validate_expr(program, arg)?;
            }
        }
        Expr::Dispatch(Dispatch::SelfDispatch { args, .. }) => {
            for arg in args {
                validate_expr(program, arg)?;
            }
        }
        Expr::Case { discriminant, branches } => {
            validate_expr(program, discriminant)?;
            for branch in branches {
                if !program.class_map.contains_key(&branch.type_name) {
                    return Err(CodegenError::UnknownCaseBranchClass {
                        line: branch.body.line,
                        class: branch.type_name.clone(),
                    });
                }
                validate_expr(program, &branch.body)?;
            }
        }
        Expr::Assign { value, .. } => validate_expr(program, value)?,
        Expr::IsVoid { expr } | Expr::Not { expr } | Expr::Negate { expr } => validate_expr(program, expr)?,
        Expr::Arith { left, right, .. } | Expr::Compare { left, right, .. } => {
            validate_expr(program, left)?;
            validate_expr(program, right)?;
        }
        Expr::If { predicate, then_branch, else_branch } => {
            validate_expr(program, predicate)?;
            validate_expr(program, then_branch)?;
            validate_expr(program, else_branch)?;
        }
        Expr::While { predicate, body } => {
            validate_expr(program, predicate)?;
            validate_expr(program, body)?;
        }
        Expr::Block { body } => {
            for e in body {
                validate_expr(program, e)?;
            }
        }
        Expr::Let { bindings, body } => {
            for binding in bindings {
                if !known(&binding.declared_type) {
                    return Err(CodegenError::UnknownClass {
                        site: "let binding",
                        class: binding.declared_type.clone(),
                    });
                }
                if let Some(init) = &binding.init {
                    validate_expr(program, init)?;
                }
            }
            validate_expr(program, body)?;
        }
        Expr::IntLiteral { .. }
        | Expr::StringLiteral { .. }
        | Expr::BoolLiteral { .. }
        | Expr::Identifier { .. }
        | Expr::Internal { .. } => {}
    }
    Ok(())
}

#[cfg(test)]
#[path = "emit_tests.rs"]
mod emit_tests;
