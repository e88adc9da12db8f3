use super::*;
use crate::ast::{ArithOp, CaseBranch, LetBinding};

fn sp(expr: Expr) -> Spanned<Expr> {
    Spanned::new(1, expr)
}

fn bsp(expr: Expr) -> Box<Spanned<Expr>> {
    Box::new(sp(expr))
}

fn int(value: i64) -> Expr {
    Expr::IntLiteral { value }
}

#[test]
fn leaf_expressions_need_no_temporaries() {
    assert_eq!(compute_max_stack_depth(&int(0)), 0);
    assert_eq!(compute_max_stack_depth(&Expr::Identifier { name: "x".into() }), 0);
}

#[test]
fn arith_depth_is_the_max_of_its_operands_not_their_sum() {
    let expr = Expr::Arith { op: ArithOp::Add, left: bsp(int(1)), right: bsp(int(2)) };
    assert_eq!(compute_max_stack_depth(&expr), 0);
}

#[test]
fn let_depth_adds_one_slot_per_binding() {
    let expr = Expr::Let {
        bindings: vec![
            LetBinding { name: "a".into(), declared_type: "Int".into(), init: None },
            LetBinding { name: "b".into(), declared_type: "Int".into(), init: None },
        ],
        body: bsp(int(0)),
    };
    assert_eq!(compute_max_stack_depth(&expr), 2);
}

#[test]
fn nested_let_depth_accumulates_along_the_body_chain() {
    let inner = Expr::Let {
        bindings: vec![LetBinding { name: "b".into(), declared_type: "Int".into(), init: None }],
        body: bsp(int(0)),
    };
    let outer = Expr::Let {
        bindings: vec![LetBinding { name: "a".into(), declared_type: "Int".into(), init: None }],
        body: bsp(inner),
    };
    assert_eq!(compute_max_stack_depth(&outer), 2);
}

#[test]
fn if_depth_is_the_max_of_its_branches() {
    let deep_then = Expr::Let {
        bindings: vec![LetBinding { name: "a".into(), declared_type: "Int".into(), init: None }],
        body: bsp(int(0)),
    };
    let expr = Expr::If { predicate: bsp(int(1)), then_branch: bsp(deep_then), else_branch: bsp(int(0)) };
    assert_eq!(compute_max_stack_depth(&expr), 1);
}

#[test]
fn block_depth_is_the_max_of_its_statements_not_their_sum() {
    let deep = Expr::Let {
        bindings: vec![LetBinding { name: "a".into(), declared_type: "Int".into(), init: None }],
        body: bsp(int(0)),
    };
    let expr = Expr::Block { body: vec![sp(int(0)), sp(deep), sp(int(0))] };
    assert_eq!(compute_max_stack_depth(&expr), 1);
}

#[test]
fn case_depth_reserves_one_slot_for_the_discriminant_plus_the_deepest_branch() {
    let branch_with_let = CaseBranch {
        var_name: "v".into(),
        type_name: "A".into(),
        body: sp(Expr::Let {
            bindings: vec![LetBinding { name: "a".into(), declared_type: "Int".into(), init: None }],
            body: bsp(int(0)),
        }),
    };
    let plain_branch = CaseBranch { var_name: "v".into(), type_name: "B".into(), body: sp(int(0)) };
    let expr = Expr::Case { discriminant: bsp(int(0)), branches: vec![branch_with_let, plain_branch] };
    assert_eq!(compute_max_stack_depth(&expr), 2);
}

#[test]
fn while_depth_follows_the_body_only() {
    let deep_body = Expr::Let {
        bindings: vec![LetBinding { name: "a".into(), declared_type: "Int".into(), init: None }],
        body: bsp(int(0)),
    };
    let expr = Expr::While { predicate: bsp(int(1)), body: bsp(deep_body) };
    assert_eq!(compute_max_stack_depth(&expr), 1);
}
