use indoc::indoc;

use super::*;
use crate::AstFile;
use crate::asm::{PrintOptions, print_program};

fn compile(json: &str, target: Target) -> String {
    let file: AstFile = serde_json::from_str(json).expect("fixture parses");
    let program: Program = file.into();
    let instructions = generate(&program, target).expect("fixture type-checks");
    print_program(&instructions, PrintOptions { include_comments: false, include_debug: false })
}

#[test]
fn trivial_main_emits_the_start_sequence() {
    let out = compile(
        indoc! {r#"
        {
            "classes": [{ "name": "Main", "attributes": [] }],
            "methods": [
                { "class": "Main", "method": "main", "formals": [],
                  "body": { "line": 3, "kind": "int_literal", "value": 0 } }
            ],
            "parents": { "Main": "Object" }
        }
        "#},
        Target::Vm,
    );

    assert!(out.contains("start:"));
    assert!(out.contains("call Main..new"));
    assert!(out.contains("push acc"));
    assert!(out.contains("call Main.main"));
    assert!(out.contains("syscall exit"));
}

#[test]
fn arithmetic_unboxes_before_combining_and_reboxes_the_result() {
    let out = compile(
        indoc! {r#"
        {
            "classes": [{ "name": "Main", "attributes": [] }],
            "methods": [
                { "class": "Main", "method": "main", "formals": [],
                  "body": { "line": 5, "kind": "arith", "op": "add",
                    "left": { "line": 5, "kind": "int_literal", "value": 1 },
                    "right": { "line": 5, "kind": "int_literal", "value": 2 } } }
            ],
            "parents": { "Main": "Object" }
        }
        "#},
        Target::Vm,
    );

    assert!(out.contains("add acc <- acc temp"));
    assert!(out.contains("call Int..new"));
}

#[test]
fn subtraction_computes_left_minus_right_not_right_minus_left() {
    let out = compile(
        indoc! {r#"
        {
            "classes": [{ "name": "Main", "attributes": [] }],
            "methods": [
                { "class": "Main", "method": "main", "formals": [],
                  "body": { "line": 5, "kind": "arith", "op": "sub",
                    "left": { "line": 5, "kind": "int_literal", "value": 10 },
                    "right": { "line": 5, "kind": "int_literal", "value": 3 } } }
            ],
            "parents": { "Main": "Object" }
        }
        "#},
        Target::Vm,
    );

    // acc holds the right operand (3), temp holds the left (10); the
    // subtraction must land `left - right` in temp, not `right - left`.
    assert!(out.contains("sub temp <- temp acc"));
    let sub_at = out.find("sub temp <- temp acc").unwrap();
    assert!(out[sub_at..].contains("push temp"), "the minuend-first result in temp must be pushed, not acc");
}

#[test]
fn division_computes_left_over_right_not_right_over_left() {
    let out = compile(
        indoc! {r#"
        {
            "classes": [{ "name": "Main", "attributes": [] }],
            "methods": [
                { "class": "Main", "method": "main", "formals": [],
                  "body": { "line": 5, "kind": "arith", "op": "div",
                    "left": { "line": 5, "kind": "int_literal", "value": 10 },
                    "right": { "line": 5, "kind": "int_literal", "value": 2 } } }
            ],
            "parents": { "Main": "Object" }
        }
        "#},
        Target::Vm,
    );

    assert!(out.contains("div temp <- temp acc"));
    let div_at = out.find("div temp <- temp acc").unwrap();
    assert!(out[div_at..].contains("push temp"), "the dividend-first result in temp must be pushed, not acc");
}

#[test]
fn if_expression_labels_both_branches_and_a_join_point() {
    let out = compile(
        indoc! {r#"
        {
            "classes": [{ "name": "Main", "attributes": [] }],
            "methods": [
                { "class": "Main", "method": "main", "formals": [],
                  "body": { "line": 7, "kind": "if",
                    "predicate": { "line": 7, "kind": "bool_literal", "value": true },
                    "then_branch": { "line": 7, "kind": "int_literal", "value": 1 },
                    "else_branch": { "line": 7, "kind": "int_literal", "value": 2 } } }
            ],
            "parents": { "Main": "Object" }
        }
        "#},
        Target::Vm,
    );

    assert!(out.contains("true_branch_1:"));
    assert!(out.contains("false_branch_2:"));
    assert!(out.contains("end_branch_3:"));
}

#[test]
fn while_loop_clears_the_accumulator_to_a_fresh_bool_after_the_body() {
    let out = compile(
        indoc! {r#"
        {
            "classes": [{ "name": "Main", "attributes": [] }],
            "methods": [
                { "class": "Main", "method": "main", "formals": [],
                  "body": { "line": 9, "kind": "while",
                    "predicate": { "line": 9, "kind": "bool_literal", "value": false },
                    "body": { "line": 9, "kind": "int_literal", "value": 0 } } }
            ],
            "parents": { "Main": "Object" }
        }
        "#},
        Target::Vm,
    );

    let while_end = out.find("end_while_2:").expect("while loop has an end label");
    let tail = &out[while_end..];
    assert!(tail.contains("call Bool..new"), "accumulator must be a fresh Bool after the loop");
}

#[test]
fn let_binding_reloads_the_value_from_its_frame_slot() {
    let out = compile(
        indoc! {r#"
        {
            "classes": [{ "name": "Main", "attributes": [] }],
            "methods": [
                { "class": "Main", "method": "main", "formals": [],
                  "body": { "line": 11, "kind": "let",
                    "bindings": [
                        { "name": "x", "declared_type": "Int",
                          "init": { "line": 11, "kind": "int_literal", "value": 5 } }
                    ],
                    "body": { "line": 11, "kind": "arith", "op": "add",
                        "left": { "line": 11, "kind": "identifier", "name": "x" },
                        "right": { "line": 11, "kind": "int_literal", "value": 1 } } } }
            ],
            "parents": { "Main": "Object" }
        }
        "#},
        Target::Vm,
    );

    assert!(out.contains("st fp[0] <- acc"));
    assert!(out.contains("ld acc <- fp[0]"));
}

#[test]
fn case_routes_a_grandchild_to_its_closest_listed_ancestor() {
    let out = compile(
        indoc! {r#"
        {
            "classes": [
                { "name": "Main", "attributes": [] },
                { "name": "A", "attributes": [] },
                { "name": "B", "attributes": [] },
                { "name": "C", "attributes": [] }
            ],
            "methods": [
                { "class": "Main", "method": "main", "formals": [],
                  "body": { "line": 7, "kind": "case",
                    "discriminant": { "line": 7, "kind": "new", "type_name": "C" },
                    "branches": [
                        { "var_name": "x", "type_name": "A", "body": { "line": 7, "kind": "int_literal", "value": 1 } },
                        { "var_name": "y", "type_name": "B", "body": { "line": 7, "kind": "int_literal", "value": 2 } }
                    ] } }
            ],
            "parents": { "Main": "Object", "A": "Object", "B": "Object", "C": "B" }
        }
        "#},
        Target::Vm,
    );

    assert!(out.contains("case_void_7:"));
    assert!(out.contains("case_without_branch_7:"));

    let a_branch = out.find("case_exp_for_A_").expect("A has its own branch label");
    let b_branch = out.find("case_exp_for_B_").expect("B has its own branch label");
    let routing_region = &out[..a_branch.min(b_branch)];
    let _ = routing_region;

    // C has no branch of its own; it must route to B's label (its closest
    // listed ancestor), not fall through to the without-branch trampoline.
    let tag_test_count = out.matches("beq acc temp case_exp_for_B_").count();
    assert!(tag_test_count >= 2, "both B and its descendant C must route to B's branch");
}

#[test]
fn comparison_handler_saves_and_restores_the_return_address_on_vm() {
    let out = compile(
        indoc! {r#"
        {
            "classes": [{ "name": "Main", "attributes": [] }],
            "methods": [
                { "class": "Main", "method": "main", "formals": [],
                  "body": { "line": 17, "kind": "compare", "op": "lt",
                    "left": { "line": 17, "kind": "int_literal", "value": 1 },
                    "right": { "line": 17, "kind": "int_literal", "value": 2 } } }
            ],
            "parents": { "Main": "Object" }
        }
        "#},
        Target::Vm,
    );

    let handler_at = out.find("lt_handler:").expect("lt_handler label is emitted");
    let handler = &out[handler_at..];
    let push_ra = handler.find("push ra").expect("lt_handler must save ra before clobbering it");
    let pop_ra = handler.find("pop ra").expect("lt_handler must restore ra before returning");
    let return_at = handler.find("return").expect("lt_handler returns");
    assert!(push_ra < pop_ra, "ra must be saved before it's restored");
    assert!(pop_ra < return_at, "ra must be restored before the handler returns");
}

#[test]
fn literal_zero_divisor_reports_the_exact_source_line() {
    let out = compile(
        indoc! {r#"
        {
            "classes": [{ "name": "Main", "attributes": [] }],
            "methods": [
                { "class": "Main", "method": "main", "formals": [],
                  "body": { "line": 13, "kind": "arith", "op": "div",
                    "left": { "line": 13, "kind": "int_literal", "value": 1 },
                    "right": { "line": 13, "kind": "int_literal", "value": 0 } } }
            ],
            "parents": { "Main": "Object" }
        }
        "#},
        Target::Vm,
    );

    assert!(out.contains("divide_by_zero_13:"));
    assert!(out.contains("ERROR: 13: Exception: division by zero"));
}

#[test]
fn x86_target_cleans_up_dispatch_args_at_the_call_site() {
    let out = compile(
        indoc! {r#"
        {
            "classes": [{ "name": "Main", "attributes": [] }],
            "methods": [
                { "class": "Main", "method": "helper", "formals": ["n"],
                  "body": { "line": 2, "kind": "identifier", "name": "n" } },
                { "class": "Main", "method": "main", "formals": [],
                  "body": { "line": 15, "kind": "dispatch", "form": "self_dispatch",
                    "method": "helper",
                    "args": [{ "line": 15, "kind": "int_literal", "value": 1 }] } }
            ],
            "parents": { "Main": "Object" }
        }
        "#},
        Target::X86,
    );

    assert!(out.contains("add sp <- sp temp"), "x86 dispatch must reclaim its argument slots");
}

#[test]
fn inherited_method_keeps_its_ancestors_vtable_slot() {
    let file: AstFile = serde_json::from_str(indoc! {r#"
        {
            "classes": [
                { "name": "Main", "attributes": [] },
                { "name": "A", "attributes": [] },
                { "name": "B", "attributes": [] }
            ],
            "methods": [
                { "class": "A", "method": "foo", "formals": [],
                  "body": { "line": 2, "kind": "int_literal", "value": 1 } },
                { "class": "B", "method": "foo", "formals": [], "direct": false,
                  "body": { "line": 2, "kind": "int_literal", "value": 1 } },
                { "class": "Main", "method": "main", "formals": [],
                  "body": { "line": 20, "kind": "dispatch", "form": "dynamic",
                    "static_type": "A", "method": "foo", "args": [],
                    "receiver": { "line": 20, "kind": "new", "type_name": "A" } } },
                { "class": "Main", "method": "helper", "formals": [],
                  "body": { "line": 21, "kind": "dispatch", "form": "dynamic",
                    "static_type": "B", "method": "foo", "args": [],
                    "receiver": { "line": 21, "kind": "new", "type_name": "B" } } }
            ],
            "parents": { "Main": "Object", "A": "Object", "B": "A" }
        }
        "#})
    .unwrap();
    let program: Program = file.into();
    let instructions = generate(&program, Target::Vm).expect("fixture type-checks");
    let out = print_program(&instructions, PrintOptions { include_comments: true, include_debug: false });

    let vindex_of = |needle: &str| -> String {
        let line = out.lines().find(|l| l.contains(needle)).expect("dispatch records its vindex");
        let after = line.split("vindex ").nth(1).expect("comment names the vindex");
        after.split(',').next().expect("vindex is followed by a comma").to_string()
    };
    let a_vindex = vindex_of("A.foo lives at vindex");
    let b_vindex = vindex_of("B.foo lives at vindex");

    assert_eq!(a_vindex, b_vindex, "an inherited method must keep its ancestor's vtable slot");
}

#[test]
fn rejects_a_new_expression_naming_an_unregistered_class() {
    let file: AstFile = serde_json::from_str(indoc! {r#"
        {
            "classes": [{ "name": "Main", "attributes": [] }],
            "methods": [
                { "class": "Main", "method": "main", "formals": [],
                  "body": { "line": 1, "kind": "new", "type_name": "Ghost" } }
            ],
            "parents": { "Main": "Object" }
        }
        "#})
    .unwrap();
    let program: Program = file.into();
    assert!(generate(&program, Target::Vm).is_err());
}
