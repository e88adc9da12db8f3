use super::*;
use objlang_core::Label;

#[test]
fn label_renders_without_indentation() {
    let out = print_program(&[Instruction::Label(Label::named("Main.main"))], PrintOptions::default());
    assert_eq!(out, "Main.main:\n");
}

#[test]
fn non_label_lines_get_four_tabs() {
    let out = print_program(
        &[Instruction::Mov { dest: Reg::Acc, src: Reg::Temp }],
        PrintOptions::default(),
    );
    assert_eq!(out, "\t\t\t\tmov acc <- temp\n");
}

#[test]
fn arithmetic_destination_is_the_right_operand() {
    let out = print_program(
        &[Instruction::Add { left: Reg::Temp, right: Reg::Acc }],
        PrintOptions::default(),
    );
    assert_eq!(out, "\t\t\t\tadd acc <- acc temp\n");
}

#[test]
fn comments_are_dropped_by_default_and_shown_when_enabled() {
    let instrs = [Instruction::Comment { text: "hello".into(), top_level: false }];
    assert_eq!(print_program(&instrs, PrintOptions::default()), "");
    let opts = PrintOptions { include_comments: true, include_debug: false };
    assert_eq!(print_program(&instrs, opts), "\t\t\t\t;;\thello\n");
}

#[test]
fn debug_markers_are_dropped_by_default_and_shown_when_enabled() {
    let instrs = [Instruction::Debug { reg: Reg::Sp }];
    assert_eq!(print_program(&instrs, PrintOptions::default()), "");
    let opts = PrintOptions { include_comments: false, include_debug: true };
    assert_eq!(print_program(&instrs, opts), "\t\t\t\tdebug sp\n");
}

#[test]
fn string_constants_preserve_escape_sequences() {
    let out = print_program(
        &[Instruction::ConstantString("line1\\nline2".into())],
        PrintOptions::default(),
    );
    assert_eq!(out, "\t\t\t\tconstant \"line1\\\\nline2\"\n");
}
