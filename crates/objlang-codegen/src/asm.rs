//! The assembly instruction model and its text serializer (spec.md §6).
//!
//! Both targets (`Target::Vm`, `Target::X86`) share this exact instruction
//! set; what differs between them is which instructions the generator
//! chooses to emit around calls and frame setup (§4.6.1, §4.6), not the
//! instruction forms themselves. That keeps the printer target-agnostic.

use std::fmt::{self, Write as _};

use objlang_core::Label;

/// Which calling-convention variant the generator is targeting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    /// Stack-machine-style virtual assembly: callee cleans up its own
    /// arguments, return address is pushed/popped explicitly.
    Vm,
    /// x86-flavored variant: caller cleans up arguments, frame-pointer
    /// push/pop brackets every call.
    X86,
}

/// The reserved register set (spec.md §6). Concrete spellings are fixed
/// here; the spec only fixes their roles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Reg {
    Acc,
    SelfObj,
    Temp,
    Temp2,
    Ra,
    Fp,
    Sp,
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Reg::Acc => "acc",
            Reg::SelfObj => "self",
            Reg::Temp => "temp",
            Reg::Temp2 => "temp2",
            Reg::Ra => "ra",
            Reg::Fp => "fp",
            Reg::Sp => "sp",
        };
        f.write_str(s)
    }
}

/// One emitted assembly instruction.
#[derive(Clone, Debug)]
pub enum Instruction {
    Label(Label),
    Li { reg: Reg, imm: i64 },
    Mov { dest: Reg, src: Reg },
    Add { left: Reg, right: Reg },
    Sub { left: Reg, right: Reg },
    Mul { left: Reg, right: Reg },
    Div { left: Reg, right: Reg },
    Ld { dest: Reg, src: Reg, offset: i32 },
    St { dest: Reg, offset: i32, src: Reg },
    La { reg: Reg, label: Label },
    Jmp(Label),
    Bz { reg: Reg, label: Label },
    Bnz { reg: Reg, label: Label },
    Beq { left: Reg, right: Reg, label: Label },
    Blt { left: Reg, right: Reg, label: Label },
    Ble { left: Reg, right: Reg, label: Label },
    CallLabel(Label),
    CallReg(Reg),
    Return,
    Push(Reg),
    Pop(Reg),
    Alloc { dest: Reg, size: Reg },
    ConstantString(String),
    ConstantLabel(Label),
    Syscall(String),
    /// Only rendered when the `c` flag is set.
    Comment { text: String, top_level: bool },
    /// Only rendered when the `d` flag is set; a stack-pointer checkpoint
    /// around dispatch sites (see SPEC_FULL.md §11).
    Debug { reg: Reg },
}

impl Instruction {
    /// The label this instruction defines, if any.
    pub fn defined_label(&self) -> Option<&Label> {
        match self {
            Instruction::Label(l) => Some(l),
            _ => None,
        }
    }
}

/// Rendering options for `print_program`, corresponding to the driver's `c`
/// and `d` CLI flags (spec.md §6).
#[derive(Clone, Copy, Debug, Default)]
pub struct PrintOptions {
    pub include_comments: bool,
    pub include_debug: bool,
}

/// Four tab characters prefix every non-label, non-comment line (spec.md
/// §6).
const INDENT: &str = "\t\t\t\t";

/// Render a full instruction stream to assembly text.
pub fn print_program(instructions: &[Instruction], opts: PrintOptions) -> String {
    let mut out = String::new();
    for instr in instructions {
        match instr {
            Instruction::Comment { .. } if !opts.include_comments => continue,
            Instruction::Debug { .. } if !opts.include_debug => continue,
            _ => {}
        }
        write_instruction(&mut out, instr);
        out.push('\n');
    }
    out
}

fn write_instruction(out: &mut String, instr: &Instruction) {
    match instr {
        Instruction::Label(label) => {
            let _ = write!(out, "{label}:");
        }
        Instruction::Comment { text, top_level } => {
            let commented = format!(";;\t{text}");
            if *top_level {
                out.push_str(&commented);
            } else {
                out.push_str(INDENT);
                out.push_str(&commented);
            }
        }
        other => {
            out.push_str(INDENT);
            write_body(out, other);
        }
    }
}

fn write_body(out: &mut String, instr: &Instruction) {
    match instr {
        Instruction::Li { reg, imm } => {
            let _ = write!(out, "li {reg} <- {imm}");
        }
        Instruction::Mov { dest, src } => {
            let _ = write!(out, "mov {dest} <- {src}");
        }
        Instruction::Add { left, right } => {
            let _ = write!(out, "add {right} <- {right} {left}");
        }
        Instruction::Sub { left, right } => {
            let _ = write!(out, "sub {right} <- {right} {left}");
        }
        Instruction::Mul { left, right } => {
            let _ = write!(out, "mul {right} <- {right} {left}");
        }
        Instruction::Div { left, right } => {
            let _ = write!(out, "div {right} <- {right} {left}");
        }
        Instruction::Ld { dest, src, offset } => {
            let _ = write!(out, "ld {dest} <- {src}[{offset}]");
        }
        Instruction::St { dest, offset, src } => {
            let _ = write!(out, "st {dest}[{offset}] <- {src}");
        }
        Instruction::La { reg, label } => {
            let _ = write!(out, "la {reg} <- {label}");
        }
        Instruction::Jmp(label) => {
            let _ = write!(out, "jmp {label}");
        }
        Instruction::Bz { reg, label } => {
            let _ = write!(out, "bz {reg} {label}");
        }
        Instruction::Bnz { reg, label } => {
            let _ = write!(out, "bnz {reg} {label}");
        }
        Instruction::Beq { left, right, label } => {
            let _ = write!(out, "beq {left} {right} {label}");
        }
        Instruction::Blt { left, right, label } => {
            let _ = write!(out, "blt {left} {right} {label}");
        }
        Instruction::Ble { left, right, label } => {
            let _ = write!(out, "ble {left} {right} {label}");
        }
        Instruction::CallLabel(label) => {
            let _ = write!(out, "call {label}");
        }
        Instruction::CallReg(reg) => {
            let _ = write!(out, "call {reg}");
        }
        Instruction::Return => out.push_str("return"),
        Instruction::Push(reg) => {
            let _ = write!(out, "push {reg}");
        }
        Instruction::Pop(reg) => {
            let _ = write!(out, "pop {reg}");
        }
        Instruction::Alloc { dest, size } => {
            let _ = write!(out, "alloc {dest} {size}");
        }
        Instruction::ConstantString(s) => {
            let _ = write!(out, "constant \"{}\"", escape_string(s));
        }
        Instruction::ConstantLabel(label) => {
            let _ = write!(out, "constant {label}");
        }
        Instruction::Syscall(name) => {
            let _ = write!(out, "syscall {name}");
        }
        Instruction::Debug { reg } => {
            let _ = write!(out, "debug {reg}");
        }
        Instruction::Label(_) | Instruction::Comment { .. } => unreachable!(),
    }
}

/// Escape a source string literal for verbatim emission into a `constant`
/// line, preserving the user-visible escape sequences (spec.md §4.2).
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[path = "asm_tests.rs"]
mod asm_tests;
