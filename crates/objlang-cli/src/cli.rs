use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use objlang_codegen::Target;

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum TargetArg {
    #[default]
    Vm,
    X86,
}

impl From<TargetArg> for Target {
    fn from(arg: TargetArg) -> Self {
        match arg {
            TargetArg::Vm => Target::Vm,
            TargetArg::X86 => Target::X86,
        }
    }
}

/// Emit assembly for an annotated-AST file.
#[derive(Parser)]
#[command(name = "objlang-codegen", bin_name = "objlang-codegen")]
pub struct Cli {
    /// Annotated-AST input, conventionally named `<program>.cl-type`.
    pub input: PathBuf,

    /// Include `;;`-prefixed comments in the emitted assembly.
    #[arg(short = 'c')]
    pub comments: bool,

    /// Include stack-pointer debug checkpoints around dispatch sites.
    #[arg(short = 'd')]
    pub debug: bool,

    /// Calling-convention variant to target.
    #[arg(long, value_enum, default_value_t = TargetArg::Vm)]
    pub target: TargetArg,
}

/// `foo.cl-type` -> `foo.cl-asm`; any other extension just gets `.cl-asm`
/// appended (spec.md §6).
pub fn output_path_for(input: &std::path::Path) -> PathBuf {
    let input_str = input.to_string_lossy();
    if let Some(stem) = input_str.strip_suffix(".cl-type") {
        PathBuf::from(format!("{stem}.cl-asm"))
    } else {
        PathBuf::from(format!("{input_str}.cl-asm"))
    }
}
