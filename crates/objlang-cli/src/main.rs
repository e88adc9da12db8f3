mod cli;

use std::fs;

use clap::Parser;

use cli::Cli;
use objlang_codegen::{AstFile, PrintOptions, Program, generate, print_program};

fn main() {
    let cli = Cli::parse();

    let source = fs::read_to_string(&cli.input).unwrap_or_else(|err| {
        eprintln!("error: could not read {}: {err}", cli.input.display());
        std::process::exit(1);
    });

    let file: AstFile = serde_json::from_str(&source).unwrap_or_else(|err| {
        eprintln!("error: {}: {err}", cli.input.display());
        std::process::exit(1);
    });
    let program: Program = file.into();

    let instructions = generate(&program, cli.target.into()).unwrap_or_else(|err| {
        eprintln!("error: {}: {err}", cli.input.display());
        std::process::exit(1);
    });

    let opts = PrintOptions { include_comments: cli.comments, include_debug: cli.debug };
    let rendered = print_program(&instructions, opts);

    let output = cli::output_path_for(&cli.input);
    fs::write(&output, rendered).unwrap_or_else(|err| {
        eprintln!("error: could not write {}: {err}", output.display());
        std::process::exit(1);
    });
}
