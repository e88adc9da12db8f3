//! Errors the generator can raise before or during emission (spec.md §4.8).
//!
//! These are all "the input wasn't what a well-typed program produces"
//! conditions - malformed wire JSON, or an annotated AST that references a
//! class codegen has never heard of. Anything past this boundary assumes a
//! well-typed program and is free to `panic!` on its own internal
//! inconsistencies (unassigned tags, unbound identifiers) rather than thread
//! a `Result` through every private helper.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("malformed annotated AST: {0}")]
    MalformedAst(#[from] serde_json::Error),

    #[error("`{site}` references unknown class `{class}`")]
    UnknownClass { site: &'static str, class: String },

    #[error("case branch on line {line} names class `{class}`, which is absent from the class map")]
    UnknownCaseBranchClass { line: u32, class: String },
}
