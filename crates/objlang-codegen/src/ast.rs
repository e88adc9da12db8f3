//! Annotated-AST data model.
//!
//! Mirrors the four structures an external reader hands the code generator:
//! class map, implementation map, parent map, and direct-methods map (see
//! spec.md §6). Deserialization from the on-disk annotated-AST format lives
//! here too, behind a small wire-format shim (`AstFile`) that an external
//! reader would normally own; this crate only needs enough of it to drive
//! the generator end to end.

use indexmap::IndexMap;
use serde::Deserialize;

/// A source line number, used to key deduplicated runtime trampolines.
pub type Line = u32;

/// An expression annotated with its originating source line.
#[derive(Clone, Debug, Deserialize)]
pub struct Spanned<T> {
    pub line: Line,
    #[serde(flatten)]
    pub node: T,
}

impl<T> Spanned<T> {
    pub fn new(line: Line, node: T) -> Self {
        Self { line, node }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Lt,
    Le,
    Eq,
}

/// One class-literal expression or a reference into the symbol environment.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expr {
    IntLiteral {
        value: i64,
    },
    StringLiteral {
        value: String,
    },
    BoolLiteral {
        value: bool,
    },
    Identifier {
        name: String,
    },
    Assign {
        name: String,
        value: Box<Spanned<Expr>>,
    },
    New {
        type_name: String,
    },
    IsVoid {
        expr: Box<Spanned<Expr>>,
    },
    Arith {
        op: ArithOp,
        left: Box<Spanned<Expr>>,
        right: Box<Spanned<Expr>>,
    },
    Compare {
        op: CompareOp,
        left: Box<Spanned<Expr>>,
        right: Box<Spanned<Expr>>,
    },
    Not {
        expr: Box<Spanned<Expr>>,
    },
    Negate {
        expr: Box<Spanned<Expr>>,
    },
    If {
        predicate: Box<Spanned<Expr>>,
        then_branch: Box<Spanned<Expr>>,
        else_branch: Box<Spanned<Expr>>,
    },
    While {
        predicate: Box<Spanned<Expr>>,
        body: Box<Spanned<Expr>>,
    },
    Block {
        body: Vec<Spanned<Expr>>,
    },
    Let {
        bindings: Vec<LetBinding>,
        body: Box<Spanned<Expr>>,
    },
    Dispatch(Dispatch),
    Case {
        discriminant: Box<Spanned<Expr>>,
        branches: Vec<CaseBranch>,
    },
    /// A built-in method body, lowered entirely by the runtime trampoline
    /// emitter. `name` is `"Class.method"`.
    Internal {
        name: String,
    },
}

#[derive(Clone, Debug, Deserialize)]
pub struct LetBinding {
    pub name: String,
    pub declared_type: String,
    pub init: Option<Spanned<Expr>>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CaseBranch {
    pub var_name: String,
    pub type_name: String,
    pub body: Spanned<Expr>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum Dispatch {
    /// `expr.method(args)`. `static_type` is the type checker's annotation
    /// of `receiver`'s static type, used for dynamic method-index lookup.
    Dynamic {
        receiver: Box<Spanned<Expr>>,
        static_type: String,
        method: String,
        args: Vec<Spanned<Expr>>,
    },
    /// `expr@Type.method(args)`.
    Static {
        receiver: Box<Spanned<Expr>>,
        target_type: String,
        method: String,
        args: Vec<Spanned<Expr>>,
    },
    /// `method(args)` invoked on the implicit receiver.
    SelfDispatch {
        method: String,
        args: Vec<Spanned<Expr>>,
    },
}

/// One declared attribute: `(name, type, initializer?)`.
#[derive(Clone, Debug, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub type_name: String,
    pub initializer: Option<Spanned<Expr>>,
}

/// `(class, method) -> (formals, body)`.
#[derive(Clone, Debug)]
pub struct MethodImpl {
    pub owner: String,
    pub formals: Vec<String>,
    pub body: MethodBody,
}

#[derive(Clone, Debug)]
pub enum MethodBody {
    Expr(Spanned<Expr>),
    /// `Internal("Class.method")`.
    Internal(String),
}

/// Class name -> ordered attribute list. Order is significant; it fixes
/// in-memory attribute offsets.
pub type ClassMap = IndexMap<String, Vec<Attribute>>;

/// `(class, method) -> implementation`, in the order methods should be
/// walked to build vtables (inherited-then-own, stable).
pub type ImplMap = IndexMap<(String, String), MethodImpl>;

/// Class name -> direct parent class name. Absent for `Object`.
pub type ParentMap = IndexMap<String, String>;

/// The three class-index maps plus a helper map of each class's own
/// (non-inherited) methods, exactly as handed to the core by the external
/// reader (spec.md §6).
#[derive(Clone, Debug)]
pub struct Program {
    pub class_map: ClassMap,
    pub impl_map: ImplMap,
    pub parent_map: ParentMap,
    pub direct_methods: ImplMap,
}

/// On-disk wire format for an annotated-AST file. An external reader is
/// expected to own parsing the source language into this shape; this type
/// exists only so the CLI driver can exercise the generator end to end.
#[derive(Clone, Debug, Deserialize)]
pub struct AstFile {
    pub classes: Vec<ClassDecl>,
    pub methods: Vec<MethodDecl>,
    #[serde(default)]
    pub parents: IndexMap<String, String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MethodDecl {
    pub class: String,
    pub method: String,
    #[serde(default)]
    pub formals: Vec<String>,
    pub body: WireMethodBody,
    /// Own (non-inherited) methods are marked so the direct-methods map can
    /// be reconstructed; inherited entries are carried in `impl_map` only
    /// via the owner recorded on the expanded `MethodImpl`.
    #[serde(default = "default_true")]
    pub direct: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum WireMethodBody {
    Internal { internal: String },
    Expr(Spanned<Expr>),
}

impl From<AstFile> for Program {
    fn from(file: AstFile) -> Self {
        let mut class_map = ClassMap::new();
        for class in file.classes {
            class_map.insert(class.name, class.attributes);
        }

        let mut impl_map = ImplMap::new();
        let mut direct_methods = ImplMap::new();
        for method in file.methods {
            let body = match method.body {
                WireMethodBody::Internal { internal } => MethodBody::Internal(internal),
                WireMethodBody::Expr(expr) => MethodBody::Expr(expr),
            };
            let entry = MethodImpl {
                owner: method.class.clone(),
                formals: method.formals,
                body,
            };
            if method.direct {
                direct_methods.insert((method.class.clone(), method.method.clone()), entry.clone());
            }
            impl_map.insert((method.class, method.method), entry);
        }

        Self {
            class_map,
            impl_map,
            parent_map: file.parents,
            direct_methods,
        }
    }
}

#[cfg(test)]
mod ast_tests {
    use super::*;

    #[test]
    fn deserializes_minimal_program() {
        let json = r#"
        {
            "classes": [
                { "name": "Main", "attributes": [] }
            ],
            "methods": [
                {
                    "class": "Main",
                    "method": "main",
                    "formals": [],
                    "body": { "line": 1, "kind": "int_literal", "value": 0 }
                }
            ],
            "parents": { "Main": "Object" }
        }
        "#;
        let file: AstFile = serde_json::from_str(json).unwrap();
        let program: Program = file.into();
        assert!(program.class_map.contains_key("Main"));
        assert!(program.impl_map.contains_key(&("Main".to_string(), "main".to_string())));
        assert_eq!(program.parent_map.get("Main"), Some(&"Object".to_string()));
    }
}
