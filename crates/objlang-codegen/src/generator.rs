//! Shared mutable context threaded through every emission stage.
//!
//! One `Generator` is built per run and lives for the lifetime of a single
//! `generate()` call; nothing here is process-global (spec.md §5 / §9).

use std::collections::BTreeSet;

use objlang_core::{Label, LabelAllocator};

use crate::ast::{ClassMap, ImplMap, ParentMap, Program};
use crate::asm::{Instruction, Reg, Target};
use crate::env::SymbolEnv;
use crate::methods::MethodIndexTable;
use crate::strings::StringTable;
use crate::tags::TagAllocator;

/// Word offsets into the fixed object layout (spec.md §3).
pub const TYPE_TAG_INDEX: i32 = 0;
pub const OBJECT_SIZE_INDEX: i32 = 1;
pub const VTABLE_INDEX: i32 = 2;
pub const ATTRIBUTES_START_INDEX: i32 = 3;

pub struct Generator<'a> {
    pub class_map: &'a ClassMap,
    pub impl_map: &'a ImplMap,
    pub parent_map: &'a ParentMap,

    pub target: Target,

    pub tags: TagAllocator,
    pub strings: StringTable,
    pub methods: MethodIndexTable,
    pub env: SymbolEnv,
    labels: LabelAllocator,

    pub instructions: Vec<Instruction>,

    /// Class currently being emitted (set while walking `impl_map`); used by
    /// self-dispatch to resolve the enclosing class.
    pub current_class: Option<String>,
    /// Next negative frame offset to hand out for a `let`/`case` binding;
    /// reset at the start of every method body.
    pub temporary_index: i32,
    /// The conservative upper bound on concurrently-live temporaries for the
    /// method body currently being emitted (spec.md §9).
    pub temporaries_needed: i32,

    pub dispatch_void_lines: BTreeSet<u32>,
    pub case_void_lines: BTreeSet<u32>,
    pub case_without_branch_lines: BTreeSet<u32>,
    pub divide_by_zero_lines: BTreeSet<u32>,
}

impl<'a> Generator<'a> {
    pub fn new(program: &'a Program, target: Target) -> Self {
        Self {
            class_map: &program.class_map,
            impl_map: &program.impl_map,
            parent_map: &program.parent_map,
            target,
            tags: TagAllocator::new(),
            strings: StringTable::new(),
            methods: MethodIndexTable::new(),
            env: SymbolEnv::new(),
            labels: LabelAllocator::new(),
            instructions: Vec::new(),
            current_class: None,
            temporary_index: 0,
            temporaries_needed: 0,
            dispatch_void_lines: BTreeSet::new(),
            case_void_lines: BTreeSet::new(),
            case_without_branch_lines: BTreeSet::new(),
            divide_by_zero_lines: BTreeSet::new(),
        }
    }

    pub fn emit(&mut self, instr: Instruction) {
        self.instructions.push(instr);
    }

    /// A top-level section banner, always emitted regardless of the `c`
    /// flag's runtime filtering (the banner markers still carry the
    /// `c`-gated `Comment` representation; only `print_program` decides
    /// whether they render).
    pub fn section_comment(&mut self, text: impl Into<String>) {
        self.emit(Instruction::Comment { text: text.into(), top_level: true });
    }

    pub fn comment(&mut self, text: impl Into<String>) {
        self.emit(Instruction::Comment { text: text.into(), top_level: false });
    }

    pub fn debug(&mut self, reg: Reg) {
        self.emit(Instruction::Debug { reg });
    }

    pub fn fresh_label(&mut self, prefix: &str) -> Label {
        self.labels.fresh(prefix)
    }

    /// Look up `class`'s direct parent, or `None` for `Object`.
    pub fn parent_of(&self, class: &str) -> Option<&str> {
        self.parent_map.get(class).map(String::as_str)
    }

    /// Walk `class`'s ancestor chain (excluding itself) and return the
    /// closest ancestor present in `listed`, if any (the full multi-level
    /// case-routing walk; see SPEC_FULL.md §11).
    pub fn closest_listed_ancestor(
        &self,
        class: &str,
        listed: impl Fn(&str) -> bool,
    ) -> Option<String> {
        let mut current = self.parent_of(class).map(str::to_string);
        while let Some(c) = current {
            if listed(&c) {
                return Some(c);
            }
            current = self.parent_of(&c).map(str::to_string);
        }
        None
    }
}
