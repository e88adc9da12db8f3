//! String Table (spec.md §4.2).
//!
//! Deduplicates string-literal constants and hands each a stable assembly
//! label (`string_<k>`), built directly on top of the shared interner.

use objlang_core::{Interner, Label};

#[derive(Debug, Default)]
pub struct StringTable {
    interner: Interner,
}

impl StringTable {
    pub fn new() -> Self {
        Self { interner: Interner::new() }
    }

    /// Intern `s`, returning its label. Repeated calls with the same string
    /// return the same label.
    pub fn insert(&mut self, s: &str) -> Label {
        let symbol = self.interner.intern(s);
        Self::label_for(symbol.as_u32())
    }

    pub fn get(&self, s: &str) -> Option<Label> {
        self.interner.resolve_symbol(s).map(|sym| Self::label_for(sym.as_u32()))
    }

    /// All interned strings paired with their label, in label (insertion)
    /// order - the order `emit_constants` walks when writing `constant`
    /// lines.
    pub fn iter(&self) -> impl Iterator<Item = (Label, &str)> {
        self.interner.iter().map(|(sym, s)| (Self::label_for(sym.as_u32()), s))
    }

    fn label_for(index: u32) -> Label {
        Label::named(format!("string_{index}"))
    }
}
