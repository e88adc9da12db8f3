//! Unique label allocation.
//!
//! Every branch, trampoline, and vtable entry needs a name that's guaranteed
//! unique across an entire emission run. `LabelAllocator` is the single
//! counter behind all of it; callers give it a prefix ("true", "while_end",
//! ...) and get back a `Label` that renders as `prefix_N`.

use std::fmt;

/// A generated assembly label, unique within a single codegen run.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Label(pub String);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Label {
    pub fn named(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Monotonic counter backing unique label generation.
#[derive(Debug, Default)]
pub struct LabelAllocator {
    next: u32,
}

impl LabelAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh label `{prefix}_{n}` with `n` monotonically
    /// increasing across the lifetime of this allocator.
    pub fn fresh(&mut self, prefix: &str) -> Label {
        self.next += 1;
        Label(format!("{prefix}_{}", self.next))
    }
}

#[cfg(test)]
mod label_tests {
    use super::*;

    #[test]
    fn labels_are_monotonic_and_unique() {
        let mut alloc = LabelAllocator::new();
        let a = alloc.fresh("branch");
        let b = alloc.fresh("branch");
        assert_ne!(a, b);
        assert_eq!(a.as_str(), "branch_1");
        assert_eq!(b.as_str(), "branch_2");
    }

    #[test]
    fn different_prefixes_still_share_the_counter() {
        let mut alloc = LabelAllocator::new();
        let a = alloc.fresh("true");
        let b = alloc.fresh("false");
        let c = alloc.fresh("end");
        assert_eq!([a.as_str(), b.as_str(), c.as_str()], ["true_1", "false_2", "end_3"]);
    }
}
