//! Tag Allocator (spec.md §4.1).
//!
//! Reserved built-in classes get fixed tags; everything else counts upward
//! from the first free slot in class-map insertion order.

use indexmap::IndexMap;

const RESERVED: [(&str, i32); 6] = [
    ("Object", 0),
    ("Int", 1),
    ("String", 2),
    ("Bool", 3),
    ("IO", 4),
    ("Main", 5),
];

#[derive(Debug, Clone)]
pub struct TagAllocator {
    tags: IndexMap<String, i32>,
    next: i32,
}

impl TagAllocator {
    pub fn new() -> Self {
        let mut tags = IndexMap::new();
        for (name, tag) in RESERVED {
            tags.insert(name.to_string(), tag);
        }
        Self { tags, next: RESERVED.len() as i32 }
    }

    /// Assign a tag to `class` if it doesn't have one yet; return its tag
    /// either way.
    pub fn insert(&mut self, class: &str) -> i32 {
        if let Some(&tag) = self.tags.get(class) {
            return tag;
        }
        let tag = self.next;
        self.next += 1;
        self.tags.insert(class.to_string(), tag);
        tag
    }

    /// Look up a class's tag. Panics if the class was never registered: a
    /// class map built from a well-typed program always registers every
    /// class before codegen needs its tag.
    pub fn get(&self, class: &str) -> i32 {
        *self
            .tags
            .get(class)
            .unwrap_or_else(|| panic!("tag allocator: class `{class}` was never assigned a tag"))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.tags.iter().map(|(name, &tag)| (name.as_str(), tag))
    }
}

impl Default for TagAllocator {
    fn default() -> Self {
        Self::new()
    }
}
