use super::*;

#[test]
fn dedupes_repeated_strings() {
    let mut interner = Interner::new();
    let a = interner.intern("hello");
    let b = interner.intern("hello");
    assert_eq!(a, b);
    assert_eq!(interner.len(), 1);
}

#[test]
fn preserves_insertion_order() {
    let mut interner = Interner::new();
    interner.intern("b");
    interner.intern("a");
    interner.intern("c");
    let order: Vec<_> = interner.iter().map(|(_, s)| s).collect();
    assert_eq!(order, ["b", "a", "c"]);
}

#[test]
fn resolves_back_to_original_string() {
    let mut interner = Interner::new();
    let sym = interner.intern("a string literal");
    assert_eq!(interner.resolve(sym), "a string literal");
}

#[test]
fn contains_reflects_interned_state() {
    let mut interner = Interner::new();
    assert!(!interner.contains("x"));
    interner.intern("x");
    assert!(interner.contains("x"));
}
