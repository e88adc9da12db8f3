//! Shared primitives for the object-language code generator:
//! - `interner` - string deduplication with insertion-order-stable handles
//! - `label` - unique assembly label handles

pub mod interner;
pub mod label;

pub use interner::{Interner, Symbol};
pub use label::{Label, LabelAllocator};
