//! Resource graph module: include-driven traversal.
//!
//! Walks relationships from the root resources following an include tree,
//! deduplicating resources by identity and splitting them into primary and
//! included lists.

mod traversal;

pub use traversal::{traverse, Traversal};
