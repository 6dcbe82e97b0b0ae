//! Shared leaf types for the Affe type checker.
//!
//! This crate holds the vocabulary the renamer and the checker agree on:
//!
//! - [`name`]: interned identifiers with tag-based equality
//! - [`span`]: byte-offset source spans and line/column lookup

pub mod name;
pub mod span;

pub use name::{Name, NameSupply};
pub use span::{LineIndex, Span};
