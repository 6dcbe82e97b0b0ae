//! Interned identifiers.
//!
//! The renamer replaces every surface identifier with a [`Name`]: a printable
//! label paired with a globally unique tag. Equality, hashing, and ordering
//! use the tag only, so distinct bindings that happen to share a spelling
//! never collide, and alpha-renaming is free.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// An interned identifier. Identity is the `tag`; `label` is for display.
#[derive(Clone, Debug)]
pub struct Name {
    pub label: String,
    pub tag: u32,
}

impl Name {
    pub fn new(label: impl Into<String>, tag: u32) -> Self {
        Name {
            label: label.into(),
            tag,
        }
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag // label intentionally excluded
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tag.hash(state); // label intentionally excluded
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tag.cmp(&other.tag)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// Mints fresh [`Name`]s with unique tags.
///
/// One supply serves a whole checking session; names created at parse and
/// rename time and names created for the initial environment must come from
/// the same supply so tags stay unique.
#[derive(Debug)]
pub struct NameSupply {
    next: u32,
}

impl NameSupply {
    pub fn new() -> Self {
        NameSupply { next: 0 }
    }

    /// Mint a fresh name carrying `label` for display.
    pub fn fresh(&mut self, label: impl Into<String>) -> Name {
        let tag = self.next;
        self.next += 1;
        Name::new(label, tag)
    }
}

impl Default for NameSupply {
    fn default() -> Self {
        Self::new()
    }
}
