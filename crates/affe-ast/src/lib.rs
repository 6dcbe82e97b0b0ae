//! Surface syntax tree for the Affe language.
//!
//! This is the tree the type checker consumes: every identifier has already
//! been renamed to an [`affe_common::Name`], and every node carries a byte
//! span for diagnostics. The parser and renamer producing it live in the
//! surrounding harness; tests and embedders build the tree directly through
//! the constructor helpers on [`Expr`] and [`Pat`].

pub mod expr;

pub use expr::{Arm, BorrowKind, Constant, Expr, Pat, Program, RecFlag, ValueDecl};
