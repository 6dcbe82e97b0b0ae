//! Affe type checker: Hindley-Milner inference with usage kinds.
//!
//! This crate implements the type-checker core of the Affe language: a
//! Hindley-Milner inference engine extended with an affine/linear kind
//! system parameterised by regions, a borrow discipline, and per-variable
//! multiplicity tracking.
//!
//! # Architecture
//!
//! - [`kind`]: usage kinds, the region lattice, kind schemes
//! - [`ty`]: type representation and polymorphic schemes
//! - [`constraint`]: constraint trees and the canonicalising solver
//! - [`unify`]: two-tier unification with levels and kind synthesis
//! - [`multiplicity`]: per-variable use tracking and merges
//! - [`variance`]: polarity analysis feeding constraint simplification
//! - [`generalize`]: value-restricted scheme construction
//! - [`env`]: scope-stacked typing environment
//! - [`builtins`]: the initial environment
//! - [`error`] / [`diagnostics`]: error types and ariadne rendering
//! - [`infer`]: the syntax-directed driver and the harness entry points

pub mod builtins;
pub mod constraint;
pub mod diagnostics;
pub mod env;
pub mod error;
pub mod generalize;
pub mod infer;
pub mod kind;
pub mod multiplicity;
pub mod ty;
pub mod unify;
pub mod variance;

pub use crate::env::Env;
pub use crate::error::{ConstraintOrigin, TypeError};
pub use crate::infer::{infer_top, make_type_decl, make_type_scheme};
pub use crate::kind::{Kind, KindConst, KindScheme, KindVar, Qual, Region};
pub use crate::multiplicity::{Multiplicity, Use};
pub use crate::ty::{BorrowKind, Scheme, Ty, TyVar};
pub use crate::unify::InferCtx;

use affe_ast::Program;
use affe_common::{Name, NameSupply};

// ── CheckResult ────────────────────────────────────────────────────────

/// The result of checking a program: the final environment, the scheme of
/// every declaration checked so far, and the error that stopped checking,
/// if any.
pub struct CheckResult {
    pub env: Env,
    pub schemes: Vec<(Name, Scheme)>,
    pub error: Option<TypeError>,
}

impl CheckResult {
    /// Whether every declaration checked.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// The scheme inferred for a declaration.
    pub fn scheme_of(&self, name: &Name) -> Option<&Scheme> {
        self.schemes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)
    }

    /// Render the stopping error as a formatted diagnostic, if there is one.
    pub fn render_error(&self, source: &str, filename: &str) -> Option<String> {
        self.error
            .as_ref()
            .map(|e| diagnostics::render_diagnostic(e, source, filename))
    }
}

/// Type-check a program against a fresh initial environment.
///
/// Declarations are checked in order; the first failing declaration stops
/// checking and its error is reported through [`CheckResult`].
pub fn check_program(supply: &mut NameSupply, program: &Program) -> CheckResult {
    let mut ctx = InferCtx::new();
    let mut env = builtins::initial_env(supply);
    let mut schemes = Vec::new();

    for decl in &program.decls {
        match infer::infer_top(&mut ctx, &mut env, decl.rec, &decl.name, &decl.body) {
            Ok(scheme) => schemes.push((decl.name.clone(), scheme)),
            Err(error) => {
                return CheckResult {
                    env,
                    schemes,
                    error: Some(error),
                }
            }
        }
    }

    CheckResult {
        env,
        schemes,
        error: None,
    }
}
