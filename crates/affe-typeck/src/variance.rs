//! Polarity analysis for constraint simplification.
//!
//! Before generalising, the checker walks the result type recording at
//! which polarity every kind variable occurs: covariant on the result side,
//! contravariant under an arrow's parameter, invariant under constructor
//! arguments (conservative -- correct regardless of a constructor's actual
//! variance). The solver uses the map to decide which constraint edges are
//! worth keeping and which variables can be compressed onto a bound.

use rustc_hash::FxHashMap;

use crate::kind::{Kind, KindVar};
use crate::ty::Ty;
use crate::unify::InferCtx;

/// Occurrence polarity of a variable.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Variance {
    Pos,
    Neg,
    Invar,
}

impl Variance {
    /// The polarity on the other side of an arrow parameter.
    pub fn flip(self) -> Variance {
        match self {
            Variance::Pos => Variance::Neg,
            Variance::Neg => Variance::Pos,
            Variance::Invar => Variance::Invar,
        }
    }

    /// Combine two occurrences of the same variable.
    pub fn join(self, other: Variance) -> Variance {
        if self == other {
            self
        } else {
            Variance::Invar
        }
    }
}

/// Per-kind-variable polarity, collected from the result type(s).
#[derive(Debug, Default)]
pub struct VarianceMap {
    map: FxHashMap<KindVar, Variance>,
}

impl VarianceMap {
    /// Collect the variance of every kind variable occurring in `ty`,
    /// starting covariant.
    pub fn of_type(ctx: &mut InferCtx, ty: &Ty) -> VarianceMap {
        let mut vm = VarianceMap::default();
        let resolved = ctx.resolve(ty.clone());
        vm.walk(ctx, &resolved, Variance::Pos);
        vm
    }

    pub fn get(&self, var: KindVar) -> Option<Variance> {
        self.map.get(&var).copied()
    }

    fn record(&mut self, ctx: &mut InferCtx, kind: &Kind, polarity: Variance) {
        if let Kind::Var(v) = ctx.resolve_kind(kind) {
            let entry = match self.map.get(&v) {
                Some(existing) => existing.join(polarity),
                None => polarity,
            };
            self.map.insert(v, entry);
        }
    }

    fn walk(&mut self, ctx: &mut InferCtx, ty: &Ty, polarity: Variance) {
        match ty {
            Ty::Var(v) => {
                let kind = ctx.var_kind(*v);
                self.record(ctx, &kind, polarity);
            }
            Ty::Gen(_) => {}
            Ty::App(_, args) => {
                for a in args {
                    self.walk(ctx, a, Variance::Invar);
                }
            }
            Ty::Tuple(elems) => {
                for e in elems {
                    self.walk(ctx, e, polarity);
                }
            }
            Ty::Arrow(param, kind, ret) => {
                self.record(ctx, kind, polarity);
                self.walk(ctx, param, polarity.flip());
                self.walk(ctx, ret, polarity);
            }
            Ty::Borrow(_, kind, inner) => {
                self.record(ctx, kind, polarity);
                self.walk(ctx, inner, polarity);
            }
        }
    }
}
