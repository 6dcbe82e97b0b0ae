//! Per-variable use tracking.
//!
//! Every inference rule produces a multiplicity map recording how each
//! in-scope variable was consumed along that path: owned uses (`Normal`),
//! shared or exclusive borrows, or `Shadow` once a borrow's scope has
//! closed. Sibling sub-expressions compose with the sequential merge;
//! match arms, of which only one runs, compose with the parallel merge.
//! Incompatible combinations abort inference with `UseMismatch`.

use std::fmt;

use rustc_hash::FxHashMap;

use affe_common::Name;

use crate::error::TypeError;
use crate::kind::{Kind, Region};
use crate::ty::BorrowKind;
use crate::unify::InferCtx;

/// How a variable was consumed along one inference path.
///
/// The kind list accumulates the kind of each use site; `Shadow` marks a
/// variable whose borrow has exited scope.
#[derive(Clone, Debug, PartialEq)]
pub enum Use {
    Shadow,
    Borrow(BorrowKind, Vec<Kind>),
    Normal(Vec<Kind>),
}

impl fmt::Display for Use {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Use::Shadow => write!(f, "shadowed"),
            Use::Borrow(BorrowKind::Read, _) => write!(f, "borrowed (&)"),
            Use::Borrow(BorrowKind::Write, _) => write!(f, "borrowed (&!)"),
            Use::Normal(kinds) => write!(f, "used {} time(s)", kinds.len()),
        }
    }
}

/// A finite map from variable name to its use along one inference path.
#[derive(Clone, Debug, Default)]
pub struct Multiplicity {
    uses: FxHashMap<Name, Use>,
}

impl Multiplicity {
    /// The empty map (constants, constructors).
    pub fn new() -> Self {
        Multiplicity {
            uses: FxHashMap::default(),
        }
    }

    /// A single owned use of `name` at kind `kind`.
    pub fn var(name: Name, kind: Kind) -> Self {
        let mut uses = FxHashMap::default();
        uses.insert(name, Use::Normal(vec![kind]));
        Multiplicity { uses }
    }

    /// A single borrow of `name` at kind `kind`.
    pub fn borrow(name: Name, flavor: BorrowKind, kind: Kind) -> Self {
        let mut uses = FxHashMap::default();
        uses.insert(name, Use::Borrow(flavor, vec![kind]));
        Multiplicity { uses }
    }

    /// Look up the recorded use of a variable.
    pub fn get(&self, name: &Name) -> Option<&Use> {
        self.uses.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.uses.is_empty()
    }

    // ── Merges ──────────────────────────────────────────────────────────

    /// Compose with a sibling path whose effects occur in program order.
    ///
    /// `Shadow` is an identity. Two read borrows accumulate. Two owned uses
    /// accumulate and additionally constrain every use-site kind to
    /// `un never`: a variable consumed more than once must be unrestricted.
    /// Write borrows combine with nothing, and owned uses never mix with
    /// borrows.
    pub fn merge_seq(
        mut self,
        other: Multiplicity,
        ctx: &mut InferCtx,
    ) -> Result<Multiplicity, TypeError> {
        for (name, second) in other.uses {
            match self.uses.remove(&name) {
                None => {
                    self.uses.insert(name, second);
                }
                Some(first) => {
                    let merged = match (first, second) {
                        (Use::Shadow, u) | (u, Use::Shadow) => u,
                        (
                            Use::Borrow(BorrowKind::Read, mut ks1),
                            Use::Borrow(BorrowKind::Read, ks2),
                        ) => {
                            ks1.extend(ks2);
                            Use::Borrow(BorrowKind::Read, ks1)
                        }
                        (Use::Normal(mut ks1), Use::Normal(ks2)) => {
                            ks1.extend(ks2);
                            for k in &ks1 {
                                ctx.push_leq(k.clone(), Kind::un(Region::Never));
                            }
                            Use::Normal(ks1)
                        }
                        (first, second) => {
                            return Err(TypeError::UseMismatch {
                                name,
                                first,
                                second,
                            })
                        }
                    };
                    self.uses.insert(name, merged);
                }
            }
        }
        Ok(self)
    }

    /// Compose with an alternative path (match arms) -- only one arm runs.
    ///
    /// Same-shaped uses combine without the unrestricted constraint; any
    /// mixed combination fails.
    pub fn merge_par(mut self, other: Multiplicity) -> Result<Multiplicity, TypeError> {
        for (name, second) in other.uses {
            match self.uses.remove(&name) {
                None => {
                    self.uses.insert(name, second);
                }
                Some(first) => {
                    let merged = match (first, second) {
                        (Use::Shadow, Use::Shadow) => Use::Shadow,
                        (Use::Borrow(f1, mut ks1), Use::Borrow(f2, ks2)) if f1 == f2 => {
                            ks1.extend(ks2);
                            Use::Borrow(f1, ks1)
                        }
                        (Use::Normal(mut ks1), Use::Normal(ks2)) => {
                            ks1.extend(ks2);
                            Use::Normal(ks1)
                        }
                        (first, second) => {
                            return Err(TypeError::UseMismatch {
                                name,
                                first,
                                second,
                            })
                        }
                    };
                    self.uses.insert(name, merged);
                }
            }
        }
        Ok(self)
    }

    // ── Exits ───────────────────────────────────────────────────────────

    /// Discharge a binder of kind `kind` leaving scope.
    ///
    /// One owned use or borrows only: nothing to enforce. Zero or several
    /// owned uses require the binding itself to be discardable, `kind <=
    /// aff never`. (Several owned uses have already been forced unrestricted
    /// by the sequential merge.)
    pub fn exit_binder(&mut self, ctx: &mut InferCtx, name: &Name, kind: &Kind) {
        match self.uses.remove(name) {
            Some(Use::Normal(kinds)) if kinds.len() == 1 => {}
            None | Some(Use::Normal(_)) => {
                ctx.push_leq(kind.clone(), Kind::aff(Region::Never));
            }
            Some(Use::Borrow(..)) | Some(Use::Shadow) => {}
        }
    }

    /// Close the borrows of `names` at the end of a lexical scope: their
    /// entries downgrade to `Shadow`, so conflicting reuse outside the
    /// scope is rejected by the merges.
    pub fn exit_scope(&mut self, names: &[Name]) {
        for name in names {
            if let Some(entry) = self.uses.get_mut(name) {
                if matches!(entry, Use::Borrow(..)) {
                    *entry = Use::Shadow;
                }
            }
        }
    }

    /// Bound every captured owned use by the kind of the closing arrow:
    /// capturing a linear value forces a linear arrow.
    pub fn constrain_closure(&self, ctx: &mut InferCtx, arrow_kind: &Kind) {
        for entry in self.uses.values() {
            if let Use::Normal(kinds) = entry {
                for k in kinds {
                    ctx.push_leq(k.clone(), arrow_kind.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use affe_common::NameSupply;

    fn name(supply: &mut NameSupply) -> Name {
        supply.fresh("x")
    }

    #[test]
    fn seq_merge_of_two_owned_uses_forces_unrestricted() {
        let mut supply = NameSupply::new();
        let mut ctx = InferCtx::new();
        let x = name(&mut supply);
        let k = ctx.fresh_kind_var();

        let m1 = Multiplicity::var(x.clone(), k.clone());
        let m2 = Multiplicity::var(x.clone(), k.clone());
        let merged = m1.merge_seq(m2, &mut ctx).unwrap();

        match merged.get(&x).unwrap() {
            Use::Normal(ks) => assert_eq!(ks.len(), 2),
            other => panic!("expected Normal, got {:?}", other),
        }
        assert!(ctx
            .pending_constraints()
            .contains(&(k, Kind::un(Region::Never))));
    }

    #[test]
    fn seq_merge_read_and_write_borrows_fails() {
        let mut supply = NameSupply::new();
        let mut ctx = InferCtx::new();
        let x = name(&mut supply);
        let k1 = ctx.fresh_kind_var();
        let k2 = ctx.fresh_kind_var();

        let m1 = Multiplicity::borrow(x.clone(), BorrowKind::Read, k1);
        let m2 = Multiplicity::borrow(x.clone(), BorrowKind::Write, k2);
        match m1.merge_seq(m2, &mut ctx).unwrap_err() {
            TypeError::UseMismatch { name, first, second } => {
                assert_eq!(name, x);
                assert!(matches!(first, Use::Borrow(BorrowKind::Read, _)));
                assert!(matches!(second, Use::Borrow(BorrowKind::Write, _)));
            }
            other => panic!("expected UseMismatch, got {:?}", other),
        }
    }

    #[test]
    fn seq_merge_two_write_borrows_fails() {
        let mut supply = NameSupply::new();
        let mut ctx = InferCtx::new();
        let x = name(&mut supply);
        let k1 = ctx.fresh_kind_var();
        let k2 = ctx.fresh_kind_var();

        let m1 = Multiplicity::borrow(x.clone(), BorrowKind::Write, k1);
        let m2 = Multiplicity::borrow(x, BorrowKind::Write, k2);
        assert!(m1.merge_seq(m2, &mut ctx).is_err());
    }

    #[test]
    fn seq_merge_owned_use_and_borrow_fails() {
        let mut supply = NameSupply::new();
        let mut ctx = InferCtx::new();
        let x = name(&mut supply);
        let k1 = ctx.fresh_kind_var();
        let k2 = ctx.fresh_kind_var();

        let m1 = Multiplicity::var(x.clone(), k1);
        let m2 = Multiplicity::borrow(x, BorrowKind::Read, k2);
        assert!(m1.merge_seq(m2, &mut ctx).is_err());
    }

    #[test]
    fn seq_merge_shadow_is_commutative_identity() {
        let mut supply = NameSupply::new();
        let mut ctx = InferCtx::new();
        let x = name(&mut supply);
        let k = ctx.fresh_kind_var();

        let mut shadowed = Multiplicity::borrow(x.clone(), BorrowKind::Read, k.clone());
        shadowed.exit_scope(std::slice::from_ref(&x));
        assert_eq!(shadowed.get(&x), Some(&Use::Shadow));

        let owned = Multiplicity::var(x.clone(), k.clone());
        let left = shadowed
            .clone()
            .merge_seq(owned.clone(), &mut ctx)
            .unwrap();
        let right = owned.merge_seq(shadowed, &mut ctx).unwrap();
        assert_eq!(left.get(&x), right.get(&x));
        assert!(matches!(left.get(&x), Some(Use::Normal(_))));
    }

    #[test]
    fn seq_merge_read_borrows_accumulate_without_constraint() {
        let mut supply = NameSupply::new();
        let mut ctx = InferCtx::new();
        let x = name(&mut supply);
        let k1 = ctx.fresh_kind_var();
        let k2 = ctx.fresh_kind_var();

        let m1 = Multiplicity::borrow(x.clone(), BorrowKind::Read, k1);
        let m2 = Multiplicity::borrow(x.clone(), BorrowKind::Read, k2);
        let before = ctx.pending_constraints().len();
        let merged = m1.merge_seq(m2, &mut ctx).unwrap();
        assert_eq!(ctx.pending_constraints().len(), before);
        match merged.get(&x).unwrap() {
            Use::Borrow(BorrowKind::Read, ks) => assert_eq!(ks.len(), 2),
            other => panic!("expected read borrow, got {:?}", other),
        }
    }

    #[test]
    fn par_merge_does_not_force_unrestricted() {
        let mut supply = NameSupply::new();
        let mut ctx = InferCtx::new();
        let x = name(&mut supply);
        let k = ctx.fresh_kind_var();

        let m1 = Multiplicity::var(x.clone(), k.clone());
        let m2 = Multiplicity::var(x.clone(), k);
        let merged = m1.merge_par(m2).unwrap();
        assert!(ctx.pending_constraints().is_empty());
        assert!(matches!(merged.get(&x), Some(Use::Normal(ks)) if ks.len() == 2));
    }

    #[test]
    fn par_merge_rejects_mixed_shapes() {
        let mut supply = NameSupply::new();
        let mut ctx = InferCtx::new();
        let x = name(&mut supply);
        let k1 = ctx.fresh_kind_var();
        let k2 = ctx.fresh_kind_var();

        let m1 = Multiplicity::var(x.clone(), k1);
        let m2 = Multiplicity::borrow(x, BorrowKind::Read, k2);
        assert!(m1.merge_par(m2).is_err());
    }

    #[test]
    fn par_merge_is_idempotent_on_identical_shapes() {
        let mut supply = NameSupply::new();
        let mut ctx = InferCtx::new();
        let x = name(&mut supply);
        let k = ctx.fresh_kind_var();

        let m1 = Multiplicity::borrow(x.clone(), BorrowKind::Write, k.clone());
        let m2 = Multiplicity::borrow(x.clone(), BorrowKind::Write, k);
        let merged = m1.merge_par(m2).unwrap();
        assert!(matches!(
            merged.get(&x),
            Some(Use::Borrow(BorrowKind::Write, _))
        ));
    }

    #[test]
    fn exit_binder_unused_requires_discardable() {
        let mut supply = NameSupply::new();
        let mut ctx = InferCtx::new();
        let x = name(&mut supply);
        let k = ctx.fresh_kind_var();

        let mut m = Multiplicity::new();
        m.exit_binder(&mut ctx, &x, &k);
        assert!(ctx
            .pending_constraints()
            .contains(&(k, Kind::aff(Region::Never))));
    }

    #[test]
    fn exit_binder_single_use_is_free() {
        let mut supply = NameSupply::new();
        let mut ctx = InferCtx::new();
        let x = name(&mut supply);
        let k = ctx.fresh_kind_var();

        let mut m = Multiplicity::var(x.clone(), k.clone());
        m.exit_binder(&mut ctx, &x, &k);
        assert!(ctx.pending_constraints().is_empty());
        assert!(m.get(&x).is_none());
    }

    #[test]
    fn constrain_closure_bounds_captured_uses() {
        let mut supply = NameSupply::new();
        let mut ctx = InferCtx::new();
        let x = name(&mut supply);
        let k = ctx.fresh_kind_var();
        let arrow = ctx.fresh_kind_var();

        let m = Multiplicity::var(x, k.clone());
        m.constrain_closure(&mut ctx, &arrow);
        assert!(ctx.pending_constraints().contains(&(k, arrow)));
    }
}
