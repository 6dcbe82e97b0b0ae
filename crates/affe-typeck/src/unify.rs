//! Two-tier unification engine.
//!
//! Implements the core unification algorithm over `ena` union-find tables,
//! one tier for types and one for usage kinds. Supports occurs check
//! (infinite type detection), level-based generalization (levels only ever
//! decrease along links), per-variable kind tracking, kind synthesis for
//! types, and scheme instantiation with call-local substitution tables.

use ena::unify::InPlaceUnificationTable;

use crate::env::Env;
use crate::error::{ConstraintOrigin, TypeError};
use crate::kind::{Kind, KindConst, KindVar};
use crate::ty::{Scheme, Ty, TyVar};

/// The inference context -- owns both unification tables, level state, and
/// the pending kind-constraint list.
///
/// All inference happens through this context. It creates fresh variables at
/// the current level, unifies types and kinds, synthesises the kind of a
/// type, and instantiates schemes. Kind inequalities produced along the way
/// accumulate in `pending` until the solver canonicalises them.
pub struct InferCtx {
    /// Union-find table for type variables.
    ty_table: InPlaceUnificationTable<TyVar>,
    /// Union-find table for kind variables.
    kind_table: InPlaceUnificationTable<KindVar>,
    /// Level at which each type variable was created, indexed by `TyVar.0`.
    ty_levels: Vec<u32>,
    /// Kind assigned to each type variable at creation, indexed by `TyVar.0`.
    ty_kinds: Vec<Kind>,
    /// Level at which each kind variable was created, indexed by `KindVar.0`.
    kind_levels: Vec<u32>,
    /// Current let-nesting level.
    level: u32,
    /// Kind inequalities awaiting canonicalisation.
    pub(crate) pending: Vec<(Kind, Kind)>,
}

impl InferCtx {
    /// Create a new, empty inference context at level 0.
    pub fn new() -> Self {
        InferCtx {
            ty_table: InPlaceUnificationTable::new(),
            kind_table: InPlaceUnificationTable::new(),
            ty_levels: Vec::new(),
            ty_kinds: Vec::new(),
            kind_levels: Vec::new(),
            level: 0,
            pending: Vec::new(),
        }
    }

    // ── Levels ──────────────────────────────────────────────────────────

    /// Enter a new binding level (increases nesting depth).
    pub fn enter_level(&mut self) {
        self.level += 1;
    }

    /// Leave the current binding level.
    pub fn leave_level(&mut self) {
        debug_assert!(self.level > 0, "cannot leave level 0");
        self.level -= 1;
    }

    /// Current nesting level.
    pub fn current_level(&self) -> u32 {
        self.level
    }

    // ── Variable creation ───────────────────────────────────────────────

    /// Create a fresh kind variable at the current level.
    pub fn fresh_kind_var(&mut self) -> Kind {
        let var = self.kind_table.new_key(None);
        while self.kind_levels.len() <= var.0 as usize {
            self.kind_levels.push(0);
        }
        self.kind_levels[var.0 as usize] = self.level;
        Kind::Var(var)
    }

    /// Create a fresh type variable at the current level, with a fresh kind.
    pub fn fresh_ty_var(&mut self) -> Ty {
        let kind = self.fresh_kind_var();
        self.fresh_ty_var_with_kind(kind)
    }

    /// Create a fresh type variable carrying the given kind.
    pub fn fresh_ty_var_with_kind(&mut self, kind: Kind) -> Ty {
        let var = self.ty_table.new_key(None);
        while self.ty_levels.len() <= var.0 as usize {
            self.ty_levels.push(0);
            self.ty_kinds.push(Kind::Const(KindConst::BOTTOM));
        }
        self.ty_levels[var.0 as usize] = self.level;
        self.ty_kinds[var.0 as usize] = kind;
        Ty::Var(var)
    }

    // ── Pending constraints ─────────────────────────────────────────────

    /// Record the inequality `lower <= upper` for the next solver pass.
    pub fn push_leq(&mut self, lower: Kind, upper: Kind) {
        self.pending.push((lower, upper));
    }

    /// The constraints awaiting (or surviving) canonicalisation.
    pub fn pending_constraints(&self) -> &[(Kind, Kind)] {
        &self.pending
    }

    // ── Resolution ──────────────────────────────────────────────────────

    /// Resolve a kind through link chains. Unbound variables normalise to
    /// their union-find root so equal cells compare equal.
    pub fn resolve_kind(&mut self, kind: &Kind) -> Kind {
        match kind {
            Kind::Var(v) => match self.kind_table.probe_value(*v) {
                Some(inner) => self.resolve_kind(&inner),
                None => Kind::Var(self.kind_table.find(*v)),
            },
            other => other.clone(),
        }
    }

    /// Resolve a type through link chains, recursively, normalising unbound
    /// variables to their root keys and resolving embedded kinds.
    pub fn resolve(&mut self, ty: Ty) -> Ty {
        match ty {
            Ty::Var(v) => match self.ty_table.probe_value(v) {
                Some(inner) => self.resolve(inner),
                None => Ty::Var(self.ty_table.find(v)),
            },
            Ty::Gen(i) => Ty::Gen(i),
            Ty::App(name, args) => {
                Ty::App(name, args.into_iter().map(|a| self.resolve(a)).collect())
            }
            Ty::Tuple(elems) => {
                Ty::Tuple(elems.into_iter().map(|e| self.resolve(e)).collect())
            }
            Ty::Arrow(param, kind, ret) => {
                let param = Box::new(self.resolve(*param));
                let kind = self.resolve_kind(&kind);
                let ret = Box::new(self.resolve(*ret));
                Ty::Arrow(param, kind, ret)
            }
            Ty::Borrow(flavor, kind, inner) => {
                let kind = self.resolve_kind(&kind);
                let inner = Box::new(self.resolve(*inner));
                Ty::Borrow(flavor, kind, inner)
            }
        }
    }

    /// The level of a type variable, read at its root.
    pub fn ty_level(&mut self, v: TyVar) -> u32 {
        let root = self.ty_table.find(v);
        self.ty_levels[root.0 as usize]
    }

    /// The level of a kind variable, read at its root.
    pub fn kind_level(&mut self, v: KindVar) -> u32 {
        let root = self.kind_table.find(v);
        self.kind_levels[root.0 as usize]
    }

    /// The kind associated with a type variable, resolved.
    pub fn var_kind(&mut self, v: TyVar) -> Kind {
        let root = self.ty_table.find(v);
        let kind = self.ty_kinds[root.0 as usize].clone();
        self.resolve_kind(&kind)
    }

    // ── Occurs check and level adjustment ───────────────────────────────

    /// Whether `var` occurs in `ty`. `ty` must already be resolved.
    fn occurs_in(&self, var: TyVar, ty: &Ty) -> bool {
        match ty {
            Ty::Var(v) => *v == var,
            Ty::Gen(_) => false,
            Ty::App(_, args) | Ty::Tuple(args) => {
                args.iter().any(|a| self.occurs_in(var, a))
            }
            Ty::Arrow(param, _, ret) => {
                self.occurs_in(var, param) || self.occurs_in(var, ret)
            }
            Ty::Borrow(_, _, inner) => self.occurs_in(var, inner),
        }
    }

    /// Lower the level of every unbound kind variable in `kind` to at most
    /// `level`.
    fn adjust_kind_level(&mut self, level: u32, kind: &Kind) {
        if let Kind::Var(v) = self.resolve_kind(kind) {
            let lowered = self.kind_level(v).min(level);
            let root = self.kind_table.find(v);
            self.kind_levels[root.0 as usize] = lowered;
        }
    }

    /// Lower the level of every unbound variable (type and kind) in `ty` to
    /// at most `level`. `ty` must already be resolved.
    fn adjust_ty_levels(&mut self, level: u32, ty: &Ty) {
        match ty {
            Ty::Var(v) => {
                let lowered = self.ty_level(*v).min(level);
                let root = self.ty_table.find(*v);
                self.ty_levels[root.0 as usize] = lowered;
                let kind = self.var_kind(*v);
                self.adjust_kind_level(level, &kind);
            }
            Ty::Gen(_) => {}
            Ty::App(_, args) | Ty::Tuple(args) => {
                for a in args {
                    self.adjust_ty_levels(level, a);
                }
            }
            Ty::Arrow(param, kind, ret) => {
                self.adjust_kind_level(level, kind);
                self.adjust_ty_levels(level, param);
                self.adjust_ty_levels(level, ret);
            }
            Ty::Borrow(_, kind, inner) => {
                self.adjust_kind_level(level, kind);
                self.adjust_ty_levels(level, inner);
            }
        }
    }

    // ── Kind unification ────────────────────────────────────────────────

    /// Unify two kinds, making them equal.
    ///
    /// Kinds are non-recursive, so no occurs check is needed. Two distinct
    /// constants fail with `KindMismatch`.
    pub fn unify_kind(
        &mut self,
        a: Kind,
        b: Kind,
        origin: &ConstraintOrigin,
    ) -> Result<(), TypeError> {
        let a = self.resolve_kind(&a);
        let b = self.resolve_kind(&b);

        match (a, b) {
            (Kind::Var(v1), Kind::Var(v2)) if v1 == v2 => Ok(()),

            (Kind::Var(v1), Kind::Var(v2)) => {
                let level = self.kind_level(v1).min(self.kind_level(v2));
                self.kind_table
                    .unify_var_var(v1, v2)
                    .expect("unifying two unbound kind vars should not fail");
                self.kind_levels[v1.0 as usize] = level;
                self.kind_levels[v2.0 as usize] = level;
                Ok(())
            }

            (Kind::Gen(_), _) | (_, Kind::Gen(_)) => {
                unreachable!("generic kind variable reached unification; schemes are instantiated before use")
            }

            (Kind::Var(v), kind) | (kind, Kind::Var(v)) => {
                self.kind_table
                    .unify_var_value(v, Some(kind))
                    .expect("binding an unbound kind var should not fail");
                Ok(())
            }

            (Kind::Const(c1), Kind::Const(c2)) => {
                if c1 == c2 {
                    Ok(())
                } else {
                    Err(TypeError::KindMismatch {
                        expected: Kind::Const(c1),
                        found: Kind::Const(c2),
                        origin: origin.clone(),
                    })
                }
            }
        }
    }

    // ── Type unification ────────────────────────────────────────────────

    /// Unify two types, making them equal.
    ///
    /// Both types are resolved through the union-find, then structurally
    /// compared. Arrows are contravariant in the parameter; borrows of the
    /// same flavour equate their kinds through the pending constraint list
    /// and recurse on the payload; binding a variable equates its kind with
    /// the kind of the bound type.
    pub fn unify(
        &mut self,
        env: &Env,
        a: Ty,
        b: Ty,
        origin: &ConstraintOrigin,
    ) -> Result<(), TypeError> {
        let a = self.resolve(a);
        let b = self.resolve(b);

        match (a, b) {
            (Ty::Var(v1), Ty::Var(v2)) if v1 == v2 => Ok(()),

            (Ty::Var(v1), Ty::Var(v2)) => {
                let k1 = self.var_kind(v1);
                let k2 = self.var_kind(v2);
                self.unify_kind(k1, k2, origin)?;
                let level = self.ty_level(v1).min(self.ty_level(v2));
                self.ty_table
                    .unify_var_var(v1, v2)
                    .expect("unifying two unbound type vars should not fail");
                self.ty_levels[v1.0 as usize] = level;
                self.ty_levels[v2.0 as usize] = level;
                Ok(())
            }

            (Ty::Gen(_), _) | (_, Ty::Gen(_)) => {
                unreachable!("generic type variable reached unification; schemes are instantiated before use")
            }

            (Ty::Var(v), ty) | (ty, Ty::Var(v)) => {
                if self.occurs_in(v, &ty) {
                    return Err(TypeError::RecursiveType {
                        var: v,
                        ty,
                        origin: origin.clone(),
                    });
                }
                let level = self.ty_level(v);
                self.adjust_ty_levels(level, &ty);
                let var_kind = self.var_kind(v);
                let ty_kind = self.kind_of(env, &ty, origin)?;
                self.unify_kind(var_kind, ty_kind, origin)?;
                self.ty_table
                    .unify_var_value(v, Some(ty))
                    .expect("binding a type var after occurs check should not fail");
                Ok(())
            }

            (Ty::App(c1, args1), Ty::App(c2, args2)) => {
                if c1 != c2 || args1.len() != args2.len() {
                    return Err(TypeError::TypeMismatch {
                        expected: Ty::App(c1, args1),
                        found: Ty::App(c2, args2),
                        origin: origin.clone(),
                    });
                }
                for (a, b) in args1.into_iter().zip(args2) {
                    self.unify(env, a, b, origin)?;
                }
                Ok(())
            }

            (Ty::Tuple(elems1), Ty::Tuple(elems2)) => {
                if elems1.len() != elems2.len() {
                    return Err(TypeError::TypeMismatch {
                        expected: Ty::Tuple(elems1),
                        found: Ty::Tuple(elems2),
                        origin: origin.clone(),
                    });
                }
                for (a, b) in elems1.into_iter().zip(elems2) {
                    self.unify(env, a, b, origin)?;
                }
                Ok(())
            }

            (Ty::Arrow(p1, k1, r1), Ty::Arrow(p2, k2, r2)) => {
                self.unify(env, *p2, *p1, origin)?;
                self.unify_kind(k1, k2, origin)?;
                self.unify(env, *r1, *r2, origin)
            }

            (Ty::Borrow(f1, k1, t1), Ty::Borrow(f2, k2, t2)) => {
                if f1 != f2 {
                    return Err(TypeError::TypeMismatch {
                        expected: Ty::Borrow(f1, k1, t1),
                        found: Ty::Borrow(f2, k2, t2),
                        origin: origin.clone(),
                    });
                }
                self.pending.push((k1.clone(), k2.clone()));
                self.pending.push((k2, k1));
                self.unify(env, *t1, *t2, origin)
            }

            (a, b) => Err(TypeError::TypeMismatch {
                expected: a,
                found: b,
                origin: origin.clone(),
            }),
        }
    }

    // ── Kind synthesis ──────────────────────────────────────────────────

    /// Synthesise the kind of a type.
    ///
    /// Constructor applications instantiate the constructor's kind scheme
    /// and unify parameter kinds with the arguments' synthesised kinds;
    /// tuple elements are bounded above by a fresh joined kind; arrows and
    /// borrows are first-class in their own kind.
    pub fn kind_of(
        &mut self,
        env: &Env,
        ty: &Ty,
        origin: &ConstraintOrigin,
    ) -> Result<Kind, TypeError> {
        let ty = self.resolve(ty.clone());
        match ty {
            Ty::Var(v) => Ok(self.var_kind(v)),
            Ty::Gen(_) => {
                unreachable!("generic type variable reached kind synthesis; schemes are instantiated before use")
            }
            Ty::Arrow(_, kind, _) | Ty::Borrow(_, kind, _) => Ok(kind),
            Ty::Tuple(elems) => {
                let joined = self.fresh_kind_var();
                for e in &elems {
                    let ke = self.kind_of(env, e, origin)?;
                    self.pending.push((ke, joined.clone()));
                }
                Ok(joined)
            }
            Ty::App(name, args) => {
                let scheme = env
                    .lookup_type(&name)
                    .ok_or_else(|| TypeError::UnknownType { name: name.clone() })?
                    .clone();
                if scheme.params.len() != args.len() {
                    return Err(TypeError::ArityMismatch {
                        expected: scheme.params.len(),
                        found: args.len(),
                        origin: origin.clone(),
                    });
                }
                let kmap: Vec<Kind> =
                    (0..scheme.kvars).map(|_| self.fresh_kind_var()).collect();
                for (lo, hi) in &scheme.constraint {
                    self.pending
                        .push((subst_kind(lo, &kmap), subst_kind(hi, &kmap)));
                }
                for (param, arg) in scheme.params.iter().zip(args.iter()) {
                    let ka = self.kind_of(env, arg, origin)?;
                    self.unify_kind(ka, subst_kind(param, &kmap), origin)?;
                }
                Ok(subst_kind(&scheme.ret, &kmap))
            }
        }
    }

    // ── Instantiation ───────────────────────────────────────────────────

    /// Instantiate a scheme with fresh variables.
    ///
    /// Allocates call-local substitution tables mapping each quantified kind
    /// variable to a fresh kind variable and each quantified type variable
    /// to a fresh type variable of the substituted kind; the scheme's
    /// constraint is re-emitted under the substitution.
    pub fn instantiate(&mut self, scheme: &Scheme) -> Ty {
        if scheme.is_mono() && scheme.constraint.is_empty() {
            return scheme.ty.clone();
        }

        let kmap: Vec<Kind> = (0..scheme.kvars).map(|_| self.fresh_kind_var()).collect();
        let tmap: Vec<Ty> = scheme
            .vars
            .iter()
            .map(|kind| {
                let k = subst_kind(kind, &kmap);
                self.fresh_ty_var_with_kind(k)
            })
            .collect();
        for (lo, hi) in &scheme.constraint {
            self.pending
                .push((subst_kind(lo, &kmap), subst_kind(hi, &kmap)));
        }
        subst_ty(&scheme.ty, &tmap, &kmap)
    }
}

impl Default for InferCtx {
    fn default() -> Self {
        Self::new()
    }
}

/// Replace quantified kind variables by their substitutes.
pub(crate) fn subst_kind(kind: &Kind, kmap: &[Kind]) -> Kind {
    match kind {
        Kind::Gen(i) => kmap[*i as usize].clone(),
        other => other.clone(),
    }
}

/// Replace quantified type and kind variables by their substitutes.
pub(crate) fn subst_ty(ty: &Ty, tmap: &[Ty], kmap: &[Kind]) -> Ty {
    match ty {
        Ty::Gen(i) => tmap[*i as usize].clone(),
        Ty::Var(_) => ty.clone(),
        Ty::App(name, args) => Ty::App(
            name.clone(),
            args.iter().map(|a| subst_ty(a, tmap, kmap)).collect(),
        ),
        Ty::Tuple(elems) => {
            Ty::Tuple(elems.iter().map(|e| subst_ty(e, tmap, kmap)).collect())
        }
        Ty::Arrow(param, kind, ret) => Ty::Arrow(
            Box::new(subst_ty(param, tmap, kmap)),
            subst_kind(kind, kmap),
            Box::new(subst_ty(ret, tmap, kmap)),
        ),
        Ty::Borrow(flavor, kind, inner) => Ty::Borrow(
            *flavor,
            subst_kind(kind, kmap),
            Box::new(subst_ty(inner, tmap, kmap)),
        ),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins;
    use crate::kind::Region;
    use crate::ty::BorrowKind;
    use affe_common::NameSupply;

    fn setup() -> (InferCtx, Env) {
        let mut supply = NameSupply::new();
        let env = builtins::initial_env(&mut supply);
        (InferCtx::new(), env)
    }

    fn origin() -> ConstraintOrigin {
        ConstraintOrigin::Builtin
    }

    fn int_ty(env: &Env) -> Ty {
        Ty::app(env.prim().int.clone(), vec![])
    }

    #[test]
    fn unify_two_fresh_vars_then_bind() {
        let (mut ctx, env) = setup();
        let a = ctx.fresh_ty_var();
        let b = ctx.fresh_ty_var();

        assert!(ctx.unify(&env, a.clone(), b.clone(), &origin()).is_ok());
        assert!(ctx.unify(&env, a.clone(), int_ty(&env), &origin()).is_ok());

        let ra = ctx.resolve(a);
        let rb = ctx.resolve(b);
        assert_eq!(ra, int_ty(&env));
        assert_eq!(rb, int_ty(&env));
    }

    #[test]
    fn unify_mismatch() {
        let (mut ctx, env) = setup();
        let int = int_ty(&env);
        let unit = Ty::app(env.prim().unit.clone(), vec![]);

        let result = ctx.unify(&env, int.clone(), unit, &origin());
        match result.unwrap_err() {
            TypeError::TypeMismatch { expected, .. } => assert_eq!(expected, int),
            other => panic!("expected TypeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn occurs_check_rejects_recursive_type() {
        let (mut ctx, env) = setup();
        let a = ctx.fresh_ty_var();
        let k = ctx.fresh_kind_var();
        let arrow = Ty::arrow(a.clone(), k, int_ty(&env));

        let result = ctx.unify(&env, a, arrow, &origin());
        match result.unwrap_err() {
            TypeError::RecursiveType { .. } => {}
            other => panic!("expected RecursiveType, got {:?}", other),
        }
    }

    #[test]
    fn kind_constants_must_match() {
        let mut ctx = InferCtx::new();
        let result = ctx.unify_kind(
            Kind::un(Region::Global),
            Kind::lin(Region::Never),
            &origin(),
        );
        match result.unwrap_err() {
            TypeError::KindMismatch { .. } => {}
            other => panic!("expected KindMismatch, got {:?}", other),
        }
    }

    #[test]
    fn kind_var_binds_to_constant() {
        let mut ctx = InferCtx::new();
        let k = ctx.fresh_kind_var();
        ctx.unify_kind(k.clone(), Kind::aff(Region::Global), &origin())
            .unwrap();
        assert_eq!(ctx.resolve_kind(&k), Kind::aff(Region::Global));
    }

    #[test]
    fn unifying_type_vars_links_their_kinds() {
        let (mut ctx, env) = setup();
        let a = ctx.fresh_ty_var();
        let b = ctx.fresh_ty_var();
        ctx.unify(&env, a.clone(), b.clone(), &origin()).unwrap();

        let Ty::Var(va) = a else { unreachable!() };
        let ka = ctx.var_kind(va);
        ctx.unify_kind(ka, Kind::lin(Region::Global), &origin())
            .unwrap();

        let Ty::Var(vb) = b else { unreachable!() };
        assert_eq!(ctx.var_kind(vb), Kind::lin(Region::Global));
    }

    #[test]
    fn borrow_flavours_must_match() {
        let (mut ctx, env) = setup();
        let k1 = ctx.fresh_kind_var();
        let k2 = ctx.fresh_kind_var();
        let read = Ty::borrow(BorrowKind::Read, k1, int_ty(&env));
        let write = Ty::borrow(BorrowKind::Write, k2, int_ty(&env));

        assert!(ctx.unify(&env, read, write, &origin()).is_err());
    }

    #[test]
    fn borrow_unification_equates_kinds_via_pending() {
        let (mut ctx, env) = setup();
        let k1 = ctx.fresh_kind_var();
        let k2 = ctx.fresh_kind_var();
        let b1 = Ty::borrow(BorrowKind::Read, k1.clone(), int_ty(&env));
        let b2 = Ty::borrow(BorrowKind::Read, k2.clone(), int_ty(&env));

        ctx.unify(&env, b1, b2, &origin()).unwrap();
        let pending = ctx.pending_constraints();
        assert!(pending.contains(&(k1.clone(), k2.clone())));
        assert!(pending.contains(&(k2, k1)));
    }

    #[test]
    fn binding_a_var_lowers_levels() {
        let (mut ctx, env) = setup();
        let outer = ctx.fresh_ty_var();
        ctx.enter_level();
        let inner = ctx.fresh_ty_var();
        let Ty::Var(vi) = inner.clone() else { unreachable!() };
        assert_eq!(ctx.ty_level(vi), 1);

        ctx.unify(&env, outer, Ty::Tuple(vec![inner]), &origin())
            .unwrap();
        assert_eq!(ctx.ty_level(vi), 0);
        ctx.leave_level();
    }

    #[test]
    fn instantiate_produces_fresh_vars_and_constraints() {
        let (mut ctx, _env) = setup();
        let scheme = Scheme {
            kvars: 1,
            vars: vec![Kind::Gen(0)],
            constraint: vec![(Kind::Gen(0), Kind::un(Region::Never))],
            ty: Ty::arrow(Ty::Gen(0), Kind::Gen(0), Ty::Gen(0)),
        };

        let t1 = ctx.instantiate(&scheme);
        let t2 = ctx.instantiate(&scheme);
        match (&t1, &t2) {
            (Ty::Arrow(p1, _, _), Ty::Arrow(p2, _, _)) => {
                assert_ne!(p1, p2, "instantiations should produce different vars");
            }
            _ => panic!("expected arrow types"),
        }
        assert_eq!(ctx.pending_constraints().len(), 2);
    }

    #[test]
    fn kind_of_tuple_bounds_elements() {
        let (mut ctx, env) = setup();
        let a = ctx.fresh_ty_var();
        let tuple = Ty::Tuple(vec![a.clone(), int_ty(&env)]);
        let k = ctx.kind_of(&env, &tuple, &origin()).unwrap();
        assert!(matches!(k, Kind::Var(_)));
        // one bound per element
        assert_eq!(ctx.pending_constraints().len(), 2);
    }

    #[test]
    fn kind_of_unknown_constructor_fails() {
        let (mut ctx, env) = setup();
        // Tag chosen well past any tag `setup`'s internal NameSupply could have
        // minted, so this can never alias a real primitive by coincidence.
        let ghost = affe_common::Name::new("ghost", u32::MAX);
        let result = ctx.kind_of(&env, &Ty::app(ghost, vec![]), &origin());
        assert!(matches!(result, Err(TypeError::UnknownType { .. })));
    }

    #[test]
    fn kind_of_checks_constructor_arity() {
        let (mut ctx, env) = setup();
        let int = env.prim().int.clone();
        let bad = Ty::app(int, vec![Ty::Gen(0)]);
        // int takes no arguments
        let result = ctx.kind_of(&env, &bad, &origin());
        match result.unwrap_err() {
            TypeError::ArityMismatch { expected, found, .. } => {
                assert_eq!((expected, found), (0, 1));
            }
            other => panic!("expected ArityMismatch, got {:?}", other),
        }
    }
}
