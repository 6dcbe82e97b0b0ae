//! Value-restricted generalisation.
//!
//! Lifts the free unification variables of an inferred type -- those whose
//! level exceeds the current one -- into quantified scheme variables, after
//! simplifying the constraint set with variance information. Constraints
//! wholly over quantified variables and constants move into the scheme;
//! the rest stay pending. Expansive right-hand sides are wrapped in a
//! trivial scheme instead (the value restriction).

use rustc_hash::{FxHashMap, FxHashSet};

use affe_ast::Expr;

use crate::constraint::{solve, SolveOptions};
use crate::env::Env;
use crate::error::TypeError;
use crate::kind::{Kind, KindScheme, KindVar};
use crate::ty::{Scheme, Ty, TyVar};
use crate::unify::InferCtx;
use crate::variance::VarianceMap;

/// The syntactic class of expressions that cannot allocate mutable state:
/// only these may be generalised.
pub fn is_nonexpansive(expr: &Expr) -> bool {
    match expr {
        Expr::Constant(..)
        | Expr::Var(..)
        | Expr::Constructor(..)
        | Expr::Borrow(..)
        | Expr::ReBorrow(..)
        | Expr::Lambda(..) => true,
        Expr::App(callee, args, _) => {
            matches!(callee.as_ref(), Expr::Constructor(..))
                && args.iter().all(is_nonexpansive)
        }
        Expr::Tuple(elems, _) => elems.iter().all(is_nonexpansive),
        Expr::Array(elems, _) => elems.is_empty(),
        Expr::Let(_, _, value, body, _) => is_nonexpansive(value) && is_nonexpansive(body),
        Expr::Match(_, scrutinee, arms, _) => {
            is_nonexpansive(scrutinee) && arms.iter().all(|arm| is_nonexpansive(&arm.body))
        }
        Expr::Region(_, body, _) => is_nonexpansive(body),
    }
}

/// Whether a type already contains quantified variables.
fn contains_generic(ty: &Ty) -> bool {
    match ty {
        Ty::Gen(_) => true,
        Ty::Var(_) => false,
        Ty::App(_, args) | Ty::Tuple(args) => args.iter().any(contains_generic),
        Ty::Arrow(param, kind, ret) => {
            matches!(kind, Kind::Gen(_)) || contains_generic(param) || contains_generic(ret)
        }
        Ty::Borrow(_, kind, inner) => {
            matches!(kind, Kind::Gen(_)) || contains_generic(inner)
        }
    }
}

/// Add the kind variables free in `ty` to `out`. `ty` need not be resolved.
pub(crate) fn free_kind_vars(ctx: &mut InferCtx, ty: &Ty, out: &mut FxHashSet<KindVar>) {
    let resolved = ctx.resolve(ty.clone());
    free_kind_vars_resolved(ctx, &resolved, out);
}

fn note_kind(ctx: &mut InferCtx, kind: &Kind, out: &mut FxHashSet<KindVar>) {
    if let Kind::Var(v) = ctx.resolve_kind(kind) {
        out.insert(v);
    }
}

fn free_kind_vars_resolved(ctx: &mut InferCtx, ty: &Ty, out: &mut FxHashSet<KindVar>) {
    match ty {
        Ty::Var(v) => {
            let kind = ctx.var_kind(*v);
            note_kind(ctx, &kind, out);
        }
        Ty::Gen(_) => {}
        Ty::App(_, args) | Ty::Tuple(args) => {
            for a in args {
                free_kind_vars_resolved(ctx, a, out);
            }
        }
        Ty::Arrow(param, kind, ret) => {
            note_kind(ctx, kind, out);
            free_kind_vars_resolved(ctx, param, out);
            free_kind_vars_resolved(ctx, ret, out);
        }
        Ty::Borrow(_, kind, inner) => {
            note_kind(ctx, kind, out);
            free_kind_vars_resolved(ctx, inner, out);
        }
    }
}

/// Collect, in first-appearance order, the type and kind variables of `ty`
/// eligible for quantification (level strictly above `level`).
fn collect_candidates(
    ctx: &mut InferCtx,
    ty: &Ty,
    level: u32,
    ty_order: &mut Vec<TyVar>,
    kind_order: &mut Vec<KindVar>,
) {
    let note = |ctx: &mut InferCtx, kind: &Kind, kind_order: &mut Vec<KindVar>| {
        if let Kind::Var(v) = ctx.resolve_kind(kind) {
            if ctx.kind_level(v) > level && !kind_order.contains(&v) {
                kind_order.push(v);
            }
        }
    };
    match ty {
        Ty::Var(v) => {
            let kind = ctx.var_kind(*v);
            note(ctx, &kind, kind_order);
            if ctx.ty_level(*v) > level && !ty_order.contains(v) {
                ty_order.push(*v);
            }
        }
        Ty::Gen(_) => {}
        Ty::App(_, args) | Ty::Tuple(args) => {
            for a in args {
                collect_candidates(ctx, a, level, ty_order, kind_order);
            }
        }
        Ty::Arrow(param, kind, ret) => {
            note(ctx, kind, kind_order);
            collect_candidates(ctx, param, level, ty_order, kind_order);
            collect_candidates(ctx, ret, level, ty_order, kind_order);
        }
        Ty::Borrow(_, kind, inner) => {
            note(ctx, kind, kind_order);
            collect_candidates(ctx, inner, level, ty_order, kind_order);
        }
    }
}

fn freeze_kind(ctx: &mut InferCtx, kind: &Kind, kmap: &FxHashMap<KindVar, u32>) -> Kind {
    match ctx.resolve_kind(kind) {
        Kind::Var(v) => match kmap.get(&v) {
            Some(i) => Kind::Gen(*i),
            None => Kind::Var(v),
        },
        other => other,
    }
}

fn freeze_ty(
    ctx: &mut InferCtx,
    ty: &Ty,
    tmap: &FxHashMap<TyVar, u32>,
    kmap: &FxHashMap<KindVar, u32>,
) -> Ty {
    match ty {
        Ty::Var(v) => match tmap.get(v) {
            Some(i) => Ty::Gen(*i),
            None => Ty::Var(*v),
        },
        Ty::Gen(_) => unreachable!("generic variable in a type under generalisation"),
        Ty::App(name, args) => Ty::App(
            name.clone(),
            args.iter().map(|a| freeze_ty(ctx, a, tmap, kmap)).collect(),
        ),
        Ty::Tuple(elems) => Ty::Tuple(
            elems.iter().map(|e| freeze_ty(ctx, e, tmap, kmap)).collect(),
        ),
        Ty::Arrow(param, kind, ret) => Ty::Arrow(
            Box::new(freeze_ty(ctx, param, tmap, kmap)),
            freeze_kind(ctx, kind, kmap),
            Box::new(freeze_ty(ctx, ret, tmap, kmap)),
        ),
        Ty::Borrow(flavor, kind, inner) => Ty::Borrow(
            *flavor,
            freeze_kind(ctx, kind, kmap),
            Box::new(freeze_ty(ctx, inner, tmap, kmap)),
        ),
    }
}

/// Generalise `ty` at the current level.
///
/// With `gen` false (the right-hand side was expansive) the type is wrapped
/// in a trivial scheme and every constraint stays pending. Otherwise the
/// constraint set is simplified under the variance of `ty`, variables above
/// the current level are quantified and rewritten to sequential `Gen`
/// indices, and constraints wholly over quantified variables move into the
/// scheme.
pub fn generalize(
    ctx: &mut InferCtx,
    env: &Env,
    ty: Ty,
    gen: bool,
) -> Result<Scheme, TypeError> {
    let ty = ctx.resolve(ty);
    if contains_generic(&ty) {
        return Err(TypeError::AlreadyGeneralised { ty });
    }

    // Keep the variables still visible from the result or the environment.
    let mut keep: FxHashSet<KindVar> = FxHashSet::default();
    free_kind_vars(ctx, &ty, &mut keep);
    let env_bodies: Vec<Ty> = env.value_schemes().map(|s| s.ty.clone()).collect();
    for body in &env_bodies {
        free_kind_vars(ctx, body, &mut keep);
    }

    let level = ctx.current_level();
    let canonical = if gen {
        let variance = VarianceMap::of_type(ctx, &ty);
        solve(
            ctx,
            SolveOptions {
                keep: Some(&keep),
                variance: Some(&variance),
                gen_level: Some(level),
            },
        )?
    } else {
        solve(
            ctx,
            SolveOptions {
                keep: Some(&keep),
                variance: None,
                gen_level: None,
            },
        )?
    };

    // Compression may have bound kind variables; read the type again.
    let ty = ctx.resolve(ty);

    if !gen {
        ctx.pending = canonical;
        return Ok(Scheme::mono(ty));
    }

    let mut ty_order: Vec<TyVar> = Vec::new();
    let mut kind_order: Vec<KindVar> = Vec::new();
    collect_candidates(ctx, &ty, level, &mut ty_order, &mut kind_order);

    // A candidate constrained against a variable that stays monomorphic
    // cannot be quantified either; drop such candidates to a fixpoint.
    loop {
        let mut changed = false;
        for (lo, hi) in &canonical {
            if let (Kind::Var(a), Kind::Var(b)) = (lo, hi) {
                let qa = kind_order.contains(a);
                let qb = kind_order.contains(b);
                if qa != qb {
                    kind_order.retain(|v| *v != if qa { *a } else { *b });
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }

    let quantified = |kind: &Kind, order: &[KindVar]| match kind {
        Kind::Var(v) => order.contains(v),
        _ => true,
    };
    let mut scheme_constraint: Vec<(Kind, Kind)> = Vec::new();
    let mut outer: Vec<(Kind, Kind)> = Vec::new();
    for (lo, hi) in canonical {
        let has_var = matches!(lo, Kind::Var(_)) || matches!(hi, Kind::Var(_));
        if has_var && quantified(&lo, &kind_order) && quantified(&hi, &kind_order) {
            scheme_constraint.push((lo, hi));
        } else {
            outer.push((lo, hi));
        }
    }

    let tmap: FxHashMap<TyVar, u32> = ty_order
        .iter()
        .enumerate()
        .map(|(i, v)| (*v, i as u32))
        .collect();
    let kmap: FxHashMap<KindVar, u32> = kind_order
        .iter()
        .enumerate()
        .map(|(i, v)| (*v, i as u32))
        .collect();

    let body = freeze_ty(ctx, &ty, &tmap, &kmap);
    let vars: Vec<Kind> = ty_order
        .iter()
        .map(|v| {
            let kind = ctx.var_kind(*v);
            freeze_kind(ctx, &kind, &kmap)
        })
        .collect();
    let constraint: Vec<(Kind, Kind)> = scheme_constraint
        .into_iter()
        .map(|(lo, hi)| (freeze_kind(ctx, &lo, &kmap), freeze_kind(ctx, &hi, &kmap)))
        .collect();

    ctx.pending = outer;
    Ok(Scheme {
        kvars: kind_order.len(),
        vars,
        constraint,
        ty: body,
    })
}

/// Generalise a type constructor's kind signature: quantify the kind
/// variables of the parameter and result kinds above the current level and
/// partition the canonical constraints the same way `generalize` does.
pub fn generalize_kind_scheme(
    ctx: &mut InferCtx,
    param_kinds: Vec<Kind>,
    ret: Kind,
) -> Result<KindScheme, TypeError> {
    let canonical = solve(ctx, SolveOptions::default())?;
    let level = ctx.current_level();

    let params: Vec<Kind> = param_kinds
        .iter()
        .map(|k| ctx.resolve_kind(k))
        .collect();
    let ret = ctx.resolve_kind(&ret);

    let mut kind_order: Vec<KindVar> = Vec::new();
    for kind in params.iter().chain(std::iter::once(&ret)) {
        if let Kind::Var(v) = kind {
            if ctx.kind_level(*v) > level && !kind_order.contains(v) {
                kind_order.push(*v);
            }
        }
    }

    loop {
        let mut changed = false;
        for (lo, hi) in &canonical {
            if let (Kind::Var(a), Kind::Var(b)) = (lo, hi) {
                let qa = kind_order.contains(a);
                let qb = kind_order.contains(b);
                if qa != qb {
                    kind_order.retain(|v| *v != if qa { *a } else { *b });
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }

    let quantified = |kind: &Kind, order: &[KindVar]| match kind {
        Kind::Var(v) => order.contains(v),
        _ => true,
    };
    let mut constraint: Vec<(Kind, Kind)> = Vec::new();
    let mut outer: Vec<(Kind, Kind)> = Vec::new();
    for (lo, hi) in canonical {
        let has_var = matches!(lo, Kind::Var(_)) || matches!(hi, Kind::Var(_));
        if has_var && quantified(&lo, &kind_order) && quantified(&hi, &kind_order) {
            constraint.push((lo, hi));
        } else {
            outer.push((lo, hi));
        }
    }

    let kmap: FxHashMap<KindVar, u32> = kind_order
        .iter()
        .enumerate()
        .map(|(i, v)| (*v, i as u32))
        .collect();

    let params = params
        .iter()
        .map(|k| freeze_kind(ctx, k, &kmap))
        .collect();
    let ret = freeze_kind(ctx, &ret, &kmap);
    let constraint = constraint
        .into_iter()
        .map(|(lo, hi)| (freeze_kind(ctx, &lo, &kmap), freeze_kind(ctx, &hi, &kmap)))
        .collect();

    ctx.pending = outer;
    Ok(KindScheme {
        kvars: kind_order.len(),
        constraint,
        params,
        ret,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins;
    use crate::kind::Region;
    use affe_ast::Pat;
    use affe_common::NameSupply;

    fn setup() -> (InferCtx, Env, NameSupply) {
        let mut supply = NameSupply::new();
        let env = builtins::initial_env(&mut supply);
        (InferCtx::new(), env, supply)
    }

    #[test]
    fn lambdas_and_constants_are_nonexpansive() {
        let (_, _, mut supply) = setup();
        let x = supply.fresh("x");
        assert!(is_nonexpansive(&Expr::int(1)));
        assert!(is_nonexpansive(&Expr::lambda(
            Pat::var(x.clone()),
            Expr::var(x.clone())
        )));
        assert!(is_nonexpansive(&Expr::array(vec![])));
        assert!(!is_nonexpansive(&Expr::array(vec![Expr::int(1)])));
        assert!(!is_nonexpansive(&Expr::app(
            Expr::var(x.clone()),
            vec![Expr::int(1)]
        )));
        // constructor-headed applications stay non-expansive
        let some = supply.fresh("some");
        assert!(is_nonexpansive(&Expr::app(
            Expr::constructor(some),
            vec![Expr::int(1)]
        )));
    }

    #[test]
    fn generalize_quantifies_inner_variables() {
        let (mut ctx, env, _) = setup();
        ctx.enter_level();
        let a = ctx.fresh_ty_var();
        let k = ctx.fresh_kind_var();
        let identity = Ty::arrow(a.clone(), k, a);
        ctx.leave_level();

        let scheme = generalize(&mut ctx, &env, identity, true).unwrap();
        assert_eq!(scheme.vars.len(), 1, "one quantified type variable");
        assert_eq!(scheme.kvars, 2, "the var's kind and the arrow kind");
        assert!(scheme.constraint.is_empty());
        match &scheme.ty {
            Ty::Arrow(param, kind, ret) => {
                assert_eq!(**param, Ty::Gen(0));
                assert_eq!(**ret, Ty::Gen(0));
                assert!(matches!(kind, Kind::Gen(_)));
            }
            other => panic!("expected an arrow, got {:?}", other),
        }
    }

    #[test]
    fn expansive_types_stay_monomorphic() {
        let (mut ctx, env, _) = setup();
        ctx.enter_level();
        let a = ctx.fresh_ty_var();
        ctx.leave_level();

        let scheme = generalize(&mut ctx, &env, a.clone(), false).unwrap();
        assert!(scheme.is_mono());
        assert!(matches!(scheme.ty, Ty::Var(_)));
    }

    #[test]
    fn outer_variables_are_not_quantified() {
        let (mut ctx, env, _) = setup();
        let outer = ctx.fresh_ty_var();
        ctx.enter_level();
        let inner = ctx.fresh_ty_var();
        let k = ctx.fresh_kind_var();
        let ty = Ty::arrow(outer.clone(), k, inner);
        ctx.leave_level();

        let scheme = generalize(&mut ctx, &env, ty, true).unwrap();
        assert_eq!(scheme.vars.len(), 1, "only the inner variable generalises");
        match &scheme.ty {
            Ty::Arrow(param, _, ret) => {
                assert!(matches!(**param, Ty::Var(_)));
                assert_eq!(**ret, Ty::Gen(0));
            }
            other => panic!("expected an arrow, got {:?}", other),
        }
    }

    #[test]
    fn constraints_on_quantified_kinds_join_the_scheme() {
        let (mut ctx, env, _) = setup();
        ctx.enter_level();
        let a = ctx.fresh_ty_var();
        let Ty::Var(va) = a.clone() else { unreachable!() };
        let ka = ctx.var_kind(va);
        ctx.push_leq(ka.clone(), Kind::un(Region::Never));
        let arrow_kind = ctx.fresh_kind_var();
        let ty = Ty::arrow(a.clone(), arrow_kind, Ty::Tuple(vec![a.clone(), a]));
        ctx.leave_level();

        let scheme = generalize(&mut ctx, &env, ty, true).unwrap();
        assert!(scheme
            .constraint
            .iter()
            .any(|(lo, hi)| matches!(lo, Kind::Gen(_)) && *hi == Kind::un(Region::Never)));
        assert!(ctx.pending_constraints().is_empty());
    }

    #[test]
    fn already_generalised_types_are_rejected() {
        let (mut ctx, env, _) = setup();
        let result = generalize(&mut ctx, &env, Ty::Gen(0), true);
        assert!(matches!(
            result,
            Err(TypeError::AlreadyGeneralised { .. })
        ));
    }
}
