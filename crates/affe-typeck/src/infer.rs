//! Syntax-directed inference driver.
//!
//! Walks the renamed surface tree. Every rule returns the multiplicity map
//! of the sub-expression together with its type; the environment is
//! threaded as a scope stack with push/pop pairing on both the success and
//! the error path, and kind constraints accumulate in the context, where
//! `normalize` canonicalises them after every rule so mismatches surface at
//! the earliest point.
//!
//! The three entry points consumed by the harness are [`infer_top`] for
//! value declarations, [`make_type_decl`] for type declarations, and
//! [`make_type_scheme`] for user-written annotations.

use rustc_hash::FxHashSet;

use affe_ast::{Arm, Constant, Expr, Pat, RecFlag};
use affe_common::{Name, Span};

use crate::constraint::{assert_constraint, normalize, solve, Constraint, SolveOptions};
use crate::env::Env;
use crate::error::{ConstraintOrigin, TypeError};
use crate::generalize::{
    free_kind_vars, generalize, generalize_kind_scheme, is_nonexpansive,
};
use crate::kind::{Kind, KindScheme, KindVar, Region};
use crate::multiplicity::Multiplicity;
use crate::ty::{BorrowKind, Scheme, Ty};
use crate::unify::InferCtx;

// ── Entry points ───────────────────────────────────────────────────────

/// Infer a top-level value declaration.
///
/// Generalises at level 0 under the value restriction, verifies that the
/// residual constraints are satisfiable, trims those no longer reachable
/// from the environment, and binds `name` to the resulting scheme.
pub fn infer_top(
    ctx: &mut InferCtx,
    env: &mut Env,
    rec: RecFlag,
    name: &Name,
    expr: &Expr,
) -> Result<Scheme, TypeError> {
    let (_m, ty) = match rec {
        RecFlag::NonRec => {
            ctx.enter_level();
            let result = infer_expr(ctx, env, expr);
            ctx.leave_level();
            result?
        }
        RecFlag::Rec => {
            ctx.enter_level();
            let self_ty = ctx.fresh_ty_var();
            let Ty::Var(self_var) = self_ty.clone() else { unreachable!() };
            let self_kind = ctx.var_kind(self_var);
            // the recursive self-reference is shared
            ctx.push_leq(self_kind.clone(), Kind::un(Region::Never));
            env.push_scope();
            env.insert_value(name.clone(), Scheme::mono(self_ty.clone()));
            let result = (|| -> Result<(Multiplicity, Ty), TypeError> {
                let (mut m, ty) = infer_expr(ctx, env, expr)?;
                ctx.unify(
                    env,
                    self_ty.clone(),
                    ty.clone(),
                    &ConstraintOrigin::RecBinding { span: expr.span() },
                )?;
                m.exit_binder(ctx, name, &self_kind);
                Ok((m, ty))
            })();
            env.pop_scope();
            ctx.leave_level();
            result?
        }
    };

    normalize(ctx)?;
    let scheme = generalize(ctx, env, ty, is_nonexpansive(expr))?;

    // Verify the residue and drop constraints on variables no longer
    // reachable from the environment.
    let mut live: FxHashSet<KindVar> = FxHashSet::default();
    let env_bodies: Vec<Ty> = env.value_schemes().map(|s| s.ty.clone()).collect();
    for body in &env_bodies {
        free_kind_vars(ctx, body, &mut live);
    }
    let canonical = solve(
        ctx,
        SolveOptions {
            keep: Some(&live),
            variance: None,
            gen_level: None,
        },
    )?;
    ctx.pending = canonical;

    env.insert_value(name.clone(), scheme.clone());
    Ok(scheme)
}

/// Introduce a type constructor of the given arity and result kind.
///
/// `build` runs with the declaration level already entered and receives the
/// freshly minted parameter types; it returns the data constructors with
/// their payload types (which may mention the parameters and, recursively,
/// the declared type). Payload kinds are checked, each constructor receives
/// a generalised value scheme, and the constructor's kind signature is
/// generalised and registered.
pub fn make_type_decl<F>(
    ctx: &mut InferCtx,
    env: &mut Env,
    name: &Name,
    arity: usize,
    ret_kind: Kind,
    build: F,
) -> Result<KindScheme, TypeError>
where
    F: FnOnce(&mut InferCtx, &[Ty]) -> Vec<(Name, Option<Ty>)>,
{
    ctx.enter_level();
    let result = (|| -> Result<(Vec<Kind>, Vec<(Name, Ty)>), TypeError> {
        let params: Vec<Ty> = (0..arity).map(|_| ctx.fresh_ty_var()).collect();
        let mut param_kinds = Vec::with_capacity(arity);
        for p in &params {
            param_kinds.push(ctx.kind_of(env, p, &ConstraintOrigin::Builtin)?);
        }
        // provisional signature so payloads may mention the type recursively
        env.insert_type(
            name.clone(),
            KindScheme {
                kvars: 0,
                constraint: Vec::new(),
                params: param_kinds.clone(),
                ret: ret_kind.clone(),
            },
        );

        let constructors = build(ctx, &params);
        for (_, payload) in &constructors {
            if let Some(ty) = payload {
                ctx.kind_of(env, ty, &ConstraintOrigin::Builtin)?;
            }
        }

        let result_ty = Ty::app(name.clone(), params);
        let ctor_tys = constructors
            .into_iter()
            .map(|(ctor_name, payload)| {
                let ty = match payload {
                    None => result_ty.clone(),
                    Some(payload) => {
                        Ty::arrow(payload, ctx.fresh_kind_var(), result_ty.clone())
                    }
                };
                (ctor_name, ty)
            })
            .collect();
        Ok((param_kinds, ctor_tys))
    })();
    ctx.leave_level();
    let (param_kinds, ctor_tys) = result?;
    normalize(ctx)?;

    for (ctor_name, ctor_ty) in ctor_tys {
        let scheme = generalize(ctx, env, ctor_ty, true)?;
        env.insert_constructor(ctor_name, scheme);
    }

    let kscheme = generalize_kind_scheme(ctx, param_kinds, ret_kind)?;
    env.insert_type(name.clone(), kscheme.clone());
    Ok(kscheme)
}

/// Compute a closed scheme for a user-written type annotation.
///
/// `build` runs with the annotation level already entered and returns the
/// written constraint and type (minting inference variables for the
/// annotation's type variables as it goes).
pub fn make_type_scheme<F>(
    ctx: &mut InferCtx,
    env: &mut Env,
    span: Span,
    build: F,
) -> Result<Scheme, TypeError>
where
    F: FnOnce(&mut InferCtx) -> (Constraint, Ty),
{
    ctx.enter_level();
    let result = (|| -> Result<Ty, TypeError> {
        let (constraint, ty) = build(ctx);
        let origin = ConstraintOrigin::Annotation { span };
        assert_constraint(ctx, env, constraint, &origin)?;
        ctx.kind_of(env, &ty, &origin)?;
        Ok(ty)
    })();
    ctx.leave_level();
    let ty = result?;
    normalize(ctx)?;
    generalize(ctx, env, ty, true)
}

// ── Expression inference ───────────────────────────────────────────────

/// Infer one expression, returning its multiplicity map and type.
pub(crate) fn infer_expr(
    ctx: &mut InferCtx,
    env: &mut Env,
    expr: &Expr,
) -> Result<(Multiplicity, Ty), TypeError> {
    match expr {
        Expr::Constant(constant, _) => {
            Ok((Multiplicity::new(), constant_type(env, constant)))
        }

        Expr::Var(name, span) => {
            let scheme = env.lookup_value(name).ok_or_else(|| TypeError::UnknownName {
                name: name.clone(),
                span: *span,
            })?;
            let ty = ctx.instantiate(scheme);
            let kind = ctx.kind_of(env, &ty, &ConstraintOrigin::Builtin)?;
            Ok((Multiplicity::var(name.clone(), kind), ty))
        }

        Expr::Constructor(name, span) => {
            let scheme = env
                .lookup_constructor(name)
                .ok_or_else(|| TypeError::UnknownName {
                    name: name.clone(),
                    span: *span,
                })?;
            let ty = ctx.instantiate(scheme);
            Ok((Multiplicity::new(), ty))
        }

        Expr::Borrow(flavor, name, span) => {
            let scheme = env.lookup_value(name).ok_or_else(|| TypeError::UnknownName {
                name: name.clone(),
                span: *span,
            })?;
            let inner = ctx.instantiate(scheme);
            let kind = ctx.fresh_kind_var();
            let m = Multiplicity::borrow(name.clone(), *flavor, kind.clone());
            Ok((m, Ty::borrow(*flavor, kind, inner)))
        }

        Expr::ReBorrow(flavor, name, span) => {
            let scheme = env.lookup_value(name).ok_or_else(|| TypeError::UnknownName {
                name: name.clone(),
                span: *span,
            })?;
            let source = ctx.instantiate(scheme);
            let payload = ctx.fresh_ty_var();
            let write_kind = ctx.fresh_kind_var();
            let origin = ConstraintOrigin::Reborrow { span: *span };
            ctx.unify(
                env,
                source,
                Ty::borrow(BorrowKind::Write, write_kind, payload.clone()),
                &origin,
            )?;
            let kind = ctx.fresh_kind_var();
            let m = Multiplicity::borrow(name.clone(), *flavor, kind.clone());
            normalize(ctx)?;
            Ok((m, Ty::borrow(*flavor, kind, payload)))
        }

        Expr::Lambda(pat, body, _) => {
            env.push_scope();
            let mut binds = Vec::new();
            let result = (|| -> Result<(Ty, Multiplicity, Ty), TypeError> {
                let pat_ty = infer_pattern(ctx, env, pat, &mut binds)?;
                let (m, body_ty) = infer_expr(ctx, env, body)?;
                Ok((pat_ty, m, body_ty))
            })();
            env.pop_scope();
            let (pat_ty, mut m, body_ty) = result?;
            for (bound, kind) in binds.iter().rev() {
                m.exit_binder(ctx, bound, kind);
            }
            let arrow_kind = ctx.fresh_kind_var();
            m.constrain_closure(ctx, &arrow_kind);
            normalize(ctx)?;
            Ok((m, Ty::arrow(pat_ty, arrow_kind, body_ty)))
        }

        Expr::App(callee, args, span) => {
            let (mut m, mut fun_ty) = infer_expr(ctx, env, callee)?;
            let origin = ConstraintOrigin::App { span: *span };
            for arg in args {
                let (m_arg, arg_ty) = infer_expr(ctx, env, arg)?;
                m = m.merge_seq(m_arg, ctx)?;
                let kind = ctx.fresh_kind_var();
                let ret = ctx.fresh_ty_var();
                ctx.unify(env, fun_ty, Ty::arrow(arg_ty, kind, ret.clone()), &origin)?;
                fun_ty = ret;
            }
            normalize(ctx)?;
            Ok((m, fun_ty))
        }

        Expr::Tuple(elems, _) => {
            let mut m = Multiplicity::new();
            let mut tys = Vec::new();
            for e in elems {
                let (m_elem, ty) = infer_expr(ctx, env, e)?;
                m = m.merge_seq(m_elem, ctx)?;
                tys.push(ty);
            }
            normalize(ctx)?;
            Ok((m, Ty::Tuple(tys)))
        }

        Expr::Array(elems, span) => {
            let elem_ty = ctx.fresh_ty_var();
            let mut m = Multiplicity::new();
            let origin = ConstraintOrigin::ArrayElem { span: *span };
            for e in elems {
                let (m_elem, ty) = infer_expr(ctx, env, e)?;
                m = m.merge_seq(m_elem, ctx)?;
                ctx.unify(env, ty, elem_ty.clone(), &origin)?;
            }
            normalize(ctx)?;
            let array = env.prim().array.clone();
            Ok((m, Ty::app(array, vec![elem_ty])))
        }

        Expr::Let(RecFlag::NonRec, pat, value, body, span) => {
            infer_let(ctx, env, pat, value, body, *span)
        }

        Expr::Let(RecFlag::Rec, pat, value, body, span) => {
            infer_let_rec(ctx, env, pat, value, body, *span)
        }

        Expr::Match(modifier, scrutinee, arms, _) => {
            infer_match(ctx, env, *modifier, scrutinee, arms)
        }

        Expr::Region(vars, body, span) => infer_region(ctx, env, vars, body, *span),
    }
}

/// The type of a literal constant.
fn constant_type(env: &Env, constant: &Constant) -> Ty {
    let prim = env.prim();
    match constant {
        Constant::Int(_) => Ty::app(prim.int.clone(), vec![]),
        Constant::Bool(_) => Ty::app(prim.bool_.clone(), vec![]),
        Constant::Unit => Ty::app(prim.unit.clone(), vec![]),
    }
}

/// `let pat = value in body`.
///
/// The right-hand side is inferred one level deeper and generalised under
/// the value restriction. A plain variable pattern receives the scheme;
/// any other pattern binds its components monomorphically.
fn infer_let(
    ctx: &mut InferCtx,
    env: &mut Env,
    pat: &Pat,
    value: &Expr,
    body: &Expr,
    span: Span,
) -> Result<(Multiplicity, Ty), TypeError> {
    ctx.enter_level();
    let value_result = infer_expr(ctx, env, value);
    ctx.leave_level();
    let (m_value, value_ty) = value_result?;
    normalize(ctx)?;
    let scheme = generalize(ctx, env, value_ty.clone(), is_nonexpansive(value))?;

    env.push_scope();
    let mut binds = Vec::new();
    let body_result = (|| -> Result<(Multiplicity, Ty), TypeError> {
        let origin = ConstraintOrigin::LetBinding { span };
        match pat {
            Pat::Var(name, _) => {
                let kind = ctx.kind_of(env, &value_ty, &origin)?;
                binds.push((name.clone(), kind));
                env.insert_value(name.clone(), scheme);
            }
            _ => {
                let pat_ty = infer_pattern(ctx, env, pat, &mut binds)?;
                ctx.unify(env, pat_ty, value_ty.clone(), &origin)?;
            }
        }
        infer_expr(ctx, env, body)
    })();
    env.pop_scope();
    let (mut m_body, body_ty) = body_result?;
    for (bound, kind) in binds.iter().rev() {
        m_body.exit_binder(ctx, bound, kind);
    }
    let m = m_value.merge_seq(m_body, ctx)?;
    normalize(ctx)?;
    Ok((m, body_ty))
}

/// `let rec name = value in body`. Only a plain variable is accepted on
/// the left; the pre-bound type is required unrestricted, since the
/// recursive self-reference is shared.
fn infer_let_rec(
    ctx: &mut InferCtx,
    env: &mut Env,
    pat: &Pat,
    value: &Expr,
    body: &Expr,
    span: Span,
) -> Result<(Multiplicity, Ty), TypeError> {
    let Pat::Var(name, _) = pat else {
        return Err(TypeError::IllegalRecLHS { span: pat.span() });
    };

    ctx.enter_level();
    let self_ty = ctx.fresh_ty_var();
    let Ty::Var(self_var) = self_ty.clone() else { unreachable!() };
    let self_kind = ctx.var_kind(self_var);
    ctx.push_leq(self_kind.clone(), Kind::un(Region::Never));
    env.push_scope();
    env.insert_value(name.clone(), Scheme::mono(self_ty.clone()));
    let value_result = (|| -> Result<(Multiplicity, Ty), TypeError> {
        let (mut m, value_ty) = infer_expr(ctx, env, value)?;
        ctx.unify(
            env,
            self_ty.clone(),
            value_ty.clone(),
            &ConstraintOrigin::RecBinding { span },
        )?;
        m.exit_binder(ctx, name, &self_kind);
        Ok((m, value_ty))
    })();
    env.pop_scope();
    ctx.leave_level();
    let (m_value, value_ty) = value_result?;
    normalize(ctx)?;
    let scheme = generalize(ctx, env, value_ty.clone(), is_nonexpansive(value))?;

    env.push_scope();
    env.insert_value(name.clone(), scheme);
    let body_result = infer_expr(ctx, env, body);
    env.pop_scope();
    let (mut m_body, body_ty) = body_result?;
    let kind = ctx.kind_of(env, &value_ty, &ConstraintOrigin::RecBinding { span })?;
    m_body.exit_binder(ctx, name, &kind);
    let m = m_value.merge_seq(m_body, ctx)?;
    normalize(ctx)?;
    Ok((m, body_ty))
}

/// `match[&|&!] scrutinee with arms`. Arm multiplicities compose with the
/// parallel merge, since only one arm runs; arm bodies share one result
/// type. A borrow modifier wraps each pattern type in a borrow of the
/// matching flavour.
fn infer_match(
    ctx: &mut InferCtx,
    env: &mut Env,
    modifier: Option<BorrowKind>,
    scrutinee: &Expr,
    arms: &[Arm],
) -> Result<(Multiplicity, Ty), TypeError> {
    let (m_scrutinee, scrut_ty) = infer_expr(ctx, env, scrutinee)?;
    let result_ty = ctx.fresh_ty_var();

    let mut merged: Option<Multiplicity> = None;
    for arm in arms {
        env.push_scope();
        let mut binds = Vec::new();
        let arm_result = (|| -> Result<Multiplicity, TypeError> {
            let pat_ty = infer_pattern(ctx, env, &arm.pat, &mut binds)?;
            let expected = match modifier {
                Some(flavor) => {
                    let kind = ctx.fresh_kind_var();
                    Ty::borrow(flavor, kind, pat_ty)
                }
                None => pat_ty,
            };
            ctx.unify(
                env,
                scrut_ty.clone(),
                expected,
                &ConstraintOrigin::Scrutinee {
                    span: arm.pat.span(),
                },
            )?;
            let (m_arm, body_ty) = infer_expr(ctx, env, &arm.body)?;
            ctx.unify(
                env,
                body_ty,
                result_ty.clone(),
                &ConstraintOrigin::MatchArm {
                    span: arm.body.span(),
                },
            )?;
            Ok(m_arm)
        })();
        env.pop_scope();
        let mut m_arm = arm_result?;
        for (bound, kind) in binds.iter().rev() {
            m_arm.exit_binder(ctx, bound, kind);
        }
        merged = Some(match merged.take() {
            None => m_arm,
            Some(previous) => previous.merge_par(m_arm)?,
        });
    }

    let m_arms = merged.unwrap_or_default();
    let m = m_scrutinee.merge_seq(m_arms, ctx)?;
    normalize(ctx)?;
    Ok((m, result_ty))
}

/// `region[vars] body`. The body runs one level deeper; borrows of the
/// named variables close at the exit, and the result must be first-class
/// at the outer level.
fn infer_region(
    ctx: &mut InferCtx,
    env: &mut Env,
    vars: &[Name],
    body: &Expr,
    span: Span,
) -> Result<(Multiplicity, Ty), TypeError> {
    ctx.enter_level();
    let result = (|| -> Result<(Multiplicity, Ty), TypeError> {
        let (mut m, ty) = infer_expr(ctx, env, body)?;
        m.exit_scope(vars);
        let outer = ctx.current_level() - 1;
        let kind = ctx.kind_of(env, &ty, &ConstraintOrigin::Region { span })?;
        ctx.push_leq(kind, Kind::lin(Region::at_depth(outer)));
        Ok((m, ty))
    })();
    ctx.leave_level();
    let (m, ty) = result?;
    normalize(ctx)?;
    Ok((m, ty))
}

// ── Pattern inference ──────────────────────────────────────────────────

/// Infer a pattern, binding its variables into the innermost scope and
/// recording each binder with its kind for the matching exit.
fn infer_pattern(
    ctx: &mut InferCtx,
    env: &mut Env,
    pat: &Pat,
    binds: &mut Vec<(Name, Kind)>,
) -> Result<Ty, TypeError> {
    match pat {
        Pat::Var(name, _) => {
            let ty = ctx.fresh_ty_var();
            let Ty::Var(var) = ty.clone() else { unreachable!() };
            let kind = ctx.var_kind(var);
            binds.push((name.clone(), kind));
            env.insert_value(name.clone(), Scheme::mono(ty.clone()));
            Ok(ty)
        }
        Pat::Tuple(pats, _) => {
            let mut tys = Vec::new();
            for p in pats {
                tys.push(infer_pattern(ctx, env, p, binds)?);
            }
            Ok(Ty::Tuple(tys))
        }
        Pat::Constructor(name, payload, span) => {
            let scheme = env
                .lookup_constructor(name)
                .ok_or_else(|| TypeError::UnknownName {
                    name: name.clone(),
                    span: *span,
                })?;
            let ctor_ty = ctx.instantiate(scheme);
            match payload {
                None => Ok(ctor_ty),
                Some(p) => {
                    let pat_ty = infer_pattern(ctx, env, p, binds)?;
                    let kind = ctx.fresh_kind_var();
                    let result = ctx.fresh_ty_var();
                    ctx.unify(
                        env,
                        ctor_ty,
                        Ty::arrow(pat_ty, kind, result.clone()),
                        &ConstraintOrigin::Scrutinee { span: *span },
                    )?;
                    Ok(result)
                }
            }
        }
    }
}
