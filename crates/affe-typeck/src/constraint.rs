//! Constraint language and canonicalising solver.
//!
//! Constraints are born as trees mixing type equalities and kind
//! inequalities. Equalities discharge immediately into the unifier; the
//! inequalities accumulate in the context's pending list. `normalize` runs
//! after every inference rule and rewrites that list to canonical form:
//! only inequalities between variables, or between a variable and a
//! constant, survive, and infeasible bound windows are reported at the
//! earliest point.

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::env::Env;
use crate::error::{ConstraintOrigin, TypeError};
use crate::kind::{Kind, KindConst, KindVar};
use crate::ty::Ty;
use crate::unify::InferCtx;
use crate::variance::{Variance, VarianceMap};

/// A constraint tree as produced by annotations and declarations.
#[derive(Clone, Debug)]
pub enum Constraint {
    True,
    Eq(Ty, Ty),
    Leq(Kind, Kind),
    And(Vec<Constraint>),
}

impl Constraint {
    /// Conjunction, flattening nested `And`s and dropping `True`.
    pub fn and(parts: Vec<Constraint>) -> Constraint {
        let mut flat = Vec::new();
        for part in parts {
            match part {
                Constraint::True => {}
                Constraint::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Constraint::True,
            1 => flat.pop().expect("length checked"),
            _ => Constraint::And(flat),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::True => write!(f, "true"),
            Constraint::Eq(a, b) => write!(f, "{} = {}", a, b),
            Constraint::Leq(a, b) => write!(f, "{} <= {}", a, b),
            Constraint::And(parts) => {
                for (i, p) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, " & ")?;
                    }
                    write!(f, "{}", p)?;
                }
                Ok(())
            }
        }
    }
}

/// Discharge a constraint tree: equalities unify now, inequalities join the
/// pending list for the next `normalize`.
pub fn assert_constraint(
    ctx: &mut InferCtx,
    env: &Env,
    constraint: Constraint,
    origin: &ConstraintOrigin,
) -> Result<(), TypeError> {
    match constraint {
        Constraint::True => Ok(()),
        Constraint::Eq(a, b) => ctx.unify(env, a, b, origin),
        Constraint::Leq(lo, hi) => {
            ctx.push_leq(lo, hi);
            Ok(())
        }
        Constraint::And(parts) => {
            for part in parts {
                assert_constraint(ctx, env, part, origin)?;
            }
            Ok(())
        }
    }
}

/// Options for one canonicalisation pass.
#[derive(Default)]
pub struct SolveOptions<'a> {
    /// Variables to preserve. Everything else is eliminated, bridging its
    /// edges. `None` keeps every variable.
    pub keep: Option<&'a FxHashSet<KindVar>>,
    /// Polarities driving compression. `None` disables compression.
    pub variance: Option<&'a VarianceMap>,
    /// Only variables created above this level may be compressed.
    pub gen_level: Option<u32>,
}

/// Canonicalise the pending constraints in place.
pub fn normalize(ctx: &mut InferCtx) -> Result<(), TypeError> {
    let canonical = solve(ctx, SolveOptions::default())?;
    ctx.pending = canonical;
    Ok(())
}

/// Per-variable feasible window.
#[derive(Copy, Clone)]
struct Bounds {
    lower: KindConst,
    upper: KindConst,
}

impl Bounds {
    const FREE: Bounds = Bounds {
        lower: KindConst::BOTTOM,
        upper: KindConst::TOP,
    };
}

/// Canonicalise the pending constraint set.
///
/// Shortens every kind through links, classifies endpoints, accumulates
/// per-variable constant bounds, propagates them along variable edges to a
/// fixpoint, and rejects empty windows (`KindInfeasibility`) and violated
/// constant edges (`KindMismatch`). The canonical output lists, per kept
/// variable, its non-trivial constant bounds and the variable edges between
/// kept variables (bridging eliminated ones).
pub fn solve(ctx: &mut InferCtx, opts: SolveOptions) -> Result<Vec<(Kind, Kind)>, TypeError> {
    let raw = std::mem::take(&mut ctx.pending);

    let mut bounds: FxHashMap<KindVar, Bounds> = FxHashMap::default();
    let mut var_edges: Vec<(KindVar, KindVar)> = Vec::new();

    for (lo, hi) in raw {
        let lo = ctx.resolve_kind(&lo);
        let hi = ctx.resolve_kind(&hi);
        match (lo, hi) {
            (Kind::Const(c1), Kind::Const(c2)) => {
                if !c1.leq(c2) {
                    return Err(TypeError::KindMismatch {
                        expected: Kind::Const(c2),
                        found: Kind::Const(c1),
                        origin: ConstraintOrigin::Solver,
                    });
                }
            }
            (Kind::Const(c), Kind::Var(v)) => {
                let b = bounds.entry(v).or_insert(Bounds::FREE);
                b.lower = b.lower.lub(c);
            }
            (Kind::Var(v), Kind::Const(c)) => {
                let b = bounds.entry(v).or_insert(Bounds::FREE);
                b.upper = b.upper.glb(c);
            }
            (Kind::Var(a), Kind::Var(b)) => {
                if a != b {
                    bounds.entry(a).or_insert(Bounds::FREE);
                    bounds.entry(b).or_insert(Bounds::FREE);
                    var_edges.push((a, b));
                }
            }
            (Kind::Gen(_), _) | (_, Kind::Gen(_)) => {
                unreachable!("generic kind variable in constraint canonicalisation")
            }
        }
    }

    var_edges.sort_unstable_by_key(|(a, b)| (a.0, b.0));
    var_edges.dedup();

    // Propagate lower bounds forward and upper bounds backward along
    // variable edges until nothing changes. The bounds are drawn from the
    // finite set of constants present, so this terminates.
    loop {
        let mut changed = false;
        for (a, b) in &var_edges {
            let lower_a = bounds[a].lower;
            let entry_b = bounds.get_mut(b).expect("endpoint registered above");
            let lifted = entry_b.lower.lub(lower_a);
            if lifted != entry_b.lower {
                entry_b.lower = lifted;
                changed = true;
            }
            let upper_b = bounds[b].upper;
            let entry_a = bounds.get_mut(a).expect("endpoint registered above");
            let dropped = entry_a.upper.glb(upper_b);
            if dropped != entry_a.upper {
                entry_a.upper = dropped;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let mut vars: Vec<KindVar> = bounds.keys().copied().collect();
    vars.sort_unstable_by_key(|v| v.0);

    for v in &vars {
        let b = bounds[v];
        if !b.lower.leq(b.upper) {
            return Err(TypeError::KindInfeasibility {
                lower: b.lower,
                var: Kind::Var(*v),
                upper: b.upper,
            });
        }
    }

    // Variance-guided compression: a variable occurring at a single
    // polarity, with no variable edges and bounds on one side only,
    // collapses onto that bound.
    if let (Some(variance), Some(gen_level)) = (opts.variance, opts.gen_level) {
        let mut edge_count: FxHashMap<KindVar, usize> = FxHashMap::default();
        for (a, b) in &var_edges {
            *edge_count.entry(*a).or_insert(0) += 1;
            *edge_count.entry(*b).or_insert(0) += 1;
        }
        for v in &vars {
            if ctx.kind_level(*v) <= gen_level {
                continue;
            }
            if edge_count.get(v).copied().unwrap_or(0) > 0 {
                continue;
            }
            let b = bounds[v];
            // one-sided variables collapse to the low end of their window
            let target = match variance.get(*v) {
                Some(Variance::Pos)
                    if b.lower == KindConst::BOTTOM && b.upper != KindConst::TOP =>
                {
                    Some(b.lower)
                }
                Some(Variance::Neg)
                    if b.upper == KindConst::TOP && b.lower != KindConst::BOTTOM =>
                {
                    Some(b.lower)
                }
                _ => None,
            };
            if let Some(c) = target {
                ctx.unify_kind(Kind::Var(*v), Kind::Const(c), &ConstraintOrigin::Solver)?;
                bounds.remove(v);
            }
        }
        vars.retain(|v| bounds.contains_key(v));
    }

    let is_kept = |v: &KindVar| opts.keep.map_or(true, |set| set.contains(v));

    // Variable edges between kept variables, bridging through eliminated
    // ones. Edges wholly between eliminated variables disappear; their
    // effect survives in the propagated bounds.
    let mut adjacency: FxHashMap<KindVar, Vec<KindVar>> = FxHashMap::default();
    for (a, b) in &var_edges {
        adjacency.entry(*a).or_default().push(*b);
    }

    let mut canonical: Vec<(Kind, Kind)> = Vec::new();
    let mut seen: FxHashSet<(KindVar, KindVar)> = FxHashSet::default();

    for a in vars.iter().filter(|v| is_kept(v)) {
        // depth-first search crossing eliminated variables only
        let mut stack: Vec<KindVar> = adjacency.get(a).cloned().unwrap_or_default();
        let mut visited: FxHashSet<KindVar> = FxHashSet::default();
        while let Some(s) = stack.pop() {
            if !visited.insert(s) {
                continue;
            }
            if is_kept(&s) {
                if s != *a && seen.insert((*a, s)) {
                    canonical.push((Kind::Var(*a), Kind::Var(s)));
                }
            } else if let Some(next) = adjacency.get(&s) {
                stack.extend(next.iter().copied());
            }
        }
    }

    for v in vars.iter().filter(|v| is_kept(v)) {
        let b = bounds[v];
        if b.lower != KindConst::BOTTOM {
            canonical.push((Kind::Const(b.lower), Kind::Var(*v)));
        }
        if b.upper != KindConst::TOP {
            canonical.push((Kind::Var(*v), Kind::Const(b.upper)));
        }
    }

    Ok(canonical)
}
