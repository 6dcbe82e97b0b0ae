//! Type, kind, and usage errors with provenance tracking.
//!
//! Every constraint generated by the driver carries a `ConstraintOrigin`
//! recording where it came from, so the unifier and solver can report the
//! source position of a mismatch. The first error aborts inference of the
//! current declaration; there is no recovery.

use std::fmt;

use affe_common::{Name, Span};

use crate::kind::{Kind, KindConst};
use crate::multiplicity::Use;
use crate::ty::{Ty, TyVar};

/// Where a constraint was generated.
#[derive(Clone, Debug)]
pub enum ConstraintOrigin {
    /// A function application: callee must accept the argument.
    App { span: Span },
    /// A match arm body: all arms share one result type.
    MatchArm { span: Span },
    /// A match pattern against the scrutinee.
    Scrutinee { span: Span },
    /// A `let` pattern against the right-hand side.
    LetBinding { span: Span },
    /// The pre-bound type of a `let rec` against its body.
    RecBinding { span: Span },
    /// A reborrow: the source must be an exclusive borrow.
    Reborrow { span: Span },
    /// A region's result must be first-class outside it.
    Region { span: Span },
    /// Array elements share one type.
    ArrayElem { span: Span },
    /// A user-written type annotation.
    Annotation { span: Span },
    /// Raised inside constraint canonicalisation.
    Solver,
    /// Synthetic constraints from the initial environment.
    Builtin,
}

impl ConstraintOrigin {
    /// The source span this origin points at, if any.
    pub fn span(&self) -> Option<Span> {
        match self {
            ConstraintOrigin::App { span }
            | ConstraintOrigin::MatchArm { span }
            | ConstraintOrigin::Scrutinee { span }
            | ConstraintOrigin::LetBinding { span }
            | ConstraintOrigin::RecBinding { span }
            | ConstraintOrigin::Reborrow { span }
            | ConstraintOrigin::Region { span }
            | ConstraintOrigin::ArrayElem { span }
            | ConstraintOrigin::Annotation { span } => Some(*span),
            ConstraintOrigin::Solver | ConstraintOrigin::Builtin => None,
        }
    }
}

/// An error halting inference of the current declaration.
#[derive(Clone, Debug)]
pub enum TypeError {
    /// Two types that should be equal are not.
    TypeMismatch {
        expected: Ty,
        found: Ty,
        origin: ConstraintOrigin,
    },
    /// Two kind constants that should be equal are not, or a constant
    /// inequality violates the lattice order.
    KindMismatch {
        expected: Kind,
        found: Kind,
        origin: ConstraintOrigin,
    },
    /// A kind variable's constant bounds leave no feasible lattice window.
    KindInfeasibility {
        lower: KindConst,
        var: Kind,
        upper: KindConst,
    },
    /// A variable is consumed in two incompatible ways.
    UseMismatch {
        name: Name,
        first: Use,
        second: Use,
    },
    /// A type variable occurs in its own solution (infinite type).
    RecursiveType {
        var: TyVar,
        ty: Ty,
        origin: ConstraintOrigin,
    },
    /// A value variable is not in scope.
    UnknownName { name: Name, span: Span },
    /// A type constructor is not in scope.
    UnknownType { name: Name },
    /// `let rec` with anything but a plain variable on the left.
    IllegalRecLHS { span: Span },
    /// A quantified variable escaped its scheme and reached the generaliser.
    AlreadyGeneralised { ty: Ty },
    /// A type constructor applied to the wrong number of arguments.
    ArityMismatch {
        expected: usize,
        found: usize,
        origin: ConstraintOrigin,
    },
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::TypeMismatch {
                expected, found, ..
            } => {
                write!(f, "type mismatch: expected `{}`, found `{}`", expected, found)
            }
            TypeError::KindMismatch {
                expected, found, ..
            } => {
                write!(f, "kind mismatch: expected `{}`, found `{}`", expected, found)
            }
            TypeError::KindInfeasibility { lower, var, upper } => {
                write!(
                    f,
                    "no usage satisfies `{} <= {} <= {}`",
                    lower, var, upper
                )
            }
            TypeError::UseMismatch { name, first, second } => {
                write!(
                    f,
                    "`{}` is {} but also {}",
                    name, first, second
                )
            }
            TypeError::RecursiveType { var, ty, .. } => {
                write!(f, "recursive type: `?{}` occurs in `{}`", var.0, ty)
            }
            TypeError::UnknownName { name, .. } => {
                write!(f, "unbound variable `{}`", name)
            }
            TypeError::UnknownType { name } => {
                write!(f, "unknown type constructor `{}`", name)
            }
            TypeError::IllegalRecLHS { .. } => {
                write!(f, "`let rec` requires a plain variable on the left-hand side")
            }
            TypeError::AlreadyGeneralised { ty } => {
                write!(f, "already generalised: `{}` re-entered the generaliser", ty)
            }
            TypeError::ArityMismatch {
                expected, found, ..
            } => {
                write!(
                    f,
                    "arity mismatch: expected {} type argument(s), found {}",
                    expected, found
                )
            }
        }
    }
}
