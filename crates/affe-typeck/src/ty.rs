//! Type representation for the Affe type system.
//!
//! Defines the core `Ty` enum, type variables (`TyVar`), and polymorphic
//! type schemes (`Scheme`). Arrows and borrows carry their own usage kind,
//! which is what the multiplicity and constraint machinery reasons about.

use std::fmt;

use affe_common::Name;
pub use affe_ast::BorrowKind;

use crate::kind::Kind;

/// A type variable, identified by a `u32` index into the type unification
/// table. Its level and associated kind live in side tables of the
/// inference context; the `ena` crate handles the union-find mechanics.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TyVar(pub u32);

/// An Affe type.
///
/// - `Var`: an inference variable (resolved by unification)
/// - `Gen`: a quantified variable, only valid inside a scheme body
/// - `App`: a named type constructor applied to arguments
/// - `Tuple`: a tuple type
/// - `Arrow`: a function type carrying its residual-use kind
/// - `Borrow`: a read or write borrow carrying its kind
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Ty {
    Var(TyVar),
    Gen(u32),
    App(Name, Vec<Ty>),
    Tuple(Vec<Ty>),
    Arrow(Box<Ty>, Kind, Box<Ty>),
    Borrow(BorrowKind, Kind, Box<Ty>),
}

impl Ty {
    /// Create a function type `param -{kind}> ret`.
    pub fn arrow(param: Ty, kind: Kind, ret: Ty) -> Ty {
        Ty::Arrow(Box::new(param), kind, Box::new(ret))
    }

    /// Create a borrow type.
    pub fn borrow(flavor: BorrowKind, kind: Kind, inner: Ty) -> Ty {
        Ty::Borrow(flavor, kind, Box::new(inner))
    }

    /// Apply a named type constructor.
    pub fn app(name: Name, args: Vec<Ty>) -> Ty {
        Ty::App(name, args)
    }
}

/// Display name for the `i`-th quantified type variable: `'a`, `'b`, ...,
/// then `'a26`, `'a27`, ... past the alphabet.
fn gen_name(i: u32) -> String {
    if i < 26 {
        format!("'{}", (b'a' + i as u8) as char)
    } else {
        format!("'a{}", i)
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Var(v) => write!(f, "?{}", v.0),
            Ty::Gen(i) => write!(f, "{}", gen_name(*i)),
            Ty::App(name, args) => {
                write!(f, "{}", name)?;
                if !args.is_empty() {
                    write!(f, "<")?;
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", a)?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
            Ty::Tuple(elems) => {
                write!(f, "(")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, ")")
            }
            Ty::Arrow(param, kind, ret) => {
                write!(f, "({} -{{{}}}> {})", param, kind, ret)
            }
            Ty::Borrow(flavor, kind, inner) => {
                write!(f, "{}{{{}}}({})", flavor, kind, inner)
            }
        }
    }
}

/// A polymorphic type scheme.
///
/// Quantified variables use sequential indices: `Ty::Gen(i)` is the `i`-th
/// quantified type variable and its kind is `vars[i]`; `Kind::Gen(j)` with
/// `j < kvars` is a quantified kind variable. `constraint` holds canonical
/// kind inequalities over quantified variables and constants only.
#[derive(Clone, Debug)]
pub struct Scheme {
    /// Number of quantified kind variables.
    pub kvars: usize,
    /// Kind of each quantified type variable, indexed by `Ty::Gen` id.
    pub vars: Vec<Kind>,
    /// Kind inequalities attached to the quantifier.
    pub constraint: Vec<(Kind, Kind)>,
    /// The scheme body.
    pub ty: Ty,
}

impl Scheme {
    /// Create a monomorphic scheme (no quantification, no constraint).
    pub fn mono(ty: Ty) -> Self {
        Scheme {
            kvars: 0,
            vars: Vec::new(),
            constraint: Vec::new(),
            ty,
        }
    }

    /// Whether the scheme quantifies anything.
    pub fn is_mono(&self) -> bool {
        self.kvars == 0 && self.vars.is_empty()
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.vars.is_empty() {
            write!(f, "∀")?;
            for (i, kind) in self.vars.iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}:{}", gen_name(i as u32), kind)?;
            }
            write!(f, ". ")?;
        }
        if !self.constraint.is_empty() {
            write!(f, "(")?;
            for (i, (lhs, rhs)) in self.constraint.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{} <= {}", lhs, rhs)?;
            }
            write!(f, ") => ")?;
        }
        write!(f, "{}", self.ty)
    }
}

// ── ena trait implementations ──────────────────────────────────────────

impl ena::unify::UnifyKey for TyVar {
    type Value = Option<Ty>;

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(u: u32) -> Self {
        TyVar(u)
    }

    fn tag() -> &'static str {
        "TyVar"
    }
}

impl ena::unify::EqUnifyValue for Ty {}
