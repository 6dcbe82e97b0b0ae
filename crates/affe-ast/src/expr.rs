//! Expression, pattern, and declaration nodes.
//!
//! The node set mirrors the surface language: constants, variables,
//! constructors, borrows, lambdas, application, tuples, arrays, let
//! bindings (recursive and not), match with an optional borrow modifier,
//! and region delimiters.

use std::fmt;

use affe_common::{Name, Span};

/// Borrow flavour. Read borrows share; write borrows are exclusive.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BorrowKind {
    Read,
    Write,
}

impl fmt::Display for BorrowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BorrowKind::Read => write!(f, "&"),
            BorrowKind::Write => write!(f, "&!"),
        }
    }
}

/// Whether a `let` binding may refer to itself.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RecFlag {
    NonRec,
    Rec,
}

/// Literal constants.
#[derive(Clone, Debug, PartialEq)]
pub enum Constant {
    Int(i64),
    Bool(bool),
    Unit,
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int(i) => write!(f, "{}", i),
            Constant::Bool(b) => write!(f, "{}", b),
            Constant::Unit => write!(f, "()"),
        }
    }
}

/// A pattern, as found in lambda parameters, `let`, and match arms.
#[derive(Clone, Debug)]
pub enum Pat {
    /// Bind a single variable.
    Var(Name, Span),
    /// Destructure a tuple.
    Tuple(Vec<Pat>, Span),
    /// Match a data constructor, with an optional payload sub-pattern.
    Constructor(Name, Option<Box<Pat>>, Span),
}

impl Pat {
    pub fn span(&self) -> Span {
        match self {
            Pat::Var(_, s) | Pat::Tuple(_, s) | Pat::Constructor(_, _, s) => *s,
        }
    }

    pub fn var(name: Name) -> Pat {
        Pat::Var(name, Span::dummy())
    }

    pub fn tuple(pats: Vec<Pat>) -> Pat {
        Pat::Tuple(pats, Span::dummy())
    }

    pub fn constructor(name: Name, payload: Option<Pat>) -> Pat {
        Pat::Constructor(name, payload.map(Box::new), Span::dummy())
    }
}

/// One arm of a match expression.
#[derive(Clone, Debug)]
pub struct Arm {
    pub pat: Pat,
    pub body: Expr,
}

/// An expression of the surface language, after renaming.
#[derive(Clone, Debug)]
pub enum Expr {
    Constant(Constant, Span),
    Var(Name, Span),
    /// A data constructor used as a value (applied through [`Expr::App`]).
    Constructor(Name, Span),
    /// Borrow a variable: `&x` or `&!x`.
    Borrow(BorrowKind, Name, Span),
    /// Borrow through an exclusive borrow: `&&x` / `&!&x`.
    ReBorrow(BorrowKind, Name, Span),
    Lambda(Pat, Box<Expr>, Span),
    App(Box<Expr>, Vec<Expr>, Span),
    Tuple(Vec<Expr>, Span),
    Array(Vec<Expr>, Span),
    Let(RecFlag, Pat, Box<Expr>, Box<Expr>, Span),
    /// Match with an optional borrow modifier (`match&` / `match&!`).
    Match(Option<BorrowKind>, Box<Expr>, Vec<Arm>, Span),
    /// A region delimiting the scope of the named variables' borrows.
    Region(Vec<Name>, Box<Expr>, Span),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Constant(_, s)
            | Expr::Var(_, s)
            | Expr::Constructor(_, s)
            | Expr::Borrow(_, _, s)
            | Expr::ReBorrow(_, _, s)
            | Expr::Lambda(_, _, s)
            | Expr::App(_, _, s)
            | Expr::Tuple(_, s)
            | Expr::Array(_, s)
            | Expr::Let(_, _, _, _, s)
            | Expr::Match(_, _, _, s)
            | Expr::Region(_, _, s) => *s,
        }
    }

    // ── Constructor helpers ─────────────────────────────────────────────
    //
    // The renamer attaches real spans; these helpers build spanless trees
    // for tests and embedders.

    pub fn int(value: i64) -> Expr {
        Expr::Constant(Constant::Int(value), Span::dummy())
    }

    pub fn bool(value: bool) -> Expr {
        Expr::Constant(Constant::Bool(value), Span::dummy())
    }

    pub fn unit() -> Expr {
        Expr::Constant(Constant::Unit, Span::dummy())
    }

    pub fn var(name: Name) -> Expr {
        Expr::Var(name, Span::dummy())
    }

    pub fn constructor(name: Name) -> Expr {
        Expr::Constructor(name, Span::dummy())
    }

    pub fn borrow(kind: BorrowKind, name: Name) -> Expr {
        Expr::Borrow(kind, name, Span::dummy())
    }

    pub fn reborrow(kind: BorrowKind, name: Name) -> Expr {
        Expr::ReBorrow(kind, name, Span::dummy())
    }

    pub fn lambda(pat: Pat, body: Expr) -> Expr {
        Expr::Lambda(pat, Box::new(body), Span::dummy())
    }

    pub fn app(callee: Expr, args: Vec<Expr>) -> Expr {
        Expr::App(Box::new(callee), args, Span::dummy())
    }

    pub fn tuple(elems: Vec<Expr>) -> Expr {
        Expr::Tuple(elems, Span::dummy())
    }

    pub fn array(elems: Vec<Expr>) -> Expr {
        Expr::Array(elems, Span::dummy())
    }

    pub fn let_(pat: Pat, value: Expr, body: Expr) -> Expr {
        Expr::Let(
            RecFlag::NonRec,
            pat,
            Box::new(value),
            Box::new(body),
            Span::dummy(),
        )
    }

    pub fn let_rec(pat: Pat, value: Expr, body: Expr) -> Expr {
        Expr::Let(
            RecFlag::Rec,
            pat,
            Box::new(value),
            Box::new(body),
            Span::dummy(),
        )
    }

    pub fn match_(scrutinee: Expr, arms: Vec<Arm>) -> Expr {
        Expr::Match(None, Box::new(scrutinee), arms, Span::dummy())
    }

    pub fn match_borrow(kind: BorrowKind, scrutinee: Expr, arms: Vec<Arm>) -> Expr {
        Expr::Match(Some(kind), Box::new(scrutinee), arms, Span::dummy())
    }

    pub fn region(vars: Vec<Name>, body: Expr) -> Expr {
        Expr::Region(vars, Box::new(body), Span::dummy())
    }
}

/// A top-level value declaration: `let [rec] name = body`.
#[derive(Clone, Debug)]
pub struct ValueDecl {
    pub rec: RecFlag,
    pub name: Name,
    pub body: Expr,
    pub span: Span,
}

/// A sequence of top-level declarations, checked in order.
#[derive(Clone, Debug, Default)]
pub struct Program {
    pub decls: Vec<ValueDecl>,
}
