//! The initial environment.
//!
//! Registers the primitive type constructors (`int`, `unit`, `bool`, and
//! the mutable `array`), integer arithmetic, the fix-point combinator, and
//! an array producer. These form the starting vocabulary of every checked
//! program; the names are minted from the session's `NameSupply` and kept
//! on the environment so the driver can type constants and array literals.

use affe_common::{Name, NameSupply};

use crate::env::Env;
use crate::kind::{Kind, KindScheme, Region};
use crate::ty::{Scheme, Ty};

/// Names of the initial environment.
#[derive(Clone, Debug)]
pub struct Builtins {
    pub int: Name,
    pub unit: Name,
    pub bool_: Name,
    pub array: Name,
    pub fix: Name,
    pub plus: Name,
    pub create: Name,
}

impl Builtins {
    /// Mint the primitive names from `supply`.
    pub fn fresh(supply: &mut NameSupply) -> Builtins {
        Builtins {
            int: supply.fresh("int"),
            unit: supply.fresh("unit"),
            bool_: supply.fresh("bool"),
            array: supply.fresh("array"),
            fix: supply.fresh("fix"),
            plus: supply.fresh("+"),
            create: supply.fresh("create"),
        }
    }
}

/// Build the initial environment.
pub fn initial_env(supply: &mut NameSupply) -> Env {
    let prim = Builtins::fresh(supply);
    let mut env = Env::new(prim.clone());

    // ── Primitive type constructors ─────────────────────────────────

    // Ground types are unrestricted everywhere.
    env.insert_type(prim.int.clone(), KindScheme::nullary(Kind::un(Region::Global)));
    env.insert_type(prim.unit.clone(), KindScheme::nullary(Kind::un(Region::Global)));
    env.insert_type(prim.bool_.clone(), KindScheme::nullary(Kind::un(Region::Global)));

    // Arrays are mutable containers: affine, whatever the element kind.
    env.insert_type(
        prim.array.clone(),
        KindScheme {
            kvars: 1,
            constraint: Vec::new(),
            params: vec![Kind::Gen(0)],
            ret: Kind::aff(Region::Global),
        },
    );

    let int = Ty::app(prim.int.clone(), vec![]);
    let unit = Ty::app(prim.unit.clone(), vec![]);

    // ── Arithmetic ──────────────────────────────────────────────────

    // Curried and unrestricted; the partial application captures only an
    // unrestricted int.
    env.insert_value(
        prim.plus.clone(),
        Scheme::mono(Ty::arrow(
            int.clone(),
            Kind::un(Region::Global),
            Ty::arrow(int.clone(), Kind::un(Region::Global), int.clone()),
        )),
    );

    // ── Fix-point combinator ────────────────────────────────────────

    // fix : ∀(α : ^k0). (α -{^k1}> α) -{^k2}> α  with  ^k0 <= un never
    // The recursive self-reference is shared, so α must be unrestricted.
    env.insert_value(
        prim.fix.clone(),
        Scheme {
            kvars: 3,
            vars: vec![Kind::Gen(0)],
            constraint: vec![(Kind::Gen(0), Kind::un(Region::Never))],
            ty: Ty::arrow(
                Ty::arrow(Ty::Gen(0), Kind::Gen(1), Ty::Gen(0)),
                Kind::Gen(2),
                Ty::Gen(0),
            ),
        },
    );

    // ── Array producer ──────────────────────────────────────────────

    // create : ∀(α : ^k0). unit -{^k1}> array<α>
    env.insert_value(
        prim.create.clone(),
        Scheme {
            kvars: 2,
            vars: vec![Kind::Gen(0)],
            constraint: Vec::new(),
            ty: Ty::arrow(
                unit,
                Kind::Gen(1),
                Ty::app(prim.array.clone(), vec![Ty::Gen(0)]),
            ),
        },
    );

    env
}
