//! Typing environment with a scope stack.
//!
//! Value bindings live in a stack of frames: entering a lambda, a `let`
//! body, or a match arm pushes a frame, leaving pops it, and lookups search
//! innermost-out. Type constructors and data constructors are global tables,
//! since declarations only appear at the top level. The primitive type
//! names minted by the initial environment ride along so the driver can
//! type constants and array literals.

use rustc_hash::FxHashMap;

use affe_common::Name;

use crate::builtins::Builtins;
use crate::kind::KindScheme;
use crate::ty::Scheme;

/// The typing environment.
pub struct Env {
    /// Scope stack for value bindings. Index 0 is the global frame.
    values: Vec<FxHashMap<Name, Scheme>>,
    /// Type constructors and their kind signatures.
    types: FxHashMap<Name, KindScheme>,
    /// Data constructors and their value schemes.
    constructors: FxHashMap<Name, Scheme>,
    /// Primitive names of the initial environment.
    prim: Builtins,
}

impl Env {
    /// Create an environment with one empty global frame.
    pub fn new(prim: Builtins) -> Self {
        Env {
            values: vec![FxHashMap::default()],
            types: FxHashMap::default(),
            constructors: FxHashMap::default(),
            prim,
        }
    }

    /// The primitive names of the initial environment.
    pub fn prim(&self) -> &Builtins {
        &self.prim
    }

    // ── Scopes ──────────────────────────────────────────────────────────

    /// Push an empty frame onto the scope stack.
    pub fn push_scope(&mut self) {
        self.values.push(FxHashMap::default());
    }

    /// Pop the innermost frame.
    ///
    /// # Panics
    ///
    /// Panics if only the global frame remains.
    pub fn pop_scope(&mut self) {
        assert!(self.values.len() > 1, "cannot pop the global scope");
        self.values.pop();
    }

    /// Number of frames on the stack.
    pub fn depth(&self) -> usize {
        self.values.len()
    }

    // ── Value bindings ──────────────────────────────────────────────────

    /// Bind a value name in the innermost frame.
    pub fn insert_value(&mut self, name: Name, scheme: Scheme) {
        self.values
            .last_mut()
            .expect("scope stack should never be empty")
            .insert(name, scheme);
    }

    /// Look up a value binding, innermost frame first.
    pub fn lookup_value(&self, name: &Name) -> Option<&Scheme> {
        for frame in self.values.iter().rev() {
            if let Some(scheme) = frame.get(name) {
                return Some(scheme);
            }
        }
        None
    }

    /// Remove a value binding from the innermost frame that has it.
    pub fn remove_value(&mut self, name: &Name) -> Option<Scheme> {
        for frame in self.values.iter_mut().rev() {
            if let Some(scheme) = frame.remove(name) {
                return Some(scheme);
            }
        }
        None
    }

    /// Keep only the value bindings satisfying `pred`, across all frames.
    pub fn retain_values(&mut self, mut pred: impl FnMut(&Name, &Scheme) -> bool) {
        for frame in self.values.iter_mut() {
            frame.retain(|name, scheme| pred(name, scheme));
        }
    }

    /// Iterate over every value scheme currently in scope.
    pub fn value_schemes(&self) -> impl Iterator<Item = &Scheme> {
        self.values.iter().flat_map(|frame| frame.values())
    }

    // ── Type constructors ───────────────────────────────────────────────

    pub fn insert_type(&mut self, name: Name, scheme: KindScheme) {
        self.types.insert(name, scheme);
    }

    pub fn lookup_type(&self, name: &Name) -> Option<&KindScheme> {
        self.types.get(name)
    }

    /// Remove a type constructor binding.
    pub fn remove_type(&mut self, name: &Name) -> Option<KindScheme> {
        self.types.remove(name)
    }

    // ── Data constructors ───────────────────────────────────────────────

    pub fn insert_constructor(&mut self, name: Name, scheme: Scheme) {
        self.constructors.insert(name, scheme);
    }

    pub fn lookup_constructor(&self, name: &Name) -> Option<&Scheme> {
        self.constructors.get(name)
    }

    /// Remove a data constructor binding.
    pub fn remove_constructor(&mut self, name: &Name) -> Option<Scheme> {
        self.constructors.remove(name)
    }
}
