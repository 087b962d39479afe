//! The abstract value lattice the analyzer propagates: `Nothing` (not yet
//! reached) below every `Constant(c, ty)`, below `NonConst(ty)` at the top.
//!
//! Join only ever raises a value in this order, which is what lets the
//! def-worklist fixed point terminate (spec.md §4.3's monotonicity
//! invariant).

use std::fmt;

use cps_ir::PrimitiveConstant;

/// A value abstracted for constant propagation, parameterized over the
/// concrete type representation `Ty` a [`crate::type_system::TypeSystem`]
/// chooses to use.
#[derive(Clone, PartialEq, Debug)]
pub enum Lattice<Ty> {
    /// No definition has reached this point yet.
    Nothing,
    /// Exactly one constant value has reached this point.
    Constant(PrimitiveConstant, Ty),
    /// Two or more distinct constants (or a non-constant source) have
    /// reached this point; this value may never be folded.
    NonConst(Ty),
}

impl<Ty: Clone + PartialEq> Lattice<Ty> {
    pub fn ty(&self) -> Option<&Ty> {
        match self {
            Lattice::Nothing => None,
            Lattice::Constant(_, ty) | Lattice::NonConst(ty) => Some(ty),
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Lattice::Constant(..))
    }

    pub fn as_constant(&self) -> Option<&PrimitiveConstant> {
        match self {
            Lattice::Constant(c, _) => Some(c),
            _ => None,
        }
    }

    /// `true` when this value is definitely the boolean constant `b`.
    pub fn is_bool(&self, b: bool) -> bool {
        matches!(self, Lattice::Constant(PrimitiveConstant::Bool(v), _) if *v == b)
    }

    /// Join two lattice values that agree on `ty` (callers combine the
    /// `Ty` side of things themselves via [`crate::type_system::TypeSystem::join`]
    /// and pass the joined type in here).
    ///
    /// `Nothing` is the identity; two distinct constants collapse to
    /// `NonConst`; anything joined with `NonConst` stays `NonConst`.
    pub fn join(&self, other: &Self, joined_ty: Ty) -> Self {
        match (self, other) {
            (Lattice::Nothing, x) | (x, Lattice::Nothing) => match x {
                Lattice::Nothing => Lattice::Nothing,
                Lattice::Constant(c, _) => Lattice::Constant(c.clone(), joined_ty),
                Lattice::NonConst(_) => Lattice::NonConst(joined_ty),
            },
            (Lattice::NonConst(_), _) | (_, Lattice::NonConst(_)) => Lattice::NonConst(joined_ty),
            (Lattice::Constant(a, _), Lattice::Constant(b, _)) => {
                if a == b {
                    Lattice::Constant(a.clone(), joined_ty)
                } else {
                    Lattice::NonConst(joined_ty)
                }
            }
        }
    }

    /// `true` if `new` is at least as high as `self` in the lattice order —
    /// the invariant the analyzer asserts every time it overwrites a
    /// definition's value (spec.md §4.3).
    pub fn rises_to(&self, new: &Self) -> bool {
        match (self, new) {
            (Lattice::Nothing, _) => true,
            (Lattice::Constant(a, _), Lattice::Constant(b, _)) => a == b,
            (Lattice::Constant(..), Lattice::NonConst(_)) => true,
            (Lattice::Constant(..), Lattice::Nothing) => false,
            (Lattice::NonConst(_), Lattice::NonConst(_)) => true,
            (Lattice::NonConst(_), _) => false,
        }
    }
}

impl<Ty> Default for Lattice<Ty> {
    /// `Nothing` — absent entries in the solver's `values` map are treated
    /// as `Nothing` (spec.md §3.3).
    fn default() -> Self {
        Lattice::Nothing
    }
}

impl<Ty: fmt::Debug> fmt::Display for Lattice<Ty> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lattice::Nothing => write!(f, "⊥"),
            Lattice::Constant(c, ty) => write!(f, "{c}:{ty:?}"),
            Lattice::NonConst(ty) => write!(f, "⊤:{ty:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_is_join_identity() {
        let c = Lattice::Constant(PrimitiveConstant::Int(1), ());
        assert_eq!(Lattice::Nothing.join(&c, ()), c);
        assert_eq!(c.join(&Lattice::Nothing, ()), c);
    }

    #[test]
    fn matching_constants_join_to_constant() {
        let a = Lattice::Constant(PrimitiveConstant::Int(7), ());
        let b = Lattice::Constant(PrimitiveConstant::Int(7), ());
        assert_eq!(a.join(&b, ()), Lattice::Constant(PrimitiveConstant::Int(7), ()));
    }

    #[test]
    fn distinct_constants_join_to_non_const() {
        let a = Lattice::Constant(PrimitiveConstant::Int(1), ());
        let b = Lattice::Constant(PrimitiveConstant::Int(2), ());
        assert_eq!(a.join(&b, ()), Lattice::NonConst(()));
    }

    #[test]
    fn non_const_is_absorbing() {
        let a: Lattice<()> = Lattice::NonConst(());
        let b = Lattice::Constant(PrimitiveConstant::Bool(true), ());
        assert_eq!(a.join(&b, ()), Lattice::NonConst(()));
    }

    #[test]
    fn monotonicity_holds_along_every_edge() {
        let nothing: Lattice<()> = Lattice::Nothing;
        let constant = Lattice::Constant(PrimitiveConstant::Bool(true), ());
        let non_const: Lattice<()> = Lattice::NonConst(());
        assert!(nothing.rises_to(&constant));
        assert!(constant.rises_to(&non_const));
        assert!(nothing.rises_to(&non_const));
        assert!(!non_const.rises_to(&constant));
        assert!(!constant.rises_to(&nothing));
    }
}
