//! The abstract type information the front-end's type inferencer attaches to
//! the graph (parameter types, call-site return types, `is`/`as` targets).
//!
//! This is the concrete wire format of the type info the spec's `TypeSystem`
//! interface consumes; it is deliberately coarse (a handful of named
//! base-type bits plus a nullability flag), mirroring the "type mask" the
//! real front end would compute via dataflow type inference.

use core::fmt;

use bitflags::bitflags;

bitflags! {
    /// A set of named base types a value could have.
    #[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
    pub struct TypeBits: u16 {
        const BOOL = 1 << 0;
        const INT = 1 << 1;
        const DOUBLE = 1 << 2;
        const STRING = 1 << 3;
        const LIST = 1 << 4;
        const MAP = 1 << 5;
        const FUNCTION = 1 << 6;
        const TYPE = 1 << 7;
        const OBJECT = 1 << 8;
        const NULL_TYPE = 1 << 9;
    }
}

/// A mask over the base types a value could have at some program point, plus
/// whether `null` is included.
///
/// `join` is mask-union, exactly as spec.md §4.2 requires of the
/// type-mask realization.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct TypeMask {
    pub bits: TypeBits,
    pub nullable: bool,
}

impl TypeMask {
    pub const fn new(bits: TypeBits, nullable: bool) -> Self {
        Self { bits, nullable }
    }

    pub fn join(&self, other: &Self) -> Self {
        Self {
            bits: self.bits | other.bits,
            nullable: self.nullable || other.nullable,
        }
    }

    pub fn contains_only(&self, bits: TypeBits) -> bool {
        !self.bits.is_empty() && bits.contains(self.bits)
    }
}

impl fmt::Debug for TypeMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}{}", self.bits, if self.nullable { "?" } else { "" })
    }
}

/// The type annotation embedded directly in the graph by the (external)
/// front-end type inferencer.
///
/// `Dynamic` stands for "no useful static information"; `Known` carries a
/// concrete [`TypeMask`].
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum TypeAnnotation {
    #[default]
    Dynamic,
    Known(TypeMask),
}

/// Handle onto the couple of core types the `is`-check folding rule in
/// spec.md §4.4 needs to name (`Null`, `Object`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoreTypes {
    pub null: TypeMask,
    pub object: TypeMask,
}

impl Default for CoreTypes {
    fn default() -> Self {
        Self {
            null: TypeMask::new(TypeBits::NULL_TYPE, true),
            object: TypeMask::new(TypeBits::all(), true),
        }
    }
}
