use core::fmt;

/// A primitive compile-time constant value, as carried by a `Constant`
/// primitive node and by [`Lattice::Constant`](cps_sccp::Lattice) once the
/// analyzer proves a definition is constant.
///
/// Composite constant forms (list, map, constructed instance, deferred,
/// function, interceptor, type literal, ...) are intentionally not
/// represented here: spec.md §4.6 only requires the materializer to handle
/// primitive constants, and the analyzer never folds to anything else.
#[derive(Clone, Debug, PartialEq)]
pub enum PrimitiveConstant {
    Bool(bool),
    Int(i64),
    Double(f64),
    /// Carries the literal string value, as spec.md §4.6 requires.
    Str(String),
    Null,
}

impl PrimitiveConstant {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for PrimitiveConstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Double(d) => write!(f, "{d}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Null => f.write_str("null"),
        }
    }
}

// `PrimitiveConstant` backs the `Constant` lattice value, which must support
// structural equality for the lattice's join rule (spec.md §3.2: "both are
// Constant with identical constant (structural equality)"). `f64` doesn't
// implement `Eq`, so this is provided by hand rather than derived; `NaN !=
// NaN` is the correct behavior here; two NaN constants are not considered
// the same constant; they simply both fail to compare equal and the join
// falls through to `NonConst`, same as any other differing pair.
impl Eq for PrimitiveConstant {}
