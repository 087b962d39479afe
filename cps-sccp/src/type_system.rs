//! Two concrete realizations of the abstract type domain τ the lattice and
//! analyzer are parameterized over (spec.md §4.2): a unit system for when no
//! type information is available, and a type-mask system wrapping the
//! front-end's inferred [`cps_ir::TypeMask`]s.

use cps_ir::{BinaryOp, CoreTypes, OperatorKind, PrimitiveConstant, Selector, TypeAnnotation, TypeBits, TypeMask, UnaryOp};

/// Supplies the named top-level types and the handful of queries/operations
/// the analyzer needs without caring which concrete `τ` is in play.
pub trait TypeSystem {
    type Ty: Clone + PartialEq + std::fmt::Debug;

    fn dynamic(&self) -> Self::Ty;
    fn type_type(&self) -> Self::Ty;
    fn function(&self) -> Self::Ty;
    fn bool_ty(&self) -> Self::Ty;
    fn int_ty(&self) -> Self::Ty;
    fn double_ty(&self) -> Self::Ty;
    fn string_ty(&self) -> Self::Ty;
    fn list_ty(&self) -> Self::Ty;
    fn map_ty(&self) -> Self::Ty;

    /// The type this [`TypeAnnotation`] embedded in the graph denotes, under
    /// this type system.
    fn lift(&self, annotation: TypeAnnotation) -> Self::Ty;

    fn selector_return_type(&self, selector: &Selector) -> Self::Ty {
        let _ = selector;
        self.dynamic()
    }

    fn join(&self, a: &Self::Ty, b: &Self::Ty) -> Self::Ty;

    fn type_of(&self, constant: &PrimitiveConstant) -> Self::Ty {
        match constant {
            PrimitiveConstant::Bool(_) => self.bool_ty(),
            PrimitiveConstant::Int(_) => self.int_ty(),
            PrimitiveConstant::Double(_) => self.double_ty(),
            PrimitiveConstant::Str(_) => self.string_ty(),
            PrimitiveConstant::Null => self.dynamic(),
        }
    }

    /// `true` only if every value of `ty` is a non-null boolean.
    fn is_definitely_bool(&self, ty: &Self::Ty) -> bool;

    /// `null is target` / subtype test used by the `TypeOperator` `is`-check
    /// fold (spec.md §4.4): true only if `target` is `Null` or `Object` when
    /// the receiver is statically `null`, otherwise a structural subtype
    /// test between `receiver_ty` and `target`.
    fn is_subtype(&self, receiver_ty: &Self::Ty, target: &Self::Ty) -> bool;

    fn core_null(&self) -> Self::Ty;
    fn core_object(&self) -> Self::Ty;
}

/// All types collapse to a single token — used when no static type
/// information is available. `join` is trivially the unit, `is_subtype`
/// trivially holds (nothing to refute, so the fold is conservatively
/// permissive only at the type level; the analyzer still demands a
/// statically-null receiver before folding `is`).
#[derive(Clone, Copy, Debug, Default)]
pub struct UnitTypeSystem;

impl TypeSystem for UnitTypeSystem {
    type Ty = ();

    fn dynamic(&self) {}
    fn type_type(&self) {}
    fn function(&self) {}
    fn bool_ty(&self) {}
    fn int_ty(&self) {}
    fn double_ty(&self) {}
    fn string_ty(&self) {}
    fn list_ty(&self) {}
    fn map_ty(&self) {}

    fn lift(&self, _annotation: TypeAnnotation) {}

    fn join(&self, _a: &(), _b: &()) {}

    fn is_definitely_bool(&self, _ty: &()) -> bool {
        false
    }

    fn is_subtype(&self, _receiver_ty: &(), _target: &()) -> bool {
        true
    }

    fn core_null(&self) {}
    fn core_object(&self) {}
}

/// Wraps the compiler's dataflow-inferred type masks. `join` is mask-union;
/// `is_definitely_bool` tests `containsOnlyBool ∧ ¬nullable`, exactly as
/// spec.md §4.2 specifies.
#[derive(Clone, Copy, Debug, Default)]
pub struct TypeMaskSystem {
    core: CoreTypes,
}

impl TypeMaskSystem {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TypeSystem for TypeMaskSystem {
    type Ty = TypeMask;

    fn dynamic(&self) -> TypeMask {
        TypeMask::new(TypeBits::all(), true)
    }
    fn type_type(&self) -> TypeMask {
        TypeMask::new(TypeBits::TYPE, false)
    }
    fn function(&self) -> TypeMask {
        TypeMask::new(TypeBits::FUNCTION, false)
    }
    fn bool_ty(&self) -> TypeMask {
        TypeMask::new(TypeBits::BOOL, false)
    }
    fn int_ty(&self) -> TypeMask {
        TypeMask::new(TypeBits::INT, false)
    }
    fn double_ty(&self) -> TypeMask {
        TypeMask::new(TypeBits::DOUBLE, false)
    }
    fn string_ty(&self) -> TypeMask {
        TypeMask::new(TypeBits::STRING, false)
    }
    fn list_ty(&self) -> TypeMask {
        TypeMask::new(TypeBits::LIST, false)
    }
    fn map_ty(&self) -> TypeMask {
        TypeMask::new(TypeBits::MAP, false)
    }

    fn lift(&self, annotation: TypeAnnotation) -> TypeMask {
        match annotation {
            TypeAnnotation::Dynamic => self.dynamic(),
            TypeAnnotation::Known(mask) => mask,
        }
    }

    /// Operators carry their result shape in their own kind (a comparison is
    /// always `bool`, arithmetic is always numeric); plain named methods
    /// carry no such information here, so fall back to `dynamic`.
    fn selector_return_type(&self, selector: &Selector) -> TypeMask {
        match selector.operator {
            Some(OperatorKind::Binary(
                BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge | BinaryOp::And | BinaryOp::Or,
            )) => self.bool_ty(),
            Some(OperatorKind::Binary(BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod)) => {
                TypeMask::new(TypeBits::INT | TypeBits::DOUBLE, false)
            }
            Some(OperatorKind::Binary(BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor)) => self.int_ty(),
            Some(OperatorKind::Unary(UnaryOp::Not)) => self.bool_ty(),
            Some(OperatorKind::Unary(UnaryOp::Neg)) => TypeMask::new(TypeBits::INT | TypeBits::DOUBLE, false),
            Some(OperatorKind::Unary(UnaryOp::BitNot)) => self.int_ty(),
            None => self.dynamic(),
        }
    }

    fn join(&self, a: &TypeMask, b: &TypeMask) -> TypeMask {
        a.join(b)
    }

    fn is_definitely_bool(&self, ty: &TypeMask) -> bool {
        ty.contains_only(TypeBits::BOOL) && !ty.nullable
    }

    fn is_subtype(&self, receiver_ty: &TypeMask, target: &TypeMask) -> bool {
        target.bits.contains(receiver_ty.bits)
    }

    fn core_null(&self) -> TypeMask {
        self.core.null
    }

    fn core_object(&self) -> TypeMask {
        self.core.object
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_system_collapses_everything() {
        let ts = UnitTypeSystem;
        assert_eq!(ts.join(&ts.bool_ty(), &ts.int_ty()), ());
        assert!(!ts.is_definitely_bool(&()));
    }

    #[test]
    fn type_mask_join_is_union() {
        let ts = TypeMaskSystem::new();
        let joined = ts.join(&ts.bool_ty(), &ts.int_ty());
        assert!(joined.bits.contains(TypeBits::BOOL));
        assert!(joined.bits.contains(TypeBits::INT));
    }

    #[test]
    fn type_mask_definitely_bool_requires_non_nullable_pure_bool() {
        let ts = TypeMaskSystem::new();
        assert!(ts.is_definitely_bool(&ts.bool_ty()));
        let nullable_bool = TypeMask::new(TypeBits::BOOL, true);
        assert!(!ts.is_definitely_bool(&nullable_bool));
        let joined = ts.join(&ts.bool_ty(), &ts.int_ty());
        assert!(!ts.is_definitely_bool(&joined));
    }

    #[test]
    fn null_is_subtype_of_null_and_object_only() {
        let ts = TypeMaskSystem::new();
        assert!(ts.is_subtype(&ts.core_null(), &ts.core_null()));
        assert!(ts.is_subtype(&ts.core_null(), &ts.core_object()));
        assert!(!ts.is_subtype(&ts.core_null(), &ts.int_ty()));
    }

    #[test]
    fn double_constants_have_their_own_type_distinct_from_int() {
        let ts = TypeMaskSystem::new();
        let double_ty = ts.type_of(&PrimitiveConstant::Double(1.5));
        assert!(double_ty.bits.contains(TypeBits::DOUBLE));
        assert!(!double_ty.bits.contains(TypeBits::INT));
    }

    #[test]
    fn selector_return_type_gives_the_mask_system_precision_the_unit_system_lacks() {
        let masks = TypeMaskSystem::new();
        let eq = Selector::binary_operator(BinaryOp::Eq);
        assert_eq!(masks.selector_return_type(&eq), masks.bool_ty());

        let add = Selector::binary_operator(BinaryOp::Add);
        let add_ty = masks.selector_return_type(&add);
        assert!(add_ty.bits.contains(TypeBits::INT) && add_ty.bits.contains(TypeBits::DOUBLE));

        // a plain named method carries no operator info to refine from.
        let method = Selector::method("foo", 0);
        assert_eq!(masks.selector_return_type(&method), masks.dynamic());

        // the unit system, lacking any mask, collapses every case to `()`.
        let unit = UnitTypeSystem;
        assert_eq!(unit.selector_return_type(&eq), ());
        assert_eq!(unit.selector_return_type(&add), ());
    }
}
