//! Operator folding over [`PrimitiveConstant`]s (spec.md §4.3).
//!
//! Folds may decline to produce a result — an unrecognized operator or
//! operands outside the folding domain is not an error, the analyzer treats
//! absence as a signal to fall back to `NonConst`.

use cps_ir::{BinaryOp, PrimitiveConstant, UnaryOp};

pub trait ConstantSystem {
    fn fold_unary(&self, op: UnaryOp, value: &PrimitiveConstant) -> Option<PrimitiveConstant>;
    fn fold_binary(
        &self,
        op: BinaryOp,
        lhs: &PrimitiveConstant,
        rhs: &PrimitiveConstant,
    ) -> Option<PrimitiveConstant>;
}

/// A straightforward folding model over [`PrimitiveConstant`], provided so
/// the analyzer is independently testable; a real front end would supply
/// its own constant system wired to its numeric tower and subtyping rules.
#[derive(Clone, Copy, Debug, Default)]
pub struct BasicConstantSystem;

impl ConstantSystem for BasicConstantSystem {
    fn fold_unary(&self, op: UnaryOp, value: &PrimitiveConstant) -> Option<PrimitiveConstant> {
        use PrimitiveConstant as C;
        match (op, value) {
            (UnaryOp::Neg, C::Int(i)) => Some(C::Int(i.checked_neg()?)),
            (UnaryOp::Neg, C::Double(d)) => Some(C::Double(-d)),
            (UnaryOp::Not, C::Bool(b)) => Some(C::Bool(!b)),
            (UnaryOp::BitNot, C::Int(i)) => Some(C::Int(!i)),
            _ => None,
        }
    }

    fn fold_binary(
        &self,
        op: BinaryOp,
        lhs: &PrimitiveConstant,
        rhs: &PrimitiveConstant,
    ) -> Option<PrimitiveConstant> {
        use PrimitiveConstant as C;
        match (op, lhs, rhs) {
            (BinaryOp::Add, C::Int(a), C::Int(b)) => Some(C::Int(a.checked_add(*b)?)),
            (BinaryOp::Sub, C::Int(a), C::Int(b)) => Some(C::Int(a.checked_sub(*b)?)),
            (BinaryOp::Mul, C::Int(a), C::Int(b)) => Some(C::Int(a.checked_mul(*b)?)),
            (BinaryOp::Div, C::Int(a), C::Int(b)) if *b != 0 => Some(C::Int(a.checked_div(*b)?)),
            (BinaryOp::Mod, C::Int(a), C::Int(b)) if *b != 0 => Some(C::Int(a.checked_rem(*b)?)),

            (BinaryOp::Add, C::Double(a), C::Double(b)) => Some(C::Double(a + b)),
            (BinaryOp::Sub, C::Double(a), C::Double(b)) => Some(C::Double(a - b)),
            (BinaryOp::Mul, C::Double(a), C::Double(b)) => Some(C::Double(a * b)),
            (BinaryOp::Div, C::Double(a), C::Double(b)) => Some(C::Double(a / b)),

            (BinaryOp::Eq, a, b) => Some(C::Bool(constants_equal(a, b))),
            (BinaryOp::NotEq, a, b) => Some(C::Bool(!constants_equal(a, b))),

            (BinaryOp::Lt, C::Int(a), C::Int(b)) => Some(C::Bool(a < b)),
            (BinaryOp::Le, C::Int(a), C::Int(b)) => Some(C::Bool(a <= b)),
            (BinaryOp::Gt, C::Int(a), C::Int(b)) => Some(C::Bool(a > b)),
            (BinaryOp::Ge, C::Int(a), C::Int(b)) => Some(C::Bool(a >= b)),
            (BinaryOp::Lt, C::Double(a), C::Double(b)) => Some(C::Bool(a < b)),
            (BinaryOp::Le, C::Double(a), C::Double(b)) => Some(C::Bool(a <= b)),
            (BinaryOp::Gt, C::Double(a), C::Double(b)) => Some(C::Bool(a > b)),
            (BinaryOp::Ge, C::Double(a), C::Double(b)) => Some(C::Bool(a >= b)),

            (BinaryOp::And, C::Bool(a), C::Bool(b)) => Some(C::Bool(*a && *b)),
            (BinaryOp::Or, C::Bool(a), C::Bool(b)) => Some(C::Bool(*a || *b)),
            (BinaryOp::BitAnd, C::Int(a), C::Int(b)) => Some(C::Int(a & b)),
            (BinaryOp::BitOr, C::Int(a), C::Int(b)) => Some(C::Int(a | b)),
            (BinaryOp::BitXor, C::Int(a), C::Int(b)) => Some(C::Int(a ^ b)),
            _ => None,
        }
    }
}

/// Structural equality on constants (NaN is never equal to anything,
/// matching IEEE 754 `==`, not the `Eq` impl used for hashing in the IR).
fn constants_equal(a: &PrimitiveConstant, b: &PrimitiveConstant) -> bool {
    use PrimitiveConstant as C;
    match (a, b) {
        (C::Bool(a), C::Bool(b)) => a == b,
        (C::Int(a), C::Int(b)) => a == b,
        (C::Double(a), C::Double(b)) => a == b,
        (C::Str(a), C::Str(b)) => a == b,
        (C::Null, C::Null) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_integer_arithmetic() {
        let cs = BasicConstantSystem;
        let r = cs.fold_binary(BinaryOp::Add, &PrimitiveConstant::Int(2), &PrimitiveConstant::Int(3));
        assert_eq!(r, Some(PrimitiveConstant::Int(5)));
    }

    #[test]
    fn division_by_zero_declines_to_fold() {
        let cs = BasicConstantSystem;
        let r = cs.fold_binary(BinaryOp::Div, &PrimitiveConstant::Int(1), &PrimitiveConstant::Int(0));
        assert_eq!(r, None);
    }

    #[test]
    fn unrecognized_operand_kind_declines_to_fold() {
        let cs = BasicConstantSystem;
        let r = cs.fold_unary(UnaryOp::Neg, &PrimitiveConstant::Bool(true));
        assert_eq!(r, None);
    }

    #[test]
    fn equality_is_cross_type_safe() {
        let cs = BasicConstantSystem;
        let r = cs.fold_binary(
            BinaryOp::Eq,
            &PrimitiveConstant::Int(1),
            &PrimitiveConstant::Str("1".into()),
        );
        assert_eq!(r, Some(PrimitiveConstant::Bool(false)));
    }
}
