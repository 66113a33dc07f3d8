//! Width and signedness inference.
//!
//! The rules here decide where the Verilog printer inserts explicit
//! zero-extension casts, so the two must always agree.

use crate::arena::Arena;
use crate::error::IrError;
use crate::expr::{BinaryOp, Expr, UnaryOp};
use crate::ids::SignalId;
use crate::shape::Shape;
use crate::signal::Signal;

/// Combines two operand shapes for bitwise operators and muxes.
///
/// A mixed-sign pair promotes the unsigned side by one bit before taking
/// the maximum, and the result is signed.
pub fn bitwise_shape(a: Shape, b: Shape) -> Result<Shape, IrError> {
    let width = match (a.signed, b.signed) {
        (false, false) | (true, true) => a.width.max(b.width),
        (false, true) => grow(a.width, 1, "mixed-sign operand")?.max(b.width),
        (true, false) => a.width.max(grow(b.width, 1, "mixed-sign operand")?),
    };
    Ok(Shape {
        width,
        signed: a.signed || b.signed,
    })
}

fn grow(width: u32, extra: u64, what: &str) -> Result<u32, IrError> {
    u64::from(width)
        .checked_add(extra)
        .and_then(|w| u32::try_from(w).ok())
        .ok_or_else(|| IrError::WidthOverflow {
            what: what.to_string(),
        })
}

fn shift_extra(amount: Shape, right: bool) -> Result<u64, IrError> {
    let overflow = || IrError::WidthOverflow {
        what: "shift amount".to_string(),
    };
    let exp = if amount.signed {
        amount.width.saturating_sub(1)
    } else {
        amount.width
    };
    let pow = 1u64.checked_shl(exp).filter(|_| exp < 64).ok_or_else(overflow)?;
    Ok(match (right, amount.signed) {
        (false, _) => pow - 1,
        (true, true) => pow,
        (true, false) => 0,
    })
}

/// Computes the shape of `expr` given the shapes of the signals it reads.
pub fn value_shape(expr: &Expr, signals: &Arena<SignalId, Signal>) -> Result<Shape, IrError> {
    match expr {
        Expr::Const(c) => Ok(c.shape()),
        Expr::Signal(id) => Ok(signals[*id].shape),
        Expr::ClockSignal(_) | Expr::ResetSignal { .. } => Ok(Shape::unsigned(1)),
        Expr::Unary { op, operand } => {
            let s = value_shape(operand, signals)?;
            match op {
                UnaryOp::Neg if !s.signed => Ok(Shape::signed(grow(s.width, 1, "negation")?)),
                UnaryOp::Neg | UnaryOp::Not => Ok(s),
            }
        }
        Expr::Binary { op, lhs, rhs } => {
            let a = value_shape(lhs, signals)?;
            let b = value_shape(rhs, signals)?;
            binary_shape(*op, a, b)
        }
        Expr::Mux {
            on_true, on_false, ..
        } => bitwise_shape(value_shape(on_true, signals)?, value_shape(on_false, signals)?),
        Expr::Slice { value, start, stop } => {
            let inner = value_shape(value, signals)?;
            if stop < start {
                return Err(IrError::InvertedSlice {
                    start: *start,
                    stop: *stop,
                });
            }
            if *stop > inner.width {
                return Err(IrError::SliceOutOfRange {
                    start: *start,
                    stop: *stop,
                    width: inner.width,
                });
            }
            Ok(Shape {
                width: stop - start,
                signed: inner.signed,
            })
        }
        Expr::Part { value, width, .. } => Ok(Shape {
            width: *width,
            signed: value_shape(value, signals)?.signed,
        }),
        Expr::Cat(items) => {
            let mut width = 0u32;
            for item in items {
                width = grow(width, u64::from(value_shape(item, signals)?.width), "concatenation")?;
            }
            Ok(Shape::unsigned(width))
        }
        Expr::Replicate { value, count } => {
            let w = value_shape(value, signals)?.width;
            let width = w.checked_mul(*count).ok_or_else(|| IrError::WidthOverflow {
                what: "replication".to_string(),
            })?;
            Ok(Shape::unsigned(width))
        }
        Expr::ArrayProxy { choices, .. } => {
            let mut width = 0;
            let mut signed = false;
            for choice in choices {
                let s = value_shape(choice, signals)?;
                width = width.max(s.width);
                signed |= s.signed;
            }
            Ok(Shape { width, signed })
        }
    }
}

/// Shape of a binary operation over operands of shapes `a` and `b`.
pub fn binary_shape(op: BinaryOp, a: Shape, b: Shape) -> Result<Shape, IrError> {
    match op {
        BinaryOp::Add | BinaryOp::Sub => {
            let s = bitwise_shape(a, b)?;
            if a.signed != b.signed {
                return Ok(s);
            }
            Ok(Shape {
                width: grow(s.width, 1, "sum")?,
                signed: s.signed,
            })
        }
        BinaryOp::Mul => {
            let sum = grow(a.width, u64::from(b.width), "product")?;
            match (a.signed, b.signed) {
                (false, false) => Ok(Shape::unsigned(sum)),
                (true, true) => Ok(Shape::signed(sum.saturating_sub(1))),
                _ => Ok(Shape::signed(sum)),
            }
        }
        BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => bitwise_shape(a, b),
        BinaryOp::Shl => Ok(Shape {
            width: grow(a.width, shift_extra(b, false)?, "left shift")?,
            signed: a.signed,
        }),
        BinaryOp::Shr => Ok(Shape {
            width: grow(a.width, shift_extra(b, true)?, "right shift")?,
            signed: a.signed,
        }),
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            Ok(Shape::unsigned(1))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::Design;

    #[test]
    fn add_grows_by_one() {
        for a in 1..6u32 {
            for b in 1..6u32 {
                let expect = a.max(b) + 1;
                let u = binary_shape(BinaryOp::Add, Shape::unsigned(a), Shape::unsigned(b)).unwrap();
                assert_eq!(u, Shape::unsigned(expect));
                let s = binary_shape(BinaryOp::Add, Shape::signed(a), Shape::signed(b)).unwrap();
                assert_eq!(s, Shape::signed(expect));
            }
        }
    }

    #[test]
    fn mixed_add_promotes_unsigned_side() {
        let s = binary_shape(BinaryOp::Add, Shape::unsigned(8), Shape::signed(4)).unwrap();
        assert_eq!(s, Shape::signed(9));
        let s = binary_shape(BinaryOp::Sub, Shape::signed(8), Shape::unsigned(8)).unwrap();
        assert_eq!(s, Shape::signed(9));
        let s = bitwise_shape(Shape::unsigned(8), Shape::signed(4)).unwrap();
        assert_eq!(s, Shape::signed(9));
        let s = bitwise_shape(Shape::signed(4), Shape::unsigned(4)).unwrap();
        assert_eq!(s, Shape::signed(5));
    }

    #[test]
    fn multiply_rules() {
        let m = |a, b| binary_shape(BinaryOp::Mul, a, b).unwrap();
        assert_eq!(m(Shape::unsigned(4), Shape::unsigned(3)), Shape::unsigned(7));
        assert_eq!(m(Shape::signed(4), Shape::signed(3)), Shape::signed(6));
        assert_eq!(m(Shape::signed(4), Shape::unsigned(3)), Shape::signed(7));
    }

    #[test]
    fn shift_rules() {
        let shl = |b| binary_shape(BinaryOp::Shl, Shape::signed(8), b).unwrap();
        assert_eq!(shl(Shape::unsigned(2)), Shape::signed(11));
        assert_eq!(shl(Shape::signed(3)), Shape::signed(11));
        let shr = |b| binary_shape(BinaryOp::Shr, Shape::unsigned(8), b).unwrap();
        assert_eq!(shr(Shape::unsigned(3)), Shape::unsigned(8));
        assert_eq!(shr(Shape::signed(3)), Shape::unsigned(12));
    }

    #[test]
    fn huge_shift_amount_overflows() {
        assert!(matches!(
            binary_shape(BinaryOp::Shl, Shape::unsigned(8), Shape::unsigned(64)),
            Err(IrError::WidthOverflow { .. })
        ));
    }

    #[test]
    fn comparison_is_one_bit() {
        let s = binary_shape(BinaryOp::Lt, Shape::signed(16), Shape::unsigned(3)).unwrap();
        assert_eq!(s, Shape::unsigned(1));
    }

    #[test]
    fn structural_nodes() {
        let mut d = Design::new();
        let a = d.signal("a", Shape::signed(8)).unwrap();
        let b = d.signal("b", 4).unwrap();
        let k = d.signal("k", 2).unwrap();
        let shape = |d: &Design, e: &Expr| d.shape_of(e).unwrap();

        assert_eq!(shape(&d, &-Expr::from(b)), Shape::signed(5));
        assert_eq!(shape(&d, &-Expr::from(a)), Shape::signed(8));
        assert_eq!(shape(&d, &!Expr::from(a)), Shape::signed(8));
        assert_eq!(shape(&d, &Expr::from(a).slice(2, 5).unwrap()), Shape::signed(3));
        assert_eq!(shape(&d, &Expr::from(a).part(k, 3)), Shape::signed(3));
        assert_eq!(shape(&d, &Expr::cat([a, b])), Shape::unsigned(12));
        assert_eq!(shape(&d, &Expr::from(b).replicate(3)), Shape::unsigned(12));
        assert_eq!(shape(&d, &Expr::array([a, b], k).unwrap()), Shape::signed(8));
        assert_eq!(shape(&d, &Expr::mux(k, a, b)), Shape::signed(8));
        assert_eq!(shape(&d, &Expr::clock("sys")), Shape::unsigned(1));
    }

    #[test]
    fn slice_past_end_fails() {
        let mut d = Design::new();
        let b = d.signal("b", 4).unwrap();
        let err = d.shape_of(&Expr::from(b).slice(2, 6).unwrap()).unwrap_err();
        assert_eq!(
            err,
            IrError::SliceOutOfRange {
                start: 2,
                stop: 6,
                width: 4
            }
        );
    }
}
