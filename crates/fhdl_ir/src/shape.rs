//! Bit-vector shapes and constants.
//!
//! A [`Shape`] is the `(width, signed)` pair carried by every value. The
//! helpers [`bits_for`] and [`log2_int`] compute the widths needed to hold
//! integers and index ranges.

use crate::error::IrError;
use num_bigint::{BigInt, Sign};
use num_traits::{One, Signed, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The width and signedness of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    /// Number of bits.
    pub width: u32,
    /// Whether the value is interpreted as two's complement.
    pub signed: bool,
}

impl Shape {
    /// An unsigned shape of `width` bits.
    pub fn unsigned(width: u32) -> Self {
        Self {
            width,
            signed: false,
        }
    }

    /// A signed shape of `width` bits.
    pub fn signed(width: u32) -> Self {
        Self {
            width,
            signed: true,
        }
    }

    /// The smallest shape able to hold every integer in `min..max`.
    ///
    /// The shape is signed iff the range contains a negative value.
    pub fn for_range(min: i64, max: i64) -> Result<Self, IrError> {
        if min >= max {
            return Err(IrError::EmptyRange { min, max });
        }
        let max = max - 1;
        let signed = min < 0 || max < 0;
        let width = bits_for(&BigInt::from(min), signed).max(bits_for(&BigInt::from(max), signed));
        Ok(Self { width, signed })
    }

    /// The smallest unsigned shape able to hold `0..max`.
    pub fn for_max(max: u64) -> Result<Self, IrError> {
        let max = i64::try_from(max).map_err(|_| IrError::WidthOverflow {
            what: format!("range 0..{max}"),
        })?;
        Self::for_range(0, max)
    }

    /// The smallest value representable in this shape.
    pub fn min_value(&self) -> BigInt {
        if self.signed && self.width > 0 {
            -(BigInt::one() << (self.width - 1))
        } else {
            BigInt::zero()
        }
    }

    /// The largest value representable in this shape.
    pub fn max_value(&self) -> BigInt {
        if self.width == 0 {
            BigInt::zero()
        } else if self.signed {
            (BigInt::one() << (self.width - 1)) - 1
        } else {
            (BigInt::one() << self.width) - 1
        }
    }

    /// Wraps an arbitrary integer into this shape.
    ///
    /// The value is truncated to `width` bits and then read back as two's
    /// complement if the shape is signed.
    pub fn wrap(&self, value: &BigInt) -> BigInt {
        if self.width == 0 {
            return BigInt::zero();
        }
        let modulus = BigInt::one() << self.width;
        let mut v = value % &modulus;
        if v.sign() == Sign::Minus {
            v += &modulus;
        }
        if self.signed && v.bit(u64::from(self.width - 1)) {
            v -= modulus;
        }
        v
    }
}

impl From<u32> for Shape {
    fn from(width: u32) -> Self {
        Shape::unsigned(width)
    }
}

/// Integer literals default to `i32`; negative widths become 0 and are
/// rejected when a signal is created.
impl From<i32> for Shape {
    fn from(width: i32) -> Self {
        Shape::unsigned(u32::try_from(width).unwrap_or(0))
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.signed { "signed" } else { "unsigned" };
        write!(f, "{kind}({})", self.width)
    }
}

/// Ceiling of the base-2 logarithm of `n`.
///
/// With `need_pow2`, a non-power-of-two `n` is an error.
pub fn log2_int(n: u64, need_pow2: bool) -> Result<u32, IrError> {
    if n == 0 {
        return Ok(0);
    }
    let r = u64::BITS - (n - 1).leading_zeros();
    if need_pow2 && (1u64 << r) != n {
        return Err(IrError::NotPowerOfTwo(n));
    }
    Ok(r)
}

/// Number of bits needed to represent `n`.
///
/// Non-positive values always get a sign bit; `require_sign_bit` adds one
/// for positive values too.
pub fn bits_for(n: &BigInt, require_sign_bit: bool) -> u32 {
    let (bits, sign_bit) = if n.is_positive() {
        (n.bits(), require_sign_bit)
    } else {
        let magnitude = -n;
        let bits = if magnitude.is_zero() {
            0
        } else {
            (magnitude - 1u32).bits()
        };
        (bits, true)
    };
    (bits as u32) + u32::from(sign_bit)
}

/// An immutable literal with a fixed shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Constant {
    value: BigInt,
    shape: Shape,
}

impl Constant {
    /// A constant whose shape is the smallest one holding `value`.
    pub fn new(value: impl Into<BigInt>) -> Self {
        let value = value.into();
        let shape = Shape {
            width: bits_for(&value, false),
            signed: value.is_negative(),
        };
        Self { value, shape }
    }

    /// A constant with an explicit shape; the value is wrapped into it.
    pub fn with_shape(value: impl Into<BigInt>, shape: Shape) -> Self {
        let value = shape.wrap(&value.into());
        Self { value, shape }
    }

    /// The literal value, already wrapped into [`shape`](Self::shape).
    pub fn value(&self) -> &BigInt {
        &self.value
    }

    /// The constant's width and signedness.
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// The value as raw two's complement bits of the constant's width.
    pub fn to_unsigned(&self) -> BigInt {
        Shape::unsigned(self.shape.width).wrap(&self.value)
    }
}

impl From<i64> for Constant {
    fn from(v: i64) -> Self {
        Constant::new(v)
    }
}

impl From<i32> for Constant {
    fn from(v: i32) -> Self {
        Constant::new(v)
    }
}

impl From<bool> for Constant {
    fn from(v: bool) -> Self {
        Constant::with_shape(i64::from(v), Shape::unsigned(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(v: i64) -> BigInt {
        BigInt::from(v)
    }

    #[test]
    fn bits_for_values() {
        assert_eq!(bits_for(&big(0), false), 1);
        assert_eq!(bits_for(&big(1), false), 1);
        assert_eq!(bits_for(&big(255), false), 8);
        assert_eq!(bits_for(&big(256), false), 9);
        assert_eq!(bits_for(&big(-1), false), 1);
        assert_eq!(bits_for(&big(-2), false), 2);
        assert_eq!(bits_for(&big(-128), false), 8);
        assert_eq!(bits_for(&big(-129), false), 9);
        assert_eq!(bits_for(&big(127), true), 8);
    }

    #[test]
    fn log2_int_rounds_up() {
        assert_eq!(log2_int(1, true).unwrap(), 0);
        assert_eq!(log2_int(16, true).unwrap(), 4);
        assert_eq!(log2_int(17, false).unwrap(), 5);
        assert!(matches!(log2_int(12, true), Err(IrError::NotPowerOfTwo(12))));
    }

    #[test]
    fn for_range_shapes() {
        assert_eq!(Shape::for_range(0, 16).unwrap(), Shape::unsigned(4));
        assert_eq!(Shape::for_range(0, 17).unwrap(), Shape::unsigned(5));
        assert_eq!(Shape::for_range(0, 1).unwrap(), Shape::unsigned(1));
        assert_eq!(Shape::for_range(-8, 8).unwrap(), Shape::signed(4));
        assert!(Shape::for_range(3, 3).is_err());
        assert_eq!(Shape::for_max(10).unwrap(), Shape::unsigned(4));
    }

    #[test]
    fn wrap_truncates_and_sign_extends() {
        assert_eq!(Shape::unsigned(4).wrap(&big(-1)), big(15));
        assert_eq!(Shape::unsigned(4).wrap(&big(17)), big(1));
        assert_eq!(Shape::signed(4).wrap(&big(8)), big(-8));
        assert_eq!(Shape::signed(4).wrap(&big(-3)), big(-3));
    }

    #[test]
    fn min_max_values() {
        assert_eq!(Shape::signed(8).min_value(), big(-128));
        assert_eq!(Shape::signed(8).max_value(), big(127));
        assert_eq!(Shape::unsigned(8).max_value(), big(255));
    }

    #[test]
    fn constant_infers_shape() {
        assert_eq!(Constant::new(5).shape(), Shape::unsigned(3));
        assert_eq!(Constant::new(-5).shape(), Shape::signed(4));
        assert_eq!(Constant::new(0).shape(), Shape::unsigned(1));
    }

    #[test]
    fn constant_raw_bits() {
        let c = Constant::with_shape(-1, Shape::signed(8));
        assert_eq!(c.value(), &big(-1));
        assert_eq!(c.to_unsigned(), big(255));
    }

    #[test]
    fn width_converts_to_unsigned_shape() {
        assert_eq!(Shape::from(8), Shape::unsigned(8));
    }

    #[test]
    fn shape_display() {
        assert_eq!(Shape::signed(3).to_string(), "signed(3)");
    }
}
