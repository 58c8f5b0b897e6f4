//! Per-kind element operations behind a single trait pair.
//!
//! [`Element`] covers what every storable element supports: construction,
//! conversion through `Complex64` (the cast funnel), magnitude, finiteness and
//! formatting. [`Numeric`] adds the arithmetic used by the typed-array and
//! dispatch kernels. `bool` implements only `Element`, which keeps arithmetic
//! on boolean arrays out of the compile-time surface; the dispatch engine
//! rejects it at runtime as well.

use crate::kind::ElementKind;
use num_complex::{Complex32, Complex64};
use num_traits::Zero;
use std::fmt;

/// A storable array element.
///
/// Conversions funnel through `Complex64`: every kind can represent its
/// values as a complex double, and every kind defines how to truncate a
/// complex double back into itself. Casting between any two kinds is the
/// composition of the two.
pub trait Element: Copy + PartialEq + fmt::Debug + 'static {
    /// The registry kind this element stores as.
    const KIND: ElementKind;

    fn zero() -> Self;

    fn is_zero_value(self) -> bool;

    /// Truncation rule for this kind: integers saturate and drop the
    /// fraction (NaN becomes zero), reals drop the imaginary part, booleans
    /// test against zero.
    fn from_complex(v: Complex64) -> Self;

    fn to_complex(self) -> Complex64;

    /// Absolute value for real kinds, modulus for complex kinds.
    fn magnitude(self) -> f64;

    /// Always true for boolean and integer kinds.
    fn is_finite_value(self) -> bool;

    fn fmt_value(self) -> String;
}

/// Arithmetic over one element kind.
///
/// Division and remainder encode the per-kind zero-divisor rule: integer
/// kinds substitute zero instead of faulting, float and complex kinds follow
/// IEEE semantics. Power collapses non-finite results to zero for integer
/// kinds and propagates them unmodified for float kinds.
pub trait Numeric: Element {
    fn add(self, rhs: Self) -> Self;
    fn sub(self, rhs: Self) -> Self;
    fn mul(self, rhs: Self) -> Self;
    fn div(self, rhs: Self) -> Self;
    fn rem(self, rhs: Self) -> Self;
    fn pow(self, rhs: Self) -> Self;
    fn neg(self) -> Self;
}

macro_rules! int_element {
    ($t:ty, $kind:expr) => {
        impl Element for $t {
            const KIND: ElementKind = $kind;

            #[inline]
            fn zero() -> Self {
                0
            }

            #[inline]
            fn is_zero_value(self) -> bool {
                self == 0
            }

            #[inline]
            fn from_complex(v: Complex64) -> Self {
                // `as` saturates to the representable range and maps NaN to 0.
                v.re as $t
            }

            #[inline]
            fn to_complex(self) -> Complex64 {
                Complex64::new(self as f64, 0.0)
            }

            #[inline]
            fn magnitude(self) -> f64 {
                (self as f64).abs()
            }

            #[inline]
            fn is_finite_value(self) -> bool {
                true
            }

            fn fmt_value(self) -> String {
                format!("{}", self)
            }
        }

        impl Numeric for $t {
            #[inline]
            fn add(self, rhs: Self) -> Self {
                self.wrapping_add(rhs)
            }

            #[inline]
            fn sub(self, rhs: Self) -> Self {
                self.wrapping_sub(rhs)
            }

            #[inline]
            fn mul(self, rhs: Self) -> Self {
                self.wrapping_mul(rhs)
            }

            #[inline]
            fn div(self, rhs: Self) -> Self {
                if rhs == 0 {
                    0
                } else {
                    self.wrapping_div(rhs)
                }
            }

            #[inline]
            fn rem(self, rhs: Self) -> Self {
                if rhs == 0 {
                    0
                } else {
                    self.wrapping_rem(rhs)
                }
            }

            #[inline]
            fn pow(self, rhs: Self) -> Self {
                let v = (self as f64).powf(rhs as f64);
                if v.is_finite() {
                    v as $t
                } else {
                    0
                }
            }

            #[inline]
            fn neg(self) -> Self {
                self.wrapping_neg()
            }
        }
    };
}

int_element!(i8, ElementKind::Int8);
int_element!(i16, ElementKind::Int16);
int_element!(i32, ElementKind::Int32);
int_element!(i64, ElementKind::Int64);

macro_rules! float_element {
    ($t:ty, $kind:expr) => {
        impl Element for $t {
            const KIND: ElementKind = $kind;

            #[inline]
            fn zero() -> Self {
                <$t as Zero>::zero()
            }

            #[inline]
            fn is_zero_value(self) -> bool {
                self == 0.0
            }

            #[inline]
            fn from_complex(v: Complex64) -> Self {
                v.re as $t
            }

            #[inline]
            fn to_complex(self) -> Complex64 {
                Complex64::new(self as f64, 0.0)
            }

            #[inline]
            fn magnitude(self) -> f64 {
                (self as f64).abs()
            }

            #[inline]
            fn is_finite_value(self) -> bool {
                self.is_finite()
            }

            fn fmt_value(self) -> String {
                format!("{}", self)
            }
        }

        impl Numeric for $t {
            #[inline]
            fn add(self, rhs: Self) -> Self {
                self + rhs
            }

            #[inline]
            fn sub(self, rhs: Self) -> Self {
                self - rhs
            }

            #[inline]
            fn mul(self, rhs: Self) -> Self {
                self * rhs
            }

            #[inline]
            fn div(self, rhs: Self) -> Self {
                self / rhs
            }

            #[inline]
            fn rem(self, rhs: Self) -> Self {
                self % rhs
            }

            #[inline]
            fn pow(self, rhs: Self) -> Self {
                self.powf(rhs)
            }

            #[inline]
            fn neg(self) -> Self {
                -self
            }
        }
    };
}

float_element!(f32, ElementKind::Float32);
float_element!(f64, ElementKind::Float64);

macro_rules! complex_element {
    ($t:ty, $f:ty, $kind:expr) => {
        impl Element for $t {
            const KIND: ElementKind = $kind;

            #[inline]
            fn zero() -> Self {
                <$t as Zero>::zero()
            }

            #[inline]
            fn is_zero_value(self) -> bool {
                self.re == 0.0 && self.im == 0.0
            }

            #[inline]
            fn from_complex(v: Complex64) -> Self {
                Self::new(v.re as $f, v.im as $f)
            }

            #[inline]
            fn to_complex(self) -> Complex64 {
                Complex64::new(self.re as f64, self.im as f64)
            }

            #[inline]
            fn magnitude(self) -> f64 {
                self.to_complex().norm()
            }

            #[inline]
            fn is_finite_value(self) -> bool {
                self.re.is_finite() && self.im.is_finite()
            }

            fn fmt_value(self) -> String {
                format!("{}", self)
            }
        }

        impl Numeric for $t {
            #[inline]
            fn add(self, rhs: Self) -> Self {
                self + rhs
            }

            #[inline]
            fn sub(self, rhs: Self) -> Self {
                self - rhs
            }

            #[inline]
            fn mul(self, rhs: Self) -> Self {
                self * rhs
            }

            #[inline]
            fn div(self, rhs: Self) -> Self {
                self / rhs
            }

            #[inline]
            fn rem(self, rhs: Self) -> Self {
                // Component-truncated quotient, mirroring real remainder.
                let q = self / rhs;
                let qt = Self::new(q.re.trunc(), q.im.trunc());
                self - rhs * qt
            }

            #[inline]
            fn pow(self, rhs: Self) -> Self {
                self.powc(rhs)
            }

            #[inline]
            fn neg(self) -> Self {
                -self
            }
        }
    };
}

complex_element!(Complex32, f32, ElementKind::Complex64);
complex_element!(Complex64, f64, ElementKind::Complex128);

impl Element for bool {
    const KIND: ElementKind = ElementKind::Bool;

    #[inline]
    fn zero() -> Self {
        false
    }

    #[inline]
    fn is_zero_value(self) -> bool {
        !self
    }

    #[inline]
    fn from_complex(v: Complex64) -> Self {
        v.re != 0.0 || v.im != 0.0
    }

    #[inline]
    fn to_complex(self) -> Complex64 {
        Complex64::new(if self { 1.0 } else { 0.0 }, 0.0)
    }

    #[inline]
    fn magnitude(self) -> f64 {
        if self {
            1.0
        } else {
            0.0
        }
    }

    #[inline]
    fn is_finite_value(self) -> bool {
        true
    }

    fn fmt_value(self) -> String {
        format!("{}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_divide_by_zero_substitutes_zero() {
        assert_eq!(Numeric::div(7i32, 0), 0);
        assert_eq!(Numeric::rem(7i32, 0), 0);
        assert_eq!(Numeric::div(-3i8, 0), 0);
    }

    #[test]
    fn test_integer_pow_collapses_non_finite() {
        // 0^-1 is infinite in double arithmetic; integer kinds collapse it.
        assert_eq!(Numeric::pow(0i32, -1), 0);
        // Ordinary powers survive.
        assert_eq!(Numeric::pow(2i32, 10), 1024);
        // Fractional results truncate through the double path.
        assert_eq!(Numeric::pow(2i32, -1), 0);
    }

    #[test]
    fn test_float_pow_propagates_non_finite() {
        assert!(Numeric::pow(0.0f64, -1.0).is_infinite());
        assert!(Numeric::pow(-1.0f64, 0.5).is_nan());
    }

    #[test]
    fn test_conversion_funnel() {
        let c = 300i64.to_complex();
        assert_eq!(c.re, 300.0);
        // Saturating truncation into a narrower integer.
        assert_eq!(<i8 as Element>::from_complex(c), i8::MAX);
        assert_eq!(<i32 as Element>::from_complex(c), 300);
        // NaN truncates to zero for integers.
        assert_eq!(
            <i32 as Element>::from_complex(Complex64::new(f64::NAN, 0.0)),
            0
        );
        // Booleans test against zero, imaginary part included.
        assert!(<bool as Element>::from_complex(Complex64::new(0.0, 2.0)));
        assert!(!<bool as Element>::from_complex(Complex64::new(0.0, 0.0)));
    }

    #[test]
    fn test_complex_magnitude() {
        let z = Complex64::new(3.0, 4.0);
        assert_eq!(z.magnitude(), 5.0);
    }

    #[test]
    fn test_complex_remainder() {
        let a = Complex64::new(7.0, 0.0);
        let b = Complex64::new(3.0, 0.0);
        let r = Numeric::rem(a, b);
        assert_eq!(r, Complex64::new(1.0, 0.0));
    }
}
