//! The erased scalar operand for mixed array/scalar dispatch.

use crate::element::Element;
use crate::kind::ElementKind;
use num_complex::{Complex32, Complex64};
use std::fmt;

/// A scalar right-hand side for the dispatch engine.
///
/// Scalars carry the widest kind of their class; promotion against an array
/// kind therefore never narrows the array. A complex scalar whose imaginary
/// part is zero promotes like a float; one with a non-zero imaginary part
/// escalates the result to the array kind's matching complex kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Complex(Complex64),
}

impl Scalar {
    /// The registry kind of the scalar itself.
    pub fn kind(&self) -> ElementKind {
        match self {
            Scalar::Bool(_) => ElementKind::Bool,
            Scalar::Int(_) => ElementKind::Int64,
            Scalar::Float(_) => ElementKind::Float64,
            Scalar::Complex(_) => ElementKind::Complex128,
        }
    }

    /// Whether the scalar carries a non-zero imaginary part.
    pub fn has_imaginary(&self) -> bool {
        matches!(self, Scalar::Complex(c) if c.im != 0.0)
    }

    pub fn to_complex(&self) -> Complex64 {
        match *self {
            Scalar::Bool(v) => Complex64::new(if v { 1.0 } else { 0.0 }, 0.0),
            Scalar::Int(v) => Complex64::new(v as f64, 0.0),
            Scalar::Float(v) => Complex64::new(v, 0.0),
            Scalar::Complex(v) => v,
        }
    }

    /// Convert into a concrete element through the cast funnel.
    pub fn as_element<T: Element>(&self) -> T {
        T::from_complex(self.to_complex())
    }

    /// Result kind for combining an array of `kind` with this scalar.
    pub fn promote_with(&self, kind: ElementKind) -> ElementKind {
        match self {
            Scalar::Complex(c) if c.im != 0.0 => {
                ElementKind::promote(kind, kind.matching_complex())
            }
            Scalar::Complex(_) | Scalar::Float(_) => {
                ElementKind::promote(kind, ElementKind::Float64)
            }
            Scalar::Int(_) => ElementKind::promote(kind, ElementKind::Int64),
            Scalar::Bool(_) => kind,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(v) => write!(f, "{}", v),
            Scalar::Int(v) => write!(f, "{}", v),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::Complex(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(v as i64)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<f32> for Scalar {
    fn from(v: f32) -> Self {
        Scalar::Float(v as f64)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<Complex32> for Scalar {
    fn from(v: Complex32) -> Self {
        Scalar::Complex(Complex64::new(v.re as f64, v.im as f64))
    }
}

impl From<Complex64> for Scalar {
    fn from(v: Complex64) -> Self {
        Scalar::Complex(v)
    }
}
