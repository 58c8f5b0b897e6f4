//! Element-kind registry.
//!
//! Enumerates the element kinds the engine stores, their storage widths,
//! and the total order used for arithmetic promotion. Compound (multi-element)
//! arrays reuse these kinds with an elements-per-item multiplicity carried by
//! the array itself, so the registry stays a flat enum.

use num_complex::Complex64 as C64;
use std::fmt;

/// The element kinds supported by the engine.
///
/// Variants are declared in promotion order, so [`ElementKind::promote`] is
/// simply `max` under the derived `Ord`:
///
/// `Bool < Int8 < Int16 < Int32 < Int64 < Float32 < Float64 < Complex64 < Complex128`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ElementKind {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Complex64,
    Complex128,
}

impl ElementKind {
    /// All kinds in promotion order.
    pub const ALL: [ElementKind; 9] = [
        ElementKind::Bool,
        ElementKind::Int8,
        ElementKind::Int16,
        ElementKind::Int32,
        ElementKind::Int64,
        ElementKind::Float32,
        ElementKind::Float64,
        ElementKind::Complex64,
        ElementKind::Complex128,
    ];

    /// Storage width of one slot in bytes.
    pub fn storage_width(self) -> usize {
        match self {
            ElementKind::Bool | ElementKind::Int8 => 1,
            ElementKind::Int16 => 2,
            ElementKind::Int32 | ElementKind::Float32 => 4,
            ElementKind::Int64 | ElementKind::Float64 | ElementKind::Complex64 => 8,
            ElementKind::Complex128 => 16,
        }
    }

    #[inline]
    pub fn is_boolean(self) -> bool {
        self == ElementKind::Bool
    }

    #[inline]
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            ElementKind::Int8 | ElementKind::Int16 | ElementKind::Int32 | ElementKind::Int64
        )
    }

    #[inline]
    pub fn is_float(self) -> bool {
        matches!(self, ElementKind::Float32 | ElementKind::Float64)
    }

    #[inline]
    pub fn is_complex(self) -> bool {
        matches!(self, ElementKind::Complex64 | ElementKind::Complex128)
    }

    /// The complex kind a real kind escalates to when combined with a
    /// scalar carrying a non-zero imaginary part.
    ///
    /// Only `Float32` is narrow enough for `Complex64`; every other real
    /// kind promotes through `Float64` and lands on `Complex128`. Complex
    /// kinds map to themselves.
    pub fn matching_complex(self) -> ElementKind {
        match self {
            ElementKind::Float32 | ElementKind::Complex64 => ElementKind::Complex64,
            ElementKind::Complex128 => ElementKind::Complex128,
            _ => ElementKind::Complex128,
        }
    }

    /// The zero representation, expressed in the widest kind.
    pub fn zero_repr(self) -> C64 {
        C64::new(0.0, 0.0)
    }

    /// The invalid ("no data") representation, expressed in the widest kind.
    ///
    /// Float and complex kinds use NaN; boolean and integer kinds have no
    /// invalid slot value and fall back to zero.
    pub fn invalid_repr(self) -> C64 {
        if self.is_float() || self.is_complex() {
            C64::new(f64::NAN, 0.0)
        } else {
            C64::new(0.0, 0.0)
        }
    }

    /// Result kind for combining two operand kinds: the larger in promotion
    /// order. Total and symmetric.
    #[inline]
    pub fn promote(a: ElementKind, b: ElementKind) -> ElementKind {
        a.max(b)
    }

    /// Short lowercase label, used in array names and error messages.
    pub fn label(self) -> &'static str {
        match self {
            ElementKind::Bool => "bool",
            ElementKind::Int8 => "int8",
            ElementKind::Int16 => "int16",
            ElementKind::Int32 => "int32",
            ElementKind::Int64 => "int64",
            ElementKind::Float32 => "float32",
            ElementKind::Float64 => "float64",
            ElementKind::Complex64 => "complex64",
            ElementKind::Complex128 => "complex128",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
