//! N-dimensional strided typed-array engine.
//!
//! This crate is the storage and arithmetic core a NumPy-like surface is
//! built on: the shape/stride/buffer data model, the iterator protocol that
//! walks arbitrary views, and the per-element-kind promotion/dispatch engine.
//!
//! # Core Types
//!
//! - [`Array<T>`]: one generic typed array instantiated per element kind,
//!   owning or sharing a [`Buffer`] through a [`Layout`]
//! - [`DynArray`]: tagged union over the typed-array family, the operand type
//!   of the dispatch engine
//! - [`ElementKind`]: the element-kind registry and its promotion order
//! - [`LazyArray`]: a shape/kind descriptor whose data lives behind an
//!   external [`SliceLoader`]
//!
//! # Iterator Protocol
//!
//! All traversal goes through [`IndexIter`] implementations — never raw
//! coordinate arithmetic in client code:
//!
//! - [`ContiguousIter`]: slots `0..len`
//! - [`SliceIter`] / [`PositionIter`]: odometer walks of a strided layout
//! - [`MaskedIter`]: boolean-selector lockstep walk
//! - [`GatherIter`] / [`MultiGatherIter`]: fancy indexing
//!
//! # Example
//!
//! ```
//! use ndstride::{Array, DynArray, Shape, SliceRange};
//!
//! // A 2x2 array over owned data.
//! let base = Array::from_vec(Shape::new(vec![2, 2]).unwrap(), vec![1i32, 2, 3, 4]).unwrap();
//!
//! // Second column as an attached view: mutation aliases the base.
//! let mut col = base.slice_view(&[SliceRange::full(2), SliceRange::single(1)]).unwrap();
//! assert_eq!(col.as_vec(), vec![2, 4]);
//! col.set(&[0, 0], 9).unwrap();
//! assert_eq!(base.get(&[0, 1]).unwrap(), 9);
//!
//! // Promotion: float64 wins over int32.
//! let a: DynArray = Array::from_vec(Shape::new(vec![2]).unwrap(), vec![1.0f64, 2.0]).unwrap().into();
//! let b: DynArray = Array::from_vec(Shape::new(vec![2]).unwrap(), vec![1i32, 1]).unwrap().into();
//! let sum = a.add(&b).unwrap();
//! assert_eq!(sum.kind(), ndstride::ElementKind::Float64);
//! ```
//!
//! # Concurrency
//!
//! Single-threaded by contract: buffers are shared with `Rc`/`RefCell`, so
//! the types are `!Send` and every operation assumes exclusive access for its
//! duration. The only blocking point is [`SliceLoader::load_slice`].

pub mod array;
pub mod buffer;
pub mod dispatch;
pub mod element;
pub mod filter;
pub mod iter;
pub mod kind;
pub mod lazy;
pub mod scalar;
pub mod shape;

// ============================================================================
// Re-exports
// ============================================================================

pub use array::{Array, Extrema, Kahan};
pub use buffer::Buffer;
pub use dispatch::{binary, binary_scalar, derive_name, neg, BinaryOp, DynArray};
pub use element::{Element, Numeric};
pub use filter::{filtered, FilterOp, ImageFilter};
pub use iter::{
    ContiguousIter, GatherIter, IndexIter, MaskedIter, MultiGatherIter, PositionIter, SliceIter,
};
pub use kind::ElementKind;
pub use lazy::{LazyArray, LazySliceView, SliceLoader};
pub use scalar::Scalar;
pub use shape::{broadcast_shape, Layout, Shape, SliceRange};

// ============================================================================
// Error types
// ============================================================================

/// Errors raised by the array engine.
///
/// Every variant is raised synchronously where it is detected and never
/// swallowed inside arithmetic loops, with one documented exception: integer
/// divide/remainder by zero is caught per element and substituted with zero.
#[derive(Debug, thiserror::Error)]
pub enum ArrayError {
    /// Size computation overflowed; never silently clamped.
    #[error("size overflow computing element count for shape {0:?}")]
    SizeOverflow(Vec<usize>),

    /// Wrapped data does not hold exactly the shape's element count.
    #[error("data length {len} does not match shape {dims:?} (expected {expected})")]
    DataLength {
        dims: Vec<usize>,
        expected: usize,
        len: usize,
    },

    /// Compound arrays carry at least one element per item.
    #[error("invalid multiplicity {0}")]
    InvalidMultiplicity(usize),

    /// Operand shapes cannot be matched or broadcast.
    #[error("shape mismatch: {0:?} vs {1:?}")]
    ShapeMismatch(Vec<usize>, Vec<usize>),

    /// Coordinate or selection rank differs from the array rank.
    #[error("rank mismatch: {0} vs {1}")]
    RankMismatch(usize, usize),

    /// A selection and its source disagree in element count.
    #[error("selection of {selected} elements cannot take {provided} source elements")]
    SelectionMismatch { selected: usize, provided: usize },

    /// Lazy reshape may only add or drop size-1 dimensions at the ends.
    #[error("reshape {0:?} -> {1:?} may only add or drop unit dimensions at the ends")]
    ReshapeRestricted(Vec<usize>, Vec<usize>),

    /// Index outside an array, buffer or dimension extent.
    #[error("index {index} out of bounds for extent {extent}")]
    OutOfBounds { index: usize, extent: usize },

    /// A slice step of zero never terminates.
    #[error("zero step in dimension {dim}")]
    ZeroStep { dim: usize },

    /// The dispatch engine has no code path for this kind combination.
    #[error("no dispatch path for kinds {0} and {1}")]
    UnsupportedKinds(ElementKind, ElementKind),

    /// Operand multiplicities differ and neither side is a scalar.
    #[error("operand multiplicities differ: {0} vs {1}")]
    MultiplicityMismatch(usize, usize),

    /// Buffer allocation failed; fatal, never retried smaller.
    #[error("buffer allocation of {elems} elements failed")]
    AllocationFailed { elems: usize },

    /// No image-filter service is wired up.
    #[error("image filter service unavailable")]
    FilterUnavailable,

    /// The external loader refused or failed a slice request.
    #[error("slice load failed: {0}")]
    LoadFailed(String),
}

/// Result type for array-engine operations.
pub type Result<T> = std::result::Result<T, ArrayError>;
