//! The promotion/dispatch engine.
//!
//! [`DynArray`] is the tagged union over the typed-array family: one variant
//! per element kind, matched exhaustively so an unhandled combination is a
//! compile error rather than a runtime default case. Binary operations
//! promote both operands to the result kind and run a single monomorphized
//! kernel for that kind directly over the buffers, so no per-element dynamic
//! dispatch remains.
//!
//! The closed world is deliberate: arithmetic whose result kind would be
//! boolean, and operands with differing multiplicities, fail with
//! `UnsupportedKinds`/`MultiplicityMismatch` instead of falling back.

use crate::array::Array;
use crate::element::{Element, Numeric};
use crate::iter::{IndexIter, SliceIter};
use crate::kind::ElementKind;
use crate::scalar::Scalar;
use crate::shape::{broadcast_shape, Shape};
use crate::{ArrayError, Result};
use log::debug;
use num_complex::{Complex32, Complex64};

/// A typed array behind one tag per element kind.
#[derive(Debug)]
pub enum DynArray {
    Bool(Array<bool>),
    Int8(Array<i8>),
    Int16(Array<i16>),
    Int32(Array<i32>),
    Int64(Array<i64>),
    Float32(Array<f32>),
    Float64(Array<f64>),
    Complex64(Array<Complex32>),
    Complex128(Array<Complex64>),
}

macro_rules! with_each_variant {
    ($self:expr, $a:ident => $body:expr) => {
        match $self {
            DynArray::Bool($a) => $body,
            DynArray::Int8($a) => $body,
            DynArray::Int16($a) => $body,
            DynArray::Int32($a) => $body,
            DynArray::Int64($a) => $body,
            DynArray::Float32($a) => $body,
            DynArray::Float64($a) => $body,
            DynArray::Complex64($a) => $body,
            DynArray::Complex128($a) => $body,
        }
    };
}

macro_rules! dyn_from {
    ($($variant:ident => $t:ty),* $(,)?) => {
        $(
            impl From<Array<$t>> for DynArray {
                fn from(a: Array<$t>) -> Self {
                    DynArray::$variant(a)
                }
            }
        )*
    };
}

dyn_from!(
    Bool => bool,
    Int8 => i8,
    Int16 => i16,
    Int32 => i32,
    Int64 => i64,
    Float32 => f32,
    Float64 => f64,
    Complex64 => Complex32,
    Complex128 => Complex64,
);

impl DynArray {
    pub fn kind(&self) -> ElementKind {
        with_each_variant!(self, a => a.kind())
    }

    pub fn dims(&self) -> &[usize] {
        with_each_variant!(self, a => a.dims())
    }

    pub fn rank(&self) -> usize {
        with_each_variant!(self, a => a.rank())
    }

    pub fn size(&self) -> usize {
        with_each_variant!(self, a => a.size())
    }

    pub fn item_elems(&self) -> usize {
        with_each_variant!(self, a => a.item_elems())
    }

    pub fn name(&self) -> &str {
        with_each_variant!(self, a => a.name())
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        with_each_variant!(self, a => a.set_name(name))
    }

    /// Every slot widened to a complex double, in row-major order.
    pub fn as_complex_vec(&self) -> Vec<Complex64> {
        with_each_variant!(self, a => a.as_vec().iter().map(|v| v.to_complex()).collect())
    }

    /// Zero-filled array of an arbitrary kind.
    pub fn zeros(kind: ElementKind, dims: &[usize], item_elems: usize) -> Result<DynArray> {
        let shape = Shape::new(dims.to_vec())?;
        Ok(match kind {
            ElementKind::Bool => Array::<bool>::zeros_with(shape, item_elems)?.into(),
            ElementKind::Int8 => Array::<i8>::zeros_with(shape, item_elems)?.into(),
            ElementKind::Int16 => Array::<i16>::zeros_with(shape, item_elems)?.into(),
            ElementKind::Int32 => Array::<i32>::zeros_with(shape, item_elems)?.into(),
            ElementKind::Int64 => Array::<i64>::zeros_with(shape, item_elems)?.into(),
            ElementKind::Float32 => Array::<f32>::zeros_with(shape, item_elems)?.into(),
            ElementKind::Float64 => Array::<f64>::zeros_with(shape, item_elems)?.into(),
            ElementKind::Complex64 => Array::<Complex32>::zeros_with(shape, item_elems)?.into(),
            ElementKind::Complex128 => Array::<Complex64>::zeros_with(shape, item_elems)?.into(),
        })
    }

    /// A rank-0 zero of an arbitrary kind. Infallible; used for degenerate
    /// placeholders.
    pub fn zero_scalar(kind: ElementKind) -> DynArray {
        match kind {
            ElementKind::Bool => Array::scalar(false).into(),
            ElementKind::Int8 => Array::scalar(0i8).into(),
            ElementKind::Int16 => Array::scalar(0i16).into(),
            ElementKind::Int32 => Array::scalar(0i32).into(),
            ElementKind::Int64 => Array::scalar(0i64).into(),
            ElementKind::Float32 => Array::scalar(0f32).into(),
            ElementKind::Float64 => Array::scalar(0f64).into(),
            ElementKind::Complex64 => Array::scalar(Complex32::new(0.0, 0.0)).into(),
            ElementKind::Complex128 => Array::scalar(Complex64::new(0.0, 0.0)).into(),
        }
    }

    fn cast_typed<U: Element>(&self) -> Result<Array<U>> {
        with_each_variant!(self, a => a.cast::<U>())
    }

    /// Convert into an arbitrary kind through the cast funnel.
    pub fn cast_to(&self, kind: ElementKind) -> Result<DynArray> {
        Ok(match kind {
            ElementKind::Bool => self.cast_typed::<bool>()?.into(),
            ElementKind::Int8 => self.cast_typed::<i8>()?.into(),
            ElementKind::Int16 => self.cast_typed::<i16>()?.into(),
            ElementKind::Int32 => self.cast_typed::<i32>()?.into(),
            ElementKind::Int64 => self.cast_typed::<i64>()?.into(),
            ElementKind::Float32 => self.cast_typed::<f32>()?.into(),
            ElementKind::Float64 => self.cast_typed::<f64>()?.into(),
            ElementKind::Complex64 => self.cast_typed::<Complex32>()?.into(),
            ElementKind::Complex128 => self.cast_typed::<Complex64>()?.into(),
        })
    }
}

// ============================================================================
// Operators
// ============================================================================

/// The elementwise binary operations the engine dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    /// Division that substitutes zero wherever the divisor element is zero,
    /// for every kind, instead of raising or producing infinities.
    DivSafe,
    Rem,
    Pow,
}

impl BinaryOp {
    pub fn symbol(self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mul => '*',
            BinaryOp::Div | BinaryOp::DivSafe => '/',
            BinaryOp::Rem => '%',
            BinaryOp::Pow => '^',
        }
    }
}

#[inline]
fn apply_op<T: Numeric>(op: BinaryOp, x: T, y: T) -> T {
    match op {
        BinaryOp::Add => x.add(y),
        BinaryOp::Sub => x.sub(y),
        BinaryOp::Mul => x.mul(y),
        BinaryOp::Div => x.div(y),
        BinaryOp::DivSafe => {
            if y.is_zero_value() {
                T::zero()
            } else {
                x.div(y)
            }
        }
        BinaryOp::Rem => x.rem(y),
        BinaryOp::Pow => x.pow(y),
    }
}

// ============================================================================
// Expression names
// ============================================================================

const OPERATOR_SYMBOLS: [char; 6] = ['+', '-', '*', '/', '%', '^'];

fn wrap_operand(name: &str) -> String {
    if name.contains(|c| OPERATOR_SYMBOLS.contains(&c)) {
        format!("({})", name)
    } else {
        name.to_string()
    }
}

/// Cosmetic expression name for a result: operand names joined by the
/// operator symbol, parenthesized where an operand name already contains one.
pub fn derive_name(a: &str, symbol: char, b: &str) -> String {
    format!("{}{}{}", wrap_operand(a), symbol, wrap_operand(b))
}

// ============================================================================
// Kernels
// ============================================================================

fn binary_kernel<T: Numeric>(
    op: BinaryOp,
    a: &Array<T>,
    b: &Array<T>,
    out_dims: &[usize],
) -> Result<Array<T>> {
    let epi = a.item_elems();
    let out = Array::<T>::zeros_with(Shape::new(out_dims.to_vec())?, epi)?;
    let la = a.layout().broadcast_to(out_dims)?;
    let lb = b.layout().broadcast_to(out_dims)?;
    let mut ia = SliceIter::over(&la);
    let mut ib = SliceIter::over(&lb);
    a.buffer().with_slice(|sa| {
        b.buffer().with_slice(|sb| {
            out.buffer().with_slice_mut(|dst| {
                let mut w = 0usize;
                while let (Some(x), Some(y)) = (ia.next_index(), ib.next_index()) {
                    for k in 0..epi {
                        dst[w] = apply_op(op, sa[x * epi + k], sb[y * epi + k]);
                        w += 1;
                    }
                }
            })
        })
    });
    Ok(out)
}

fn scalar_kernel<T: Numeric>(op: BinaryOp, a: &Array<T>, v: T) -> Result<Array<T>> {
    let epi = a.item_elems();
    let out = Array::<T>::zeros_with(Shape::new(a.dims().to_vec())?, epi)?;
    let mut items = a.item_iter();
    a.buffer().with_slice(|src| {
        out.buffer().with_slice_mut(|dst| {
            let mut w = 0usize;
            while let Some(item) = items.next_index() {
                for k in 0..epi {
                    dst[w] = apply_op(op, src[item * epi + k], v);
                    w += 1;
                }
            }
        })
    });
    Ok(out)
}

fn unary_kernel<T: Numeric>(a: &Array<T>, f: impl Fn(T) -> T) -> Result<Array<T>> {
    let epi = a.item_elems();
    let out = Array::<T>::zeros_with(Shape::new(a.dims().to_vec())?, epi)?;
    let mut items = a.item_iter();
    a.buffer().with_slice(|src| {
        out.buffer().with_slice_mut(|dst| {
            let mut w = 0usize;
            while let Some(item) = items.next_index() {
                for k in 0..epi {
                    dst[w] = f(src[item * epi + k]);
                    w += 1;
                }
            }
        })
    });
    Ok(out)
}

// ============================================================================
// Engine entry points
// ============================================================================

macro_rules! same_kind_arms {
    ($op:expr, $ac:expr, $bc:expr, $dims:expr) => {
        match ($ac, $bc) {
            (DynArray::Int8(x), DynArray::Int8(y)) => {
                binary_kernel($op, &x, &y, $dims).map(DynArray::from)
            }
            (DynArray::Int16(x), DynArray::Int16(y)) => {
                binary_kernel($op, &x, &y, $dims).map(DynArray::from)
            }
            (DynArray::Int32(x), DynArray::Int32(y)) => {
                binary_kernel($op, &x, &y, $dims).map(DynArray::from)
            }
            (DynArray::Int64(x), DynArray::Int64(y)) => {
                binary_kernel($op, &x, &y, $dims).map(DynArray::from)
            }
            (DynArray::Float32(x), DynArray::Float32(y)) => {
                binary_kernel($op, &x, &y, $dims).map(DynArray::from)
            }
            (DynArray::Float64(x), DynArray::Float64(y)) => {
                binary_kernel($op, &x, &y, $dims).map(DynArray::from)
            }
            (DynArray::Complex64(x), DynArray::Complex64(y)) => {
                binary_kernel($op, &x, &y, $dims).map(DynArray::from)
            }
            (DynArray::Complex128(x), DynArray::Complex128(y)) => {
                binary_kernel($op, &x, &y, $dims).map(DynArray::from)
            }
            // Both operands were cast to the promoted kind above.
            (x, y) => Err(ArrayError::UnsupportedKinds(x.kind(), y.kind())),
        }
    };
}

/// Elementwise binary operation over two arrays.
///
/// 1. The result kind is the promotion of the operand kinds.
/// 2. A zero-filled result of the broadcast output shape is allocated.
/// 3. Both operands are cast to the result kind and walked through broadcast
///    layouts by a kind-specific kernel.
pub fn binary(op: BinaryOp, a: &DynArray, b: &DynArray) -> Result<DynArray> {
    if a.item_elems() != b.item_elems() {
        return Err(ArrayError::MultiplicityMismatch(
            a.item_elems(),
            b.item_elems(),
        ));
    }
    let rk = ElementKind::promote(a.kind(), b.kind());
    if rk.is_boolean() {
        return Err(ArrayError::UnsupportedKinds(a.kind(), b.kind()));
    }
    let out_dims = broadcast_shape(a.dims(), b.dims())?;
    debug!(
        "dispatch {:?}: {} with {} -> {} over {:?}",
        op,
        a.kind(),
        b.kind(),
        rk,
        out_dims
    );
    let name = derive_name(a.name(), op.symbol(), b.name());
    let ac = a.cast_to(rk)?;
    let bc = b.cast_to(rk)?;
    let mut out = same_kind_arms!(op, ac, bc, &out_dims)?;
    out.set_name(name);
    Ok(out)
}

/// Elementwise binary operation against a scalar right-hand side.
///
/// A complex scalar with a non-zero imaginary part escalates the result to
/// the array kind's matching complex kind.
pub fn binary_scalar(op: BinaryOp, a: &DynArray, s: Scalar) -> Result<DynArray> {
    let rk = s.promote_with(a.kind());
    if rk.is_boolean() {
        return Err(ArrayError::UnsupportedKinds(a.kind(), s.kind()));
    }
    debug!(
        "dispatch {:?}: {} with scalar {} -> {}",
        op,
        a.kind(),
        s,
        rk
    );
    let name = derive_name(a.name(), op.symbol(), &s.to_string());
    let ac = a.cast_to(rk)?;
    let mut out = match ac {
        DynArray::Int8(x) => scalar_kernel(op, &x, s.as_element::<i8>()).map(DynArray::from),
        DynArray::Int16(x) => scalar_kernel(op, &x, s.as_element::<i16>()).map(DynArray::from),
        DynArray::Int32(x) => scalar_kernel(op, &x, s.as_element::<i32>()).map(DynArray::from),
        DynArray::Int64(x) => scalar_kernel(op, &x, s.as_element::<i64>()).map(DynArray::from),
        DynArray::Float32(x) => scalar_kernel(op, &x, s.as_element::<f32>()).map(DynArray::from),
        DynArray::Float64(x) => scalar_kernel(op, &x, s.as_element::<f64>()).map(DynArray::from),
        DynArray::Complex64(x) => {
            scalar_kernel(op, &x, s.as_element::<Complex32>()).map(DynArray::from)
        }
        DynArray::Complex128(x) => {
            scalar_kernel(op, &x, s.as_element::<Complex64>()).map(DynArray::from)
        }
        DynArray::Bool(_) => Err(ArrayError::UnsupportedKinds(a.kind(), s.kind())),
    }?;
    out.set_name(name);
    Ok(out)
}

/// Elementwise negation.
pub fn neg(a: &DynArray) -> Result<DynArray> {
    let name = format!("-{}", wrap_operand(a.name()));
    let mut out = match a {
        DynArray::Bool(_) => {
            return Err(ArrayError::UnsupportedKinds(a.kind(), a.kind()));
        }
        DynArray::Int8(x) => DynArray::from(unary_kernel(x, |v| v.neg())?),
        DynArray::Int16(x) => DynArray::from(unary_kernel(x, |v| v.neg())?),
        DynArray::Int32(x) => DynArray::from(unary_kernel(x, |v| v.neg())?),
        DynArray::Int64(x) => DynArray::from(unary_kernel(x, |v| v.neg())?),
        DynArray::Float32(x) => DynArray::from(unary_kernel(x, |v| v.neg())?),
        DynArray::Float64(x) => DynArray::from(unary_kernel(x, |v| v.neg())?),
        DynArray::Complex64(x) => DynArray::from(unary_kernel(x, |v| v.neg())?),
        DynArray::Complex128(x) => DynArray::from(unary_kernel(x, |v| v.neg())?),
    };
    out.set_name(name);
    Ok(out)
}

impl DynArray {
    pub fn add(&self, other: &DynArray) -> Result<DynArray> {
        binary(BinaryOp::Add, self, other)
    }

    pub fn sub(&self, other: &DynArray) -> Result<DynArray> {
        binary(BinaryOp::Sub, self, other)
    }

    pub fn mul(&self, other: &DynArray) -> Result<DynArray> {
        binary(BinaryOp::Mul, self, other)
    }

    pub fn div(&self, other: &DynArray) -> Result<DynArray> {
        binary(BinaryOp::Div, self, other)
    }

    /// Division that substitutes zero for every zero-divisor element.
    pub fn div_safe(&self, other: &DynArray) -> Result<DynArray> {
        binary(BinaryOp::DivSafe, self, other)
    }

    pub fn rem(&self, other: &DynArray) -> Result<DynArray> {
        binary(BinaryOp::Rem, self, other)
    }

    pub fn pow(&self, other: &DynArray) -> Result<DynArray> {
        binary(BinaryOp::Pow, self, other)
    }

    pub fn add_scalar(&self, s: impl Into<Scalar>) -> Result<DynArray> {
        binary_scalar(BinaryOp::Add, self, s.into())
    }

    pub fn sub_scalar(&self, s: impl Into<Scalar>) -> Result<DynArray> {
        binary_scalar(BinaryOp::Sub, self, s.into())
    }

    pub fn mul_scalar(&self, s: impl Into<Scalar>) -> Result<DynArray> {
        binary_scalar(BinaryOp::Mul, self, s.into())
    }

    pub fn div_scalar(&self, s: impl Into<Scalar>) -> Result<DynArray> {
        binary_scalar(BinaryOp::Div, self, s.into())
    }

    pub fn div_safe_scalar(&self, s: impl Into<Scalar>) -> Result<DynArray> {
        binary_scalar(BinaryOp::DivSafe, self, s.into())
    }

    pub fn rem_scalar(&self, s: impl Into<Scalar>) -> Result<DynArray> {
        binary_scalar(BinaryOp::Rem, self, s.into())
    }

    pub fn pow_scalar(&self, s: impl Into<Scalar>) -> Result<DynArray> {
        binary_scalar(BinaryOp::Pow, self, s.into())
    }

    pub fn neg(&self) -> Result<DynArray> {
        neg(self)
    }
}
