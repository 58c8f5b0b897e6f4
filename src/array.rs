//! The generic typed array.
//!
//! [`Array<T>`] is one type instantiated per element kind. It owns or shares
//! a [`Buffer`] and pairs it with a [`Layout`]; a view is simply an `Array`
//! whose buffer handle is shared and whose layout is new. All traversal goes
//! through the iterator protocol in [`crate::iter`].
//!
//! Compound (multi-element) arrays carry an `item_elems` multiplicity: the
//! buffer holds `size × item_elems` slots and layouts address items, not
//! slots.

use crate::buffer::Buffer;
use crate::element::{Element, Numeric};
use crate::iter::{GatherIter, IndexIter, MaskedIter, MultiGatherIter, PositionIter, SliceIter};
use crate::kind::ElementKind;
use crate::shape::{Layout, Shape, SliceRange};
use crate::{ArrayError, Result};
use log::warn;
use std::cell::RefCell;
use std::fmt;

/// Compensated (Kahan) accumulator.
///
/// `err = term − comp; temp = sum + err; comp = (temp − sum) − err; sum = temp`
#[derive(Debug, Default, Clone, Copy)]
pub struct Kahan {
    sum: f64,
    comp: f64,
}

impl Kahan {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add(&mut self, term: f64) {
        let err = term - self.comp;
        let temp = self.sum + err;
        self.comp = (temp - self.sum) - err;
        self.sum = temp;
    }

    #[inline]
    pub fn value(&self) -> f64 {
        self.sum
    }
}

/// Cached minimum/maximum magnitudes and their flat item positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extrema {
    pub min: f64,
    pub max: f64,
    pub min_index: usize,
    pub max_index: usize,
}

type ExtremaCache = Option<(u64, Option<Extrema>)>;

/// An N-dimensional typed array over shared flat storage.
#[derive(Debug)]
pub struct Array<T: Element> {
    buf: Buffer<T>,
    layout: Layout,
    item_elems: usize,
    name: String,
    extrema: RefCell<ExtremaCache>,
}

// ============================================================================
// Construction
// ============================================================================

impl<T: Element> Array<T> {
    /// Zero-filled array of the given shape.
    pub fn zeros(shape: Shape) -> Result<Self> {
        Self::zeros_with(shape, 1)
    }

    /// Zero-filled compound array with `item_elems` slots per item.
    pub fn zeros_with(shape: Shape, item_elems: usize) -> Result<Self> {
        if item_elems == 0 {
            return Err(ArrayError::InvalidMultiplicity(item_elems));
        }
        let slots = shape
            .size()
            .checked_mul(item_elems)
            .ok_or_else(|| ArrayError::SizeOverflow(shape.dims().to_vec()))?;
        let buf = Buffer::zeroed(slots)?;
        Ok(Self::from_parts(buf, Layout::contiguous(shape.dims()), item_elems))
    }

    /// Wrap existing data, taking ownership.
    ///
    /// # Errors
    /// `DataLength` when the vector does not hold exactly `size` elements.
    pub fn from_vec(shape: Shape, data: Vec<T>) -> Result<Self> {
        Self::from_vec_with(shape, 1, data)
    }

    /// Wrap existing compound data, taking ownership.
    pub fn from_vec_with(shape: Shape, item_elems: usize, data: Vec<T>) -> Result<Self> {
        if item_elems == 0 {
            return Err(ArrayError::InvalidMultiplicity(item_elems));
        }
        let expected = shape
            .size()
            .checked_mul(item_elems)
            .ok_or_else(|| ArrayError::SizeOverflow(shape.dims().to_vec()))?;
        if data.len() != expected {
            warn!(
                "data length {} does not match shape {:?} with {} elements per item",
                data.len(),
                shape.dims(),
                item_elems
            );
            return Err(ArrayError::DataLength {
                dims: shape.dims().to_vec(),
                expected,
                len: data.len(),
            });
        }
        Ok(Self::from_parts(
            Buffer::from_vec(data),
            Layout::contiguous(shape.dims()),
            item_elems,
        ))
    }

    /// A rank-0 array holding one value.
    pub fn scalar(value: T) -> Self {
        Self::from_parts(Buffer::from_vec(vec![value]), Layout::contiguous(&[]), 1)
    }

    fn from_parts(buf: Buffer<T>, layout: Layout, item_elems: usize) -> Self {
        Self {
            buf,
            layout,
            item_elems,
            name: T::KIND.label().to_string(),
            extrema: RefCell::new(None),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

// ============================================================================
// Metadata
// ============================================================================

impl<T: Element> Array<T> {
    #[inline]
    pub fn kind(&self) -> ElementKind {
        T::KIND
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        self.layout.dims()
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.layout.rank()
    }

    /// Number of items (product of dims).
    #[inline]
    pub fn size(&self) -> usize {
        self.layout.size()
    }

    /// Slots per item (1 for plain arrays).
    #[inline]
    pub fn item_elems(&self) -> usize {
        self.item_elems
    }

    #[inline]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    #[inline]
    pub(crate) fn buffer(&self) -> &Buffer<T> {
        &self.buf
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Number of live holders of the backing buffer (base array + views).
    pub fn holders(&self) -> usize {
        self.buf.holders()
    }

    /// Generation of the backing buffer at the last write.
    pub fn generation(&self) -> u64 {
        self.buf.generation()
    }

    /// Whether this array shares storage with `other`.
    pub fn aliases(&self, other: &Array<T>) -> bool {
        self.buf.same_storage(&other.buf)
    }
}

// ============================================================================
// Element access
// ============================================================================

impl<T: Element> Array<T> {
    /// Read a raw buffer slot.
    pub fn get_abs(&self, slot: usize) -> Result<T> {
        self.buf.get(slot)
    }

    /// Write a raw buffer slot. Visible through every view of the buffer.
    pub fn set_abs(&mut self, slot: usize, value: T) -> Result<()> {
        self.buf.set(slot, value)
    }

    /// Read the first slot of the item at a coordinate.
    pub fn get(&self, coords: &[usize]) -> Result<T> {
        let item = self.layout.slot(coords)?;
        self.buf.get(item * self.item_elems)
    }

    /// Write the first slot of the item at a coordinate.
    pub fn set(&mut self, coords: &[usize], value: T) -> Result<()> {
        let item = self.layout.slot(coords)?;
        self.buf.set(item * self.item_elems, value)
    }

    /// Read slot `elem` of the item at a coordinate.
    pub fn get_at(&self, coords: &[usize], elem: usize) -> Result<T> {
        if elem >= self.item_elems {
            return Err(ArrayError::OutOfBounds {
                index: elem,
                extent: self.item_elems,
            });
        }
        let item = self.layout.slot(coords)?;
        self.buf.get(item * self.item_elems + elem)
    }

    /// Write slot `elem` of the item at a coordinate.
    pub fn set_at(&mut self, coords: &[usize], elem: usize, value: T) -> Result<()> {
        if elem >= self.item_elems {
            return Err(ArrayError::OutOfBounds {
                index: elem,
                extent: self.item_elems,
            });
        }
        let item = self.layout.slot(coords)?;
        self.buf.set(item * self.item_elems + elem, value)
    }

    /// All slots in row-major item order.
    pub fn as_vec(&self) -> Vec<T> {
        let epi = self.item_elems;
        let mut out = Vec::with_capacity(self.size() * epi);
        let mut items = SliceIter::over(&self.layout);
        self.buf.with_slice(|slots| {
            while let Some(item) = items.next_index() {
                for k in 0..epi {
                    out.push(slots[item * epi + k]);
                }
            }
        });
        out
    }
}

// ============================================================================
// Iterator protocol entry points
// ============================================================================

impl<T: Element> Array<T> {
    /// Row-major walk of every item.
    pub fn item_iter(&self) -> SliceIter {
        SliceIter::over(&self.layout)
    }

    /// Walk restricted by one selection per dimension.
    pub fn slice_iter(&self, ranges: &[SliceRange]) -> Result<SliceIter> {
        SliceIter::new(&self.layout, ranges)
    }

    /// Row-major walk that also reports coordinates.
    pub fn position_iter(&self) -> PositionIter {
        PositionIter::over(&self.layout)
    }

    /// Walk of the items selected by a same-shape boolean mask.
    pub fn masked_iter(&self, mask: &Array<bool>) -> Result<MaskedIter> {
        if mask.item_elems != 1 {
            return Err(ArrayError::MultiplicityMismatch(1, mask.item_elems));
        }
        MaskedIter::new(&self.layout, &mask.layout, mask.buf.share())
    }

    /// Walk of the items named by a flat integer index array.
    pub fn gather_iter(&self, indices: &Array<i64>) -> Result<GatherIter> {
        GatherIter::new(&self.layout, &indices.as_vec())
    }

    /// Walk of the items named by per-dimension index arrays.
    pub fn multi_gather_iter(&self, columns: &[&Array<i64>]) -> Result<MultiGatherIter> {
        let cols: Vec<Vec<i64>> = columns.iter().map(|c| c.as_vec()).collect();
        let refs: Vec<&[i64]> = cols.iter().map(|c| c.as_slice()).collect();
        MultiGatherIter::new(&self.layout, &refs)
    }
}

// ============================================================================
// Views, copies, casts
// ============================================================================

impl<T: Element> Array<T> {
    /// A view of the whole array: shared buffer, fresh metadata.
    pub fn view(&self) -> Array<T> {
        Array {
            buf: self.buf.share(),
            layout: self.layout.clone(),
            item_elems: self.item_elems,
            name: self.name.clone(),
            extrema: RefCell::new(None),
        }
    }

    /// A strided sub-view: shared buffer, restricted layout. Mutation
    /// through the view is visible through the base and every other view.
    pub fn slice_view(&self, ranges: &[SliceRange]) -> Result<Array<T>> {
        let layout = self.layout.slice(ranges)?;
        Ok(Array {
            buf: self.buf.share(),
            layout,
            item_elems: self.item_elems,
            name: self.name.clone(),
            extrema: RefCell::new(None),
        })
    }

    /// An independent deep copy with a fresh contiguous buffer.
    pub fn copy(&self) -> Result<Array<T>> {
        let mut out = Array::zeros_with(Shape::new(self.dims().to_vec())?, self.item_elems)?;
        out.name = self.name.clone();
        let epi = self.item_elems;
        let mut items = self.item_iter();
        self.buf.with_slice(|src| {
            out.buf.with_slice_mut(|dst| {
                let mut w = 0usize;
                while let Some(item) = items.next_index() {
                    for k in 0..epi {
                        dst[w] = src[item * epi + k];
                        w += 1;
                    }
                }
            })
        });
        Ok(out)
    }

    /// Convert element-wise into a new array of another kind.
    ///
    /// Conversion funnels through `Complex64` and applies the target kind's
    /// truncation rule.
    pub fn cast<U: Element>(&self) -> Result<Array<U>> {
        let mut out = Array::<U>::zeros_with(Shape::new(self.dims().to_vec())?, self.item_elems)?;
        out.name = self.name.clone();
        let epi = self.item_elems;
        let mut items = self.item_iter();
        self.buf.with_slice(|src| {
            out.buf.with_slice_mut(|dst| {
                let mut w = 0usize;
                while let Some(item) = items.next_index() {
                    for k in 0..epi {
                        dst[w] = U::from_complex(src[item * epi + k].to_complex());
                        w += 1;
                    }
                }
            })
        });
        Ok(out)
    }

    /// Reallocate to a new shape: fresh contiguous buffer, copying
    /// `min(old, new)` items in iteration order. Strides are dropped; views
    /// of the old buffer keep the old data.
    pub fn resize(&mut self, shape: Shape) -> Result<()> {
        let epi = self.item_elems;
        let slots = shape
            .size()
            .checked_mul(epi)
            .ok_or_else(|| ArrayError::SizeOverflow(shape.dims().to_vec()))?;
        let fresh = Buffer::zeroed(slots)?;
        let keep = self.size().min(shape.size());
        let mut items = self.item_iter();
        self.buf.with_slice(|src| {
            fresh.with_slice_mut(|dst| {
                for w in 0..keep {
                    let item = match items.next_index() {
                        Some(i) => i,
                        None => break,
                    };
                    for k in 0..epi {
                        dst[w * epi + k] = src[item * epi + k];
                    }
                }
            })
        });
        self.buf = fresh;
        self.layout = Layout::contiguous(shape.dims());
        *self.extrema.borrow_mut() = None;
        Ok(())
    }
}

// ============================================================================
// Fill and slice assignment
// ============================================================================

impl<T: Element> Array<T> {
    /// Broadcast one value into every slot the layout addresses. Through a
    /// strided view, slots outside the view keep their values.
    pub fn fill(&mut self, value: T) {
        let epi = self.item_elems;
        let mut items = self.item_iter();
        self.buf.with_slice_mut(|slots| {
            while let Some(item) = items.next_index() {
                for k in 0..epi {
                    slots[item * epi + k] = value;
                }
            }
        });
    }

    /// Copy from a same-shape array, or broadcast a one-element source.
    ///
    /// # Errors
    /// `ShapeMismatch` when shapes differ and the source is not
    /// scalar-compatible, `MultiplicityMismatch` on differing multiplicities.
    pub fn fill_from(&mut self, other: &Array<T>) -> Result<()> {
        if other.size() == 1 && other.item_elems == 1 {
            let v = other.as_vec()[0];
            self.fill(v);
            return Ok(());
        }
        if other.item_elems != self.item_elems {
            return Err(ArrayError::MultiplicityMismatch(
                self.item_elems,
                other.item_elems,
            ));
        }
        if other.size() == 1 {
            let item = other.as_vec();
            let epi = self.item_elems;
            let mut items = self.item_iter();
            self.buf.with_slice_mut(|slots| {
                while let Some(it) = items.next_index() {
                    for k in 0..epi {
                        slots[it * epi + k] = item[k];
                    }
                }
            });
            return Ok(());
        }
        if other.dims() != self.dims() {
            warn!(
                "fill source shape {:?} does not match {:?}",
                other.dims(),
                self.dims()
            );
            return Err(ArrayError::ShapeMismatch(
                self.dims().to_vec(),
                other.dims().to_vec(),
            ));
        }
        let src = other.as_vec();
        self.write_through(&mut self.item_iter(), &src)
    }

    /// Materialize the selection of any iterator as a new contiguous array.
    pub fn get_slice<I: IndexIter>(&self, iter: &mut I) -> Result<Array<T>> {
        iter.reset();
        let shape = Shape::new(iter.dims().to_vec())?;
        let mut out = Array::zeros_with(shape, self.item_elems)?;
        out.name = self.name.clone();
        let epi = self.item_elems;
        self.buf.with_slice(|src| {
            out.buf.with_slice_mut(|dst| {
                let mut w = 0usize;
                while let Some(item) = iter.next_index() {
                    for k in 0..epi {
                        dst[w] = src[item * epi + k];
                        w += 1;
                    }
                }
            })
        });
        Ok(out)
    }

    /// Write `values` through an iterator's selection.
    ///
    /// The source element count is validated against the selection size
    /// before anything is written.
    pub fn set_slice<I: IndexIter>(&mut self, iter: &mut I, values: &Array<T>) -> Result<()> {
        if values.item_elems != self.item_elems {
            return Err(ArrayError::MultiplicityMismatch(
                self.item_elems,
                values.item_elems,
            ));
        }
        iter.reset();
        if values.size() != iter.trip_count() {
            warn!(
                "selection of {} items cannot take {} source items",
                iter.trip_count(),
                values.size()
            );
            return Err(ArrayError::SelectionMismatch {
                selected: iter.trip_count(),
                provided: values.size(),
            });
        }
        let src = values.as_vec();
        self.write_through(iter, &src)
    }

    /// Write `values` at the positions a same-shape boolean mask selects.
    pub fn set_by_mask(&mut self, mask: &Array<bool>, values: &Array<T>) -> Result<()> {
        let mut iter = self.masked_iter(mask)?;
        self.set_slice(&mut iter, values)
    }

    /// Write `values` at the items a flat index array names.
    pub fn set_by_index(&mut self, indices: &Array<i64>, values: &Array<T>) -> Result<()> {
        let mut iter = self.gather_iter(indices)?;
        self.set_slice(&mut iter, values)
    }

    /// Write `values` at the items per-dimension index arrays name.
    pub fn set_by_indexes(&mut self, columns: &[&Array<i64>], values: &Array<T>) -> Result<()> {
        let mut iter = self.multi_gather_iter(columns)?;
        self.set_slice(&mut iter, values)
    }

    /// Copy a flat row-major source through an iterator's selection.
    fn write_through<I: IndexIter>(&self, iter: &mut I, src: &[T]) -> Result<()> {
        let epi = self.item_elems;
        self.buf.with_slice_mut(|dst| {
            let mut r = 0usize;
            while let Some(item) = iter.next_index() {
                for k in 0..epi {
                    dst[item * epi + k] = src[r];
                    r += 1;
                }
            }
        });
        Ok(())
    }
}

// ============================================================================
// In-place arithmetic
// ============================================================================

impl<T: Numeric> Array<T> {
    /// Apply `f` to every slot in place.
    fn apply(&mut self, f: impl Fn(T) -> T) {
        let epi = self.item_elems;
        let mut items = self.item_iter();
        self.buf.with_slice_mut(|slots| {
            while let Some(item) = items.next_index() {
                for k in 0..epi {
                    let s = item * epi + k;
                    slots[s] = f(slots[s]);
                }
            }
        });
    }

    /// Combine with `other` slot-by-slot in lockstep iteration order.
    ///
    /// Unequal trip counts are a hard error, validated before any slot is
    /// written.
    fn zip_apply(&mut self, other: &Array<T>, f: impl Fn(T, T) -> T) -> Result<()> {
        if other.item_elems != self.item_elems {
            return Err(ArrayError::MultiplicityMismatch(
                self.item_elems,
                other.item_elems,
            ));
        }
        if other.size() != self.size() {
            warn!(
                "lockstep operands disagree: {:?} vs {:?}",
                self.dims(),
                other.dims()
            );
            return Err(ArrayError::ShapeMismatch(
                self.dims().to_vec(),
                other.dims().to_vec(),
            ));
        }
        let epi = self.item_elems;
        let mut mine = self.item_iter();
        if self.buf.same_storage(&other.buf) {
            // Aliasing operand: snapshot it first so reads see pre-write
            // values.
            let src = other.as_vec();
            self.buf.with_slice_mut(|dst| {
                let mut r = 0usize;
                while let Some(item) = mine.next_index() {
                    for k in 0..epi {
                        let s = item * epi + k;
                        dst[s] = f(dst[s], src[r]);
                        r += 1;
                    }
                }
            });
        } else {
            let mut theirs = other.item_iter();
            other.buf.with_slice(|src| {
                self.buf.with_slice_mut(|dst| {
                    while let (Some(a), Some(b)) = (mine.next_index(), theirs.next_index()) {
                        for k in 0..epi {
                            dst[a * epi + k] = f(dst[a * epi + k], src[b * epi + k]);
                        }
                    }
                })
            });
        }
        Ok(())
    }

    pub fn add_scalar(&mut self, v: T) {
        self.apply(|x| x.add(v));
    }

    pub fn sub_scalar(&mut self, v: T) {
        self.apply(|x| x.sub(v));
    }

    pub fn mul_scalar(&mut self, v: T) {
        self.apply(|x| x.mul(v));
    }

    /// Divide by a scalar under the kind's zero-divisor rule: integer kinds
    /// substitute zero, float kinds follow IEEE.
    pub fn div_scalar(&mut self, v: T) {
        self.apply(|x| x.div(v));
    }

    pub fn rem_scalar(&mut self, v: T) {
        self.apply(|x| x.rem(v));
    }

    pub fn pow_scalar(&mut self, v: T) {
        self.apply(|x| x.pow(v));
    }

    pub fn add_assign(&mut self, other: &Array<T>) -> Result<()> {
        self.zip_apply(other, |x, y| x.add(y))
    }

    pub fn sub_assign(&mut self, other: &Array<T>) -> Result<()> {
        self.zip_apply(other, |x, y| x.sub(y))
    }

    pub fn mul_assign(&mut self, other: &Array<T>) -> Result<()> {
        self.zip_apply(other, |x, y| x.mul(y))
    }

    pub fn div_assign(&mut self, other: &Array<T>) -> Result<()> {
        self.zip_apply(other, |x, y| x.div(y))
    }

    pub fn rem_assign(&mut self, other: &Array<T>) -> Result<()> {
        self.zip_apply(other, |x, y| x.rem(y))
    }

    pub fn pow_assign(&mut self, other: &Array<T>) -> Result<()> {
        self.zip_apply(other, |x, y| x.pow(y))
    }

    /// Plain running sum of every slot.
    pub fn sum(&self) -> T {
        let mut acc = T::zero();
        let epi = self.item_elems;
        let mut items = self.item_iter();
        self.buf.with_slice(|slots| {
            while let Some(item) = items.next_index() {
                for k in 0..epi {
                    acc = acc.add(slots[item * epi + k]);
                }
            }
        });
        acc
    }

    /// Compensated sum of every slot, accumulated as a complex double.
    pub fn sum_compensated(&self) -> num_complex::Complex64 {
        let mut re = Kahan::new();
        let mut im = Kahan::new();
        let epi = self.item_elems;
        let mut items = self.item_iter();
        self.buf.with_slice(|slots| {
            while let Some(item) = items.next_index() {
                for k in 0..epi {
                    let c = slots[item * epi + k].to_complex();
                    re.add(c.re);
                    im.add(c.im);
                }
            }
        });
        num_complex::Complex64::new(re.value(), im.value())
    }

    /// Weighted sum of squared differences against `other`, accumulated with
    /// Kahan compensation.
    ///
    /// With `ignore_invalid`, slot pairs whose difference is not finite are
    /// skipped instead of poisoning the sum.
    pub fn residual(
        &self,
        other: &Array<T>,
        weights: Option<&Array<T>>,
        ignore_invalid: bool,
    ) -> Result<f64> {
        if other.item_elems != self.item_elems {
            return Err(ArrayError::MultiplicityMismatch(
                self.item_elems,
                other.item_elems,
            ));
        }
        if other.size() != self.size() {
            return Err(ArrayError::ShapeMismatch(
                self.dims().to_vec(),
                other.dims().to_vec(),
            ));
        }
        if let Some(w) = weights {
            if w.size() != self.size() {
                return Err(ArrayError::ShapeMismatch(
                    self.dims().to_vec(),
                    w.dims().to_vec(),
                ));
            }
        }
        let epi = self.item_elems;
        let a = self.as_vec();
        let b = other.as_vec();
        let w = weights.map(|w| w.as_vec());
        let mut acc = Kahan::new();
        for (i, (&x, &y)) in a.iter().zip(&b).enumerate() {
            let diff = x.sub(y);
            if ignore_invalid && !diff.is_finite_value() {
                continue;
            }
            let weight = match &w {
                // One weight per item, applied to each of its slots.
                Some(w) => w[i / epi].to_complex().re,
                None => 1.0,
            };
            let m = diff.magnitude();
            acc.add(weight * m * m);
        }
        Ok(acc.value())
    }
}

// ============================================================================
// Extrema cache
// ============================================================================

impl<T: Element> Array<T> {
    /// Minimum/maximum slot magnitudes with their flat positions, skipping
    /// non-finite values. `None` when nothing finite is present.
    ///
    /// The result is cached against the buffer generation: any write through
    /// this array or an aliasing view invalidates it on the next read.
    pub fn extrema(&self) -> Option<Extrema> {
        let gen = self.buf.generation();
        if let Some((cached_gen, cached)) = *self.extrema.borrow() {
            if cached_gen == gen {
                return cached;
            }
        }
        let computed = self.compute_extrema();
        *self.extrema.borrow_mut() = Some((gen, computed));
        computed
    }

    fn compute_extrema(&self) -> Option<Extrema> {
        let epi = self.item_elems;
        let mut best: Option<Extrema> = None;
        let mut items = self.item_iter();
        let mut flat = 0usize;
        self.buf.with_slice(|slots| {
            while let Some(item) = items.next_index() {
                for k in 0..epi {
                    let v = slots[item * epi + k];
                    if !v.is_finite_value() {
                        continue;
                    }
                    let m = v.magnitude();
                    match &mut best {
                        None => {
                            best = Some(Extrema {
                                min: m,
                                max: m,
                                min_index: flat,
                                max_index: flat,
                            });
                        }
                        Some(e) => {
                            if m < e.min {
                                e.min = m;
                                e.min_index = flat;
                            }
                            if m > e.max {
                                e.max = m;
                                e.max_index = flat;
                            }
                        }
                    }
                }
                flat += 1;
            }
        });
        best
    }
}

// ============================================================================
// Equality and display
// ============================================================================

impl<T: Element> PartialEq for Array<T> {
    /// Same shape, multiplicity and, for rank > 0, every lockstep-iterated
    /// slot pair equal. Rank-0 arrays are equal once shapes match.
    fn eq(&self, other: &Self) -> bool {
        if self.dims() != other.dims() || self.item_elems != other.item_elems {
            return false;
        }
        if self.rank() == 0 {
            return true;
        }
        self.as_vec() == other.as_vec()
    }
}

impl<T: Element> fmt::Display for Array<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<{}>{:?}", self.name, T::KIND, self.dims())
    }
}
