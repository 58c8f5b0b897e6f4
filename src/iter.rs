//! The index-iterator protocol.
//!
//! Every traversal in the engine goes through one of these iterators; client
//! code never does raw coordinate arithmetic. An iterator produces a lazy,
//! finite, restartable sequence of buffer slots:
//!
//! - [`ContiguousIter`]: slots `0..len`, O(1) step.
//! - [`SliceIter`]: per-dimension start/stop/step walk of a strided layout.
//!   The fastest-varying dimension increments first and overflow carries into
//!   slower dimensions (odometer order); a negative step reverses.
//! - [`PositionIter`]: odometer that also exposes the coordinate tuple of the
//!   most recently yielded slot.
//! - [`MaskedIter`]: walks a layout and a same-shape boolean selector in
//!   lockstep, yielding only selected positions.
//! - [`GatherIter`] / [`MultiGatherIter`]: yield slots named by one flat
//!   index array or by per-dimension index arrays zipped elementwise.
//!
//! Iterators are single-threaded; concurrent mutation of iterator state is
//! unsupported.

use crate::buffer::Buffer;
use crate::shape::{Layout, SliceRange};
use crate::{ArrayError, Result};
use log::warn;

/// A finite, restartable sequence of buffer slots.
pub trait IndexIter {
    /// The next slot, or `None` when exhausted.
    fn next_index(&mut self) -> Option<usize>;

    /// Rewind to the first slot.
    fn reset(&mut self);

    /// Total number of slots the full walk yields.
    fn trip_count(&self) -> usize;

    /// Shape of the selection, used to size materialized results.
    fn dims(&self) -> &[usize];
}

// ============================================================================
// Odometer core
// ============================================================================

/// Row-major odometer over a strided layout.
#[derive(Debug, Clone)]
struct Odometer {
    dims: Vec<usize>,
    steps: Vec<isize>,
    base: isize,
    counters: Vec<usize>,
    pos: isize,
    total: usize,
    done: bool,
}

impl Odometer {
    fn new(layout: &Layout) -> Self {
        let dims = layout.dims().to_vec();
        let total = layout.size();
        Self {
            steps: layout.strides().to_vec(),
            base: layout.offset() as isize,
            counters: vec![0; dims.len()],
            pos: layout.offset() as isize,
            total,
            done: total == 0,
            dims,
        }
    }

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.done {
            return None;
        }
        let out = self.pos as usize;
        // Increment the fastest-varying dimension and carry overflow into
        // slower dimensions.
        let mut carried = true;
        for i in (0..self.dims.len()).rev() {
            self.counters[i] += 1;
            self.pos += self.steps[i];
            if self.counters[i] < self.dims[i] {
                carried = false;
                break;
            }
            self.counters[i] = 0;
            self.pos -= self.steps[i] * self.dims[i] as isize;
        }
        if carried {
            self.done = true;
        }
        Some(out)
    }

    fn reset(&mut self) {
        self.counters.iter_mut().for_each(|c| *c = 0);
        self.pos = self.base;
        self.done = self.total == 0;
    }
}

// ============================================================================
// Contiguous
// ============================================================================

/// Slots `0..len` in order.
#[derive(Debug, Clone)]
pub struct ContiguousIter {
    len: usize,
    pos: usize,
    out_dims: [usize; 1],
}

impl ContiguousIter {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            pos: 0,
            out_dims: [len],
        }
    }
}

impl IndexIter for ContiguousIter {
    #[inline]
    fn next_index(&mut self) -> Option<usize> {
        if self.pos < self.len {
            let out = self.pos;
            self.pos += 1;
            Some(out)
        } else {
            None
        }
    }

    fn reset(&mut self) {
        self.pos = 0;
    }

    fn trip_count(&self) -> usize {
        self.len
    }

    fn dims(&self) -> &[usize] {
        &self.out_dims
    }
}

// ============================================================================
// Strided slice
// ============================================================================

/// Odometer walk of a layout restricted by per-dimension selections.
#[derive(Debug, Clone)]
pub struct SliceIter {
    odo: Odometer,
}

impl SliceIter {
    /// Walk `layout` restricted by one [`SliceRange`] per dimension.
    ///
    /// # Errors
    /// `RankMismatch` on a wrong number of ranges, `OutOfBounds`/`ZeroStep`
    /// on an invalid selection. Validation happens here, before any slot is
    /// yielded.
    pub fn new(layout: &Layout, ranges: &[SliceRange]) -> Result<Self> {
        let sliced = layout.slice(ranges)?;
        Ok(Self {
            odo: Odometer::new(&sliced),
        })
    }

    /// Walk every item of `layout` in row-major order.
    pub fn over(layout: &Layout) -> Self {
        Self {
            odo: Odometer::new(layout),
        }
    }
}

impl IndexIter for SliceIter {
    #[inline]
    fn next_index(&mut self) -> Option<usize> {
        self.odo.next()
    }

    fn reset(&mut self) {
        self.odo.reset();
    }

    fn trip_count(&self) -> usize {
        self.odo.total
    }

    fn dims(&self) -> &[usize] {
        &self.odo.dims
    }
}

// ============================================================================
// Position
// ============================================================================

/// Like [`SliceIter`], but also exposes the coordinate of the most recently
/// yielded slot.
#[derive(Debug, Clone)]
pub struct PositionIter {
    odo: Odometer,
    current: Vec<usize>,
}

impl PositionIter {
    pub fn new(layout: &Layout, ranges: &[SliceRange]) -> Result<Self> {
        let sliced = layout.slice(ranges)?;
        let rank = sliced.rank();
        Ok(Self {
            odo: Odometer::new(&sliced),
            current: vec![0; rank],
        })
    }

    pub fn over(layout: &Layout) -> Self {
        Self {
            current: vec![0; layout.rank()],
            odo: Odometer::new(layout),
        }
    }

    /// Coordinate tuple of the slot last returned by `next_index`.
    pub fn position(&self) -> &[usize] {
        &self.current
    }
}

impl IndexIter for PositionIter {
    #[inline]
    fn next_index(&mut self) -> Option<usize> {
        if self.odo.done {
            return None;
        }
        self.current.copy_from_slice(&self.odo.counters);
        self.odo.next()
    }

    fn reset(&mut self) {
        self.odo.reset();
        self.current.iter_mut().for_each(|c| *c = 0);
    }

    fn trip_count(&self) -> usize {
        self.odo.total
    }

    fn dims(&self) -> &[usize] {
        &self.odo.dims
    }
}

// ============================================================================
// Boolean mask
// ============================================================================

/// Lockstep walk of a data layout and a same-shape boolean selector,
/// yielding only the positions where the selector is true.
#[derive(Debug)]
pub struct MaskedIter {
    data: Odometer,
    mask: Odometer,
    mask_buf: Buffer<bool>,
    selected: usize,
    out_dims: [usize; 1],
}

impl MaskedIter {
    /// # Errors
    /// `ShapeMismatch` when the selector shape differs from the data shape.
    pub fn new(data: &Layout, mask_layout: &Layout, mask_buf: Buffer<bool>) -> Result<Self> {
        if data.dims() != mask_layout.dims() {
            warn!(
                "mask shape {:?} does not match data shape {:?}",
                mask_layout.dims(),
                data.dims()
            );
            return Err(ArrayError::ShapeMismatch(
                data.dims().to_vec(),
                mask_layout.dims().to_vec(),
            ));
        }
        // The trip count is the number of selected positions, known up front.
        let mut probe = Odometer::new(mask_layout);
        let mut selected = 0usize;
        mask_buf.with_slice(|slots| {
            while let Some(slot) = probe.next() {
                if slots[slot] {
                    selected += 1;
                }
            }
        });
        Ok(Self {
            data: Odometer::new(data),
            mask: Odometer::new(mask_layout),
            mask_buf,
            selected,
            out_dims: [selected],
        })
    }
}

impl IndexIter for MaskedIter {
    fn next_index(&mut self) -> Option<usize> {
        loop {
            let m = self.mask.next()?;
            let d = self.data.next()?;
            if self.mask_buf.with_slice(|slots| slots[m]) {
                return Some(d);
            }
        }
    }

    fn reset(&mut self) {
        self.data.reset();
        self.mask.reset();
    }

    fn trip_count(&self) -> usize {
        self.selected
    }

    fn dims(&self) -> &[usize] {
        &self.out_dims
    }
}

// ============================================================================
// Integer gather
// ============================================================================

/// Slots named by a flat index array, resolved through the layout's
/// row-major item order.
#[derive(Debug, Clone)]
pub struct GatherIter {
    slots: Vec<usize>,
    pos: usize,
    out_dims: [usize; 1],
}

impl GatherIter {
    /// # Errors
    /// `OutOfBounds` for any negative or too-large index; validation happens
    /// here, before any slot is yielded.
    pub fn new(layout: &Layout, indices: &[i64]) -> Result<Self> {
        let size = layout.size();
        let mut slots = Vec::with_capacity(indices.len());
        for &raw in indices {
            if raw < 0 || raw as usize >= size {
                return Err(ArrayError::OutOfBounds {
                    index: raw.unsigned_abs() as usize,
                    extent: size,
                });
            }
            slots.push(layout.slot_of_flat(raw as usize)?);
        }
        Ok(Self {
            out_dims: [slots.len()],
            slots,
            pos: 0,
        })
    }
}

impl IndexIter for GatherIter {
    #[inline]
    fn next_index(&mut self) -> Option<usize> {
        let out = self.slots.get(self.pos).copied();
        if out.is_some() {
            self.pos += 1;
        }
        out
    }

    fn reset(&mut self) {
        self.pos = 0;
    }

    fn trip_count(&self) -> usize {
        self.slots.len()
    }

    fn dims(&self) -> &[usize] {
        &self.out_dims
    }
}

/// Slots named by per-dimension index arrays zipped elementwise: the k-th
/// yielded slot is the item at coordinate `(columns[0][k], columns[1][k], ...)`.
#[derive(Debug, Clone)]
pub struct MultiGatherIter {
    slots: Vec<usize>,
    pos: usize,
    out_dims: [usize; 1],
}

impl MultiGatherIter {
    /// # Errors
    /// `RankMismatch` when the number of index arrays differs from the rank,
    /// `SelectionMismatch` when they disagree in length, `OutOfBounds` for
    /// any index outside its dimension.
    pub fn new(layout: &Layout, columns: &[&[i64]]) -> Result<Self> {
        if columns.len() != layout.rank() {
            return Err(ArrayError::RankMismatch(columns.len(), layout.rank()));
        }
        let count = columns.first().map_or(0, |c| c.len());
        for col in columns {
            if col.len() != count {
                return Err(ArrayError::SelectionMismatch {
                    selected: count,
                    provided: col.len(),
                });
            }
        }
        let mut slots = Vec::with_capacity(count);
        let mut coords = vec![0usize; layout.rank()];
        for k in 0..count {
            for (d, col) in columns.iter().enumerate() {
                let raw = col[k];
                if raw < 0 || raw as usize >= layout.dims()[d] {
                    return Err(ArrayError::OutOfBounds {
                        index: raw.unsigned_abs() as usize,
                        extent: layout.dims()[d],
                    });
                }
                coords[d] = raw as usize;
            }
            slots.push(layout.slot(&coords)?);
        }
        Ok(Self {
            out_dims: [count],
            slots,
            pos: 0,
        })
    }
}

impl IndexIter for MultiGatherIter {
    #[inline]
    fn next_index(&mut self) -> Option<usize> {
        let out = self.slots.get(self.pos).copied();
        if out.is_some() {
            self.pos += 1;
        }
        out
    }

    fn reset(&mut self) {
        self.pos = 0;
    }

    fn trip_count(&self) -> usize {
        self.slots.len()
    }

    fn dims(&self) -> &[usize] {
        &self.out_dims
    }
}

// ============================================================================
// std::iter adapters
// ============================================================================

macro_rules! iterator_adapter {
    ($ty:ty) => {
        impl Iterator for $ty {
            type Item = usize;

            #[inline]
            fn next(&mut self) -> Option<usize> {
                IndexIter::next_index(self)
            }
        }
    };
}

iterator_adapter!(ContiguousIter);
iterator_adapter!(SliceIter);
iterator_adapter!(PositionIter);
iterator_adapter!(MaskedIter);
iterator_adapter!(GatherIter);
iterator_adapter!(MultiGatherIter);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{Layout, SliceRange};

    #[test]
    fn test_contiguous() {
        let mut it = ContiguousIter::new(4);
        assert_eq!(it.by_ref().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        assert_eq!(it.next_index(), None);
        it.reset();
        assert_eq!(it.next_index(), Some(0));
    }

    #[test]
    fn test_odometer_row_major() {
        let l = Layout::contiguous(&[2, 3]);
        let order: Vec<usize> = SliceIter::over(&l).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_odometer_carries_through_strides() {
        // Transposed 2x3: strides swapped.
        let l = Layout::new(vec![3, 2], vec![1, 3], 0, 6).unwrap();
        let order: Vec<usize> = SliceIter::over(&l).collect();
        assert_eq!(order, vec![0, 3, 1, 4, 2, 5]);
    }

    #[test]
    fn test_negative_step_reverses() {
        let l = Layout::contiguous(&[4]);
        let it = SliceIter::new(&l, &[SliceRange::reversed(4)]).unwrap();
        assert_eq!(it.collect::<Vec<_>>(), vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_slice_iter_restartable() {
        let l = Layout::contiguous(&[2, 2]);
        let mut it = SliceIter::new(&l, &[SliceRange::full(2), SliceRange::single(1)]).unwrap();
        assert_eq!(it.by_ref().collect::<Vec<_>>(), vec![1, 3]);
        it.reset();
        assert_eq!(it.collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_rank_zero_yields_once() {
        let l = Layout::contiguous(&[]);
        let mut it = SliceIter::over(&l);
        assert_eq!(it.trip_count(), 1);
        assert_eq!(it.next_index(), Some(0));
        assert_eq!(it.next_index(), None);
    }

    #[test]
    fn test_position_iter_reports_coordinates() {
        let l = Layout::contiguous(&[2, 2]);
        let mut it = PositionIter::over(&l);
        let mut seen = Vec::new();
        while let Some(slot) = it.next_index() {
            seen.push((slot, it.position().to_vec()));
        }
        assert_eq!(
            seen,
            vec![
                (0, vec![0, 0]),
                (1, vec![0, 1]),
                (2, vec![1, 0]),
                (3, vec![1, 1]),
            ]
        );
    }

    #[test]
    fn test_masked_iter() {
        let data = Layout::contiguous(&[4]);
        let mask_layout = Layout::contiguous(&[4]);
        let mask = Buffer::from_vec(vec![true, false, false, true]);
        let mut it = MaskedIter::new(&data, &mask_layout, mask).unwrap();
        assert_eq!(it.trip_count(), 2);
        assert_eq!(it.by_ref().collect::<Vec<_>>(), vec![0, 3]);
        it.reset();
        assert_eq!(it.collect::<Vec<_>>(), vec![0, 3]);
    }

    #[test]
    fn test_masked_iter_shape_mismatch() {
        let data = Layout::contiguous(&[4]);
        let mask_layout = Layout::contiguous(&[2, 2]);
        let mask = Buffer::from_vec(vec![true; 4]);
        assert!(matches!(
            MaskedIter::new(&data, &mask_layout, mask),
            Err(ArrayError::ShapeMismatch(_, _))
        ));
    }

    #[test]
    fn test_gather_validates_before_yielding() {
        let l = Layout::contiguous(&[4]);
        assert!(matches!(
            GatherIter::new(&l, &[0, 4]),
            Err(ArrayError::OutOfBounds { .. })
        ));
        assert!(matches!(
            GatherIter::new(&l, &[-1]),
            Err(ArrayError::OutOfBounds { .. })
        ));
        let it = GatherIter::new(&l, &[3, 0, 3]).unwrap();
        assert_eq!(it.collect::<Vec<_>>(), vec![3, 0, 3]);
    }

    #[test]
    fn test_gather_resolves_through_view_order() {
        // Reversed view: flat index 0 is the last buffer slot.
        let l = Layout::contiguous(&[4])
            .slice(&[SliceRange::reversed(4)])
            .unwrap();
        let it = GatherIter::new(&l, &[0, 1]).unwrap();
        assert_eq!(it.collect::<Vec<_>>(), vec![3, 2]);
    }

    #[test]
    fn test_multi_gather() {
        let l = Layout::contiguous(&[2, 2]);
        let rows = [0i64, 1];
        let cols = [1i64, 0];
        let it = MultiGatherIter::new(&l, &[&rows, &cols]).unwrap();
        assert_eq!(it.collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_multi_gather_length_mismatch() {
        let l = Layout::contiguous(&[2, 2]);
        let rows = [0i64, 1];
        let cols = [1i64];
        assert!(matches!(
            MultiGatherIter::new(&l, &[&rows, &cols]),
            Err(ArrayError::SelectionMismatch { .. })
        ));
    }
}
