//! Shapes, strided layouts and broadcast rules.
//!
//! A [`Shape`] is the validated dimension vector of an array; its size is the
//! checked product of the dimensions. A [`Layout`] adds signed strides and an
//! offset and maps coordinates to buffer slots:
//!
//! `slot = offset + Σ coord[i] · stride[i]`
//!
//! Layouts are validated at construction so that every coordinate inside the
//! shape maps to exactly one in-bounds slot; after that, iteration never
//! re-checks bounds.

use crate::{ArrayError, Result};
use log::warn;

/// Ordered non-negative dimension sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    dims: Vec<usize>,
    size: usize,
}

impl Shape {
    /// Create a shape, computing its size with overflow checking.
    ///
    /// # Errors
    /// `SizeOverflow` if the product of the dimensions does not fit in
    /// `usize`. The size is never silently clamped.
    pub fn new(dims: Vec<usize>) -> Result<Self> {
        let size = checked_size(&dims)?;
        Ok(Self { dims, size })
    }

    /// The rank-0 shape (one element, no dimensions).
    pub fn scalar() -> Self {
        Self {
            dims: Vec::new(),
            size: 1,
        }
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Total number of items: the product of the dimensions (1 for rank 0).
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Row-major strides for a contiguous array of this shape.
    pub fn row_major_strides(&self) -> Vec<isize> {
        row_major_strides(&self.dims)
    }

    pub fn into_dims(self) -> Vec<usize> {
        self.dims
    }
}

/// Checked product of a dimension vector.
pub(crate) fn checked_size(dims: &[usize]) -> Result<usize> {
    dims.iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| {
            warn!("size overflow computing element count for shape {:?}", dims);
            ArrayError::SizeOverflow(dims.to_vec())
        })
}

pub(crate) fn row_major_strides(dims: &[usize]) -> Vec<isize> {
    let mut strides = vec![1isize; dims.len()];
    for i in (0..dims.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * dims[i + 1] as isize;
    }
    strides
}

/// Per-dimension selection: positions `start + k·step` for `k in 0..count`.
///
/// Stored as start/step/count rather than start/stop so that a negative step
/// can run all the way down to position 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceRange {
    start: usize,
    step: isize,
    count: usize,
}

impl SliceRange {
    /// Selection over `start..stop` (exclusive) with the given step.
    pub fn new(start: usize, stop: usize, step: isize) -> Self {
        let count = if step > 0 {
            stop.saturating_sub(start).div_ceil(step as usize)
        } else if step < 0 {
            start.saturating_sub(stop).div_ceil(step.unsigned_abs())
        } else {
            0
        };
        Self { start, step, count }
    }

    /// Selection with an explicit trip count.
    pub fn with_count(start: usize, step: isize, count: usize) -> Self {
        Self { start, step, count }
    }

    /// The whole extent, forward.
    pub fn full(extent: usize) -> Self {
        Self {
            start: 0,
            step: 1,
            count: extent,
        }
    }

    /// A single position.
    pub fn single(index: usize) -> Self {
        Self {
            start: index,
            step: 1,
            count: 1,
        }
    }

    /// The whole extent, reversed.
    pub fn reversed(extent: usize) -> Self {
        Self {
            start: extent.saturating_sub(1),
            step: -1,
            count: extent,
        }
    }

    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    #[inline]
    pub fn step(&self) -> isize {
        self.step
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// The last visited position, if any.
    pub fn last_position(&self) -> Option<isize> {
        if self.count == 0 {
            None
        } else {
            Some(self.start as isize + (self.count as isize - 1) * self.step)
        }
    }

    /// Validate the selection against one dimension extent.
    pub(crate) fn validate(&self, dim: usize, extent: usize) -> Result<()> {
        if self.count == 0 {
            return Ok(());
        }
        if self.step == 0 {
            return Err(ArrayError::ZeroStep { dim });
        }
        if self.start >= extent {
            return Err(ArrayError::OutOfBounds {
                index: self.start,
                extent,
            });
        }
        let last = self.start as isize + (self.count as isize - 1) * self.step;
        if last < 0 || last as usize >= extent {
            return Err(ArrayError::OutOfBounds {
                index: last.unsigned_abs(),
                extent,
            });
        }
        Ok(())
    }
}

impl From<std::ops::Range<usize>> for SliceRange {
    fn from(r: std::ops::Range<usize>) -> Self {
        SliceRange::new(r.start, r.end, 1)
    }
}

/// A strided mapping from coordinates to buffer slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    dims: Vec<usize>,
    strides: Vec<isize>,
    offset: usize,
}

impl Layout {
    /// Row-major contiguous layout with offset 0.
    pub fn contiguous(dims: &[usize]) -> Self {
        Self {
            strides: row_major_strides(dims),
            dims: dims.to_vec(),
            offset: 0,
        }
    }

    /// Arbitrary strided layout, validated against a buffer extent.
    ///
    /// # Errors
    /// `RankMismatch` if strides and dims disagree in length, `OutOfBounds`
    /// if any coordinate would map outside `buffer_len` slots.
    pub fn new(
        dims: Vec<usize>,
        strides: Vec<isize>,
        offset: usize,
        buffer_len: usize,
    ) -> Result<Self> {
        if dims.len() != strides.len() {
            return Err(ArrayError::RankMismatch(dims.len(), strides.len()));
        }
        let layout = Self {
            dims,
            strides,
            offset,
        };
        layout.validate_extent(buffer_len)?;
        Ok(layout)
    }

    /// Check that the minimum and maximum reachable slots are in bounds.
    fn validate_extent(&self, buffer_len: usize) -> Result<()> {
        if self.dims.contains(&0) {
            return Ok(());
        }
        let mut lo = self.offset as isize;
        let mut hi = self.offset as isize;
        for (&d, &s) in self.dims.iter().zip(&self.strides) {
            let span = (d as isize - 1) * s;
            if span >= 0 {
                hi += span;
            } else {
                lo += span;
            }
        }
        if lo < 0 {
            return Err(ArrayError::OutOfBounds {
                index: lo.unsigned_abs(),
                extent: buffer_len,
            });
        }
        if hi as usize >= buffer_len {
            return Err(ArrayError::OutOfBounds {
                index: hi as usize,
                extent: buffer_len,
            });
        }
        Ok(())
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Number of addressed items (product of dims, 1 for rank 0).
    #[inline]
    pub fn size(&self) -> usize {
        self.dims.iter().product()
    }

    /// True when iteration order equals memory order with no gaps.
    pub fn is_contiguous(&self) -> bool {
        let mut expected = 1isize;
        for i in (0..self.dims.len()).rev() {
            if self.dims[i] <= 1 {
                continue;
            }
            if self.strides[i] != expected {
                return false;
            }
            expected *= self.dims[i] as isize;
        }
        true
    }

    /// Map a coordinate to its buffer slot, checking rank and bounds.
    pub fn slot(&self, coords: &[usize]) -> Result<usize> {
        if coords.len() != self.dims.len() {
            return Err(ArrayError::RankMismatch(coords.len(), self.dims.len()));
        }
        let mut pos = self.offset as isize;
        for (i, &c) in coords.iter().enumerate() {
            if c >= self.dims[i] {
                return Err(ArrayError::OutOfBounds {
                    index: c,
                    extent: self.dims[i],
                });
            }
            pos += c as isize * self.strides[i];
        }
        Ok(pos as usize)
    }

    /// Map a flat row-major item index to its buffer slot.
    pub fn slot_of_flat(&self, flat: usize) -> Result<usize> {
        let size = self.size();
        if flat >= size {
            return Err(ArrayError::OutOfBounds {
                index: flat,
                extent: size,
            });
        }
        let mut rem = flat;
        let mut pos = self.offset as isize;
        for i in (0..self.dims.len()).rev() {
            let d = self.dims[i];
            pos += (rem % d) as isize * self.strides[i];
            rem /= d;
        }
        Ok(pos as usize)
    }

    /// Restrict the layout with one selection per dimension. Rank is kept;
    /// single-position selections become size-1 dimensions.
    pub fn slice(&self, ranges: &[SliceRange]) -> Result<Layout> {
        if ranges.len() != self.dims.len() {
            return Err(ArrayError::RankMismatch(ranges.len(), self.dims.len()));
        }
        let mut dims = Vec::with_capacity(ranges.len());
        let mut strides = Vec::with_capacity(ranges.len());
        let mut offset = self.offset as isize;
        for (i, r) in ranges.iter().enumerate() {
            r.validate(i, self.dims[i])?;
            dims.push(r.count());
            strides.push(self.strides[i] * r.step());
            offset += r.start() as isize * self.strides[i];
        }
        Ok(Layout {
            dims,
            strides,
            offset: offset as usize,
        })
    }

    /// Promote the layout to a broadcast target shape.
    ///
    /// Dimensions are matched right-aligned; a source dimension of size 1
    /// broadcasts by taking stride 0, and missing leading dimensions are
    /// prepended with stride 0.
    pub fn broadcast_to(&self, target: &[usize]) -> Result<Layout> {
        if target.len() < self.dims.len() {
            return Err(ArrayError::RankMismatch(self.dims.len(), target.len()));
        }
        let lead = target.len() - self.dims.len();
        let mut strides = vec![0isize; target.len()];
        for i in 0..self.dims.len() {
            let sdim = self.dims[i];
            let tdim = target[lead + i];
            if sdim == tdim {
                strides[lead + i] = self.strides[i];
            } else if sdim == 1 {
                strides[lead + i] = 0;
            } else {
                warn!(
                    "cannot broadcast shape {:?} to {:?}",
                    self.dims, target
                );
                return Err(ArrayError::ShapeMismatch(
                    self.dims.clone(),
                    target.to_vec(),
                ));
            }
        }
        Ok(Layout {
            dims: target.to_vec(),
            strides,
            offset: self.offset,
        })
    }
}

/// Common broadcast shape of two dimension vectors, right-aligned, under the
/// size-1 rule.
///
/// # Errors
/// `ShapeMismatch` when a pair of sizes differs and neither is 1.
pub fn broadcast_shape(a: &[usize], b: &[usize]) -> Result<Vec<usize>> {
    let rank = a.len().max(b.len());
    let mut out = vec![0usize; rank];
    for i in 0..rank {
        let ad = if i < a.len() { a[a.len() - 1 - i] } else { 1 };
        let bd = if i < b.len() { b[b.len() - 1 - i] } else { 1 };
        out[rank - 1 - i] = if ad == bd || bd == 1 {
            ad
        } else if ad == 1 {
            bd
        } else {
            warn!("incompatible broadcast shapes {:?} and {:?}", a, b);
            return Err(ArrayError::ShapeMismatch(a.to_vec(), b.to_vec()));
        };
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_size_is_product() {
        let s = Shape::new(vec![2, 3, 4]).unwrap();
        assert_eq!(s.size(), 24);
        assert_eq!(s.rank(), 3);
        assert_eq!(Shape::scalar().size(), 1);
        assert_eq!(Shape::new(vec![5, 0, 2]).unwrap().size(), 0);
    }

    #[test]
    fn test_shape_overflow_is_fatal() {
        let err = Shape::new(vec![usize::MAX, 2]).unwrap_err();
        assert!(matches!(err, ArrayError::SizeOverflow(_)));
    }

    #[test]
    fn test_row_major_strides() {
        let s = Shape::new(vec![2, 3, 4]).unwrap();
        assert_eq!(s.row_major_strides(), vec![12, 4, 1]);
    }

    #[test]
    fn test_layout_slot() {
        let l = Layout::contiguous(&[2, 3]);
        assert_eq!(l.slot(&[0, 0]).unwrap(), 0);
        assert_eq!(l.slot(&[1, 2]).unwrap(), 5);
        assert!(matches!(
            l.slot(&[2, 0]),
            Err(ArrayError::OutOfBounds { .. })
        ));
        assert!(matches!(l.slot(&[0]), Err(ArrayError::RankMismatch(1, 2))));
    }

    #[test]
    fn test_layout_extent_validation() {
        // 2x3 starting at offset 1 needs 7 slots.
        assert!(Layout::new(vec![2, 3], vec![3, 1], 1, 6).is_err());
        assert!(Layout::new(vec![2, 3], vec![3, 1], 0, 6).is_ok());
        // Negative stride reaching below slot 0.
        assert!(Layout::new(vec![3], vec![-1], 1, 8).is_err());
        assert!(Layout::new(vec![3], vec![-1], 2, 8).is_ok());
    }

    #[test]
    fn test_layout_slice() {
        let l = Layout::contiguous(&[2, 2]);
        let s = l
            .slice(&[SliceRange::new(0, 2, 1), SliceRange::single(1)])
            .unwrap();
        assert_eq!(s.dims(), &[2, 1]);
        assert_eq!(s.slot(&[0, 0]).unwrap(), 1);
        assert_eq!(s.slot(&[1, 0]).unwrap(), 3);
    }

    #[test]
    fn test_slice_range_reversed() {
        let r = SliceRange::reversed(4);
        assert_eq!(r.count(), 4);
        assert_eq!(r.last_position(), Some(0));
        let l = Layout::contiguous(&[4]);
        let s = l.slice(&[r]).unwrap();
        assert_eq!(s.slot(&[0]).unwrap(), 3);
        assert_eq!(s.slot(&[3]).unwrap(), 0);
    }

    #[test]
    fn test_slice_range_bounds() {
        let l = Layout::contiguous(&[4]);
        assert!(l.slice(&[SliceRange::new(0, 5, 1)]).is_err());
        assert!(l.slice(&[SliceRange::with_count(0, 0, 2)]).is_err());
    }

    #[test]
    fn test_broadcast_shape() {
        assert_eq!(broadcast_shape(&[2, 3], &[1, 3]).unwrap(), vec![2, 3]);
        assert_eq!(broadcast_shape(&[4, 1], &[3]).unwrap(), vec![4, 3]);
        assert_eq!(broadcast_shape(&[], &[2, 2]).unwrap(), vec![2, 2]);
        assert!(broadcast_shape(&[2, 3], &[4, 3]).is_err());
    }

    #[test]
    fn test_broadcast_to_zero_strides() {
        let l = Layout::contiguous(&[1, 3]);
        let b = l.broadcast_to(&[4, 3]).unwrap();
        assert_eq!(b.strides(), &[0, 1]);
        assert_eq!(b.slot(&[3, 2]).unwrap(), 2);
    }

    #[test]
    fn test_slot_of_flat_matches_coords() {
        let l = Layout::contiguous(&[2, 3]).slice(&[
            SliceRange::full(2),
            SliceRange::new(0, 3, 2),
        ]);
        let l = l.unwrap();
        assert_eq!(l.slot_of_flat(0).unwrap(), l.slot(&[0, 0]).unwrap());
        assert_eq!(l.slot_of_flat(3).unwrap(), l.slot(&[1, 1]).unwrap());
    }
}
