//! Loader-backed lazy arrays.
//!
//! A [`LazyArray`] is a shape/kind descriptor with no resident buffer: slice
//! requests are re-expressed against the loader's native ("original") shape
//! and delegated to an external [`SliceLoader`]. Reshape is restricted to
//! adding or dropping size-1 dimensions at the ends of the shape, which keeps
//! a 1:1 mapping between the current dimensions and the original ones.
//!
//! Slice requests are best-effort: a loader failure is logged and answered
//! with a degenerate one-element placeholder, so display-style consumers stay
//! alive. [`LazySliceView`] composes successive slices purely as metadata and
//! defers the load until [`LazySliceView::materialize`].

use crate::dispatch::DynArray;
use crate::kind::ElementKind;
use crate::shape::{Shape, SliceRange};
use crate::{ArrayError, Result};
use log::{error, warn};
use std::rc::Rc;

/// External provider of concrete slices. The only blocking point in the
/// engine; treated as synchronous I/O with no retry at this layer.
pub trait SliceLoader {
    fn is_readable(&self) -> bool;

    /// Load the selection `start[d] .. stop[d]` (exclusive, stepped) of each
    /// original dimension. `stop` is signed so a negative step can run down
    /// past position zero.
    fn load_slice(
        &self,
        original_dims: &[usize],
        start: &[usize],
        stop: &[isize],
        step: &[isize],
    ) -> Result<DynArray>;
}

/// Strip size-1 dimensions from both ends, returning the core span.
fn core_span(dims: &[usize]) -> (usize, usize) {
    let mut lo = 0;
    while lo < dims.len() && dims[lo] == 1 {
        lo += 1;
    }
    let mut hi = dims.len();
    while hi > lo && dims[hi - 1] == 1 {
        hi -= 1;
    }
    (lo, hi)
}

/// An array whose data lives behind an external loader.
pub struct LazyArray {
    dims: Vec<usize>,
    kind: ElementKind,
    item_elems: usize,
    original_dims: Vec<usize>,
    loader: Rc<dyn SliceLoader>,
    name: String,
}

impl std::fmt::Debug for LazyArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyArray")
            .field("dims", &self.dims)
            .field("kind", &self.kind)
            .field("item_elems", &self.item_elems)
            .field("original_dims", &self.original_dims)
            .field("name", &self.name)
            .finish()
    }
}

impl LazyArray {
    pub fn new(
        original_dims: Vec<usize>,
        kind: ElementKind,
        item_elems: usize,
        loader: Rc<dyn SliceLoader>,
    ) -> Result<Self> {
        if item_elems == 0 {
            return Err(ArrayError::InvalidMultiplicity(item_elems));
        }
        // Validates the size product.
        Shape::new(original_dims.clone())?;
        Ok(Self {
            dims: original_dims.clone(),
            kind,
            item_elems,
            original_dims,
            loader,
            name: kind.label().to_string(),
        })
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn size(&self) -> usize {
        self.dims.iter().product()
    }

    #[inline]
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    #[inline]
    pub fn item_elems(&self) -> usize {
        self.item_elems
    }

    /// The loader's native shape, retained across reshapes.
    #[inline]
    pub fn original_dims(&self) -> &[usize] {
        &self.original_dims
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Change the shape by inserting or removing size-1 dimensions at the
    /// ends. Anything that would disturb the non-unit run fails.
    pub fn reshape(&mut self, new_dims: Vec<usize>) -> Result<()> {
        Shape::new(new_dims.clone())?;
        let (clo, chi) = core_span(&self.dims);
        let (nlo, nhi) = core_span(&new_dims);
        if self.dims[clo..chi] != new_dims[nlo..nhi] {
            warn!(
                "lazy reshape {:?} -> {:?} would disturb the non-unit run",
                self.dims, new_dims
            );
            return Err(ArrayError::ReshapeRestricted(self.dims.clone(), new_dims));
        }
        self.dims = new_dims;
        Ok(())
    }

    /// Map current-shape selections onto the original dimensions.
    fn to_original_ranges(&self, ranges: &[SliceRange]) -> Result<Vec<SliceRange>> {
        if ranges.len() != self.dims.len() {
            return Err(ArrayError::RankMismatch(ranges.len(), self.dims.len()));
        }
        for (d, r) in ranges.iter().enumerate() {
            r.validate(d, self.dims[d])?;
        }
        let (clo, chi) = core_span(&self.dims);
        let (olo, _ohi) = core_span(&self.original_dims);
        let mut out: Vec<SliceRange> = self
            .original_dims
            .iter()
            .map(|&d| SliceRange::full(d))
            .collect();
        for (k, r) in ranges[clo..chi].iter().enumerate() {
            out[olo + k] = *r;
        }
        Ok(out)
    }

    fn load(&self, original_ranges: &[SliceRange]) -> Result<DynArray> {
        if !self.loader.is_readable() {
            return Err(ArrayError::LoadFailed("loader is not readable".into()));
        }
        let mut start = Vec::with_capacity(original_ranges.len());
        let mut stop = Vec::with_capacity(original_ranges.len());
        let mut step = Vec::with_capacity(original_ranges.len());
        for r in original_ranges {
            start.push(r.start());
            stop.push(r.start() as isize + r.count() as isize * r.step());
            step.push(r.step());
        }
        self.loader
            .load_slice(&self.original_dims, &start, &stop, &step)
    }

    /// A one-element stand-in used when the loader fails.
    fn placeholder(&self) -> DynArray {
        let mut out = DynArray::zero_scalar(self.kind);
        out.set_name(self.name.clone());
        out
    }

    /// Load a selection as a concrete array.
    ///
    /// Best-effort: on any failure (unreadable loader, bad request, loader
    /// error) the failure is logged and a degenerate one-element placeholder
    /// is returned instead of raising.
    pub fn get_slice(&self, ranges: &[SliceRange]) -> DynArray {
        match self
            .to_original_ranges(ranges)
            .and_then(|abs| self.load(&abs))
        {
            Ok(mut out) => {
                out.set_name(self.name.clone());
                out
            }
            Err(e) => {
                error!("lazy slice load failed for {}: {}", self.name, e);
                self.placeholder()
            }
        }
    }

    /// Defer a selection as metadata; no load happens until
    /// [`LazySliceView::materialize`].
    pub fn get_slice_view(&self, ranges: &[SliceRange]) -> Result<LazySliceView> {
        let abs = self.to_original_ranges(ranges)?;
        let (clo, chi) = core_span(&self.dims);
        let (olo, _) = core_span(&self.original_dims);
        let mut orig_map = vec![None; self.dims.len()];
        for (k, slot) in orig_map[clo..chi].iter_mut().enumerate() {
            *slot = Some(olo + k);
        }
        let dims = ranges.iter().map(|r| r.count()).collect();
        Ok(LazySliceView {
            dims,
            orig_map,
            abs,
            kind: self.kind,
            item_elems: self.item_elems,
            original_dims: self.original_dims.clone(),
            loader: Rc::clone(&self.loader),
            name: self.name.clone(),
        })
    }
}

/// A stack of slices over a [`LazyArray`], kept purely as metadata.
pub struct LazySliceView {
    dims: Vec<usize>,
    /// For each view dimension, the original dimension it selects in, or
    /// `None` for a synthetic unit dimension.
    orig_map: Vec<Option<usize>>,
    /// Absolute selection per original dimension.
    abs: Vec<SliceRange>,
    kind: ElementKind,
    item_elems: usize,
    original_dims: Vec<usize>,
    loader: Rc<dyn SliceLoader>,
    name: String,
}

impl std::fmt::Debug for LazySliceView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazySliceView")
            .field("dims", &self.dims)
            .field("abs", &self.abs)
            .field("kind", &self.kind)
            .field("name", &self.name)
            .finish()
    }
}

impl LazySliceView {
    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    #[inline]
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    #[inline]
    pub fn item_elems(&self) -> usize {
        self.item_elems
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Compose a further selection, still without loading.
    pub fn slice(&self, ranges: &[SliceRange]) -> Result<LazySliceView> {
        if ranges.len() != self.dims.len() {
            return Err(ArrayError::RankMismatch(ranges.len(), self.dims.len()));
        }
        for (d, r) in ranges.iter().enumerate() {
            r.validate(d, self.dims[d])?;
        }
        let mut out = LazySliceView {
            dims: ranges.iter().map(|r| r.count()).collect(),
            orig_map: self.orig_map.clone(),
            abs: self.abs.clone(),
            kind: self.kind,
            item_elems: self.item_elems,
            original_dims: self.original_dims.clone(),
            loader: Rc::clone(&self.loader),
            name: self.name.clone(),
        };
        for (d, r) in ranges.iter().enumerate() {
            if let Some(oi) = self.orig_map[d] {
                let base = self.abs[oi];
                let start =
                    (base.start() as isize + r.start() as isize * base.step()) as usize;
                out.abs[oi] = SliceRange::with_count(start, base.step() * r.step(), r.count());
            }
        }
        Ok(out)
    }

    /// Load the composed selection as a concrete array.
    ///
    /// Best-effort like [`LazyArray::get_slice`]: failures are logged and
    /// answered with a one-element placeholder.
    pub fn materialize(&self) -> DynArray {
        let result = if self.loader.is_readable() {
            let mut start = Vec::with_capacity(self.abs.len());
            let mut stop = Vec::with_capacity(self.abs.len());
            let mut step = Vec::with_capacity(self.abs.len());
            for r in &self.abs {
                start.push(r.start());
                stop.push(r.start() as isize + r.count() as isize * r.step());
                step.push(r.step());
            }
            self.loader
                .load_slice(&self.original_dims, &start, &stop, &step)
        } else {
            Err(ArrayError::LoadFailed("loader is not readable".into()))
        };
        match result {
            Ok(mut out) => {
                out.set_name(self.name.clone());
                out
            }
            Err(e) => {
                error!("lazy view load failed for {}: {}", self.name, e);
                let mut out = DynArray::zero_scalar(self.kind);
                out.set_name(self.name.clone());
                out
            }
        }
    }
}
