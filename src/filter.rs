//! Seam for the host platform's image-filter service.
//!
//! The engine does not implement spatial filtering itself; it consumes an
//! opaque service behind the [`ImageFilter`] trait. An absent or failing
//! service propagates as an error, never a crash.

use crate::dispatch::DynArray;
use crate::{ArrayError, Result};
use log::warn;

/// The rank filters the external service provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Min,
    Max,
    Mean,
    Median,
}

/// External spatial-filter service over concrete arrays.
pub trait ImageFilter {
    fn filter_min(&self, array: &DynArray, radius: usize) -> Result<DynArray>;
    fn filter_max(&self, array: &DynArray, radius: usize) -> Result<DynArray>;
    fn filter_mean(&self, array: &DynArray, radius: usize) -> Result<DynArray>;
    fn filter_median(&self, array: &DynArray, radius: usize) -> Result<DynArray>;
}

/// Route a filter request through an optional service reference.
///
/// # Errors
/// `FilterUnavailable` when no service is wired up; whatever the service
/// returns otherwise.
pub fn filtered(
    service: Option<&dyn ImageFilter>,
    op: FilterOp,
    array: &DynArray,
    radius: usize,
) -> Result<DynArray> {
    let svc = match service {
        Some(s) => s,
        None => {
            warn!("image filter requested but no service is available");
            return Err(ArrayError::FilterUnavailable);
        }
    };
    match op {
        FilterOp::Min => svc.filter_min(array, radius),
        FilterOp::Max => svc.filter_max(array, radius),
        FilterOp::Mean => svc.filter_mean(array, radius),
        FilterOp::Median => svc.filter_median(array, radius),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Array;
    use crate::shape::Shape;

    struct Doubler;

    impl ImageFilter for Doubler {
        fn filter_min(&self, array: &DynArray, _radius: usize) -> Result<DynArray> {
            array.mul_scalar(2i64)
        }

        fn filter_max(&self, array: &DynArray, _radius: usize) -> Result<DynArray> {
            array.mul_scalar(2i64)
        }

        fn filter_mean(&self, array: &DynArray, _radius: usize) -> Result<DynArray> {
            array.mul_scalar(2i64)
        }

        fn filter_median(&self, array: &DynArray, _radius: usize) -> Result<DynArray> {
            array.mul_scalar(2i64)
        }
    }

    #[test]
    fn test_missing_service_is_an_error() {
        let a: DynArray = Array::from_vec(Shape::new(vec![2]).unwrap(), vec![1.0f64, 2.0])
            .unwrap()
            .into();
        assert!(matches!(
            filtered(None, FilterOp::Mean, &a, 1),
            Err(ArrayError::FilterUnavailable)
        ));
    }

    #[test]
    fn test_service_is_routed() {
        let a: DynArray = Array::from_vec(Shape::new(vec![2]).unwrap(), vec![1.0f64, 2.0])
            .unwrap()
            .into();
        let out = filtered(Some(&Doubler), FilterOp::Min, &a, 1).unwrap();
        let vals: Vec<f64> = out.as_complex_vec().iter().map(|c| c.re).collect();
        assert_eq!(vals, vec![2.0, 4.0]);
    }
}
