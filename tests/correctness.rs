use approx::assert_relative_eq;
use ndstride::{Array, ArrayError, DynArray, ElementKind, Scalar, Shape};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn shape(dims: &[usize]) -> Shape {
    Shape::new(dims.to_vec()).unwrap()
}

fn f64_array(values: &[f64]) -> Array<f64> {
    Array::from_vec(shape(&[values.len()]), values.to_vec()).unwrap()
}

fn reals(a: &DynArray) -> Vec<f64> {
    a.as_complex_vec().iter().map(|c| c.re).collect()
}

// ============================================================================
// Shape and registry properties
// ============================================================================

#[test]
fn test_size_is_product_and_overflow_fails() {
    assert_eq!(shape(&[3, 4, 5]).size(), 60);
    assert_eq!(shape(&[]).size(), 1);
    assert_eq!(shape(&[7, 0]).size(), 0);
    assert!(matches!(
        Shape::new(vec![usize::MAX, 2]),
        Err(ArrayError::SizeOverflow(_))
    ));
}

#[test]
fn test_promotion_is_total_symmetric_and_monotone() {
    for &a in &ElementKind::ALL {
        for &b in &ElementKind::ALL {
            let p = ElementKind::promote(a, b);
            assert_eq!(p, ElementKind::promote(b, a));
            assert!(p == a || p == b);
            assert!(p >= a && p >= b);
        }
    }
}

// ============================================================================
// Cast round trips
// ============================================================================

#[test]
fn test_cast_round_trip_integer_kinds() {
    let a = Array::from_vec(shape(&[4]), vec![-100i32, -1, 0, 100]).unwrap();
    // Through every kind wide enough to hold the values.
    let through_i64: Array<i32> = a.cast::<i64>().unwrap().cast().unwrap();
    let through_f32: Array<i32> = a.cast::<f32>().unwrap().cast().unwrap();
    let through_f64: Array<i32> = a.cast::<f64>().unwrap().cast().unwrap();
    let through_c128: Array<i32> = a.cast::<Complex64>().unwrap().cast().unwrap();
    assert_eq!(through_i64, a);
    assert_eq!(through_f32, a);
    assert_eq!(through_f64, a);
    assert_eq!(through_c128, a);
}

#[test]
fn test_cast_round_trip_float_within_precision() {
    let a = f64_array(&[1.5, -2.25, 1000.125]);
    let back: Array<f64> = a.cast::<Complex64>().unwrap().cast().unwrap();
    for (x, y) in a.as_vec().iter().zip(back.as_vec()) {
        assert_relative_eq!(*x, y);
    }
    let narrow: Array<f32> = a.cast().unwrap();
    let widened: Array<f64> = narrow.cast().unwrap();
    for (x, y) in a.as_vec().iter().zip(widened.as_vec()) {
        // These values are exactly representable in f32.
        assert_relative_eq!(*x, y);
    }
}

#[test]
fn test_cast_truncates_out_of_range() {
    let a = f64_array(&[300.0, -300.0, f64::NAN]);
    let b: Array<i8> = a.cast().unwrap();
    assert_eq!(b.as_vec(), vec![i8::MAX, i8::MIN, 0]);
}

#[test]
fn test_cast_bool_is_zero_test() {
    let a = f64_array(&[0.0, 2.0, -1.0]);
    let b: Array<bool> = a.cast().unwrap();
    assert_eq!(b.as_vec(), vec![false, true, true]);
    let complex = Array::from_vec(shape(&[1]), vec![Complex64::new(0.0, 3.0)]).unwrap();
    let c: Array<bool> = complex.cast().unwrap();
    assert_eq!(c.as_vec(), vec![true]);
}

// ============================================================================
// Arithmetic contracts
// ============================================================================

#[test]
fn test_integer_divide_by_zero_never_raises() {
    let mut a = Array::from_vec(shape(&[3]), vec![1i32, 2, 3]).unwrap();
    a.div_scalar(0);
    assert_eq!(a.as_vec(), vec![0, 0, 0]);

    let mut b = Array::from_vec(shape(&[3]), vec![1i64, 2, 3]).unwrap();
    b.rem_scalar(0);
    assert_eq!(b.as_vec(), vec![0, 0, 0]);
}

#[test]
fn test_integer_power_collapses_non_finite() {
    let mut a = Array::from_vec(shape(&[3]), vec![0i32, 2, 3]).unwrap();
    a.pow_scalar(-1);
    // 0^-1 is infinite in double arithmetic and collapses; 2^-1 and 3^-1
    // truncate to zero.
    assert_eq!(a.as_vec(), vec![0, 0, 0]);
    let mut b = Array::from_vec(shape(&[2]), vec![2i32, 5]).unwrap();
    b.pow_scalar(2);
    assert_eq!(b.as_vec(), vec![4, 25]);
}

#[test]
fn test_float_power_propagates_non_finite() {
    let mut a = f64_array(&[0.0, -1.0]);
    a.pow_scalar(-1.0);
    assert!(a.as_vec()[0].is_infinite());
    let mut b = f64_array(&[-1.0]);
    b.pow_scalar(0.5);
    assert!(b.as_vec()[0].is_nan());
}

#[test]
fn test_lockstep_trip_count_mismatch_is_hard_error() {
    let mut a = f64_array(&[1.0, 2.0, 3.0]);
    let b = f64_array(&[1.0, 2.0]);
    assert!(matches!(
        a.add_assign(&b),
        Err(ArrayError::ShapeMismatch(_, _))
    ));
    // Nothing was written.
    assert_eq!(a.as_vec(), vec![1.0, 2.0, 3.0]);
}

#[test]
fn test_in_place_array_operand() {
    let mut a = Array::from_vec(shape(&[4]), vec![10i64, 20, 30, 40]).unwrap();
    let b = Array::from_vec(shape(&[4]), vec![1i64, 2, 3, 4]).unwrap();
    a.sub_assign(&b).unwrap();
    assert_eq!(a.as_vec(), vec![9, 18, 27, 36]);
    a.rem_assign(&b).unwrap();
    assert_eq!(a.as_vec(), vec![0, 0, 0, 0]);
}

// ============================================================================
// Dispatch / promotion engine
// ============================================================================

#[test]
fn test_add_double_and_int_promotes_to_double() {
    let a: DynArray = f64_array(&[1.0, 2.0]).into();
    let b: DynArray = Array::from_vec(shape(&[2]), vec![1i32, 1]).unwrap().into();
    let out = a.add(&b).unwrap();
    assert_eq!(out.kind(), ElementKind::Float64);
    assert_eq!(reals(&out), vec![2.0, 3.0]);
}

#[test]
fn test_dispatch_every_numeric_kind_pair() {
    // One representative array per kind, all holding the value 2.
    let operands: Vec<DynArray> = vec![
        Array::from_vec(shape(&[1]), vec![2i8]).unwrap().into(),
        Array::from_vec(shape(&[1]), vec![2i16]).unwrap().into(),
        Array::from_vec(shape(&[1]), vec![2i32]).unwrap().into(),
        Array::from_vec(shape(&[1]), vec![2i64]).unwrap().into(),
        Array::from_vec(shape(&[1]), vec![2f32]).unwrap().into(),
        Array::from_vec(shape(&[1]), vec![2f64]).unwrap().into(),
        Array::from_vec(shape(&[1]), vec![num_complex::Complex32::new(2.0, 0.0)])
            .unwrap()
            .into(),
        Array::from_vec(shape(&[1]), vec![Complex64::new(2.0, 0.0)])
            .unwrap()
            .into(),
    ];
    for a in &operands {
        for b in &operands {
            let out = a.mul(b).unwrap();
            assert_eq!(out.kind(), ElementKind::promote(a.kind(), b.kind()));
            assert_relative_eq!(out.as_complex_vec()[0].re, 4.0);
        }
    }
}

#[test]
fn test_boolean_arithmetic_has_no_dispatch_path() {
    let a: DynArray = Array::from_vec(shape(&[2]), vec![true, false]).unwrap().into();
    let b: DynArray = Array::from_vec(shape(&[2]), vec![false, true]).unwrap().into();
    assert!(matches!(
        a.mul(&b),
        Err(ArrayError::UnsupportedKinds(_, _))
    ));
    assert!(matches!(
        a.add_scalar(true),
        Err(ArrayError::UnsupportedKinds(_, _))
    ));
}

#[test]
fn test_div_safe_substitutes_zero_everywhere() {
    let a: DynArray = f64_array(&[1.0, 2.0, 3.0]).into();
    let b: DynArray = f64_array(&[0.0, 4.0, 0.0]).into();
    let out = a.div_safe(&b).unwrap();
    assert_eq!(reals(&out), vec![0.0, 0.5, 0.0]);

    let out = a.div_safe_scalar(0.0f64).unwrap();
    assert_eq!(reals(&out), vec![0.0, 0.0, 0.0]);
}

#[test]
fn test_complex_scalar_escalates_real_kinds() {
    let f32s: DynArray = Array::from_vec(shape(&[2]), vec![1f32, 2.0]).unwrap().into();
    let out = f32s.mul_scalar(Complex64::new(0.0, 1.0)).unwrap();
    assert_eq!(out.kind(), ElementKind::Complex64);

    let ints: DynArray = Array::from_vec(shape(&[2]), vec![1i32, 2]).unwrap().into();
    let out = ints.mul_scalar(Complex64::new(0.0, 1.0)).unwrap();
    assert_eq!(out.kind(), ElementKind::Complex128);
    assert_eq!(out.as_complex_vec()[1], Complex64::new(0.0, 2.0));

    // A complex scalar with zero imaginary part promotes like a float.
    let out = ints.mul_scalar(Scalar::Complex(Complex64::new(3.0, 0.0))).unwrap();
    assert_eq!(out.kind(), ElementKind::Float64);
}

#[test]
fn test_result_is_zero_filled_before_kernel_runs() {
    // Empty broadcast dimension: the kernel writes nothing and the result
    // stays at the zero fill.
    let a: DynArray = Array::<f64>::zeros(shape(&[0])).unwrap().into();
    let b: DynArray = Array::<f64>::zeros(shape(&[0])).unwrap().into();
    let out = a.add(&b).unwrap();
    assert_eq!(out.dims(), &[0]);
    assert_eq!(out.size(), 0);
}

#[test]
fn test_expression_name_parenthesization() {
    let mut a: DynArray = f64_array(&[1.0]).into();
    a.set_name("bias");
    let mut b: DynArray = f64_array(&[2.0]).into();
    b.set_name("gain");
    let sum = a.add(&b).unwrap();
    assert_eq!(sum.name(), "bias+gain");
    let scaled = sum.mul_scalar(2.0f64).unwrap();
    assert_eq!(scaled.name(), "(bias+gain)*2");
    let diff = scaled.sub(&a).unwrap();
    assert_eq!(diff.name(), "((bias+gain)*2)-bias");
}

// ============================================================================
// Residual and compensated summation
// ============================================================================

#[test]
fn test_residual_weighted_and_invalid_skipping() {
    let a = f64_array(&[2.0, f64::NAN, 4.0]);
    let b = f64_array(&[0.0, 0.0, 0.0]);
    let w = f64_array(&[1.0, 1.0, 0.5]);
    assert!(a.residual(&b, Some(&w), false).unwrap().is_nan());
    let r = a.residual(&b, Some(&w), true).unwrap();
    assert_relative_eq!(r, 4.0 + 8.0);
}

#[test]
fn test_residual_drift_below_naive_running_sum() {
    // One unit difference followed by a million tiny ones: a naive running
    // sum absorbs every tiny squared term into the big one and loses them
    // all; the compensated residual keeps them.
    let n = 1_000_001usize;
    let mut a_vals = vec![0.0f64; n];
    let mut b_vals = vec![0.0f64; n];
    a_vals[0] = 1.0;
    for v in b_vals.iter_mut().skip(1) {
        *v = 1e-8;
    }
    let a = Array::from_vec(shape(&[n]), a_vals.clone()).unwrap();
    let b = Array::from_vec(shape(&[n]), b_vals.clone()).unwrap();

    let compensated = a.residual(&b, None, false).unwrap();

    let mut naive = 0.0f64;
    for (x, y) in a_vals.iter().zip(&b_vals) {
        let d = x - y;
        naive += d * d;
    }

    let exact = 1.0 + (n - 1) as f64 * 1e-16;
    assert!((compensated - exact).abs() < (naive - exact).abs());
    assert_relative_eq!(compensated, exact, max_relative = 1e-12);
}

#[test]
fn test_compensated_sum_of_random_values() {
    let mut rng = StdRng::seed_from_u64(7);
    let vals: Vec<f64> = (0..10_000).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let a = Array::from_vec(shape(&[vals.len()]), vals.clone()).unwrap();
    let expected: f64 = vals.iter().sum();
    assert_relative_eq!(a.sum_compensated().re, expected, max_relative = 1e-9);
}

// ============================================================================
// Selection writes
// ============================================================================

#[test]
fn test_boolean_masked_write_validates_count() {
    let mut a = Array::from_vec(shape(&[4]), vec![0i32; 4]).unwrap();
    let mask = Array::from_vec(shape(&[4]), vec![true, false, true, false]).unwrap();
    let wrong = Array::from_vec(shape(&[3]), vec![1i32, 2, 3]).unwrap();
    assert!(matches!(
        a.set_by_mask(&mask, &wrong),
        Err(ArrayError::SelectionMismatch {
            selected: 2,
            provided: 3
        })
    ));
    assert_eq!(a.as_vec(), vec![0; 4]);

    let right = Array::from_vec(shape(&[2]), vec![1i32, 2]).unwrap();
    a.set_by_mask(&mask, &right).unwrap();
    assert_eq!(a.as_vec(), vec![1, 0, 2, 0]);
}

#[test]
fn test_masked_write_rejects_wrong_mask_shape() {
    let mut a = Array::from_vec(shape(&[4]), vec![0i32; 4]).unwrap();
    let mask = Array::from_vec(shape(&[2, 2]), vec![true; 4]).unwrap();
    let vals = Array::from_vec(shape(&[4]), vec![1i32; 4]).unwrap();
    assert!(matches!(
        a.set_by_mask(&mask, &vals),
        Err(ArrayError::ShapeMismatch(_, _))
    ));
}

#[test]
fn test_set_by_indexes_fancy_write() {
    let mut a = Array::from_vec(shape(&[2, 3]), vec![0i32; 6]).unwrap();
    let rows = Array::from_vec(shape(&[2]), vec![0i64, 1]).unwrap();
    let cols = Array::from_vec(shape(&[2]), vec![2i64, 0]).unwrap();
    let vals = Array::from_vec(shape(&[2]), vec![7i32, 8]).unwrap();
    a.set_by_indexes(&[&rows, &cols], &vals).unwrap();
    assert_eq!(a.as_vec(), vec![0, 0, 7, 8, 0, 0]);
}

#[test]
fn test_gather_write_rejects_out_of_range() {
    let mut a = Array::from_vec(shape(&[3]), vec![0i32; 3]).unwrap();
    let idx = Array::from_vec(shape(&[2]), vec![1i64, 3]).unwrap();
    let vals = Array::from_vec(shape(&[2]), vec![1i32, 2]).unwrap();
    assert!(matches!(
        a.set_by_index(&idx, &vals),
        Err(ArrayError::OutOfBounds { index: 3, extent: 3 })
    ));
    assert_eq!(a.as_vec(), vec![0; 3]);
}

// ============================================================================
// Fill, resize, equality
// ============================================================================

#[test]
fn test_fill_from_scalar_compatible_source() {
    let mut a = Array::from_vec(shape(&[2, 2]), vec![0i32; 4]).unwrap();
    let one = Array::from_vec(shape(&[1]), vec![9i32]).unwrap();
    a.fill_from(&one).unwrap();
    assert_eq!(a.as_vec(), vec![9; 4]);

    let wrong = Array::from_vec(shape(&[3]), vec![1i32, 2, 3]).unwrap();
    assert!(matches!(
        a.fill_from(&wrong),
        Err(ArrayError::ShapeMismatch(_, _))
    ));
}

#[test]
fn test_resize_truncates_and_extends() {
    let mut a = Array::from_vec(shape(&[5]), vec![1i32, 2, 3, 4, 5]).unwrap();
    a.resize(shape(&[2, 2])).unwrap();
    assert_eq!(a.dims(), &[2, 2]);
    assert_eq!(a.as_vec(), vec![1, 2, 3, 4]);
    a.resize(shape(&[6])).unwrap();
    assert_eq!(a.as_vec(), vec![1, 2, 3, 4, 0, 0]);
}

#[test]
fn test_equality_contract() {
    let a = f64_array(&[1.0, 2.0]);
    let b = f64_array(&[1.0, 2.0]);
    let c = f64_array(&[1.0, 3.0]);
    assert_eq!(a, b);
    assert_ne!(a, c);
    // Rank-0 arrays compare equal on shape alone.
    let s: Array<f64> = Array::scalar(1.0);
    let t: Array<f64> = Array::scalar(9.0);
    assert_eq!(s, t);
}

#[test]
fn test_compound_arrays_carry_multiplicity() {
    let mut rgb: Array<f32> = Array::zeros_with(shape(&[2, 2]), 3).unwrap();
    assert_eq!(rgb.item_elems(), 3);
    rgb.set_at(&[0, 1], 1, 0.5).unwrap();
    assert_eq!(rgb.get_at(&[0, 1], 1).unwrap(), 0.5);
    assert_eq!(rgb.get(&[0, 1]).unwrap(), 0.0);

    let other: Array<f32> = Array::zeros(shape(&[2, 2])).unwrap();
    let a: DynArray = rgb.into();
    let b: DynArray = other.into();
    assert!(matches!(
        a.add(&b),
        Err(ArrayError::MultiplicityMismatch(3, 1))
    ));
}
