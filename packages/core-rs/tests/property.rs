use accu_rs_core::{
    distill, dot_kfold, dot_kfold_1d, fdot, fsum, kdot, naive_layer, sum_neumaier, two_product,
    two_sum, AccuError,
};
use ndarray::{Array1, Array2, Axis};
use proptest::prelude::*;

// Every generated value is m * 2^e with |m| < 2^bits, so scaling by
// 2^-min_exp turns it, and every sum or product the kernels round it to,
// into an exact i128.
fn grid_value(bits: u32, min_exp: i32, max_exp: i32) -> impl Strategy<Value = f64> {
    let limit = 1i64 << bits;
    (-limit + 1..limit, min_exp..=max_exp).prop_map(|(m, e)| m as f64 * 2f64.powi(e))
}

fn fixed(value: f64, scale: i32) -> i128 {
    let scaled = value * 2f64.powi(scale);
    assert_eq!(scaled.fract(), 0.0, "{value} is off the 2^-{scale} grid");
    scaled as i128
}

fn round_fixed(total: i128, scale: i32) -> f64 {
    total as f64 * 2f64.powi(-scale)
}

fn matrix_from_vec(data: Vec<f64>, rows: usize, cols: usize) -> Array2<f64> {
    Array2::from_shape_vec((rows, cols), data).expect("matrix shape mismatch")
}

prop_compose! {
    fn addends()(values in prop::collection::vec(grid_value(53, -30, 30), 1..=16))
                -> Array1<f64> {
        Array1::from(values)
    }
}

prop_compose! {
    fn compatible_matrices()(m in 1usize..4, k in 1usize..5, n in 1usize..4,
                             left_values in prop::collection::vec(grid_value(40, -10, 0), 1..=16),
                             right_values in prop::collection::vec(grid_value(40, -10, 0), 1..=16))
                             -> (Array2<f64>, Array2<f64>) {
        let lhs = left_values.into_iter().cycle().take(m * k).collect::<Vec<_>>();
        let rhs = right_values.into_iter().cycle().take(k * n).collect::<Vec<_>>();
        (matrix_from_vec(lhs, m, k), matrix_from_vec(rhs, k, n))
    }
}

proptest! {
    #[test]
    fn two_sum_is_exact(a in grid_value(53, -30, 30), b in grid_value(53, -30, 30)) {
        let (s, e) = two_sum(a, b);
        prop_assert_eq!(s, a + b);
        prop_assert_eq!(fixed(a, 30) + fixed(b, 30), fixed(s, 30) + fixed(e, 30));
    }

    #[test]
    fn two_product_is_exact(a in grid_value(53, -10, 0), b in grid_value(53, -10, 0)) {
        let (p, e) = two_product(a, b);
        prop_assert_eq!(p, a * b);
        prop_assert_eq!(fixed(a, 10) * fixed(b, 10), fixed(p, 20) + fixed(e, 20));
    }

    #[test]
    fn distill_preserves_the_exact_sum(values in addends()) {
        let exact: i128 = values.iter().map(|&v| fixed(v, 30)).sum();
        let distilled = distill(&values).unwrap();
        let after: i128 = distilled.iter().map(|&v| fixed(v, 30)).sum();
        prop_assert_eq!(after, exact);
    }

    #[test]
    fn distill_preserves_every_column(values in prop::collection::vec(grid_value(53, -30, 30), 6..=6),
                                      rows in 1usize..4) {
        let cols = 6 / rows;
        let data = values.into_iter().take(rows * cols).collect::<Vec<_>>();
        let matrix = matrix_from_vec(data, rows, cols);
        let distilled = distill(&matrix).unwrap();
        for (before, after) in matrix.columns().into_iter().zip(distilled.columns()) {
            let lhs: i128 = before.iter().map(|&v| fixed(v, 30)).sum();
            let rhs: i128 = after.iter().map(|&v| fixed(v, 30)).sum();
            prop_assert_eq!(lhs, rhs);
        }
    }

    #[test]
    fn fsum_is_correctly_rounded(values in addends()) {
        let exact: i128 = values.iter().map(|&v| fixed(v, 30)).sum();
        prop_assert_eq!(fsum(&values).unwrap()[()], round_fixed(exact, 30));
    }

    #[test]
    fn error_tensor_sums_to_the_exact_product(data in compatible_matrices()) {
        let (lhs, rhs) = data;
        let tensor = dot_kfold(lhs.view(), rhs.view()).unwrap();
        let (m, k) = lhs.dim();
        let n = rhs.ncols();
        prop_assert_eq!(tensor.shape(), &[2, k, m, n]);
        for row in 0..m {
            for col in 0..n {
                let exact: i128 = (0..k)
                    .map(|shared| fixed(lhs[[row, shared]], 10) * fixed(rhs[[shared, col]], 10))
                    .sum();
                let pieces: i128 = tensor
                    .slice(ndarray::s![.., .., row, col])
                    .iter()
                    .map(|&v| fixed(v, 20))
                    .sum();
                prop_assert_eq!(pieces, exact);
            }
        }
    }

    #[test]
    fn reconstruction_beats_the_naive_product(data in compatible_matrices()) {
        let (lhs, rhs) = data;
        let tensor = dot_kfold(lhs.view(), rhs.view()).unwrap();
        let naive = naive_layer(&tensor).unwrap().to_owned();
        let correct = fdot(lhs.view(), rhs.view()).unwrap();
        let twice = kdot(lhs.view(), rhs.view(), 2).unwrap();
        let (m, k) = lhs.dim();
        for row in 0..m {
            for col in 0..rhs.ncols() {
                let exact: i128 = (0..k)
                    .map(|shared| fixed(lhs[[row, shared]], 10) * fixed(rhs[[shared, col]], 10))
                    .sum();
                let rounded = round_fixed(exact, 20);
                prop_assert_eq!(correct[[row, col]], rounded);

                let flat: Array1<f64> = tensor
                    .slice(ndarray::s![.., .., row, col])
                    .iter()
                    .copied()
                    .collect();
                let magnitude: f64 = (0..k)
                    .map(|shared| (lhs[[row, shared]] * rhs[[shared, col]]).abs())
                    .sum();
                // Within the last rounding of the reduction itself.
                let allowed = (naive[[row, col]] - rounded)
                    .abs()
                    .max(f64::EPSILON * (rounded.abs() + f64::EPSILON * magnitude));

                let composed = sum_neumaier(distill(&flat).unwrap().view()).unwrap();
                prop_assert!((composed - rounded).abs() <= allowed);
                prop_assert!((twice[[row, col]] - rounded).abs() <= allowed);
            }
        }
    }

    #[test]
    fn vector_and_matrix_forms_agree(x in prop::collection::vec(grid_value(53, -30, 30), 1..=8),
                                     y in prop::collection::vec(grid_value(53, -30, 30), 1..=8)) {
        let len = x.len().min(y.len());
        let x = Array1::from(x[..len].to_vec());
        let y = Array1::from(y[..len].to_vec());
        let vector = dot_kfold_1d(x.view(), y.view()).unwrap();
        let a = x.insert_axis(Axis(0));
        let b = y.insert_axis(Axis(1));
        let matrix = dot_kfold(a.view(), b.view()).unwrap();
        prop_assert_eq!(vector, matrix.index_axis(Axis(3), 0).index_axis_move(Axis(2), 0));
    }

    #[test]
    fn mismatched_shapes_never_compute(m in 1usize..4, k in 1usize..4, extra in 1usize..3, n in 1usize..4) {
        let lhs = Array2::<f64>::ones((m, k));
        let rhs = Array2::<f64>::ones((k + extra, n));
        let is_shape_error = matches!(
            dot_kfold(lhs.view(), rhs.view()),
            Err(AccuError::ShapeMismatch { .. })
        );
        prop_assert!(is_shape_error);
    }
}
