//! Generators for ill-conditioned dot products and sums.
//!
//! Algorithm 6.1 of Ogita, Rump & Oishi, "Accurate Sum and Dot Product".
//! The exact intermediates the algorithm needs are obtained with [`fsum`]
//! over two-product pieces, which is exact before its single final
//! rounding, so no arbitrary-precision type is involved.
//!
//! [`fsum`]: crate::sum::fsum

use crate::dot::{cond_dot, fdot_1d};
use crate::eft::two_product;
use crate::error::invalid_argument;
use crate::sum::fsum_iter;
use crate::CoreResult;
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct IllConditionedDot {
    pub x: Array1<f64>,
    pub y: Array1<f64>,
    /// `x . y` rounded once to the nearest double.
    pub exact: f64,
    /// Realised condition number `2 |x|.|y| / |x.y|`.
    pub cond: f64,
}

#[derive(Clone, Debug)]
pub struct IllConditionedSum {
    pub values: Array1<f64>,
    pub exact: f64,
    pub cond: f64,
}

/// Vectors of length `n >= 6` whose dot product has condition number close
/// to `target_cond >= 1`. The realised value is returned alongside.
pub fn generate_ill_conditioned_dot_product<R: Rng + ?Sized>(
    n: usize,
    target_cond: f64,
    rng: &mut R,
) -> CoreResult<IllConditionedDot> {
    const OP: &str = "generate_ill_conditioned_dot_product";
    if n < 6 {
        return Err(invalid_argument(OP, format!("length must be at least 6, got {n}")));
    }
    if !(target_cond.is_finite() && target_cond >= 1.0) {
        return Err(invalid_argument(
            OP,
            format!("condition number must be finite and >= 1, got {target_cond}"),
        ));
    }

    let half = first_half_len(n);
    let b = target_cond.log2();
    let mut x = vec![0.0_f64; n];
    let mut y = vec![0.0_f64; n];

    // First half: random exponents in [0, b/2], with both ends present.
    let mut exponents: Vec<i32> = (0..half)
        .map(|_| (rng.gen::<f64>() * b / 2.0).round_ties_even() as i32)
        .collect();
    exponents[0] = (b / 2.0).round_ties_even() as i32 + 1;
    exponents[half - 1] = 0;
    for (i, &e) in exponents.iter().enumerate() {
        let scale = 2f64.powi(e);
        x[i] = signed_unit(rng) * scale;
        y[i] = signed_unit(rng) * scale;
    }

    // Second half: exponents fall linearly from b/2 to 0 and every y[i] is
    // chosen so that the running dot product lands near 2^e.
    let rest = n - half;
    for j in 0..rest {
        let e = (b / 2.0 * (1.0 - j as f64 / (rest - 1) as f64)).round_ties_even() as i32;
        let scale = 2f64.powi(e);
        let i = half + j;
        x[i] = nonzero_signed_unit(rng) * scale;
        let target = signed_unit(rng) * scale;
        let residual = fsum_iter(
            std::iter::once(target).chain(x[..i].iter().zip(&y[..i]).flat_map(|(&xj, &yj)| {
                let (p, err) = two_product(xj, yj);
                [-p, -err]
            })),
        )?;
        y[i] = residual / x[i];
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);
    let x: Array1<f64> = order.iter().map(|&i| x[i]).collect();
    let y: Array1<f64> = order.iter().map(|&i| y[i]).collect();

    let exact = fdot_1d(x.view(), y.view())?;
    let cond = cond_dot(x.view(), y.view())?;
    debug!(n, target_cond, cond, "generated ill-conditioned dot product");
    Ok(IllConditionedDot { x, y, exact, cond })
}

/// `2n` addends built from the exact products of an ill-conditioned dot
/// product, shuffled. The sum's condition number is half that of the dot.
pub fn generate_ill_conditioned_sum<R: Rng + ?Sized>(
    n: usize,
    target_cond: f64,
    rng: &mut R,
) -> CoreResult<IllConditionedSum> {
    let dot = generate_ill_conditioned_dot_product(n, target_cond, rng)?;
    let mut values: Vec<f64> = dot
        .x
        .iter()
        .zip(dot.y.iter())
        .flat_map(|(&a, &b)| {
            let (p, err) = two_product(a, b);
            [p, err]
        })
        .collect();
    values.shuffle(rng);
    let exact = fsum_iter(values.iter().copied())?;
    Ok(IllConditionedSum {
        values: Array1::from(values),
        exact,
        cond: dot.cond / 2.0,
    })
}

/// Length of the random first half: `n / 2` rounded half to even.
fn first_half_len(n: usize) -> usize {
    let half = n / 2;
    if n % 2 == 1 && half % 2 == 1 {
        half + 1
    } else {
        half
    }
}

fn signed_unit<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    2.0 * rng.gen::<f64>() - 1.0
}

fn nonzero_signed_unit<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    loop {
        let v = signed_unit(rng);
        if v != 0.0 {
            return v;
        }
    }
}
