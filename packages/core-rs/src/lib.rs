//! Accurate summation and dot products from error-free transformations.
//!
//! The kernels trade a few extra flops per element for results that are as
//! accurate as if they had been computed in K-fold working precision, and
//! never allocate a wider number type. Inputs are borrowed `ndarray` views;
//! outputs are freshly allocated arrays owned by the caller.

pub mod distill;
pub mod dot;
pub mod eft;
pub mod element;
pub mod error;
pub mod ill_cond;
pub mod sum;
pub mod threading;

use ndarray::{ArrayBase, Axis, Dimension, RawData};

pub use distill::{distill, distill_in_place, distill_passes, distill_passes_in_place};
pub use dot::{
    cond_dot, dot2, dot_kfold, dot_kfold_1d, fdot, fdot_1d, kdot, kdot_1d, naive_layer,
    ADDITION_LAYER, MULTIPLICATION_LAYER,
};
pub use eft::{fast_two_sum, split, two_product, two_product_dekker, two_sum};
pub use element::Element;
pub use error::AccuError;
pub use ill_cond::{
    generate_ill_conditioned_dot_product, generate_ill_conditioned_sum, IllConditionedDot,
    IllConditionedSum,
};
pub use sum::{
    cond_sum, fsum, ksum, sum_kahan, sum_kahan_batched, sum_neumaier, sum_neumaier_batched,
};

pub type CoreResult<T> = Result<T, AccuError>;

/// Length of axis 0, rejecting rank-0 arrays and empty leading axes.
pub(crate) fn leading_len<S, D>(op: &'static str, values: &ArrayBase<S, D>) -> CoreResult<usize>
where
    S: RawData,
    D: Dimension,
{
    if values.ndim() == 0 {
        return Err(error::shape_mismatch(
            op,
            "expected an array of rank >= 1, got a scalar",
        ));
    }
    match values.len_of(Axis(0)) {
        0 => Err(error::empty_input(op)),
        rows => Ok(rows),
    }
}

// ---------------------------------------------------------------------
// Tests for composing the error tensor with the reductions
// ---------------------------------------------------------------------
