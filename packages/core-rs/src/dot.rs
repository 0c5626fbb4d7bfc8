//! Dot products in K-fold working precision.
//!
//! [`dot_kfold`] never forms a wider intermediate type. For every output
//! cell it records, per contraction index `k`, the exact error of the
//! product `a[i,k] * b[k,j]` (layer 0) and the exact error of adding that
//! product to the running naive sum (layer 1). The resulting tensor has
//! shape `[2, n, m, p]`; reducing it along the first two axes with
//! [`ksum`] or [`fsum`] recovers the dot product to the requested accuracy.
//!
//! Layer 1 at `k = 0` has no addition to record. It holds the final naive
//! partial sum instead, so the plain double-precision product is the slice
//! `tensor[1, 0, .., ..]` (see [`naive_layer`]).

use crate::eft::{two_product, two_sum};
use crate::element::Element;
use crate::error::{empty_input, invalid_argument, shape_mismatch};
use crate::sum::{fsum, fsum_iter, ksum};
use crate::threading;
use crate::CoreResult;
use ndarray::{
    s, Array1, Array2, Array3, Array4, ArrayBase, ArrayView1, ArrayView2, ArrayViewMut1,
    ArrayViewMut3, Axis, Data, Ix4, Zip,
};
use tracing::{debug, trace};

/// Index of the product-error layer on axis 0 of the error tensor.
pub const MULTIPLICATION_LAYER: usize = 0;
/// Index of the addition-error layer on axis 0 of the error tensor.
pub const ADDITION_LAYER: usize = 1;

/// Error decomposition of `a . b` for `a: m x n` and `b: n x p`.
///
/// Returns a `[2, n, m, p]` tensor. Fails with a shape error when
/// `a.ncols() != b.nrows()` and with an empty-input error when `n == 0`;
/// nothing is allocated in either case.
pub fn dot_kfold<T: Element>(a: ArrayView2<'_, T>, b: ArrayView2<'_, T>) -> CoreResult<Array4<T>> {
    let (m, n) = a.dim();
    let (inner, p) = b.dim();
    if n != inner {
        return Err(shape_mismatch(
            "dot_kfold",
            format!("inner dimensions do not match ({m}x{n} by {inner}x{p})"),
        ));
    }
    if n == 0 {
        return Err(empty_input("dot_kfold"));
    }
    let elems = [2, n, m, p]
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .filter(|&total| total.checked_mul(std::mem::size_of::<T>()).is_some())
        .ok_or_else(|| invalid_argument("dot_kfold", "error tensor size overflows usize"))?;
    debug!(
        m,
        n,
        p,
        dtype = T::NAME,
        bytes = elems * std::mem::size_of::<T>(),
        "allocating k-fold error tensor"
    );

    let mut tensor = Array4::<T>::zeros((2, n, m, p));
    let mut partial = Array2::<T>::zeros((m, p));

    let row_jobs = Zip::from(tensor.axis_iter_mut(Axis(2)))
        .and(partial.rows_mut())
        .and(a.rows());
    // Never true without the `parallel` feature.
    if threading::should_parallelize(m, n, p) {
        threading::ensure_rayon_pool();
        debug!(rows = m, "splitting k-fold product across output rows");
        #[cfg(feature = "parallel")]
        row_jobs.par_for_each(|layers, acc, a_row| accumulate_row(a_row, b, layers, acc));
    } else {
        row_jobs.for_each(|layers, acc, a_row| accumulate_row(a_row, b, layers, acc));
    }
    tensor
        .slice_mut(s![ADDITION_LAYER, 0, .., ..])
        .assign(&partial);
    Ok(tensor)
}

/// One output row `i`: contraction index in the middle, columns innermost,
/// so the row of running sums stays hot across the whole contraction.
fn accumulate_row<T: Element>(
    a_row: ArrayView1<'_, T>,
    b: ArrayView2<'_, T>,
    mut layers: ArrayViewMut3<'_, T>,
    mut acc: ArrayViewMut1<'_, T>,
) {
    for (k, (&aik, b_row)) in a_row.iter().zip(b.rows()).enumerate() {
        let (err_mul, err_add) = layers.multi_slice_mut((
            s![MULTIPLICATION_LAYER, k, ..],
            s![ADDITION_LAYER, k, ..],
        ));
        Zip::from(&mut acc)
            .and(&b_row)
            .and(err_mul)
            .and(err_add)
            .for_each(|partial, &bkj, mul_slot, add_slot| {
                let (h, mul_err) = two_product(aik, bkj);
                let (sum, add_err) = two_sum(*partial, h);
                *partial = sum;
                *mul_slot = mul_err;
                *add_slot = add_err;
            });
    }
}

/// Vector form of [`dot_kfold`]: a `[2, n]` tensor for `x . y`.
pub fn dot_kfold_1d<T: Element>(x: ArrayView1<'_, T>, y: ArrayView1<'_, T>) -> CoreResult<Array2<T>> {
    check_vectors("dot_kfold_1d", &x, &y)?;
    let tensor = dot_kfold(x.insert_axis(Axis(0)), y.insert_axis(Axis(1)))?;
    Ok(tensor.index_axis_move(Axis(3), 0).index_axis_move(Axis(2), 0))
}

/// The plain working-precision product stored in an error tensor.
pub fn naive_layer<T, S>(tensor: &ArrayBase<S, Ix4>) -> CoreResult<ArrayView2<'_, T>>
where
    T: Element,
    S: Data<Elem = T>,
{
    let shape = tensor.shape();
    if shape[0] != 2 || shape[1] == 0 {
        return Err(shape_mismatch(
            "naive_layer",
            format!("expected an error tensor of shape [2, n >= 1, m, p], got {shape:?}"),
        ));
    }
    Ok(tensor.slice(s![ADDITION_LAYER, 0, .., ..]))
}

/// Flatten `[2, n, m, p]` into `[2n, m, p]`: product errors for every `k`
/// followed by the addition layer.
fn stack_layers<T: Element>(tensor: Array4<T>) -> CoreResult<Array3<T>> {
    let (layers, n, m, p) = tensor.dim();
    tensor
        .into_shape((layers * n, m, p))
        .map_err(|err| shape_mismatch("dot_kfold", format!("cannot stack error layers: {err}")))
}

/// `a . b` in K-fold working precision.
///
/// `folds == 1` is the naive product read from the tensor, not a plain sum
/// over all of its `2n` layers, which would already be more accurate than
/// the naive product. `folds >= 2` sums the stacked error tensor with
/// [`ksum`] using `folds - 1`.
pub fn kdot<T: Element>(a: ArrayView2<'_, T>, b: ArrayView2<'_, T>, folds: usize) -> CoreResult<Array2<T>> {
    if folds == 0 {
        return Err(invalid_argument("kdot", "fold count K must be at least 1"));
    }
    trace!(lhs = ?a.dim(), rhs = ?b.dim(), folds, "kdot");
    let tensor = dot_kfold(a, b)?;
    if folds == 1 {
        return Ok(naive_layer(&tensor)?.to_owned());
    }
    ksum(&stack_layers(tensor)?, folds - 1)
}

pub fn kdot_1d<T: Element>(x: ArrayView1<'_, T>, y: ArrayView1<'_, T>, folds: usize) -> CoreResult<T> {
    check_vectors("kdot_1d", &x, &y)?;
    let product = kdot(x.insert_axis(Axis(0)), y.insert_axis(Axis(1)), folds)?;
    Ok(product[[0, 0]])
}

/// Correctly rounded `a . b`.
pub fn fdot<T: Element>(a: ArrayView2<'_, T>, b: ArrayView2<'_, T>) -> CoreResult<Array2<T>> {
    trace!(lhs = ?a.dim(), rhs = ?b.dim(), "fdot");
    let tensor = dot_kfold(a, b)?;
    fsum(&stack_layers(tensor)?)
}

pub fn fdot_1d<T: Element>(x: ArrayView1<'_, T>, y: ArrayView1<'_, T>) -> CoreResult<T> {
    check_vectors("fdot_1d", &x, &y)?;
    let tensor = dot_kfold_1d(x, y)?;
    fsum_iter(tensor.iter().copied())
}

/// Ogita–Rump–Oishi Dot2: the result is as accurate as if computed in twice
/// the working precision and then rounded.
pub fn dot2<T: Element>(x: ArrayView1<'_, T>, y: ArrayView1<'_, T>) -> CoreResult<T> {
    check_vectors("dot2", &x, &y)?;
    let (mut p, mut s) = two_product(x[0], y[0]);
    for (&xk, &yk) in x.iter().zip(y.iter()).skip(1) {
        let (h, r) = two_product(xk, yk);
        let (sum, q) = two_sum(p, h);
        p = sum;
        s = s + (q + r);
    }
    Ok(p + s)
}

/// Condition number of a dot product, `2 |x|.|y| / |x.y|`.
pub fn cond_dot<T: Element>(x: ArrayView1<'_, T>, y: ArrayView1<'_, T>) -> CoreResult<T> {
    check_vectors("cond_dot", &x, &y)?;
    let abs_x: Array1<T> = x.mapv(T::abs);
    let abs_y: Array1<T> = y.mapv(T::abs);
    let magnitude = fdot_1d(abs_x.view(), abs_y.view())?;
    let value = fdot_1d(x, y)?;
    Ok((magnitude + magnitude) / value.abs())
}

fn check_vectors<T>(op: &'static str, x: &ArrayView1<'_, T>, y: &ArrayView1<'_, T>) -> CoreResult<()> {
    if x.len() != y.len() {
        return Err(shape_mismatch(
            op,
            format!("vector lengths differ ({} vs {})", x.len(), y.len()),
        ));
    }
    if x.is_empty() {
        return Err(empty_input(op));
    }
    Ok(())
}
