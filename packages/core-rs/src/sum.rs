//! Compensated and exactly rounded reductions.

use crate::distill::distill_passes_in_place;
use crate::element::Element;
use crate::error::{empty_input, invalid_argument, numeric_issue};
use crate::{leading_len, CoreResult};
use ndarray::{Array, Array1, ArrayBase, ArrayView1, ArrayView2, Axis, Data, RemoveAxis, Zip};
use tracing::trace;

/// Running Kahan state: naive sum plus the negated low-order bits lost so far.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Kahan<T> {
    sum: T,
    compensation: T,
}

impl<T: Element> Kahan<T> {
    pub(crate) fn new() -> Self {
        Kahan {
            sum: T::zero(),
            compensation: T::zero(),
        }
    }

    #[inline(always)]
    pub(crate) fn add(&mut self, x: T) {
        let y = x - self.compensation;
        let t = self.sum + y;
        self.compensation = (t - self.sum) - y;
        self.sum = t;
    }

    pub(crate) fn total(&self) -> T {
        self.sum
    }
}

/// Neumaier's variant: the correction is accumulated separately and picks
/// the branch that keeps the larger operand intact.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Neumaier<T> {
    sum: T,
    compensation: T,
}

impl<T: Element> Neumaier<T> {
    pub(crate) fn starting_at(first: T) -> Self {
        Neumaier {
            sum: first,
            compensation: T::zero(),
        }
    }

    #[inline(always)]
    pub(crate) fn add(&mut self, x: T) {
        let t = self.sum + x;
        self.compensation = self.compensation
            + if self.sum.abs() > x.abs() {
                (self.sum - t) + x
            } else {
                (x - t) + self.sum
            };
        self.sum = t;
    }

    pub(crate) fn total(&self) -> T {
        self.sum + self.compensation
    }
}

/// Kahan summation of a vector. A single element is returned unchanged.
pub fn sum_kahan<T: Element>(values: ArrayView1<'_, T>) -> CoreResult<T> {
    if values.is_empty() {
        return Err(empty_input("sum_kahan"));
    }
    trace!(len = values.len(), "sum_kahan");
    let mut acc = Kahan::new();
    for &x in values.iter() {
        acc.add(x);
    }
    Ok(acc.total())
}

/// Column-wise Kahan summation of an `m x n` matrix into a length-`n` vector.
///
/// Rows are streamed in order so each column sees the same recurrence as
/// [`sum_kahan`] on that column.
pub fn sum_kahan_batched<T: Element>(matrix: ArrayView2<'_, T>) -> CoreResult<Array1<T>> {
    if matrix.nrows() == 0 {
        return Err(empty_input("sum_kahan_batched"));
    }
    trace!(rows = matrix.nrows(), cols = matrix.ncols(), "sum_kahan_batched");
    let mut accs = Array1::from_elem(matrix.ncols(), Kahan::new());
    for row in matrix.rows() {
        Zip::from(&mut accs)
            .and(&row)
            .for_each(|acc, &x| acc.add(x));
    }
    Ok(accs.map(Kahan::total))
}

/// Neumaier ("improved Kahan") summation of a vector.
pub fn sum_neumaier<T: Element>(values: ArrayView1<'_, T>) -> CoreResult<T> {
    let first = *values.first().ok_or_else(|| empty_input("sum_neumaier"))?;
    trace!(len = values.len(), "sum_neumaier");
    let mut acc = Neumaier::starting_at(first);
    for &x in values.iter().skip(1) {
        acc.add(x);
    }
    Ok(acc.total())
}

/// Column-wise Neumaier summation of an `m x n` matrix.
pub fn sum_neumaier_batched<T: Element>(matrix: ArrayView2<'_, T>) -> CoreResult<Array1<T>> {
    if matrix.nrows() == 0 {
        return Err(empty_input("sum_neumaier_batched"));
    }
    trace!(rows = matrix.nrows(), cols = matrix.ncols(), "sum_neumaier_batched");
    let mut accs = matrix.row(0).map(|&x| Neumaier::starting_at(x));
    for row in matrix.rows().into_iter().skip(1) {
        Zip::from(&mut accs)
            .and(&row)
            .for_each(|acc, &x| acc.add(x));
    }
    Ok(accs.map(Neumaier::total))
}

/// Sum along axis 0 in K-fold working precision (Ogita–Rump–Oishi SumK).
///
/// The input is copied, distilled `folds - 1` times, and the residual rows
/// are folded left to right before the last row is added. `folds == 1` is
/// the plain sum.
pub fn ksum<T, S, D>(p: &ArrayBase<S, D>, folds: usize) -> CoreResult<Array<T, D::Smaller>>
where
    T: Element,
    S: Data<Elem = T>,
    D: RemoveAxis,
{
    if folds == 0 {
        return Err(invalid_argument("ksum", "fold count K must be at least 1"));
    }
    let n = leading_len("ksum", p)?;
    trace!(shape = ?p.shape(), folds, "ksum");
    let mut q = p.to_owned();
    distill_passes_in_place(&mut q, folds - 1)?;

    let mut acc = Array::zeros(q.raw_dim().remove_axis(Axis(0)));
    for row in q.axis_iter(Axis(0)).take(n - 1) {
        Zip::from(&mut acc).and(&row).for_each(|a, &x| *a = *a + x);
    }
    let last = q.index_axis(Axis(0), n - 1);
    Zip::from(&mut acc).and(&last).for_each(|a, &x| *a = *a + x);
    Ok(acc)
}

/// Correctly rounded sum along axis 0.
///
/// Shewchuk's non-overlapping partials with a final half-even correction,
/// the same contract as Python's `math.fsum`. Infinities and NaN follow
/// IEEE rules; an overflow produced from finite inputs is an error.
pub fn fsum<T, S, D>(p: &ArrayBase<S, D>) -> CoreResult<Array<T, D::Smaller>>
where
    T: Element,
    S: Data<Elem = T>,
    D: RemoveAxis,
{
    leading_len("fsum", p)?;
    trace!(shape = ?p.shape(), "fsum");
    let mut out = Array::zeros(p.raw_dim().remove_axis(Axis(0)));
    for (slot, lane) in out.iter_mut().zip(p.lanes(Axis(0))) {
        *slot = fsum_iter(lane.iter().copied())?;
    }
    Ok(out)
}

pub(crate) fn fsum_iter<T, I>(values: I) -> CoreResult<T>
where
    T: Element,
    I: IntoIterator<Item = T>,
{
    let mut partials: Vec<T> = Vec::with_capacity(32);
    let mut special = T::zero();

    for value in values {
        let mut x = value;
        let mut kept = 0;
        for idx in 0..partials.len() {
            let mut y = partials[idx];
            if x.abs() < y.abs() {
                std::mem::swap(&mut x, &mut y);
            }
            let hi = x + y;
            let lo = y - (hi - x);
            if lo != T::zero() {
                partials[kept] = lo;
                kept += 1;
            }
            x = hi;
        }
        partials.truncate(kept);

        if x != T::zero() {
            if x.is_finite() {
                partials.push(x);
            } else {
                if value.is_finite() {
                    return Err(numeric_issue("fsum", "intermediate overflow"));
                }
                special = special + value;
                partials.clear();
            }
        }
    }

    // NaN compares unequal to zero, so it is reported here as well.
    if special != T::zero() {
        return Ok(special);
    }

    let mut hi = match partials.pop() {
        Some(top) => top,
        None => return Ok(T::zero()),
    };
    let mut lo = T::zero();
    while let Some(y) = partials.pop() {
        let x = hi;
        hi = x + y;
        let yr = hi - x;
        lo = y - yr;
        if lo != T::zero() {
            break;
        }
    }
    // Round half to even across the remaining partial.
    if let Some(&next) = partials.last() {
        let zero = T::zero();
        if (lo < zero && next < zero) || (lo > zero && next > zero) {
            let y = lo + lo;
            let x = hi + y;
            let yr = x - hi;
            if y == yr {
                hi = x;
            }
        }
    }
    Ok(hi)
}

/// Condition number of a sum, `sum(|p|) / |sum(p)|`, evaluated with [`fsum`].
pub fn cond_sum<T: Element>(p: ArrayView1<'_, T>) -> CoreResult<T> {
    if p.is_empty() {
        return Err(empty_input("cond_sum"));
    }
    let magnitude = fsum_iter(p.iter().map(|x| x.abs()))?;
    let total = fsum_iter(p.iter().copied())?;
    Ok(magnitude / total.abs())
}
