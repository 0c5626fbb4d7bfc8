//! Error-free vector transformation for summation (distillation).
//!
//! One pass walks axis 0 from top to bottom and replaces each adjacent pair
//! `(r[i-1], r[i])` by `(error, rounded sum)` of their two-sum. The exact
//! total of every column is unchanged while magnitude migrates into the last
//! row. Every index off axis 0 is an independent column.

use crate::eft::two_sum;
use crate::element::Element;
use crate::{leading_len, CoreResult};
use ndarray::{Array, ArrayBase, Axis, Data, DataMut, RemoveAxis, Zip};
use tracing::trace;

/// Run a single distillation pass over `values` in place.
///
/// A single row is left untouched. An empty leading axis or a rank-0 array
/// is rejected before anything is written.
pub fn distill_in_place<T, S, D>(values: &mut ArrayBase<S, D>) -> CoreResult<()>
where
    T: Element,
    S: DataMut<Elem = T>,
    D: RemoveAxis,
{
    distill_passes_in_place(values, 1)
}

/// Copying form of [`distill_in_place`].
pub fn distill<T, S, D>(values: &ArrayBase<S, D>) -> CoreResult<Array<T, D>>
where
    T: Element,
    S: Data<Elem = T>,
    D: RemoveAxis,
{
    distill_passes(values, 1)
}

/// Apply `passes` consecutive distillation passes in place; zero is a no-op.
pub fn distill_passes_in_place<T, S, D>(values: &mut ArrayBase<S, D>, passes: usize) -> CoreResult<()>
where
    T: Element,
    S: DataMut<Elem = T>,
    D: RemoveAxis,
{
    let rows = leading_len("distill", values)?;
    trace!(shape = ?values.shape(), passes, "distill");
    for _ in 0..passes {
        single_pass(values, rows);
    }
    Ok(())
}

pub fn distill_passes<T, S, D>(values: &ArrayBase<S, D>, passes: usize) -> CoreResult<Array<T, D>>
where
    T: Element,
    S: Data<Elem = T>,
    D: RemoveAxis,
{
    leading_len("distill", values)?;
    let mut out = values.to_owned();
    distill_passes_in_place(&mut out, passes)?;
    Ok(out)
}

fn single_pass<T, S, D>(values: &mut ArrayBase<S, D>, rows: usize)
where
    T: Element,
    S: DataMut<Elem = T>,
    D: RemoveAxis,
{
    for i in 1..rows {
        let (mut head, mut tail) = values.view_mut().split_at(Axis(0), i);
        let prev = head.index_axis_mut(Axis(0), i - 1);
        let cur = tail.index_axis_mut(Axis(0), 0);
        Zip::from(prev).and(cur).for_each(|lo, hi| {
            let (sum, err) = two_sum(*hi, *lo);
            *hi = sum;
            *lo = err;
        });
    }
}
