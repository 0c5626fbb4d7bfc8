//! Error-free transformations of a single addition or multiplication.
//!
//! Every function returns the rounded result together with its exact
//! rounding error, so that `a op b == result + error` holds in infinite
//! precision for finite inputs. These are the leaves every accumulation
//! algorithm in the crate is built from.
//!
//! References: Knuth, TAOCP vol. 2; Dekker 1971; Ogita, Rump & Oishi,
//! "Accurate Sum and Dot Product", SIAM J. Sci. Comput. 26(6), 2005.

use crate::element::Element;

/// Product with exact error through a fused multiply-add.
///
/// `e = fma(a, b, -p)` is exact only because the fused operation rounds
/// once. A separate multiply followed by a subtract would lose the error.
#[inline(always)]
pub fn two_product<T: Element>(a: T, b: T) -> (T, T) {
    let p = a * b;
    let e = a.mul_add(b, -p);
    (p, e)
}

/// Knuth's branch-free two-sum. No ordering precondition on `|a|`, `|b|`.
#[inline(always)]
pub fn two_sum<T: Element>(a: T, b: T) -> (T, T) {
    let z0 = a + b;
    let z1 = z0 - a;
    let e = (a - (z0 - z1)) + (b - z1);
    (z0, e)
}

/// Dekker's two-sum: one branch and three flops fewer than [`two_sum`].
#[inline]
pub fn fast_two_sum<T: Element>(a: T, b: T) -> (T, T) {
    let s = a + b;
    let e = if a.abs() > b.abs() {
        b - (s - a)
    } else {
        a - (s - b)
    };
    (s, e)
}

/// Veltkamp splitting of `a` into two non-overlapping halves, `a == hi + lo`.
#[inline(always)]
pub fn split<T: Element>(a: T) -> (T, T) {
    let c = T::SPLIT_FACTOR * a;
    let hi = c - (c - a);
    let lo = a - hi;
    (hi, lo)
}

/// Exact product without FMA, valid as long as nothing over- or underflows.
#[inline]
pub fn two_product_dekker<T: Element>(a: T, b: T) -> (T, T) {
    let p = a * b;
    let (a1, a2) = split(a);
    let (b1, b2) = split(b);
    let e = a2 * b2 - (((p - a1 * b1) - a2 * b1) - a1 * b2);
    (p, e)
}
