//! Unbiased Fisher-Yates shuffle over raw generator output

use rand::RngCore;

/// Uniform value in `0..range` from raw 64-bit draws.
///
/// Draws at or above the largest multiple of `range` that fits in 2^64 are
/// discarded, so no residue is more likely than another.
fn uniform_below<R: RngCore + ?Sized>(rng: &mut R, range: u64) -> u64 {
    debug_assert!(range > 0);
    let space: u128 = 1 << 64;
    let zone = space - space % u128::from(range);
    loop {
        let draw = rng.next_u64();
        if u128::from(draw) < zone {
            return draw % range;
        }
    }
}

/// Shuffle `items` in place.
///
/// Every permutation is equally likely given an unbiased generator.
pub fn fisher_yates<T, R: RngCore + ?Sized>(items: &mut [T], rng: &mut R) {
    let n = items.len();
    if n < 2 {
        return;
    }
    for i in 0..n - 1 {
        let range = (n - i) as u64;
        let j = i + uniform_below(rng, range) as usize;
        items.swap(i, j);
    }
}
