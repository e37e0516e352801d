//! Measurement vector arithmetic
//!
//! A measurement vector is one `u64` per CPU frequency bucket. Cumulative
//! vectors only grow until the underlying counter source resets.

/// Element-wise sum treating an absent operand as the identity.
///
/// Returns `None` only when both operands are absent. When lengths differ
/// the result takes the longer length and the missing slots count as zero.
pub fn add_vectors(a: Option<&[u64]>, b: Option<&[u64]>) -> Option<Vec<u64>> {
    match (a, b) {
        (None, None) => None,
        (Some(v), None) | (None, Some(v)) => Some(v.to_vec()),
        (Some(a), Some(b)) => {
            let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
            let mut out = long.to_vec();
            for (slot, value) in out.iter_mut().zip(short) {
                *slot += *value;
            }
            Some(out)
        }
    }
}

/// Add `delta` into `acc` in place. Lengths must already be equal.
pub(crate) fn accumulate(acc: &mut [u64], delta: &[u64]) {
    debug_assert_eq!(acc.len(), delta.len());
    for (slot, value) in acc.iter_mut().zip(delta) {
        *slot += *value;
    }
}

/// Per-slot `current - previous`, clamped at zero.
///
/// Returns the delta and whether any slot had to be clamped (counter reset).
pub fn clamped_delta(current: &[u64], previous: &[u64]) -> (Vec<u64>, bool) {
    let mut clamped = false;
    let delta = current
        .iter()
        .enumerate()
        .map(|(i, &now)| {
            let before = previous.get(i).copied().unwrap_or(0);
            if now < before {
                clamped = true;
            }
            now.saturating_sub(before)
        })
        .collect();
    (delta, clamped)
}

/// True when every slot is zero (or the vector is empty)
pub fn is_zero(v: &[u64]) -> bool {
    v.iter().all(|&x| x == 0)
}
