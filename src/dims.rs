//! Per-level grid geometry: the `dims_ℓ` rule shared by every decomposer and
//! interleaver variant (spec §4.1), plus the coarse/fine index partition used
//! to gather and scatter a level's "shell" of coefficients.

use crate::array::{Dims, MAX_DIMS};
use crate::error::Error;

/// Coarsen one axis length per the spec's halving rule:
/// `d -> ceil((d + 1) / 2)`.
fn coarsen_axis(d: u32) -> u32 {
    (d + 2) / 2
}

/// The indices along a single axis of length `d` that belong to the next
/// coarser level: always includes `0`, then every other index, and always
/// ends on `d - 1` so the two endpoints of the axis are always representable
/// regardless of `d`'s parity. This keeps every "new" (non-coarse) index
/// exactly halfway between two coarse neighbours two apart, which the
/// decomposer relies on.
pub fn coarse_indices(d: u32) -> Vec<u32> {
    let new_len = coarsen_axis(d) as usize;
    if new_len <= 1 {
        return vec![0];
    }
    let mut idx = Vec::with_capacity(new_len);
    for i in 0..new_len - 1 {
        idx.push((2 * i) as u32);
    }
    idx.push(d - 1);
    idx
}

/// Greatest target level supported by `dims`: `floor(log2(min(dims))) - 1`.
pub fn max_target_level(dims: Dims) -> u8 {
    let min_axis = dims.min_axis_len().max(1);
    let log2_floor = 31 - min_axis.leading_zeros();
    log2_floor.saturating_sub(1) as u8
}

pub fn validate_target_level(dims: Dims, target_level: u8) -> Result<(), Error> {
    let max_level = max_target_level(dims);
    if target_level > max_level {
        return Err(Error::InvalidArgument(format!(
            "target_level {target_level} exceeds the maximum of {max_level} for dims {:?}",
            dims.as_slice()
        )));
    }
    Ok(())
}

/// `dims_ℓ` for `ℓ` in `0..=target_level`, finest (`dims_L == dims`) last.
/// Index `0` is the coarsest level, index `target_level` is the original
/// resolution (spec §3: `n_L = n`, `n_ℓ < n_{ℓ+1}` strictly).
pub fn level_dims(dims: Dims, target_level: u8) -> Vec<Dims> {
    let l = target_level as usize;
    let mut levels = vec![dims; l + 1];
    let mut cur = dims;
    for level in (0..l).rev() {
        let mut coarser = [1u32; MAX_DIMS];
        for axis in 0..cur.ndim() {
            coarser[axis] = coarsen_axis(cur.axis_len(axis));
        }
        cur = Dims::new(&coarser[..cur.ndim()]).expect("coarsened dims stay valid");
        levels[level] = cur;
    }
    levels
}
