//! Level interleaver (spec §4.2): gather a level's "shell" of coefficients
//! out of the full in-place array into a compact buffer, and scatter them
//! back. Built on the same nested-grid geometry `decompose.rs` uses, so every
//! interleaver variant agrees with every decomposer variant on level shape.

use crate::array::{Dims, MAX_DIMS};
use crate::dims::coarse_indices;

/// Capability contract for gathering/scattering one level's coefficients.
pub trait Interleaver<F> {
    /// Gather the `dims_level.num_elements() - dims_prev.num_elements()`
    /// coefficients unique to this level out of `src_full` into a freshly
    /// allocated compact buffer.
    fn interleave(
        &self,
        src_full: &[F],
        dims: Dims,
        dims_level: Dims,
        dims_prev: Option<Dims>,
    ) -> Vec<F>;

    /// Inverse of `interleave`: scatter `src_level` back into `dst_full`.
    fn reposition(
        &self,
        src_level: &[F],
        dims: Dims,
        dims_level: Dims,
        dims_prev: Option<Dims>,
        dst_full: &mut [F],
    );

    fn name(&self) -> &'static str;
}

/// The "shell" of a level: buffer offsets of every grid point that belongs
/// to `dims_level` but not to `dims_prev` (spec §3: `dims_ℓ \ dims_{ℓ-1}`),
/// expressed as real flat offsets into the array described by `dims`.
///
/// `order` controls the traversal order used to lay the shell out in the
/// compact per-level buffer: row-major for `DirectInterleaver`, Morton
/// (Z-order) for `SfcInterleaver`.
fn shell_offsets(dims: Dims, dims_level: Dims, dims_prev: Option<Dims>, morton: bool) -> Vec<usize> {
    let ndim = dims.ndim();
    let strides = dims.strides();

    // Map each level-local axis index back to the real axis index in `dims`
    // via the same `coarse_indices` recursion `decompose.rs` uses, so the
    // two components agree on where a level's grid points physically live.
    // We rebuild the level's global grid directly from `dims` rather than
    // depending on `decompose`'s internal state, keeping the interleaver
    // decomposer-agnostic (spec §4.1: "downstream components are
    // decomposer-agnostic").
    let full_grid: Vec<Vec<u32>> = (0..ndim).map(|a| (0..dims.axis_len(a)).collect()).collect();
    let level_grid = coarsen_grid_to(&full_grid, dims_level);
    let prev_grid = dims_prev.map(|dp| coarsen_grid_to(&full_grid, dp));

    let mut prev_set: Vec<std::collections::HashSet<u32>> = Vec::new();
    if let Some(pg) = &prev_grid {
        for axis_vals in pg {
            prev_set.push(axis_vals.iter().copied().collect());
        }
    }

    let mut coords_list: Vec<[u32; MAX_DIMS]> = Vec::with_capacity(dims_level.num_elements());
    enumerate_grid(&level_grid, ndim, &mut coords_list);

    let mut offsets = Vec::with_capacity(coords_list.len().saturating_sub(
        dims_prev.map(|d| d.num_elements()).unwrap_or(0),
    ));
    let mut sort_keys: Vec<(u64, usize)> = Vec::new();
    for coords in &coords_list {
        let is_in_prev = match &prev_grid {
            None => false,
            Some(_) => (0..ndim).all(|a| prev_set[a].contains(&coords[a])),
        };
        if is_in_prev {
            continue;
        }
        let offset = (0..ndim).map(|a| coords[a] as usize * strides[a]).sum::<usize>();
        let key = if morton { morton_key(coords, ndim) } else { offset as u64 };
        sort_keys.push((key, offset));
        offsets.push(offset);
    }
    if morton {
        sort_keys.sort_unstable_by_key(|&(k, _)| k);
        sort_keys.into_iter().map(|(_, off)| off).collect()
    } else {
        offsets
    }
}

fn coarsen_grid_to(full_grid: &[Vec<u32>], target_dims: Dims) -> Vec<Vec<u32>> {
    full_grid
        .iter()
        .enumerate()
        .map(|(axis, fine)| {
            let target_len = target_dims.axis_len(axis) as usize;
            let mut cur = fine.clone();
            while cur.len() > target_len {
                let coarse_local = coarse_indices(cur.len() as u32);
                cur = coarse_local.iter().map(|&li| cur[li as usize]).collect();
            }
            cur
        })
        .collect()
}

fn enumerate_grid(grid: &[Vec<u32>], ndim: usize, out: &mut Vec<[u32; MAX_DIMS]>) {
    match ndim {
        1 => {
            for &a in &grid[0] {
                let mut c = [0u32; MAX_DIMS];
                c[0] = a;
                out.push(c);
            }
        }
        2 => {
            for &a in &grid[0] {
                for &b in &grid[1] {
                    let mut c = [0u32; MAX_DIMS];
                    c[0] = a;
                    c[1] = b;
                    out.push(c);
                }
            }
        }
        3 => {
            for &a in &grid[0] {
                for &b in &grid[1] {
                    for &c_ in &grid[2] {
                        let mut c = [0u32; MAX_DIMS];
                        c[0] = a;
                        c[1] = b;
                        c[2] = c_;
                        out.push(c);
                    }
                }
            }
        }
        _ => unreachable!(),
    }
}

/// Interleave 3 coordinates' bits to form a Morton (Z-order) key.
fn morton_key(coords: &[u32; MAX_DIMS], ndim: usize) -> u64 {
    let mut key = 0u64;
    for bit in 0..21 {
        for axis in 0..ndim {
            let b = (coords[axis] >> bit) & 1;
            key |= (b as u64) << (bit * ndim as u32 + axis as u32);
        }
    }
    key
}

/// Row-major-order gather/scatter.
pub struct DirectInterleaver;

impl<F: Copy + Default> Interleaver<F> for DirectInterleaver {
    fn interleave(&self, src_full: &[F], dims: Dims, dims_level: Dims, dims_prev: Option<Dims>) -> Vec<F> {
        let offsets = shell_offsets(dims, dims_level, dims_prev, false);
        offsets.into_iter().map(|o| src_full[o]).collect()
    }

    fn reposition(
        &self,
        src_level: &[F],
        dims: Dims,
        dims_level: Dims,
        dims_prev: Option<Dims>,
        dst_full: &mut [F],
    ) {
        let offsets = shell_offsets(dims, dims_level, dims_prev, false);
        for (v, o) in src_level.iter().zip(offsets) {
            dst_full[o] = *v;
        }
    }

    fn name(&self) -> &'static str {
        "direct"
    }
}

/// Space-filling-curve (Morton/Z-order) gather/scatter: improves locality of
/// reference for the downstream lossless codec pass (spec §4.2).
pub struct SfcInterleaver;

impl<F: Copy + Default> Interleaver<F> for SfcInterleaver {
    fn interleave(&self, src_full: &[F], dims: Dims, dims_level: Dims, dims_prev: Option<Dims>) -> Vec<F> {
        let offsets = shell_offsets(dims, dims_level, dims_prev, true);
        offsets.into_iter().map(|o| src_full[o]).collect()
    }

    fn reposition(
        &self,
        src_level: &[F],
        dims: Dims,
        dims_level: Dims,
        dims_prev: Option<Dims>,
        dst_full: &mut [F],
    ) {
        let offsets = shell_offsets(dims, dims_level, dims_prev, true);
        for (v, o) in src_level.iter().zip(offsets) {
            dst_full[o] = *v;
        }
    }

    fn name(&self) -> &'static str {
        "sfc"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dims::level_dims;

    #[test]
    fn direct_round_trip_covers_every_element_exactly_once() {
        let dims = Dims::new(&[9, 9]).unwrap();
        let levels = level_dims(dims, 2);
        let src: Vec<f64> = (0..dims.num_elements()).map(|i| i as f64).collect();
        let mut dst = vec![0.0f64; dims.num_elements()];
        let il = DirectInterleaver;
        for (ℓ, &dims_level) in levels.iter().enumerate() {
            let dims_prev = if ℓ == 0 { None } else { Some(levels[ℓ - 1]) };
            let shell = il.interleave(&src, dims, dims_level, dims_prev);
            let expected_len = dims_level.num_elements()
                - dims_prev.map(|d| d.num_elements()).unwrap_or(0);
            assert_eq!(shell.len(), expected_len);
            il.reposition(&shell, dims, dims_level, dims_prev, &mut dst);
        }
        assert_eq!(src, dst);
    }

    #[test]
    fn sfc_round_trip_covers_every_element_exactly_once() {
        let dims = Dims::new(&[8, 8]).unwrap();
        let levels = level_dims(dims, 2);
        let src: Vec<f64> = (0..dims.num_elements()).map(|i| i as f64).collect();
        let mut dst = vec![0.0f64; dims.num_elements()];
        let il = SfcInterleaver;
        for (ℓ, &dims_level) in levels.iter().enumerate() {
            let dims_prev = if ℓ == 0 { None } else { Some(levels[ℓ - 1]) };
            let shell = il.interleave(&src, dims, dims_level, dims_prev);
            il.reposition(&shell, dims, dims_level, dims_prev, &mut dst);
        }
        assert_eq!(src, dst);
    }
}
