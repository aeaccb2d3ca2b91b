//! Multilevel decomposer (spec §4.1): in-place hierarchical transforms that
//! separate an N-D array into `L+1` level coefficient sets.
//!
//! Both variants are built from the same per-axis lifting pass, applied
//! axis-by-axis (row-then-column-then-depth) over the nested grid geometry
//! from `dims.rs`.

use crate::array::{Array, Dims, MAX_DIMS};
use crate::dims::coarse_indices;
use crate::error::Error;
use crate::float::FloatWord;

/// Capability contract for a multilevel transform: `decompose` must be
/// exactly inverted by `recompose` given the same `target_level` (spec §4.1).
pub trait Decomposer<F> {
    fn decompose(&self, arr: &mut Array<F>, target_level: u8) -> Result<(), Error>;
    fn recompose(&self, arr: &mut Array<F>, target_level: u8) -> Result<(), Error>;
    fn name(&self) -> &'static str;
}

/// Precomputed nested grid: `axis_grid[level][axis]` lists, in ascending
/// order, the real buffer indices along `axis` that belong to level `level`'s
/// sub-grid. `axis_grid[target_level]` is the identity `0..dims.axis_len(axis)`.
struct NestedGrid {
    ndim: usize,
    levels: Vec<[Vec<u32>; MAX_DIMS]>,
}

impl NestedGrid {
    fn build(dims: Dims, target_level: u8) -> Self {
        let ndim = dims.ndim();
        let l = target_level as usize;
        let mut levels: Vec<[Vec<u32>; MAX_DIMS]> =
            (0..=l).map(|_| std::array::from_fn(|_| Vec::new())).collect();
        for axis in 0..ndim {
            levels[l][axis] = (0..dims.axis_len(axis)).collect();
        }
        for level in (1..=l).rev() {
            for axis in 0..ndim {
                let fine = &levels[level][axis];
                let coarse_local = coarse_indices(fine.len() as u32);
                levels[level - 1][axis] =
                    coarse_local.iter().map(|&li| fine[li as usize]).collect();
            }
        }
        Self { ndim, levels }
    }

    fn grid(&self, level: u8, axis: usize) -> &[u32] {
        &self.levels[level as usize][axis]
    }
}

/// Enumerate every "line" along `axis` at level `level`: for each combination
/// of the other axes' grid points, `f` is called with a coordinate array
/// whose `axis` slot is left at `0` for the caller to fill in per local
/// index.
fn for_each_line<F: FnMut(&mut [u32; MAX_DIMS])>(
    grid: &NestedGrid,
    level: u8,
    axis: usize,
    mut f: F,
) {
    let mut coords = [0u32; MAX_DIMS];
    match grid.ndim {
        1 => f(&mut coords),
        2 => {
            let other = if axis == 0 { 1 } else { 0 };
            for &g in grid.grid(level, other) {
                coords[other] = g;
                f(&mut coords);
            }
        }
        3 => {
            let others: Vec<usize> = (0..3).filter(|&a| a != axis).collect();
            for &g0 in grid.grid(level, others[0]) {
                coords[others[0]] = g0;
                for &g1 in grid.grid(level, others[1]) {
                    coords[others[1]] = g1;
                    f(&mut coords);
                }
            }
        }
        _ => unreachable!("ndim is validated to be in 1..=3"),
    }
}

fn flat_offset(dims: Dims, coords: &[u32; MAX_DIMS]) -> usize {
    let strides = dims.strides();
    (0..dims.ndim()).map(|a| coords[a] as usize * strides[a]).sum()
}

enum Lifting {
    /// Predict-only nodal residual (MGARD-style hierarchical surplus).
    Hierarchical,
    /// Predict + update lifting (a reversible biorthogonal-style scheme).
    Orthogonal,
}

/// Apply one axis's lifting pass, for every line at `level`, in place.
fn lift_axis<F: FloatWord>(
    data: &mut [F],
    dims: Dims,
    grid: &NestedGrid,
    level: u8,
    axis: usize,
    kind: &Lifting,
    forward: bool,
) {
    let axis_grid = grid.grid(level, axis).to_vec();
    let local_len = axis_grid.len() as u32;
    if local_len < 3 {
        return; // no interior "new" points possible on this axis at this level
    }
    let coarse_local = coarse_indices(local_len);
    let mut is_coarse = vec![false; local_len as usize];
    for &c in &coarse_local {
        is_coarse[c as usize] = true;
    }
    let new_locals: Vec<u32> =
        (0..local_len).filter(|&i| !is_coarse[i as usize]).collect();
    if new_locals.is_empty() {
        return;
    }

    for_each_line(grid, level, axis, |coords| {
        let get = |li: u32, coords: &[u32; MAX_DIMS]| -> usize {
            let mut c = *coords;
            c[axis] = axis_grid[li as usize];
            flat_offset(dims, &c)
        };

        match kind {
            Lifting::Hierarchical => {
                for &li in &new_locals {
                    let mid = get(li, coords);
                    let left = get(li - 1, coords);
                    let right = get(li + 1, coords);
                    if forward {
                        let pred = 0.5 * (data[left].to_f64() + data[right].to_f64());
                        let residual = data[mid].to_f64() - pred;
                        data[mid] = F::from_f64(residual);
                    } else {
                        let pred = 0.5 * (data[left].to_f64() + data[right].to_f64());
                        let orig = data[mid].to_f64() + pred;
                        data[mid] = F::from_f64(orig);
                    }
                }
            }
            Lifting::Orthogonal => {
                // Predict phase: collect detail coefficients using the
                // untouched coarse neighbours.
                let mut details = Vec::with_capacity(new_locals.len());
                for &li in &new_locals {
                    let mid = get(li, coords);
                    let left = get(li - 1, coords);
                    let right = get(li + 1, coords);
                    if forward {
                        let pred = 0.5 * (data[left].to_f64() + data[right].to_f64());
                        let d = data[mid].to_f64() - pred;
                        data[mid] = F::from_f64(d);
                        details.push(d);
                    } else {
                        // Details are still sitting at `mid` untouched by
                        // the (not-yet-undone) update step.
                        details.push(data[mid].to_f64());
                    }
                }
                if forward {
                    // Update phase: spread detail energy into the coarse
                    // neighbours so the coarse channel stays smooth.
                    for (k, &li) in new_locals.iter().enumerate() {
                        let left = get(li - 1, coords);
                        let right = get(li + 1, coords);
                        let d = details[k];
                        data[left] = F::from_f64(data[left].to_f64() + 0.25 * d);
                        data[right] = F::from_f64(data[right].to_f64() + 0.25 * d);
                    }
                } else {
                    // Undo update first (restores the original coarse
                    // samples), then undo predict.
                    for (k, &li) in new_locals.iter().enumerate() {
                        let left = get(li - 1, coords);
                        let right = get(li + 1, coords);
                        let d = details[k];
                        data[left] = F::from_f64(data[left].to_f64() - 0.25 * d);
                        data[right] = F::from_f64(data[right].to_f64() - 0.25 * d);
                    }
                    for (k, &li) in new_locals.iter().enumerate() {
                        let mid = get(li, coords);
                        let left = get(li - 1, coords);
                        let right = get(li + 1, coords);
                        let pred = 0.5 * (data[left].to_f64() + data[right].to_f64());
                        data[mid] = F::from_f64(details[k] + pred);
                    }
                }
            }
        }
    });
}

fn run<F: FloatWord>(arr: &mut Array<F>, target_level: u8, kind: Lifting, forward: bool) {
    let dims = arr.dims();
    let grid = NestedGrid::build(dims, target_level);
    let data = arr.as_mut_slice();
    if forward {
        for level in (1..=target_level).rev() {
            for axis in 0..dims.ndim() {
                lift_axis(data, dims, &grid, level, axis, &kind, true);
            }
        }
    } else {
        for level in 1..=target_level {
            for axis in (0..dims.ndim()).rev() {
                lift_axis(data, dims, &grid, level, axis, &kind, false);
            }
        }
    }
}

/// MGARD-style hierarchical (nodal-surplus) multilevel transform.
pub struct HierarchicalDecomposer;

impl<F: FloatWord> Decomposer<F> for HierarchicalDecomposer {
    fn decompose(&self, arr: &mut Array<F>, target_level: u8) -> Result<(), Error> {
        run(arr, target_level, Lifting::Hierarchical, true);
        Ok(())
    }
    fn recompose(&self, arr: &mut Array<F>, target_level: u8) -> Result<(), Error> {
        run(arr, target_level, Lifting::Hierarchical, false);
        Ok(())
    }
    fn name(&self) -> &'static str {
        "hierarchical"
    }
}

/// MGARD-style orthogonal (predict + update lifting) multilevel transform.
pub struct OrthogonalDecomposer;

impl<F: FloatWord> Decomposer<F> for OrthogonalDecomposer {
    fn decompose(&self, arr: &mut Array<F>, target_level: u8) -> Result<(), Error> {
        run(arr, target_level, Lifting::Orthogonal, true);
        Ok(())
    }
    fn recompose(&self, arr: &mut Array<F>, target_level: u8) -> Result<(), Error> {
        run(arr, target_level, Lifting::Orthogonal, false);
        Ok(())
    }
    fn name(&self) -> &'static str {
        "orthogonal"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Dims;

    fn ramp(dims: Dims) -> Array<f64> {
        let n = dims.num_elements();
        Array::from_vec(dims, (0..n).map(|i| i as f64 * 0.5).collect()).unwrap()
    }

    #[test]
    fn hierarchical_round_trips_1d() {
        let dims = Dims::new(&[17]).unwrap();
        let orig = ramp(dims);
        let mut arr = orig.clone();
        let dec = HierarchicalDecomposer;
        dec.decompose(&mut arr, 3).unwrap();
        dec.recompose(&mut arr, 3).unwrap();
        for (a, b) in arr.as_slice().iter().zip(orig.as_slice()) {
            assert!((a - b).abs() < 1e-9, "{a} vs {b}");
        }
    }

    #[test]
    fn orthogonal_round_trips_2d() {
        let dims = Dims::new(&[9, 9]).unwrap();
        let orig = ramp(dims);
        let mut arr = orig.clone();
        let dec = OrthogonalDecomposer;
        dec.decompose(&mut arr, 2).unwrap();
        dec.recompose(&mut arr, 2).unwrap();
        for (a, b) in arr.as_slice().iter().zip(orig.as_slice()) {
            assert!((a - b).abs() < 1e-9, "{a} vs {b}");
        }
    }

    #[test]
    fn hierarchical_round_trips_3d() {
        let dims = Dims::new(&[5, 6, 7]).unwrap();
        let orig = ramp(dims);
        let mut arr = orig.clone();
        let dec = HierarchicalDecomposer;
        dec.decompose(&mut arr, 1).unwrap();
        dec.recompose(&mut arr, 1).unwrap();
        for (a, b) in arr.as_slice().iter().zip(orig.as_slice()) {
            assert!((a - b).abs() < 1e-9, "{a} vs {b}");
        }
    }

    #[test]
    fn constant_array_decomposes_to_all_zero_detail() {
        // A constant signal has no detail under either lifting scheme.
        let dims = Dims::new(&[16]).unwrap();
        let orig = Array::<f64>::from_vec(dims, vec![1.0; 16]).unwrap();
        let mut arr = orig.clone();
        let dec = HierarchicalDecomposer;
        dec.decompose(&mut arr, 1).unwrap();
        for &v in arr.as_slice() {
            assert!(v.abs() < 1e-12 || (v - 1.0).abs() < 1e-12);
        }
    }
}
