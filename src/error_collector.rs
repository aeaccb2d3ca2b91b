//! Per-(level, bitplane) squared-error contribution table (spec §4.5),
//! grounded on the error-estimation logic in `ComposedRefactor.hpp`: each
//! bitplane's contribution to the level's maximum possible squared error is
//! `2^(2*(E - idx - 1))` where `idx` is the bitplane's position (0 = most
//! significant) and `E` is the level's fixed-point exponent.

/// Squared-error upper bound contributed by retrieving bitplane `idx`
/// (0-indexed from the MSB) of a level whose fixed-point exponent is `e`.
pub fn bitplane_squared_error(e: i32, idx: u32) -> f64 {
    let shift = 2 * (e - idx as i32 - 1);
    2f64.powi(shift)
}

/// Running table of per-bitplane squared-error bounds for one level, summed
/// over all elements of that level (spec §4.5: the level's contribution to
/// the global error bound after retrieving `k` of its bitplanes).
#[derive(Clone, Debug)]
pub struct LevelErrorTable {
    /// `squared_error[k]` = bound on this level's total squared error after
    /// `k` bitplanes have been retrieved (monotonically non-increasing).
    pub squared_error: Vec<f64>,
}

impl LevelErrorTable {
    /// Build the table for a level with `num_elements` samples, fixed-point
    /// exponent `e`, and `num_bitplanes` total planes.
    pub fn build(num_elements: usize, e: i32, num_bitplanes: u32) -> Self {
        let mut squared_error = Vec::with_capacity(num_bitplanes as usize + 1);
        // Zero bitplanes retrieved: every sample could be off by up to the
        // full magnitude bound, i.e. bitplane index -1 (one more significant
        // than the MSB plane).
        let full = bitplane_squared_error(e, 0) * 2.0;
        squared_error.push(num_elements as f64 * full);
        for idx in 0..num_bitplanes {
            let per_element = bitplane_squared_error(e, idx);
            squared_error.push(num_elements as f64 * per_element);
        }
        Self { squared_error }
    }

    /// Error bound after retrieving `k` bitplanes of this level.
    pub fn at(&self, k: u32) -> f64 {
        self.squared_error[k as usize]
    }

    pub fn num_bitplanes(&self) -> u32 {
        (self.squared_error.len() - 1) as u32
    }

    /// Per-bitplane squared-error *reduction*: how much committing bitplane
    /// `b` alone shrinks the bound, the quantity the size interpreter scores
    /// against retrieval cost (spec §4.6).
    pub fn per_bitplane_reductions(&self) -> Vec<f64> {
        self.squared_error.windows(2).map(|w| w[0] - w[1]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_bound_is_monotonically_non_increasing() {
        let table = LevelErrorTable::build(100, 4, 8);
        for w in table.squared_error.windows(2) {
            assert!(w[0] >= w[1]);
        }
    }

    #[test]
    fn bitplane_contribution_halves_each_step_in_magnitude_squared() {
        let a = bitplane_squared_error(5, 0);
        let b = bitplane_squared_error(5, 1);
        assert!((a / b - 4.0).abs() < 1e-9); // one more bitplane => 2 bits of precision => 4x less squared error
    }
}
