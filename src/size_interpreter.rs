//! Greedy byte-budget allocator (spec §4.6): given per-(level, bitplane)
//! sizes and squared-error contributions plus a tolerance, decide how many
//! bitplanes of each level to retrieve. Grounded on `ComposedReconstructor.hpp`'s
//! `interpret_retrieve_size` call shape, reimplemented from the spec's stated
//! greedy policy since the concrete `SizeInterpreter.hpp` wasn't part of the
//! retrieved source fragment.

use crate::error::Error;

/// What the size interpreter decided to retrieve for one request.
#[derive(Clone, Debug)]
pub struct RetrievalPlan {
    /// Bytes to retrieve per level.
    pub retrieve_sizes: Vec<u32>,
    /// Bitplanes to retrieve per level (monotone across repeated calls with
    /// shrinking tolerance, spec §4.6's progressive invariant).
    pub num_bitplanes: Vec<u32>,
}

/// Greedily pick `(level, bitplane)` pairs in order of error-reduction per
/// retrieved byte until the accumulated squared error drops to `tolerance²`
/// or every bitplane is committed.
///
/// `sizes[level][b]` and `err_sq[level][b]` give bitplane `b`'s byte cost and
/// squared-error contribution for `level`. `already_committed[level]`, if
/// given, seeds `num_bitplanes[level]` so a second call with a tighter
/// tolerance only ever adds bitplanes (spec's progressive invariant) — pass
/// `None` for a from-scratch plan.
pub fn interpret_retrieve_size(
    sizes: &[Vec<u32>],
    err_sq: &[Vec<f64>],
    tolerance_sq: f64,
    already_committed: Option<&[u32]>,
) -> Result<RetrievalPlan, Error> {
    if sizes.len() != err_sq.len() {
        return Err(Error::InvalidArgument("sizes and err_sq must have the same number of levels".into()));
    }
    let num_levels = sizes.len();
    let mut num_bitplanes: Vec<u32> = match already_committed {
        Some(prev) if prev.len() == num_levels => prev.to_vec(),
        Some(_) => {
            return Err(Error::InvalidArgument(
                "already_committed length must match the number of levels".into(),
            ))
        }
        None => vec![0; num_levels],
    };

    let mut total_err_sq: f64 = err_sq.iter().flat_map(|v| v.iter()).sum();
    // Subtract whatever error the already-committed bitplanes already paid
    // off, so a second call starts from the right running total.
    for (level, &committed) in num_bitplanes.iter().enumerate() {
        for b in 0..committed as usize {
            total_err_sq -= err_sq[level].get(b).copied().unwrap_or(0.0);
        }
    }

    loop {
        if total_err_sq <= tolerance_sq {
            break;
        }
        let mut best: Option<(usize, f64)> = None; // (level, score)
        for level in 0..num_levels {
            let b = num_bitplanes[level] as usize;
            let Some(&size) = sizes[level].get(b) else { continue };
            let Some(&e) = err_sq[level].get(b) else { continue };
            if size == 0 {
                continue;
            }
            let score = e / size as f64;
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((level, score));
            }
        }
        let Some((level, _)) = best else { break }; // every bitplane committed
        let b = num_bitplanes[level] as usize;
        total_err_sq -= err_sq[level][b];
        num_bitplanes[level] += 1;
    }

    let retrieve_sizes = sizes
        .iter()
        .zip(&num_bitplanes)
        .map(|(level_sizes, &k)| level_sizes[..k as usize].iter().sum())
        .collect();

    Ok(RetrievalPlan { retrieve_sizes, num_bitplanes })
}
