//! Reconstruct orchestrator (spec §4.9): given a tolerance and a metadata
//! blob, ask the size interpreter how many bitplanes of each level to
//! retrieve, pull those bytes through a retriever, decode and scatter them
//! back into a working array, and invoke `recompose`. Grounded on
//! `ComposedReconstructor.hpp`'s `reconstruct()` method shape.

use crate::array::Array;
use crate::bitplane;
use crate::decompose::Decomposer;
use crate::dims::level_dims;
use crate::error::Error;
use crate::float::{level_exponent, FloatWord};
use crate::interleave::Interleaver;
use crate::lossless::{DeflateCodec, LevelCodec};
use crate::metadata::Metadata;
use crate::retriever::LevelRetriever;
use crate::size_interpreter::{interpret_retrieve_size, RetrievalPlan};

pub struct ReconstructOutput<F> {
    pub array: Array<F>,
    pub effective_target_level: u8,
    pub plan: RetrievalPlan,
}

/// Run one progressive reconstruction pass against `tolerance`.
///
/// `already_committed`, if given, is the `num_bitplanes` a prior call at a
/// looser tolerance already retrieved — pass it so the size interpreter only
/// ever adds bitplanes (spec §4.6) and `offsets` only advances by the
/// incremental bytes (spec §4.7/§4.9 scenario 6).
pub fn reconstruct<F>(
    metadata: &Metadata,
    tolerance: f64,
    offsets: &mut [u32],
    already_committed: Option<&[u32]>,
    retriever: &mut dyn LevelRetriever,
    decomposer: &dyn Decomposer<F>,
    interleaver: &dyn Interleaver<F>,
) -> Result<ReconstructOutput<F>, Error>
where
    F: FloatWord + bytemuck::Zeroable,
{
    let target_level = (metadata.num_levels() - 1) as u8;
    let dims = crate::array::Dims::new(&metadata.dims)?;
    let levels = level_dims(dims, target_level);

    // Step 2.
    let plan = interpret_retrieve_size(
        &metadata.stream_sizes,
        &metadata.sq_errors,
        tolerance * tolerance,
        already_committed,
    )?;

    // Step 3.
    let level_buffers = retriever.retrieve_level_components(offsets, &plan.retrieve_sizes)?;

    let codec = DeflateCodec::default();
    let mut arr = Array::<F>::zeroed(dims);

    // Step 5: largest contiguous (from level 0) prefix with any bitplanes.
    let mut effective_target_level: u8 = 0;
    for level in 0..=target_level {
        if plan.num_bitplanes[level as usize] > 0 {
            effective_target_level = level;
        } else {
            break;
        }
    }

    // Steps 4 & 6.
    for level in 0..=effective_target_level {
        let level = level as usize;
        let k = plan.num_bitplanes[level];
        if k == 0 {
            continue;
        }
        let buf = &level_buffers[level];
        let sizes = &metadata.stream_sizes[level];
        let stop = metadata.stopping_index[level] as u32;

        // Split the concatenated buffer into its `k` bitplane streams, then
        // decompress the prefix `[0, stop)` as needed (spec §4.9 step 6).
        let mut cursor = 0usize;
        let mut decoded_streams: Vec<Vec<u8>> = Vec::with_capacity(k as usize);
        for b in 0..k {
            let size = sizes[b as usize] as usize;
            if cursor + size > buf.len() {
                return Err(Error::MalformedInput(format!(
                    "level {level} retrieved buffer shorter than its declared bitplane sizes"
                )));
            }
            let raw = &buf[cursor..cursor + size];
            cursor += size;
            let decoded = if b < stop {
                codec.decode(1, raw)?
            } else {
                codec.decode(0, raw)?
            };
            decoded_streams.push(decoded);
        }
        let refs: Vec<&[u8]> = decoded_streams.iter().map(|s| s.as_slice()).collect();

        let dims_level = levels[level];
        let dims_prev = if level == 0 { None } else { Some(levels[level - 1]) };
        let shell_len = dims_level.num_elements() - dims_prev.map(|d| d.num_elements()).unwrap_or(0);
        let e = level_exponent(metadata.error_bounds[level]);
        let shell_f64 = bitplane::decode(&refs, shell_len, e, k)?;
        let shell: Vec<F> = shell_f64.into_iter().map(F::from_f64).collect();
        interleaver.reposition(&shell, dims, dims_level, dims_prev, arr.as_mut_slice());
    }

    // Step 7.
    decomposer.recompose(&mut arr, effective_target_level)?;

    Ok(ReconstructOutput { array: arr, effective_target_level, plan })
}
