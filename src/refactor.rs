//! Refactor orchestrator (spec §4.8): composes decomposer, interleaver,
//! bitplane encoder, error collector, and lossless codec into the full
//! "array in, progressive byte streams + metadata out" pipeline. Grounded on
//! `ComposedRefactor.hpp`'s `refactor()` method shape.

use crate::array::Array;
use crate::bitplane;
use crate::collective::Collective;
use crate::decompose::Decomposer;
use crate::dims::{level_dims, validate_target_level};
use crate::error::Error;
use crate::error_collector::LevelErrorTable;
use crate::float::{level_exponent, FloatWord};
use crate::interleave::Interleaver;
use crate::lossless::{DeflateCodec, LevelCodec};
use crate::metadata::Metadata;

pub struct RefactorOutput {
    pub metadata: Metadata,
    /// `level_streams[level][bitplane]`. Bitplanes `[0, stopping_index[level])`
    /// hold DEFLATE output; `[stopping_index[level], K)` hold raw bytes —
    /// `metadata.stopping_index` is what tells a reconstructor which regime
    /// applies to which bitplane, so no per-stream tag byte is needed.
    pub level_streams: Vec<Vec<Vec<u8>>>,
}

/// Run the full refactor pipeline over `data`, producing `target_level + 1`
/// levels encoded with `num_bitplanes` bitplanes each.
pub fn refactor<F>(
    mut data: Array<F>,
    target_level: u8,
    num_bitplanes: u32,
    decomposer: &dyn Decomposer<F>,
    interleaver: &dyn Interleaver<F>,
    collective: &dyn Collective,
) -> Result<RefactorOutput, Error>
where
    F: FloatWord,
{
    let dims = data.dims();
    validate_target_level(dims, target_level)?;
    if num_bitplanes == 0 || num_bitplanes > F::FIXED_WIDTH {
        return Err(Error::InvalidArgument(format!(
            "num_bitplanes must be in 1..={}, got {num_bitplanes}",
            F::FIXED_WIDTH
        )));
    }

    decomposer.decompose(&mut data, target_level)?;

    let levels = level_dims(dims, target_level);
    let full = data.into_vec();

    // Step 3: interleave each level's shell, reduce its max-abs globally.
    let mut shells: Vec<Vec<f64>> = Vec::with_capacity(levels.len());
    let mut error_bounds = Vec::with_capacity(levels.len());
    for (level, &dims_level) in levels.iter().enumerate() {
        let dims_prev = if level == 0 { None } else { Some(levels[level - 1]) };
        let shell = interleaver.interleave(&full, dims, dims_level, dims_prev);
        let local_max = shell.iter().fold(0.0f64, |acc, v| acc.max(v.abs().to_f64()));
        let b_level = collective.all_reduce_max(local_max);
        error_bounds.push(b_level);
        shells.push(shell.iter().map(|v| v.to_f64()).collect());
    }

    // Step 4: per level, encode bitplanes, collect error contributions,
    // apply the lossless codec, and record the stopping index.
    let codec = DeflateCodec::default();
    let mut sq_errors = Vec::with_capacity(levels.len());
    let mut stream_sizes = Vec::with_capacity(levels.len());
    let mut stopping_index = Vec::with_capacity(levels.len());
    let mut level_streams = Vec::with_capacity(levels.len());

    for (level, shell) in shells.iter().enumerate() {
        let e = level_exponent(error_bounds[level]);
        let encoded = bitplane::encode(shell, e, num_bitplanes)?;
        let table = LevelErrorTable::build(shell.len(), e, num_bitplanes);

        let mut out_streams = Vec::with_capacity(encoded.streams.len());
        let mut sizes = Vec::with_capacity(encoded.streams.len());
        let mut stop = num_bitplanes as u8;
        let mut stop_found = false;
        for (b, raw) in encoded.streams.iter().enumerate() {
            if stop_found {
                sizes.push(raw.len() as u32);
                out_streams.push(raw.clone());
                continue;
            }
            let out = codec.encode(raw)?;
            if out.tag() == 0 {
                // First bitplane where compression didn't help: stop trying
                // from here on, this and every deeper bitplane is stored raw.
                stop = b as u8;
                stop_found = true;
                sizes.push(raw.len() as u32);
                out_streams.push(raw.clone());
            } else {
                sizes.push(out.bytes().len() as u32);
                out_streams.push(out.bytes().to_vec());
            }
        }

        sq_errors.push(table.per_bitplane_reductions());
        stream_sizes.push(sizes);
        stopping_index.push(stop);
        level_streams.push(out_streams);
    }

    let metadata = Metadata {
        dims: dims.as_slice().to_vec(),
        error_bounds,
        fixed_width: F::FIXED_WIDTH,
        sq_errors,
        stream_sizes,
        stopping_index,
        merged_counts: Vec::new(), // filled in by the chosen writer, if chunking
    };

    Ok(RefactorOutput { metadata, level_streams })
}
