//! Grouped bitplane encoder (spec §4.3), ported from the block-transposing
//! scheme in `GroupedBPEncoder.hpp`: samples are grouped into fixed-size
//! blocks, each block's magnitude bits are transposed into per-bitplane
//! words, and a block's leading all-zero bitplanes are elided entirely so a
//! retriever can stop reading a stream early without corrupting later
//! blocks' own leading-zero runs.
//!
//! Byte layout per produced stream matches the original's `T_stream = u32`
//! instantiation: each bitplane stream is a sequence of little-endian `u32`
//! group words (via `byteorder`), and bitplane 0's stream is prefixed with a
//! `u32` length followed by one `u8` "starting bitplane" per block.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::Error;

/// Samples per transposed group; mirrors the original's `T_stream = u32`
/// block size (32 samples per group, one bit of each per stream word).
pub const BLOCK_SIZE: usize = 32;

/// One level's bitplane-encoded byte streams, finest (most significant)
/// first. `streams[0]` carries the per-block starting-bitplane table.
pub struct EncodedBitplanes {
    pub streams: Vec<Vec<u8>>,
}

struct Block {
    magnitudes: Vec<u64>,
    sign_word: u32,
}

fn to_fixed_point(x: f64, exponent: i32, num_bitplanes: u32) -> (u64, bool) {
    let shifted = crate::float::ldexp(x, num_bitplanes as i32 - exponent);
    let fixed = shifted.trunc() as i64;
    let negative = x < 0.0;
    (fixed.unsigned_abs(), negative)
}

fn build_blocks(data: &[f64], exponent: i32, num_bitplanes: u32) -> Vec<Block> {
    data.chunks(BLOCK_SIZE)
        .map(|chunk| {
            let mut magnitudes = Vec::with_capacity(chunk.len());
            let mut sign_word = 0u32;
            for (i, &x) in chunk.iter().enumerate() {
                let (mag, neg) = to_fixed_point(x, exponent, num_bitplanes);
                magnitudes.push(mag);
                if neg {
                    sign_word |= 1 << i;
                }
            }
            Block { magnitudes, sign_word }
        })
        .collect()
}

/// Encode `data` (already shifted into the level's fixed-point domain by
/// `exponent`) into `num_bitplanes` progressive byte streams.
pub fn encode(data: &[f64], exponent: i32, num_bitplanes: u32) -> Result<EncodedBitplanes, Error> {
    if num_bitplanes == 0 {
        return Err(Error::InvalidArgument("num_bitplanes must be > 0".into()));
    }
    let blocks = build_blocks(data, exponent, num_bitplanes);
    let mut streams: Vec<Vec<u8>> = vec![Vec::new(); num_bitplanes as usize];
    let mut starting_bitplanes: Vec<u8> = Vec::with_capacity(blocks.len());

    for block in &blocks {
        let mut recorded = false;
        let mut starting_bitplane = num_bitplanes as u8;
        for k in (0..num_bitplanes).rev() {
            let bitplane_index = num_bitplanes - 1 - k;
            let mut bitplane_value: u32 = 0;
            for (i, &mag) in block.magnitudes.iter().enumerate() {
                bitplane_value |= (((mag >> k) & 1) as u32) << i;
            }
            if bitplane_value != 0 || recorded {
                if !recorded {
                    recorded = true;
                    starting_bitplane = bitplane_index as u8;
                    streams[bitplane_index as usize].extend_from_slice(&block.sign_word.to_le_bytes());
                }
                streams[bitplane_index as usize].extend_from_slice(&bitplane_value.to_le_bytes());
            }
        }
        starting_bitplanes.push(starting_bitplane);
    }

    // Merge the starting-bitplane table into stream 0, length-prefixed, the
    // same way `merge_arrays` prepends it ahead of bitplane 0's own words.
    let mut merged = Vec::with_capacity(4 + starting_bitplanes.len() + streams[0].len());
    let mut len_buf = [0u8; 4];
    LittleEndian::write_u32(&mut len_buf, starting_bitplanes.len() as u32);
    merged.extend_from_slice(&len_buf);
    merged.extend_from_slice(&starting_bitplanes);
    merged.extend_from_slice(&streams[0]);
    streams[0] = merged;

    Ok(EncodedBitplanes { streams })
}

/// Decode `n` samples back out of `streams`, using however many bitplanes
/// are actually present (`available_bitplanes` streams supplied) — fewer
/// than encode-time's `num_bitplanes` is the whole point, the progressive
/// retrieval path of spec §4.6/§4.9. As in the original, the scale used to
/// convert the recovered partial integer back to floating point is relative
/// to `available_bitplanes`, not the original encode-time total: the top
/// `available_bitplanes` magnitude bits of each sample are what streams hold,
/// and that is a self-consistent fixed-point representation on its own.
pub fn decode(
    streams: &[&[u8]],
    n: usize,
    exponent: i32,
    available_bitplanes: u32,
) -> Result<Vec<f64>, Error> {
    if available_bitplanes == 0 {
        return Ok(vec![0.0; n]);
    }
    if available_bitplanes as usize > streams.len() {
        return Err(Error::InvalidArgument(format!(
            "available_bitplanes {available_bitplanes} exceeds the {} streams supplied",
            streams.len()
        )));
    }
    if streams.is_empty() {
        return Err(Error::MalformedInput("no bitplane streams to decode".into()));
    }
    let stream0 = streams[0];
    if stream0.len() < 4 {
        return Err(Error::MalformedInput("bitplane stream 0 truncated".into()));
    }
    let table_len = LittleEndian::read_u32(&stream0[0..4]) as usize;
    if stream0.len() < 4 + table_len {
        return Err(Error::MalformedInput("starting-bitplane table truncated".into()));
    }
    let starting_bitplanes = &stream0[4..4 + table_len];
    let mut cursors: Vec<usize> = vec![0; streams.len()];
    cursors[0] = 4 + table_len;

    let mut out = vec![0.0f64; n];
    let mut block_id = 0usize;
    let mut offset = 0usize;
    while offset < n {
        let block_len = (n - offset).min(BLOCK_SIZE);
        let starting_bitplane = *starting_bitplanes
            .get(block_id)
            .ok_or_else(|| Error::MalformedInput("starting-bitplane table too short".into()))?
            as u32;

        let mut magnitudes = vec![0u64; block_len];
        let mut sign_word = 0u32;
        if starting_bitplane < available_bitplanes {
            let m = available_bitplanes - starting_bitplane;
            let stream = streams.get(starting_bitplane as usize).ok_or_else(|| {
                Error::MalformedInput("missing bitplane stream referenced by starting-bitplane table".into())
            })?;
            let cursor = &mut cursors[starting_bitplane as usize];
            sign_word = read_u32(stream, cursor)?;
            for k in (0..m).rev() {
                let bitplane_index = starting_bitplane + (m - 1 - k);
                let stream = streams.get(bitplane_index as usize).ok_or_else(|| {
                    Error::MalformedInput("missing bitplane stream".into())
                })?;
                let cursor = &mut cursors[bitplane_index as usize];
                let bitplane_value = read_u32(stream, cursor)?;
                for (i, mag) in magnitudes.iter_mut().enumerate() {
                    *mag |= (((bitplane_value >> i) & 1) as u64) << k;
                }
            }
        }

        for (i, &mag) in magnitudes.iter().enumerate() {
            let val = crate::float::ldexp(mag as f64, exponent - available_bitplanes as i32);
            let signed = if (sign_word >> i) & 1 == 1 { -val } else { val };
            out[offset + i] = signed;
        }

        offset += block_len;
        block_id += 1;
    }

    Ok(out)
}

fn read_u32(stream: &[u8], cursor: &mut usize) -> Result<u32, Error> {
    if *cursor + 4 > stream.len() {
        return Err(Error::MalformedInput("bitplane stream truncated mid-block".into()));
    }
    let v = LittleEndian::read_u32(&stream[*cursor..*cursor + 4]);
    *cursor += 4;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_exactly_with_all_bitplanes() {
        let data: Vec<f64> = (0..77).map(|i| (i as f64 - 38.0) * 0.25).collect();
        let exponent = 7; // covers values up to ~64
        let num_bitplanes = 16;
        let enc = encode(&data, exponent, num_bitplanes).unwrap();
        let refs: Vec<&[u8]> = enc.streams.iter().map(|s| s.as_slice()).collect();
        let decoded = decode(&refs, data.len(), exponent, num_bitplanes).unwrap();
        for (a, b) in data.iter().zip(&decoded) {
            let quantum = crate::float::ldexp(1.0, exponent - num_bitplanes as i32);
            assert!((a - b).abs() <= quantum + 1e-9, "{a} vs {b}");
        }
    }

    #[test]
    fn zero_available_bitplanes_yields_all_zero() {
        let data = vec![1.0, -2.0, 3.5];
        let enc = encode(&data, 3, 8).unwrap();
        let refs: Vec<&[u8]> = enc.streams.iter().map(|s| s.as_slice()).collect();
        let decoded = decode(&refs, data.len(), 3, 0).unwrap();
        assert!(decoded.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn available_bitplanes_exceeding_supplied_streams_is_invalid_argument() {
        let data = vec![1.0, -2.0, 3.5];
        let enc = encode(&data, 3, 8).unwrap();
        let refs: Vec<&[u8]> = enc.streams.iter().map(|s| s.as_slice()).collect();
        let err = decode(&refs, data.len(), 3, 9).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn all_zero_block_emits_no_stream_bytes() {
        let data = vec![0.0; BLOCK_SIZE];
        let enc = encode(&data, 1, 8).unwrap();
        // Every bitplane stream should be empty except stream 0's 4-byte
        // length prefix plus the 1-byte all-elided marker.
        assert_eq!(enc.streams[0].len(), 4 + 1);
        for s in &enc.streams[1..] {
            assert!(s.is_empty());
        }
    }

    #[test]
    fn more_bitplanes_retrieved_monotonically_reduces_error() {
        let data: Vec<f64> = (0..50).map(|i| (i as f64).sin() * 10.0).collect();
        let exponent = 5;
        let num_bitplanes = 20;
        let enc = encode(&data, exponent, num_bitplanes).unwrap();
        let refs: Vec<&[u8]> = enc.streams.iter().map(|s| s.as_slice()).collect();
        let mut prev_err = f64::INFINITY;
        for k in 1..=num_bitplanes {
            let decoded = decode(&refs, data.len(), exponent, k).unwrap();
            let err: f64 = data.iter().zip(&decoded).map(|(a, b)| (a - b).powi(2)).sum();
            assert!(err <= prev_err + 1e-12, "error increased at k={k}: {err} > {prev_err}");
            prev_err = err;
        }
    }
}
