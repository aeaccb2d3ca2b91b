//! Container metadata blob (spec §6): a single little-endian binary
//! structure describing dims, levels, per-level error bounds, per-bitplane
//! squared errors and stream sizes, stopping indices, and (for a chunking
//! writer) merged-object counts. Flat field-by-field layout rather than the
//! teacher's nested ISOBMFF boxes (`isobmff.rs`) since the spec's layout has
//! no recursive structure to model — but the same "byteorder over a growable
//! `Vec<u8>`" idiom carries over directly.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::Error;

#[derive(Clone, Debug, PartialEq)]
pub struct Metadata {
    pub dims: Vec<u32>,
    /// One error bound `B_ℓ` per level, stored at `fixed_width` bits.
    pub error_bounds: Vec<f64>,
    pub fixed_width: u32,
    /// `sq_errors[level][bitplane]`.
    pub sq_errors: Vec<Vec<f64>>,
    /// `stream_sizes[level][bitplane]`.
    pub stream_sizes: Vec<Vec<u32>>,
    pub stopping_index: Vec<u8>,
    /// `merged_counts[level]`, empty per-level vecs for a non-chunking writer.
    pub merged_counts: Vec<Vec<u32>>,
}

impl Metadata {
    pub fn num_levels(&self) -> usize {
        self.error_bounds.len()
    }

    pub fn serialize(&self) -> Result<Vec<u8>, Error> {
        let mut buf = Vec::new();
        buf.write_u8(self.dims.len() as u8).map_err(io_err)?;
        for &d in &self.dims {
            buf.write_u32::<LittleEndian>(d).map_err(io_err)?;
        }
        buf.write_u8(self.num_levels() as u8).map_err(io_err)?;
        for &b in &self.error_bounds {
            match self.fixed_width {
                32 => buf.write_f32::<LittleEndian>(b as f32).map_err(io_err)?,
                64 => buf.write_f64::<LittleEndian>(b).map_err(io_err)?,
                other => return Err(Error::InvalidArgument(format!("unsupported fixed width {other}"))),
            }
        }
        for level_errs in &self.sq_errors {
            buf.write_u32::<LittleEndian>(level_errs.len() as u32).map_err(io_err)?;
            for &e in level_errs {
                buf.write_f64::<LittleEndian>(e).map_err(io_err)?;
            }
        }
        for level_sizes in &self.stream_sizes {
            buf.write_u32::<LittleEndian>(level_sizes.len() as u32).map_err(io_err)?;
            for &s in level_sizes {
                buf.write_u32::<LittleEndian>(s).map_err(io_err)?;
            }
        }
        for &s in &self.stopping_index {
            buf.write_u8(s).map_err(io_err)?;
        }
        for counts in &self.merged_counts {
            buf.write_u32::<LittleEndian>(counts.len() as u32).map_err(io_err)?;
            for &c in counts {
                buf.write_u32::<LittleEndian>(c).map_err(io_err)?;
            }
        }
        Ok(buf)
    }

    pub fn deserialize(bytes: &[u8], fixed_width: u32) -> Result<Self, Error> {
        let mut cur = Cursor::new(bytes);
        let num_dims = cur.read_u8().map_err(io_err)? as usize;
        let mut dims = Vec::with_capacity(num_dims);
        for _ in 0..num_dims {
            dims.push(cur.read_u32::<LittleEndian>().map_err(io_err)?);
        }
        let num_levels = cur.read_u8().map_err(io_err)? as usize;
        let mut error_bounds = Vec::with_capacity(num_levels);
        for _ in 0..num_levels {
            let b = match fixed_width {
                32 => cur.read_f32::<LittleEndian>().map_err(io_err)? as f64,
                64 => cur.read_f64::<LittleEndian>().map_err(io_err)?,
                other => return Err(Error::InvalidArgument(format!("unsupported fixed width {other}"))),
            };
            error_bounds.push(b);
        }
        let mut sq_errors = Vec::with_capacity(num_levels);
        for _ in 0..num_levels {
            let planes = cur.read_u32::<LittleEndian>().map_err(io_err)? as usize;
            let mut v = Vec::with_capacity(planes);
            for _ in 0..planes {
                v.push(cur.read_f64::<LittleEndian>().map_err(io_err)?);
            }
            sq_errors.push(v);
        }
        let mut stream_sizes = Vec::with_capacity(num_levels);
        for _ in 0..num_levels {
            let planes = cur.read_u32::<LittleEndian>().map_err(io_err)? as usize;
            let mut v = Vec::with_capacity(planes);
            for _ in 0..planes {
                v.push(cur.read_u32::<LittleEndian>().map_err(io_err)?);
            }
            stream_sizes.push(v);
        }
        let mut stopping_index = Vec::with_capacity(num_levels);
        for _ in 0..num_levels {
            stopping_index.push(cur.read_u8().map_err(io_err)?);
        }
        let mut merged_counts = Vec::with_capacity(num_levels);
        for _ in 0..num_levels {
            let count = cur.read_u32::<LittleEndian>().map_err(io_err)? as usize;
            let mut v = Vec::with_capacity(count);
            for _ in 0..count {
                v.push(cur.read_u32::<LittleEndian>().map_err(io_err)?);
            }
            merged_counts.push(v);
        }
        Ok(Self { dims, error_bounds, fixed_width, sq_errors, stream_sizes, stopping_index, merged_counts })
    }
}

fn io_err(e: std::io::Error) -> Error {
    Error::MalformedInput(format!("metadata blob truncated or malformed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Metadata {
        Metadata {
            dims: vec![8, 8],
            error_bounds: vec![1.0, 4.0],
            fixed_width: 32,
            sq_errors: vec![vec![16.0, 4.0], vec![1.0, 0.25, 0.0625]],
            stream_sizes: vec![vec![10, 20], vec![5, 6, 7]],
            stopping_index: vec![2, 3],
            merged_counts: vec![vec![], vec![1, 1, 1]],
        }
    }

    #[test]
    fn round_trips_through_bytes() {
        let m = sample();
        let bytes = m.serialize().unwrap();
        let back = Metadata::deserialize(&bytes, m.fixed_width).unwrap();
        assert_eq!(m, back);
    }

    #[test]
    fn truncated_blob_is_rejected() {
        let m = sample();
        let bytes = m.serialize().unwrap();
        let truncated = &bytes[..bytes.len() - 3];
        assert!(Metadata::deserialize(truncated, m.fixed_width).is_err());
    }
}
