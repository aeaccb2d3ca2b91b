//! Lossless post-compression over an already bitplane-encoded byte stream
//! (spec §4.4), grounded on the teacher's `flate2`-free byte-writer style
//! (`util.rs`'s `write_be_bytes`) generalized to a real DEFLATE pass via the
//! `flate2` crate, the corpus's idiomatic way of reaching for DEFLATE
//! (`other_examples`'s `flate2`/`stream.rs` usage).

use std::io::{Read, Write};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::error::Error;

/// One stream's lossless-codec outcome: either it shrank and `compressed`
/// holds the DEFLATE output, or it didn't and the original bytes are kept
/// verbatim (spec §4.4: "never store larger than the input").
pub enum CodecOutput {
    Deflated(Vec<u8>),
    Stored(Vec<u8>),
}

impl CodecOutput {
    pub fn tag(&self) -> u8 {
        match self {
            CodecOutput::Deflated(_) => 1,
            CodecOutput::Stored(_) => 0,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            CodecOutput::Deflated(b) => b,
            CodecOutput::Stored(b) => b,
        }
    }
}

pub trait LevelCodec {
    fn encode(&self, raw: &[u8]) -> Result<CodecOutput, Error>;
    fn decode(&self, tag: u8, bytes: &[u8]) -> Result<Vec<u8>, Error>;
}

/// DEFLATE via `flate2`, falling back to storing the input verbatim when
/// compression doesn't actually shrink it.
pub struct DeflateCodec {
    pub level: Compression,
}

impl Default for DeflateCodec {
    fn default() -> Self {
        Self { level: Compression::default() }
    }
}

impl LevelCodec for DeflateCodec {
    fn encode(&self, raw: &[u8]) -> Result<CodecOutput, Error> {
        let mut encoder = DeflateEncoder::new(Vec::new(), self.level);
        encoder
            .write_all(raw)
            .map_err(|e| Error::CodecFailure(e.to_string()))?;
        let compressed = encoder.finish().map_err(|e| Error::CodecFailure(e.to_string()))?;
        if compressed.len() < raw.len() {
            Ok(CodecOutput::Deflated(compressed))
        } else {
            Ok(CodecOutput::Stored(raw.to_vec()))
        }
    }

    fn decode(&self, tag: u8, bytes: &[u8]) -> Result<Vec<u8>, Error> {
        match tag {
            0 => Ok(bytes.to_vec()),
            1 => {
                let mut decoder = DeflateDecoder::new(bytes);
                let mut out = Vec::new();
                decoder
                    .read_to_end(&mut out)
                    .map_err(|e| Error::CodecFailure(e.to_string()))?;
                Ok(out)
            }
            other => Err(Error::MalformedInput(format!("unknown codec tag {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compressible_data_round_trips_through_deflate() {
        let raw = vec![0u8; 4096];
        let codec = DeflateCodec::default();
        let out = codec.encode(&raw).unwrap();
        assert_eq!(out.tag(), 1);
        assert!(out.bytes().len() < raw.len());
        let back = codec.decode(out.tag(), out.bytes()).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn incompressible_data_falls_back_to_stored() {
        let raw: Vec<u8> = (0..64u32).map(|i| (i.wrapping_mul(2654435761) >> 24) as u8).collect();
        let codec = DeflateCodec::default();
        let out = codec.encode(&raw).unwrap();
        let back = codec.decode(out.tag(), out.bytes()).unwrap();
        assert_eq!(back, raw);
    }
}
