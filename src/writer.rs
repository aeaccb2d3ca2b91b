//! Local-filesystem writer variants (spec §4.7), grounded on
//! `HPSSFileWriter.hpp`'s "concatenate, chunk once past a minimum object
//! size" policy, generalized from its tiered-store object semantics to
//! plain local files.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Error;

pub trait LevelWriter {
    fn write_metadata(&mut self, blob: &[u8]) -> Result<(), Error>;

    /// `level_streams[level]` holds that level's bitplane streams, index 0
    /// (most significant) first. Returns `merged_counts[level]`: how many
    /// bitplanes landed in each object written for that level (spec §4.7).
    fn write_level_components(&mut self, level_streams: &[Vec<Vec<u8>>]) -> Result<Vec<Vec<u32>>, Error>;
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), Error> {
    let mut f = fs::File::create(path)?;
    f.write_all(bytes)?;
    Ok(())
}

/// One file per level, the concatenation of that level's `K` bitplane
/// streams in order (spec §4.7's "concatenating writer").
pub struct ConcatWriter {
    dir: PathBuf,
}

impl ConcatWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn metadata_path(&self) -> PathBuf {
        self.dir.join("metadata.bin")
    }

    fn level_path(&self, level: usize) -> PathBuf {
        self.dir.join(format!("level_{level}.bin"))
    }
}

impl LevelWriter for ConcatWriter {
    fn write_metadata(&mut self, blob: &[u8]) -> Result<(), Error> {
        fs::create_dir_all(&self.dir)?;
        write_file(&self.metadata_path(), blob)
    }

    fn write_level_components(&mut self, level_streams: &[Vec<Vec<u8>>]) -> Result<Vec<Vec<u32>>, Error> {
        fs::create_dir_all(&self.dir)?;
        let mut merged_counts = Vec::with_capacity(level_streams.len());
        for (level, streams) in level_streams.iter().enumerate() {
            let mut concatenated = Vec::new();
            for s in streams {
                concatenated.extend_from_slice(s);
            }
            write_file(&self.level_path(level), &concatenated)?;
            // One object holds every bitplane: a single merged-count entry.
            merged_counts.push(vec![streams.len() as u32]);
        }
        Ok(merged_counts)
    }
}

/// Concatenates bitplane streams per level but splits across multiple
/// objects once a running total reaches `min_object_size` (spec §4.7's
/// "chunking writer"; object-count policy ported directly from
/// `HPSSFileWriter::write_level_components`).
pub struct ChunkingWriter {
    dir: PathBuf,
    min_object_size: u32,
}

impl ChunkingWriter {
    pub fn new(dir: impl Into<PathBuf>, min_object_size: u32) -> Self {
        Self { dir: dir.into(), min_object_size }
    }

    fn metadata_path(&self) -> PathBuf {
        self.dir.join("metadata.bin")
    }

    fn chunk_path(&self, level: usize, chunk: usize) -> PathBuf {
        self.dir.join(format!("level_{level}_part_{chunk}.bin"))
    }
}

impl LevelWriter for ChunkingWriter {
    fn write_metadata(&mut self, blob: &[u8]) -> Result<(), Error> {
        fs::create_dir_all(&self.dir)?;
        write_file(&self.metadata_path(), blob)
    }

    fn write_level_components(&mut self, level_streams: &[Vec<Vec<u8>>]) -> Result<Vec<Vec<u32>>, Error> {
        fs::create_dir_all(&self.dir)?;
        let mut level_merged_counts = Vec::with_capacity(level_streams.len());
        for (level, streams) in level_streams.iter().enumerate() {
            let mut merged_counts = Vec::new();
            let mut concated_size = 0u32;
            let mut prev_index = 0usize;
            let mut chunk = 0usize;
            for (j, s) in streams.iter().enumerate() {
                concated_size += s.len() as u32;
                let is_last = j == streams.len() - 1;
                if concated_size >= self.min_object_size || is_last {
                    let num_bitplanes = (j - prev_index + 1) as u32;
                    merged_counts.push(num_bitplanes);
                    let mut buf = Vec::with_capacity(concated_size as usize);
                    for k in prev_index..=j {
                        buf.extend_from_slice(&streams[k]);
                    }
                    write_file(&self.chunk_path(level, chunk), &buf)?;
                    chunk += 1;
                    concated_size = 0;
                    prev_index = j + 1;
                }
            }
            level_merged_counts.push(merged_counts);
        }
        Ok(level_merged_counts)
    }
}
