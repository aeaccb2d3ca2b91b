//! Local-filesystem retriever variants (spec §4.7), the read-side mirror of
//! `writer.rs`. `retrieve_level_components` always hands back one
//! contiguous buffer per level regardless of whether the writer chunked
//! that level into multiple objects — chunk boundaries are an on-disk
//! storage detail, not something downstream decoding needs to see.

use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::Error;

pub trait LevelRetriever {
    fn load_metadata(&self) -> Result<Vec<u8>, Error>;

    /// Retrieve, per level, exactly `retrieve_sizes[level]` bytes starting
    /// at `offsets[level]`, then advance `offsets[level]` by that amount
    /// (spec §4.7's progressive-offset contract).
    fn retrieve_level_components(
        &mut self,
        offsets: &mut [u32],
        retrieve_sizes: &[u32],
    ) -> Result<Vec<Vec<u8>>, Error>;
}

fn read_range(path: &Path, offset: u64, len: usize) -> Result<Vec<u8>, Error> {
    let mut f = fs::File::open(path)?;
    f.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; len];
    f.read_exact(&mut buf)?;
    Ok(buf)
}

pub struct ConcatRetriever {
    dir: PathBuf,
}

impl ConcatRetriever {
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

impl LevelRetriever for ConcatRetriever {
    fn load_metadata(&self) -> Result<Vec<u8>, Error> {
        Ok(fs::read(self.metadata_path())?)
    }

    fn retrieve_level_components(
        &mut self,
        offsets: &mut [u32],
        retrieve_sizes: &[u32],
    ) -> Result<Vec<Vec<u8>>, Error> {
        let mut out = Vec::with_capacity(retrieve_sizes.len());
        for (level, &size) in retrieve_sizes.iter().enumerate() {
            let buf = read_range(&self.level_path(level), offsets[level] as u64, size as usize)?;
            offsets[level] += size;
            out.push(buf);
        }
        Ok(out)
    }
}

/// Reads back a level written across multiple chunked objects
/// (`ChunkingWriter`), stitching the requested byte range together across
/// whichever chunk files it spans.
pub struct ChunkingRetriever {
    dir: PathBuf,
    /// Byte size of each chunk object, per level, in write order —
    /// recovered from the files on disk at construction time.
    chunk_sizes: Vec<Vec<u64>>,
}

impl ChunkingRetriever {
    pub fn new(dir: impl Into<PathBuf>, num_levels: usize) -> Result<Self, Error> {
        let dir = dir.into();
        let mut chunk_sizes = Vec::with_capacity(num_levels);
        for level in 0..num_levels {
            let mut sizes = Vec::new();
            let mut chunk = 0usize;
            loop {
                let path = dir.join(format!("level_{level}_part_{chunk}.bin"));
                match fs::metadata(&path) {
                    Ok(meta) => {
                        sizes.push(meta.len());
                        chunk += 1;
                    }
                    Err(_) => break,
                }
            }
            chunk_sizes.push(sizes);
        }
        Ok(Self { dir, chunk_sizes })
    }

    fn chunk_path(&self, level: usize, chunk: usize) -> PathBuf {
        self.dir.join(format!("level_{level}_part_{chunk}.bin"))
    }
}

impl LevelRetriever for ChunkingRetriever {
    fn load_metadata(&self) -> Result<Vec<u8>, Error> {
        Ok(fs::read(self.dir.join("metadata.bin"))?)
    }

    fn retrieve_level_components(
        &mut self,
        offsets: &mut [u32],
        retrieve_sizes: &[u32],
    ) -> Result<Vec<Vec<u8>>, Error> {
        let mut out = Vec::with_capacity(retrieve_sizes.len());
        for (level, &size) in retrieve_sizes.iter().enumerate() {
            let mut remaining = size as u64;
            let mut global_pos = offsets[level] as u64;
            let mut buf = Vec::with_capacity(size as usize);
            for (chunk, &chunk_size) in self.chunk_sizes[level].iter().enumerate() {
                if remaining == 0 {
                    break;
                }
                if global_pos >= chunk_size {
                    global_pos -= chunk_size;
                    continue;
                }
                let take = remaining.min(chunk_size - global_pos);
                let piece = read_range(&self.chunk_path(level, chunk), global_pos, take as usize)?;
                buf.extend_from_slice(&piece);
                remaining -= take;
                global_pos = 0;
            }
            if remaining != 0 {
                return Err(Error::MalformedInput(format!(
                    "level {level} retrieval ran past its chunked objects"
                )));
            }
            offsets[level] += size;
            out.push(buf);
        }
        Ok(out)
    }
}
