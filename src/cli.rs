//! Command-line surface (spec §6): `refactor` and `reconstruct` subcommands,
//! built with `clap` derive the same way the teacher's CLI would have been
//! had it grown one (the teacher itself hardcodes its one fixed image in
//! `main`; this crate's shape instead follows `clap`'s derive idiom used
//! elsewhere in the broader example pack).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "mref", about = "Multilevel progressive refactor/reconstruct for scientific arrays")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding (or to hold) the metadata blob and level component
    /// files. Defaults to the current directory.
    #[arg(long, global = true, default_value = ".")]
    pub dir: PathBuf,

    /// Use the chunking writer/retriever instead of one-file-per-level.
    #[arg(long, global = true)]
    pub chunked: bool,

    /// Minimum object size in bytes for the chunking writer.
    #[arg(long, global = true, default_value_t = 4096)]
    pub min_object_size: u32,

    /// Use the orthogonal (predict+update) decomposer instead of the
    /// default hierarchical (predict-only) one.
    #[arg(long, global = true)]
    pub orthogonal: bool,

    /// Use the space-filling-curve interleaver instead of the default
    /// row-major one.
    #[arg(long, global = true)]
    pub sfc: bool,

    /// Treat samples as float64 instead of the default float32.
    #[arg(long, global = true)]
    pub f64: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Refactor a raw binary array into progressive bitplane streams.
    Refactor {
        input_file: PathBuf,
        target_level: u8,
        num_bitplanes: u32,
        num_dims: usize,
        #[arg(num_args = 1..=3)]
        dims: Vec<u32>,
    },
    /// Reconstruct an array from a previously refactored directory.
    Reconstruct { tolerance: f64 },
}
