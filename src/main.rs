use std::fs;
use std::process::ExitCode;

use clap::Parser;

use mref::array::{Array, Dims};
use mref::cli::{Cli, Command};
use mref::collective::LocalCollective;
use mref::decompose::{Decomposer, HierarchicalDecomposer, OrthogonalDecomposer};
use mref::dims::max_target_level;
use mref::error::Error;
use mref::float::FloatWord;
use mref::interleave::{DirectInterleaver, Interleaver, SfcInterleaver};
use mref::metadata::Metadata;
use mref::reconstruct::reconstruct;
use mref::refactor::refactor;
use mref::retriever::{ChunkingRetriever, ConcatRetriever, LevelRetriever};
use mref::writer::{ChunkingWriter, ConcatWriter, LevelWriter};

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match &cli.command {
        Command::Refactor { input_file, target_level, num_bitplanes, num_dims, dims } => {
            run_refactor(&cli, input_file, *target_level, *num_bitplanes, *num_dims, dims)
        }
        Command::Reconstruct { tolerance } => run_reconstruct(&cli, *tolerance),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::from(exit_code_for(&e))
        }
    }
}

fn exit_code_for(e: &Error) -> u8 {
    match e {
        Error::InvalidArgument(_) => 2,
        Error::MalformedInput(_) => 3,
        Error::Io(_) => 4,
        Error::CodecFailure(_) => 5,
    }
}

fn run_refactor(
    cli: &Cli,
    input_file: &std::path::Path,
    target_level: u8,
    num_bitplanes: u32,
    num_dims: usize,
    dims_vec: &[u32],
) -> Result<(), Error> {
    if dims_vec.len() != num_dims {
        return Err(Error::InvalidArgument(format!(
            "expected {num_dims} dimension values, got {}",
            dims_vec.len()
        )));
    }
    let dims = Dims::new(dims_vec)?;
    let raw = fs::read(input_file)?;

    if cli.f64 {
        let data = read_array::<f64>(&raw, dims)?;
        run_refactor_typed(cli, data, target_level, num_bitplanes)
    } else {
        let data = read_array::<f32>(&raw, dims)?;
        run_refactor_typed(cli, data, target_level, num_bitplanes)
    }
}

fn read_array<F: FloatWord + bytemuck::Pod>(raw: &[u8], dims: Dims) -> Result<Array<F>, Error> {
    let n = dims.num_elements();
    let expected_bytes = n * std::mem::size_of::<F>();
    if raw.len() != expected_bytes {
        return Err(Error::InvalidArgument(format!(
            "input file has {} bytes, expected {expected_bytes} for {n} elements",
            raw.len()
        )));
    }
    let values: &[F] = bytemuck::cast_slice(raw);
    Array::from_vec(dims, values.to_vec())
}

fn run_refactor_typed<F: FloatWord + bytemuck::Pod>(
    cli: &Cli,
    data: Array<F>,
    target_level: u8,
    num_bitplanes: u32,
) -> Result<(), Error> {
    let dims = data.dims();
    let max_level = max_target_level(dims);
    if target_level > max_level {
        return Err(Error::InvalidArgument(format!(
            "target_level {target_level} exceeds the maximum of {max_level}"
        )));
    }

    let decomposer: Box<dyn Decomposer<F>> =
        if cli.orthogonal { Box::new(OrthogonalDecomposer) } else { Box::new(HierarchicalDecomposer) };
    let interleaver: Box<dyn Interleaver<F>> =
        if cli.sfc { Box::new(SfcInterleaver) } else { Box::new(DirectInterleaver) };
    let collective = LocalCollective;

    let output = refactor(data, target_level, num_bitplanes, decomposer.as_ref(), interleaver.as_ref(), &collective)?;

    let mut metadata = output.metadata;
    let merged_counts = if cli.chunked {
        let mut writer = ChunkingWriter::new(&cli.dir, cli.min_object_size);
        writer.write_level_components(&output.level_streams)?
    } else {
        let mut writer = ConcatWriter::new(&cli.dir);
        writer.write_level_components(&output.level_streams)?
    };
    metadata.merged_counts = merged_counts;

    // Metadata is written last since it embeds the merged-count table the
    // level-component write just produced.
    let blob = metadata.serialize()?;
    if cli.chunked {
        ChunkingWriter::new(&cli.dir, cli.min_object_size).write_metadata(&blob)?;
    } else {
        ConcatWriter::new(&cli.dir).write_metadata(&blob)?;
    }

    log::info!("refactored {} levels into {}", metadata.num_levels(), cli.dir.display());
    Ok(())
}

fn run_reconstruct(cli: &Cli, tolerance: f64) -> Result<(), Error> {
    if cli.f64 {
        run_reconstruct_typed::<f64>(cli, tolerance)
    } else {
        run_reconstruct_typed::<f32>(cli, tolerance)
    }
}

fn run_reconstruct_typed<F: FloatWord + bytemuck::Pod>(cli: &Cli, tolerance: f64) -> Result<(), Error> {
    let mut retriever: Box<dyn LevelRetriever> = if cli.chunked {
        // num_levels isn't known until metadata is loaded; peek it first.
        let probe = ConcatRetriever::new(&cli.dir);
        let blob = probe.load_metadata()?;
        let metadata = Metadata::deserialize(&blob, F::FIXED_WIDTH)?;
        Box::new(ChunkingRetriever::new(&cli.dir, metadata.num_levels())?)
    } else {
        Box::new(ConcatRetriever::new(&cli.dir))
    };

    let blob = retriever.load_metadata()?;
    let metadata = Metadata::deserialize(&blob, F::FIXED_WIDTH)?;

    let decomposer: Box<dyn Decomposer<F>> =
        if cli.orthogonal { Box::new(OrthogonalDecomposer) } else { Box::new(HierarchicalDecomposer) };
    let interleaver: Box<dyn Interleaver<F>> =
        if cli.sfc { Box::new(SfcInterleaver) } else { Box::new(DirectInterleaver) };

    let mut offsets = vec![0u32; metadata.num_levels()];
    let output = reconstruct::<F>(
        &metadata,
        tolerance,
        &mut offsets,
        None,
        retriever.as_mut(),
        decomposer.as_ref(),
        interleaver.as_ref(),
    )?;

    let out_path = cli.dir.join("reconstructed.bin");
    let bytes: &[u8] = bytemuck::cast_slice(output.array.as_slice());
    fs::write(&out_path, bytes)?;
    log::info!(
        "reconstructed to effective target level {} -> {}",
        output.effective_target_level,
        out_path.display()
    );
    Ok(())
}
