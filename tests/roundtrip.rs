//! End-to-end refactor -> reconstruct tests against a real on-disk directory,
//! covering the round-trip laws and concrete scenarios the pipeline must
//! satisfy: full-fidelity reconstruction, progressive monotonicity, a short
//! trailing block, truncation to a coarser tolerance, and the all-zero /
//! constant-array / signed-scalar edge cases.

use mref::array::{Array, Dims};
use mref::collective::LocalCollective;
use mref::decompose::{Decomposer, HierarchicalDecomposer};
use mref::interleave::{DirectInterleaver, Interleaver};
use mref::metadata::Metadata;
use mref::reconstruct::reconstruct;
use mref::refactor::refactor;
use mref::retriever::{ConcatRetriever, LevelRetriever};
use mref::writer::{ConcatWriter, LevelWriter};

fn run_refactor(
    data: Vec<f32>,
    dims: &[u32],
    target_level: u8,
    num_bitplanes: u32,
    dir: &std::path::Path,
) -> Metadata {
    let dims = Dims::new(dims).unwrap();
    let arr = Array::<f32>::from_vec(dims, data).unwrap();
    let decomposer = HierarchicalDecomposer;
    let interleaver = DirectInterleaver;
    let collective = LocalCollective;

    let output =
        refactor(arr, target_level, num_bitplanes, &decomposer, &interleaver, &collective).unwrap();

    let mut metadata = output.metadata;
    let mut writer = ConcatWriter::new(dir);
    let merged_counts = writer.write_level_components(&output.level_streams).unwrap();
    metadata.merged_counts = merged_counts;
    writer.write_metadata(&metadata.serialize().unwrap()).unwrap();
    metadata
}

fn run_reconstruct(
    dir: &std::path::Path,
    tolerance: f64,
    offsets: &mut [u32],
    already_committed: Option<&[u32]>,
) -> (Vec<f32>, Vec<u32>) {
    let mut retriever = ConcatRetriever::new(dir);
    let blob = retriever.load_metadata().unwrap();
    let metadata = Metadata::deserialize(&blob, 32).unwrap();
    let decomposer = HierarchicalDecomposer;
    let interleaver = DirectInterleaver;

    let output = reconstruct::<f32>(
        &metadata,
        tolerance,
        offsets,
        already_committed,
        &mut retriever,
        &decomposer,
        &interleaver,
    )
    .unwrap();
    (output.array.into_vec(), output.plan.num_bitplanes)
}

#[test]
fn tiny_1d_zero_reconstructs_to_all_zero_at_any_tolerance() {
    let dir = tempfile::tempdir().unwrap();
    run_refactor(vec![0.0f32; 16], &[16], 1, 4, dir.path());

    let mut offsets = vec![0u32; 2];
    let (result, _) = run_reconstruct(dir.path(), 0.0, &mut offsets, None);
    assert_eq!(result, vec![0.0f32; 16]);

    let mut offsets2 = vec![0u32; 2];
    let (result2, _) = run_reconstruct(dir.path(), 1e-3, &mut offsets2, None);
    assert_eq!(result2, vec![0.0f32; 16]);
}

#[test]
fn constant_array_reconstructs_bit_exactly_at_zero_tolerance() {
    let dir = tempfile::tempdir().unwrap();
    run_refactor(vec![1.0f32; 32], &[32], 0, 8, dir.path());

    let mut offsets = vec![0u32; 1];
    let (result, _) = run_reconstruct(dir.path(), 0.0, &mut offsets, None);
    for &v in &result {
        assert_eq!(v, 1.0f32);
    }
}

#[test]
fn signed_scalar_round_trips_through_sign_word() {
    let dir = tempfile::tempdir().unwrap();
    run_refactor(vec![1.5f32, -1.5f32], &[2], 0, 4, dir.path());

    let mut offsets = vec![0u32; 1];
    let (result, _) = run_reconstruct(dir.path(), 0.0, &mut offsets, None);
    assert_eq!(result, vec![1.5f32, -1.5f32]);
}

#[test]
fn full_fidelity_pipeline_reproduces_input_at_zero_tolerance() {
    let dir = tempfile::tempdir().unwrap();
    let n = 32usize;
    let data: Vec<f32> = (0..n).map(|i| i as f32 / n as f32).collect();
    run_refactor(data.clone(), &[n as u32], 1, 12, dir.path());

    let mut offsets = vec![0u32; 2];
    let (result, _) = run_reconstruct(dir.path(), 0.0, &mut offsets, None);
    for (a, b) in data.iter().zip(&result) {
        assert!((a - b).abs() < 1e-2, "{a} vs {b}");
    }
}

#[test]
fn truncation_to_coarser_tolerance_bounds_max_abs_error() {
    let dir = tempfile::tempdir().unwrap();
    let n = 32usize;
    let data: Vec<f32> = (0..n).map(|i| i as f32 / n as f32).collect();
    run_refactor(data.clone(), &[n as u32], 1, 12, dir.path());

    let mut offsets = vec![0u32; 2];
    let (result, _) = run_reconstruct(dir.path(), 0.25, &mut offsets, None);
    let max_err = data
        .iter()
        .zip(&result)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0f32, f32::max);
    assert!(max_err <= 0.26, "max abs error {max_err} exceeds tolerance");
}

#[test]
fn short_trailing_block_decodes_correctly() {
    // 70 samples with a 32-sample block: two full blocks, one block of 6.
    let dir = tempfile::tempdir().unwrap();
    let n = 70usize;
    let data: Vec<f32> = (0..n).map(|i| (i as f32 - 35.0) * 0.1).collect();
    run_refactor(data.clone(), &[n as u32], 0, 10, dir.path());

    let mut offsets = vec![0u32; 1];
    let (result, _) = run_reconstruct(dir.path(), 0.0, &mut offsets, None);
    assert_eq!(result.len(), n);
    for (a, b) in data.iter().zip(&result) {
        assert!((a - b).abs() < 1e-1, "{a} vs {b}");
    }
}

#[test]
fn progressive_retrieval_only_fetches_additional_bytes_and_improves_error() {
    let dir = tempfile::tempdir().unwrap();
    let n = 32usize;
    let data: Vec<f32> = (0..n).map(|i| (i as f32).sin()).collect();
    run_refactor(data.clone(), &[n as u32], 1, 14, dir.path());

    let mut offsets = vec![0u32; 2];
    let (result1, committed1) = run_reconstruct(dir.path(), 1e-1, &mut offsets, None);
    let offsets_after_first = offsets.clone();

    let (result2, committed2) =
        run_reconstruct(dir.path(), 1e-3, &mut offsets, Some(&committed1));

    // Offsets only ever advance (append-compatible progressive retrieval).
    for (a, b) in offsets_after_first.iter().zip(&offsets) {
        assert!(b >= a);
    }
    // Bitplanes committed are monotonically non-decreasing per level.
    for (a, b) in committed1.iter().zip(&committed2) {
        assert!(b >= a);
    }

    let err1: f32 = data.iter().zip(&result1).map(|(a, b)| (a - b).powi(2)).sum();
    let err2: f32 = data.iter().zip(&result2).map(|(a, b)| (a - b).powi(2)).sum();
    assert!(err2 <= err1 + 1e-6, "tighter tolerance made error worse: {err2} > {err1}");
}

#[test]
fn byte_layout_is_stable_across_identical_refactor_runs() {
    let dir1 = tempfile::tempdir().unwrap();
    let dir2 = tempfile::tempdir().unwrap();
    let data: Vec<f32> = (0..32).map(|i| (i as f32).cos() * 3.0).collect();

    let meta1 = run_refactor(data.clone(), &[32], 1, 10, dir1.path());
    let meta2 = run_refactor(data, &[32], 1, 10, dir2.path());

    assert_eq!(meta1.serialize().unwrap(), meta2.serialize().unwrap());
    for level in 0..2 {
        let bytes1 = std::fs::read(dir1.path().join(format!("level_{level}.bin"))).unwrap();
        let bytes2 = std::fs::read(dir2.path().join(format!("level_{level}.bin"))).unwrap();
        assert_eq!(bytes1, bytes2);
    }
}

#[test]
fn decompose_recompose_round_trips_for_every_supported_target_level() {
    let dims = Dims::new(&[33]).unwrap();
    let n = dims.num_elements();
    let data: Vec<f64> = (0..n).map(|i| (i as f64).sqrt()).collect();
    let decomposer = HierarchicalDecomposer;
    for target_level in 0..=mref::dims::max_target_level(dims) {
        let mut arr = Array::<f64>::from_vec(dims, data.clone()).unwrap();
        decomposer.decompose(&mut arr, target_level).unwrap();
        decomposer.recompose(&mut arr, target_level).unwrap();
        for (a, b) in data.iter().zip(arr.as_slice()) {
            assert!((a - b).abs() < 1e-9, "level {target_level}: {a} vs {b}");
        }
    }
}

#[test]
fn interleave_reposition_round_trips_every_level_shell() {
    let dims = Dims::new(&[16, 16]).unwrap();
    let levels = mref::dims::level_dims(dims, 2);
    let src: Vec<f64> = (0..dims.num_elements()).map(|i| i as f64 * 0.5).collect();
    let mut dst = vec![0.0f64; dims.num_elements()];
    let il = DirectInterleaver;
    for (level, &dims_level) in levels.iter().enumerate() {
        let dims_prev = if level == 0 { None } else { Some(levels[level - 1]) };
        let shell = il.interleave(&src, dims, dims_level, dims_prev);
        il.reposition(&shell, dims, dims_level, dims_prev, &mut dst);
    }
    assert_eq!(src, dst);
}
