//! End to end: fingerprint file -> reference catalog -> classification ->
//! events -> kinetics.

use ndarray::{s, Array3};
use soapify::adapters::{
    load_references, save_references, write_fingerprint_file, FingerprintHeader,
    FingerprintReader, FingerprintSource,
};
use soapify::ops::{
    build_references, calculate_residence_times, calculate_transition_matrix, classify,
    normalize_matrix, track_states,
};
use soapify::types::{merge_references, ReferenceAddress, SoapParams, SpeciesBlocks};
use soapify::ClassifierConfig;

/// Compressed fingerprints where atom `a` follows pattern `(a + frame / 4) % 3`.
fn synthetic(params: SoapParams, frames: usize, atoms: usize) -> Array3<f64> {
    let len = params.upper_block_len();
    Array3::from_shape_fn((frames, atoms, len), |(f, a, k)| {
        let pattern = (a + f / 4) % 3;
        if k % 3 == pattern {
            1.0 + 0.001 * (f % 4) as f64
        } else {
            0.05
        }
    })
}

#[test]
fn test_file_to_kinetics() {
    let dir = tempfile::tempdir().unwrap();
    let params = SoapParams::new(2, 3);
    let (frames, atoms) = (24, 5);
    let data = synthetic(params, frames, atoms);

    let traj_path = dir.path().join("fingerprints.soaptrj");
    let header = FingerprintHeader::new(frames, atoms, params.upper_block_len(), params);
    write_fingerprint_file(&traj_path, &header, data.view()).unwrap();

    let mut reader = FingerprintReader::open(&traj_path).unwrap();
    assert_eq!(reader.shape(), (frames, atoms, params.upper_block_len()));

    // atoms 0, 1, 2 start in patterns 0, 1, 2
    let first = build_references(
        &[ReferenceAddress::new("a", 0, 0), ReferenceAddress::new("b", 0, 1)],
        &mut reader,
        params,
        true,
    )
    .unwrap();
    let second =
        build_references(&[ReferenceAddress::new("c", 0, 2)], &mut reader, params, true).unwrap();
    let catalog = merge_references([&first, &second]).unwrap();
    assert_eq!(catalog.names(), &["a", "b", "c"]);

    let ref_path = dir.path().join("references.bin");
    save_references(&ref_path, &catalog).unwrap();
    let catalog = load_references(&ref_path).unwrap();

    let config = ClassifierConfig::default().with_chunk_size(5).with_normalize(true);
    let classification = classify(&mut reader, &catalog, &config).unwrap();
    assert_eq!(classification.num_frames(), frames);
    assert_eq!(classification.num_atoms(), atoms);
    for f in 0..frames {
        for a in 0..atoms {
            assert_eq!(classification.references()[[f, a]], (a + f / 4) % 3);
        }
    }

    let events = track_states(&classification);
    assert_eq!(events.len(), atoms);
    for atom_events in &events {
        // a state change every 4 frames
        assert_eq!(atom_events.len(), 6);
        let total: usize = atom_events.iter().map(|e| e.duration).sum();
        assert_eq!(total, frames - 1);
    }

    let direct = calculate_transition_matrix(&classification, 1, None).unwrap();
    let tracked = calculate_transition_matrix(&classification, 1, Some(events.as_slice())).unwrap();
    assert_eq!(direct, tracked);
    assert_eq!(direct.sum() as usize, atoms * (frames - 1));

    let probabilities = normalize_matrix(direct.view());
    for row in probabilities.rows() {
        assert!((row.sum() - 1.0).abs() < 1e-12);
    }

    let residence = calculate_residence_times(&classification, Some(events.as_slice())).unwrap();
    assert_eq!(residence, calculate_residence_times(&classification, None).unwrap());
    let all: Vec<i64> = residence.into_iter().flatten().collect();
    assert_eq!(all.iter().filter(|&&t| t < 0).count(), atoms);
    assert!(all.iter().all(|&t| t == 3 || t == 4 || t == -4));
}

#[test]
fn test_multi_species_file() {
    let dir = tempfile::tempdir().unwrap();
    let params = SoapParams::new(1, 2);
    let blocks = SpeciesBlocks::from_species(&["H", "O"], params, true);
    let len = blocks.compressed_len();
    let data = Array3::from_shape_fn((6, 3, len), |(f, a, k)| ((f + 2 * a + k) % 5) as f64 + 0.5);

    let path = dir.path().join("water.soaptrj");
    let header = FingerprintHeader::new(6, 3, len, params).with_species_blocks(blocks.clone());
    write_fingerprint_file(&path, &header, data.view()).unwrap();

    let mut reader = FingerprintReader::open(&path).unwrap();
    assert_eq!(reader.species_blocks(), Some(&blocks));
    let catalog = build_references(
        &[ReferenceAddress::new("x", 0, 0), ReferenceAddress::new("y", 5, 2)],
        &mut reader,
        params,
        false,
    )
    .unwrap();
    assert_eq!(catalog.fingerprint_len(), blocks.full_len(params));

    let classification = classify(&mut reader, &catalog, &ClassifierConfig::default()).unwrap();
    assert_eq!(classification.references()[[0, 0]], 0);
    assert_eq!(classification.references()[[5, 2]], 1);
    assert!(classification.distances()[[5, 2]] < 1e-6);
    assert_eq!(
        classification.references().slice(s![.., 0]).len(),
        classification.num_frames()
    );
}
