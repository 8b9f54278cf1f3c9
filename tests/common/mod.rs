// Shared fixtures for the driver integration tests: a deterministic
// reference generator and a scripted seed finder standing in for the
// upstream index.
#![allow(dead_code)]

use std::collections::HashMap;
use strobemap::{Nam, References, SeedFinder};

pub const K: usize = 20;

/// Route driver logging through the test harness (RUST_LOG to enable)
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Deterministic pseudo-random reference background
pub fn background(len: usize, seed: u32) -> Vec<u8> {
    let bases = b"ACGT";
    let mut state = seed;
    let mut seq = Vec::with_capacity(len);
    while seq.len() < len {
        state = state.wrapping_mul(1103515245).wrapping_add(12345);
        seq.push(bases[(state >> 16) as usize % 4]);
    }
    seq
}

/// Overwrite `reference[pos..]` with `segment`
pub fn plant(reference: &mut [u8], pos: usize, segment: &[u8]) {
    reference[pos..pos + segment.len()].copy_from_slice(segment);
}

pub fn single_contig(sequence: Vec<u8>) -> References {
    References::new(vec![("chr1".to_string(), sequence)])
}

/// A seed covering the whole read at `ref_start`
pub fn full_read_nam(
    nam_id: usize,
    ref_start: usize,
    read_len: usize,
    n_hits: usize,
    is_rc: bool,
) -> Nam {
    Nam {
        nam_id,
        ref_id: 0,
        ref_start,
        ref_end: ref_start + read_len,
        query_start: 0,
        query_end: read_len,
        n_hits,
        score: n_hits as f32 * 10.0,
        is_rc,
    }
}

/// Scripted seed producer: seeds are looked up by read sequence. Reads
/// without an entry get a clean nonrepetitive fraction and no seeds.
pub struct TestSeedFinder {
    k: usize,
    seeds: HashMap<Vec<u8>, (f32, Vec<Nam>)>,
    rescue_seeds: HashMap<Vec<u8>, Vec<Nam>>,
}

impl TestSeedFinder {
    pub fn new(k: usize) -> Self {
        TestSeedFinder {
            k,
            seeds: HashMap::new(),
            rescue_seeds: HashMap::new(),
        }
    }

    pub fn with_seeds(mut self, seq: &[u8], nonrepetitive_fraction: f32, nams: Vec<Nam>) -> Self {
        self.seeds.insert(seq.to_vec(), (nonrepetitive_fraction, nams));
        self
    }

    pub fn with_rescue_seeds(mut self, seq: &[u8], nams: Vec<Nam>) -> Self {
        self.rescue_seeds.insert(seq.to_vec(), nams);
        self
    }
}

impl SeedFinder for TestSeedFinder {
    fn find_seeds(&self, seq: &[u8]) -> (f32, Vec<Nam>) {
        self.seeds
            .get(seq)
            .cloned()
            .unwrap_or((1.0, Vec::new()))
    }

    fn find_seeds_rescue(&self, seq: &[u8], _rescue_cutoff: usize) -> Vec<Nam> {
        self.rescue_seeds.get(seq).cloned().unwrap_or_default()
    }

    fn k(&self) -> usize {
        self.k
    }
}

/// Field accessor for one tab-separated SAM line
pub fn sam_fields(line: &str) -> Vec<&str> {
    line.split('\t').collect()
}
