// Batch runners
//
// Chunked parallel mapping over slices of input records. Each chunk is
// mapped on a rayon worker with its own output buffer, statistics and (for
// pairs) its own clone of the insert-size estimate, then the buffers are
// concatenated in input order: output is identical no matter how many
// workers ran.

use crate::aligner::Aligner;
use crate::details::MappingStatistics;
use crate::insert_size::InsertSizeDistribution;
use crate::mapper::{map_paired_end_read, map_single_end_read, MappingParameters};
use crate::nam::SeedFinder;
use crate::read::SequenceRecord;
use crate::reference::References;
use rayon::prelude::*;

/// Records per worker chunk
const CHUNK_SIZE: usize = 512;

/// Map a batch of single-end records; returns the concatenated output and
/// merged statistics.
pub fn map_single_end_batch(
    records: &[SequenceRecord],
    index: &(dyn SeedFinder + Sync),
    references: &References,
    aligner: &Aligner,
    map_param: &MappingParameters,
) -> (String, MappingStatistics) {
    let chunks: Vec<(String, MappingStatistics)> = records
        .par_chunks(CHUNK_SIZE)
        .map(|chunk| {
            let mut out = String::new();
            let mut statistics = MappingStatistics::default();
            for record in chunk {
                map_single_end_read(
                    record,
                    index,
                    references,
                    aligner,
                    map_param,
                    &mut statistics,
                    &mut out,
                );
            }
            (out, statistics)
        })
        .collect();

    merge_chunks(chunks)
}

/// Map a batch of record pairs. Every worker refines a private copy of the
/// passed-in insert-size estimate; the shared estimate itself is left
/// untouched so results do not depend on worker scheduling.
pub fn map_paired_end_batch(
    pairs: &[(SequenceRecord, SequenceRecord)],
    index: &(dyn SeedFinder + Sync),
    references: &References,
    aligner: &Aligner,
    map_param: &MappingParameters,
    isize_est: &InsertSizeDistribution,
) -> (String, MappingStatistics) {
    let chunks: Vec<(String, MappingStatistics)> = pairs
        .par_chunks(CHUNK_SIZE)
        .map(|chunk| {
            let mut out = String::new();
            let mut statistics = MappingStatistics::default();
            let mut isize_est = isize_est.clone();
            for (record1, record2) in chunk {
                map_paired_end_read(
                    record1,
                    record2,
                    index,
                    references,
                    aligner,
                    map_param,
                    &mut isize_est,
                    &mut statistics,
                    &mut out,
                );
            }
            (out, statistics)
        })
        .collect();

    merge_chunks(chunks)
}

fn merge_chunks(chunks: Vec<(String, MappingStatistics)>) -> (String, MappingStatistics) {
    let mut out = String::new();
    let mut statistics = MappingStatistics::default();
    for (chunk_out, chunk_stats) in chunks {
        out.push_str(&chunk_out);
        statistics += chunk_stats;
    }
    (out, statistics)
}
