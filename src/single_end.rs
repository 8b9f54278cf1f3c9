// Single-end driver
//
// Walks the seed list in score order under the dropoff/max-tries policy,
// extends each considered seed and tracks the best alignment together with
// the smallest score gap ever observed against it; that gap becomes the
// primary MAPQ. With secondaries enabled, all tried alignments within the
// secondary dropoff of the best are emitted after the primary.

use crate::aligner::Aligner;
use crate::details::Details;
use crate::extend::{extend_seed, reverse_nam_if_needed, Alignment};
use crate::nam::Nam;
use crate::read::{Read, SequenceRecord};
use crate::reference::References;
use crate::sam::Sam;

#[allow(clippy::too_many_arguments)]
pub fn align_single_end(
    aligner: &Aligner,
    sam: &mut Sam,
    nams: &mut [Nam],
    record: &SequenceRecord,
    k: usize,
    references: &References,
    details: &mut Details,
    dropoff_threshold: f32,
    max_tries: usize,
    max_secondary: usize,
) {
    if nams.is_empty() {
        sam.add_unmapped(record);
        return;
    }

    let read = Read::new(&record.seq);
    let mut alignments: Vec<Alignment> = Vec::new();
    let mut tries = 0;
    let n_max = nams[0];

    let mut best_edit_distance = usize::MAX;
    let mut best_score = -1000;

    let mut best_alignment = Alignment {
        score: -100_000,
        is_unaligned: true,
        ..Alignment::default()
    };
    let mut min_mapq_diff = i32::MAX;

    for nam in nams.iter_mut() {
        let score_dropoff = nam.n_hits as f32 / n_max.n_hits as f32;
        if tries >= max_tries
            || (tries > 1 && best_edit_distance == 0)
            || score_dropoff < dropoff_threshold
        {
            break;
        }
        let consistent_nam = reverse_nam_if_needed(nam, &read, references, k);
        details.nam_inconsistent += usize::from(!consistent_nam);
        let alignment = extend_seed(aligner, nam, references, &read, consistent_nam);
        details.tried_alignment += 1;
        details.gapped += usize::from(alignment.gapped);

        let diff_to_best = (best_score - alignment.score).abs();
        min_mapq_diff = min_mapq_diff.min(diff_to_best);

        if max_secondary > 0 {
            alignments.push(alignment.clone());
        }
        if alignment.score > best_score {
            // new distance to the next-best placement
            min_mapq_diff = (alignment.score - best_score).max(0);
            best_score = alignment.score;
            best_alignment = alignment;
            if max_secondary == 0 {
                best_edit_distance = best_alignment.global_ed;
            }
        }
        tries += 1;
    }

    if max_secondary == 0 {
        best_alignment.mapq = min_mapq_diff.min(60) as u8;
        sam.add(&best_alignment, record, read.rc(), true, details);
        return;
    }

    // Highest score first
    alignments.sort_by(|a, b| b.score.cmp(&a.score));

    let secondary_dropoff = 2 * aligner.scores.mismatch + aligner.scores.gap_open;
    let max_out = alignments.len().min(max_secondary + 1);
    for i in 0..max_out {
        let is_primary = i == 0;
        let alignment = &mut alignments[i];
        if best_score - alignment.score > secondary_dropoff {
            break;
        }
        alignment.mapq = if is_primary {
            min_mapq_diff.min(60) as u8
        } else {
            255
        };
        sam.add(alignment, record, read.rc(), is_primary, details);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cigar::CigarMode;
    use crate::read::SequenceRecord;

    const K: usize = 8;

    fn background(len: usize, seed: u32) -> Vec<u8> {
        let bases = b"ACGT";
        let mut state = seed;
        let mut seq = Vec::with_capacity(len);
        while seq.len() < len {
            state = state.wrapping_mul(1103515245).wrapping_add(12345);
            seq.push(bases[(state >> 16) as usize % 4]);
        }
        seq
    }

    fn nam_at(nam_id: usize, ref_start: usize, len: usize, n_hits: usize) -> Nam {
        Nam {
            nam_id,
            ref_id: 0,
            ref_start,
            ref_end: ref_start + len,
            query_start: 0,
            query_end: len,
            n_hits,
            score: n_hits as f32 * 10.0,
            is_rc: false,
        }
    }

    /// Extension attempts for a given parameter set, for the dropoff
    /// monotonicity law
    fn tries_with(dropoff_threshold: f32, max_tries: usize) -> usize {
        let read_seq = b"ACGGTTACCAGATTACAGGATCCATTTTAGCC";
        let mut reference = background(4000, 0x1234);
        // Three decreasingly similar copies
        reference[500..532].copy_from_slice(read_seq);
        reference[1500..1532].copy_from_slice(read_seq);
        reference[1500] ^= 6;
        reference[2500..2532].copy_from_slice(read_seq);
        reference[2500] ^= 6;
        reference[2510] ^= 6;
        let references = References::new(vec![("chr1".to_string(), reference)]);
        let record = SequenceRecord::new("read1", read_seq);
        let mut nams = vec![
            nam_at(0, 500, 32, 10),
            nam_at(1, 1500, 32, 6),
            nam_at(2, 2500, 32, 3),
        ];
        let mut out = String::new();
        let mut sam = Sam::new(&mut out, &references, CigarMode::M, false);
        let mut details = Details::default();
        align_single_end(
            &Aligner::default(),
            &mut sam,
            &mut nams,
            &record,
            K,
            &references,
            &mut details,
            dropoff_threshold,
            max_tries,
            0,
        );
        details.tried_alignment
    }

    #[test]
    fn raising_dropoff_never_increases_attempts() {
        let mut previous = usize::MAX;
        for dropoff in [0.0, 0.3, 0.5, 0.7, 1.0] {
            let tries = tries_with(dropoff, 20);
            assert!(tries <= previous, "dropoff={} tries={}", dropoff, tries);
            previous = tries;
        }
    }

    #[test]
    fn raising_max_tries_never_decreases_attempts() {
        let mut previous = 0;
        for max_tries in [1, 2, 3, 20] {
            let tries = tries_with(0.0, max_tries);
            assert!(tries >= previous, "max_tries={} tries={}", max_tries, tries);
            previous = tries;
        }
    }

    #[test]
    fn perfect_early_hit_stops_the_search() {
        // A zero-edit-distance best after more than one try ends the loop
        assert!(tries_with(0.0, 20) <= 3);
    }
}
