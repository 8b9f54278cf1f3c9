// Seed extension
//
// Turns one verified seed into a full read-vs-reference alignment. The
// orientation verifier first confirms (or flips) the strand by comparing
// the seed's flanking k-mers against the reference; extension then either
// takes the ungapped fast path (equal-length projection, Hamming rate
// below 5%) or hands a padded window to the affine-gap kernel.

use crate::aligner::{hamming_align, hamming_distance, Aligner};
use crate::cigar::Cigar;
use crate::nam::Nam;
use crate::read::Read;
use crate::reference::References;

/// Hamming fast path only when fewer than this fraction of bases mismatch
const HAMMING_RATE_LIMIT: f32 = 0.05;

/// One-sided reference padding for the gapped path
const GAP_EXTENSION_PADDING: usize = 50;

/// A base-level alignment of one read
#[derive(Debug, Clone, Default)]
pub struct Alignment {
    pub cigar: Cigar,
    pub edit_distance: usize,
    /// Edit distance plus soft-clipped query bases
    pub global_ed: usize,
    pub score: i32,
    pub ref_id: usize,
    pub ref_start: usize,
    /// Span on the reference
    pub length: usize,
    pub is_rc: bool,
    pub is_unaligned: bool,
    /// Whether the gapped kernel produced this alignment (the result can
    /// still be gap-free)
    pub gapped: bool,
    pub mapq: u8,
}

/*
 * Determine whether the seed matches the forward or reverse-complemented
 * read by checking in which orientation its first and last k-mer match.
 *
 * - If both flanks match in the recorded orientation, return true.
 * - If both flanks match in the opposite orientation, flip the seed in
 *   place (strand bit and query span) and return true.
 * - Otherwise return false; the caller records the inconsistency but still
 *   attempts a gapped alignment.
 */
pub fn reverse_nam_if_needed(nam: &mut Nam, read: &Read, references: &References, k: usize) -> bool {
    let ref_seq = references.sequence(nam.ref_id);
    if nam.ref_span() < k
        || nam.query_span() < k
        || nam.ref_end > ref_seq.len()
        || nam.query_end > read.len()
    {
        // Malformed span; treat as inconsistent rather than reading out of bounds
        return false;
    }
    let ref_start_kmer = &ref_seq[nam.ref_start..nam.ref_start + k];
    let ref_end_kmer = &ref_seq[nam.ref_end - k..nam.ref_end];

    let (seq, seq_rc) = if nam.is_rc {
        (read.rc(), read.seq())
    } else {
        (read.seq(), read.rc())
    };
    let read_start_kmer = &seq[nam.query_start..nam.query_start + k];
    let read_end_kmer = &seq[nam.query_end - k..nam.query_end];
    if ref_start_kmer == read_start_kmer && ref_end_kmer == read_end_kmer {
        return true;
    }

    // Symmetrical hash values allow false forward and false reverse hits;
    // retry with the coordinates mapped onto the opposite strand
    let q_start_tmp = read.len() - nam.query_end;
    let q_end_tmp = read.len() - nam.query_start;
    let read_start_kmer = &seq_rc[q_start_tmp..q_start_tmp + k];
    let read_end_kmer = &seq_rc[q_end_tmp - k..q_end_tmp];
    if ref_start_kmer == read_start_kmer && ref_end_kmer == read_end_kmer {
        nam.is_rc = !nam.is_rc;
        nam.query_start = q_start_tmp;
        nam.query_end = q_end_tmp;
        return true;
    }
    false
}

/*
 * Extend a seed so that the alignment covers the entire read.
 *
 * The seed is projected onto the reference coordinates that would place the
 * whole read; when the projection has exactly the read's length and the
 * seed orientation was consistent, a sub-5% Hamming comparison settles the
 * alignment without invoking the gapped kernel.
 */
pub fn extend_seed(
    aligner: &Aligner,
    nam: &Nam,
    references: &References,
    read: &Read,
    consistent_nam: bool,
) -> Alignment {
    let query = if nam.is_rc { read.rc() } else { read.seq() };
    let ref_seq = references.sequence(nam.ref_id);

    let projected_ref_start = nam.ref_start.saturating_sub(nam.query_start);
    let projected_ref_end = (nam.ref_end + query.len() - nam.query_end).min(ref_seq.len());

    let mut fast_path = None;
    if projected_ref_end - projected_ref_start == query.len() && consistent_nam {
        let ref_segment = &ref_seq[projected_ref_start..projected_ref_end];
        if let Some(dist) = hamming_distance(query, ref_segment) {
            if (dist as f32 / query.len() as f32) < HAMMING_RATE_LIMIT {
                fast_path = hamming_align(
                    query,
                    ref_segment,
                    aligner.scores.match_,
                    aligner.scores.mismatch,
                    aligner.scores.end_bonus,
                );
            }
        }
    }
    let (info, result_ref_start, gapped) = match fast_path {
        Some(info) => {
            let result_ref_start = projected_ref_start + info.ref_start;
            (info, result_ref_start, false)
        }
        None => {
            let diff = nam.ref_span().abs_diff(nam.query_span());
            let ext_left = GAP_EXTENSION_PADDING.min(projected_ref_start);
            let window_start = projected_ref_start - ext_left;
            let ext_right = GAP_EXTENSION_PADDING.min(ref_seq.len().saturating_sub(nam.ref_end));
            let window_size = read.len() + diff + ext_left + ext_right;
            let window_end = (window_start + window_size).min(ref_seq.len());
            let info = aligner.align(query, &ref_seq[window_start..window_end]);
            let result_ref_start = window_start + info.ref_start;
            (info, result_ref_start, true)
        }
    };

    let softclipped = info.query_start + (query.len() - info.query_end);
    Alignment {
        global_ed: info.edit_distance + softclipped,
        edit_distance: info.edit_distance,
        score: info.score,
        ref_id: nam.ref_id,
        ref_start: result_ref_start,
        length: info.ref_span(),
        is_rc: nam.is_rc,
        is_unaligned: info.cigar.is_empty(),
        gapped,
        mapq: 0,
        cigar: info.cigar,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read::reverse_complement;

    const K: usize = 8;

    fn reference_with(insert: &[u8], at: usize, len: usize) -> References {
        // Deterministic low-complexity-free background
        let mut seq = Vec::with_capacity(len);
        let bases = b"ACGT";
        let mut state = 0x9e37u32;
        while seq.len() < len {
            state = state.wrapping_mul(1103515245).wrapping_add(12345);
            seq.push(bases[(state >> 16) as usize % 4]);
        }
        seq[at..at + insert.len()].copy_from_slice(insert);
        References::new(vec![("chr1".to_string(), seq)])
    }

    fn forward_nam(read_len: usize) -> Nam {
        Nam {
            nam_id: 0,
            ref_id: 0,
            ref_start: 100,
            ref_end: 100 + read_len,
            query_start: 0,
            query_end: read_len,
            n_hits: 5,
            score: 50.0,
            is_rc: false,
        }
    }

    #[test]
    fn consistent_forward_nam_is_accepted_unchanged() {
        let read_seq = b"ACGGTTACCAGATTACAGGATCCATTTTAGCC";
        let references = reference_with(read_seq, 100, 400);
        let read = Read::new(read_seq);
        let mut nam = forward_nam(read_seq.len());
        let before = nam;
        assert!(reverse_nam_if_needed(&mut nam, &read, &references, K));
        assert_eq!(nam, before);
    }

    #[test]
    fn false_strand_nam_is_flipped_in_place() {
        let segment = b"ACGGTTACCAGATTACAGGATCCATTTTAGCC";
        let references = reference_with(segment, 100, 400);
        // The read matches the reference segment, but the seed claims the
        // reverse-complement strand
        let read = Read::new(segment);
        let mut nam = forward_nam(segment.len());
        nam.is_rc = true;
        assert!(reverse_nam_if_needed(&mut nam, &read, &references, K));
        assert!(!nam.is_rc);
        assert_eq!(nam.query_start, 0);
        assert_eq!(nam.query_end, segment.len());
    }

    #[test]
    fn verifier_is_idempotent() {
        let segment = b"ACGGTTACCAGATTACAGGATCCATTTTAGCC";
        let references = reference_with(segment, 100, 400);
        let read = Read::new(segment);
        let mut nam = forward_nam(segment.len());
        nam.is_rc = true;
        assert!(reverse_nam_if_needed(&mut nam, &read, &references, K));
        let after_first = nam;
        assert!(reverse_nam_if_needed(&mut nam, &read, &references, K));
        assert_eq!(nam, after_first);
    }

    #[test]
    fn inconsistent_nam_is_reported() {
        let segment = b"ACGGTTACCAGATTACAGGATCCATTTTAGCC";
        let references = reference_with(segment, 100, 400);
        let read = Read::new(b"TTGCAGGCAGGACCAGGGTTTTGGAACCCAGG");
        let mut nam = forward_nam(segment.len());
        assert!(!reverse_nam_if_needed(&mut nam, &read, &references, K));
    }

    #[test]
    fn exact_seed_takes_the_ungapped_path() {
        let read_seq = b"ACGGTTACCAGATTACAGGATCCATTTTAGCC";
        let references = reference_with(read_seq, 100, 400);
        let read = Read::new(read_seq);
        let nam = forward_nam(read_seq.len());
        let aligner = Aligner::default();
        let alignment = extend_seed(&aligner, &nam, &references, &read, true);
        assert!(!alignment.gapped);
        assert!(!alignment.is_unaligned);
        assert_eq!(alignment.edit_distance, 0);
        assert_eq!(alignment.global_ed, 0);
        assert_eq!(alignment.ref_start, 100);
        assert_eq!(alignment.length, read_seq.len());
        // Fast path score is exactly the Hamming kernel's score
        let expected = hamming_align(read_seq, read_seq, 2, 8, 10).unwrap().score;
        assert_eq!(alignment.score, expected);
    }

    #[test]
    fn reverse_seed_aligns_the_reverse_complement() {
        let segment = b"ACGGTTACCAGATTACAGGATCCATTTTAGCC";
        let references = reference_with(segment, 100, 400);
        let read = Read::new(&reverse_complement(segment));
        let nam = Nam {
            is_rc: true,
            ..forward_nam(segment.len())
        };
        let aligner = Aligner::default();
        let alignment = extend_seed(&aligner, &nam, &references, &read, true);
        assert!(alignment.is_rc);
        assert_eq!(alignment.edit_distance, 0);
        assert_eq!(alignment.ref_start, 100);
    }

    #[test]
    fn inconsistent_seed_falls_back_to_gapped() {
        let read_seq = b"ACGGTTACCAGATTACAGGATCCATTTTAGCC";
        let references = reference_with(read_seq, 100, 400);
        let read = Read::new(read_seq);
        let nam = forward_nam(read_seq.len());
        let aligner = Aligner::default();
        let alignment = extend_seed(&aligner, &nam, &references, &read, false);
        assert!(alignment.gapped);
        assert_eq!(alignment.edit_distance, 0);
        assert_eq!(alignment.ref_start, 100);
    }

    #[test]
    fn produced_alignments_stay_inside_the_contig() {
        // Seed at the very start of the contig with a query offset that
        // projects before position zero
        let read_seq = b"ACGGTTACCAGATTACAGGATCCATTTTAGCC";
        let references = reference_with(&read_seq[8..], 0, 300);
        let read = Read::new(read_seq);
        let nam = Nam {
            nam_id: 0,
            ref_id: 0,
            ref_start: 0,
            ref_end: read_seq.len() - 8,
            query_start: 8,
            query_end: read_seq.len(),
            n_hits: 5,
            score: 50.0,
            is_rc: false,
        };
        let aligner = Aligner::default();
        let alignment = extend_seed(&aligner, &nam, &references, &read, true);
        assert!(alignment.ref_start + alignment.length <= references.length(0));
    }
}
