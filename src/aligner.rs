// Base-level alignment kernels
//
// Two entry points, matching the two extension paths:
// - `hamming_align` for equal-length windows: finds the highest-scoring
//   ungapped segment, soft-clipping the rest, with an end bonus credited
//   when the segment reaches a read end.
// - `Aligner::align` for everything else: affine-gap alignment of the read
//   against a padded reference window, free reference clipping, query
//   clipping charged one end bonus per clipped end so a full-length
//   extension scores the same as on the ungapped path.

use crate::cigar::{Cigar, CigarOperation};
use bio::alignment::pairwise::{Aligner as PairwiseAligner, Scoring};
use bio::alignment::AlignmentOperation;

/// Scoring parameters, shared by both kernels
#[derive(Debug, Clone, Copy)]
pub struct Scores {
    pub match_: i32,
    pub mismatch: i32,
    pub gap_open: i32,
    pub gap_extend: i32,
    pub end_bonus: i32,
}

impl Default for Scores {
    fn default() -> Self {
        Scores {
            match_: 2,
            mismatch: 8,
            gap_open: 12,
            gap_extend: 1,
            end_bonus: 10,
        }
    }
}

/// Result of one kernel invocation. Spans are half-open and relative to the
/// query / reference window the kernel was given.
#[derive(Debug, Clone, Default)]
pub struct AlignmentInfo {
    pub cigar: Cigar,
    pub edit_distance: usize,
    pub score: i32,
    pub query_start: usize,
    pub query_end: usize,
    pub ref_start: usize,
    pub ref_end: usize,
}

impl AlignmentInfo {
    pub fn ref_span(&self) -> usize {
        self.ref_end - self.ref_start
    }
}

/// Number of mismatching positions, or None when the lengths differ
pub fn hamming_distance(x: &[u8], y: &[u8]) -> Option<usize> {
    if x.len() != y.len() {
        return None;
    }
    Some(x.iter().zip(y.iter()).filter(|(a, b)| a != b).count())
}

/// Highest-scoring contiguous segment of an equal-length comparison.
/// A segment that reaches the start or end of the sequences collects
/// `end_bonus` for that end. Returns (start, end, score).
fn highest_scoring_segment(
    query: &[u8],
    ref_segment: &[u8],
    match_: i32,
    mismatch: i32,
    end_bonus: i32,
) -> (usize, usize, i32) {
    let n = query.len();
    let mut start = 0;
    let mut score = end_bonus;
    let mut best_start = 0;
    let mut best_end = 0;
    let mut best_score = 0;
    for i in 0..n {
        if query[i] == ref_segment[i] {
            score += match_;
        } else {
            score -= mismatch;
        }
        if score < 0 {
            start = i + 1;
            score = 0;
        }
        if score > best_score {
            best_start = start;
            best_end = i + 1;
            best_score = score;
        }
    }
    if score + end_bonus > best_score {
        best_score = score + end_bonus;
        best_end = n;
        best_start = start;
    }
    (best_start, best_end, best_score)
}

/// Ungapped alignment of two equal-length sequences. Soft-clips everything
/// outside the highest-scoring segment. None when the lengths differ.
pub fn hamming_align(
    query: &[u8],
    ref_segment: &[u8],
    match_: i32,
    mismatch: i32,
    end_bonus: i32,
) -> Option<AlignmentInfo> {
    if query.len() != ref_segment.len() {
        return None;
    }

    let (segment_start, segment_end, score) =
        highest_scoring_segment(query, ref_segment, match_, mismatch, end_bonus);

    let mut cigar = Cigar::new();
    cigar.push(CigarOperation::SoftClip, segment_start);
    let mut mismatches = 0;
    for i in segment_start..segment_end {
        if query[i] == ref_segment[i] {
            cigar.push(CigarOperation::Eq, 1);
        } else {
            mismatches += 1;
            cigar.push(CigarOperation::Diff, 1);
        }
    }
    cigar.push(CigarOperation::SoftClip, query.len() - segment_end);

    Some(AlignmentInfo {
        cigar,
        edit_distance: mismatches,
        score,
        query_start: segment_start,
        query_end: segment_end,
        ref_start: segment_start,
        ref_end: segment_end,
    })
}

/// Affine-gap kernel
#[derive(Debug, Clone, Default)]
pub struct Aligner {
    pub scores: Scores,
}

impl Aligner {
    pub fn new(scores: Scores) -> Self {
        Aligner { scores }
    }

    /// Align the full query against a reference window. The reference may
    /// be clipped freely on both sides; clipping the query costs one end
    /// bonus per end, and the reported score carries both bonuses so that
    /// it is directly comparable with `hamming_align` output.
    pub fn align(&self, query: &[u8], ref_segment: &[u8]) -> AlignmentInfo {
        if query.is_empty() || ref_segment.is_empty() {
            return AlignmentInfo::default();
        }
        let scoring = Scoring::from_scores(
            -self.scores.gap_open,
            -self.scores.gap_extend,
            self.scores.match_,
            -self.scores.mismatch,
        )
        .xclip(-self.scores.end_bonus)
        .yclip(0);
        let mut pairwise =
            PairwiseAligner::with_capacity_and_scoring(query.len(), ref_segment.len(), scoring);
        let alignment = pairwise.custom(query, ref_segment);

        let mut cigar = Cigar::new();
        cigar.push(CigarOperation::SoftClip, alignment.xstart);
        let mut edit_distance = 0;
        for op in &alignment.operations {
            match op {
                AlignmentOperation::Match => cigar.push(CigarOperation::Eq, 1),
                AlignmentOperation::Subst => {
                    edit_distance += 1;
                    cigar.push(CigarOperation::Diff, 1);
                }
                AlignmentOperation::Ins => {
                    edit_distance += 1;
                    cigar.push(CigarOperation::Insert, 1);
                }
                AlignmentOperation::Del => {
                    edit_distance += 1;
                    cigar.push(CigarOperation::Deletion, 1);
                }
                AlignmentOperation::Xclip(_) | AlignmentOperation::Yclip(_) => {}
            }
        }
        cigar.push(CigarOperation::SoftClip, alignment.xlen - alignment.xend);

        if alignment.xstart == alignment.xend {
            // Nothing of the query aligned
            return AlignmentInfo::default();
        }

        AlignmentInfo {
            cigar,
            edit_distance,
            score: alignment.score + 2 * self.scores.end_bonus,
            query_start: alignment.xstart,
            query_end: alignment.xend,
            ref_start: alignment.ystart,
            ref_end: alignment.yend,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hamming_distance_counts_mismatches() {
        assert_eq!(hamming_distance(b"ACGT", b"ACGT"), Some(0));
        assert_eq!(hamming_distance(b"ACGT", b"ACCT"), Some(1));
        assert_eq!(hamming_distance(b"ACGT", b"TGCA"), Some(4));
        assert_eq!(hamming_distance(b"ACGT", b"ACG"), None);
    }

    #[test]
    fn perfect_hamming_alignment_scores_both_end_bonuses() {
        let info = hamming_align(b"ACGTACGT", b"ACGTACGT", 2, 8, 10).unwrap();
        assert_eq!(info.score, 8 * 2 + 2 * 10);
        assert_eq!(info.edit_distance, 0);
        assert_eq!(info.cigar.to_string(), "8=");
        assert_eq!(info.query_start, 0);
        assert_eq!(info.query_end, 8);
        assert_eq!(info.ref_span(), 8);
    }

    #[test]
    fn internal_mismatch_is_recorded_not_clipped() {
        let info = hamming_align(b"ACGTACGTACGTACGT", b"ACGTACGAACGTACGT", 2, 8, 10).unwrap();
        assert_eq!(info.edit_distance, 1);
        assert_eq!(info.cigar.to_string(), "7=1X8=");
        assert_eq!(info.score, 15 * 2 - 8 + 2 * 10);
    }

    #[test]
    fn noisy_prefix_is_soft_clipped() {
        // First four bases all disagree; the segment should start after them
        let info = hamming_align(b"TTTTACGTACGTACGT", b"GGGGACGTACGTACGT", 2, 8, 10).unwrap();
        assert_eq!(info.query_start, 4);
        assert_eq!(info.query_end, 16);
        assert!(info.cigar.to_string().starts_with("4S"));
        assert_eq!(info.edit_distance, 0);
    }

    #[test]
    fn length_mismatch_yields_none() {
        assert!(hamming_align(b"ACGT", b"ACGTT", 2, 8, 10).is_none());
    }

    #[test]
    fn gapped_alignment_of_exact_window() {
        let aligner = Aligner::default();
        let reference = b"TTTTTACGTACGTACGTACGTTTTT";
        let query = b"ACGTACGTACGTACGT";
        let info = aligner.align(query, reference);
        assert_eq!(info.edit_distance, 0);
        assert_eq!(info.ref_start, 5);
        assert_eq!(info.ref_end, 21);
        assert_eq!(info.query_start, 0);
        assert_eq!(info.query_end, 16);
        assert_eq!(info.score, 16 * 2 + 2 * 10);
        assert_eq!(info.cigar.to_string(), "16=");
    }

    #[test]
    fn gapped_alignment_reports_deletion() {
        let aligner = Aligner::default();
        // Query is the reference window with three bases removed
        let reference = b"AAAACGTACGTACGTGGGTACGTACGTACGTAAAA";
        let query = b"ACGTACGTACGTTACGTACGTACGT";
        let info = aligner.align(query, reference);
        assert!(info.edit_distance >= 3);
        assert!(info.cigar.to_string().contains('D'));
    }

    #[test]
    fn unalignable_window_returns_empty_info() {
        let aligner = Aligner::default();
        let info = aligner.align(b"AAAAAAAA", b"CCCCCCCC");
        assert!(info.cigar.is_empty() || info.edit_distance > 0);
    }
}
