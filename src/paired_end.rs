// Paired-end driver
//
// Selects among four modes per pair: both mates unseeded (unmapped pair),
// one side unseeded (rescue path), confident top seeds forming a proper
// pair (shortcut), or a full search over jointly scored seed-pair
// candidates. The full search memoizes extensions by seed id so a seed
// revisited through several candidates is verified and aligned once.

use crate::aligner::Aligner;
use crate::details::Details;
use crate::extend::{extend_seed, reverse_nam_if_needed, Alignment};
use crate::insert_size::{InsertSizeDistribution, SAMPLE_SIZE_CAP};
use crate::mapq::{get_mapq, joint_mapq_from_alignment_scores, joint_mapq_from_high_scores};
use crate::mate_rescue::rescue_mate;
use crate::nam::Nam;
use crate::pairing::{
    get_best_scoring_nam_pairs, get_best_scoring_pairs, is_proper_nam_pair, is_proper_pair,
    normal_pdf, top_dropoff, NamPair, ScoredAlignmentPair,
};
use crate::read::{Read, SequenceRecord};
use crate::reference::References;
use crate::sam::Sam;
use rustc_hash::FxHashMap;

/// Flat pair-score penalty for placements that do not look like a pair;
/// matches a log-density more than five standard deviations out
const OUTSIDE_ENVELOPE_PENALTY: f64 = 20.0;

#[allow(clippy::too_many_arguments)]
pub fn align_paired_end(
    aligner: &Aligner,
    sam: &mut Sam,
    nams1: &mut Vec<Nam>,
    nams2: &mut Vec<Nam>,
    record1: &SequenceRecord,
    record2: &SequenceRecord,
    k: usize,
    references: &References,
    details: &mut [Details; 2],
    dropoff: f32,
    isize_est: &mut InsertSizeDistribution,
    max_tries: usize,
    max_secondary: usize,
) {
    let mu = isize_est.mu;
    let sigma = isize_est.sigma;
    let read1 = Read::new(&record1.seq);
    let read2 = Read::new(&record2.seq);
    let secondary_dropoff = (2 * aligner.scores.mismatch + aligner.scores.gap_open) as f64;

    if nams1.is_empty() && nams2.is_empty() {
        // Neither read has any seeds
        sam.add_unmapped_pair(record1, record2);
        return;
    }

    if !nams1.is_empty() && nams2.is_empty() {
        // Only read 1 has seeds: attempt to rescue read 2
        rescue_read(
            RescueArgs {
                rescued: &read2,
                guide: &read1,
                record_guide: record1,
                record_rescued: record2,
                mates_swapped: false,
            },
            aligner,
            references,
            nams1,
            max_tries,
            dropoff,
            details,
            k,
            mu,
            sigma,
            max_secondary,
            secondary_dropoff,
            sam,
        );
        return;
    }

    if nams1.is_empty() && !nams2.is_empty() {
        // Only read 2 has seeds: attempt to rescue read 1
        rescue_read(
            RescueArgs {
                rescued: &read1,
                guide: &read2,
                record_guide: record2,
                record_rescued: record1,
                mates_swapped: true,
            },
            aligner,
            references,
            nams2,
            max_tries,
            dropoff,
            details,
            k,
            mu,
            sigma,
            max_secondary,
            secondary_dropoff,
            sam,
        );
        return;
    }

    // Both reads have seeds
    if top_dropoff(nams1) < dropoff
        && top_dropoff(nams2) < dropoff
        && is_proper_nam_pair(&nams1[0], &nams2[0], mu, sigma)
    {
        // Confident top seeds that agree on the pair geometry: extend just
        // those and take single-seed MAPQs per mate
        let mut n_max1 = nams1[0];
        let mut n_max2 = nams2[0];

        let consistent_nam1 = reverse_nam_if_needed(&mut n_max1, &read1, references, k);
        details[0].nam_inconsistent += usize::from(!consistent_nam1);
        let consistent_nam2 = reverse_nam_if_needed(&mut n_max2, &read2, references, k);
        details[1].nam_inconsistent += usize::from(!consistent_nam2);

        let alignment1 = extend_seed(aligner, &n_max1, references, &read1, consistent_nam1);
        details[0].tried_alignment += 1;
        details[0].gapped += usize::from(alignment1.gapped);
        let alignment2 = extend_seed(aligner, &n_max2, references, &read2, consistent_nam2);
        details[1].tried_alignment += 1;
        details[1].gapped += usize::from(alignment2.gapped);

        let mapq1 = get_mapq(nams1, &n_max1);
        let mapq2 = get_mapq(nams2, &n_max2);
        let is_proper = is_proper_pair(&alignment1, &alignment2, mu, sigma);
        sam.add_pair(
            &alignment1,
            &alignment2,
            record1,
            record2,
            read1.rc(),
            read2.rc(),
            mapq1,
            mapq2,
            is_proper,
            true,
            details,
        );

        if isize_est.sample_size < SAMPLE_SIZE_CAP
            && alignment1.edit_distance + alignment2.edit_distance < 3
            && is_proper
        {
            isize_est.update(alignment1.ref_start.abs_diff(alignment2.ref_start));
        }
        return;
    }

    // Full search of the highest scoring pair. Candidates carry the joint
    // hit count of both mates' seeds; alignment continues until the score
    // dropoff or the tries cap ends it.
    let joint_nam_scores = get_best_scoring_nam_pairs(nams1, nams2, mu, sigma);
    let max_score = joint_nam_scores[0].0;

    let mut is_aligned1: FxHashMap<usize, Alignment> = FxHashMap::default();
    let mut is_aligned2: FxHashMap<usize, Alignment> = FxHashMap::default();

    // Each read's individually best alignment starts from its top seed and
    // is tracked across the whole pass
    let mut n1_max = nams1[0];
    let consistent_nam1 = reverse_nam_if_needed(&mut n1_max, &read1, references, k);
    details[0].nam_inconsistent += usize::from(!consistent_nam1);
    let mut a1_indv_max = extend_seed(aligner, &n1_max, references, &read1, consistent_nam1);
    is_aligned1.insert(n1_max.nam_id, a1_indv_max.clone());
    details[0].tried_alignment += 1;
    details[0].gapped += usize::from(a1_indv_max.gapped);

    let mut n2_max = nams2[0];
    let consistent_nam2 = reverse_nam_if_needed(&mut n2_max, &read2, references, k);
    details[1].nam_inconsistent += usize::from(!consistent_nam2);
    let mut a2_indv_max = extend_seed(aligner, &n2_max, references, &read2, consistent_nam2);
    is_aligned2.insert(n2_max.nam_id, a2_indv_max.clone());
    details[1].tried_alignment += 1;
    details[1].gapped += usize::from(a2_indv_max.gapped);

    let mut high_scores: Vec<ScoredAlignmentPair> = Vec::new();
    let mut tries = 0;
    for (joint_hits, nam_pair) in &joint_nam_scores {
        let score_dropoff = *joint_hits as f32 / max_score as f32;
        if tries >= max_tries || score_dropoff < dropoff {
            break;
        }

        let (alignment1, alignment2) = match nam_pair {
            NamPair::Both(n1, n2) => {
                let alignment1 = extend_or_memoized(
                    aligner,
                    *n1,
                    &read1,
                    references,
                    k,
                    &mut is_aligned1,
                    &mut details[0],
                );
                let alignment2 = extend_or_memoized(
                    aligner,
                    *n2,
                    &read2,
                    references,
                    k,
                    &mut is_aligned2,
                    &mut details[1],
                );
                (alignment1, alignment2)
            }
            NamPair::OnlyRead1(n1) => {
                let alignment1 = extend_or_memoized(
                    aligner,
                    *n1,
                    &read1,
                    references,
                    k,
                    &mut is_aligned1,
                    &mut details[0],
                );
                // Force alignment to rescue the unseeded mate
                let mut guide = *n1;
                let (alignment2, attempted) =
                    rescue_mate(aligner, &mut guide, references, &read1, &read2, mu, sigma, k);
                details[1].mate_rescue += usize::from(attempted);
                details[1].tried_alignment += 1;
                (alignment1, alignment2)
            }
            NamPair::OnlyRead2(n2) => {
                let mut guide = *n2;
                let (alignment1, attempted) =
                    rescue_mate(aligner, &mut guide, references, &read2, &read1, mu, sigma, k);
                details[0].mate_rescue += usize::from(attempted);
                details[0].tried_alignment += 1;
                let alignment2 = extend_or_memoized(
                    aligner,
                    *n2,
                    &read2,
                    references,
                    k,
                    &mut is_aligned2,
                    &mut details[1],
                );
                (alignment1, alignment2)
            }
        };

        if alignment1.score > a1_indv_max.score {
            a1_indv_max = alignment1.clone();
        }
        if alignment2.score > a2_indv_max.score {
            a2_indv_max = alignment2.clone();
        }

        // r1 ---> <---- r2 or r2 ---> <---- r1
        let r1_r2 = alignment2.is_rc
            && alignment1.ref_start <= alignment2.ref_start
            && ((alignment2.ref_start - alignment1.ref_start) as f32) < mu + 10.0 * sigma;
        let r2_r1 = alignment1.is_rc
            && alignment2.ref_start <= alignment1.ref_start
            && ((alignment1.ref_start - alignment2.ref_start) as f32) < mu + 10.0 * sigma;

        let score = if r1_r2 || r2_r1 {
            let x = alignment1.ref_start.abs_diff(alignment2.ref_start) as f32;
            alignment1.score as f64
                + alignment2.score as f64
                + (normal_pdf(x, mu, sigma) as f64).ln()
        } else {
            alignment1.score as f64 + alignment2.score as f64 - OUTSIDE_ENVELOPE_PENALTY
        };

        high_scores.push(ScoredAlignmentPair {
            score,
            alignment1,
            alignment2,
        });
        tries += 1;
    }

    // Finally, make sure both mates' individual optima are represented
    let score =
        a1_indv_max.score as f64 + a2_indv_max.score as f64 - OUTSIDE_ENVELOPE_PENALTY;
    high_scores.push(ScoredAlignmentPair {
        score,
        alignment1: a1_indv_max,
        alignment2: a2_indv_max,
    });
    high_scores.sort_by(|a, b| b.score.total_cmp(&a.score));

    let (mut mapq1, mut mapq2) = joint_mapq_from_high_scores(&high_scores);

    if max_secondary == 0 {
        let best_pair = &high_scores[0];
        let is_proper = is_proper_pair(&best_pair.alignment1, &best_pair.alignment2, mu, sigma);
        sam.add_pair(
            &best_pair.alignment1,
            &best_pair.alignment2,
            record1,
            record2,
            read1.rc(),
            read2.rc(),
            mapq1,
            mapq2,
            is_proper,
            true,
            details,
        );
        return;
    }

    let max_out = high_scores.len().min(max_secondary);
    let s_max = high_scores[0].score;
    // Duplicates can arise from the appended individual optima; skip pairs
    // that repeat the previous placement on both mates
    let mut prev_start_m1 = high_scores[0].alignment1.ref_start;
    let mut prev_start_m2 = high_scores[0].alignment2.ref_start;
    let mut prev_ref_id_m1 = high_scores[0].alignment1.ref_id;
    let mut prev_ref_id_m2 = high_scores[0].alignment2.ref_id;
    let mut is_primary = true;
    for (i, pair) in high_scores.iter().take(max_out).enumerate() {
        if i > 0 {
            is_primary = false;
            mapq1 = 255;
            mapq2 = 255;
            let same_pos = prev_start_m1 == pair.alignment1.ref_start
                && prev_start_m2 == pair.alignment2.ref_start;
            let same_ref = prev_ref_id_m1 == pair.alignment1.ref_id
                && prev_ref_id_m2 == pair.alignment2.ref_id;
            if same_pos && same_ref {
                continue;
            }
        }

        if s_max - pair.score < secondary_dropoff {
            let is_proper = is_proper_pair(&pair.alignment1, &pair.alignment2, mu, sigma);
            sam.add_pair(
                &pair.alignment1,
                &pair.alignment2,
                record1,
                record2,
                read1.rc(),
                read2.rc(),
                mapq1,
                mapq2,
                is_proper,
                is_primary,
                details,
            );
        } else {
            break;
        }

        prev_start_m1 = pair.alignment1.ref_start;
        prev_start_m2 = pair.alignment2.ref_start;
        prev_ref_id_m1 = pair.alignment1.ref_id;
        prev_ref_id_m2 = pair.alignment2.ref_id;
    }
}

/// Verify and extend a seed unless an alignment for its id is already
/// memoized; verification is folded into the memo so each seed is checked
/// once per read.
fn extend_or_memoized(
    aligner: &Aligner,
    mut nam: Nam,
    read: &Read,
    references: &References,
    k: usize,
    memo: &mut FxHashMap<usize, Alignment>,
    details: &mut Details,
) -> Alignment {
    if let Some(alignment) = memo.get(&nam.nam_id) {
        return alignment.clone();
    }
    let consistent_nam = reverse_nam_if_needed(&mut nam, read, references, k);
    details.nam_inconsistent += usize::from(!consistent_nam);
    let alignment = extend_seed(aligner, &nam, references, read, consistent_nam);
    memo.insert(nam.nam_id, alignment.clone());
    details.tried_alignment += 1;
    details.gapped += usize::from(alignment.gapped);
    alignment
}

struct RescueArgs<'a> {
    rescued: &'a Read,
    guide: &'a Read,
    record_guide: &'a SequenceRecord,
    record_rescued: &'a SequenceRecord,
    mates_swapped: bool,
}

/// Rescue path: one read has seeds, the other none. Each considered guide
/// seed is extended and the mate force-aligned into the window it implies;
/// pairs are then scored jointly.
#[allow(clippy::too_many_arguments)]
fn rescue_read(
    args: RescueArgs,
    aligner: &Aligner,
    references: &References,
    nams_guide: &mut [Nam],
    max_tries: usize,
    dropoff: f32,
    details: &mut [Details; 2],
    k: usize,
    mu: f32,
    sigma: f32,
    max_secondary: usize,
    secondary_dropoff: f64,
    sam: &mut Sam,
) {
    let n_max = nams_guide[0];
    let mut tries = 0;

    let mut alignments_guide: Vec<Alignment> = Vec::new();
    let mut alignments_rescued: Vec<Alignment> = Vec::new();
    for nam in nams_guide.iter_mut() {
        let score_dropoff = nam.n_hits as f32 / n_max.n_hits as f32;
        // Consider only the top seeds and stop below the dropoff cutoff
        if tries >= max_tries || score_dropoff < dropoff {
            break;
        }

        let consistent_nam = reverse_nam_if_needed(nam, args.guide, references, k);
        details[0].nam_inconsistent += usize::from(!consistent_nam);
        let alignment = extend_seed(aligner, nam, references, args.guide, consistent_nam);
        details[0].gapped += usize::from(alignment.gapped);
        alignments_guide.push(alignment);
        details[0].tried_alignment += 1;

        // Force alignment of the mate into the window this seed implies
        let (alignment_rescued, attempted) =
            rescue_mate(aligner, nam, references, args.guide, args.rescued, mu, sigma, k);
        details[1].mate_rescue += usize::from(attempted);
        alignments_rescued.push(alignment_rescued);

        tries += 1;
    }
    alignments_guide.sort_by(|a, b| b.score.cmp(&a.score));
    alignments_rescued.sort_by(|a, b| b.score.cmp(&a.score));

    let high_scores = get_best_scoring_pairs(&alignments_guide, &alignments_rescued, mu, sigma);
    if high_scores.is_empty() {
        sam.add_unmapped_pair(args.record_guide, args.record_rescued);
        return;
    }

    let (mut mapq1, mut mapq2) = if high_scores.len() > 1 {
        joint_mapq_from_alignment_scores(high_scores[0].score, high_scores[1].score)
    } else {
        (60, 60)
    };

    let max_out = if max_secondary == 0 {
        1
    } else {
        high_scores.len().min(max_secondary)
    };
    let s_max = high_scores[0].score;
    for (i, pair) in high_scores.iter().take(max_out).enumerate() {
        let is_primary = i == 0;
        if !is_primary {
            mapq1 = 0;
            mapq2 = 0;
            if s_max - pair.score >= secondary_dropoff {
                break;
            }
        }
        emit_rescued_pair(sam, &args, pair, mapq1, mapq2, is_primary, details, mu, sigma);
    }
}

#[allow(clippy::too_many_arguments)]
fn emit_rescued_pair(
    sam: &mut Sam,
    args: &RescueArgs,
    pair: &ScoredAlignmentPair,
    mapq1: u8,
    mapq2: u8,
    is_primary: bool,
    details: &[Details; 2],
    mu: f32,
    sigma: f32,
) {
    let alignment_guide = &pair.alignment1;
    let alignment_rescued = &pair.alignment2;
    if args.mates_swapped {
        let is_proper = is_proper_pair(alignment_rescued, alignment_guide, mu, sigma);
        let swapped_details = [details[1], details[0]];
        sam.add_pair(
            alignment_rescued,
            alignment_guide,
            args.record_rescued,
            args.record_guide,
            args.rescued.rc(),
            args.guide.rc(),
            mapq2,
            mapq1,
            is_proper,
            is_primary,
            &swapped_details,
        );
    } else {
        let is_proper = is_proper_pair(alignment_guide, alignment_rescued, mu, sigma);
        sam.add_pair(
            alignment_guide,
            alignment_rescued,
            args.record_guide,
            args.record_rescued,
            args.guide.rc(),
            args.rescued.rc(),
            mapq1,
            mapq2,
            is_proper,
            is_primary,
            details,
        );
    }
}
