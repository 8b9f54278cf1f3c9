// Per-record mapping orchestration
//
// Pulls seeds from the upstream producer (with the optional rescue pass),
// sorts them by score and dispatches to the SAM drivers or, in
// mapping-only mode, to the PAF path. Statistics are merged here so the
// drivers stay free of accumulation concerns.

use crate::aligner::Aligner;
use crate::cigar::CigarMode;
use crate::details::{Details, MappingStatistics};
use crate::insert_size::{InsertSizeDistribution, SAMPLE_SIZE_CAP};
use crate::nam::{sort_nams_by_score, Nam, SeedFinder};
use crate::paf;
use crate::paired_end::align_paired_end;
use crate::pairing::{get_best_scoring_nam_pairs, NamPair};
use crate::read::SequenceRecord;
use crate::reference::References;
use crate::sam::Sam;
use crate::single_end::align_single_end;

/// Seed rescue is considered when fewer than this fraction of a read's
/// strobemers was usable
const NONREPETITIVE_FRACTION_LIMIT: f32 = 0.7;

/// Mapping configuration recognized by the core
#[derive(Debug, Clone)]
pub struct MappingParameters {
    /// Seeds below this fraction of the top seed's hit count are skipped
    pub dropoff_threshold: f32,
    /// Hard cap on extension attempts per read
    pub max_tries: usize,
    /// 0 emits only the primary; otherwise at most this many secondaries
    pub max_secondary: usize,
    /// Above 1 enables the seed rescue producer
    pub rescue_level: usize,
    /// Forwarded to the seed rescue producer
    pub rescue_cutoff: usize,
    /// false selects the seed-only PAF output path
    pub is_sam_out: bool,
    pub cigar_mode: CigarMode,
    /// Append per-record counter tags to SAM records
    pub output_details: bool,
}

impl Default for MappingParameters {
    fn default() -> Self {
        MappingParameters {
            dropoff_threshold: 0.5,
            max_tries: 20,
            max_secondary: 0,
            rescue_level: 2,
            rescue_cutoff: 100,
            is_sam_out: true,
            cigar_mode: CigarMode::M,
            output_details: false,
        }
    }
}

fn seeds_for_read(
    seq: &[u8],
    index: &dyn SeedFinder,
    map_param: &MappingParameters,
    details: &mut Details,
) -> Vec<Nam> {
    let (nonrepetitive_fraction, mut nams) = index.find_seeds(seq);
    if map_param.rescue_level > 1
        && (nams.is_empty() || nonrepetitive_fraction < NONREPETITIVE_FRACTION_LIMIT)
    {
        details.nam_rescue = true;
        nams = index.find_seeds_rescue(seq, map_param.rescue_cutoff);
    }
    details.nams = nams.len();
    sort_nams_by_score(&mut nams);
    nams
}

/// Map one single-end record, appending SAM (or PAF) lines to `out`
#[allow(clippy::too_many_arguments)]
pub fn map_single_end_read(
    record: &SequenceRecord,
    index: &dyn SeedFinder,
    references: &References,
    aligner: &Aligner,
    map_param: &MappingParameters,
    statistics: &mut MappingStatistics,
    out: &mut String,
) {
    let mut details = Details::default();
    let mut nams = seeds_for_read(&record.seq, index, map_param, &mut details);

    if map_param.is_sam_out {
        let mut sam = Sam::new(out, references, map_param.cigar_mode, map_param.output_details);
        align_single_end(
            aligner,
            &mut sam,
            &mut nams,
            record,
            index.k(),
            references,
            &mut details,
            map_param.dropoff_threshold,
            map_param.max_tries,
            map_param.max_secondary,
        );
    } else {
        paf::output_hits_paf(out, &nams, &record.name, references, record.seq.len());
    }
    *statistics += details;
}

/// Map one record pair, appending SAM (or PAF) lines to `out`. The
/// insert-size estimate is read at the start of the record and may be
/// refined as a side effect of a confident proper pair.
#[allow(clippy::too_many_arguments)]
pub fn map_paired_end_read(
    record1: &SequenceRecord,
    record2: &SequenceRecord,
    index: &dyn SeedFinder,
    references: &References,
    aligner: &Aligner,
    map_param: &MappingParameters,
    isize_est: &mut InsertSizeDistribution,
    statistics: &mut MappingStatistics,
    out: &mut String,
) {
    let mut details = [Details::default(), Details::default()];
    let mut nams1 = seeds_for_read(&record1.seq, index, map_param, &mut details[0]);
    let mut nams2 = seeds_for_read(&record2.seq, index, map_param, &mut details[1]);

    if map_param.is_sam_out {
        let mut sam = Sam::new(out, references, map_param.cigar_mode, map_param.output_details);
        align_paired_end(
            aligner,
            &mut sam,
            &mut nams1,
            &mut nams2,
            record1,
            record2,
            index.k(),
            references,
            &mut details,
            map_param.dropoff_threshold,
            isize_est,
            map_param.max_tries,
            map_param.max_secondary,
        );
    } else {
        let (best_nam1, best_nam2) = get_best_map_location(&nams1, &nams2, isize_est);
        paf::output_paf_hit(out, best_nam1.as_ref(), &record1.name, references, record1.seq.len());
        paf::output_paf_hit(out, best_nam2.as_ref(), &record2.name, references, record2.seq.len());
    }
    *statistics += details[0];
    *statistics += details[1];
}

/// Choose the reported seed per mate in mapping-only mode: the best joint
/// placement when it beats the individually best seeds (each taken at half
/// score for being unpaired). A confident joint winner also feeds the
/// insert-size estimator.
fn get_best_map_location(
    nams1: &[Nam],
    nams2: &[Nam],
    isize_est: &mut InsertSizeDistribution,
) -> (Option<Nam>, Option<Nam>) {
    let joint_nam_scores =
        get_best_scoring_nam_pairs(nams1, nams2, isize_est.mu, isize_est.sigma);

    let mut best_nam1 = None;
    let mut best_nam2 = None;
    if joint_nam_scores.is_empty() {
        return (best_nam1, best_nam2);
    }

    // Best joint score, if any pair exists (list is sorted by score)
    let joint_max = joint_nam_scores.iter().find_map(|(_, pair)| match pair {
        NamPair::Both(n1, n2) => Some((*n1, *n2)),
        _ => None,
    });
    let score_joint = joint_max
        .map(|(n1, n2)| n1.score + n2.score)
        .unwrap_or(0.0);

    // Individually best seeds, penalized for being unpaired
    let mut score_indiv = 0.0;
    if let Some(n1) = nams1.first() {
        score_indiv += n1.score - n1.score / 2.0;
        best_nam1 = Some(*n1);
    }
    if let Some(n2) = nams2.first() {
        score_indiv += n2.score - n2.score / 2.0;
        best_nam2 = Some(*n2);
    }

    if score_joint > score_indiv {
        if let Some((n1, n2)) = joint_max {
            best_nam1 = Some(n1);
            best_nam2 = Some(n2);
            if isize_est.sample_size < SAMPLE_SIZE_CAP {
                isize_est.update(n1.ref_start.abs_diff(n2.ref_start));
            }
        }
    }

    (best_nam1, best_nam2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nam(nam_id: usize, ref_start: usize, n_hits: usize, score: f32, is_rc: bool) -> Nam {
        Nam {
            nam_id,
            ref_id: 0,
            ref_start,
            ref_end: ref_start + 30,
            query_start: 0,
            query_end: 30,
            n_hits,
            score,
            is_rc,
        }
    }

    #[test]
    fn joint_location_beats_individual_seeds() {
        let mut isize_est = InsertSizeDistribution {
            mu: 300.0,
            sigma: 30.0,
            ..InsertSizeDistribution::default()
        };
        let nams1 = vec![nam(0, 1000, 10, 50.0, false)];
        let nams2 = vec![nam(0, 1300, 10, 50.0, true)];
        let before = isize_est.sample_size;
        let (best1, best2) = get_best_map_location(&nams1, &nams2, &mut isize_est);
        assert_eq!(best1.unwrap().ref_start, 1000);
        assert_eq!(best2.unwrap().ref_start, 1300);
        // joint 100 > individual 50: the estimator consumed the distance
        assert_eq!(isize_est.sample_size, before + 1);
    }

    #[test]
    fn unpairable_seeds_fall_back_to_individual_best() {
        let mut isize_est = InsertSizeDistribution {
            mu: 300.0,
            sigma: 30.0,
            ..InsertSizeDistribution::default()
        };
        let nams1 = vec![nam(0, 1000, 10, 50.0, false)];
        let nams2 = vec![nam(0, 50_000, 10, 40.0, true)];
        let before = isize_est.sample_size;
        let (best1, best2) = get_best_map_location(&nams1, &nams2, &mut isize_est);
        assert_eq!(best1.unwrap().ref_start, 1000);
        assert_eq!(best2.unwrap().ref_start, 50_000);
        assert_eq!(isize_est.sample_size, before);
    }

    #[test]
    fn no_seeds_no_location() {
        let mut isize_est = InsertSizeDistribution::default();
        let (best1, best2) = get_best_map_location(&[], &[], &mut isize_est);
        assert!(best1.is_none());
        assert!(best2.is_none());
    }
}
