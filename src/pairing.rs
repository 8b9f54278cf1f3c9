// Pair scoring
//
// Joint evaluation of mate placements: proper-pair predicates at seed and
// alignment level, enumeration of candidate seed pairs, and insert-size
// weighted scoring of alignment pairs. Distances are weighted by a normal
// density over the current insert-size estimate; placements outside the
// envelope fall back to a flat penalty.

use crate::extend::Alignment;
use crate::nam::Nam;
use rustc_hash::FxHashSet;

const INV_SQRT_2PI: f32 = 0.398_942_28;

/// Density of N(m, s) at x. A degenerate spread carries no insert-size
/// information and yields density zero, keeping downstream log-weights
/// totally ordered.
pub fn normal_pdf(x: f32, m: f32, s: f32) -> f32 {
    if s <= 0.0 {
        return 0.0;
    }
    let a = (x - m) / s;
    INV_SQRT_2PI / s * (-0.5 * a * a).exp()
}

/// Whether two seeds are placed like a proper forward-reverse pair within
/// mu + 10 sigma. Both projected offsets are computed from the second
/// seed's query start; downstream results depend on this exact arithmetic.
pub fn is_proper_nam_pair(nam1: &Nam, nam2: &Nam, mu: f32, sigma: f32) -> bool {
    if nam1.ref_id != nam2.ref_id || nam1.is_rc == nam2.is_rc {
        return false;
    }
    let a = nam1.ref_start.saturating_sub(nam2.query_start);
    let b = nam2.ref_start.saturating_sub(nam2.query_start);

    // r1 ---> <---- r2
    let r1_r2 = nam2.is_rc && a <= b && ((b - a) as f32) < mu + 10.0 * sigma;
    // r2 ---> <---- r1
    let r2_r1 = nam1.is_rc && b <= a && ((a - b) as f32) < mu + 10.0 * sigma;

    r1_r2 || r2_r1
}

/// Proper-pair predicate on finished alignments: same contig, opposite
/// strands, forward mate upstream of the reverse mate, inner distance
/// within mu + 10 sigma.
pub fn is_proper_pair(alignment1: &Alignment, alignment2: &Alignment, mu: f32, sigma: f32) -> bool {
    if alignment1.is_unaligned
        || alignment2.is_unaligned
        || alignment1.ref_id != alignment2.ref_id
    {
        return false;
    }
    let dist = alignment2.ref_start as i64 - alignment1.ref_start as i64;
    // r1 ---> <---- r2
    let r1_r2 = !alignment1.is_rc && alignment2.is_rc && dist >= 0;
    // r2 ---> <---- r1
    let r2_r1 = !alignment2.is_rc && alignment1.is_rc && dist <= 0;
    let insert_good = (dist.unsigned_abs() as f32) < mu + 10.0 * sigma;

    (r1_r2 || r2_r1) && insert_good
}

/// One candidate placement of a read pair. A one-sided candidate means the
/// other mate had no seed there and must be rescued from this one.
#[derive(Debug, Clone, Copy)]
pub enum NamPair {
    Both(Nam, Nam),
    OnlyRead1(Nam),
    OnlyRead2(Nam),
}

/// Enumerate candidate seed pairs, highest joint hit count first.
///
/// Proper pairs contribute the sum of their hit counts. Seeds that did not
/// pair up but still carry at least half the hits of the stronger of the
/// best joint candidate and their read's own top seed are appended as
/// one-sided candidates. The inner enumeration stops early once joint hit
/// counts fall below half the best seen.
pub fn get_best_scoring_nam_pairs(
    nams1: &[Nam],
    nams2: &[Nam],
    mu: f32,
    sigma: f32,
) -> Vec<(usize, NamPair)> {
    let mut joint_nam_scores = Vec::new();
    if nams1.is_empty() && nams2.is_empty() {
        return joint_nam_scores;
    }

    let mut added_n1: FxHashSet<usize> = FxHashSet::default();
    let mut added_n2: FxHashSet<usize> = FxHashSet::default();
    let mut highest_joint_hits = 0;
    for nam1 in nams1 {
        for nam2 in nams2 {
            if nam1.n_hits + nam2.n_hits < highest_joint_hits / 2 {
                break;
            }
            if is_proper_nam_pair(nam1, nam2, mu, sigma) {
                let joint_hits = nam1.n_hits + nam2.n_hits;
                joint_nam_scores.push((joint_hits, NamPair::Both(*nam1, *nam2)));
                added_n1.insert(nam1.nam_id);
                added_n2.insert(nam2.nam_id);
                highest_joint_hits = highest_joint_hits.max(joint_hits);
            }
        }
    }

    if let Some(first) = nams1.first() {
        let cutoff = highest_joint_hits.max(first.n_hits);
        for nam1 in nams1 {
            if nam1.n_hits < cutoff / 2 {
                break;
            }
            if added_n1.contains(&nam1.nam_id) {
                continue;
            }
            joint_nam_scores.push((nam1.n_hits, NamPair::OnlyRead1(*nam1)));
        }
    }

    if let Some(first) = nams2.first() {
        let cutoff = highest_joint_hits.max(first.n_hits);
        for nam2 in nams2 {
            if nam2.n_hits < cutoff / 2 {
                break;
            }
            if added_n2.contains(&nam2.nam_id) {
                continue;
            }
            joint_nam_scores.push((nam2.n_hits, NamPair::OnlyRead2(*nam2)));
        }
    }

    joint_nam_scores.sort_by(|a, b| b.0.cmp(&a.0));
    joint_nam_scores
}

/// One scored combination of mate alignments
#[derive(Debug, Clone)]
pub struct ScoredAlignmentPair {
    pub score: f64,
    pub alignment1: Alignment,
    pub alignment2: Alignment,
}

/// Pair score of two mate alignments: the sum of their scores plus the
/// log-density of the observed distance when the placements look like a
/// pair, or a flat penalty when they do not.
fn pair_score(alignment1: &Alignment, alignment2: &Alignment, mu: f32, sigma: f32) -> f64 {
    let dist = alignment1.ref_start.abs_diff(alignment2.ref_start) as f32;
    let mut score = alignment1.score as f64 + alignment2.score as f64;
    if (alignment1.is_rc ^ alignment2.is_rc) && dist < mu + 4.0 * sigma {
        score += (normal_pdf(dist, mu, sigma) as f64).ln();
    } else {
        // matches a log-density more than four standard deviations out
        score -= 10.0;
    }
    score
}

/// Score every combination of mate alignments, highest first
pub fn get_best_scoring_pairs(
    alignments1: &[Alignment],
    alignments2: &[Alignment],
    mu: f32,
    sigma: f32,
) -> Vec<ScoredAlignmentPair> {
    let mut pairs = Vec::with_capacity(alignments1.len() * alignments2.len());
    for alignment1 in alignments1 {
        for alignment2 in alignments2 {
            pairs.push(ScoredAlignmentPair {
                score: pair_score(alignment1, alignment2, mu, sigma),
                alignment1: alignment1.clone(),
                alignment2: alignment2.clone(),
            });
        }
    }
    pairs.sort_by(|a, b| b.score.total_cmp(&a.score));
    pairs
}

/// Hit-count dropoff of the top seed: how close the runner-up comes.
/// Low-evidence top seeds (at most two hits) report 1.0 so that callers
/// never shortcut on them.
pub fn top_dropoff(nams: &[Nam]) -> f32 {
    let n_max = &nams[0];
    if n_max.n_hits <= 2 {
        return 1.0;
    }
    if nams.len() > 1 {
        nams[1].n_hits as f32 / n_max.n_hits as f32
    } else {
        0.0
    }
}
