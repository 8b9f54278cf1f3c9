// Mate rescue
//
// When one mate of a pair has no usable placement of its own, a reference
// window is synthesized from the other mate's seed under forward-reverse
// orientation and the insert-size estimate, and the missing mate is force
// aligned into it. Rescue alignment is expensive, so two cheap gates run
// first: the window must be at least k long, and the mate must share at
// least one short substring with it.

use crate::aligner::Aligner;
use crate::cigar::Cigar;
use crate::extend::{reverse_nam_if_needed, Alignment};
use crate::nam::Nam;
use crate::read::Read;
use crate::reference::References;

/*
 * Determine (roughly) whether the read has some l-mer (l = 2k/3) in common
 * with the reference window, sampling query positions at stride k/3.
 */
pub fn has_shared_substring(read_seq: &[u8], ref_seq: &[u8], k: usize) -> bool {
    let sub_size = 2 * k / 3;
    let step_size = (k / 3).max(1);
    if sub_size == 0 || ref_seq.len() < sub_size {
        return false;
    }
    let mut i = 0;
    while i + sub_size < read_seq.len() {
        let submer = &read_seq[i..i + sub_size];
        if ref_seq.windows(sub_size).any(|window| window == submer) {
            return true;
        }
        i += step_size;
    }
    false
}

fn unaligned_sentinel(nam: &Nam, read_len: usize) -> Alignment {
    Alignment {
        cigar: Cigar::new(),
        edit_distance: read_len,
        global_ed: read_len,
        score: 0,
        ref_start: 0,
        ref_id: nam.ref_id,
        length: 0,
        is_rc: nam.is_rc,
        is_unaligned: true,
        gapped: false,
        mapq: 0,
    }
}

/*
 * Align `read` into the window where its mate's seed expects it.
 *
 * The guide seed is orientation-verified first. A reverse-strand guide
 * places the mate upstream on the forward strand; a forward-strand guide
 * places it downstream on the reverse strand. The window spans mu + 5 sigma
 * away from the guide, allowing at most half a read of overlap.
 *
 * Returns the alignment and whether base-level alignment was actually
 * attempted (false when a gate rejected the window).
 */
pub fn rescue_mate(
    aligner: &Aligner,
    nam: &mut Nam,
    references: &References,
    guide: &Read,
    read: &Read,
    mu: f32,
    sigma: f32,
    k: usize,
) -> (Alignment, bool) {
    let read_len = read.len();

    reverse_nam_if_needed(nam, guide, references, k);
    let (r_tmp, a, b, a_is_rc) = if nam.is_rc {
        // Guide matched the reverse strand, so the mate lies upstream in
        // forward orientation
        let projected = nam.ref_start as i64 - nam.query_start as i64;
        (
            read.seq(),
            projected - (mu + 5.0 * sigma) as i64,
            projected + read_len as i64 / 2,
            false,
        )
    } else {
        // Mate is reverse-complemented downstream (fr orientation)
        let projected = nam.ref_end as i64 + (read_len as i64 - nam.query_end as i64);
        (
            read.rc(),
            projected - read_len as i64 / 2,
            projected + (mu + 5.0 * sigma) as i64,
            true,
        )
    };

    let ref_len = references.length(nam.ref_id) as i64;
    let ref_start = a.clamp(0, ref_len) as usize;
    let ref_end = b.clamp(0, ref_len) as usize;

    if ref_end < ref_start + k {
        log::trace!(
            "mate rescue window [{}, {}) too short on ref {}",
            ref_start,
            ref_end,
            nam.ref_id
        );
        return (unaligned_sentinel(nam, read_len), false);
    }
    let ref_segment = &references.sequence(nam.ref_id)[ref_start..ref_end];

    if !has_shared_substring(r_tmp, ref_segment, k) {
        log::trace!("mate rescue window shares no substring with the mate, skipping alignment");
        return (unaligned_sentinel(nam, read_len), false);
    }
    let info = aligner.align(r_tmp, ref_segment);

    let alignment = Alignment {
        edit_distance: info.edit_distance,
        global_ed: info.edit_distance + info.query_start + (read_len - info.query_end),
        score: info.score,
        ref_start: ref_start + info.ref_start,
        ref_id: nam.ref_id,
        length: info.ref_span(),
        is_rc: a_is_rc,
        is_unaligned: info.cigar.is_empty(),
        gapped: true,
        mapq: 0,
        cigar: info.cigar,
    };
    (alignment, true)
}
