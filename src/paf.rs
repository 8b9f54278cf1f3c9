// PAF output
//
// Mapping-only mode reports the best seed per read as one PAF line and
// skips base-level alignment entirely. Column 10 carries the seed hit
// count; no per-base identity is available on this path, so MAPQ is 255.

use crate::nam::Nam;
use crate::reference::References;
use std::fmt::Write;

/// Report the best seed of a single-end read; unmapped reads produce no
/// output in PAF mode.
pub fn output_hits_paf(
    out: &mut String,
    nams: &[Nam],
    query_name: &str,
    references: &References,
    read_len: usize,
) {
    output_paf_hit(out, nams.first(), query_name, references, read_len);
}

/// Report one chosen seed (paired-end callers pass the jointly selected
/// location per mate)
pub fn output_paf_hit(
    out: &mut String,
    nam: Option<&Nam>,
    query_name: &str,
    references: &References,
    read_len: usize,
) {
    let Some(nam) = nam else {
        return;
    };
    let strand = if nam.is_rc { '-' } else { '+' };
    let _ = writeln!(
        out,
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t255",
        query_name,
        read_len,
        nam.query_start,
        nam.query_end,
        strand,
        references.name(nam.ref_id),
        references.length(nam.ref_id),
        nam.ref_start,
        nam.ref_end,
        nam.n_hits,
        nam.ref_span(),
    );
}
