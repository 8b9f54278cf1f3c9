// SAM output
//
// Record emission for the mapping drivers. The writer appends finished
// lines to a caller-owned buffer; headers are produced separately so the
// batch runner can write them once up front. Unmapped mates of a pair are
// placed at their mapped mate's coordinates so downstream sorting keeps
// pairs together.

use crate::cigar::CigarMode;
use crate::details::Details;
use crate::extend::Alignment;
use crate::read::SequenceRecord;
use crate::reference::References;
use std::fmt::Write;

/// SAM flag bit masks (SAM specification v1.6)
pub mod sam_flags {
    pub const PAIRED: u16 = 0x1;
    pub const PROPER_PAIR: u16 = 0x2;
    pub const UNMAPPED: u16 = 0x4;
    pub const MATE_UNMAPPED: u16 = 0x8;
    pub const REVERSE: u16 = 0x10;
    pub const MATE_REVERSE: u16 = 0x20;
    pub const FIRST_IN_PAIR: u16 = 0x40;
    pub const SECOND_IN_PAIR: u16 = 0x80;
    pub const SECONDARY: u16 = 0x100;
}

pub struct Sam<'a> {
    out: &'a mut String,
    references: &'a References,
    cigar_mode: CigarMode,
    output_details: bool,
}

impl<'a> Sam<'a> {
    pub fn new(
        out: &'a mut String,
        references: &'a References,
        cigar_mode: CigarMode,
        output_details: bool,
    ) -> Self {
        Sam {
            out,
            references,
            cigar_mode,
            output_details,
        }
    }

    /// @HD/@SQ/@PG header block
    pub fn header(references: &References, cmd_line: &str) -> String {
        let mut header = String::from("@HD\tVN:1.6\tSO:unsorted\n");
        for ref_id in 0..references.size() {
            let _ = writeln!(
                header,
                "@SQ\tSN:{}\tLN:{}",
                references.name(ref_id),
                references.length(ref_id)
            );
        }
        let _ = writeln!(
            header,
            "@PG\tID:strobemap\tPN:strobemap\tVN:{}\tCL:{}",
            env!("CARGO_PKG_VERSION"),
            cmd_line
        );
        header
    }

    /// Emit one single-end record
    pub fn add(
        &mut self,
        alignment: &Alignment,
        record: &SequenceRecord,
        read_rc: &[u8],
        is_primary: bool,
        details: &Details,
    ) {
        if alignment.is_unaligned {
            self.add_unmapped(record);
            return;
        }
        let mut flags = 0;
        if alignment.is_rc {
            flags |= sam_flags::REVERSE;
        }
        if !is_primary {
            flags |= sam_flags::SECONDARY;
        }
        self.append_mapped(
            record,
            read_rc,
            flags,
            alignment,
            alignment.mapq,
            "*",
            0,
            0,
            is_primary,
            details,
        );
    }

    /// Emit both records of a pair. Unaligned mates are written unmapped
    /// but placed at the mapped mate's coordinates.
    #[allow(clippy::too_many_arguments)]
    pub fn add_pair(
        &mut self,
        alignment1: &Alignment,
        alignment2: &Alignment,
        record1: &SequenceRecord,
        record2: &SequenceRecord,
        read1_rc: &[u8],
        read2_rc: &[u8],
        mapq1: u8,
        mapq2: u8,
        is_proper: bool,
        is_primary: bool,
        details: &[Details; 2],
    ) {
        if alignment1.is_unaligned && alignment2.is_unaligned {
            self.add_unmapped_pair(record1, record2);
            return;
        }

        let mut f1 = sam_flags::PAIRED | sam_flags::FIRST_IN_PAIR;
        let mut f2 = sam_flags::PAIRED | sam_flags::SECOND_IN_PAIR;
        if is_proper {
            f1 |= sam_flags::PROPER_PAIR;
            f2 |= sam_flags::PROPER_PAIR;
        }
        if alignment1.is_unaligned {
            f1 |= sam_flags::UNMAPPED;
            f2 |= sam_flags::MATE_UNMAPPED;
        } else if alignment1.is_rc {
            f1 |= sam_flags::REVERSE;
            f2 |= sam_flags::MATE_REVERSE;
        }
        if alignment2.is_unaligned {
            f2 |= sam_flags::UNMAPPED;
            f1 |= sam_flags::MATE_UNMAPPED;
        } else if alignment2.is_rc {
            f2 |= sam_flags::REVERSE;
            f1 |= sam_flags::MATE_REVERSE;
        }
        if !is_primary {
            f1 |= sam_flags::SECONDARY;
            f2 |= sam_flags::SECONDARY;
        }

        let (tlen1, tlen2) = template_lengths(alignment1, alignment2);

        self.append_pair_record(
            record1,
            read1_rc,
            f1,
            alignment1,
            alignment2,
            mapq1,
            tlen1,
            is_primary,
            &details[0],
        );
        self.append_pair_record(
            record2,
            read2_rc,
            f2,
            alignment2,
            alignment1,
            mapq2,
            tlen2,
            is_primary,
            &details[1],
        );
    }

    pub fn add_unmapped(&mut self, record: &SequenceRecord) {
        self.append_unmapped(record, sam_flags::UNMAPPED, None);
    }

    pub fn add_unmapped_pair(&mut self, record1: &SequenceRecord, record2: &SequenceRecord) {
        let common = sam_flags::PAIRED | sam_flags::UNMAPPED | sam_flags::MATE_UNMAPPED;
        self.append_unmapped(record1, common | sam_flags::FIRST_IN_PAIR, None);
        self.append_unmapped(record2, common | sam_flags::SECOND_IN_PAIR, None);
    }

    #[allow(clippy::too_many_arguments)]
    fn append_mapped(
        &mut self,
        record: &SequenceRecord,
        read_rc: &[u8],
        flags: u16,
        alignment: &Alignment,
        mapq: u8,
        rnext: &str,
        pnext: usize,
        tlen: i64,
        output_seq: bool,
        details: &Details,
    ) {
        let rname = self.references.name(alignment.ref_id);
        let cigar = alignment.cigar.render(self.cigar_mode);
        let (seq, qual) = if output_seq {
            oriented(record, alignment.is_rc, read_rc)
        } else {
            // Secondary records do not repeat the sequence
            ("*".to_string(), "*".to_string())
        };
        let _ = write!(
            self.out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\tNM:i:{}\tAS:i:{}",
            record.name,
            flags,
            rname,
            alignment.ref_start + 1,
            mapq,
            cigar,
            rnext,
            pnext,
            tlen,
            seq,
            qual,
            alignment.edit_distance,
            alignment.score,
        );
        self.append_details(details);
        self.out.push('\n');
    }

    /// One mate of a pair; handles the unaligned-but-paired case
    #[allow(clippy::too_many_arguments)]
    fn append_pair_record(
        &mut self,
        record: &SequenceRecord,
        read_rc: &[u8],
        flags: u16,
        alignment: &Alignment,
        mate: &Alignment,
        mapq: u8,
        tlen: i64,
        is_primary: bool,
        details: &Details,
    ) {
        if alignment.is_unaligned {
            // Place the unmapped mate at its aligned partner's coordinates
            let placement = (!mate.is_unaligned).then(|| (mate.ref_id, mate.ref_start));
            self.append_unmapped(record, flags, placement);
            return;
        }
        let (rnext, pnext) = if mate.is_unaligned {
            ("=", alignment.ref_start + 1)
        } else if mate.ref_id == alignment.ref_id {
            ("=", mate.ref_start + 1)
        } else {
            (self.references.name(mate.ref_id), mate.ref_start + 1)
        };
        self.append_mapped(
            record, read_rc, flags, alignment, mapq, rnext, pnext, tlen, is_primary, details,
        );
    }

    fn append_unmapped(
        &mut self,
        record: &SequenceRecord,
        flags: u16,
        placement: Option<(usize, usize)>,
    ) {
        let (rname, pos, rnext, pnext) = match placement {
            Some((ref_id, ref_start)) => {
                let name = self.references.name(ref_id);
                (name, ref_start + 1, "=", ref_start + 1)
            }
            None => ("*", 0, "*", 0),
        };
        let _ = writeln!(
            self.out,
            "{}\t{}\t{}\t{}\t0\t*\t{}\t{}\t0\t{}\t{}",
            record.name,
            flags,
            rname,
            pos,
            rnext,
            pnext,
            String::from_utf8_lossy(&record.seq),
            render_qual(&record.qual, false),
        );
    }

    fn append_details(&mut self, details: &Details) {
        if !self.output_details {
            return;
        }
        let _ = write!(
            self.out,
            "\tna:i:{}\tnr:i:{}\tal:i:{}\tga:i:{}\tmr:i:{}",
            details.nams,
            u8::from(details.nam_rescue),
            details.tried_alignment,
            details.gapped,
            details.mate_rescue,
        );
    }
}

/// SEQ/QUAL on the strand the alignment was made on
fn oriented(record: &SequenceRecord, is_rc: bool, read_rc: &[u8]) -> (String, String) {
    let seq = if is_rc { read_rc } else { &record.seq };
    (
        String::from_utf8_lossy(seq).into_owned(),
        render_qual(&record.qual, is_rc),
    )
}

fn render_qual(qual: &[u8], reversed: bool) -> String {
    if qual.is_empty() {
        return "*".to_string();
    }
    if reversed {
        qual.iter().rev().map(|&q| q as char).collect()
    } else {
        String::from_utf8_lossy(qual).into_owned()
    }
}

/// Signed template lengths for the two mates: outer distance, positive for
/// the leftmost mate. Zero when the mates are unaligned or on different
/// contigs.
fn template_lengths(alignment1: &Alignment, alignment2: &Alignment) -> (i64, i64) {
    if alignment1.is_unaligned || alignment2.is_unaligned || alignment1.ref_id != alignment2.ref_id
    {
        return (0, 0);
    }
    let start1 = alignment1.ref_start as i64;
    let end1 = start1 + alignment1.length as i64;
    let start2 = alignment2.ref_start as i64;
    let end2 = start2 + alignment2.length as i64;
    let outer = end1.max(end2) - start1.min(start2);
    if start1 <= start2 {
        (outer, -outer)
    } else {
        (-outer, outer)
    }
}
