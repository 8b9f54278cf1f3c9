// CIGAR handling
//
// Run-length encoded per-base alignment operations. Alignments are built
// with distinct match (=) and mismatch (X) operations; the writer can
// collapse both to M for tools that do not understand the extended form.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CigarOperation {
    Match,    // M
    Insert,   // I
    Deletion, // D
    SoftClip, // S
    Eq,       // =
    Diff,     // X
}

impl CigarOperation {
    pub fn as_char(self) -> char {
        match self {
            CigarOperation::Match => 'M',
            CigarOperation::Insert => 'I',
            CigarOperation::Deletion => 'D',
            CigarOperation::SoftClip => 'S',
            CigarOperation::Eq => '=',
            CigarOperation::Diff => 'X',
        }
    }

    /// Whether the operation consumes query bases
    pub fn consumes_query(self) -> bool {
        !matches!(self, CigarOperation::Deletion)
    }

    /// Whether the operation consumes reference bases
    pub fn consumes_reference(self) -> bool {
        matches!(
            self,
            CigarOperation::Match | CigarOperation::Deletion | CigarOperation::Eq | CigarOperation::Diff
        )
    }
}

/// How =/X operations are rendered on output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CigarMode {
    /// Collapse = and X to M
    #[default]
    M,
    /// Keep the distinct =/X operations
    Eqx,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cigar {
    ops: Vec<(CigarOperation, usize)>,
}

impl Cigar {
    pub fn new() -> Self {
        Cigar { ops: Vec::new() }
    }

    /// Append an operation, merging with the previous one if it is the same
    pub fn push(&mut self, op: CigarOperation, len: usize) {
        if len == 0 {
            return;
        }
        match self.ops.last_mut() {
            Some((last_op, last_len)) if *last_op == op => *last_len += len,
            _ => self.ops.push((op, len)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[(CigarOperation, usize)] {
        &self.ops
    }

    pub fn query_span(&self) -> usize {
        self.ops
            .iter()
            .filter(|(op, _)| op.consumes_query() && *op != CigarOperation::SoftClip)
            .map(|(_, len)| len)
            .sum()
    }

    pub fn reference_span(&self) -> usize {
        self.ops
            .iter()
            .filter(|(op, _)| op.consumes_reference())
            .map(|(_, len)| len)
            .sum()
    }

    /// Copy with = and X collapsed to M
    pub fn to_m(&self) -> Cigar {
        let mut cigar = Cigar::new();
        for &(op, len) in &self.ops {
            let op = match op {
                CigarOperation::Eq | CigarOperation::Diff => CigarOperation::Match,
                other => other,
            };
            cigar.push(op, len);
        }
        cigar
    }

    pub fn render(&self, mode: CigarMode) -> String {
        match mode {
            CigarMode::M => self.to_m().to_string(),
            CigarMode::Eqx => self.to_string(),
        }
    }
}

impl fmt::Display for Cigar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ops.is_empty() {
            return write!(f, "*");
        }
        for &(op, len) in &self.ops {
            write!(f, "{}{}", len, op.as_char())?;
        }
        Ok(())
    }
}
