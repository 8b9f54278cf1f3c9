// Reference store
//
// Immutable per-session contig storage, shared read-only by all mapping
// drivers. Construction is the embedding program's concern; the core only
// reads sequence windows and lengths out of it.

#[derive(Debug, Clone, Default)]
pub struct References {
    pub names: Vec<String>,
    pub sequences: Vec<Vec<u8>>,
}

impl References {
    pub fn new(contigs: Vec<(String, Vec<u8>)>) -> Self {
        let mut names = Vec::with_capacity(contigs.len());
        let mut sequences = Vec::with_capacity(contigs.len());
        for (name, sequence) in contigs {
            names.push(name);
            sequences.push(sequence);
        }
        References { names, sequences }
    }

    pub fn size(&self) -> usize {
        self.sequences.len()
    }

    pub fn length(&self, ref_id: usize) -> usize {
        self.sequences[ref_id].len()
    }

    pub fn sequence(&self, ref_id: usize) -> &[u8] {
        &self.sequences[ref_id]
    }

    pub fn name(&self, ref_id: usize) -> &str {
        &self.names[ref_id]
    }
}
