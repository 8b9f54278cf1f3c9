// Mapping counters
//
// `Details` is filled while one record (or record pair) is mapped and
// merged into the run-level `MappingStatistics` afterwards. Purely
// observational; nothing in the drivers branches on these.

use std::ops::AddAssign;

#[derive(Debug, Clone, Copy, Default)]
pub struct Details {
    /// Seed rescue producer was invoked for this read
    pub nam_rescue: bool,
    /// Number of seeds the producer returned
    pub nams: usize,
    /// Seeds whose flanks matched neither orientation
    pub nam_inconsistent: usize,
    /// Base-level extensions attempted
    pub tried_alignment: usize,
    /// Extensions that took the gapped path
    pub gapped: usize,
    /// Mate rescue alignments actually attempted
    pub mate_rescue: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MappingStatistics {
    pub reads: usize,
    pub nams: usize,
    pub nam_rescue: usize,
    pub nam_inconsistent: usize,
    pub tried_alignment: usize,
    pub gapped: usize,
    pub mate_rescue: usize,
}

impl AddAssign<Details> for MappingStatistics {
    fn add_assign(&mut self, details: Details) {
        self.reads += 1;
        self.nams += details.nams;
        self.nam_rescue += usize::from(details.nam_rescue);
        self.nam_inconsistent += details.nam_inconsistent;
        self.tried_alignment += details.tried_alignment;
        self.gapped += details.gapped;
        self.mate_rescue += details.mate_rescue;
    }
}

impl AddAssign for MappingStatistics {
    fn add_assign(&mut self, other: MappingStatistics) {
        self.reads += other.reads;
        self.nams += other.nams;
        self.nam_rescue += other.nam_rescue;
        self.nam_inconsistent += other.nam_inconsistent;
        self.tried_alignment += other.tried_alignment;
        self.gapped += other.gapped;
        self.mate_rescue += other.mate_rescue;
    }
}
