//! Read-alignment core for a strobemer-seeded short-read mapper.
//!
//! Seeds (NAMs) produced by an upstream index are verified, extended into
//! base-level alignments and emitted as SAM or PAF records; paired-end
//! mapping jointly scores mate placements under an online insert-size
//! model and can rescue a mate whose own seeding failed.

pub mod aligner;
pub mod batch;
pub mod cigar;
pub mod details;
pub mod extend;
pub mod insert_size;
pub mod mapper;
pub mod mapq;
pub mod mate_rescue;
pub mod nam;
pub mod paf;
pub mod paired_end;
pub mod pairing;
pub mod read;
pub mod reference;
pub mod sam;
pub mod single_end;

pub use aligner::{Aligner, Scores};
pub use details::MappingStatistics;
pub use insert_size::InsertSizeDistribution;
pub use mapper::{map_paired_end_read, map_single_end_read, MappingParameters};
pub use nam::{Nam, SeedFinder};
pub use read::SequenceRecord;
pub use reference::References;
