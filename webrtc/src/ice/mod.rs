//! Module that groups candidate records, pairs and statistics snapshots.

mod candidate;
mod pair;
mod stats;

pub use candidate::{
    CandidateInfo, CandidateRecord, CandidateType, IceCandidateInit, UnknownCandidateType,
};
pub use pair::{CandidatePairRecord, CandidatePairState};
pub use stats::{candidate_pair_infos, StatsEntry, StatsSnapshot};
