//! Statistics snapshot returned by the native connection.

use std::collections::BTreeMap;

use super::candidate::{CandidateInfo, CandidateRecord};
use super::pair::CandidatePairRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsEntry {
    CandidatePair(CandidatePairRecord),
    LocalCandidate(CandidateRecord),
    RemoteCandidate(CandidateRecord),
    /// Any entry the negotiation layer does not inspect, by type name.
    Other(String),
}

/// Entries keyed by their stats id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    entries: BTreeMap<String, StatsEntry>,
}

impl StatsSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, entry: StatsEntry) {
        self.entries.insert(id.into(), entry);
    }

    pub fn get(&self, id: &str) -> Option<&StatsEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn candidate_pairs(&self) -> impl Iterator<Item = &CandidatePairRecord> {
        self.entries.values().filter_map(|entry| match entry {
            StatsEntry::CandidatePair(pair) => Some(pair),
            _ => None,
        })
    }

    /// Local or remote candidate record by id.
    pub fn candidate(&self, id: &str) -> Option<&CandidateRecord> {
        match self.entries.get(id)? {
            StatsEntry::LocalCandidate(record) | StatsEntry::RemoteCandidate(record) => Some(record),
            _ => None,
        }
    }
}

/// Local and remote candidates referenced by every pair, skipping missing sides.
pub fn candidate_pair_infos(snapshot: &StatsSnapshot) -> (Vec<CandidateInfo>, Vec<CandidateInfo>) {
    let mut local = Vec::new();
    let mut remote = Vec::new();

    for pair in snapshot.candidate_pairs() {
        if let Some(info) = CandidateInfo::extract(snapshot.candidate(&pair.local_candidate_id)) {
            local.push(info);
        }
        if let Some(info) = CandidateInfo::extract(snapshot.candidate(&pair.remote_candidate_id)) {
            remote.push(info);
        }
    }

    (local, remote)
}
