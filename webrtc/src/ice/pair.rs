//! ICE pairs that combine local and remote candidates.

/// Candidate pair entry of a statistics snapshot. Sides refer to candidate ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidatePairRecord {
    pub id: String,
    pub local_candidate_id: String,
    pub remote_candidate_id: String,
    pub state: CandidatePairState,
    pub nominated: bool,
}

/// Possible states during the life cycle of an ICE pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidatePairState {
    Frozen,
    Waiting,
    InProgress,
    Succeeded,
    Failed,
}

impl CandidatePairRecord {
    pub fn new(id: impl Into<String>, local: impl Into<String>, remote: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            local_candidate_id: local.into(),
            remote_candidate_id: remote.into(),
            state: CandidatePairState::Frozen,
            nominated: false,
        }
    }

    pub fn is_selected(&self) -> bool {
        self.nominated && self.state == CandidatePairState::Succeeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_pair_is_frozen() {
        let pair = CandidatePairRecord::new("pair-1", "local-1", "remote-1");
        assert_eq!(pair.state, CandidatePairState::Frozen);
        assert!(!pair.is_selected());
    }

    #[test]
    fn test_nominated_succeeded_pair_is_selected() {
        let mut pair = CandidatePairRecord::new("pair-1", "local-1", "remote-1");
        pair.state = CandidatePairState::Succeeded;
        pair.nominated = true;
        assert!(pair.is_selected());
    }
}
