use serde::{Deserialize, Serialize};

use crate::model::common::election::{CandidateId, ElectionId};

/// One candidate's share of an election's ballots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub candidate_id: CandidateId,
    pub name: String,
    pub party: String,
    pub votes: u64,
    /// Share of all counted ballots, in the range `0.0..=100.0`. Unrounded.
    pub percentage: f64,
}

/// The tally of an election.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectionResult {
    pub election_id: ElectionId,
    pub title: String,
    pub total_votes: u64,
    /// Every candidate, most votes first; ties are ordered by candidate ID.
    pub results: Vec<CandidateResult>,
    /// The leading candidate. With zero ballots this is still the first
    /// candidate by tie-break, so check `total_votes` before calling it a win.
    pub winner: Option<CandidateResult>,
}
