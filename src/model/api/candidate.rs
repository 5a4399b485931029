use serde::{Deserialize, Serialize};

use crate::model::{common::election::CandidateId, db::candidate::Candidate};

/// A candidate profile specification, as submitted by an admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub name: String,
    pub party: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

impl CandidateSpec {
    /// Convert this spec into a profile with the given unique ID.
    pub fn into_candidate(self, id: CandidateId) -> Candidate {
        Candidate {
            id,
            name: self.name,
            party: self.party,
            symbol: self.symbol,
            bio: self.bio,
        }
    }
}
