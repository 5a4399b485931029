use serde::{Deserialize, Serialize};

use crate::model::common::election::CandidateId;

/// A candidate profile. Profiles are associated with elections by ID, so the
/// same person can stand in more than one election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: CandidateId,
    /// Display name.
    pub name: String,
    /// Party or affiliation label.
    pub party: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl Candidate {
        pub fn example(id: CandidateId, name: &str, party: &str) -> Self {
            Self {
                id,
                name: name.to_string(),
                party: party.to_string(),
                symbol: None,
                bio: None,
            }
        }
    }
}
