use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::common::election::{CandidateId, ElectionId, WindowState};

/// A view on just the election's top-level metadata.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct ElectionMetadata {
    /// Election title.
    pub title: String,
    /// Free-text description.
    pub description: String,
    /// Voting opens at this instant.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub start_time: DateTime<Utc>,
    /// Voting closes at this instant (exclusive).
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end_time: DateTime<Utc>,
    /// Administrative kill-switch, independent of the schedule.
    pub is_active: bool,
}

/// Core election data, as stored in the database.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Election {
    /// Unique ID.
    #[serde(rename = "_id")]
    pub id: ElectionId,
    /// Top-level metadata.
    #[serde(flatten)]
    pub metadata: ElectionMetadata,
    /// Candidates standing in this election. Profiles live in their own
    /// collection and may be shared between elections.
    pub candidates: Vec<CandidateId>,
}

impl Election {
    /// Where this election sits relative to its voting window at `now`.
    pub fn window_state(&self, now: DateTime<Utc>) -> WindowState {
        if !self.metadata.is_active {
            WindowState::Deactivated
        } else if now < self.metadata.start_time {
            WindowState::NotYetOpen
        } else if now >= self.metadata.end_time {
            WindowState::Closed
        } else {
            WindowState::Open
        }
    }

    /// Is this election accepting ballots at `now`?
    pub fn is_open_for_voting(&self, now: DateTime<Utc>) -> bool {
        self.window_state(now).is_open()
    }

    /// Does the given candidate stand in this election?
    pub fn has_candidate(&self, candidate_id: CandidateId) -> bool {
        self.candidates.contains(&candidate_id)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, TimeZone};

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        (start, start + Duration::hours(8))
    }

    #[test]
    fn window_is_half_open() {
        let (start, end) = window();
        let election = Election::example_between(1, vec![1, 2], start, end);

        assert_eq!(
            election.window_state(start - Duration::seconds(1)),
            WindowState::NotYetOpen
        );
        assert_eq!(election.window_state(start), WindowState::Open);
        assert_eq!(
            election.window_state(end - Duration::milliseconds(1)),
            WindowState::Open
        );
        assert_eq!(election.window_state(end), WindowState::Closed);
        assert_eq!(
            election.window_state(end + Duration::days(3)),
            WindowState::Closed
        );
    }

    #[test]
    fn deactivated_overrides_schedule() {
        let (start, end) = window();
        let mut election = Election::example_between(1, vec![1], start, end);
        election.metadata.is_active = false;

        for now in [start - Duration::hours(1), start, end] {
            assert_eq!(election.window_state(now), WindowState::Deactivated);
            assert!(!election.is_open_for_voting(now));
        }
    }

    #[test]
    fn open_predicate_matches_state() {
        let (start, end) = window();
        let election = Election::example_between(1, vec![1], start, end);
        assert!(election.is_open_for_voting(start + Duration::hours(1)));
        assert!(!election.is_open_for_voting(end));
    }

    #[test]
    fn candidate_membership() {
        let election = Election::current_example(4, vec![10, 11]);
        assert!(election.has_candidate(10));
        assert!(!election.has_candidate(12));
    }
}
