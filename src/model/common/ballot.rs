use crate::model::mongodb::Id;

/// Voters are identified by the opaque ID their auth token carries.
pub type VoterId = Id;
/// Our ballot IDs are database object IDs.
pub type BallotId = Id;
