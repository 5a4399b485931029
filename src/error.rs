use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use mongodb::error::Error as DbError;
use rocket::{http::Status, response::Responder, Request};
use thiserror::Error;

use crate::store::StoreError;
use crate::voting::{LookupError, TallyError, VoteError};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Vote(#[from] VoteError),
    #[error(transparent)]
    Tally(#[from] TallyError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    pub fn not_found(what: String) -> Self {
        Self::Status(Status::NotFound, format!("Not found: {what}"))
    }

    /// The HTTP status this error is reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::Db(_) => Status::ServiceUnavailable,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::BadRequest,
            },
            Self::Store(err) => store_status(err),
            Self::Vote(err) => match err {
                VoteError::ElectionNotFound(_) => Status::NotFound,
                VoteError::VotingClosed { .. } => Status::Forbidden,
                VoteError::InvalidCandidate { .. } => Status::BadRequest,
                VoteError::AlreadyVoted(_) => Status::Conflict,
                VoteError::StoreUnavailable(err) => store_status(err),
            },
            Self::Tally(err) => match err {
                TallyError::ElectionNotFound(_) => Status::NotFound,
                TallyError::StoreUnavailable(err) => store_status(err),
            },
            Self::Lookup(err) => match err {
                LookupError::ElectionNotFound(_) => Status::NotFound,
                LookupError::StoreUnavailable(err) => store_status(err),
            },
            Self::Status(status, _) => *status,
        }
    }
}

/// Transient failures are worth a retry (503). A store breaking its own
/// contract is a server fault (500).
fn store_status(err: &StoreError) -> Status {
    if err.is_transient() {
        Status::ServiceUnavailable
    } else {
        Status::InternalServerError
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        if status.code >= 500 {
            error!("{} {}: {self}", req.method(), req.uri());
        } else {
            debug!("{} {}: {self}", req.method(), req.uri());
        }
        (status, self.to_string()).respond_to(req)
    }
}
