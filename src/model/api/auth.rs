use std::fmt::Display;
use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use rocket::{
    http::{Cookie, SameSite, Status},
    outcome::{try_outcome, IntoOutcome},
    request::{FromRequest, Outcome},
    time::Duration,
    Request, State,
};
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::config::Config;
use crate::error::Error;
use crate::model::mongodb::Id;

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// Different privilege levels.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Rights {
    Voter = 0,
    Admin = 1,
}

impl Display for Rights {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::Voter => "voter",
                Self::Admin => "admin",
            }
        )
    }
}

/// A kind of authenticated principal, having defined rights.
pub trait Principal {
    /// The rights of this principal type.
    const RIGHTS: Rights;
}

/// A voter, as authenticated by the login layer.
pub struct Voter;

/// An administrator, as authenticated by the login layer.
pub struct Admin;

impl Principal for Voter {
    const RIGHTS: Rights = Rights::Voter;
}

impl Principal for Admin {
    const RIGHTS: Rights = Rights::Admin;
}

/// An authentication token representing a specific principal with specific rights.
///
/// Tokens are minted by the login layer, which shares our `jwt_secret`. The
/// core never reads identity from anywhere else: handlers pull the ID out
/// of the token and pass it on explicitly.
#[derive(Serialize, Deserialize)]
pub struct AuthToken<U> {
    pub id: Id,
    #[serde(rename = "rgt")]
    pub rights: Rights,
    #[serde(skip)]
    phantom: PhantomData<U>,
}

impl<U> AuthToken<U> {
    /// The ID of the authenticated principal.
    pub fn id(&self) -> Id {
        self.id
    }

    /// Does this token permit the given rights?
    pub fn permits(&self, target: Rights) -> bool {
        self.rights == target
    }
}

impl<U> AuthToken<U>
where
    U: Principal,
{
    /// Create a new [`AuthToken`] for the given ID, with the rights of the principal type.
    pub fn new(id: Id) -> Self {
        Self {
            id,
            rights: U::RIGHTS,
            phantom: PhantomData,
        }
    }

    #[allow(clippy::missing_panics_doc)]
    /// Serialize this token into a cookie.
    pub fn into_cookie(self, config: &Config) -> Cookie<'static> {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
        .expect("JWT encoding is infallible with default settings");

        Cookie::build(AUTH_TOKEN_COOKIE, token)
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish()
    }

    /// Deserialize a token from a cookie.
    pub fn from_cookie(cookie: &Cookie<'_>, config: &Config) -> Result<Self, Error> {
        let token = jsonwebtoken::decode(
            cookie.value(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims<U>>| claims.claims.token)?;
        Ok(token)
    }
}

/// Cookie claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims<U> {
    #[serde(flatten, bound = "")]
    token: AuthToken<U>,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r, U> FromRequest<'r> for AuthToken<U>
where
    U: Principal + Send,
{
    type Error = Error;

    /// Get an [`AuthToken`] from the cookie and verify that it has the correct rights for this
    /// principal type.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        // Forward to any routes that do not require an authentication token.
        let cookie = try_outcome!(req.cookies().get(AUTH_TOKEN_COOKIE).or_forward(()));

        // A token that is present but broken or expired is an error, not a forward.
        let token: Self = match Self::from_cookie(cookie, config) {
            Ok(token) => token,
            Err(e) => return Outcome::Failure((Status::Unauthorized, e)),
        };

        if !token.permits(U::RIGHTS) {
            return Outcome::Forward(());
        }

        Outcome::Success(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips_through_cookie() {
        let config = Config::example();
        let id = Id::new();

        let cookie = AuthToken::<Voter>::new(id).into_cookie(&config);
        assert_eq!(cookie.name(), AUTH_TOKEN_COOKIE);

        let token = AuthToken::<Voter>::from_cookie(&cookie, &config).unwrap();
        assert_eq!(token.id(), id);
        assert!(token.permits(Rights::Voter));
        assert!(!token.permits(Rights::Admin));
    }

    #[test]
    fn admin_token_carries_admin_rights() {
        let config = Config::example();
        let cookie = AuthToken::<Admin>::new(Id::new()).into_cookie(&config);
        let token = AuthToken::<Voter>::from_cookie(&cookie, &config).unwrap();
        // Decoding does not check rights; the request guard does.
        assert_eq!(token.rights, Rights::Admin);
        assert!(!token.permits(Voter::RIGHTS));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let config = Config::example();
        let cookie = AuthToken::<Voter>::new(Id::new()).into_cookie(&config);

        let other = Config::with_secret("a different secret");
        assert!(matches!(
            AuthToken::<Voter>::from_cookie(&cookie, &other),
            Err(Error::Jwt(_))
        ));
    }
}
