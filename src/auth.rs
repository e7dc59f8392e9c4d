use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::ApiError;

const HASH_COST: u32 = 10;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("missing {0} header")]
    MissingToken(&'static str),
    #[error("invalid token: {0}")]
    InvalidToken(jsonwebtoken::errors::Error),
    #[error("token was issued for the {0:?} role")]
    WrongRole(Role),
    #[error("token subject is not a valid identity")]
    InvalidSubject,
    #[error("failed to sign token: {0}")]
    Sign(jsonwebtoken::errors::Error),
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("password hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Sign(_) | AuthError::Hash(_) | AuthError::Join(_) => {
                ApiError::Internal(err.to_string())
            }
            other => {
                log::debug!("Authentication failed: {}", other);
                ApiError::Unauthorized("Not Authorized Login Again".to_string())
            }
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Doctor,
    Admin,
}

impl Role {
    /// Request header that carries this role's token.
    pub fn header(self) -> &'static str {
        match self {
            Role::User => "token",
            Role::Doctor => "dtoken",
            Role::Admin => "atoken",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub exp: i64,
}

/// The authenticated party behind a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    User(Uuid),
    Doctor(Uuid),
    Admin,
}

/// Issues and checks role-scoped tokens.
#[derive(Clone)]
pub struct Authenticator {
    inner: Arc<Keys>,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    admin_email: String,
}

impl Authenticator {
    pub fn new(secret: &str, ttl: Duration, admin_email: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Keys {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
                ttl,
                admin_email: admin_email.into(),
            }),
        }
    }

    pub fn issue_user(&self, id: Uuid) -> Result<String, AuthError> {
        self.issue(id.to_string(), Role::User, self.inner.ttl)
    }

    pub fn issue_doctor(&self, id: Uuid) -> Result<String, AuthError> {
        self.issue(id.to_string(), Role::Doctor, self.inner.ttl)
    }

    pub fn issue_admin(&self) -> Result<String, AuthError> {
        self.issue(self.inner.admin_email.clone(), Role::Admin, Duration::days(1))
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        self.inner.admin_email == email
    }

    fn issue(&self, sub: String, role: Role, ttl: Duration) -> Result<String, AuthError> {
        let claims = Claims {
            sub,
            role,
            exp: (Utc::now() + ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.inner.encoding).map_err(AuthError::Sign)
    }

    /// Decodes `token` and checks it was minted for `role`.
    pub fn verify(&self, token: &str, role: Role) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(
            token,
            &self.inner.decoding,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(AuthError::InvalidToken)?;

        let claims = data.claims;
        if claims.role != role {
            return Err(AuthError::WrongRole(claims.role));
        }
        Ok(claims)
    }

    pub fn resolve(&self, token: &str, role: Role) -> Result<Caller, AuthError> {
        let claims = self.verify(token, role)?;
        match role {
            Role::User => subject_id(&claims).map(Caller::User),
            Role::Doctor => subject_id(&claims).map(Caller::Doctor),
            Role::Admin if self.is_admin_email(&claims.sub) => Ok(Caller::Admin),
            Role::Admin => Err(AuthError::InvalidSubject),
        }
    }
}

fn subject_id(claims: &Claims) -> Result<Uuid, AuthError> {
    Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidSubject)
}

fn caller_from_parts(
    parts: &Parts,
    auth: &Authenticator,
    role: Role,
) -> Result<Caller, AuthError> {
    let token = parts
        .headers
        .get(role.header())
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or(AuthError::MissingToken(role.header()))?;
    auth.resolve(token, role)
}

/// A caller authenticated through the `token` header.
#[derive(Debug, Clone, Copy)]
pub struct UserAuth(pub Uuid);

/// A caller authenticated through the `dtoken` header.
#[derive(Debug, Clone, Copy)]
pub struct DoctorAuth(pub Uuid);

/// A caller authenticated through the `atoken` header.
#[derive(Debug, Clone, Copy)]
pub struct AdminAuth;

#[async_trait]
impl<S> FromRequestParts<S> for UserAuth
where
    S: Send + Sync,
    Authenticator: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match caller_from_parts(parts, &Authenticator::from_ref(state), Role::User)? {
            Caller::User(id) => Ok(UserAuth(id)),
            _ => Err(AuthError::InvalidSubject.into()),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for DoctorAuth
where
    S: Send + Sync,
    Authenticator: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match caller_from_parts(parts, &Authenticator::from_ref(state), Role::Doctor)? {
            Caller::Doctor(id) => Ok(DoctorAuth(id)),
            _ => Err(AuthError::InvalidSubject.into()),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminAuth
where
    S: Send + Sync,
    Authenticator: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match caller_from_parts(parts, &Authenticator::from_ref(state), Role::Admin)? {
            Caller::Admin => Ok(AdminAuth),
            _ => Err(AuthError::InvalidSubject.into()),
        }
    }
}

impl From<UserAuth> for Caller {
    fn from(auth: UserAuth) -> Self {
        Caller::User(auth.0)
    }
}

impl From<DoctorAuth> for Caller {
    fn from(auth: DoctorAuth) -> Self {
        Caller::Doctor(auth.0)
    }
}

impl From<AdminAuth> for Caller {
    fn from(_: AdminAuth) -> Self {
        Caller::Admin
    }
}

/// Hashes on the blocking pool; bcrypt is deliberately slow.
pub async fn hash_password(password: String) -> Result<String, AuthError> {
    let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(password, HASH_COST)).await??;
    Ok(hashed)
}

pub async fn verify_password(password: String, hash: String) -> Result<bool, AuthError> {
    let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticator() -> Authenticator {
        Authenticator::new("test-secret", Duration::hours(1), "admin@prescripto.test")
    }

    #[test]
    fn user_token_resolves_to_user_caller() {
        let auth = authenticator();
        let id = Uuid::new_v4();
        let token = auth.issue_user(id).unwrap();

        assert_eq!(auth.resolve(&token, Role::User).unwrap(), Caller::User(id));
    }

    #[test]
    fn token_is_rejected_on_another_roles_header() {
        let auth = authenticator();
        let token = auth.issue_user(Uuid::new_v4()).unwrap();

        assert!(matches!(
            auth.resolve(&token, Role::Doctor),
            Err(AuthError::WrongRole(Role::User))
        ));
        assert!(auth.resolve(&token, Role::Admin).is_err());
    }

    #[test]
    fn admin_token_must_name_configured_admin() {
        let auth = authenticator();
        let token = auth.issue_admin().unwrap();
        assert_eq!(auth.resolve(&token, Role::Admin).unwrap(), Caller::Admin);

        let other = Authenticator::new("test-secret", Duration::hours(1), "someone@else.test");
        assert!(matches!(
            other.resolve(&token, Role::Admin),
            Err(AuthError::InvalidSubject)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let auth = Authenticator::new("test-secret", Duration::hours(-2), "admin@prescripto.test");
        let token = auth.issue_doctor(Uuid::new_v4()).unwrap();

        assert!(matches!(
            auth.resolve(&token, Role::Doctor),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let forged = Authenticator::new("other-secret", Duration::hours(1), "admin@prescripto.test")
            .issue_user(Uuid::new_v4())
            .unwrap();

        assert!(authenticator().resolve(&forged, Role::User).is_err());
    }

    #[test]
    fn auth_failures_surface_as_unauthorized() {
        let err: ApiError = AuthError::MissingToken("token").into();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn password_hash_round_trip() {
        let hash = hash_password("correct horse".to_string()).await.unwrap();
        assert_ne!(hash, "correct horse");
        assert!(verify_password("correct horse".to_string(), hash.clone())
            .await
            .unwrap());
        assert!(!verify_password("wrong horse".to_string(), hash).await.unwrap());
    }
}
