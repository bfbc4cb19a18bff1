use crate::domain_model::*;
use crate::domain_port::StoreError;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Missing subject or malformed credential. The caller restarts the flow.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// No matching, unexpired session. The caller must re-authenticate.
    #[error("unauthenticated")]
    Unauthenticated,
    /// Transient infrastructure failure. Nothing was committed.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("signing failure: {0}")]
    SigningFailure(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl From<StoreError> for AuthError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Unavailable(e) => AuthError::StoreUnavailable(e),
            StoreError::Corrupt(e) => AuthError::InternalError(e),
        }
    }
}

impl From<SubjectError> for AuthError {
    fn from(error: SubjectError) -> Self {
        AuthError::InvalidInput(error.to_string())
    }
}

impl From<CredentialError> for AuthError {
    fn from(error: CredentialError) -> Self {
        AuthError::InvalidInput(error.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessToken(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshToken(pub String);

/// Both halves of an issuance. Never built partially.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: AccessToken,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token: RefreshToken,
    pub refresh_token_expires_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait AccessTokenCodec: Send + Sync {
    async fn issue_access_token(
        &self,
        subject: &Subject,
    ) -> Result<(AccessToken, DateTime<Utc>), AuthError>;
    async fn verify_access_token(&self, token: &AccessToken) -> Result<Subject, AuthError>;
}

/// Salted, deliberately slow one-way hashing of refresh secrets.
#[async_trait::async_trait]
pub trait SecretHasher: Send + Sync {
    async fn hash_secret(&self, secret: &RefreshSecret) -> Result<String, AuthError>;
    async fn verify_secret(
        &self,
        secret: &RefreshSecret,
        secret_hash: &str,
    ) -> Result<bool, AuthError>;
}

#[async_trait::async_trait]
pub trait TokenService: Send + Sync {
    /// Issue a fresh pair, supplanting any prior refresh session of `subject`.
    async fn issue_pair(&self, subject: &Subject) -> Result<TokenPair, AuthError>;
    /// Exchange a refresh credential for a new pair. The presented credential
    /// is retired in the same step.
    async fn rotate_pair(&self, presented: Option<&str>) -> Result<TokenPair, AuthError>;
    /// Drop the subject's refresh session.
    async fn revoke_subject(&self, subject: &Subject) -> Result<(), AuthError>;
    async fn verify_access(&self, token: &str) -> Result<Subject, AuthError>;
}
