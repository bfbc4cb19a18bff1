use super::SubjectLocks;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct TokenServiceConfig {
    pub refresh_ttl: Duration,
    /// Upper bound on every single store call.
    pub store_timeout: Duration,
}

impl Default for TokenServiceConfig {
    fn default() -> Self {
        TokenServiceConfig {
            refresh_ttl: Duration::from_secs(24 * 60 * 60),
            store_timeout: Duration::from_secs(5),
        }
    }
}

pub struct RealTokenService {
    store: Arc<dyn RefreshSessionStore>,
    hasher: Arc<dyn SecretHasher>,
    codec: Arc<dyn AccessTokenCodec>,
    locks: SubjectLocks,
    config: TokenServiceConfig,
}

impl RealTokenService {
    pub fn new(
        store: Arc<dyn RefreshSessionStore>,
        hasher: Arc<dyn SecretHasher>,
        codec: Arc<dyn AccessTokenCodec>,
        config: TokenServiceConfig,
    ) -> Self {
        Self {
            store,
            hasher,
            codec,
            locks: SubjectLocks::new(),
            config,
        }
    }

    /// Runs one store call under `store_timeout`. An elapsed timeout only
    /// abandons the wait: the store may still commit. For `retire_session`
    /// that means the presented refresh credential can already be retired
    /// when the caller sees `StoreUnavailable`, so a retry with it reports
    /// `Unauthenticated` and the client has to log in again.
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, AuthError> {
        match tokio::time::timeout(self.config.store_timeout, call).await {
            Ok(result) => result.map_err(AuthError::from),
            Err(_) => Err(AuthError::StoreUnavailable(format!(
                "store call exceeded {:?}",
                self.config.store_timeout
            ))),
        }
    }

    /// Fresh secret plus the session record that will hold its hash. Nothing
    /// is written yet.
    async fn prepare_session(
        &self,
        subject: &Subject,
    ) -> Result<(RefreshToken, RefreshSession), AuthError> {
        let credential = RefreshCredential::generate();
        let secret_hash = self.hasher.hash_secret(&credential.secret).await?;
        let issued_at = Utc::now();
        let session = RefreshSession {
            session_id: credential.session_id,
            subject: subject.clone(),
            secret_hash,
            issued_at,
            expires_at: issued_at + self.config.refresh_ttl,
        };
        Ok((RefreshToken(credential.encode()), session))
    }

    /// Narrow by the cleartext pointer, then run the one-way comparison.
    /// Returns the session only if the secret matches; expiry is the
    /// caller's concern.
    async fn find_matching_session(
        &self,
        credential: &RefreshCredential,
    ) -> Result<Option<RefreshSession>, AuthError> {
        let found = self
            .bounded(self.store.find_session(&credential.session_id))
            .await?;
        let Some(candidate) = found else {
            debug!(session_id = %credential.session_id, "no session under presented id");
            return Ok(None);
        };

        if self
            .hasher
            .verify_secret(&credential.secret, &candidate.secret_hash)
            .await?
        {
            Ok(Some(candidate))
        } else {
            Ok(None)
        }
    }

    /// Locate the session matching `credential` and retire it, installing the
    /// freshly issued successor in the same store operation. Expired matches
    /// are purged and reported as unauthenticated.
    async fn find_and_retire_matching_session(
        &self,
        credential: &RefreshCredential,
    ) -> Result<TokenPair, AuthError> {
        let current = self
            .find_matching_session(credential)
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        let _guard = self.locks.acquire(&current.subject).await;

        if current.is_expired_at(Utc::now()) {
            info!(
                subject = %current.subject,
                session_id = %current.session_id,
                "refresh session expired"
            );
            if let Err(e) = self.bounded(self.store.retire_session(&current, None)).await {
                warn!(session_id = %current.session_id, "purging expired session: {}", e);
            }
            return Err(AuthError::Unauthenticated);
        }

        let (access_token, access_exp) = self.codec.issue_access_token(&current.subject).await?;
        let (refresh_token, successor) = self.prepare_session(&current.subject).await?;

        match self
            .bounded(self.store.retire_session(&current, Some(&successor)))
            .await?
        {
            RetireOutcome::Retired => {
                info!(
                    subject = %current.subject,
                    retired = %current.session_id,
                    session_id = %successor.session_id,
                    "rotated token pair"
                );
                Ok(TokenPair {
                    access_token,
                    access_token_expires_at: access_exp,
                    refresh_token,
                    refresh_token_expires_at: successor.expires_at,
                })
            }
            outcome => {
                warn!(
                    subject = %current.subject,
                    session_id = %current.session_id,
                    ?outcome,
                    "refresh credential already retired"
                );
                Err(AuthError::Unauthenticated)
            }
        }
    }
}

#[async_trait::async_trait]
impl TokenService for RealTokenService {
    async fn issue_pair(&self, subject: &Subject) -> Result<TokenPair, AuthError> {
        let _guard = self.locks.acquire(subject).await;

        let (access_token, access_exp) = self.codec.issue_access_token(subject).await?;
        let (refresh_token, session) = self.prepare_session(subject).await?;
        self.bounded(self.store.upsert_session(&session)).await?;

        info!(%subject, session_id = %session.session_id, "issued token pair");
        Ok(TokenPair {
            access_token,
            access_token_expires_at: access_exp,
            refresh_token,
            refresh_token_expires_at: session.expires_at,
        })
    }

    async fn rotate_pair(&self, presented: Option<&str>) -> Result<TokenPair, AuthError> {
        let presented = presented
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(AuthError::Unauthenticated)?;
        let credential = RefreshCredential::decode(presented)?;

        self.find_and_retire_matching_session(&credential).await
    }

    async fn revoke_subject(&self, subject: &Subject) -> Result<(), AuthError> {
        let _guard = self.locks.acquire(subject).await;
        self.bounded(self.store.delete_session(subject)).await?;
        info!(%subject, "revoked refresh session");
        Ok(())
    }

    async fn verify_access(&self, token: &str) -> Result<Subject, AuthError> {
        self.codec
            .verify_access_token(&AccessToken(token.to_string()))
            .await
    }
}
