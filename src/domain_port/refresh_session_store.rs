use crate::domain_model::*;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("stored session is corrupt: {0}")]
    Corrupt(String),
}

/// Result of an atomic compare-and-retire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetireOutcome {
    /// The expected session was still current and has been retired
    /// (and replaced, if a successor was supplied).
    Retired,
    /// No session exists under the expected id any more.
    Missing,
    /// A session exists under the id but it is not the one expected.
    Superseded,
}

/// Persistent collection of refresh sessions, at most one per subject.
///
/// Stored secrets are one-way hashed, so a presented secret cannot be used as
/// a lookup key. Callers narrow by [`SessionId`] with [`find_session`], verify
/// the hash themselves, then retire the exact record they verified with
/// [`retire_session`], which must be atomic against concurrent writers.
///
/// [`find_session`]: RefreshSessionStore::find_session
/// [`retire_session`]: RefreshSessionStore::retire_session
#[async_trait::async_trait]
pub trait RefreshSessionStore: Send + Sync {
    /// Atomically replace whatever session the subject had with `session`.
    async fn upsert_session(&self, session: &RefreshSession) -> Result<(), StoreError>;

    /// Fetch the session stored under `session_id`, expired or not.
    async fn find_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<RefreshSession>, StoreError>;

    /// Compare-and-retire. If `current` is still the stored session, delete
    /// it and, when given, install `successor` for the same subject in the
    /// same atomic step.
    async fn retire_session(
        &self,
        current: &RefreshSession,
        successor: Option<&RefreshSession>,
    ) -> Result<RetireOutcome, StoreError>;

    /// Remove the subject's session, if any.
    async fn delete_session(&self, subject: &Subject) -> Result<(), StoreError>;
}
