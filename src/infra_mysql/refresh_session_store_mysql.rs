use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlConnection, MySqlPool, Row};
use uuid::Uuid;

/// Backed by the `refresh_session` table (see `migrations/`). `UNIQUE(subject)`
/// enforces one session per subject; replacements happen in a single
/// statement or under a row lock.
pub struct MySqlRefreshSessionStore {
    pool: MySqlPool,
}

fn store_err(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

impl MySqlRefreshSessionStore {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlRefreshSessionStore { pool }
    }

    #[inline]
    fn sid_as_bytes(id: &SessionId) -> &[u8] {
        id.0.as_bytes()
    }

    #[inline]
    fn sid_from_bytes(id: &[u8]) -> Result<SessionId, StoreError> {
        Ok(SessionId(
            Uuid::from_slice(id).map_err(|e| StoreError::Corrupt(e.to_string()))?,
        ))
    }

    fn row_to_session(row: MySqlRow) -> Result<RefreshSession, StoreError> {
        let session_id_bytes: Vec<u8> = row
            .try_get("session_id")
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let session_id = Self::sid_from_bytes(&session_id_bytes)?;

        let subject: String = row
            .try_get("subject")
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let subject = Subject::new(subject).map_err(|e| StoreError::Corrupt(e.to_string()))?;

        let secret_hash: String = row
            .try_get("secret_hash")
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let issued_at: DateTime<Utc> = row
            .try_get("issued_at")
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let expires_at: DateTime<Utc> = row
            .try_get("expires_at")
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        Ok(RefreshSession {
            session_id,
            subject,
            secret_hash,
            issued_at,
            expires_at,
        })
    }

    async fn lock_session(
        conn: &mut MySqlConnection,
        session_id: &SessionId,
    ) -> Result<Option<RefreshSession>, StoreError> {
        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT session_id, subject, secret_hash, issued_at, expires_at
FROM refresh_session
WHERE session_id = ?
FOR UPDATE
"#,
        )
        .bind(Self::sid_as_bytes(session_id))
        .fetch_optional(conn)
        .await
        .map_err(store_err)?;

        row_opt.map(Self::row_to_session).transpose()
    }
}

#[async_trait::async_trait]
impl RefreshSessionStore for MySqlRefreshSessionStore {
    async fn upsert_session(&self, session: &RefreshSession) -> Result<(), StoreError> {
        sqlx::query(
            r#"
INSERT INTO refresh_session (session_id, subject, secret_hash, issued_at, expires_at)
VALUES (?, ?, ?, ?, ?)
ON DUPLICATE KEY UPDATE
    session_id = VALUES(session_id),
    secret_hash = VALUES(secret_hash),
    issued_at = VALUES(issued_at),
    expires_at = VALUES(expires_at)
"#,
        )
        .bind(Self::sid_as_bytes(&session.session_id))
        .bind(session.subject.as_str())
        .bind(&session.secret_hash)
        .bind(session.issued_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }

    async fn find_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<RefreshSession>, StoreError> {
        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT session_id, subject, secret_hash, issued_at, expires_at
FROM refresh_session
WHERE session_id = ?
"#,
        )
        .bind(Self::sid_as_bytes(session_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        row_opt.map(Self::row_to_session).transpose()
    }

    async fn retire_session(
        &self,
        current: &RefreshSession,
        successor: Option<&RefreshSession>,
    ) -> Result<RetireOutcome, StoreError> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        let outcome = match Self::lock_session(&mut tx, &current.session_id).await? {
            None => RetireOutcome::Missing,
            Some(stored) if stored.secret_hash != current.secret_hash => {
                RetireOutcome::Superseded
            }
            Some(_) => RetireOutcome::Retired,
        };

        if outcome != RetireOutcome::Retired {
            tx.rollback().await.map_err(store_err)?;
            return Ok(outcome);
        }

        match successor {
            // Rewrite the locked row in place so the subject never has zero
            // or two rows.
            Some(next) => {
                sqlx::query(
                    r#"
UPDATE refresh_session
SET session_id = ?, secret_hash = ?, issued_at = ?, expires_at = ?
WHERE session_id = ?
"#,
                )
                .bind(Self::sid_as_bytes(&next.session_id))
                .bind(&next.secret_hash)
                .bind(next.issued_at)
                .bind(next.expires_at)
                .bind(Self::sid_as_bytes(&current.session_id))
                .execute(&mut *tx)
                .await
                .map_err(store_err)?;
            }
            None => {
                sqlx::query("DELETE FROM refresh_session WHERE session_id = ?")
                    .bind(Self::sid_as_bytes(&current.session_id))
                    .execute(&mut *tx)
                    .await
                    .map_err(store_err)?;
            }
        }

        tx.commit().await.map_err(store_err)?;
        Ok(RetireOutcome::Retired)
    }

    async fn delete_session(&self, subject: &Subject) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM refresh_session WHERE subject = ?")
            .bind(subject.as_str())
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }
}
