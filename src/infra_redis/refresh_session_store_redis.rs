use crate::domain_model::*;
use crate::domain_port::*;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisError, RedisWrite, Script, ToRedisArgs};

const UPSERT_SESSION: &str = include_str!("upsert_session.lua");
const RETIRE_SESSION: &str = include_str!("retire_session.lua");
const DELETE_SESSION: &str = include_str!("delete_session.lua");

/// Sessions live as JSON under `{prefix}:session:{id}` with an absolute
/// expiry; `{prefix}:subject:{subject}` points at the subject's only session.
/// Every mutation is a single Lua script, hence atomic.
pub struct RedisRefreshSessionStore {
    conn: ConnectionManager,
    prefix: String,
    upsert: Script,
    retire: Script,
    delete: Script,
}

impl RedisRefreshSessionStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisRefreshSessionStore {
            conn,
            prefix: prefix.into(),
            upsert: Script::new(UPSERT_SESSION),
            retire: Script::new(RETIRE_SESSION),
            delete: Script::new(DELETE_SESSION),
        }
    }

    fn session_prefix(&self) -> String {
        format!("{}:session:", self.prefix)
    }

    fn session_key(&self, session_id: &SessionId) -> String {
        format!("{}{}", self.session_prefix(), session_id)
    }

    fn subject_key(&self, subject: &Subject) -> String {
        format!("{}:subject:{}", self.prefix, subject)
    }
}

impl ToRedisArgs for SessionId {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        out.write_arg(self.to_string().as_bytes())
    }
}

fn unavailable(e: RedisError) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

fn to_json(session: &RefreshSession) -> Result<String, StoreError> {
    serde_json::to_string(session).map_err(|e| StoreError::Corrupt(e.to_string()))
}

#[async_trait::async_trait]
impl RefreshSessionStore for RedisRefreshSessionStore {
    async fn upsert_session(&self, session: &RefreshSession) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: i64 = self
            .upsert
            .key(self.subject_key(&session.subject))
            .key(self.session_key(&session.session_id))
            .arg(&session.session_id)
            .arg(to_json(session)?)
            .arg(session.expires_at.timestamp())
            .arg(self.session_prefix())
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn find_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<RefreshSession>, StoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .get(self.session_key(session_id))
            .await
            .map_err(unavailable)?;

        raw.map(|json| {
            serde_json::from_str::<RefreshSession>(&json)
                .map_err(|e| StoreError::Corrupt(format!("session {}: {}", session_id, e)))
        })
        .transpose()
    }

    async fn retire_session(
        &self,
        current: &RefreshSession,
        successor: Option<&RefreshSession>,
    ) -> Result<RetireOutcome, StoreError> {
        let mut conn = self.conn.clone();
        let mut invocation = self.retire.prepare_invoke();
        invocation
            .key(self.session_key(&current.session_id))
            .key(self.subject_key(&current.subject))
            .arg(&current.secret_hash)
            .arg(&current.session_id);

        match successor {
            Some(next) => {
                invocation
                    .key(self.session_key(&next.session_id))
                    .arg(&next.session_id)
                    .arg(to_json(next)?)
                    .arg(next.expires_at.timestamp());
            }
            None => {
                invocation
                    .key(self.session_key(&current.session_id))
                    .arg("")
                    .arg("")
                    .arg(0);
            }
        }

        let status: i64 = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;

        match status {
            1 => Ok(RetireOutcome::Retired),
            0 => Ok(RetireOutcome::Superseded),
            -1 => Ok(RetireOutcome::Missing),
            other => Err(StoreError::Unavailable(format!(
                "unknown retire script status {}",
                other
            ))),
        }
    }

    async fn delete_session(&self, subject: &Subject) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: i64 = self
            .delete
            .key(self.subject_key(subject))
            .arg(self.session_prefix())
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}
