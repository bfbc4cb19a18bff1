use crate::domain_model::*;
use crate::domain_port::*;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryState {
    sessions: HashMap<SessionId, RefreshSession>,
    by_subject: HashMap<Subject, SessionId>,
}

impl MemoryState {
    fn insert(&mut self, session: &RefreshSession) {
        if let Some(previous) = self
            .by_subject
            .insert(session.subject.clone(), session.session_id)
        {
            self.sessions.remove(&previous);
        }
        self.sessions.insert(session.session_id, session.clone());
    }

    fn remove(&mut self, session_id: &SessionId) -> Option<RefreshSession> {
        let removed = self.sessions.remove(session_id)?;
        if self.by_subject.get(&removed.subject) == Some(session_id) {
            self.by_subject.remove(&removed.subject);
        }
        Some(removed)
    }
}

/// In-process store for tests and local runs. A single mutex covers both
/// indexes so every operation is atomic.
#[derive(Debug, Default)]
pub struct MemoryRefreshSessionStore {
    state: Mutex<MemoryState>,
}

impl MemoryRefreshSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    /// All sessions currently held for `subject`. Never more than one.
    pub fn sessions_for(&self, subject: &Subject) -> Vec<RefreshSession> {
        self.state()
            .map(|state| {
                state
                    .sessions
                    .values()
                    .filter(|s| &s.subject == subject)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.state().map(|state| state.sessions.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl RefreshSessionStore for MemoryRefreshSessionStore {
    async fn upsert_session(&self, session: &RefreshSession) -> Result<(), StoreError> {
        self.state()?.insert(session);
        Ok(())
    }

    async fn find_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<RefreshSession>, StoreError> {
        Ok(self.state()?.sessions.get(session_id).cloned())
    }

    async fn retire_session(
        &self,
        current: &RefreshSession,
        successor: Option<&RefreshSession>,
    ) -> Result<RetireOutcome, StoreError> {
        let mut state = self.state()?;
        let outcome = match state.sessions.get(&current.session_id) {
            Some(stored) if stored == current => RetireOutcome::Retired,
            Some(_) => RetireOutcome::Superseded,
            None => RetireOutcome::Missing,
        };

        if outcome == RetireOutcome::Retired {
            state.remove(&current.session_id);
            if let Some(successor) = successor {
                state.insert(successor);
            }
        }

        Ok(outcome)
    }

    async fn delete_session(&self, subject: &Subject) -> Result<(), StoreError> {
        let mut state = self.state()?;
        if let Some(session_id) = state.by_subject.get(subject).copied() {
            state.remove(&session_id);
        }
        Ok(())
    }
}
