use crate::domain_model::Subject;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per subject with an operation in flight. Unrelated
/// subjects never wait on each other; idle entries are dropped on release.
#[derive(Debug, Default)]
pub struct SubjectLocks {
    locks: DashMap<Subject, Arc<Mutex<()>>>,
}

pub struct SubjectGuard<'a> {
    owner: &'a SubjectLocks,
    subject: Subject,
    guard: Option<OwnedMutexGuard<()>>,
}

impl SubjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, subject: &Subject) -> SubjectGuard<'_> {
        let lock = self
            .locks
            .entry(subject.clone())
            .or_default()
            .value()
            .clone();
        let guard = lock.lock_owned().await;

        SubjectGuard {
            owner: self,
            subject: subject.clone(),
            guard: Some(guard),
        }
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl Drop for SubjectGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map's own handle left means nobody holds or awaits it.
        self.owner
            .locks
            .remove_if(&self.subject, |_, lock| Arc::strong_count(lock) == 1);
    }
}
