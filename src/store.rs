// Session store
// Registry of uploaded working copies, one independently locked entry per id

use crate::table::Document;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// One uploaded file's working copy plus its metadata. The session owns its
/// document exclusively; mutation happens through the per-session lock.
#[derive(Debug)]
pub struct UploadSession {
    pub original_name: String,
    pub created_at: DateTime<Utc>,
    pub document: Document,
}

/// Process-wide registry of sessions. Each entry carries its own lock so
/// operations on distinct ids never contend, while concurrent operations on
/// the same id are serialized.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, Arc<RwLock<UploadSession>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a parsed document under a fresh unguessable id and return the id.
    pub fn create(&self, document: Document, original_name: String) -> String {
        let id = Uuid::new_v4().to_string();
        let session = UploadSession {
            original_name,
            created_at: Utc::now(),
            document,
        };
        self.sessions.insert(id.clone(), Arc::new(RwLock::new(session)));
        id
    }

    /// Look up a session by id. The returned handle keeps the entry alive
    /// for the duration of the operation even if it is removed concurrently.
    pub fn get(&self, id: &str) -> Option<Arc<RwLock<UploadSession>>> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    /// Remove a session. Returns whether an entry existed; removing an
    /// unknown id is not an error ("ensure absent").
    pub fn remove(&self, id: &str) -> bool {
        self.sessions.remove(id).is_some()
    }

    /// Drop all sessions older than `max_age` and return how many were
    /// removed. Called periodically by the server's expiry sweep.
    pub fn purge_expired(&self, max_age: Duration) -> usize {
        let cutoff = Utc::now() - max_age;
        // Count inside the closure: diffing len() before and after would
        // miscount (and underflow) when uploads insert concurrently with
        // the sweep.
        let mut removed = 0;
        self.sessions.retain(|_, session| {
            // Entries currently locked by a request are never mid-mutation
            // from our point of view; created_at is immutable, so try_read
            // failing just means the session is in active use and stays.
            match session.try_read() {
                Ok(guard) if guard.created_at <= cutoff => {
                    removed += 1;
                    false
                }
                _ => true,
            }
        });
        removed
    }

    /// Shift a session's creation time into the past, for expiry tests.
    #[cfg(test)]
    pub(crate) fn backdate(&self, id: &str, age: Duration) {
        if let Some(session) = self.get(id) {
            session.try_write().unwrap().created_at = Utc::now() - age;
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
