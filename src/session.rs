//! Per-browser upload state.
//!
//! Each session holds at most one upload. A new upload replaces the previous
//! one wholesale, together with anything decoded from it.

use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

use crate::config::DEFAULT_MAX_SESSIONS;
use crate::error::VizResult;
use crate::loader::UploadedFile;
use crate::table::TabularData;

/// Sessions expire after a day without activity
pub const SESSION_DURATION: u64 = 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct Session {
    /// The file most recently uploaded in this session
    pub upload: UploadedFile,

    /// Identity of `upload`; changes on every upload
    pub upload_id: Uuid,

    /// Time when the session expires
    pub expires_at: SystemTime,

    decoded: Option<Arc<TabularData>>,
}

/// Thread-safe map of session id to [`Session`]
///
/// # Examples
/// ```
/// use genviz::loader::UploadedFile;
/// use genviz::session::SessionStore;
///
/// let store = SessionStore::new(true);
/// let (session_id, _) = store.store_upload(None, UploadedFile::from_bytes("a.csv", b"x\n1\n"));
///
/// let table = store.table(&session_id).unwrap().unwrap();
/// assert_eq!(table.row_count(), 1);
/// ```
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    cache_decoded: bool,
    ttl: Duration,
    max_sessions: usize,
}

impl SessionStore {
    /// Creates an empty store
    ///
    /// # Arguments
    /// * `cache_decoded` - Keep the decoded table of the current upload
    ///   instead of decoding it again for every request
    pub fn new(cache_decoded: bool) -> Self {
        SessionStore {
            sessions: RwLock::new(HashMap::new()),
            cache_decoded,
            ttl: Duration::from_secs(SESSION_DURATION),
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Caps the number of live sessions; at least one is always kept.
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions.max(1);
        self
    }

    /// Stores `upload` as the current file of a session
    ///
    /// An unknown or expired `session_id` starts a new session. When the
    /// store is full, the session idle the longest is evicted first.
    ///
    /// # Returns
    /// * `(String, Uuid)` - The session id to hand back to the browser and the
    ///   identity of the stored upload
    pub fn store_upload(&self, session_id: Option<&str>, upload: UploadedFile) -> (String, Uuid) {
        let now = SystemTime::now();
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.retain(|_, session| session.expires_at > now);

        let session_id = match session_id {
            Some(id) if sessions.contains_key(id) => id.to_string(),
            _ => {
                while sessions.len() >= self.max_sessions {
                    let Some(oldest) = sessions
                        .iter()
                        .min_by_key(|(_, session)| session.expires_at)
                        .map(|(id, _)| id.clone())
                    else {
                        break;
                    };
                    debug!("Evicting session {} to stay under {}", oldest, self.max_sessions);
                    sessions.remove(&oldest);
                }
                Uuid::new_v4().to_string()
            }
        };
        let upload_id = Uuid::new_v4();

        sessions.insert(
            session_id.clone(),
            Session {
                upload,
                upload_id,
                expires_at: now + self.ttl,
                decoded: None,
            },
        );

        (session_id, upload_id)
    }

    /// Current upload of a live session, refreshing its expiry.
    pub fn upload(&self, session_id: &str) -> Option<UploadedFile> {
        self.touch(session_id).map(|session| session.upload)
    }

    /// Decoded table of the session's current upload
    ///
    /// # Returns
    /// * `None` - No live session or nothing uploaded
    /// * `Some(Err(_))` - The upload does not decode
    /// * `Some(Ok(_))` - The table, from cache when enabled
    pub fn table(&self, session_id: &str) -> Option<VizResult<Arc<TabularData>>> {
        let session = self.touch(session_id)?;

        if let Some(table) = session.decoded {
            debug!("Decode cache hit for upload {}", session.upload_id);
            return Some(Ok(table));
        }

        // Decode outside the lock; other requests keep going meanwhile
        let table = match session.upload.decode() {
            Ok(table) => Arc::new(table),
            Err(e) => return Some(Err(e)),
        };

        if self.cache_decoded {
            let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
            // Skip if a newer upload landed while decoding
            if let Some(current) = sessions.get_mut(session_id) {
                if current.upload_id == session.upload_id {
                    current.decoded = Some(Arc::clone(&table));
                }
            }
        }

        Some(Ok(table))
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a snapshot of a live session and pushes back its expiry.
    /// Expired sessions are dropped here.
    fn touch(&self, session_id: &str) -> Option<Session> {
        let now = SystemTime::now();
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);

        match sessions.get_mut(session_id) {
            Some(session) if session.expires_at > now => {
                session.expires_at = now + self.ttl;
                Some(session.clone())
            }
            Some(_) => {
                sessions.remove(session_id);
                None
            }
            None => None,
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        SessionStore::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv(name: &str, text: &str) -> UploadedFile {
        UploadedFile::from_bytes(name, text.as_bytes())
    }

    #[test]
    fn unknown_session_has_no_upload() {
        let store = SessionStore::default();
        assert!(store.upload("missing").is_none());
        assert!(store.table("missing").is_none());
    }

    #[test]
    fn new_upload_replaces_previous() {
        let store = SessionStore::default();
        let (id, first) = store.store_upload(None, csv("a.csv", "a\n1\n"));
        assert_eq!(store.table(&id).unwrap().unwrap().column_names(), vec!["a"]);

        let (same_id, second) = store.store_upload(Some(&id), csv("b.csv", "b,c\n1,2\n"));
        assert_eq!(same_id, id);
        assert_ne!(first, second);
        assert_eq!(store.upload(&id).unwrap().name, "b.csv");
        assert_eq!(store.table(&id).unwrap().unwrap().column_names(), vec!["b", "c"]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn cached_table_is_shared() {
        let store = SessionStore::new(true);
        let (id, _) = store.store_upload(None, csv("a.csv", "a\n1\n"));
        let first = store.table(&id).unwrap().unwrap();
        let second = store.table(&id).unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn uncached_store_decodes_every_time() {
        let store = SessionStore::new(false);
        let (id, _) = store.store_upload(None, csv("a.csv", "a\n1\n"));
        let first = store.table(&id).unwrap().unwrap();
        let second = store.table(&id).unwrap().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first, second);
    }

    #[test]
    fn decode_failure_is_reported_not_cached() {
        let store = SessionStore::default();
        let (id, _) = store.store_upload(None, csv("notes.txt", "hello"));
        assert!(store.table(&id).unwrap().is_err());
        assert!(store.table(&id).unwrap().is_err());
    }

    #[test]
    fn session_count_is_capped() {
        let store = SessionStore::default().with_max_sessions(2);
        let (first, _) = store.store_upload(None, csv("a.csv", "a\n1\n"));
        let (second, _) = store.store_upload(None, csv("b.csv", "b\n1\n"));

        // Activity on the first session makes the second the oldest
        std::thread::sleep(Duration::from_millis(5));
        assert!(store.upload(&first).is_some());

        let (third, _) = store.store_upload(None, csv("c.csv", "c\n1\n"));
        assert_eq!(store.len(), 2);
        assert!(store.upload(&second).is_none());
        assert!(store.upload(&first).is_some());
        assert!(store.upload(&third).is_some());

        // Replacing the upload of a live session never evicts
        store.store_upload(Some(&first), csv("d.csv", "d\n1\n"));
        assert_eq!(store.len(), 2);
        assert!(store.upload(&third).is_some());
    }

    #[test]
    fn expired_sessions_are_dropped() {
        let store = SessionStore::default().with_ttl(Duration::ZERO);
        let (id, _) = store.store_upload(None, csv("a.csv", "a\n1\n"));
        assert!(store.upload(&id).is_none());
        assert!(store.is_empty());
    }
}
