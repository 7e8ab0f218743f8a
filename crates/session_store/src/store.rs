use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chat_provider::{now_millis, Message};
use tokio::fs;
use tokio::sync::Mutex;

use crate::error::SessionStoreError;
use crate::paths::{is_valid_session_id, session_file_name};
use crate::schema::{next_last_updated, sort_by_recency, Session, SessionDocument, SCHEMA_VERSION};

/// Storage contract for sessions.
///
/// Every operation except [`SessionStore::create`] is idempotent. `update`
/// replaces the whole message sequence and refreshes `last_updated` in the
/// same write.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Lists `owner_id`'s sessions, most recently updated first. Documents
    /// that cannot be read are skipped.
    async fn list(&self, owner_id: &str) -> Result<Vec<Session>, SessionStoreError>;

    /// Fetches one session; `Ok(None)` when it does not exist.
    async fn get(&self, session_id: &str) -> Result<Option<Session>, SessionStoreError>;

    /// Allocates a new session seeded with `first_message`.
    async fn create(
        &self,
        owner_id: &str,
        first_message: &Message,
    ) -> Result<Session, SessionStoreError>;

    async fn update(&self, session_id: &str, messages: &[Message])
        -> Result<(), SessionStoreError>;

    /// Removes a session. Deleting an unknown session succeeds.
    async fn delete(&self, session_id: &str) -> Result<(), SessionStoreError>;
}

/// One JSON document per session under a root directory.
pub struct FileSessionStore {
    root: PathBuf,
    // Serializes read-modify-write cycles; holds the last issued `last_updated`.
    write_lock: Mutex<i64>,
}

impl FileSessionStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(0),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, session_id: &str) -> Result<PathBuf, SessionStoreError> {
        if !is_valid_session_id(session_id) {
            return Err(SessionStoreError::InvalidSessionId {
                session_id: session_id.to_string(),
            });
        }

        Ok(self.root.join(session_file_name(session_id)))
    }

    async fn read_session(&self, path: &Path) -> Result<Option<Session>, SessionStoreError> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(source) if source.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SessionStoreError::io("reading session document", path, source))
            }
        };

        parse_document(path, &bytes).map(Some)
    }

    async fn write_session(&self, session: &Session) -> Result<(), SessionStoreError> {
        let path = self.path_for(&session.id)?;
        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| SessionStoreError::io("creating session root", &self.root, source))?;

        let document = SessionDocument::from(session.clone());
        let bytes = serde_json::to_vec_pretty(&document)
            .map_err(|source| SessionStoreError::json_serialize(&path, source))?;

        let staging = path.with_extension("json.tmp");
        fs::write(&staging, bytes)
            .await
            .map_err(|source| SessionStoreError::io("writing session document", &staging, source))?;
        fs::rename(&staging, &path)
            .await
            .map_err(|source| SessionStoreError::io("replacing session document", &path, source))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn list(&self, owner_id: &str) -> Result<Vec<Session>, SessionStoreError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(source) if source.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(SessionStoreError::io(
                    "listing session root",
                    &self.root,
                    source,
                ))
            }
        };

        let mut sessions = Vec::new();
        loop {
            let entry = entries
                .next_entry()
                .await
                .map_err(|source| SessionStoreError::io("listing session root", &self.root, source))?;
            let Some(entry) = entry else {
                break;
            };

            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }

            // One bad document must not hide the rest; `get` stays strict.
            match self.read_session(&path).await {
                Ok(Some(session)) if session.owner_id == owner_id => sessions.push(session),
                Ok(_) => {}
                Err(error) => {
                    tracing::warn!(
                        path = %path.display(),
                        %error,
                        "skipping unreadable session document"
                    );
                }
            }
        }

        sort_by_recency(&mut sessions);
        Ok(sessions)
    }

    async fn get(&self, session_id: &str) -> Result<Option<Session>, SessionStoreError> {
        let path = self.path_for(session_id)?;
        self.read_session(&path).await
    }

    async fn create(
        &self,
        owner_id: &str,
        first_message: &Message,
    ) -> Result<Session, SessionStoreError> {
        let mut last_stamp = self.write_lock.lock().await;
        let session = Session::create(owner_id, first_message, next_stamp(&mut last_stamp));
        self.write_session(&session).await?;

        tracing::info!(session_id = %session.id, title = %session.title, "created session");
        Ok(session)
    }

    async fn update(
        &self,
        session_id: &str,
        messages: &[Message],
    ) -> Result<(), SessionStoreError> {
        let mut last_stamp = self.write_lock.lock().await;
        let path = self.path_for(session_id)?;
        let mut session = self
            .read_session(&path)
            .await?
            .ok_or_else(|| SessionStoreError::unknown_session(session_id))?;

        session.replace_messages(messages.to_vec(), next_stamp(&mut last_stamp));
        *last_stamp = session.last_updated;
        self.write_session(&session).await?;

        tracing::debug!(
            session_id,
            len = messages.len(),
            last_updated = session.last_updated,
            "updated session"
        );
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), SessionStoreError> {
        let _guard = self.write_lock.lock().await;
        let path = self.path_for(session_id)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(session_id, "deleted session");
                Ok(())
            }
            Err(source) if source.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SessionStoreError::io(
                "deleting session document",
                &path,
                source,
            )),
        }
    }
}

/// Issues a store-wide strictly increasing timestamp.
pub(crate) fn next_stamp(last: &mut i64) -> i64 {
    *last = next_last_updated(*last, now_millis());
    *last
}

fn parse_document(path: &Path, bytes: &[u8]) -> Result<Session, SessionStoreError> {
    let value: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|source| SessionStoreError::json_parse(path, source))?;

    // Check the version before strict parsing so newer documents get a precise error.
    let found = value
        .get("schemaVersion")
        .and_then(serde_json::Value::as_u64)
        .and_then(|version| u32::try_from(version).ok())
        .unwrap_or(0);
    if found != SCHEMA_VERSION {
        return Err(SessionStoreError::UnsupportedVersion {
            path: path.to_path_buf(),
            found,
        });
    }

    serde_json::from_value::<SessionDocument>(value)
        .map(Session::from)
        .map_err(|source| SessionStoreError::json_parse(path, source))
}
