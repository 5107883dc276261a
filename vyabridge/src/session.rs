//! Anonymous session bootstrap.
//!
//! The client keeps a single `session` record holding at least a string `id`,
//! so that a reload can reattach to the same server-side session.

use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use parking_lot::Mutex;
use rand::RngCore;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Number of random bytes in a generated session id.
pub const ANON_ID_BYTES: usize = 18;

/// Durable client storage for the session record.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<Value>>;
    fn save(&self, record: &Value) -> Result<()>;
}

/// Session record stored as a JSON file.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Value>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        match serde_json::from_str(&content) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(path = %self.path.display(), "[SESSION] unreadable session record: {}", e);
                Ok(None)
            }
        }
    }

    fn save(&self, record: &Value) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(record)
            .map_err(|e| Error::Session(format!("cannot encode session: {}", e)))?;
        fs::write(&self.path, content)?;
        debug!(path = %self.path.display(), "[SESSION] record saved");
        Ok(())
    }
}

/// Volatile store, for tests and headless runs.
#[derive(Default)]
pub struct MemorySessionStore {
    record: Mutex<Option<Value>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Value>> {
        Ok(self.record.lock().clone())
    }

    fn save(&self, record: &Value) -> Result<()> {
        *self.record.lock() = Some(record.clone());
        Ok(())
    }
}

/// `id` of a well-formed session record.
pub fn session_id(record: &Value) -> Option<&str> {
    record.as_object()?.get("id")?.as_str()
}

/// Random id: `len` bytes from the thread CSPRNG, base64 encoded.
pub fn gen_anon_id(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}

/// Returns the stored session when it is an object with a string `id`,
/// otherwise creates and persists a fresh one.
pub fn fetch_or_create_session(store: &dyn SessionStore) -> Result<Value> {
    if let Some(record) = store.load()? {
        if session_id(&record).is_some() {
            debug!("[SESSION] reusing stored session");
            return Ok(record);
        }
        warn!("[SESSION] stored record has no id, replacing it");
    }

    let record = json!({ "id": gen_anon_id(ANON_ID_BYTES) });
    store.save(&record)?;
    info!("[SESSION] new anonymous session created");
    Ok(record)
}

/// Persists a session record supplied by the server.
pub fn init_session(store: &dyn SessionStore, record: &Value) -> Result<()> {
    if session_id(record).is_none() {
        return Err(Error::Session("session record carries no string id".to_string()));
    }
    store.save(record)
}
