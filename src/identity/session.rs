use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::error::AuthError;
use crate::tprintln;

use super::credential::Credential;
use super::principal::Identity;
use super::role::{normalize, Capability};

/// An authenticated identity together with the credential derived for it.
/// Identity and credential only ever exist together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub identity: Identity,
    pub capability: Capability,
    pub credential: Credential,
}

impl Session {
    /// Build a session from a successful login answer. The credential is derived from
    /// the canonical username the server returned, not from the typed login id.
    pub fn establish(identity: Identity, password: &str) -> Self {
        let credential = Credential::basic(&identity.username, password);
        let capability = normalize(&identity.role);
        Self { identity, capability, credential }
    }

    pub fn is_admin(&self) -> bool { self.capability.is_admin() }
}

/// What survives a reload: the credential, the normalized role and the identity shown
/// in the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub credential: Credential,
    pub role: Capability,
    pub identity: Identity,
}

impl PersistedSession {
    fn from_session(s: &Session) -> Self {
        Self { credential: s.credential.clone(), role: s.capability, identity: s.identity.clone() }
    }

    fn into_session(self) -> Session {
        Session { identity: self.identity, capability: self.role, credential: self.credential }
    }
}

/// Client-local durable storage for the session record.
pub trait SessionStorage: Send + Sync {
    fn load(&self) -> Result<Option<PersistedSession>>;
    fn save(&self, record: &PersistedSession) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// In-process storage. Clones share the same slot, so a handle kept across a
/// simulated reload sees what the previous store wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slot: Arc<Mutex<Option<PersistedSession>>>,
}

impl MemoryStorage {
    pub fn new() -> Self { Self::default() }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> Result<Option<PersistedSession>> { Ok(self.slot.lock().clone()) }

    fn save(&self, record: &PersistedSession) -> Result<()> {
        *self.slot.lock() = Some(record.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.slot.lock().take();
        Ok(())
    }
}

/// JSON file under the console state directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub const FILE_NAME: &'static str = "session.json";

    pub fn new<P: AsRef<Path>>(state_dir: P) -> Self {
        Self { path: state_dir.as_ref().join(Self::FILE_NAME) }
    }

    pub fn path(&self) -> &Path { &self.path }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> Result<Option<PersistedSession>> {
        if !self.path.exists() { return Ok(None); }
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading session file {}", self.path.display()))?;
        let rec: PersistedSession = serde_json::from_str(&text)
            .with_context(|| format!("parsing session file {}", self.path.display()))?;
        Ok(Some(rec))
    }

    fn save(&self, record: &PersistedSession) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating state directory {}", dir.display()))?;
        }
        // write-then-rename so a crash never leaves a half-written record
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(record)?)
            .with_context(|| format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing {}", self.path.display())),
        }
    }
}

/// Holds the current session in memory and mirrors it to a [`SessionStorage`].
pub struct SessionStore {
    storage: Box<dyn SessionStorage>,
    current: Option<Session>,
}

impl SessionStore {
    pub fn new(storage: Box<dyn SessionStorage>) -> Self { Self { storage, current: None } }

    pub fn in_memory() -> Self { Self::new(Box::new(MemoryStorage::new())) }

    pub fn current(&self) -> Option<&Session> { self.current.as_ref() }

    /// Authenticate against the API and, on success, remember and persist the session.
    /// A failed attempt leaves whatever was current untouched.
    pub async fn login(&mut self, api: &ApiClient, login_id: &str, password: &str) -> Result<Session, AuthError> {
        let identity = api.authenticate(login_id, password).await?;
        let session = Session::establish(identity, password);
        if let Err(e) = self.storage.save(&PersistedSession::from_session(&session)) {
            warn!(target: "studentdesk::session", "could not persist session: {e:#}");
        }
        info!(
            target: "studentdesk::session",
            user = %session.identity.username,
            capability = %session.capability,
            "session established"
        );
        self.current = Some(session.clone());
        Ok(session)
    }

    /// Rebuild the session from storage without contacting the server.
    /// An unreadable record is discarded.
    pub fn restore(&mut self) -> Option<&Session> {
        self.current = match self.storage.load() {
            Ok(rec) => rec.map(PersistedSession::into_session),
            Err(e) => {
                warn!(target: "studentdesk::session", "discarding unreadable session record: {e:#}");
                if let Err(e) = self.storage.clear() {
                    warn!(target: "studentdesk::session", "could not clear session record: {e:#}");
                }
                None
            }
        };
        tprintln!("session.restore present={}", self.current.is_some());
        self.current.as_ref()
    }

    pub fn logout(&mut self) {
        if let Some(s) = self.current.take() {
            info!(target: "studentdesk::session", user = %s.identity.username, "session cleared");
        }
        if let Err(e) = self.storage.clear() {
            warn!(target: "studentdesk::session", "could not clear session record: {e:#}");
        }
    }

    /// The browsing context is going away: drop the durable record but keep nothing else either.
    pub fn end_browsing_context(&mut self) {
        self.current = None;
        if let Err(e) = self.storage.clear() {
            warn!(target: "studentdesk::session", "could not clear session record: {e:#}");
        }
    }
}
