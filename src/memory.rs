use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fs::{self, create_dir_all};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

/// Remembers the last submitter name so the form can prefill it.
///
/// Implementations are interchangeable conveniences; the entry writer never
/// sees them.
pub trait NameMemory: Send + Sync {
    fn remember(&self, name: &str) -> io::Result<()>;

    /// The remembered name, or `None` when nothing (or only blanks) is stored.
    fn recall(&self) -> Option<String>;
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Keeps the name in a small text file.
#[derive(Debug, Clone)]
pub struct FileNameMemory {
    path: PathBuf,
}

impl FileNameMemory {
    pub fn new(path: impl AsRef<Path>) -> Self {
        FileNameMemory {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NameMemory for FileNameMemory {
    fn remember(&self, name: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, name.trim())
    }

    fn recall(&self) -> Option<String> {
        fs::read_to_string(&self.path)
            .ok()
            .and_then(|contents| non_blank(&contents))
    }
}

/// One name shared by every visitor of this process.
#[derive(Debug, Default)]
pub struct SharedNameMemory {
    value: RwLock<Option<String>>,
}

impl SharedNameMemory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NameMemory for SharedNameMemory {
    fn remember(&self, name: &str) -> io::Result<()> {
        let mut value = self
            .value
            .write()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "name memory lock poisoned"))?;
        *value = non_blank(name);
        Ok(())
    }

    fn recall(&self) -> Option<String> {
        self.value.read().ok().and_then(|value| value.clone())
    }
}

/// How long a session id stays valid after it was issued or last used.
const SESSION_DURATION: u64 = 24 * 60 * 60; // 24 hours in seconds

/// A session the server handed out, with its remembered name if any.
#[derive(Debug, Clone)]
struct SessionEntry {
    name: Option<String>,
    expires_at: SystemTime,
}

impl SessionEntry {
    fn fresh(name: Option<String>) -> Self {
        SessionEntry {
            name,
            expires_at: SystemTime::now() + Duration::from_secs(SESSION_DURATION),
        }
    }

    fn is_live(&self, now: SystemTime) -> bool {
        self.expires_at > now
    }
}

// Sessions issued by this process, keyed by session id
lazy_static! {
    static ref SESSION_NAMES: RwLock<HashMap<String, SessionEntry>> = RwLock::new(HashMap::new());
}

fn lock_poisoned() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "session store lock poisoned")
}

fn prune_expired(names: &mut HashMap<String, SessionEntry>) {
    let now = SystemTime::now();
    names.retain(|_, entry| entry.is_live(now));
}

/// Generate a fresh session id for the `session` cookie.
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// Issue a new session id and register it, so that later requests carrying
/// it are recognised. Expired sessions are dropped on the way.
pub fn start_session() -> io::Result<String> {
    let mut names = SESSION_NAMES.write().map_err(|_| lock_poisoned())?;
    prune_expired(&mut names);
    let id = new_session_id();
    names.insert(id.clone(), SessionEntry::fresh(None));
    Ok(id)
}

/// Whether `session_id` was issued by [`start_session`] and has not expired.
pub fn session_is_active(session_id: &str) -> bool {
    match SESSION_NAMES.read() {
        Ok(names) => names
            .get(session_id)
            .is_some_and(|entry| entry.is_live(SystemTime::now())),
        Err(_) => false,
    }
}

/// The name remembered for one browser session.
///
/// Only ids handed out by [`start_session`] carry a name; remembering under
/// an unknown or expired id is refused.
#[derive(Debug, Clone)]
pub struct SessionNameMemory {
    session_id: String,
}

impl SessionNameMemory {
    pub fn new(session_id: impl Into<String>) -> Self {
        SessionNameMemory {
            session_id: session_id.into(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Drop the session and its remembered name.
    pub fn forget(&self) {
        if let Ok(mut names) = SESSION_NAMES.write() {
            names.remove(&self.session_id);
        }
    }
}

impl NameMemory for SessionNameMemory {
    fn remember(&self, name: &str) -> io::Result<()> {
        let mut names = SESSION_NAMES.write().map_err(|_| lock_poisoned())?;
        prune_expired(&mut names);
        if !names.contains_key(&self.session_id) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "unknown or expired session",
            ));
        }
        names.insert(self.session_id.clone(), SessionEntry::fresh(non_blank(name)));
        Ok(())
    }

    fn recall(&self) -> Option<String> {
        let names = SESSION_NAMES.read().ok()?;
        names
            .get(&self.session_id)
            .filter(|entry| entry.is_live(SystemTime::now()))
            .and_then(|entry| entry.name.clone())
    }
}
