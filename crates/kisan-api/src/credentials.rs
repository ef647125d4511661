//! Session persistence backends
//!
//! Implementations of [`ICredentialStore`]:
//!
//! - [`MemoryCredentialStore`] - process memory only
//! - [`FileCredentialStore`] - one JSON document on disk, replaced atomically
//! - [`KeyringCredentialStore`] - one entry in the OS secret service
//!
//! All three store the whole [`Session`] as a single unit.

use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use anyhow::{Context, Result};
use kisan_core::{
    config::{SessionBackend, SessionConfig},
    domain::Session,
    ports::ICredentialStore,
};
use tracing::{debug, info, warn};

// ============================================================================
// MemoryCredentialStore
// ============================================================================

/// Keeps the session in memory for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    session: Mutex<Option<Session>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `session`
    pub fn with_session(session: Session) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }
}

impl ICredentialStore for MemoryCredentialStore {
    fn load(&self) -> Option<Session> {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn save(&self, session: &Session) -> Result<()> {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

// ============================================================================
// FileCredentialStore
// ============================================================================

/// Stores the session as a JSON file
///
/// `save` writes a sibling temporary file and renames it over the target,
/// so readers see either the old or the new session, never a mix.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the session file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "session.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ICredentialStore for FileCredentialStore {
    fn load(&self) -> Option<Session> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No stored session");
                return None;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read session file");
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable session file");
                None
            }
        }
    }

    fn save(&self, session: &Session) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_vec_pretty(session).context("Failed to serialize session")?;
        let temp = self.temp_path();

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options
            .open(&temp)
            .with_context(|| format!("Failed to open {}", temp.display()))?;
        file.write_all(&json)
            .and_then(|()| file.sync_all())
            .with_context(|| format!("Failed to write {}", temp.display()))?;
        drop(file);

        std::fs::rename(&temp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        debug!(path = %self.path.display(), "Stored session");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "Cleared stored session");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("Failed to remove {}", self.path.display()))),
        }
    }
}

// ============================================================================
// KeyringCredentialStore
// ============================================================================

/// Stores the session in the system keyring
///
/// Uses the `keyring` crate (GNOME Keyring, KDE Wallet, macOS Keychain).
/// The session is serialized as JSON into a single entry.
#[derive(Debug, Clone)]
pub struct KeyringCredentialStore {
    service: String,
    user: String,
}

impl KeyringCredentialStore {
    pub fn new(service: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            user: user.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, &self.user).context("Failed to create keyring entry")
    }
}

impl ICredentialStore for KeyringCredentialStore {
    fn load(&self) -> Option<Session> {
        let entry = match self.entry() {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Keyring unavailable");
                return None;
            }
        };

        match entry.get_password() {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(session) => Some(session),
                Err(e) => {
                    warn!(service = %self.service, error = %e, "Ignoring unreadable keyring session");
                    None
                }
            },
            Err(keyring::Error::NoEntry) => {
                debug!(service = %self.service, user = %self.user, "No session in keyring");
                None
            }
            Err(e) => {
                warn!(service = %self.service, error = %e, "Failed to read from keyring");
                None
            }
        }
    }

    fn save(&self, session: &Session) -> Result<()> {
        let json = serde_json::to_string(session).context("Failed to serialize session")?;
        self.entry()?
            .set_password(&json)
            .context("Failed to store session in keyring")?;
        debug!(service = %self.service, user = %self.user, "Stored session in keyring");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) => {
                info!(service = %self.service, user = %self.user, "Cleared session from keyring");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to delete from keyring")),
        }
    }
}

/// Builds the credential store selected by the `session` configuration
pub fn open_store(config: &SessionConfig) -> Arc<dyn ICredentialStore> {
    match config.backend {
        SessionBackend::File => Arc::new(FileCredentialStore::new(config.file.clone())),
        SessionBackend::Keyring => Arc::new(KeyringCredentialStore::new(
            config.keyring_service.clone(),
            config.keyring_user.clone(),
        )),
        SessionBackend::Memory => Arc::new(MemoryCredentialStore::new()),
    }
}
