use maniac_shared::Profile;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::StoreError;

/// Durable home of the player's [`Profile`].
pub trait Store: Send {
    fn load(&self) -> Result<Option<Profile>, StoreError>;
    fn save(&mut self, profile: &Profile) -> Result<(), StoreError>;
}

/// In-process store. Clones share the same slot, so a ledger rebuilt over
/// a clone sees what the previous one saved.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<Profile>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(profile: Profile) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(profile))),
        }
    }

    pub fn snapshot(&self) -> Option<Profile> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Store for MemoryStore {
    fn load(&self) -> Result<Option<Profile>, StoreError> {
        Ok(self.snapshot())
    }

    fn save(&mut self, profile: &Profile) -> Result<(), StoreError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(profile.clone());
        Ok(())
    }
}

/// Pretty-printed JSON on disk, replaced atomically through a sibling file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl Store for JsonFileStore {
    fn load(&self) -> Result<Option<Profile>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&mut self, profile: &Profile) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let staging = self.staging_path();
        fs::write(&staging, serde_json::to_vec_pretty(profile)?)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}
