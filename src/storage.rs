use std::collections::HashMap;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::{AiConfig, AiProvider, Entry, LockConfig};

const ENTRIES_FILE: &str = "dreams.json";
const TRASHED_FILE: &str = "trashed_dreams.json";
const LOCK_CONFIG_FILE: &str = "password_config.json";
const PASSWORD_HASH_FILE: &str = "password_hash.txt";
const FIRST_LAUNCH_FILE: &str = "first_launch.txt";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed stored document: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Failed to create data directory: {0}")]
    Directory(String),
}

/// Persistence gateway for whole-document collections. Implementations are
/// swappable; the repository and session guard only see this trait.
pub trait Storage {
    fn load_entries(&self) -> Result<Vec<Entry>, StorageError>;
    fn save_entries(&mut self, entries: &[Entry]) -> Result<(), StorageError>;

    fn load_trashed(&self) -> Result<Vec<Entry>, StorageError>;
    fn save_trashed(&mut self, entries: &[Entry]) -> Result<(), StorageError>;

    fn load_ai_config(&self, provider: AiProvider) -> Result<AiConfig, StorageError>;
    fn save_ai_config(&mut self, config: &AiConfig) -> Result<(), StorageError>;

    fn load_lock_config(&self) -> Result<LockConfig, StorageError>;
    fn save_lock_config(&mut self, config: &LockConfig) -> Result<(), StorageError>;

    fn load_password_hash(&self) -> Result<Option<String>, StorageError>;
    fn save_password_hash(&mut self, hash: &str) -> Result<(), StorageError>;

    fn is_first_launch(&self) -> bool;
    fn mark_first_launch_complete(&mut self) -> Result<(), StorageError>;
}

/// Migration applied on every read of an entry collection: the serde default
/// already fills a missing citation list, and this pass additionally drops
/// self-references and duplicate ids so the core never observes either.
pub fn normalize_citations(entries: &mut [Entry]) {
    for entry in entries.iter_mut() {
        let own_id = entry.id.clone();
        let mut seen = HashSet::new();
        entry
            .cited_entries
            .retain(|id| *id != own_id && seen.insert(id.clone()));
    }
}

/// File-backed store: one JSON document per collection under a data
/// directory, matching the original desktop app's on-disk layout.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| StorageError::Directory(e.to_string()))?;
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn ai_config_path(&self, provider: AiProvider) -> PathBuf {
        self.dir
            .join(format!("ai_config_{}.json", provider.as_str()))
    }

    fn read_collection(&self, file: &str) -> Result<Vec<Entry>, StorageError> {
        let path = self.dir.join(file);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(&path)?;
        let mut entries: Vec<Entry> = serde_json::from_str(&data)?;
        normalize_citations(&mut entries);
        Ok(entries)
    }

    fn write_collection(&self, file: &str, entries: &[Entry]) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(entries)?;
        fs::write(self.dir.join(file), json)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn load_entries(&self) -> Result<Vec<Entry>, StorageError> {
        self.read_collection(ENTRIES_FILE)
    }

    fn save_entries(&mut self, entries: &[Entry]) -> Result<(), StorageError> {
        self.write_collection(ENTRIES_FILE, entries)
    }

    fn load_trashed(&self) -> Result<Vec<Entry>, StorageError> {
        self.read_collection(TRASHED_FILE)
    }

    fn save_trashed(&mut self, entries: &[Entry]) -> Result<(), StorageError> {
        self.write_collection(TRASHED_FILE, entries)
    }

    fn load_ai_config(&self, provider: AiProvider) -> Result<AiConfig, StorageError> {
        let path = self.ai_config_path(provider);
        if !path.exists() {
            return Ok(AiConfig::default_for(provider));
        }
        let data = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&data)?)
    }

    fn save_ai_config(&mut self, config: &AiConfig) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(config)?;
        fs::write(self.ai_config_path(config.provider), json)?;
        Ok(())
    }

    fn load_lock_config(&self) -> Result<LockConfig, StorageError> {
        let path = self.dir.join(LOCK_CONFIG_FILE);
        if !path.exists() {
            return Ok(LockConfig::default());
        }
        let data = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&data)?)
    }

    fn save_lock_config(&mut self, config: &LockConfig) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(config)?;
        fs::write(self.dir.join(LOCK_CONFIG_FILE), json)?;
        Ok(())
    }

    fn load_password_hash(&self) -> Result<Option<String>, StorageError> {
        let path = self.dir.join(PASSWORD_HASH_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let hash = fs::read_to_string(&path)?.trim().to_string();
        Ok(if hash.is_empty() { None } else { Some(hash) })
    }

    fn save_password_hash(&mut self, hash: &str) -> Result<(), StorageError> {
        fs::write(self.dir.join(PASSWORD_HASH_FILE), hash)?;
        Ok(())
    }

    fn is_first_launch(&self) -> bool {
        !self.dir.join(FIRST_LAUNCH_FILE).exists()
    }

    fn mark_first_launch_complete(&mut self) -> Result<(), StorageError> {
        fs::write(self.dir.join(FIRST_LAUNCH_FILE), "completed")?;
        Ok(())
    }
}

/// In-memory store for tests and ephemeral sessions. Counts writes so tests
/// can assert that no-op commits produce zero persisted writes.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Vec<Entry>,
    trashed: Vec<Entry>,
    ai_configs: HashMap<AiProvider, AiConfig>,
    lock_config: Option<LockConfig>,
    password_hash: Option<String>,
    first_launch_done: bool,
    entry_saves: usize,
    trashed_saves: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry_saves(&self) -> usize {
        self.entry_saves
    }

    pub fn trashed_saves(&self) -> usize {
        self.trashed_saves
    }
}

impl Storage for MemoryStorage {
    fn load_entries(&self) -> Result<Vec<Entry>, StorageError> {
        let mut entries = self.entries.clone();
        normalize_citations(&mut entries);
        Ok(entries)
    }

    fn save_entries(&mut self, entries: &[Entry]) -> Result<(), StorageError> {
        self.entries = entries.to_vec();
        self.entry_saves += 1;
        Ok(())
    }

    fn load_trashed(&self) -> Result<Vec<Entry>, StorageError> {
        Ok(self.trashed.clone())
    }

    fn save_trashed(&mut self, entries: &[Entry]) -> Result<(), StorageError> {
        self.trashed = entries.to_vec();
        self.trashed_saves += 1;
        Ok(())
    }

    fn load_ai_config(&self, provider: AiProvider) -> Result<AiConfig, StorageError> {
        Ok(self
            .ai_configs
            .get(&provider)
            .cloned()
            .unwrap_or_else(|| AiConfig::default_for(provider)))
    }

    fn save_ai_config(&mut self, config: &AiConfig) -> Result<(), StorageError> {
        self.ai_configs.insert(config.provider, config.clone());
        Ok(())
    }

    fn load_lock_config(&self) -> Result<LockConfig, StorageError> {
        Ok(self.lock_config.clone().unwrap_or_default())
    }

    fn save_lock_config(&mut self, config: &LockConfig) -> Result<(), StorageError> {
        self.lock_config = Some(config.clone());
        Ok(())
    }

    fn load_password_hash(&self) -> Result<Option<String>, StorageError> {
        Ok(self.password_hash.clone())
    }

    fn save_password_hash(&mut self, hash: &str) -> Result<(), StorageError> {
        self.password_hash = if hash.is_empty() {
            None
        } else {
            Some(hash.to_string())
        };
        Ok(())
    }

    fn is_first_launch(&self) -> bool {
        !self.first_launch_done
    }

    fn mark_first_launch_complete(&mut self) -> Result<(), StorageError> {
        self.first_launch_done = true;
        Ok(())
    }
}
