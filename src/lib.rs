pub mod ai;
pub mod analytics;
pub mod autosave;
pub mod cli;
pub mod config;
pub mod graph;
pub mod ident;
pub mod lock;
pub mod models;
pub mod repository;
pub mod storage;
pub mod taxonomy;
pub mod utils;

pub use config::Config;
pub use models::{AiConfig, AiProvider, Entry, EntryDraft, HierarchicalTag, LockConfig};
pub use repository::EntryRepository;
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use utils::Profile;
