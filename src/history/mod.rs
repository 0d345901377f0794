//! History Module
//!
//! Persistence of completed runs and setup preferences: the history
//! store with export and merge-on-import, key/value storage backends,
//! the remembered audio level, device suggestions and backup discovery.

pub mod backups;
pub mod devices;
pub mod preferences;
pub mod record;
pub mod storage;
pub mod store;

pub use backups::{latest_backup, list_backups};
pub use devices::{filter_suggestions, DeviceEnumerator};
pub use preferences::{load_audio_level, save_audio_level, AUDIO_LEVEL_KEY};
pub use record::{ImportOutcome, SavedResult};
pub use storage::{FileStorage, MemoryStorage, StorageBackend};
pub use store::{export_filename, HistoryStore, RESULTS_KEY};
