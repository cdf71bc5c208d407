//! Application state: the card repository and the study session over one storage handle.
use crate::config::AppConfig;
use crate::models::{ALL_TAGS, FilterChange, StudySession};
use crate::repository::CardRepository;
use crate::storage::{MemoryStore, SqliteStore, Storage};

pub struct AppState {
    pub repository: CardRepository,
    pub session: StudySession,
    pub config: AppConfig,
}

impl AppState {
    /// Opens the configured database, falling back to an in-memory store if it cannot
    /// be opened. Nothing written in that case survives a restart.
    pub fn open(config: AppConfig) -> Self {
        let storage = match SqliteStore::open(&config.database_path) {
            Ok(store) => {
                log::info!("Using database {}", config.database_path.display());
                Storage::new(store)
            }
            Err(e) => {
                log::error!(
                    "Failed to open database {}: {}; changes will not be saved",
                    config.database_path.display(),
                    e
                );
                Storage::new(MemoryStore::new())
            }
        };
        Self::with_storage(storage, config)
    }

    pub fn with_storage(storage: Storage, config: AppConfig) -> Self {
        let repository = CardRepository::load(storage.clone());
        let mut session = StudySession::restore(storage, config.auto_advance_delay());

        let tag = session.selected_tag();
        if tag != ALL_TAGS && !repository.list_tags().iter().any(|t| t == tag) {
            log::warn!("Stored tag filter '{}' matches no card, showing all tags", tag);
            session.change_filter(FilterChange::Tag(ALL_TAGS.to_string()));
        }
        session.clamp_cursor(&repository);

        Self {
            repository,
            session,
            config,
        }
    }
}
