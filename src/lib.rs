pub mod analytics;
pub mod config;
pub mod export;
pub mod models;
pub mod repository;
pub mod state;
pub mod storage;

pub use analytics::{Insight, LearningStats, TagStats};
pub use config::AppConfig;
pub use models::{FilterChange, Flashcard, SessionRecord, StudySession, StudyView};
pub use repository::{CardError, CardRepository, CreatedCard};
pub use state::AppState;
pub use storage::{Storage, StorageError};
