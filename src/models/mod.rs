pub mod flashcard;
pub mod session_record;
pub mod study_session;

pub use flashcard::Flashcard;
pub use session_record::{CardProgress, SessionRecord};
pub use study_session::{ALL_TAGS, FilterChange, StudyProgress, StudySession, StudyView};
