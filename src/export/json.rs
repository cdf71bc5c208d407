//! JSON export of the card collection.
//! Writes the same ordered array shape that is kept under `flashmaster-cards`.

use crate::models::Flashcard;
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Exports all cards to a pretty-printed JSON file at the specified path.
pub fn export_cards_to_path(cards: &[Flashcard], path: &Path) -> Result<(), ExportError> {
    let json_string = serde_json::to_string_pretty(cards)?;
    let mut file = File::create(path)?;
    file.write_all(json_string.as_bytes())?;
    log::info!("Exported {} cards to '{}'", cards.len(), path.display());
    Ok(())
}
