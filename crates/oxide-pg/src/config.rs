//! Settings loading for the CLI and embedding applications.

use std::path::Path;

use oxide_pg_core::Settings;
use tracing::debug;

use crate::error::Result;

/// Loads settings from an optional JSON file, then applies the search path
/// override.
pub fn load_settings(path: Option<&Path>, search_path: Option<&str>) -> Result<Settings> {
    let mut settings = match path {
        Some(path) => {
            debug!(path = %path.display(), "loading settings");
            Settings::from_json(&std::fs::read_to_string(path)?)?
        }
        None => Settings::default(),
    };
    if let Some(search_path) = search_path {
        settings.search_path = search_path.to_string();
    }
    Ok(settings)
}
