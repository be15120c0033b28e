use std::path::{Path, PathBuf};

const BASE_DIR_ENV: &str = "TUBEME_DIR";
const BASE_DIR_NAME: &str = ".tubeme";

/// Home of the persisted keys and user settings.
pub(crate) fn base_dir() -> Option<PathBuf> {
    if let Some(dir) = base_dir_override() {
        return Some(dir);
    }
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(BASE_DIR_NAME))
        }
    })
}

pub(crate) fn keys_path() -> PathBuf {
    base_dir()
        .unwrap_or_else(|| PathBuf::from(BASE_DIR_NAME))
        .join("keys.json")
}

pub(crate) fn preview_path() -> PathBuf {
    base_dir()
        .unwrap_or_else(|| PathBuf::from(BASE_DIR_NAME))
        .join("preview.png")
}

fn base_dir_override() -> Option<PathBuf> {
    std::env::var(BASE_DIR_ENV).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(PathBuf::from(trimmed))
        }
    })
}
