// Atomic JSON file operations

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

lazy_static::lazy_static! {
    static ref FILE_LOCK: Mutex<()> = Mutex::new(());
}

/// Result of reading a JSON state file that is allowed to be absent or damaged
#[derive(Debug)]
pub enum JsonLoad<T> {
    Missing,
    Loaded(T),
    Corrupt(String),
}

pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
    let _lock = FILE_LOCK.lock();

    let contents =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {:?}: {}", path, e))?;

    serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse JSON from {:?}: {}", path, e))
}

/// Writes JSON atomically using write-to-temp-then-rename
pub fn write_json_file<T: Serialize + ?Sized>(path: &Path, data: &T) -> Result<(), String> {
    let _lock = FILE_LOCK.lock();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create directory {:?}: {}", parent, e))?;
    }

    let json_string = serde_json::to_string_pretty(data)
        .map_err(|e| format!("Failed to serialize data: {}", e))?;

    let temp_path = path.with_extension("tmp");

    let mut temp_file = File::create(&temp_path)
        .map_err(|e| format!("Failed to create temp file {:?}: {}", temp_path, e))?;

    temp_file
        .write_all(json_string.as_bytes())
        .map_err(|e| format!("Failed to write to temp file: {}", e))?;

    temp_file
        .sync_all()
        .map_err(|e| format!("Failed to sync temp file: {}", e))?;

    fs::rename(&temp_path, path)
        .map_err(|e| format!("Failed to rename temp file to {:?}: {}", path, e))?;

    Ok(())
}

pub fn initialize_json_file<T: Serialize + ?Sized>(path: &Path, default: &T) -> Result<(), String> {
    if !path.exists() {
        log::info!("Initializing JSON file: {:?}", path);
        write_json_file(path, default)?;
    }
    Ok(())
}

pub fn read_json_file_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T, String> {
    if path.exists() {
        read_json_file(path)
    } else {
        Ok(T::default())
    }
}

/// Reads a state file without failing: unreadable or unparseable content is
/// reported as `Corrupt` so the caller can reset it.
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> JsonLoad<T> {
    if !path.exists() {
        return JsonLoad::Missing;
    }

    match read_json_file(path) {
        Ok(data) => JsonLoad::Loaded(data),
        Err(e) => JsonLoad::Corrupt(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tabscribe-json-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_write_then_read() {
        let path = scratch_dir().join("nested").join("values.json");
        write_json_file(&path, &vec![1, 2, 3]).unwrap();

        let values: Vec<i32> = read_json_file(&path).unwrap();
        assert_eq!(values, vec![1, 2, 3]);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_load_reports_missing_and_corrupt() {
        let dir = scratch_dir();
        let missing = dir.join("missing.json");
        assert!(matches!(load_json_file::<Vec<i32>>(&missing), JsonLoad::Missing));

        let corrupt = dir.join("corrupt.json");
        fs::write(&corrupt, "[1, 2,").unwrap();
        assert!(matches!(load_json_file::<Vec<i32>>(&corrupt), JsonLoad::Corrupt(_)));
    }

    #[test]
    fn test_initialize_keeps_existing_file() {
        let path = scratch_dir().join("settings.json");
        write_json_file(&path, &vec!["kept"]).unwrap();
        initialize_json_file(&path, &Vec::<String>::new()).unwrap();

        let values: Vec<String> = read_json_file(&path).unwrap();
        assert_eq!(values, vec!["kept".to_string()]);
    }
}
