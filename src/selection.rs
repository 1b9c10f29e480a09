// Single-file selection and validation
use crate::error::TranscriptionError;
use log::{debug, warn};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// The service rejects uploads above 100 MiB
pub const MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("ogg", "audio/ogg"),
];

/// A validated audio file ready for upload
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StagedFile {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
}

pub fn mime_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    ALLOWED_TYPES
        .iter()
        .find(|(allowed, _)| *allowed == ext)
        .map(|(_, mime)| *mime)
}

#[derive(Debug, Default)]
pub struct FileSelection {
    current: Option<StagedFile>,
}

impl FileSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and stage `path`. On rejection the previous selection is kept.
    pub fn stage(&mut self, path: impl AsRef<Path>) -> Result<&StagedFile, TranscriptionError> {
        let path = path.as_ref();
        let staged = inspect(path)?;
        debug!("Staged {} ({} bytes, {})", staged.name, staged.size, staged.mime_type);
        Ok(&*self.current.insert(staged))
    }

    pub fn current(&self) -> Option<&StagedFile> {
        self.current.as_ref()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

fn inspect(path: &Path) -> Result<StagedFile, TranscriptionError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let mime_type = mime_type_for(path).ok_or_else(|| {
        warn!("Rejected file with unsupported type: {:?}", path);
        TranscriptionError::UnsupportedFileType(name.clone())
    })?;

    let meta = fs::metadata(path).map_err(|_| TranscriptionError::NoFileSelected)?;
    if !meta.is_file() {
        return Err(TranscriptionError::NoFileSelected);
    }
    if meta.len() > MAX_UPLOAD_BYTES {
        return Err(TranscriptionError::FileTooLarge {
            size: meta.len(),
            limit: MAX_UPLOAD_BYTES,
        });
    }

    Ok(StagedFile {
        path: path.to_path_buf(),
        name,
        size: meta.len(),
        mime_type: mime_type.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_file(name: &str, bytes: &[u8]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tabscribe-sel-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(mime_type_for(Path::new("a/b/riff.MP3")), Some("audio/mpeg"));
        assert_eq!(mime_type_for(Path::new("take.wav")), Some("audio/wav"));
        assert_eq!(mime_type_for(Path::new("take.ogg")), Some("audio/ogg"));
        assert_eq!(mime_type_for(Path::new("take.flac")), None);
        assert_eq!(mime_type_for(Path::new("README")), None);
    }

    #[test]
    fn test_stage_valid_file() {
        let path = scratch_file("bassline.mp3", b"ID3....");
        let mut selection = FileSelection::new();

        let staged = selection.stage(&path).unwrap();
        assert_eq!(staged.name, "bassline.mp3");
        assert_eq!(staged.size, 7);
        assert_eq!(staged.mime_type, "audio/mpeg");
        assert!(selection.current().is_some());
    }

    #[test]
    fn test_rejected_file_keeps_previous_selection() {
        let good = scratch_file("good.wav", b"RIFF");
        let bad = scratch_file("notes.txt", b"hello");
        let mut selection = FileSelection::new();
        selection.stage(&good).unwrap();

        let err = selection.stage(&bad).unwrap_err();
        assert_eq!(err, TranscriptionError::UnsupportedFileType("notes.txt".to_string()));
        assert_eq!(selection.current().unwrap().name, "good.wav");
    }

    #[test]
    fn test_missing_file_and_clear() {
        let mut selection = FileSelection::new();
        let missing = std::env::temp_dir().join("tabscribe-definitely-missing.mp3");
        assert_eq!(selection.stage(&missing).unwrap_err(), TranscriptionError::NoFileSelected);

        let path = scratch_file("x.ogg", b"OggS");
        selection.stage(&path).unwrap();
        selection.clear();
        assert!(selection.current().is_none());
    }
}
