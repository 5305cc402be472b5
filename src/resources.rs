//! Resource lookup for sound files.
//!
//! Resource names are normalized (lowercase, forward slashes) before any
//! lookup so `Sound\\Fx\\Hit.WAV` and `sound/fx/hit.wav` address the same file.

use crate::audio_data::{SoundDecoder, SymphoniaDecoder};
use crate::error::Result;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

pub fn normalize_path(name: &str) -> String {
    name.chars()
        .map(|c| if c == '\\' { '/' } else { c.to_ascii_lowercase() })
        .collect()
}

/// Replaces the extension of `name` (text after the last `.`) with `ext`.
pub(crate) fn with_extension(name: &str, ext: &str) -> String {
    match name.rfind('.') {
        Some(pos) => format!("{}.{}", &name[..pos], ext),
        None => name.to_string(),
    }
}

/// Read-only view of the game's sound files.
pub trait SoundResources {
    type Decoder: SoundDecoder + 'static;

    fn exists(&self, name: &str) -> bool;

    /// Normalized names starting with `prefix`, in sorted order.
    fn list(&self, prefix: &str) -> Vec<String>;

    /// A fresh, unopened decoder.
    fn decoder(&self) -> Self::Decoder;
}

/// Filesystem-backed index of every file under a data directory.
#[derive(Debug, Clone)]
pub struct FileIndex {
    root: PathBuf,
    files: Arc<BTreeMap<String, PathBuf>>,
}

impl FileIndex {
    /// Walks `root` recursively and indexes every regular file by its
    /// normalized path relative to `root`.
    pub fn scan(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let mut files = BTreeMap::new();

        for entry in WalkDir::new(&root) {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(&root) {
                let name = normalize_path(&relative.to_string_lossy());
                files.insert(name, entry.into_path());
            }
        }

        log::info!("Indexed {} files under {}", files.len(), root.display());
        Ok(Self {
            root,
            files: Arc::new(files),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn path_of(&self, name: &str) -> Option<&Path> {
        self.files.get(&normalize_path(name)).map(PathBuf::as_path)
    }
}

impl SoundResources for FileIndex {
    type Decoder = SymphoniaDecoder;

    fn exists(&self, name: &str) -> bool {
        self.files.contains_key(&normalize_path(name))
    }

    fn list(&self, prefix: &str) -> Vec<String> {
        let prefix = normalize_path(prefix);
        self.files
            .range(prefix.clone()..)
            .take_while(|(name, _)| name.starts_with(&prefix))
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn decoder(&self) -> SymphoniaDecoder {
        SymphoniaDecoder::new(self.files.clone())
    }
}
