//! The output directory: where the tool writes, where retrievals read from.

use std::io;
use std::path::{Path, PathBuf};

use crate::util;
use crate::ytdlp::ResolvedMetadata;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobArtifactNaming {
    pub base: String,
    pub output_template: PathBuf,
    pub expected_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedFile {
    pub path: PathBuf,
    pub filename: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("invalid filename")]
    InvalidFilename,
    #[error("file not found")]
    NotFound,
}

#[derive(Debug, Clone)]
pub struct OutputDir {
    root: PathBuf,
}

impl OutputDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Creates the directory if needed; an existing non-directory at the path is an error.
    pub async fn ensure(&self) -> io::Result<()> {
        match tokio::fs::metadata(&self.root).await {
            Ok(m) if m.is_dir() => {
                log::info!("[OUTPUT] Downloads directory {} exists", self.root.display());
                return Ok(());
            }
            Ok(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} exists but is not a directory", self.root.display()),
                ));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        tokio::fs::create_dir_all(&self.root).await?;
        log::info!("[OUTPUT] Created downloads directory: {}", self.root.display());
        Ok(())
    }

    /// `<title>_<id>_<created_ms>`, with a `%(ext)s` template and the path expected for `format`.
    pub fn naming(&self, meta: &ResolvedMetadata, format: &str, created_ms: i64) -> JobArtifactNaming {
        let base = format!("{}_{}_{}", meta.title, meta.id, created_ms);
        JobArtifactNaming {
            output_template: self.root.join(format!("{}.%(ext)s", base)),
            expected_path: self.root.join(format!("{}.{}", base, format)),
            base,
        }
    }

    /// Finds what the tool actually wrote for `naming`.
    ///
    /// Exact expected path first, then `<base>*.<format>`, then any `<base>*`.
    pub async fn locate(&self, naming: &JobArtifactNaming, format: &str) -> Option<LocatedFile> {
        if tokio::fs::try_exists(&naming.expected_path).await.unwrap_or(false) {
            return located(naming.expected_path.clone());
        }

        let names = match self.file_names().await {
            Ok(n) => n,
            Err(e) => {
                log::error!(
                    "[OUTPUT] Error reading downloads directory {} for fallback: {}",
                    self.root.display(),
                    e
                );
                return None;
            }
        };

        let suffix = format!(".{}", format);
        if let Some(name) = names
            .iter()
            .find(|n| n.starts_with(&naming.base) && n.ends_with(&suffix))
        {
            return located(self.root.join(name));
        }

        let name = names.iter().find(|n| n.starts_with(&naming.base))?;
        log::warn!("[OUTPUT] Expected format .{} not found, but found {}", format, name);
        located(self.root.join(name))
    }

    /// Regular files directly in the directory, sorted by name.
    async fn file_names(&self) -> io::Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Maps a retrieval handle to a file path inside the directory.
    ///
    /// Anything that is not a bare filename is rejected before the filesystem is touched.
    pub async fn resolve_retrieval(&self, filename: &str) -> Result<PathBuf, RetrievalError> {
        if !util::is_plain_filename(filename) {
            return Err(RetrievalError::InvalidFilename);
        }
        let path = self.root.join(filename);
        match tokio::fs::metadata(&path).await {
            Ok(m) if m.is_file() => Ok(path),
            _ => Err(RetrievalError::NotFound),
        }
    }
}

fn located(path: PathBuf) -> Option<LocatedFile> {
    let filename = path.file_name()?.to_string_lossy().into_owned();
    Some(LocatedFile { path, filename })
}
