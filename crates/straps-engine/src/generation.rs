//! Generation persistence
//!
//! Every completed session writes the store to `<stem>__<N>.<ext>` next to
//! the source (or in a configured directory), where `N` is one more than the
//! highest generation already present. Existing files are never touched: the
//! text goes to a temporary file first and is renamed into place only if the
//! target name is still free.

use std::io::Write;
use std::path::{Path, PathBuf};

use straps_artifact::{ContentHash, DeclarationStore};

/// Separator between the source stem and the generation number
pub const GENERATION_SEPARATOR: &str = "__";

/// Attempts before giving up on a contended directory
const MAX_ATTEMPTS: usize = 16;

/// Errors while writing a generation
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Source path has no usable file name
    #[error("source path has no file name: {0}")]
    InvalidSource(PathBuf),

    /// IO error during scan or write
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Highest existing generation is already the largest representable number
    #[error("generation numbers exhausted in {0}")]
    NumberOverflow(PathBuf),

    /// Every candidate number was taken concurrently
    #[error("no free generation number in {dir} after {attempts} attempts")]
    Exhausted { dir: PathBuf, attempts: usize },
}

impl GenerationError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// A written generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    /// Generation number
    pub number: u64,
    /// Path of the written file
    pub path: PathBuf,
    /// Fingerprint of the written text
    pub fingerprint: ContentHash,
}

/// Writes numbered generations of one source unit
#[derive(Debug, Clone)]
pub struct GenerationWriter {
    dir: PathBuf,
    stem: String,
    extension: Option<String>,
}

impl GenerationWriter {
    /// Writer for generations of `source`, placed in the source's directory
    ///
    /// # Errors
    /// [`GenerationError::InvalidSource`] if the path has no file stem
    pub fn for_source(source: &Path) -> Result<Self, GenerationError> {
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| GenerationError::InvalidSource(source.to_path_buf()))?;

        let dir = match source.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Ok(Self {
            dir,
            stem: stem.to_string(),
            extension: source
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_string),
        })
    }

    /// Place generations in another directory
    #[inline]
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    /// Output directory
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name prefix shared by every generation
    #[must_use]
    pub fn prefix(&self) -> String {
        format!("{}{GENERATION_SEPARATOR}", self.stem)
    }

    /// File name of generation `number`
    #[must_use]
    pub fn file_name(&self, number: u64) -> String {
        match &self.extension {
            Some(ext) => format!("{}{number}.{ext}", self.prefix()),
            None => format!("{}{number}", self.prefix()),
        }
    }

    /// One more than the highest generation present in the directory
    ///
    /// # Errors
    /// Returns IO errors from reading the directory, or
    /// [`GenerationError::NumberOverflow`] if a generation numbered
    /// `u64::MAX` already exists
    pub fn next_number(&self) -> Result<u64, GenerationError> {
        let prefix = self.prefix();
        let mut highest = 0;

        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(1),
            Err(e) => return Err(GenerationError::io(&self.dir, e)),
        };

        for entry in entries {
            let entry = entry.map_err(|e| GenerationError::io(&self.dir, e))?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some(number) = generation_number(file_name, &prefix, self.extension.as_deref())
            {
                highest = highest.max(number);
            }
        }

        highest
            .checked_add(1)
            .ok_or_else(|| GenerationError::NumberOverflow(self.dir.clone()))
    }

    /// Serialize `store` under the next free generation number
    ///
    /// # Errors
    /// Returns IO errors, or [`GenerationError::Exhausted`] if other writers
    /// keep claiming the candidate names
    pub fn write(&self, store: &DeclarationStore) -> Result<Generation, GenerationError> {
        let text = store.serialize();
        std::fs::create_dir_all(&self.dir).map_err(|e| GenerationError::io(&self.dir, e))?;

        let mut scratch = tempfile::Builder::new()
            .prefix(".straps-")
            .tempfile_in(&self.dir)
            .map_err(|e| GenerationError::io(&self.dir, e))?;
        scratch
            .write_all(text.as_bytes())
            .and_then(|()| scratch.as_file().sync_all())
            .map_err(|e| GenerationError::io(scratch.path(), e))?;

        for _ in 0..MAX_ATTEMPTS {
            let number = self.next_number()?;
            let path = self.dir.join(self.file_name(number));

            match scratch.persist_noclobber(&path) {
                Ok(_) => {
                    let fingerprint = ContentHash::compute(text.as_bytes());
                    tracing::info!(generation = number, path = %path.display(), %fingerprint, "generation written");
                    return Ok(Generation {
                        number,
                        path,
                        fingerprint,
                    });
                }
                Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
                    tracing::debug!(generation = number, "generation claimed concurrently, retrying");
                    scratch = e.file;
                }
                Err(e) => return Err(GenerationError::io(path, e.error)),
            }
        }

        Err(GenerationError::Exhausted {
            dir: self.dir.clone(),
            attempts: MAX_ATTEMPTS,
        })
    }
}

/// Generation number encoded in `file_name`
///
/// `None` if the name does not carry `prefix`. A suffix that is not a number
/// counts as generation 0.
#[must_use]
pub fn generation_number(file_name: &str, prefix: &str, extension: Option<&str>) -> Option<u64> {
    let rest = file_name.strip_prefix(prefix)?;
    let digits = match extension {
        Some(ext) => rest
            .strip_suffix(ext)
            .and_then(|r| r.strip_suffix('.'))
            .unwrap_or(rest),
        None => rest,
    };
    Some(digits.parse().unwrap_or(0))
}
