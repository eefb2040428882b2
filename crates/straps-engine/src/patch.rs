//! Patch application
//!
//! The engine treats patching as an external collaborator behind
//! [`PatchApplier`]. [`SubprocessPatcher`] drives `patch(1)` on scratch files
//! inside a temporary directory, so rejects and backups never leak.

use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Errors from applying a patch
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    /// The patch program could not be started
    #[error("could not run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Scratch file handling failed
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The patch did not apply; carries the tool's output
    #[error("{diagnostic}")]
    Rejected { diagnostic: String },
}

impl PatchError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Merges a unified diff into a base text
#[cfg_attr(test, mockall::automock)]
pub trait PatchApplier: Send + Sync {
    /// Apply `patch` to `original`, tolerating `fuzz` lines of context drift
    ///
    /// # Errors
    /// Returns [`PatchError::Rejected`] with diagnostics if the patch does not apply
    fn apply(&self, original: &str, patch: &str, fuzz: u32) -> Result<String, PatchError>;
}

/// [`PatchApplier`] backed by the `patch` program
#[derive(Debug, Clone)]
pub struct SubprocessPatcher {
    program: String,
}

impl SubprocessPatcher {
    /// Use a specific patch program
    #[inline]
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Program this patcher runs
    #[inline]
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for SubprocessPatcher {
    fn default() -> Self {
        Self::new("patch")
    }
}

impl PatchApplier for SubprocessPatcher {
    fn apply(&self, original: &str, patch: &str, fuzz: u32) -> Result<String, PatchError> {
        let scratch = tempfile::tempdir().map_err(|e| PatchError::io(std::env::temp_dir(), e))?;
        let target = scratch.path().join("original.py");
        let patch_file = scratch.path().join("change.patch");

        std::fs::write(&target, with_newline(original)).map_err(|e| PatchError::io(&target, e))?;
        std::fs::write(&patch_file, with_newline(patch))
            .map_err(|e| PatchError::io(&patch_file, e))?;

        let output = Command::new(&self.program)
            .arg("--batch")
            .arg("-l")
            .arg(format!("--fuzz={fuzz}"))
            .arg(&target)
            .arg(&patch_file)
            .current_dir(scratch.path())
            .stdin(Stdio::null())
            .output()
            .map_err(|source| PatchError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let mut diagnostic = String::from_utf8_lossy(&output.stdout).into_owned();
            diagnostic.push_str(&String::from_utf8_lossy(&output.stderr));
            tracing::debug!(status = ?output.status, "patch rejected");
            return Err(PatchError::Rejected {
                diagnostic: diagnostic.trim().to_string(),
            });
        }

        std::fs::read_to_string(&target).map_err(|e| PatchError::io(&target, e))
    }
}

fn with_newline(text: &str) -> String {
    if text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{text}\n")
    }
}
