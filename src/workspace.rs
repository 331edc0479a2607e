//! Per-job temporary working directory.
//!
//! A [`JobWorkspace`] owns every intermediate file of one conversion job: persisted pages,
//! copied external illustrations. Each job gets its own uniquely named directory, and the
//! job removes it exactly once through [`JobWorkspace::cleanup`].

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{error, info, warn};

use crate::error::{Error, Result};
use crate::path_utils::normalize_path;

const WORKSPACE_PREFIX: &str = "scanbind-";

#[derive(Debug)]
pub struct JobWorkspace {
    path: PathBuf,
}

impl JobWorkspace {
    /// Creates a fresh working directory under `base`, or under the system temp dir.
    pub fn create(base: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);

        let dir = match base {
            Some(base) => {
                std::fs::create_dir_all(base).map_err(|e| Error::file_op(base, e))?;
                let base = normalize_path(base)?;
                builder.tempdir_in(&base).map_err(|e| Error::file_op(&base, e))?
            }
            None => builder
                .tempdir()
                .map_err(|e| Error::FileOperation(format!("cannot create temp directory: {}", e)))?,
        };

        // The job deletes the directory itself, with retries
        let path = dir.keep();
        info!("Created job workspace '{}'", path.display());
        Ok(Self { path })
    }

    /// Absolute path of the workspace directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a file inside the workspace.
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Removes the workspace, retrying up to `attempts` times on failure.
    ///
    /// Never fails: the outcome is logged and reported as a boolean.
    pub async fn cleanup(self, attempts: u32, delay: Duration) -> bool {
        let attempts = attempts.max(1);
        for attempt in 1..=attempts {
            match tokio::fs::remove_dir_all(&self.path).await {
                Ok(()) => {
                    info!("Removed job workspace '{}'", self.path.display());
                    return true;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => return true,
                Err(e) => {
                    warn!(
                        "Attempt {}/{} to remove workspace '{}' failed: {}",
                        attempt,
                        attempts,
                        self.path.display(),
                        e
                    );
                    if attempt < attempts {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
        error!(
            "Giving up on removing workspace '{}'; it must be deleted manually",
            self.path.display()
        );
        false
    }
}
