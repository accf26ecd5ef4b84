//! Creates and opens backup directories.

use crate::backup::directory::BackupDirectory;
use crate::utils::errors::{ArtifactError, Result};
use chrono::{DateTime, TimeZone, Utc};
use std::fs::DirBuilder;
use std::io;
use std::path::PathBuf;
use tracing::{debug, info};

/// Directory-name suffix, always rendered in UTC: `20151021T010203Z`.
const DIRECTORY_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// `{name}_{now in UTC}`.
pub fn directory_name<Tz: TimeZone>(name: &str, now: &DateTime<Tz>) -> String {
    format!(
        "{}_{}",
        name,
        now.with_timezone(&Utc).format(DIRECTORY_TIMESTAMP_FORMAT)
    )
}

/// Factory for [`BackupDirectory`] handles rooted at `root`
/// (the working directory by default).
#[derive(Debug, Clone, Default)]
pub struct BackupDirectoryManager {
    root: PathBuf,
}

impl BackupDirectoryManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a fresh, owner-only directory for a backup of `name` taken at
    /// `now()`. Fails if that directory already exists.
    pub fn create<Tz, F>(&self, name: &str, now: F) -> Result<BackupDirectory>
    where
        Tz: TimeZone,
        F: FnOnce() -> DateTime<Tz>,
    {
        let path = self.root.join(directory_name(name, &now()));
        debug!(target: "artifact", "Creating backup directory {}", path.display());

        let mut builder = DirBuilder::new();
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }

        match builder.create(&path) {
            Ok(()) => {
                info!(target: "artifact", "Created backup directory {}", path.display());
                Ok(BackupDirectory::new(path))
            }
            Err(source) if source.kind() == io::ErrorKind::AlreadyExists => {
                debug!(target: "artifact", "Backup directory {} already exists", path.display());
                Err(ArtifactError::DirectoryExists { path, source })
            }
            Err(source) => {
                debug!(target: "artifact", "Failed creating backup directory {}: {}", path.display(), source);
                Err(ArtifactError::DirectoryCreate { path, source })
            }
        }
    }

    /// Open the existing backup directory `name`.
    pub fn open(&self, name: &str) -> Result<BackupDirectory> {
        let path = self.root.join(name);
        if !path.is_dir() {
            debug!(target: "artifact", "Backup directory {} not found", path.display());
            return Err(ArtifactError::DirectoryNotFound { path });
        }

        Ok(BackupDirectory::new(path))
    }

    /// Handle on `name` without checking that it exists.
    pub fn bind(&self, name: &str) -> BackupDirectory {
        BackupDirectory::new(self.root.join(name))
    }
}
