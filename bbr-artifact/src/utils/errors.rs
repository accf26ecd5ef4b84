//! Error types for the artifact store.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures loading or persisting the `metadata` document.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("failed to read metadata from {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to unmarshal metadata from {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to marshal metadata: {0}")]
    Serialize(#[source] serde_yaml::Error),

    #[error("failed to write metadata to {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failures of backup directory and artifact operations.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Failed creating backup directory {}: already exists", .path.display())]
    DirectoryExists {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed creating backup directory {}: {source}", .path.display())]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Backup directory {} not found", .path.display())]
    DirectoryNotFound { path: PathBuf },

    #[error("Error creating file {}: {source}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Error reading artifact file {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Error reading tar for {artifact}: {source}")]
    TarRead {
        artifact: String,
        #[source]
        source: io::Error,
    },

    #[error("Error checking metadata file {}: unable to load metadata: {source}", .path.display())]
    MetadataUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("metadata file already exists at {}", .path.display())]
    MetadataExists { path: PathBuf },

    #[error("{context}: {source}")]
    Metadata {
        context: String,
        #[source]
        source: MetadataError,
    },

    #[error("failed to save manifest to {}: {source}", .path.display())]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Coarse classification callers branch on ("never backed up" vs "damaged").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    Parse,
    Serialize,
    Io,
    TarRead,
}

fn io_kind(err: &io::Error) -> ErrorKind {
    match err.kind() {
        io::ErrorKind::NotFound => ErrorKind::NotFound,
        io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists,
        _ => ErrorKind::Io,
    }
}

impl MetadataError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MetadataError::Read { source, .. } => io_kind(source),
            MetadataError::Parse { .. } => ErrorKind::Parse,
            MetadataError::Serialize(_) => ErrorKind::Serialize,
            MetadataError::Write { source, .. } => io_kind(source),
        }
    }
}

impl ArtifactError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ArtifactError::DirectoryExists { .. } | ArtifactError::MetadataExists { .. } => {
                ErrorKind::AlreadyExists
            }
            ArtifactError::DirectoryNotFound { .. } => ErrorKind::NotFound,
            ArtifactError::DirectoryCreate { source, .. }
            | ArtifactError::Create { source, .. }
            | ArtifactError::Open { source, .. }
            | ArtifactError::MetadataUnavailable { source, .. }
            | ArtifactError::ManifestWrite { source, .. } => io_kind(source),
            ArtifactError::TarRead { .. } => ErrorKind::TarRead,
            ArtifactError::Metadata { source, .. } => source.kind(),
        }
    }

    /// Wraps a metadata failure with the action that was being attempted.
    pub(crate) fn metadata(context: impl Into<String>, source: MetadataError) -> Self {
        ArtifactError::Metadata {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ArtifactError>;
