//! BBR Artifact Library
//!
//! On-disk store for BOSH backup artifacts: per-instance and custom-named
//! tarballs, per-file SHA-256 checksums and a YAML metadata document.

pub mod backup;
pub mod cli;
pub mod config;
pub mod utils;

// Re-export commonly used types
pub use backup::{
    ArtifactIdentifier, BackupChecksum, BackupDirectory, BackupDirectoryManager, DeploymentInstance,
    InstanceRef, Metadata,
};
pub use config::Config;
pub use utils::errors::{ArtifactError, ErrorKind, MetadataError, Result};
