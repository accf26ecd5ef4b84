//! Backup directory store.
//!
//! A backup is a directory holding one tar per artifact plus a `metadata`
//! document recording the SHA-256 of every file inside every tar. The
//! orchestrator creates or opens a directory through
//! [`BackupDirectoryManager`], streams artifacts in and out of it, records
//! their checksums and later asks [`BackupDirectory::valid`] whether the
//! files on disk still match.

pub mod checksum;
pub mod directory;
pub mod identifier;
pub mod manager;
pub mod metadata;

pub use checksum::{checksum_tar, BackupChecksum};
pub use directory::{BackupDirectory, MANIFEST_FILENAME, METADATA_FILENAME};
pub use identifier::{ArtifactIdentifier, DeploymentInstance, InstanceRef};
pub use manager::{directory_name, BackupDirectoryManager};
pub use metadata::{ArtifactMetadata, BackupActivityMetadata, InstanceMetadata, Metadata};
