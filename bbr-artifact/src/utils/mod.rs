//! Error types and logging setup.

pub mod errors;
pub mod logger;

pub use errors::{ArtifactError, ErrorKind, MetadataError, Result};
