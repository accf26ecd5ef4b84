//! A single backup directory on disk.
//!
//! Layout:
//!
//! ```text
//! metadata                          backup bookkeeping (see `Metadata`)
//! manifest.yml                      deployment manifest, written verbatim
//! {instance}-{index}-{artifact}.tar instance artifact
//! {name}.tar                        custom artifact
//! ```
//!
//! The handle keeps no state besides its path: every operation re-reads
//! `metadata` and rewrites it in full. Two handles on the same directory
//! must not be driven concurrently.

use crate::backup::checksum::{checksum_tar, BackupChecksum};
use crate::backup::identifier::{ArtifactIdentifier, DeploymentInstance};
use crate::backup::metadata::{upsert_artifact, ArtifactMetadata, Metadata};
use crate::utils::errors::{ArtifactError, Result};
use chrono::{DateTime, TimeZone};
use std::fmt::Display;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, debug_span, warn, Span};

pub const METADATA_FILENAME: &str = "metadata";
pub const MANIFEST_FILENAME: &str = "manifest.yml";

/// Format of `start_time` / `finish_time`, e.g. `2015/10/21 01:02:03 UTC`.
const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S %Z";

pub(crate) fn format_timestamp<Tz>(time: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    time.format(TIMESTAMP_FORMAT).to_string()
}

fn outside_directory(artifact: &ArtifactIdentifier) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("artifact file name {} contains a path separator", artifact.file_name()),
    )
}

#[derive(Debug, Clone)]
pub struct BackupDirectory {
    base_dir: PathBuf,
    span: Span,
}

impl BackupDirectory {
    /// Bind a handle to `base_dir` without touching the filesystem.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let span = debug_span!(target: "artifact", "backup_directory", dir = %base_dir.display());
        Self { base_dir, span }
    }

    pub fn path(&self) -> &Path {
        &self.base_dir
    }

    /// Create (or truncate) the artifact's tar file for writing.
    pub fn create_artifact(&self, artifact: &ArtifactIdentifier) -> Result<File> {
        let _enter = self.span.enter();
        let path = self.artifact_path(artifact);
        debug!(target: "artifact", "Trying to create file {}", artifact.file_name());
        if artifact.has_path_separator() {
            let source = outside_directory(artifact);
            return Err(self.log_and_return(ArtifactError::Create { path, source }));
        }

        File::create(&path).map_err(|source| self.log_and_return(ArtifactError::Create { path, source }))
    }

    /// Open the artifact's tar file for reading.
    pub fn read_artifact(&self, artifact: &ArtifactIdentifier) -> Result<File> {
        let _enter = self.span.enter();
        let path = self.artifact_path(artifact);
        debug!(target: "artifact", "Trying to open {}", path.display());
        if artifact.has_path_separator() {
            let source = outside_directory(artifact);
            return Err(self.log_and_return(ArtifactError::Open { path, source }));
        }

        File::open(&path).map_err(|source| self.log_and_return(ArtifactError::Open { path, source }))
    }

    /// Hash every file inside the artifact's tar.
    pub fn calculate_checksum(&self, artifact: &ArtifactIdentifier) -> Result<BackupChecksum> {
        let file = self.read_artifact(artifact)?;

        let _enter = self.span.enter();
        checksum_tar(BufReader::new(file)).map_err(|source| {
            self.log_and_return(ArtifactError::TarRead {
                artifact: artifact.to_string(),
                source,
            })
        })
    }

    /// Record `checksum` for `artifact` in the metadata file.
    ///
    /// The metadata file must already exist. Recording the same artifact
    /// twice replaces the earlier entry.
    pub fn add_checksum(&self, artifact: &ArtifactIdentifier, checksum: BackupChecksum) -> Result<()> {
        self.metadata_exists_and_is_readable()?;
        let mut metadata = self.load_metadata("Error reading metadata from")?;

        let _enter = self.span.enter();
        let entry = ArtifactMetadata {
            name: artifact.name().to_string(),
            checksum,
        };
        let replaced = match artifact {
            ArtifactIdentifier::Custom { .. } => upsert_artifact(&mut metadata.custom_artifacts, entry),
            ArtifactIdentifier::Instance {
                instance_name,
                instance_index,
                ..
            } => upsert_artifact(
                &mut metadata
                    .find_or_create_instance(instance_name, instance_index)
                    .artifacts,
                entry,
            ),
        };
        if replaced {
            warn!(target: "artifact", "Replacing previously recorded checksum for {}", artifact);
        }

        let path = self.metadata_path();
        metadata.save(&path).map_err(|source| {
            self.log_and_return(ArtifactError::metadata(
                format!("Error writing metadata to {}", path.display()),
                source,
            ))
        })
    }

    /// Recorded checksum for `artifact`, or `None` if it was never recorded.
    pub fn fetch_checksum(&self, artifact: &ArtifactIdentifier) -> Result<Option<BackupChecksum>> {
        let metadata = self.load_metadata("Error reading metadata from")?;

        let _enter = self.span.enter();
        let recorded = match artifact {
            ArtifactIdentifier::Custom { name } => metadata.find_custom_artifact(name),
            ArtifactIdentifier::Instance {
                instance_name,
                instance_index,
                name,
            } => metadata
                .find_instance(instance_name, instance_index)
                .and_then(|instance| instance.find_artifact(name)),
        };

        match recorded {
            Some(entry) => Ok(Some(entry.checksum.clone())),
            None => {
                warn!(target: "artifact", "Checksum for {} not found in artifact", artifact);
                Ok(None)
            }
        }
    }

    /// Initialise the metadata file. Fails if one already exists.
    pub fn create_metadata_file_with_start_time<Tz>(&self, start_time: &DateTime<Tz>) -> Result<()>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let _enter = self.span.enter();
        let path = self.metadata_path();
        if path.exists() {
            return Err(self.log_and_return(ArtifactError::MetadataExists { path }));
        }

        Metadata::with_start_time(format_timestamp(start_time))
            .save(&path)
            .map_err(|source| {
                self.log_and_return(ArtifactError::metadata(
                    format!("Error writing metadata to {}", path.display()),
                    source,
                ))
            })
    }

    pub fn add_finish_time<Tz>(&self, finish_time: &DateTime<Tz>) -> Result<()>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        self.metadata_exists_and_is_readable()?;
        let mut metadata = self.load_metadata("unable to load metadata")?;

        let _enter = self.span.enter();
        metadata.backup_activity.finish_time = Some(format_timestamp(finish_time));

        let path = self.metadata_path();
        metadata.save(&path).map_err(|source| {
            self.log_and_return(ArtifactError::metadata(
                format!("Error writing metadata to {}", path.display()),
                source,
            ))
        })
    }

    /// Write the deployment manifest to `manifest.yml`, byte for byte.
    pub fn save_manifest(&self, manifest: &str) -> Result<()> {
        let _enter = self.span.enter();
        let path = self.base_dir.join(MANIFEST_FILENAME);

        fs::write(&path, manifest)
            .map_err(|source| self.log_and_return(ArtifactError::ManifestWrite { path, source }))
    }

    /// True when every instance recorded in the metadata is present in
    /// `instances`. Extra live instances do not matter.
    pub fn deployment_matches<I: DeploymentInstance>(&self, deployment: &str, instances: &[I]) -> Result<bool> {
        self.metadata_exists_and_is_readable()?;
        let metadata = self.load_metadata("Error reading metadata file")?;

        let _enter = self.span.enter();
        for recorded in &metadata.instances {
            let present = instances
                .iter()
                .any(|live| live.name() == recorded.name && live.index() == recorded.index);
            if !present {
                debug!(
                    target: "artifact",
                    "Instance {}/{} not found in deployment {}",
                    recorded.name, recorded.index, deployment
                );
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Recompute every recorded checksum and compare it to the metadata.
    ///
    /// Returns `Ok(false)` on the first artifact whose checksum differs or
    /// cannot be computed. Errors only when the metadata itself is missing
    /// or unreadable.
    pub fn valid(&self) -> Result<bool> {
        let metadata = self.load_metadata("Error reading metadata from")?;

        for artifact in &metadata.custom_artifacts {
            let id = ArtifactIdentifier::custom(&artifact.name);
            if !self.artifact_matches(&id, &artifact.checksum) {
                return Ok(false);
            }
        }

        for instance in &metadata.instances {
            for artifact in &instance.artifacts {
                let id = ArtifactIdentifier::instance(&instance.name, &instance.index, &artifact.name);
                if !self.artifact_matches(&id, &artifact.checksum) {
                    return Ok(false);
                }
            }
        }

        Ok(true)
    }

    /// Load the metadata document as it currently is on disk.
    pub fn read_metadata(&self) -> Result<Metadata> {
        self.load_metadata("Error reading metadata from")
    }

    fn artifact_matches(&self, artifact: &ArtifactIdentifier, recorded: &BackupChecksum) -> bool {
        let actual = self.calculate_checksum(artifact);

        let _enter = self.span.enter();
        match actual {
            Ok(actual) if &actual == recorded => true,
            Ok(actual) => {
                warn!(
                    target: "artifact",
                    "Can't match checksums for {}, in metadata: {:?}, in actual file: {:?}",
                    artifact, recorded, actual
                );
                false
            }
            Err(err) => {
                warn!(target: "artifact", "Error calculating checksum for {}: {}", artifact, err);
                false
            }
        }
    }

    fn load_metadata(&self, context: &str) -> Result<Metadata> {
        let path = self.metadata_path();
        Metadata::load(&path).map_err(|source| {
            let _enter = self.span.enter();
            self.log_and_return(ArtifactError::metadata(
                format!("{} {}", context, path.display()),
                source,
            ))
        })
    }

    fn metadata_exists_and_is_readable(&self) -> Result<()> {
        let path = self.metadata_path();
        match fs::metadata(&path) {
            Ok(_) => Ok(()),
            Err(source) => {
                let _enter = self.span.enter();
                Err(self.log_and_return(ArtifactError::MetadataUnavailable { path, source }))
            }
        }
    }

    fn log_and_return(&self, err: ArtifactError) -> ArtifactError {
        debug!(target: "artifact", "{}", err);
        err
    }

    fn artifact_path(&self, artifact: &ArtifactIdentifier) -> PathBuf {
        self.base_dir.join(artifact.file_name())
    }

    fn metadata_path(&self) -> PathBuf {
        self.base_dir.join(METADATA_FILENAME)
    }
}
