//! The `metadata` document kept in every backup directory.
//!
//! Records when the backup ran and, for every artifact, the checksum of
//! each file inside its tar. Serialized as YAML with fields in the order
//! `backup_activity`, `instances`, `custom_artifacts`; the two lists are
//! left out entirely while empty.

use crate::backup::checksum::BackupChecksum;
use crate::utils::errors::MetadataError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::Path;

/// Root of the metadata document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub backup_activity: BackupActivityMetadata,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instances: Vec<InstanceMetadata>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_artifacts: Vec<ArtifactMetadata>,
}

/// Start and finish of the backup, as `YYYY/MM/DD HH:MM:SS TZ` text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackupActivityMetadata {
    #[serde(default)]
    pub start_time: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_time: Option<String>,
}

/// Artifacts recorded for one `(name, index)` deployment instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceMetadata {
    pub name: String,

    #[serde(deserialize_with = "string_or_number")]
    pub index: String,

    #[serde(default)]
    pub artifacts: Vec<ArtifactMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub name: String,

    #[serde(rename = "checksums", default)]
    pub checksum: BackupChecksum,
}

impl Metadata {
    /// A fresh document with only the start time set.
    pub fn with_start_time(start_time: impl Into<String>) -> Self {
        Self {
            backup_activity: BackupActivityMetadata {
                start_time: start_time.into(),
                finish_time: None,
            },
            ..Self::default()
        }
    }

    /// Read and parse the document at `path`.
    pub fn load(path: &Path) -> Result<Self, MetadataError> {
        let contents = fs::read(path).map_err(|source| MetadataError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_yaml(&contents).map_err(|source| MetadataError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(bytes: &[u8]) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_slice(bytes)
    }

    pub fn to_yaml(&self) -> Result<String, MetadataError> {
        serde_yaml::to_string(self).map_err(MetadataError::Serialize)
    }

    /// Serialize and overwrite the file at `path`.
    pub fn save(&self, path: &Path) -> Result<(), MetadataError> {
        let contents = self.to_yaml()?;
        fs::write(path, contents).map_err(|source| MetadataError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Existing record for `(name, index)`, or a new empty one appended at
    /// the end of `instances`.
    pub fn find_or_create_instance(&mut self, name: &str, index: &str) -> &mut InstanceMetadata {
        let position = match self.find_instance_position(name, index) {
            Some(position) => position,
            None => {
                self.instances.push(InstanceMetadata {
                    name: name.to_string(),
                    index: index.to_string(),
                    artifacts: Vec::new(),
                });
                self.instances.len() - 1
            }
        };

        &mut self.instances[position]
    }

    pub fn find_instance(&self, name: &str, index: &str) -> Option<&InstanceMetadata> {
        self.instances
            .iter()
            .find(|instance| instance.name == name && instance.index == index)
    }

    pub fn find_custom_artifact(&self, name: &str) -> Option<&ArtifactMetadata> {
        self.custom_artifacts
            .iter()
            .find(|artifact| artifact.name == name)
    }

    fn find_instance_position(&self, name: &str, index: &str) -> Option<usize> {
        self.instances
            .iter()
            .position(|instance| instance.name == name && instance.index == index)
    }
}

impl InstanceMetadata {
    pub fn find_artifact(&self, name: &str) -> Option<&ArtifactMetadata> {
        self.artifacts.iter().find(|artifact| artifact.name == name)
    }
}

/// Insert `artifact`, replacing an entry of the same name in place.
/// Returns true when an entry was replaced.
pub(crate) fn upsert_artifact(artifacts: &mut Vec<ArtifactMetadata>, artifact: ArtifactMetadata) -> bool {
    match artifacts.iter_mut().find(|existing| existing.name == artifact.name) {
        Some(existing) => {
            *existing = artifact;
            true
        }
        None => {
            artifacts.push(artifact);
            false
        }
    }
}

// Older manifests carry `index: 0` as a YAML integer.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Unsigned(u64),
        Signed(i64),
    }

    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(value) => value,
        StringOrNumber::Unsigned(value) => value.to_string(),
        StringOrNumber::Signed(value) => value.to_string(),
    })
}
