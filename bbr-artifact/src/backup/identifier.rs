//! Artifact addressing.
//!
//! An artifact is either named directly (a "custom" artifact) or belongs to
//! a deployment instance and is named by instance name, instance index and
//! artifact name. The on-disk file name is derived from the identifier
//! alone, so any handle on the same directory finds the same file.

use std::fmt;

/// Key for every per-artifact operation on a backup directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArtifactIdentifier {
    /// Stored as `{name}.tar`.
    Custom { name: String },

    /// Stored as `{instance_name}-{instance_index}-{name}.tar`.
    Instance {
        instance_name: String,
        instance_index: String,
        name: String,
    },
}

impl ArtifactIdentifier {
    pub fn custom(name: impl Into<String>) -> Self {
        ArtifactIdentifier::Custom { name: name.into() }
    }

    pub fn instance(
        instance_name: impl Into<String>,
        instance_index: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        ArtifactIdentifier::Instance {
            instance_name: instance_name.into(),
            instance_index: instance_index.into(),
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ArtifactIdentifier::Custom { name } | ArtifactIdentifier::Instance { name, .. } => name,
        }
    }

    pub fn instance_name(&self) -> Option<&str> {
        match self {
            ArtifactIdentifier::Custom { .. } => None,
            ArtifactIdentifier::Instance { instance_name, .. } => Some(instance_name),
        }
    }

    pub fn instance_index(&self) -> Option<&str> {
        match self {
            ArtifactIdentifier::Custom { .. } => None,
            ArtifactIdentifier::Instance { instance_index, .. } => Some(instance_index),
        }
    }

    pub fn has_custom_name(&self) -> bool {
        matches!(self, ArtifactIdentifier::Custom { .. })
    }

    /// File name of the artifact's tar inside the backup directory.
    ///
    /// Names are used verbatim. `BackupDirectory` refuses any name for which
    /// [`has_path_separator`](Self::has_path_separator) is true, so an
    /// artifact can never land outside its directory.
    pub fn file_name(&self) -> String {
        match self {
            ArtifactIdentifier::Custom { name } => custom_artifact_file_name(name),
            ArtifactIdentifier::Instance {
                instance_name,
                instance_index,
                name,
            } => instance_artifact_file_name(instance_name, instance_index, name),
        }
    }

    /// True when the derived file name would address another directory.
    pub fn has_path_separator(&self) -> bool {
        self.file_name().contains(['/', '\\'])
    }
}

/// Log name: `{name}` for custom artifacts, `{name}/{index}` otherwise.
impl fmt::Display for ArtifactIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactIdentifier::Custom { name } => write!(f, "{}", name),
            ArtifactIdentifier::Instance {
                instance_index,
                name,
                ..
            } => write!(f, "{}/{}", name, instance_index),
        }
    }
}

fn instance_artifact_file_name(instance_name: &str, instance_index: &str, name: &str) -> String {
    format!("{}-{}-{}.tar", instance_name, instance_index, name)
}

fn custom_artifact_file_name(name: &str) -> String {
    format!("{}.tar", name)
}

/// A live deployment instance, as reported by the orchestrator.
pub trait DeploymentInstance {
    fn name(&self) -> &str;
    fn index(&self) -> &str;
}

/// Plain `(name, index)` pair for callers without their own instance type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRef {
    pub name: String,
    pub index: String,
}

impl InstanceRef {
    pub fn new(name: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: index.into(),
        }
    }
}

impl DeploymentInstance for InstanceRef {
    fn name(&self) -> &str {
        &self.name
    }

    fn index(&self) -> &str {
        &self.index
    }
}

impl<T: DeploymentInstance + ?Sized> DeploymentInstance for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn index(&self) -> &str {
        (**self).index()
    }
}
