//! Subcommands of the `bbr-artifact` binary.
//!
//! Each command opens an existing backup directory, runs one store
//! operation and writes a plain-text report to `out`.

use crate::backup::{ArtifactIdentifier, BackupChecksum, BackupDirectoryManager, InstanceRef};
use anyhow::{Context, Result};
use std::io::Write;
use tracing::info;

/// Parse a `name/index` instance argument.
pub fn parse_instance(value: &str) -> std::result::Result<InstanceRef, String> {
    match value.rsplit_once('/') {
        Some((name, index)) if !name.is_empty() && !index.is_empty() => {
            Ok(InstanceRef::new(name, index))
        }
        _ => Err(format!("expected NAME/INDEX, got '{}'", value)),
    }
}

/// Recompute every checksum in the backup. Returns whether it is valid.
pub fn validate(manager: &BackupDirectoryManager, name: &str, out: &mut impl Write) -> Result<bool> {
    let directory = manager.open(name)?;
    let valid = directory
        .valid()
        .with_context(|| format!("could not validate backup {}", name))?;

    info!("Backup {} is {}", name, if valid { "valid" } else { "invalid" });
    writeln!(out, "{}", if valid { "valid" } else { "invalid" })?;
    Ok(valid)
}

/// Print the metadata document as YAML or JSON.
pub fn show(manager: &BackupDirectoryManager, name: &str, json: bool, out: &mut impl Write) -> Result<()> {
    let metadata = manager.open(name)?.read_metadata()?;

    if json {
        serde_json::to_writer_pretty(&mut *out, &metadata)?;
        writeln!(out)?;
    } else {
        write!(out, "{}", metadata.to_yaml()?)?;
    }
    Ok(())
}

/// Compare the artifact's current checksum with the recorded one, entry by
/// entry. Returns whether they match exactly.
pub fn checksum(
    manager: &BackupDirectoryManager,
    name: &str,
    artifact: &ArtifactIdentifier,
    out: &mut impl Write,
) -> Result<bool> {
    let directory = manager.open(name)?;
    let actual = directory.calculate_checksum(artifact)?;
    let recorded = directory.fetch_checksum(artifact)?;

    let Some(recorded) = recorded else {
        for (path, digest) in &actual {
            writeln!(out, "{}  {}  unrecorded", digest, path)?;
        }
        writeln!(out, "recorded: missing")?;
        return Ok(false);
    };

    report_entries(&actual, &recorded, out)?;
    Ok(actual == recorded)
}

fn report_entries(actual: &BackupChecksum, recorded: &BackupChecksum, out: &mut impl Write) -> Result<()> {
    for (path, digest) in actual {
        let status = match recorded.get(path) {
            Some(expected) if expected == digest => "ok",
            Some(_) => "mismatch",
            None => "unrecorded",
        };
        writeln!(out, "{}  {}  {}", digest, path, status)?;
    }

    for (path, digest) in recorded {
        if !actual.contains_key(path) {
            writeln!(out, "{}  {}  missing", digest, path)?;
        }
    }
    Ok(())
}

/// Check that every recorded instance is among `instances`.
pub fn matches(
    manager: &BackupDirectoryManager,
    name: &str,
    deployment: &str,
    instances: &[InstanceRef],
    out: &mut impl Write,
) -> Result<bool> {
    let matched = manager.open(name)?.deployment_matches(deployment, instances)?;

    writeln!(out, "{}", if matched { "match" } else { "mismatch" })?;
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::BackupDirectory;
    use chrono::{TimeZone, Utc};
    use tar::{Builder, Header};
    use tempfile::TempDir;

    const NAME: &str = "my-redis_20151021T010203Z";

    fn setup() -> (TempDir, BackupDirectoryManager, BackupDirectory) {
        let temp_dir = TempDir::new().unwrap();
        let manager = BackupDirectoryManager::with_root(temp_dir.path());
        let directory = manager
            .create("my-redis", || Utc.with_ymd_and_hms(2015, 10, 21, 1, 2, 3).unwrap())
            .unwrap();
        directory
            .create_metadata_file_with_start_time(&Utc.with_ymd_and_hms(2015, 10, 21, 1, 2, 3).unwrap())
            .unwrap();

        let artifact = ArtifactIdentifier::instance("redis-server", "0", "redis");
        let mut builder = Builder::new(directory.create_artifact(&artifact).unwrap());
        let mut header = Header::new_gnu();
        header.set_size(4);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, "dump.rdb", &b"DATA"[..]).unwrap();
        builder.finish().unwrap();
        drop(builder);

        let checksum = directory.calculate_checksum(&artifact).unwrap();
        directory.add_checksum(&artifact, checksum).unwrap();

        (temp_dir, manager, directory)
    }

    #[test]
    fn test_parse_instance() {
        assert_eq!(parse_instance("redis/0").unwrap(), InstanceRef::new("redis", "0"));
        assert_eq!(
            parse_instance("redis/server/1").unwrap(),
            InstanceRef::new("redis/server", "1")
        );
        assert!(parse_instance("redis").is_err());
        assert!(parse_instance("redis/").is_err());
    }

    #[test]
    fn test_validate_reports_valid() {
        let (_temp_dir, manager, _directory) = setup();
        let mut out = Vec::new();

        assert!(validate(&manager, NAME, &mut out).unwrap());
        assert_eq!(String::from_utf8(out).unwrap(), "valid\n");
    }

    #[test]
    fn test_validate_missing_directory() {
        let (_temp_dir, manager, _directory) = setup();
        let mut out = Vec::new();

        assert!(validate(&manager, "nope", &mut out).is_err());
    }

    #[test]
    fn test_show_yaml_and_json() {
        let (_temp_dir, manager, _directory) = setup();

        let mut yaml = Vec::new();
        show(&manager, NAME, false, &mut yaml).unwrap();
        let yaml = String::from_utf8(yaml).unwrap();
        assert!(yaml.contains("redis-server"));
        assert!(!yaml.contains("custom_artifacts"));

        let mut json = Vec::new();
        show(&manager, NAME, true, &mut json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(value["instances"][0]["name"], "redis-server");
        assert_eq!(value["instances"][0]["artifacts"][0]["name"], "redis");
    }

    #[test]
    fn test_checksum_reports_entries() {
        let (_temp_dir, manager, _directory) = setup();
        let artifact = ArtifactIdentifier::instance("redis-server", "0", "redis");
        let mut out = Vec::new();

        assert!(checksum(&manager, NAME, &artifact, &mut out).unwrap());
        let report = String::from_utf8(out).unwrap();
        assert!(report.contains("dump.rdb  ok"));
    }

    #[test]
    fn test_checksum_unrecorded_artifact() {
        let (_temp_dir, manager, directory) = setup();
        let artifact = ArtifactIdentifier::custom("extra");
        let mut builder = Builder::new(directory.create_artifact(&artifact).unwrap());
        let mut header = Header::new_gnu();
        header.set_size(1);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, "x", &b"x"[..]).unwrap();
        builder.finish().unwrap();
        drop(builder);

        let mut out = Vec::new();
        assert!(!checksum(&manager, NAME, &artifact, &mut out).unwrap());
        assert!(String::from_utf8(out).unwrap().contains("recorded: missing"));
    }

    #[test]
    fn test_matches() {
        let (_temp_dir, manager, _directory) = setup();

        let mut out = Vec::new();
        let live = vec![InstanceRef::new("redis-server", "0"), InstanceRef::new("broker", "0")];
        assert!(matches(&manager, NAME, "my-redis", &live, &mut out).unwrap());
        assert_eq!(String::from_utf8(out).unwrap(), "match\n");

        let mut out = Vec::new();
        let live = vec![InstanceRef::new("redis-server", "1")];
        assert!(!matches(&manager, NAME, "my-redis", &live, &mut out).unwrap());
        assert_eq!(String::from_utf8(out).unwrap(), "mismatch\n");
    }
}
