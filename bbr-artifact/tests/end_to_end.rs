use bbr_artifact::{ArtifactIdentifier, BackupDirectoryManager, ErrorKind, InstanceRef};
use chrono::{TimeZone, Utc};
use sha2::{Digest, Sha256};
use tar::{Builder, Header};
use tempfile::TempDir;

#[test]
fn backup_then_reopen_and_validate() {
    let temp_dir = TempDir::new().unwrap();
    let manager = BackupDirectoryManager::with_root(temp_dir.path());
    let started = Utc.with_ymd_and_hms(2015, 10, 21, 1, 2, 3).unwrap();
    let finished = Utc.with_ymd_and_hms(2015, 10, 21, 1, 12, 3).unwrap();

    let directory = manager.create("myredis", || started).unwrap();
    directory.create_metadata_file_with_start_time(&started).unwrap();
    directory.save_manifest("name: myredis\n").unwrap();

    let artifact = ArtifactIdentifier::instance("redis-server", "0", "redis");
    let mut builder = Builder::new(directory.create_artifact(&artifact).unwrap());
    let mut header = Header::new_gnu();
    header.set_size(4);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, "dump.rdb", &b"DATA"[..]).unwrap();
    builder.into_inner().unwrap();

    let checksum = directory.calculate_checksum(&artifact).unwrap();
    assert_eq!(checksum.len(), 1);
    assert_eq!(checksum["dump.rdb"], format!("{:x}", Sha256::digest(b"DATA")));

    directory.add_checksum(&artifact, checksum.clone()).unwrap();
    directory.add_finish_time(&finished).unwrap();

    let reopened = manager.open("myredis_20151021T010203Z").unwrap();
    assert!(reopened.valid().unwrap());
    assert_eq!(reopened.fetch_checksum(&artifact).unwrap(), Some(checksum));
    assert!(reopened
        .deployment_matches("myredis", &[InstanceRef::new("redis-server", "0")])
        .unwrap());

    let metadata = reopened.read_metadata().unwrap();
    assert_eq!(metadata.backup_activity.start_time, "2015/10/21 01:02:03 UTC");
    assert_eq!(
        metadata.backup_activity.finish_time.as_deref(),
        Some("2015/10/21 01:12:03 UTC")
    );

    let err = manager.create("myredis", || started).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
}
