//! Per-file SHA-256 checksums of an artifact's tar contents.
//!
//! The digest covers each archived file's bytes, never the tar file itself,
//! so two archives with the same files in different order or with different
//! header metadata still compare equal.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::{self, Read};
use tar::Archive;
use tracing::debug;

/// Path inside the tar -> lowercase hex SHA-256 of that file's bytes.
pub type BackupChecksum = BTreeMap<String, String>;

/// Stream every regular entry of a tar archive through SHA-256.
///
/// Directory entries and an entry named `./` are skipped. Old v7 archives
/// mark directories as regular entries with a trailing `/`; those are
/// skipped too. Any failure while
/// walking headers or reading entry bodies is returned as-is; callers decide
/// how to label it.
pub fn checksum_tar<R: Read>(reader: R) -> io::Result<BackupChecksum> {
    let mut archive = Archive::new(reader);
    let mut checksum = BackupChecksum::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        let kind = entry.header().entry_type();
        if kind.is_dir() || (kind.is_file() && name.ends_with('/')) || name == "./" {
            continue;
        }

        let mut hasher = Sha256::new();
        io::copy(&mut entry, &mut hasher)?;
        debug!(target: "artifact", "Calculating shasum for local file {}", name);
        checksum.insert(name, format!("{:x}", hasher.finalize()));
    }

    Ok(checksum)
}
