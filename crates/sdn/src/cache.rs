//! Disk snapshots of directory responses.
//!
//! Every cached directory call mirrors its successful response body to
//! `<data_dir>/<file_name>` so the node stays bootable when the directory
//! is unreachable. Files hold the raw response bytes, nothing else.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Writes `value` to `<data_dir>/<file_name>`, creating or truncating the
/// file with mode 0644.
pub fn update_cache_file(
    data_dir: &Path,
    file_name: &str,
    value: &[u8],
) -> Result<(), io::Error> {
    let path = data_dir.join(file_name);
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&path)?;
    file.write_all(value)?;
    file.flush()?;
    set_permission_0644(&path)?;
    Ok(())
}

/// Reads the raw bytes of `<data_dir>/<file_name>`.
pub fn load_cache_file(data_dir: &Path, file_name: &str) -> Result<Vec<u8>, io::Error> {
    fs::read(data_dir.join(file_name))
}

#[cfg(unix)]
fn set_permission_0644(path: &Path) -> Result<(), io::Error> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_permission_0644(_path: &Path) -> Result<(), io::Error> {
    Ok(())
}
