//! Input validation.
//!
//! Runs before the GML reader so a bad path yields a precise diagnostic
//! instead of a parser error.

use crate::error::ZooError;
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::Path;

/// Validate that the topology file exists and can be opened for reading.
///
/// Only a `stat` and a trial open are performed; the file is closed again
/// immediately.
///
/// # Returns
/// * `Ok(())` if the file is a readable regular file
/// * `Err(ZooError::FileMissing)` if nothing exists at `path`
/// * `Err(ZooError::NotReadable)` if it exists but cannot be read
pub fn validate_input_file(path: &Path) -> Result<(), ZooError> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ZooError::FileMissing {
                path: path.to_path_buf(),
            })
        }
        Err(_) => {
            return Err(ZooError::NotReadable {
                path: path.to_path_buf(),
            })
        }
    };

    if !metadata.is_file() {
        return Err(ZooError::NotReadable {
            path: path.to_path_buf(),
        });
    }

    File::open(path).map_err(|_| ZooError::NotReadable {
        path: path.to_path_buf(),
    })?;

    log::debug!("Topology file {} is readable ({} bytes)", path.display(), metadata.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::NamedTempFile;

    #[test]
    fn test_readable_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "graph [ ]").unwrap();
        assert!(validate_input_file(file.path()).is_ok());
    }

    #[test]
    fn test_missing_file() {
        let result = validate_input_file(Path::new("/nonexistent/zoonet/input.gml"));
        assert!(matches!(result, Err(ZooError::FileMissing { .. })));
    }

    #[test]
    fn test_directory_is_not_readable() {
        let dir = tempfile::tempdir().unwrap();
        let result = validate_input_file(dir.path());
        assert!(matches!(result, Err(ZooError::NotReadable { .. })));
    }

    #[test]
    fn test_permission_denied() {
        // root bypasses file permissions
        if nix::unistd::geteuid().is_root() {
            return;
        }
        let file = NamedTempFile::new().unwrap();
        fs::set_permissions(file.path(), fs::Permissions::from_mode(0o000)).unwrap();
        let result = validate_input_file(file.path());
        assert!(matches!(result, Err(ZooError::NotReadable { .. })));
    }
}
