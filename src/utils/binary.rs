//! System tool resolution and validation utilities.
//!
//! The emulator drives the host through `ip`, `ovs-vsctl` and a POSIX shell.
//! Tools are given either as a bare name, looked up on `PATH`, or as an
//! explicit path.

use std::env;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Errors that can occur during tool resolution or validation
#[derive(Debug, thiserror::Error)]
pub enum BinaryError {
    #[error("Binary not found: {path}")]
    NotFound { path: String },

    #[error("Binary is not executable: {path}")]
    NotExecutable { path: String },

    #[error("Invalid path: {path}")]
    InvalidPath { path: String },
}

/// Resolve a tool from a bare name or an explicit path.
///
/// Resolution rules:
/// 1. If the name contains `/`: treat as explicit path and validate it
/// 2. Otherwise: return the first executable match on `PATH`
///
/// # Examples
///
/// ```ignore
/// resolve_binary("ovs-vsctl") -> /usr/bin/ovs-vsctl
/// resolve_binary("/usr/sbin/ip") -> /usr/sbin/ip
/// ```
pub fn resolve_binary(name_or_path: &str) -> Result<PathBuf, BinaryError> {
    if name_or_path.contains('/') {
        let path = PathBuf::from(name_or_path);
        validate_binary(&path)?;
        return Ok(path);
    }

    let search_path = env::var_os("PATH").unwrap_or_default();
    env::split_paths(&search_path)
        .map(|dir| dir.join(name_or_path))
        .find(|candidate| validate_binary(candidate).is_ok())
        .ok_or_else(|| BinaryError::NotFound {
            path: name_or_path.to_string(),
        })
}

/// Validate that a binary exists and is executable.
pub fn validate_binary(path: &Path) -> Result<(), BinaryError> {
    if !path.exists() {
        return Err(BinaryError::NotFound {
            path: path.display().to_string(),
        });
    }

    let metadata = path.metadata().map_err(|_| BinaryError::InvalidPath {
        path: path.display().to_string(),
    })?;

    if !metadata.is_file() || metadata.permissions().mode() & 0o111 == 0 {
        return Err(BinaryError::NotExecutable {
            path: path.display().to_string(),
        });
    }

    Ok(())
}
