//! Top-level error taxonomy.
//!
//! Every stage of the pipeline reports through [`ZooError`]. The binary prints
//! the message plus [`ZooError::hint`] and exits with [`ZooError::exit_code`].

use crate::backend::BackendError;
use crate::config::ConfigError;
use crate::gml_parser::GmlError;
use crate::topology::BuildError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ZooError {
    #[error("topology file {} does not exist", path.display())]
    FileMissing { path: PathBuf },

    #[error("topology file {} is not readable", path.display())]
    NotReadable { path: PathBuf },

    #[error("malformed GML in {}: {source}", path.display())]
    MalformedGml {
        path: PathBuf,
        #[source]
        source: GmlError,
    },

    #[error("topology {} contains no nodes", path.display())]
    EmptyGraph { path: PathBuf },

    #[error("failed to build topology: {0}")]
    BuildFailed(#[from] BuildError),

    #[error("emulator failure: {0}")]
    BackendRuntime(#[from] BackendError),

    #[error("insufficient privileges: {0}")]
    PermissionDenied(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("interrupted")]
    Interrupted,

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl ZooError {
    /// Map a loader failure onto the error kinds users see
    pub fn from_gml(path: &Path, err: GmlError) -> Self {
        let path = path.to_path_buf();
        match err {
            GmlError::EmptyGraph => Self::EmptyGraph { path },
            GmlError::Io(ref e) if e.kind() == ErrorKind::NotFound => Self::FileMissing { path },
            GmlError::Io(ref e) if e.kind() == ErrorKind::PermissionDenied => {
                Self::NotReadable { path }
            }
            source => Self::MalformedGml { path, source },
        }
    }

    /// Classify a backend failure, separating privilege problems
    pub fn from_backend(err: BackendError) -> Self {
        if err.is_permission() {
            Self::PermissionDenied(err.to_string())
        } else {
            Self::BackendRuntime(err)
        }
    }

    /// One-line hint shown below the diagnostic
    pub fn hint(&self) -> &'static str {
        match self {
            Self::FileMissing { .. } => "check the path to the .gml file",
            Self::NotReadable { .. } => "check the file permissions",
            Self::MalformedGml { .. } => {
                "the file must contain a 'graph [ ... ]' record with node and edge entries"
            }
            Self::EmptyGraph { .. } => "the graph needs at least one node",
            Self::BuildFailed(_) => "the topology cannot be emulated as given",
            Self::BackendRuntime(_) => {
                "check that Open vSwitch is running and no stale bridges or namespaces remain"
            }
            Self::PermissionDenied(_) => "run as root with iproute2 and Open vSwitch installed",
            Self::Config(_) => "check the file named by ZOONET_CONFIG",
            Self::Interrupted => "network torn down after interrupt",
            Self::Unexpected(_) => "this is a bug, rerun with RUST_LOG=debug for details",
        }
    }

    /// Process exit status for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Interrupted => 0,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_gml_mapping() {
        let path = Path::new("zoo.gml");
        assert!(matches!(
            ZooError::from_gml(path, GmlError::EmptyGraph),
            ZooError::EmptyGraph { .. }
        ));
        assert!(matches!(
            ZooError::from_gml(path, GmlError::Io(io::Error::from(ErrorKind::NotFound))),
            ZooError::FileMissing { .. }
        ));
        assert!(matches!(
            ZooError::from_gml(path, GmlError::Io(io::Error::from(ErrorKind::PermissionDenied))),
            ZooError::NotReadable { .. }
        ));
        assert!(matches!(
            ZooError::from_gml(path, GmlError::UnterminatedString { line: 3 }),
            ZooError::MalformedGml { .. }
        ));
    }

    #[test]
    fn test_backend_mapping() {
        assert!(matches!(
            ZooError::from_backend(BackendError::NotRoot(1000)),
            ZooError::PermissionDenied(_)
        ));
        assert!(matches!(
            ZooError::from_backend(BackendError::UnknownNode("s9".to_string())),
            ZooError::BackendRuntime(_)
        ));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ZooError::Interrupted.exit_code(), 0);
        assert_eq!(ZooError::Unexpected("boom".to_string()).exit_code(), 1);
        assert_eq!(
            ZooError::BuildFailed(BuildError::SelfLoop("s0".to_string())).exit_code(),
            1
        );
    }

    #[test]
    fn test_message_names_file() {
        let err = ZooError::FileMissing {
            path: PathBuf::from("/tmp/none.gml"),
        };
        assert_eq!(err.to_string(), "topology file /tmp/none.gml does not exist");
    }
}
