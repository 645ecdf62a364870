//! Optional runtime configuration.
//!
//! zoonet takes no flags besides the topology path. Environment specific
//! settings (where the system tools live, default log level) come from an
//! optional YAML file named by the `ZOONET_CONFIG` environment variable:
//!
//! ```yaml
//! log_level: debug
//! tools:
//!   ip: /usr/sbin/ip
//!   ovs_vsctl: ovs-vsctl
//!   shell: sh
//! ```

use log::info;
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Environment variable pointing at the configuration file
pub const CONFIG_ENV: &str = "ZOONET_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot open {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Top-level configuration structure that mirrors the YAML file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Default log filter, overridden by `RUST_LOG`
    #[serde(default)]
    pub log_level: Option<String>,
    /// System tools driven by the emulator
    #[serde(default)]
    pub tools: ToolConfig,
}

/// Names or paths of the system tools used by the Open vSwitch backend
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// iproute2 `ip`
    pub ip: String,
    /// Open vSwitch database client
    pub ovs_vsctl: String,
    /// POSIX shell used for node commands
    pub shell: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            ip: "ip".to_string(),
            ovs_vsctl: "ovs-vsctl".to_string(),
            shell: "sh".to_string(),
        }
    }
}

/// Load the configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<Config, ConfigError> {
    info!("Loading configuration from: {:?}", config_path);

    let file = File::open(config_path).map_err(|source| ConfigError::Read {
        path: config_path.to_path_buf(),
        source,
    })?;

    serde_yaml::from_reader(file).map_err(|source| ConfigError::Parse {
        path: config_path.to_path_buf(),
        source,
    })
}

/// Load the file named by [`CONFIG_ENV`], or the defaults when it is unset
pub fn load_from_env() -> Result<Config, ConfigError> {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) if !path.is_empty() => load_config(Path::new(&path)),
        _ => Ok(Config::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.log_level, None);
        assert_eq!(config.tools.ip, "ip");
        assert_eq!(config.tools.ovs_vsctl, "ovs-vsctl");
        assert_eq!(config.tools.shell, "sh");
    }

    #[test]
    fn test_load_full_config() {
        let file = write_config(
            r#"
log_level: debug
tools:
  ip: /usr/sbin/ip
  ovs_vsctl: /usr/bin/ovs-vsctl
  shell: /bin/bash
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.tools.ip, "/usr/sbin/ip");
        assert_eq!(config.tools.shell, "/bin/bash");
    }

    #[test]
    fn test_partial_tools_keep_defaults() {
        let file = write_config("tools:\n  ip: /sbin/ip\n");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.tools.ip, "/sbin/ip");
        assert_eq!(config.tools.ovs_vsctl, "ovs-vsctl");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let file = write_config("subnet: 192.168.0.0/24\n");
        assert!(matches!(load_config(file.path()), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = load_config(Path::new("/nonexistent/zoonet.yaml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
