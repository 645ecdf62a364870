//! Emulator backends.
//!
//! A [`Backend`] creates and destroys the switches, hosts and links of a
//! topology description and runs commands on them. [`OvsBackend`] does this
//! on the local kernel with network namespaces, veth pairs and Open vSwitch;
//! [`MemoryBackend`] only keeps track of what would exist.

pub mod memory;
pub mod ovs;
pub mod runner;

pub use memory::MemoryBackend;
pub use ovs::OvsBackend;
pub use runner::{Runner, SystemRunner};

use crate::topology::{HostSpec, Interface, LinkSpec, SwitchSpec};
use crate::utils::BinaryError;
use ipnet::Ipv4Net;

/// Errors raised by a backend
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("required tool unavailable: {0}")]
    Tool(#[from] BinaryError),

    #[error("must run as root (effective uid is {0})")]
    NotRoot(u32),

    #[error("unknown node '{0}'")]
    UnknownNode(String),

    #[error("{node}: {detail}")]
    Verification { node: String, detail: String },

    #[error("cannot {operation} while the network is {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },
}

impl BackendError {
    /// Whether the failure comes from missing privileges or tools rather
    /// than from the emulator itself
    pub fn is_permission(&self) -> bool {
        matches!(self, Self::NotRoot(_) | Self::Tool(_))
    }
}

/// Captured result of a command run on a node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Interface the network needs from an emulator.
///
/// Creation methods are called in topology description order, so both ends
/// of a link always exist when [`Backend::add_link`] runs. Removal methods
/// must treat objects that are already gone as success.
pub trait Backend {
    /// Check privileges and tooling before anything is created
    fn preflight(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    fn add_switch(&mut self, switch: &SwitchSpec) -> Result<(), BackendError>;

    fn add_host(&mut self, host: &HostSpec) -> Result<(), BackendError>;

    fn add_link(&mut self, link: &LinkSpec) -> Result<(), BackendError>;

    /// Bring a created switch up so it forwards traffic
    fn start_switch(&mut self, switch: &str) -> Result<(), BackendError>;

    /// Replace the addresses of a host interface with `addr`
    fn set_ip(&mut self, interface: &Interface, addr: Ipv4Net) -> Result<(), BackendError>;

    /// Run a shell command in the context of a switch (the root namespace)
    fn switch_cmd(&mut self, switch: &str, command: &str) -> Result<CommandOutput, BackendError>;

    /// Run a shell command inside a host's namespace
    fn host_cmd(&mut self, host: &str, command: &str) -> Result<CommandOutput, BackendError>;

    fn remove_link(&mut self, link: &LinkSpec) -> Result<(), BackendError>;

    fn remove_host(&mut self, host: &str) -> Result<(), BackendError>;

    fn remove_switch(&mut self, switch: &str) -> Result<(), BackendError>;
}

impl<B: Backend + ?Sized> Backend for &mut B {
    fn preflight(&mut self) -> Result<(), BackendError> {
        (**self).preflight()
    }

    fn add_switch(&mut self, switch: &SwitchSpec) -> Result<(), BackendError> {
        (**self).add_switch(switch)
    }

    fn add_host(&mut self, host: &HostSpec) -> Result<(), BackendError> {
        (**self).add_host(host)
    }

    fn add_link(&mut self, link: &LinkSpec) -> Result<(), BackendError> {
        (**self).add_link(link)
    }

    fn start_switch(&mut self, switch: &str) -> Result<(), BackendError> {
        (**self).start_switch(switch)
    }

    fn set_ip(&mut self, interface: &Interface, addr: Ipv4Net) -> Result<(), BackendError> {
        (**self).set_ip(interface, addr)
    }

    fn switch_cmd(&mut self, switch: &str, command: &str) -> Result<CommandOutput, BackendError> {
        (**self).switch_cmd(switch, command)
    }

    fn host_cmd(&mut self, host: &str, command: &str) -> Result<CommandOutput, BackendError> {
        (**self).host_cmd(host, command)
    }

    fn remove_link(&mut self, link: &LinkSpec) -> Result<(), BackendError> {
        (**self).remove_link(link)
    }

    fn remove_host(&mut self, host: &str) -> Result<(), BackendError> {
        (**self).remove_host(host)
    }

    fn remove_switch(&mut self, switch: &str) -> Result<(), BackendError> {
        (**self).remove_switch(switch)
    }
}
