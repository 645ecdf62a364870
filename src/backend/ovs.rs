//! Open vSwitch backend.
//!
//! Each switch is an OVS bridge, each host a network namespace, each link a
//! veth pair whose ends are named after the link interfaces. Switch ends stay
//! in the root namespace and are attached to their bridge; host ends are
//! created directly inside the host namespace.

use super::runner::{Runner, SystemRunner};
use super::{Backend, BackendError, CommandOutput};
use crate::config::ToolConfig;
use crate::topology::{HostSpec, Interface, LinkKind, LinkSpec, SwitchSpec};
use crate::utils::resolve_binary;
use ipnet::Ipv4Net;
use nix::unistd::geteuid;

/// stderr fragments meaning the object to remove is already gone
const ALREADY_GONE: [&str; 3] = [
    "Cannot find device",
    "No such file or directory",
    "does not exist",
];

/// Backend driving the local kernel through `ip` and `ovs-vsctl`
#[derive(Debug)]
pub struct OvsBackend<R = SystemRunner> {
    runner: R,
    tools: ToolConfig,
}

impl OvsBackend<SystemRunner> {
    pub fn new(tools: ToolConfig) -> Self {
        Self::with_runner(SystemRunner, tools)
    }
}

impl<R: Runner> OvsBackend<R> {
    pub fn with_runner(runner: R, tools: ToolConfig) -> Self {
        Self { runner, tools }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run a tool and fail unless it exits successfully
    fn checked(&mut self, program: &str, args: &[&str]) -> Result<CommandOutput, BackendError> {
        let output = self.runner.run(program, args)?;
        if output.success {
            Ok(output)
        } else {
            Err(BackendError::CommandFailed {
                command: format!("{} {}", program, args.join(" ")),
                status: "non-zero exit".to_string(),
                stderr: output.stderr.trim().to_string(),
            })
        }
    }

    /// Run a removal; an object that no longer exists counts as removed
    fn removal(&mut self, program: &str, args: &[&str]) -> Result<(), BackendError> {
        match self.checked(program, args) {
            Ok(_) => Ok(()),
            Err(BackendError::CommandFailed { stderr, .. })
                if ALREADY_GONE.iter().any(|m| stderr.contains(m)) =>
            {
                log::debug!("{} {}: already gone", program, args.join(" "));
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn ip(&mut self, args: &[&str]) -> Result<CommandOutput, BackendError> {
        let ip = self.tools.ip.clone();
        self.checked(&ip, args)
    }

    fn vsctl(&mut self, args: &[&str]) -> Result<CommandOutput, BackendError> {
        let vsctl = self.tools.ovs_vsctl.clone();
        self.checked(&vsctl, args)
    }

    /// Attach a root namespace veth end to its bridge and bring it up
    fn attach_to_bridge(&mut self, interface: &Interface) -> Result<(), BackendError> {
        let name = interface.name();
        self.vsctl(&["add-port", &interface.node, &name])?;
        self.ip(&["link", "set", &name, "up"])?;
        Ok(())
    }
}

impl<R: Runner> Backend for OvsBackend<R> {
    fn preflight(&mut self) -> Result<(), BackendError> {
        let euid = geteuid();
        if !euid.is_root() {
            return Err(BackendError::NotRoot(euid.as_raw()));
        }
        for tool in [&self.tools.ip, &self.tools.ovs_vsctl, &self.tools.shell] {
            let path = resolve_binary(tool)?;
            log::debug!("Using {}", path.display());
        }
        // fails when ovsdb-server is not running
        self.vsctl(&["show"])?;
        Ok(())
    }

    fn add_switch(&mut self, switch: &SwitchSpec) -> Result<(), BackendError> {
        let name = switch.name.as_str();
        let datapath = format!("datapath_type={}", switch.class.datapath_type());
        let dpid = format!("other-config:datapath-id={}", switch.dpid());
        self.vsctl(&[
            "--", "add-br", name,
            "--", "set-fail-mode", name, switch.fail_mode.as_str(),
            "--", "set", "bridge", name, &datapath, &dpid,
            "other-config:disable-in-band=true",
        ])?;
        Ok(())
    }

    fn add_host(&mut self, host: &HostSpec) -> Result<(), BackendError> {
        self.ip(&["netns", "add", &host.name])?;
        self.ip(&["-n", &host.name, "link", "set", "lo", "up"])?;
        Ok(())
    }

    fn add_link(&mut self, link: &LinkSpec) -> Result<(), BackendError> {
        let a = link.a.name();
        let b = link.b.name();
        match link.kind {
            LinkKind::InterSwitch => {
                self.ip(&["link", "add", &a, "type", "veth", "peer", "name", &b])?;
                self.attach_to_bridge(&link.a)?;
                self.attach_to_bridge(&link.b)?;
            }
            LinkKind::Access => {
                let host = link.a.node.as_str();
                self.ip(&["link", "add", &b, "type", "veth", "peer", "name", &a, "netns", host])?;
                self.ip(&["-n", host, "link", "set", &a, "up"])?;
                self.attach_to_bridge(&link.b)?;
            }
        }
        Ok(())
    }

    fn start_switch(&mut self, switch: &str) -> Result<(), BackendError> {
        self.ip(&["link", "set", switch, "up"])?;
        Ok(())
    }

    fn set_ip(&mut self, interface: &Interface, addr: Ipv4Net) -> Result<(), BackendError> {
        let host = interface.node.as_str();
        let name = interface.name();
        let cidr = addr.to_string();
        self.ip(&["-n", host, "addr", "flush", "dev", &name])?;
        self.ip(&["-n", host, "addr", "add", &cidr, "dev", &name])?;
        Ok(())
    }

    fn switch_cmd(&mut self, _switch: &str, command: &str) -> Result<CommandOutput, BackendError> {
        let shell = self.tools.shell.clone();
        self.runner.run(&shell, &["-c", command])
    }

    fn host_cmd(&mut self, host: &str, command: &str) -> Result<CommandOutput, BackendError> {
        let ip = self.tools.ip.clone();
        let shell = self.tools.shell.clone();
        self.runner.run(&ip, &["netns", "exec", host, &shell, "-c", command])
    }

    fn remove_link(&mut self, link: &LinkSpec) -> Result<(), BackendError> {
        let vsctl = self.tools.ovs_vsctl.clone();
        let ip = self.tools.ip.clone();
        let switch_ends: Vec<&Interface> = match link.kind {
            LinkKind::InterSwitch => vec![&link.a, &link.b],
            LinkKind::Access => vec![&link.b],
        };
        for end in &switch_ends {
            self.removal(&vsctl, &["--if-exists", "del-port", &end.node, &end.name()])?;
        }
        // deleting one end of a veth pair deletes its peer too
        self.removal(&ip, &["link", "del", &switch_ends[0].name()])
    }

    fn remove_host(&mut self, host: &str) -> Result<(), BackendError> {
        let ip = self.tools.ip.clone();
        self.removal(&ip, &["netns", "del", host])
    }

    fn remove_switch(&mut self, switch: &str) -> Result<(), BackendError> {
        let vsctl = self.tools.ovs_vsctl.clone();
        self.removal(&vsctl, &["--if-exists", "del-br", switch])
    }
}
