//! The live emulated network.
//!
//! A [`Network`] replays a [`TopologyDescription`] against a [`Backend`],
//! turns the switches into loop-tolerant standalone bridges and addresses
//! the hosts. Everything it creates is recorded so [`Network::stop`] removes
//! exactly what exists, whatever point bring-up reached.

use crate::backend::{Backend, BackendError, CommandOutput};
use crate::ip::HostAddressPlan;
use crate::topology::{LinkSpec, NodeKind, TopoCommand, TopologyDescription};
use ipnet::Ipv4Net;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fmt;

/// Lifecycle of a [`Network`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkState {
    Init,
    Running,
    Ready,
    Failed,
    Stopped,
}

impl fmt::Display for NetworkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "initialising",
            Self::Running => "running",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

pub struct Network<B: Backend> {
    backend: B,
    topology: TopologyDescription,
    plan: HostAddressPlan,
    state: NetworkState,
    stp_disabled: bool,
    switches: Vec<String>,
    hosts: Vec<String>,
    links: Vec<LinkSpec>,
    host_ips: HashMap<String, Ipv4Net>,
    ovs_vsctl: String,
}

impl<B: Backend> Network<B> {
    /// Bind a backend to a topology. Nothing is created until [`Network::start`].
    pub fn new(backend: B, topology: TopologyDescription) -> Self {
        Self {
            backend,
            topology,
            plan: HostAddressPlan::default(),
            state: NetworkState::Init,
            stp_disabled: false,
            switches: Vec::new(),
            hosts: Vec::new(),
            links: Vec::new(),
            host_ips: HashMap::new(),
            ovs_vsctl: "ovs-vsctl".to_string(),
        }
    }

    /// Name or path of `ovs-vsctl` used in switch commands
    pub fn with_ovs_vsctl(mut self, ovs_vsctl: impl Into<String>) -> Self {
        self.ovs_vsctl = ovs_vsctl.into();
        self
    }

    pub fn state(&self) -> NetworkState {
        self.state
    }

    pub fn topology(&self) -> &TopologyDescription {
        &self.topology
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Address assigned to `host` by [`Network::configure`]
    pub fn host_ip(&self, host: &str) -> Option<Ipv4Net> {
        self.host_ips.get(host).copied()
    }

    fn expect_state(&self, operation: &'static str, allowed: &[NetworkState]) -> Result<(), BackendError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(BackendError::InvalidState {
                operation,
                state: self.state.to_string(),
            })
        }
    }

    fn mark_failed<T>(&mut self, result: Result<T, BackendError>) -> Result<T, BackendError> {
        if result.is_err() {
            self.state = NetworkState::Failed;
        }
        result
    }

    /// Create every switch, host and link in description order, then bring
    /// the switches up.
    pub fn start(&mut self) -> Result<(), BackendError> {
        self.expect_state("start", &[NetworkState::Init])?;
        info!(
            "Starting network: {} switches, {} hosts, {} links",
            self.topology.switch_count(),
            self.topology.host_count(),
            self.topology.link_count()
        );
        let result = self.create_all();
        self.mark_failed(result)?;
        self.state = NetworkState::Running;
        Ok(())
    }

    fn create_all(&mut self) -> Result<(), BackendError> {
        for command in self.topology.commands() {
            match command {
                // Recorded before creating: a half-made object still needs
                // removal, and removing a missing one is a no-op
                TopoCommand::AddSwitch(switch) => {
                    self.switches.push(switch.name.clone());
                    self.backend.add_switch(switch)?;
                }
                TopoCommand::AddHost(host) => {
                    self.hosts.push(host.name.clone());
                    self.backend.add_host(host)?;
                }
                TopoCommand::AddLink(link) => {
                    self.links.push(link.clone());
                    self.backend.add_link(link)?;
                }
            }
        }
        for switch in &self.switches {
            debug!("Starting switch {}", switch);
            self.backend.start_switch(switch)?;
        }
        Ok(())
    }

    /// Turn spanning tree off on every switch and check that it took effect
    pub fn disable_stp(&mut self) -> Result<(), BackendError> {
        self.expect_state("disable STP", &[NetworkState::Running])?;
        let result = self.disable_stp_all();
        self.mark_failed(result)?;
        self.stp_disabled = true;
        info!("Spanning tree disabled on {} switches", self.switches.len());
        Ok(())
    }

    fn disable_stp_all(&mut self) -> Result<(), BackendError> {
        for switch in &self.switches {
            let set = format!("{} set bridge {} stp_enable=false", self.ovs_vsctl, switch);
            let output = self.backend.switch_cmd(switch, &set)?;
            if !output.success {
                return Err(BackendError::Verification {
                    node: switch.clone(),
                    detail: format!("could not disable STP: {}", output.stderr.trim()),
                });
            }
        }
        for switch in &self.switches {
            let get = format!("{} get bridge {} stp_enable", self.ovs_vsctl, switch);
            let output = self.backend.switch_cmd(switch, &get)?;
            let value = output.stdout.trim();
            if !output.success || value != "false" {
                return Err(BackendError::Verification {
                    node: switch.clone(),
                    detail: format!("stp_enable reads '{}'", value),
                });
            }
        }
        Ok(())
    }

    /// Assign `10.0.0.(i+1)/24` to the access interface of every host `h_i`
    pub fn configure(&mut self) -> Result<(), BackendError> {
        self.expect_state("configure", &[NetworkState::Running])?;
        if !self.stp_disabled {
            return Err(BackendError::InvalidState {
                operation: "configure",
                state: "running with spanning tree enabled".to_string(),
            });
        }
        let result = self.address_hosts();
        self.mark_failed(result)?;
        self.state = NetworkState::Ready;
        info!("Network ready");
        Ok(())
    }

    fn address_hosts(&mut self) -> Result<(), BackendError> {
        for host in self.topology.hosts() {
            let interface = self.topology.access_interface(&host.name).ok_or_else(|| {
                BackendError::Verification {
                    node: host.name.clone(),
                    detail: "host has no access link".to_string(),
                }
            })?;
            let addr = self
                .plan
                .host_address(host.index)
                .map_err(|e| BackendError::Verification {
                    node: host.name.clone(),
                    detail: e.to_string(),
                })?;
            debug!("Assigning {} to {}", addr, interface);
            self.backend.set_ip(interface, addr)?;
            self.host_ips.insert(host.name.clone(), addr);
        }
        Ok(())
    }

    /// Remove everything this network created: host namespaces first, then
    /// links, then switches. Failures are logged and teardown continues.
    /// Calling it again, or before [`Network::start`], does nothing.
    pub fn stop(&mut self) {
        if matches!(self.state, NetworkState::Init | NetworkState::Stopped) {
            return;
        }
        info!("Stopping network");

        for host in std::mem::take(&mut self.hosts) {
            if let Err(e) = self.backend.remove_host(&host) {
                warn!("Failed to remove host {}: {}", host, e);
            }
        }
        for link in std::mem::take(&mut self.links) {
            if let Err(e) = self.backend.remove_link(&link) {
                warn!("Failed to remove link {}: {}", link, e);
            }
        }
        for switch in std::mem::take(&mut self.switches) {
            if let Err(e) = self.backend.remove_switch(&switch) {
                warn!("Failed to remove switch {}: {}", switch, e);
            }
        }

        self.host_ips.clear();
        self.stp_disabled = false;
        self.state = NetworkState::Stopped;
    }

    /// Run a shell command on a host (in its namespace) or on a switch
    pub fn node_cmd(&mut self, node: &str, command: &str) -> Result<CommandOutput, BackendError> {
        match self.topology.node_kind(node) {
            Some(NodeKind::Host) => self.host_cmd(node, command),
            Some(NodeKind::Switch) => self.switch_cmd(node, command),
            None => Err(BackendError::UnknownNode(node.to_string())),
        }
    }

    pub fn host_cmd(&mut self, host: &str, command: &str) -> Result<CommandOutput, BackendError> {
        self.expect_state("run host commands", &[NetworkState::Running, NetworkState::Ready])?;
        self.backend.host_cmd(host, command)
    }

    pub fn switch_cmd(&mut self, switch: &str, command: &str) -> Result<CommandOutput, BackendError> {
        self.expect_state("run switch commands", &[NetworkState::Running, NetworkState::Ready])?;
        self.backend.switch_cmd(switch, command)
    }

    /// Run a shell command in the root namespace, where every switch lives
    pub fn root_cmd(&mut self, command: &str) -> Result<CommandOutput, BackendError> {
        let switch = self
            .switches
            .first()
            .cloned()
            .ok_or_else(|| BackendError::UnknownNode("root namespace".to_string()))?;
        self.switch_cmd(&switch, command)
    }
}

impl<B: Backend> Drop for Network<B> {
    fn drop(&mut self) {
        self.stop();
    }
}
