//! In-memory backend.
//!
//! Keeps the switches, hosts, links and addresses a real backend would
//! create, without touching the kernel. Pings succeed when the two hosts are
//! connected through started switches. Used to exercise the full pipeline
//! without root privileges.

use super::{Backend, BackendError, CommandOutput};
use crate::topology::{HostSpec, Interface, LinkSpec, SwitchSpec};
use ipnet::Ipv4Net;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::net::Ipv4Addr;

/// State of an emulated switch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySwitch {
    pub spec: SwitchSpec,
    pub up: bool,
    pub stp_enabled: bool,
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    switches: BTreeMap<String, MemorySwitch>,
    hosts: BTreeMap<String, BTreeMap<String, Ipv4Net>>,
    links: Vec<LinkSpec>,
    journal: Vec<String>,
    fail_on: Option<String>,
    unprivileged: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation whose journal entry contains `needle` fail
    pub fn fail_on(mut self, needle: impl Into<String>) -> Self {
        self.fail_on = Some(needle.into());
        self
    }

    /// Make [`Backend::preflight`] fail as it would for a non-root user
    pub fn without_privileges(mut self) -> Self {
        self.unprivileged = true;
        self
    }

    /// Every operation attempted so far, in order
    pub fn journal(&self) -> &[String] {
        &self.journal
    }

    pub fn switch(&self, name: &str) -> Option<&MemorySwitch> {
        self.switches.get(name)
    }

    pub fn switch_names(&self) -> Vec<&str> {
        self.switches.keys().map(String::as_str).collect()
    }

    pub fn host_names(&self) -> Vec<&str> {
        self.hosts.keys().map(String::as_str).collect()
    }

    pub fn links(&self) -> &[LinkSpec] {
        &self.links
    }

    pub fn host_addresses(&self, host: &str) -> Vec<Ipv4Net> {
        self.hosts
            .get(host)
            .map(|addrs| addrs.values().copied().collect())
            .unwrap_or_default()
    }

    /// Whether nothing created through this backend is left
    pub fn is_empty(&self) -> bool {
        self.switches.is_empty() && self.hosts.is_empty() && self.links.is_empty()
    }

    fn record(&mut self, entry: String) -> Result<(), BackendError> {
        let failing = matches!(&self.fail_on, Some(needle) if entry.contains(needle.as_str()));
        self.journal.push(entry.clone());
        if failing {
            return Err(BackendError::CommandFailed {
                command: entry,
                status: "injected".to_string(),
                stderr: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn node_exists(&self, node: &str) -> bool {
        self.switches.contains_key(node) || self.hosts.contains_key(node)
    }

    fn host_with_address(&self, addr: Ipv4Addr) -> Option<&str> {
        self.hosts
            .iter()
            .find(|(_, addrs)| addrs.values().any(|net| net.addr() == addr))
            .map(|(name, _)| name.as_str())
    }

    /// Breadth-first search over links, only crossing switches that are up
    fn connected(&self, from: &str, to: &str) -> bool {
        let mut visited = HashSet::from([from]);
        let mut queue = VecDeque::from([from]);
        while let Some(node) = queue.pop_front() {
            if node == to {
                return true;
            }
            if node != from && self.switches.get(node).map_or(true, |s| !s.up) {
                continue;
            }
            for link in &self.links {
                if let Some(peer) = link.peer_of(node) {
                    if visited.insert(peer.node.as_str()) {
                        queue.push_back(peer.node.as_str());
                    }
                }
            }
        }
        false
    }

    fn ping(&self, host: &str, target: &str) -> CommandOutput {
        if self.hosts.get(host).map_or(true, BTreeMap::is_empty) {
            return CommandOutput::failed("connect: Network is unreachable");
        }
        let reachable = target
            .parse::<Ipv4Addr>()
            .ok()
            .and_then(|addr| self.host_with_address(addr))
            .map_or(false, |dst| self.connected(host, dst));
        if reachable {
            CommandOutput::ok("1 packets transmitted, 1 received, 0% packet loss")
        } else {
            CommandOutput {
                success: false,
                stdout: "1 packets transmitted, 0 received, 100% packet loss".to_string(),
                stderr: String::new(),
            }
        }
    }
}

impl Backend for MemoryBackend {
    fn preflight(&mut self) -> Result<(), BackendError> {
        self.record("preflight".to_string())?;
        if self.unprivileged {
            return Err(BackendError::NotRoot(1000));
        }
        Ok(())
    }

    fn add_switch(&mut self, switch: &SwitchSpec) -> Result<(), BackendError> {
        self.record(format!("add_switch {}", switch.name))?;
        if self.node_exists(&switch.name) {
            return Err(BackendError::Verification {
                node: switch.name.clone(),
                detail: "already exists".to_string(),
            });
        }
        self.switches.insert(
            switch.name.clone(),
            MemorySwitch {
                spec: switch.clone(),
                up: false,
                stp_enabled: true,
            },
        );
        Ok(())
    }

    fn add_host(&mut self, host: &HostSpec) -> Result<(), BackendError> {
        self.record(format!("add_host {}", host.name))?;
        if self.node_exists(&host.name) {
            return Err(BackendError::Verification {
                node: host.name.clone(),
                detail: "already exists".to_string(),
            });
        }
        self.hosts.insert(host.name.clone(), BTreeMap::new());
        Ok(())
    }

    fn add_link(&mut self, link: &LinkSpec) -> Result<(), BackendError> {
        self.record(format!("add_link {link}"))?;
        for end in [&link.a, &link.b] {
            if !self.node_exists(&end.node) {
                return Err(BackendError::UnknownNode(end.node.clone()));
            }
        }
        self.links.push(link.clone());
        Ok(())
    }

    fn start_switch(&mut self, switch: &str) -> Result<(), BackendError> {
        self.record(format!("start_switch {switch}"))?;
        let state = self
            .switches
            .get_mut(switch)
            .ok_or_else(|| BackendError::UnknownNode(switch.to_string()))?;
        state.up = true;
        Ok(())
    }

    fn set_ip(&mut self, interface: &Interface, addr: Ipv4Net) -> Result<(), BackendError> {
        self.record(format!("set_ip {interface} {addr}"))?;
        if !self.links.iter().any(|l| l.a == *interface || l.b == *interface) {
            return Err(BackendError::UnknownNode(interface.name()));
        }
        let addrs = self
            .hosts
            .get_mut(&interface.node)
            .ok_or_else(|| BackendError::UnknownNode(interface.node.clone()))?;
        addrs.insert(interface.name(), addr);
        Ok(())
    }

    fn switch_cmd(&mut self, switch: &str, command: &str) -> Result<CommandOutput, BackendError> {
        self.record(format!("switch_cmd {switch} {command}"))?;
        if !self.switches.contains_key(switch) {
            return Err(BackendError::UnknownNode(switch.to_string()));
        }

        let words: Vec<&str> = command.split_whitespace().collect();
        match words.as_slice() {
            [program, "set", "bridge", bridge, setting] if program.ends_with("ovs-vsctl") => {
                let Some(value) = setting.strip_prefix("stp_enable=") else {
                    return Ok(CommandOutput::ok(""));
                };
                match self.switches.get_mut(*bridge) {
                    Some(state) => {
                        state.stp_enabled = value == "true";
                        Ok(CommandOutput::ok(""))
                    }
                    None => Ok(CommandOutput::failed(format!("no bridge named {bridge}"))),
                }
            }
            [program, "get", "bridge", bridge, "stp_enable"] if program.ends_with("ovs-vsctl") => {
                match self.switches.get(*bridge) {
                    Some(state) => Ok(CommandOutput::ok(format!("{}\n", state.stp_enabled))),
                    None => Ok(CommandOutput::failed(format!("no bridge named {bridge}"))),
                }
            }
            _ => Ok(CommandOutput::ok("")),
        }
    }

    fn host_cmd(&mut self, host: &str, command: &str) -> Result<CommandOutput, BackendError> {
        self.record(format!("host_cmd {host} {command}"))?;
        if !self.hosts.contains_key(host) {
            return Err(BackendError::UnknownNode(host.to_string()));
        }

        let words: Vec<&str> = command.split_whitespace().collect();
        match words.as_slice() {
            ["ping", .., target] => Ok(self.ping(host, target)),
            ["ifconfig", ..] | ["ip", "addr", ..] | ["ip", "a", ..] => {
                let listing: String = self
                    .hosts
                    .get(host)
                    .into_iter()
                    .flatten()
                    .map(|(intf, addr)| format!("{intf}: inet {addr}\n"))
                    .collect();
                Ok(CommandOutput::ok(listing))
            }
            _ => Ok(CommandOutput::ok("")),
        }
    }

    fn remove_link(&mut self, link: &LinkSpec) -> Result<(), BackendError> {
        self.record(format!("remove_link {link}"))?;
        self.links.retain(|l| l != link);
        Ok(())
    }

    fn remove_host(&mut self, host: &str) -> Result<(), BackendError> {
        self.record(format!("remove_host {host}"))?;
        self.hosts.remove(host);
        Ok(())
    }

    fn remove_switch(&mut self, switch: &str) -> Result<(), BackendError> {
        self.record(format!("remove_switch {switch}"))?;
        self.switches.remove(switch);
        Ok(())
    }
}
