//! Topology type definitions.
//!
//! These types describe the emulated network before it exists: which
//! switches and hosts to create, and which interfaces each link pairs up.

use std::fmt;

/// Datapath implementation backing a software switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwitchClass {
    /// Open vSwitch with the in-kernel datapath
    #[default]
    Kernel,
    /// Open vSwitch with the userspace (`netdev`) datapath
    UserSpace,
}

impl SwitchClass {
    /// Value of the bridge `datapath_type` column
    pub fn datapath_type(&self) -> &'static str {
        match self {
            Self::Kernel => "system",
            Self::UserSpace => "netdev",
        }
    }
}

/// Behaviour of a switch when no controller is reachable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailMode {
    /// Act as a self-contained MAC-learning bridge
    #[default]
    Standalone,
    /// Drop everything not matched by installed flows
    Secure,
}

impl FailMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standalone => "standalone",
            Self::Secure => "secure",
        }
    }
}

/// A switch to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchSpec {
    pub name: String,
    pub index: usize,
    pub class: SwitchClass,
    pub fail_mode: FailMode,
}

impl SwitchSpec {
    /// 16 hex digit datapath id, `index + 1` so no switch gets the null id
    pub fn dpid(&self) -> String {
        format!("{:016x}", self.index as u64 + 1)
    }
}

/// A host to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSpec {
    pub name: String,
    pub index: usize,
}

/// Kind of node an identifier refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Switch,
    Host,
}

/// One end of a link: a node and a port number on it
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Interface {
    pub node: String,
    pub port: u32,
}

impl Interface {
    pub fn new(node: impl Into<String>, port: u32) -> Self {
        Self {
            node: node.into(),
            port,
        }
    }

    /// Kernel interface name, `<node>-eth<port>`
    pub fn name(&self) -> String {
        format!("{}-eth{}", self.node, self.port)
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-eth{}", self.node, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// Between two switches, one per graph edge
    InterSwitch,
    /// Between a host and its own switch
    Access,
}

/// A point-to-point link. For access links `a` is the host end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpec {
    pub a: Interface,
    pub b: Interface,
    pub kind: LinkKind,
}

impl LinkSpec {
    /// Whether this link touches `node`
    pub fn touches(&self, node: &str) -> bool {
        self.a.node == node || self.b.node == node
    }

    /// The interface on the other side of `node`, if the link touches it
    pub fn peer_of(&self, node: &str) -> Option<&Interface> {
        if self.a.node == node {
            Some(&self.b)
        } else if self.b.node == node {
            Some(&self.a)
        } else {
            None
        }
    }
}

impl fmt::Display for LinkSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<->{}", self.a, self.b)
    }
}

/// One step of a topology description, replayed in order at network start
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopoCommand {
    AddSwitch(SwitchSpec),
    AddHost(HostSpec),
    AddLink(LinkSpec),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_name() {
        let intf = Interface::new("s12", 3);
        assert_eq!(intf.name(), "s12-eth3");
        assert_eq!(intf.to_string(), intf.name());
    }

    #[test]
    fn test_dpid_is_index_plus_one() {
        let spec = SwitchSpec {
            name: "s0".to_string(),
            index: 0,
            class: SwitchClass::Kernel,
            fail_mode: FailMode::Standalone,
        };
        assert_eq!(spec.dpid(), "0000000000000001");
        assert_eq!(SwitchSpec { index: 254, ..spec }.dpid(), "00000000000000ff");
    }

    #[test]
    fn test_link_peer() {
        let link = LinkSpec {
            a: Interface::new("h1", 0),
            b: Interface::new("s1", 2),
            kind: LinkKind::Access,
        };
        assert_eq!(link.peer_of("h1"), Some(&Interface::new("s1", 2)));
        assert_eq!(link.peer_of("s1"), Some(&Interface::new("h1", 0)));
        assert_eq!(link.peer_of("s2"), None);
        assert_eq!(link.to_string(), "h1-eth0<->s1-eth2");
    }

    #[test]
    fn test_ovs_column_values() {
        assert_eq!(FailMode::default().as_str(), "standalone");
        assert_eq!(SwitchClass::default().datapath_type(), "system");
        assert_eq!(SwitchClass::UserSpace.datapath_type(), "netdev");
    }
}
