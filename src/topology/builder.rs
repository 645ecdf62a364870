//! Topology construction.
//!
//! [`build`] turns a loaded graph into a [`TopologyDescription`]: the ordered
//! list of switch, host and link creations that the network replays against
//! the emulator backend. Everything is validated here, before any backend
//! resource exists.

use super::names::{host_name, is_valid_identifier, switch_name, NameMap};
use super::types::{
    FailMode, HostSpec, Interface, LinkKind, LinkSpec, NodeKind, SwitchClass, SwitchSpec,
    TopoCommand,
};
use crate::gml_parser::Graph;
use crate::ip::{AddressError, HostAddressPlan};
use std::collections::{HashMap, HashSet};

/// First port number handed out on a switch
const FIRST_SWITCH_PORT: u32 = 1;
/// First port number handed out on a host
const FIRST_HOST_PORT: u32 = 0;

/// Reasons a topology cannot be built
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("identifier '{0}' is already in use")]
    DuplicateIdentifier(String),

    #[error("'{0}' is not a valid node identifier")]
    InvalidIdentifier(String),

    #[error("link endpoint '{0}' does not exist")]
    UnknownEndpoint(String),

    #[error("self-loop on '{0}' cannot be emulated")]
    SelfLoop(String),

    #[error("no address left for '{0}' in the host subnet")]
    AddressExhausted(String),
}

impl BuildError {
    /// The identifier the failure is about
    pub fn identifier(&self) -> &str {
        match self {
            Self::DuplicateIdentifier(id)
            | Self::InvalidIdentifier(id)
            | Self::UnknownEndpoint(id)
            | Self::SelfLoop(id)
            | Self::AddressExhausted(id) => id,
        }
    }
}

/// Ordered description of the network to emulate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologyDescription {
    commands: Vec<TopoCommand>,
}

impl TopologyDescription {
    /// Creation steps in the order they must be replayed
    pub fn commands(&self) -> &[TopoCommand] {
        &self.commands
    }

    pub fn switches(&self) -> impl Iterator<Item = &SwitchSpec> {
        self.commands.iter().filter_map(|c| match c {
            TopoCommand::AddSwitch(s) => Some(s),
            _ => None,
        })
    }

    pub fn hosts(&self) -> impl Iterator<Item = &HostSpec> {
        self.commands.iter().filter_map(|c| match c {
            TopoCommand::AddHost(h) => Some(h),
            _ => None,
        })
    }

    pub fn links(&self) -> impl Iterator<Item = &LinkSpec> {
        self.commands.iter().filter_map(|c| match c {
            TopoCommand::AddLink(l) => Some(l),
            _ => None,
        })
    }

    pub fn switch_count(&self) -> usize {
        self.switches().count()
    }

    pub fn host_count(&self) -> usize {
        self.hosts().count()
    }

    pub fn link_count(&self) -> usize {
        self.links().count()
    }

    /// Kind of the node called `name`, if it is part of the description
    pub fn node_kind(&self, name: &str) -> Option<NodeKind> {
        self.commands.iter().find_map(|c| match c {
            TopoCommand::AddSwitch(s) if s.name == name => Some(NodeKind::Switch),
            TopoCommand::AddHost(h) if h.name == name => Some(NodeKind::Host),
            _ => None,
        })
    }

    /// The host side interface of the access link of `host`
    pub fn access_interface(&self, host: &str) -> Option<&Interface> {
        self.links()
            .filter(|l| l.kind == LinkKind::Access)
            .find(|l| l.a.node == host)
            .map(|l| &l.a)
    }
}

/// Eager topology builder. Tracks identifiers and port counters so every
/// step is validated as it is added.
#[derive(Debug, Default)]
struct TopologyBuilder {
    commands: Vec<TopoCommand>,
    nodes: HashMap<String, NodeKind>,
    next_port: HashMap<String, u32>,
}

impl TopologyBuilder {
    fn register(&mut self, name: &str, kind: NodeKind) -> Result<(), BuildError> {
        if !is_valid_identifier(name) {
            return Err(BuildError::InvalidIdentifier(name.to_string()));
        }
        if self.nodes.contains_key(name) {
            return Err(BuildError::DuplicateIdentifier(name.to_string()));
        }
        self.nodes.insert(name.to_string(), kind);
        let first_port = match kind {
            NodeKind::Switch => FIRST_SWITCH_PORT,
            NodeKind::Host => FIRST_HOST_PORT,
        };
        self.next_port.insert(name.to_string(), first_port);
        Ok(())
    }

    fn add_switch(&mut self, index: usize) -> Result<(), BuildError> {
        let name = switch_name(index);
        self.register(&name, NodeKind::Switch)?;
        self.commands.push(TopoCommand::AddSwitch(SwitchSpec {
            name,
            index,
            class: SwitchClass::Kernel,
            fail_mode: FailMode::Standalone,
        }));
        Ok(())
    }

    fn add_host(&mut self, index: usize) -> Result<(), BuildError> {
        let name = host_name(index);
        self.register(&name, NodeKind::Host)?;
        self.commands.push(TopoCommand::AddHost(HostSpec { name, index }));
        Ok(())
    }

    fn allocate_port(&mut self, node: &str) -> Result<Interface, BuildError> {
        let port = self
            .next_port
            .get_mut(node)
            .ok_or_else(|| BuildError::UnknownEndpoint(node.to_string()))?;
        let interface = Interface::new(node, *port);
        *port += 1;
        Ok(interface)
    }

    fn add_link(&mut self, a: &str, b: &str, kind: LinkKind) -> Result<(), BuildError> {
        if a == b {
            return Err(BuildError::SelfLoop(a.to_string()));
        }
        for end in [a, b] {
            if !self.nodes.contains_key(end) {
                return Err(BuildError::UnknownEndpoint(end.to_string()));
            }
        }
        let a = self.allocate_port(a)?;
        let b = self.allocate_port(b)?;
        self.commands.push(TopoCommand::AddLink(LinkSpec { a, b, kind }));
        Ok(())
    }

    fn finish(self) -> TopologyDescription {
        TopologyDescription {
            commands: self.commands,
        }
    }
}

/// Build the topology description for `graph`.
///
/// Emits, in order: one switch per vertex; one inter-switch link per
/// distinct undirected edge; then for each vertex its host followed by the
/// host's access link.
///
/// Parallel edges and reverse duplicates are collapsed to one link, the
/// first occurrence wins. Self-loops are rejected, as are graphs with more
/// vertices than the host subnet can address.
pub fn build(graph: &Graph, names: &NameMap) -> Result<TopologyDescription, BuildError> {
    if let Err(AddressError::Exhausted { index, .. }) =
        HostAddressPlan::default().ensure_capacity(names.len())
    {
        return Err(BuildError::AddressExhausted(host_name(index)));
    }

    let mut builder = TopologyBuilder::default();

    for (i, _, _) in names.iter() {
        builder.add_switch(i)?;
    }

    let mut seen = HashSet::new();
    for (source, target) in graph.edges() {
        let i = names
            .index_of(source)
            .ok_or_else(|| BuildError::UnknownEndpoint(source.clone()))?;
        let j = names
            .index_of(target)
            .ok_or_else(|| BuildError::UnknownEndpoint(target.clone()))?;
        if i == j {
            return Err(BuildError::SelfLoop(switch_name(i)));
        }
        if !seen.insert((i.min(j), i.max(j))) {
            log::warn!(
                "Ignoring duplicate edge {} -- {} ({} -- {})",
                source,
                target,
                switch_name(i),
                switch_name(j)
            );
            continue;
        }
        builder.add_link(&switch_name(i), &switch_name(j), LinkKind::InterSwitch)?;
    }

    for (i, _, _) in names.iter() {
        builder.add_host(i)?;
        builder.add_link(&host_name(i), &switch_name(i), LinkKind::Access)?;
    }

    let description = builder.finish();
    log::info!(
        "Built topology: {} switches, {} hosts, {} links",
        description.switch_count(),
        description.host_count(),
        description.link_count()
    );
    Ok(description)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gml_parser::parse_gml;

    fn describe(content: &str) -> Result<TopologyDescription, BuildError> {
        let graph = Graph::try_from(parse_gml(content).unwrap()).unwrap();
        let names = NameMap::assign(&graph);
        build(&graph, &names)
    }

    const TRIANGLE: &str = r#"graph [
        node [ id 0 label "A" ] node [ id 1 label "B" ] node [ id 2 label "C" ]
        edge [ source 0 target 1 ] edge [ source 1 target 2 ] edge [ source 2 target 0 ]
    ]"#;

    #[test]
    fn test_triangle_counts() {
        let topo = describe(TRIANGLE).unwrap();
        assert_eq!(topo.switch_count(), 3);
        assert_eq!(topo.host_count(), 3);
        assert_eq!(topo.link_count(), 6);
    }

    #[test]
    fn test_command_order() {
        let topo = describe(TRIANGLE).unwrap();
        let kinds: Vec<&str> = topo
            .commands()
            .iter()
            .map(|c| match c {
                TopoCommand::AddSwitch(_) => "switch",
                TopoCommand::AddHost(_) => "host",
                TopoCommand::AddLink(l) if l.kind == LinkKind::Access => "access",
                TopoCommand::AddLink(_) => "inter",
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "switch", "switch", "switch", "inter", "inter", "inter", "host", "access", "host",
                "access", "host", "access"
            ]
        );
    }

    #[test]
    fn test_deterministic_port_pairing() {
        let topo = describe(TRIANGLE).unwrap();
        let links: Vec<String> = topo.links().map(|l| l.to_string()).collect();
        assert_eq!(
            links,
            vec![
                "s0-eth1<->s1-eth1",
                "s1-eth2<->s2-eth1",
                "s2-eth2<->s0-eth2",
                "h0-eth0<->s0-eth3",
                "h1-eth0<->s1-eth3",
                "h2-eth0<->s2-eth3",
            ]
        );
        assert_eq!(topo, describe(TRIANGLE).unwrap());
    }

    #[test]
    fn test_switches_are_standalone_kernel_switches() {
        let topo = describe(TRIANGLE).unwrap();
        for switch in topo.switches() {
            assert_eq!(switch.class, SwitchClass::Kernel);
            assert_eq!(switch.fail_mode, FailMode::Standalone);
        }
    }

    #[test]
    fn test_access_links() {
        let topo = describe(TRIANGLE).unwrap();
        for i in 0..3 {
            let host = host_name(i);
            let access: Vec<&LinkSpec> = topo.links().filter(|l| l.touches(&host)).collect();
            assert_eq!(access.len(), 1);
            assert_eq!(access[0].kind, LinkKind::Access);
            assert_eq!(access[0].b.node, switch_name(i));
            assert_eq!(topo.access_interface(&host), Some(&Interface::new(host.clone(), 0)));
        }
    }

    #[test]
    fn test_single_vertex() {
        let topo = describe(r#"graph [ node [ id 0 label "Solo" ] ]"#).unwrap();
        assert_eq!(topo.switch_count(), 1);
        assert_eq!(topo.host_count(), 1);
        assert_eq!(topo.link_count(), 1);
    }

    #[test]
    fn test_duplicate_and_reverse_edges_collapse() {
        let topo = describe(
            r#"graph [
                node [ id 0 ] node [ id 1 ]
                edge [ source 0 target 1 ]
                edge [ source 1 target 0 ]
                edge [ source 0 target 1 ]
            ]"#,
        )
        .unwrap();
        let inter = topo.links().filter(|l| l.kind == LinkKind::InterSwitch).count();
        assert_eq!(inter, 1);
    }

    #[test]
    fn test_self_loop_rejected() {
        let err = describe(r#"graph [ node [ id 0 ] node [ id 1 ] edge [ source 1 target 1 ] ]"#).unwrap_err();
        assert_eq!(err, BuildError::SelfLoop("s1".to_string()));
        assert_eq!(err.identifier(), "s1");
    }

    #[test]
    fn test_disconnected_components() {
        let topo = describe(
            r#"graph [
                node [ id 0 ] node [ id 1 ] node [ id 2 ] node [ id 3 ]
                edge [ source 0 target 1 ]
                edge [ source 2 target 3 ]
            ]"#,
        )
        .unwrap();
        assert_eq!(topo.switch_count(), 4);
        assert_eq!(topo.link_count(), 2 + 4);
    }

    #[test]
    fn test_builder_rejects_bad_identifiers() {
        let mut builder = TopologyBuilder::default();
        builder.add_switch(0).unwrap();
        assert_eq!(
            builder.add_switch(0),
            Err(BuildError::DuplicateIdentifier("s0".to_string()))
        );
        assert_eq!(
            builder.register("0bad", NodeKind::Host),
            Err(BuildError::InvalidIdentifier("0bad".to_string()))
        );
        assert_eq!(
            builder.add_link("s0", "s9", LinkKind::InterSwitch),
            Err(BuildError::UnknownEndpoint("s9".to_string()))
        );
    }

    #[test]
    fn test_too_many_hosts_for_subnet() {
        let nodes: String = (0..255).map(|i| format!("node [ id {i} ] ")).collect();
        let err = describe(&format!("graph [ {nodes}]")).unwrap_err();
        assert_eq!(err, BuildError::AddressExhausted("h254".to_string()));
    }

    #[test]
    fn test_node_kind_lookup() {
        let topo = describe(TRIANGLE).unwrap();
        assert_eq!(topo.node_kind("s2"), Some(NodeKind::Switch));
        assert_eq!(topo.node_kind("h0"), Some(NodeKind::Host));
        assert_eq!(topo.node_kind("x1"), None);
    }
}
