//! Ports and the port registry.
//!
//! A port's canonical side is fixed at creation from its semantic role and never
//! changes; orientation only remaps where it is drawn (see [`Side::oriented`]).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::diagram::{Connection, Diagram, Node};
use super::types::{NodeId, PortDirection, PortId, ResourceKind, Side};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub id: PortId,
    pub direction: PortDirection,
    pub side: Side,
    /// Stable semantic key used to find well-known ports again after reload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_path: Option<String>,
}

/// Blueprint for a port created with a node.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PortTemplate {
    pub direction: PortDirection,
    pub side: Side,
    pub field_path: &'static str,
}

const fn template(direction: PortDirection, side: Side, field_path: &'static str) -> PortTemplate {
    PortTemplate { direction, side, field_path }
}

/// Initial process ports: two inputs, six mechanisms, two outputs.
pub const PROCESS_PORTS: &[PortTemplate] = &[
    template(PortDirection::Input, Side::Left, "input.material"),
    template(PortDirection::Input, Side::Left, "input.semiFinished"),
    template(PortDirection::Input, Side::Bottom, "mechanism.machine"),
    template(PortDirection::Input, Side::Bottom, "mechanism.energy"),
    template(PortDirection::Input, Side::Bottom, "mechanism.gas"),
    template(PortDirection::Input, Side::Bottom, "mechanism.water"),
    template(PortDirection::Input, Side::Bottom, "mechanism.service"),
    template(PortDirection::Input, Side::Bottom, "mechanism.property"),
    template(PortDirection::Output, Side::Right, "output.product"),
    template(PortDirection::Output, Side::Right, "output.waste"),
];

const INPUT_RESOURCE_PORTS: &[PortTemplate] =
    &[template(PortDirection::Output, Side::Right, "resource.out")];

const OUTPUT_RESOURCE_PORTS: &[PortTemplate] = &[
    template(PortDirection::Input, Side::Left, "resource.in"),
    template(PortDirection::Output, Side::Right, "resource.next"),
];

const MECHANISM_RESOURCE_PORTS: &[PortTemplate] =
    &[template(PortDirection::Output, Side::Top, "resource.out")];

/// Ports a resource of `kind` is constructed with. The first entry always faces
/// the process the resource typically attaches to.
pub fn resource_ports(kind: ResourceKind) -> &'static [PortTemplate] {
    match kind {
        ResourceKind::Input => INPUT_RESOURCE_PORTS,
        ResourceKind::Output => OUTPUT_RESOURCE_PORTS,
        _ => MECHANISM_RESOURCE_PORTS,
    }
}

/// The side of a resource that faces its owning process.
pub fn process_facing_side(kind: ResourceKind) -> Side {
    resource_ports(kind)[0].side
}

/// Side and direction of a port appended to a process at runtime for `kind`.
pub fn runtime_process_port(kind: ResourceKind) -> (PortDirection, Side) {
    match kind {
        ResourceKind::Input => (PortDirection::Input, Side::Left),
        ResourceKind::Output => (PortDirection::Output, Side::Right),
        _ => (PortDirection::Input, Side::Bottom),
    }
}

/// Lookup tables between ports, their owning nodes, and the connections using them.
///
/// Built fresh from a diagram; every query is O(1) apart from the ordered
/// per-side listing, which walks the owning node's ports.
#[derive(Debug)]
pub struct PortRegistry<'a> {
    ports: HashMap<PortId, (&'a Port, NodeId)>,
    nodes: HashMap<NodeId, &'a Node>,
    /// Connections per port, in connection creation order.
    connections: HashMap<PortId, Vec<&'a Connection>>,
}

impl<'a> PortRegistry<'a> {
    pub fn from_diagram(diagram: &'a Diagram) -> Self {
        let mut ports = HashMap::new();
        let mut nodes = HashMap::new();
        for node in diagram.nodes() {
            nodes.insert(node.id, node);
            for port in &node.ports {
                ports.insert(port.id, (port, node.id));
            }
        }

        let mut connections: HashMap<PortId, Vec<&'a Connection>> = HashMap::new();
        for conn in diagram.connections() {
            connections.entry(conn.from).or_default().push(conn);
            if conn.to != conn.from {
                connections.entry(conn.to).or_default().push(conn);
            }
        }

        Self { ports, nodes, connections }
    }

    pub fn port(&self, id: PortId) -> Option<&'a Port> {
        let found = self.ports.get(&id).map(|(p, _)| *p);
        debug_assert!(found.is_some(), "port {id} is not registered");
        found
    }

    pub fn owner_of(&self, id: PortId) -> Option<NodeId> {
        self.ports.get(&id).map(|(_, owner)| *owner)
    }

    pub fn node(&self, id: NodeId) -> Option<&'a Node> {
        self.nodes.get(&id).copied()
    }

    /// Ports of `node` on `side`, in creation order. Empty for unknown nodes.
    pub fn ports_of_side(&self, node: NodeId, side: Side) -> Vec<&'a Port> {
        let Some(n) = self.nodes.get(&node) else {
            debug_assert!(false, "node {node} is not registered");
            return Vec::new();
        };
        n.ports_of_side(side).collect()
    }

    pub fn connections_of(&self, port: PortId) -> &[&'a Connection] {
        self.connections.get(&port).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_template_counts() {
        let count = |side| PROCESS_PORTS.iter().filter(|t| t.side == side).count();
        assert_eq!(count(Side::Left), 2);
        assert_eq!(count(Side::Bottom), 6);
        assert_eq!(count(Side::Right), 2);
    }

    #[test]
    fn process_field_paths_are_unique() {
        let mut paths: Vec<_> = PROCESS_PORTS.iter().map(|t| t.field_path).collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), PROCESS_PORTS.len());
    }

    #[test]
    fn every_default_field_path_exists_on_process() {
        for kind in [ResourceKind::Input, ResourceKind::Output]
            .into_iter()
            .chain(ResourceKind::MECHANISMS)
        {
            let path = kind.process_field_path();
            assert!(PROCESS_PORTS.iter().any(|t| t.field_path == path), "{path}");
        }
    }

    #[test]
    fn registry_lookups() {
        let mut diagram = Diagram::new();
        let process = diagram.add_process("Process").unwrap();
        let input = diagram.add_input(process).unwrap();
        let registry = PortRegistry::from_diagram(&diagram);

        let left = registry.ports_of_side(process, Side::Left);
        // Two template inputs plus the runtime-appended one, in creation order.
        assert_eq!(left.len(), 3);
        assert!(left.windows(2).all(|w| w[0].id < w[1].id));

        let res_port = registry.ports_of_side(input, Side::Right)[0];
        assert_eq!(registry.owner_of(res_port.id), Some(input));
        assert_eq!(registry.port(res_port.id).map(|p| p.side), Some(Side::Right));
        let links = registry.connections_of(res_port.id);
        assert_eq!(links.len(), 1);
        assert_eq!(registry.owner_of(links[0].to), Some(process));
        assert_eq!(registry.connections_of(left[0].id).len(), 0);
    }
}
