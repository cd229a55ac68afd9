// Connection index for resource grouping.
//
// Maps each port to the node on the other end of its connection. Built once
// per pass from the port registry's per-port connection lists.
//
// Tie-break: when a port carries several connections, the one created first
// wins. Resources normally have exactly one, so this only matters after
// manual rewiring.

use std::collections::HashMap;

use crate::model::{Diagram, NodeId, PortId, PortRegistry};

#[derive(Debug, Clone, Default)]
pub struct ConnectionIndex {
    across: HashMap<PortId, NodeId>,
}

impl ConnectionIndex {
    pub fn build(diagram: &Diagram, registry: &PortRegistry<'_>) -> Self {
        let mut across = HashMap::with_capacity(diagram.connections().len() * 2);
        for port in diagram.nodes().iter().flat_map(|n| &n.ports) {
            let far = registry.connections_of(port.id).iter().find_map(|conn| {
                let other = if conn.from == port.id { conn.to } else { conn.from };
                registry.owner_of(other)
            });
            if let Some(owner) = far {
                across.insert(port.id, owner);
            }
        }
        Self { across }
    }

    /// The node owning the far end of `port`'s first connection.
    /// `None` means unassigned: use the default owner.
    pub fn owner_across_connection(&self, port: PortId) -> Option<NodeId> {
        self.across.get(&port).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceKind;

    #[test]
    fn resolves_both_directions() {
        let d = Diagram::demo();
        let registry = PortRegistry::from_diagram(&d);
        let index = ConnectionIndex::build(&d, &registry);

        let process = &d.nodes()[0];
        let raw = &d.nodes()[1];
        assert_eq!(index.owner_across_connection(raw.ports[0].id), Some(process.id));
        let input = process.port_by_field_path("input.material").unwrap();
        assert_eq!(index.owner_across_connection(input.id), Some(raw.id));
        let unused = process.port_by_field_path("mechanism.gas").unwrap();
        assert_eq!(index.owner_across_connection(unused.id), None);
    }

    #[test]
    fn first_connection_wins() {
        let mut d = Diagram::new();
        let a = d.add_process("A").unwrap();
        let b = d.add_process("B").unwrap();
        let r = d.add_resource(ResourceKind::Input, "Shared").unwrap();
        d.autowire(r, "resource.out", b, "input.material").unwrap();
        d.autowire(r, "resource.out", a, "input.material").unwrap();

        let registry = PortRegistry::from_diagram(&d);
        let index = ConnectionIndex::build(&d, &registry);
        let port = d.node(r).unwrap().ports[0].id;
        assert_eq!(index.owner_across_connection(port), Some(b));
    }
}
