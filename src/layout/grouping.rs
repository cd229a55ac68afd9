// Grouping of resources under their owning process.
//
// Inputs and outputs are bucketed per process through the connection on the
// resource's process-facing side. Unconnected resources, or those whose far
// end is not a process, fall back to the primary process. Mechanisms are never
// bucketed: they share one stack.
//
// Every bucket keeps node creation order.

use std::collections::BTreeMap;

use super::connection_index::ConnectionIndex;
use crate::model::{
    Diagram, Node, NodeId, PRIMARY_PROCESS_TITLES, PortRegistry, ResourceRole,
    process_facing_side,
};

/// The process titled "Process"/"Folyamat", else the first process.
pub fn primary_process(processes: &[&Node]) -> Option<NodeId> {
    processes
        .iter()
        .find(|n| PRIMARY_PROCESS_TITLES.iter().any(|t| *t == n.title.trim()))
        .or_else(|| processes.first())
        .map(|n| n.id)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grouping {
    pub primary: NodeId,
    /// Every other process, in creation order.
    pub secondaries: Vec<NodeId>,
    pub inputs: BTreeMap<NodeId, Vec<NodeId>>,
    pub outputs: BTreeMap<NodeId, Vec<NodeId>>,
    pub mechanisms: Vec<NodeId>,
}

impl Grouping {
    /// `None` when the diagram has no process to anchor on.
    pub fn resolve(
        diagram: &Diagram,
        registry: &PortRegistry<'_>,
        index: &ConnectionIndex,
    ) -> Option<Self> {
        let processes: Vec<&Node> = diagram.processes().collect();
        let primary = primary_process(&processes)?;
        let secondaries = processes
            .iter()
            .map(|n| n.id)
            .filter(|id| *id != primary)
            .collect();

        let mut grouping = Grouping {
            primary,
            secondaries,
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
            mechanisms: Vec::new(),
        };

        for node in diagram.resources() {
            let Some(kind) = node.resource_kind() else { continue };
            match kind.role() {
                ResourceRole::Mechanism => grouping.mechanisms.push(node.id),
                ResourceRole::Input => {
                    let owner = owner_of(node, primary, registry, index);
                    grouping.inputs.entry(owner).or_default().push(node.id);
                }
                ResourceRole::Output => {
                    let owner = owner_of(node, primary, registry, index);
                    grouping.outputs.entry(owner).or_default().push(node.id);
                }
            }
        }
        Some(grouping)
    }

    pub fn inputs_of(&self, process: NodeId) -> &[NodeId] {
        self.inputs.get(&process).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn outputs_of(&self, process: NodeId) -> &[NodeId] {
        self.outputs.get(&process).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

fn owner_of(
    resource: &Node,
    primary: NodeId,
    registry: &PortRegistry<'_>,
    index: &ConnectionIndex,
) -> NodeId {
    let Some(kind) = resource.resource_kind() else { return primary };
    registry
        .ports_of_side(resource.id, process_facing_side(kind))
        .into_iter()
        .find_map(|p| index.owner_across_connection(p.id))
        .filter(|owner| registry.node(*owner).is_some_and(Node::is_process))
        .unwrap_or(primary)
}
