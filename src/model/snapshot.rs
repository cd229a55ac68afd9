//! Serializable diagram snapshot exchanged with the persistence layer.
//!
//! Older snapshots may lack `resourceKind`, `fields` or the saved port list;
//! [`DiagramSnapshot::restore`] fills those in before rebuilding nodes.
//! Duplicate ids and connections the editor could never have made are dropped
//! with a warning.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::diagram::{Connection, Diagram, Node, NodeKind, ViewTransform};
use super::port::Port;
use super::types::{NodeId, Point, PortDirection, PortId, ResourceKind, Side};
use crate::error::{Error, Result};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramSnapshot {
    pub version: u32,
    #[serde(default)]
    pub graph_state: GraphState,
    pub nodes: Vec<NodeSnapshot>,
    #[serde(default)]
    pub view: ViewSnapshot,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphState {
    #[serde(default)]
    pub ports: Vec<PortSnapshot>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortSnapshot {
    pub id: PortId,
    pub node: NodeId,
    pub direction: PortDirection,
    pub side: Side,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_path: Option<String>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Process,
    Resource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub title: String,
    pub position: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_kind: Option<ResourceKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewSnapshot {
    pub scaling: f32,
    pub panning: Point,
}

impl Default for ViewSnapshot {
    fn default() -> Self {
        Self { scaling: 1.0, panning: Point::ORIGIN }
    }
}

impl DiagramSnapshot {
    pub fn capture(diagram: &Diagram) -> Self {
        let mut ports = Vec::new();
        let nodes = diagram
            .nodes()
            .iter()
            .map(|node| {
                ports.extend(node.ports.iter().map(|p| PortSnapshot {
                    id: p.id,
                    node: node.id,
                    direction: p.direction,
                    side: p.side,
                    field_path: p.field_path.clone(),
                }));
                let (node_type, resource_kind, fields, details) = match &node.kind {
                    NodeKind::Process { details } => (NodeType::Process, None, None, details.clone()),
                    NodeKind::Resource { kind, fields } => {
                        (NodeType::Resource, Some(*kind), Some(fields.clone()), None)
                    }
                };
                NodeSnapshot {
                    id: node.id,
                    node_type,
                    title: node.title.clone(),
                    position: node.position,
                    resource_kind,
                    fields,
                    details,
                }
            })
            .collect();

        Self {
            version: SNAPSHOT_VERSION,
            graph_state: GraphState { ports, connections: diagram.connections().to_vec() },
            nodes,
            view: ViewSnapshot {
                scaling: diagram.view.scale,
                panning: Point::new(diagram.view.offset_x, diagram.view.offset_y),
            },
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Rebuild a diagram. Saved positions are kept exactly as written.
    pub fn restore(&self) -> Result<Diagram> {
        if self.version > SNAPSHOT_VERSION {
            return Err(Error::UnsupportedVersion(self.version));
        }

        let mut diagram = Diagram::new();
        diagram.reserve_ids(
            next_id(self.nodes.iter().map(|n| n.id.0), "node")?,
            next_id(self.graph_state.ports.iter().map(|p| p.id.0), "port")?,
            next_id(self.graph_state.connections.iter().map(|c| c.id.0), "connection")?,
        );

        let mut seen_ports = HashSet::new();
        let mut saved_ports: HashMap<NodeId, Vec<Port>> = HashMap::new();
        for p in &self.graph_state.ports {
            if !seen_ports.insert(p.id) {
                warn!(port = %p.id, node = %p.node, "dropping duplicate port id");
                continue;
            }
            saved_ports.entry(p.node).or_default().push(Port {
                id: p.id,
                direction: p.direction,
                side: p.side,
                field_path: p.field_path.clone(),
            });
        }

        let mut seen_nodes = HashSet::new();
        for snap in &self.nodes {
            if !seen_nodes.insert(snap.id) {
                warn!(node = %snap.id, title = %snap.title, "dropping duplicate node id");
                continue;
            }
            let saved = saved_ports.remove(&snap.id).filter(|ports| !ports.is_empty());
            let (kind, resource_kind) = match snap.node_type {
                NodeType::Process => (NodeKind::Process { details: snap.details.clone() }, None),
                NodeType::Resource => {
                    let kind = snap
                        .resource_kind
                        .unwrap_or_else(|| infer_resource_kind(saved.as_deref()));
                    let mut fields: BTreeMap<String, String> = kind
                        .default_fields()
                        .iter()
                        .map(|f| (f.to_string(), String::new()))
                        .collect();
                    if let Some(saved_fields) = &snap.fields {
                        fields.extend(saved_fields.iter().map(|(k, v)| (k.clone(), v.clone())));
                    }
                    (NodeKind::Resource { kind, fields }, Some(kind))
                }
            };
            let ports = match saved {
                Some(ports) => ports,
                None => diagram.default_ports_for(resource_kind)?,
            };
            diagram.restore_node(Node {
                id: snap.id,
                title: snap.title.clone(),
                position: snap.position,
                ports,
                kind,
            });
        }

        let endpoints: HashMap<PortId, (NodeId, PortDirection)> = diagram
            .nodes()
            .iter()
            .flat_map(|n| n.ports.iter().map(move |p| (p.id, (n.id, p.direction))))
            .collect();
        let mut ids = HashSet::new();
        let mut pairs = HashSet::new();
        for conn in &self.graph_state.connections {
            let problem = match (endpoints.get(&conn.from), endpoints.get(&conn.to)) {
                (Some(&(from_node, from_dir)), Some(&(to_node, to_dir))) => {
                    if from_node == to_node {
                        Some("both ports belong to the same node")
                    } else if from_dir != PortDirection::Output {
                        Some("source is not an output port")
                    } else if to_dir != PortDirection::Input {
                        Some("target is not an input port")
                    } else if ids.contains(&conn.id) {
                        Some("duplicate connection id")
                    } else if pairs.contains(&(conn.from, conn.to)) {
                        Some("duplicate port pair")
                    } else {
                        None
                    }
                }
                _ => Some("missing endpoint"),
            };
            match problem {
                Some(reason) => warn!(connection = %conn.id, reason, "dropping connection"),
                None => {
                    ids.insert(conn.id);
                    pairs.insert((conn.from, conn.to));
                    diagram.restore_connection(*conn);
                }
            }
        }

        diagram.view = ViewTransform {
            scale: self.view.scaling,
            offset_x: self.view.panning.x,
            offset_y: self.view.panning.y,
        };
        Ok(diagram)
    }
}

/// One past the largest id in use, so fresh allocations never collide.
fn next_id(ids: impl Iterator<Item = u32>, what: &'static str) -> Result<u32> {
    match ids.max() {
        Some(max) => max.checked_add(1).ok_or(Error::IdsExhausted(what)),
        None => Ok(0),
    }
}

/// Resource kind implied by the side of the first saved port.
fn infer_resource_kind(ports: Option<&[Port]>) -> ResourceKind {
    match ports.and_then(|p| p.first()).map(|p| p.side) {
        Some(Side::Left) => ResourceKind::Output,
        Some(Side::Top) => ResourceKind::Machine,
        _ => ResourceKind::Input,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ConnectionId;

    #[test]
    fn capture_restore_keeps_nodes_and_connections() {
        let mut d = Diagram::demo();
        let first = d.nodes()[1].id;
        d.set_position(first, Point::new(-120.5, 33.0));
        d.view = ViewTransform { scale: 1.5, offset_x: 20.0, offset_y: 40.0 };

        let json = DiagramSnapshot::capture(&d).to_json().unwrap();
        let restored = DiagramSnapshot::from_json(&json).unwrap().restore().unwrap();

        assert_eq!(restored.nodes(), d.nodes());
        assert_eq!(restored.connections(), d.connections());
        assert_eq!(restored.view, d.view);
    }

    #[test]
    fn restored_diagram_allocates_fresh_ids() {
        let d = Diagram::demo();
        let mut restored = DiagramSnapshot::capture(&d).restore().unwrap();
        let p = restored.processes().next().unwrap().id;
        let added = restored.add_input(p).unwrap();
        assert!(d.node(added).is_none());
        let ids: HashSet<_> =
            restored.nodes().iter().flat_map(|n| n.ports.iter().map(|p| p.id)).collect();
        let total: usize = restored.nodes().iter().map(|n| n.ports.len()).sum();
        assert_eq!(ids.len(), total);
    }

    #[test]
    fn legacy_snapshot_without_kind_or_ports() {
        let json = r#"{
            "version": 1,
            "nodes": [
                {"id": 0, "type": "process", "title": "Folyamat", "position": {"x": 10, "y": 20}},
                {"id": 1, "type": "resource", "title": "Steel", "position": {"x": 0, "y": 0},
                 "fields": {"name": "steel"}}
            ]
        }"#;
        let d = DiagramSnapshot::from_json(json).unwrap().restore().unwrap();
        assert_eq!(d.nodes()[0].ports.len(), 10);
        assert_eq!(d.nodes()[0].position, Point::new(10.0, 20.0));

        let steel = &d.nodes()[1];
        assert_eq!(steel.resource_kind(), Some(ResourceKind::Input));
        match &steel.kind {
            NodeKind::Resource { fields, .. } => {
                assert_eq!(fields.get("name").map(String::as_str), Some("steel"));
                assert!(fields.contains_key("unit"));
            }
            NodeKind::Process { .. } => panic!("expected a resource"),
        }
    }

    #[test]
    fn kind_inferred_from_saved_ports() {
        let mut snap = DiagramSnapshot::capture(&Diagram::demo());
        for n in &mut snap.nodes {
            n.resource_kind = None;
        }
        let d = snap.restore().unwrap();
        let kinds: Vec<_> = d.resources().map(|n| n.resource_kind()).collect();
        assert_eq!(
            kinds,
            vec![
                Some(ResourceKind::Input),
                Some(ResourceKind::Input),
                Some(ResourceKind::Output),
                Some(ResourceKind::Output),
                Some(ResourceKind::Machine),
            ]
        );
    }

    #[test]
    fn dangling_connections_are_dropped() {
        let mut snap = DiagramSnapshot::capture(&Diagram::demo());
        snap.graph_state.connections[0].from = PortId(999);
        let d = snap.restore().unwrap();
        assert_eq!(d.connections().len(), 4);
        assert!(d.dangling_connections().is_empty());
    }

    #[test]
    fn largest_id_is_rejected_without_panicking() {
        let json = r#"{
            "version": 1,
            "nodes": [
                {"id": 4294967295, "type": "process", "title": "Process", "position": {"x": 0, "y": 0}}
            ]
        }"#;
        let snap = DiagramSnapshot::from_json(json).unwrap();
        assert!(matches!(snap.restore(), Err(Error::IdsExhausted("node"))));

        let mut snap = DiagramSnapshot::capture(&Diagram::demo());
        snap.graph_state.connections[0].id = ConnectionId(u32::MAX);
        assert!(matches!(snap.restore(), Err(Error::IdsExhausted("connection"))));
    }

    #[test]
    fn invalid_connections_are_dropped() {
        let d = Diagram::demo();
        let mut snap = DiagramSnapshot::capture(&d);
        let first = snap.graph_state.connections[0];
        let process = &d.nodes()[0];
        let port = |path| process.port_by_field_path(path).unwrap().id;
        let raw_out = d.nodes()[1].ports[0].id;

        snap.graph_state.connections.extend([
            Connection { id: ConnectionId(100), ..first },
            Connection { id: ConnectionId(101), from: first.to, to: first.from },
            Connection { id: ConnectionId(102), from: port("output.product"), to: port("input.material") },
            Connection { id: first.id, from: raw_out, to: port("input.semiFinished") },
        ]);
        let restored = snap.restore().unwrap();
        assert_eq!(restored.connections(), d.connections());
    }

    #[test]
    fn duplicate_node_and_port_ids_keep_the_first() {
        let d = Diagram::demo();
        let mut snap = DiagramSnapshot::capture(&d);
        let impostor = NodeSnapshot { title: "Impostor".to_string(), ..snap.nodes[1].clone() };
        snap.nodes.push(impostor);
        let stolen = PortSnapshot { node: d.nodes()[2].id, ..snap.graph_state.ports[0].clone() };
        snap.graph_state.ports.push(stolen);

        let restored = snap.restore().unwrap();
        assert_eq!(restored.nodes(), d.nodes());
        assert!(restored.nodes().iter().all(|n| n.title != "Impostor"));
    }

    #[test]
    fn newer_version_is_rejected() {
        let mut snap = DiagramSnapshot::capture(&Diagram::demo());
        snap.version = SNAPSHOT_VERSION + 1;
        assert!(matches!(snap.restore(), Err(Error::UnsupportedVersion(_))));
    }
}
