//! The diagram aggregate: nodes, their ports, connections, and the view transform.
//!
//! Nodes and connections are kept in creation order. Ids are allocated from
//! monotonic counters so creation order and id order agree; a counter that
//! would wrap fails with [`Error::IdsExhausted`] instead.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use super::port::{PROCESS_PORTS, Port, PortTemplate, resource_ports, runtime_process_port};
use super::types::{ConnectionId, NodeId, Point, PortDirection, PortId, ResourceKind, Side};
use crate::error::{Error, Result};

/// Titles that mark the primary process. The first process wins when none matches.
pub const PRIMARY_PROCESS_TITLES: &[&str] = &["Process", "Folyamat"];

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Process {
        details: Option<serde_json::Value>,
    },
    Resource {
        kind: ResourceKind,
        fields: BTreeMap<String, String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub title: String,
    pub position: Point,
    pub ports: Vec<Port>,
    pub kind: NodeKind,
}

impl Node {
    pub fn is_process(&self) -> bool {
        matches!(self.kind, NodeKind::Process { .. })
    }

    pub fn resource_kind(&self) -> Option<ResourceKind> {
        match self.kind {
            NodeKind::Resource { kind, .. } => Some(kind),
            NodeKind::Process { .. } => None,
        }
    }

    pub fn port(&self, id: PortId) -> Option<&Port> {
        self.ports.iter().find(|p| p.id == id)
    }

    pub fn port_by_field_path(&self, path: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.field_path.as_deref() == Some(path))
    }

    /// Ports on `side` in creation order.
    pub fn ports_of_side(&self, side: Side) -> impl Iterator<Item = &Port> {
        self.ports.iter().filter(move |p| p.side == side)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub from: PortId,
    pub to: PortId,
}

/// Pan and zoom of the canvas. Only used to convert between diagram
/// coordinates and screen pixels.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self { scale: 1.0, offset_x: 0.0, offset_y: 0.0 }
    }
}

impl ViewTransform {
    pub fn to_screen(&self, p: Point) -> Point {
        Point::new(p.x * self.scale + self.offset_x, p.y * self.scale + self.offset_y)
    }

    pub fn to_diagram(&self, p: Point) -> Point {
        let scale = self.effective_scale();
        Point::new((p.x - self.offset_x) / scale, (p.y - self.offset_y) / scale)
    }

    /// Zoom factor guarded against zero or negative values from the host.
    pub fn effective_scale(&self) -> f32 {
        if self.scale > f32::EPSILON { self.scale } else { 1.0 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Diagram {
    nodes: Vec<Node>,
    connections: Vec<Connection>,
    pub view: ViewTransform,
    next_node: u32,
    next_port: u32,
    next_connection: u32,
}

impl Diagram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }

    pub fn processes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.is_process())
    }

    pub fn resources(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| !n.is_process())
    }

    /// The node owning `port`, if any.
    pub fn port_owner(&self, port: PortId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.port(port).is_some())
    }

    pub fn set_position(&mut self, id: NodeId, position: Point) -> bool {
        match self.node_mut(id) {
            Some(node) => {
                node.position = position;
                true
            }
            None => false,
        }
    }

    fn alloc_node(&mut self) -> Result<NodeId> {
        let id = NodeId(self.next_node);
        self.next_node = self.next_node.checked_add(1).ok_or(Error::IdsExhausted("node"))?;
        Ok(id)
    }

    fn alloc_port(&mut self) -> Result<PortId> {
        let id = PortId(self.next_port);
        self.next_port = self.next_port.checked_add(1).ok_or(Error::IdsExhausted("port"))?;
        Ok(id)
    }

    fn ports_from_templates(&mut self, templates: &[PortTemplate]) -> Result<Vec<Port>> {
        templates
            .iter()
            .map(|t| -> Result<Port> {
                Ok(Port {
                    id: self.alloc_port()?,
                    direction: t.direction,
                    side: t.side,
                    field_path: Some(t.field_path.to_string()),
                })
            })
            .collect()
    }

    pub fn add_process(&mut self, title: impl Into<String>) -> Result<NodeId> {
        let id = self.alloc_node()?;
        let ports = self.ports_from_templates(PROCESS_PORTS)?;
        self.nodes.push(Node {
            id,
            title: title.into(),
            position: Point::ORIGIN,
            ports,
            kind: NodeKind::Process { details: None },
        });
        Ok(id)
    }

    pub fn add_resource(&mut self, kind: ResourceKind, title: impl Into<String>) -> Result<NodeId> {
        let id = self.alloc_node()?;
        let ports = self.ports_from_templates(resource_ports(kind))?;
        let fields = kind
            .default_fields()
            .iter()
            .map(|f| (f.to_string(), String::new()))
            .collect();
        self.nodes.push(Node {
            id,
            title: title.into(),
            position: Point::ORIGIN,
            ports,
            kind: NodeKind::Resource { kind, fields },
        });
        Ok(id)
    }

    /// Moves the id counters past ids that are about to be restored.
    pub(crate) fn reserve_ids(&mut self, node: u32, port: u32, connection: u32) {
        self.next_node = self.next_node.max(node);
        self.next_port = self.next_port.max(port);
        self.next_connection = self.next_connection.max(connection);
    }

    /// Re-inserts a fully formed node. Its ids must already be reserved.
    pub(crate) fn restore_node(&mut self, node: Node) {
        debug_assert!(node.id.0 < self.next_node, "node {} was not reserved", node.id);
        self.nodes.push(node);
    }

    /// Re-inserts a validated connection. Its id must already be reserved.
    pub(crate) fn restore_connection(&mut self, conn: Connection) {
        debug_assert!(conn.id.0 < self.next_connection, "connection {} was not reserved", conn.id);
        self.connections.push(conn);
    }

    /// Build a fresh port set for a restored node; ids come from this diagram.
    pub(crate) fn default_ports_for(&mut self, kind: Option<ResourceKind>) -> Result<Vec<Port>> {
        match kind {
            None => self.ports_from_templates(PROCESS_PORTS),
            Some(kind) => self.ports_from_templates(resource_ports(kind)),
        }
    }

    /// Deletes a node together with its ports and every connection touching them.
    pub fn remove_node(&mut self, id: NodeId) -> Result<()> {
        let idx = self
            .nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or(Error::UnknownNode(id))?;
        let node = self.nodes.remove(idx);
        let before = self.connections.len();
        self.connections
            .retain(|c| node.port(c.from).is_none() && node.port(c.to).is_none());
        trace!(node = %id, dropped = before - self.connections.len(), "removed node");
        Ok(())
    }

    /// Connects an output port to an input port. Connecting an existing pair
    /// again returns the existing connection.
    pub fn connect(&mut self, from: PortId, to: PortId) -> Result<ConnectionId> {
        if let Some(existing) = self.connections.iter().find(|c| c.from == from && c.to == to) {
            trace!(%from, %to, "connection already present");
            return Ok(existing.id);
        }

        let from_owner = self.port_owner(from).ok_or(Error::UnknownPort(from))?;
        let to_owner = self.port_owner(to).ok_or(Error::UnknownPort(to))?;
        let invalid = |reason| Error::InvalidConnection { from, to, reason };
        if from_owner.id == to_owner.id {
            return Err(invalid("both ports belong to the same node"));
        }
        if from_owner.port(from).map(|p| p.direction) != Some(PortDirection::Output) {
            return Err(invalid("source is not an output port"));
        }
        if to_owner.port(to).map(|p| p.direction) != Some(PortDirection::Input) {
            return Err(invalid("target is not an input port"));
        }

        let id = ConnectionId(self.next_connection);
        self.next_connection = self
            .next_connection
            .checked_add(1)
            .ok_or(Error::IdsExhausted("connection"))?;
        self.connections.push(Connection { id, from, to });
        Ok(id)
    }

    pub fn disconnect(&mut self, id: ConnectionId) -> bool {
        let before = self.connections.len();
        self.connections.retain(|c| c.id != id);
        self.connections.len() != before
    }

    /// Connect two well-known ports by field path.
    pub fn autowire(
        &mut self,
        from_node: NodeId,
        from_path: &str,
        to_node: NodeId,
        to_path: &str,
    ) -> Result<ConnectionId> {
        let from = self.field_port(from_node, from_path)?;
        let to = self.field_port(to_node, to_path)?;
        self.connect(from, to)
    }

    fn field_port(&self, node: NodeId, path: &str) -> Result<PortId> {
        self.node(node)
            .ok_or(Error::UnknownNode(node))?
            .port_by_field_path(path)
            .map(|p| p.id)
            .ok_or_else(|| Error::PortNotFound { node, field_path: path.to_string() })
    }

    pub fn add_input(&mut self, process: NodeId) -> Result<NodeId> {
        self.attach_resource(process, ResourceKind::Input)
    }

    pub fn add_output(&mut self, process: NodeId) -> Result<NodeId> {
        self.attach_resource(process, ResourceKind::Output)
    }

    pub fn add_mechanism(&mut self, process: NodeId, kind: ResourceKind) -> Result<NodeId> {
        if !ResourceKind::MECHANISMS.contains(&kind) {
            return Err(Error::UnexpectedKind { node: process, kind });
        }
        self.attach_resource(process, kind)
    }

    /// Appends a process port for `kind`, a new resource, and the connection between them.
    fn attach_resource(&mut self, process: NodeId, kind: ResourceKind) -> Result<NodeId> {
        let anchor = match self.node(process) {
            Some(node) if node.is_process() => node.position,
            Some(_) => return Err(Error::NotAProcess(process)),
            None => return Err(Error::UnknownNode(process)),
        };

        let (direction, side) = runtime_process_port(kind);
        let port_id = self.alloc_port()?;
        let ordinal = self.resources().filter(|n| n.resource_kind() == Some(kind)).count() + 1;
        let resource = self.add_resource(kind, format!("{} {}", kind.label(), ordinal))?;
        if let Some(node) = self.node_mut(process) {
            node.ports.push(Port { id: port_id, direction, side, field_path: None });
        }
        self.set_position(resource, anchor);
        let facing = self
            .node(resource)
            .map(|n| n.ports[0].id)
            .ok_or(Error::UnknownNode(resource))?;

        match direction {
            PortDirection::Input => self.connect(facing, port_id)?,
            PortDirection::Output => self.connect(port_id, facing)?,
        };
        Ok(resource)
    }

    /// Creates a process fed by `output_resource` through its chaining port.
    pub fn spawn_downstream_process(&mut self, output_resource: NodeId) -> Result<NodeId> {
        let node = self.node(output_resource).ok_or(Error::UnknownNode(output_resource))?;
        match node.resource_kind() {
            Some(ResourceKind::Output) => {}
            Some(kind) => return Err(Error::UnexpectedKind { node: output_resource, kind }),
            None => return Err(Error::NotAResource(output_resource)),
        }
        let next = self.field_port(output_resource, "resource.next")?;
        let anchor = node.position;

        let title = format!("Process {}", self.processes().count() + 1);
        let process = self.add_process(title)?;
        self.set_position(process, anchor);
        let input = self.field_port(process, "input.material")?;
        self.connect(next, input)?;
        Ok(process)
    }

    /// Connections whose endpoints no longer resolve to a port in the node set.
    pub fn dangling_connections(&self) -> Vec<ConnectionId> {
        self.connections
            .iter()
            .filter(|c| self.port_owner(c.from).is_none() || self.port_owner(c.to).is_none())
            .map(|c| c.id)
            .collect()
    }

    pub(crate) fn drop_connections(&mut self, ids: &[ConnectionId]) {
        self.connections.retain(|c| !ids.contains(&c.id));
    }

    /// A small seeded diagram: one process with two inputs, two outputs and a machine.
    pub fn demo() -> Self {
        let mut d = Diagram::new();
        if let Err(e) = d.seed_demo() {
            warn!(error = %e, "demo diagram is incomplete");
        }
        d
    }

    fn seed_demo(&mut self) -> Result<()> {
        let process = self.add_process("Process")?;
        let raw = self.add_resource(ResourceKind::Input, "Raw material")?;
        let part = self.add_resource(ResourceKind::Input, "Semi-finished part")?;
        let product = self.add_resource(ResourceKind::Output, "Product")?;
        let waste = self.add_resource(ResourceKind::Output, "Waste")?;
        let machine = self.add_resource(ResourceKind::Machine, "Machine")?;

        let wiring = [
            (raw, "resource.out", process, "input.material"),
            (part, "resource.out", process, "input.semiFinished"),
            (process, "output.product", product, "resource.in"),
            (process, "output.waste", waste, "resource.in"),
            (machine, "resource.out", process, "mechanism.machine"),
        ];
        for (from, from_path, to, to_path) in wiring {
            if let Err(e) = self.autowire(from, from_path, to, to_path) {
                warn!(error = %e, "skipping demo connection");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_is_fully_wired() {
        let d = Diagram::demo();
        assert_eq!(d.nodes().len(), 6);
        assert_eq!(d.connections().len(), 5);
        assert!(d.dangling_connections().is_empty());
    }

    #[test]
    fn connect_is_idempotent() {
        let mut d = Diagram::new();
        let p = d.add_process("Process").unwrap();
        let r = d.add_resource(ResourceKind::Input, "In").unwrap();
        let a = d.autowire(r, "resource.out", p, "input.material").unwrap();
        let b = d.autowire(r, "resource.out", p, "input.material").unwrap();
        assert_eq!(a, b);
        assert_eq!(d.connections().len(), 1);
    }

    #[test]
    fn connect_rejects_wrong_direction() {
        let mut d = Diagram::new();
        let p = d.add_process("Process").unwrap();
        let r = d.add_resource(ResourceKind::Input, "In").unwrap();
        let err = d.autowire(p, "input.material", r, "resource.out").unwrap_err();
        assert!(matches!(err, Error::InvalidConnection { .. }));
    }

    #[test]
    fn remove_node_cascades_connections() {
        let mut d = Diagram::demo();
        let process = d.processes().next().unwrap().id;
        d.remove_node(process).unwrap();
        assert!(d.connections().is_empty());
        assert_eq!(d.nodes().len(), 5);
        assert!(matches!(d.remove_node(process), Err(Error::UnknownNode(_))));
    }

    #[test]
    fn add_ports_append_resource_and_connection() {
        let mut d = Diagram::new();
        let p = d.add_process("Process").unwrap();
        let before = d.node(p).unwrap().ports.len();

        let input = d.add_input(p).unwrap();
        let output = d.add_output(p).unwrap();
        let gas = d.add_mechanism(p, ResourceKind::Gas).unwrap();

        assert_eq!(d.node(p).unwrap().ports.len(), before + 3);
        assert_eq!(d.connections().len(), 3);
        assert_eq!(d.node(input).unwrap().title, "Input 1");
        assert_eq!(d.node(output).unwrap().resource_kind(), Some(ResourceKind::Output));
        assert_eq!(d.node(gas).unwrap().resource_kind(), Some(ResourceKind::Gas));
        assert!(d.add_mechanism(p, ResourceKind::Input).is_err());
        assert!(matches!(d.add_input(input), Err(Error::NotAProcess(_))));
    }

    #[test]
    fn spawn_downstream_chains_through_output() {
        let mut d = Diagram::demo();
        let product = d.nodes().iter().find(|n| n.title == "Product").unwrap().id;
        let next = d.spawn_downstream_process(product).unwrap();
        assert_eq!(d.node(next).unwrap().title, "Process 2");
        assert_eq!(d.connections().len(), 6);

        let machine = d.nodes().iter().find(|n| n.title == "Machine").unwrap().id;
        assert!(d.spawn_downstream_process(machine).is_err());
    }

    #[test]
    fn autowire_reports_missing_field_path() {
        let mut d = Diagram::new();
        let p = d.add_process("Process").unwrap();
        let r = d.add_resource(ResourceKind::Input, "In").unwrap();
        let err = d.autowire(r, "resource.out", p, "input.nope").unwrap_err();
        assert!(matches!(err, Error::PortNotFound { .. }));
    }

    #[test]
    fn exhausted_counters_fail_instead_of_wrapping() {
        let mut d = Diagram::new();
        d.reserve_ids(u32::MAX, 0, 0);
        assert!(matches!(d.add_process("Process"), Err(Error::IdsExhausted("node"))));

        let mut d = Diagram::new();
        let p = d.add_process("Process").unwrap();
        let r = d.add_resource(ResourceKind::Input, "In").unwrap();
        d.reserve_ids(0, u32::MAX, u32::MAX);
        assert!(matches!(d.add_input(p), Err(Error::IdsExhausted("port"))));
        assert!(matches!(
            d.autowire(r, "resource.out", p, "input.material"),
            Err(Error::IdsExhausted("connection"))
        ));
        assert!(d.connections().is_empty());
        assert_eq!(d.nodes().len(), 2);
    }

    #[test]
    fn view_transform_round_trips_points() {
        let view = ViewTransform { scale: 2.0, offset_x: 10.0, offset_y: -4.0 };
        let p = Point::new(12.5, 7.0);
        assert_eq!(view.to_diagram(view.to_screen(p)), p);
    }
}
