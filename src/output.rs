//! Output types for the JS rendering layer.
//!
//! These structs are serialized to JSON and handed across the wasm boundary.
//! [`FrameSurface`] is the [`RenderSurface`] the wasm handle drives: it reads
//! connection paths the host sent in and collects the writes going back out.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{
    ConnectionId, Diagram, NodeId, NodeKind, Orientation, Point, PortDirection, PortId, ResourceKind, Side,
};
use crate::refresh::{ArrowGlyph, RenderSurface};
use crate::watcher::WatchAction;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortOutput {
    pub id: PortId,
    pub direction: PortDirection,
    /// Side under the current orientation.
    pub side: Side,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeOutput {
    pub id: NodeId,
    pub title: String,
    /// "process" or "resource"
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_kind: Option<ResourceKind>,
    pub position: Point,
    pub ports: Vec<PortOutput>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionOutput {
    pub id: ConnectionId,
    pub from: PortId,
    pub to: PortId,
}

/// Everything needed to render the diagram from scratch.
#[derive(Debug, Clone, Serialize)]
pub struct DiagramOutput {
    pub orientation: Orientation,
    pub nodes: Vec<NodeOutput>,
    pub connections: Vec<ConnectionOutput>,
}

impl DiagramOutput {
    pub fn new(diagram: &Diagram, orientation: Orientation) -> Self {
        let nodes = diagram
            .nodes()
            .iter()
            .map(|n| NodeOutput {
                id: n.id,
                title: n.title.clone(),
                kind: match n.kind {
                    NodeKind::Process { .. } => "process",
                    NodeKind::Resource { .. } => "resource",
                },
                resource_kind: n.resource_kind(),
                position: n.position,
                ports: n
                    .ports
                    .iter()
                    .map(|p| PortOutput {
                        id: p.id,
                        direction: p.direction,
                        side: p.side.oriented(orientation),
                        field_path: p.field_path.clone(),
                    })
                    .collect(),
            })
            .collect();
        let connections = diagram
            .connections()
            .iter()
            .map(|c| ConnectionOutput { id: c.id, from: c.from, to: c.to })
            .collect();
        Self { orientation, nodes, connections }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PositionOutput {
    pub id: NodeId,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArrowOutput {
    pub connection: ConnectionId,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    /// Triangle corners, tip first.
    pub points: [[f32; 2]; 3],
}

impl ArrowOutput {
    pub fn new(glyph: &ArrowGlyph, size: f32) -> Self {
        Self {
            connection: glyph.connection,
            x: glyph.at.x,
            y: glyph.at.y,
            angle: glyph.angle_deg,
            points: glyph.points(size).map(|p| [p.x, p.y]),
        }
    }
}

/// Writes produced by one poll or animation frame.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameOutput {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<WatchAction>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub positions: Vec<PositionOutput>,
    /// Present only when the glyph set was replaced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrows: Option<Vec<ArrowOutput>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_sides: Option<BTreeMap<PortId, Side>>,
    pub refresh_pending: bool,
    pub next_deadline: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorOutput {
    pub error: String,
}

/// Render surface backed by paths the host supplied for this call.
#[derive(Debug, Default)]
pub struct FrameSurface {
    paths: BTreeMap<ConnectionId, String>,
    arrow_size: f32,
    pub frame: FrameOutput,
}

impl FrameSurface {
    pub fn new(paths: BTreeMap<ConnectionId, String>, arrow_size: f32) -> Self {
        Self { paths, arrow_size, frame: FrameOutput::default() }
    }
}

impl RenderSurface for FrameSurface {
    fn set_node_position(&mut self, node: NodeId, position: Point) {
        // Last write wins within a frame.
        self.frame.positions.retain(|p| p.id != node);
        self.frame.positions.push(PositionOutput { id: node, x: position.x, y: position.y });
    }

    fn connection_path(&self, connection: ConnectionId) -> Option<String> {
        self.paths.get(&connection).cloned()
    }

    fn replace_arrows(&mut self, arrows: Vec<ArrowGlyph>) {
        let size = self.arrow_size;
        self.frame.arrows = Some(arrows.iter().map(|g| ArrowOutput::new(g, size)).collect());
    }
}
