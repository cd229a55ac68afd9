// Orientation-aware placement for process diagrams.
//
// Goals:
// - Deterministic: a pure function of viewport, nodes, connections and sizes
// - Idempotent: re-running on unchanged input yields identical positions
// - Never aborts: every failure degrades to "this node stays where it is"
// - No overlap inside a stack; documented gaps between stack members
//
// Submodules:
// - connection_index: port -> node across a connection
// - grouping: resources bucketed under their owning process
// - sizing: measured footprints with fixed fallbacks
// - stack: centred stacking along one axis
// - spatial_grid: overlap diagnostics
// - algorithms: landscape and portrait strategies
//
// Output:
// - LayoutResult with top-left positions, footprints and oriented port sides.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::model::{Diagram, NodeId, Orientation, Point, PortId, PortRegistry, Side};

pub mod algorithms;
mod connection_index;
mod grouping;
mod sizing;
mod spatial_grid;
mod stack;

pub use connection_index::ConnectionIndex;
pub use grouping::{Grouping, primary_process};
pub use sizing::{MeasuredSizes, NoMeasurements, Sizing, SizingOracle};
pub use spatial_grid::SpatialGrid;
pub use stack::{Axis, CrossEdge, cross_extent, place_stack, stack_extent};

use algorithms::{LayoutStrategy, Placement, strategy_for};

#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub w: f32,
    pub h: f32,
}

impl Size {
    pub fn new(w: f32, h: f32) -> Self {
        Self { w, h }
    }

    pub fn along(&self, axis: Axis) -> f32 {
        match axis {
            Axis::Horizontal => self.w,
            Axis::Vertical => self.h,
        }
    }

    pub fn across(&self, axis: Axis) -> f32 {
        match axis {
            Axis::Horizontal => self.h,
            Axis::Vertical => self.w,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn at(origin: Point, size: Size) -> Self {
        Self { x: origin.x, y: origin.y, w: size.w, h: size.h }
    }

    pub fn right(&self) -> f32 { self.x + self.w }
    pub fn bottom(&self) -> f32 { self.y + self.h }
    pub fn center_x(&self) -> f32 { self.x + self.w / 2.0 }
    pub fn center_y(&self) -> f32 { self.y + self.h / 2.0 }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Strict intersection: rectangles that only share an edge do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = self.right().max(other.right());
        let y1 = self.bottom().max(other.bottom());
        Rect { x: x0, y: y0, w: x1 - x0, h: y1 - y0 }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn orientation(&self) -> Orientation {
        Orientation::from_viewport(self.width, self.height)
    }
}

/// Whether a pass may run. Disabled while a persisted diagram is bulk-loaded.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    #[default]
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Size for resources that are not rendered yet.
    pub resource_fallback: Size,
    /// Size for processes that are not rendered yet.
    pub process_fallback: Size,
    /// Gap between items of a landscape input/output column.
    pub landscape_stack_gap: f32,
    /// Gap between items of portrait rows and columns.
    pub portrait_stack_gap: f32,
    /// Gap between items of the landscape mechanism row.
    pub mechanism_row_gap: f32,
    /// Distance from the rightmost row extent to the portrait mechanism column.
    pub portrait_mechanism_offset: f32,
    /// Distance between a process and its input/output columns (landscape).
    pub column_offset: f32,
    /// Distance between a process and its input/output rows (portrait).
    pub row_offset: f32,
    /// Distance from the lowest placed extent to the landscape mechanism row.
    pub mechanism_offset: f32,
    /// Clearance between the primary cluster and the secondary processes.
    pub secondary_clearance: f32,
    /// Gap between consecutive secondary process bands.
    pub band_gap: f32,
    /// Pushes the primary process down, away from the toolbar.
    pub toolbar_offset: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            resource_fallback: Size { w: 200.0, h: 120.0 },
            process_fallback: Size { w: 200.0, h: 180.0 },
            landscape_stack_gap: 30.0,
            portrait_stack_gap: 20.0,
            mechanism_row_gap: 40.0,
            portrait_mechanism_offset: 90.0,
            column_offset: 80.0,
            row_offset: 60.0,
            mechanism_offset: 80.0,
            secondary_clearance: 120.0,
            band_gap: 60.0,
            toolbar_offset: 40.0,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StackRole {
    Inputs,
    Outputs,
    Mechanisms,
}

/// One placed stack, kept for diagnostics and tests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedStack {
    pub role: StackRole,
    /// Owning process; `None` for the shared mechanism stack.
    pub owner: Option<NodeId>,
    pub axis: Axis,
    pub gap: f32,
    pub members: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutResult {
    pub orientation: Orientation,
    /// Top-left positions of every node that was placed this pass.
    pub positions: BTreeMap<NodeId, Point>,
    /// Footprints used for placement, in diagram units.
    pub footprints: BTreeMap<NodeId, Size>,
    /// Side each port is drawn on under `orientation`.
    pub port_sides: BTreeMap<PortId, Side>,
    pub stacks: Vec<PlacedStack>,
}

impl LayoutResult {
    pub fn rect_of(&self, id: NodeId) -> Option<Rect> {
        let pos = *self.positions.get(&id)?;
        let size = *self.footprints.get(&id)?;
        Some(Rect::at(pos, size))
    }

    /// Pairs of placed nodes whose footprints intersect.
    pub fn overlaps(&self) -> Vec<(NodeId, NodeId)> {
        let cell = self
            .footprints
            .values()
            .fold(1.0f32, |acc, s| acc.max(s.w).max(s.h));
        let mut grid = SpatialGrid::new(cell);
        let mut pairs = Vec::new();
        for &id in self.positions.keys() {
            let Some(rect) = self.rect_of(id) else { continue };
            for other in grid.overlapping(&rect) {
                pairs.push((other, id));
            }
            grid.insert(id, rect);
        }
        pairs
    }
}

/// Run one placement pass. Returns `None` when `mode` is disabled.
///
/// All measurements and connection lookups happen before any position is
/// produced; the caller decides how positions are written back.
pub fn layout_pass(
    diagram: &Diagram,
    viewport: Viewport,
    oracle: &dyn SizingOracle,
    cfg: &LayoutConfig,
    mode: LayoutMode,
) -> Option<LayoutResult> {
    if mode == LayoutMode::Disabled {
        trace!("layout pass skipped: layout disabled");
        return None;
    }

    let orientation = viewport.orientation();
    let registry = PortRegistry::from_diagram(diagram);
    let index = ConnectionIndex::build(diagram, &registry);
    let sizing = Sizing::new(oracle, diagram.view, cfg);

    let footprints: BTreeMap<NodeId, Size> = diagram
        .nodes()
        .iter()
        .map(|n| (n.id, sizing.size_of(n)))
        .collect();

    let port_sides = diagram
        .nodes()
        .iter()
        .flat_map(|n| n.ports.iter())
        .map(|p| (p.id, p.side.oriented(orientation)))
        .collect();

    let mut placement = Placement::new(cfg, viewport, &footprints).with_view(diagram.view);
    match Grouping::resolve(diagram, &registry, &index) {
        Some(grouping) => strategy_for(orientation).place(&grouping, &mut placement),
        None => debug!(error = %crate::Error::MissingAnchor, "no nodes placed"),
    }
    let (positions, stacks) = placement.finish();

    let result = LayoutResult { orientation, positions, footprints, port_sides, stacks };
    debug!(
        ?orientation,
        nodes = diagram.nodes().len(),
        placed = result.positions.len(),
        connections = diagram.connections().len(),
        "layout pass"
    );
    let overlaps = result.overlaps();
    if !overlaps.is_empty() {
        warn!(?overlaps, "layout produced overlapping footprints");
    }
    Some(result)
}
