//! Rendered footprints for layout.
//!
//! The rendering layer reports footprints in screen pixels at the current zoom.
//! Layout works in diagram units, so measurements are divided by the scale.

use std::collections::HashMap;

use tracing::trace;

use super::{LayoutConfig, Size};
use crate::model::{Node, NodeId, ViewTransform};

/// Source of rendered node footprints, in screen pixels.
pub trait SizingOracle {
    /// `None` while the node is not in the render tree yet.
    fn measure(&self, node: NodeId) -> Option<Size>;
}

impl<F> SizingOracle for F
where
    F: Fn(NodeId) -> Option<Size>,
{
    fn measure(&self, node: NodeId) -> Option<Size> {
        self(node)
    }
}

/// Oracle for hosts that never render; every node uses its fallback size.
#[derive(Debug, Copy, Clone, Default)]
pub struct NoMeasurements;

impl SizingOracle for NoMeasurements {
    fn measure(&self, _node: NodeId) -> Option<Size> {
        None
    }
}

/// Footprints pushed by the host after each render.
#[derive(Debug, Clone, Default)]
pub struct MeasuredSizes {
    sizes: HashMap<NodeId, Size>,
}

impl MeasuredSizes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, node: NodeId, size: Size) {
        self.sizes.insert(node, size);
    }

    pub fn forget(&mut self, node: NodeId) {
        self.sizes.remove(&node);
    }

    pub fn clear(&mut self) {
        self.sizes.clear();
    }
}

impl SizingOracle for MeasuredSizes {
    fn measure(&self, node: NodeId) -> Option<Size> {
        self.sizes.get(&node).copied()
    }
}

pub struct Sizing<'a> {
    oracle: &'a dyn SizingOracle,
    scale: f32,
    cfg: &'a LayoutConfig,
}

impl<'a> Sizing<'a> {
    pub fn new(oracle: &'a dyn SizingOracle, view: ViewTransform, cfg: &'a LayoutConfig) -> Self {
        Self { oracle, scale: view.effective_scale(), cfg }
    }

    /// Unscaled footprint of `node`, falling back to the configured default.
    pub fn size_of(&self, node: &Node) -> Size {
        match self.oracle.measure(node.id) {
            Some(s) if s.w > 0.0 && s.h > 0.0 => Size::new(s.w / self.scale, s.h / self.scale),
            _ => {
                trace!(error = %crate::Error::MeasurementUnavailable(node.id), "using fallback size");
                self.fallback(node)
            }
        }
    }

    pub fn fallback(&self, node: &Node) -> Size {
        if node.is_process() {
            self.cfg.process_fallback
        } else {
            self.cfg.resource_fallback
        }
    }
}
