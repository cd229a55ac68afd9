// Connection path refresh after programmatic position writes.
//
// The rendering layer caches each connection's path and only recomputes it
// when it sees a node move. A refresh therefore runs over three animation
// frames:
// - NudgeOut: every node is written epsilon away from its position
// - NudgeBack: every node is written back to its exact position
// - DrawArrows: paths are read back and one arrowhead per connection replaces
//   the previous glyph set
//
// The diagram itself is never nudged; only the surface sees the offset.

mod arrow;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

pub use arrow::{ArrowGlyph, Cubic, parse_path};

use crate::model::{ConnectionId, Diagram, NodeId, Point};

/// The rendering layer, as seen from the core.
pub trait RenderSurface {
    fn set_node_position(&mut self, node: NodeId, position: Point);

    /// Current SVG path of a rendered connection.
    fn connection_path(&self, connection: ConnectionId) -> Option<String>;

    fn replace_arrows(&mut self, arrows: Vec<ArrowGlyph>);
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Sub-pixel offset used to invalidate cached paths.
    pub epsilon: f32,
    /// Arrowhead edge length in screen pixels.
    pub arrow_size: f32,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self { epsilon: 0.01, arrow_size: 10.0 }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RefreshPhase {
    #[default]
    Idle,
    NudgeOut,
    NudgeBack,
    DrawArrows,
}

#[derive(Debug, Default)]
pub struct ConnectionRefresher {
    phase: RefreshPhase,
}

impl ConnectionRefresher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> RefreshPhase {
        self.phase
    }

    pub fn is_pending(&self) -> bool {
        self.phase != RefreshPhase::Idle
    }

    /// Arm a refresh. A refresh already in flight starts over, since positions
    /// may have moved since its nudge.
    pub fn request(&mut self) {
        if self.phase != RefreshPhase::Idle {
            trace!(phase = ?self.phase, "refresh restarted");
        }
        self.phase = RefreshPhase::NudgeOut;
    }

    /// Advance one phase. Returns whether another frame is needed.
    pub fn on_animation_frame(
        &mut self,
        diagram: &Diagram,
        surface: &mut dyn RenderSurface,
        cfg: &RefreshConfig,
    ) -> bool {
        self.phase = match self.phase {
            RefreshPhase::Idle => return false,
            RefreshPhase::NudgeOut => {
                for node in diagram.nodes() {
                    surface.set_node_position(node.id, node.position.offset(cfg.epsilon, cfg.epsilon));
                }
                RefreshPhase::NudgeBack
            }
            RefreshPhase::NudgeBack => {
                for node in diagram.nodes() {
                    surface.set_node_position(node.id, node.position);
                }
                RefreshPhase::DrawArrows
            }
            RefreshPhase::DrawArrows => {
                let arrows = arrows_for(diagram, surface);
                debug!(
                    arrows = arrows.len(),
                    connections = diagram.connections().len(),
                    "arrows redrawn"
                );
                surface.replace_arrows(arrows);
                RefreshPhase::Idle
            }
        };
        self.is_pending()
    }
}

fn arrows_for(diagram: &Diagram, surface: &dyn RenderSurface) -> Vec<ArrowGlyph> {
    diagram
        .connections()
        .iter()
        .filter_map(|c| {
            let Some(d) = surface.connection_path(c.id) else {
                trace!(connection = %c.id, "no rendered path");
                return None;
            };
            let glyph = ArrowGlyph::for_path(c.id, &d);
            if glyph.is_none() {
                trace!(connection = %c.id, path = %d, "path too short for an arrow");
            }
            glyph
        })
        .collect()
}
