//! Placement strategies for process diagrams.
//!
//! One strategy per orientation, selected once per pass from the viewport:
//! - `landscape`: inputs left, outputs right, mechanisms in a row below
//! - `portrait`: inputs above, outputs below, mechanisms in a column to the right
//!
//! Both share [`Placement`], which owns the positions written during a pass.

mod landscape;
mod portrait;

use std::collections::BTreeMap;

pub use landscape::LandscapeLayout;
pub use portrait::PortraitLayout;

use super::stack::{Axis, CrossEdge, place_stack};
use super::{Grouping, LayoutConfig, PlacedStack, Rect, Size, StackRole, Viewport};
use crate::model::{NodeId, Orientation, Point, ViewTransform};

pub trait LayoutStrategy {
    fn place(&self, grouping: &Grouping, placement: &mut Placement<'_>);
}

pub fn strategy_for(orientation: Orientation) -> &'static dyn LayoutStrategy {
    match orientation {
        Orientation::Landscape => &LandscapeLayout,
        Orientation::Portrait => &PortraitLayout,
    }
}

/// Working state of one pass: measured footprints in, placed rectangles out.
pub struct Placement<'a> {
    pub cfg: &'a LayoutConfig,
    pub viewport: Viewport,
    /// Pan and zoom mapping viewport pixels into diagram space.
    pub view: ViewTransform,
    footprints: &'a BTreeMap<NodeId, Size>,
    placed: BTreeMap<NodeId, Rect>,
    stacks: Vec<PlacedStack>,
}

impl<'a> Placement<'a> {
    pub fn new(cfg: &'a LayoutConfig, viewport: Viewport, footprints: &'a BTreeMap<NodeId, Size>) -> Self {
        Self {
            cfg,
            viewport,
            view: ViewTransform::default(),
            footprints,
            placed: BTreeMap::new(),
            stacks: Vec::new(),
        }
    }

    pub fn with_view(mut self, view: ViewTransform) -> Self {
        self.view = view;
        self
    }

    pub fn size_of(&self, id: NodeId) -> Size {
        self.footprints.get(&id).copied().unwrap_or(self.cfg.resource_fallback)
    }

    pub fn items(&self, ids: &[NodeId]) -> Vec<(NodeId, Size)> {
        ids.iter().map(|&id| (id, self.size_of(id))).collect()
    }

    pub fn place(&mut self, id: NodeId, rect: Rect) {
        self.placed.insert(id, rect);
    }

    pub fn rect(&self, id: NodeId) -> Option<Rect> {
        self.placed.get(&id).copied()
    }

    /// Union of everything placed so far.
    pub fn bounds(&self) -> Option<Rect> {
        self.placed.values().copied().reduce(|a, b| a.union(&b))
    }

    /// Union of the placed rectangles among `ids`.
    pub fn bounds_of(&self, ids: impl IntoIterator<Item = NodeId>) -> Option<Rect> {
        ids.into_iter()
            .filter_map(|id| self.rect(id))
            .reduce(|a, b| a.union(&b))
    }

    /// Centre `id` on the visible canvas, pushed down past the toolbar.
    /// The toolbar offset is in screen pixels, so it shrinks as the view zooms in.
    pub fn centre_in_viewport(&mut self, id: NodeId) -> Rect {
        let size = self.size_of(id);
        let centre = self.view.to_diagram(Point::new(
            self.viewport.width / 2.0,
            self.viewport.height / 2.0 + self.cfg.toolbar_offset,
        ));
        let rect = Rect::at(centre.offset(-size.w / 2.0, -size.h / 2.0), size);
        self.place(id, rect);
        rect
    }

    /// Place `ids` as one stack and return its bounds. Empty stacks place nothing.
    #[allow(clippy::too_many_arguments)]
    pub fn stack(
        &mut self,
        role: StackRole,
        owner: Option<NodeId>,
        ids: &[NodeId],
        axis: Axis,
        gap: f32,
        anchor: f32,
        cross: CrossEdge,
    ) -> Option<Rect> {
        if ids.is_empty() {
            return None;
        }
        let items = self.items(ids);
        let mut bounds: Option<Rect> = None;
        for (id, rect) in place_stack(&items, axis, gap, anchor, cross) {
            self.place(id, rect);
            bounds = Some(match bounds {
                Some(b) => b.union(&rect),
                None => rect,
            });
        }
        self.stacks.push(PlacedStack {
            role,
            owner,
            axis,
            gap,
            members: ids.to_vec(),
        });
        bounds
    }

    pub fn finish(self) -> (BTreeMap<NodeId, Point>, Vec<PlacedStack>) {
        let positions = self.placed.into_iter().map(|(id, r)| (id, r.origin())).collect();
        (positions, self.stacks)
    }
}

/// A secondary process and how much room its band takes along the band stack.
pub(crate) struct Band {
    pub process: NodeId,
    pub size: Size,
    pub extent: f32,
}
