//! Portrait layout (height > width).
//!
//! The landscape arrangement turned a quarter: inputs in a row above their
//! process, outputs in a row below. Secondary processes sit in one row below
//! the primary's outputs and mechanisms stand in a column right of the widest
//! row.

use super::{Band, LayoutStrategy, Placement};
use crate::layout::stack::{Axis, CrossEdge, cross_extent, stack_extent};
use crate::layout::{Grouping, Rect, StackRole};
use crate::model::NodeId;

pub struct PortraitLayout;

impl PortraitLayout {
    fn cluster(&self, grouping: &Grouping, process: NodeId, rect: Rect, placement: &mut Placement<'_>) -> Rect {
        let cfg = placement.cfg;
        let above = placement.stack(
            StackRole::Inputs,
            Some(process),
            grouping.inputs_of(process),
            Axis::Horizontal,
            cfg.portrait_stack_gap,
            rect.center_x(),
            CrossEdge::End(rect.y - cfg.row_offset),
        );
        let below = placement.stack(
            StackRole::Outputs,
            Some(process),
            grouping.outputs_of(process),
            Axis::Horizontal,
            cfg.portrait_stack_gap,
            rect.center_x(),
            CrossEdge::Start(rect.bottom() + cfg.row_offset),
        );
        above
            .into_iter()
            .chain(below)
            .fold(rect, |bounds, r| bounds.union(&r))
    }
}

impl LayoutStrategy for PortraitLayout {
    fn place(&self, grouping: &Grouping, placement: &mut Placement<'_>) {
        let cfg = placement.cfg;
        let gap = cfg.portrait_stack_gap;
        let primary = placement.centre_in_viewport(grouping.primary);
        let cluster = self.cluster(grouping, grouping.primary, primary, placement);

        if !grouping.secondaries.is_empty() {
            let lead = grouping
                .secondaries
                .iter()
                .map(|&s| {
                    let inputs = placement.items(grouping.inputs_of(s));
                    if inputs.is_empty() {
                        0.0
                    } else {
                        cross_extent(&inputs, Axis::Horizontal) + cfg.row_offset
                    }
                })
                .fold(0.0, f32::max);
            let y = cluster.bottom() + cfg.secondary_clearance + lead;

            let bands: Vec<Band> = grouping
                .secondaries
                .iter()
                .map(|&s| {
                    let size = placement.size_of(s);
                    let ins = stack_extent(&placement.items(grouping.inputs_of(s)), Axis::Horizontal, gap);
                    let outs = stack_extent(&placement.items(grouping.outputs_of(s)), Axis::Horizontal, gap);
                    Band { process: s, size, extent: size.w.max(ins).max(outs) }
                })
                .collect();
            let total: f32 = bands.iter().map(|b| b.extent).sum::<f32>()
                + cfg.band_gap * (bands.len() - 1) as f32;

            let mut x = primary.center_x() - total / 2.0;
            for band in bands {
                let centre = x + band.extent / 2.0;
                let rect = Rect { x: centre - band.size.w / 2.0, y, w: band.size.w, h: band.size.h };
                placement.place(band.process, rect);
                self.cluster(grouping, band.process, rect, placement);
                x += band.extent + cfg.band_gap;
            }
        }

        if !grouping.mechanisms.is_empty() {
            let left = placement.bounds().unwrap_or(cluster).right() + cfg.portrait_mechanism_offset;
            placement.stack(
                StackRole::Mechanisms,
                None,
                &grouping.mechanisms,
                Axis::Vertical,
                gap,
                primary.center_y(),
                CrossEdge::Start(left),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::layout::{ConnectionIndex, LayoutConfig, Size, Viewport};
    use crate::model::{Diagram, PortRegistry, ResourceKind};

    fn run(d: &Diagram, cfg: &LayoutConfig) -> (Grouping, BTreeMap<NodeId, Rect>) {
        let registry = PortRegistry::from_diagram(d);
        let index = ConnectionIndex::build(d, &registry);
        let grouping = Grouping::resolve(d, &registry, &index).unwrap();
        let sizes: BTreeMap<NodeId, Size> = d
            .nodes()
            .iter()
            .map(|n| (n.id, if n.is_process() { cfg.process_fallback } else { cfg.resource_fallback }))
            .collect();
        let mut placement = Placement::new(cfg, Viewport::new(700.0, 1200.0), &sizes);
        PortraitLayout.place(&grouping, &mut placement);
        let rects = d.nodes().iter().filter_map(|n| Some((n.id, placement.rect(n.id)?))).collect();
        (grouping, rects)
    }

    #[test]
    fn rows_above_and_below() {
        let d = Diagram::demo();
        let cfg = LayoutConfig::default();
        let (g, rects) = run(&d, &cfg);
        let p = rects[&g.primary];
        assert_eq!((p.x, p.y), (250.0, 550.0));

        for id in g.inputs_of(g.primary) {
            assert_eq!(rects[id].bottom(), p.y - cfg.row_offset);
        }
        for id in g.outputs_of(g.primary) {
            assert_eq!(rects[id].y, p.bottom() + cfg.row_offset);
        }
        let inputs = g.inputs_of(g.primary);
        assert_eq!(rects[&inputs[1]].x - rects[&inputs[0]].right(), cfg.portrait_stack_gap);
    }

    #[test]
    fn mechanism_column_clears_widest_row() {
        let mut d = Diagram::demo();
        let process = d.nodes()[0].id;
        d.add_mechanism(process, ResourceKind::Energy).unwrap();
        let cfg = LayoutConfig::default();
        let (g, rects) = run(&d, &cfg);

        let widest = g
            .inputs_of(g.primary)
            .iter()
            .chain(g.outputs_of(g.primary))
            .map(|id| rects[id].right())
            .fold(f32::MIN, f32::max);
        let column: Vec<Rect> = g.mechanisms.iter().map(|id| rects[id]).collect();
        assert_eq!(column.len(), 2);
        assert!(column.iter().all(|r| r.x == widest + cfg.portrait_mechanism_offset));
        assert_eq!(column[1].y - column[0].bottom(), cfg.portrait_stack_gap);
    }
}
