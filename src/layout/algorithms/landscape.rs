//! Landscape layout (width >= height).
//!
//! Inputs stack in a column left of their process, outputs in a column to its
//! right. Secondary processes form a column of bands right of the primary
//! cluster, each band carrying its own input and output columns. Mechanisms
//! share one row below everything, centred under the processes.

use super::{Band, LayoutStrategy, Placement};
use crate::layout::stack::{Axis, CrossEdge, cross_extent, stack_extent};
use crate::layout::{Grouping, Rect, StackRole};
use crate::model::NodeId;

pub struct LandscapeLayout;

impl LandscapeLayout {
    /// Input and output columns around an already placed process.
    fn cluster(&self, grouping: &Grouping, process: NodeId, rect: Rect, placement: &mut Placement<'_>) -> Rect {
        let cfg = placement.cfg;
        let mut bounds = rect;
        let inputs = placement.stack(
            StackRole::Inputs,
            Some(process),
            grouping.inputs_of(process),
            Axis::Vertical,
            cfg.landscape_stack_gap,
            rect.center_y(),
            CrossEdge::End(rect.x - cfg.column_offset),
        );
        let outputs = placement.stack(
            StackRole::Outputs,
            Some(process),
            grouping.outputs_of(process),
            Axis::Vertical,
            cfg.landscape_stack_gap,
            rect.center_y(),
            CrossEdge::Start(rect.right() + cfg.column_offset),
        );
        for r in inputs.into_iter().chain(outputs) {
            bounds = bounds.union(&r);
        }
        bounds
    }
}

impl LayoutStrategy for LandscapeLayout {
    fn place(&self, grouping: &Grouping, placement: &mut Placement<'_>) {
        let cfg = placement.cfg;
        let primary = placement.centre_in_viewport(grouping.primary);
        let cluster = self.cluster(grouping, grouping.primary, primary, placement);

        if !grouping.secondaries.is_empty() {
            // Leave room for the widest secondary input column.
            let lead = grouping
                .secondaries
                .iter()
                .map(|&s| {
                    let inputs = placement.items(grouping.inputs_of(s));
                    if inputs.is_empty() {
                        0.0
                    } else {
                        cross_extent(&inputs, Axis::Vertical) + cfg.column_offset
                    }
                })
                .fold(0.0, f32::max);
            let x = cluster.right() + cfg.secondary_clearance + lead;

            let bands: Vec<Band> = grouping
                .secondaries
                .iter()
                .map(|&s| {
                    let size = placement.size_of(s);
                    let gap = cfg.landscape_stack_gap;
                    let ins = stack_extent(&placement.items(grouping.inputs_of(s)), Axis::Vertical, gap);
                    let outs = stack_extent(&placement.items(grouping.outputs_of(s)), Axis::Vertical, gap);
                    Band { process: s, size, extent: size.h.max(ins).max(outs) }
                })
                .collect();
            let total: f32 = bands.iter().map(|b| b.extent).sum::<f32>()
                + cfg.band_gap * (bands.len() - 1) as f32;

            let mut y = primary.center_y() - total / 2.0;
            for band in bands {
                let centre = y + band.extent / 2.0;
                let rect = Rect { x, y: centre - band.size.h / 2.0, w: band.size.w, h: band.size.h };
                placement.place(band.process, rect);
                self.cluster(grouping, band.process, rect, placement);
                y += band.extent + cfg.band_gap;
            }
        }

        if !grouping.mechanisms.is_empty() {
            let processes = std::iter::once(grouping.primary).chain(grouping.secondaries.iter().copied());
            let anchor = placement.bounds_of(processes).unwrap_or(primary).center_x();
            let top = placement.bounds().unwrap_or(cluster).bottom() + cfg.mechanism_offset;
            placement.stack(
                StackRole::Mechanisms,
                None,
                &grouping.mechanisms,
                Axis::Horizontal,
                cfg.mechanism_row_gap,
                anchor,
                CrossEdge::Start(top),
            );
        }
    }
}
