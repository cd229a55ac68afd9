//! Centred stacking of items along one axis.
//!
//! The stack's total extent is the sum of the items' extents plus one gap
//! between each pair. It is centred on the anchor and walked in input order.

use serde::Serialize;

use super::{Rect, Size};
use crate::model::{NodeId, Point};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Items in a row, left to right.
    Horizontal,
    /// Items in a column, top to bottom.
    Vertical,
}

/// Alignment across the stacking axis.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum CrossEdge {
    /// Every item's leading edge (left or top) sits at this coordinate.
    Start(f32),
    /// Every item's trailing edge (right or bottom) sits at this coordinate.
    End(f32),
}

pub fn stack_extent(items: &[(NodeId, Size)], axis: Axis, gap: f32) -> f32 {
    let sum: f32 = items.iter().map(|(_, s)| s.along(axis)).sum();
    sum + gap * items.len().saturating_sub(1) as f32
}

/// Widest item across the stacking axis.
pub fn cross_extent(items: &[(NodeId, Size)], axis: Axis) -> f32 {
    items.iter().map(|(_, s)| s.across(axis)).fold(0.0, f32::max)
}

pub fn place_stack(
    items: &[(NodeId, Size)],
    axis: Axis,
    gap: f32,
    anchor: f32,
    cross: CrossEdge,
) -> Vec<(NodeId, Rect)> {
    let mut offset = anchor - stack_extent(items, axis, gap) / 2.0;
    items
        .iter()
        .map(|&(id, size)| {
            let across = match cross {
                CrossEdge::Start(edge) => edge,
                CrossEdge::End(edge) => edge - size.across(axis),
            };
            let origin = match axis {
                Axis::Horizontal => Point::new(offset, across),
                Axis::Vertical => Point::new(across, offset),
            };
            offset += size.along(axis) + gap;
            (id, Rect::at(origin, size))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> Vec<(NodeId, Size)> {
        vec![
            (NodeId(1), Size::new(200.0, 120.0)),
            (NodeId(2), Size::new(150.0, 80.0)),
            (NodeId(3), Size::new(200.0, 100.0)),
        ]
    }

    #[test]
    fn column_is_centred_on_anchor() {
        let placed = place_stack(&items(), Axis::Vertical, 30.0, 500.0, CrossEdge::End(400.0));
        let extent = stack_extent(&items(), Axis::Vertical, 30.0);
        assert_eq!(extent, 360.0);
        assert_eq!(placed[0].1.y, 500.0 - 180.0);
        assert_eq!(placed[2].1.bottom(), 500.0 + 180.0);
        for (_, r) in &placed {
            assert_eq!(r.right(), 400.0);
        }
    }

    #[test]
    fn consecutive_items_keep_the_gap() {
        let placed = place_stack(&items(), Axis::Horizontal, 20.0, 0.0, CrossEdge::Start(10.0));
        for pair in placed.windows(2) {
            assert_eq!(pair[1].1.x - pair[0].1.right(), 20.0);
            assert!(!pair[0].1.overlaps(&pair[1].1));
        }
        assert!(placed.iter().all(|(_, r)| r.y == 10.0));
    }

    #[test]
    fn empty_stack() {
        assert_eq!(stack_extent(&[], Axis::Vertical, 30.0), 0.0);
        assert!(place_stack(&[], Axis::Vertical, 30.0, 0.0, CrossEdge::Start(0.0)).is_empty());
        assert_eq!(cross_extent(&[], Axis::Vertical), 0.0);
    }
}
