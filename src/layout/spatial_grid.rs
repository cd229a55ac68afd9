// Spatial hash grid over placed footprints.
//
// Buckets rectangles by cell so an overlap query only looks at nearby
// footprints instead of every placed node.

use std::collections::{HashMap, HashSet};

use super::Rect;
use crate::model::NodeId;

#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f32,
    cells: HashMap<(i32, i32), Vec<(NodeId, Rect)>>,
}

impl SpatialGrid {
    /// Cell size should be roughly the size of the largest footprint.
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: cell_size.max(1.0),
            cells: HashMap::new(),
        }
    }

    fn cell_range(&self, rect: &Rect) -> impl Iterator<Item = (i32, i32)> {
        let cell = self.cell_size;
        let min_x = (rect.x / cell).floor() as i32;
        let max_x = (rect.right() / cell).floor() as i32;
        let min_y = (rect.y / cell).floor() as i32;
        let max_y = (rect.bottom() / cell).floor() as i32;
        (min_x..=max_x).flat_map(move |cx| (min_y..=max_y).map(move |cy| (cx, cy)))
    }

    pub fn insert(&mut self, id: NodeId, rect: Rect) {
        let cells: Vec<_> = self.cell_range(&rect).collect();
        for cell in cells {
            self.cells.entry(cell).or_default().push((id, rect));
        }
    }

    /// Ids of inserted footprints that strictly intersect `rect`, in insertion order per cell.
    pub fn overlapping(&self, rect: &Rect) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        let mut hits = Vec::new();
        for cell in self.cell_range(rect) {
            let Some(entries) = self.cells.get(&cell) else { continue };
            for (id, other) in entries {
                if rect.overlaps(other) && seen.insert(*id) {
                    hits.push(*id);
                }
            }
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_overlap_across_cells() {
        let mut grid = SpatialGrid::new(100.0);
        grid.insert(NodeId(1), Rect { x: 0.0, y: 0.0, w: 150.0, h: 50.0 });
        grid.insert(NodeId(2), Rect { x: 400.0, y: 400.0, w: 50.0, h: 50.0 });

        assert_eq!(grid.overlapping(&Rect { x: 120.0, y: 10.0, w: 20.0, h: 20.0 }), vec![NodeId(1)]);
        // Touching edges do not count.
        assert!(grid.overlapping(&Rect { x: 150.0, y: 0.0, w: 50.0, h: 50.0 }).is_empty());
    }

    #[test]
    fn negative_coordinates() {
        let mut grid = SpatialGrid::new(100.0);
        grid.insert(NodeId(7), Rect { x: -250.0, y: -30.0, w: 200.0, h: 120.0 });
        assert_eq!(grid.overlapping(&Rect { x: -60.0, y: 80.0, w: 20.0, h: 20.0 }), vec![NodeId(7)]);
        assert!(grid.overlapping(&Rect { x: -50.0, y: 80.0, w: 20.0, h: 20.0 }).is_empty());
    }
}
