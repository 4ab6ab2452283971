use crate::flow::{FlowDirection, FlowField};

/// Tile-local flow cells from a river source downstream.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RiverPath {
    pub cells: Vec<(usize, usize)>,
}

impl RiverPath {
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn source(&self) -> Option<(usize, usize)> {
        self.cells.first().copied()
    }

    pub fn mouth(&self) -> Option<(usize, usize)> {
        self.cells.last().copied()
    }
}

fn is_source(flow: &FlowField, river: &[bool], x: usize, y: usize) -> bool {
    for dir in FlowDirection::SEARCH_ORDER {
        let (dx, dy) = dir.offset();
        let (nx, ny) = (x as i64 + dx, y as i64 + dy);
        if !flow.contains(nx, ny) {
            continue;
        }
        let (nx, ny) = (nx as usize, ny as usize);
        if river[flow.index(nx, ny)] && flow.target(nx, ny) == Some((x, y)) {
            return false;
        }
    }
    true
}

/// Rivers are runs of cells with `accumulation >= threshold`, walked from
/// each source until the pointer stops, leaves the tile, or reaches a
/// non-river cell. Single-cell runs are dropped.
pub fn trace(flow: &FlowField, threshold: f32) -> Vec<RiverPath> {
    let river: Vec<bool> = flow.accumulations().iter().map(|&a| a >= threshold).collect();
    let mut paths = Vec::new();
    for x in 0..flow.width() {
        for y in 0..flow.height() {
            if !river[flow.index(x, y)] || !is_source(flow, &river, x, y) {
                continue;
            }
            let mut cells = vec![(x, y)];
            let mut cur = (x, y);
            while let Some(next) = flow.target(cur.0, cur.1) {
                if !river[flow.index(next.0, next.1)] || cells.len() > flow.len() {
                    break;
                }
                cells.push(next);
                cur = next;
            }
            if cells.len() > 1 {
                paths.push(RiverPath { cells });
            }
        }
    }
    paths
}
