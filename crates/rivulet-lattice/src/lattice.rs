use crate::tile_coord::{Side, TileCoord};

/// A flow cell addressed on the tile lattice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub tile: TileCoord,
    pub x: usize,
    pub y: usize,
}

impl CellRef {
    #[inline]
    pub const fn new(tile: TileCoord, x: usize, y: usize) -> Self {
        Self { tile, x, y }
    }
}

/// One seed cell on each side of a seam, both `depth` cells in from their own edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeamPair {
    pub a: CellRef,
    pub b: CellRef,
    pub depth: usize,
}

// Adjacent tiles overlap: with flow width `w` and overlap `o`, column `w-1`
// of a tile and column `o` of its east neighbour sample the same world point.
// The pitch between tile origins is therefore `w - 1 - o` flow cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileLattice {
    width: usize,
    height: usize,
    overlap: usize,
}

impl TileLattice {
    /// `overlap` is clamped to `[1, min(width, height)]`.
    pub fn new(width: usize, height: usize, overlap: usize) -> Self {
        let max_overlap = width.min(height).max(1);
        Self {
            width,
            height,
            overlap: overlap.max(1).min(max_overlap),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    #[inline]
    pub fn pitch_x(&self) -> i64 {
        self.width as i64 - 1 - self.overlap as i64
    }

    #[inline]
    pub fn pitch_y(&self) -> i64 {
        self.height as i64 - 1 - self.overlap as i64
    }

    #[inline]
    pub fn neighbor_coordinate(&self, coord: TileCoord, side: Side) -> TileCoord {
        coord.neighbor(side)
    }

    #[inline]
    pub fn opposite(&self, side: Side) -> Side {
        side.opposite()
    }

    #[inline]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width as i64 && y < self.height as i64
    }

    /// Maps a coordinate past `side` of one tile into the frame of the tile
    /// across that seam.
    #[inline]
    pub fn translate(&self, side: Side, x: i64, y: i64) -> (i64, i64) {
        match side {
            Side::East => (x - self.pitch_x(), y),
            Side::West => (x + self.pitch_x(), y),
            Side::North => (x, y - self.pitch_y()),
            Side::South => (x, y + self.pitch_y()),
        }
    }

    /// The seam a tile-local coordinate has crossed, if it left the tile along
    /// exactly one axis.
    pub fn exit_side(&self, x: i64, y: i64) -> Option<Side> {
        let out_x = x < 0 || x >= self.width as i64;
        let out_y = y < 0 || y >= self.height as i64;
        match (out_x, out_y) {
            (true, false) => Some(if x < 0 { Side::West } else { Side::East }),
            (false, true) => Some(if y < 0 { Side::South } else { Side::North }),
            _ => None,
        }
    }

    /// Resolves a coordinate in `coord`'s frame to the cell that owns it:
    /// the tile itself, or the cardinal neighbour it spills into. Diagonal
    /// spill has no owner.
    pub fn locate(&self, coord: TileCoord, x: i64, y: i64) -> Option<CellRef> {
        if self.contains(x, y) {
            return Some(CellRef::new(coord, x as usize, y as usize));
        }
        let side = self.exit_side(x, y)?;
        let (nx, ny) = self.translate(side, x, y);
        if !self.contains(nx, ny) {
            return None;
        }
        Some(CellRef::new(coord.neighbor(side), nx as usize, ny as usize))
    }

    /// Seam cells within `overlap` of the border between `a` and `b`, where
    /// `b` lies on `side` of `a`. Ordered along the shared axis, then by depth.
    pub fn border_seeds(self, a: TileCoord, b: TileCoord, side: Side) -> impl Iterator<Item = SeamPair> {
        let (w, h) = (self.width, self.height);
        let along = if side.runs_along_x() { w } else { h };
        let depth = self.overlap.min(if side.runs_along_x() { h } else { w });
        (0..along).flat_map(move |i| {
            (0..depth).map(move |d| {
                let (pa, pb) = match side {
                    Side::North => ((i, h - 1 - d), (i, d)),
                    Side::South => ((i, d), (i, h - 1 - d)),
                    Side::East => ((w - 1 - d, i), (d, i)),
                    Side::West => ((d, i), (w - 1 - d, i)),
                };
                SeamPair {
                    a: CellRef::new(a, pa.0, pa.1),
                    b: CellRef::new(b, pb.0, pb.1),
                    depth: d,
                }
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_is_clamped() {
        assert_eq!(TileLattice::new(8, 8, 0).overlap(), 1);
        assert_eq!(TileLattice::new(8, 4, 9).overlap(), 4);
        assert_eq!(TileLattice::new(8, 8, 2).overlap(), 2);
    }

    #[test]
    fn east_edge_column_is_neighbor_overlap_column() {
        let lat = TileLattice::new(10, 6, 2);
        let home = TileCoord::new(0, 0);
        // One step past our east edge lands one past the shared column.
        let cell = lat.locate(home, 10, 3).unwrap();
        assert_eq!(cell, CellRef::new(TileCoord::new(1, 0), 3, 3));
        let back = lat.locate(TileCoord::new(1, 0), -1, 3).unwrap();
        assert_eq!(back, CellRef::new(home, 6, 3));
    }

    #[test]
    fn diagonal_spill_has_no_owner() {
        let lat = TileLattice::new(5, 5, 1);
        assert!(lat.locate(TileCoord::new(0, 0), 5, 5).is_none());
        assert!(lat.locate(TileCoord::new(0, 0), -1, -1).is_none());
    }

    #[test]
    fn seeds_walk_the_seam_in_order() {
        let lat = TileLattice::new(4, 3, 2);
        let a = TileCoord::new(0, 0);
        let b = TileCoord::new(1, 0);
        let seeds: Vec<_> = lat.border_seeds(a, b, Side::East).collect();
        assert_eq!(seeds.len(), 3 * 2);
        assert_eq!(seeds[0].a, CellRef::new(a, 3, 0));
        assert_eq!(seeds[0].b, CellRef::new(b, 0, 0));
        assert_eq!(seeds[1].a, CellRef::new(a, 2, 0));
        assert_eq!(seeds[1].b, CellRef::new(b, 1, 0));
        assert_eq!(seeds[5].a, CellRef::new(a, 2, 2));
    }

    #[test]
    fn cells_sort_by_tile_then_column_then_row() {
        let (w, e) = (TileCoord::new(-1, 2), TileCoord::new(0, -3));
        let mut cells = vec![
            CellRef::new(e, 0, 1),
            CellRef::new(w, 4, 0),
            CellRef::new(e, 0, 0),
            CellRef::new(w, 1, 7),
        ];
        cells.sort();
        assert_eq!(
            cells,
            vec![CellRef::new(w, 1, 7), CellRef::new(w, 4, 0), CellRef::new(e, 0, 0), CellRef::new(e, 0, 1)]
        );
        assert!(TileCoord::new(0, 5) < TileCoord::new(1, -5));
        assert!(TileCoord::new(1, -5) < TileCoord::new(1, 0));
    }
}
