use std::hash::BuildHasher;
use std::sync::Arc;

use hashbrown::HashMap;
use rivulet_lattice::{BorderState, TileCoord};
use rivulet_terrain::{HeightGrid, HeightResponse};

use crate::flow::FlowField;
use crate::rivers::{self, RiverPath};

#[derive(Clone, Debug)]
pub struct Tile {
    pub coord: TileCoord,
    pub heights: Arc<HeightGrid>,
    pub flow: FlowField,
    pub borders: BorderState,
    pub rivers: Vec<RiverPath>,
}

impl Tile {
    pub fn new(coord: TileCoord, heights: Arc<HeightGrid>, flow: FlowField, rivers: Vec<RiverPath>) -> Self {
        Self {
            coord,
            heights,
            flow,
            borders: BorderState::new(),
            rivers,
        }
    }

    /// Builds the unstitched flow field and initial rivers for a tile.
    pub fn build(
        coord: TileCoord,
        heights: Arc<HeightGrid>,
        response: Arc<HeightResponse>,
        step: usize,
        river_threshold: f32,
    ) -> Self {
        let flow = FlowField::build(&heights, response, step);
        let rivers = rivers::trace(&flow, river_threshold);
        Self::new(coord, heights, flow, rivers)
    }

    pub fn retrace(&mut self, river_threshold: f32) {
        self.rivers = rivers::trace(&self.flow, river_threshold);
    }
}

/// Tiles addressable by coordinate. All tiles in a store share one lattice.
pub trait TileStore {
    fn tile(&self, coord: TileCoord) -> Option<&Tile>;
    fn tile_mut(&mut self, coord: TileCoord) -> Option<&mut Tile>;
}

impl<S: BuildHasher> TileStore for HashMap<TileCoord, Tile, S> {
    #[inline]
    fn tile(&self, coord: TileCoord) -> Option<&Tile> {
        self.get(&coord)
    }

    #[inline]
    fn tile_mut(&mut self, coord: TileCoord) -> Option<&mut Tile> {
        self.get_mut(&coord)
    }
}

/// Two borrowed tiles viewed as a store.
pub struct TilePair<'a> {
    a: &'a mut Tile,
    b: &'a mut Tile,
}

impl<'a> TilePair<'a> {
    pub fn new(a: &'a mut Tile, b: &'a mut Tile) -> Self {
        Self { a, b }
    }
}

impl TileStore for TilePair<'_> {
    fn tile(&self, coord: TileCoord) -> Option<&Tile> {
        if self.a.coord == coord {
            Some(&*self.a)
        } else if self.b.coord == coord {
            Some(&*self.b)
        } else {
            None
        }
    }

    fn tile_mut(&mut self, coord: TileCoord) -> Option<&mut Tile> {
        if self.a.coord == coord {
            Some(&mut *self.a)
        } else if self.b.coord == coord {
            Some(&mut *self.b)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivulet_terrain::HeightResponse;

    fn slope(coord: TileCoord) -> Tile {
        let grid = Arc::new(HeightGrid::from_rows(&[&[0.0, 1.0, 2.0, 3.0]]));
        Tile::build(coord, grid, Arc::new(HeightResponse::identity()), 1, 100.0)
    }

    #[test]
    fn retrace_uses_the_new_threshold() {
        let mut t = slope(TileCoord::new(0, 0));
        assert!(t.rivers.is_empty());
        t.retrace(2.0);
        assert_eq!(t.rivers.len(), 1);
        assert_eq!(t.rivers[0].cells, vec![(2, 0), (1, 0), (0, 0)]);
    }

    #[test]
    fn pair_store_only_knows_its_two_tiles() {
        let (ca, cb) = (TileCoord::new(0, 0), TileCoord::new(1, 0));
        let mut a = slope(ca);
        let mut b = slope(cb);
        let mut pair = TilePair::new(&mut a, &mut b);
        assert_eq!(pair.tile(cb).map(|t| t.coord), Some(cb));
        assert!(pair.tile_mut(ca).is_some());
        assert!(pair.tile(TileCoord::new(0, 1)).is_none());
    }

    #[test]
    fn map_store_looks_up_by_coord() {
        let c = TileCoord::new(-3, 2);
        let mut map: HashMap<TileCoord, Tile> = HashMap::new();
        map.insert(c, slope(c));
        assert_eq!(TileStore::tile(&map, c).map(|t| t.coord), Some(c));
        assert!(TileStore::tile_mut(&mut map, TileCoord::new(0, 0)).is_none());
    }
}
