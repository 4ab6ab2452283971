use std::sync::Arc;

use hashbrown::HashMap;
use proptest::prelude::*;
use rivulet_hydro::graph;
use rivulet_hydro::{FlowDirection, Seam, Tile, affected_set, patch, stitch};
use rivulet_lattice::{CellRef, Side, TileCoord, TileLattice};
use rivulet_terrain::{HeightGrid, HeightResponse};

const TILES: [TileCoord; 4] = [
    TileCoord::new(0, 0),
    TileCoord::new(1, 0),
    TileCoord::new(0, 1),
    TileCoord::new(1, 1),
];

const SEAMS: [(TileCoord, Side); 4] = [
    (TileCoord::new(0, 0), Side::East),
    (TileCoord::new(0, 1), Side::East),
    (TileCoord::new(0, 0), Side::North),
    (TileCoord::new(1, 0), Side::North),
];

#[derive(Clone, Debug)]
struct World {
    size: usize,
    overlap: usize,
    extent: usize,
    heights: Vec<u8>,
}

impl World {
    fn pitch(&self) -> usize {
        self.size - 1 - self.overlap
    }

    fn height(&self, wx: i64, wn: i64) -> f32 {
        f32::from(self.heights[wn as usize * self.extent + wx as usize])
    }

    fn tile(&self, coord: TileCoord, response: &Arc<HeightResponse>) -> Tile {
        let p = self.pitch() as i64;
        let grid = HeightGrid::from_fn(self.size, self.size, |x, row| {
            let wx = i64::from(coord.tx) * p + x as i64;
            let wn = i64::from(coord.ty) * p + (self.size - 1 - row) as i64;
            self.height(wx, wn)
        });
        Tile::build(coord, Arc::new(grid), Arc::clone(response), 1, 1000.0)
    }

    fn tiles(&self) -> HashMap<TileCoord, Tile> {
        let response = Arc::new(HeightResponse::identity());
        TILES.iter().map(|&c| (c, self.tile(c, &response))).collect()
    }

    fn lattice(&self) -> TileLattice {
        TileLattice::new(self.size, self.size, self.overlap)
    }
}

fn world() -> impl Strategy<Value = World> {
    (4usize..9, 1usize..3).prop_flat_map(|(size, overlap)| {
        let extent = 2 * size - 1 - overlap;
        prop::collection::vec(0u8..7, extent * extent).prop_map(move |heights| World {
            size,
            overlap,
            extent,
            heights,
        })
    })
}

fn seam_order() -> impl Strategy<Value = Vec<usize>> {
    Just(vec![0usize, 1, 2, 3]).prop_shuffle()
}

fn stitch_in(map: &mut HashMap<TileCoord, Tile>, a: TileCoord, side: Side, lat: &TileLattice) -> Option<Seam> {
    let b = a.neighbor(side);
    let [ta, tb] = map.get_many_mut([&a, &b])?;
    stitch(Some(ta), Some(tb), side, lat)
}

fn cells(map: &HashMap<TileCoord, Tile>) -> Vec<CellRef> {
    let mut out = Vec::new();
    for c in TILES {
        let f = &map[&c].flow;
        for y in 0..f.height() {
            for x in 0..f.width() {
                out.push(CellRef::new(c, x, y));
            }
        }
    }
    out
}

fn directions(map: &HashMap<TileCoord, Tile>) -> Vec<Vec<FlowDirection>> {
    TILES.iter().map(|c| map[c].flow.directions().to_vec()).collect()
}

fn accumulations(map: &HashMap<TileCoord, Tile>) -> Vec<Vec<f32>> {
    TILES.iter().map(|c| map[c].flow.accumulations().to_vec()).collect()
}

proptest! {
    #[test]
    fn patched_seams_conserve_flow(w in world(), order in seam_order()) {
        let lat = w.lattice();
        let mut map = w.tiles();
        for i in order {
            let (a, side) = SEAMS[i];
            let seam = stitch_in(&mut map, a, side, &lat).unwrap();
            patch(&mut map, &seam, &lat);
            for c in cells(&map) {
                let r = graph::conservation_residual(&map, &lat, c).unwrap();
                prop_assert!(r.abs() < 1e-3, "residual {} at {:?}", r, c);
            }
        }
    }

    #[test]
    fn cross_tile_flow_is_acyclic(w in world(), order in seam_order()) {
        let lat = w.lattice();
        let mut map = w.tiles();
        for i in order {
            let (a, side) = SEAMS[i];
            let seam = stitch_in(&mut map, a, side, &lat).unwrap();
            patch(&mut map, &seam, &lat);
        }
        let all = cells(&map);
        for &start in &all {
            let mut cur = start;
            let mut steps = 0;
            while let Some(next) = graph::downstream(&map, &lat, cur) {
                prop_assert_ne!(graph::downstream(&map, &lat, next), Some(cur));
                cur = next;
                steps += 1;
                prop_assert!(steps <= all.len());
            }
        }
    }

    #[test]
    fn restitching_is_idempotent(w in world(), order in seam_order(), again in 0usize..4) {
        let lat = w.lattice();
        let mut map = w.tiles();
        for i in order {
            let (a, side) = SEAMS[i];
            let seam = stitch_in(&mut map, a, side, &lat).unwrap();
            patch(&mut map, &seam, &lat);
        }
        let dirs = directions(&map);
        let accs = accumulations(&map);
        let (a, side) = SEAMS[again];
        let seam = stitch_in(&mut map, a, side, &lat).unwrap();
        prop_assert_eq!(seam.changed, 0);
        patch(&mut map, &seam, &lat);
        prop_assert_eq!(directions(&map), dirs);
        prop_assert_eq!(accumulations(&map), accs);
    }

    #[test]
    fn final_directions_do_not_depend_on_seam_order(w in world(), order in seam_order()) {
        let lat = w.lattice();
        let mut ordered = w.tiles();
        for (a, side) in SEAMS {
            let seam = stitch_in(&mut ordered, a, side, &lat).unwrap();
            patch(&mut ordered, &seam, &lat);
        }
        let mut shuffled = w.tiles();
        for i in order {
            let (a, side) = SEAMS[i];
            let seam = stitch_in(&mut shuffled, a, side, &lat).unwrap();
            patch(&mut shuffled, &seam, &lat);
        }
        prop_assert_eq!(directions(&ordered), directions(&shuffled));
        prop_assert_eq!(accumulations(&ordered), accumulations(&shuffled));
    }

    #[test]
    fn patch_leaves_cells_outside_the_closure_alone(w in world(), first in 0usize..4) {
        let lat = w.lattice();
        let mut map = w.tiles();
        let (a, side) = SEAMS[first];
        let seam = stitch_in(&mut map, a, side, &lat).unwrap();
        let closure = affected_set(&map, &seam, &lat);
        let before: Vec<(CellRef, f32)> = cells(&map)
            .into_iter()
            .map(|c| (c, graph::accumulation(&map, c).unwrap()))
            .collect();
        let report = patch(&mut map, &seam, &lat);
        prop_assert_eq!(report.affected, closure.len());
        for (c, acc) in before {
            if !closure.contains(&c) {
                prop_assert_eq!(graph::accumulation(&map, c), Some(acc));
            }
        }
    }
}
