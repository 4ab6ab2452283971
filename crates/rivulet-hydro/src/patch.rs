use std::collections::VecDeque;

use hashbrown::{HashMap, HashSet};
use rivulet_lattice::{CellRef, TileCoord, TileLattice};

use crate::flow::FlowDirection;
use crate::graph;
use crate::stitch::Seam;
use crate::tile::{Tile, TilePair, TileStore};

// Residual inflow below this is float noise, not upstream volume.
const INFLOW_EPSILON: f32 = 1e-3;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PatchReport {
    pub seeds: usize,
    pub affected: usize,
    pub changed: usize,
    /// Tiles holding at least one affected cell, sorted.
    pub tiles: Vec<TileCoord>,
}

fn seed_cells<S: TileStore + ?Sized>(store: &S, seam: &Seam, lattice: &TileLattice) -> Vec<CellRef> {
    let mut seen = HashSet::new();
    let mut seeds = Vec::new();
    for sc in &seam.cells {
        // The cell a seam cell used to drain into loses that inflow.
        let prior_target = graph::step_towards(store, lattice, sc.cell, sc.prior);
        for c in std::iter::once(sc.cell).chain(prior_target) {
            if seen.insert(c) {
                seeds.push(c);
            }
        }
    }
    seeds
}

/// Cells whose accumulation can change after `seam` was stitched: the
/// closure of the seam cells under downstream and upstream steps, across
/// every tile of the store. Order is breadth-first from the seam.
pub fn affected_set<S: TileStore + ?Sized>(store: &S, seam: &Seam, lattice: &TileLattice) -> Vec<CellRef> {
    let seeds = seed_cells(store, seam, lattice);
    let mut seen: HashSet<CellRef> = seeds.iter().copied().collect();
    let mut queue: VecDeque<CellRef> = seeds.into_iter().collect();
    let mut out = Vec::new();
    while let Some(c) = queue.pop_front() {
        out.push(c);
        let next = graph::downstream(store, lattice, c)
            .into_iter()
            .chain(graph::upstream(store, lattice, c));
        for n in next {
            if seen.insert(n) {
                queue.push_back(n);
            }
        }
    }
    out
}

/// Recomputes accumulation over the affected set of `seam` only.
///
/// Each affected cell restarts at 1 plus the inflow it had before the
/// stitch that cannot be attributed to another affected cell, then Kahn's
/// algorithm runs over the affected edges.
pub fn patch<S: TileStore + ?Sized>(store: &mut S, seam: &Seam, lattice: &TileLattice) -> PatchReport {
    let seeds = seed_cells(&*store, seam, lattice).len();
    let cells = affected_set(&*store, seam, lattice);
    let n = cells.len();
    let index: HashMap<CellRef, usize> = cells.iter().enumerate().map(|(i, &c)| (c, i)).collect();
    let prior: HashMap<CellRef, FlowDirection> = seam.cells.iter().map(|sc| (sc.cell, sc.prior)).collect();

    let old_acc: Vec<f32> = cells
        .iter()
        .map(|&c| graph::accumulation(&*store, c).unwrap_or(1.0))
        .collect();

    // Inflow each cell received from affected cells under the old pointers.
    let mut explained = vec![0.0f32; n];
    for (i, &u) in cells.iter().enumerate() {
        let dir = match prior.get(&u) {
            Some(&d) => d,
            None => graph::direction(&*store, u).unwrap_or(FlowDirection::Still),
        };
        if let Some(t) = graph::step_towards(&*store, lattice, u, dir) {
            if let Some(&j) = index.get(&t) {
                explained[j] += old_acc[i];
            }
        }
    }

    let mut acc: Vec<f32> = (0..n)
        .map(|i| {
            let external = old_acc[i] - 1.0 - explained[i];
            if external > INFLOW_EPSILON { 1.0 + external } else { 1.0 }
        })
        .collect();

    let targets: Vec<Option<usize>> = cells
        .iter()
        .map(|&c| graph::downstream(&*store, lattice, c).and_then(|t| index.get(&t).copied()))
        .collect();
    let mut indegree = vec![0u32; n];
    for t in targets.iter().flatten() {
        indegree[*t] += 1;
    }
    let mut queue: VecDeque<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
    while let Some(i) = queue.pop_front() {
        if let Some(t) = targets[i] {
            acc[t] += acc[i];
            indegree[t] -= 1;
            if indegree[t] == 0 {
                queue.push_back(t);
            }
        }
    }

    let mut changed = 0;
    let mut tiles: Vec<TileCoord> = Vec::new();
    for (i, &c) in cells.iter().enumerate() {
        if let Some(tile) = store.tile_mut(c.tile) {
            if (tile.flow.accumulation(c.x, c.y) - acc[i]).abs() > f32::EPSILON {
                changed += 1;
            }
            tile.flow.set_accumulation(c.x, c.y, acc[i]);
            if !tiles.contains(&c.tile) {
                tiles.push(c.tile);
            }
        }
    }
    tiles.sort_by_key(|t| (t.tx, t.ty));

    log::debug!(
        target: "hydro",
        "patched seam {} {} {}: {} seeds, {} affected, {} changed",
        seam.a,
        seam.side,
        seam.b,
        seeds,
        n,
        changed
    );
    PatchReport {
        seeds,
        affected: n,
        changed,
        tiles,
    }
}

pub fn patch_pair(a: &mut Tile, b: &mut Tile, seam: &Seam, lattice: &TileLattice) -> PatchReport {
    let mut pair = TilePair::new(a, b);
    patch(&mut pair, seam, lattice)
}
