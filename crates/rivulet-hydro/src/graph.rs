//! The flow graph across every tile of a store.
//!
//! A pointer that leaves its tile lands in the cardinal neighbour through
//! [`TileLattice::locate`]; a cell only counts as a target if its tile is in
//! the store.

use rivulet_lattice::{CellRef, Side, TileLattice};

use crate::flow::FlowDirection;
use crate::tile::TileStore;

pub fn direction<S: TileStore + ?Sized>(store: &S, cell: CellRef) -> Option<FlowDirection> {
    let tile = store.tile(cell.tile)?;
    if !tile.flow.contains(cell.x as i64, cell.y as i64) {
        return None;
    }
    Some(tile.flow.direction(cell.x, cell.y))
}

pub fn accumulation<S: TileStore + ?Sized>(store: &S, cell: CellRef) -> Option<f32> {
    let tile = store.tile(cell.tile)?;
    if !tile.flow.contains(cell.x as i64, cell.y as i64) {
        return None;
    }
    Some(tile.flow.accumulation(cell.x, cell.y))
}

/// Where `cell` would drain if it pointed `dir`.
pub fn step_towards<S: TileStore + ?Sized>(
    store: &S,
    lattice: &TileLattice,
    cell: CellRef,
    dir: FlowDirection,
) -> Option<CellRef> {
    if dir.is_still() {
        return None;
    }
    let (dx, dy) = dir.offset();
    let target = lattice.locate(cell.tile, cell.x as i64 + dx, cell.y as i64 + dy)?;
    store.tile(target.tile).map(|_| target)
}

pub fn downstream<S: TileStore + ?Sized>(store: &S, lattice: &TileLattice, cell: CellRef) -> Option<CellRef> {
    let dir = direction(store, cell)?;
    step_towards(store, lattice, cell, dir)
}

/// Every cell whose pointer lands on `cell`, in any tile of the store.
pub fn upstream<S: TileStore + ?Sized>(store: &S, lattice: &TileLattice, cell: CellRef) -> Vec<CellRef> {
    let (cx, cy) = (cell.x as i64, cell.y as i64);
    let frames = std::iter::once((cell.tile, cx, cy)).chain(Side::ALL.into_iter().map(|side| {
        let (x, y) = lattice.translate(side, cx, cy);
        (cell.tile.neighbor(side), x, y)
    }));
    let mut out = Vec::new();
    for (coord, fx, fy) in frames {
        let Some(tile) = store.tile(coord) else {
            continue;
        };
        // A pointer from this tile reaches `cell` only if `cell`'s position in
        // this frame resolves back to it.
        if lattice.locate(coord, fx, fy) != Some(cell) {
            continue;
        }
        for dir in FlowDirection::SEARCH_ORDER {
            let (dx, dy) = dir.offset();
            let (nx, ny) = (fx - dx, fy - dy);
            if !tile.flow.contains(nx, ny) {
                continue;
            }
            if tile.flow.direction(nx as usize, ny as usize) == dir {
                out.push(CellRef::new(coord, nx as usize, ny as usize));
            }
        }
    }
    out
}

/// `accumulation - 1 - inflow` for `cell`; zero when flow is conserved there.
pub fn conservation_residual<S: TileStore + ?Sized>(store: &S, lattice: &TileLattice, cell: CellRef) -> Option<f32> {
    let acc = accumulation(store, cell)?;
    let inflow: f32 = upstream(store, lattice, cell)
        .into_iter()
        .filter_map(|u| accumulation(store, u))
        .sum();
    Some(acc - 1.0 - inflow)
}
