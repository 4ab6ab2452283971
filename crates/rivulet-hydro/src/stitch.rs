use std::sync::Arc;

use rivulet_lattice::{CellRef, Side, TileCoord, TileLattice};

use crate::flow::FlowDirection;
use crate::tile::Tile;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeamCell {
    pub cell: CellRef,
    /// Direction before this stitch.
    pub prior: FlowDirection,
}

/// Result of stitching `b`, which lies on `side` of `a`.
#[derive(Clone, Debug)]
pub struct Seam {
    pub a: TileCoord,
    pub b: TileCoord,
    pub side: Side,
    pub cells: Vec<SeamCell>,
    pub changed: usize,
}

/// Copies the partner's surface into the halo of `home` beyond `side`.
fn fill_halo(home: &mut Tile, partner: &Tile, side: Side, lattice: &TileLattice) {
    for i in 0..home.flow.halo_len(side) {
        let (x, y) = home.flow.halo_position(side, i);
        let Some(cell) = lattice.locate(home.coord, x, y) else {
            continue;
        };
        if cell.tile == partner.coord {
            let h = partner.flow.surface(cell.x, cell.y);
            home.flow.set_halo(side, i, h);
        }
    }
}

fn fits(tile: &Tile, lattice: &TileLattice) -> bool {
    tile.flow.width() == lattice.width() && tile.flow.height() == lattice.height()
}

/// Re-derives directions within `overlap` of the seam between `a` and `b`
/// (`b` on `side` of `a`) using both tiles' surfaces, and marks the seam
/// resolved on both. `None` if either tile is missing or they do not meet on
/// `side`. Repeating a stitch changes nothing.
pub fn stitch(a: Option<&mut Tile>, b: Option<&mut Tile>, side: Side, lattice: &TileLattice) -> Option<Seam> {
    let (a, b) = (a?, b?);
    if a.coord.neighbor(side) != b.coord {
        log::debug!(target: "hydro", "stitch {} {} {}: not adjacent", a.coord, side, b.coord);
        return None;
    }
    if !fits(a, lattice) || !fits(b, lattice) {
        log::debug!(target: "hydro", "stitch {} {} {}: flow grid does not match lattice", a.coord, side, b.coord);
        return None;
    }
    if !Arc::ptr_eq(a.flow.response(), b.flow.response()) && a.flow.response() != b.flow.response() {
        log::warn!(
            target: "hydro",
            "tiles {} and {} use different height responses; seam {} may not be consistent",
            a.coord,
            b.coord,
            side
        );
    }

    fill_halo(a, b, side, lattice);
    fill_halo(b, a, side.opposite(), lattice);

    let mut cells = Vec::new();
    let mut changed = 0;
    for pair in lattice.border_seeds(a.coord, b.coord, side) {
        for (tile, cell) in [(&mut *a, pair.a), (&mut *b, pair.b)] {
            let prior = tile.flow.direction(cell.x, cell.y);
            let next = tile.flow.descend(cell.x, cell.y);
            if next != prior {
                tile.flow.set_direction(cell.x, cell.y, next);
                changed += 1;
            }
            cells.push(SeamCell { cell, prior });
        }
    }

    a.borders.mark(side);
    b.borders.mark(side.opposite());
    log::debug!(
        target: "hydro",
        "stitched {} {} {}: {} of {} seam cells changed",
        a.coord,
        side,
        b.coord,
        changed,
        cells.len()
    );
    Some(Seam {
        a: a.coord,
        b: b.coord,
        side,
        cells,
        changed,
    })
}

pub fn resolve(a: Option<&mut Tile>, b: Option<&mut Tile>, side: Side, lattice: &TileLattice) -> bool {
    stitch(a, b, side, lattice).is_some()
}
