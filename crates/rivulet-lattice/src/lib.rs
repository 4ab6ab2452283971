//! Tile addressing: coordinates, seam sides, and cross-tile cell lookup.
#![forbid(unsafe_code)]

mod border;
mod lattice;
mod tile_coord;

pub use border::BorderState;
pub use lattice::{CellRef, SeamPair, TileLattice};
pub use tile_coord::{Side, TileCoord, opposite};
