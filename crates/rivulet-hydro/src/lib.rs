//! Drainage for streamed tiles: flow directions, accumulation, seam stitching, and rivers.
#![forbid(unsafe_code)]

mod flow;
pub mod graph;
mod patch;
mod rivers;
mod stitch;
mod tile;

pub use flow::{FlowDirection, FlowField};
pub use patch::{PatchReport, affected_set, patch, patch_pair};
pub use rivers::{RiverPath, trace};
pub use stitch::{Seam, SeamCell, resolve, stitch};
pub use tile::{Tile, TilePair, TileStore};
