use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub tx: i32,
    pub ty: i32,
}

impl TileCoord {
    #[inline]
    pub const fn new(tx: i32, ty: i32) -> Self {
        Self { tx, ty }
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            tx: self.tx + dx,
            ty: self.ty + dy,
        }
    }

    #[inline]
    pub fn neighbor(self, side: Side) -> Self {
        let (dx, dy) = side.offset();
        self.offset(dx, dy)
    }

    #[inline]
    pub fn distance_sq(self, other: TileCoord) -> i64 {
        let dx = i64::from(self.tx - other.tx);
        let dy = i64::from(self.ty - other.ty);
        dx * dx + dy * dy
    }

    /// Ring distance; the streaming layer loads square neighbourhoods.
    #[inline]
    pub fn chebyshev(self, other: TileCoord) -> i32 {
        (self.tx - other.tx).abs().max((self.ty - other.ty).abs())
    }

    /// Which side of `self` the tile `other` sits on, if they share a seam.
    pub fn side_towards(self, other: TileCoord) -> Option<Side> {
        Side::ALL.into_iter().find(|&s| self.neighbor(s) == other)
    }
}

impl From<(i32, i32)> for TileCoord {
    fn from(value: (i32, i32)) -> Self {
        Self::new(value.0, value.1)
    }
}

impl From<TileCoord> for (i32, i32) {
    fn from(value: TileCoord) -> Self {
        (value.tx, value.ty)
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.tx, self.ty)
    }
}

/// Cardinal seam of a tile. `ty` grows northward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    North = 0,
    East = 1,
    South = 2,
    West = 3,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::North, Side::East, Side::South, Side::West];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub const fn opposite(self) -> Side {
        match self {
            Side::North => Side::South,
            Side::East => Side::West,
            Side::South => Side::North,
            Side::West => Side::East,
        }
    }

    #[inline]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Side::North => (0, 1),
            Side::East => (1, 0),
            Side::South => (0, -1),
            Side::West => (-1, 0),
        }
    }

    /// North and South seams run along the x axis.
    #[inline]
    pub const fn runs_along_x(self) -> bool {
        matches!(self, Side::North | Side::South)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Side::North => "north",
            Side::East => "east",
            Side::South => "south",
            Side::West => "west",
        };
        f.write_str(s)
    }
}

#[inline]
pub fn opposite(side: Side) -> Side {
    side.opposite()
}
