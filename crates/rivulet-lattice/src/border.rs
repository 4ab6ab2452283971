use crate::tile_coord::Side;

/// Which seams of a tile have been stitched against a loaded neighbour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BorderState {
    resolved: [bool; 4],
}

impl BorderState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `side` resolved. Returns true if it was not resolved before.
    #[inline]
    pub fn mark(&mut self, side: Side) -> bool {
        let was = self.resolved[side.index()];
        self.resolved[side.index()] = true;
        !was
    }

    #[inline]
    pub fn is_resolved(&self, side: Side) -> bool {
        self.resolved[side.index()]
    }

    #[inline]
    pub fn is_fully_resolved(&self) -> bool {
        self.resolved.iter().all(|&r| r)
    }

    pub fn unresolved(&self) -> impl Iterator<Item = Side> + '_ {
        Side::ALL.into_iter().filter(|s| !self.is_resolved(*s))
    }

    pub fn resolved_count(&self) -> usize {
        self.resolved.iter().filter(|&&r| r).count()
    }
}
