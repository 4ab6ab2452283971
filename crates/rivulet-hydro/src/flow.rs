use std::collections::VecDeque;
use std::sync::Arc;

use rivulet_lattice::Side;
use rivulet_terrain::{HeightGrid, HeightResponse};

/// Steepest-descent pointer of a flow cell. Offsets are in flow-grid
/// coordinates, where `y` grows northward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FlowDirection {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
    Still,
}

impl FlowDirection {
    /// Candidate order; the first direction reaching the minimum wins ties.
    pub const SEARCH_ORDER: [FlowDirection; 8] = [
        FlowDirection::N,
        FlowDirection::NE,
        FlowDirection::E,
        FlowDirection::SE,
        FlowDirection::S,
        FlowDirection::SW,
        FlowDirection::W,
        FlowDirection::NW,
    ];

    #[inline]
    pub const fn offset(self) -> (i64, i64) {
        match self {
            FlowDirection::N => (0, 1),
            FlowDirection::NE => (1, 1),
            FlowDirection::E => (1, 0),
            FlowDirection::SE => (1, -1),
            FlowDirection::S => (0, -1),
            FlowDirection::SW => (-1, -1),
            FlowDirection::W => (-1, 0),
            FlowDirection::NW => (-1, 1),
            FlowDirection::Still => (0, 0),
        }
    }

    #[inline]
    pub const fn is_still(self) -> bool {
        matches!(self, FlowDirection::Still)
    }

    pub fn from_offset(dx: i64, dy: i64) -> Option<Self> {
        Self::SEARCH_ORDER.into_iter().find(|d| d.offset() == (dx, dy))
    }

    pub const fn glyph(self) -> char {
        match self {
            FlowDirection::N => '^',
            FlowDirection::NE => '/',
            FlowDirection::E => '>',
            FlowDirection::SE => '\\',
            FlowDirection::S => 'v',
            FlowDirection::SW => '/',
            FlowDirection::W => '<',
            FlowDirection::NW => '\\',
            FlowDirection::Still => '.',
        }
    }
}

/// Directions, accumulation and comparable heights for one tile's flow grid.
///
/// Flow cell `(x, y)` reads raw sample `(x * step, H - 1 - y * step)`, so row
/// 0 of the flow grid is the tile's southern edge. The halo holds surface
/// values of the ring just outside the tile, copied in from neighbours as
/// seams are stitched.
#[derive(Clone, Debug)]
pub struct FlowField {
    width: usize,
    height: usize,
    step: usize,
    directions: Vec<FlowDirection>,
    accumulation: Vec<f32>,
    surface: Vec<f32>,
    halo: [Vec<Option<f32>>; 4],
    response: Arc<HeightResponse>,
}

impl FlowField {
    pub fn build(heights: &HeightGrid, response: Arc<HeightResponse>, step: usize) -> Self {
        let step = step.max(1);
        let (hw, hh) = (heights.width(), heights.height());
        let width = if hw == 0 { 0 } else { (hw - 1) / step + 1 };
        let height = if hh == 0 { 0 } else { (hh - 1) / step + 1 };
        let mut surface = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let raw = heights.get(x * step, hh - 1 - y * step).unwrap_or(0.0);
                surface.push(response.evaluate(raw));
            }
        }
        let mut field = Self {
            width,
            height,
            step,
            directions: vec![FlowDirection::Still; width * height],
            accumulation: vec![1.0; width * height],
            surface,
            halo: [
                vec![None; width],
                vec![None; height],
                vec![None; width],
                vec![None; height],
            ],
            response,
        };
        for y in 0..height {
            for x in 0..width {
                let dir = field.descend(x, y);
                let i = field.index(x, y);
                field.directions[i] = dir;
            }
        }
        field.accumulate_local();
        field
    }

    /// Kahn's algorithm over pointers that stay inside the tile. Every cell
    /// starts at 1.
    pub fn accumulate_local(&mut self) {
        let n = self.width * self.height;
        let targets: Vec<Option<usize>> = (0..n)
            .map(|i| {
                let (x, y) = (i % self.width, i / self.width);
                self.target(x, y).map(|(tx, ty)| self.index(tx, ty))
            })
            .collect();
        let mut indegree = vec![0u32; n];
        for t in targets.iter().flatten() {
            indegree[*t] += 1;
        }
        self.accumulation.iter_mut().for_each(|a| *a = 1.0);
        let mut queue: VecDeque<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
        while let Some(i) = queue.pop_front() {
            if let Some(t) = targets[i] {
                self.accumulation[t] += self.accumulation[i];
                indegree[t] -= 1;
                if indegree[t] == 0 {
                    queue.push_back(t);
                }
            }
        }
    }

    /// Steepest strictly-lower neighbour from the surface and whatever halo
    /// is known, or `Still`.
    pub fn descend(&self, x: usize, y: usize) -> FlowDirection {
        let mut best = FlowDirection::Still;
        let mut lowest = self.surface[self.index(x, y)];
        for dir in FlowDirection::SEARCH_ORDER {
            let (dx, dy) = dir.offset();
            if let Some(h) = self.surface_at(x as i64 + dx, y as i64 + dy) {
                if h < lowest {
                    lowest = h;
                    best = dir;
                }
            }
        }
        best
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
    pub fn step(&self) -> usize {
        self.step
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.directions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.directions.is_empty()
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    #[inline]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width as i64 && y < self.height as i64
    }

    #[inline]
    pub fn direction(&self, x: usize, y: usize) -> FlowDirection {
        self.directions[self.index(x, y)]
    }

    #[inline]
    pub(crate) fn set_direction(&mut self, x: usize, y: usize, dir: FlowDirection) {
        let i = self.index(x, y);
        self.directions[i] = dir;
    }

    #[inline]
    pub fn accumulation(&self, x: usize, y: usize) -> f32 {
        self.accumulation[self.index(x, y)]
    }

    #[inline]
    pub(crate) fn set_accumulation(&mut self, x: usize, y: usize, value: f32) {
        let i = self.index(x, y);
        self.accumulation[i] = value;
    }

    #[inline]
    pub fn surface(&self, x: usize, y: usize) -> f32 {
        self.surface[self.index(x, y)]
    }

    /// Surface inside the tile, or a known halo value one step outside it.
    pub fn surface_at(&self, x: i64, y: i64) -> Option<f32> {
        let (w, h) = (self.width as i64, self.height as i64);
        if self.contains(x, y) {
            return Some(self.surface[self.index(x as usize, y as usize)]);
        }
        if (0..w).contains(&x) {
            if y == h {
                return self.halo[Side::North.index()][x as usize];
            }
            if y == -1 {
                return self.halo[Side::South.index()][x as usize];
            }
        } else if (0..h).contains(&y) {
            if x == w {
                return self.halo[Side::East.index()][y as usize];
            }
            if x == -1 {
                return self.halo[Side::West.index()][y as usize];
            }
        }
        None
    }

    /// Tile-local position of the `i`-th halo cell beyond `side`.
    pub fn halo_position(&self, side: Side, i: usize) -> (i64, i64) {
        let i = i as i64;
        match side {
            Side::North => (i, self.height as i64),
            Side::South => (i, -1),
            Side::East => (self.width as i64, i),
            Side::West => (-1, i),
        }
    }

    pub fn halo_len(&self, side: Side) -> usize {
        self.halo[side.index()].len()
    }

    pub fn halo(&self, side: Side, i: usize) -> Option<f32> {
        self.halo[side.index()].get(i).copied().flatten()
    }

    pub(crate) fn set_halo(&mut self, side: Side, i: usize, value: f32) {
        if let Some(slot) = self.halo[side.index()].get_mut(i) {
            *slot = Some(value);
        }
    }

    /// Position the pointer of `(x, y)` lands on, which may lie outside the tile.
    #[inline]
    pub fn pointer(&self, x: usize, y: usize) -> Option<(i64, i64)> {
        let dir = self.direction(x, y);
        if dir.is_still() {
            return None;
        }
        let (dx, dy) = dir.offset();
        Some((x as i64 + dx, y as i64 + dy))
    }

    /// In-tile cell the pointer of `(x, y)` lands on.
    #[inline]
    pub fn target(&self, x: usize, y: usize) -> Option<(usize, usize)> {
        let (tx, ty) = self.pointer(x, y)?;
        self.contains(tx, ty).then_some((tx as usize, ty as usize))
    }

    pub fn directions(&self) -> &[FlowDirection] {
        &self.directions
    }

    pub fn accumulations(&self) -> &[f32] {
        &self.accumulation
    }

    pub fn response(&self) -> &Arc<HeightResponse> {
        &self.response
    }
}
