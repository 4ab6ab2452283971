use rivulet_lattice::TileCoord;

/// Source of raw heights for a tile. `row` 0 is the northern edge of the tile.
pub trait HeightSampler: Send + Sync {
    fn sample(&self, tile: TileCoord, x: usize, row: usize) -> f32;
}

impl<F> HeightSampler for F
where
    F: Fn(TileCoord, usize, usize) -> f32 + Send + Sync,
{
    #[inline]
    fn sample(&self, tile: TileCoord, x: usize, row: usize) -> f32 {
        self(tile, x, row)
    }
}

/// Raw height samples for one tile, row-major in raster order.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightGrid {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl HeightGrid {
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for row in 0..height {
            for x in 0..width {
                data.push(f(x, row));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn sample(sampler: &dyn HeightSampler, coord: TileCoord, width: usize, height: usize) -> Self {
        Self::from_fn(width, height, |x, row| sampler.sample(coord, x, row))
    }

    /// Builds a grid from rows listed north to south.
    pub fn from_rows(rows: &[&[f32]]) -> Self {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.len());
        Self::from_fn(width, height, |x, row| rows[row][x])
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
    pub fn get(&self, x: usize, row: usize) -> Option<f32> {
        if x < self.width && row < self.height {
            Some(self.data[row * self.width + x])
        } else {
            None
        }
    }

    pub fn values(&self) -> &[f32] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_fn_is_raster_order() {
        let g = HeightGrid::from_fn(3, 2, |x, row| (row * 10 + x) as f32);
        assert_eq!(g.values(), &[0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
        assert_eq!(g.get(2, 1), Some(12.0));
        assert_eq!(g.get(3, 0), None);
    }

    #[test]
    fn closures_are_samplers() {
        let s = |t: TileCoord, x: usize, row: usize| (t.tx as usize + x + row) as f32;
        let g = HeightGrid::sample(&s, TileCoord::new(5, 0), 2, 2);
        assert_eq!(g.get(1, 1), Some(7.0));
    }
}
