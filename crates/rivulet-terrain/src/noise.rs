use fastnoise_lite::{FastNoiseLite, NoiseType};
use rivulet_lattice::TileCoord;

use crate::grid::HeightSampler;

#[derive(Clone, Debug, PartialEq)]
pub struct NoiseSettings {
    pub seed: i32,
    pub scale: f32,
    pub octaves: u32,
    pub persistence: f32,
    pub lacunarity: f32,
    pub offset: [f32; 2],
}

/// Fractal OpenSimplex2 heights in `[0, 1]`, sampled in world space so that
/// tiles sharing a seam read identical values there.
pub struct NoiseSampler {
    noise: FastNoiseLite,
    settings: NoiseSettings,
    // Raw samples between tile origins, and rows per tile.
    pitch: i64,
    rows: usize,
}

impl NoiseSampler {
    pub fn new(settings: NoiseSettings, pitch: usize, rows: usize) -> Self {
        let mut noise = FastNoiseLite::with_seed(settings.seed);
        noise.set_noise_type(Some(NoiseType::OpenSimplex2));
        // Frequency is applied per octave below.
        noise.set_frequency(Some(1.0));
        Self {
            noise,
            settings,
            pitch: pitch as i64,
            rows,
        }
    }

    pub fn settings(&self) -> &NoiseSettings {
        &self.settings
    }

    /// World-space sample position of a tile-local raster coordinate. `row`
    /// counts southward from the tile's northern edge.
    #[inline]
    pub fn world_position(&self, tile: TileCoord, x: usize, row: usize) -> (i64, i64) {
        let wx = i64::from(tile.tx) * self.pitch + x as i64;
        let wn = i64::from(tile.ty) * self.pitch + (self.rows as i64 - 1 - row as i64);
        (wx, wn)
    }

    pub fn sample_world(&self, wx: f32, wn: f32) -> f32 {
        let s = &self.settings;
        let mut amp = 1.0_f32;
        let mut freq = 1.0_f32 / s.scale.max(0.0001);
        let mut sum = 0.0_f32;
        let mut max_amp = 0.0_f32;
        for _ in 0..s.octaves.max(1) {
            let nx = (wx + s.offset[0]) * freq;
            let ny = (wn + s.offset[1]) * freq;
            sum += self.noise.get_noise_2d(nx, ny) * amp;
            max_amp += amp;
            amp *= s.persistence;
            freq *= s.lacunarity;
        }
        let n = if max_amp > 0.0 { sum / max_amp } else { sum };
        (n * 0.5 + 0.5).clamp(0.0, 1.0)
    }
}

impl HeightSampler for NoiseSampler {
    fn sample(&self, tile: TileCoord, x: usize, row: usize) -> f32 {
        let (wx, wn) = self.world_position(tile, x, row);
        self.sample_world(wx as f32, wn as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> NoiseSettings {
        NoiseSettings {
            seed: 1337,
            scale: 25.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            offset: [3.0, -7.0],
        }
    }

    #[test]
    fn samples_stay_in_unit_range() {
        let s = NoiseSampler::new(settings(), 16, 19);
        for x in 0..19 {
            for row in 0..19 {
                let h = s.sample(TileCoord::new(-2, 3), x, row);
                assert!((0.0..=1.0).contains(&h));
            }
        }
    }

    #[test]
    fn east_seam_samples_are_shared() {
        let s = NoiseSampler::new(settings(), 16, 19);
        let a = TileCoord::new(0, 0);
        let b = TileCoord::new(1, 0);
        for row in 0..19 {
            for k in 0..3 {
                assert_eq!(s.sample(a, 16 + k, row), s.sample(b, k, row));
            }
        }
    }

    #[test]
    fn north_seam_samples_are_shared() {
        let s = NoiseSampler::new(settings(), 16, 19);
        let a = TileCoord::new(4, -1);
        let b = a.offset(0, 1);
        for x in 0..19 {
            // The northern row of the lower tile is row 16 of the tile above.
            assert_eq!(s.sample(a, x, 0), s.sample(b, x, 16));
        }
    }

    #[test]
    fn seed_changes_output() {
        let a = NoiseSampler::new(settings(), 16, 19);
        let mut other = settings();
        other.seed = 7;
        let b = NoiseSampler::new(other, 16, 19);
        let t = TileCoord::new(0, 0);
        let differs = (0..19).any(|x| a.sample(t, x, 5) != b.sample(t, x, 5));
        assert!(differs);
    }
}
