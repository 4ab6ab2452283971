use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::noise::{NoiseSampler, NoiseSettings};
use crate::response::{HeightResponse, ResponseCurve};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("response curve must not descend (key {index})")]
    NonMonotoneCurve { index: usize },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RivuletConfig {
    #[serde(default)]
    pub world: World,
    #[serde(default)]
    pub noise: Noise,
    #[serde(default)]
    pub response: Response,
    #[serde(default)]
    pub rivers: Rivers,
    #[serde(default)]
    pub streaming: Streaming,
}

#[derive(Clone, Debug, Deserialize)]
pub struct World {
    #[serde(default)]
    pub seed: i32,
    /// Raw samples between neighbouring tile origins.
    #[serde(default = "default_tile_pitch")]
    pub tile_pitch: usize,
    #[serde(default = "default_step")]
    pub step: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}
fn default_tile_pitch() -> usize {
    64
}
fn default_step() -> usize {
    2
}
fn default_overlap() -> usize {
    2
}
impl Default for World {
    fn default() -> Self {
        Self {
            seed: 0,
            tile_pitch: default_tile_pitch(),
            step: default_step(),
            overlap: default_overlap(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Noise {
    #[serde(default = "default_scale")]
    pub scale: f32,
    #[serde(default = "default_octaves")]
    pub octaves: u32,
    #[serde(default = "default_persistence")]
    pub persistence: f32,
    #[serde(default = "default_lacunarity")]
    pub lacunarity: f32,
    #[serde(default)]
    pub offset: [f32; 2],
}
fn default_scale() -> f32 {
    40.0
}
fn default_octaves() -> u32 {
    4
}
fn default_persistence() -> f32 {
    0.5
}
fn default_lacunarity() -> f32 {
    2.0
}
impl Default for Noise {
    fn default() -> Self {
        Self {
            scale: default_scale(),
            octaves: default_octaves(),
            persistence: default_persistence(),
            lacunarity: default_lacunarity(),
            offset: [0.0, 0.0],
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Response {
    #[serde(default = "default_curve")]
    pub curve: Vec<[f32; 2]>,
    #[serde(default = "default_multiplier")]
    pub multiplier: f32,
    #[serde(default = "default_world_scale")]
    pub world_scale: f32,
}
fn default_curve() -> Vec<[f32; 2]> {
    vec![[0.0, 0.0], [0.4, 0.1], [1.0, 1.0]]
}
fn default_multiplier() -> f32 {
    12.0
}
fn default_world_scale() -> f32 {
    5.0
}
impl Default for Response {
    fn default() -> Self {
        Self {
            curve: default_curve(),
            multiplier: default_multiplier(),
            world_scale: default_world_scale(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Rivers {
    #[serde(default = "default_threshold")]
    pub threshold: f32,
}
fn default_threshold() -> f32 {
    20.0
}
impl Default for Rivers {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Streaming {
    #[serde(default = "default_view_distance")]
    pub view_distance: f32,
    #[serde(default = "default_move_threshold")]
    pub move_threshold: f32,
    #[serde(default = "default_workers")]
    pub workers: usize,
}
fn default_view_distance() -> f32 {
    192.0
}
fn default_move_threshold() -> f32 {
    25.0
}
fn default_workers() -> usize {
    4
}
impl Default for Streaming {
    fn default() -> Self {
        Self {
            view_distance: default_view_distance(),
            move_threshold: default_move_threshold(),
            workers: default_workers(),
        }
    }
}

impl RivuletConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.world;
        if w.step < 1 {
            return Err(invalid("world.step", "must be at least 1"));
        }
        if w.tile_pitch == 0 {
            return Err(invalid("world.tile_pitch", "must be positive"));
        }
        if w.tile_pitch % w.step != 0 {
            return Err(invalid(
                "world.tile_pitch",
                format!("{} is not a multiple of step {}", w.tile_pitch, w.step),
            ));
        }
        let n = &self.noise;
        if !(n.scale > 0.0) {
            return Err(invalid("noise.scale", "must be positive"));
        }
        if n.octaves < 1 {
            return Err(invalid("noise.octaves", "must be at least 1"));
        }
        if n.lacunarity < 1.0 {
            return Err(invalid("noise.lacunarity", "must be at least 1"));
        }
        if !(n.persistence > 0.0) {
            return Err(invalid("noise.persistence", "must be positive"));
        }
        let r = &self.response;
        if !(r.multiplier > 0.0) || !(r.world_scale > 0.0) {
            return Err(invalid("response", "multiplier and world_scale must be positive"));
        }
        if let Some(index) = self.curve().first_descent() {
            return Err(ConfigError::NonMonotoneCurve { index });
        }
        if !(self.rivers.threshold > 0.0) {
            return Err(invalid("rivers.threshold", "must be positive"));
        }
        if self.streaming.view_distance < 0.0 || self.streaming.move_threshold < 0.0 {
            return Err(invalid("streaming", "distances must not be negative"));
        }
        Ok(())
    }

    fn curve(&self) -> ResponseCurve {
        ResponseCurve::new(self.response.curve.iter().map(|k| (k[0], k[1])).collect())
    }
}

// Flattened params used by workers and the streaming loop (snapshot of config)
#[derive(Clone, Debug)]
pub struct HydroParams {
    pub tile_pitch: usize,
    pub step: usize,
    pub overlap: usize,
    pub noise: NoiseSettings,
    pub response: Arc<HeightResponse>,
    pub river_threshold: f32,
    pub view_distance: f32,
    pub move_threshold: f32,
    pub workers: usize,
}

impl Default for HydroParams {
    fn default() -> Self {
        Self::from_config(&RivuletConfig::default())
    }
}

impl HydroParams {
    pub fn from_config(cfg: &RivuletConfig) -> Self {
        Self {
            tile_pitch: cfg.world.tile_pitch,
            step: cfg.world.step.max(1),
            overlap: cfg.world.overlap.max(1),
            noise: NoiseSettings {
                seed: cfg.world.seed,
                scale: cfg.noise.scale,
                octaves: cfg.noise.octaves,
                persistence: cfg.noise.persistence,
                lacunarity: cfg.noise.lacunarity,
                offset: cfg.noise.offset,
            },
            response: Arc::new(HeightResponse::new(
                cfg.curve(),
                cfg.response.multiplier,
                cfg.response.world_scale,
            )),
            river_threshold: cfg.rivers.threshold,
            view_distance: cfg.streaming.view_distance,
            move_threshold: cfg.streaming.move_threshold,
            workers: cfg.streaming.workers.max(1),
        }
    }

    pub fn seed(&self) -> i32 {
        self.noise.seed
    }

    /// Side length of a tile's raw height grid.
    pub fn height_grid_size(&self) -> usize {
        self.tile_pitch + self.overlap * self.step + 1
    }

    /// Side length of a tile's flow grid.
    pub fn flow_size(&self) -> usize {
        (self.height_grid_size() - 1) / self.step + 1
    }

    /// Tiles loaded in each direction around the viewer's tile.
    pub fn view_radius(&self) -> i32 {
        (self.view_distance / self.tile_pitch as f32).round() as i32
    }

    pub fn noise_sampler(&self) -> NoiseSampler {
        NoiseSampler::new(self.noise.clone(), self.tile_pitch, self.height_grid_size())
    }
}

pub fn parse_config(text: &str) -> Result<RivuletConfig, ConfigError> {
    let cfg: RivuletConfig = toml::from_str(text)?;
    cfg.validate()?;
    Ok(cfg)
}

pub fn load_config_from_path(path: &Path) -> Result<RivuletConfig, ConfigError> {
    let s = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&s)
}

pub fn load_params_from_path(path: &Path) -> Result<HydroParams, ConfigError> {
    let cfg = load_config_from_path(path)?;
    log::info!(
        target: "config",
        "loaded {:?}: pitch={} step={} overlap={} threshold={}",
        path,
        cfg.world.tile_pitch,
        cfg.world.step,
        cfg.world.overlap,
        cfg.rivers.threshold
    );
    Ok(HydroParams::from_config(&cfg))
}
