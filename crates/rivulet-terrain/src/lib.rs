//! Height fields for tiles: samplers, the shared height response, and TOML parameters.
#![forbid(unsafe_code)]

pub mod config;
mod grid;
mod noise;
mod response;

pub use config::{
    ConfigError, HydroParams, RivuletConfig, load_config_from_path, load_params_from_path, parse_config,
};
pub use grid::{HeightGrid, HeightSampler};
pub use noise::{NoiseSampler, NoiseSettings};
pub use response::{HeightResponse, ResponseCurve};
