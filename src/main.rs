mod context;
mod debug_view;
mod watch;

use std::error::Error;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::Parser;
use rivulet_lattice::TileCoord;
use rivulet_terrain::{HydroParams, RivuletConfig, load_config_from_path};
use simplelog::{ColorChoice, CombinedLogger, Config, LevelFilter, TermLogger, TerminalMode, WriteLogger};

use crate::context::TerrainContext;
use crate::watch::ConfigWatch;

#[derive(Parser, Debug)]
#[command(author, version, about = "Stream terrain tiles and keep their drainage consistent across seams")]
struct Cli {
    /// TOML config; built-in defaults when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value_t = 240)]
    ticks: u64,
    /// Sleep between ticks.
    #[arg(long, default_value_t = 16)]
    tick_ms: u64,
    /// Viewer speed in height samples per tick.
    #[arg(long, default_value_t = 2.0)]
    speed: f32,
    /// Degrees counterclockwise from east.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    heading: f32,
    #[arg(long)]
    seed: Option<i32>,
    #[arg(long)]
    workers: Option<usize>,
    /// River accumulation threshold.
    #[arg(long, allow_hyphen_values = true)]
    threshold: Option<f32>,
    /// Print ASCII flow and accumulation for a tile, as `tx,ty`. Repeatable.
    #[arg(long, value_parser = parse_coord, allow_hyphen_values = true)]
    dump: Vec<TileCoord>,
    /// Also write debug logs to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Reload and regenerate when the config file changes.
    #[arg(long)]
    watch_config: bool,
    /// Seconds to wait for outstanding tiles after the last tick.
    #[arg(long, default_value_t = 10)]
    settle_secs: u64,
    /// Fail unless every loaded cell conserves flow and no seam has a two-cell loop.
    #[arg(long)]
    check: bool,
}

fn parse_coord(s: &str) -> Result<TileCoord, String> {
    let (x, y) = s.split_once(',').ok_or_else(|| format!("expected tx,ty, got {s:?}"))?;
    let tx = x.trim().parse::<i32>().map_err(|e| format!("bad tx {x:?}: {e}"))?;
    let ty = y.trim().parse::<i32>().map_err(|e| format!("bad ty {y:?}: {e}"))?;
    Ok(TileCoord::new(tx, ty))
}

fn init_logging(log_file: Option<&Path>) -> Result<(), Box<dyn Error>> {
    match log_file {
        Some(path) => {
            let file = File::create(path)?;
            CombinedLogger::init(vec![
                TermLogger::new(LevelFilter::Info, Config::default(), TerminalMode::Mixed, ColorChoice::Auto),
                WriteLogger::new(LevelFilter::Debug, Config::default(), file),
            ])?;
        }
        None => env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init(),
    }
    Ok(())
}

fn apply_overrides(cfg: &mut RivuletConfig, cli: &Cli) {
    if let Some(seed) = cli.seed {
        cfg.world.seed = seed;
    }
    if let Some(workers) = cli.workers {
        cfg.streaming.workers = workers;
    }
    if let Some(t) = cli.threshold {
        cfg.rivers.threshold = t;
    }
}

fn load_config(cli: &Cli) -> Result<RivuletConfig, Box<dyn Error>> {
    let mut cfg = match &cli.config {
        Some(path) => load_config_from_path(path)?,
        None => RivuletConfig::default(),
    };
    apply_overrides(&mut cfg, cli);
    cfg.validate()?;
    Ok(cfg)
}

fn reload_if_changed(watch: &ConfigWatch, cli: &Cli, ctx: &mut TerrainContext) {
    let Some(mut cfg) = watch.poll() else {
        return;
    };
    apply_overrides(&mut cfg, cli);
    match cfg.validate() {
        Ok(()) => ctx.reload(HydroParams::from_config(&cfg)),
        Err(e) => log::warn!("ignoring reloaded config from {}: {}", watch.path().display(), e),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    let cfg = load_config(&cli)?;
    let params = HydroParams::from_config(&cfg);
    log::info!(
        "seed={} pitch={} step={} overlap={} flow={}x{} view_radius={} workers={}",
        params.seed(),
        params.tile_pitch,
        params.step,
        params.overlap,
        params.flow_size(),
        params.flow_size(),
        params.view_radius(),
        params.workers
    );
    let mut ctx = TerrainContext::new(params);

    let watch = match (&cli.config, cli.watch_config) {
        (Some(path), true) => Some(ConfigWatch::spawn(path.clone())),
        (None, true) => {
            log::warn!("--watch-config has no effect without --config");
            None
        }
        _ => None,
    };

    let heading = cli.heading.to_radians();
    let (vx, vn) = (heading.cos() * cli.speed, heading.sin() * cli.speed);
    let t0 = Instant::now();
    for tick in 0..cli.ticks {
        if let Some(w) = &watch {
            reload_if_changed(w, &cli, &mut ctx);
        }
        let (x, n) = ctx.viewer();
        ctx.set_viewer(x + vx, n + vn);
        let r = ctx.update();
        if r.submitted > 0 || r.arrived > 0 || r.stitched > 0 {
            log::trace!(
                target: "stream",
                "[tick {}] submitted={} arrived={} stitched={} patched={}",
                tick,
                r.submitted,
                r.arrived,
                r.stitched,
                r.patched
            );
        }
        if cli.tick_ms > 0 {
            std::thread::sleep(Duration::from_millis(cli.tick_ms));
        }
    }
    if !ctx.settle(Duration::from_secs(cli.settle_secs)) {
        log::warn!("tiles still outstanding after {}s", cli.settle_secs);
    }

    let s = ctx.stats();
    let (x, n) = ctx.viewer();
    println!("ran {} ticks in {:.2}s", cli.ticks, t0.elapsed().as_secs_f32());
    println!("viewer at ({:.1}, {:.1}) in tile {}", x, n, ctx.viewer_tile());
    println!(
        "tiles: loaded={} pending={} fully_resolved={} grid={}x{} rev={}",
        s.loaded,
        s.pending,
        s.fully_resolved,
        ctx.lattice().width(),
        ctx.lattice().height(),
        ctx.rev()
    );
    println!(
        "seams stitched={} accumulation cells patched={}",
        s.seams_stitched, s.cells_patched
    );
    println!("rivers={}", s.rivers);

    for coord in &cli.dump {
        match ctx.tile(*coord) {
            Some(tile) => print!("\n{}", debug_view::render_tile(tile)),
            None => println!("\ntile {coord} not loaded"),
        }
    }

    if cli.check {
        let audit = ctx.audit();
        println!(
            "audit: cells={} max_residual={:.2e} two_cycles={}",
            audit.cells, audit.max_residual, audit.two_cycles
        );
        if !audit.is_clean(1e-3) {
            return Err(format!("drainage audit failed: {audit:?}").into());
        }
    }
    Ok(())
}
