use std::sync::Arc;
use std::time::{Duration, Instant};

use hashbrown::{HashMap, HashSet};
use rivulet_hydro::{Tile, graph, patch, stitch};
use rivulet_lattice::{CellRef, Side, TileCoord, TileLattice};
use rivulet_runtime::{Runtime, TileJob, TileRecipe};
use rivulet_terrain::{HeightSampler, HydroParams};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub loaded: usize,
    pub pending: usize,
    pub fully_resolved: usize,
    pub rivers: usize,
    pub seams_stitched: u64,
    pub cells_patched: u64,
}

/// What one call to [`TerrainContext::update`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub submitted: usize,
    pub arrived: usize,
    pub stitched: usize,
    pub patched: usize,
}

/// Result of walking every loaded cell's cross-tile links.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Audit {
    pub cells: usize,
    pub max_residual: f32,
    pub two_cycles: usize,
}

impl Audit {
    pub fn is_clean(&self, tolerance: f32) -> bool {
        self.two_cycles == 0 && self.max_residual <= tolerance
    }
}

/// Tile map and viewer for one streamed world. Only the thread calling
/// [`TerrainContext::update`] ever touches the tiles after hand-off.
pub struct TerrainContext {
    params: Arc<HydroParams>,
    lattice: TileLattice,
    runtime: Runtime,
    sampler: Option<Arc<dyn HeightSampler>>,
    tiles: HashMap<TileCoord, Tile>,
    pending: HashSet<TileCoord>,
    viewer: (f32, f32),
    last_refresh: Option<(f32, f32)>,
    rev: u64,
    next_job_id: u64,
    tick: u64,
    stats: StreamStats,
}

fn lattice_for(params: &HydroParams) -> TileLattice {
    let n = params.flow_size();
    TileLattice::new(n, n, params.overlap)
}

fn runtime_for(params: &HydroParams, sampler: Option<&Arc<dyn HeightSampler>>) -> Runtime {
    let recipe = match sampler {
        Some(s) => TileRecipe::with_sampler(params, Arc::clone(s)),
        None => TileRecipe::from_params(params),
    };
    Runtime::new(Arc::new(recipe), params.workers)
}

impl TerrainContext {
    pub fn new(params: HydroParams) -> Self {
        Self::build(params, None)
    }

    /// Streams heights from `sampler` instead of the configured noise.
    pub fn with_sampler(params: HydroParams, sampler: Arc<dyn HeightSampler>) -> Self {
        Self::build(params, Some(sampler))
    }

    fn build(params: HydroParams, sampler: Option<Arc<dyn HeightSampler>>) -> Self {
        let runtime = runtime_for(&params, sampler.as_ref());
        Self {
            lattice: lattice_for(&params),
            params: Arc::new(params),
            runtime,
            sampler,
            tiles: HashMap::new(),
            pending: HashSet::new(),
            viewer: (0.0, 0.0),
            last_refresh: None,
            rev: 0,
            next_job_id: 0,
            tick: 0,
            stats: StreamStats::default(),
        }
    }

    pub fn lattice(&self) -> &TileLattice {
        &self.lattice
    }

    pub fn viewer(&self) -> (f32, f32) {
        self.viewer
    }

    /// Viewer position in height samples, east then north.
    pub fn set_viewer(&mut self, x: f32, north: f32) {
        self.viewer = (x, north);
    }

    pub fn viewer_tile(&self) -> TileCoord {
        let p = self.params.tile_pitch as f32;
        TileCoord::new((self.viewer.0 / p).floor() as i32, (self.viewer.1 / p).floor() as i32)
    }

    pub fn tile(&self, coord: TileCoord) -> Option<&Tile> {
        self.tiles.get(&coord)
    }

    pub fn rev(&self) -> u64 {
        self.rev
    }

    /// Nothing requested is still outstanding.
    pub fn is_settled(&self) -> bool {
        self.pending.is_empty() && self.runtime.is_idle()
    }

    pub fn stats(&self) -> StreamStats {
        StreamStats {
            loaded: self.tiles.len(),
            pending: self.pending.len(),
            fully_resolved: self.tiles.values().filter(|t| t.borders.is_fully_resolved()).count(),
            rivers: self.tiles.values().map(|t| t.rivers.len()).sum(),
            ..self.stats
        }
    }

    /// Drops every tile and restarts generation with `params` on a fresh
    /// worker pool. Jobs queued on the old pool are never drained.
    pub fn reload(&mut self, params: HydroParams) {
        self.rev += 1;
        self.tiles.clear();
        self.pending.clear();
        self.last_refresh = None;
        self.lattice = lattice_for(&params);
        self.runtime = runtime_for(&params, self.sampler.as_ref());
        self.params = Arc::new(params);
        log::info!(
            target: "stream",
            "[tick {}] reload rev={} pitch={} step={} overlap={}",
            self.tick,
            self.rev,
            self.params.tile_pitch,
            self.params.step,
            self.params.overlap
        );
    }

    /// One streaming tick: request tiles around the viewer, take finished
    /// tiles, then resolve every seam whose two tiles are both present.
    pub fn update(&mut self) -> UpdateReport {
        self.tick += 1;
        let mut report = UpdateReport::default();
        if self.needs_refresh() {
            report.submitted = self.refresh();
        }
        report.arrived = self.drain();
        let (stitched, patched) = self.border_pass();
        report.stitched = stitched;
        report.patched = patched;
        report
    }

    fn needs_refresh(&self) -> bool {
        match self.last_refresh {
            None => true,
            Some((x, n)) => {
                let (dx, dn) = (self.viewer.0 - x, self.viewer.1 - n);
                (dx * dx + dn * dn).sqrt() > self.params.move_threshold
            }
        }
    }

    /// Coordinates that should be loaded, nearest first.
    pub fn desired_tiles(&self) -> Vec<TileCoord> {
        let center = self.viewer_tile();
        let r = self.params.view_radius();
        let mut want = Vec::with_capacity(((2 * r + 1) * (2 * r + 1)) as usize);
        for dy in -r..=r {
            for dx in -r..=r {
                want.push(center.offset(dx, dy));
            }
        }
        want.sort_by_key(|c| (c.distance_sq(center), c.ty, c.tx));
        want
    }

    fn refresh(&mut self) -> usize {
        self.last_refresh = Some(self.viewer);
        let mut submitted = 0;
        for coord in self.desired_tiles() {
            if self.tiles.contains_key(&coord) || self.pending.contains(&coord) {
                continue;
            }
            let job_id = self.next_job_id;
            self.next_job_id += 1;
            self.runtime.submit(TileJob {
                coord,
                rev: self.rev,
                job_id,
            });
            self.pending.insert(coord);
            submitted += 1;
        }
        if submitted > 0 {
            log::debug!(
                target: "stream",
                "[tick {}] requested {} tiles around {}",
                self.tick,
                submitted,
                self.viewer_tile()
            );
        }
        submitted
    }

    fn drain(&mut self) -> usize {
        let mut arrived = 0;
        for out in self.runtime.drain_results() {
            self.pending.remove(&out.coord);
            log::info!(
                target: "perf",
                "tile_ms={} sample_ms={} flow_ms={} rivers_ms={} tile={} job={} rev={}",
                out.t_total_ms,
                out.t_sample_ms,
                out.t_flow_ms,
                out.t_rivers_ms,
                out.coord,
                out.job_id,
                out.rev
            );
            self.tiles.insert(out.coord, out.tile);
            arrived += 1;
        }
        arrived
    }

    fn border_pass(&mut self) -> (usize, usize) {
        let mut open: Vec<TileCoord> = self
            .tiles
            .iter()
            .filter(|(_, t)| !t.borders.is_fully_resolved())
            .map(|(&c, _)| c)
            .collect();
        open.sort_by_key(|c| (c.ty, c.tx));

        let (mut stitched, mut patched) = (0, 0);
        for coord in open {
            for side in Side::ALL {
                if let Some(changed) = self.resolve_side(coord, side) {
                    stitched += 1;
                    patched += changed;
                }
            }
        }
        (stitched, patched)
    }

    /// Stitches and patches one seam if it is open and both tiles are here.
    /// Returns the number of cells whose accumulation changed.
    fn resolve_side(&mut self, coord: TileCoord, side: Side) -> Option<usize> {
        if self.tiles.get(&coord)?.borders.is_resolved(side) {
            return None;
        }
        let other = coord.neighbor(side);
        let [a, b] = self.tiles.get_many_mut([&coord, &other])?;
        let seam = stitch(Some(a), Some(b), side, &self.lattice)?;
        let report = patch(&mut self.tiles, &seam, &self.lattice);
        for c in &report.tiles {
            if let Some(t) = self.tiles.get_mut(c) {
                t.retrace(self.params.river_threshold);
            }
        }
        self.stats.seams_stitched += 1;
        self.stats.cells_patched += report.changed as u64;
        log::info!(
            target: "stream",
            "[tick {}] seam {} {} -> {} directions changed={} affected={} accum changed={}",
            self.tick,
            coord,
            side,
            other,
            seam.changed,
            report.affected,
            report.changed
        );
        Some(report.changed)
    }

    /// Keeps updating until every requested tile has arrived and been
    /// stitched, or `timeout` passes. Returns whether it settled.
    pub fn settle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.update();
            if self.is_settled() {
                // Seams of the last arrivals.
                self.update();
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    /// Checks every loaded cell for flow conservation and two-cell loops.
    pub fn audit(&self) -> Audit {
        let mut audit = Audit::default();
        for (&coord, tile) in &self.tiles {
            for y in 0..tile.flow.height() {
                for x in 0..tile.flow.width() {
                    let cell = CellRef::new(coord, x, y);
                    audit.cells += 1;
                    if let Some(r) = graph::conservation_residual(&self.tiles, &self.lattice, cell) {
                        audit.max_residual = audit.max_residual.max(r.abs());
                    }
                    if let Some(d) = graph::downstream(&self.tiles, &self.lattice, cell) {
                        if graph::downstream(&self.tiles, &self.lattice, d) == Some(cell) {
                            audit.two_cycles += 1;
                        }
                    }
                }
            }
        }
        audit
    }
}
