//! Tile generation workers and the completion queue drained by the main loop.
#![forbid(unsafe_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, unbounded};
use rayon::{ThreadPool, ThreadPoolBuilder};
use rivulet_hydro::{FlowField, Tile, trace};
use rivulet_lattice::TileCoord;
use rivulet_terrain::{HeightGrid, HeightResponse, HeightSampler, HydroParams};

/// Everything a worker needs to turn a coordinate into a tile.
pub struct TileRecipe {
    pub sampler: Arc<dyn HeightSampler>,
    pub response: Arc<HeightResponse>,
    pub grid_size: usize,
    pub step: usize,
    pub river_threshold: f32,
}

impl TileRecipe {
    pub fn from_params(params: &HydroParams) -> Self {
        Self {
            sampler: Arc::new(params.noise_sampler()),
            response: Arc::clone(&params.response),
            grid_size: params.height_grid_size(),
            step: params.step,
            river_threshold: params.river_threshold,
        }
    }

    pub fn with_sampler(params: &HydroParams, sampler: Arc<dyn HeightSampler>) -> Self {
        Self {
            sampler,
            ..Self::from_params(params)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileJob {
    pub coord: TileCoord,
    pub rev: u64,
    pub job_id: u64,
}

pub struct TileJobOut {
    pub coord: TileCoord,
    pub rev: u64,
    pub job_id: u64,
    pub tile: Tile,
    pub t_total_ms: u32,
    pub t_sample_ms: u32,
    pub t_flow_ms: u32,
    pub t_rivers_ms: u32,
}

#[inline]
fn ms_since(t0: Instant) -> u32 {
    t0.elapsed().as_millis().min(u128::from(u32::MAX)) as u32
}

fn process_tile_job(job: TileJob, recipe: &TileRecipe, tx: &Sender<TileJobOut>) {
    let TileJob { coord, rev, job_id } = job;
    let t_job_start = Instant::now();

    let t0 = Instant::now();
    let heights = Arc::new(HeightGrid::sample(
        recipe.sampler.as_ref(),
        coord,
        recipe.grid_size,
        recipe.grid_size,
    ));
    let t_sample_ms = ms_since(t0);

    let t0 = Instant::now();
    let flow = FlowField::build(&heights, Arc::clone(&recipe.response), recipe.step);
    let t_flow_ms = ms_since(t0);

    let t0 = Instant::now();
    let rivers = trace(&flow, recipe.river_threshold);
    let t_rivers_ms = ms_since(t0);

    let tile = Tile::new(coord, heights, flow, rivers);
    let t_total_ms = ms_since(t_job_start);
    // The receiver is gone only when the runtime was dropped mid-job.
    let _ = tx.send(TileJobOut {
        coord,
        rev,
        job_id,
        tile,
        t_total_ms,
        t_sample_ms,
        t_flow_ms,
        t_rivers_ms,
    });
}

pub struct Runtime {
    job_tx: Sender<TileJob>,
    res_rx: Receiver<TileJobOut>,
    _pool: Arc<ThreadPool>,
    queued: Arc<AtomicUsize>,
    inflight: Arc<AtomicUsize>,
    recipe: Arc<TileRecipe>,
    pub workers: usize,
}

impl Runtime {
    pub fn new(recipe: Arc<TileRecipe>, workers: usize) -> Self {
        let workers = workers.max(1);
        let (job_tx, job_rx) = unbounded::<TileJob>();
        let (res_tx, res_rx) = unbounded::<TileJobOut>();
        let queued_ctr = Arc::new(AtomicUsize::new(0));
        let inflight_ctr = Arc::new(AtomicUsize::new(0));

        let pool = Arc::new(
            ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("rivulet-tile-{i}"))
                .build()
                .expect("tile pool"),
        );
        for _ in 0..workers {
            let rx = job_rx.clone();
            let tx = res_tx.clone();
            let recipe = Arc::clone(&recipe);
            let queued = queued_ctr.clone();
            let inflight = inflight_ctr.clone();
            pool.spawn(move || {
                while let Ok(job) = rx.recv() {
                    queued.fetch_sub(1, Ordering::Relaxed);
                    inflight.fetch_add(1, Ordering::Relaxed);
                    process_tile_job(job, recipe.as_ref(), &tx);
                    inflight.fetch_sub(1, Ordering::Relaxed);
                }
            });
        }
        log::info!(target: "runtime", "started {} tile workers", workers);

        Self {
            job_tx,
            res_rx,
            _pool: pool,
            queued: queued_ctr,
            inflight: inflight_ctr,
            recipe,
            workers,
        }
    }

    pub fn submit(&self, job: TileJob) {
        self.queued.fetch_add(1, Ordering::Relaxed);
        if self.job_tx.send(job).is_err() {
            self.queued.fetch_sub(1, Ordering::Relaxed);
        }
    }

    /// Completed tiles in the order workers finished them.
    pub fn drain_results(&self) -> Vec<TileJobOut> {
        self.res_rx.try_iter().collect()
    }

    /// `(queued, in flight)`.
    pub fn queue_counts(&self) -> (usize, usize) {
        (
            self.queued.load(Ordering::Relaxed),
            self.inflight.load(Ordering::Relaxed),
        )
    }

    /// No queued or running jobs and no undrained results.
    pub fn is_idle(&self) -> bool {
        let (q, f) = self.queue_counts();
        q == 0 && f == 0 && self.res_rx.is_empty()
    }

    pub fn recipe(&self) -> &Arc<TileRecipe> {
        &self.recipe
    }
}
