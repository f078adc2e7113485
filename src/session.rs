//! Planning session
//!
//! A [`Session`] is built from one [`SprayConfig`]. It owns the grid with one
//! mask per configured sample, the spray model and the stride currently
//! chosen for each sample. Strides come from an optimization run, from a
//! result store or from the caller.

use sprayplan_camtools::{
    DepositionScheduler, MotionProgramGenerator, MotionProgramParameters, OptimizationResult,
    Scoring, SerpentineParameters, SerpentinePath, SerpentinePlanner, StrideOptimizer,
};
use sprayplan_core::error::ensure_positive;
use sprayplan_core::{
    CancellationToken, Deposition, Error, Grid, Result, SharedProgressCallback, SprayModel,
};
use sprayplan_settings::{MaskRecord, OptimizationRecord, ResultStore, SprayConfig};
use tracing::{debug, info};

/// How a stride sweep is run.
#[derive(Default, Clone)]
pub struct OptimizeOptions {
    pub scoring: Scoring,
    pub parallel: bool,
    /// Where each finished sweep is written
    pub store: Option<ResultStore>,
    /// Called with `(candidate_index, candidate_count)` for every sample
    pub progress: Option<SharedProgressCallback>,
    pub cancel: Option<CancellationToken>,
}

/// Grid, masks, spray model and strides for one configuration.
#[derive(Debug)]
pub struct Session {
    config: SprayConfig,
    grid: Grid,
    spray: SprayModel,
    names: Vec<String>,
    strides: Vec<Option<f64>>,
}

impl Session {
    /// Validates `config` and rasterizes every sample onto a fresh grid.
    pub fn from_config(config: SprayConfig) -> Result<Self> {
        config.validate()?;
        let mut grid = Grid::new(config.bed_size, config.grid_step)?;
        let mut names = Vec::with_capacity(config.samples.len());
        for (i, sample) in config.samples.iter().enumerate() {
            let name = sample.display_name(i);
            grid.add_mask(name.clone(), sample.to_shape())?;
            names.push(name);
        }
        let spray = config.spray_model()?;

        info!(
            bed_size = grid.bed_size(),
            cells_per_axis = grid.cells_per_axis(),
            samples = names.len(),
            spray = %spray.kind(),
            "session ready"
        );

        Ok(Self {
            strides: vec![None; names.len()],
            config,
            grid,
            spray,
            names,
        })
    }

    pub fn config(&self) -> &SprayConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn spray(&self) -> &SprayModel {
        &self.spray
    }

    pub fn sample_count(&self) -> usize {
        self.names.len()
    }

    pub fn sample_names(&self) -> &[String] {
        &self.names
    }

    /// Current stride per sample, `None` until one is chosen.
    pub fn strides(&self) -> &[Option<f64>] {
        &self.strides
    }

    /// Path parameters for sample `index` at `stride`.
    pub fn path_parameters(&self, index: usize, stride: f64) -> Result<SerpentineParameters> {
        let sample = self.config.samples.get(index).ok_or_else(|| {
            Error::configuration(format!(
                "sample index {} out of range ({} samples configured)",
                index,
                self.sample_count()
            ))
        })?;
        Ok(SerpentineParameters {
            margin: sample.margin,
            stride,
            sample_count: sample.x_amount,
            passes: sample.passes,
            speed: self.config.speed,
            alternate_offset: sample.alternate_offset,
        })
    }

    /// Sweeps the configured stride candidates for sample `index` and keeps the best.
    pub fn optimize_sample(
        &mut self,
        index: usize,
        options: &OptimizeOptions,
    ) -> Result<OptimizationResult> {
        let candidates = self.config.candidate_strides(index)?;
        let first = candidates.first().copied().unwrap_or(self.config.strides.start());
        let template = self.path_parameters(index, first)?;
        let mask = self.grid.require_mask(index)?;

        let mut optimizer =
            StrideOptimizer::new(&self.grid, &self.spray, self.config.z_height, template)
                .with_scoring(options.scoring)
                .parallel(options.parallel);
        if let Some(progress) = &options.progress {
            let progress = progress.clone();
            optimizer = optimizer.on_progress(Box::new(move |i: usize, n: usize| progress(i, n)));
        }
        if let Some(token) = &options.cancel {
            optimizer = optimizer.with_cancellation(token.clone());
        }
        if let Some(store) = &options.store {
            let store = store.clone();
            let mask_record = MaskRecord::from_mask(mask, &self.grid);
            let persist = move |result: &OptimizationResult| -> anyhow::Result<()> {
                let record = OptimizationRecord::new(
                    result.timestamp,
                    result.series(),
                    result.best_stride,
                    result.best_deviation,
                    vec![mask_record.clone()],
                );
                let path = store.save(&record)?;
                info!(path = %path.display(), "wrote optimization result");
                Ok(())
            };
            optimizer = optimizer.on_persist(Box::new(persist));
        }

        let result = optimizer.optimize(mask, &candidates)?;
        self.strides[index] = Some(result.best_stride);
        Ok(result)
    }

    /// Optimizes every sample in order. Stops at the first sample that fails.
    pub fn optimize_all(&mut self, options: &OptimizeOptions) -> Result<Vec<OptimizationResult>> {
        let mut results = Vec::with_capacity(self.sample_count());
        for index in 0..self.sample_count() {
            results.push(self.optimize_sample(index, options)?);
        }
        Ok(results)
    }

    /// Sets one stride per sample.
    pub fn apply_strides(&mut self, strides: &[f64]) -> Result<()> {
        if strides.len() != self.sample_count() {
            return Err(Error::configuration(format!(
                "{} strides given for {} samples",
                strides.len(),
                self.sample_count()
            )));
        }
        for (i, &stride) in strides.iter().enumerate() {
            ensure_positive(&format!("strides[{}]", i), stride)?;
        }
        self.strides = strides.iter().copied().map(Some).collect();
        debug!(?strides, "applied strides");
        Ok(())
    }

    /// Takes the most recent stored best stride for every sample the store knows.
    ///
    /// Returns how many samples received a stride.
    pub fn load_strides(&mut self, store: &ResultStore) -> Result<usize> {
        let names: Vec<&str> = self.names.iter().map(String::as_str).collect();
        let stored = store.best_strides(&names)?;
        let mut loaded = 0;
        for (slot, stride) in self.strides.iter_mut().zip(stored) {
            if let Some(stride) = stride {
                *slot = Some(stride);
                loaded += 1;
            }
        }
        debug!(loaded, dir = %store.dir().display(), "loaded stored strides");
        Ok(loaded)
    }

    /// Serpentine paths for every sample at its current stride.
    pub fn paths(&self) -> Result<Vec<SerpentinePath>> {
        (0..self.sample_count())
            .map(|i| {
                let stride = self.strides[i].ok_or_else(|| {
                    Error::configuration(format!(
                        "sample '{}' has no stride; optimize it or apply strides first",
                        self.names[i]
                    ))
                })?;
                self.plan(i, stride)
            })
            .collect()
    }

    /// Whole-bed deposition with every sample swept at `stride`.
    pub fn simulate_stride(&self, stride: f64) -> Result<Deposition> {
        let paths = (0..self.sample_count())
            .map(|i| self.plan(i, stride))
            .collect::<Result<Vec<_>>>()?;
        self.scheduler().simulate_paths(&paths)
    }

    /// Whole-bed deposition at the current strides.
    pub fn simulate(&self) -> Result<Deposition> {
        self.scheduler().simulate_paths(&self.paths()?)
    }

    /// G-code parameters taken from the configuration.
    pub fn motion_parameters(&self) -> MotionProgramParameters {
        MotionProgramParameters {
            speed: Some(self.config.speed),
            z_height: self.config.z_height,
            precision: self.config.precision,
            safe_z_offset: self.config.safe_z_offset,
            travel_speed: self.config.travel_speed,
            park_x: self.config.park[0],
            park_y: self.config.park[1],
            bed_temperature: self.config.bed_temperature,
            nozzle_temperature: self.config.nozzle_temperature,
        }
    }

    /// One program covering every sample at its current stride.
    pub fn motion_program(&self) -> Result<String> {
        let paths = self.paths()?;
        let sections: Vec<(&str, &SerpentinePath)> = self
            .names
            .iter()
            .map(String::as_str)
            .zip(paths.iter())
            .collect();
        MotionProgramGenerator::new(self.motion_parameters()).generate_sections(&sections)
    }

    fn plan(&self, index: usize, stride: f64) -> Result<SerpentinePath> {
        let mask = self.grid.require_mask(index)?;
        SerpentinePlanner::new(self.path_parameters(index, stride)?).generate(&self.grid, mask)
    }

    fn scheduler(&self) -> DepositionScheduler<'_, SprayModel> {
        DepositionScheduler::new(&self.grid, &self.spray, self.config.z_height)
    }
}
