//! Stride optimizer
//!
//! Sweeps candidate strides for one mask. Each candidate gets its own
//! serpentine path and accumulator; the deposition inside the mask is scored
//! and the most uniform candidate wins, ties going to the smallest stride.
//!
//! A failing candidate is logged and recorded but does not abort the sweep.

use crate::scheduler::DepositionScheduler;
use crate::serpentine::{SerpentineParameters, SerpentinePlanner};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sprayplan_core::{
    CancellationToken, Deposition, Error, Grid, Mask, ProgressCallback, RegionStats, Result,
    SprayProfile,
};
use std::fmt;
use tracing::{debug, info, warn};

/// Receives the finished result, e.g. to write it to disk.
pub type PersistHook = Box<dyn Fn(&OptimizationResult) -> anyhow::Result<()> + Send + Sync>;

/// Receives the finished result and the best stride's accumulator.
pub type RenderHook = Box<dyn Fn(&OptimizationResult, &Deposition) + Send + Sync>;

/// Uniformity score; lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scoring {
    /// Population standard deviation over the mask
    #[default]
    StdDev,
    /// Standard deviation divided by the mean
    CoefficientOfVariation,
}

impl Scoring {
    pub fn score(&self, stats: &RegionStats) -> f64 {
        match self {
            Scoring::StdDev => stats.std_dev,
            Scoring::CoefficientOfVariation => stats.coefficient_of_variation(),
        }
    }
}

impl fmt::Display for Scoring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scoring::StdDev => write!(f, "std_dev"),
            Scoring::CoefficientOfVariation => write!(f, "coefficient_of_variation"),
        }
    }
}

/// Score of one successfully simulated candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrideEvaluation {
    pub stride: f64,
    pub deviation: f64,
    /// Mean deposition inside the mask
    pub mean: f64,
    pub line_count: usize,
    pub waypoint_count: usize,
}

/// A candidate whose simulation failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateFailure {
    pub stride: f64,
    pub reason: String,
}

/// Outcome of one stride sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub mask: String,
    pub scoring: Scoring,
    /// Successful evaluations in candidate order
    pub evaluations: Vec<StrideEvaluation>,
    pub best_stride: f64,
    pub best_deviation: f64,
    pub failures: Vec<CandidateFailure>,
    /// Whether the sweep stopped early
    pub cancelled: bool,
    pub timestamp: DateTime<Utc>,
}

impl OptimizationResult {
    /// True when some candidates failed or were skipped.
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty() || self.cancelled
    }

    /// `(stride, deviation)` pairs in candidate order.
    pub fn series(&self) -> Vec<(f64, f64)> {
        self.evaluations
            .iter()
            .map(|e| (e.stride, e.deviation))
            .collect()
    }

    pub fn best(&self) -> Option<&StrideEvaluation> {
        self.evaluations
            .iter()
            .find(|e| e.stride == self.best_stride && e.deviation == self.best_deviation)
    }
}

/// Sweeps stride candidates for a mask
pub struct StrideOptimizer<'a, S: SprayProfile + ?Sized> {
    grid: &'a Grid,
    spray: &'a S,
    z_height: f64,
    template: SerpentineParameters,
    scoring: Scoring,
    parallel: bool,
    progress: Option<ProgressCallback>,
    persist: Option<PersistHook>,
    render: Option<RenderHook>,
    cancel: Option<CancellationToken>,
}

impl<'a, S: SprayProfile + ?Sized> StrideOptimizer<'a, S> {
    /// `template` supplies every path parameter except the stride.
    pub fn new(grid: &'a Grid, spray: &'a S, z_height: f64, template: SerpentineParameters) -> Self {
        Self {
            grid,
            spray,
            z_height,
            template,
            scoring: Scoring::default(),
            parallel: false,
            progress: None,
            persist: None,
            render: None,
            cancel: None,
        }
    }

    pub fn with_scoring(mut self, scoring: Scoring) -> Self {
        self.scoring = scoring;
        self
    }

    /// Evaluates candidates on the rayon pool.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Called with `(candidate_index, candidate_count)` after each candidate.
    pub fn on_progress(mut self, hook: ProgressCallback) -> Self {
        self.progress = Some(hook);
        self
    }

    pub fn on_persist(mut self, hook: PersistHook) -> Self {
        self.persist = Some(hook);
        self
    }

    pub fn on_render(mut self, hook: RenderHook) -> Self {
        self.render = Some(hook);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|t| t.is_cancelled())
    }

    /// Simulates one stride and returns its accumulator alongside the evaluation.
    pub fn simulate_stride(&self, mask: &Mask, stride: f64) -> Result<(StrideEvaluation, Deposition)> {
        let path = SerpentinePlanner::new(self.template.with_stride(stride)).generate(self.grid, mask)?;
        let acc = DepositionScheduler::new(self.grid, self.spray, self.z_height).simulate(&path, None)?;
        let stats = acc.region_stats(mask)?;
        let deviation = self.scoring.score(&stats);
        if !deviation.is_finite() {
            return Err(Error::configuration(format!(
                "{} score for stride {} is not finite (mean deposition {})",
                self.scoring, stride, stats.mean
            )));
        }
        let evaluation = StrideEvaluation {
            stride,
            deviation,
            mean: stats.mean,
            line_count: path.line_count(),
            waypoint_count: path.len(),
        };
        Ok((evaluation, acc))
    }

    fn evaluate(&self, index: usize, total: usize, mask: &Mask, stride: f64) -> Option<Result<StrideEvaluation>> {
        if self.is_cancelled() {
            return None;
        }
        let outcome = self.simulate_stride(mask, stride).map(|(e, _)| e);
        match &outcome {
            Ok(e) => debug!(mask = mask.name(), stride, deviation = e.deviation, "evaluated stride"),
            Err(err) => warn!(mask = mask.name(), stride, "stride candidate failed: {}", err),
        }
        if let Some(hook) = &self.progress {
            hook(index, total);
        }
        Some(outcome)
    }

    /// Runs the sweep over `candidates` in the given order.
    pub fn optimize(&self, mask: &Mask, candidates: &[f64]) -> Result<OptimizationResult> {
        if candidates.is_empty() {
            return Err(Error::configuration("no stride candidates supplied"));
        }
        if !mask.matches(self.grid) {
            return Err(Error::configuration(format!(
                "mask '{}' was rasterized on a different grid",
                mask.name()
            )));
        }
        if mask.is_empty() {
            return Err(Error::empty_region(mask.name()));
        }

        let total = candidates.len();
        let outcomes: Vec<Option<Result<StrideEvaluation>>> = if self.parallel {
            candidates
                .par_iter()
                .enumerate()
                .map(|(i, &stride)| self.evaluate(i, total, mask, stride))
                .collect()
        } else {
            let mut outcomes = Vec::with_capacity(total);
            for (i, &stride) in candidates.iter().enumerate() {
                let outcome = self.evaluate(i, total, mask, stride);
                if outcome.is_none() {
                    break;
                }
                outcomes.push(outcome);
            }
            outcomes
        };

        let attempted = outcomes.iter().filter(|o| o.is_some()).count();
        let cancelled = attempted < total;
        if attempted == 0 {
            return Err(Error::Cancelled);
        }

        let mut evaluations = Vec::with_capacity(attempted);
        let mut failures = Vec::new();
        let mut last_error = None;
        for (outcome, &stride) in outcomes.into_iter().zip(candidates) {
            match outcome {
                Some(Ok(e)) => evaluations.push(e),
                Some(Err(err)) => {
                    failures.push(CandidateFailure {
                        stride,
                        reason: err.to_string(),
                    });
                    last_error = Some(err);
                }
                None => {}
            }
        }

        let best = evaluations
            .iter()
            .min_by(|a, b| {
                a.deviation
                    .total_cmp(&b.deviation)
                    .then(a.stride.total_cmp(&b.stride))
            })
            .copied();
        let best = match (best, last_error) {
            (Some(best), _) => best,
            (None, Some(source)) => {
                return Err(Error::Optimization {
                    attempted,
                    source: Box::new(source),
                })
            }
            (None, None) => return Err(Error::Cancelled),
        };

        let result = OptimizationResult {
            mask: mask.name().to_string(),
            scoring: self.scoring,
            evaluations,
            best_stride: best.stride,
            best_deviation: best.deviation,
            failures,
            cancelled,
            timestamp: Utc::now(),
        };

        info!(
            mask = mask.name(),
            best_stride = result.best_stride,
            best_deviation = result.best_deviation,
            evaluated = result.evaluations.len(),
            failed = result.failures.len(),
            cancelled,
            "stride sweep finished"
        );

        if let Some(render) = &self.render {
            match self.simulate_stride(mask, result.best_stride) {
                Ok((_, acc)) => render(&result, &acc),
                Err(err) => warn!(mask = mask.name(), "could not render best stride: {}", err),
            }
        }
        if let Some(persist) = &self.persist {
            if let Err(err) = persist(&result) {
                warn!(mask = mask.name(), "failed to persist optimization result: {:#}", err);
            }
        }

        Ok(result)
    }
}
