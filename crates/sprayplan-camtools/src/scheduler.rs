//! Deposition scheduler
//!
//! Replays waypoint sequences through the spray model onto a deposition
//! accumulator. Material lands only at waypoints; travel between them is
//! not integrated.

use crate::serpentine::{SerpentinePath, Waypoint};
use sprayplan_core::error::ensure_finite;
use sprayplan_core::{Deposition, Error, GaussianKernel, Grid, Result, SprayProfile, BED_TOLERANCE};
use tracing::debug;

/// Simulates deposition at a fixed nozzle height
pub struct DepositionScheduler<'a, S: SprayProfile + ?Sized> {
    grid: &'a Grid,
    spray: &'a S,
    z_height: f64,
}

impl<'a, S: SprayProfile + ?Sized> DepositionScheduler<'a, S> {
    pub fn new(grid: &'a Grid, spray: &'a S, z_height: f64) -> Self {
        Self {
            grid,
            spray,
            z_height,
        }
    }

    pub fn z_height(&self) -> f64 {
        self.z_height
    }

    /// Resolves the spray kernel at the working height.
    pub fn kernel(&self) -> Result<GaussianKernel> {
        ensure_finite("z_height", self.z_height)?;
        self.spray.kernel(self.z_height)
    }

    /// Replays `path` into a fresh accumulator.
    ///
    /// `progress` receives `(index, total)` after each waypoint is deposited.
    pub fn simulate(
        &self,
        path: &SerpentinePath,
        progress: Option<&(dyn Fn(usize, usize) + Send + Sync)>,
    ) -> Result<Deposition> {
        self.check_path(path)?;
        let mut acc = Deposition::new(self.grid);
        self.simulate_into(&mut acc, path.waypoints(), progress)?;
        Ok(acc)
    }

    /// Replays several paths into one accumulator.
    pub fn simulate_paths(&self, paths: &[SerpentinePath]) -> Result<Deposition> {
        for path in paths {
            self.check_path(path)?;
        }
        let mut acc = Deposition::new(self.grid);
        for path in paths {
            self.simulate_into(&mut acc, path.waypoints(), None)?;
        }
        Ok(acc)
    }

    /// Adds the deposition of `waypoints` to an existing accumulator.
    ///
    /// Every waypoint is validated before anything is deposited.
    pub fn simulate_into(
        &self,
        acc: &mut Deposition,
        waypoints: &[Waypoint],
        progress: Option<&(dyn Fn(usize, usize) + Send + Sync)>,
    ) -> Result<()> {
        if !acc.matches(self.grid) {
            return Err(Error::configuration(format!(
                "accumulator has {} cells per axis, grid has {}",
                acc.cells_per_axis(),
                self.grid.cells_per_axis()
            )));
        }
        for (i, w) in waypoints.iter().enumerate() {
            if !self.grid.contains(w.position) {
                return Err(Error::configuration(format!(
                    "waypoint {} at {} lies outside the {:.3} mm bed",
                    i,
                    w.position,
                    self.grid.bed_size()
                )));
            }
        }

        let kernel = self.kernel()?;
        let total = waypoints.len();
        let mut touched = 0;
        for (i, w) in waypoints.iter().enumerate() {
            touched += acc.deposit(self.grid, w.position, &kernel)?;
            if let Some(hook) = progress {
                hook(i, total);
            }
        }

        debug!(
            waypoints = total,
            cell_updates = touched,
            z_height = self.z_height,
            "simulated deposition"
        );
        Ok(())
    }

    fn check_path(&self, path: &SerpentinePath) -> Result<()> {
        if (path.bed_size() - self.grid.bed_size()).abs() > BED_TOLERANCE {
            return Err(Error::configuration(format!(
                "path for mask '{}' was planned on a {:.3} mm bed, grid is {:.3} mm",
                path.mask(),
                path.bed_size(),
                self.grid.bed_size()
            )));
        }
        Ok(())
    }
}
