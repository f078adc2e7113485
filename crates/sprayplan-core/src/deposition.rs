//! Deposition accumulator
//!
//! A per-cell field of accumulated spray weight plus the uniformity
//! statistics the optimizer scores.

use crate::error::{Error, Result};
use crate::geometry::Point;
use crate::grid::Grid;
use crate::mask::Mask;
use crate::spray::GaussianKernel;
use serde::{Deserialize, Serialize};

/// Accumulated weight per grid cell, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deposition {
    cells_per_axis: usize,
    values: Vec<f64>,
}

impl Deposition {
    /// Zeroed accumulator sized to `grid`.
    pub fn new(grid: &Grid) -> Self {
        Self {
            cells_per_axis: grid.cells_per_axis(),
            values: vec![0.0; grid.cell_count()],
        }
    }

    pub fn cells_per_axis(&self) -> usize {
        self.cells_per_axis
    }

    /// Whether this accumulator has the layout of `grid`.
    pub fn matches(&self, grid: &Grid) -> bool {
        self.cells_per_axis == grid.cells_per_axis()
    }

    fn ensure_matches(&self, grid: &Grid) -> Result<()> {
        if !self.matches(grid) {
            return Err(Error::configuration(format!(
                "accumulator is {0}x{0} but the grid is {1}x{1}",
                self.cells_per_axis,
                grid.cells_per_axis()
            )));
        }
        Ok(())
    }

    /// Adds one spot of `kernel` centred on `at` to every cell within its footprint.
    ///
    /// Returns the number of cells touched.
    pub fn deposit(&mut self, grid: &Grid, at: Point, kernel: &GaussianKernel) -> Result<usize> {
        self.ensure_matches(grid)?;
        let reach = kernel.footprint_radius();
        let (Some((x0, x1)), Some((y0, y1))) = (
            grid.cell_span(at.x - reach, at.x + reach),
            grid.cell_span(at.y - reach, at.y + reach),
        ) else {
            return Ok(0);
        };

        let mut touched = 0;
        for iy in y0..=y1 {
            let dy = grid.cell_center(0, iy).y - at.y;
            for ix in x0..=x1 {
                let dx = grid.cell_center(ix, 0).x - at.x;
                let w = kernel.weight_sq(dx * dx + dy * dy);
                if w > 0.0 {
                    self.values[grid.index(ix, iy)] += w;
                    touched += 1;
                }
            }
        }
        Ok(touched)
    }

    pub fn get(&self, ix: usize, iy: usize) -> Option<f64> {
        if ix >= self.cells_per_axis || iy >= self.cells_per_axis {
            return None;
        }
        self.values.get(iy * self.cells_per_axis + ix).copied()
    }

    /// Row-major cell values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Sum over every cell.
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }

    pub fn reset(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.0);
    }

    /// Values of the cells selected by `mask`, in row-major order.
    pub fn region_values(&self, mask: &Mask) -> Result<Vec<f64>> {
        if mask.cells_per_axis() != self.cells_per_axis {
            return Err(Error::configuration(format!(
                "mask '{}' was rasterized on a {}x{} grid, accumulator is {}x{}",
                mask.name(),
                mask.cells_per_axis(),
                mask.cells_per_axis(),
                self.cells_per_axis,
                self.cells_per_axis
            )));
        }
        if mask.is_empty() {
            return Err(Error::empty_region(mask.name()));
        }
        Ok(mask.selected_indices().map(|i| self.values[i]).collect())
    }

    /// Uniformity statistics over the cells selected by `mask`.
    pub fn region_stats(&self, mask: &Mask) -> Result<RegionStats> {
        let values = self.region_values(mask)?;
        Ok(RegionStats::from_values(&values))
    }
}

/// Summary statistics over a masked region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionStats {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl RegionStats {
    /// Computes the statistics of a non-empty slice.
    fn from_values(values: &[f64]) -> Self {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        Self {
            count: values.len(),
            mean,
            std_dev: variance.sqrt(),
            min,
            max,
        }
    }

    /// `std_dev / mean`; not finite when the region received nothing.
    pub fn coefficient_of_variation(&self) -> f64 {
        self.std_dev / self.mean
    }
}
