//! Serpentine path planner
//!
//! Covers one mask with horizontal sweep lines: the mask's bounding box is
//! expanded by a margin and clamped to the bed, lines are laid `stride` apart
//! from the bottom of that extent, and consecutive lines alternate direction.
//! Odd passes retrace the sweep backwards so each pass starts where the
//! previous one ended; with `alternate_offset` they also run half a stride
//! higher, between the lines of the even passes.

use serde::{Deserialize, Serialize};
use sprayplan_core::error::{ensure_finite, ensure_positive};
use sprayplan_core::{Error, Grid, Mask, Point, Rect, Result};
use tracing::debug;

/// Absorbs rounding when the extent height is an exact multiple of the stride.
const LINE_COUNT_EPSILON: f64 = 1e-9;

/// Upper bound on the waypoints of one path, passes included.
pub const MAX_WAYPOINTS: usize = 1 << 22;

/// Parameters for the serpentine planner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerpentineParameters {
    /// Expansion of the mask bounding box on every side (mm)
    pub margin: f64,
    /// Spacing between sweep lines (mm)
    pub stride: f64,
    /// Evenly spaced horizontal positions per line
    pub sample_count: usize,
    /// Number of repetitions of the sweep
    pub passes: usize,
    /// Nozzle speed tagged on every waypoint (mm/s)
    pub speed: f64,
    /// Shift odd passes up by half a stride
    #[serde(default)]
    pub alternate_offset: bool,
}

impl Default for SerpentineParameters {
    fn default() -> Self {
        Self {
            margin: 4.0,
            stride: 1.0,
            sample_count: 2,
            passes: 1,
            speed: 2.0,
            alternate_offset: false,
        }
    }
}

impl SerpentineParameters {
    /// Same parameters with a different stride.
    pub fn with_stride(&self, stride: f64) -> Self {
        Self {
            stride,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure_positive("stride", self.stride)?;
        ensure_positive("speed", self.speed)?;
        if ensure_finite("margin", self.margin)? < 0.0 {
            return Err(Error::configuration(format!(
                "margin must not be negative, got {}",
                self.margin
            )));
        }
        if self.sample_count < 1 {
            return Err(Error::configuration("sample_count must be at least 1"));
        }
        if self.passes < 1 {
            return Err(Error::configuration("passes must be at least 1"));
        }
        Ok(())
    }
}

/// One stop of the nozzle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub position: Point,
    /// Zero-based pass this waypoint belongs to
    pub pass: usize,
    /// Target speed (mm/s)
    pub speed: f64,
}

/// The ordered waypoints covering one mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerpentinePath {
    mask: String,
    bed_size: f64,
    params: SerpentineParameters,
    extent: Rect,
    line_count: usize,
    waypoints: Vec<Waypoint>,
}

impl SerpentinePath {
    /// Name of the mask this path covers.
    pub fn mask(&self) -> &str {
        &self.mask
    }

    /// Bed size of the grid the path was planned on.
    pub fn bed_size(&self) -> f64 {
        self.bed_size
    }

    pub fn params(&self) -> &SerpentineParameters {
        &self.params
    }

    pub fn stride(&self) -> f64 {
        self.params.stride
    }

    /// Sweep area: mask bounds plus margin, clamped to the bed.
    pub fn extent(&self) -> Rect {
        self.extent
    }

    /// Sweep lines per pass.
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// A fresh path for the same mask with a different stride.
    pub fn regenerate_with_stride(&self, grid: &Grid, mask: &Mask, stride: f64) -> Result<Self> {
        SerpentinePlanner::new(self.params.with_stride(stride)).generate(grid, mask)
    }
}

/// Plans serpentine sweeps over masks
#[derive(Debug, Clone)]
pub struct SerpentinePlanner {
    params: SerpentineParameters,
}

impl SerpentinePlanner {
    pub fn new(params: SerpentineParameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SerpentineParameters {
        &self.params
    }

    /// Sweep area for `mask`: its bounds grown by the margin, clamped to the bed.
    ///
    /// Near the bed edges the clamp shrinks the margin on that side only.
    pub fn extent(&self, grid: &Grid, mask: &Mask) -> Result<Rect> {
        self.params.validate()?;
        let extent = mask
            .bounds()
            .expand(self.params.margin)
            .intersect(&grid.bed_rect())
            .ok_or_else(|| {
                Error::configuration(format!("mask '{}' has no extent on the bed", mask.name()))
            })?;
        Ok(extent)
    }

    /// Number of sweep lines for an extent of the given height.
    ///
    /// Fails when the stride would need more than [`MAX_WAYPOINTS`] lines.
    pub fn line_count(&self, height: f64) -> Result<usize> {
        let spans = (height / self.params.stride + LINE_COUNT_EPSILON).floor();
        if !spans.is_finite() || spans >= MAX_WAYPOINTS as f64 {
            return Err(Error::configuration(format!(
                "stride {} is too small for a {:.3} mm extent: more than {} sweep lines",
                self.params.stride, height, MAX_WAYPOINTS
            )));
        }
        Ok(spans as usize + 1)
    }

    /// Generates the waypoint sequence for `mask`.
    pub fn generate(&self, grid: &Grid, mask: &Mask) -> Result<SerpentinePath> {
        self.params.validate()?;
        if !mask.matches(grid) {
            return Err(Error::configuration(format!(
                "mask '{}' was rasterized on a different grid",
                mask.name()
            )));
        }
        if mask.is_empty() {
            return Err(Error::empty_region(mask.name()));
        }

        let p = &self.params;
        let extent = self.extent(grid, mask)?;
        let line_count = self.line_count(extent.height())?;
        let total = line_count
            .checked_mul(p.sample_count)
            .and_then(|n| n.checked_mul(p.passes))
            .filter(|&n| n <= MAX_WAYPOINTS)
            .ok_or_else(|| {
                Error::configuration(format!(
                    "stride {} with {} samples per line and {} passes needs more than {} waypoints",
                    p.stride, p.sample_count, p.passes, MAX_WAYPOINTS
                ))
            })?;
        let columns = sample_positions(extent.min.x, extent.max.x, p.sample_count);

        let mut sweep = Vec::with_capacity(line_count * columns.len());
        for k in 0..line_count {
            let y = (extent.min.y + k as f64 * p.stride).min(extent.max.y);
            if k % 2 == 0 {
                sweep.extend(columns.iter().map(|&x| Point::new(x, y)));
            } else {
                sweep.extend(columns.iter().rev().map(|&x| Point::new(x, y)));
            }
        }

        let mut waypoints = Vec::with_capacity(total);
        for pass in 0..p.passes {
            let y_offset = if p.alternate_offset && pass % 2 == 1 {
                p.stride / 2.0
            } else {
                0.0
            };
            let tag = |position: &Point| Waypoint {
                position: Point::new(position.x, (position.y + y_offset).min(extent.max.y)),
                pass,
                speed: p.speed,
            };
            if pass % 2 == 0 {
                waypoints.extend(sweep.iter().map(tag));
            } else {
                waypoints.extend(sweep.iter().rev().map(tag));
            }
        }

        debug!(
            mask = mask.name(),
            stride = p.stride,
            line_count,
            waypoints = waypoints.len(),
            "planned serpentine"
        );

        Ok(SerpentinePath {
            mask: mask.name().to_string(),
            bed_size: grid.bed_size(),
            params: p.clone(),
            extent,
            line_count,
            waypoints,
        })
    }
}

/// `count` evenly spaced positions from `lo` to `hi`; a single sample sits at `lo`.
fn sample_positions(lo: f64, hi: f64, count: usize) -> Vec<f64> {
    if count == 1 {
        return vec![lo];
    }
    let step = (hi - lo) / (count - 1) as f64;
    (0..count)
        .map(|i| if i == count - 1 { hi } else { lo + i as f64 * step })
        .collect()
}
