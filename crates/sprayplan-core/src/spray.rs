//! Spray model
//!
//! Maps a radial offset from the nozzle axis and a nozzle height to a
//! non-negative deposition weight. Both variants deposit a Gaussian spot
//!
//! ```text
//! σ    = R(h) / 2
//! w(r) = 100 · exp(−r² / 2σ²) / (2πσ²)      for r ≤ 3σ, else 0
//! ```
//!
//! and differ only in how the spot radius `R(h)` is obtained:
//!
//! - **Analytic**: `R(h) = slope·h + intercept`, an ordinary least-squares
//!   line through the calibration table (or given directly).
//! - **Calibrated**: piecewise-linear interpolation of the calibration table
//!   over height. Heights outside the table follow an [`ExtrapolationPolicy`].
//!
//! Because the kernel is a Gaussian in `r`, the weight never decreases as the
//! radius decreases, for either variant.

use crate::error::{ensure_finite, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Peak scale of the deposited spot.
pub const SPRAY_AMPLITUDE: f64 = 100.0;

/// Footprint cut-off expressed in standard deviations.
pub const FOOTPRINT_SIGMAS: f64 = 3.0;

/// A Gaussian spot resolved for one nozzle height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianKernel {
    sigma: f64,
    peak: f64,
    inv_two_sigma_sq: f64,
    cutoff: f64,
}

impl GaussianKernel {
    /// Builds the kernel for a spot of radius `spot_radius` (σ = radius / 2).
    pub fn from_spot_radius(spot_radius: f64) -> Result<Self> {
        if !spot_radius.is_finite() || spot_radius <= 0.0 {
            return Err(Error::configuration(format!(
                "spray spot radius must be positive, got {}",
                spot_radius
            )));
        }
        let sigma = spot_radius / 2.0;
        let two_sigma_sq = 2.0 * sigma * sigma;
        Ok(Self {
            sigma,
            peak: SPRAY_AMPLITUDE / (std::f64::consts::PI * two_sigma_sq),
            inv_two_sigma_sq: 1.0 / two_sigma_sq,
            cutoff: FOOTPRINT_SIGMAS * sigma,
        })
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Radius beyond which the weight is zero.
    pub fn footprint_radius(&self) -> f64 {
        self.cutoff
    }

    /// Weight at radial distance `r`.
    #[inline]
    pub fn weight(&self, r: f64) -> f64 {
        self.weight_sq(r * r)
    }

    /// Weight at squared radial distance `r2`.
    #[inline]
    pub fn weight_sq(&self, r2: f64) -> f64 {
        if r2 > self.cutoff * self.cutoff {
            0.0
        } else {
            self.peak * (-r2 * self.inv_two_sigma_sq).exp()
        }
    }
}

/// Spray model variant selector, as named in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SprayKind {
    /// Closed-form Gaussian with a linear spot-radius fit
    #[serde(alias = "analytic")]
    Gaussian,
    /// Gaussian with an interpolated spot-radius table
    Calibrated,
}

impl Default for SprayKind {
    fn default() -> Self {
        Self::Gaussian
    }
}

impl fmt::Display for SprayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gaussian => write!(f, "gaussian"),
            Self::Calibrated => write!(f, "calibrated"),
        }
    }
}

impl FromStr for SprayKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "gaussian" | "analytic" => Ok(Self::Gaussian),
            "calibrated" | "interpolated" => Ok(Self::Calibrated),
            _ => Err(Error::configuration(format!("Unknown spray function: {}", s))),
        }
    }
}

/// What the calibrated variant does with heights outside its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtrapolationPolicy {
    /// Fail with a configuration error
    #[default]
    Reject,
    /// Use the radius of the nearest table end
    Clamp,
    /// Extend the nearest table segment
    Linear,
}

/// `R(h) = slope·h + intercept`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn radius_at(&self, height: f64) -> f64 {
        self.slope * height + self.intercept
    }
}

/// Measured spot radius per nozzle height, sorted by height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationTable {
    heights: Vec<f64>,
    radii: Vec<f64>,
}

impl CalibrationTable {
    /// Builds a table from parallel height/radius sequences.
    ///
    /// Values must be finite, radii strictly positive and heights distinct.
    pub fn new(heights: Vec<f64>, radii: Vec<f64>) -> Result<Self> {
        if heights.len() != radii.len() {
            return Err(Error::configuration(format!(
                "calibration table has {} heights but {} radii",
                heights.len(),
                radii.len()
            )));
        }
        if heights.is_empty() {
            return Err(Error::configuration("calibration table is empty"));
        }

        let mut pairs = Vec::with_capacity(heights.len());
        for (h, r) in heights.into_iter().zip(radii) {
            ensure_finite("calibration height", h)?;
            if !r.is_finite() || r <= 0.0 {
                return Err(Error::configuration(format!(
                    "calibration radius at height {} must be positive, got {}",
                    h, r
                )));
            }
            pairs.push((h, r));
        }
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        if let Some(w) = pairs.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(Error::configuration(format!(
                "calibration table has duplicate height {}",
                w[0].0
            )));
        }

        Ok(Self {
            heights: pairs.iter().map(|p| p.0).collect(),
            radii: pairs.iter().map(|p| p.1).collect(),
        })
    }

    /// Builds a table from `(radius, height)` sample pairs.
    pub fn from_pairs(samples: &[(f64, f64)]) -> Result<Self> {
        let (radii, heights) = samples.iter().copied().unzip();
        Self::new(heights, radii)
    }

    pub fn len(&self) -> usize {
        self.heights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }

    pub fn heights(&self) -> &[f64] {
        &self.heights
    }

    pub fn radii(&self) -> &[f64] {
        &self.radii
    }

    /// Lowest and highest calibrated heights.
    pub fn domain(&self) -> (f64, f64) {
        (self.heights[0], self.heights[self.heights.len() - 1])
    }

    /// Ordinary least-squares line through the table.
    pub fn linear_fit(&self) -> Result<LinearFit> {
        if self.len() < 2 {
            return Err(Error::configuration(
                "a linear spray fit needs at least two calibration samples",
            ));
        }
        let n = self.len() as f64;
        let mean_h = self.heights.iter().sum::<f64>() / n;
        let mean_r = self.radii.iter().sum::<f64>() / n;
        let (mut sxy, mut sxx) = (0.0, 0.0);
        for (h, r) in self.heights.iter().zip(&self.radii) {
            sxy += (h - mean_h) * (r - mean_r);
            sxx += (h - mean_h) * (h - mean_h);
        }
        // heights are distinct, so sxx > 0 for two or more samples
        let slope = sxy / sxx;
        Ok(LinearFit {
            slope,
            intercept: mean_r - slope * mean_h,
        })
    }

    /// Piecewise-linear spot radius at `height`.
    pub fn interpolate(&self, height: f64, policy: ExtrapolationPolicy) -> Result<f64> {
        ensure_finite("nozzle height", height)?;
        let (lo, hi) = self.domain();
        let last = self.len() - 1;

        if height < lo || height > hi {
            return match policy {
                ExtrapolationPolicy::Reject => Err(Error::configuration(format!(
                    "nozzle height {} is outside the calibrated range {} .. {}",
                    height, lo, hi
                ))),
                ExtrapolationPolicy::Clamp => Ok(if height < lo {
                    self.radii[0]
                } else {
                    self.radii[last]
                }),
                ExtrapolationPolicy::Linear if self.len() == 1 => Ok(self.radii[0]),
                ExtrapolationPolicy::Linear => {
                    let seg = if height < lo { 0 } else { last - 1 };
                    let r = self.lerp_segment(seg, height);
                    if r <= 0.0 {
                        return Err(Error::configuration(format!(
                            "extrapolated spot radius at height {} is not positive ({})",
                            height, r
                        )));
                    }
                    Ok(r)
                }
            };
        }

        if self.len() == 1 {
            return Ok(self.radii[0]);
        }
        // first index whose height is >= the query
        let upper = self.heights.partition_point(|&h| h < height).clamp(1, last);
        Ok(self.lerp_segment(upper - 1, height))
    }

    fn lerp_segment(&self, seg: usize, height: f64) -> f64 {
        let (h0, h1) = (self.heights[seg], self.heights[seg + 1]);
        let (r0, r1) = (self.radii[seg], self.radii[seg + 1]);
        r0 + (r1 - r0) * (height - h0) / (h1 - h0)
    }
}

/// Common contract of every spray model.
pub trait SprayProfile: fmt::Debug + Send + Sync {
    /// Spot radius `R(h)` at nozzle height `height`.
    fn spot_radius(&self, height: f64) -> Result<f64>;

    /// Kernel resolved for one height; use this in hot loops.
    fn kernel(&self, height: f64) -> Result<GaussianKernel> {
        GaussianKernel::from_spot_radius(self.spot_radius(height)?)
    }

    /// Radius beyond which the weight is zero.
    fn footprint_radius(&self, height: f64) -> Result<f64> {
        Ok(self.kernel(height)?.footprint_radius())
    }

    /// Deposition weight at radial distance `radius` from the nozzle axis.
    fn weight(&self, radius: f64, height: f64) -> Result<f64> {
        if !radius.is_finite() || radius < 0.0 {
            return Err(Error::configuration(format!(
                "radial distance must be finite and non-negative, got {}",
                radius
            )));
        }
        Ok(self.kernel(height)?.weight(radius))
    }
}

/// Gaussian spot with a linear radius-vs-height law.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticSpray {
    fit: LinearFit,
}

impl AnalyticSpray {
    pub fn new(fit: LinearFit) -> Self {
        Self { fit }
    }

    /// Fits the radius law to a calibration table.
    pub fn fitted(table: &CalibrationTable) -> Result<Self> {
        Ok(Self::new(table.linear_fit()?))
    }

    /// Same spot radius at every height.
    pub fn constant(radius: f64) -> Self {
        Self::new(LinearFit {
            slope: 0.0,
            intercept: radius,
        })
    }

    pub fn fit(&self) -> LinearFit {
        self.fit
    }
}

impl SprayProfile for AnalyticSpray {
    fn spot_radius(&self, height: f64) -> Result<f64> {
        ensure_finite("nozzle height", height)?;
        let r = self.fit.radius_at(height);
        if r <= 0.0 {
            return Err(Error::configuration(format!(
                "spot radius at height {} is not positive ({:.4})",
                height, r
            )));
        }
        Ok(r)
    }
}

/// Gaussian spot with an interpolated radius table.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibratedSpray {
    table: CalibrationTable,
    policy: ExtrapolationPolicy,
}

impl CalibratedSpray {
    pub fn new(table: CalibrationTable, policy: ExtrapolationPolicy) -> Self {
        Self { table, policy }
    }

    pub fn table(&self) -> &CalibrationTable {
        &self.table
    }

    pub fn policy(&self) -> ExtrapolationPolicy {
        self.policy
    }
}

impl SprayProfile for CalibratedSpray {
    fn spot_radius(&self, height: f64) -> Result<f64> {
        self.table.interpolate(height, self.policy)
    }
}

/// The spray model used by the scheduler and optimizer.
#[derive(Debug, Clone, PartialEq)]
pub enum SprayModel {
    Analytic(AnalyticSpray),
    Calibrated(CalibratedSpray),
}

impl SprayModel {
    /// Builds the requested variant from calibration data.
    pub fn build(kind: SprayKind, calibration: &CalibrationTable) -> Result<Self> {
        match kind {
            SprayKind::Gaussian => Ok(SprayModel::Analytic(AnalyticSpray::fitted(calibration)?)),
            SprayKind::Calibrated => Ok(SprayModel::Calibrated(CalibratedSpray::new(
                calibration.clone(),
                ExtrapolationPolicy::default(),
            ))),
        }
    }

    /// Sets the extrapolation policy; analytic models are unaffected.
    pub fn with_extrapolation(self, policy: ExtrapolationPolicy) -> Self {
        match self {
            SprayModel::Calibrated(c) => SprayModel::Calibrated(CalibratedSpray::new(c.table, policy)),
            other => other,
        }
    }

    pub fn kind(&self) -> SprayKind {
        match self {
            SprayModel::Analytic(_) => SprayKind::Gaussian,
            SprayModel::Calibrated(_) => SprayKind::Calibrated,
        }
    }
}

impl SprayProfile for SprayModel {
    fn spot_radius(&self, height: f64) -> Result<f64> {
        match self {
            SprayModel::Analytic(a) => a.spot_radius(height),
            SprayModel::Calibrated(c) => c.spot_radius(height),
        }
    }
}

impl From<AnalyticSpray> for SprayModel {
    fn from(value: AnalyticSpray) -> Self {
        SprayModel::Analytic(value)
    }
}

impl From<CalibratedSpray> for SprayModel {
    fn from(value: CalibratedSpray) -> Self {
        SprayModel::Calibrated(value)
    }
}
