//! Configuration Module
//!
//! The planner configuration: bed and grid, spray calibration, motion and
//! temperature settings, and the list of samples to cover. Stored as JSON
//! or TOML, chosen by file extension.

use serde::{Deserialize, Serialize};
use sprayplan_core::error::{ensure_finite, ensure_positive};
use sprayplan_core::{
    CalibrationTable, Error, ExtrapolationPolicy, Grid, Point, Result, Shape, SprayKind, SprayModel,
    SprayProfile,
};
use std::path::{Path, PathBuf};

/// A linear sweep of stride candidates, written as `[start, stop, count]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrideSweep(pub f64, pub f64, pub usize);

impl StrideSweep {
    pub fn start(&self) -> f64 {
        self.0
    }

    pub fn stop(&self) -> f64 {
        self.1
    }

    pub fn count(&self) -> usize {
        self.2
    }

    /// `count` evenly spaced values from `start` to `stop`, both inclusive.
    pub fn values(&self) -> Vec<f64> {
        let (start, stop, count) = (self.0, self.1, self.2);
        match count {
            0 => Vec::new(),
            1 => vec![start],
            _ => {
                let step = (stop - start) / (count - 1) as f64;
                (0..count)
                    .map(|i| if i == count - 1 { stop } else { start + i as f64 * step })
                    .collect()
            }
        }
    }

    fn validate(&self, key: &str) -> Result<()> {
        ensure_positive(&format!("{}.start", key), self.0)?;
        ensure_positive(&format!("{}.stop", key), self.1)?;
        if self.2 == 0 {
            return Err(Error::configuration(format!("{} needs at least one candidate", key)));
        }
        Ok(())
    }
}

impl Default for StrideSweep {
    fn default() -> Self {
        Self(1.0, 5.0, 9)
    }
}

/// Sample outline kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleShape {
    #[default]
    Rectangle,
    /// Disc inscribed in the `position`/`size` box
    Circle,
}

impl std::fmt::Display for SampleShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rectangle => write!(f, "rectangle"),
            Self::Circle => write!(f, "circle"),
        }
    }
}

/// One sample to cover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub shape: SampleShape,
    /// Lower-left corner (mm)
    #[serde(default)]
    pub position: [f64; 2],
    /// Width and height (mm)
    #[serde(default = "default_sample_size")]
    pub size: [f64; 2],
    /// Sweep margin around the sample (mm)
    #[serde(default = "default_margin")]
    pub margin: f64,
    /// Samples per sweep line
    #[serde(default = "default_x_amount")]
    pub x_amount: usize,
    /// Stride candidates; the config-wide sweep when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strides: Option<StrideSweep>,
    #[serde(default = "default_passes")]
    pub passes: usize,
    /// Run odd passes half a stride higher
    #[serde(default)]
    pub alternate_offset: bool,
}

fn default_sample_size() -> [f64; 2] {
    [10.0, 10.0]
}

fn default_margin() -> f64 {
    10.0
}

fn default_x_amount() -> usize {
    10
}

fn default_passes() -> usize {
    2
}

impl SampleConfig {
    /// A rectangle sample with default sweep settings.
    pub fn rectangle(position: [f64; 2], size: [f64; 2]) -> Self {
        Self {
            name: None,
            shape: SampleShape::Rectangle,
            position,
            size,
            margin: default_margin(),
            x_amount: default_x_amount(),
            strides: None,
            passes: default_passes(),
            alternate_offset: false,
        }
    }

    /// The configured name, or `sample-<index>`.
    pub fn display_name(&self, index: usize) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("sample-{}", index))
    }

    /// Mask shape for this sample.
    pub fn to_shape(&self) -> Shape {
        let [x, y] = self.position;
        let [w, h] = self.size;
        match self.shape {
            SampleShape::Rectangle => Shape::rectangle(Point::new(x, y), w, h),
            SampleShape::Circle => {
                Shape::circle(Point::new(x + w / 2.0, y + h / 2.0), w.min(h) / 2.0)
            }
        }
    }

    fn validate(&self, key: &str) -> Result<()> {
        self.to_shape()
            .validate()
            .map_err(|e| Error::configuration(format!("{}: {}", key, e)))?;
        if ensure_finite(&format!("{}.margin", key), self.margin)? < 0.0 {
            return Err(Error::configuration(format!("{}.margin must not be negative", key)));
        }
        if self.x_amount < 1 {
            return Err(Error::configuration(format!("{}.x_amount must be at least 1", key)));
        }
        if self.passes < 1 {
            return Err(Error::configuration(format!("{}.passes must be at least 1", key)));
        }
        if let Some(sweep) = &self.strides {
            sweep.validate(&format!("{}.strides", key))?;
        }
        Ok(())
    }
}

/// Planner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SprayConfig {
    /// Square bed edge length (mm)
    pub bed_size: f64,
    /// Requested grid resolution (mm)
    pub grid_step: f64,
    /// Working nozzle height (mm)
    pub z_height: f64,
    /// Deposition speed (mm/s)
    pub speed: f64,
    /// Speed for non-depositing moves (mm/s)
    pub travel_speed: f64,
    pub spray_function: SprayKind,
    /// Behaviour of the calibrated model outside its table
    pub extrapolation: ExtrapolationPolicy,
    /// Nozzle temperature (°C); 0 disables
    pub nozzle_temperature: f64,
    /// Bed temperature (°C); 0 disables
    pub bed_temperature: f64,
    /// Lift above the working height before parking (mm)
    pub safe_z_offset: f64,
    /// Decimal places in the motion program
    pub precision: usize,
    /// Where optimization results are written; platform data dir when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results_dir: Option<PathBuf>,
    /// Park position after the program (mm)
    pub park: [f64; 2],
    /// Calibration as two parallel sequences: heights, then radii
    pub spray_radius_vs_z: (Vec<f64>, Vec<f64>),
    /// Stride sweep for samples without their own
    pub strides: StrideSweep,
    pub samples: Vec<SampleConfig>,
}

impl Default for SprayConfig {
    fn default() -> Self {
        Self {
            bed_size: 200.0,
            grid_step: 0.4,
            z_height: 70.0,
            speed: 2.0,
            travel_speed: 50.0,
            spray_function: SprayKind::Gaussian,
            extrapolation: ExtrapolationPolicy::Reject,
            nozzle_temperature: 100.0,
            bed_temperature: 40.0,
            safe_z_offset: 10.0,
            precision: 3,
            results_dir: None,
            park: [0.0, 0.0],
            spray_radius_vs_z: (
                vec![30.0, 20.0, 10.0, 5.0, 70.0, 40.0],
                vec![4.0, 3.0, 2.0, 1.0, 8.0, 5.0],
            ),
            strides: StrideSweep::default(),
            samples: Vec::new(),
        }
    }
}

impl SprayConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a `.json` or `.toml` file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        let config: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)?
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content).map_err(|e| Error::Toml(e.to_string()))?
        } else {
            return Err(Error::configuration(format!(
                "config file {} must be .json or .toml",
                path.display()
            )));
        };

        config.validate()?;
        tracing::debug!(path = %path.display(), samples = config.samples.len(), "loaded configuration");
        Ok(config)
    }

    /// Save configuration to a `.json` or `.toml` file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        self.validate()?;

        let content = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::to_string_pretty(self)?
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            toml::to_string_pretty(self).map_err(|e| Error::Toml(e.to_string()))?
        } else {
            return Err(Error::configuration(format!(
                "config file {} must be .json or .toml",
                path.display()
            )));
        };

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        Grid::new(self.bed_size, self.grid_step)?;
        ensure_finite("z_height", self.z_height)?;
        ensure_positive("speed", self.speed)?;
        ensure_positive("travel_speed", self.travel_speed)?;
        ensure_finite("safe_z_offset", self.safe_z_offset)?;
        ensure_finite("park[0]", self.park[0])?;
        ensure_finite("park[1]", self.park[1])?;
        for (name, t) in [
            ("nozzle_temperature", self.nozzle_temperature),
            ("bed_temperature", self.bed_temperature),
        ] {
            if ensure_finite(name, t)? < 0.0 {
                return Err(Error::configuration(format!("{} must not be negative", name)));
            }
        }

        // the working height must be usable by the configured model
        self.spray_model()?.spot_radius(self.z_height)?;

        self.strides.validate("strides")?;
        for (i, sample) in self.samples.iter().enumerate() {
            sample.validate(&format!("samples[{}]", i))?;
        }
        Ok(())
    }

    /// Calibration table from `spray_radius_vs_z`.
    pub fn calibration_table(&self) -> Result<CalibrationTable> {
        let (heights, radii) = &self.spray_radius_vs_z;
        CalibrationTable::new(heights.clone(), radii.clone())
    }

    /// The configured spray model.
    pub fn spray_model(&self) -> Result<SprayModel> {
        Ok(SprayModel::build(self.spray_function, &self.calibration_table()?)?
            .with_extrapolation(self.extrapolation))
    }

    /// Stride candidates for sample `index`.
    pub fn candidate_strides(&self, index: usize) -> Result<Vec<f64>> {
        let sample = self.samples.get(index).ok_or_else(|| {
            Error::configuration(format!(
                "sample index {} out of range ({} samples configured)",
                index,
                self.samples.len()
            ))
        })?;
        Ok(sample.strides.unwrap_or(self.strides).values())
    }

    /// Result directory, falling back to the platform data directory.
    pub fn results_dir(&self) -> PathBuf {
        self.results_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .map(|d| d.join("sprayplan").join("logs"))
                .unwrap_or_else(|| PathBuf::from("logs"))
        })
    }
}
