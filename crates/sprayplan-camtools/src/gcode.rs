//! Motion program generator
//!
//! Serializes serpentine paths into G-code: a fixed header, one `G1` line
//! per waypoint in path order, and a fixed footer. Every motion line carries
//! its feed so a partially executed file still runs at the right speed.

use crate::serpentine::{SerpentinePath, Waypoint};
use serde::{Deserialize, Serialize};
use sprayplan_core::error::{ensure_finite, ensure_positive};
use sprayplan_core::{Error, Result};

/// Highest supported coordinate precision.
pub const MAX_PRECISION: usize = 6;

/// Lines in the footer.
const FOOTER_LINES: usize = 5;

/// Parameters for the motion program generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionProgramParameters {
    /// Deposition speed for every motion line (mm/s); `None` uses each waypoint's speed
    pub speed: Option<f64>,
    /// Working nozzle height, constant during deposition (mm)
    pub z_height: f64,
    /// Decimal places for X/Y/Z coordinates
    pub precision: usize,
    /// Extra lift above the working height before parking (mm)
    pub safe_z_offset: f64,
    /// Speed for non-depositing moves (mm/s)
    pub travel_speed: f64,
    pub park_x: f64,
    pub park_y: f64,
    /// Bed temperature (°C); 0 leaves the heater alone
    pub bed_temperature: f64,
    /// Nozzle temperature (°C); 0 leaves the heater alone
    pub nozzle_temperature: f64,
}

impl Default for MotionProgramParameters {
    fn default() -> Self {
        Self {
            speed: None,
            z_height: 70.0,
            precision: 3,
            safe_z_offset: 10.0,
            travel_speed: 50.0,
            park_x: 0.0,
            park_y: 0.0,
            bed_temperature: 0.0,
            nozzle_temperature: 0.0,
        }
    }
}

impl MotionProgramParameters {
    pub fn validate(&self) -> Result<()> {
        if let Some(speed) = self.speed {
            ensure_positive("speed", speed)?;
        }
        ensure_finite("z_height", self.z_height)?;
        ensure_finite("safe_z_offset", self.safe_z_offset)?;
        ensure_positive("travel_speed", self.travel_speed)?;
        ensure_finite("park_x", self.park_x)?;
        ensure_finite("park_y", self.park_y)?;
        for (name, t) in [
            ("bed_temperature", self.bed_temperature),
            ("nozzle_temperature", self.nozzle_temperature),
        ] {
            if ensure_finite(name, t)? < 0.0 {
                return Err(Error::configuration(format!("{} must not be negative", name)));
            }
        }
        if self.precision > MAX_PRECISION {
            return Err(Error::configuration(format!(
                "precision {} exceeds the maximum of {}",
                self.precision, MAX_PRECISION
            )));
        }
        Ok(())
    }
}

/// Generator for deposition G-code
pub struct MotionProgramGenerator {
    params: MotionProgramParameters,
}

impl MotionProgramGenerator {
    pub fn new(params: MotionProgramParameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &MotionProgramParameters {
        &self.params
    }

    /// Number of lines before the first motion line.
    pub fn header_line_count(&self) -> usize {
        let mut lines = 6;
        if self.params.bed_temperature > 0.0 {
            lines += 2;
        }
        if self.params.nozzle_temperature > 0.0 {
            lines += 2;
        }
        lines
    }

    /// Number of lines after the last motion line.
    pub fn footer_line_count(&self) -> usize {
        FOOTER_LINES
    }

    /// Emits the program for a single path.
    pub fn emit(&self, path: &SerpentinePath) -> Result<String> {
        self.params.validate()?;
        let mut gcode = String::new();
        self.push_header(&mut gcode);
        for w in path.waypoints() {
            self.push_motion(&mut gcode, w);
        }
        self.push_footer(&mut gcode);
        Ok(gcode)
    }

    /// Emits one program covering several named paths in order.
    ///
    /// Each section is introduced by a comment line. A non-empty section
    /// then travels to its first waypoint with a rapid `G0` move, so the
    /// nozzle does not deposit between samples.
    pub fn generate_sections(&self, sections: &[(&str, &SerpentinePath)]) -> Result<String> {
        self.params.validate()?;
        let mut gcode = String::new();
        self.push_header(&mut gcode);
        for (name, path) in sections {
            gcode.push_str(&format!(
                "; Deposition for {} (stride {:.3} mm, {} lines, {} waypoints)\n",
                name,
                path.stride(),
                path.line_count(),
                path.len()
            ));
            if let Some(first) = path.waypoints().first() {
                self.push_approach(&mut gcode, first);
            }
            for w in path.waypoints() {
                self.push_motion(&mut gcode, w);
            }
        }
        self.push_footer(&mut gcode);
        Ok(gcode)
    }

    fn push_header(&self, gcode: &mut String) {
        let p = &self.params;
        let prec = p.precision;
        let travel = p.travel_speed * 60.0;

        gcode.push_str("; SprayPlan deposition program\n");
        gcode.push_str("G28 ; Home all axes\n");
        gcode.push_str("G21 ; Set units to millimeters\n");
        gcode.push_str("G90 ; Use absolute coordinates\n");
        gcode.push_str(&format!(
            "G0 Z{:.prec$} F{:.1} ; Move to working height\n",
            p.z_height, travel
        ));
        if p.bed_temperature > 0.0 {
            gcode.push_str(&format!("M140 S{:.0} ; Set bed temperature\n", p.bed_temperature));
            gcode.push_str(&format!("M190 S{:.0} ; Wait for bed temperature\n", p.bed_temperature));
        }
        if p.nozzle_temperature > 0.0 {
            gcode.push_str(&format!(
                "M104 S{:.0} ; Set nozzle temperature\n",
                p.nozzle_temperature
            ));
            gcode.push_str(&format!(
                "M109 S{:.0} ; Wait for nozzle temperature\n",
                p.nozzle_temperature
            ));
        }
        gcode.push_str("PAUSE ; Wait for user confirmation to start\n");
    }

    fn push_approach(&self, gcode: &mut String, w: &Waypoint) {
        let prec = self.params.precision;
        gcode.push_str(&format!(
            "G0 X{:.prec$} Y{:.prec$} F{:.1} ; Approach\n",
            w.position.x,
            w.position.y,
            self.params.travel_speed * 60.0
        ));
    }

    fn push_motion(&self, gcode: &mut String, w: &Waypoint) {
        let prec = self.params.precision;
        let feed = self.params.speed.unwrap_or(w.speed) * 60.0;
        gcode.push_str(&format!(
            "G1 X{:.prec$} Y{:.prec$} F{:.1}\n",
            w.position.x, w.position.y, feed
        ));
    }

    fn push_footer(&self, gcode: &mut String) {
        let p = &self.params;
        let prec = p.precision;
        let travel = p.travel_speed * 60.0;

        gcode.push_str(&format!(
            "G0 Z{:.prec$} F{:.1} ; Raise to safe height\n",
            p.z_height + p.safe_z_offset,
            travel
        ));
        gcode.push_str(&format!(
            "G0 X{:.prec$} Y{:.prec$} F{:.1} ; Park\n",
            p.park_x, p.park_y, travel
        ));
        gcode.push_str("M140 S0 ; Turn off bed heater\n");
        gcode.push_str("M104 S0 ; Turn off nozzle heater\n");
        gcode.push_str("M30 ; End of program\n");
    }
}

/// Position and feed recovered from a `G1` motion line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionLine {
    pub x: f64,
    pub y: f64,
    /// Feed in mm/min
    pub feed: f64,
}

/// Parses a `G1 X.. Y.. F..` line.
///
/// Returns `Ok(None)` for any other line, including `G1` moves without both
/// X and Y. A word with an unparsable number is a configuration error.
pub fn parse_motion_line(line: &str) -> Result<Option<MotionLine>> {
    let code = line.split(';').next().unwrap_or("").trim();
    let mut words = code.split_whitespace();
    if words.next() != Some("G1") {
        return Ok(None);
    }

    let (mut x, mut y, mut feed) = (None, None, None);
    for word in words {
        let mut chars = word.chars();
        let slot = match chars.next() {
            Some('X') => &mut x,
            Some('Y') => &mut y,
            Some('F') => &mut feed,
            _ => continue,
        };
        let parsed = chars.as_str().parse::<f64>().map_err(|_| {
            Error::configuration(format!("malformed word '{}' in motion line '{}'", word, line))
        })?;
        *slot = Some(parsed);
    }

    match (x, y, feed) {
        (Some(x), Some(y), Some(feed)) => Ok(Some(MotionLine { x, y, feed })),
        _ => Ok(None),
    }
}

/// Extracts every motion line of a program, in order.
pub fn parse_motion_program(program: &str) -> Result<Vec<MotionLine>> {
    let mut motions = Vec::new();
    for line in program.lines() {
        if let Some(m) = parse_motion_line(line)? {
            motions.push(m);
        }
    }
    Ok(motions)
}
