//! Bed grid
//!
//! Discretizes the square work surface into `n × n` cells where
//! `n = round(bed_size / grid_step)`. The effective cell size is
//! `bed_size / n`, so the cells tile the bed exactly; cell `(ix, iy)` is
//! centred on `((ix + 0.5)·c, (iy + 0.5)·c)`.
//!
//! The grid also owns the ordered collection of masks registered against it.
//! Masks are appended, never merged, and never mutated after creation.

use crate::error::{ensure_positive, Error, Result};
use crate::geometry::{Point, Rect};
use crate::mask::{Mask, Shape};
use tracing::debug;

/// Upper bound on cells per axis; keeps accumulators within a sane memory budget.
pub const MAX_CELLS_PER_AXIS: usize = 16_384;

/// Tolerance used when testing whether a coordinate lies on the bed.
pub const BED_TOLERANCE: f64 = 1e-9;

/// Discretized bed surface plus its masks.
#[derive(Debug, Clone)]
pub struct Grid {
    bed_size: f64,
    grid_step: f64,
    cells_per_axis: usize,
    cell_size: f64,
    masks: Vec<Mask>,
}

impl Grid {
    /// Creates a grid for a square bed.
    ///
    /// Fails with a configuration error when either input is non-positive or
    /// non-finite, or when the resulting dimension is zero.
    pub fn new(bed_size: f64, grid_step: f64) -> Result<Self> {
        ensure_positive("bed_size", bed_size)?;
        ensure_positive("grid_step", grid_step)?;

        let cells = (bed_size / grid_step).round();
        if cells < 1.0 {
            return Err(Error::configuration(format!(
                "grid_step {} is too coarse for bed_size {}: zero cells per axis",
                grid_step, bed_size
            )));
        }
        if cells > MAX_CELLS_PER_AXIS as f64 {
            return Err(Error::configuration(format!(
                "grid_step {} is too fine for bed_size {}: {} cells per axis exceeds {}",
                grid_step, bed_size, cells, MAX_CELLS_PER_AXIS
            )));
        }

        let cells_per_axis = cells as usize;
        debug!(bed_size, grid_step, cells_per_axis, "created bed grid");

        Ok(Self {
            bed_size,
            grid_step,
            cells_per_axis,
            cell_size: bed_size / cells,
            masks: Vec::new(),
        })
    }

    /// Rebuilds the grid with a new resolution, re-rasterizing every mask.
    pub fn resized(&self, bed_size: f64, grid_step: f64) -> Result<Self> {
        let mut grid = Grid::new(bed_size, grid_step)?;
        for mask in &self.masks {
            grid.add_mask(mask.name(), mask.shape().clone())?;
        }
        Ok(grid)
    }

    pub fn bed_size(&self) -> f64 {
        self.bed_size
    }

    /// The requested resolution, before rounding to a whole number of cells.
    pub fn grid_step(&self) -> f64 {
        self.grid_step
    }

    pub fn cells_per_axis(&self) -> usize {
        self.cells_per_axis
    }

    /// The effective cell edge length.
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn cell_count(&self) -> usize {
        self.cells_per_axis * self.cells_per_axis
    }

    pub fn bed_rect(&self) -> Rect {
        Rect::from_corners(Point::new(0.0, 0.0), Point::new(self.bed_size, self.bed_size))
    }

    /// Row-major flat index of a cell.
    #[inline]
    pub fn index(&self, ix: usize, iy: usize) -> usize {
        iy * self.cells_per_axis + ix
    }

    #[inline]
    pub fn cell_center(&self, ix: usize, iy: usize) -> Point {
        Point::new(
            (ix as f64 + 0.5) * self.cell_size,
            (iy as f64 + 0.5) * self.cell_size,
        )
    }

    /// The cell containing `p`, or `None` when `p` is off the bed.
    pub fn cell_at(&self, p: Point) -> Option<(usize, usize)> {
        if !self.contains(p) {
            return None;
        }
        let last = self.cells_per_axis - 1;
        let ix = ((p.x / self.cell_size).floor().max(0.0) as usize).min(last);
        let iy = ((p.y / self.cell_size).floor().max(0.0) as usize).min(last);
        Some((ix, iy))
    }

    /// Whether `p` lies on the bed (boundary inclusive).
    pub fn contains(&self, p: Point) -> bool {
        p.is_finite()
            && p.x >= -BED_TOLERANCE
            && p.y >= -BED_TOLERANCE
            && p.x <= self.bed_size + BED_TOLERANCE
            && p.y <= self.bed_size + BED_TOLERANCE
    }

    /// Inclusive range of cell indices along one axis whose centres fall in `[lo, hi]`.
    ///
    /// Returns `None` when no centre falls in the interval.
    pub fn cell_span(&self, lo: f64, hi: f64) -> Option<(usize, usize)> {
        let first = (lo / self.cell_size - 0.5 - BED_TOLERANCE).ceil().max(0.0);
        let last = (hi / self.cell_size - 0.5 + BED_TOLERANCE)
            .floor()
            .min((self.cells_per_axis - 1) as f64);
        if last < first {
            return None;
        }
        Some((first as usize, last as usize))
    }

    /// Rasterizes `shape` and appends it to the mask collection.
    ///
    /// A shape entirely outside the bed is a configuration error; a shape
    /// partially outside is clamped to the bed. A rasterization without any
    /// cell is rejected as an empty region. Returns the new mask's index.
    pub fn add_mask(&mut self, name: impl Into<String>, shape: Shape) -> Result<usize> {
        let mask = Mask::rasterize(self, name, shape)?;
        if mask.is_empty() {
            return Err(Error::empty_region(mask.name()));
        }
        debug!(
            mask = mask.name(),
            cells = mask.cell_count(),
            index = self.masks.len(),
            "registered mask"
        );
        self.masks.push(mask);
        Ok(self.masks.len() - 1)
    }

    pub fn masks(&self) -> &[Mask] {
        &self.masks
    }

    pub fn mask(&self, index: usize) -> Option<&Mask> {
        self.masks.get(index)
    }

    /// Looks a mask up by index, failing with a configuration error when absent.
    pub fn require_mask(&self, index: usize) -> Result<&Mask> {
        self.masks.get(index).ok_or_else(|| {
            Error::configuration(format!(
                "mask index {} out of range ({} masks registered)",
                index,
                self.masks.len()
            ))
        })
    }

    /// Whether the point `(x, y)` lies in a selected cell of mask `index`.
    pub fn point_in_mask(&self, index: usize, x: f64, y: f64) -> Result<bool> {
        let mask = self.require_mask(index)?;
        Ok(self
            .cell_at(Point::new(x, y))
            .is_some_and(|(ix, iy)| mask.contains_cell(ix, iy)))
    }
}
