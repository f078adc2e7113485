//! Masks: named boolean regions of interest over the bed grid.
//!
//! A mask is rasterized once from a [`Shape`]; a cell is selected when its
//! centre lies inside the shape (boundary inclusive). Shapes reaching past
//! the bed are clamped to it before rasterization.

use crate::error::{ensure_finite, ensure_positive, Error, Result};
use crate::geometry::{Point, Rect};
use crate::grid::{Grid, BED_TOLERANCE};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shape descriptor a mask is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Shape {
    /// Axis-aligned rectangle given by its corners.
    Rectangle { min: Point, max: Point },
    /// Disc given by centre and radius.
    Circle { center: Point, radius: f64 },
}

impl Shape {
    /// Rectangle from its lower-left corner and size.
    pub fn rectangle(position: Point, width: f64, height: f64) -> Self {
        let r = Rect::from_position_size(position, width, height);
        Shape::Rectangle {
            min: r.min,
            max: r.max,
        }
    }

    pub fn circle(center: Point, radius: f64) -> Self {
        Shape::Circle { center, radius }
    }

    /// Short name of the shape kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Shape::Rectangle { .. } => "rectangle",
            Shape::Circle { .. } => "circle",
        }
    }

    /// Checks that the descriptor is finite and non-degenerate.
    pub fn validate(&self) -> Result<()> {
        match self {
            Shape::Rectangle { min, max } => {
                ensure_finite("rectangle min.x", min.x)?;
                ensure_finite("rectangle min.y", min.y)?;
                ensure_finite("rectangle max.x", max.x)?;
                ensure_finite("rectangle max.y", max.y)?;
                if max.x <= min.x || max.y <= min.y {
                    return Err(Error::configuration(format!(
                        "rectangle {} .. {} has non-positive size",
                        min, max
                    )));
                }
            }
            Shape::Circle { center, radius } => {
                ensure_finite("circle center.x", center.x)?;
                ensure_finite("circle center.y", center.y)?;
                ensure_positive("circle radius", *radius)?;
            }
        }
        Ok(())
    }

    /// Bounding box of the unclamped shape.
    pub fn bounding_box(&self) -> Rect {
        match self {
            Shape::Rectangle { min, max } => Rect::from_corners(*min, *max),
            Shape::Circle { center, radius } => Rect::from_corners(
                Point::new(center.x - radius, center.y - radius),
                Point::new(center.x + radius, center.y + radius),
            ),
        }
    }

    /// Whether `p` lies inside the shape (boundary inclusive).
    pub fn contains(&self, p: Point) -> bool {
        match self {
            Shape::Rectangle { min, max } => {
                p.x >= min.x - BED_TOLERANCE
                    && p.x <= max.x + BED_TOLERANCE
                    && p.y >= min.y - BED_TOLERANCE
                    && p.y <= max.y + BED_TOLERANCE
            }
            Shape::Circle { center, radius } => {
                p.distance_to(center) <= radius + BED_TOLERANCE
            }
        }
    }

    /// Analytic area of the unclamped shape.
    pub fn area(&self) -> f64 {
        match self {
            Shape::Rectangle { min, max } => (max.x - min.x) * (max.y - min.y),
            Shape::Circle { radius, .. } => std::f64::consts::PI * radius * radius,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Rectangle { min, max } => write!(f, "rectangle {} .. {}", min, max),
            Shape::Circle { center, radius } => {
                write!(f, "circle at {} r={:.3}", center, radius)
            }
        }
    }
}

/// A named boolean field over the grid cells.
#[derive(Debug, Clone)]
pub struct Mask {
    name: String,
    shape: Shape,
    bounds: Rect,
    cells_per_axis: usize,
    cells: Vec<bool>,
    cell_count: usize,
}

impl Mask {
    /// Rasterizes `shape` onto `grid` without registering it.
    ///
    /// Fails with a configuration error when the shape is invalid or lies
    /// entirely outside the bed. The resulting mask may be empty when the
    /// shape falls between cell centres.
    pub fn rasterize(grid: &Grid, name: impl Into<String>, shape: Shape) -> Result<Self> {
        let name = name.into();
        shape.validate()?;

        let bounds = shape
            .bounding_box()
            .intersect(&grid.bed_rect())
            .filter(|r| r.width() > 0.0 && r.height() > 0.0)
            .ok_or_else(|| {
                Error::configuration(format!(
                    "mask '{}': {} lies entirely outside the {:.3} mm bed",
                    name,
                    shape,
                    grid.bed_size()
                ))
            })?;

        let n = grid.cells_per_axis();
        let mut cells = vec![false; n * n];
        let mut cell_count = 0;

        if let (Some((x0, x1)), Some((y0, y1))) = (
            grid.cell_span(bounds.min.x, bounds.max.x),
            grid.cell_span(bounds.min.y, bounds.max.y),
        ) {
            for iy in y0..=y1 {
                for ix in x0..=x1 {
                    let centre = grid.cell_center(ix, iy);
                    if shape.contains(centre) {
                        cells[grid.index(ix, iy)] = true;
                        cell_count += 1;
                    }
                }
            }
        }

        Ok(Self {
            name,
            shape,
            bounds,
            cells_per_axis: n,
            cells,
            cell_count,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Bounding box of the shape after clamping to the bed.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn cells_per_axis(&self) -> usize {
        self.cells_per_axis
    }

    /// Number of selected cells.
    pub fn cell_count(&self) -> usize {
        self.cell_count
    }

    pub fn is_empty(&self) -> bool {
        self.cell_count == 0
    }

    pub fn contains_cell(&self, ix: usize, iy: usize) -> bool {
        ix < self.cells_per_axis
            && iy < self.cells_per_axis
            && self.cells[iy * self.cells_per_axis + ix]
    }

    /// Row-major selection flags.
    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    /// Flat indices of the selected cells.
    pub fn selected_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(i, &selected)| selected.then_some(i))
    }

    /// Whether this mask was rasterized on a grid with the same layout.
    pub fn matches(&self, grid: &Grid) -> bool {
        self.cells_per_axis == grid.cells_per_axis()
    }

    /// Rasterized area in mm².
    pub fn area(&self, grid: &Grid) -> f64 {
        self.cell_count as f64 * grid.cell_size() * grid.cell_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_rasterization() {
        let grid = Grid::new(100.0, 1.0).unwrap();
        let mask = Mask::rasterize(
            &grid,
            "r",
            Shape::rectangle(Point::new(10.0, 20.0), 30.0, 10.0),
        )
        .unwrap();
        // centres 10.5..39.5 by 20.5..29.5
        assert_eq!(mask.cell_count(), 300);
        assert!(mask.contains_cell(10, 20));
        assert!(mask.contains_cell(39, 29));
        assert!(!mask.contains_cell(40, 29));
        assert!(!mask.contains_cell(9, 20));
    }

    #[test]
    fn test_partially_outside_is_clamped() {
        let grid = Grid::new(100.0, 1.0).unwrap();
        let mask = Mask::rasterize(
            &grid,
            "edge",
            Shape::rectangle(Point::new(90.0, -5.0), 20.0, 10.0),
        )
        .unwrap();
        assert_eq!(mask.bounds().min, Point::new(90.0, 0.0));
        assert_eq!(mask.bounds().max, Point::new(100.0, 5.0));
        assert_eq!(mask.cell_count(), 50);
    }

    #[test]
    fn test_circle_rasterization() {
        let grid = Grid::new(100.0, 0.5).unwrap();
        let shape = Shape::circle(Point::new(50.0, 50.0), 10.0);
        let mask = Mask::rasterize(&grid, "c", shape.clone()).unwrap();
        let rel = (mask.area(&grid) - shape.area()).abs() / shape.area();
        assert!(rel < 0.05, "relative area error {}", rel);
        assert!(mask.contains_cell(100, 100));
        assert!(!mask.contains_cell(120, 120));
    }

    #[test]
    fn test_degenerate_shapes_rejected() {
        let grid = Grid::new(100.0, 1.0).unwrap();
        let flat = Shape::rectangle(Point::new(10.0, 10.0), 0.0, 5.0);
        assert!(Mask::rasterize(&grid, "flat", flat).unwrap_err().is_configuration());
        let dot = Shape::circle(Point::new(10.0, 10.0), 0.0);
        assert!(Mask::rasterize(&grid, "dot", dot).unwrap_err().is_configuration());
    }

    #[test]
    fn test_touching_bed_edge_is_outside() {
        let grid = Grid::new(100.0, 1.0).unwrap();
        let shape = Shape::rectangle(Point::new(100.0, 10.0), 5.0, 5.0);
        assert!(Mask::rasterize(&grid, "t", shape).unwrap_err().is_configuration());
    }

    #[test]
    fn test_selected_indices_match_count() {
        let grid = Grid::new(20.0, 1.0).unwrap();
        let mask =
            Mask::rasterize(&grid, "r", Shape::rectangle(Point::new(2.0, 2.0), 4.0, 3.0))
                .unwrap();
        assert_eq!(mask.selected_indices().count(), mask.cell_count());
        assert_eq!(mask.cell_count(), 12);
    }

    #[test]
    fn test_shape_serde_uses_type_tag() {
        let shape = Shape::circle(Point::new(1.0, 2.0), 3.0);
        let json = serde_json::to_string(&shape).unwrap();
        assert!(json.contains("\"type\":\"circle\""));
        let back: Shape = serde_json::from_str(&json).unwrap();
        assert_eq!(back, shape);
    }
}
