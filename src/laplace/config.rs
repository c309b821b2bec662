use serde::{Deserialize, Serialize};

use crate::error::SolveError;
use crate::math::Point2;

/// Rectangular solve area. The y axis points up, so `y_top > y_bottom`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Area {
    #[serde(rename = "xleft")]
    pub x_left: f64,
    #[serde(rename = "xright")]
    pub x_right: f64,
    #[serde(rename = "ytop")]
    pub y_top: f64,
    #[serde(rename = "ybottom")]
    pub y_bottom: f64,
}

impl Area {
    #[must_use]
    pub fn from_corners(top_left: Point2, bottom_right: Point2) -> Self {
        Self {
            x_left: top_left.x,
            x_right: bottom_right.x,
            y_top: top_left.y,
            y_bottom: bottom_right.y,
        }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.x_right - self.x_left
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.y_top - self.y_bottom
    }
}

impl Default for Area {
    fn default() -> Self {
        Self {
            x_left: -1e-3,
            x_right: 1e-3,
            y_top: 1e-3,
            y_bottom: -1e-3,
        }
    }
}

/// Solve parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveConfig {
    pub area: Area,
    /// Physical distance between neighbouring grid nodes.
    pub grid: f64,
    pub threads: usize,
    /// Largest per-sweep change at which the relaxation stops.
    pub threshold: f64,
    /// Hold the outline of the area at 0 V.
    pub grounded_borders: bool,
    /// Treat every region as free space when weighting the stencil.
    pub ignore_dielectric: bool,
    /// Sweep ceiling after which the solve ends as non-convergent.
    pub max_iterations: u64,
}

impl Default for SolveConfig {
    fn default() -> Self {
        Self {
            area: Area::default(),
            grid: 1e-5,
            threads: 1,
            threshold: 1e-6,
            grounded_borders: true,
            ignore_dielectric: false,
            max_iterations: 2_000_000,
        }
    }
}

/// Largest lattice, outer ring included, a solve may allocate.
pub const MAX_NODES: usize = 1 << 25;

impl SolveConfig {
    /// Checks the parameters and derives the node grid.
    ///
    /// # Errors
    ///
    /// Returns a `SolveError` for a non-positive pitch or threshold, zero
    /// threads, an area smaller than one grid cell in either direction, or a
    /// pitch so fine that the lattice would exceed [`MAX_NODES`].
    #[allow(clippy::cast_precision_loss)]
    pub fn validate(&self) -> Result<GridMap, SolveError> {
        if !self.grid.is_finite() || self.grid <= 0.0 {
            return Err(SolveError::InvalidGridPitch(self.grid));
        }
        if self.threads == 0 {
            return Err(SolveError::InvalidThreads);
        }
        if self.threshold.is_nan() || self.threshold <= 0.0 {
            return Err(SolveError::InvalidThreshold(self.threshold));
        }

        let too_many = SolveError::TooManyNodes {
            grid: self.grid,
            limit: MAX_NODES,
        };
        let width = self.area.width();
        let height = self.area.height();
        let (Some(cells_x), Some(cells_y)) = (cell_count(width, self.grid), cell_count(height, self.grid))
        else {
            return Err(too_many);
        };
        if cells_x == 0 || cells_y == 0 {
            return Err(SolveError::EmptyDomain { width, height });
        }
        // Interior nodes are cells + 1 per axis, plus the outer ring.
        let nodes = (cells_x + 3).checked_mul(cells_y + 3);
        if !nodes.is_some_and(|n| n <= MAX_NODES) {
            return Err(too_many);
        }

        Ok(GridMap {
            area: self.area,
            columns: cells_x + 1,
            rows: cells_y + 1,
            pitch_x: width / cells_x as f64,
            pitch_y: height / cells_y as f64,
        })
    }
}

/// Whole cells of size `grid` fitting into `extent`; `None` past [`MAX_NODES`].
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn cell_count(extent: f64, grid: f64) -> Option<usize> {
    if !extent.is_finite() || extent <= 0.0 {
        return Some(0);
    }
    // Absorb rounding noise such as 0.3 / 0.1 = 2.9999999999999996.
    let cells = (extent / grid + 1e-9).floor();
    if cells.is_nan() || cells > MAX_NODES as f64 {
        return None;
    }
    Some(cells as usize)
}

/// Mapping between physical coordinates and lattice nodes.
///
/// Nodes span the area edge to edge: node `(0, 0)` sits on the bottom-left
/// corner and node `(columns - 1, rows - 1)` on the top-right corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMap {
    pub area: Area,
    pub columns: usize,
    pub rows: usize,
    pub pitch_x: f64,
    pub pitch_y: f64,
}

impl GridMap {
    /// Physical position of interior node `(i, j)`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn node_position(&self, i: usize, j: usize) -> Point2 {
        Point2::new(
            self.area.x_left + i as f64 * self.pitch_x,
            self.area.y_bottom + j as f64 * self.pitch_y,
        )
    }

    /// Fractional node coordinates of a physical point.
    #[must_use]
    pub fn to_grid(&self, p: &Point2) -> (f64, f64) {
        (
            (p.x - self.area.x_left) / self.pitch_x,
            (p.y - self.area.y_bottom) / self.pitch_y,
        )
    }

    /// Returns `true` if `p` lies within `tolerance` of an area edge.
    #[must_use]
    pub fn on_border(&self, p: &Point2, tolerance: f64) -> bool {
        (p.x - self.area.x_left).abs() < tolerance
            || (p.x - self.area.x_right).abs() < tolerance
            || (p.y - self.area.y_top).abs() < tolerance
            || (p.y - self.area.y_bottom).abs() < tolerance
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_config(grid: f64) -> SolveConfig {
        SolveConfig {
            area: Area::from_corners(Point2::new(0.0, 1.0), Point2::new(1.0, 0.0)),
            grid,
            ..SolveConfig::default()
        }
    }

    #[test]
    fn grid_spans_area_edge_to_edge() {
        let map = unit_config(0.1).validate().unwrap();
        assert_eq!(map.columns, 11);
        assert_eq!(map.rows, 11);
        let corner = map.node_position(10, 10);
        assert_relative_eq!(corner.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(corner.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn uneven_extent_stretches_pitch() {
        let map = unit_config(0.3).validate().unwrap();
        assert_eq!(map.columns, 4);
        assert_relative_eq!(map.pitch_x, 1.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn to_grid_inverts_node_position() {
        let map = unit_config(0.05).validate().unwrap();
        let p = map.node_position(7, 13);
        let (gx, gy) = map.to_grid(&p);
        assert_relative_eq!(gx, 7.0, epsilon = 1e-9);
        assert_relative_eq!(gy, 13.0, epsilon = 1e-9);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(matches!(
            unit_config(0.0).validate(),
            Err(SolveError::InvalidGridPitch(_))
        ));
        assert!(matches!(
            unit_config(-1.0).validate(),
            Err(SolveError::InvalidGridPitch(_))
        ));
        assert!(matches!(
            unit_config(2.0).validate(),
            Err(SolveError::EmptyDomain { .. })
        ));

        let flipped = SolveConfig {
            area: Area::from_corners(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0)),
            ..unit_config(0.1)
        };
        assert!(matches!(flipped.validate(), Err(SolveError::EmptyDomain { .. })));

        let no_threads = SolveConfig {
            threads: 0,
            ..unit_config(0.1)
        };
        assert!(matches!(no_threads.validate(), Err(SolveError::InvalidThreads)));
    }

    #[test]
    fn fine_pitch_is_bounded() {
        for grid in [1e-4, 1e-12, 1e-300, f64::MIN_POSITIVE] {
            assert!(
                matches!(unit_config(grid).validate(), Err(SolveError::TooManyNodes { .. })),
                "{grid}"
            );
        }

        // 5000 x 5000 cells fit, 6000 x 6000 do not.
        let map = unit_config(2e-4).validate().unwrap();
        assert_eq!(map.columns, 5001);
        assert!((map.columns + 2) * (map.rows + 2) <= MAX_NODES);
        assert!(matches!(
            unit_config(1.0 / 6000.0).validate(),
            Err(SolveError::TooManyNodes { .. })
        ));
    }

    #[test]
    fn border_detection() {
        let map = unit_config(0.1).validate().unwrap();
        assert!(map.on_border(&Point2::new(0.0, 0.5), 1e-6));
        assert!(map.on_border(&Point2::new(0.5, 1.0), 1e-6));
        assert!(!map.on_border(&Point2::new(0.5, 0.5), 1e-6));
    }

    #[test]
    fn config_serializes_with_area_keys() {
        let json = serde_json::to_string(&unit_config(0.1)).unwrap();
        assert!(json.contains("\"xleft\""));
        let back: SolveConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, unit_config(0.1));

        let partial: SolveConfig = serde_json::from_str(r#"{ "grid": 2e-5 }"#).unwrap();
        assert_relative_eq!(partial.grid, 2e-5);
        assert_eq!(partial.threads, 1);
    }
}
