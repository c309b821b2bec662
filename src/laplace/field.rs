use super::config::GridMap;
use crate::lattice::Lattice;
use crate::math::{Point2, Vector2};

/// Read access to a solved potential.
pub trait PotentialField {
    /// Potential at `p`; NaN if unavailable.
    fn potential(&self, p: &Point2) -> f64;

    /// Forward-difference gradient at `p`, in volts per grid cell. Zero if
    /// unavailable.
    fn gradient(&self, p: &Point2) -> Vector2;
}

/// Relaxed lattice together with its physical placement.
#[derive(Debug, Clone)]
pub struct SolvedField {
    lattice: Lattice,
    map: GridMap,
    revision: u64,
}

impl SolvedField {
    #[must_use]
    pub fn new(lattice: Lattice, map: GridMap, revision: u64) -> Self {
        Self {
            lattice,
            map,
            revision,
        }
    }

    #[must_use]
    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    #[must_use]
    pub fn map(&self) -> &GridMap {
        &self.map
    }

    /// Revision of the element list the field was solved for.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Full lattice index (ring included) of `p` under `snap`.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn index(&self, p: &Point2, snap: fn(f64) -> f64) -> Option<(usize, usize)> {
        let (gx, gy) = self.map.to_grid(p);
        let x = snap(gx) + 1.0;
        let y = snap(gy) + 1.0;
        if x.is_nan() || y.is_nan() || x < 0.0 || y < 0.0 {
            return None;
        }
        if x >= self.lattice.full_columns() as f64 || y >= self.lattice.full_rows() as f64 {
            return None;
        }
        Some((x as usize, y as usize))
    }
}

impl PotentialField for SolvedField {
    fn potential(&self, p: &Point2) -> f64 {
        self.index(p, f64::round)
            .map_or(f64::NAN, |(x, y)| self.lattice.value(x, y))
    }

    fn gradient(&self, p: &Point2) -> Vector2 {
        let Some((x, y)) = self.index(p, f64::floor) else {
            return Vector2::zeros();
        };
        let here = self.lattice.value(x, y);
        let right = self.lattice.value(x + 1, y);
        let up = self.lattice.value(x, y + 1);
        if here.is_nan() || right.is_nan() || up.is_nan() {
            return Vector2::zeros();
        }
        Vector2::new(right - here, up - here)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::laplace::config::{Area, SolveConfig};
    use crate::lattice::Condition;
    use approx::assert_relative_eq;

    /// Field on the unit square fixed to `v = 2x + 3y` at every node.
    fn ramp() -> SolvedField {
        let config = SolveConfig {
            area: Area::from_corners(Point2::new(0.0, 1.0), Point2::new(1.0, 0.0)),
            grid: 0.1,
            ..SolveConfig::default()
        };
        let map = config.validate().unwrap();
        let lattice = Lattice::new(
            map.columns,
            map.rows,
            |i, j| {
                let p = map.node_position(i, j);
                Condition::Dirichlet(2.0 * p.x + 3.0 * p.y)
            },
            |_, _| 1.0,
        )
        .unwrap();
        SolvedField::new(lattice, map, 7)
    }

    #[test]
    fn potential_snaps_to_nearest_node() {
        let field = ramp();
        assert_relative_eq!(field.potential(&Point2::new(0.5, 0.5)), 2.5, epsilon = 1e-12);
        assert_relative_eq!(field.potential(&Point2::new(0.52, 0.48)), 2.5, epsilon = 1e-12);
        assert_relative_eq!(field.potential(&Point2::new(0.0, 0.0)), 0.0, epsilon = 1e-12);
        assert_relative_eq!(field.potential(&Point2::new(1.0, 1.0)), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn potential_outside_is_nan() {
        let field = ramp();
        assert!(field.potential(&Point2::new(-0.2, 0.5)).is_nan());
        assert!(field.potential(&Point2::new(0.5, 1.3)).is_nan());
        assert!(field.potential(&Point2::new(f64::NAN, 0.5)).is_nan());
    }

    #[test]
    fn gradient_is_per_cell_difference() {
        let field = ramp();
        let g = field.gradient(&Point2::new(0.43, 0.61));
        assert_relative_eq!(g.x, 0.2, epsilon = 1e-12);
        assert_relative_eq!(g.y, 0.3, epsilon = 1e-12);
    }

    #[test]
    fn gradient_at_edge_is_zero() {
        let field = ramp();
        // The forward neighbour of the last column is the NaN ring.
        assert_eq!(field.gradient(&Point2::new(1.0, 0.5)), Vector2::zeros());
        assert_eq!(field.gradient(&Point2::new(-0.5, 0.5)), Vector2::zeros());
    }

    #[test]
    fn keeps_revision() {
        assert_eq!(ramp().revision(), 7);
    }
}
