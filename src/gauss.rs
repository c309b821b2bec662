use crate::laplace::PotentialField;
use crate::math::polygon_2d::{is_clockwise, offset};
use crate::math::{Point2, TOLERANCE};
use crate::model::{Element, ElementList};

/// Gauss-law line integral of the outward field around a polygon.
///
/// The contour is the polygon grown by `distance`, so it runs through the
/// medium surrounding the conductor instead of along its fixed-potential
/// surface. Each edge is sampled at the midpoints of steps no longer than the
/// grid pitch. With a dielectric list the field is scaled by the local `εr`,
/// which turns the result into the free charge. The result is normalized so
/// a conductor at positive potential yields positive charge.
#[derive(Debug, Clone, Copy)]
pub struct GaussIntegral<'a> {
    vertices: &'a [Point2],
    grid: f64,
    distance: f64,
    dielectric: Option<&'a ElementList>,
}

impl<'a> GaussIntegral<'a> {
    /// Integrates around `vertices` with a step of at most `grid`.
    #[must_use]
    pub fn new(vertices: &'a [Point2], grid: f64, distance: f64) -> Self {
        Self {
            vertices,
            grid,
            distance,
            dielectric: None,
        }
    }

    /// Integrates around an element outline.
    #[must_use]
    pub fn around(element: &'a Element, grid: f64, distance: f64) -> Self {
        Self::new(element.vertices(), grid, distance)
    }

    /// Scales the field by the permittivity found in `list`.
    #[must_use]
    pub fn with_dielectric(mut self, list: &'a ElementList) -> Self {
        self.dielectric = Some(list);
        self
    }

    /// Evaluates the integral against `field`.
    ///
    /// Degenerate outlines and a non-positive pitch give 0.
    #[must_use]
    pub fn execute<F: PotentialField + ?Sized>(&self, field: &F) -> f64 {
        if self.vertices.len() < 3 || self.grid.is_nan() || self.grid <= 0.0 {
            return 0.0;
        }
        let contour = offset(self.vertices, self.distance);
        let n = contour.len();
        if n < 3 {
            return 0.0;
        }

        let mut sum = 0.0;
        for i in 0..n {
            let from = contour[(i + n - 1) % n];
            let to = contour[i];
            let edge = to - from;
            let length = edge.norm();
            if length < TOLERANCE {
                continue;
            }

            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let steps = ((length / self.grid).ceil() as usize).max(1);
            #[allow(clippy::cast_precision_loss)]
            let step = length / steps as f64;
            let dir = edge / length;
            let increment = dir * step;

            let mut point = from + increment / 2.0;
            for _ in 0..steps {
                let mut gradient = field.gradient(&point);
                if let Some(list) = self.dielectric {
                    gradient *= list.dielectric_constant_at(&point);
                }
                // Component along the right-hand normal of the edge.
                let across = gradient.x * dir.y - gradient.y * dir.x;
                sum += across * step / self.grid;
                point += increment;
            }
        }

        // The right-hand normal points outward only on counter-clockwise
        // contours, and the field points into a positive conductor.
        if is_clockwise(self.vertices) {
            sum
        } else {
            -sum
        }
    }
}

/// Charge enclosed by `element` in `field`, see [`GaussIntegral`].
#[must_use]
pub fn charge<F: PotentialField + ?Sized>(
    field: &F,
    dielectric: Option<&ElementList>,
    element: &Element,
    grid: f64,
    distance: f64,
) -> f64 {
    let integral = GaussIntegral::around(element, grid, distance);
    match dielectric {
        Some(list) => integral.with_dielectric(list).execute(field),
        None => integral.execute(field),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Vector2;
    use crate::model::ElementKind;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    /// Line charge `q` at the origin, gradient expressed per cell of `grid`.
    struct LineCharge {
        q: f64,
        grid: f64,
    }

    impl PotentialField for LineCharge {
        fn potential(&self, p: &Point2) -> f64 {
            -self.q / (2.0 * PI) * p.coords.norm().ln()
        }

        fn gradient(&self, p: &Point2) -> Vector2 {
            let r2 = p.coords.norm_squared();
            p.coords * (-self.q / (2.0 * PI) / r2 * self.grid)
        }
    }

    struct Uniform(Vector2);

    impl PotentialField for Uniform {
        fn potential(&self, p: &Point2) -> f64 {
            self.0.dot(&p.coords)
        }

        fn gradient(&self, _p: &Point2) -> Vector2 {
            self.0
        }
    }

    fn square(half: f64) -> Element {
        Element::rectangle(
            ElementKind::TracePos,
            Point2::new(-half, -half),
            Point2::new(half, half),
        )
    }

    #[test]
    fn encloses_line_charge() {
        let field = LineCharge { q: 2.5, grid: 0.01 };
        let q = charge(&field, None, &square(0.5), 0.01, 0.1);
        assert_relative_eq!(q, 2.5, max_relative = 1e-3);
    }

    #[test]
    fn orientation_does_not_change_sign() {
        let field = LineCharge { q: 1.0, grid: 0.01 };
        let ccw = square(0.4);
        let mut cw_vertices = ccw.vertices().to_vec();
        cw_vertices.reverse();
        let cw = Element::with_vertices(ElementKind::TracePos, cw_vertices);

        let a = charge(&field, None, &ccw, 0.01, 0.05);
        let b = charge(&field, None, &cw, 0.01, 0.05);
        assert!(a > 0.0);
        assert_relative_eq!(a, b, max_relative = 1e-9);
    }

    #[test]
    fn uniform_field_encloses_nothing() {
        let field = Uniform(Vector2::new(0.3, -0.7));
        let q = charge(&field, None, &square(1.0), 0.01, 0.2);
        assert!(q.abs() < 1e-9, "{q}");
    }

    #[test]
    fn dielectric_scales_charge() {
        let field = LineCharge { q: 1.0, grid: 0.01 };
        let mut list = ElementList::new();
        list.add(
            Element::rectangle(
                ElementKind::Dielectric,
                Point2::new(-5.0, -5.0),
                Point2::new(5.0, 5.0),
            )
            .with_epsilon_r(4.0),
        );
        let q = GaussIntegral::around(&square(0.5), 0.01, 0.1)
            .with_dielectric(&list)
            .execute(&field);
        assert_relative_eq!(q, 4.0, max_relative = 1e-3);
    }

    #[test]
    fn degenerate_outline_has_no_charge() {
        let field = LineCharge { q: 1.0, grid: 0.01 };
        let line = [Point2::new(-1.0, 0.0), Point2::new(1.0, 0.0)];
        assert_relative_eq!(GaussIntegral::new(&line, 0.01, 0.1).execute(&field), 0.0);
        assert_relative_eq!(
            GaussIntegral::around(&square(0.5), 0.0, 0.1).execute(&field),
            0.0
        );
    }
}
