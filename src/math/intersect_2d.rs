use super::{Point2, Vector2, TOLERANCE};

/// Result of intersecting two line segments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intersection {
    /// The supporting lines are parallel (or one segment has zero length).
    Parallel,
    /// The crossing lies within both segments.
    Bounded(Point2),
    /// The crossing lies on the extension of at least one segment.
    Unbounded(Point2),
}

impl Intersection {
    /// Returns the crossing point, bounded or not.
    #[must_use]
    pub fn point(&self) -> Option<Point2> {
        match *self {
            Self::Parallel => None,
            Self::Bounded(p) | Self::Unbounded(p) => Some(p),
        }
    }
}

/// A directed line segment from `start` to `end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub start: Point2,
    pub end: Point2,
}

impl Line {
    /// Creates a new segment.
    #[must_use]
    pub fn new(start: Point2, end: Point2) -> Self {
        Self { start, end }
    }

    /// Direction vector `end - start` (not normalized).
    #[must_use]
    pub fn direction(&self) -> Vector2 {
        self.end - self.start
    }

    /// Segment length.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.direction().norm()
    }

    /// Unit normal pointing to the right of the walking direction.
    ///
    /// For a counter-clockwise polygon this is the outward normal. Returns a
    /// zero vector for a zero-length segment.
    #[must_use]
    pub fn right_normal(&self) -> Vector2 {
        let d = self.direction();
        let len = d.norm();
        if len < TOLERANCE {
            return Vector2::zeros();
        }
        Vector2::new(d.y / len, -d.x / len)
    }

    /// Returns a copy of the segment shifted by `offset`.
    #[must_use]
    pub fn translated(&self, offset: Vector2) -> Self {
        Self::new(self.start + offset, self.end + offset)
    }

    /// Intersects the supporting lines of two segments and classifies the
    /// crossing point.
    #[must_use]
    pub fn intersect(&self, other: &Line) -> Intersection {
        let da = self.direction();
        let db = other.direction();

        let cross = da.x * db.y - da.y * db.x;
        if cross.abs() < TOLERANCE * TOLERANCE {
            return Intersection::Parallel;
        }

        let w = other.start - self.start;
        let t = (w.x * db.y - w.y * db.x) / cross;
        let u = (w.x * da.y - w.y * da.x) / cross;
        let point = self.start + da * t;

        // Small epsilon so shared endpoints count as bounded.
        let eps = 1e-9;
        if (-eps..=1.0 + eps).contains(&t) && (-eps..=1.0 + eps).contains(&u) {
            Intersection::Bounded(point)
        } else {
            Intersection::Unbounded(point)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    #[test]
    fn crossing_segments_are_bounded() {
        let a = Line::new(p(0.0, 0.0), p(2.0, 2.0));
        let b = Line::new(p(0.0, 2.0), p(2.0, 0.0));
        match a.intersect(&b) {
            Intersection::Bounded(pt) => {
                assert_abs_diff_eq!(pt.x, 1.0, epsilon = 1e-12);
                assert_abs_diff_eq!(pt.y, 1.0, epsilon = 1e-12);
            }
            other => panic!("expected bounded intersection, got {other:?}"),
        }
    }

    #[test]
    fn extension_crossing_is_unbounded() {
        let a = Line::new(p(0.0, 0.0), p(1.0, 0.0));
        let b = Line::new(p(3.0, -1.0), p(3.0, 1.0));
        match a.intersect(&b) {
            Intersection::Unbounded(pt) => {
                assert_abs_diff_eq!(pt.x, 3.0, epsilon = 1e-12);
                assert_abs_diff_eq!(pt.y, 0.0, epsilon = 1e-12);
            }
            other => panic!("expected unbounded intersection, got {other:?}"),
        }
    }

    #[test]
    fn parallel_segments() {
        let a = Line::new(p(0.0, 0.0), p(1.0, 0.0));
        let b = Line::new(p(0.0, 1.0), p(1.0, 1.0));
        assert_eq!(a.intersect(&b), Intersection::Parallel);
        assert!(a.intersect(&b).point().is_none());
    }

    #[test]
    fn shared_endpoint_is_bounded() {
        let a = Line::new(p(0.0, 0.0), p(1.0, 0.0));
        let b = Line::new(p(1.0, 0.0), p(1.0, 1.0));
        assert!(matches!(a.intersect(&b), Intersection::Bounded(_)));
    }

    #[test]
    fn right_normal_of_horizontal_segment() {
        let n = Line::new(p(0.0, 0.0), p(2.0, 0.0)).right_normal();
        assert_abs_diff_eq!(n.x, 0.0);
        assert_abs_diff_eq!(n.y, -1.0);
    }
}
