use super::Point2;

/// Closest-point information of a point projected onto a segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentProjection {
    /// Distance from the query point to `closest`.
    pub distance: f64,
    /// Closest point on the segment.
    pub closest: Point2,
    /// Position of `closest` along the segment in `[0, 1]`.
    pub t: f64,
}

/// Projects `point` onto the segment `a`→`b`, clamping to the endpoints.
///
/// A zero-length segment projects everything onto `a` with `t = 0`.
#[must_use]
pub fn distance_to_segment(point: &Point2, a: &Point2, b: &Point2) -> SegmentProjection {
    let d = b - a;
    let len_sq = d.norm_squared();

    let t = if len_sq < 1e-30 {
        0.0
    } else {
        ((point - a).dot(&d) / len_sq).clamp(0.0, 1.0)
    };

    let closest = a + d * t;
    SegmentProjection {
        distance: (point - closest).norm(),
        closest,
        t,
    }
}
