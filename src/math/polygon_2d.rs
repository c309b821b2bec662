use super::intersect_2d::{Intersection, Line};
use super::Point2;

/// Computes the signed area of a polygon (shoelace formula).
///
/// Positive for counter-clockwise, negative for clockwise (y pointing up).
#[must_use]
pub fn signed_area(points: &[Point2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        sum += points[i].x * points[j].y - points[j].x * points[i].y;
    }
    sum * 0.5
}

/// Returns `true` if the vertices wind clockwise.
#[must_use]
pub fn is_clockwise(points: &[Point2]) -> bool {
    signed_area(points) < 0.0
}

/// Even-odd point-in-polygon test.
///
/// Polygons with fewer than 3 vertices have no interior.
#[must_use]
pub fn contains_point(points: &[Point2], p: &Point2) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let a = points[i];
        let b = points[j];
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Edge `i` runs from vertex `i - 1` to vertex `i` (wrapping).
fn edge(points: &[Point2], i: usize) -> Line {
    let n = points.len();
    Line::new(points[(i + n - 1) % n], points[i])
}

/// Returns `true` if any two edges of the closed polygon cross.
///
/// Neighbouring edges always meet at their shared vertex; such a touch only
/// counts as a crossing when the intersection point lies closer to one of
/// the far endpoints than to the shared vertex (a fold-back).
#[must_use]
pub fn self_intersects(points: &[Point2]) -> bool {
    let n = points.len();
    for i in 0..n {
        let e0 = edge(points, i);
        for j in (i + 1)..n {
            let e1 = edge(points, j);
            let Intersection::Bounded(hit) = e0.intersect(&e1) else {
                continue;
            };

            let neighbours = j == i + 1 || (i == 0 && j == n - 1);
            if neighbours {
                let (common, far0, far1) = if j == i + 1 {
                    (e0.end, e0.start, e1.end)
                } else {
                    (e1.end, e0.end, e1.start)
                };
                let d_common = (hit - common).norm();
                if d_common < (hit - far0).norm() && d_common < (hit - far1).norm() {
                    continue;
                }
            }
            return true;
        }
    }
    false
}

/// Grows the polygon by `distance` along every edge's outward normal.
///
/// Negative distances shrink it. The orientation of the input is detected so
/// that a positive distance always grows. Each output vertex is the crossing
/// of the two shifted neighbouring edges; vertices whose shifted edges are
/// parallel are dropped, so the result may have fewer vertices than the
/// input. Polygons with fewer than 3 vertices are returned unchanged.
#[must_use]
pub fn offset(points: &[Point2], distance: f64) -> Vec<Point2> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    // Right normals point outward for counter-clockwise winding.
    let distance = if is_clockwise(points) {
        -distance
    } else {
        distance
    };

    let mut result = Vec::with_capacity(n);
    for i in 0..n {
        let incoming = edge(points, i);
        let outgoing = edge(points, (i + 1) % n);

        let incoming = incoming.translated(incoming.right_normal() * distance);
        let outgoing = outgoing.translated(outgoing.right_normal() * distance);

        if let Some(p) = incoming.intersect(&outgoing).point() {
            result.push(p);
        }
    }
    result
}
