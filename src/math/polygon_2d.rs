use std::cmp::Ordering;

use super::{Point2, TOLERANCE};

/// 2D cross product: `(ax * by - ay * bx)`.
#[inline]
#[must_use]
pub fn cross_2d(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    ax * by - ay * bx
}

/// Signed area of a closed polygon (shoelace formula).
///
/// Positive for counter-clockwise, negative for clockwise.
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

/// Winding number of `p` with respect to the closed polygon `verts`.
///
/// Non-zero means inside.
#[must_use]
pub fn winding_number(p: &Point2, verts: &[Point2]) -> i32 {
    let n = verts.len();
    let mut winding = 0i32;
    for i in 0..n {
        let a = verts[i];
        let b = verts[(i + 1) % n];
        let side = cross_2d(b.x - a.x, b.y - a.y, p.x - a.x, p.y - a.y);
        if a.y <= p.y {
            if b.y > p.y && side > 0.0 {
                winding += 1;
            }
        } else if b.y <= p.y && side < 0.0 {
            winding -= 1;
        }
    }
    winding
}

/// Closest parameter in `[0, 1]` and distance from `p` to segment `[a, b]`.
#[must_use]
pub fn point_segment_projection(p: &Point2, a: &Point2, b: &Point2) -> (f64, f64) {
    let d = b - a;
    let len_sq = d.norm_squared();
    if len_sq < TOLERANCE * TOLERANCE {
        return (0.0, (p - a).norm());
    }
    let t = ((p - a).dot(&d) / len_sq).clamp(0.0, 1.0);
    let closest = a + d * t;
    (t, (p - closest).norm())
}

/// Minimum distance from `p` to segment `[a, b]`.
#[must_use]
pub fn point_segment_distance(p: &Point2, a: &Point2, b: &Point2) -> f64 {
    point_segment_projection(p, a, b).1
}

/// Bounded segment/segment intersection.
///
/// Returns the parameters `(t, u)` in `[0, 1]` along each segment, or `None`
/// when the segments are parallel or miss each other.
#[must_use]
pub fn segment_segment_intersect(
    a0: &Point2,
    a1: &Point2,
    b0: &Point2,
    b1: &Point2,
) -> Option<(f64, f64)> {
    let da = a1 - a0;
    let db = b1 - b0;
    let cross = cross_2d(da.x, da.y, db.x, db.y);
    if cross.abs() < TOLERANCE {
        return None;
    }
    let d = b0 - a0;
    let t = cross_2d(d.x, d.y, db.x, db.y) / cross;
    let u = cross_2d(d.x, d.y, da.x, da.y) / cross;
    let eps = TOLERANCE;
    if t >= -eps && t <= 1.0 + eps && u >= -eps && u <= 1.0 + eps {
        Some((t.clamp(0.0, 1.0), u.clamp(0.0, 1.0)))
    } else {
        None
    }
}

/// Returns `true` if the point lies inside the region bounded by `loops`.
///
/// Loops are combined with the even-odd rule so holes subtract from their
/// outer boundary whatever their orientation.
#[must_use]
pub fn point_in_loops(p: &Point2, loops: &[Vec<Point2>]) -> bool {
    loops
        .iter()
        .filter(|l| l.len() >= 3 && winding_number(p, l) != 0)
        .count()
        % 2
        == 1
}

/// Minimum distance from `p` to any segment of `loops`.
#[must_use]
pub fn distance_to_loops(p: &Point2, loops: &[Vec<Point2>]) -> f64 {
    let mut best = f64::INFINITY;
    for l in loops {
        let n = l.len();
        for i in 0..n {
            best = best.min(point_segment_distance(p, &l[i], &l[(i + 1) % n]));
        }
    }
    best
}

fn sort_params(values: &mut Vec<f64>) {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    values.dedup_by(|a, b| (*a - *b).abs() < TOLERANCE);
}

/// Clips the segment `[start, end]` against the region bounded by `loops`.
///
/// Returns the parameter intervals `(t0, t1)` along the segment, in `[0, 1]`,
/// whose interior lies inside the region. Contiguous intervals are merged.
#[must_use]
pub fn clip_segment_to_loops(
    start: &Point2,
    end: &Point2,
    loops: &[Vec<Point2>],
) -> Vec<(f64, f64)> {
    let mut ts = vec![0.0, 1.0];
    for l in loops {
        let n = l.len();
        for i in 0..n {
            if let Some((t, _)) = segment_segment_intersect(start, end, &l[i], &l[(i + 1) % n]) {
                ts.push(t);
            }
        }
    }
    sort_params(&mut ts);

    let dir = end - start;
    let mut result: Vec<(f64, f64)> = Vec::new();
    for w in ts.windows(2) {
        let (t0, t1) = (w[0], w[1]);
        if t1 - t0 < TOLERANCE {
            continue;
        }
        let mid = start + dir * ((t0 + t1) * 0.5);
        if !point_in_loops(&mid, loops) {
            continue;
        }
        match result.last_mut() {
            Some(last) if (t0 - last.1).abs() < TOLERANCE => last.1 = t1,
            _ => result.push((t0, t1)),
        }
    }
    result
}

/// Returns `true` if the closed polygon is convex (collinear runs allowed).
#[must_use]
pub fn is_convex(points: &[Point2]) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    let mut sign = 0.0_f64;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        let c = points[(i + 2) % n];
        let turn = cross_2d(b.x - a.x, b.y - a.y, c.x - b.x, c.y - b.y);
        if turn.abs() < TOLERANCE {
            continue;
        }
        if sign == 0.0 {
            sign = turn.signum();
        } else if turn.signum() != sign {
            return false;
        }
    }
    true
}

/// Clips `subject` against the convex polygon `clip` (Sutherland-Hodgman).
///
/// Both polygons may have either orientation; the result follows the
/// orientation of `subject`.
#[must_use]
pub fn clip_polygon_convex(subject: &[Point2], clip: &[Point2]) -> Vec<Point2> {
    if subject.len() < 3 || clip.len() < 3 {
        return Vec::new();
    }
    let orientation = signed_area(clip).signum();
    let mut output = subject.to_vec();
    let n = clip.len();
    for i in 0..n {
        if output.is_empty() {
            break;
        }
        let a = clip[i];
        let b = clip[(i + 1) % n];
        let inside = |p: &Point2| {
            orientation * cross_2d(b.x - a.x, b.y - a.y, p.x - a.x, p.y - a.y) >= -TOLERANCE
        };
        let input = std::mem::take(&mut output);
        let m = input.len();
        for j in 0..m {
            let cur = input[j];
            let prev = input[(j + m - 1) % m];
            let cur_in = inside(&cur);
            let prev_in = inside(&prev);
            if cur_in != prev_in {
                let d = cur - prev;
                let e = b - a;
                let denom = cross_2d(d.x, d.y, e.x, e.y);
                if denom.abs() > TOLERANCE {
                    let s = cross_2d(a.x - prev.x, a.y - prev.y, e.x, e.y) / denom;
                    output.push(prev + d * s);
                }
            }
            if cur_in {
                output.push(cur);
            }
        }
    }
    output.dedup_by(|a, b| (*a - *b).norm() < TOLERANCE);
    if output.len() > 1 && (output[0] - output[output.len() - 1]).norm() < TOLERANCE {
        output.pop();
    }
    output
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    fn square(min: f64, max: f64) -> Vec<Point2> {
        vec![p(min, min), p(max, min), p(max, max), p(min, max)]
    }

    #[test]
    fn signed_area_follows_orientation() {
        let mut sq = square(0.0, 2.0);
        assert_relative_eq!(signed_area(&sq), 4.0);
        sq.reverse();
        assert_relative_eq!(signed_area(&sq), -4.0);
    }

    #[test]
    fn point_in_square_with_hole() {
        let loops = vec![square(0.0, 4.0), square(1.0, 3.0)];
        assert!(point_in_loops(&p(0.5, 0.5), &loops));
        assert!(!point_in_loops(&p(2.0, 2.0), &loops));
        assert!(!point_in_loops(&p(5.0, 2.0), &loops));
    }

    #[test]
    fn segment_distance_clamps_to_ends() {
        let d = point_segment_distance(&p(-1.0, 0.0), &p(0.0, 0.0), &p(1.0, 0.0));
        assert_relative_eq!(d, 1.0);
        let (t, d) = point_segment_projection(&p(0.5, 2.0), &p(0.0, 0.0), &p(1.0, 0.0));
        assert_relative_eq!(t, 0.5);
        assert_relative_eq!(d, 2.0);
    }

    #[test]
    fn crossing_segments_intersect() {
        let (t, u) =
            segment_segment_intersect(&p(0.0, 0.0), &p(2.0, 2.0), &p(0.0, 2.0), &p(2.0, 0.0))
                .unwrap();
        assert_relative_eq!(t, 0.5);
        assert_relative_eq!(u, 0.5);
        assert!(
            segment_segment_intersect(&p(0.0, 0.0), &p(1.0, 0.0), &p(0.0, 1.0), &p(1.0, 1.0))
                .is_none()
        );
    }

    #[test]
    fn clip_segment_through_square_with_hole() {
        let loops = vec![square(0.0, 4.0), square(1.0, 3.0)];
        let spans = clip_segment_to_loops(&p(-1.0, 2.0), &p(5.0, 2.0), &loops);
        assert_eq!(spans.len(), 2);
        assert_relative_eq!(spans[0].0, 1.0 / 6.0, epsilon = 1e-9);
        assert_relative_eq!(spans[0].1, 2.0 / 6.0, epsilon = 1e-9);
        assert_relative_eq!(spans[1].0, 4.0 / 6.0, epsilon = 1e-9);
        assert_relative_eq!(spans[1].1, 5.0 / 6.0, epsilon = 1e-9);
    }

    #[test]
    fn convexity() {
        assert!(is_convex(&square(0.0, 1.0)));
        let l_shape = vec![
            p(0.0, 0.0),
            p(2.0, 0.0),
            p(2.0, 1.0),
            p(1.0, 1.0),
            p(1.0, 2.0),
            p(0.0, 2.0),
        ];
        assert!(!is_convex(&l_shape));
    }

    #[test]
    fn overlapping_squares_clip_to_common_square() {
        let common = clip_polygon_convex(&square(0.0, 2.0), &square(1.0, 3.0));
        assert_eq!(common.len(), 4);
        assert_relative_eq!(signed_area(&common), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn disjoint_squares_clip_to_nothing() {
        let common = clip_polygon_convex(&square(0.0, 1.0), &square(2.0, 3.0));
        assert!(signed_area(&common).abs() < 1e-12);
    }
}
