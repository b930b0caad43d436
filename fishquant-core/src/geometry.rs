//! Planar geometry helpers: convex hulls, polygon areas and point-set spans.
//!
//! Coordinates are `(row, col)` pairs promoted to `f64`. Degenerate inputs
//! (fewer than three points, or collinear sets) are legitimate for sparse
//! staining patterns and always produce an area of zero rather than an error.

/// A point in image space, `(row, col)`.
pub type Point = (f64, f64);

fn cross(o: Point, a: Point, b: Point) -> f64 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}

/// Compute the convex hull of a point set via the monotone chain algorithm.
///
/// Returns hull vertices in counter-clockwise order without repeating the
/// first vertex. Inputs with fewer than three points are returned as-is;
/// collinear sets collapse to their two extreme points.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut sorted: Vec<Point> = points.to_vec();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    sorted.dedup();

    if sorted.len() < 3 {
        return sorted;
    }

    let mut hull: Vec<Point> = Vec::with_capacity(sorted.len() * 2);

    // Lower hull
    for &p in &sorted {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }

    // Upper hull
    let lower_len = hull.len() + 1;
    for &p in sorted.iter().rev().skip(1) {
        while hull.len() >= lower_len && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0
        {
            hull.pop();
        }
        hull.push(p);
    }

    hull.pop(); // last point repeats the first
    hull
}

/// Shoelace area of a simple polygon given as an ordered vertex list.
///
/// Fewer than three vertices (including collapsed collinear hulls) yield 0.
pub fn polygon_area(vertices: &[Point]) -> f64 {
    if vertices.len() < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0;
    for i in 0..vertices.len() {
        let (r0, c0) = vertices[i];
        let (r1, c1) = vertices[(i + 1) % vertices.len()];
        twice_area += r0 * c1 - r1 * c0;
    }
    twice_area.abs() / 2.0
}

/// Area of the convex hull of a point set; 0 for degenerate sets.
pub fn hull_area(points: &[Point]) -> f64 {
    polygon_area(&convex_hull(points))
}

/// Maximum pairwise Euclidean distance within a point set.
///
/// For larger sets the search is restricted to the convex hull boundary,
/// which contains the diameter endpoints; tiny and collinear sets fall back
/// to the brute-force pair scan. Zero or one point gives 0.
pub fn max_pairwise_distance(points: &[Point]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let hull = convex_hull(points);
    let candidates: &[Point] = if hull.len() >= 3 { &hull } else { points };

    let mut best = 0.0_f64;
    for (i, &(r0, c0)) in candidates.iter().enumerate() {
        for &(r1, c1) in &candidates[i + 1..] {
            let d2 = (r0 - r1).powi(2) + (c0 - c1).powi(2);
            if d2 > best {
                best = d2;
            }
        }
    }
    best.sqrt()
}
