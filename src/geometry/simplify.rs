use super::types::{Point, Polygon};

/// Default tolerance, in percent of the polygon perimeter.
pub const DEFAULT_EPSILON_RATIO: f64 = 2.0;

/// Passes used to pick two far-apart anchor vertices on a closed polygon.
const ANCHOR_SEARCH_PASSES: usize = 3;

/// Drop redundant boundary vertices with closed-polygon Douglas-Peucker.
///
/// The tolerance is `epsilon_ratio * 0.01 * perimeter`, so simplification is
/// proportionally the same for small and large regions. The result is an
/// ordered subset of the input vertices; every removed vertex lies within the
/// tolerance of the edge that replaced it. Polygons with fewer than three
/// vertices are returned unchanged.
pub fn simplify(polygon: &Polygon, epsilon_ratio: f64) -> Polygon {
    let points = polygon.points();
    let n = points.len();
    if n < 3 {
        return polygon.clone();
    }

    let tolerance = epsilon_ratio * 0.01 * polygon.perimeter();
    let (a, b) = anchor_pair(points);
    if a == b {
        // every vertex coincides
        return Polygon::new(vec![points[a]]);
    }

    let mut keep = vec![false; n];
    keep[a] = true;
    keep[b] = true;
    mark_chain(points, a, b, tolerance, &mut keep);
    mark_chain(points, b, a, tolerance, &mut keep);

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, kept)| kept.then_some(*p))
        .collect()
}

/// Two vertices roughly on opposite sides of the polygon.
fn anchor_pair(points: &[Point]) -> (usize, usize) {
    let mut start = 0;
    let mut far = farthest_from(points, start);
    for _ in 1..ANCHOR_SEARCH_PASSES {
        let next = farthest_from(points, far);
        if next == start {
            break;
        }
        start = far;
        far = next;
    }
    (start.min(far), start.max(far))
}

fn farthest_from(points: &[Point], origin: usize) -> usize {
    let o = points[origin];
    let mut best = origin;
    let mut best_dist = 0.0;
    for (i, p) in points.iter().enumerate() {
        let d = p.distance(o);
        if d > best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}

/// Douglas-Peucker over the cyclic chain running forward from `from` to `to`.
/// Uses an explicit stack of index ranges instead of recursion.
fn mark_chain(points: &[Point], from: usize, to: usize, tolerance: f64, keep: &mut [bool]) {
    let n = points.len();
    let span = (to + n - from) % n;

    // offsets are relative to `from` along the chain
    let mut stack = vec![(0usize, span)];
    while let Some((lo, hi)) = stack.pop() {
        if hi <= lo + 1 {
            continue;
        }

        let a = points[(from + lo) % n];
        let b = points[(from + hi) % n];
        let mut split = lo;
        let mut max_dist = -1.0;
        for offset in lo + 1..hi {
            let d = points[(from + offset) % n].distance_to_segment(a, b);
            if d > max_dist {
                max_dist = d;
                split = offset;
            }
        }

        if max_dist > tolerance {
            keep[(from + split) % n] = true;
            stack.push((split, hi));
            stack.push((lo, split));
        }
    }
}
