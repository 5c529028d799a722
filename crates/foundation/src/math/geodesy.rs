use geo::algorithm::line_intersection::{LineIntersection, line_intersection};
use geo::{ChamberlainDuquetteArea, HaversineDistance, Line, LineString, Point, Polygon};

use crate::point::GeoPoint;

/// Great-circle distance between two points in meters.
pub fn great_circle_distance_m(a: GeoPoint, b: GeoPoint) -> f64 {
    Point::from(a).haversine_distance(&Point::from(b))
}

/// Spherical polygon area in square meters, holes subtracted.
///
/// Degenerate input never fails: a ring with fewer than three distinct
/// segments, any self-intersecting ring, or a non-finite result yields `0.0`.
pub fn polygon_area_m2(polygon: &Polygon<f64>) -> f64 {
    if !is_simple_ring(polygon.exterior()) {
        return 0.0;
    }
    if !polygon.interiors().iter().all(is_simple_ring) {
        return 0.0;
    }

    // Rings are measured one at a time so that hole orientation can't flip
    // the sign of the subtraction.
    let outer = ring_area_m2(polygon.exterior());
    let holes: f64 = polygon.interiors().iter().map(ring_area_m2).sum();
    let area = outer - holes;
    if area.is_finite() && area > 0.0 {
        area
    } else {
        0.0
    }
}

fn ring_area_m2(ring: &LineString<f64>) -> f64 {
    Polygon::new(ring.clone(), Vec::new()).chamberlain_duquette_unsigned_area()
}

/// Returns `true` if the closed ring has at least three non-degenerate edges
/// and no two non-adjacent edges touch.
pub fn is_simple_ring(ring: &LineString<f64>) -> bool {
    let edges: Vec<Line<f64>> = ring.lines().filter(|l| l.start != l.end).collect();
    let n = edges.len();
    if n < 3 {
        return false;
    }

    for i in 0..n {
        for j in (i + 1)..n {
            let adjacent = j == i + 1 || (i == 0 && j == n - 1);
            match line_intersection(edges[i], edges[j]) {
                None => {}
                Some(LineIntersection::SinglePoint { .. }) if adjacent => {}
                Some(LineIntersection::Collinear { intersection })
                    if adjacent && intersection.start == intersection.end => {}
                Some(_) => return false,
            }
        }
    }
    true
}
