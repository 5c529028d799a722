use foundation::point::GeoPoint;
use geo::{Contains, Point};
use layers::Feature;

/// Topmost feature containing `at`.
///
/// Features render in slice order, so the last match is the one on top.
/// Points on a boundary or inside a hole do not hit.
pub fn pick<'a>(features: &[&'a Feature], at: GeoPoint) -> Option<&'a Feature> {
    let p = Point::from(at);
    features
        .iter()
        .rev()
        .find(|f| f.geometry().contains(&p))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::pick;
    use foundation::ids::FeatureId;
    use foundation::point::GeoPoint;
    use geo::{LineString, Polygon};
    use layers::{Category, Feature, Parcel};

    fn square(id: u64, min: f64, max: f64, hole: Option<(f64, f64)>) -> Feature {
        let ring = |a: f64, b: f64| {
            LineString::from(vec![(a, a), (b, a), (b, b), (a, b), (a, a)])
        };
        let interiors = hole.map(|(a, b)| vec![ring(a, b)]).unwrap_or_default();
        Feature::new(
            Parcel {
                id: FeatureId::way(id),
                category: Category::Farmland,
                geometry: Polygon::new(ring(min, max), interiors),
            },
            1.0,
            1.0,
        )
    }

    #[test]
    fn topmost_feature_wins() {
        let below = square(1, 0.0, 10.0, None);
        let above = square(2, 4.0, 6.0, None);
        let features = vec![&below, &above];

        assert_eq!(pick(&features, GeoPoint::new(5.0, 5.0)).map(|f| f.id()), Some(FeatureId::way(2)));
        assert_eq!(pick(&features, GeoPoint::new(1.0, 1.0)).map(|f| f.id()), Some(FeatureId::way(1)));
        assert!(pick(&features, GeoPoint::new(20.0, 20.0)).is_none());
    }

    #[test]
    fn holes_do_not_hit() {
        let donut = square(1, 0.0, 10.0, Some((4.0, 6.0)));
        let features = vec![&donut];
        assert!(pick(&features, GeoPoint::new(5.0, 5.0)).is_none());
        assert!(pick(&features, GeoPoint::new(2.0, 2.0)).is_some());
    }
}
