use std::fmt::Write as _;

use foundation::point::GeoPoint;
use layers::CategorySet;

use crate::error::QueryBuildError;

/// Server-side evaluation limit written into the query header (seconds).
pub const DEFAULT_QUERY_TIMEOUT_S: u32 = 25;

/// A validated radius query around a fixed center.
///
/// The text form is a pure function of the fields; categories are emitted in
/// canonical order, so equal queries always produce byte-identical text.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialQuery {
    center: GeoPoint,
    radius_m: f64,
    categories: CategorySet,
    timeout_s: u32,
}

impl SpatialQuery {
    /// Radius 0 is valid (it selects only parcels touching the center).
    pub fn new(
        center: GeoPoint,
        radius_m: f64,
        categories: CategorySet,
    ) -> Result<Self, QueryBuildError> {
        if !center.is_valid() {
            return Err(QueryBuildError::InvalidCenter);
        }
        if !radius_m.is_finite() || radius_m < 0.0 {
            return Err(QueryBuildError::InvalidRadius(radius_m));
        }
        if categories.is_empty() {
            return Err(QueryBuildError::EmptyCategories);
        }
        Ok(Self {
            center,
            // -0.0 would print as `around:-0`
            radius_m: if radius_m == 0.0 { 0.0 } else { radius_m },
            categories,
            timeout_s: DEFAULT_QUERY_TIMEOUT_S,
        })
    }

    pub fn with_timeout(mut self, timeout_s: u32) -> Self {
        self.timeout_s = timeout_s;
        self
    }

    pub fn center(&self) -> GeoPoint {
        self.center
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    pub fn categories(&self) -> &CategorySet {
        &self.categories
    }

    pub fn timeout_s(&self) -> u32 {
        self.timeout_s
    }

    /// Anchored alternation over the category tags, e.g. `^(farmland|orchard)$`.
    pub fn tag_pattern(&self) -> String {
        let tags: Vec<&str> = self.categories.iter().map(|c| c.tag()).collect();
        format!("^({})$", tags.join("|"))
    }

    /// Overpass QL: closed ways and multipolygon relations tagged with any of
    /// the categories within the radius, with full geometry.
    pub fn to_overpass_ql(&self) -> String {
        let pattern = self.tag_pattern();
        let around = format!(
            "(around:{},{},{})",
            self.radius_m,
            self.center.lat(),
            self.center.lon()
        );

        let mut q = String::new();
        let _ = writeln!(q, "[out:json][timeout:{}];", self.timeout_s);
        q.push_str("(\n");
        let _ = writeln!(q, "  way[\"landuse\"~\"{pattern}\"]{around};");
        let _ = writeln!(
            q,
            "  relation[\"type\"=\"multipolygon\"][\"landuse\"~\"{pattern}\"]{around};"
        );
        q.push_str(");\n");
        q.push_str("out body geom;\n");
        q
    }
}

/// Validates the inputs and returns the query text.
pub fn build_query(
    center: GeoPoint,
    radius_m: f64,
    categories: &CategorySet,
) -> Result<String, QueryBuildError> {
    Ok(SpatialQuery::new(center, radius_m, categories.clone())?.to_overpass_ql())
}

#[cfg(test)]
mod tests {
    use super::{SpatialQuery, build_query};
    use crate::error::QueryBuildError;
    use foundation::point::GeoPoint;
    use layers::{Category, CategorySet};

    fn two() -> CategorySet {
        [Category::Plantation, Category::Farmland].into_iter().collect()
    }

    #[test]
    fn encodes_radius_center_and_categories() {
        let q = build_query(GeoPoint::new(43.65064, 11.46387), 5000.0, &two()).unwrap();
        assert_eq!(
            q,
            "[out:json][timeout:25];\n\
             (\n  \
             way[\"landuse\"~\"^(farmland|plantation)$\"](around:5000,43.65064,11.46387);\n  \
             relation[\"type\"=\"multipolygon\"][\"landuse\"~\"^(farmland|plantation)$\"](around:5000,43.65064,11.46387);\n\
             );\n\
             out body geom;\n"
        );
    }

    #[test]
    fn output_is_deterministic_across_insertion_order() {
        let center = GeoPoint::new(43.65064, 11.46387);
        let a: CategorySet = Category::ALL.into_iter().collect();
        let b: CategorySet = Category::ALL.into_iter().rev().collect();
        assert_eq!(
            build_query(center, 1234.5, &a).unwrap(),
            build_query(center, 1234.5, &b).unwrap()
        );
    }

    #[test]
    fn only_requested_categories_are_matched() {
        let q = SpatialQuery::new(GeoPoint::new(0.0, 0.0), 10.0, two()).unwrap();
        assert_eq!(q.tag_pattern(), "^(farmland|plantation)$");
        let text = q.to_overpass_ql();
        assert!(!text.contains("vineyard"));
        assert!(!text.contains("orchard"));
    }

    #[test]
    fn zero_radius_is_valid() {
        let q = build_query(GeoPoint::new(1.0, 2.0), 0.0, &two()).unwrap();
        assert!(q.contains("(around:0,1,2)"));
    }

    #[test]
    fn negative_zero_radius_is_written_as_zero() {
        let q = SpatialQuery::new(GeoPoint::new(1.0, 2.0), -0.0, two()).unwrap();
        assert!(q.radius_m().is_sign_positive());
        assert!(q.to_overpass_ql().contains("(around:0,1,2)"));
    }

    #[test]
    fn rejects_bad_inputs() {
        let center = GeoPoint::new(1.0, 2.0);
        assert_eq!(
            build_query(center, -1.0, &two()),
            Err(QueryBuildError::InvalidRadius(-1.0))
        );
        assert!(matches!(
            build_query(center, f64::NAN, &two()),
            Err(QueryBuildError::InvalidRadius(_))
        ));
        assert_eq!(
            build_query(center, 1.0, &CategorySet::new()),
            Err(QueryBuildError::EmptyCategories)
        );
        assert_eq!(
            build_query(GeoPoint::new(100.0, 0.0), 1.0, &two()),
            Err(QueryBuildError::InvalidCenter)
        );
    }

    #[test]
    fn timeout_is_configurable() {
        let q = SpatialQuery::new(GeoPoint::new(1.0, 2.0), 1.0, two())
            .unwrap()
            .with_timeout(60);
        assert!(q.to_overpass_ql().starts_with("[out:json][timeout:60];\n"));
    }
}
