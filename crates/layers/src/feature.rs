use foundation::ids::FeatureId;
use geo::Polygon;

use crate::category::Category;

/// Converter output: identity, category and ring geometry, nothing computed yet.
#[derive(Debug, Clone, PartialEq)]
pub struct Parcel {
    pub id: FeatureId,
    pub category: Category,
    /// Exterior ring plus holes, `x = lon, y = lat`.
    pub geometry: Polygon<f64>,
}

/// A parcel with its computed area and allocated share.
///
/// Fields are read-only: features are only created by the allocator and are
/// never mutated after the collection holding them is published.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    id: FeatureId,
    category: Category,
    geometry: Polygon<f64>,
    area_m2: f64,
    allocated_quantity: f64,
}

impl Feature {
    pub fn new(parcel: Parcel, area_m2: f64, allocated_quantity: f64) -> Self {
        Self {
            id: parcel.id,
            category: parcel.category,
            geometry: parcel.geometry,
            area_m2,
            allocated_quantity,
        }
    }

    pub fn id(&self) -> FeatureId {
        self.id
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn geometry(&self) -> &Polygon<f64> {
        &self.geometry
    }

    pub fn area_m2(&self) -> f64 {
        self.area_m2
    }

    pub fn area_km2(&self) -> f64 {
        self.area_m2 / 1e6
    }

    pub fn area_ha(&self) -> f64 {
        self.area_m2 / 1e4
    }

    pub fn allocated_quantity(&self) -> f64 {
        self.allocated_quantity
    }
}

/// The result of one fetch cycle, replaced as a whole by the next one.
///
/// `generation` is the request token the collection was produced for; `0`
/// marks the empty collection that exists before the first publication.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCollection {
    generation: u64,
    radius_m: f64,
    total_quantity: f64,
    total_area_m2: f64,
    features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(generation: u64, radius_m: f64, total_quantity: f64, features: Vec<Feature>) -> Self {
        let total_area_m2 = features.iter().map(Feature::area_m2).sum();
        Self {
            generation,
            radius_m,
            total_quantity,
            total_area_m2,
            features,
        }
    }

    pub fn empty() -> Self {
        Self::new(0, 0.0, 0.0, Vec::new())
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    pub fn total_quantity(&self) -> f64 {
        self.total_quantity
    }

    pub fn total_area_m2(&self) -> f64 {
        self.total_area_m2
    }

    /// Zero total area: every allocation is zero.
    pub fn is_degenerate(&self) -> bool {
        self.total_area_m2 <= 0.0
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn get(&self, id: FeatureId) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == id)
    }
}

impl Default for FeatureCollection {
    fn default() -> Self {
        Self::empty()
    }
}

impl<'a> IntoIterator for &'a FeatureCollection {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::{Feature, FeatureCollection, Parcel};
    use crate::category::Category;
    use foundation::ids::FeatureId;
    use geo::{LineString, Polygon};

    fn parcel(id: u64, category: Category) -> Parcel {
        Parcel {
            id: FeatureId::way(id),
            category,
            geometry: Polygon::new(
                LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)]),
                vec![],
            ),
        }
    }

    #[test]
    fn collection_sums_area_and_finds_by_id() {
        let c = FeatureCollection::new(
            3,
            5000.0,
            10.0,
            vec![
                Feature::new(parcel(1, Category::Farmland), 100.0, 2.5),
                Feature::new(parcel(2, Category::Orchard), 300.0, 7.5),
            ],
        );
        assert_eq!(c.generation(), 3);
        assert_eq!(c.total_area_m2(), 400.0);
        assert!(!c.is_degenerate());
        assert_eq!(
            c.get(FeatureId::way(2)).map(Feature::category),
            Some(Category::Orchard)
        );
        assert!(c.get(FeatureId::way(9)).is_none());
    }

    #[test]
    fn empty_collection_is_degenerate() {
        let c = FeatureCollection::empty();
        assert!(c.is_empty());
        assert_eq!(c.generation(), 0);
        assert!(c.is_degenerate());
    }

    #[test]
    fn unit_conversions() {
        let f = Feature::new(parcel(1, Category::Vineyard), 25_000.0, 0.0);
        assert_eq!(f.area_ha(), 2.5);
        assert_eq!(f.area_km2(), 0.025);
    }
}
