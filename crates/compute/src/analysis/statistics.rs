use layers::{Category, Color, Feature};
use serde::Serialize;

/// Fertilizer requirement per hectare of cultivated land (kg).
pub const REQUIRED_KG_PER_HA: f64 = 160.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBreakdown {
    pub category: Category,
    pub label: String,
    pub color: Color,
    pub feature_count: usize,
    pub area_m2: f64,
    pub allocated_quantity: f64,
}

/// Aggregates over a filtered view of one collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub feature_count: usize,
    pub total_area_m2: f64,
    pub total_area_km2: f64,
    pub total_allocated: f64,
    pub production: f64,
    pub requirement_kg: f64,
    /// One entry per category, canonical order, zeros included.
    pub by_category: Vec<CategoryBreakdown>,
}

pub struct Statistics;

impl Statistics {
    /// Sums area, allocation and requirement over `visible`.
    ///
    /// Callers pass the same filtered view they render so that the numbers
    /// and the map always describe the same parcels.
    pub fn summarize<'a, I>(visible: I, production: f64, required_kg_per_ha: f64) -> Summary
    where
        I: IntoIterator<Item = &'a Feature>,
    {
        let mut by_category: Vec<CategoryBreakdown> = Category::ALL
            .iter()
            .map(|&category| CategoryBreakdown {
                category,
                label: category.label(),
                color: category.color(),
                feature_count: 0,
                area_m2: 0.0,
                allocated_quantity: 0.0,
            })
            .collect();

        let mut feature_count = 0usize;
        let mut total_area_m2 = 0.0;
        let mut total_allocated = 0.0;
        let mut requirement_kg = 0.0;

        for f in visible {
            feature_count += 1;
            total_area_m2 += f.area_m2();
            total_allocated += f.allocated_quantity();
            requirement_kg += f.area_ha() * required_kg_per_ha;

            let entry = &mut by_category[f.category().index()];
            entry.feature_count += 1;
            entry.area_m2 += f.area_m2();
            entry.allocated_quantity += f.allocated_quantity();
        }

        Summary {
            feature_count,
            total_area_m2,
            total_area_km2: total_area_m2 / 1e6,
            total_allocated,
            production,
            requirement_kg,
            by_category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{REQUIRED_KG_PER_HA, Statistics};
    use foundation::ids::FeatureId;
    use geo::{LineString, Polygon};
    use layers::{Category, Feature, Parcel};

    fn feature(id: u64, category: Category, area: f64, qty: f64) -> Feature {
        Feature::new(
            Parcel {
                id: FeatureId::way(id),
                category,
                geometry: Polygon::new(LineString::from(vec![(0.0, 0.0)]), vec![]),
            },
            area,
            qty,
        )
    }

    #[test]
    fn sums_visible_features_by_category() {
        let features = vec![
            feature(1, Category::Farmland, 20_000.0, 10.0),
            feature(2, Category::Vineyard, 10_000.0, 5.0),
            feature(3, Category::Farmland, 30_000.0, 15.0),
        ];
        let s = Statistics::summarize(&features, 14_914.9, REQUIRED_KG_PER_HA);

        assert_eq!(s.feature_count, 3);
        assert_eq!(s.total_area_m2, 60_000.0);
        assert_eq!(s.total_area_km2, 0.06);
        assert_eq!(s.total_allocated, 30.0);
        assert_eq!(s.production, 14_914.9);
        // 6 ha at 160 kg/ha.
        assert!((s.requirement_kg - 960.0).abs() < 1e-9);

        assert_eq!(s.by_category.len(), Category::COUNT);
        let farmland = &s.by_category[Category::Farmland.index()];
        assert_eq!(farmland.feature_count, 2);
        assert_eq!(farmland.area_m2, 50_000.0);
        let orchard = &s.by_category[Category::Orchard.index()];
        assert_eq!(orchard.feature_count, 0);
        assert_eq!(orchard.area_m2, 0.0);
    }

    #[test]
    fn empty_view_reports_zeros() {
        let s = Statistics::summarize(std::iter::empty(), 1.0, REQUIRED_KG_PER_HA);
        assert_eq!(s.feature_count, 0);
        assert_eq!(s.total_area_m2, 0.0);
        assert_eq!(s.requirement_kg, 0.0);
        assert_eq!(s.by_category[0].label, "farmland");
    }

    #[test]
    fn summary_serializes_with_category_breakdown() {
        let features = vec![feature(1, Category::Vineyard, 10_000.0, 5.0)];
        let s = Statistics::summarize(&features, 2.5, REQUIRED_KG_PER_HA);
        let json = serde_json::to_value(&s).unwrap();

        assert_eq!(json["feature_count"], 1);
        assert_eq!(json["total_allocated"], 5.0);
        assert_eq!(json["production"], 2.5);
        let by_category = json["by_category"].as_array().unwrap();
        assert_eq!(by_category.len(), Category::COUNT);
        let vineyard = &by_category[Category::Vineyard.index()];
        assert_eq!(vineyard["category"], "vineyard");
        assert_eq!(vineyard["feature_count"], 1);
        assert!(vineyard["color"].as_str().unwrap().starts_with('#'));
    }
}
