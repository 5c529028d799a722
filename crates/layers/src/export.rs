//! GeoJSON export of features for the rendering surface.

use geojson::feature::Id;
use geojson::{Geometry, JsonObject, Value};
use serde_json::json;

use crate::feature::Feature;
use crate::symbology::ParcelStyle;

/// Property keys follow the names the map front-end reads.
pub fn feature_to_geojson(feature: &Feature, style: ParcelStyle) -> geojson::Feature {
    let mut properties = JsonObject::new();
    properties.insert("landuse".to_string(), json!(feature.category().tag()));
    properties.insert("area".to_string(), json!(feature.area_m2()));
    properties.insert(
        "fertilizer".to_string(),
        json!(feature.allocated_quantity()),
    );
    properties.insert("style".to_string(), json!(style));

    geojson::Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::from(feature.geometry()))),
        id: Some(Id::String(feature.id().to_string())),
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Builds a collection in iteration order, styling each feature with `style`.
pub fn to_geojson<'a, I, F>(features: I, mut style: F) -> geojson::FeatureCollection
where
    I: IntoIterator<Item = &'a Feature>,
    F: FnMut(&Feature) -> ParcelStyle,
{
    geojson::FeatureCollection {
        bbox: None,
        features: features
            .into_iter()
            .map(|f| feature_to_geojson(f, style(f)))
            .collect(),
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use super::to_geojson;
    use crate::category::Category;
    use crate::feature::{Feature, Parcel};
    use crate::symbology::ParcelStyle;
    use foundation::ids::FeatureId;
    use geo::{LineString, Polygon};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn feature(id: u64, category: Category, area: f64, qty: f64) -> Feature {
        Feature::new(
            Parcel {
                id: FeatureId::way(id),
                category,
                geometry: Polygon::new(
                    LineString::from(vec![(11.0, 43.0), (11.1, 43.0), (11.1, 43.1), (11.0, 43.0)]),
                    vec![],
                ),
            },
            area,
            qty,
        )
    }

    #[test]
    fn exports_properties_and_ids_in_order() {
        let features = vec![
            feature(1, Category::Farmland, 100.0, 3728.725),
            feature(2, Category::Vineyard, 300.0, 11186.175),
        ];
        let fc = to_geojson(&features, |f| ParcelStyle::for_category(f.category()));
        let v = serde_json::to_value(&fc).unwrap();

        assert_eq!(v["type"], json!("FeatureCollection"));
        assert_eq!(v["features"][0]["id"], json!("way/1"));
        assert_eq!(v["features"][1]["id"], json!("way/2"));
        assert_eq!(
            v["features"][1]["properties"],
            json!({
                "landuse": "vineyard",
                "area": 300.0,
                "fertilizer": 11186.175,
                "style": {
                    "fillColor": "#8B008B",
                    "color": "#555555",
                    "weight": 1.0,
                    "fillOpacity": 0.6
                }
            })
        );
        assert_eq!(v["features"][0]["geometry"]["type"], json!("Polygon"));
    }
}
