use std::fmt;

use serde::{Serialize, Serializer};

use crate::category::Category;

/// Opaque sRGB color, serialized as `#RRGGBB`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn hex(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Fill used for land-use tags outside the category table.
pub const FALLBACK_COLOR: Color = Color::rgb(0xCC, 0xCC, 0xCC);
pub const PARCEL_STROKE: Color = Color::rgb(0x55, 0x55, 0x55);
pub const SEARCH_AREA_STROKE: Color = Color::rgb(0x66, 0x66, 0x66);

/// Path style handed to the rendering surface.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParcelStyle {
    pub fill_color: Color,
    #[serde(rename = "color")]
    pub stroke_color: Color,
    pub weight: f64,
    pub fill_opacity: f64,
}

impl ParcelStyle {
    pub const fn new(fill_color: Color) -> Self {
        Self {
            fill_color,
            stroke_color: PARCEL_STROKE,
            weight: 1.0,
            fill_opacity: 0.6,
        }
    }

    pub fn for_category(category: Category) -> Self {
        Self::new(category.color())
    }

    /// Style for a raw `landuse` tag; unknown tags get the fallback fill.
    pub fn for_tag(tag: &str) -> Self {
        Self::new(Category::from_tag(tag).map_or(FALLBACK_COLOR, Category::color))
    }

    /// Hover emphasis derived from a base style.
    pub fn highlighted(self) -> Self {
        Self {
            weight: 3.0,
            fill_opacity: 0.9,
            ..self
        }
    }
}

/// Style of the search-radius circle around the site.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchAreaStyle {
    pub color: Color,
    pub fill_opacity: f64,
}

pub const SEARCH_AREA_STYLE: SearchAreaStyle = SearchAreaStyle {
    color: SEARCH_AREA_STROKE,
    fill_opacity: 0.1,
};

#[cfg(test)]
mod tests {
    use super::{FALLBACK_COLOR, ParcelStyle};
    use crate::category::Category;

    #[test]
    fn hex_is_uppercase_and_padded() {
        assert_eq!(super::Color::rgb(0, 0xCE, 0xD1).hex(), "#00CED1");
    }

    #[test]
    fn unknown_tags_fall_back_to_gray() {
        assert_eq!(ParcelStyle::for_tag("meadow").fill_color, FALLBACK_COLOR);
        assert_eq!(
            ParcelStyle::for_tag("vineyard").fill_color,
            Category::Vineyard.color()
        );
    }

    #[test]
    fn highlight_keeps_colors() {
        let base = ParcelStyle::for_category(Category::Orchard);
        let hi = base.highlighted();
        assert_eq!(hi.fill_color, base.fill_color);
        assert_eq!(hi.stroke_color, base.stroke_color);
        assert_eq!(hi.weight, 3.0);
        assert_eq!(hi.fill_opacity, 0.9);
        assert_eq!(base.weight, 1.0);
    }

    #[test]
    fn serializes_with_path_option_names() {
        let v = serde_json::to_value(ParcelStyle::for_category(Category::Farmland)).unwrap();
        assert_eq!(v["fillColor"], "#FFD700");
        assert_eq!(v["color"], "#555555");
        assert_eq!(v["weight"], 1.0);
    }
}
