use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::symbology::Color;

/// Land-use class of a parcel.
///
/// The set is closed; declaration order is the canonical ordering used for
/// queries, toggles and per-category breakdowns.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Farmland,
    Plantation,
    Orchard,
    Vineyard,
    GreenhouseHorticulture,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CategoryInfo {
    pub category: Category,
    /// OSM `landuse` tag value.
    pub tag: &'static str,
    pub color: Color,
}

/// Process-wide category table, in canonical order.
pub const CATEGORY_TABLE: [CategoryInfo; Category::COUNT] = [
    CategoryInfo {
        category: Category::Farmland,
        tag: "farmland",
        color: Color::rgb(0xFF, 0xD7, 0x00),
    },
    CategoryInfo {
        category: Category::Plantation,
        tag: "plantation",
        color: Color::rgb(0x8B, 0x45, 0x13),
    },
    CategoryInfo {
        category: Category::Orchard,
        tag: "orchard",
        color: Color::rgb(0x7F, 0xFF, 0x00),
    },
    CategoryInfo {
        category: Category::Vineyard,
        tag: "vineyard",
        color: Color::rgb(0x8B, 0x00, 0x8B),
    },
    CategoryInfo {
        category: Category::GreenhouseHorticulture,
        tag: "greenhouse_horticulture",
        color: Color::rgb(0x00, 0xCE, 0xD1),
    },
];

impl Category {
    pub const COUNT: usize = 5;

    pub const ALL: [Category; Category::COUNT] = [
        Category::Farmland,
        Category::Plantation,
        Category::Orchard,
        Category::Vineyard,
        Category::GreenhouseHorticulture,
    ];

    /// Position in the canonical order.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn info(self) -> &'static CategoryInfo {
        &CATEGORY_TABLE[self.index()]
    }

    pub fn tag(self) -> &'static str {
        self.info().tag
    }

    pub fn color(self) -> Color {
        self.info().color
    }

    /// Human label, e.g. `greenhouse horticulture`.
    pub fn label(self) -> String {
        self.tag().replace('_', " ")
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        CATEGORY_TABLE
            .iter()
            .find(|info| info.tag == tag)
            .map(|info| info.category)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown land-use category: {0:?}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::from_tag(s).ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Ordered set of categories.
///
/// Iteration always follows the canonical order regardless of insertion order,
/// so anything derived from a set (query text in particular) is stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CategorySet(BTreeSet<Category>);

impl CategorySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Category::ALL.into_iter().collect()
    }

    pub fn insert(&mut self, category: Category) -> bool {
        self.0.insert(category)
    }

    pub fn contains(&self, category: Category) -> bool {
        self.0.contains(&category)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Category> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Category> for CategorySet {
    fn from_iter<I: IntoIterator<Item = Category>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
