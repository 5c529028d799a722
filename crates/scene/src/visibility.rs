use layers::{Category, CategorySet, Feature, FeatureCollection};
use serde::ser::{Serialize, Serializer};

/// Per-category visibility toggles.
///
/// Independent of any collection: toggles survive every refetch. All
/// categories start enabled.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ToggleState {
    enabled: [bool; Category::COUNT],
}

impl Default for ToggleState {
    fn default() -> Self {
        Self {
            enabled: [true; Category::COUNT],
        }
    }
}

impl ToggleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self, category: Category) -> bool {
        self.enabled[category.index()]
    }

    /// Returns `true` if the toggle changed.
    pub fn set(&mut self, category: Category, enabled: bool) -> bool {
        let slot = &mut self.enabled[category.index()];
        let changed = *slot != enabled;
        *slot = enabled;
        changed
    }

    pub fn enabled_categories(&self) -> CategorySet {
        Category::ALL
            .into_iter()
            .filter(|c| self.is_enabled(*c))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, bool)> + '_ {
        Category::ALL.into_iter().map(|c| (c, self.is_enabled(c)))
    }
}

/// Serialized as `{"farmland": true, ...}` in category order.
impl Serialize for ToggleState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

/// Features whose category is toggled on, in collection order.
///
/// Rendering and every aggregate read this same view.
pub fn visible<'a>(collection: &'a FeatureCollection, toggles: &ToggleState) -> Vec<&'a Feature> {
    collection
        .iter()
        .filter(|f| toggles.is_enabled(f.category()))
        .collect()
}
