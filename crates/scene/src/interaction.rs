//! Hover and click affordances over rendered parcels.
//!
//! Hover is a per-feature `Normal ⇄ Highlighted` transition that yields the
//! style to apply and the overlay to show; nothing rendered is mutated here.
//! Clicks measure the distance from a fixed reference point and only the last
//! measurement is kept.

use std::collections::BTreeSet;

use foundation::ids::FeatureId;
use foundation::math::great_circle_distance_m;
use foundation::point::GeoPoint;
use geo::Centroid;
use layers::{Feature, ParcelStyle};
use serde::Serialize;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HoverState {
    Normal,
    Highlighted,
}

/// Informational popup anchored to a highlighted feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overlay {
    pub feature_id: FeatureId,
    pub anchor: Option<GeoPoint>,
    pub lines: Vec<String>,
}

impl Overlay {
    pub fn for_feature(feature: &Feature) -> Self {
        Self {
            feature_id: feature.id(),
            anchor: anchor_of(feature),
            lines: vec![
                format!("Type: {}", feature.category().tag()),
                format!("Area: {:.2} km²", feature.area_km2()),
                format!("Fertilizer: {:.2} L", feature.allocated_quantity()),
            ],
        }
    }
}

fn anchor_of(feature: &Feature) -> Option<GeoPoint> {
    let geometry = feature.geometry();
    geometry
        .centroid()
        .map(|p| GeoPoint::new(p.y(), p.x()))
        .or_else(|| geometry.exterior().0.first().map(|c| GeoPoint::new(c.y, c.x)))
}

/// What the renderer should do after a hover transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoverOutcome {
    pub feature_id: FeatureId,
    pub state: HoverState,
    pub style: ParcelStyle,
    pub overlay: Option<Overlay>,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub reference: GeoPoint,
    pub click: GeoPoint,
    pub distance_m: f64,
    pub distance_km: f64,
}

impl Measurement {
    pub fn between(reference: GeoPoint, click: GeoPoint) -> Self {
        let distance_m = great_circle_distance_m(reference, click);
        Self {
            reference,
            click,
            distance_m,
            distance_km: distance_m / 1000.0,
        }
    }

    pub fn message(&self) -> String {
        format!("Distance: {:.2} km", self.distance_km)
    }
}

#[derive(Debug, Clone)]
pub struct InteractionController {
    reference: GeoPoint,
    highlighted: BTreeSet<FeatureId>,
    last_measurement: Option<Measurement>,
}

impl InteractionController {
    pub fn new(reference: GeoPoint) -> Self {
        Self {
            reference,
            highlighted: BTreeSet::new(),
            last_measurement: None,
        }
    }

    pub fn reference(&self) -> GeoPoint {
        self.reference
    }

    pub fn state(&self, id: FeatureId) -> HoverState {
        if self.highlighted.contains(&id) {
            HoverState::Highlighted
        } else {
            HoverState::Normal
        }
    }

    /// Current style for `feature`, including hover emphasis.
    pub fn style_for(&self, feature: &Feature) -> ParcelStyle {
        let base = ParcelStyle::for_category(feature.category());
        match self.state(feature.id()) {
            HoverState::Normal => base,
            HoverState::Highlighted => base.highlighted(),
        }
    }

    pub fn hover_enter(&mut self, feature: &Feature) -> HoverOutcome {
        self.highlighted.insert(feature.id());
        HoverOutcome {
            feature_id: feature.id(),
            state: HoverState::Highlighted,
            style: ParcelStyle::for_category(feature.category()).highlighted(),
            overlay: Some(Overlay::for_feature(feature)),
        }
    }

    /// Always lands in `Normal`, whether or not the feature was highlighted.
    pub fn hover_exit(&mut self, feature: &Feature) -> HoverOutcome {
        self.highlighted.remove(&feature.id());
        HoverOutcome {
            feature_id: feature.id(),
            state: HoverState::Normal,
            style: ParcelStyle::for_category(feature.category()),
            overlay: None,
        }
    }

    /// Drops highlights of features that are no longer rendered.
    ///
    /// Called after a new collection is published or a toggle hides a
    /// category, since those features will never receive their exit event.
    pub fn retain_visible<I>(&mut self, rendered: I)
    where
        I: IntoIterator<Item = FeatureId>,
    {
        let rendered: BTreeSet<FeatureId> = rendered.into_iter().collect();
        self.highlighted.retain(|id| rendered.contains(id));
    }

    pub fn highlighted(&self) -> impl Iterator<Item = FeatureId> + '_ {
        self.highlighted.iter().copied()
    }

    pub fn click(&mut self, at: GeoPoint) -> Measurement {
        let m = Measurement::between(self.reference, at);
        self.last_measurement = Some(m);
        m
    }

    pub fn last_measurement(&self) -> Option<&Measurement> {
        self.last_measurement.as_ref()
    }
}
