use foundation::math::polygon_area_m2;
use layers::{Feature, Parcel};
use serde::Serialize;

/// Total producible quantity: raw input volume times a fixed conversion ratio.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct TotalQuantity {
    raw_input: f64,
    conversion_ratio: f64,
}

impl TotalQuantity {
    pub const fn new(raw_input: f64, conversion_ratio: f64) -> Self {
        Self {
            raw_input,
            conversion_ratio,
        }
    }

    pub fn raw_input(&self) -> f64 {
        self.raw_input
    }

    pub fn conversion_ratio(&self) -> f64 {
        self.conversion_ratio
    }

    pub fn value(&self) -> f64 {
        self.raw_input * self.conversion_ratio
    }
}

/// Allocator output for one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    features: Vec<Feature>,
    total_area_m2: f64,
    total_quantity: f64,
}

impl Allocation {
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn into_features(self) -> Vec<Feature> {
        self.features
    }

    pub fn total_area_m2(&self) -> f64 {
        self.total_area_m2
    }

    pub fn total_quantity(&self) -> f64 {
        self.total_quantity
    }

    pub fn total_allocated(&self) -> f64 {
        self.features.iter().map(Feature::allocated_quantity).sum()
    }

    /// No area to distribute over; every feature received zero.
    pub fn is_degenerate(&self) -> bool {
        self.total_area_m2 <= 0.0
    }
}

/// Distributes a fixed quantity over parcels in proportion to their area.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AreaAllocator {
    total_quantity: f64,
}

impl AreaAllocator {
    pub fn new(total: TotalQuantity) -> Self {
        Self::with_quantity(total.value())
    }

    pub fn with_quantity(total_quantity: f64) -> Self {
        Self {
            total_quantity: sanitize(total_quantity),
        }
    }

    pub fn total_quantity(&self) -> f64 {
        self.total_quantity
    }

    /// Computes every area, then every share. Always a full recomputation.
    pub fn allocate(&self, parcels: Vec<Parcel>) -> Allocation {
        let areas: Vec<f64> = parcels
            .iter()
            .map(|p| sanitize(polygon_area_m2(&p.geometry)))
            .collect();
        let total_area_m2: f64 = areas.iter().sum();
        let quantities = proportional_shares(&areas, self.total_quantity);

        let features = parcels
            .into_iter()
            .zip(areas)
            .zip(quantities)
            .map(|((parcel, area), qty)| Feature::new(parcel, area, qty))
            .collect();

        Allocation {
            features,
            total_area_m2,
            total_quantity: self.total_quantity,
        }
    }
}

/// `total * w_i / sum(w)`, or all zeros when the weights sum to zero.
///
/// Negative and non-finite weights count as zero.
pub fn proportional_shares(weights: &[f64], total: f64) -> Vec<f64> {
    let total = sanitize(total);
    let sum: f64 = weights.iter().copied().map(sanitize).sum();
    if sum <= 0.0 {
        return vec![0.0; weights.len()];
    }
    weights
        .iter()
        .map(|&w| total * sanitize(w) / sum)
        .collect()
}

fn sanitize(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 { v } else { 0.0 }
}
