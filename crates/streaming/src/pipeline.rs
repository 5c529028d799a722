//! Debounced, last-request-wins fetch orchestration.
//!
//! [`FetchCoordinator`] is a pure state machine: it never performs I/O and
//! never reads the clock. The host feeds it radius changes and completions
//! with explicit instants, asks it when the next debounce deadline is due, and
//! carries out the [`Dispatch`]es it hands back. This keeps the debounce and
//! staleness rules testable without a runtime.

use std::sync::Arc;
use std::time::{Duration, Instant};

use compute::{AreaAllocator, TotalQuantity};
use foundation::point::GeoPoint;
use layers::{CategorySet, FeatureCollection};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::convert::convert;
use crate::error::{FetchError, QueryBuildError};
use crate::protocol::OverpassResponse;
use crate::query::{DEFAULT_QUERY_TIMEOUT_S, SpatialQuery};
use crate::request::{Request, RequestTokens};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub center: GeoPoint,
    pub categories: CategorySet,
    pub debounce: Duration,
    pub total_quantity: TotalQuantity,
    pub query_timeout_s: u32,
}

impl CoordinatorConfig {
    pub fn new(center: GeoPoint, total_quantity: TotalQuantity) -> Self {
        Self {
            center,
            categories: CategorySet::all(),
            debounce: DEFAULT_DEBOUNCE,
            total_quantity,
            query_timeout_s: DEFAULT_QUERY_TIMEOUT_S,
        }
    }
}

/// Coarse lifecycle state, as reported to observers.
///
/// A debounce can be pending while an earlier request is still in flight;
/// the pending debounce is reported since it determines what happens next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchPhase {
    Idle,
    PendingDebounce,
    InFlight,
}

/// A query the host must send to the data source.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub request: Request,
    pub query: SpatialQuery,
    pub text: String,
}

/// Outcome of feeding a completion back into the coordinator.
#[derive(Debug, Clone)]
pub enum Completion {
    /// A new collection replaced the previous one.
    Published(Arc<FeatureCollection>),
    /// The fetch failed; the previous collection stays current.
    Failed(FetchError),
    /// A newer request was issued since; the result was discarded.
    Stale { request: Request },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchStatus {
    pub phase: FetchPhase,
    pub requested_radius_m: Option<f64>,
    pub in_flight: Option<u64>,
    pub generation: u64,
    pub published_radius_m: f64,
    pub feature_count: usize,
    pub total_area_m2: f64,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    radius_m: f64,
    deadline: Instant,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    request: Request,
    radius_m: f64,
}

pub struct FetchCoordinator {
    config: CoordinatorConfig,
    allocator: AreaAllocator,
    tokens: Arc<RequestTokens>,
    requested_radius_m: Option<f64>,
    pending: Option<Pending>,
    in_flight: Option<InFlight>,
    current: Arc<FeatureCollection>,
    last_error: Option<FetchError>,
}

impl FetchCoordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        let allocator = AreaAllocator::new(config.total_quantity);
        Self {
            config,
            allocator,
            tokens: Arc::new(RequestTokens::new()),
            requested_radius_m: None,
            pending: None,
            in_flight: None,
            current: Arc::new(FeatureCollection::empty()),
            last_error: None,
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Shared token source; fetch tasks may consult it to give up early on
    /// superseded work.
    pub fn tokens(&self) -> Arc<RequestTokens> {
        Arc::clone(&self.tokens)
    }

    /// Starts or restarts the debounce window for `radius_m`.
    pub fn radius_changed(&mut self, radius_m: f64, now: Instant) -> Result<(), QueryBuildError> {
        if !radius_m.is_finite() || radius_m < 0.0 {
            return Err(QueryBuildError::InvalidRadius(radius_m));
        }
        let deadline = now + self.config.debounce;
        if self.pending.is_some() {
            debug!(radius_m, "debounce restarted");
        }
        self.pending = Some(Pending { radius_m, deadline });
        self.requested_radius_m = Some(radius_m);
        Ok(())
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.map(|p| p.deadline)
    }

    /// Fires the debounce if its deadline has passed.
    ///
    /// Issuing the new token implicitly supersedes whatever is in flight.
    pub fn poll(&mut self, now: Instant) -> Option<Dispatch> {
        let pending = self.pending.filter(|p| p.deadline <= now)?;
        self.pending = None;

        let query = match SpatialQuery::new(
            self.config.center,
            pending.radius_m,
            self.config.categories.clone(),
        ) {
            Ok(q) => q.with_timeout(self.config.query_timeout_s),
            Err(e) => {
                warn!(radius_m = pending.radius_m, "query not dispatched: {e}");
                return None;
            }
        };

        let request = self.tokens.issue();
        if let Some(prev) = self.in_flight.replace(InFlight {
            request,
            radius_m: pending.radius_m,
        }) {
            debug!(superseded = prev.request.0, "in-flight request superseded");
        }
        info!(
            request = request.0,
            radius_m = pending.radius_m,
            "dispatching query"
        );

        let text = query.to_overpass_ql();
        Some(Dispatch {
            request,
            query,
            text,
        })
    }

    /// Applies a fetch result, unless a newer request was issued meanwhile.
    pub fn complete(
        &mut self,
        request: Request,
        result: Result<OverpassResponse, FetchError>,
    ) -> Completion {
        if !self.tokens.is_latest(request) {
            debug!(request = request.0, "discarding stale result");
            return Completion::Stale { request };
        }
        let Some(flight) = self.in_flight.take().filter(|f| f.request == request) else {
            debug!(request = request.0, "completion without matching dispatch");
            return Completion::Stale { request };
        };

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!(request = request.0, "fetch failed, keeping previous parcels: {e}");
                self.last_error = Some(e.clone());
                return Completion::Failed(e);
            }
        };

        let conversion = convert(&response);
        if conversion.dropped() > 0 {
            warn!(
                request = request.0,
                dropped = conversion.dropped(),
                "elements dropped during conversion"
            );
        }

        let allocation = self.allocator.allocate(conversion.parcels);
        if allocation.is_degenerate() {
            debug!(request = request.0, "zero total area, nothing allocated");
        }
        let collection = FeatureCollection::new(
            request.0,
            flight.radius_m,
            allocation.total_quantity(),
            allocation.into_features(),
        );
        info!(
            request = request.0,
            features = collection.len(),
            total_area_m2 = collection.total_area_m2(),
            "published parcels"
        );

        self.current = Arc::new(collection);
        self.last_error = None;
        Completion::Published(Arc::clone(&self.current))
    }

    pub fn current(&self) -> &Arc<FeatureCollection> {
        &self.current
    }

    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    pub fn phase(&self) -> FetchPhase {
        if self.pending.is_some() {
            FetchPhase::PendingDebounce
        } else if self.in_flight.is_some() {
            FetchPhase::InFlight
        } else {
            FetchPhase::Idle
        }
    }

    pub fn status(&self) -> FetchStatus {
        FetchStatus {
            phase: self.phase(),
            requested_radius_m: self.requested_radius_m,
            in_flight: self.in_flight.map(|f| f.request.0),
            generation: self.current.generation(),
            published_radius_m: self.current.radius_m(),
            feature_count: self.current.len(),
            total_area_m2: self.current.total_area_m2(),
            last_error: self.last_error.as_ref().map(ToString::to_string),
        }
    }
}
