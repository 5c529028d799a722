use std::sync::Arc;

use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use compute::{Statistics, Summary, TotalQuantity};
use foundation::ids::FeatureId;
use foundation::point::GeoPoint;
use layers::export::to_geojson;
use layers::{Category, Color, Feature, FeatureCollection, SEARCH_AREA_STYLE, SearchAreaStyle};
use parking_lot::{Mutex, RwLock};
use scene::{HoverOutcome, InteractionController, Measurement, ToggleState, pick, visible};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use streaming::FetchStatus;
use tracing::debug;

use crate::config::SiteConfig;
use crate::fetcher::FetchHandle;

type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

#[derive(Clone)]
pub struct AppState {
    pub site: Arc<SiteConfig>,
    pub fetcher: FetchHandle,
    pub toggles: Arc<RwLock<ToggleState>>,
    pub interaction: Arc<Mutex<InteractionController>>,
}

impl AppState {
    pub fn new(site: SiteConfig, fetcher: FetchHandle) -> Self {
        let interaction = InteractionController::new(site.reference);
        Self {
            site: Arc::new(site),
            fetcher,
            toggles: Arc::new(RwLock::new(ToggleState::default())),
            interaction: Arc::new(Mutex::new(interaction)),
        }
    }

    /// Current collection plus the toggle snapshot used to filter it. Stale
    /// highlights are dropped so the renderer never keeps one around.
    fn view(&self) -> (Arc<FeatureCollection>, ToggleState) {
        let collection = self.fetcher.collection();
        let toggles = *self.toggles.read();
        let ids = visible(&collection, &toggles).into_iter().map(Feature::id);
        self.interaction.lock().retain_visible(ids);
        (collection, toggles)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/site", get(get_site))
        .route("/api/radius", get(get_radius).put(put_radius))
        .route("/api/toggles", get(get_toggles))
        .route("/api/toggles/:category", axum::routing::put(put_toggle))
        .route("/api/parcels", get(get_parcels))
        .route("/api/summary", get(get_summary))
        .route("/api/status", get(get_status))
        .route("/api/hover", post(post_hover))
        .route("/api/click", post(post_click))
        .with_state(state)
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

#[derive(Debug, Serialize)]
pub struct CategoryEntry {
    pub category: Category,
    pub tag: &'static str,
    pub label: String,
    pub color: Color,
}

#[derive(Debug, Serialize)]
pub struct Marker {
    pub position: GeoPoint,
    pub popup: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchArea {
    pub center: GeoPoint,
    pub radius_m: f64,
    pub style: SearchAreaStyle,
}

#[derive(Debug, Serialize)]
pub struct RadiusControl {
    pub min_km: f64,
    pub step_km: f64,
    pub initial_km: f64,
}

#[derive(Debug, Serialize)]
pub struct SiteInfo {
    pub name: String,
    pub marker: Marker,
    pub reference: GeoPoint,
    pub categories: Vec<CategoryEntry>,
    pub search_area: SearchArea,
    pub radius_control: RadiusControl,
    pub total_quantity: TotalQuantity,
    pub total_quantity_l: f64,
}

fn requested_radius_m(state: &AppState) -> f64 {
    state
        .fetcher
        .status()
        .requested_radius_m
        .unwrap_or(state.site.initial_radius_km * 1000.0)
}

pub async fn get_site(State(state): State<AppState>) -> Json<SiteInfo> {
    let site = &state.site;
    let total = site.total_quantity();
    Json(SiteInfo {
        name: site.name.clone(),
        marker: Marker {
            position: site.center,
            popup: vec![
                site.name.clone(),
                format!("Raw material: {} L", site.raw_input_l),
                format!("Total fertilizer: {:.2} L", total.value()),
            ],
        },
        reference: site.reference,
        categories: Category::ALL
            .into_iter()
            .map(|category| CategoryEntry {
                category,
                tag: category.tag(),
                label: category.label(),
                color: category.color(),
            })
            .collect(),
        search_area: SearchArea {
            center: site.center,
            radius_m: requested_radius_m(&state),
            style: SEARCH_AREA_STYLE,
        },
        radius_control: RadiusControl {
            min_km: 0.0,
            step_km: site.radius_step_km,
            initial_km: site.initial_radius_km,
        },
        total_quantity: total,
        total_quantity_l: total.value(),
    })
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RadiusBody {
    pub radius_km: f64,
}

pub async fn get_radius(State(state): State<AppState>) -> Json<RadiusBody> {
    Json(RadiusBody {
        radius_km: requested_radius_m(&state) / 1000.0,
    })
}

pub async fn put_radius(
    State(state): State<AppState>,
    Json(body): Json<RadiusBody>,
) -> Result<(StatusCode, Json<RadiusBody>), ApiError> {
    if !body.radius_km.is_finite() || body.radius_km < 0.0 {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "radius_km must be a non-negative number",
        ));
    }
    state
        .fetcher
        .set_radius(body.radius_km * 1000.0)
        .map_err(|e| api_error(StatusCode::SERVICE_UNAVAILABLE, e.to_string()))?;
    debug!(radius_km = body.radius_km, "radius change queued");
    Ok((StatusCode::ACCEPTED, Json(body)))
}

pub async fn get_toggles(State(state): State<AppState>) -> Json<ToggleState> {
    Json(*state.toggles.read())
}

#[derive(Debug, Deserialize)]
pub struct ToggleBody {
    pub enabled: bool,
}

pub async fn put_toggle(
    State(state): State<AppState>,
    AxumPath(category): AxumPath<String>,
    Json(body): Json<ToggleBody>,
) -> Result<Json<ToggleState>, ApiError> {
    let category: Category = category
        .parse()
        .map_err(|e: layers::UnknownCategory| api_error(StatusCode::NOT_FOUND, e.to_string()))?;
    let toggles = {
        let mut toggles = state.toggles.write();
        toggles.set(category, body.enabled);
        *toggles
    };
    state.view();
    Ok(Json(toggles))
}

pub async fn get_parcels(State(state): State<AppState>) -> Json<geojson::FeatureCollection> {
    let (collection, toggles) = state.view();
    let shown = visible(&collection, &toggles);
    let interaction = state.interaction.lock();
    Json(to_geojson(shown, |f| interaction.style_for(f)))
}

pub async fn get_summary(State(state): State<AppState>) -> Json<Summary> {
    let (collection, toggles) = state.view();
    Json(Statistics::summarize(
        visible(&collection, &toggles),
        state.site.total_quantity().value(),
        state.site.required_kg_per_ha,
    ))
}

pub async fn get_status(State(state): State<AppState>) -> Json<FetchStatus> {
    Json(state.fetcher.status())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoverEvent {
    Enter,
    Exit,
}

#[derive(Debug, Deserialize)]
pub struct HoverBody {
    pub feature_id: FeatureId,
    pub event: HoverEvent,
}

pub async fn post_hover(
    State(state): State<AppState>,
    Json(body): Json<HoverBody>,
) -> Result<Json<HoverOutcome>, ApiError> {
    let (collection, toggles) = state.view();
    let Some(feature) = visible(&collection, &toggles)
        .into_iter()
        .find(|f| f.id() == body.feature_id)
    else {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            format!("feature {} is not displayed", body.feature_id),
        ));
    };

    let mut interaction = state.interaction.lock();
    let outcome = match body.event {
        HoverEvent::Enter => interaction.hover_enter(feature),
        HoverEvent::Exit => interaction.hover_exit(feature),
    };
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct ClickBody {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Serialize)]
pub struct ClickResponse {
    pub measurement: Measurement,
    pub message: String,
    pub feature_id: Option<FeatureId>,
}

pub async fn post_click(
    State(state): State<AppState>,
    Json(body): Json<ClickBody>,
) -> Result<Json<ClickResponse>, ApiError> {
    let at = GeoPoint::new(body.lat, body.lon);
    if !at.is_valid() {
        return Err(api_error(StatusCode::BAD_REQUEST, "lat/lon out of range"));
    }

    let (collection, toggles) = state.view();
    let shown = visible(&collection, &toggles);
    let measurement = state.interaction.lock().click(at);
    Ok(Json(ClickResponse {
        message: measurement.message(),
        feature_id: pick(&shown, at).map(Feature::id),
        measurement,
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::data_sources::MemorySource;
    use crate::fetcher;
    use streaming::{FetchCoordinator, OverpassResponse};

    fn fixture() -> OverpassResponse {
        OverpassResponse::from_slice(
            br#"{"elements": [
                {"type": "way", "id": 1, "tags": {"landuse": "farmland"},
                 "geometry": [{"lat": 43.0, "lon": 11.0}, {"lat": 43.0, "lon": 11.01},
                              {"lat": 43.01, "lon": 11.01}, {"lat": 43.01, "lon": 11.0},
                              {"lat": 43.0, "lon": 11.0}]},
                {"type": "way", "id": 2, "tags": {"landuse": "vineyard"},
                 "geometry": [{"lat": 43.1, "lon": 11.1}, {"lat": 43.1, "lon": 11.13},
                              {"lat": 43.13, "lon": 11.13}, {"lat": 43.13, "lon": 11.1},
                              {"lat": 43.1, "lon": 11.1}]}
            ]}"#,
        )
        .unwrap()
    }

    async fn loaded_state() -> AppState {
        let site = SiteConfig::default();
        let coordinator = FetchCoordinator::new(streaming::CoordinatorConfig::new(
            site.center,
            site.total_quantity(),
        ));
        let (handle, _task) = fetcher::spawn(coordinator, Arc::new(MemorySource::new(fixture())));
        let state = AppState::new(site, handle);
        let (status, _) = put_radius(State(state.clone()), Json(RadiusBody { radius_km: 5.0 }))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::ACCEPTED);
        tokio::time::sleep(Duration::from_secs(1)).await;
        state
    }

    #[tokio::test(start_paused = true)]
    async fn rejects_negative_radius() {
        let state = loaded_state().await;
        let err = put_radius(State(state.clone()), Json(RadiusBody { radius_km: -1.0 }))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
        assert_eq!(get_radius(State(state)).await.0.radius_km, 5.0);
    }

    #[tokio::test(start_paused = true)]
    async fn summary_and_parcels_follow_toggles() {
        let state = loaded_state().await;

        let all = get_summary(State(state.clone())).await.0;
        assert_eq!(all.feature_count, 2);
        assert!((all.total_allocated - 14_914.9).abs() < 1e-6);

        let toggles = put_toggle(
            State(state.clone()),
            AxumPath("vineyard".to_string()),
            Json(ToggleBody { enabled: false }),
        )
        .await
        .unwrap()
        .0;
        assert!(!toggles.is_enabled(Category::Vineyard));

        let some = get_summary(State(state.clone())).await.0;
        assert_eq!(some.feature_count, 1);
        assert!(some.total_area_m2 < all.total_area_m2);
        assert_eq!(some.production, all.production);

        let parcels = get_parcels(State(state.clone())).await.0;
        assert_eq!(parcels.features.len(), 1);
        let props = parcels.features[0].properties.as_ref().unwrap();
        assert_eq!(props["landuse"], "farmland");
        assert_eq!(props["style"]["fillColor"], "#FFD700");
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_toggle_category_is_not_found() {
        let state = loaded_state().await;
        let err = put_toggle(
            State(state),
            AxumPath("residential".to_string()),
            Json(ToggleBody { enabled: false }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test(start_paused = true)]
    async fn hover_round_trip_and_hidden_highlight() {
        let state = loaded_state().await;
        let enter = post_hover(
            State(state.clone()),
            Json(HoverBody {
                feature_id: FeatureId::way(2),
                event: HoverEvent::Enter,
            }),
        )
        .await
        .unwrap()
        .0;
        assert_eq!(enter.style.weight, 3.0);
        assert_eq!(enter.overlay.unwrap().lines[0], "Type: vineyard");

        // Hiding the category clears the highlight without an exit event.
        let toggles = put_toggle(
            State(state.clone()),
            AxumPath("vineyard".to_string()),
            Json(ToggleBody { enabled: false }),
        )
        .await
        .unwrap()
        .0;
        assert!(!toggles.is_enabled(Category::Vineyard));
        assert_eq!(state.interaction.lock().highlighted().count(), 0);

        let err = post_hover(
            State(state),
            Json(HoverBody {
                feature_id: FeatureId::way(2),
                event: HoverEvent::Exit,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test(start_paused = true)]
    async fn click_measures_and_picks() {
        let state = loaded_state().await;
        let resp = post_click(
            State(state.clone()),
            Json(ClickBody {
                lat: 43.005,
                lon: 11.005,
            }),
        )
        .await
        .unwrap()
        .0;
        assert_eq!(resp.feature_id, Some(FeatureId::way(1)));
        assert!(resp.measurement.distance_km > 0.0);
        assert!(resp.message.starts_with("Distance: "));

        let err = post_click(State(state), Json(ClickBody { lat: 95.0, lon: 0.0 }))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test(start_paused = true)]
    async fn site_describes_marker_and_categories() {
        let state = loaded_state().await;
        let site = get_site(State(state)).await.0;
        assert_eq!(site.categories.len(), Category::COUNT);
        assert_eq!(site.marker.popup[1], "Raw material: 213070 L");
        assert_eq!(site.marker.popup[2], "Total fertilizer: 14914.90 L");
        assert_eq!(site.search_area.radius_m, 5000.0);
    }
}
