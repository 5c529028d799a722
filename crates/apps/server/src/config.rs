use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use compute::{REQUIRED_KG_PER_HA, TotalQuantity};
use foundation::point::GeoPoint;
use streaming::{CoordinatorConfig, DEFAULT_QUERY_TIMEOUT_S};
use thiserror::Error;

pub const DEFAULT_ADDR: &str = "127.0.0.1:9200";
pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// Extra slack the HTTP client allows on top of the server-side query timeout.
const HTTP_TIMEOUT_SLACK: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {key} {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// The point of interest and the production figures tied to it.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteConfig {
    pub name: String,
    pub center: GeoPoint,
    pub reference: GeoPoint,
    pub raw_input_l: f64,
    pub conversion_ratio: f64,
    pub required_kg_per_ha: f64,
    pub initial_radius_km: f64,
    pub radius_step_km: f64,
}

impl SiteConfig {
    pub fn total_quantity(&self) -> TotalQuantity {
        TotalQuantity::new(self.raw_input_l, self.conversion_ratio)
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "Arno Ovest".to_string(),
            center: GeoPoint::new(43.65063986776146, 11.463874101163523),
            reference: GeoPoint::new(43.7696, 11.2558),
            raw_input_l: 213_070.0,
            conversion_ratio: 0.07,
            required_kg_per_ha: REQUIRED_KG_PER_HA,
            initial_radius_km: 5.0,
            radius_step_km: 0.5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub overpass_url: String,
    pub overpass_timeout_s: u32,
    pub debounce: Duration,
    pub site: SiteConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads every knob through `lookup`. Unparseable numbers fall back to
    /// their defaults; a bad listen address or site position is an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = SiteConfig::default();

        let raw_addr = lookup("LANDUSE_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = raw_addr.parse::<SocketAddr>().map_err(|e| ConfigError::Invalid {
            key: "LANDUSE_ADDR",
            value: raw_addr.clone(),
            reason: e.to_string(),
        })?;

        let center = GeoPoint::new(
            env_var_f64(&lookup, "LANDUSE_CENTER_LAT", defaults.center.lat()),
            env_var_f64(&lookup, "LANDUSE_CENTER_LON", defaults.center.lon()),
        );
        check_point("LANDUSE_CENTER_LAT", center)?;
        let reference = GeoPoint::new(
            env_var_f64(&lookup, "LANDUSE_REFERENCE_LAT", defaults.reference.lat()),
            env_var_f64(&lookup, "LANDUSE_REFERENCE_LON", defaults.reference.lon()),
        );
        check_point("LANDUSE_REFERENCE_LAT", reference)?;

        let site = SiteConfig {
            name: lookup("LANDUSE_SITE_NAME").unwrap_or(defaults.name),
            center,
            reference,
            raw_input_l: env_var_f64(&lookup, "LANDUSE_RAW_INPUT_L", defaults.raw_input_l),
            conversion_ratio: env_var_f64(
                &lookup,
                "LANDUSE_CONVERSION_RATIO",
                defaults.conversion_ratio,
            ),
            required_kg_per_ha: env_var_f64(
                &lookup,
                "LANDUSE_REQUIRED_KG_PER_HA",
                defaults.required_kg_per_ha,
            ),
            initial_radius_km: env_var_f64(
                &lookup,
                "LANDUSE_INITIAL_RADIUS_KM",
                defaults.initial_radius_km,
            )
            .max(0.0),
            radius_step_km: env_var_f64(&lookup, "LANDUSE_RADIUS_STEP_KM", defaults.radius_step_km),
        };

        Ok(Self {
            addr,
            overpass_url: lookup("OVERPASS_URL").unwrap_or_else(|| DEFAULT_OVERPASS_URL.to_string()),
            overpass_timeout_s: env_var_u32(&lookup, "OVERPASS_TIMEOUT_S", DEFAULT_QUERY_TIMEOUT_S),
            debounce: Duration::from_millis(env_var_u64(&lookup, "LANDUSE_DEBOUNCE_MS", 500)),
            site,
        })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.overpass_timeout_s)) + HTTP_TIMEOUT_SLACK
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            debounce: self.debounce,
            query_timeout_s: self.overpass_timeout_s,
            ..CoordinatorConfig::new(self.site.center, self.site.total_quantity())
        }
    }
}

fn check_point(key: &'static str, p: GeoPoint) -> Result<(), ConfigError> {
    if p.is_valid() {
        return Ok(());
    }
    Err(ConfigError::Invalid {
        key,
        value: format!("{},{}", p.lat(), p.lon()),
        reason: "not a WGS84 position".to_string(),
    })
}

fn env_var_f64<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default: f64) -> f64 {
    lookup(key)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

fn env_var_u32<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default: u32) -> u32 {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_var_u64<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default: u64) -> u64 {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, ServerConfig};
    use std::collections::HashMap;
    use std::time::Duration;

    fn from(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults_match_the_site() {
        let cfg = from(&[]).unwrap();
        assert_eq!(cfg.addr.to_string(), "127.0.0.1:9200");
        assert_eq!(cfg.overpass_timeout_s, 25);
        assert_eq!(cfg.http_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.debounce, Duration::from_millis(500));
        assert_eq!(cfg.site.name, "Arno Ovest");
        assert!((cfg.site.total_quantity().value() - 14_914.9).abs() < 1e-9);

        let cc = cfg.coordinator_config();
        assert_eq!(cc.debounce, Duration::from_millis(500));
        assert_eq!(cc.center, cfg.site.center);
    }

    #[test]
    fn overrides_and_bad_numbers() {
        let cfg = from(&[
            ("LANDUSE_DEBOUNCE_MS", "50"),
            ("LANDUSE_RAW_INPUT_L", "1000"),
            ("LANDUSE_CONVERSION_RATIO", "not-a-number"),
            ("LANDUSE_INITIAL_RADIUS_KM", "-3"),
            ("OVERPASS_URL", "http://localhost:12345/api/interpreter"),
        ])
        .unwrap();
        assert_eq!(cfg.debounce, Duration::from_millis(50));
        assert_eq!(cfg.site.raw_input_l, 1000.0);
        assert_eq!(cfg.site.conversion_ratio, 0.07);
        assert_eq!(cfg.site.initial_radius_km, 0.0);
        assert_eq!(cfg.overpass_url, "http://localhost:12345/api/interpreter");
    }

    #[test]
    fn bad_address_and_center_are_errors() {
        assert!(matches!(
            from(&[("LANDUSE_ADDR", "nowhere")]),
            Err(ConfigError::Invalid { key: "LANDUSE_ADDR", .. })
        ));
        assert!(matches!(
            from(&[("LANDUSE_CENTER_LAT", "123")]),
            Err(ConfigError::Invalid { key: "LANDUSE_CENTER_LAT", .. })
        ));
    }
}
