//! Analysis configuration.
//!
//! Every component receives its parameters explicitly from an
//! [`AnalysisConfig`]; nothing is read from process-wide state once the
//! binary has built the config.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::graph::WalkParams;
use crate::metrics::Weighting;
use crate::optimizer::{CandidatePlacement, QuickWinConfig};

/// Errors from loading or validating configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable could not be parsed
    #[error("invalid value for {key}: {value:?}")]
    Unparsable { key: &'static str, value: String },

    /// A parameter is outside its allowed range
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Parameters for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Maximum walking distance to a stop (meters).
    pub walk_radius_m: f64,

    /// Walking speed (meters per second).
    pub walk_speed_mps: f64,

    /// Primary coverage threshold (minutes).
    pub threshold_min: f64,

    /// Secondary, looser coverage threshold (minutes).
    pub threshold2_min: f64,

    /// Stop budget for the quick-win search.
    pub max_new_stops: usize,

    /// How zones are weighted in aggregate KPIs and gains.
    pub weighting: Weighting,

    /// Where candidate stops are placed.
    pub placement: CandidatePlacement,

    /// Minimum headsign match score (0-100) for a stop-school association.
    pub match_score_cutoff: f64,
}

impl AnalysisConfig {
    /// Create a new configuration with the given core parameters.
    pub fn new(
        walk_radius_m: f64,
        walk_speed_mps: f64,
        threshold_min: f64,
        threshold2_min: f64,
        max_new_stops: usize,
    ) -> Self {
        Self {
            walk_radius_m,
            walk_speed_mps,
            threshold_min,
            threshold2_min,
            max_new_stops,
            ..Self::default()
        }
    }

    /// Read overrides from `ACCESS_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from defaults plus whatever `lookup` returns.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = parse_var(&lookup, "ACCESS_WALK_RADIUS_M")? {
            config.walk_radius_m = v;
        }
        if let Some(v) = parse_var(&lookup, "ACCESS_WALK_SPEED_MPS")? {
            config.walk_speed_mps = v;
        }
        if let Some(v) = parse_var(&lookup, "ACCESS_THRESHOLD_MIN")? {
            config.threshold_min = v;
        }
        if let Some(v) = parse_var(&lookup, "ACCESS_THRESHOLD2_MIN")? {
            config.threshold2_min = v;
        }
        if let Some(v) = parse_var(&lookup, "ACCESS_MAX_NEW_STOPS")? {
            config.max_new_stops = v;
        }
        if let Some(v) = parse_var(&lookup, "ACCESS_WEIGHTING")? {
            config.weighting = v;
        }
        if let Some(max_offset_m) = parse_var(&lookup, "ACCESS_DETOUR_M")? {
            config.placement = CandidatePlacement::Detour { max_offset_m };
        }
        if let Some(v) = parse_var(&lookup, "ACCESS_MATCH_CUTOFF")? {
            config.match_score_cutoff = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.walk_radius_m.is_finite() && self.walk_radius_m > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "walk_radius_m must be positive, got {}",
                self.walk_radius_m
            )));
        }
        if !(self.walk_speed_mps.is_finite() && self.walk_speed_mps > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "walk_speed_mps must be positive, got {}",
                self.walk_speed_mps
            )));
        }
        if !(self.threshold_min.is_finite() && self.threshold_min >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "threshold_min must be non-negative, got {}",
                self.threshold_min
            )));
        }
        if !(self.threshold2_min.is_finite() && self.threshold2_min >= self.threshold_min) {
            return Err(ConfigError::Invalid(format!(
                "threshold2_min ({}) must be at least threshold_min ({})",
                self.threshold2_min, self.threshold_min
            )));
        }
        if let CandidatePlacement::Detour { max_offset_m } = self.placement {
            if !(max_offset_m.is_finite() && max_offset_m >= 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "detour offset must be non-negative, got {max_offset_m}"
                )));
            }
        }
        if !(0.0..=100.0).contains(&self.match_score_cutoff) {
            return Err(ConfigError::Invalid(format!(
                "match_score_cutoff must be within 0-100, got {}",
                self.match_score_cutoff
            )));
        }
        Ok(())
    }

    /// Walking parameters for graph construction.
    pub fn walk_params(&self) -> WalkParams {
        WalkParams::new(self.walk_radius_m, self.walk_speed_mps)
    }

    /// Quick-win search parameters.
    pub fn quick_win_config(&self) -> QuickWinConfig {
        QuickWinConfig::new(self.threshold_min, self.threshold2_min, self.max_new_stops)
            .with_weighting(self.weighting)
            .with_placement(self.placement)
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            walk_radius_m: 900.0,
            walk_speed_mps: 1.25,
            threshold_min: 10.0,
            threshold2_min: 15.0,
            max_new_stops: 10,
            weighting: Weighting::Students,
            placement: CandidatePlacement::Centroid,
            match_score_cutoff: 82.0,
        }
    }
}

/// Settings for the analysis server binary.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Directory holding `raw/` downloads and `manual/` inputs.
    pub data_dir: PathBuf,
    /// Directory the report tables are written to.
    pub output_dir: PathBuf,
    /// How long a cached quick-win plan stays valid.
    pub cache_ttl: Duration,
    /// Maximum number of cached quick-win plans.
    pub cache_capacity: u64,
}

impl ServerConfig {
    /// Read `ACCESS_BIND`, `ACCESS_DATA_DIR`, `ACCESS_OUTPUT_DIR` and
    /// `ACCESS_CACHE_TTL_SECS` from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(v) = parse_var(&lookup, "ACCESS_BIND")? {
            config.bind = v;
        }
        if let Some(v) = lookup("ACCESS_DATA_DIR") {
            config.data_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("ACCESS_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(v);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "ACCESS_CACHE_TTL_SECS")? {
            config.cache_ttl = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output"),
            cache_ttl: Duration::from_secs(600),
            cache_capacity: 64,
        }
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Unparsable { key, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config() {
        let config = AnalysisConfig::default();

        assert_eq!(config.walk_radius_m, 900.0);
        assert_eq!(config.walk_speed_mps, 1.25);
        assert_eq!(config.threshold_min, 10.0);
        assert_eq!(config.threshold2_min, 15.0);
        assert_eq!(config.max_new_stops, 10);
        assert_eq!(config.weighting, Weighting::Students);
        assert_eq!(config.placement, CandidatePlacement::Centroid);
        assert_eq!(config.match_score_cutoff, 82.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn custom_config() {
        let config = AnalysisConfig::new(1200.0, 1.4, 8.0, 12.0, 3);

        assert_eq!(config.walk_radius_m, 1200.0);
        assert_eq!(config.walk_speed_mps, 1.4);
        assert_eq!(config.threshold_min, 8.0);
        assert_eq!(config.threshold2_min, 12.0);
        assert_eq!(config.max_new_stops, 3);
        assert_eq!(config.walk_params(), WalkParams::new(1200.0, 1.4));

        let search = config.quick_win_config();
        assert_eq!(search.threshold_min, 8.0);
        assert_eq!(search.max_new_stops, 3);
        assert_eq!(search.weighting, Weighting::Students);
    }

    #[test]
    fn env_overrides() {
        let config = AnalysisConfig::from_lookup(lookup(&[
            ("ACCESS_WALK_RADIUS_M", "1200"),
            ("ACCESS_THRESHOLD_MIN", " 12 "),
            ("ACCESS_THRESHOLD2_MIN", "20"),
            ("ACCESS_MAX_NEW_STOPS", "4"),
            ("ACCESS_WEIGHTING", "uniform"),
            ("ACCESS_DETOUR_M", "250"),
        ]))
        .unwrap();

        assert_eq!(config.walk_radius_m, 1200.0);
        assert_eq!(config.threshold_min, 12.0);
        assert_eq!(config.threshold2_min, 20.0);
        assert_eq!(config.max_new_stops, 4);
        assert_eq!(config.weighting, Weighting::Uniform);
        assert_eq!(
            config.placement,
            CandidatePlacement::Detour { max_offset_m: 250.0 }
        );
    }

    #[test]
    fn env_unparsable_value() {
        let err = AnalysisConfig::from_lookup(lookup(&[("ACCESS_MAX_NEW_STOPS", "-1")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Unparsable {
                key: "ACCESS_MAX_NEW_STOPS",
                value: "-1".to_string()
            }
        );
    }

    #[test]
    fn validation_rejects_bad_ranges() {
        let mut config = AnalysisConfig::default();
        config.walk_radius_m = 0.0;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.walk_speed_mps = -1.0;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.threshold2_min = 5.0;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.match_score_cutoff = 120.0;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.placement = CandidatePlacement::Detour { max_offset_m: -5.0 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn deserialize_partial_json() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{"threshold_min": 8, "weighting": "uniform"}"#).unwrap();

        assert_eq!(config.threshold_min, 8.0);
        assert_eq!(config.weighting, Weighting::Uniform);
        assert_eq!(config.walk_radius_m, 900.0);
    }

    #[test]
    fn server_defaults_and_overrides() {
        let config = ServerConfig::default();
        assert_eq!(config.bind, SocketAddr::from(([127, 0, 0, 1], 3000)));
        assert_eq!(config.data_dir, PathBuf::from("data"));

        let config = ServerConfig::from_lookup(lookup(&[
            ("ACCESS_BIND", "0.0.0.0:8080"),
            ("ACCESS_OUTPUT_DIR", "/tmp/out"),
            ("ACCESS_CACHE_TTL_SECS", "30"),
        ]))
        .unwrap();
        assert_eq!(config.bind.port(), 8080);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.cache_ttl, Duration::from_secs(30));

        assert!(ServerConfig::from_lookup(lookup(&[("ACCESS_BIND", "nope")])).is_err());
    }
}
