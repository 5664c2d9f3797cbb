//! Runtime configuration. Priority: env var  >  TOML  >  built-in default.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{error, warn};

use crate::analytics::RankingMetric;
use crate::model::WEIGHT_ALIASES;
use crate::store::Direction;

/// Config file looked up in the working directory when no explicit path is
/// given.
pub const CONFIG_FILE: &str = "liftsync.toml";

const DEFAULT_WEIGHT_FIELD: &str = "weight";

// ─── TOML config file ─────────────────────────────────────────────────────────

/// `liftsync.toml` — all fields are optional overrides.
#[derive(Debug, Deserialize, Default)]
struct TomlConfig {
    /// Personal-record metric: "max-weight" (default) | "set-volume".
    ranking_metric: Option<RankingMetric>,
    /// Field name body-weight values are written under (default: "weight").
    weight_field: Option<String>,
    /// Subscription order for logs and body weights: "asc" (default) | "desc".
    log_order: Option<Direction>,
    /// Sort daily-volume output by date instead of first-appearance order.
    sort_days: Option<bool>,
}

fn load_toml(path: &Path) -> Option<TomlConfig> {
    let contents = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config file, using defaults");
            None
        }
    }
}

// ─── TrackerConfig ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Personal-record ranking metric (`LIFTSYNC_PR_METRIC` env var).
    pub metric: RankingMetric,
    /// Field body-weight values are written under (`LIFTSYNC_WEIGHT_FIELD`).
    /// Reads always accept all known aliases.
    pub weight_field: String,
    /// Subscription order for workout and body-weight feeds
    /// (`LIFTSYNC_LOG_ORDER`).
    pub log_order: Direction,
    /// Sorted daily-volume output (`LIFTSYNC_SORT_DAYS`).
    pub sort_days: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            metric: RankingMetric::default(),
            weight_field: DEFAULT_WEIGHT_FIELD.to_string(),
            log_order: Direction::Ascending,
            sort_days: false,
        }
    }
}

impl TrackerConfig {
    /// Build config from env vars + optional TOML file.
    ///
    /// Priority (highest to lowest):
    ///   1. env var (`LIFTSYNC_*`)
    ///   2. TOML file (explicit path, or `liftsync.toml` in the cwd)
    ///   3. Built-in defaults
    pub fn new(config_path: Option<PathBuf>) -> Self {
        let path = config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
        let toml = load_toml(&path).unwrap_or_default();

        let metric = std::env::var("LIFTSYNC_PR_METRIC")
            .ok()
            .and_then(|s| parse_metric(&s))
            .or(toml.ranking_metric)
            .unwrap_or_default();

        let weight_field = std::env::var("LIFTSYNC_WEIGHT_FIELD")
            .ok()
            .filter(|s| !s.is_empty())
            .or(toml.weight_field)
            .map(validated_weight_field)
            .unwrap_or_else(|| DEFAULT_WEIGHT_FIELD.to_string());

        let log_order = std::env::var("LIFTSYNC_LOG_ORDER")
            .ok()
            .and_then(|s| parse_direction(&s))
            .or(toml.log_order)
            .unwrap_or(Direction::Ascending);

        let sort_days = std::env::var("LIFTSYNC_SORT_DAYS")
            .ok()
            .map(|s| s == "1" || s.eq_ignore_ascii_case("true"))
            .or(toml.sort_days)
            .unwrap_or(false);

        Self {
            metric,
            weight_field,
            log_order,
            sort_days,
        }
    }
}

fn parse_metric(s: &str) -> Option<RankingMetric> {
    match s {
        "max-weight" => Some(RankingMetric::MaxWeight),
        "set-volume" => Some(RankingMetric::MaxSetVolume),
        other => {
            warn!(value = %other, "unrecognized LIFTSYNC_PR_METRIC, ignoring");
            None
        }
    }
}

fn parse_direction(s: &str) -> Option<Direction> {
    match s {
        "asc" => Some(Direction::Ascending),
        "desc" => Some(Direction::Descending),
        other => {
            warn!(value = %other, "unrecognized LIFTSYNC_LOG_ORDER, ignoring");
            None
        }
    }
}

/// An unknown write field would produce documents the decoders cannot read
/// back; fall back to the canonical one instead.
fn validated_weight_field(field: String) -> String {
    if WEIGHT_ALIASES.contains(&field.as_str()) {
        field
    } else {
        warn!(field = %field, "weight_field is not a known alias, using \"weight\"");
        DEFAULT_WEIGHT_FIELD.to_string()
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
