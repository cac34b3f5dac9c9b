use std::env;
use std::path::PathBuf;

use crate::http_cache::app_cache_dir;

pub const DEFAULT_APISPORTS_BASE: &str = "https://v3.football.api-sports.io";
pub const DEFAULT_BRAND: &str = "Betrun";
pub const DEFAULT_LEAGUE_AVG_GOALS: f64 = 2.6;
const DEFAULT_BIND: &str = "0.0.0.0:8000";
const DEFAULT_FETCH_PARALLELISM: usize = 4;
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub apisports_key: Option<String>,
    pub apisports_base: String,
    pub strict_team_match: bool,
    pub brand: String,
    pub league_avg_goals: f64,
    pub bind_addr: String,
    pub picks_db: Option<PathBuf>,
    pub fetch_parallelism: usize,
    pub upstream_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let apisports_key = get("APISPORTS_KEY").or_else(|| get("APISPORTS"));
        let apisports_base =
            get("APISPORTS_BASE").unwrap_or_else(|| DEFAULT_APISPORTS_BASE.to_string());
        let strict_team_match = get("STRICT_TEAM_MATCH")
            .map(|v| parse_bool(&v))
            .unwrap_or(false);
        let brand = get("BRAND_NAME").unwrap_or_else(|| DEFAULT_BRAND.to_string());
        let league_avg_goals = get("FOOTBALL_LEAGUE_AVG_GOALS")
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v > 0.0)
            .unwrap_or(DEFAULT_LEAGUE_AVG_GOALS);
        let bind_addr = get("BETRUN_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let picks_db = get("PICKS_DB")
            .map(PathBuf::from)
            .or_else(|| app_cache_dir().map(|dir| dir.join("picks.sqlite")));
        let fetch_parallelism = get("FETCH_PARALLELISM")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_FETCH_PARALLELISM)
            .clamp(1, 16);
        let upstream_timeout_secs = get("UPSTREAM_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS)
            .clamp(1, 120);

        Self {
            apisports_key,
            apisports_base,
            strict_team_match,
            brand,
            league_avg_goals,
            bind_addr,
            picks_db,
            fetch_parallelism,
            upstream_timeout_secs,
        }
    }
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let cfg = config_from(&[]);
        assert!(cfg.apisports_key.is_none());
        assert_eq!(cfg.apisports_base, DEFAULT_APISPORTS_BASE);
        assert!(!cfg.strict_team_match);
        assert_eq!(cfg.brand, "Betrun");
        assert_eq!(cfg.league_avg_goals, 2.6);
        assert_eq!(cfg.fetch_parallelism, 4);
    }

    #[test]
    fn legacy_key_name_is_accepted() {
        let cfg = config_from(&[("APISPORTS", "abc")]);
        assert_eq!(cfg.apisports_key.as_deref(), Some("abc"));
    }

    #[test]
    fn strict_match_accepts_truthy_words() {
        for raw in ["1", "true", "YES"] {
            assert!(config_from(&[("STRICT_TEAM_MATCH", raw)]).strict_team_match);
        }
        assert!(!config_from(&[("STRICT_TEAM_MATCH", "off")]).strict_team_match);
    }

    #[test]
    fn bad_numbers_fall_back() {
        let cfg = config_from(&[
            ("FOOTBALL_LEAGUE_AVG_GOALS", "-1"),
            ("FETCH_PARALLELISM", "500"),
        ]);
        assert_eq!(cfg.league_avg_goals, 2.6);
        assert_eq!(cfg.fetch_parallelism, 16);
    }
}
