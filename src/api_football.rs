use anyhow::{Context, Result, anyhow};
use reqwest::Url;
use serde_json::Value;
use tracing::debug;

use crate::config::AppConfig;
use crate::http_cache::fetch_json_cached;
use crate::http_client::http_client_with_timeout;

/// Query for the upstream `/fixtures` endpoint. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixtureParams {
    pub id: Option<u64>,
    pub league: Option<u64>,
    pub season: Option<i32>,
    pub date: Option<String>,
    pub team: Option<u64>,
    pub last: Option<u32>,
}

impl FixtureParams {
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut q = Vec::new();
        if let Some(id) = self.id {
            q.push(("id", id.to_string()));
        }
        if let Some(league) = self.league {
            q.push(("league", league.to_string()));
        }
        if let Some(season) = self.season {
            q.push(("season", season.to_string()));
        }
        if let Some(date) = self.date.as_deref().filter(|d| !d.trim().is_empty()) {
            q.push(("date", date.trim().to_string()));
        }
        if let Some(team) = self.team {
            q.push(("team", team.to_string()));
        }
        if let Some(last) = self.last {
            q.push(("last", last.to_string()));
        }
        q
    }
}

/// Football data provider. Every method returns the provider's `response` array.
pub trait FootballSource: Send + Sync {
    fn fixtures(&self, params: &FixtureParams) -> Result<Vec<Value>>;
    fn odds(&self, fixture_id: u64) -> Result<Vec<Value>>;
    fn search_teams(&self, name: &str) -> Result<Vec<Value>>;
    fn injuries(&self, team_id: u64, season: i32) -> Result<Vec<Value>>;
    fn head_to_head(&self, home_id: u64, away_id: u64, last: Option<u32>) -> Result<Vec<Value>>;
}

#[derive(Debug, Clone)]
pub struct ApiFootball {
    base: String,
    key: Option<String>,
    timeout_secs: u64,
}

impl ApiFootball {
    pub fn new(cfg: &AppConfig) -> Self {
        Self {
            base: cfg.apisports_base.trim_end_matches('/').to_string(),
            key: cfg.apisports_key.clone(),
            timeout_secs: cfg.upstream_timeout_secs,
        }
    }

    fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<Value>> {
        let key = self
            .key
            .as_deref()
            .ok_or_else(|| anyhow!("Missing APISPORTS_KEY environment variable"))?;
        let raw_url = format!("{}/{}", self.base, path.trim_start_matches('/'));
        let url = Url::parse_with_params(&raw_url, query.iter().map(|(k, v)| (*k, v.as_str())))
            .with_context(|| format!("invalid upstream url {raw_url}"))?;

        debug!(%url, "api-football request");
        let client = http_client_with_timeout(self.timeout_secs)?;
        let body = fetch_json_cached(
            client,
            &url,
            &[("x-apisports-key", key), ("Accept", "application/json")],
        )
        .with_context(|| format!("GET {path} failed"))?;
        parse_response_array(&body)
    }
}

impl FootballSource for ApiFootball {
    fn fixtures(&self, params: &FixtureParams) -> Result<Vec<Value>> {
        self.get("/fixtures", &params.to_query())
    }

    fn odds(&self, fixture_id: u64) -> Result<Vec<Value>> {
        self.get("/odds", &[("fixture", fixture_id.to_string())])
    }

    fn search_teams(&self, name: &str) -> Result<Vec<Value>> {
        self.get("/teams", &[("search", name.to_string())])
    }

    fn injuries(&self, team_id: u64, season: i32) -> Result<Vec<Value>> {
        self.get(
            "/injuries",
            &[("team", team_id.to_string()), ("season", season.to_string())],
        )
    }

    fn head_to_head(&self, home_id: u64, away_id: u64, last: Option<u32>) -> Result<Vec<Value>> {
        let mut query = vec![("h2h", format!("{home_id}-{away_id}"))];
        if let Some(last) = last {
            query.push(("last", last.to_string()));
        }
        self.get("/fixtures/headtohead", &query)
    }
}

/// Extracts the `response` array from an API-FOOTBALL envelope; anything else is empty.
pub fn parse_response_array(raw: &str) -> Result<Vec<Value>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let root: Value = serde_json::from_str(trimmed).context("invalid api-football json")?;
    Ok(root
        .get("response")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_skips_unset_and_blank_fields() {
        let params = FixtureParams {
            league: Some(39),
            season: Some(2025),
            date: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(
            params.to_query(),
            vec![("league", "39".to_string()), ("season", "2025".to_string())]
        );
    }

    #[test]
    fn response_array_is_extracted() {
        let items = parse_response_array(r#"{"get":"teams","response":[{"a":1},{"a":2}]}"#).unwrap();
        assert_eq!(items.len(), 2);
        assert!(parse_response_array("null").unwrap().is_empty());
        assert!(parse_response_array(r#"{"errors":{}}"#).unwrap().is_empty());
    }

    #[test]
    fn missing_key_is_reported() {
        let api = ApiFootball::new(&AppConfig::from_lookup(|_| None));
        let err = api.search_teams("Arsenal").unwrap_err();
        assert!(err.to_string().contains("Missing APISPORTS_KEY"));
    }
}
