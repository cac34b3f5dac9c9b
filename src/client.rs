use anyhow::{Context, Result, anyhow};
use reqwest::Url;
use reqwest::blocking::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::http_client::http_client;
use crate::payload::{
    AnalysisResponse, AnalyzeRequest, EnvStatus, FixtureItem, ItemList, MatchItem, TeamSearch,
};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixtureQuery {
    pub league: Option<u64>,
    pub season: Option<i32>,
    pub date: Option<String>,
    pub team: Option<u64>,
    pub last: Option<u32>,
}

/// Blocking client for the analysis server.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base: String,
    http: Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base = base_url.trim().trim_end_matches('/').to_string();
        Url::parse(&base).with_context(|| format!("invalid base url {base}"))?;
        Ok(Self {
            base,
            http: http_client()?.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
        let raw = format!("{}/{}", self.base, path.trim_start_matches('/'));
        Url::parse_with_params(&raw, query.iter().map(|(k, v)| (*k, v.as_str())))
            .with_context(|| format!("invalid url {raw}"))
    }

    pub fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path, &[])?;
        debug!(%url, "POST");
        let resp = self
            .http
            .post(url.clone())
            .json(body)
            .send()
            .with_context(|| format!("POST {url} failed"))?;
        decode_json("POST", &url, resp)
    }

    pub fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.url(path, query)?;
        debug!(%url, "GET");
        let resp = self
            .http
            .get(url.clone())
            .send()
            .with_context(|| format!("GET {url} failed"))?;
        decode_json("GET", &url, resp)
    }

    pub fn get_text(&self, path: &str) -> Result<String> {
        let url = self.url(path, &[])?;
        let resp = self
            .http
            .get(url.clone())
            .send()
            .with_context(|| format!("GET {url} failed"))?;
        checked_body("GET", &url, resp)
    }

    pub fn analyze(&self, req: &AnalyzeRequest) -> Result<AnalysisResponse> {
        self.post_json("/analyze/football", req)
    }

    pub fn fixtures(&self, q: &FixtureQuery) -> Result<ItemList<FixtureItem>> {
        let mut query = Vec::new();
        push_opt(&mut query, "league", q.league);
        push_opt(&mut query, "season", q.season);
        push_opt(&mut query, "date", q.date.clone());
        push_opt(&mut query, "team", q.team);
        self.get_json("/fixtures", &query)
    }

    pub fn matches(
        &self,
        fixture_id: Option<u64>,
        league_id: Option<u64>,
        season: Option<i32>,
        date: Option<&str>,
    ) -> Result<ItemList<MatchItem>> {
        let mut query = Vec::new();
        push_opt(&mut query, "fixture_id", fixture_id);
        push_opt(&mut query, "league_id", league_id);
        push_opt(&mut query, "season", season);
        push_opt(&mut query, "date", date);
        self.get_json("/api/matches", &query)
    }

    pub fn env_status(&self) -> Result<EnvStatus> {
        self.get_json("/env_status", &[])
    }

    pub fn health(&self) -> Result<String> {
        self.get_text("/healthz")
    }

    /// A 404 is a normal "not found" answer and comes back as `found: false`.
    pub fn debug_team(&self, name: &str) -> Result<TeamSearch> {
        let url = self.url("/debug/team", &[("name", name.to_string())])?;
        let resp = self
            .http
            .get(url.clone())
            .send()
            .with_context(|| format!("GET {url} failed"))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(TeamSearch {
                found: false,
                query: name.to_string(),
                candidates: Vec::new(),
            });
        }
        decode_json("GET", &url, resp)
    }

    pub fn debug_fixtures(&self, q: &FixtureQuery) -> Result<ItemList<FixtureItem>> {
        let mut query = Vec::new();
        push_opt(&mut query, "team_id", q.team);
        push_opt(&mut query, "league", q.league);
        push_opt(&mut query, "season", q.season);
        push_opt(&mut query, "date", q.date.clone());
        push_opt(&mut query, "last", q.last);
        self.get_json("/debug/fixtures", &query)
    }

    pub fn debug_h2h(&self, home_id: u64, away_id: u64, last: Option<u32>) -> Result<Value> {
        let mut query = vec![
            ("home_id", home_id.to_string()),
            ("away_id", away_id.to_string()),
        ];
        push_opt(&mut query, "last", last);
        self.get_json("/debug/h2h", &query)
    }

    pub fn export(&self) -> Result<Value> {
        self.get_json("/export", &[])
    }

    pub fn import(&self, items: &[Value]) -> Result<usize> {
        let resp: Value = self.post_json("/import", &serde_json::json!({ "items": items }))?;
        resp.get("count")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .ok_or_else(|| anyhow!("import response missing count"))
    }
}

fn push_opt<T: ToString>(query: &mut Vec<(&'static str, String)>, key: &'static str, v: Option<T>) {
    if let Some(v) = v {
        let v = v.to_string();
        if !v.trim().is_empty() {
            query.push((key, v));
        }
    }
}

fn checked_body(method: &str, url: &Url, resp: Response) -> Result<String> {
    let status = resp.status();
    let body = resp
        .text()
        .with_context(|| format!("{method} {url} failed reading body"))?;
    if !status.is_success() {
        return Err(anyhow!("{method} {url} failed: {} {}", status.as_u16(), body));
    }
    Ok(body)
}

fn decode_json<T: DeserializeOwned>(method: &str, url: &Url, resp: Response) -> Result<T> {
    let body = checked_body(method, url, resp)?;
    serde_json::from_str(&body).with_context(|| format!("{method} {url} returned invalid json"))
}
