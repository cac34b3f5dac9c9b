use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use axum::body::Bytes;
use axum::extract::{Form, Query, State};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::analysis::{DEFAULT_SEASON, EngineParams, analyze};
use crate::api_football::{FixtureParams, FootballSource};
use crate::audit::PickStore;
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::fixtures::{fixture_item, fixtures_with_odds, team_candidate};
use crate::form::AnalysisForm;
use crate::payload::{
    AnalysisResponse, AnalyzeRequest, EnvStatus, FixtureItem, ItemList, MatchItem, PickStatus,
    TeamSearch,
};
use crate::render;
use crate::team_names::{exact_matches, search_team};

const MAX_TEAM_CANDIDATES: usize = 15;

type Params = Query<HashMap<String, String>>;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub source: Arc<dyn FootballSource>,
    pub picks: Arc<PickStore>,
    pub pool: Option<Arc<rayon::ThreadPool>>,
}

impl AppState {
    fn engine_params(&self) -> EngineParams {
        EngineParams {
            league_avg_goals: self.config.league_avg_goals,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/report", post(report))
        .route("/healthz", get(healthz))
        .route("/env_status", get(env_status))
        .route("/api/matches", get(api_matches))
        .route("/fixtures", get(fixtures))
        .route("/debug/ping", get(debug_ping))
        .route("/debug/team", get(debug_team))
        .route("/debug/fixtures", get(debug_fixtures))
        .route("/debug/injuries", get(debug_injuries))
        .route("/debug/h2h", get(debug_h2h))
        .route("/analyze/football", post(analyze_football))
        .route("/export", get(export_picks))
        .route("/import", post(import_picks))
        .with_state(state)
}

async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| ApiError::Internal(format!("worker task failed: {err}")))?
}

/// Integer query parameter. Unparseable and zero values count as absent.
fn int_param<T>(q: &HashMap<String, String>, key: &str) -> Option<T>
where
    T: FromStr + Default + PartialEq,
{
    q.get(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .filter(|v| *v != T::default())
}

fn text_param(q: &HashMap<String, String>, key: &str) -> Option<String> {
    q.get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render::render_index_page(&state.config.brand))
}

pub async fn report(
    State(state): State<AppState>,
    Form(fields): Form<HashMap<String, String>>,
) -> Html<String> {
    let req = AnalysisForm::from_fields(&fields).to_request();
    let brand = state.config.brand.clone();
    let body = match run_blocking(move || analyze_and_store(&state, &req)).await {
        Ok(resp) => render::render_football(&resp),
        Err(err) => render::render_error(&err.to_string()),
    };
    Html(render::render_page(&brand, "Analysis", &body))
}

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn env_status(State(state): State<AppState>) -> Json<EnvStatus> {
    let cfg = &state.config;
    Json(EnvStatus {
        apisports_key: cfg.apisports_key.is_some(),
        apisports_base: cfg.apisports_base.clone(),
        strict_team_match: cfg.strict_team_match,
        brand: cfg.brand.clone(),
    })
}

pub async fn api_matches(
    State(state): State<AppState>,
    Query(q): Params,
) -> Result<Json<ItemList<MatchItem>>, ApiError> {
    let fixture_id = int_param::<u64>(&q, "fixture_id");
    let league_id = int_param::<u64>(&q, "league_id");
    let season = int_param::<i32>(&q, "season");
    let date = text_param(&q, "date");

    let scoped_league = league_id.is_some() && (season.is_some() || date.is_some());
    if fixture_id.is_none() && !scoped_league {
        return Err(ApiError::BadRequest(
            "Provide fixture_id OR league_id with season/date".to_string(),
        ));
    }

    let params = FixtureParams {
        id: fixture_id,
        league: league_id,
        season,
        date,
        ..Default::default()
    };
    let source = state.source.clone();
    let pool = state.pool.clone();
    let items = run_blocking(move || {
        let raw = source
            .fixtures(&params)
            .context("fixtures fetch failed")
            .map_err(|err| ApiError::upstream(&err))?;
        Ok(fixtures_with_odds(source.as_ref(), &raw, pool.as_deref()))
    })
    .await?;

    let priced = items.iter().filter(|m| m.odds.is_some()).count();
    info!(count = items.len(), priced, "matches listed");
    Ok(Json(ItemList::new(items)))
}

pub async fn fixtures(
    State(state): State<AppState>,
    Query(q): Params,
) -> Result<Json<ItemList<FixtureItem>>, ApiError> {
    let params = FixtureParams {
        league: int_param(&q, "league"),
        season: int_param(&q, "season"),
        date: text_param(&q, "date"),
        team: int_param(&q, "team"),
        ..Default::default()
    };
    fetch_fixture_items(&state, params).await.map(Json)
}

async fn fetch_fixture_items(
    state: &AppState,
    params: FixtureParams,
) -> Result<ItemList<FixtureItem>, ApiError> {
    let source = state.source.clone();
    let raw = run_blocking(move || {
        source
            .fixtures(&params)
            .map_err(|err| ApiError::upstream(&err))
    })
    .await?;
    let items = raw.iter().map(|fx| fixture_item(fx, false)).collect();
    Ok(ItemList::new(items))
}

pub async fn debug_ping() -> Json<Value> {
    Json(json!({"ok": true}))
}

pub async fn debug_team(
    State(state): State<AppState>,
    Query(q): Params,
) -> Result<Json<TeamSearch>, ApiError> {
    let Some(name) = text_param(&q, "name") else {
        return Err(ApiError::BadRequest("missing ?name=<team>".to_string()));
    };

    let source = state.source.clone();
    let query = name.clone();
    let mut found = run_blocking(move || {
        search_team(source.as_ref(), &query).map_err(|err| ApiError::upstream(&err))
    })
    .await?;
    if state.config.strict_team_match {
        found = exact_matches(&name, found);
    }
    if found.is_empty() {
        debug!(query = %name, "team not found");
        return Err(ApiError::NotFound(json!({"found": false, "query": name})));
    }

    let candidates = found
        .iter()
        .take(MAX_TEAM_CANDIDATES)
        .map(team_candidate)
        .collect();
    Ok(Json(TeamSearch {
        found: true,
        query: name,
        candidates,
    }))
}

pub async fn debug_fixtures(
    State(state): State<AppState>,
    Query(q): Params,
) -> Result<Json<ItemList<FixtureItem>>, ApiError> {
    let params = FixtureParams {
        team: int_param(&q, "team_id"),
        league: int_param(&q, "league"),
        season: Some(int_param(&q, "season").unwrap_or(DEFAULT_SEASON)),
        date: text_param(&q, "date"),
        last: int_param(&q, "last"),
        ..Default::default()
    };
    fetch_fixture_items(&state, params).await.map(Json)
}

pub async fn debug_injuries(
    State(state): State<AppState>,
    Query(q): Params,
) -> Result<Json<Value>, ApiError> {
    let Some(team_id) = int_param::<u64>(&q, "team_id") else {
        return Err(ApiError::BadRequest("missing ?team_id=<id>".to_string()));
    };
    let season = int_param(&q, "season").unwrap_or(DEFAULT_SEASON);

    let source = state.source.clone();
    let items = run_blocking(move || {
        source
            .injuries(team_id, season)
            .map_err(|err| ApiError::upstream(&err))
    })
    .await?;
    Ok(Json(json!({
        "team_id": team_id,
        "season": season,
        "count": items.len(),
        "items": items,
    })))
}

pub async fn debug_h2h(
    State(state): State<AppState>,
    Query(q): Params,
) -> Result<Json<Value>, ApiError> {
    let (Some(home_id), Some(away_id)) = (
        int_param::<u64>(&q, "home_id"),
        int_param::<u64>(&q, "away_id"),
    ) else {
        return Err(ApiError::BadRequest(
            "missing ?home_id=<id>&away_id=<id>".to_string(),
        ));
    };
    let last = int_param::<u32>(&q, "last");

    let source = state.source.clone();
    let items = run_blocking(move || {
        source
            .head_to_head(home_id, away_id, last)
            .map_err(|err| ApiError::upstream(&err))
    })
    .await?;
    Ok(Json(json!({
        "home_id": home_id,
        "away_id": away_id,
        "count": items.len(),
        "items": items,
    })))
}

pub async fn analyze_football(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let req = parse_analyze_body(&body);
    let resp = run_blocking(move || analyze_and_store(&state, &req)).await?;
    Ok(Json(resp))
}

/// Invalid or non-object bodies are analysed as an empty request.
pub fn parse_analyze_body(body: &[u8]) -> AnalyzeRequest {
    if body.iter().all(u8::is_ascii_whitespace) {
        return AnalyzeRequest::default();
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => AnalyzeRequest::from_json_map(&map),
        Ok(_) => {
            debug!("analyze body is not an object, using defaults");
            AnalyzeRequest::default()
        }
        Err(err) => {
            debug!(error = %err, "analyze body not understood, using defaults");
            AnalyzeRequest::default()
        }
    }
}

fn analyze_and_store(state: &AppState, req: &AnalyzeRequest) -> Result<AnalysisResponse, ApiError> {
    let resp = analyze(req, &state.engine_params())
        .map_err(|err| ApiError::Analysis(format!("{err:#}")))?;

    match serde_json::to_value(&resp) {
        Ok(value) => {
            if let Err(err) = state.picks.store(&value) {
                warn!(error = %format!("{err:#}"), "failed to store pick");
            }
        }
        Err(err) => warn!(error = %err, "failed to serialize pick"),
    }

    info!(
        home = resp.home.as_deref().unwrap_or(""),
        away = resp.away.as_deref().unwrap_or(""),
        status = resp.status.as_ref().map(PickStatus::as_str).unwrap_or(""),
        "analysis served"
    );
    Ok(resp)
}

pub async fn export_picks(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let picks = state.picks.clone();
    let body = run_blocking(move || {
        picks
            .export()
            .map_err(|err| ApiError::Internal(format!("{err:#}")))
    })
    .await?;
    Ok(Json(body))
}

pub async fn import_picks(State(state): State<AppState>, body: Bytes) -> Response {
    let data: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let items = data
        .get("items")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let picks = state.picks.clone();
    let result = run_blocking(move || {
        picks
            .import(&items)
            .map_err(|err| ApiError::Internal(format!("{err:#}")))
    })
    .await;
    match result {
        Ok(count) => {
            info!(count, "picks imported");
            Json(json!({"status": "ok", "count": count})).into_response()
        }
        Err(err) => err.into_response(),
    }
}
