use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde_json::{Value, json};

use betrun::api_football::{FixtureParams, FootballSource, parse_response_array};
use betrun::audit::PickStore;
use betrun::config::AppConfig;
use betrun::payload::PickStatus;
use betrun::server::{self, AppState};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

struct StubSource {
    fail_fixtures: bool,
}

impl FootballSource for StubSource {
    fn fixtures(&self, _: &FixtureParams) -> Result<Vec<Value>> {
        if self.fail_fixtures {
            bail!("http 500");
        }
        parse_response_array(&read_fixture("api_fixtures.json"))
    }

    fn odds(&self, fixture_id: u64) -> Result<Vec<Value>> {
        match fixture_id {
            1035037 => parse_response_array(&read_fixture("api_odds_1035037.json")),
            _ => Err(anyhow!("rate limited")),
        }
    }

    fn search_teams(&self, name: &str) -> Result<Vec<Value>> {
        match name {
            "Manchester City" => parse_response_array(&read_fixture("api_teams.json")),
            "boom" => Err(anyhow!("upstream down")),
            _ => Ok(Vec::new()),
        }
    }

    fn injuries(&self, team_id: u64, _: i32) -> Result<Vec<Value>> {
        Ok(vec![json!({"player": {"name": "Injured Player"}, "team": {"id": team_id}})])
    }

    fn head_to_head(&self, _: u64, _: u64, _: Option<u32>) -> Result<Vec<Value>> {
        Ok(Vec::new())
    }
}

fn state_with(strict: bool, fail_fixtures: bool) -> AppState {
    let config = AppConfig::from_lookup(|key| match key {
        "STRICT_TEAM_MATCH" if strict => Some("1".to_string()),
        "APISPORTS_KEY" => Some("test-key".to_string()),
        _ => None,
    });
    AppState {
        config: Arc::new(config),
        source: Arc::new(StubSource { fail_fixtures }),
        picks: Arc::new(PickStore::in_memory().expect("in-memory store")),
        pool: None,
    }
}

fn state() -> AppState {
    state_with(false, false)
}

fn query(pairs: &[(&str, &str)]) -> Query<HashMap<String, String>> {
    Query(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    )
}

#[tokio::test]
async fn health_and_env_status() {
    assert_eq!(server::healthz().await, "ok");
    let env = server::env_status(State(state_with(true, false))).await.0;
    assert!(env.apisports_key);
    assert!(env.strict_team_match);
    assert_eq!(env.brand, "Betrun");
    assert_eq!(env.apisports_base, "https://v3.football.api-sports.io");
}

#[tokio::test]
async fn matches_require_fixture_or_scoped_league() {
    let err = server::api_matches(State(state()), query(&[("league_id", "39")]))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        err.body()["error"],
        "Provide fixture_id OR league_id with season/date"
    );
}

#[tokio::test]
async fn matches_attach_odds_where_available() {
    let list = server::api_matches(
        State(state()),
        query(&[("league_id", "39"), ("season", "2025")]),
    )
    .await
    .expect("matches")
    .0;
    assert_eq!(list.count, 2);

    let first = &list.items[0];
    assert_eq!(first.fixture.home.as_deref(), Some("Arsenal"));
    assert_eq!(first.fixture.round.as_deref(), Some("Regular Season - 1"));
    let odds = first.odds.as_ref().expect("odds for first fixture");
    assert_eq!(odds.bookmaker.as_deref(), Some("Bet365"));
    assert_eq!(odds.home, 2.0);

    // The odds lookup for the second fixture fails; the fixture is still listed.
    assert!(list.items[1].odds.is_none());
}

#[tokio::test]
async fn matches_report_upstream_failure() {
    let err = server::api_matches(State(state_with(false, true)), query(&[("fixture_id", "7")]))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    let msg = err.body()["error"].as_str().unwrap_or_default().to_string();
    assert!(msg.starts_with("fixtures fetch failed: "), "{msg}");
    assert!(msg.contains("http 500"));
}

#[tokio::test]
async fn fixtures_list_without_odds() {
    let list = server::fixtures(State(state()), query(&[("league", "39"), ("date", "2025-08-16")]))
        .await
        .expect("fixtures")
        .0;
    assert_eq!(list.count, 2);
    assert_eq!(list.items[1].away.as_deref(), Some("Everton"));
    assert!(list.items[0].country.is_none());
    assert!(list.items[0].round.is_none());
    let keys = serde_json::to_value(&list.items[0]).expect("json");
    assert!(keys.get("country").is_none());
    assert!(keys.get("odds").is_none());

    let debug = server::debug_fixtures(State(state()), query(&[("team_id", "42")]))
        .await
        .expect("debug fixtures")
        .0;
    assert_eq!(debug.count, 2);
    assert!(debug.items[0].country.is_none());
}

#[tokio::test]
async fn debug_team_lookups() {
    let err = server::debug_team(State(state()), query(&[("name", "  ")]))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert_eq!(err.body()["error"], "missing ?name=<team>");

    let err = server::debug_team(State(state()), query(&[("name", "Nowhere United")]))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
    assert_eq!(err.body(), json!({"found": false, "query": "Nowhere United"}));

    let err = server::debug_team(State(state()), query(&[("name", "boom")]))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_GATEWAY);

    let found = server::debug_team(State(state()), query(&[("name", "Man City")]))
        .await
        .expect("alias lookup")
        .0;
    assert!(found.found);
    assert_eq!(found.query, "Man City");
    assert_eq!(found.candidates.len(), 2);
    assert_eq!(found.candidates[0].venue.as_deref(), Some("Etihad Stadium"));
}

#[tokio::test]
async fn strict_team_match_keeps_exact_names() {
    let found = server::debug_team(State(state_with(true, false)), query(&[("name", "Man City")]))
        .await
        .expect("strict lookup")
        .0;
    assert_eq!(found.candidates.len(), 1);
    assert_eq!(found.candidates[0].id, Some(50));
}

#[tokio::test]
async fn debug_injuries_and_h2h_validate_ids() {
    let err = server::debug_injuries(State(state()), query(&[("team_id", "abc")]))
        .await
        .unwrap_err();
    assert_eq!(err.body()["error"], "missing ?team_id=<id>");

    let body = server::debug_injuries(State(state()), query(&[("team_id", "42")]))
        .await
        .expect("injuries")
        .0;
    assert_eq!(body["season"], 2025);
    assert_eq!(body["count"], 1);

    let err = server::debug_h2h(State(state()), query(&[("home_id", "42")]))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert_eq!(err.body()["error"], "missing ?home_id=<id>&away_id=<id>");

    let body = server::debug_h2h(State(state()), query(&[("home_id", "42"), ("away_id", "49")]))
        .await
        .expect("h2h")
        .0;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn analysis_is_stored_and_exported() {
    let st = state();
    let body = json!({
        "league": "Premier League",
        "home": "Arsenal",
        "away": "Chelsea",
        "odds": {"1": 3.6, "X": 3.4, "2": 2.3}
    });
    let resp = server::analyze_football(State(st.clone()), Bytes::from(body.to_string()))
        .await
        .expect("analysis")
        .0;
    assert_eq!(resp.status, Some(PickStatus::FinalPick));

    let exported = server::export_picks(State(st.clone())).await.expect("export").0;
    let items = exported["items"].as_array().expect("items array");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["status"], "FINAL_PICK");
    assert_eq!(items[0]["home"], "Arsenal");
}

#[tokio::test]
async fn mistyped_fields_keep_the_rest_of_the_body() {
    let st = state();
    let body = json!({
        "league": "Premier League",
        "season": "2025",
        "home": "Arsenal",
        "away": "Chelsea",
        "context": {"derby": 1},
        "odds": {"1": 3.6, "X": 3.4, "2": 2.3}
    });
    let resp = server::analyze_football(State(st.clone()), Bytes::from(body.to_string()))
        .await
        .expect("analysis")
        .0;
    assert_eq!(resp.status, Some(PickStatus::FinalPick));
    assert_eq!(resp.home.as_deref(), Some("Arsenal"));
    assert_eq!(resp.away.as_deref(), Some("Chelsea"));
    let audit = resp.audit.expect("audit");
    assert_eq!(audit.calibration_note.as_deref(), Some("priors; DC rho=0.05"));
}

#[tokio::test]
async fn invalid_body_is_analysed_with_defaults() {
    let resp = server::analyze_football(State(state()), Bytes::from_static(b"{oops"))
        .await
        .expect("analysis")
        .0;
    assert_eq!(resp.status, Some(PickStatus::Skipped));
    assert_eq!(resp.home.as_deref(), Some("Home"));
    assert_eq!(resp.reason.as_deref(), Some("Edge < 5% (no value)"));
}

#[tokio::test]
async fn engine_errors_use_status_shape() {
    let body = json!({"odds": {"1": 3.6, "X": 3.4, "2": 2.3}, "ou_lines": [-1.5]});
    let err = server::analyze_football(State(state()), Bytes::from(body.to_string()))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.body()["status"], "ERROR");
    assert!(err.body()["reason"].as_str().unwrap_or_default().contains("invalid goal line"));
}

#[tokio::test]
async fn import_replaces_stored_picks() {
    let st = state();
    st.picks.store(&json!({"home": "Old"})).expect("store");

    let body = json!({"items": [{"home": "A"}, {"home": "B"}]});
    let resp = server::import_picks(State(st.clone()), Bytes::from(body.to_string())).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let raw = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body");
    let parsed: Value = serde_json::from_slice(&raw).expect("json");
    assert_eq!(parsed, json!({"status": "ok", "count": 2}));

    let exported = st.picks.export().expect("export");
    assert_eq!(exported["items"][0]["home"], "A");
    assert_eq!(st.picks.count().expect("count"), 2);
}

#[tokio::test]
async fn report_page_renders_card() {
    let fields: HashMap<String, String> = [
        ("home", "Arsenal"),
        ("away", "Chelsea"),
        ("odds1", "3.6"),
        ("oddsX", "3.4"),
        ("odds2", "2.3"),
        ("mk_0", "1X2"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    let html = server::report(State(state()), axum::extract::Form(fields)).await.0;
    assert!(html.contains("Arsenal vs Chelsea"));
    assert!(html.contains("FINAL_PICK"));
    assert!(html.contains("<h4>1X2</h4>"));
    assert!(!html.contains("<h4>BTTS</h4>"));
}
