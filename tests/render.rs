use std::fs;
use std::path::PathBuf;

use betrun::analysis::{EngineParams, analyze};
use betrun::api_football::parse_response_array;
use betrun::fixtures::{fixture_item, team_candidate};
use betrun::form::request_from_fixture_row;
use betrun::payload::{AnalysisResponse, EnvStatus, MatchItem, MatchOdds, PickStatus, TeamSearch};
use betrun::render;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn fixture_items() -> Vec<MatchItem> {
    let raw = parse_response_array(&read_fixture("api_fixtures.json")).expect("fixture should parse");
    raw.iter()
        .map(|fx| MatchItem {
            fixture: fixture_item(fx, true),
            odds: None,
        })
        .collect()
}

#[test]
fn football_card_shows_every_section() {
    let mut items = fixture_items();
    let first = items.remove(0);
    let req = request_from_fixture_row(&first.fixture, "3.60", "3.40", "2.30");
    let resp = analyze(&req, &EngineParams::default()).expect("analysis");
    let html = render::render_football(&resp);

    assert!(html.contains("Premier League - Arsenal vs Chelsea"));
    assert!(html.contains("badge good"));
    assert!(html.contains("Agreement: <b>DIVERGED</b>"));
    for heading in [
        "Winner Mode",
        "Value Mode",
        "Implied %",
        "Edge (pp)",
        "Alignment",
        "Audit",
        "Markets",
        "Double Chance",
        "Winning Margin",
    ] {
        assert!(html.contains(heading), "missing {heading}");
    }
    // Team goal lines are nested and get flattened into one table.
    assert!(html.contains("home &gt; 0.5"));
    assert!(!html.contains("Correct Score Groups"));
    assert!(html.contains("Best Edge: 1"));
    assert!(html.contains("API-FOOTBALL: fixtures+odds (Bet365) when available"));
}

#[test]
fn skipped_card_has_placeholders() {
    let resp = AnalysisResponse {
        league: Some("Serie A".into()),
        home: Some("Inter".into()),
        away: Some("Milan".into()),
        status: Some(PickStatus::Skipped),
        sources: vec!["Model: priors".into(), "Cache".into()],
        ..Default::default()
    };
    let html = render::render_football(&resp);
    assert!(html.contains("badge warn"));
    assert!(html.contains("No markets calculated."));
    assert!(html.contains("Best Edge: -"));
    assert!(html.contains("Model: priors • Cache"));
    assert!(!html.contains("Agreement"));
}

#[test]
fn team_names_are_escaped() {
    let resp = AnalysisResponse {
        home: Some("<script>alert(1)</script>".into()),
        away: Some("B&B".into()),
        ..Default::default()
    };
    let html = render::render_football(&resp);
    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;script&gt;"));
    assert!(html.contains("B&amp;B"));
}

#[test]
fn fixtures_table_lists_matches() {
    let mut items = fixture_items();
    items[0].odds = Some(MatchOdds {
        home: 2.0,
        draw: 3.4,
        away: 3.6,
        bookmaker: Some("Bet365".into()),
    });
    let html = render::render_fixtures(&items);
    assert!(html.contains("<td>2025-08-16 14:00</td>"));
    assert!(html.contains("Arsenal vs Chelsea"));
    assert!(html.contains("2 / 3.4 / 3.6 (Bet365)"));
    assert!(html.contains("Liverpool vs Everton"));

    assert_eq!(render::render_fixtures(&[]), "<small>No fixtures returned.</small>");
}

#[test]
fn team_candidates_table() {
    let raw = parse_response_array(&read_fixture("api_teams.json")).expect("fixture should parse");
    let search = TeamSearch {
        found: true,
        query: "Man City".into(),
        candidates: raw.iter().map(team_candidate).collect(),
    };
    let html = render::render_team_candidates(&search);
    assert!(html.contains("<th>Venue</th>"));
    assert!(html.contains("<td>Etihad Stadium</td>"));
    // Missing code shows a dash.
    assert!(html.contains("<td>-</td>"));

    let missing = TeamSearch {
        found: false,
        query: "Nowhere".into(),
        candidates: Vec::new(),
    };
    assert_eq!(render::render_team_candidates(&missing), "<small>Not found.</small>");
}

#[test]
fn env_and_error_fragments() {
    let env = EnvStatus {
        apisports_key: true,
        apisports_base: "https://v3.football.api-sports.io".into(),
        strict_team_match: false,
        brand: "Betrun".into(),
    };
    let html = render::render_env(&env);
    assert!(html.starts_with("<code>"));
    assert!(html.contains("&quot;APISPORTS_KEY&quot;:true"));

    assert!(render::render_env_error().contains("Env check failed"));
    let err = render::render_error("GET http://x/healthz failed: 500 <oops>");
    assert!(err.contains("Error: GET http://x/healthz failed: 500 &lt;oops&gt;"));
}

#[test]
fn index_page_has_form_fields() {
    let html = render::render_index_page("Matchday Lab");
    assert!(html.contains("<title>Matchday Lab - Football analysis</title>"));
    assert!(html.contains("action=\"/report\""));
    assert!(html.contains("name=\"mk_0\" value=\"1X2\""));
    assert!(html.contains("name=\"mk_13\" value=\"Winning Margin\""));
    assert!(html.contains("name=\"oddsX\""));
}
