use std::collections::HashMap;

use serde_json::Value;
use tracing::warn;

use crate::api_football::FootballSource;
use crate::odds_extract::{bookmaker_blocks, extract_1x2};
use crate::payload::{FixtureItem, MatchItem, MatchOdds, TeamCandidate};

/// Flattens an API-FOOTBALL fixture object. `detailed` adds country and round.
pub fn fixture_item(fx: &Value, detailed: bool) -> FixtureItem {
    let fixture = fx.get("fixture").unwrap_or(&Value::Null);
    let league = fx.get("league").unwrap_or(&Value::Null);
    let teams = fx.get("teams").unwrap_or(&Value::Null);
    let home = teams.get("home").unwrap_or(&Value::Null);
    let away = teams.get("away").unwrap_or(&Value::Null);

    FixtureItem {
        fixture_id: fixture.get("id").and_then(Value::as_u64),
        utc: str_field(fixture, "date"),
        status: fixture.get("status").and_then(|s| str_field(s, "short")),
        league_id: league.get("id").and_then(Value::as_u64),
        league: str_field(league, "name"),
        country: if detailed { str_field(league, "country") } else { None },
        season: league
            .get("season")
            .and_then(Value::as_i64)
            .and_then(|s| i32::try_from(s).ok()),
        round: if detailed { str_field(league, "round") } else { None },
        home_id: home.get("id").and_then(Value::as_u64),
        home: str_field(home, "name"),
        away_id: away.get("id").and_then(Value::as_u64),
        away: str_field(away, "name"),
    }
}

pub fn team_candidate(raw: &Value) -> TeamCandidate {
    let team = raw.get("team").unwrap_or(&Value::Null);
    let venue = raw.get("venue").unwrap_or(&Value::Null);
    TeamCandidate {
        id: team.get("id").and_then(Value::as_u64),
        name: str_field(team, "name"),
        code: str_field(team, "code"),
        country: str_field(team, "country"),
        venue: str_field(venue, "name"),
    }
}

/// Attaches 1X2 prices to each fixture, fetching odds on the given pool.
pub fn fixtures_with_odds(
    source: &dyn FootballSource,
    raw: &[Value],
    pool: Option<&rayon::ThreadPool>,
) -> Vec<MatchItem> {
    use rayon::prelude::*;

    let fixtures: Vec<FixtureItem> = raw.iter().map(|fx| fixture_item(fx, true)).collect();
    let ids: Vec<u64> = fixtures.iter().filter_map(|f| f.fixture_id).collect();

    let lookup = || {
        ids.par_iter()
            .filter_map(|&id| odds_for_fixture(source, id).map(|odds| (id, odds)))
            .collect::<HashMap<u64, MatchOdds>>()
    };
    let mut odds_map = match pool {
        Some(pool) => pool.install(lookup),
        None => lookup(),
    };

    fixtures
        .into_iter()
        .map(|fixture| {
            let odds = fixture.fixture_id.and_then(|id| odds_map.remove(&id));
            MatchItem { fixture, odds }
        })
        .collect()
}

fn odds_for_fixture(source: &dyn FootballSource, fixture_id: u64) -> Option<MatchOdds> {
    let response = match source.odds(fixture_id) {
        Ok(r) => r,
        Err(err) => {
            warn!(fixture_id, error = %format!("{err:#}"), "odds lookup failed");
            return None;
        }
    };
    extract_1x2(&bookmaker_blocks(&response))
}

pub fn build_fetch_pool(threads: usize) -> Option<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("odds-fetch-{i}"))
        .build()
        .ok()
}

fn str_field(v: &Value, key: &str) -> Option<String> {
    v.get(key).and_then(Value::as_str).map(str::to_string)
}
