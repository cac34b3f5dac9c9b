use std::collections::HashMap;

use crate::analysis::DEFAULT_SEASON;
use crate::markets::{MarketLines, SUPPORTED_MARKETS};
use crate::payload::{AnalyzeRequest, FixtureItem, MatchContext, Odds, TeamGoalLines};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisForm {
    pub league: String,
    pub season: String,
    pub home: String,
    pub away: String,
    pub odds1: String,
    pub odds_x: String,
    pub odds2: String,
    pub derby: bool,
    pub markets: Vec<String>,
    pub ou_lines: String,
    pub home_tg: String,
    pub away_tg: String,
}

impl AnalysisForm {
    pub fn from_fields(fields: &HashMap<String, String>) -> Self {
        let text = |key: &str| fields.get(key).cloned().unwrap_or_default();
        let markets = SUPPORTED_MARKETS
            .iter()
            .enumerate()
            .filter(|(i, _)| fields.contains_key(&format!("mk_{i}")))
            .map(|(_, name)| name.to_string())
            .collect();
        Self {
            league: text("league"),
            season: text("season"),
            home: text("home"),
            away: text("away"),
            odds1: text("odds1"),
            odds_x: text("oddsX"),
            odds2: text("odds2"),
            derby: fields
                .get("derby")
                .is_some_and(|v| !v.is_empty() && v != "off"),
            markets,
            ou_lines: text("ouLines"),
            home_tg: text("homeTG"),
            away_tg: text("awayTG"),
        }
    }

    pub fn to_request(&self) -> AnalyzeRequest {
        let defaults = MarketLines::default();
        let ou = parse_number_list(&self.ou_lines);
        let home_tg = parse_number_list(&self.home_tg);
        let away_tg = parse_number_list(&self.away_tg);

        AnalyzeRequest {
            league: Some(self.league.clone()),
            season: parse_season(&self.season),
            home: Some(self.home.clone()),
            away: Some(self.away.clone()),
            odds: Some(Odds {
                home: parse_price(&self.odds1),
                draw: parse_price(&self.odds_x),
                away: parse_price(&self.odds2),
            }),
            context: Some(MatchContext { derby: self.derby }),
            markets: Some(self.markets.clone()),
            ou_lines: Some(non_empty_or(ou, defaults.ou_lines)),
            team_goal_lines: Some(TeamGoalLines {
                home: Some(non_empty_or(home_tg, defaults.home_goal_lines)),
                away: Some(non_empty_or(away_tg, defaults.away_goal_lines)),
            }),
            cs_groups: Some(defaults.cs_groups),
        }
    }
}

/// Request for a fixture row: every market, default lines, no derby flag.
pub fn request_from_fixture_row(fixture: &FixtureItem, o1: &str, ox: &str, o2: &str) -> AnalyzeRequest {
    let defaults = MarketLines::default();
    AnalyzeRequest {
        league: Some(fixture.league.clone().unwrap_or_default()),
        season: Some(fixture.season.unwrap_or(DEFAULT_SEASON)),
        home: fixture.home.clone(),
        away: fixture.away.clone(),
        odds: Some(Odds {
            home: parse_price(o1),
            draw: parse_price(ox),
            away: parse_price(o2),
        }),
        context: Some(MatchContext { derby: false }),
        markets: Some(
            SUPPORTED_MARKETS
                .iter()
                .filter(|m| **m != "Correct Score Groups")
                .map(|m| m.to_string())
                .collect(),
        ),
        ou_lines: Some(defaults.ou_lines),
        team_goal_lines: Some(TeamGoalLines {
            home: Some(defaults.home_goal_lines),
            away: Some(defaults.away_goal_lines),
        }),
        cs_groups: Some(defaults.cs_groups),
    }
}

pub fn parse_number_list(raw: &str) -> Vec<f64> {
    raw.trim()
        .split(',')
        .filter_map(|v| v.trim().parse::<f64>().ok())
        .filter(|v| !v.is_nan())
        .collect()
}

/// Blank means 0 (no price); garbage means unknown.
fn parse_price(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(0.0);
    }
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_season(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(DEFAULT_SEASON);
    }
    raw.parse::<i32>().ok()
}

fn non_empty_or(values: Vec<f64>, fallback: Vec<f64>) -> Vec<f64> {
    if values.is_empty() { fallback } else { values }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_list_skips_garbage() {
        assert_eq!(parse_number_list(" 1.5, x ,2.5,,3"), vec![1.5, 2.5, 3.0]);
        assert!(parse_number_list("").is_empty());
        assert!(parse_number_list("NaN").is_empty());
    }

    #[test]
    fn blank_form_gets_browser_defaults() {
        let req = AnalysisForm::default().to_request();
        assert_eq!(req.season, Some(2025));
        assert_eq!(req.ou_lines, Some(vec![1.5, 2.5, 3.5]));
        assert_eq!(req.odds.unwrap().home, Some(0.0));
        assert_eq!(req.cs_groups, Some(vec![(1, 0), (2, 0), (2, 1)]));
        let tg = req.team_goal_lines.unwrap();
        assert_eq!(tg.home, Some(vec![0.5, 1.5]));
    }

    #[test]
    fn posted_fields_map_onto_form() {
        let fields: HashMap<String, String> = [
            ("home", "Arsenal"),
            ("away", "Chelsea"),
            ("odds1", "2.10"),
            ("oddsX", "abc"),
            ("derby", "on"),
            ("mk_0", "1X2"),
            ("mk_4", "BTTS"),
            ("ouLines", "2.5"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let form = AnalysisForm::from_fields(&fields);
        assert!(form.derby);
        assert_eq!(form.markets, vec!["1X2".to_string(), "BTTS".to_string()]);

        let req = form.to_request();
        let odds = req.odds.unwrap();
        assert_eq!(odds.home, Some(2.10));
        assert_eq!(odds.draw, None);
        assert_eq!(req.ou_lines, Some(vec![2.5]));
    }

    #[test]
    fn fixture_row_request_uses_fixture_teams() {
        let fixture = FixtureItem {
            league: Some("Premier League".into()),
            home: Some("Arsenal".into()),
            away: Some("Chelsea".into()),
            ..Default::default()
        };
        let req = request_from_fixture_row(&fixture, "1.9", "", "4.2");
        assert_eq!(req.season, Some(2025));
        assert_eq!(req.home.as_deref(), Some("Arsenal"));
        assert_eq!(req.odds.unwrap().draw, Some(0.0));
        assert_eq!(req.markets.unwrap().len(), 13);
    }
}
