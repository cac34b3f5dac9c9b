use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::score_matrix::Selection;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Triple<T> {
    #[serde(rename = "1")]
    pub home: T,
    #[serde(rename = "X")]
    pub draw: T,
    #[serde(rename = "2")]
    pub away: T,
}

impl<T: Copy> Triple<T> {
    pub fn get(&self, sel: Selection) -> T {
        match sel {
            Selection::Home => self.home,
            Selection::Draw => self.draw,
            Selection::Away => self.away,
        }
    }

    pub fn map<U>(&self, f: impl Fn(T) -> U) -> Triple<U> {
        Triple {
            home: f(self.home),
            draw: f(self.draw),
            away: f(self.away),
        }
    }
}

/// Decimal 1X2 prices as sent by a client. Numbers and numeric strings are both accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Odds {
    #[serde(rename = "1", default, deserialize_with = "lenient_f64")]
    pub home: Option<f64>,
    #[serde(rename = "X", default, deserialize_with = "lenient_f64")]
    pub draw: Option<f64>,
    #[serde(rename = "2", default, deserialize_with = "lenient_f64")]
    pub away: Option<f64>,
}

impl Odds {
    pub fn new(home: f64, draw: f64, away: f64) -> Self {
        Self {
            home: Some(home),
            draw: Some(draw),
            away: Some(away),
        }
    }

    pub fn get(&self, sel: Selection) -> Option<f64> {
        match sel {
            Selection::Home => self.home,
            Selection::Draw => self.draw,
            Selection::Away => self.away,
        }
    }

    pub fn price(&self, sel: Selection) -> Option<f64> {
        self.get(sel).filter(|o| o.is_finite() && *o > 0.0)
    }
}

fn lenient_f64<'de, D>(de: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(de)?;
    Ok(raw.as_ref().and_then(number))
}

fn number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn whole_number(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn number_list(v: &Value) -> Option<Vec<f64>> {
    Some(v.as_array()?.iter().filter_map(number).collect())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchContext {
    #[serde(default)]
    pub derby: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamGoalLines {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub away: Option<Vec<f64>>,
}

/// Body of `POST /analyze/football`. Absent fields take engine defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub league: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub away: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub odds: Option<Odds>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<MatchContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markets: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ou_lines: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_goal_lines: Option<TeamGoalLines>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cs_groups: Option<Vec<(u32, u32)>>,
}

impl AnalyzeRequest {
    /// Reads each field on its own; a field of the wrong shape is dropped
    /// without discarding the rest of the body.
    pub fn from_json_map(map: &Map<String, Value>) -> Self {
        let field = |key: &str| map.get(key).filter(|v| !v.is_null());
        let text = |key: &str| field(key).and_then(Value::as_str).map(str::to_string);
        Self {
            league: text("league"),
            season: field("season")
                .and_then(whole_number)
                .and_then(|n| i32::try_from(n).ok()),
            home: text("home"),
            away: text("away"),
            // A key sent as null still counts as sent.
            odds: map.get("odds").map(|v| {
                serde_json::from_value::<Odds>(v.clone()).unwrap_or_default()
            }),
            context: field("context").and_then(Value::as_object).map(|ctx| MatchContext {
                derby: ctx.get("derby").is_some_and(truthy),
            }),
            markets: field("markets").and_then(Value::as_array).map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            }),
            ou_lines: field("ou_lines").and_then(number_list),
            team_goal_lines: field("team_goal_lines")
                .and_then(Value::as_object)
                .map(|tg| TeamGoalLines {
                    home: tg.get("home").and_then(number_list),
                    away: tg.get("away").and_then(number_list),
                }),
            cs_groups: field("cs_groups").and_then(Value::as_array).map(|groups| {
                groups
                    .iter()
                    .filter_map(|pair| match pair.as_array()?.as_slice() {
                        [h, a] => Some((
                            u32::try_from(whole_number(h)?).ok()?,
                            u32::try_from(whole_number(a)?).ok()?,
                        )),
                        _ => None,
                    })
                    .collect()
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PickStatus {
    FinalPick,
    Skipped,
    Omitted,
    Error,
    Other(String),
}

impl PickStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PickStatus::FinalPick => "FINAL_PICK",
            PickStatus::Skipped => "SKIPPED",
            PickStatus::Omitted => "OMITTED",
            PickStatus::Error => "ERROR",
            PickStatus::Other(raw) => raw,
        }
    }
}

impl From<String> for PickStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "FINAL_PICK" => PickStatus::FinalPick,
            "SKIPPED" => PickStatus::Skipped,
            "OMITTED" => PickStatus::Omitted,
            "ERROR" => PickStatus::Error,
            _ => PickStatus::Other(raw),
        }
    }
}

impl From<PickStatus> for String {
    fn from(status: PickStatus) -> Self {
        status.as_str().to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WinnerModeRow {
    pub outcome: String,
    #[serde(rename = "Poisson%")]
    pub poisson_pct: Option<f64>,
    #[serde(rename = "Bayesian%")]
    pub bayesian_pct: Option<f64>,
    #[serde(rename = "DixonColes%")]
    pub dixon_coles_pct: Option<f64>,
    #[serde(rename = "FairOdds")]
    pub fair_odds: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WinnerModeTable {
    pub rows: Vec<WinnerModeRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueModeTable {
    pub implied_percent: Triple<f64>,
    pub true_percent: Triple<f64>,
    pub fair_odds: Triple<Option<f64>>,
    pub edge_percent_points: Triple<f64>,
    pub efficient: bool,
    pub best_edge_sel: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Alignment {
    pub wm_best: Option<String>,
    pub vm_best: Option<String>,
    pub wm_equals_vm: bool,
    pub edge_best_pp: Option<f64>,
    pub remark: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSummary {
    pub parameters_ok: bool,
    pub formula_ok: bool,
    pub ev_sim: Option<f64>,
    pub calibration_note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sport: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub league: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub away: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PickStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agreement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markets: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner_mode_table: Option<WinnerModeTable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_mode_table: Option<ValueModeTable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit: Option<AuditSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning_reasons: Option<Vec<String>>,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOdds {
    #[serde(rename = "1")]
    pub home: f64,
    #[serde(rename = "X")]
    pub draw: f64,
    #[serde(rename = "2")]
    pub away: f64,
    pub bookmaker: Option<String>,
}

impl MatchOdds {
    pub fn overround(&self) -> f64 {
        1.0 / self.home + 1.0 / self.draw + 1.0 / self.away
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureItem {
    pub fixture_id: Option<u64>,
    pub utc: Option<String>,
    pub status: Option<String>,
    pub league_id: Option<u64>,
    pub league: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub season: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round: Option<String>,
    pub home_id: Option<u64>,
    pub home: Option<String>,
    pub away_id: Option<u64>,
    pub away: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchItem {
    #[serde(flatten)]
    pub fixture: FixtureItem,
    #[serde(default)]
    pub odds: Option<MatchOdds>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemList<T> {
    #[serde(default)]
    pub count: usize,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

impl<T> ItemList<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            count: items.len(),
            items,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamCandidate {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub code: Option<String>,
    pub country: Option<String>,
    pub venue: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamSearch {
    pub found: bool,
    pub query: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<TeamCandidate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvStatus {
    #[serde(rename = "APISPORTS_KEY")]
    pub apisports_key: bool,
    #[serde(rename = "APISPORTS_BASE")]
    pub apisports_base: String,
    #[serde(rename = "STRICT_TEAM_MATCH")]
    pub strict_team_match: bool,
    #[serde(rename = "BRAND")]
    pub brand: String,
}
