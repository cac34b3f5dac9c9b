use serde_json::{Map, Value, json};

use crate::score_matrix::{OutcomeProbs, ScoreMatrix};

pub const SUPPORTED_MARKETS: [&str; 14] = [
    "1X2",
    "Double Chance",
    "Draw No Bet",
    "Over/Under",
    "BTTS",
    "Team Goals",
    "1X2 + O/U",
    "DC + BTTS",
    "Result + BTTS",
    "Correct Score",
    "Correct Score Groups",
    "Clean Sheet",
    "Win to Nil",
    "Winning Margin",
];

#[derive(Debug, Clone, PartialEq)]
pub struct MarketLines {
    pub ou_lines: Vec<f64>,
    pub home_goal_lines: Vec<f64>,
    pub away_goal_lines: Vec<f64>,
    pub cs_groups: Vec<(u32, u32)>,
}

impl Default for MarketLines {
    fn default() -> Self {
        Self {
            ou_lines: vec![1.5, 2.5, 3.5],
            home_goal_lines: vec![0.5, 1.5],
            away_goal_lines: vec![0.5, 1.5],
            cs_groups: vec![(1, 0), (2, 0), (2, 1)],
        }
    }
}

pub fn pct(p: f64, dp: i32) -> f64 {
    round_dp(p * 100.0, dp)
}

pub fn round_dp(v: f64, dp: i32) -> f64 {
    let f = 10f64.powi(dp);
    (v * f).round() / f
}

/// Derives every requested market from the score grid, in `SUPPORTED_MARKETS` order.
/// An empty `wanted` list means all markets.
pub fn derive_markets(
    m: &ScoreMatrix,
    probs: &OutcomeProbs,
    lines: &MarketLines,
    wanted: &[String],
) -> Map<String, Value> {
    let include = |name: &str| wanted.is_empty() || wanted.iter().any(|w| w == name);
    let mut out = Map::new();

    if include("1X2") {
        out.insert(
            "1X2".into(),
            json!({"1": pct(probs.home, 2), "X": pct(probs.draw, 2), "2": pct(probs.away, 2)}),
        );
    }
    if include("Double Chance") {
        out.insert(
            "Double Chance".into(),
            json!({
                "1X": pct(probs.home + probs.draw, 2),
                "12": pct(probs.home + probs.away, 2),
                "X2": pct(probs.draw + probs.away, 2),
            }),
        );
    }
    if include("Draw No Bet") {
        let (home, away) = draw_no_bet(probs);
        out.insert(
            "Draw No Bet".into(),
            json!({"Home": pct(home, 2), "Away": pct(away, 2)}),
        );
    }
    if include("Over/Under") {
        let mut ou = Map::new();
        for &line in &lines.ou_lines {
            let over = m.sum_where(|i, j| (i + j) as f64 > line);
            let under = m.sum_where(|i, j| (i + j) as f64 <= line);
            ou.insert(format!("O{line}"), json!(pct(over, 2)));
            ou.insert(format!("U{line}"), json!(pct(under, 2)));
        }
        out.insert("Over/Under".into(), Value::Object(ou));
    }
    if include("BTTS") {
        let yes = m.sum_where(|i, j| i > 0 && j > 0);
        let no = m.sum_where(|i, j| i == 0 || j == 0);
        out.insert("BTTS".into(), json!({"Yes": pct(yes, 2), "No": pct(no, 2)}));
    }
    if include("Team Goals") {
        let mut home = Map::new();
        for &line in &lines.home_goal_lines {
            home.insert(format!("> {line}"), json!(pct(m.sum_where(|i, _| i as f64 > line), 2)));
        }
        let mut away = Map::new();
        for &line in &lines.away_goal_lines {
            away.insert(format!("> {line}"), json!(pct(m.sum_where(|_, j| j as f64 > line), 2)));
        }
        out.insert("Team Goals".into(), json!({"home": home, "away": away}));
    }
    if include("1X2 + O/U") {
        let mut combos = Map::new();
        for &line in &lines.ou_lines {
            let over = |i: usize, j: usize| (i + j) as f64 > line;
            let entries: [(&str, fn(usize, usize) -> bool); 3] =
                [("1", |i, j| i > j), ("X", |i, j| i == j), ("2", |i, j| i < j)];
            for (label, result) in entries {
                combos.insert(
                    format!("{label} & O{line}"),
                    json!(pct(m.sum_where(|i, j| result(i, j) && over(i, j)), 2)),
                );
                combos.insert(
                    format!("{label} & U{line}"),
                    json!(pct(m.sum_where(|i, j| result(i, j) && !over(i, j)), 2)),
                );
            }
        }
        out.insert("1X2 + O/U".into(), Value::Object(combos));
    }
    if include("DC + BTTS") {
        let gg = |i: usize, j: usize| i > 0 && j > 0;
        out.insert(
            "DC + BTTS".into(),
            json!({
                "1X & GG": pct(m.sum_where(|i, j| i >= j && gg(i, j)), 2),
                "X2 & GG": pct(m.sum_where(|i, j| j >= i && gg(i, j)), 2),
                "12 & GG": pct(m.sum_where(|i, j| i != j && gg(i, j)), 2),
            }),
        );
    }
    if include("Result + BTTS") {
        let gg = |i: usize, j: usize| i > 0 && j > 0;
        out.insert(
            "Result + BTTS".into(),
            json!({
                "1 & GG": pct(m.sum_where(|i, j| i > j && gg(i, j)), 2),
                "X & GG": pct(m.sum_where(|i, j| i == j && gg(i, j)), 2),
                "2 & GG": pct(m.sum_where(|i, j| i < j && gg(i, j)), 2),
            }),
        );
    }
    if include("Correct Score") {
        let mut cs = Map::new();
        for &(a, b) in &lines.cs_groups {
            cs.insert(format!("{a}:{b}"), json!(pct(m.prob(a as usize, b as usize), 4)));
        }
        out.insert("Correct Score".into(), Value::Object(cs));
    }
    if include("Correct Score Groups") && !lines.cs_groups.is_empty() {
        let label = lines
            .cs_groups
            .iter()
            .map(|(a, b)| format!("{a}:{b}"))
            .collect::<Vec<_>>()
            .join("/");
        let total: f64 = lines
            .cs_groups
            .iter()
            .map(|&(a, b)| m.prob(a as usize, b as usize))
            .sum();
        let mut groups = Map::new();
        groups.insert(label, json!(pct(total, 4)));
        out.insert("Correct Score Groups".into(), Value::Object(groups));
    }
    if include("Clean Sheet") {
        out.insert(
            "Clean Sheet".into(),
            json!({
                "Home Yes": pct(m.sum_where(|_, j| j == 0), 2),
                "Away Yes": pct(m.sum_where(|i, _| i == 0), 2),
            }),
        );
    }
    if include("Win to Nil") {
        out.insert(
            "Win to Nil".into(),
            json!({
                "Home": pct(m.sum_where(|i, j| i > 0 && j == 0), 2),
                "Away": pct(m.sum_where(|i, j| i == 0 && j > 0), 2),
            }),
        );
    }
    if include("Winning Margin") {
        let mut margins = Map::new();
        for (label, p) in winning_margins(m) {
            margins.insert(label.to_string(), json!(pct(p, 2)));
        }
        out.insert("Winning Margin".into(), Value::Object(margins));
    }

    out
}

fn draw_no_bet(probs: &OutcomeProbs) -> (f64, f64) {
    if probs.draw < 1.0 {
        let rest = 1.0 - probs.draw;
        (probs.home / rest, probs.away / rest)
    } else {
        (0.0, 0.0)
    }
}

fn winning_margins(m: &ScoreMatrix) -> [(&'static str, f64); 6] {
    let diff = |i: usize, j: usize| i as i64 - j as i64;
    [
        ("+1", m.sum_where(|i, j| diff(i, j) == 1)),
        ("+2", m.sum_where(|i, j| diff(i, j) == 2)),
        ("+3+", m.sum_where(|i, j| diff(i, j) >= 3)),
        ("-1", m.sum_where(|i, j| diff(i, j) == -1)),
        ("-2", m.sum_where(|i, j| diff(i, j) == -2)),
        ("-3+", m.sum_where(|i, j| diff(i, j) <= -3)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score_matrix::DEFAULT_MAX_GOALS;

    fn sample() -> Map<String, Value> {
        let m = ScoreMatrix::dixon_coles(1.235, 1.365, DEFAULT_MAX_GOALS, 0.02);
        let probs = m.outcome_probs();
        derive_markets(&m, &probs, &MarketLines::default(), &[])
    }

    fn num(v: &Value, path: &[&str]) -> f64 {
        let mut cur = v;
        for key in path {
            cur = cur.get(*key).unwrap_or(&Value::Null);
        }
        cur.as_f64().unwrap_or(f64::NAN)
    }

    #[test]
    fn all_markets_present_in_order() {
        let markets = sample();
        let keys: Vec<&str> = markets.keys().map(String::as_str).collect();
        assert_eq!(keys, SUPPORTED_MARKETS.to_vec());
    }

    #[test]
    fn complementary_markets_sum_to_hundred() {
        let markets = Value::Object(sample());
        for line in ["1.5", "2.5", "3.5"] {
            let over_key = format!("O{line}");
            let under_key = format!("U{line}");
            let over = num(&markets, &["Over/Under", over_key.as_str()]);
            let under = num(&markets, &["Over/Under", under_key.as_str()]);
            assert!((over + under - 100.0).abs() < 0.02, "line {line}");
        }
        let yes = num(&markets, &["BTTS", "Yes"]);
        let no = num(&markets, &["BTTS", "No"]);
        assert!((yes + no - 100.0).abs() < 0.02);
    }

    #[test]
    fn team_goals_are_nested_per_side() {
        let markets = Value::Object(sample());
        let home_over_half = num(&markets, &["Team Goals", "home", "> 0.5"]);
        let home_over_one_half = num(&markets, &["Team Goals", "home", "> 1.5"]);
        assert!(home_over_half > home_over_one_half);
    }

    #[test]
    fn correct_score_group_sums_members() {
        let markets = Value::Object(sample());
        let cs = markets.get("Correct Score").expect("correct score");
        let members: f64 = ["1:0", "2:0", "2:1"]
            .iter()
            .map(|k| cs.get(*k).and_then(Value::as_f64).unwrap_or(0.0))
            .sum();
        let group = num(&markets, &["Correct Score Groups", "1:0/2:0/2:1"]);
        assert!((group - members).abs() < 0.001);
    }

    #[test]
    fn filter_keeps_only_requested_markets() {
        let m = ScoreMatrix::poisson(1.2, 1.2, DEFAULT_MAX_GOALS);
        let probs = m.outcome_probs();
        let wanted = vec!["BTTS".to_string(), "Nonsense".to_string()];
        let markets = derive_markets(&m, &probs, &MarketLines::default(), &wanted);
        assert_eq!(markets.len(), 1);
        assert!(markets.contains_key("BTTS"));
    }

    #[test]
    fn draw_no_bet_renormalises_without_draw() {
        let probs = OutcomeProbs { home: 0.4, draw: 0.2, away: 0.4 };
        let (h, a) = draw_no_bet(&probs);
        assert!((h - 0.5).abs() < 1e-12);
        assert!((a - 0.5).abs() < 1e-12);
    }
}
