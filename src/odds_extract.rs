use std::collections::HashMap;

use serde_json::Value;

use crate::payload::MatchOdds;

pub const PREFERRED_BOOKMAKERS: [&str; 7] = [
    "Bet365",
    "Pinnacle",
    "William Hill",
    "Marathonbet",
    "Unibet",
    "1xBet",
    "Betfair",
];

const MATCH_WINNER_NAMES: [&str; 4] = ["match winner", "1x2", "winner", "fulltime result"];

/// v3 entries wrap blocks in `bookmakers`; some plans return the blocks directly.
pub fn bookmaker_blocks(response: &[Value]) -> Vec<&Value> {
    let nested: Vec<&Value> = response
        .iter()
        .filter_map(|entry| entry.get("bookmakers").and_then(Value::as_array))
        .flatten()
        .collect();
    if nested.is_empty() {
        response.iter().collect()
    } else {
        nested
    }
}

/// Picks 1X2 prices from the preferred bookmaker, else the one with the lowest overround.
pub fn extract_1x2(blocks: &[&Value]) -> Option<MatchOdds> {
    let mut by_bookmaker: HashMap<String, MatchOdds> = HashMap::new();
    // Keep first-seen order so the fallback is deterministic on ties.
    let mut order: Vec<String> = Vec::new();

    for block in blocks {
        let name = block
            .get("bookmaker")
            .and_then(|b| b.get("name"))
            .or_else(|| block.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let Some(bets) = block.get("bets").and_then(Value::as_array) else {
            continue;
        };
        for bet in bets {
            if !is_match_winner(bet) {
                continue;
            }
            let Some(odds) = triplet_from_values(bet.get("values"), &name) else {
                continue;
            };
            if !by_bookmaker.contains_key(&name) {
                order.push(name.clone());
            }
            by_bookmaker.insert(name.clone(), odds);
        }
    }

    for pref in PREFERRED_BOOKMAKERS {
        if let Some(odds) = by_bookmaker.get(pref) {
            return Some(odds.clone());
        }
    }

    let mut best: Option<&MatchOdds> = None;
    for name in &order {
        let Some(candidate) = by_bookmaker.get(name) else {
            continue;
        };
        if best.is_none_or(|b| candidate.overround() < b.overround()) {
            best = Some(candidate);
        }
    }
    best.cloned()
}

fn is_match_winner(bet: &Value) -> bool {
    let name = bet
        .get("name")
        .and_then(Value::as_str)
        .or_else(|| bet.get("label").and_then(Value::as_str))
        .unwrap_or("")
        .trim()
        .to_lowercase();
    MATCH_WINNER_NAMES.contains(&name.as_str())
}

fn triplet_from_values(values: Option<&Value>, bookmaker: &str) -> Option<MatchOdds> {
    let mut home = None;
    let mut draw = None;
    let mut away = None;

    for v in values?.as_array()? {
        let label = v
            .get("value")
            .and_then(Value::as_str)
            .or_else(|| v.get("label").and_then(Value::as_str))
            .unwrap_or("")
            .trim()
            .to_uppercase();
        let Some(price) = v.get("odd").and_then(price_from) else {
            continue;
        };
        match label.as_str() {
            "1" | "HOME" => home = Some(price),
            "X" | "DRAW" => draw = Some(price),
            "2" | "AWAY" => away = Some(price),
            _ => {}
        }
    }

    match (home, draw, away) {
        (Some(home), Some(draw), Some(away)) => Some(MatchOdds {
            home,
            draw,
            away,
            bookmaker: (!bookmaker.is_empty()).then(|| bookmaker.to_string()),
        }),
        _ => None,
    }
}

fn price_from(raw: &Value) -> Option<f64> {
    let p = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (p.is_finite() && p > 0.0).then_some(p)
}
