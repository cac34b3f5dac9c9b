use anyhow::Result;
use serde_json::Value;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

use crate::api_football::FootballSource;

const CLUB_TOKENS: [&str; 11] = [
    "fc", "cf", "sc", "sk", "fk", "ac", "afc", "ud", "cd", "sv", "if",
];

const DOTTED_TOKENS: [&str; 2] = ["s.c.", "f.c."];

const ALIASES: [(&str, &str); 9] = [
    ("man city", "Manchester City"),
    ("man utd", "Manchester United"),
    ("psg", "Paris Saint Germain"),
    ("inter milan", "Inter"),
    ("club brugge", "Club Brugge KV"),
    ("kopenhagen", "FC Copenhagen"),
    ("kobenhavn", "FC Copenhagen"),
    ("eintracht frank", "Eintracht Frankfurt"),
    ("cska moscow", "CSKA Moscow"),
];

/// Lowercase ASCII form with club suffixes and punctuation removed.
pub fn normalize(name: &str) -> String {
    let ascii: String = name
        .trim()
        .to_lowercase()
        .nfkd()
        .filter(char::is_ascii)
        .collect();
    let words: String = ascii
        .split_whitespace()
        .filter(|w| !DOTTED_TOKENS.contains(w))
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect();
    words
        .split_whitespace()
        .filter(|w| !CLUB_TOKENS.contains(w))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn apply_alias(name: &str) -> String {
    let n = normalize(name);
    ALIASES
        .iter()
        .find(|(short, _)| *short == n)
        .map(|(_, full)| full.to_string())
        .unwrap_or_else(|| name.to_string())
}

/// Searches the raw name, then its alias, then its normalized form.
pub fn search_team(source: &dyn FootballSource, name: &str) -> Result<Vec<Value>> {
    let name = name.trim();
    if name.is_empty() {
        return Ok(Vec::new());
    }

    let first = source.search_teams(name);
    if let Ok(found) = &first {
        if !found.is_empty() {
            return first;
        }
    }

    let alias = apply_alias(name);
    let norm = normalize(name);
    let mut tried = vec![name.to_string()];
    for candidate in [alias, norm] {
        if candidate.is_empty() || tried.contains(&candidate) {
            continue;
        }
        if candidate.chars().count() < 3 {
            // The provider rejects searches shorter than three characters.
            continue;
        }
        tried.push(candidate.clone());
        match source.search_teams(&candidate) {
            Ok(found) if !found.is_empty() => return Ok(found),
            Ok(_) => {}
            Err(err) => debug!(query = %candidate, error = %err, "team search fallback failed"),
        }
    }

    first
}

/// Strict filter: keep teams whose normalized name equals the normalized query or its alias.
pub fn exact_matches(query: &str, teams: Vec<Value>) -> Vec<Value> {
    let want = normalize(query);
    let want_alias = normalize(&apply_alias(query));
    teams
        .into_iter()
        .filter(|t| {
            let name = t
                .get("team")
                .and_then(|team| team.get("name"))
                .and_then(Value::as_str)
                .map(normalize)
                .unwrap_or_default();
            !name.is_empty() && (name == want || name == want_alias)
        })
        .collect()
}
