use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::markets::SUPPORTED_MARKETS;
use crate::payload::{AnalysisResponse, EnvStatus, MatchItem, PickStatus, TeamSearch, Triple};

pub fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

pub fn display_value(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => f.to_string(),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

pub fn table_from_rows(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut h = String::from("<table><thead><tr>");
    for header in headers {
        h.push_str(&format!("<th>{}</th>", escape(header)));
    }
    h.push_str("</tr></thead><tbody>");
    for row in rows {
        h.push_str("<tr>");
        for cell in row {
            h.push_str(&format!("<td>{}</td>", escape(cell)));
        }
        h.push_str("</tr>");
    }
    h.push_str("</tbody></table>");
    h
}

pub fn table_from_key_map(title: &str, m: Option<&Map<String, Value>>) -> String {
    let Some(m) = m else {
        return String::new();
    };
    let rows: Vec<Vec<String>> = m
        .iter()
        .map(|(k, v)| vec![k.clone(), display_value(v)])
        .collect();
    format!(
        "<h4>{}</h4>{}",
        escape(title),
        table_from_rows(&["Key", "Value"], &rows)
    )
}

pub fn flatten_if_needed(m: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for (k, v) in m {
        match v {
            Value::Object(inner) => {
                for (kk, vv) in inner {
                    out.insert(format!("{k} {kk}"), vv.clone());
                }
            }
            other => {
                out.insert(k.clone(), other.clone());
            }
        }
    }
    out
}

pub fn status_badge(status: Option<&PickStatus>) -> String {
    let class = match status {
        Some(PickStatus::FinalPick) => "good",
        Some(PickStatus::Omitted) | Some(PickStatus::Skipped) => "warn",
        _ => "bad",
    };
    let label = escape(status.map(PickStatus::as_str).unwrap_or(""));
    format!("<span class=\"badge {class}\">{label}</span>")
}

fn triple_map<T: Serialize>(t: Option<&Triple<T>>) -> Option<Map<String, Value>> {
    match serde_json::to_value(t?) {
        Ok(Value::Object(m)) => Some(m),
        _ => None,
    }
}

fn num_or_dash(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_else(|| "-".to_string())
}

fn text_or_dash(v: Option<&str>) -> String {
    v.filter(|s| !s.is_empty()).unwrap_or("-").to_string()
}

fn yes_no(b: bool) -> String {
    let label = if b { "Yes" } else { "No" };
    label.to_string()
}

fn ok_or_check(ok: bool) -> String {
    let label = if ok { "OK" } else { "Check" };
    label.to_string()
}

pub fn render_football(data: &AnalysisResponse) -> String {
    let mut markets_html = String::new();
    for (name, v) in data.markets.iter().flatten() {
        if let Value::Object(m) = v {
            markets_html.push_str(&table_from_key_map(name, Some(&flatten_if_needed(m))));
        }
    }
    if markets_html.is_empty() {
        markets_html.push_str("<p><small>No markets calculated.</small></p>");
    }

    let agreement = data
        .agreement
        .as_deref()
        .map(|a| {
            format!(
                "<div class=\"pill\"><small>Agreement: <b>{}</b></small></div>",
                escape(a)
            )
        })
        .unwrap_or_default();

    let winner_rows: Vec<Vec<String>> = data
        .winner_mode_table
        .as_ref()
        .map(|t| t.rows.as_slice())
        .unwrap_or_default()
        .iter()
        .map(|r| {
            vec![
                r.outcome.clone(),
                r.poisson_pct.map(|v| v.to_string()).unwrap_or_default(),
                r.bayesian_pct.map(|v| v.to_string()).unwrap_or_default(),
                r.dixon_coles_pct.map(|v| v.to_string()).unwrap_or_default(),
                num_or_dash(r.fair_odds),
                r.notes.clone().unwrap_or_default(),
            ]
        })
        .collect();

    let vm = data.value_mode_table.as_ref();
    let value_mode = format!(
        "{}{}{}{}<p><small>Best Edge: {}</small></p>",
        table_from_key_map("Implied %", triple_map(vm.map(|t| &t.implied_percent)).as_ref()),
        table_from_key_map("True %", triple_map(vm.map(|t| &t.true_percent)).as_ref()),
        table_from_key_map("Fair Odds", triple_map(vm.map(|t| &t.fair_odds)).as_ref()),
        table_from_key_map(
            "Edge (pp)",
            triple_map(vm.map(|t| &t.edge_percent_points)).as_ref()
        ),
        escape(&text_or_dash(vm.and_then(|t| t.best_edge_sel.as_deref()))),
    );

    let al = data.alignment.as_ref();
    let alignment = table_from_rows(
        &["WM Best", "VM Best", "WM=VM", "Edge (best, pp)", "Remark"],
        &[vec![
            text_or_dash(al.and_then(|a| a.wm_best.as_deref())),
            text_or_dash(al.and_then(|a| a.vm_best.as_deref())),
            yes_no(al.is_some_and(|a| a.wm_equals_vm)),
            num_or_dash(al.and_then(|a| a.edge_best_pp)),
            text_or_dash(al.and_then(|a| a.remark.as_deref())),
        ]],
    );

    let au = data.audit.as_ref();
    let audit = table_from_rows(
        &["Parameters", "Formula", "EV Sim", "Calibration"],
        &[vec![
            ok_or_check(au.is_some_and(|a| a.parameters_ok)),
            ok_or_check(au.is_some_and(|a| a.formula_ok)),
            num_or_dash(au.and_then(|a| a.ev_sim)),
            text_or_dash(au.and_then(|a| a.calibration_note.as_deref())),
        ]],
    );

    let warnings: String = data
        .warnings
        .iter()
        .flatten()
        .map(|w| format!("<p><small class=\"warn\">{}</small></p>", escape(w)))
        .collect();

    format!(
        r#"<div class="card">
  <h3>{league} - {home} vs {away} {badge}</h3>
  {agreement}{warnings}
  <div class="grid g-2">
    <div><h4>Winner Mode</h4>{winner}</div>
    <div><h4>Value Mode</h4>{value_mode}</div>
  </div>
  <div class="grid g-2">
    <div><h4>Alignment</h4>{alignment}</div>
    <div><h4>Audit</h4>{audit}</div>
  </div>
  <h4>Markets</h4>
  {markets}
  <p><small>Sources: {sources}</small></p>
</div>"#,
        league = escape(data.league.as_deref().unwrap_or("")),
        home = escape(data.home.as_deref().unwrap_or("")),
        away = escape(data.away.as_deref().unwrap_or("")),
        badge = status_badge(data.status.as_ref()),
        winner = table_from_rows(
            &["Outcome", "Poisson%", "Bayesian%", "DixonColes%", "FairOdds", "Notes"],
            &winner_rows
        ),
        markets = markets_html,
        sources = escape(&data.sources.join(" • ")),
    )
}

pub fn format_utc(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

pub fn render_fixtures(items: &[MatchItem]) -> String {
    if items.is_empty() {
        return "<small>No fixtures returned.</small>".to_string();
    }
    let rows: Vec<Vec<String>> = items
        .iter()
        .map(|it| {
            let f = &it.fixture;
            let when = f.utc.as_deref().map(format_utc).unwrap_or_else(|| "-".into());
            let odds = it
                .odds
                .as_ref()
                .map(|o| match o.bookmaker.as_deref() {
                    Some(b) => format!("{} / {} / {} ({b})", o.home, o.draw, o.away),
                    None => format!("{} / {} / {}", o.home, o.draw, o.away),
                })
                .unwrap_or_else(|| "-".into());
            vec![
                f.fixture_id.map(|id| id.to_string()).unwrap_or_default(),
                text_or_dash(f.league.as_deref()),
                when,
                format!(
                    "{} vs {}",
                    f.home.as_deref().unwrap_or(""),
                    f.away.as_deref().unwrap_or("")
                ),
                odds,
            ]
        })
        .collect();
    table_from_rows(&["ID", "League", "UTC", "Match", "1 / X / 2"], &rows)
}

pub fn render_env(status: &EnvStatus) -> String {
    let raw = serde_json::to_string(status).unwrap_or_default();
    format!("<code>{}</code>", escape(&raw))
}

pub fn render_env_error() -> String {
    "<span class=\"badge bad\">Env check failed</span>".to_string()
}

pub fn render_team_candidates(search: &TeamSearch) -> String {
    if !search.found {
        return "<small>Not found.</small>".to_string();
    }
    let rows: Vec<Vec<String>> = search
        .candidates
        .iter()
        .map(|c| {
            vec![
                c.id.map(|id| id.to_string()).unwrap_or_default(),
                c.name.clone().unwrap_or_default(),
                text_or_dash(c.code.as_deref()),
                text_or_dash(c.country.as_deref()),
                text_or_dash(c.venue.as_deref()),
            ]
        })
        .collect();
    table_from_rows(&["ID", "Name", "Code", "Country", "Venue"], &rows)
}

pub fn render_error(message: &str) -> String {
    format!("<small class=\"badge bad\">Error: {}</small>", escape(message))
}

const PAGE_CSS: &str = r#"
body{font-family:system-ui,sans-serif;margin:24px;background:#0f1115;color:#e6e6e6}
.card{background:#171a21;border-radius:8px;padding:16px;margin:12px 0}
.grid{display:grid;gap:12px}.g-2{grid-template-columns:1fr 1fr}
table{border-collapse:collapse;width:100%;margin:4px 0}
th,td{border-bottom:1px solid #2a2f3a;padding:4px 8px;text-align:left}
.badge{padding:2px 8px;border-radius:10px;font-size:12px}
.good{background:#1f6f43}.warn{background:#8a6d1f}.bad{background:#8a2a2a}
.pill{display:inline-block;margin:4px 0}
input{background:#0f1115;color:#e6e6e6;border:1px solid #2a2f3a;padding:4px}
"#;

pub fn render_page(brand: &str, title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>{brand} - {title}</title>
<style>{css}</style>
</head>
<body>
<h2>{brand}</h2>
{body}
</body>
</html>"#,
        brand = escape(brand),
        title = escape(title),
        css = PAGE_CSS,
    )
}

pub fn render_index_page(brand: &str) -> String {
    let markets: String = SUPPORTED_MARKETS
        .iter()
        .enumerate()
        .map(|(i, name)| {
            format!(
                "<label><input type=\"checkbox\" name=\"mk_{i}\" value=\"{v}\" checked> {v}</label> ",
                v = escape(name)
            )
        })
        .collect();
    let body = format!(
        r#"<form class="card" method="post" action="/report">
  <div class="grid g-2">
    <label>League <input name="league" placeholder="Premier League"></label>
    <label>Season <input name="season" placeholder="2025"></label>
    <label>Home <input name="home"></label>
    <label>Away <input name="away"></label>
    <label>1 <input name="odds1" placeholder="1.90"></label>
    <label>X <input name="oddsX" placeholder="3.20"></label>
    <label>2 <input name="odds2" placeholder="3.50"></label>
    <label><input type="checkbox" name="derby"> Derby</label>
    <label>O/U lines <input name="ouLines" value="1.5,2.5,3.5"></label>
    <label>Home team goals <input name="homeTG" value="0.5,1.5"></label>
    <label>Away team goals <input name="awayTG" value="0.5,1.5"></label>
  </div>
  <p>{markets}</p>
  <button type="submit">Analyze</button>
</form>
<p><small><a href="/env_status">env</a> | <a href="/healthz">health</a> | <a href="/export">export</a></small></p>"#
    );
    render_page(brand, "Football analysis", &body)
}
