use anyhow::{Result, bail};

use crate::audit::{ev_simulation, formula_integrity, parameter_integrity};
use crate::markets::{MarketLines, derive_markets, pct, round_dp};
use crate::payload::{
    Alignment, AnalysisResponse, AnalyzeRequest, AuditSummary, Odds, PickStatus, WinnerModeRow,
    WinnerModeTable,
};
use crate::score_matrix::{DEFAULT_MAX_GOALS, OutcomeProbs, ScoreMatrix, Selection};
use crate::value_mode::compute_value_mode;

pub const SITE: &str = "Betrun";
pub const DEFAULT_SEASON: i32 = 2025;

const MIN_EDGE: f64 = 0.05;
const MIN_LAMBDA: f64 = 0.20;
const HOME_SHARE: f64 = 0.95;
const AWAY_SHARE: f64 = 1.05;
const DERBY_BOOST: f64 = 1.03;
const RHO_DEFAULT: f64 = 0.02;
const RHO_DERBY: f64 = 0.05;
// Weight of the de-vigged market in the Bayesian column.
const MARKET_PRIOR_WEIGHT: f64 = 0.25;

const SKIP_REASON: &str = "Edge < 5% (no value)";
const PICK_REMARK: &str = "Final Pick (Edge ≥ 5%)";

#[derive(Debug, Clone, Copy)]
pub struct EngineParams {
    pub league_avg_goals: f64,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            league_avg_goals: crate::config::DEFAULT_LEAGUE_AVG_GOALS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchPriors {
    pub lambda_home: f64,
    pub lambda_away: f64,
    pub rho: f64,
}

pub fn match_priors(params: &EngineParams, derby: bool) -> MatchPriors {
    let half = params.league_avg_goals / 2.0;
    let mut lambda_home = half * HOME_SHARE;
    let mut lambda_away = half * AWAY_SHARE;
    if derby {
        lambda_home *= DERBY_BOOST;
        lambda_away *= DERBY_BOOST;
    }
    MatchPriors {
        lambda_home: lambda_home.max(MIN_LAMBDA),
        lambda_away: lambda_away.max(MIN_LAMBDA),
        rho: if derby { RHO_DERBY } else { RHO_DEFAULT },
    }
}

/// Prices a fixture and decides whether it is a pick.
pub fn analyze(req: &AnalyzeRequest, params: &EngineParams) -> Result<AnalysisResponse> {
    let league = req.league.clone().unwrap_or_default();
    let home = req.home.clone().unwrap_or_else(|| "Home".to_string());
    let away = req.away.clone().unwrap_or_else(|| "Away".to_string());
    let odds = req.odds.unwrap_or_default();
    let derby = req.context.as_ref().is_some_and(|c| c.derby);
    let lines = market_lines(req)?;

    let priors = match_priors(params, derby);
    let independent = ScoreMatrix::poisson(priors.lambda_home, priors.lambda_away, DEFAULT_MAX_GOALS);
    let grid = ScoreMatrix::dixon_coles(
        priors.lambda_home,
        priors.lambda_away,
        DEFAULT_MAX_GOALS,
        priors.rho,
    );
    let poisson = independent.outcome_probs();
    let model = grid.outcome_probs();
    let bayesian = market_shrunk(&model, &odds);

    let vm = compute_value_mode(&odds, &model);
    let wm_best = model.best();
    let best_edge = vm.best_edge();

    let vm_best = match vm.best {
        Some(sel) if best_edge >= MIN_EDGE => sel,
        _ => {
            return Ok(AnalysisResponse {
                site: Some(SITE.to_string()),
                sport: Some("football".to_string()),
                league: Some(league),
                home: Some(home),
                away: Some(away),
                status: Some(PickStatus::Skipped),
                reason: Some(SKIP_REASON.to_string()),
                sources: vec!["Model: priors".to_string()],
                ..Default::default()
            });
        }
    };

    let (warnings, warning_reasons) = underdog_warnings(vm_best, &odds);
    let wanted = req.markets.clone().unwrap_or_default();
    let markets = derive_markets(&grid, &model, &lines, &wanted);
    let ev = ev_simulation(model.get(vm_best), odds.get(vm_best));
    let wm_equals_vm = wm_best == vm_best;

    Ok(AnalysisResponse {
        site: Some(SITE.to_string()),
        sport: Some("football".to_string()),
        league: Some(league),
        home: Some(home),
        away: Some(away),
        status: Some(PickStatus::FinalPick),
        remark: Some(PICK_REMARK.to_string()),
        agreement: Some(if wm_equals_vm { "ALIGNED" } else { "DIVERGED" }.to_string()),
        markets: Some(markets),
        winner_mode_table: Some(winner_mode_table(&poisson, &bayesian, &model, &priors)),
        value_mode_table: Some(vm.to_table()),
        alignment: Some(Alignment {
            wm_best: Some(wm_best.code().to_string()),
            vm_best: Some(vm_best.code().to_string()),
            wm_equals_vm,
            edge_best_pp: Some(pct(best_edge, 2)),
            remark: Some(PICK_REMARK.to_string()),
        }),
        audit: Some(AuditSummary {
            parameters_ok: parameter_integrity(req),
            formula_ok: formula_integrity(),
            ev_sim: Some(round_dp(ev, 4)),
            calibration_note: Some(format!("priors; DC rho={:.2}", priors.rho)),
        }),
        warnings: Some(warnings),
        warning_reasons: Some(warning_reasons),
        sources: vec!["API-FOOTBALL: fixtures+odds (Bet365) when available".to_string()],
        ..Default::default()
    })
}

fn market_lines(req: &AnalyzeRequest) -> Result<MarketLines> {
    let defaults = MarketLines::default();
    let goal_lines = req.team_goal_lines.clone().unwrap_or_default();
    let lines = MarketLines {
        ou_lines: req.ou_lines.clone().unwrap_or(defaults.ou_lines),
        home_goal_lines: goal_lines.home.unwrap_or(defaults.home_goal_lines),
        away_goal_lines: goal_lines.away.unwrap_or(defaults.away_goal_lines),
        cs_groups: req.cs_groups.clone().unwrap_or(defaults.cs_groups),
    };

    let all = lines
        .ou_lines
        .iter()
        .chain(&lines.home_goal_lines)
        .chain(&lines.away_goal_lines);
    for &line in all {
        if !line.is_finite() || line < 0.0 {
            bail!("invalid goal line {line}");
        }
    }
    Ok(lines)
}

fn winner_mode_table(
    poisson: &OutcomeProbs,
    bayesian: &OutcomeProbs,
    dc: &OutcomeProbs,
    priors: &MatchPriors,
) -> WinnerModeTable {
    let notes = |sel: Selection| match sel {
        Selection::Home => format!(
            "λ {:.2}-{:.2}; base priors",
            priors.lambda_home, priors.lambda_away
        ),
        Selection::Draw => "DC low-score effect".to_string(),
        Selection::Away => "Away adjusted for context".to_string(),
    };
    let rows = Selection::ALL
        .iter()
        .map(|&sel| {
            let p = dc.get(sel);
            WinnerModeRow {
                outcome: sel.code().to_string(),
                poisson_pct: Some(pct(poisson.get(sel), 2)),
                bayesian_pct: Some(pct(bayesian.get(sel), 2)),
                dixon_coles_pct: Some(pct(p, 2)),
                fair_odds: (p > 0.0).then(|| round_dp(1.0 / p, 3)),
                notes: Some(notes(sel)),
            }
        })
        .collect();
    WinnerModeTable { rows }
}

/// Model probabilities pulled toward the overround-free market when all prices are usable.
fn market_shrunk(model: &OutcomeProbs, odds: &Odds) -> OutcomeProbs {
    let (Some(h), Some(d), Some(a)) = (
        odds.price(Selection::Home),
        odds.price(Selection::Draw),
        odds.price(Selection::Away),
    ) else {
        return *model;
    };
    if h <= 1.0 || d <= 1.0 || a <= 1.0 {
        return *model;
    }
    let (ih, id, ia) = (1.0 / h, 1.0 / d, 1.0 / a);
    let sum = ih + id + ia;
    let w = MARKET_PRIOR_WEIGHT;
    OutcomeProbs {
        home: (1.0 - w) * model.home + w * ih / sum,
        draw: (1.0 - w) * model.draw + w * id / sum,
        away: (1.0 - w) * model.away + w * ia / sum,
    }
}

fn underdog_warnings(pick: Selection, odds: &Odds) -> (Vec<String>, Vec<String>) {
    let o1 = odds.home.unwrap_or(0.0);
    let ox = odds.draw.unwrap_or(0.0);
    let o2 = odds.away.unwrap_or(0.0);

    let message = match pick {
        Selection::Home if o1 > ox.max(o2) && o1 > 2.80 => Some("Home has longest price."),
        Selection::Away if o2 > o1.max(ox) && o2 > 2.80 => Some("Away has longest price."),
        Selection::Draw if ox > o1.max(o2) && ox > 3.50 => Some("Draw is longest price."),
        _ => None,
    };

    match message {
        Some(msg) => (
            vec![format!("MODEL_PICK_IS_MARKET_UNDERDOG: {msg}")],
            vec!["MODEL_PICK_IS_MARKET_UNDERDOG".to_string()],
        ),
        None => (Vec::new(), Vec::new()),
    }
}
