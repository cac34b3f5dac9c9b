use crate::markets::{pct, round_dp};
use crate::payload::{Odds, Triple, ValueModeTable};
use crate::score_matrix::{OutcomeProbs, Selection};

const EFFICIENT_EDGE: f64 = 0.03;
const MISSING_EDGE: f64 = -1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ValueMode {
    pub implied: Triple<f64>,
    pub true_prob: Triple<f64>,
    pub fair_odds: Triple<Option<f64>>,
    pub edge: Triple<f64>,
    pub efficient: bool,
    pub best: Option<Selection>,
}

impl ValueMode {
    pub fn best_edge(&self) -> f64 {
        self.best.map(|sel| self.edge.get(sel)).unwrap_or(0.0)
    }

    pub fn to_table(&self) -> ValueModeTable {
        ValueModeTable {
            implied_percent: self.implied.map(|p| pct(p, 2)),
            true_percent: self.true_prob.map(|p| pct(p, 2)),
            fair_odds: self.fair_odds.map(|o| o.map(|v| round_dp(v, 3))),
            edge_percent_points: self.edge.map(|e| pct(e, 2)),
            efficient: self.efficient,
            best_edge_sel: self.best.map(|s| s.code().to_string()),
        }
    }
}

/// Implied probabilities are raw `1/odds`, no overround removal.
pub fn compute_value_mode(odds: &Odds, model: &OutcomeProbs) -> ValueMode {
    let mut implied = Triple::<f64>::default();
    let mut fair_odds = Triple::<Option<f64>>::default();
    let mut edge = Triple::<f64>::default();
    let mut best: Option<Selection> = None;
    let mut best_edge = MISSING_EDGE;

    for sel in Selection::ALL {
        let p = model.get(sel);
        let (imp, fair, e) = match odds.price(sel) {
            Some(o) => {
                let imp = 1.0 / o;
                (imp, Some(1.0 / p.max(1e-9)), p - imp)
            }
            None => (0.0, None, MISSING_EDGE),
        };
        if e > best_edge {
            best_edge = e;
            best = Some(sel);
        }
        set(&mut implied, sel, imp);
        set(&mut fair_odds, sel, fair);
        set(&mut edge, sel, e);
    }

    ValueMode {
        implied,
        true_prob: Triple {
            home: model.home,
            draw: model.draw,
            away: model.away,
        },
        fair_odds,
        edge,
        efficient: best_edge < EFFICIENT_EDGE,
        best,
    }
}

fn set<T>(t: &mut Triple<T>, sel: Selection, v: T) {
    match sel {
        Selection::Home => t.home = v,
        Selection::Draw => t.draw = v,
        Selection::Away => t.away = v,
    }
}
