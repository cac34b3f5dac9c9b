pub const DEFAULT_MAX_GOALS: usize = 10;

/// Joint probability grid of final scores, indexed `[home_goals][away_goals]`.
#[derive(Debug, Clone)]
pub struct ScoreMatrix {
    size: usize,
    cells: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutcomeProbs {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl OutcomeProbs {
    pub fn get(&self, sel: Selection) -> f64 {
        match sel {
            Selection::Home => self.home,
            Selection::Draw => self.draw,
            Selection::Away => self.away,
        }
    }

    /// Most likely outcome; ties resolve in `1, X, 2` order.
    pub fn best(&self) -> Selection {
        let mut best = Selection::Home;
        for sel in Selection::ALL {
            if self.get(sel) > self.get(best) {
                best = sel;
            }
        }
        best
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selection {
    Home,
    Draw,
    Away,
}

impl Selection {
    pub const ALL: [Selection; 3] = [Selection::Home, Selection::Draw, Selection::Away];

    pub fn code(self) -> &'static str {
        match self {
            Selection::Home => "1",
            Selection::Draw => "X",
            Selection::Away => "2",
        }
    }
}

impl ScoreMatrix {
    pub fn poisson(lambda_home: f64, lambda_away: f64, max_goals: usize) -> Self {
        Self::dixon_coles(lambda_home, lambda_away, max_goals, 0.0)
    }

    /// Poisson grid with the Dixon-Coles low-score correction, renormalised to sum 1.
    pub fn dixon_coles(lambda_home: f64, lambda_away: f64, max_goals: usize, rho: f64) -> Self {
        let size = max_goals + 1;
        let pmf_h = poisson_pmf(lambda_home, max_goals);
        let pmf_a = poisson_pmf(lambda_away, max_goals);

        let mut cells = vec![0.0; size * size];
        for (i, p_i) in pmf_h.iter().enumerate() {
            for (j, p_j) in pmf_a.iter().enumerate() {
                let tau = dc_tau(i, j, lambda_home, lambda_away, rho);
                cells[i * size + j] = p_i * p_j * tau;
            }
        }

        let sum: f64 = cells.iter().sum();
        if sum > 0.0 {
            for c in &mut cells {
                *c /= sum;
            }
        }
        Self { size, cells }
    }

    pub fn max_goals(&self) -> usize {
        self.size - 1
    }

    pub fn prob(&self, home: usize, away: usize) -> f64 {
        if home < self.size && away < self.size {
            self.cells[home * self.size + away]
        } else {
            0.0
        }
    }

    pub fn total(&self) -> f64 {
        self.cells.iter().sum()
    }

    pub fn sum_where(&self, pred: impl Fn(usize, usize) -> bool) -> f64 {
        let mut s = 0.0;
        for i in 0..self.size {
            for j in 0..self.size {
                if pred(i, j) {
                    s += self.cells[i * self.size + j];
                }
            }
        }
        s
    }

    pub fn outcome_probs(&self) -> OutcomeProbs {
        OutcomeProbs {
            home: self.sum_where(|i, j| i > j),
            draw: self.sum_where(|i, j| i == j),
            away: self.sum_where(|i, j| i < j),
        }
    }
}

fn dc_tau(i: usize, j: usize, lambda_home: f64, lambda_away: f64, rho: f64) -> f64 {
    match (i, j) {
        (0, 0) => 1.0 - lambda_home * lambda_away * rho,
        (0, 1) => 1.0 + lambda_home * rho,
        (1, 0) => 1.0 + lambda_away * rho,
        (1, 1) => 1.0 - rho,
        _ => 1.0,
    }
}

fn poisson_pmf(lambda: f64, max_k: usize) -> Vec<f64> {
    let mut out = vec![0.0; max_k + 1];
    let lambda = lambda.max(0.0);

    out[0] = (-lambda).exp();
    for k in 1..=max_k {
        out[k] = out[k - 1] * lambda / k as f64;
    }
    out
}
