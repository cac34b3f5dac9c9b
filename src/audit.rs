use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, params};
use serde_json::{Value, json};

use crate::payload::AnalyzeRequest;
use crate::score_matrix::{DEFAULT_MAX_GOALS, ScoreMatrix};

/// The request carried the fields the engine needs to price a pick.
pub fn parameter_integrity(req: &AnalyzeRequest) -> bool {
    req.home.is_some() && req.away.is_some() && req.odds.is_some()
}

pub fn formula_integrity() -> bool {
    let m = ScoreMatrix::dixon_coles(1.3, 1.3, DEFAULT_MAX_GOALS, 0.02);
    let p = m.outcome_probs();
    let sums_to_one = (m.total() - 1.0).abs() < 1e-9;
    let outcomes_to_one = (p.home + p.draw + p.away - 1.0).abs() < 1e-9;
    let symmetric = (p.home - p.away).abs() < 1e-9;
    sums_to_one && outcomes_to_one && symmetric
}

pub fn ev_simulation(prob: f64, odds: Option<f64>) -> f64 {
    match odds {
        Some(o) if prob != 0.0 && o != 0.0 => prob * (o - 1.0) - (1.0 - prob),
        _ => 0.0,
    }
}

/// Persistent log of every analysis result served, in insertion order.
pub struct PickStore {
    conn: Mutex<Connection>,
}

impl PickStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn =
            Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS picks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                stored_at TEXT NOT NULL,
                body TEXT NOT NULL
            );
            "#,
        )
        .context("init picks schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn store(&self, pick: &Value) -> Result<()> {
        let body = serde_json::to_string(pick).context("serialize pick")?;
        let conn = self.conn.lock().expect("pick store lock poisoned");
        conn.execute(
            "INSERT INTO picks (stored_at, body) VALUES (?1, ?2)",
            params![Utc::now().to_rfc3339(), body],
        )
        .context("insert pick")?;
        Ok(())
    }

    pub fn items(&self) -> Result<Vec<Value>> {
        let conn = self.conn.lock().expect("pick store lock poisoned");
        let mut stmt = conn
            .prepare("SELECT body FROM picks ORDER BY id")
            .context("prepare load picks")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .context("query load picks")?;

        let mut out = Vec::new();
        for row in rows {
            let raw = row.context("decode pick row")?;
            // Rows are only written by `store`/`import`, both from valid JSON.
            out.push(serde_json::from_str(&raw).unwrap_or(Value::Null));
        }
        Ok(out)
    }

    pub fn export(&self) -> Result<Value> {
        Ok(json!({ "items": self.items()? }))
    }

    pub fn import(&self, items: &[Value]) -> Result<usize> {
        let mut conn = self.conn.lock().expect("pick store lock poisoned");
        let tx = conn.transaction().context("begin import")?;
        tx.execute("DELETE FROM picks", []).context("clear picks")?;
        let now = Utc::now().to_rfc3339();
        for item in items {
            let body = serde_json::to_string(item).context("serialize pick")?;
            tx.execute(
                "INSERT INTO picks (stored_at, body) VALUES (?1, ?2)",
                params![now, body],
            )
            .context("insert imported pick")?;
        }
        tx.commit().context("commit import")?;
        Ok(items.len())
    }

    pub fn count(&self) -> Result<usize> {
        let conn = self.conn.lock().expect("pick store lock poisoned");
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM picks", [], |row| row.get(0))
            .context("count picks")?;
        Ok(n.max(0) as usize)
    }
}
