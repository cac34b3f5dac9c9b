use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use betrun::client::{ApiClient, DEFAULT_BASE_URL, FixtureQuery};
use betrun::form::{AnalysisForm, request_from_fixture_row};
use betrun::markets::SUPPORTED_MARKETS;
use betrun::payload::MatchItem;
use betrun::render;

#[derive(Debug, Parser)]
#[command(name = "betrun-client", about = "Query a betrun server and render the results as HTML")]
struct Cli {
    /// Server base URL.
    #[arg(long, env = "BETRUN_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Write output here instead of stdout.
    #[arg(long, global = true)]
    out: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyse one fixture from typed odds.
    Analyze {
        #[arg(long, default_value = "")]
        league: String,
        #[arg(long, default_value = "")]
        season: String,
        #[arg(long)]
        home: String,
        #[arg(long)]
        away: String,
        #[arg(long = "odds1", default_value = "")]
        odds1: String,
        #[arg(long = "oddsx", default_value = "")]
        odds_x: String,
        #[arg(long = "odds2", default_value = "")]
        odds2: String,
        #[arg(long)]
        derby: bool,
        /// Market to include; repeat for several. Defaults to every market.
        #[arg(long = "market")]
        markets: Vec<String>,
        #[arg(long, default_value = "")]
        ou_lines: String,
        #[arg(long, default_value = "")]
        home_tg: String,
        #[arg(long, default_value = "")]
        away_tg: String,
    },
    /// List fixtures without odds.
    Fixtures {
        #[arg(long)]
        league: Option<u64>,
        #[arg(long)]
        season: Option<i32>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        team: Option<u64>,
    },
    /// List fixtures with bookmaker 1X2 odds.
    Matches {
        #[arg(long)]
        fixture_id: Option<u64>,
        #[arg(long)]
        league_id: Option<u64>,
        #[arg(long)]
        season: Option<i32>,
        #[arg(long)]
        date: Option<String>,
        /// Also analyse every fixture that has odds.
        #[arg(long)]
        analyze: bool,
    },
    Env,
    Health,
    DebugTeam {
        name: String,
    },
    DebugFixtures {
        #[arg(long)]
        team_id: Option<u64>,
        #[arg(long)]
        league: Option<u64>,
        #[arg(long)]
        season: Option<i32>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        last: Option<u32>,
    },
    DebugH2h {
        home_id: u64,
        away_id: u64,
        #[arg(long)]
        last: Option<u32>,
    },
    /// Dump stored picks as JSON.
    Export,
    /// Replace stored picks from an export file.
    Import {
        file: PathBuf,
    },
}

fn run(client: &ApiClient, command: Command) -> Result<String> {
    match command {
        Command::Analyze {
            league,
            season,
            home,
            away,
            odds1,
            odds_x,
            odds2,
            derby,
            markets,
            ou_lines,
            home_tg,
            away_tg,
        } => {
            let markets = if markets.is_empty() {
                SUPPORTED_MARKETS.iter().map(|m| m.to_string()).collect()
            } else {
                markets
            };
            let form = AnalysisForm {
                league,
                season,
                home,
                away,
                odds1,
                odds_x,
                odds2,
                derby,
                markets,
                ou_lines,
                home_tg,
                away_tg,
            };
            let resp = client.analyze(&form.to_request())?;
            Ok(render::render_football(&resp))
        }
        Command::Fixtures {
            league,
            season,
            date,
            team,
        } => {
            let list = client.fixtures(&FixtureQuery {
                league,
                season,
                date,
                team,
                last: None,
            })?;
            let items: Vec<MatchItem> = list
                .items
                .into_iter()
                .map(|fixture| MatchItem {
                    fixture,
                    odds: None,
                })
                .collect();
            Ok(render::render_fixtures(&items))
        }
        Command::Matches {
            fixture_id,
            league_id,
            season,
            date,
            analyze,
        } => {
            if fixture_id.is_none() && league_id.is_none() {
                bail!("pass --fixture-id, or --league-id with --season or --date");
            }
            let list = client.matches(fixture_id, league_id, season, date.as_deref())?;
            let mut html = render::render_fixtures(&list.items);
            if analyze {
                for item in list.items.iter() {
                    let Some(odds) = &item.odds else {
                        continue;
                    };
                    let req = request_from_fixture_row(
                        &item.fixture,
                        &odds.home.to_string(),
                        &odds.draw.to_string(),
                        &odds.away.to_string(),
                    );
                    match client.analyze(&req) {
                        Ok(resp) => html.push_str(&render::render_football(&resp)),
                        Err(err) => html.push_str(&render::render_error(&format!("{err:#}"))),
                    }
                }
            }
            Ok(html)
        }
        Command::Env => Ok(match client.env_status() {
            Ok(status) => render::render_env(&status),
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "env check failed");
                render::render_env_error()
            }
        }),
        Command::Health => Ok(render::escape(client.health()?.trim())),
        Command::DebugTeam { name } => {
            let name = name.trim();
            if name.is_empty() {
                return Ok("<small>Enter a team name…</small>".to_string());
            }
            Ok(render::render_team_candidates(&client.debug_team(name)?))
        }
        Command::DebugFixtures {
            team_id,
            league,
            season,
            date,
            last,
        } => {
            let list = client.debug_fixtures(&FixtureQuery {
                league,
                season,
                date,
                team: team_id,
                last,
            })?;
            let items: Vec<MatchItem> = list
                .items
                .into_iter()
                .map(|fixture| MatchItem {
                    fixture,
                    odds: None,
                })
                .collect();
            Ok(render::render_fixtures(&items))
        }
        Command::DebugH2h {
            home_id,
            away_id,
            last,
        } => {
            let body = client.debug_h2h(home_id, away_id, last)?;
            Ok(serde_json::to_string_pretty(&body)?)
        }
        Command::Export => Ok(serde_json::to_string_pretty(&client.export()?)?),
        Command::Import { file } => {
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("read {}", file.display()))?;
            let data: Value = serde_json::from_str(&raw).context("invalid import json")?;
            let items = data
                .get("items")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            let count = client.import(&items)?;
            Ok(format!("imported {count} picks"))
        }
    }
}

fn emit(out: Option<&PathBuf>, text: &str) -> Result<()> {
    match out {
        Some(path) => fs::write(path, text).with_context(|| format!("write {}", path.display())),
        None => {
            println!("{text}");
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = ApiClient::new(&cli.base_url)?;
    match run(&client, cli.command) {
        Ok(text) => emit(cli.out.as_ref(), &text),
        Err(err) => {
            emit(cli.out.as_ref(), &render::render_error(&format!("{err:#}")))?;
            std::process::exit(1);
        }
    }
}
