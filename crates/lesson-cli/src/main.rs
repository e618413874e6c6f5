//! `lesson` CLI — run conflict checks, status recomputation and series
//! advancement against a JSON school snapshot.
//!
//! ## Usage
//!
//! ```sh
//! # Classify a placement read from stdin
//! echo '{"date":"2025-01-06","start_time":"16:00:00","end_time":"17:00:00","teacher_id":"t1"}' \
//!   | lesson --state school.json classify
//!
//! # Recompute one session's status and save the snapshot
//! lesson --state school.json --write-state recompute s-101
//!
//! # Move a session to 18:00 (keeping its length) and cascade to neighbors
//! lesson --state school.json --write-state move s-100 --start 18:00
//!
//! # Materialize every series 14 days ahead of a fixed "today"
//! lesson --state school.json --today 2025-01-01 advance-all --lead-days 14
//!
//! # Dry run of a series over a date range
//! lesson --state school.json preview mw-math --from 2025-01-01 --to 2025-01-31
//!
//! # Turn on a soft conflict type for one branch
//! echo '{"mark_teacher_wrong_time":true}' | lesson --state school.json --write-state policy set --branch north
//! ```
//!
//! Logging goes to stderr and is controlled with `RUST_LOG` (default `warn`).

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use lesson_engine::store::{SeriesStore, SessionStore};
use lesson_engine::{
    ClassSession, Clock, Engine, EngineConfig, FixedClock, MemoryStore, PolicyOverride,
    SessionPlacement, Snapshot, WeeklyAvailability,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type CliEngine = Engine<MemoryStore, WeeklyAvailability, FixedClock>;

#[derive(Parser)]
#[command(
    name = "lesson",
    version,
    about = "Class-session conflict detection and series advancement"
)]
struct Cli {
    /// School snapshot JSON: sessions, series, vacations, policies, people and availability
    #[arg(long)]
    state: PathBuf,

    /// Engine configuration JSON (lead window, excluded class types, timezone)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use this date as today instead of the clock (YYYY-MM-DD)
    #[arg(long)]
    today: Option<NaiveDate>,

    /// Save the updated snapshot back to the state file
    #[arg(long)]
    write_state: bool,

    /// Output file (writes to stdout if omitted)
    #[arg(short, long)]
    output: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a placement and decide its status
    Classify {
        /// Placement JSON file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Session to leave out of the overlap search
        #[arg(long)]
        exclude: Option<String>,
    },
    /// Check a placement against vacations, then classify it
    Assess {
        /// Placement JSON file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Session to leave out of the overlap search
        #[arg(long)]
        exclude: Option<String>,
    },
    /// Recompute and persist one session's status
    Recompute { session_id: String },
    /// Move or reassign a session, then recompute it and its neighbors
    Move {
        session_id: String,
        #[arg(long)]
        date: Option<NaiveDate>,
        /// New start time (HH:MM); the length is kept unless --end is given
        #[arg(long, value_parser = parse_time)]
        start: Option<NaiveTime>,
        /// New end time (HH:MM)
        #[arg(long, value_parser = parse_time)]
        end: Option<NaiveTime>,
        #[arg(long)]
        teacher: Option<String>,
        #[arg(long)]
        student: Option<String>,
        #[arg(long)]
        booth: Option<String>,
    },
    /// Cancel sessions and recompute the sessions around them
    Cancel {
        #[arg(required = true)]
        session_ids: Vec<String>,
        /// Who cancelled
        #[arg(long)]
        by: Option<String>,
    },
    /// Reactivate cancelled sessions and recompute them and their neighbors
    Reactivate {
        #[arg(required = true)]
        session_ids: Vec<String>,
    },
    /// Materialize one series up to today + lead days
    Advance {
        series_id: String,
        /// Days ahead of today to generate (defaults to the configured lead window)
        #[arg(long)]
        lead_days: Option<u32>,
    },
    /// Materialize every series up to today + lead days
    AdvanceAll {
        #[arg(long)]
        lead_days: Option<u32>,
    },
    /// Show what advancing a series over a date range would do, without writing
    Preview {
        series_id: String,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
    /// Show or update scheduling policy
    Policy {
        #[command(subcommand)]
        action: PolicyCommand,
    },
}

#[derive(Subcommand)]
enum PolicyCommand {
    /// Print the effective policy for a branch and/or series
    Show {
        #[arg(long)]
        branch: Option<String>,
        /// Series whose override is layered on top (its branch is used if --branch is omitted)
        #[arg(long)]
        series: Option<String>,
    },
    /// Merge a partial policy override JSON into a branch's stored override
    Set {
        #[arg(long)]
        branch: String,
        /// Override JSON file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
    },
}

/// On-disk school file: a store snapshot plus per-person availability.
#[derive(Debug, Default, Serialize, Deserialize)]
struct School {
    #[serde(flatten)]
    snapshot: Snapshot,
    #[serde(default)]
    availability: WeeklyAvailability,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_json(&read_file(path)?)
            .with_context(|| format!("Invalid config: {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let today = match cli.today {
        Some(date) => date,
        None => config.system_clock()?.today(),
    };

    let school: School = serde_json::from_str(&read_file(&cli.state)?)
        .with_context(|| format!("Invalid school snapshot: {}", cli.state.display()))?;
    let engine = Engine::new(
        MemoryStore::from_snapshot(school.snapshot),
        school.availability,
        FixedClock(today),
    )
    .with_config(config);

    let report = run(&engine, cli.command)?;
    write_output(cli.output.as_deref(), &serde_json::to_string_pretty(&report)?)?;

    if cli.write_state {
        save_school(&engine, &cli.state)?;
    }
    Ok(())
}

fn run(engine: &CliEngine, command: Commands) -> Result<serde_json::Value> {
    let value = match command {
        Commands::Classify { input, exclude } => {
            let placement = read_placement(input.as_deref())?;
            let exclude = exclude.or_else(|| placement.session_id.clone());
            let evaluation = engine
                .evaluate(&placement, exclude.as_deref(), None)
                .context("Failed to classify placement")?;
            serde_json::to_value(evaluation)?
        }
        Commands::Assess { input, exclude } => {
            let placement = read_placement(input.as_deref())?;
            let exclude = exclude.or_else(|| placement.session_id.clone());
            let assessment = engine
                .assess_placement(&placement, exclude.as_deref())
                .context("Failed to assess placement")?;
            serde_json::to_value(assessment)?
        }
        Commands::Recompute { session_id } => {
            let status = engine.recompute_and_persist_status(&session_id)?;
            json!({ "session_id": session_id, "status": status })
        }
        Commands::Move {
            session_id,
            date,
            start,
            end,
            teacher,
            student,
            booth,
        } => {
            let mut session = load_session(engine, &session_id)?;
            let old = session.placement();
            reschedule(&mut session, date, start, end)?;
            if let Some(teacher) = teacher {
                session.teacher_id = Some(teacher);
            }
            if let Some(student) = student {
                session.student_id = Some(student);
            }
            if let Some(booth) = booth {
                session.booth_id = Some(booth);
            }
            engine.store().update_session(&session)?;

            let status = engine.recompute_and_persist_status(&session.id)?;
            let neighbors = engine.recompute_neighbors(Some(&old), Some(&session.placement()))?;
            json!({ "session_id": session.id, "status": status, "neighbors": neighbors })
        }
        Commands::Cancel { session_ids, by } => {
            let mut placements = Vec::with_capacity(session_ids.len());
            for id in &session_ids {
                let mut session = load_session(engine, id)?;
                if session.is_cancelled {
                    continue;
                }
                session.is_cancelled = true;
                session.cancelled_at = Some(Utc::now());
                session.cancelled_by = by.clone();
                engine.store().update_session(&session)?;
                placements.push(session.placement());
            }
            let neighbors = engine.recompute_neighbors_for_cancelled(&placements);
            json!({ "cancelled": placements.len(), "neighbors": neighbors })
        }
        Commands::Reactivate { session_ids } => {
            let mut placements = Vec::with_capacity(session_ids.len());
            for id in &session_ids {
                let mut session = load_session(engine, id)?;
                if !session.is_cancelled {
                    continue;
                }
                session.is_cancelled = false;
                session.cancelled_at = None;
                session.cancelled_by = None;
                engine.store().update_session(&session)?;
                placements.push(session.placement());
            }
            let neighbors = engine.recompute_neighbors_for_reactivated(&placements);
            json!({ "reactivated": placements.len(), "neighbors": neighbors })
        }
        Commands::Advance {
            series_id,
            lead_days,
        } => {
            let lead_days = lead_days.unwrap_or(engine.config().default_lead_days);
            serde_json::to_value(engine.advance_series(&series_id, lead_days)?)?
        }
        Commands::AdvanceAll { lead_days } => {
            serde_json::to_value(engine.advance_all_series(lead_days)?)?
        }
        Commands::Preview {
            series_id,
            from,
            to,
        } => {
            let series = engine
                .store()
                .series(&series_id)?
                .with_context(|| format!("Series not found: {}", series_id))?;
            serde_json::to_value(engine.preview_series(&series, from, to)?)?
        }
        Commands::Policy { action } => match action {
            PolicyCommand::Show { branch, series } => {
                let series_override = match series.as_deref() {
                    Some(id) => Some(
                        engine
                            .store()
                            .series(id)?
                            .with_context(|| format!("Series not found: {}", id))?,
                    ),
                    None => None,
                };
                let branch = branch.or_else(|| series_override.as_ref().and_then(|s| s.branch_id.clone()));
                let policy = engine.resolve_effective_policy(
                    branch.as_deref(),
                    series_override.as_ref().and_then(|s| s.policy_override.as_ref()),
                );
                serde_json::to_value(policy)?
            }
            PolicyCommand::Set { branch, input } => {
                let patch: PolicyOverride = serde_json::from_str(&read_input(input.as_deref())?)
                    .context("Invalid policy override JSON")?;
                serde_json::to_value(engine.update_branch_policy(&branch, &patch)?)?
            }
        },
    };
    Ok(value)
}

/// Apply a new date and/or window to `session`. A lone `start` keeps the
/// session's length.
fn reschedule(
    session: &mut ClassSession,
    date: Option<NaiveDate>,
    start: Option<NaiveTime>,
    end: Option<NaiveTime>,
) -> Result<()> {
    if let Some(date) = date {
        session.date = date;
    }
    match (start, end) {
        (Some(start), Some(end)) => {
            session.start_time = start;
            session.end_time = end;
        }
        (Some(start), None) => {
            let length = session.end_time - session.start_time;
            session.start_time = start;
            session.end_time = start + length;
        }
        (None, Some(end)) => session.end_time = end,
        (None, None) => {}
    }
    if session.end_time <= session.start_time {
        bail!(
            "Session {} would end ({}) at or before it starts ({})",
            session.id,
            session.end_time,
            session.start_time
        );
    }
    session.duration_minutes = u32::try_from((session.end_time - session.start_time).num_minutes())
        .context("Session length out of range")?;
    Ok(())
}

fn load_session(engine: &CliEngine, id: &str) -> Result<ClassSession> {
    engine
        .store()
        .session(id)?
        .with_context(|| format!("Session not found: {}", id))
}

fn parse_time(raw: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| format!("expected HH:MM or HH:MM:SS, got '{}'", raw))
}

fn read_placement(path: Option<&str>) -> Result<SessionPlacement> {
    let placement: SessionPlacement =
        serde_json::from_str(&read_input(path)?).context("Invalid placement JSON")?;
    if placement.end_time <= placement.start_time {
        bail!(
            "Placement would end ({}) at or before it starts ({})",
            placement.end_time,
            placement.start_time
        );
    }
    Ok(placement)
}

fn save_school(engine: &CliEngine, path: &Path) -> Result<()> {
    let school = School {
        snapshot: engine.store().snapshot()?,
        availability: engine.oracle().clone(),
    };
    let json = serde_json::to_string_pretty(&school)?;
    std::fs::write(path, json + "\n")
        .with_context(|| format!("Failed to write file: {}", path.display()))?;
    tracing::info!(path = %path.display(), "School snapshot saved");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, format!("{}\n", content))
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
