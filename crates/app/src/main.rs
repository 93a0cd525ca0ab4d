use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use plans_core::model::{DayNumber, PlanId};
use services::{
    AppServices, CatalogConfig, CatalogSource, CatalogStatus, Clock, HttpCatalogSource,
    StaticCatalogSource,
};
use tracing_subscriber::EnvFilter;

const DB_URL_ENV: &str = "PLANS_DB_URL";
const DEFAULT_DB_URL: &str = "sqlite://plans.sqlite3";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArg { name: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidPlanId { raw: String },
    InvalidDay { raw: String },
    InvalidTimestamp { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArg { name } => write!(f, "missing <{name}>"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidPlanId { raw } => write!(f, "invalid plan id: {raw:?}"),
            ArgsError::InvalidDay { raw } => write!(f, "invalid day number: {raw}"),
            ArgsError::InvalidTimestamp { raw } => {
                write!(f, "invalid --at value (expected RFC 3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  plans [options] plans");
    eprintln!("  plans [options] status <plan-id>");
    eprintln!("  plans [options] mark   <plan-id> <day> [--at <rfc3339>]");
    eprintln!("  plans [options] unmark <plan-id> <day>");
    eprintln!("  plans [options] toggle <plan-id> <day>");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>        (default {DEFAULT_DB_URL})");
    eprintln!("  --catalog-url <url>      fetch plans from an HTTP endpoint");
    eprintln!("  --catalog-file <path>    read plans from a JSON file");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  {DB_URL_ENV}, {}, LOG_FORMAT, RUST_LOG", services::config::CATALOG_URL_ENV);
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Plans,
    Status {
        plan_id: PlanId,
    },
    Mark {
        plan_id: PlanId,
        day: DayNumber,
        at: Option<DateTime<Utc>>,
    },
    Unmark {
        plan_id: PlanId,
        day: DayNumber,
    },
    Toggle {
        plan_id: PlanId,
        day: DayNumber,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CatalogArg {
    Url(String),
    File(PathBuf),
}

#[derive(Debug)]
struct Args {
    db_url: String,
    catalog: Option<CatalogArg>,
    command: Command,
}

impl Args {
    /// Parses flags anywhere on the line; the first bare word picks the command.
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Option<Self>, ArgsError> {
        let mut db_url = std::env::var(DB_URL_ENV)
            .ok()
            .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url);
        let mut catalog = None;
        let mut at = None;
        let mut positional = Vec::new();

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--catalog-url" => {
                    catalog = Some(CatalogArg::Url(require_value(&mut args, "--catalog-url")?));
                }
                "--catalog-file" => {
                    let value = require_value(&mut args, "--catalog-file")?;
                    catalog = Some(CatalogArg::File(PathBuf::from(value)));
                }
                "--at" => {
                    let value = require_value(&mut args, "--at")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidTimestamp { raw: value.clone() })?;
                    at = Some(parsed.with_timezone(&Utc));
                }
                "--help" | "-h" => return Ok(None),
                flag if flag.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positional.push(arg),
            }
        }

        let mut positional = positional.into_iter();
        let command = match positional.next().as_deref() {
            None => return Ok(None),
            Some("plans") => Command::Plans,
            Some("status") => Command::Status {
                plan_id: parse_plan_id(positional.next())?,
            },
            Some("mark") => Command::Mark {
                plan_id: parse_plan_id(positional.next())?,
                day: parse_day(positional.next())?,
                at,
            },
            Some("unmark") => Command::Unmark {
                plan_id: parse_plan_id(positional.next())?,
                day: parse_day(positional.next())?,
            },
            Some("toggle") => Command::Toggle {
                plan_id: parse_plan_id(positional.next())?,
                day: parse_day(positional.next())?,
            },
            Some(other) => return Err(ArgsError::UnknownArg(other.to_string())),
        };
        if let Some(extra) = positional.next() {
            return Err(ArgsError::UnknownArg(extra));
        }

        Ok(Some(Self {
            db_url,
            catalog,
            command,
        }))
    }
}

fn parse_plan_id(raw: Option<String>) -> Result<PlanId, ArgsError> {
    let raw = raw.ok_or(ArgsError::MissingArg { name: "plan-id" })?;
    PlanId::new(raw.clone()).map_err(|_| ArgsError::InvalidPlanId { raw })
}

fn parse_day(raw: Option<String>) -> Result<DayNumber, ArgsError> {
    let raw = raw.ok_or(ArgsError::MissingArg { name: "day" })?;
    raw.parse::<DayNumber>()
        .map_err(|_| ArgsError::InvalidDay { raw })
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

/// Picks the catalog source: flags first, then the environment.
fn catalog_source(arg: Option<CatalogArg>) -> Result<Arc<dyn CatalogSource>, Box<dyn std::error::Error>> {
    let source: Arc<dyn CatalogSource> = match arg {
        Some(CatalogArg::File(path)) => Arc::new(StaticCatalogSource::from_file(&path)?),
        Some(CatalogArg::Url(raw)) => Arc::new(HttpCatalogSource::new(CatalogConfig::new(&raw)?)),
        None => match CatalogConfig::from_env()? {
            Some(config) => Arc::new(HttpCatalogSource::new(config)),
            None => {
                tracing::warn!("no catalog configured; plan lookups will be empty");
                Arc::new(StaticCatalogSource::default())
            }
        },
    };
    Ok(source)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }
}

fn print_status(services: &AppServices, plan_id: &PlanId) {
    let snapshot = services.progress().plan_snapshot(plan_id);
    let title = services
        .catalog()
        .with_plan(plan_id, |plan| plan.map(|p| p.title().to_string()));

    println!("{}{}", plan_id, title.map(|t| format!(" ({t})")).unwrap_or_default());
    match snapshot.total_days {
        Some(total) => println!(
            "  completed {}/{} days ({}%)",
            snapshot.completed_days, total, snapshot.completion
        ),
        None => println!("  completed {} days (plan not in catalog)", snapshot.completed_days),
    }
    println!("  streak    {}", snapshot.streak);
    if let Some(next) = snapshot.next_unread_day {
        println!("  next day  {next}");
    }
    if let Some(last) = snapshot.last_read_date {
        println!("  last read {}", last.to_rfc3339());
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let Some(parsed) = Args::parse(std::env::args().skip(1)).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?
    else {
        print_usage();
        return Ok(());
    };

    // Open + migrate SQLite in the binary glue so the library crates stay storage-agnostic.
    prepare_sqlite_file(&parsed.db_url)?;
    let source = catalog_source(parsed.catalog)?;
    let mut services = AppServices::new_sqlite(&parsed.db_url, Clock::default(), source).await?;

    if !services.refresh_catalog().await {
        if let Some(reason) = services.catalog().failure() {
            eprintln!("catalog unavailable: {reason}");
        }
    }

    match parsed.command {
        Command::Plans => {
            if services.catalog().status() == CatalogStatus::Unavailable {
                return Ok(());
            }
            for plan in services.catalog().plans() {
                let completion = services.progress().calculate_completion(plan.id());
                println!(
                    "{:<28} {:>3} days {:>3}%  {}",
                    plan.id(),
                    plan.day_count(),
                    completion,
                    plan.title()
                );
            }
        }
        Command::Status { plan_id } => print_status(&services, &plan_id),
        Command::Mark { plan_id, day, at } => {
            services
                .progress_mut()
                .mark_day_complete(&plan_id, day, at)
                .await?;
            print_status(&services, &plan_id);
        }
        Command::Unmark { plan_id, day } => {
            services
                .progress_mut()
                .unmark_day_complete(&plan_id, day)
                .await;
            print_status(&services, &plan_id);
        }
        Command::Toggle { plan_id, day } => {
            let completed = services
                .progress_mut()
                .toggle_day_complete(&plan_id, day)
                .await?;
            println!("day {day} {}", if completed { "marked" } else { "unmarked" });
            print_status(&services, &plan_id);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
