mod seed;

use std::fmt;
use std::str::FromStr;

use anyhow::Context;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use course_core::model::UserId;
use services::{AppServices, Clock, CompletionOutcome, CoursePlayer, LoadStatus};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidUserId { raw: String },
    InvalidDbUrl { raw: String },
    MissingUser { command: &'static str },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidUserId { raw } => write!(f, "invalid --user value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::MissingUser { command } => {
                write!(f, "{command} needs a learner (--user or LEARN_USER_ID)")
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Seed,
    Status,
    Complete,
    Next,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "seed" => Some(Self::Seed),
            "status" => Some(Self::Status),
            "complete" => Some(Self::Complete),
            "next" => Some(Self::Next),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Seed => "seed",
            Self::Status => "status",
            Self::Complete => "complete",
            Self::Next => "next",
        }
    }
}

#[derive(Debug)]
struct Args {
    db_url: String,
    user_id: Option<UserId>,
    field: Option<String>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("LEARN_DB_URL")
            .ok()
            .map_or_else(|| normalize_sqlite_url("sqlite:dev.sqlite3".into()), normalize_sqlite_url);
        let mut user_id = match std::env::var("LEARN_USER_ID") {
            Ok(raw) => Some(parse_user_id(raw)?),
            Err(_) => None,
        };
        let mut field = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--user" => {
                    let value = require_value(args, "--user")?;
                    user_id = Some(parse_user_id(value)?);
                }
                "--field" => {
                    field = Some(require_value(args, "--field")?);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            user_id,
            field,
        })
    }

    fn require_user(&self, command: Command) -> Result<UserId, ArgsError> {
        self.user_id.ok_or(ArgsError::MissingUser {
            command: command.name(),
        })
    }
}

fn parse_user_id(raw: String) -> Result<UserId, ArgsError> {
    UserId::from_str(raw.trim()).map_err(|_| ArgsError::InvalidUserId { raw })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- seed     [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- status   [--db <sqlite_url>] [--user <uuid>] [--field <name>]");
    eprintln!("  cargo run -p app -- complete  --user <uuid> [--db <sqlite_url>] [--field <name>]");
    eprintln!("  cargo run -p app -- next      --user <uuid> [--db <sqlite_url>] [--field <name>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:dev.sqlite3");
    eprintln!("  --field the learner's professional field");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LEARN_DB_URL, LEARN_USER_ID, RUST_LOG");
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
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> anyhow::Result<()> {
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
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("creating {}", path.display()))?;
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

//
// ─── OUTPUT ────────────────────────────────────────────────────────────────────
//

fn print_course(player: &CoursePlayer) {
    let Some(tree) = player.tree() else {
        println!("No course loaded.");
        return;
    };
    let stats = player.stats();
    println!("{} ({})", tree.course().title(), tree.course().field());
    println!(
        "  {}/{} lessons, {}% complete, {} h studied",
        stats.completed_lessons, stats.total_lessons, stats.completion_percentage, stats.hours_studied
    );

    let current = player.current_lesson().map(|l| l.id());
    for node in tree.modules() {
        println!("  {}", node.module().title());
        for lesson in node.lessons() {
            let marker = if Some(lesson.id()) == current { ">" } else { " " };
            let check = if lesson.completed() { "x" } else { " " };
            println!(
                "   {marker}[{check}] {} ({} min)",
                lesson.lesson().title(),
                lesson.lesson().duration_minutes()
            );
        }
    }
}

fn print_current(player: &CoursePlayer) {
    match player.current_lesson() {
        Some(lesson) => println!("Current lesson: {}", lesson.title()),
        None => println!("This course has no lessons yet."),
    }
}

async fn open(player: &CoursePlayer, field: Option<&str>) -> anyhow::Result<bool> {
    match player.open_field(field).await? {
        LoadStatus::Applied => Ok(true),
        LoadStatus::Missing | LoadStatus::Stale => {
            match field {
                Some(field) => println!("No course found for field {field}."),
                None => println!("No course selected. Pass --field or set a professional field."),
            }
            Ok(false)
        }
    }
}

//
// ─── COMMANDS ──────────────────────────────────────────────────────────────────
//

async fn run_seed(app: &AppServices) -> anyhow::Result<()> {
    let report = seed::seed_catalog(app.storage(), chrono::Utc::now()).await?;
    println!(
        "Seeded {} courses, {} modules, {} lessons, {} vocabulary entries.",
        report.courses, report.modules, report.lessons, report.vocabulary
    );
    for entry in app.catalog().list().await? {
        let tenths = entry.total_hours_tenths();
        println!(
            "  [{}] {}: {} lessons, {}.{} h",
            entry.course.field(),
            entry.course.title(),
            entry.lesson_count,
            tenths / 10,
            tenths % 10
        );
    }
    Ok(())
}

async fn run_status(app: &AppServices, args: &Args) -> anyhow::Result<()> {
    let player = app.player(args.user_id);
    if open(&player, args.field.as_deref()).await? {
        print_course(&player);
        let vocabulary = player.vocabulary().await?;
        if !vocabulary.is_empty() {
            println!("  Vocabulary:");
            for entry in vocabulary {
                println!("    {}: {}", entry.term(), entry.definition());
            }
        }
    }

    if let Some(user_id) = args.user_id {
        let stats = app.dashboard().stats(user_id).await?;
        println!(
            "Dashboard: {} points, {} courses completed, {} h studied, {}% overall, {} day streak",
            stats.total_points,
            stats.courses_completed,
            stats.hours_studied,
            stats.overall_progress,
            stats.current_streak
        );
        for activity in stats.recent_activities {
            println!("  {} {} (+{})", activity.created_at.format("%Y-%m-%d"), activity.title, activity.points);
        }
        if !stats.recent_achievements.is_empty() {
            println!("  Achievements:");
            for achievement in stats.recent_achievements {
                println!(
                    "    {} {} (+{})",
                    achievement.earned_at.format("%Y-%m-%d"),
                    achievement.title,
                    achievement.points_earned
                );
            }
        }
        let settings = app.settings().load(user_id).await?;
        println!(
            "  Settings: {} interface, reminders {}, new content alerts {}",
            settings.interface_language,
            if settings.progress_reminders { "on" } else { "off" },
            if settings.new_content_alerts { "on" } else { "off" }
        );
    }
    Ok(())
}

async fn run_complete(app: &AppServices, args: &Args, user_id: UserId) -> anyhow::Result<()> {
    let player = app.player(Some(user_id));
    if !open(&player, args.field.as_deref()).await? {
        return Ok(());
    }
    let lesson = player.current_lesson();
    match player.mark_current_complete().await? {
        CompletionOutcome::Recorded { course_completed } => {
            if let Some(lesson) = lesson {
                println!("Completed: {}", lesson.title());
            }
            if course_completed {
                println!("Course completed!");
            }
        }
        CompletionOutcome::AlreadyCompleted => println!("Every lesson is already complete."),
        CompletionOutcome::Refused => println!("Nothing to complete."),
    }
    print_course(&player);
    Ok(())
}

async fn run_next(app: &AppServices, args: &Args, user_id: UserId) -> anyhow::Result<()> {
    let player = app.player(Some(user_id));
    if !open(&player, args.field.as_deref()).await? {
        return Ok(());
    }
    if player.at_last_lesson() {
        println!("Already at the last lesson.");
    } else {
        player.next().await?;
    }
    print_current(&player);
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let mut argv = std::env::args().skip(1);
    let cmd = match argv.next() {
        None => {
            print_usage();
            return Ok(());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => match Command::from_arg(&first) {
            Some(cmd) => cmd,
            None => {
                print_usage();
                anyhow::bail!("unknown subcommand: {first}");
            }
        },
    };

    let args = Args::parse(&mut argv).inspect_err(|_| print_usage())?;

    prepare_sqlite_file(&args.db_url)?;
    let app = AppServices::new_sqlite(&args.db_url, Clock::system())
        .await
        .with_context(|| format!("opening {}", args.db_url))?;

    match cmd {
        Command::Seed => run_seed(&app).await,
        Command::Status => run_status(&app, &args).await,
        Command::Complete => {
            let user_id = args.require_user(cmd)?;
            run_complete(&app, &args, user_id).await
        }
        Command::Next => {
            let user_id = args.require_user(cmd)?;
            run_next(&app, &args, user_id).await
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    if let Err(err) = run().await {
        eprintln!("{err:#}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &[&str]) -> Result<Args, ArgsError> {
        Args::parse(&mut raw.iter().map(|s| (*s).to_owned()))
    }

    #[test]
    fn parses_flags() {
        let user = UserId::random();
        let args = parse(&["--db", "sqlite::memory:", "--user", &user.to_string(), "--field", "HVAC"])
            .unwrap();
        assert_eq!(args.db_url, "sqlite::memory:");
        assert_eq!(args.user_id, Some(user));
        assert_eq!(args.field.as_deref(), Some("HVAC"));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(parse(&["--user", "nope"]), Err(ArgsError::InvalidUserId { .. })));
        assert!(matches!(parse(&["--db"]), Err(ArgsError::MissingValue { flag: "--db" })));
        assert!(matches!(parse(&["--db", "  "]), Err(ArgsError::InvalidDbUrl { .. })));
        assert!(matches!(parse(&["--verbose"]), Err(ArgsError::UnknownArg(_))));
    }

    #[test]
    fn relative_sqlite_paths_become_absolute() {
        let url = normalize_sqlite_url("sqlite:data/learn.sqlite3".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/learn.sqlite3"));
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
    }

    #[test]
    fn complete_needs_a_learner() {
        let args = Args {
            db_url: "sqlite::memory:".into(),
            user_id: None,
            field: None,
        };
        assert!(matches!(
            args.require_user(Command::Complete),
            Err(ArgsError::MissingUser { command: "complete" })
        ));
    }
}
