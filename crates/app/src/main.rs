use std::fmt;
use std::io::{self, BufRead, Write};

use log::{debug, info};
use quiz_core::model::{CategoryId, QuizLevel, stage_catalog};
use services::{AppServices, Clock, QuizKind, QuizService, QuizSession};
use storage::bank::category_name;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    InvalidCategory { raw: String },
    InvalidLevel { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required for this command"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidCategory { raw } => write!(f, "invalid --category value: {raw}"),
            ArgsError::InvalidLevel { raw } => write!(f, "invalid --level value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
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
    eprintln!("  trivia categories");
    eprintln!("  trivia levels      --category <slug>");
    eprintln!("  trivia stages      --category <slug> --level <level>");
    eprintln!("  trivia play        --category <slug> --stage <level-order>");
    eprintln!("  trivia level-quiz  --category <slug> --level <level>");
    eprintln!("  trivia progress");
    eprintln!("  trivia reset       [--category <slug>]");
    eprintln!();
    eprintln!("Common options:");
    eprintln!("  --db <sqlite_url>  (default sqlite://trivia.sqlite3)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  TRIVIA_DB_URL, TRIVIA_CATEGORY, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Categories,
    Levels,
    Stages,
    Play,
    LevelQuiz,
    Progress,
    Reset,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "categories" => Some(Self::Categories),
            "levels" => Some(Self::Levels),
            "stages" => Some(Self::Stages),
            "play" => Some(Self::Play),
            "level-quiz" => Some(Self::LevelQuiz),
            "progress" => Some(Self::Progress),
            "reset" => Some(Self::Reset),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    category: Option<CategoryId>,
    level: Option<QuizLevel>,
    stage: Option<String>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("TRIVIA_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://trivia.sqlite3".into(), normalize_sqlite_url);
        let mut category = match std::env::var("TRIVIA_CATEGORY") {
            Ok(raw) => Some(parse_category(raw)?),
            Err(_) => None,
        };
        let mut level = None;
        let mut stage = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--category" => {
                    category = Some(parse_category(require_value(args, "--category")?)?);
                }
                "--level" => {
                    let value = require_value(args, "--level")?;
                    let parsed = value
                        .parse::<QuizLevel>()
                        .map_err(|_| ArgsError::InvalidLevel { raw: value.clone() })?;
                    level = Some(parsed);
                }
                "--stage" => {
                    stage = Some(require_value(args, "--stage")?.trim().to_owned());
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
            category,
            level,
            stage,
        })
    }

    fn category(&self) -> Result<&CategoryId, ArgsError> {
        self.category
            .as_ref()
            .ok_or(ArgsError::MissingFlag { flag: "--category" })
    }

    fn level(&self) -> Result<QuizLevel, ArgsError> {
        self.level.ok_or(ArgsError::MissingFlag { flag: "--level" })
    }

    fn stage(&self) -> Result<&str, ArgsError> {
        self.stage
            .as_deref()
            .ok_or(ArgsError::MissingFlag { flag: "--stage" })
    }
}

fn parse_category(raw: String) -> Result<CategoryId, ArgsError> {
    raw.parse::<CategoryId>()
        .map_err(|_| ArgsError::InvalidCategory { raw })
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

//
// ─── COMMANDS ──────────────────────────────────────────────────────────────────
//

fn lock_mark(unlocked: bool) -> &'static str {
    if unlocked { " " } else { "🔒" }
}

fn print_categories(quiz: &QuizService) {
    for category in quiz.categories() {
        let counts: Vec<String> = QuizLevel::ALL
            .into_iter()
            .map(|level| format!("{level}={}", quiz.question_count(&category, level)))
            .collect();
        println!("{category:<10} {}  ({})", category_name(&category), counts.join(", "));
    }
}

async fn print_levels(
    quiz: &QuizService,
    category: &CategoryId,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", category_name(category));
    for status in quiz.level_overview(category).await? {
        println!(
            "{} {:<12} {:<6} {:>3}%  ({} questions)",
            lock_mark(status.unlocked),
            status.level,
            status.level.display_name(),
            status.percentage,
            status.question_count
        );
    }
    Ok(())
}

async fn print_stages(
    quiz: &QuizService,
    category: &CategoryId,
    level: QuizLevel,
) -> Result<(), Box<dyn std::error::Error>> {
    for status in quiz.stage_overview(category, level).await? {
        let done = if status.completed { "✓" } else { " " };
        let coins = status.stage.reward.as_ref().map_or(0, |reward| reward.coins);
        println!(
            "{} {done} {:<16} {:<16} {:>3}%  {coins} coins",
            lock_mark(status.unlocked),
            status.stage.id.to_string(),
            status.stage.title,
            status.percentage
        );
    }
    Ok(())
}

async fn print_progress(quiz: &QuizService) -> Result<(), Box<dyn std::error::Error>> {
    let progress = quiz.progress().await?;
    let total = stage_catalog().len();
    for category in quiz.categories() {
        println!(
            "{category:<10} {}/{total} stages passed",
            progress.passed_stage_count(&category)
        );
    }
    println!("{}", quiz.export_progress().await?);
    Ok(())
}

enum Input {
    Choice(usize),
    Skip,
    Eof,
}

fn read_choice(
    lines: &mut impl Iterator<Item = io::Result<String>>,
    option_count: usize,
) -> io::Result<Input> {
    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next().transpose()? else {
            return Ok(Input::Eof);
        };
        let line = line.trim();
        if line.is_empty() || line.eq_ignore_ascii_case("s") {
            return Ok(Input::Skip);
        }
        match line.parse::<usize>() {
            Ok(choice) if (1..=option_count).contains(&choice) => {
                return Ok(Input::Choice(choice - 1));
            }
            _ => println!("enter a number from 1 to {option_count}, or press enter to skip"),
        }
    }
}

async fn play(
    quiz: &QuizService,
    mut session: QuizSession,
) -> Result<(), Box<dyn std::error::Error>> {
    let clock = quiz.clock();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    while let Some(question) = session.current_question().cloned() {
        println!();
        println!(
            "[{}/{}] {}  ({}s)",
            session.position() + 1,
            session.total(),
            question.text(),
            session.remaining_secs(&clock)
        );
        for (index, option) in question.options().iter().enumerate() {
            println!("  {}. {option}", index + 1);
        }

        let outcome = match read_choice(&mut lines, question.options().len())? {
            Input::Choice(index) => session.answer(index, &clock)?.clone(),
            Input::Skip => session.time_out(&clock)?.clone(),
            Input::Eof => {
                info!("input closed, abandoning quiz");
                println!("quiz abandoned");
                return Ok(());
            }
        };

        if outcome.correct {
            println!("✓ +{} ({}s left)", outcome.points, outcome.remaining_secs);
        } else if outcome.selected.is_none() {
            println!("⏱ time is up: {}", question.correct_answer());
        } else {
            println!("✗ {}", question.correct_answer());
        }
        if let Some(explanation) = question.explanation() {
            println!("  {explanation}");
        }
    }

    let outcome = quiz.finish(&session).await?;
    let result = &outcome.result;
    println!();
    println!(
        "{}/{} correct, {}%, score {}: {}",
        result.correct,
        result.total,
        result.percentage,
        result.score,
        if result.passed { "passed" } else { "not passed" }
    );
    if let Some(reward) = &outcome.reward {
        println!("reward: {} coins", reward.coins);
        if let Some(badge) = &reward.badge {
            println!("badge: {badge}");
        }
    }
    if let Some(stage) = outcome.unlocked_stage {
        println!("unlocked stage {stage}");
    }
    if let Some(level) = outcome.unlocked_level {
        println!("unlocked level {level} ({})", level.display_name());
    }
    if let QuizKind::Stage(stage) = result.kind {
        debug!("finished stage {stage}");
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None | Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            ArgsError::UnknownArg(first.to_string())
        })?,
    };

    let mut iter = argv.into_iter().skip(1);
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup; the libraries never touch the filesystem.
    prepare_sqlite_file(&parsed.db_url)?;
    let services = AppServices::new_sqlite(&parsed.db_url, Clock::system()).await?;
    let quiz = services.quiz();

    match cmd {
        Command::Categories => print_categories(&quiz),
        Command::Levels => print_levels(&quiz, parsed.category()?).await?,
        Command::Stages => print_stages(&quiz, parsed.category()?, parsed.level()?).await?,
        Command::Play => {
            let session = quiz.start_stage(parsed.category()?, parsed.stage()?).await?;
            play(&quiz, session).await?;
        }
        Command::LevelQuiz => {
            let session = quiz
                .start_level_quiz(parsed.category()?, parsed.level()?)
                .await?;
            play(&quiz, session).await?;
        }
        Command::Progress => print_progress(&quiz).await?,
        Command::Reset => match &parsed.category {
            Some(category) => quiz.reset_category(category).await?,
            None => quiz.reset_all().await?,
        },
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
