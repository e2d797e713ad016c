//! CLI for apa-daily - the daily APA citation challenge.

use std::fmt;
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use chrono::Utc;
use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use reqwest::blocking::Client;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use apa_daily::{
    gate::{format_countdown, CompletionState},
    grade, grade_from_store, hints, next_milestone, rank, read_citation_or_fallback,
    render_diff, schedule, time_until_reset, Celebration, DiffSegment, FileStore, GateError,
    GenerateError, Generator, GeneratorSettings, GradeError, MemoryStore, OpenAlexClient,
    RandomNames, RenderMode, Store, UpstashStore, CHALLENGE_TIME_ZONE,
};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// Daily APA citation challenge
#[derive(Parser)]
#[command(name = "apa-daily")]
#[command(version)]
#[command(after_help = "\
Examples:
  apa-daily generate
  apa-daily show --hints
  apa-daily submit 'Lee, A. B. (2023). A Short Title. *Nature, 10*(2), 5-9.' --progress me.json
  apa-daily --store-file store.json grade -")]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct StoreArgs {
    /// Use a local JSON file as the store instead of Upstash
    #[arg(long, global = true, env = "APA_DAILY_STORE")]
    store_file: Option<PathBuf>,

    /// Upstash Redis REST URL
    #[arg(long, global = true, env = "UPSTASH_URL", hide_env_values = true)]
    upstash_url: Option<String>,

    /// Upstash Redis REST token
    #[arg(long, global = true, env = "UPSTASH_PASSWORD", hide_env_values = true)]
    upstash_token: Option<String>,
}

#[derive(Args)]
struct GenerationArgs {
    /// Whole-run attempts before giving up
    #[arg(long, default_value_t = schedule::DEFAULT_RUN_ATTEMPTS)]
    attempts: usize,

    /// Works fetched per run before giving up
    #[arg(long, default_value_t = 10)]
    fetch_attempts: usize,

    /// Seconds to wait after a rejected work, and between failed runs
    #[arg(long, default_value_t = 5)]
    retry_delay_secs: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate today's citation and publish it to the store
    Generate {
        #[command(flatten)]
        generation: GenerationArgs,

        /// Print the citation without publishing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Generate a new citation every day at midnight
    Schedule {
        #[command(flatten)]
        generation: GenerationArgs,

        /// Time zone of the daily midnight run
        #[arg(long, default_value = "UTC", value_parser = parse_time_zone)]
        tz: Tz,
    },

    /// Show today's citation
    Show {
        /// Also print formatting hints
        #[arg(long)]
        hints: bool,

        /// Print the citation record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Grade an answer without recording it
    #[command(after_help = "\
Use *asterisks* for italics. The answer must match exactly (surrounding whitespace is ignored).")]
    Grade {
        /// The formatted citation (use '-' for stdin)
        answer: String,

        /// Grade against this string instead of the stored one
        #[arg(long)]
        canonical: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Submit today's answer: grade it and update the streak
    Submit {
        /// The formatted citation (use '-' for stdin)
        answer: String,

        /// Progress file holding the streak and last completion time
        #[arg(short, long)]
        progress: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show streak statistics
    Streak {
        /// Progress file holding the streak and last completion time
        #[arg(short, long)]
        progress: PathBuf,
    },
}

#[derive(Args)]
struct OutputArgs {
    /// Disable colours in the diff
    #[arg(long)]
    no_color: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

fn parse_time_zone(value: &str) -> Result<Tz, String> {
    value.parse::<Tz>().map_err(|e| e.to_string())
}

// ---------------------------------------------------------------------------
// AppError — semantic exit codes
// ---------------------------------------------------------------------------

enum AppError {
    /// Exit 10 — answer could not be read
    Input(String),
    /// Exit 11 — store not configured / unreachable / invalid
    Store(String),
    /// Exit 12 — bibliographic source unreachable
    Source(String),
    /// Exit 13 — no acceptable work within the fetch budget
    NoMatchingWork(String),
    /// Exit 14 — no canonical citation to grade against
    MissingCanonical(String),
    /// Exit 15 — today's citation already submitted
    AlreadyCompleted(String),
    /// Exit 16 — progress file unreadable / unwritable
    Progress(String),
    /// Exit 17 — author names could not be generated
    Generation(String),
}

impl AppError {
    fn exit_code(&self) -> i32 {
        match self {
            AppError::Input(_) => 10,
            AppError::Store(_) => 11,
            AppError::Source(_) => 12,
            AppError::NoMatchingWork(_) => 13,
            AppError::MissingCanonical(_) => 14,
            AppError::AlreadyCompleted(_) => 15,
            AppError::Progress(_) => 16,
            AppError::Generation(_) => 17,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Input(msg) => write!(f, "{}", msg),
            AppError::Store(msg) => {
                write!(
                    f,
                    "{}\n  hint: pass --store-file, or set UPSTASH_URL and UPSTASH_PASSWORD",
                    msg
                )
            }
            AppError::Source(msg) => {
                write!(f, "{}\n  hint: the run can be retried later", msg)
            }
            AppError::NoMatchingWork(msg) => {
                write!(
                    f,
                    "{}\n  hint: raise --fetch-attempts or retry the run",
                    msg
                )
            }
            AppError::MissingCanonical(msg) => {
                write!(
                    f,
                    "{}\n  hint: run 'apa-daily generate' to publish today's citation",
                    msg
                )
            }
            AppError::AlreadyCompleted(msg) => write!(f, "{}", msg),
            AppError::Progress(msg) => {
                write!(
                    f,
                    "{}\n  hint: the progress file must hold {{\"streak\": N, \"lastCompleted\": \"<RFC 3339>\"}}",
                    msg
                )
            }
            AppError::Generation(msg) => write!(f, "{}", msg),
        }
    }
}

impl From<GenerateError> for AppError {
    fn from(e: GenerateError) -> Self {
        match e {
            GenerateError::NoMatchingWork { .. } => AppError::NoMatchingWork(e.to_string()),
            GenerateError::SourceUnavailable(_) => AppError::Source(e.to_string()),
            GenerateError::NameExhausted { .. } => AppError::Generation(e.to_string()),
            GenerateError::Store(_) => AppError::Store(e.to_string()),
        }
    }
}

impl From<GradeError> for AppError {
    fn from(e: GradeError) -> Self {
        match e {
            GradeError::MissingCanonical => AppError::MissingCanonical(e.to_string()),
            GradeError::Store(_) => AppError::Store(e.to_string()),
        }
    }
}

impl From<GateError> for AppError {
    fn from(e: GateError) -> Self {
        AppError::AlreadyCompleted(e.to_string())
    }
}

/// Whether the answer graded by a command was right.
enum Verdict {
    Done,
    Incorrect,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "apa_daily=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match run() {
        Ok(Verdict::Done) => {}
        Ok(Verdict::Incorrect) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    }
}

fn run() -> Result<Verdict, AppError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            generation,
            dry_run,
        } => generate_command(&cli.store, &generation, dry_run),
        Commands::Schedule { generation, tz } => schedule_command(&cli.store, &generation, tz),
        Commands::Show { hints, json } => show_command(&cli.store, hints, json),
        Commands::Grade {
            answer,
            canonical,
            output,
        } => grade_command(&cli.store, &answer, canonical.as_deref(), &output),
        Commands::Submit {
            answer,
            progress,
            output,
        } => submit_command(&cli.store, &answer, &progress, &output),
        Commands::Streak { progress } => streak_command(&progress),
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

fn http_client() -> Result<Client, AppError> {
    Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| AppError::Store(format!("failed to build HTTP client: {}", e)))
}

/// Opens the configured store: a local file, or Upstash.
fn open_store(args: &StoreArgs) -> Result<Box<dyn Store>, AppError> {
    if let Some(path) = &args.store_file {
        return Ok(Box::new(FileStore::new(path)));
    }

    match (&args.upstash_url, &args.upstash_token) {
        (Some(url), Some(token)) => Ok(Box::new(UpstashStore::new(http_client()?, url, token))),
        _ => Err(AppError::Store("no store configured".to_string())),
    }
}

fn new_generator(
    args: &GenerationArgs,
) -> Result<Generator<OpenAlexClient, RandomNames<StdRng>, StdRng>, AppError> {
    let source = OpenAlexClient::with_timeout(HTTP_TIMEOUT)
        .map_err(|e| AppError::Source(e.to_string()))?;
    let settings = GeneratorSettings {
        max_attempts: args.fetch_attempts,
        retry_delay: Duration::from_secs(args.retry_delay_secs),
        ..GeneratorSettings::default()
    };

    Ok(Generator::with_settings(
        source,
        RandomNames::new(StdRng::from_entropy()),
        StdRng::from_entropy(),
        settings,
    ))
}

/// Reads the answer argument, or stdin when it is '-'.
fn read_answer(answer: &str) -> Result<String, AppError> {
    if answer != "-" {
        return Ok(answer.to_string());
    }

    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .map_err(|e| AppError::Input(format!("failed to read from stdin: {}", e)))?;
    Ok(buf)
}

fn load_progress(path: &Path) -> Result<CompletionState, AppError> {
    if !path.exists() {
        return Ok(CompletionState::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| AppError::Progress(format!("'{}': {}", path.display(), e)))?;
    serde_json::from_str(&content)
        .map_err(|e| AppError::Progress(format!("'{}': {}", path.display(), e)))
}

fn save_progress(path: &Path, state: &CompletionState) -> Result<(), AppError> {
    let content = serde_json::to_string_pretty(state)
        .map_err(|e| AppError::Progress(format!("'{}': {}", path.display(), e)))?;
    fs::write(path, content)
        .map_err(|e| AppError::Progress(format!("'{}': {}", path.display(), e)))
}

fn render_mode(output: &OutputArgs) -> RenderMode {
    if output.no_color || !io::stdout().is_terminal() {
        RenderMode::Plain
    } else {
        RenderMode::Ansi
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Generate today's citation and publish it.
fn generate_command(
    store_args: &StoreArgs,
    args: &GenerationArgs,
    dry_run: bool,
) -> Result<Verdict, AppError> {
    let store: Box<dyn Store> = if dry_run {
        Box::new(MemoryStore::new())
    } else {
        open_store(store_args)?
    };
    let mut generator = new_generator(args)?;

    let citation = schedule::run_once(
        &mut generator,
        store.as_ref(),
        args.attempts,
        Duration::from_secs(args.retry_delay_secs),
    )?;

    println!("{}", citation.apa);
    Ok(Verdict::Done)
}

/// Generate a new citation every day.
fn schedule_command(
    store_args: &StoreArgs,
    args: &GenerationArgs,
    tz: Tz,
) -> Result<Verdict, AppError> {
    let store = open_store(store_args)?;
    let mut generator = new_generator(args)?;

    schedule::run_daily(
        &mut generator,
        store.as_ref(),
        tz,
        args.attempts,
        Duration::from_secs(args.retry_delay_secs),
    )
}

/// Show today's citation, falling back to a placeholder when unavailable.
fn show_command(store_args: &StoreArgs, with_hints: bool, as_json: bool) -> Result<Verdict, AppError> {
    let record = match open_store(store_args) {
        Ok(store) => read_citation_or_fallback(store.as_ref()),
        Err(e) => {
            tracing::warn!(error = %e, "store unavailable, using fallback citation");
            apa_daily::CitationRecord::fallback()
        }
    };

    if as_json {
        let text = serde_json::to_string_pretty(&record)
            .map_err(|e| AppError::Store(e.to_string()))?;
        println!("{}", text);
        return Ok(Verdict::Done);
    }

    println!("Authors:  {}", record.authors.join(", "));
    println!("Year:     {}", record.published_year);
    println!("Title:    {}", record.title);
    println!("Journal:  {}", record.periodical);
    println!("Volume:   {}", record.volume);
    println!("Issue:    {}", record.issue);
    println!("Pages:    {} - {}", record.page_start, record.page_end);
    if let Some(doi) = record.doi.as_deref().filter(|doi| !doi.is_empty()) {
        println!("DOI:      {}", doi);
    }

    if with_hints {
        println!();
        println!("Hints:");
        for line in hints(&record) {
            println!("- {}", line);
        }
    }

    Ok(Verdict::Done)
}

fn print_result(is_correct: bool, segments: &[DiffSegment], canonical: &str, output: &OutputArgs) {
    if output.json {
        println!(
            "{}",
            json!({
                "isCorrect": is_correct,
                "canonical": canonical,
                "diff": segments,
            })
        );
        return;
    }

    println!("{}", if is_correct { "Correct!" } else { "Incorrect." });
    println!("{}", render_diff(segments, render_mode(output)));
}

/// Grade an answer without touching the streak.
fn grade_command(
    store_args: &StoreArgs,
    answer: &str,
    canonical: Option<&str>,
    output: &OutputArgs,
) -> Result<Verdict, AppError> {
    let answer = read_answer(answer)?;

    let result = match canonical {
        Some(canonical) => grade(&answer, canonical),
        None => grade_from_store(open_store(store_args)?.as_ref(), &answer)?,
    };

    let segments: Vec<DiffSegment> = result.diff.segments().collect();
    print_result(
        result.is_correct,
        &segments,
        &result.diff.canonical(),
        output,
    );

    Ok(if result.is_correct {
        Verdict::Done
    } else {
        Verdict::Incorrect
    })
}

/// Submit today's answer through the daily gate.
fn submit_command(
    store_args: &StoreArgs,
    answer: &str,
    progress: &Path,
    output: &OutputArgs,
) -> Result<Verdict, AppError> {
    let mut state = load_progress(progress)?;
    let now = Utc::now();

    if state.is_completed_today(now, CHALLENGE_TIME_ZONE) {
        return Err(GateError::AlreadyCompleted {
            resets_in: format_countdown(time_until_reset(now, CHALLENGE_TIME_ZONE)),
        }
        .into());
    }

    let answer = read_answer(answer)?;
    let result = grade_from_store(open_store(store_args)?.as_ref(), &answer)?;
    let canonical = result.diff.canonical();

    let outcome = state.submit(now, result.is_correct, CHALLENGE_TIME_ZONE)?;
    save_progress(progress, &state)?;

    let segments: Vec<DiffSegment> = result.diff.segments().collect();
    if output.json {
        println!(
            "{}",
            json!({
                "isCorrect": result.is_correct,
                "canonical": canonical,
                "diff": segments,
                "outcome": outcome,
            })
        );
    } else {
        print_result(result.is_correct, &segments, &canonical, output);
        println!();
        match outcome.celebration {
            Celebration::Full => println!(
                "Milestone reached: {} day streak!",
                outcome.milestone.unwrap_or(outcome.streak)
            ),
            Celebration::Light => println!("Streak: {}", outcome.streak),
            Celebration::None => println!(
                "Streak reset. You can try again tomorrow at 12:00 AM (resets in {}).",
                format_countdown(time_until_reset(now, CHALLENGE_TIME_ZONE))
            ),
        }
    }

    Ok(if result.is_correct {
        Verdict::Done
    } else {
        Verdict::Incorrect
    })
}

/// Show streak statistics.
fn streak_command(progress: &Path) -> Result<Verdict, AppError> {
    let state = load_progress(progress)?;
    let now = Utc::now();

    let days = if state.streak == 1 { "day" } else { "days" };
    println!("Streak: {} {}", state.streak, days);
    if let Some(rank) = rank(state.streak) {
        println!("Rank: {}", rank.title());
    }
    if let Some(next) = next_milestone(state.streak) {
        println!(
            "Next milestone: {} days ({} to go)",
            next,
            next - state.streak
        );
    }
    if state.is_completed_today(now, CHALLENGE_TIME_ZONE) {
        println!(
            "Today: completed (resets in {})",
            format_countdown(time_until_reset(now, CHALLENGE_TIME_ZONE))
        );
    } else {
        println!("Today: not completed yet");
    }

    Ok(Verdict::Done)
}
