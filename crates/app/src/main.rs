mod terminal;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use quiz_core::model::{ModeTag, VariantTag};
use services::{Clock, QuizCatalog, QuizLoopService, QuizSession, SessionError, TickOutcome};
use storage::QuestionBankRepository;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing_subscriber::EnvFilter;

use terminal::Intent;

type InputLines = Lines<BufReader<Stdin>>;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidMode { raw: String },
    InvalidVariant { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidMode { raw } => write!(f, "invalid --mode value: {raw}"),
            ArgsError::InvalidVariant { raw } => write!(f, "invalid --variant value: {raw}"),
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

struct Args {
    bank_dir: PathBuf,
    catalog: Option<PathBuf>,
    variant: VariantTag,
    mode: ModeTag,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- run      [--banks <dir>] [--catalog <file>] [--variant <tag>] [--mode <exam|practice>]");
    eprintln!("  cargo run -p app -- variants [--catalog <file>]");
    eprintln!();
    eprintln!("Defaults for run:");
    eprintln!("  --banks data");
    eprintln!("  --variant psm1");
    eprintln!("  --mode exam");
    eprintln!();
    eprintln!("While running:");
    eprintln!("  <n> toggle option n, Enter/n next, p pause, s stats, f finish, q quit");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_BANK_DIR, QUIZ_CATALOG, QUIZ_VARIANT, QUIZ_MODE, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Run,
    Variants,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "run" => Some(Self::Run),
            "variants" => Some(Self::Variants),
            _ => None,
        }
    }
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut bank_dir = std::env::var("QUIZ_BANK_DIR")
            .ok()
            .map_or_else(|| PathBuf::from("data"), PathBuf::from);
        let mut catalog = std::env::var("QUIZ_CATALOG").ok().map(PathBuf::from);
        let mut variant = std::env::var("QUIZ_VARIANT")
            .ok()
            .map_or_else(|| VariantTag::from("psm1"), VariantTag::new);
        let mut mode = match std::env::var("QUIZ_MODE") {
            Ok(raw) => parse_mode(raw)?,
            Err(_) => ModeTag::TimedBalanced,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--banks" => bank_dir = PathBuf::from(require_value(args, "--banks")?),
                "--catalog" => catalog = Some(PathBuf::from(require_value(args, "--catalog")?)),
                "--variant" => {
                    let value = require_value(args, "--variant")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidVariant { raw: value });
                    }
                    variant = VariantTag::new(value.trim());
                }
                "--mode" => mode = parse_mode(require_value(args, "--mode")?)?,
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            bank_dir,
            catalog,
            variant,
            mode,
        })
    }

    fn load_catalog(&self) -> Result<QuizCatalog, services::CatalogError> {
        match &self.catalog {
            Some(path) => QuizCatalog::from_path(path),
            None => QuizCatalog::builtin(),
        }
    }
}

fn parse_mode(raw: String) -> Result<ModeTag, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidMode { raw })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// First tick lands one period after start, not immediately.
fn one_second_ticker() -> Interval {
    let period = Duration::from_secs(1);
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

enum Flow {
    Ended,
    Quit,
}

/// Drive one session until it terminates or the user leaves.
async fn drive(
    session: &mut QuizSession,
    lines: &mut InputLines,
) -> Result<Flow, Box<dyn std::error::Error>> {
    let mut ticker = session.time_ceiling().map(|_| one_second_ticker());
    print!("{}", terminal::render_question(&session.snapshot()));

    loop {
        tokio::select! {
            () = next_tick(&mut ticker) => {
                if session.tick() == TickOutcome::Expired {
                    return Ok(Flow::Ended);
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    return Ok(Flow::Quit);
                };
                let Some(intent) = terminal::parse_intent(&line) else {
                    println!("unrecognised input, try 1-9, n, p, s, f or q");
                    continue;
                };
                if !apply(session, intent)? {
                    return Ok(Flow::Quit);
                }
                if session.is_terminated() {
                    return Ok(Flow::Ended);
                }
            }
        }
    }
}

/// Returns `false` when the user asked to quit.
fn apply(session: &mut QuizSession, intent: Intent) -> Result<bool, SessionError> {
    let outcome = match intent {
        Intent::Quit => return Ok(false),
        Intent::Toggle(option) => session.toggle_current(option).map(|_| ()),
        Intent::Next => {
            if session.is_paused() || session.snapshot().can_advance() {
                session.advance().map(|_| ())
            } else {
                println!("select an option first");
                Ok(())
            }
        }
        Intent::Pause => session.toggle_pause().map(|_| ()),
        Intent::Finish => session.finish(),
        Intent::Stats => {
            if let Some(stats) = session.stats() {
                print!("{}", terminal::render_stats(&stats));
            }
            return Ok(true);
        }
        Intent::Restart => {
            println!("restart is available once the session has ended");
            return Ok(true);
        }
    };

    match outcome {
        Ok(()) => {}
        Err(
            err @ (SessionError::Paused
            | SessionError::Untimed
            | SessionError::OptionOutOfRange { .. }
            | SessionError::InvalidTransition { .. }),
        ) => println!("{err}"),
        Err(err) => return Err(err),
    }
    if !session.is_terminated() {
        print!("{}", terminal::render_question(&session.snapshot()));
    }
    Ok(true)
}

async fn run_quiz(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = args.load_catalog()?;
    let banks: Arc<dyn QuestionBankRepository> =
        Arc::new(catalog.bank_repository(&args.bank_dir));
    let service = QuizLoopService::new(Clock::default(), banks, Arc::new(catalog));

    let mut session = service.start_session(&args.variant, args.mode).await?;
    if let Some(requested) = session
        .plan()
        .filter(|plan| plan.is_short())
        .and_then(|plan| plan.requested)
    {
        println!(
            "only {} of {requested} requested questions were available",
            session.total()
        );
    }
    tracing::info!(variant = %args.variant, mode = %args.mode, total = session.total(), "session started");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if let Flow::Quit = drive(&mut session, &mut lines).await? {
            return Ok(());
        }
        if let Some(report) = session.report() {
            print!("{}", terminal::render_report(&report));
        }

        println!("\nr to restart, anything else to quit");
        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };
        if terminal::parse_intent(&line) != Some(Intent::Restart) {
            return Ok(());
        }
        service.restart(&mut session).await?;
    }
}

fn list_variants(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = args.load_catalog()?;
    for variant in catalog.variants() {
        println!(
            "{:<12} {:<24} {} (exam {} questions, {}; practice pass {:.0}%)",
            variant.tag.as_str(),
            variant.label,
            variant.file.display(),
            variant.exam.size,
            quiz_core::time::format_clock(variant.exam.ceiling_secs),
            variant.practice.pass_fraction.percent()
        );
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1).peekable();

    if matches!(args.peek().map(String::as_str), Some("-h" | "--help")) {
        print_usage();
        return Ok(());
    }

    let command = match args.peek().and_then(|arg| Command::from_arg(arg)) {
        Some(command) => {
            args.next();
            command
        }
        None => Command::Run,
    };
    let parsed = Args::parse(&mut args).inspect_err(|_| print_usage())?;

    match command {
        Command::Run => run_quiz(parsed).await,
        Command::Variants => list_variants(&parsed),
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
