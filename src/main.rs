mod cli;

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::LevelFilter;
use owo_colors::OwoColorize;
use tokio::sync::mpsc;

use cli::Command;
use golearn::config::Config;
use golearn::course::{CatalogStore, CourseStore, HttpCourseStore, Lesson};
use golearn::events::CoreEvent;
use golearn::execution::{self, examples, ExecutionBackend};
use golearn::locator::Locator;
use golearn::navigation::LessonNavigator;
use golearn::printer::{CoursePrinter, MarkdownPrinter, RunPrinter};
use golearn::reconcile::Verdict;
use golearn::session::ExecutionSession;
use golearn::{tui, utils};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = cli::Cli::parse();

    // CLI flags win over rc file and environment
    let mut cfg = Config::load();
    if let Some(backend) = &args.backend {
        cfg.set("EXECUTION_BACKEND", backend.clone());
    }
    if let Some(url) = &args.api_url {
        cfg.set("COURSE_API_URL", url.clone());
    }
    if let Some(path) = &args.catalog {
        cfg.set("COURSE_CATALOG_PATH", path.to_string_lossy());
    }

    let interactive = matches!(args.command, Command::Learn { .. });
    init_logging(&cfg, args.verbose, interactive)?;

    match args.command {
        Command::Courses => {
            let store = open_store(&cfg)?;
            CoursePrinter.print_list(&store.list_courses().await?);
        }
        Command::Course { id } => {
            let store = open_store(&cfg)?;
            let mut detail = store.get_course(&id).await?;
            detail.lessons.sort_by_key(|l| l.order);
            CoursePrinter.print_detail(&detail);
        }
        Command::Lesson { locator } => {
            let store = open_store(&cfg)?;
            let lesson = resolve_lesson(store.as_ref(), &parse_locator(&locator)?).await?;
            MarkdownPrinter::default().print_lesson(&lesson);
        }
        Command::Run { locator, file } => {
            let store = open_store(&cfg)?;
            let lesson = resolve_lesson(store.as_ref(), &parse_locator(&locator)?).await?;
            let source = match utils::read_source(file.as_deref())? {
                Some(source) => source,
                None => lesson.code.clone(),
            };
            let backend = execution::from_config(&cfg)?;
            let ok = run_once(backend, source, Some(lesson.id.clone()), lesson.expectation()).await?;
            if !ok {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Playground { example, file, list } => {
            if list {
                for ex in examples::EXAMPLES {
                    println!("{:<10} {}", ex.id.cyan(), ex.title);
                }
                return Ok(ExitCode::SUCCESS);
            }
            let id = example.unwrap_or_else(|| examples::DEFAULT_EXAMPLE.to_string());
            let source = match utils::read_source(file.as_deref())? {
                Some(source) => source,
                None => match examples::find(&id) {
                    Some(ex) => ex.source.to_string(),
                    None => bail!("unknown example '{}', try --list", id),
                },
            };
            let backend = execution::from_config(&cfg)?;
            if !run_once(backend, source, Some(id), None).await? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Learn { locator } => {
            let locator = parse_locator(&locator)?;
            let store = open_store(&cfg)?;
            let backend = execution::from_config(&cfg)?;
            let (tx, rx) = mpsc::unbounded_channel();
            let session = ExecutionSession::new(backend, tx.clone());
            let nav = LessonNavigator::open(store, locator, session, tx)
                .await
                .context("failed to open course")?;
            let last = tui::run_learn_tui(nav, rx).await?;
            println!("Resume with: golearn learn '{}'", last);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn init_logging(cfg: &Config, verbose: bool, to_file: bool) -> Result<()> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        cfg.get("LOG_LEVEL")
            .and_then(|l| l.parse().ok())
            .unwrap_or(LevelFilter::Warn)
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).parse_default_env();

    // The terminal UI owns the screen, so logs go to a file instead
    if to_file {
        let path = cfg.log_file();
        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(log_file)));
    }
    builder.init();
    Ok(())
}

fn open_store(cfg: &Config) -> Result<Arc<dyn CourseStore>> {
    let store: Arc<dyn CourseStore> = match cfg.get_path("COURSE_CATALOG_PATH") {
        Some(path) => Arc::new(CatalogStore::load(&path)?),
        None => Arc::new(HttpCourseStore::from_config(cfg)?),
    };
    Ok(store)
}

fn parse_locator(text: &str) -> Result<Locator> {
    text.parse::<Locator>()
        .with_context(|| format!("cannot open '{}'", text))
}

/// The lesson a locator names, or the course's first lesson.
async fn resolve_lesson(store: &dyn CourseStore, locator: &Locator) -> Result<Lesson> {
    let lesson_id = match &locator.lesson_id {
        Some(id) => id.clone(),
        None => {
            let mut detail = store.get_course(&locator.course_id).await?;
            detail.lessons.sort_by_key(|l| l.order);
            match detail.lessons.first() {
                Some(first) => first.id.clone(),
                None => bail!("course '{}' has no lessons", locator.course_id),
            }
        }
    };
    Ok(store.get_lesson(&locator.course_id, &lesson_id).await?)
}

/// Drive one run through a session, echoing output as it arrives.
/// Returns false on an errored run or a mismatch.
async fn run_once(
    backend: Arc<dyn ExecutionBackend>,
    source: String,
    example: Option<String>,
    expected: Option<&str>,
) -> Result<bool> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut session = ExecutionSession::new(backend, tx);
    session.reset(&source, example);
    let mut output_rx = session.subscribe();

    if !session.run() {
        if let Some(err) = session.error() {
            RunPrinter.print_error(err);
        }
        return Ok(false);
    }

    let mut printed = 0;
    while let Some(event) = rx.recv().await {
        let finished = match event {
            CoreEvent::RunProgress { ticket, output } => {
                session.apply_progress(ticket, output);
                false
            }
            CoreEvent::RunFinished { ticket, outcome } => {
                session.apply_finished(ticket, outcome);
                true
            }
            CoreEvent::LessonLoaded { .. } => false,
        };
        if output_rx.has_changed().unwrap_or(false) {
            printed = echo_new(&output_rx.borrow_and_update(), printed)?;
        }
        if finished {
            break;
        }
    }
    if !session.output().is_empty() && !session.output().ends_with('\n') {
        println!();
    }

    if let Some(err) = session.error() {
        RunPrinter.print_error(err);
        return Ok(false);
    }
    let verdict = session.verdict(expected);
    if expected.is_some() {
        RunPrinter.print_verdict(verdict);
    }
    Ok(verdict != Verdict::Mismatch)
}

/// Print what `output` has beyond the first `printed` bytes.
fn echo_new(output: &str, printed: usize) -> Result<usize> {
    let mut stdout = io::stdout();
    if printed <= output.len() && output.is_char_boundary(printed) {
        stdout.write_all(output[printed..].as_bytes())?;
    } else {
        stdout.write_all(output.as_bytes())?;
    }
    stdout.flush()?;
    Ok(output.len())
}
