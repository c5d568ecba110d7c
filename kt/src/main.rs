//! KhirMinTaki - chapter tutor
//!
//! CLI entry point: interactive chat plus progress inspection commands.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Local};
use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info};

use khirmintaki::cli::{Cli, Command, SessionArgs, get_log_path};
use khirmintaki::config::Config;
use khirmintaki::domain::{LearnerChapterSession, Record};
use khirmintaki::llm::create_tutor_client;
use khirmintaki::prompts::PromptLoader;
use khirmintaki::repl::ChatRepl;
use khirmintaki::state::{SessionStore, StateManager};
use khirmintaki::tracker::SessionTracker;
use khirmintaki::tutor::{LearnerProfile, TutorService, save_with_retry};

fn parse_level(level_str: Option<&str>) -> tracing::Level {
    match level_str.map(|s| s.to_uppercase()) {
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    }
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Priority: CLI --log-level > config file > INFO
    let level = parse_level(cli_log_level.or(config_log_level));

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Log level is needed before the full config load
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!("KhirMinTaki loaded config: primary={}", config.llm.primary.provider);

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Chat { session, profile } => cmd_chat(&config, &session, profile.into()).await,
        Command::Show { session, full } => cmd_show(&config, &session, full).await,
        Command::Score { session, score } => cmd_score(&config, &session, score).await,
        Command::Plan { session, file } => cmd_plan(&config, &session, &file).await,
        Command::List { learner } => cmd_list(&config, &learner).await,
    }
}

fn open_store(config: &Config) -> Result<StateManager> {
    StateManager::spawn(&config.storage.path)
        .context(format!("Failed to open store at {}", config.storage.path.display()))
}

async fn cmd_chat(config: &Config, args: &SessionArgs, profile: LearnerProfile) -> Result<()> {
    debug!(learner = %args.learner, chapter = %args.chapter, "cmd_chat: called");
    config.validate()?;

    let llm = create_tutor_client(&config.llm).map_err(|e| eyre::eyre!("Failed to create LLM client: {}", e))?;
    let store = open_store(config)?;
    let service = TutorService::new(
        llm,
        Arc::new(store.clone()),
        SessionTracker::new(config.markers.clone()),
        PromptLoader::new(config.tutor.prompts_dir.as_deref()),
        config.tutor.clone(),
    );

    let tutor = service.open_chapter(&args.learner, &args.chapter, profile).await?;
    let mut repl = ChatRepl::new(service, tutor);
    let result = repl.run().await;
    store.shutdown().await;
    result
}

/// Load a session, creating it lazily in the assessment phase
async fn load_or_create(store: &StateManager, args: &SessionArgs) -> Result<LearnerChapterSession> {
    match store.load_session(&args.learner, &args.chapter).await? {
        Some(session) => Ok(session),
        None => Ok(LearnerChapterSession::new(args.learner.as_str(), args.chapter.as_str())?),
    }
}

async fn cmd_show(config: &Config, args: &SessionArgs, full: bool) -> Result<()> {
    debug!(learner = %args.learner, chapter = %args.chapter, full, "cmd_show: called");
    let store = open_store(config)?;
    let Some(session) = store.load_session(&args.learner, &args.chapter).await? else {
        println!("No session for {} in chapter {}", args.learner, args.chapter);
        println!("Start one with: kt chat -u {} -k {}", args.learner, args.chapter);
        return Ok(());
    };

    println!("{} {} / {}", "Session".bold(), session.learner_id(), session.chapter_id());
    println!("  Phase:       {}", session.phase().to_string().cyan());
    match session.latest_quiz_score() {
        Some(score) => println!("  Last quiz:   {}/100", score),
        None => println!("  Last quiz:   {}", "none".dimmed()),
    }
    println!("  Started:     {}", format_ms(session.created_at()));
    println!("  Updated:     {}", format_ms(session.updated_at()));
    print_artifact("Study plan", session.study_plan(), full);
    print_artifact("Course summary", session.course_resume(), full);
    Ok(())
}

async fn cmd_score(config: &Config, args: &SessionArgs, score: i64) -> Result<()> {
    debug!(learner = %args.learner, chapter = %args.chapter, score, "cmd_score: called");
    let store = open_store(config)?;
    let tracker = SessionTracker::new(config.markers.clone());

    let session = tracker.record_quiz_score(load_or_create(&store, args).await?, score)?;
    save_with_retry(&store, &session, config.tutor.save_retries).await?;
    println!("{} Quiz score {} recorded for {} / {}", "✓".green(), score, args.learner, args.chapter);
    Ok(())
}

async fn cmd_plan(config: &Config, args: &SessionArgs, file: &Path) -> Result<()> {
    debug!(learner = %args.learner, chapter = %args.chapter, ?file, "cmd_plan: called");
    let plan = fs::read_to_string(file).context(format!("Failed to read plan from {}", file.display()))?;
    let store = open_store(config)?;
    let tracker = SessionTracker::new(config.markers.clone());

    let session = tracker.replace_study_plan(load_or_create(&store, args).await?, &plan)?;
    save_with_retry(&store, &session, config.tutor.save_retries).await?;
    println!("{} Study plan replaced for {} / {}", "✓".green(), args.learner, args.chapter);
    Ok(())
}

async fn cmd_list(config: &Config, learner: &str) -> Result<()> {
    debug!(%learner, "cmd_list: called");
    let store = open_store(config)?;
    let sessions = store.list_sessions(learner).await?;
    if sessions.is_empty() {
        println!("No chapters started by {}", learner);
        return Ok(());
    }

    println!("{:<24} {:<12} {:<8} {}", "CHAPTER".bold(), "PHASE".bold(), "QUIZ".bold(), "UPDATED".bold());
    for session in sessions {
        let quiz = session
            .latest_quiz_score()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<24} {:<12} {:<8} {}",
            session.chapter_id(),
            session.phase().to_string(),
            quiz,
            format_ms(session.updated_at())
        );
    }
    Ok(())
}

fn print_artifact(label: &str, text: Option<&str>, full: bool) {
    match text {
        Some(text) if full => println!("\n{}:\n{}", label.bold(), text),
        Some(text) => {
            let first = text.lines().next().unwrap_or_default();
            println!("  {:<12} {} {}", format!("{}:", label), first, "(use --full)".dimmed());
        }
        None => println!("  {:<12} {}", format!("{}:", label), "none".dimmed()),
    }
}

fn format_ms(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ms.to_string())
}
