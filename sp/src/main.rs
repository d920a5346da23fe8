//! StudyPlan - exam study plan generator
//!
//! CLI entry point for running generations and inspecting their results.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use colored::*;
use eyre::{Context, Result, bail};
use tracing::{debug, info};

use studyplan::artifacts::DebugArtifactStore;
use studyplan::cli::{ArtifactsCommand, Cli, Command, OutputFormat, PlanCommand};
use studyplan::config::Config;
use studyplan::domain::{GenerationStatus, StudyPlan, SurveyAnswers};
use studyplan::llm::{LlmClient, OpenAIClient};
use studyplan::pipeline::Pipeline;
use studyplan::state::{FileSnapshotStore, StatusHandle};
use studyplan::storage::{PlanStore, SqlitePlanStore};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("studyplan")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
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
    };

    let log_file = fs::File::create(log_dir.join("studyplan.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(model = %config.llm.model, "StudyPlan loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Generate { survey, session } => cmd_generate(&config, &survey, &session).await,
        Command::Status { session } => cmd_status(&config, &session).await,
        Command::Reset { session } => cmd_reset(&config, &session).await,
        Command::Plan {
            command: PlanCommand::Show { id, format },
        } => cmd_plan_show(&config, &id, format).await,
        Command::Artifacts { command } => cmd_artifacts(&config, command),
    }
}

fn load_survey(path: &Path) -> Result<SurveyAnswers> {
    debug!(?path, "load_survey: called");
    let content = fs::read_to_string(path).context(format!("Failed to read survey {}", path.display()))?;
    // YAML is a superset of JSON, so one parser covers both
    serde_yaml::from_str(&content).context(format!("Failed to parse survey {}", path.display()))
}

fn open_session(config: &Config, session: &str) -> Result<StatusHandle> {
    debug!(%session, "open_session: called");
    let store = FileSnapshotStore::for_session(&config.storage.session_dir, session)?;
    Ok(StatusHandle::spawn(Box::new(store), config.generation_budget())?)
}

fn open_artifacts(config: &Config) -> Result<DebugArtifactStore> {
    DebugArtifactStore::open_dir(&config.artifacts.dir).context(format!(
        "Failed to open artifact directory {}",
        config.artifacts.dir.display()
    ))
}

async fn cmd_generate(config: &Config, survey_path: &Path, session: &str) -> Result<()> {
    debug!(?survey_path, %session, "cmd_generate: called");
    let survey = load_survey(survey_path)?;
    let status = open_session(config, session)?;

    match status.view().await?.status {
        GenerationStatus::Generating => {
            bail!("Session '{}' already has a generation in progress", session)
        }
        s if s.is_terminal() => {
            debug!(status = %s, "cmd_generate: resetting settled session");
            status.reset().await?;
        }
        _ => {}
    }

    let client: Arc<dyn LlmClient> =
        Arc::new(OpenAIClient::from_config(&config.llm).context("Failed to create LLM client")?);
    let artifacts = Arc::new(open_artifacts(config)?);
    let plans: Arc<dyn PlanStore> = Arc::new(
        SqlitePlanStore::open(&config.storage.db_path).context("Failed to open plan store")?,
    );

    let pipeline = Arc::new(Pipeline::from_config(config, client, artifacts, plans, status.clone()));
    let mut updates = status.subscribe();
    let mut job = pipeline.spawn(survey);

    let joined = loop {
        tokio::select! {
            joined = &mut job => break joined,
            changed = updates.changed() => {
                if changed.is_err() {
                    break (&mut job).await;
                }
                let view = updates.borrow_and_update().clone();
                if view.status == GenerationStatus::Generating {
                    eprint!("\r{} {:>3}%", "Generating".cyan(), view.progress);
                }
            }
        }
    };
    eprintln!();

    match joined.context("Generation task failed")? {
        Ok(plan_id) => {
            println!("{} Study plan saved: {}", "✓".green(), plan_id.cyan());
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", "✗".red(), e.user_message());
            Err(eyre::Report::new(e).wrap_err("Generation failed"))
        }
    }
}

async fn cmd_status(config: &Config, session: &str) -> Result<()> {
    debug!(%session, "cmd_status: called");
    let view = open_session(config, session)?.view().await?;
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

async fn cmd_reset(config: &Config, session: &str) -> Result<()> {
    debug!(%session, "cmd_reset: called");
    open_session(config, session)?.reset().await?;
    println!("{} Session '{}' reset", "✓".green(), session);
    Ok(())
}

async fn cmd_plan_show(config: &Config, id: &str, format: OutputFormat) -> Result<()> {
    debug!(%id, ?format, "cmd_plan_show: called");
    let store = SqlitePlanStore::open(&config.storage.db_path).context("Failed to open plan store")?;
    let plan = store.load(id).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
        OutputFormat::Text | OutputFormat::Table => print_plan(&plan),
    }
    Ok(())
}

fn print_plan(plan: &StudyPlan) {
    println!("{}", plan.overview.bold());
    println!();
    for phase in &plan.phases {
        println!(
            "{} {} {}",
            format!("Phase {}", phase.id).cyan(),
            phase.name.bold(),
            format!("(days {}-{})", phase.start_day, phase.end_day).dimmed()
        );
        for area in &phase.focus_areas {
            println!("  - {}", area);
        }
    }
    println!();
    println!(
        "{} days, {} tasks, {} hours of study",
        plan.total_days(),
        plan.daily_plans.iter().map(|d| d.tasks.len()).sum::<usize>(),
        plan.total_minutes() / 60
    );
}

fn cmd_artifacts(config: &Config, command: ArtifactsCommand) -> Result<()> {
    debug!(?command, "cmd_artifacts: called");
    let artifacts = open_artifacts(config)?;

    match command {
        ArtifactsCommand::List { format } => {
            let listing = artifacts.list()?;
            match format {
                OutputFormat::Json => {
                    for artifact in &listing {
                        println!("{}", serde_json::to_string(artifact)?);
                    }
                }
                OutputFormat::Text | OutputFormat::Table => {
                    if listing.is_empty() {
                        println!("No debug artifacts in {}", config.artifacts.dir.display());
                        return Ok(());
                    }
                    println!("{:<48} {:<11} {:>9}  {}", "NAME".bold(), "TYPE".bold(), "SIZE".bold(), "CREATED".bold());
                    for artifact in &listing {
                        let kind = artifact.kind.map(|k| k.to_string()).unwrap_or_else(|| "-".to_string());
                        println!(
                            "{:<48} {:<11} {:>9}  {}",
                            artifact.filename,
                            kind,
                            artifact.size_bytes,
                            artifact.created_at.format("%Y-%m-%d %H:%M:%S")
                        );
                    }
                }
            }
        }
        ArtifactsCommand::Cat { name } => {
            let content = artifacts.read(&name)?;
            std::io::stdout().write_all(&content)?;
        }
        ArtifactsCommand::Rm { name } => {
            artifacts.delete(&name)?;
            println!("{} Deleted artifact: {}", "✓".green(), name);
        }
    }
    Ok(())
}
