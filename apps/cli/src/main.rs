use std::{
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
    sync::Arc,
};

use anyhow::Result;
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use client_core::{
    config::{load_settings_from, normalize_api_url},
    load_settings, AlwaysConfirm, ClientError, ClientEvent, Confirmation, Confirmer,
    DeepDiveOutcome, DocumentUpload, ResearchSession, RunOutcome, ThemeDraft, ThemeEdit,
};
use serde::Serialize;
use shared::domain::{RunId, Schedule, ThemeId};
use tokio::sync::broadcast;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod render;

#[derive(Parser, Debug)]
#[command(name = "research", about = "Manage research themes and runs")]
struct Cli {
    /// Research backend base URL; overrides research.toml and the environment.
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Settings file to use instead of ./research.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Skip confirmation prompts for destructive actions.
    #[arg(long, short = 'y', global = true)]
    yes: bool,
    /// Print raw JSON instead of formatted text where available.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(subcommand)]
    Themes(ThemeCommand),
    /// Upload a document and let the backend extract themes from it.
    Upload { path: PathBuf },
    /// Run research for a theme and print the bucketed results.
    Run { theme_id: String },
    #[command(subcommand)]
    History(HistoryCommand),
    /// Summarize a single result URL.
    Dive { url: String },
}

#[derive(Subcommand, Debug)]
enum ThemeCommand {
    List {
        /// Only themes with an active schedule.
        #[arg(long)]
        active: bool,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        /// Comma separated.
        #[arg(long, default_value = "")]
        keywords: String,
        #[arg(long, default_value = "weekly")]
        schedule: Schedule,
    },
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        keywords: Option<String>,
        #[arg(long)]
        schedule: Option<Schedule>,
    },
    Activate {
        id: String,
    },
    /// Stop a theme's schedule (back to draft).
    Stop {
        id: String,
    },
    Delete {
        id: String,
    },
    BulkDelete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Delete every theme.
    Clear,
}

#[derive(Subcommand, Debug)]
enum HistoryCommand {
    List,
    Show { run_id: String },
}

/// Asks on the terminal before destructive actions.
struct PromptConfirmer;

#[async_trait]
impl Confirmer for PromptConfirmer {
    async fn confirm(&self, request: &Confirmation) -> bool {
        let prompt = request.prompt();
        tokio::task::spawn_blocking(move || {
            print!("{prompt} [y/N] ");
            if io::stdout().flush().is_err() {
                return false;
            }
            let mut answer = String::new();
            if io::stdin().read_line(&mut answer).is_err() {
                return false;
            }
            matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
        })
        .await
        .unwrap_or(false)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => load_settings_from(path)?,
        None => load_settings(),
    };
    if let Some(api_url) = &cli.api_url {
        settings.api_url = normalize_api_url(api_url);
    }
    debug!(api_url = %settings.api_url, "using research backend");

    let confirmer: Arc<dyn Confirmer> = if cli.yes {
        Arc::new(AlwaysConfirm)
    } else {
        Arc::new(PromptConfirmer)
    };
    let session = ResearchSession::connect(&settings, confirmer)?;
    let mut events = session.subscribe_events();

    let result = execute(&session, cli.command, cli.json).await;
    let printed = print_notices(&mut events);

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(ClientError::Declined(action)) => {
            eprintln!("Cancelled: {action}.");
            Ok(ExitCode::FAILURE)
        }
        Err(err) => {
            if printed == 0 {
                eprintln!("{err}");
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn execute(
    session: &ResearchSession,
    command: Command,
    json: bool,
) -> Result<(), ClientError> {
    match command {
        Command::Themes(command) => themes(session, command, json).await,
        Command::Upload { path } => {
            let upload = DocumentUpload::from_path(&path).await?;
            let response = session.upload_document(upload).await?;
            match response.chunks_ingested {
                Some(chunks) => println!("Uploaded {} ({chunks} chunks).", response.filename),
                None => println!("Uploaded {}.", response.filename),
            }
            print_themes(session, json).await;
            Ok(())
        }
        Command::Run { theme_id } => {
            session.themes().refresh().await?;
            match session.run_theme(&ThemeId::from(theme_id)).await? {
                RunOutcome::Settled(run) if json => print_json(&run),
                RunOutcome::Settled(_) => {
                    print!("{}", render::run_view(&session.runs().view().await))
                }
                RunOutcome::Superseded => println!("Run was superseded."),
            }
            Ok(())
        }
        Command::History(HistoryCommand::List) => {
            let runs = session.history().refresh().await?;
            if json {
                print_json(&runs);
            } else {
                print!("{}", render::history_table(&runs));
            }
            Ok(())
        }
        Command::History(HistoryCommand::Show { run_id }) => {
            session.bootstrap().await?;
            let loaded = session.load_run(&RunId::from(run_id)).await?;
            if json {
                print_json(&loaded.run);
            } else {
                print!("{}", render::historical(&loaded));
            }
            Ok(())
        }
        Command::Dive { url } => {
            if let DeepDiveOutcome::Summarized(result) = session.open_deep_dive(&url).await? {
                if json {
                    print_json(&result);
                } else {
                    println!("{}\n\n{}", result.href, result.summary);
                }
            }
            session.close_deep_dive().await;
            Ok(())
        }
    }
}

async fn themes(
    session: &ResearchSession,
    command: ThemeCommand,
    json: bool,
) -> Result<(), ClientError> {
    session.themes().refresh().await?;
    match command {
        ThemeCommand::List { active } => {
            let themes = if active {
                session.themes().active_themes().await
            } else {
                session.themes().themes().await
            };
            if json {
                print_json(&themes);
            } else {
                print!(
                    "{}",
                    render::theme_table(&themes, &session.themes().count_label().await)
                );
                if session.themes().at_capacity().await {
                    println!("{}", render::capacity_hint(session.themes().cap()));
                }
            }
            return Ok(());
        }
        ThemeCommand::Create {
            name,
            description,
            keywords,
            schedule,
        } => {
            let created = session
                .create_theme(ThemeDraft {
                    name,
                    description,
                    keywords,
                    schedule,
                })
                .await?;
            println!("Created {} ({}).", created.name, created.id);
        }
        ThemeCommand::Edit {
            id,
            name,
            description,
            keywords,
            schedule,
        } => {
            let edit = ThemeEdit {
                name,
                description,
                keywords: keywords.as_deref().map(client_core::parse_keywords),
                schedule,
                status: None,
            };
            let updated = session.update_theme(&ThemeId::from(id), edit).await?;
            println!("Updated {}.", updated.name);
        }
        ThemeCommand::Activate { id } => session.activate_theme(&ThemeId::from(id)).await?,
        ThemeCommand::Stop { id } => {
            let stopped = session.stop_schedule(&ThemeId::from(id)).await?;
            println!("Stopped schedule for {}.", stopped.name);
        }
        ThemeCommand::Delete { id } => session.delete_theme(&ThemeId::from(id)).await?,
        ThemeCommand::BulkDelete { ids } => {
            let ids: Vec<ThemeId> = ids.into_iter().map(ThemeId::from).collect();
            session.delete_themes(&ids).await?;
        }
        ThemeCommand::Clear => session.clear_themes().await?,
    }
    print_themes(session, json).await;
    Ok(())
}

async fn print_themes(session: &ResearchSession, json: bool) {
    let themes = session.themes().themes().await;
    if json {
        print_json(&themes);
    } else {
        print!(
            "{}",
            render::theme_table(&themes, &session.themes().count_label().await)
        );
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(err) => eprintln!("failed to encode output: {err}"),
    }
}

fn print_notices(events: &mut broadcast::Receiver<ClientEvent>) -> usize {
    let mut printed = 0;
    while let Ok(event) = events.try_recv() {
        if let ClientEvent::Notice(notice) = event {
            eprintln!("{notice}");
            printed += 1;
        }
    }
    printed
}
