use clap::Parser;
use owo_colors::{OwoColorize, Style};
use timeblock_core::db;
use timeblock_core::error::CoreError;
use timeblock_core::models::TaskStatus;
use timeblock_core::planner::Planner;
use timeblock_core::repository::SqliteRepository;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod parser;
mod timezone;
mod util;
mod views;

use commands::Session;
use config::Config;

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    let config = Config::new().unwrap_or_else(|e| {
        eprintln!("{} ignoring invalid configuration: {}", "Warning:".yellow().bold(), e);
        Config::default()
    });
    init_tracing(&config);
    tracing::debug!(?config, "loaded configuration");

    if let Err(e) = run(cli, config).await {
        handle_error(e);
        std::process::exit(1);
    }
}

async fn run(cli: cli::Cli, config: Config) -> anyhow::Result<()> {
    let tz = timezone::resolve_timezone(&config.timezone)?;
    let pool = db::establish_connection(&config.database_path).await?;
    let planner = Planner::new(SqliteRepository::new(pool), config.materialization.clone());
    let session = Session {
        owner_id: config.owner_id,
        tz,
        insights: config.insights,
    };

    match cli.command {
        cli::Commands::Add(command) => commands::add::add_block(&planner, &session, command).await,
        cli::Commands::Start(command) => {
            commands::status::change_status(&planner, &session, command, TaskStatus::Active).await
        }
        cli::Commands::Done(command) => {
            commands::status::change_status(&planner, &session, command, TaskStatus::Completed).await
        }
        cli::Commands::Skip(command) => {
            commands::status::change_status(&planner, &session, command, TaskStatus::Skipped).await
        }
        cli::Commands::Reflect(command) => commands::reflect::reflect(&planner, &session, command).await,
        cli::Commands::Edit(command) => commands::edit::edit_block(&planner, &session, command).await,
        cli::Commands::Day(command) => commands::day::show_day(&planner, &session, command).await,
        cli::Commands::Week(command) => commands::agenda::show_week(&planner, &session, command).await,
        cli::Commands::Month(command) => commands::agenda::show_month(&planner, &session, command).await,
        cli::Commands::Insights(command) => commands::insights::show_insights(&planner, &session, command).await,
        cli::Commands::Category(command) => {
            commands::category::category_command(&planner, &session, command).await
        }
        cli::Commands::Template(command) => {
            commands::template::template_command(&planner, &session, command).await
        }
    }
}

fn handle_error(err: anyhow::Error) {
    let error_style = Style::new().red().bold();

    match err.downcast_ref::<CoreError>() {
        Some(CoreError::AmbiguousId(candidates)) => {
            eprintln!("{}", "Error: Ambiguous ID.".style(error_style));
            eprintln!("Did you mean one of these?");
            for (id, title) in candidates {
                eprintln!("  {} ({})", id.yellow(), title);
            }
        }
        Some(CoreError::StateTransitionRejected { from, to }) => {
            eprintln!(
                "{} A {} block cannot become {}",
                "Error:".style(error_style),
                from.yellow(),
                to.yellow()
            );
            if from.is_terminal() {
                eprintln!("  {} {} blocks are closed; add a new block instead", "•".bright_black(), from);
            }
        }
        Some(CoreError::InvalidStateForReflection(status)) => {
            eprintln!(
                "{} Only completed blocks can be reflected on (this one is {})",
                "Error:".style(error_style),
                status.yellow()
            );
        }
        Some(CoreError::InvalidInterval(s)) => {
            eprintln!("{} Invalid interval: {}", "Error:".style(error_style), s);
        }
        Some(CoreError::Database(e)) => {
            eprintln!("{} Database error: {}", "Error:".style(error_style), e);
        }
        Some(core_error) => eprintln!("{} {}", "Error:".style(error_style), core_error),
        None => eprintln!("{} {:#}", "Error:".style(error_style), err),
    }
}
