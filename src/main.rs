use anyhow::Result;
use clap::Parser;
use serde_json::json;
use tracing::level_filters::LevelFilter;

use crewcast_cli::cli::{Cli, Commands, ProfileCommands, TelemetryCommands, command_label};
use crewcast_cli::config::{
    load_profiles, resolve_runtime_config, run_profiles_list, run_profiles_show,
};
use crewcast_cli::conflict::run_conflict_detection;
use crewcast_cli::doctor::run_doctor;
use crewcast_cli::error::{categorize_error, format_cli_error};
use crewcast_cli::podcast::{read_topic_interactive, run_podcast_script};
use crewcast_cli::telemetry::{TelemetrySink, run_telemetry_report};
use crewcast_cli::theme;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let show_sensitive_config = cli.show_sensitive_config;
    if let Err(err) = run_cli(cli).await {
        eprintln!("{}", format_cli_error(&err, show_sensitive_config));
        tracing::error!(category = %categorize_error(&err).code(), error = %err, "command failed");
        std::process::exit(1);
    }

    Ok(())
}

async fn run_cli(cli: Cli) -> Result<()> {
    init_tracing(&cli.log_filter)?;
    let profiles = load_profiles(&cli.config_path)?;
    let cfg = resolve_runtime_config(&cli, &profiles)?;
    let telemetry = TelemetrySink::new(&cfg, command_label(&cli.command));

    let result = dispatch(&cli, &cfg, &profiles, &telemetry).await;
    match &result {
        Ok(()) => telemetry.emit("command.completed", json!({})),
        Err(err) => telemetry.emit("command.failed", json!({ "error": err.to_string() })),
    }
    result
}

async fn dispatch(
    cli: &Cli,
    cfg: &crewcast_cli::config::RuntimeConfig,
    profiles: &crewcast_cli::config::ProfilesFile,
    telemetry: &TelemetrySink,
) -> Result<()> {
    match &cli.command {
        Commands::Detect { text } => {
            theme::print_startup_banner("detect");
            let text = text.join(" ");
            let answer = run_conflict_detection(cfg, telemetry, &text).await?;
            theme::print_result("Conflict analysis result", &answer);
        }
        Commands::Podcast { topic } => {
            theme::print_startup_banner("podcast");
            let topic = if topic.is_empty() {
                read_topic_interactive()?
            } else {
                topic.join(" ")
            };
            let script = run_podcast_script(cfg, telemetry, &topic).await?;
            theme::print_result("Podcast script", &script);
        }
        Commands::Doctor => {
            run_doctor(cfg)?;
        }
        Commands::Profiles { command } => match command {
            ProfileCommands::List => run_profiles_list(profiles, cfg)?,
            ProfileCommands::Show => run_profiles_show(cfg)?,
        },
        Commands::Telemetry { command } => match command {
            TelemetryCommands::Report { path, limit } => {
                run_telemetry_report(cfg, path.clone(), *limit)?
            }
        },
    }

    Ok(())
}

fn init_tracing(log_filter: &str) -> Result<()> {
    let level = log_filter
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_env_filter(log_filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {e}"))
}
