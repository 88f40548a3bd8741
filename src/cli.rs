use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Auto,
    Gemini,
    Openai,
}

#[derive(Debug, Subcommand)]
pub enum ProfileCommands {
    #[command(about = "List configured profiles and highlight the active profile")]
    List,
    #[command(about = "Show the active profile's resolved runtime settings")]
    Show,
}

#[derive(Debug, Subcommand)]
pub enum TelemetryCommands {
    #[command(about = "Summarize telemetry events from a JSONL stream")]
    Report {
        #[arg(long)]
        path: Option<String>,
        #[arg(long, default_value_t = 5000)]
        limit: usize,
    },
}

const CLI_EXAMPLES: &str = "Examples:\n\
  crewcast-cli detect \"It's a sunny day, let me take an umbrella to the office.\"\n\
  crewcast-cli --provider gemini podcast \"The history of lighthouses\"\n\
  crewcast-cli --provider openai --model gpt-4o-mini podcast\n\
  crewcast-cli --temperature 0.3 detect \"Water boils at 100C. Water never boils.\"\n\
  crewcast-cli doctor\n\
  crewcast-cli profiles list\n\
  crewcast-cli telemetry report --limit 2000\n\
\n\
Switching behavior:\n\
  - Use --provider/--model to switch runtime model selection per invocation.\n\
  - Use --profile <name> to load provider/model/search defaults from .crewcast/config.toml.";

#[derive(Debug, Parser)]
#[command(name = "crewcast-cli")]
#[command(about = "Crew-style multi-agent LLM pipelines for conflict detection and podcast scripting")]
#[command(after_long_help = CLI_EXAMPLES)]
pub struct Cli {
    #[arg(long, env = "CREWCAST_PROVIDER", value_enum, default_value_t = Provider::Auto)]
    pub provider: Provider,

    #[arg(long, env = "CREWCAST_MODEL")]
    pub model: Option<String>,

    #[arg(long, env = "CREWCAST_PROFILE", default_value = "default")]
    pub profile: String,

    #[arg(long, env = "CREWCAST_CONFIG", default_value = ".crewcast/config.toml")]
    pub config_path: String,

    /// Override the per-pipeline sampling temperature for this invocation.
    #[arg(long, env = "CREWCAST_TEMPERATURE")]
    pub temperature: Option<f32>,

    #[arg(long, env = "CREWCAST_MAX_OUTPUT_TOKENS")]
    pub max_output_tokens: Option<u32>,

    #[arg(long, env = "CREWCAST_SEARCH_MAX_RESULTS")]
    pub search_max_results: Option<usize>,

    #[arg(long, env = "CREWCAST_SEARCH_TIMEOUT_SECS")]
    pub search_timeout_secs: Option<u64>,

    #[arg(long, env = "CREWCAST_TELEMETRY_ENABLED", action = clap::ArgAction::Set)]
    pub telemetry_enabled: Option<bool>,

    #[arg(long, env = "CREWCAST_TELEMETRY_PATH")]
    pub telemetry_path: Option<String>,

    #[arg(long, env = "CREWCAST_SHOW_SENSITIVE_CONFIG", default_value_t = false)]
    pub show_sensitive_config: bool,

    #[arg(long, env = "RUST_LOG", default_value = "error")]
    pub log_filter: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Classify a text as containing conflicting statements or not")]
    Detect {
        #[arg(required = true)]
        text: Vec<String>,
    },
    #[command(about = "Research a topic on the web and draft a podcast script")]
    Podcast {
        /// Topic to research. Prompts on stdin when omitted.
        topic: Vec<String>,
    },
    #[command(about = "Validate provider environment and resolved configuration")]
    Doctor,
    #[command(about = "Inspect profile configuration and active resolved profile state")]
    Profiles {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    #[command(about = "Telemetry utilities and reporting")]
    Telemetry {
        #[command(subcommand)]
        command: TelemetryCommands,
    },
}

pub fn command_label(command: &Commands) -> String {
    match command {
        Commands::Detect { .. } => "detect".to_string(),
        Commands::Podcast { .. } => "podcast".to_string(),
        Commands::Doctor => "doctor".to_string(),
        Commands::Profiles { command } => match command {
            ProfileCommands::List => "profiles.list".to_string(),
            ProfileCommands::Show => "profiles.show".to_string(),
        },
        Commands::Telemetry { command } => match command {
            TelemetryCommands::Report { .. } => "telemetry.report".to_string(),
        },
    }
}
