use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::cli::{Cli, Provider};

pub const DEFAULT_DETECT_TEMPERATURE: f32 = 0.1;
pub const DEFAULT_PODCAST_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub profile: String,
    pub config_path: String,
    pub provider: Provider,
    pub model: Option<String>,
    pub detect_temperature: f32,
    pub podcast_temperature: f32,
    pub max_output_tokens: Option<u32>,
    pub search_max_results: usize,
    pub search_timeout_secs: u64,
    pub telemetry_enabled: bool,
    pub telemetry_path: String,
    pub show_sensitive_config: bool,
    pub max_input_chars: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfilesFile {
    #[serde(default)]
    pub profiles: HashMap<String, ProfileConfig>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileConfig {
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub detect_temperature: Option<f32>,
    pub podcast_temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub search_max_results: Option<usize>,
    pub search_timeout_secs: Option<u64>,
    pub telemetry_enabled: Option<bool>,
    pub telemetry_path: Option<String>,
}

pub fn load_profiles(config_path: &str) -> Result<ProfilesFile> {
    let path = Path::new(config_path);
    if !path.exists() {
        return Ok(ProfilesFile::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read profile config file at '{}'", path.display()))?;
    toml::from_str::<ProfilesFile>(&content).with_context(|| {
        format!(
            "invalid profile configuration in '{}'. Check provider values and field names.",
            path.display()
        )
    })
}

pub fn resolve_runtime_config(cli: &Cli, profiles: &ProfilesFile) -> Result<RuntimeConfig> {
    let selected = cli.profile.trim();
    if selected.is_empty() {
        return Err(anyhow::anyhow!(
            "profile name cannot be empty. Set --profile <name>."
        ));
    }

    let profile = if selected == "default" && !profiles.profiles.contains_key("default") {
        ProfileConfig::default()
    } else {
        profiles.profiles.get(selected).cloned().ok_or_else(|| {
            let mut names = profiles.profiles.keys().cloned().collect::<Vec<String>>();
            names.sort();
            if names.is_empty() {
                anyhow::anyhow!(
                    "profile '{}' not found in '{}'. No profiles are defined yet.",
                    selected,
                    cli.config_path
                )
            } else {
                anyhow::anyhow!(
                    "profile '{}' not found in '{}'. Available profiles: {}",
                    selected,
                    cli.config_path,
                    names.join(", ")
                )
            }
        })?
    };

    let provider = if cli.provider != Provider::Auto {
        cli.provider
    } else {
        profile.provider.unwrap_or(Provider::Auto)
    };

    // --temperature pins both pipelines for this invocation.
    let detect_temperature = cli
        .temperature
        .or(profile.detect_temperature)
        .unwrap_or(DEFAULT_DETECT_TEMPERATURE);
    let podcast_temperature = cli
        .temperature
        .or(profile.podcast_temperature)
        .unwrap_or(DEFAULT_PODCAST_TEMPERATURE);

    Ok(RuntimeConfig {
        profile: selected.to_string(),
        config_path: cli.config_path.clone(),
        provider,
        model: cli.model.clone().or(profile.model),
        detect_temperature,
        podcast_temperature,
        max_output_tokens: cli.max_output_tokens.or(profile.max_output_tokens),
        search_max_results: cli
            .search_max_results
            .or(profile.search_max_results)
            .unwrap_or(5)
            .max(1),
        search_timeout_secs: cli
            .search_timeout_secs
            .or(profile.search_timeout_secs)
            .unwrap_or(20)
            .max(1),
        telemetry_enabled: cli
            .telemetry_enabled
            .or(profile.telemetry_enabled)
            .unwrap_or(true),
        telemetry_path: cli
            .telemetry_path
            .clone()
            .or(profile.telemetry_path)
            .unwrap_or_else(|| ".crewcast/telemetry/events.jsonl".to_string()),
        show_sensitive_config: cli.show_sensitive_config,
        max_input_chars: 32_000,
    })
}

pub fn run_profiles_list(profiles: &ProfilesFile, cfg: &RuntimeConfig) -> Result<()> {
    let mut names = profiles.profiles.keys().cloned().collect::<Vec<String>>();
    if !names.iter().any(|name| name == "default") {
        names.push("default".to_string());
    }
    names.sort();

    println!("Configured profiles (active='{}'):", cfg.profile);
    for name in names {
        let marker = if name == cfg.profile { "*" } else { " " };
        let source = if profiles.profiles.contains_key(&name) {
            "configured"
        } else {
            "implicit"
        };
        println!("{marker} {name} ({source})");
    }

    Ok(())
}

pub fn run_profiles_show(cfg: &RuntimeConfig) -> Result<()> {
    println!("Active profile: {}", cfg.profile);
    println!("Config path: {}", cfg.config_path);
    println!("Provider: {:?}", cfg.provider);
    println!(
        "Model: {}",
        cfg.model.as_deref().unwrap_or("<provider-default>")
    );
    println!("Detect temperature: {}", cfg.detect_temperature);
    println!("Podcast temperature: {}", cfg.podcast_temperature);
    println!(
        "Max output tokens: {}",
        cfg.max_output_tokens
            .map(|value| value.to_string())
            .unwrap_or_else(|| "<provider-default>".to_string())
    );
    println!(
        "Search: max_results={}, timeout_secs={}",
        cfg.search_max_results, cfg.search_timeout_secs
    );
    println!(
        "Telemetry: enabled={} path={}",
        cfg.telemetry_enabled, cfg.telemetry_path
    );
    Ok(())
}
