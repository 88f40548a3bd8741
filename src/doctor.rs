use anyhow::Result;

use crate::config::RuntimeConfig;
use crate::provider::{detect_provider, env_present};

pub fn run_doctor(cfg: &RuntimeConfig) -> Result<()> {
    println!(
        "Active profile: '{}' (config: {})",
        cfg.profile, cfg.config_path
    );

    let checks = [
        ("GOOGLE_API_KEY", env_present("GOOGLE_API_KEY")),
        ("OPENAI_API_KEY", env_present("OPENAI_API_KEY")),
    ];

    println!("Provider environment check:");
    for (key, ok) in checks {
        let status = if ok { "set" } else { "missing" };
        println!("- {key}: {status}");
    }

    match detect_provider() {
        Some(provider) => println!("Auto provider resolution: {provider:?}"),
        None => {
            println!("Auto provider resolution: none");
            println!("Tip: export GOOGLE_API_KEY or OPENAI_API_KEY");
        }
    }

    println!(
        "Model: {} (provider: {:?})",
        cfg.model.as_deref().unwrap_or("<provider-default>"),
        cfg.provider
    );
    println!(
        "Sampling: detect_temperature={} podcast_temperature={} max_output_tokens={}",
        cfg.detect_temperature,
        cfg.podcast_temperature,
        cfg.max_output_tokens
            .map(|value| value.to_string())
            .unwrap_or_else(|| "<provider-default>".to_string())
    );
    println!(
        "Search: max_results={} timeout_secs={}",
        cfg.search_max_results, cfg.search_timeout_secs
    );
    println!(
        "Telemetry: enabled={} path={}",
        cfg.telemetry_enabled, cfg.telemetry_path
    );

    Ok(())
}
