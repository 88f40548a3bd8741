//! Conflict detection pipeline: a single Critical Thinker agent classifies a
//! text as 'conflict' or 'no conflict'.

use anyhow::Result;
use serde_json::json;

use crate::config::RuntimeConfig;
use crate::crew::{Agent, Crew, Task};
use crate::provider::resolve_model;
use crate::telemetry::TelemetrySink;
use crate::theme;

pub fn build_conflict_crew(cfg: &RuntimeConfig, text: &str) -> Result<Crew> {
    let agent = Agent::builder("critical_thinker")
        .role("an expert critical thinker")
        .goal("Analyse the text and identify if any conflicting information within")
        .backstory(
            "You are an expert critical thinker with exceptional analytical skills. \
             Your specialty is identifying contradictions, inconsistencies, and conflicting \
             statements within text. You have years of experience in logic, reasoning, \
             and fact-checking. You approach every text with a methodical mindset, \
             carefully examining each statement for potential conflicts with other \
             statements in the same text.",
        )
        .build()?;

    let analysis = Task::builder("conflict_analysis", agent)
        .description(format!(
            "Find if there are any conflicting statement / information in text.\n\
             \n\
             Text to analyze:\n\
             {text}\n\
             \n\
             Instructions:\n\
             1. Read the entire text carefully\n\
             2. Identify all factual statements and claims\n\
             3. Look for contradictions, inconsistencies, or conflicting information\n\
             4. Determine if any statements contradict each other\n\
             5. Provide your final answer as either 'conflict' or 'no conflict'"
        ))
        .expected_output("Respond with 'conflict' / 'no conflict'")
        .build()?;

    Crew::new("conflict_detection", vec![analysis], cfg.detect_temperature)
        .map(|crew| crew.with_max_tokens(cfg.max_output_tokens))
}

pub fn validate_input_text(cfg: &RuntimeConfig, text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(anyhow::anyhow!("input text cannot be empty"));
    }
    if text.len() > cfg.max_input_chars {
        return Err(anyhow::anyhow!(
            "input text is too long ({} chars, limit {})",
            text.len(),
            cfg.max_input_chars
        ));
    }
    Ok(())
}

pub async fn run_conflict_detection(
    cfg: &RuntimeConfig,
    telemetry: &TelemetrySink,
    text: &str,
) -> Result<String> {
    validate_input_text(cfg, text)?;

    theme::print_stage("Resolving model");
    let (model, provider, model_name) = resolve_model(cfg)?;
    telemetry.emit(
        "model.resolved",
        json!({
            "provider": format!("{provider:?}").to_ascii_lowercase(),
            "model": model_name,
            "path": "detect"
        }),
    );

    theme::print_stage("Assembling crew");
    let crew = build_conflict_crew(cfg, text)?;

    theme::print_stage("Starting conflict analysis");
    let output = crew.kickoff(model, telemetry).await?;
    Ok(output.final_output().to_string())
}
