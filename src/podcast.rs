//! Podcast pipeline: a Research Specialist with a web-search tool feeds a
//! Podcast Script Writer. The research task's output is wired as context
//! into the script-writing task.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::json;

use crate::config::RuntimeConfig;
use crate::crew::{Agent, Crew, Task};
use crate::provider::resolve_model;
use crate::telemetry::TelemetrySink;
use crate::theme;
use crate::tools::Tool;
use crate::tools::web_search::DuckDuckGoSearchTool;

pub const RESEARCH_TASK_INDEX: usize = 0;
pub const SCRIPT_TASK_INDEX: usize = 1;

pub fn validate_topic(topic: &str) -> Result<String> {
    let trimmed = topic.trim();
    if trimmed.is_empty() {
        return Err(anyhow::anyhow!(
            "no topic provided. Supply a topic argument or enter one at the prompt."
        ));
    }
    Ok(trimmed.to_string())
}

pub fn read_topic_interactive() -> Result<String> {
    print!("Enter the topic for your podcast script: ");
    io::stdout().flush().context("failed to flush stdout")?;

    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("failed to read input from stdin")?;
    Ok(line.trim().to_string())
}

pub fn build_podcast_crew(
    cfg: &RuntimeConfig,
    topic: &str,
    search_tool: Arc<dyn Tool>,
) -> Result<Crew> {
    let researcher = Agent::builder("research_specialist")
        .role("an experienced research specialist")
        .goal("Gather comprehensive and accurate information about the given topic from web sources")
        .backstory(
            "You are an experienced research specialist with expertise in finding reliable \
             information quickly and efficiently. You excel at synthesizing multiple sources \
             into coherent summaries that capture the most important and interesting aspects \
             of any topic. Your research forms the foundation for engaging content creation.",
        )
        .tool(search_tool)
        .build()?;

    let script_writer = Agent::builder("podcast_script_writer")
        .role("a talented podcast script writer")
        .goal("Transform research content into an engaging, humorous, and conversational podcast script")
        .backstory(
            "You are a talented podcast script writer known for your wit, humor, and ability \
             to make any topic entertaining. You excel at creating conversational content that \
             feels like a friend telling you an interesting story over coffee. Your scripts \
             are filled with personality, occasional jokes, fun observations, and engaging \
             storytelling techniques that keep listeners hooked from start to finish.",
        )
        .build()?;

    let research = Task::builder("topic_research", researcher)
        .description(format!(
            "Research the topic \"{topic}\" thoroughly using web search capabilities.\n\
             \n\
             Your research should include:\n\
             1. Key facts and background information\n\
             2. Interesting stories, anecdotes, or case studies\n\
             3. Recent developments or news\n\
             4. Fun facts or surprising details\n\
             5. Different perspectives or controversies (if any)\n\
             \n\
             Compile your findings into a comprehensive research summary that provides \
             rich material for creating an engaging podcast script.\n\
             \n\
             Topic to research: {topic}"
        ))
        .expected_output(
            "A well-structured research summary containing key facts and background \
             information, interesting stories and anecdotes, recent developments, fun \
             facts and surprising details, and multiple perspectives on the topic.",
        )
        .build()?;

    let script = Task::builder("script_writing", script_writer)
        .description(
            "Using the research provided, create an engaging and humorous podcast script.\n\
             \n\
             The script should:\n\
             1. Start with an attention-grabbing hook\n\
             2. Present information in a conversational, storytelling format\n\
             3. Include humor, wit, and entertaining commentary\n\
             4. Use a friendly, accessible tone (like talking to a friend)\n\
             5. Add transitions and personality throughout\n\
             6. Include occasional jokes, observations, or funny comparisons\n\
             7. End with a memorable conclusion\n\
             \n\
             Style guidelines:\n\
             - Write as if you're a charismatic podcast host\n\
             - Use \"we\", \"you\", and conversational language\n\
             - Add parenthetical stage directions for emphasis: (dramatic pause), (chuckles), etc.\n\
             - Include rhetorical questions to engage the audience\n\
             - Make it feel spontaneous and natural, not scripted\n\
             \n\
             Length: Aim for a 5-10 minute podcast segment (approximately 750-1500 words).",
        )
        .expected_output(
            "A complete podcast script with a clear intro hook, conversational narrative \
             flow, humorous commentary, natural transitions, a memorable conclusion, and \
             stage directions in parentheses.",
        )
        .context(RESEARCH_TASK_INDEX)
        .build()?;

    Crew::new(
        "podcast_production",
        vec![research, script],
        cfg.podcast_temperature,
    )
    .map(|crew| crew.with_max_tokens(cfg.max_output_tokens))
}

pub async fn run_podcast_script(
    cfg: &RuntimeConfig,
    telemetry: &TelemetrySink,
    topic: &str,
) -> Result<String> {
    // Topic check comes first: an empty topic must short-circuit before any
    // provider resolution or agent/task construction.
    let topic = validate_topic(topic)?;
    if topic.len() > cfg.max_input_chars {
        return Err(anyhow::anyhow!(
            "input text is too long ({} chars, limit {})",
            topic.len(),
            cfg.max_input_chars
        ));
    }

    theme::print_stage("Resolving model");
    let (model, provider, model_name) = resolve_model(cfg)?;
    telemetry.emit(
        "model.resolved",
        json!({
            "provider": format!("{provider:?}").to_ascii_lowercase(),
            "model": model_name,
            "path": "podcast"
        }),
    );

    theme::print_stage("Assembling the podcast production crew");
    let search_tool = Arc::new(DuckDuckGoSearchTool::new(
        cfg.search_timeout_secs,
        cfg.search_max_results,
    )?);
    let crew = build_podcast_crew(cfg, &topic, search_tool)?;

    theme::print_stage(&format!("Starting podcast script creation for '{topic}'"));
    let output = crew.kickoff(model, telemetry).await?;
    Ok(output.final_output().to_string())
}
