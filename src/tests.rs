use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;

use crate::cli::*;
use crate::config::*;
use crate::conflict::*;
use crate::crew::*;
use crate::error::*;
use crate::llm::mock::MockLlm;
use crate::llm::Llm;
use crate::podcast::*;
use crate::provider::*;
use crate::telemetry::*;
use crate::tools::Tool;

use tempfile::tempdir;

fn base_cfg() -> RuntimeConfig {
    RuntimeConfig {
        profile: "default".to_string(),
        config_path: ".crewcast/config.toml".to_string(),
        provider: Provider::Auto,
        model: None,
        detect_temperature: DEFAULT_DETECT_TEMPERATURE,
        podcast_temperature: DEFAULT_PODCAST_TEMPERATURE,
        max_output_tokens: None,
        search_max_results: 5,
        search_timeout_secs: 20,
        telemetry_enabled: false,
        telemetry_path: ".crewcast/test-telemetry.jsonl".to_string(),
        show_sensitive_config: false,
        max_input_chars: 32_000,
    }
}

fn test_telemetry(cfg: &RuntimeConfig) -> TelemetrySink {
    TelemetrySink::new(cfg, "test".to_string())
}

fn test_cli(config_path: &str, profile: &str) -> Cli {
    Cli {
        provider: Provider::Auto,
        model: None,
        profile: profile.to_string(),
        config_path: config_path.to_string(),
        temperature: None,
        max_output_tokens: None,
        search_max_results: None,
        search_timeout_secs: None,
        telemetry_enabled: None,
        telemetry_path: None,
        show_sensitive_config: false,
        log_filter: "error".to_string(),
        command: Commands::Doctor,
    }
}

struct RecordingTool {
    calls: Mutex<Vec<String>>,
    response: String,
}

impl RecordingTool {
    fn new(response: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            response: response.to_string(),
        })
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Tool for RecordingTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Searches the web using DuckDuckGo for the given query."
    }

    async fn call(&self, input: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(input.to_string());
        Ok(self.response.clone())
    }
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

#[test]
fn default_profile_resolves_without_config_file() {
    let cli = test_cli(".crewcast/missing.toml", "default");
    let profiles = ProfilesFile::default();
    let cfg = resolve_runtime_config(&cli, &profiles).expect("config should resolve");

    assert_eq!(cfg.profile, "default");
    assert_eq!(cfg.provider, Provider::Auto);
    assert_eq!(cfg.detect_temperature, DEFAULT_DETECT_TEMPERATURE);
    assert_eq!(cfg.podcast_temperature, DEFAULT_PODCAST_TEMPERATURE);
    assert_eq!(cfg.search_max_results, 5);
    assert!(cfg.telemetry_enabled);
}

#[test]
fn profile_values_apply_under_cli_overrides() {
    let dir = tempdir().expect("temp directory should create");
    let config_path = dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        r#"
[profiles.studio]
provider = "openai"
model = "gpt-4o-mini"
podcast_temperature = 0.9
search_max_results = 3
"#,
    )
    .expect("config should write");

    let config_path = config_path.to_string_lossy().to_string();
    let mut cli = test_cli(&config_path, "studio");
    let profiles = load_profiles(&config_path).expect("profiles should load");

    let cfg = resolve_runtime_config(&cli, &profiles).expect("config should resolve");
    assert_eq!(cfg.provider, Provider::Openai);
    assert_eq!(cfg.model.as_deref(), Some("gpt-4o-mini"));
    assert_eq!(cfg.podcast_temperature, 0.9);
    assert_eq!(cfg.search_max_results, 3);

    // CLI flags win over profile values.
    cli.provider = Provider::Gemini;
    cli.model = Some("gemini-1.5-flash".to_string());
    let cfg = resolve_runtime_config(&cli, &profiles).expect("config should resolve");
    assert_eq!(cfg.provider, Provider::Gemini);
    assert_eq!(cfg.model.as_deref(), Some("gemini-1.5-flash"));
}

#[test]
fn temperature_override_pins_both_pipelines() {
    let mut cli = test_cli(".crewcast/missing.toml", "default");
    cli.temperature = Some(0.3);

    let cfg = resolve_runtime_config(&cli, &ProfilesFile::default()).expect("config should resolve");
    assert_eq!(cfg.detect_temperature, 0.3);
    assert_eq!(cfg.podcast_temperature, 0.3);
}

#[test]
fn unknown_profile_lists_available_names() {
    let dir = tempdir().expect("temp directory should create");
    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, "[profiles.studio]\n[profiles.lab]\n")
        .expect("config should write");

    let config_path = config_path.to_string_lossy().to_string();
    let cli = test_cli(&config_path, "missing");
    let profiles = load_profiles(&config_path).expect("profiles should load");

    let err = resolve_runtime_config(&cli, &profiles).expect_err("unknown profile should fail");
    let msg = err.to_string();
    assert!(msg.contains("profile 'missing' not found"));
    assert!(msg.contains("lab, studio"));
}

#[test]
fn empty_profile_name_is_rejected() {
    let cli = test_cli(".crewcast/missing.toml", "  ");
    let err = resolve_runtime_config(&cli, &ProfilesFile::default())
        .expect_err("empty profile should fail");
    assert!(err.to_string().contains("profile name cannot be empty"));
}

#[test]
fn invalid_profile_file_surfaces_parse_context() {
    let dir = tempdir().expect("temp directory should create");
    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, "[profiles.studio]\nnot_a_field = true\n")
        .expect("config should write");

    let err = load_profiles(&config_path.to_string_lossy())
        .expect_err("unknown fields should be rejected");
    assert!(format!("{err:#}").contains("invalid profile configuration"));
}

// ---------------------------------------------------------------------------
// cli
// ---------------------------------------------------------------------------

#[test]
fn command_labels_are_stable() {
    assert_eq!(
        command_label(&Commands::Detect {
            text: vec!["hello".to_string()]
        }),
        "detect"
    );
    assert_eq!(command_label(&Commands::Podcast { topic: Vec::new() }), "podcast");
    assert_eq!(command_label(&Commands::Doctor), "doctor");
    assert_eq!(
        command_label(&Commands::Profiles {
            command: ProfileCommands::Show
        }),
        "profiles.show"
    );
    assert_eq!(
        command_label(&Commands::Telemetry {
            command: TelemetryCommands::Report {
                path: None,
                limit: 10
            }
        }),
        "telemetry.report"
    );
}

#[test]
fn detect_requires_text_argument() {
    let err = Cli::try_parse_from(["crewcast-cli", "detect"]).expect_err("missing text should fail");
    assert!(err.to_string().contains("TEXT"));
}

#[test]
fn podcast_topic_argument_is_optional() {
    let cli = Cli::try_parse_from(["crewcast-cli", "podcast"]).expect("podcast should parse");
    match cli.command {
        Commands::Podcast { topic } => assert!(topic.is_empty()),
        other => panic!("expected podcast command, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// error
// ---------------------------------------------------------------------------

#[test]
fn error_categories_follow_message_content() {
    let provider = anyhow::anyhow!("GOOGLE_API_KEY is required for Gemini provider");
    assert_eq!(categorize_error(&provider), ErrorCategory::Provider);

    let input = anyhow::anyhow!("no topic provided. Supply a topic argument.");
    assert_eq!(categorize_error(&input), ErrorCategory::Input);

    let search = anyhow::anyhow!("web search request failed");
    assert_eq!(categorize_error(&search), ErrorCategory::Search);

    let crew = anyhow::anyhow!("crew task 'script_writing' produced no textual model output");
    assert_eq!(categorize_error(&crew), ErrorCategory::Crew);

    let internal = anyhow::anyhow!("something unexpected broke");
    assert_eq!(categorize_error(&internal), ErrorCategory::Internal);
}

#[test]
fn format_cli_error_includes_code_and_hint() {
    let err = anyhow::anyhow!("OPENAI_API_KEY is required for OpenAI provider");
    let formatted = format_cli_error(&err, false);
    assert!(formatted.starts_with("[PROVIDER]"));
    assert!(formatted.contains("Hint:"));
}

#[test]
fn key_query_params_are_redacted() {
    let text = "Gemini request failed: https://example.com/v1?key=super-secret&x=1 (status 400)";
    let redacted = redact_key_params(text);
    assert!(!redacted.contains("super-secret"));
    assert!(redacted.contains("key=[REDACTED]&x=1"));
}

#[test]
fn sensitive_config_flag_controls_redaction() {
    let err = anyhow::anyhow!("request to https://api?key=abc123 failed");
    assert!(!render_error_message(&err, false).contains("abc123"));
    assert!(render_error_message(&err, true).contains("abc123"));
}

// ---------------------------------------------------------------------------
// provider
// ---------------------------------------------------------------------------

#[test]
fn model_prefix_validation_per_provider() {
    assert!(validate_model_for_provider(Provider::Gemini, "gemini-1.5-flash").is_ok());
    assert!(validate_model_for_provider(Provider::Openai, "gpt-4o-mini").is_ok());
    assert!(validate_model_for_provider(Provider::Openai, "o3-mini").is_ok());
    assert!(validate_model_for_provider(Provider::Auto, "anything").is_ok());
    assert!(validate_model_for_provider(Provider::Gemini, "gpt-4o-mini").is_err());
    assert!(validate_model_for_provider(Provider::Openai, "gemini-1.5-flash").is_err());
}

#[test]
fn missing_gemini_credential_fails_naming_the_variable() {
    let mut cfg = base_cfg();
    cfg.provider = Provider::Gemini;
    unsafe {
        std::env::remove_var("GOOGLE_API_KEY");
    }

    // Fails during resolution, before any client or request is built.
    let err = match resolve_model(&cfg) {
        Err(err) => err,
        Ok(_) => panic!("missing credential should fail"),
    };
    assert!(format!("{err:#}").contains("GOOGLE_API_KEY"));
    assert_eq!(categorize_error(&err), ErrorCategory::Provider);
}

#[test]
fn env_present_ignores_blank_values() {
    // Unique variable names keep this safe under parallel test execution.
    unsafe {
        std::env::set_var("CREWCAST_TEST_ENV_SET", "value");
        std::env::set_var("CREWCAST_TEST_ENV_BLANK", "   ");
    }
    assert!(env_present("CREWCAST_TEST_ENV_SET"));
    assert!(!env_present("CREWCAST_TEST_ENV_BLANK"));
    assert!(!env_present("CREWCAST_TEST_ENV_UNSET"));
}

// ---------------------------------------------------------------------------
// crew
// ---------------------------------------------------------------------------

#[test]
fn agent_builder_requires_role_and_goal() {
    let err = Agent::builder("nameless")
        .goal("do something")
        .build()
        .expect_err("missing role should fail");
    assert!(err.to_string().contains("requires both a role and a goal"));
}

#[test]
fn task_builder_requires_description() {
    let agent = Agent::builder("helper")
        .role("a helper")
        .goal("help")
        .build()
        .expect("agent should build");
    let err = Task::builder("empty", agent)
        .build()
        .expect_err("missing description should fail");
    assert!(err.to_string().contains("requires a description"));
}

#[test]
fn crew_rejects_forward_context_references() {
    let agent = Agent::builder("helper")
        .role("a helper")
        .goal("help")
        .build()
        .expect("agent should build");

    let first = Task::builder("first", agent.clone())
        .description("first task")
        .context(1)
        .build()
        .expect("task should build");
    let second = Task::builder("second", agent)
        .description("second task")
        .build()
        .expect("task should build");

    let err = Crew::new("bad", vec![first, second], 0.5).expect_err("forward context should fail");
    assert!(err.to_string().contains("does not run before it"));
}

#[test]
fn crew_rejects_empty_task_list() {
    let err = Crew::new("empty", Vec::new(), 0.5).expect_err("empty crew should fail");
    assert!(err.to_string().contains("has no tasks"));
}

#[test]
fn crew_debug_output_names_agents_tasks_and_tools() {
    let cfg = base_cfg();
    let tool = RecordingTool::new("results");
    let crew = build_podcast_crew(&cfg, "topic", tool).expect("crew should build");

    let rendered = format!("{crew:?}");
    assert!(rendered.contains("podcast_production"));
    assert!(rendered.contains("topic_research"));
    assert!(rendered.contains("research_specialist"));
    assert!(rendered.contains("web_search"));
}

#[test]
fn system_prompt_carries_persona() {
    let agent = Agent::builder("critic")
        .role("an expert critical thinker")
        .goal("find contradictions")
        .backstory("Years of experience in logic.")
        .build()
        .expect("agent should build");

    let prompt = compose_system_prompt(&agent);
    assert!(prompt.starts_with("You are an expert critical thinker."));
    assert!(prompt.contains("Goal: find contradictions"));
    assert!(prompt.contains("Backstory:\nYears of experience in logic."));
}

#[test]
fn task_prompt_injects_context_evidence_and_expected_output() {
    let agent = Agent::builder("writer")
        .role("a writer")
        .goal("write")
        .build()
        .expect("agent should build");
    let task = Task::builder("script_writing", agent)
        .description("Write the script.")
        .expected_output("A complete script.")
        .build()
        .expect("task should build");

    let context = TaskOutput {
        task: "topic_research".to_string(),
        agent: "research_specialist".to_string(),
        raw: "RESEARCH NOTES".to_string(),
    };
    let evidence = ToolEvidence {
        tool: "web_search".to_string(),
        query: "lighthouse history".to_string(),
        output: "Lighthouses guide mariners.".to_string(),
    };

    let prompt = compose_task_prompt(&task, &[&context], &[evidence]);
    assert!(prompt.starts_with("Write the script."));
    assert!(prompt.contains("[topic_research by research_specialist]\nRESEARCH NOTES"));
    assert!(prompt.contains("Tool output (web_search) for query \"lighthouse history\""));
    assert!(prompt.contains("Expected output: A complete script."));
}

#[tokio::test]
async fn single_task_kickoff_returns_trimmed_model_output() {
    let cfg = base_cfg();
    let telemetry = test_telemetry(&cfg);
    let crew = build_conflict_crew(&cfg, "It's sunny, take an umbrella.").expect("crew should build");
    let mock = Arc::new(MockLlm::new("mock").with_response("  conflict\n"));

    let output = crew
        .kickoff(mock.clone() as Arc<dyn Llm>, &telemetry)
        .await
        .expect("kickoff should run");

    assert_eq!(output.final_output(), "conflict");
    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].temperature, Some(DEFAULT_DETECT_TEMPERATURE));
    assert!(
        requests[0]
            .system_prompt
            .as_deref()
            .unwrap_or_default()
            .contains("You are an expert critical thinker")
    );
}

#[tokio::test]
async fn empty_model_output_fails_the_task() {
    let cfg = base_cfg();
    let telemetry = test_telemetry(&cfg);
    let crew = build_conflict_crew(&cfg, "some text").expect("crew should build");
    let mock = Arc::new(MockLlm::new("mock").with_response("   \n"));

    let err = crew
        .kickoff(mock as Arc<dyn Llm>, &telemetry)
        .await
        .expect_err("blank output should fail");
    assert!(err.to_string().contains("no textual model output"));
}

#[tokio::test]
async fn podcast_kickoff_chains_research_into_script_task() {
    let cfg = base_cfg();
    let telemetry = test_telemetry(&cfg);
    let tool = RecordingTool::new("Lighthouses guide mariners at night.");
    let crew = build_podcast_crew(&cfg, "lighthouses", tool.clone())
        .expect("crew should build");

    // Scripted rounds: query formulation, research output, final script.
    let mock = Arc::new(MockLlm::new("mock").with_responses([
        "lighthouse history",
        "RESEARCH NOTES",
        "FINAL SCRIPT",
    ]));

    let output = crew
        .kickoff(mock.clone() as Arc<dyn Llm>, &telemetry)
        .await
        .expect("kickoff should run");

    assert_eq!(output.final_output(), "FINAL SCRIPT");
    assert_eq!(output.task_outputs.len(), 2);
    assert_eq!(output.task_outputs[0].raw, "RESEARCH NOTES");

    // The tool ran with the model-formulated query.
    assert_eq!(tool.calls(), vec!["lighthouse history".to_string()]);

    let requests = mock.requests();
    assert_eq!(requests.len(), 3);
    // Research round carries the tool evidence.
    assert!(requests[1].messages[0]
        .content
        .contains("Tool output (web_search) for query \"lighthouse history\""));
    assert!(requests[1].messages[0]
        .content
        .contains("Lighthouses guide mariners at night."));
    // Script round carries the research output as context.
    assert!(requests[2].messages[0]
        .content
        .contains("[topic_research by research_specialist]\nRESEARCH NOTES"));
    assert_eq!(requests[2].temperature, Some(DEFAULT_PODCAST_TEMPERATURE));
}

#[tokio::test]
async fn tool_query_strips_quotes_and_extra_lines() {
    let cfg = base_cfg();
    let telemetry = test_telemetry(&cfg);
    let tool = RecordingTool::new("results");
    let crew = build_podcast_crew(&cfg, "topic", tool.clone()).expect("crew should build");

    let mock = Arc::new(MockLlm::new("mock").with_responses([
        "\"quoted query\"\nsecond line ignored",
        "research",
        "script",
    ]));

    crew.kickoff(mock as Arc<dyn Llm>, &telemetry)
        .await
        .expect("kickoff should run");
    assert_eq!(tool.calls(), vec!["quoted query".to_string()]);
}

// ---------------------------------------------------------------------------
// conflict pipeline
// ---------------------------------------------------------------------------

#[test]
fn conflict_crew_is_a_single_task_with_the_input_text() {
    let cfg = base_cfg();
    let crew =
        build_conflict_crew(&cfg, "The sky is green. The sky is blue.").expect("crew should build");

    assert_eq!(crew.name(), "conflict_detection");
    assert_eq!(crew.tasks().len(), 1);
    assert_eq!(crew.temperature(), DEFAULT_DETECT_TEMPERATURE);

    let task = &crew.tasks()[0];
    assert_eq!(task.agent().name(), "critical_thinker");
    assert!(task.agent().tools().is_empty());
    assert!(task.context().is_empty());
    assert!(task.description().contains("The sky is green. The sky is blue."));
    assert!(task.expected_output().contains("'conflict' / 'no conflict'"));
}

#[test]
fn input_text_validation_rejects_empty_and_oversized() {
    let mut cfg = base_cfg();
    assert!(validate_input_text(&cfg, "fine").is_ok());

    let err = validate_input_text(&cfg, "   ").expect_err("empty text should fail");
    assert!(err.to_string().contains("input text cannot be empty"));

    cfg.max_input_chars = 8;
    let err = validate_input_text(&cfg, "far too long for the limit")
        .expect_err("oversized text should fail");
    assert!(err.to_string().contains("too long"));
}

// ---------------------------------------------------------------------------
// podcast pipeline
// ---------------------------------------------------------------------------

#[test]
fn empty_topic_short_circuits_before_crew_construction() {
    let err = validate_topic("   ").expect_err("empty topic should fail");
    assert!(err.to_string().contains("no topic provided"));
    assert_eq!(categorize_error(&err), ErrorCategory::Input);

    assert_eq!(validate_topic(" lighthouses ").expect("topic should pass"), "lighthouses");
}

#[test]
fn podcast_crew_wires_research_output_into_script_task() {
    let cfg = base_cfg();
    let tool = RecordingTool::new("results");
    let crew = build_podcast_crew(&cfg, "lighthouses", tool).expect("crew should build");

    assert_eq!(crew.name(), "podcast_production");
    assert_eq!(crew.tasks().len(), 2);
    assert_eq!(crew.temperature(), DEFAULT_PODCAST_TEMPERATURE);

    let research = &crew.tasks()[RESEARCH_TASK_INDEX];
    assert_eq!(research.agent().name(), "research_specialist");
    assert_eq!(research.agent().tools().len(), 1);
    assert_eq!(research.agent().tools()[0].name(), "web_search");
    assert!(research.description().contains("Research the topic \"lighthouses\""));
    assert!(research.context().is_empty());

    let script = &crew.tasks()[SCRIPT_TASK_INDEX];
    assert_eq!(script.agent().name(), "podcast_script_writer");
    assert!(script.agent().tools().is_empty());
    assert_eq!(script.context(), &[RESEARCH_TASK_INDEX]);
    assert!(script.description().contains("Style guidelines"));
    assert!(script.description().contains("750-1500 words"));
}

// ---------------------------------------------------------------------------
// telemetry
// ---------------------------------------------------------------------------

#[test]
fn telemetry_sink_appends_jsonl_records() {
    let dir = tempdir().expect("temp directory should create");
    let path = dir.path().join("telemetry/events.jsonl");

    let mut cfg = base_cfg();
    cfg.telemetry_enabled = true;
    cfg.telemetry_path = path.to_string_lossy().to_string();

    let sink = TelemetrySink::new(&cfg, "detect".to_string());
    sink.emit("task.started", serde_json::json!({ "task": "conflict_analysis" }));
    sink.emit("command.completed", serde_json::json!({}));

    let content = std::fs::read_to_string(&path).expect("telemetry file should exist");
    let lines = content.lines().collect::<Vec<&str>>();
    assert_eq!(lines.len(), 2);

    let first: serde_json::Value = serde_json::from_str(lines[0]).expect("line should parse");
    assert_eq!(first["event"], "task.started");
    assert_eq!(first["command"], "detect");
    assert_eq!(first["task"], "conflict_analysis");
    assert!(first["run_id"].as_str().unwrap_or_default().starts_with("run-"));
}

#[test]
fn disabled_telemetry_sink_writes_nothing() {
    let dir = tempdir().expect("temp directory should create");
    let path = dir.path().join("events.jsonl");

    let mut cfg = base_cfg();
    cfg.telemetry_path = path.to_string_lossy().to_string();

    let sink = TelemetrySink::new(&cfg, "detect".to_string());
    sink.emit("task.started", serde_json::json!({}));
    assert!(!path.exists());
}

#[test]
fn telemetry_summary_counts_lifecycle_events() {
    let lines = vec![
        r#"{"ts_unix_ms": 100, "event": "task.started", "run_id": "run-1", "command": "podcast"}"#
            .to_string(),
        r#"{"ts_unix_ms": 200, "event": "tool.succeeded", "run_id": "run-1", "command": "podcast"}"#
            .to_string(),
        r#"{"ts_unix_ms": 300, "event": "task.completed", "run_id": "run-1", "command": "podcast"}"#
            .to_string(),
        r#"{"ts_unix_ms": 400, "event": "command.completed", "run_id": "run-2", "command": "detect"}"#
            .to_string(),
        "not json".to_string(),
    ];

    let summary = summarize_telemetry_lines(lines, 100);
    assert_eq!(summary.total_lines, 5);
    assert_eq!(summary.parsed_events, 4);
    assert_eq!(summary.parse_errors, 1);
    assert_eq!(summary.unique_runs.len(), 2);
    assert_eq!(summary.tasks_started, 1);
    assert_eq!(summary.tasks_completed, 1);
    assert_eq!(summary.tool_succeeded, 1);
    assert_eq!(summary.command_completed, 1);
    assert_eq!(summary.command_counts.get("podcast"), Some(&3));
    assert_eq!(summary.last_event_ts_unix_ms, Some(400));
}
