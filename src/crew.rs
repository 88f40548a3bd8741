//! Crew runtime: agent personas, task descriptors, and sequential kickoff.
//!
//! A crew is a fixed list of tasks executed strictly in order. Each task is
//! owned by one agent; a task may list earlier tasks as context, in which
//! case their outputs are injected into its prompt. Agents may carry tools;
//! before the main completion the agent formulates a query for each tool and
//! the tool output is attached as evidence.

use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::json;
use tracing::info;

use crate::llm::{Llm, LlmRequest};
use crate::telemetry::TelemetrySink;
use crate::tools::Tool;

pub struct Agent {
    name: String,
    role: String,
    goal: String,
    backstory: String,
    tools: Vec<Arc<dyn Tool>>,
}

impl Agent {
    pub fn builder(name: impl Into<String>) -> AgentBuilder {
        AgentBuilder {
            name: name.into(),
            role: String::new(),
            goal: String::new(),
            backstory: String::new(),
            tools: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }
}

// Tool trait objects carry no Debug bound, so render them by name.
impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("goal", &self.goal)
            .field(
                "tools",
                &self.tools.iter().map(|tool| tool.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

pub struct AgentBuilder {
    name: String,
    role: String,
    goal: String,
    backstory: String,
    tools: Vec<Arc<dyn Tool>>,
}

impl AgentBuilder {
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    pub fn goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = goal.into();
        self
    }

    pub fn backstory(mut self, backstory: impl Into<String>) -> Self {
        self.backstory = backstory.into();
        self
    }

    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn build(self) -> Result<Arc<Agent>> {
        if self.name.trim().is_empty() {
            return Err(anyhow::anyhow!("agent name cannot be empty"));
        }
        if self.role.trim().is_empty() || self.goal.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "agent '{}' requires both a role and a goal",
                self.name
            ));
        }
        Ok(Arc::new(Agent {
            name: self.name,
            role: self.role,
            goal: self.goal,
            backstory: self.backstory,
            tools: self.tools,
        }))
    }
}

pub struct Task {
    name: String,
    description: String,
    expected_output: String,
    agent: Arc<Agent>,
    context: Vec<usize>,
}

impl Task {
    pub fn builder(name: impl Into<String>, agent: Arc<Agent>) -> TaskBuilder {
        TaskBuilder {
            name: name.into(),
            description: String::new(),
            expected_output: String::new(),
            agent,
            context: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn expected_output(&self) -> &str {
        &self.expected_output
    }

    pub fn agent(&self) -> &Arc<Agent> {
        &self.agent
    }

    /// Indices of earlier tasks whose outputs feed this task's prompt.
    pub fn context(&self) -> &[usize] {
        &self.context
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("agent", &self.agent)
            .field("context", &self.context)
            .finish()
    }
}

pub struct TaskBuilder {
    name: String,
    description: String,
    expected_output: String,
    agent: Arc<Agent>,
    context: Vec<usize>,
}

impl TaskBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn expected_output(mut self, expected_output: impl Into<String>) -> Self {
        self.expected_output = expected_output.into();
        self
    }

    pub fn context(mut self, task_index: usize) -> Self {
        self.context.push(task_index);
        self
    }

    pub fn build(self) -> Result<Task> {
        if self.description.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "task '{}' requires a description",
                self.name
            ));
        }
        Ok(Task {
            name: self.name,
            description: self.description,
            expected_output: self.expected_output,
            agent: self.agent,
            context: self.context,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TaskOutput {
    pub task: String,
    pub agent: String,
    pub raw: String,
}

#[derive(Debug, Clone)]
pub struct CrewOutput {
    pub task_outputs: Vec<TaskOutput>,
}

impl CrewOutput {
    /// The last task's output is the crew result.
    pub fn final_output(&self) -> &str {
        self.task_outputs
            .last()
            .map(|output| output.raw.as_str())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct ToolEvidence {
    pub tool: String,
    pub query: String,
    pub output: String,
}

pub struct Crew {
    name: String,
    tasks: Vec<Task>,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl Crew {
    pub fn new(name: impl Into<String>, tasks: Vec<Task>, temperature: f32) -> Result<Self> {
        let name = name.into();
        if tasks.is_empty() {
            return Err(anyhow::anyhow!("crew '{name}' has no tasks"));
        }
        for (index, task) in tasks.iter().enumerate() {
            for &dep in task.context() {
                if dep >= index {
                    return Err(anyhow::anyhow!(
                        "crew '{}': task '{}' references context task {} which does not run before it",
                        name,
                        task.name(),
                        dep
                    ));
                }
            }
        }
        Ok(Self {
            name,
            tasks,
            temperature,
            max_tokens: None,
        })
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Execute all tasks in order against the given model. One blocking
    /// completion per task, plus one query-formulation round per agent tool.
    pub async fn kickoff(
        &self,
        model: Arc<dyn Llm>,
        telemetry: &TelemetrySink,
    ) -> Result<CrewOutput> {
        telemetry.emit(
            "crew.kickoff",
            json!({ "crew": self.name, "tasks": self.tasks.len() }),
        );

        let mut task_outputs = Vec::<TaskOutput>::with_capacity(self.tasks.len());

        for task in &self.tasks {
            info!(crew = %self.name, task = %task.name(), agent = %task.agent().name(), "starting task");
            telemetry.emit(
                "task.started",
                json!({ "crew": self.name, "task": task.name(), "agent": task.agent().name() }),
            );

            let evidence = self
                .gather_tool_evidence(model.clone(), task, telemetry)
                .await?;

            let context_outputs = task
                .context()
                .iter()
                .map(|&dep| &task_outputs[dep])
                .collect::<Vec<&TaskOutput>>();

            let request = LlmRequest::user(compose_task_prompt(task, &context_outputs, &evidence))
                .with_system(compose_system_prompt(task.agent()))
                .with_temperature(self.temperature)
                .with_max_tokens(self.max_tokens);

            let response = model
                .generate(request)
                .await
                .with_context(|| format!("crew task '{}' failed", task.name()))?;

            let raw = response.content.trim().to_string();
            if raw.is_empty() {
                return Err(anyhow::anyhow!(
                    "crew task '{}' produced no textual model output",
                    task.name()
                ));
            }

            telemetry.emit(
                "task.completed",
                json!({
                    "crew": self.name,
                    "task": task.name(),
                    "agent": task.agent().name(),
                    "output_chars": raw.len()
                }),
            );

            task_outputs.push(TaskOutput {
                task: task.name().to_string(),
                agent: task.agent().name().to_string(),
                raw,
            });
        }

        Ok(CrewOutput { task_outputs })
    }

    async fn gather_tool_evidence(
        &self,
        model: Arc<dyn Llm>,
        task: &Task,
        telemetry: &TelemetrySink,
    ) -> Result<Vec<ToolEvidence>> {
        let mut evidence = Vec::new();

        for tool in task.agent().tools() {
            let query = formulate_query(model.clone(), task, tool.as_ref(), self.temperature)
                .await
                .with_context(|| {
                    format!(
                        "task '{}' could not formulate a query for tool '{}'",
                        task.name(),
                        tool.name()
                    )
                })?;

            telemetry.emit(
                "tool.requested",
                json!({ "task": task.name(), "tool": tool.name(), "query": query }),
            );

            match tool.call(&query).await {
                Ok(output) => {
                    info!(task = %task.name(), tool = %tool.name(), query = %query, "tool call succeeded");
                    telemetry.emit(
                        "tool.succeeded",
                        json!({ "task": task.name(), "tool": tool.name(), "output_chars": output.len() }),
                    );
                    evidence.push(ToolEvidence {
                        tool: tool.name().to_string(),
                        query,
                        output,
                    });
                }
                Err(err) => {
                    telemetry.emit(
                        "tool.failed",
                        json!({ "task": task.name(), "tool": tool.name(), "error": err.to_string() }),
                    );
                    return Err(err);
                }
            }
        }

        Ok(evidence)
    }
}

impl fmt::Debug for Crew {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crew")
            .field("name", &self.name)
            .field("tasks", &self.tasks)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

pub fn compose_system_prompt(agent: &Agent) -> String {
    let mut prompt = format!("You are {}.\n\nGoal: {}", agent.role, agent.goal);
    let backstory = agent.backstory.trim();
    if !backstory.is_empty() {
        prompt.push_str("\n\nBackstory:\n");
        prompt.push_str(backstory);
    }
    prompt
}

pub fn compose_task_prompt(
    task: &Task,
    context_outputs: &[&TaskOutput],
    evidence: &[ToolEvidence],
) -> String {
    let mut prompt = task.description().trim().to_string();

    if !context_outputs.is_empty() {
        prompt.push_str("\n\nContext from earlier tasks:");
        for output in context_outputs {
            prompt.push_str(&format!("\n\n[{} by {}]\n{}", output.task, output.agent, output.raw));
        }
    }

    for item in evidence {
        prompt.push_str(&format!(
            "\n\nTool output ({}) for query \"{}\":\n{}",
            item.tool, item.query, item.output
        ));
    }

    let expected = task.expected_output().trim();
    if !expected.is_empty() {
        prompt.push_str(&format!("\n\nExpected output: {expected}"));
    }

    prompt
}

fn compose_query_prompt(task: &Task, tool: &dyn Tool) -> String {
    format!(
        "You need to use the '{}' tool ({}) for the task below. Produce one concise \
         query for it. Respond with only the query text, nothing else.\n\nTask:\n{}",
        tool.name(),
        tool.description(),
        task.description().trim()
    )
}

async fn formulate_query(
    model: Arc<dyn Llm>,
    task: &Task,
    tool: &dyn Tool,
    temperature: f32,
) -> Result<String> {
    let request = LlmRequest::user(compose_query_prompt(task, tool))
        .with_system(compose_system_prompt(task.agent()))
        .with_temperature(temperature);

    let response = model.generate(request).await?;
    let query = response
        .content
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .trim_matches('"')
        .to_string();

    if query.is_empty() {
        return Err(anyhow::anyhow!("model returned an empty tool query"));
    }
    Ok(query)
}
