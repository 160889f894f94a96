//! Review Pipeline
//!
//! Four fixed tasks, one per agent, executed strictly in order. The review
//! payload is accepted but never inspected.
//!
//! Two modes exist. `DesignOnly` is the long-standing behavior: a review
//! runs the design task and nothing else. `FullPipeline` runs all four tasks
//! and joins their outputs. Which one a review should be is still open, so
//! the mode is configuration.

use crate::agents::{AgentId, AgentRegistry};
use crate::engine::{self, CompletionSettings};
use crate::error::{Error, Result};
use crewrelay_llm::Message;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// What a review executes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewMode {
    /// Run only the first (design) task
    #[default]
    DesignOnly,
    /// Run all four tasks and aggregate
    FullPipeline,
}

impl fmt::Display for ReviewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DesignOnly => f.write_str("design_only"),
            Self::FullPipeline => f.write_str("full_pipeline"),
        }
    }
}

impl FromStr for ReviewMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "design_only" => Ok(Self::DesignOnly),
            "full_pipeline" => Ok(Self::FullPipeline),
            other => Err(Error::Configuration(format!(
                "unknown review mode '{}' (expected design_only or full_pipeline)",
                other
            ))),
        }
    }
}

/// A canned task bound to one agent
#[derive(Debug, Clone, Serialize)]
pub struct PipelineTask {
    /// Short task name
    pub name: String,
    /// What the agent is asked to do
    pub description: String,
    /// What a good answer contains
    pub expected_output: String,
    /// Agent executing the task
    pub agent: AgentId,
}

impl PipelineTask {
    /// Create a new task
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        expected_output: impl Into<String>,
        agent: AgentId,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            expected_output: expected_output.into(),
            agent,
        }
    }

    fn prompt(&self) -> String {
        format!(
            "Current task: {}\n\nThis is the expected criteria for your final answer: {}",
            self.description, self.expected_output
        )
    }
}

/// The fixed review sequence: design, frontend, backend, testing
#[must_use]
pub fn default_tasks() -> Vec<PipelineTask> {
    vec![
        PipelineTask::new(
            "design",
            "Create system architecture and technical specifications. Consider scalability, maintainability, and best practices in software design.",
            "The overall system architecture and documented technical requirements.",
            AgentId::SoftwareEngineer,
        ),
        PipelineTask::new(
            "frontend",
            "Implement user interface components with focus on responsive design, accessibility, and optimal user experience. Ensure cross-browser compatibility.",
            "React components developed against the technical specifications.",
            AgentId::FrontendDeveloper,
        ),
        PipelineTask::new(
            "backend",
            "Develop API endpoints and database schema with emphasis on security, performance, and scalability. Implement proper error handling and logging.",
            "REST APIs and a data persistence design.",
            AgentId::BackendDeveloper,
        ),
        PipelineTask::new(
            "testing",
            "Create and execute comprehensive test cases covering unit tests, integration tests, and end-to-end testing. Ensure code quality and reliability.",
            "Automated tests for the frontend and backend components.",
            AgentId::QaTester,
        ),
    ]
}

/// Output of one executed task
#[derive(Debug, Clone, Serialize)]
pub struct StepOutput {
    /// Task name
    pub task: String,
    /// Agent that produced it
    pub agent: AgentId,
    /// Generated text
    pub output: String,
}

/// Result of a review
#[derive(Debug, Clone, Serialize)]
pub struct ReviewOutcome {
    /// Mode the review ran in
    pub mode: ReviewMode,
    /// Text returned to the client
    pub feedback: String,
    /// Every executed step, in order
    pub steps: Vec<StepOutput>,
}

/// Executes the review pipeline
pub struct PipelineRunner {
    registry: Arc<AgentRegistry>,
    tasks: Vec<PipelineTask>,
    mode: ReviewMode,
    settings: CompletionSettings,
}

impl PipelineRunner {
    /// Runner over the default four tasks
    pub fn new(registry: Arc<AgentRegistry>, mode: ReviewMode, settings: CompletionSettings) -> Self {
        Self {
            registry,
            tasks: default_tasks(),
            mode,
            settings,
        }
    }

    /// Configured mode
    #[must_use]
    pub fn mode(&self) -> ReviewMode {
        self.mode
    }

    /// Tasks in execution order
    #[must_use]
    pub fn tasks(&self) -> &[PipelineTask] {
        &self.tasks
    }

    /// Run a review. The payload only has to exist.
    ///
    /// Any failing task aborts the rest with `PipelineStepFailure`.
    #[instrument(skip(self, _payload), fields(mode = %self.mode))]
    pub async fn run_review(&self, _payload: &serde_json::Value) -> Result<ReviewOutcome> {
        let selected = match self.mode {
            ReviewMode::DesignOnly => &self.tasks[..1],
            ReviewMode::FullPipeline => &self.tasks[..],
        };

        let mut steps = Vec::with_capacity(selected.len());
        for task in selected {
            let output = self.execute(task).await.map_err(|e| {
                warn!(task = %task.name, error = %e, "Pipeline step failed, aborting review");
                Error::PipelineStepFailure {
                    step: task.name.clone(),
                    source: Box::new(e),
                }
            })?;
            steps.push(StepOutput {
                task: task.name.clone(),
                agent: task.agent,
                output,
            });
        }

        let feedback = match self.mode {
            ReviewMode::DesignOnly => steps[0].output.clone(),
            ReviewMode::FullPipeline => aggregate(&steps),
        };

        info!(steps = steps.len(), "Review completed");
        Ok(ReviewOutcome {
            mode: self.mode,
            feedback,
            steps,
        })
    }

    async fn execute(&self, task: &PipelineTask) -> Result<String> {
        let agent = self.registry.get(task.agent);
        let messages = vec![
            Message::system(agent.task_instruction()),
            Message::user(task.prompt()),
        ];
        engine::complete(self.registry.provider().as_ref(), &self.settings, messages).await
    }
}

fn aggregate(steps: &[StepOutput]) -> String {
    steps
        .iter()
        .map(|step| format!("## {} ({})\n\n{}", step.task, step.agent, step.output))
        .collect::<Vec<_>>()
        .join("\n\n")
}
