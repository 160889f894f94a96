//! Agent Configuration
//!
//! The relay talks to a closed set of four personas. Each one is a role,
//! goal and backstory bound to the single shared completion engine.

use crate::error::{Error, Result};
use crewrelay_llm::LlmProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Identifier of one of the four agents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgentId {
    /// System architect
    #[serde(rename = "Software Engineer")]
    SoftwareEngineer,
    /// UI/UX specialist
    #[serde(rename = "Frontend Developer")]
    FrontendDeveloper,
    /// API and database specialist
    #[serde(rename = "Backend Developer")]
    BackendDeveloper,
    /// Quality assurance specialist
    #[serde(rename = "QA Tester")]
    QaTester,
}

impl AgentId {
    /// Every agent, in pipeline order
    pub const ALL: [AgentId; 4] = [
        AgentId::SoftwareEngineer,
        AgentId::FrontendDeveloper,
        AgentId::BackendDeveloper,
        AgentId::QaTester,
    ];

    /// Wire name used by clients
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SoftwareEngineer => "Software Engineer",
            Self::FrontendDeveloper => "Frontend Developer",
            Self::BackendDeveloper => "Backend Developer",
            Self::QaTester => "QA Tester",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::SoftwareEngineer => 0,
            Self::FrontendDeveloper => 1,
            Self::BackendDeveloper => 2,
            Self::QaTester => 3,
        }
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        AgentId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| Error::UnknownAgent(s.to_string()))
    }
}

/// Agent persona
#[derive(Debug, Clone, Serialize)]
pub struct AgentConfig {
    /// Identifier
    pub id: AgentId,
    /// Role label
    pub role: String,
    /// What the agent is trying to achieve
    pub goal: String,
    /// Background used to flavor responses
    pub backstory: String,
}

impl AgentConfig {
    /// Create a new agent config
    pub fn new(
        id: AgentId,
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
    ) -> Self {
        Self {
            id,
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
        }
    }

    /// System instruction for direct chat
    #[must_use]
    pub fn chat_instruction(&self) -> String {
        format!(
            "You are {}, the team's {}. Respond to the following message in a helpful and professional manner.",
            self.id, self.role
        )
    }

    /// System instruction for pipeline tasks
    #[must_use]
    pub fn task_instruction(&self) -> String {
        format!(
            "You are {}, the team's {}.\n{}\n\nYour personal goal is: {}",
            self.id, self.role, self.backstory, self.goal
        )
    }
}

/// The four built-in personas
#[must_use]
pub fn default_agents() -> [AgentConfig; 4] {
    [
        AgentConfig::new(
            AgentId::SoftwareEngineer,
            "System Architect",
            "Design and maintain system architecture, create technical specifications, and provide expert guidance on software development",
            "Expert software architect with extensive experience in system design, microservices architecture, and cloud-native applications. Specialized in creating scalable and maintainable systems.",
        ),
        AgentConfig::new(
            AgentId::FrontendDeveloper,
            "UI/UX Expert",
            "Implement user interfaces, ensure responsive design, and optimize user experience",
            "Specialized in React, TypeScript, and modern frontend technologies. Expert in creating intuitive and accessible user interfaces with a focus on performance and user experience.",
        ),
        AgentConfig::new(
            AgentId::BackendDeveloper,
            "API and Database Expert",
            "Develop robust APIs, manage data flow, and ensure system reliability",
            "Expert in backend development, database management, and API design. Specialized in creating scalable and secure backend systems with focus on performance and maintainability.",
        ),
        AgentConfig::new(
            AgentId::QaTester,
            "Quality Assurance Expert",
            "Ensure software quality through comprehensive testing and validation",
            "Experienced in test automation, quality assurance, and software testing methodologies. Expert in identifying and preventing potential issues before they reach production.",
        ),
    ]
}

/// Immutable registry of agents plus the shared completion engine.
pub struct AgentRegistry {
    agents: [AgentConfig; 4],
    provider: Arc<dyn LlmProvider>,
}

impl AgentRegistry {
    /// Registry with the built-in personas
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            agents: default_agents(),
            provider,
        }
    }

    /// Registry with custom personas.
    ///
    /// # Errors
    /// Returns `Configuration` unless each agent appears exactly once in
    /// `AgentId::ALL` order.
    pub fn with_agents(agents: [AgentConfig; 4], provider: Arc<dyn LlmProvider>) -> Result<Self> {
        for (slot, agent) in agents.iter().enumerate() {
            if agent.id.index() != slot {
                return Err(Error::Configuration(format!(
                    "agent '{}' registered in slot {}",
                    agent.id, slot
                )));
            }
        }
        Ok(Self { agents, provider })
    }

    /// Configuration for a known agent
    #[must_use]
    pub fn get(&self, id: AgentId) -> &AgentConfig {
        &self.agents[id.index()]
    }

    /// Validate an external role string and return its configuration
    pub fn resolve(&self, role: &str) -> Result<&AgentConfig> {
        let id: AgentId = role.parse()?;
        Ok(self.get(id))
    }

    /// All agents in pipeline order
    pub fn iter(&self) -> impl Iterator<Item = &AgentConfig> {
        self.agents.iter()
    }

    /// Shared completion engine
    #[must_use]
    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }
}
