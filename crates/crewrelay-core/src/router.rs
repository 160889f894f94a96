//! Message Router
//!
//! Turns an inbound chat message into a completion request built from the
//! agent's instruction and prior turns, then records the exchange.

use crate::agents::{AgentId, AgentRegistry};
use crate::engine::{self, CompletionSettings};
use crate::error::Result;
use crate::session_manager::{ConversationSession, SessionStore, Speaker, Turn};
use crewrelay_llm::Message;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Routes chat messages to agents
pub struct MessageRouter {
    registry: Arc<AgentRegistry>,
    sessions: Arc<SessionStore>,
    settings: CompletionSettings,
}

impl MessageRouter {
    /// Create a router over a registry and session store
    pub fn new(
        registry: Arc<AgentRegistry>,
        sessions: Arc<SessionStore>,
        settings: CompletionSettings,
    ) -> Self {
        Self {
            registry,
            sessions,
            settings,
        }
    }

    /// Shared session store
    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Agent registry
    #[must_use]
    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    /// Route a message addressed by wire name.
    ///
    /// Unknown roles fail with `UnknownAgent` before any session is touched.
    pub async fn route_named(&self, role: &str, text: &str) -> Result<String> {
        let agent: AgentId = role.parse()?;
        self.route(agent, text).await
    }

    /// Send `text` to `agent` and return the generated reply.
    ///
    /// The agent's session stays locked for the whole exchange. On failure
    /// nothing is appended.
    #[instrument(skip(self, agent, text), fields(agent = %agent))]
    pub async fn route(&self, agent: AgentId, text: &str) -> Result<String> {
        let config = self.registry.get(agent);
        let mut session = self.sessions.lock(agent).await;

        let messages = build_prompt(&config.chat_instruction(), &session, text);
        let started = Instant::now();

        let reply = match engine::complete(
            self.registry.provider().as_ref(),
            &self.settings,
            messages,
        )
        .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, kind = e.kind(), "Chat completion failed");
                return Err(e);
            }
        };

        session.append(Turn::user(text));
        session.append(Turn::agent(reply.clone()));

        info!(
            turns = session.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Chat message routed"
        );
        Ok(reply)
    }
}

/// System instruction, then prior turns in arrival order, then the new input.
fn build_prompt(instruction: &str, session: &ConversationSession, input: &str) -> Vec<Message> {
    let mut messages = Vec::with_capacity(session.len() + 2);
    messages.push(Message::system(instruction));
    messages.extend(session.turns.iter().map(|turn| match turn.speaker {
        Speaker::User => Message::user(&turn.text),
        Speaker::Agent => Message::assistant(&turn.text),
    }));
    messages.push(Message::user(input));
    messages
}
