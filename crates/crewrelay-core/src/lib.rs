//! Crewrelay Core - Relay Engine
//!
//! This crate holds everything between the socket and the completion engine:
//! - Agents: the closed set of personas and their registry
//! - Sessions: per-agent conversation history with per-agent locking
//! - Router: prompt building and the timed completion call for chat
//! - Pipeline: the fixed four-task review sequence
//! - Event bus: broadcast of relay events for observers
//! - Shutdown: coordinated graceful shutdown

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod agents;
pub mod engine;
pub mod error;
pub mod event_bus;
pub mod pipeline;
pub mod router;
pub mod session_manager;
pub mod shutdown;

pub use agents::{default_agents, AgentConfig, AgentId, AgentRegistry};
pub use engine::CompletionSettings;
pub use error::{Error, Result};
pub use event_bus::{EventBus, RelayEvent};
pub use pipeline::{default_tasks, PipelineRunner, PipelineTask, ReviewMode, ReviewOutcome, StepOutput};
pub use router::MessageRouter;
pub use session_manager::{ConversationSession, SessionGuard, SessionStore, Speaker, Turn};
pub use shutdown::{shutdown_signal_with_controller, ShutdownController, ShutdownPhase, TaskGuard};
