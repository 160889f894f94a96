//! `crewrelay agents`

use anyhow::{Context, Result};
use crewrelay_core::{default_agents, default_tasks, AgentConfig};

/// Print the registry
pub fn run(json: bool) -> Result<()> {
    let agents = default_agents();
    if json {
        let out = serde_json::to_string_pretty(&agents).context("Failed to serialize agents")?;
        println!("{}", out);
    } else {
        print!("{}", render(&agents));
    }
    Ok(())
}

fn render(agents: &[AgentConfig]) -> String {
    let tasks = default_tasks();
    let mut out = String::new();
    for agent in agents {
        out.push_str(&format!("{} ({})\n", agent.id, agent.role));
        out.push_str(&format!("  goal: {}\n", agent.goal));
        if let Some(task) = tasks.iter().find(|t| t.agent == agent.id) {
            out.push_str(&format!("  review task: {}\n", task.name));
        }
    }
    out
}
