//! Connection construction. The orchestrator receives a factory at
//! session-construction time and never branches on the backend itself.

use crate::config::{AgentBackend, Config};
use crate::instructions::build_instructions;
use anyhow::{Context, Result};
use mensetsu_core::{AgentRole, END_MARKER, PatternConfig};
use mensetsu_realtime::{
    AgentConnection, ConnectionConfig, OpenAiConnection, ScriptedConfig, ScriptedConnection,
};
use std::collections::HashMap;
use std::sync::Arc;

pub trait ConnectionFactory: Send + Sync {
    fn create(&self, role: AgentRole, pattern: &PatternConfig) -> Result<Box<dyn AgentConnection>>;
}

/// Builds live OpenAI realtime connections, one per agent role.
pub struct OpenAiFactory {
    api_key: String,
    model: String,
}

impl OpenAiFactory {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    fn voice_for(role: AgentRole) -> &'static str {
        match role {
            AgentRole::Interviewer => "alloy",
            AgentRole::Candidate => "verse",
        }
    }
}

impl ConnectionFactory for OpenAiFactory {
    fn create(&self, role: AgentRole, pattern: &PatternConfig) -> Result<Box<dyn AgentConnection>> {
        let config = ConnectionConfig::new(
            self.api_key.clone(),
            build_instructions(role, pattern),
        )
        .with_model(self.model.clone())
        .with_voice(Self::voice_for(role));
        Ok(Box::new(OpenAiConnection::new(config)))
    }
}

/// Builds deterministic scripted connections from per-role line lists.
pub struct ScriptedFactory {
    scripts: HashMap<AgentRole, Vec<String>>,
    config: ScriptedConfig,
}

impl ScriptedFactory {
    pub fn new(interviewer: Vec<String>, candidate: Vec<String>) -> Self {
        let mut scripts = HashMap::new();
        scripts.insert(AgentRole::Interviewer, interviewer);
        scripts.insert(AgentRole::Candidate, candidate);
        Self {
            scripts,
            config: ScriptedConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ScriptedConfig) -> Self {
        self.config = config;
        self
    }

    /// Built-in demo scripts so `AGENT_BACKEND=scripted` works out of the
    /// box for local runs.
    pub fn demo() -> Self {
        Self::new(
            vec![
                "Welcome, thanks for joining us today. Could you introduce yourself?".to_string(),
                "Interesting. What would you say is your biggest strength?".to_string(),
                format!("That covers everything I wanted to ask. Thank you! {END_MARKER}"),
            ],
            vec![
                "Of course. I am a backend engineer with five years of experience.".to_string(),
                "I stay calm under pressure and communicate clearly.".to_string(),
            ],
        )
    }
}

impl ConnectionFactory for ScriptedFactory {
    fn create(&self, role: AgentRole, _pattern: &PatternConfig) -> Result<Box<dyn AgentConnection>> {
        let script = self
            .scripts
            .get(&role)
            .with_context(|| format!("no script configured for role {role}"))?
            .clone();
        Ok(Box::new(ScriptedConnection::with_config(
            script,
            self.config.clone(),
        )))
    }
}

/// Selects the factory the service runs with.
pub fn factory_from_config(config: &Config) -> Result<Arc<dyn ConnectionFactory>> {
    match config.backend {
        AgentBackend::OpenAi => {
            let api_key = config
                .openai_api_key
                .clone()
                .context("openai backend selected but no api key configured")?;
            Ok(Arc::new(OpenAiFactory::new(
                api_key,
                config.realtime_model.clone(),
            )))
        }
        AgentBackend::Scripted => Ok(Arc::new(ScriptedFactory::demo())),
    }
}
