use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};

use mindsearch_core::agent::Agent;
use mindsearch_core::tree::TreeProjector;
use mindsearch_stream::controller::StreamController;

use crate::config::{AgentSettings, Lang, ServerConfig};
use crate::demo::DemoSearchAgent;
use crate::error::AppError;

/// Builds the agent for one request from the server settings and the
/// request's `agent_cfg`.
pub type AgentFactory = Arc<
    dyn Fn(&AgentSettings, &Map<String, Value>) -> Result<Arc<dyn Agent>, AppError> + Send + Sync,
>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub factory: AgentFactory,
    pub settings: AgentSettings,
    pub controller: Arc<StreamController>,
}

impl AppState {
    /// State serving the built-in demo agent.
    pub fn new(config: &ServerConfig) -> Self {
        let delay = config.demo_delay;
        Self::with_factory(config, demo_factory(delay))
    }

    /// Create with a custom agent factory (for testing).
    pub fn with_factory(config: &ServerConfig, factory: AgentFactory) -> Self {
        Self {
            factory,
            settings: config.settings,
            controller: Arc::new(StreamController::new(
                config.stream.clone(),
                TreeProjector::default(),
            )),
        }
    }

    pub fn build_agent(&self, agent_cfg: &Map<String, Value>) -> Result<Arc<dyn Agent>, AppError> {
        (self.factory)(&self.settings, agent_cfg)
    }
}

/// Factory for [`DemoSearchAgent`]. A `lang` key in `agent_cfg` overrides the
/// server language.
pub fn demo_factory(delay: Duration) -> AgentFactory {
    Arc::new(move |settings: &AgentSettings, agent_cfg: &Map<String, Value>| {
        demo_agent(settings, agent_cfg, delay)
    })
}

fn demo_agent(
    settings: &AgentSettings,
    agent_cfg: &Map<String, Value>,
    delay: Duration,
) -> Result<Arc<dyn Agent>, AppError> {
    let lang = match agent_cfg.get("lang").and_then(Value::as_str) {
        Some(lang) => lang
            .parse::<Lang>()
            .map_err(|_| AppError::BadRequest(format!("unsupported language: '{lang}'")))?,
        None => settings.lang,
    };
    Ok(Arc::new(DemoSearchAgent::new(lang, delay)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_demo_agent() {
        let state = AppState::new(&ServerConfig::default());
        let agent = state.build_agent(&Map::new()).unwrap();
        assert_eq!(agent.name(), "demo");
    }

    #[test]
    fn rejects_unknown_lang_override() {
        let state = AppState::new(&ServerConfig::default());
        let cfg = json!({"lang": "fr"}).as_object().cloned().unwrap();
        assert!(matches!(state.build_agent(&cfg), Err(AppError::BadRequest(_))));
    }
}
