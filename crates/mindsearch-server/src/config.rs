use std::time::Duration;

use mindsearch_core::config::StreamConfig;

use crate::error::AppError;

/// Language the agent answers in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lang {
    #[default]
    Cn,
    En,
}

impl std::str::FromStr for Lang {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cn" => Ok(Self::Cn),
            "en" => Ok(Self::En),
            other => Err(AppError::Config(format!("unsupported language: '{other}'"))),
        }
    }
}

/// Language-model backend the agent is configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelFormat {
    #[default]
    InternlmServer,
    InternlmClient,
    InternlmHf,
    Gpt4,
    Qwen,
}

impl std::fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InternlmServer => write!(f, "internlm_server"),
            Self::InternlmClient => write!(f, "internlm_client"),
            Self::InternlmHf => write!(f, "internlm_hf"),
            Self::Gpt4 => write!(f, "gpt4"),
            Self::Qwen => write!(f, "qwen"),
        }
    }
}

impl std::str::FromStr for ModelFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "internlm_server" => Ok(Self::InternlmServer),
            "internlm_client" => Ok(Self::InternlmClient),
            "internlm_hf" => Ok(Self::InternlmHf),
            "gpt4" => Ok(Self::Gpt4),
            "qwen" => Ok(Self::Qwen),
            other => Err(AppError::Config(format!("unsupported model format: '{other}'"))),
        }
    }
}

/// Settings handed to the agent factory for every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AgentSettings {
    pub lang: Lang,
    pub model_format: ModelFormat,
}

/// Server configuration, read from `MINDSEARCH_*` environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: String,
    pub settings: AgentSettings,
    pub stream: StreamConfig,
    /// Pause between steps of the built-in demo agent.
    pub demo_delay: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8002".into(),
            settings: AgentSettings::default(),
            stream: StreamConfig::default(),
            demo_delay: Duration::from_millis(400),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("MINDSEARCH_ADDR") {
            config.addr = addr;
        }
        if let Some(lang) = lookup("MINDSEARCH_LANG") {
            config.settings.lang = lang.parse()?;
        }
        if let Some(format) = lookup("MINDSEARCH_MODEL_FORMAT") {
            config.settings.model_format = format.parse()?;
        }
        if let Some(secs) = lookup("MINDSEARCH_STEP_TIMEOUT_SECS") {
            let secs = parse_u64("MINDSEARCH_STEP_TIMEOUT_SECS", &secs)?;
            // 0 disables the timeout
            config.stream = if secs == 0 {
                config.stream.without_step_timeout()
            } else {
                config.stream.with_step_timeout(Duration::from_secs(secs))
            };
        }
        if let Some(ms) = lookup("MINDSEARCH_DEMO_DELAY_MS") {
            config.demo_delay = Duration::from_millis(parse_u64("MINDSEARCH_DEMO_DELAY_MS", &ms)?);
        }

        Ok(config)
    }
}

fn parse_u64(key: &str, value: &str) -> Result<u64, AppError> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::Config(format!("{key} must be a non-negative integer, got '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ServerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.addr, "0.0.0.0:8002");
        assert_eq!(config.settings.lang, Lang::Cn);
        assert_eq!(config.settings.model_format, ModelFormat::InternlmServer);
        assert_eq!(config.stream.step_timeout, Some(Duration::from_secs(300)));
    }

    #[test]
    fn reads_all_keys() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("MINDSEARCH_ADDR", "127.0.0.1:9000"),
            ("MINDSEARCH_LANG", "en"),
            ("MINDSEARCH_MODEL_FORMAT", "gpt4"),
            ("MINDSEARCH_STEP_TIMEOUT_SECS", "30"),
            ("MINDSEARCH_DEMO_DELAY_MS", "0"),
        ]))
        .unwrap();
        assert_eq!(config.addr, "127.0.0.1:9000");
        assert_eq!(config.settings.lang, Lang::En);
        assert_eq!(config.settings.model_format, ModelFormat::Gpt4);
        assert_eq!(config.stream.step_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.demo_delay, Duration::ZERO);
    }

    #[test]
    fn zero_step_timeout_disables_it() {
        let config =
            ServerConfig::from_lookup(lookup(&[("MINDSEARCH_STEP_TIMEOUT_SECS", "0")])).unwrap();
        assert!(config.stream.step_timeout.is_none());
    }

    #[test]
    fn rejects_unknown_model_format() {
        let err = ServerConfig::from_lookup(lookup(&[("MINDSEARCH_MODEL_FORMAT", "llama")]))
            .unwrap_err();
        assert!(err.to_string().contains("unsupported model format: 'llama'"));
    }

    #[test]
    fn rejects_bad_number() {
        let err = ServerConfig::from_lookup(lookup(&[("MINDSEARCH_DEMO_DELAY_MS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn model_format_display_matches_parse() {
        for name in ["internlm_server", "internlm_client", "internlm_hf", "gpt4", "qwen"] {
            let format: ModelFormat = name.parse().unwrap();
            assert_eq!(format.to_string(), name);
        }
    }
}
