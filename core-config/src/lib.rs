// =====================================================================================
// File: core-config/src/lib.rs
// Description: Centralized configuration management for the Rapid100 triage platform
// Author: arkSong (arksong2018@gmail.com)
// =====================================================================================

pub mod environment;

pub use config::ConfigError;
pub use environment::Environment;

use config::{Config, Environment as EnvSource, File};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::info;

/// Application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub triage: TriageConfig,
    pub llm: LlmConfig,
    pub broadcast: BroadcastConfig,
    pub session: SessionConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    /// Hard deadline for any webhook response, milliseconds
    pub request_deadline_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: u64,
    pub idle_timeout: u64,
    /// Transient write failures retry up to this many attempts
    pub write_retries: u32,
}

/// Which classification backend the orchestrator runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Rule,
    Llm,
    Hybrid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageConfig {
    pub backend: BackendKind,
    /// Backend service/priority suggestions override the routing table only
    /// at or above this confidence
    pub min_confidence: f32,
    /// Severity score thresholds for LEVEL_1 / LEVEL_2 / LEVEL_3
    pub severity_critical: f32,
    pub severity_high: f32,
    pub severity_moderate: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub host: String,
    pub model: String,
    pub temperature: f32,
    /// Hard deadline for one model call, milliseconds
    pub deadline_ms: u64,
    /// Issue a throwaway generation at boot so the first call is warm
    pub warmup: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    pub enabled: bool,
    /// Bounded ring capacity; slow subscribers past this lag are dropped
    pub channel_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Inactive sessions are evicted after this many seconds
    pub ttl_seconds: i64,
    /// Seconds the provider waits for speech in a gather
    pub speech_timeout_seconds: u32,
    /// Too-short first utterances re-prompt at most this many times
    pub max_reprompts: u8,
    /// Unclear follow-up answers re-ask at most this many times
    pub max_reasks: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub service_name: String,
    pub metrics_enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                workers: None,
                request_deadline_ms: 4_000,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/rapid100".to_string(),
                max_connections: 10,
                min_connections: 1,
                connect_timeout: 30,
                idle_timeout: 600,
                write_retries: 3,
            },
            triage: TriageConfig {
                backend: BackendKind::Rule,
                min_confidence: 0.7,
                severity_critical: 80.0,
                severity_high: 60.0,
                severity_moderate: 40.0,
            },
            llm: LlmConfig {
                host: "http://localhost:11434".to_string(),
                model: "qwen2.5:0.5b".to_string(),
                temperature: 0.1,
                deadline_ms: 3_000,
                warmup: true,
            },
            broadcast: BroadcastConfig {
                enabled: true,
                channel_capacity: 256,
            },
            session: SessionConfig {
                ttl_seconds: 600,
                speech_timeout_seconds: 5,
                max_reprompts: 2,
                max_reasks: 2,
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                service_name: "rapid100-voice".to_string(),
                metrics_enabled: true,
            },
        }
    }
}

/// Configuration loader with environment override support
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from files and environment variables.
    ///
    /// Precedence, lowest first: built-in defaults, `config/{run_mode}.toml`,
    /// `config/local.toml`, `RAPID__*` structured variables, and finally the
    /// flat deployment variables (`HTTP_PORT`, `D_LLM_MS`, `BACKEND`, ...).
    pub fn load() -> Result<AppConfig, ConfigError> {
        let run_mode = Environment::current();

        info!("Loading configuration for environment: {:?}", run_mode);

        let config = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(
                File::with_name(&format!("config/{}", run_mode.config_file_name())).required(false),
            )
            .add_source(File::with_name("config/local").required(false))
            .add_source(EnvSource::with_prefix("RAPID").separator("__"))
            .build()?;

        let mut app_config: AppConfig = config.try_deserialize()?;
        Self::apply_flat_overrides(&mut app_config)?;
        Self::validate_config(&app_config)?;

        info!("Configuration loaded successfully");
        Ok(app_config)
    }

    /// Apply the flat environment names used by deployments
    fn apply_flat_overrides(config: &mut AppConfig) -> Result<(), ConfigError> {
        if let Ok(port) = env::var("HTTP_PORT") {
            config.server.port = parse_var("HTTP_PORT", &port)?;
        }
        if let Ok(ms) = env::var("D_HTTP_MS") {
            config.server.request_deadline_ms = parse_var("D_HTTP_MS", &ms)?;
        }
        if let Ok(url) = env::var("DB_URL") {
            config.database.url = url;
        }
        if let Ok(backend) = env::var("BACKEND") {
            config.triage.backend = match backend.to_lowercase().as_str() {
                "rule" => BackendKind::Rule,
                "llm" => BackendKind::Llm,
                "hybrid" => BackendKind::Hybrid,
                other => {
                    return Err(ConfigError::Message(format!(
                        "BACKEND must be rule, llm, or hybrid (got '{}')",
                        other
                    )))
                }
            };
        }
        if let Ok(confidence) = env::var("MIN_CONFIDENCE") {
            config.triage.min_confidence = parse_var("MIN_CONFIDENCE", &confidence)?;
        }
        if let Ok(thresholds) = env::var("SEVERITY_THRESHOLDS") {
            // Quadruple "critical,high,moderate,low"; the low bound is always 0
            let parts: Vec<&str> = thresholds.split(',').map(str::trim).collect();
            if parts.len() != 4 {
                return Err(ConfigError::Message(
                    "SEVERITY_THRESHOLDS must be four comma-separated numbers".to_string(),
                ));
            }
            config.triage.severity_critical = parse_var("SEVERITY_THRESHOLDS", parts[0])?;
            config.triage.severity_high = parse_var("SEVERITY_THRESHOLDS", parts[1])?;
            config.triage.severity_moderate = parse_var("SEVERITY_THRESHOLDS", parts[2])?;
        }
        if let Ok(host) = env::var("LLM_HOST") {
            config.llm.host = host;
        }
        if let Ok(model) = env::var("LLM_MODEL") {
            config.llm.model = model;
        }
        if let Ok(ms) = env::var("D_LLM_MS") {
            config.llm.deadline_ms = parse_var("D_LLM_MS", &ms)?;
        }
        if let Ok(enabled) = env::var("BROADCAST_ENABLED") {
            config.broadcast.enabled = matches!(enabled.to_lowercase().as_str(), "true" | "1" | "yes");
        }
        if let Ok(ttl) = env::var("SESSION_TTL_S") {
            config.session.ttl_seconds = parse_var("SESSION_TTL_S", &ttl)?;
        }
        if let Ok(timeout) = env::var("SPEECH_TIMEOUT_S") {
            config.session.speech_timeout_seconds = parse_var("SPEECH_TIMEOUT_S", &timeout)?;
        }
        Ok(())
    }

    /// Validate critical configuration values
    fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
        if config.database.url.is_empty() {
            return Err(ConfigError::Message("Database URL cannot be empty".to_string()));
        }
        if !(0.0..=1.0).contains(&config.triage.min_confidence) {
            return Err(ConfigError::Message(
                "MIN_CONFIDENCE must be within [0,1]".to_string(),
            ));
        }
        let t = &config.triage;
        if !(t.severity_critical > t.severity_high && t.severity_high > t.severity_moderate) {
            return Err(ConfigError::Message(
                "Severity thresholds must be strictly descending".to_string(),
            ));
        }
        if config.llm.deadline_ms == 0 || config.server.request_deadline_ms == 0 {
            return Err(ConfigError::Message("Deadlines must be positive".to_string()));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, ConfigError> {
    raw.parse()
        .map_err(|_| ConfigError::Message(format!("Invalid value for {}: '{}'", name, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_contract() {
        let config = AppConfig::default();
        assert_eq!(config.server.request_deadline_ms, 4_000);
        assert_eq!(config.llm.deadline_ms, 3_000);
        assert_eq!(config.triage.backend, BackendKind::Rule);
        assert_eq!(config.triage.min_confidence, 0.7);
        assert_eq!(config.session.ttl_seconds, 600);
        assert_eq!(config.session.max_reprompts, 2);
        assert_eq!(config.session.max_reasks, 2);
    }

    #[test]
    fn test_default_config_validates() {
        assert!(ConfigLoader::validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_threshold_order_enforced() {
        let mut config = AppConfig::default();
        config.triage.severity_high = 90.0;
        assert!(ConfigLoader::validate_config(&config).is_err());
    }

    #[test]
    fn test_backend_kind_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&BackendKind::Hybrid).unwrap(), "\"hybrid\"");
    }
}
