//! Configuration parsing for the bridge
//!
//! Every setting can be supplied either as a command-line flag or through the environment
//! (a `.env` file in the working directory is loaded by `main` before parsing). The parsed
//! [`Config`] is immutable and shared with the handlers through [`crate::AppState`].
use clap::{Parser, ValueEnum};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Base URL of the Ollama server requests are relayed to.
    #[arg(long, env = "OLLAMA_URL", default_value = "http://localhost:11434")]
    pub backend_url: Url,

    /// Model reported in logs when a chat request does not name one.
    #[arg(long, env = "OLLAMA_MODEL", default_value = "llama3.2")]
    pub model: String,

    /// The port on which the bridge will listen.
    #[arg(short = 'p', long, env = "BRIDGE_PORT", default_value_t = 5001)]
    pub port: u16,

    /// Seconds to wait for the backend model listing (health probe, /api/tags, /v1/models).
    #[arg(long, env = "BRIDGE_PROBE_TIMEOUT_SECS", default_value_t = 5)]
    pub probe_timeout_secs: u64,

    /// Seconds to wait for a chat completion from the backend.
    #[arg(long, env = "BRIDGE_CHAT_TIMEOUT_SECS", default_value_t = 120)]
    pub chat_timeout_secs: u64,

    /// Log output format.
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Whether to serve prometheus metrics on a separate port.
    #[arg(short = 'm', long, env = "BRIDGE_METRICS", default_value_t = false)]
    pub metrics: bool,

    /// The port on which the metrics server will listen.
    #[arg(long, default_value_t = 9090)]
    pub metrics_port: u16,

    /// The prefix to use for metrics.
    #[arg(long, default_value = "kaede_bridge")]
    pub metrics_prefix: String,

    /// Maximum number of idle connections to keep alive to the backend.
    #[arg(long, default_value_t = 100)]
    pub pool_max_idle_per_host: usize,

    /// How long (in seconds) to keep idle backend connections alive.
    #[arg(long, default_value_t = 90)]
    pub pool_idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl Config {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn chat_timeout(&self) -> Duration {
        Duration::from_secs(self.chat_timeout_secs)
    }

    pub fn pool_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_idle_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let config = Config::parse_from([
            "kaede-bridge",
            "--backend-url",
            "http://gpu-box:11434",
            "--model",
            "mistral",
            "-p",
            "8080",
            "--chat-timeout-secs",
            "30",
            "--log-format",
            "json",
        ]);

        assert_eq!(config.backend_url.as_str(), "http://gpu-box:11434/");
        assert_eq!(config.model, "mistral");
        assert_eq!(config.port, 8080);
        assert_eq!(config.chat_timeout(), Duration::from_secs(30));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_port_must_be_numeric() {
        let result = Config::try_parse_from(["kaede-bridge", "--port", "not-a-port"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_backend_url_must_parse() {
        let result = Config::try_parse_from(["kaede-bridge", "--backend-url", "://nope"]);
        assert!(result.is_err());
    }
}
