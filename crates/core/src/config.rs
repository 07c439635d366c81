use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParabensError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub whatsapp: WhatsAppConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `PARABENS_PROFILE`. When set (e.g. `PROD`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("PARABENS_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            database: DatabaseConfig::from_env_profiled(p),
            whatsapp: WhatsAppConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:    {}:{}", self.server.host, self.server.port);
        tracing::info!(
            "  database:  {}",
            if self.database.is_configured() { self.database.redacted_url() } else { "(memory)".to_string() }
        );
        tracing::info!(
            "  whatsapp:  mode={}, bridge={}",
            self.whatsapp.mode,
            self.whatsapp.bridge_url
        );
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HOST", "0.0.0.0"),
            port: profiled_env_u16(p, "PORT", 5000),
            cors_origin: profiled_env_or(p, "CORS_ORIGIN", "*"),
        }
    }
}

// ── Database ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL URL. Empty means the in-memory store is used.
    pub url: Option<String>,
    pub max_connections: u32,
}

impl DatabaseConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            url: profiled_env_opt(p, "DATABASE_URL"),
            max_connections: profiled_env_u32(p, "PG_MAX_CONNECTIONS", 20),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    /// Host part of the URL only; credentials never reach the logs.
    pub fn redacted_url(&self) -> String {
        match self.url.as_deref() {
            Some(url) => {
                let host = url.rsplit('@').next().unwrap_or(url);
                let host = host.split('/').next().unwrap_or(host);
                format!("postgres://***@{}", host)
            }
            None => String::new(),
        }
    }
}

// ── WhatsApp ──────────────────────────────────────────────────

/// Channel mode the process boots into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelMode {
    Simulated,
    Live,
}

impl fmt::Display for ChannelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelMode::Simulated => f.write_str("simulated"),
            ChannelMode::Live => f.write_str("live"),
        }
    }
}

impl FromStr for ChannelMode {
    type Err = ParabensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simulated" | "simulation" | "sim" => Ok(ChannelMode::Simulated),
            "live" | "real" => Ok(ChannelMode::Live),
            other => Err(ParabensError::UnknownVariant {
                kind: "channel mode",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    pub mode: ChannelMode,
    /// Base URL of the headless WhatsApp Web session bridge.
    pub bridge_url: String,
    pub poll_interval_ms: u64,
    /// Bound on each HTTP call to the bridge.
    pub request_timeout_ms: u64,
}

impl WhatsAppConfig {
    fn from_env_profiled(p: &str) -> Self {
        let raw_mode = profiled_env_or(p, "WHATSAPP_MODE", "simulated");
        let mode = raw_mode.parse().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to simulated WhatsApp mode");
            ChannelMode::Simulated
        });
        Self {
            mode,
            bridge_url: profiled_env_or(p, "WHATSAPP_BRIDGE_URL", "http://127.0.0.1:3100"),
            poll_interval_ms: profiled_env_u64(p, "WHATSAPP_POLL_INTERVAL_MS", 2000),
            request_timeout_ms: profiled_env_u64(p, "WHATSAPP_REQUEST_TIMEOUT_MS", 10_000),
        }
    }
}
