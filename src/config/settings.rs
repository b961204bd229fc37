use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub fcm: FcmConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub otel: OtelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

/// Directory store connection. Without a URL the service runs against an
/// empty in-memory directory.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u32,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u32,
}

/// Firebase Cloud Messaging transport settings.
///
/// Credentials are looked up in order: inline JSON, explicit path, default path.
#[derive(Debug, Clone, Deserialize)]
pub struct FcmConfig {
    /// Overrides the project id found in the service account
    pub project_id: Option<String>,
    pub service_account_json: Option<String>,
    pub service_account_path: Option<String>,
    #[serde(default = "default_credentials_path")]
    pub default_credentials_path: String,
    #[serde(default = "default_fcm_endpoint")]
    pub endpoint: String,
    /// Upper bound on in-flight sends during a multicast
    #[serde(default = "default_max_concurrent_sends")]
    pub max_concurrent_sends: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seconds between "non-subscribed users" campaign runs
    #[serde(default = "default_notifier_interval")]
    pub notifier_interval_seconds: u64,
    /// Seconds between liveness self-pings
    #[serde(default = "default_self_ping_interval")]
    pub self_ping_interval_seconds: u64,
    #[serde(default = "default_self_ping_timeout")]
    pub self_ping_timeout_seconds: u64,
    /// Externally reachable health URL; falls back to localhost
    pub self_ping_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_otel_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
    /// Emit logs as JSON lines instead of human-readable text
    #[serde(default)]
    pub json_logs: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_pool_size() -> u32 {
    10
}

fn default_connect_timeout() -> u32 {
    5
}

fn default_idle_timeout() -> u32 {
    300
}

fn default_credentials_path() -> String {
    "config/firebase-service-account.json".to_string()
}

fn default_fcm_endpoint() -> String {
    "https://fcm.googleapis.com".to_string()
}

fn default_max_concurrent_sends() -> usize {
    100
}

fn default_true() -> bool {
    true
}

fn default_notifier_interval() -> u64 {
    1800 // 30 minutes
}

fn default_self_ping_interval() -> u64 {
    600 // 10 minutes
}

fn default_self_ping_timeout() -> u64 {
    10
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "push-dispatch-service".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("scheduler.enabled", true)?
            .set_default("scheduler.notifier_interval_seconds", 1800)?
            .set_default("scheduler.self_ping_interval_seconds", 600)?
            .set_default("scheduler.self_ping_timeout_seconds", 10)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // SERVER__PORT, DATABASE__URL, SCHEDULER__NOTIFIER_INTERVAL_SECONDS, ...
            .add_source(
                Environment::default()
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(","),
            )
            // Conventional platform variables win over everything else
            .set_override_option("server.port", env::var("PORT").ok())?
            .set_override_option("database.url", env::var("DATABASE_URL").ok())?
            .set_override_option(
                "fcm.service_account_json",
                env::var("FIREBASE_SERVICE_ACCOUNT").ok(),
            )?
            .set_override_option(
                "fcm.service_account_path",
                env::var("FIREBASE_SERVICE_ACCOUNT_PATH").ok(),
            )?
            .set_override_option(
                "scheduler.self_ping_url",
                env::var("SELF_PING_URL")
                    .or_else(|_| env::var("RENDER_EXTERNAL_URL"))
                    .ok(),
            )?;

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.notifier_interval_seconds == 0 {
            return Err(ConfigError::Message(
                "scheduler.notifier_interval_seconds must be greater than zero".into(),
            ));
        }
        if self.scheduler.self_ping_interval_seconds == 0 {
            return Err(ConfigError::Message(
                "scheduler.self_ping_interval_seconds must be greater than zero".into(),
            ));
        }
        if self.fcm.max_concurrent_sends == 0 {
            return Err(ConfigError::Message(
                "fcm.max_concurrent_sends must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Target of the liveness self-ping.
    pub fn self_ping_url(&self) -> String {
        match &self.scheduler.self_ping_url {
            Some(url) if !url.trim().is_empty() => {
                let base = url.trim().trim_end_matches('/');
                if base.ends_with("/health") {
                    base.to_string()
                } else {
                    format!("{}/health", base)
                }
            }
            _ => format!("http://localhost:{}/health", self.server.port),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            pool_size: default_pool_size(),
            connect_timeout_seconds: default_connect_timeout(),
            idle_timeout_seconds: default_idle_timeout(),
        }
    }
}

impl Default for FcmConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            service_account_json: None,
            service_account_path: None,
            default_credentials_path: default_credentials_path(),
            endpoint: default_fcm_endpoint(),
            max_concurrent_sends: default_max_concurrent_sends(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            notifier_interval_seconds: default_notifier_interval(),
            self_ping_interval_seconds: default_self_ping_interval(),
            self_ping_timeout_seconds: default_self_ping_timeout(),
            self_ping_url: None,
        }
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otel_endpoint(),
            service_name: default_service_name(),
            sampling_ratio: default_sampling_ratio(),
            json_logs: false,
        }
    }
}
