use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "ClinicalTimeline";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_VITALS_URL: &str = "http://localhost:3001/vitals";
const DEFAULT_VITALS_TIMEOUT_SECS: u64 = 5;
const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:3001",
    "http://localhost:5173",
];

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,clinical_timeline=debug"
}

/// Get the application data directory
/// ~/ClinicalTimeline/, falling back to the working directory without a home.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime configuration, read from `TIMELINE_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub registry_db: PathBuf,
    pub imaging_db: PathBuf,
    pub vitals_url: String,
    pub vitals_timeout: Duration,
    pub allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Unset or blank keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_raw = get("TIMELINE_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into());
        let bind_addr = bind_raw.parse().map_err(|e: std::net::AddrParseError| {
            ConfigError::Invalid {
                key: "TIMELINE_BIND_ADDR",
                value: bind_raw.clone(),
                reason: e.to_string(),
            }
        })?;

        let vitals_timeout = match get("TIMELINE_VITALS_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|e: std::num::ParseIntError| {
                    ConfigError::Invalid {
                        key: "TIMELINE_VITALS_TIMEOUT_SECS",
                        value: raw.clone(),
                        reason: e.to_string(),
                    }
                })?;
                if secs == 0 {
                    return Err(ConfigError::Invalid {
                        key: "TIMELINE_VITALS_TIMEOUT_SECS",
                        value: raw,
                        reason: "must be at least 1".into(),
                    });
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_VITALS_TIMEOUT_SECS),
        };

        let allowed_origins = match get("TIMELINE_ALLOWED_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect(),
            None => DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect(),
        };

        Ok(Self {
            bind_addr,
            registry_db: get("TIMELINE_REGISTRY_DB")
                .map(PathBuf::from)
                .unwrap_or_else(|| app_data_dir().join("registry.db")),
            imaging_db: get("TIMELINE_IMAGING_DB")
                .map(PathBuf::from)
                .unwrap_or_else(|| app_data_dir().join("pacs.db")),
            vitals_url: get("TIMELINE_VITALS_URL").unwrap_or_else(|| DEFAULT_VITALS_URL.into()),
            vitals_timeout,
            allowed_origins,
        })
    }
}
