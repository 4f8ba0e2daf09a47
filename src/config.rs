//! Runtime configuration read from the environment at startup.

use std::path::PathBuf;

pub const DEFAULT_MODEL_PATH: &str = "models";
pub const DEFAULT_LOG_FILE: &str = "heartcheck.log";

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogMode {
    /// File on an interactive terminal, stdout otherwise
    #[default]
    Auto,
    File,
    Stdout,
}

impl LogMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "file" => Some(Self::File),
            "stdout" => Some(Self::Stdout),
            _ => None,
        }
    }

    /// Whether to log to a file, given whether stdout is a terminal.
    #[must_use]
    pub fn use_file(self, interactive: bool) -> bool {
        match self {
            Self::Auto => interactive,
            Self::File => true,
            Self::Stdout => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub model_path: PathBuf,
    pub require_signed_models: bool,
    pub signing_pubkey_file: Option<PathBuf>,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            require_signed_models: false,
            signing_pubkey_file: None,
            log_mode: LogMode::Auto,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

/// `1`, `true` and `yes` (any case) are true; anything else is false.
#[must_use]
pub fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

impl AppConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Empty values count as unset. An unrecognized log mode falls back to
    /// `auto` with a warning.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let log_mode = match get("HEARTCHECK_LOG_MODE") {
            Some(raw) => LogMode::parse(&raw).unwrap_or_else(|| {
                tracing::warn!("Unknown HEARTCHECK_LOG_MODE {raw:?}, using auto");
                LogMode::Auto
            }),
            None => defaults.log_mode,
        };

        Self {
            model_path: get("HEARTCHECK_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            require_signed_models: get("HEARTCHECK_REQUIRE_SIGNED_MODELS")
                .is_some_and(|v| parse_bool(&v)),
            signing_pubkey_file: get("HEARTCHECK_MODEL_SIGNING_PUBKEY_B64_FILE").map(PathBuf::from),
            log_mode,
            log_file: get("HEARTCHECK_LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_file),
        }
    }
}
