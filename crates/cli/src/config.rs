//! Configuration loaded from environment variables (and `.env`).

use std::time::Duration;

use annolink_core::segment::FramePolicyKind;
use annolink_cvat::{CvatConnection, Timeouts};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(String),

    #[error("{var} must be {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Engine settings loaded from environment variables with defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Timeout for read calls in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Timeout for annotation uploads in seconds (default: `60`).
    pub write_timeout_secs: u64,
    /// Wait between write and verification read-back (default: `2`).
    pub verify_delay_secs: u64,
    /// How job-scoped frame numbers are read (default: `heuristic`).
    pub frame_policy: FramePolicyKind,
}

impl AppConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default     |
    /// |------------------------|-------------|
    /// | `REQUEST_TIMEOUT_SECS` | `30`        |
    /// | `WRITE_TIMEOUT_SECS`   | `60`        |
    /// | `VERIFY_DELAY_SECS`    | `2`         |
    /// | `FRAME_POLICY`         | `heuristic` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let secs = |var: &'static str, default: u64| -> Result<u64, ConfigError> {
            match lookup(var) {
                None => Ok(default),
                Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
                    var,
                    expected: "a whole number of seconds",
                    value,
                }),
            }
        };

        let frame_policy = match lookup("FRAME_POLICY") {
            None => FramePolicyKind::default(),
            Some(value) => FramePolicyKind::parse(value.trim()).map_err(|_| ConfigError::Invalid {
                var: "FRAME_POLICY",
                expected: "one of heuristic, job_local, global",
                value,
            })?,
        };

        Ok(Self {
            request_timeout_secs: secs("REQUEST_TIMEOUT_SECS", 30)?,
            write_timeout_secs: secs("WRITE_TIMEOUT_SECS", 60)?,
            verify_delay_secs: secs("VERIFY_DELAY_SECS", 2)?,
            frame_policy,
        })
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            request: Duration::from_secs(self.request_timeout_secs),
            write: Duration::from_secs(self.write_timeout_secs),
        }
    }

    pub fn verify_delay(&self) -> Duration {
        Duration::from_secs(self.verify_delay_secs)
    }
}

/// Which instance a connection is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Source,
    Target,
    /// Instance holding the collection used for duplicate checks.
    Check,
}

impl Role {
    fn prefix(self) -> &'static str {
        match self {
            Self::Source => "SOURCE",
            Self::Target => "TARGET",
            Self::Check => "CHECK",
        }
    }
}

/// Credentials for one instance.
///
/// | Env Var                  | Fallback        |
/// |--------------------------|-----------------|
/// | `{ROLE}_CVAT_URL`        | `CVAT_URL`      |
/// | `{ROLE}_CVAT_USERNAME`   | `CVAT_USERNAME` |
/// | `{ROLE}_CVAT_PASSWORD`   | `CVAT_PASSWORD` |
///
/// `{ROLE}` is `SOURCE`, `TARGET` or `CHECK`. URL and username are required;
/// the password defaults to empty.
pub fn connection_from_env(role: Role) -> Result<CvatConnection, ConfigError> {
    connection_from_lookup(role, |var| std::env::var(var).ok())
}

pub fn connection_from_lookup(
    role: Role,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<CvatConnection, ConfigError> {
    let get = |name: &str| {
        let scoped = format!("{}_CVAT_{name}", role.prefix());
        lookup(&scoped)
            .or_else(|| lookup(&format!("CVAT_{name}")))
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing(scoped))
    };

    let url = get("URL")?;
    let username = get("USERNAME")?;
    let password = get("PASSWORD").unwrap_or_default();
    Ok(CvatConnection::new(url, username, password))
}
