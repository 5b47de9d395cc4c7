// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 DevArena

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup, validated,
//! and then treated as immutable.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `CLERK_PEM_PUBLIC_KEY` | PEM text of the Clerk instance public key | One of the two key variables is required |
//! | `CLERK_PEM_PUBLIC_KEY_PATH` | File holding the PEM public key | |
//! | `CLERK_AUTHORIZED_PARTIES` | Comma-separated origins allowed in `azp` | Empty (unrestricted) |
//! | `CLERK_WEBHOOK_SIGNING_SECRET` | `whsec_` webhook signing secret | Empty (webhooks rejected) |
//! | `CLERK_SESSION_COOKIE` | Session cookie name | `__session` |
//! | `CLERK_CLOCK_SKEW_SECS` | Leeway on `exp`/`nbf` | `0` |
//! | `DATA_DIR` | Directory for the redb user database | In-memory store |
//! | `PERSISTENCE_TIMEOUT_MS` | Bound on each persistence call | `5000` |
//! | `CORS_ALLOWED_ORIGINS` | Comma-separated CORS origins | `http://localhost:3000,https://devarena.dev` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | Serve HTTPS when both are set | Plain HTTP |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::{
    collections::HashMap,
    env,
    net::SocketAddr,
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use thiserror::Error;
use url::Url;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const CLERK_PEM_PUBLIC_KEY_ENV: &str = "CLERK_PEM_PUBLIC_KEY";
pub const CLERK_PEM_PUBLIC_KEY_PATH_ENV: &str = "CLERK_PEM_PUBLIC_KEY_PATH";
pub const CLERK_AUTHORIZED_PARTIES_ENV: &str = "CLERK_AUTHORIZED_PARTIES";
pub const CLERK_WEBHOOK_SIGNING_SECRET_ENV: &str = "CLERK_WEBHOOK_SIGNING_SECRET";
pub const CLERK_SESSION_COOKIE_ENV: &str = "CLERK_SESSION_COOKIE";
pub const CLERK_CLOCK_SKEW_SECS_ENV: &str = "CLERK_CLOCK_SKEW_SECS";
/// Environment variable name for the user database directory.
///
/// When unset the service keeps users in memory, which is only suitable for
/// local development.
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const PERSISTENCE_TIMEOUT_MS_ENV: &str = "PERSISTENCE_TIMEOUT_MS";
pub const CORS_ALLOWED_ORIGINS_ENV: &str = "CORS_ALLOWED_ORIGINS";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_PERSISTENCE_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_CORS_ALLOWED_ORIGINS: &str = "http://localhost:3000,https://devarena.dev";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },

    #[error("TLS_CERT_PATH and TLS_KEY_PATH must be set together")]
    PartialTls,
}

impl ConfigError {
    fn invalid(name: &str, reason: impl ToString) -> Self {
        Self::InvalidValue {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Where the token signing key comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    Pem(String),
    File(PathBuf),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "" => Ok(LogFormat::Pretty),
            other => Err(ConfigError::invalid(
                LOG_FORMAT_ENV,
                format!("expected json or pretty, got {other:?}"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub key_source: KeySource,
    pub authorized_parties: Vec<String>,
    /// Raw secret; decoded when the webhook verifier is built.
    pub webhook_secret: String,
    pub session_cookie: String,
    pub clock_skew_secs: u64,
    pub data_dir: Option<PathBuf>,
    pub persistence_timeout: Duration,
    pub cors_allowed_origins: Vec<String>,
    pub tls: Option<TlsConfig>,
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |name: &str| vars.get(name).map(|v| v.trim()).filter(|v| !v.is_empty());

        let host = get(HOST_ENV).unwrap_or(DEFAULT_HOST);
        let port = match get(PORT_ENV) {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| ConfigError::invalid(PORT_ENV, e))?,
            None => DEFAULT_PORT,
        };
        let bind_addr = format!("{host}:{port}")
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::invalid(HOST_ENV, e))?;

        let key_source = match (
            vars.get(CLERK_PEM_PUBLIC_KEY_ENV).filter(|v| !v.trim().is_empty()),
            get(CLERK_PEM_PUBLIC_KEY_PATH_ENV),
        ) {
            (Some(pem), _) => KeySource::Pem(pem.clone()),
            (None, Some(path)) => KeySource::File(PathBuf::from(path)),
            (None, None) => {
                return Err(ConfigError::MissingEnvVar(
                    CLERK_PEM_PUBLIC_KEY_ENV.to_string(),
                ))
            }
        };

        let authorized_parties = get(CLERK_AUTHORIZED_PARTIES_ENV)
            .map(|raw| parse_origins(CLERK_AUTHORIZED_PARTIES_ENV, raw))
            .transpose()?
            .unwrap_or_default();

        let clock_skew_secs = match get(CLERK_CLOCK_SKEW_SECS_ENV) {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|e| ConfigError::invalid(CLERK_CLOCK_SKEW_SECS_ENV, e))?,
            None => 0,
        };

        let persistence_timeout_ms = match get(PERSISTENCE_TIMEOUT_MS_ENV) {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|e| ConfigError::invalid(PERSISTENCE_TIMEOUT_MS_ENV, e))?,
            None => DEFAULT_PERSISTENCE_TIMEOUT_MS,
        };
        if persistence_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                PERSISTENCE_TIMEOUT_MS_ENV,
                "must be greater than zero",
            ));
        }

        let cors_allowed_origins = parse_origins(
            CORS_ALLOWED_ORIGINS_ENV,
            get(CORS_ALLOWED_ORIGINS_ENV).unwrap_or(DEFAULT_CORS_ALLOWED_ORIGINS),
        )?;

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsConfig {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::PartialTls),
        };

        let log_format = get(LOG_FORMAT_ENV)
            .map(LogFormat::from_str)
            .transpose()?
            .unwrap_or_default();

        Ok(Config {
            bind_addr,
            key_source,
            authorized_parties,
            webhook_secret: get(CLERK_WEBHOOK_SIGNING_SECRET_ENV)
                .unwrap_or_default()
                .to_string(),
            session_cookie: get(CLERK_SESSION_COOKIE_ENV)
                .unwrap_or(crate::auth::DEFAULT_SESSION_COOKIE)
                .to_string(),
            clock_skew_secs,
            data_dir: get(DATA_DIR_ENV).map(PathBuf::from),
            persistence_timeout: Duration::from_millis(persistence_timeout_ms),
            cors_allowed_origins,
            tls,
            log_format,
        })
    }
}

/// Split a comma-separated list and require each entry to be a bare origin.
fn parse_origins(name: &str, raw: &str) -> Result<Vec<String>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let url = Url::parse(entry).map_err(|e| ConfigError::invalid(name, format!("{entry}: {e}")))?;
            let is_origin = matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some()
                && url.path() == "/"
                && url.query().is_none()
                && url.fragment().is_none();
            if !is_origin || entry.ends_with('/') {
                return Err(ConfigError::invalid(
                    name,
                    format!("{entry} is not an origin (scheme://host[:port])"),
                ));
            }
            Ok(entry.to_string())
        })
        .collect()
}
