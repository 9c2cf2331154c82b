//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable
//! overrides. The configuration file path defaults to `config.yaml` but can
//! be specified via `-f` flag or the `KIDDIEBUS_CONFIG` environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources
//! override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `KIDDIEBUS_`
//! 3. **DATABASE_URL** - Special case: overrides `database.url` if set
//!
//! For nested config values, use double underscores in environment variables.
//! For example, `KIDDIEBUS_DATABASE__URL=...` sets `database.url`.
//!
//! ## Reporting timezone
//!
//! `reporting_timezone` is a fixed UTC offset (e.g. `-05:00`). Boarding
//! events carry a `boarding_day` column derived from the server timestamp in
//! this offset; the daily pickup/dropoff uniqueness rule is evaluated against
//! that calendar day, not the UTC day.

use chrono::FixedOffset;
use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::Error;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "KIDDIEBUS_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// PostgreSQL connection settings
    pub database: DatabaseConfig,
    /// Fixed UTC offset used to derive boarding calendar days (e.g. "-05:00")
    pub reporting_timezone: String,
    /// Email address for the bootstrap admin user (created on first startup)
    pub admin_email: String,
    /// Name of the trusted header carrying the authenticated actor's email.
    /// The identity provider in front of this service is responsible for
    /// verifying credentials and stripping this header from client requests.
    pub identity_header: String,
    /// Outbound email delivery configuration
    pub email: EmailConfig,
    /// Enable the Prometheus metrics endpoint at `/metrics`
    pub enable_metrics: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            database: DatabaseConfig::default(),
            reporting_timezone: "-05:00".to_string(),
            admin_email: "admin@kiddiebus.local".to_string(),
            identity_header: "x-kiddiebus-user".to_string(),
            email: EmailConfig::default(),
            enable_metrics: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Connection pool settings
    pub pool: PoolSettings,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/kiddiebus".to_string(),
            pool: PoolSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub min_connections: u32,
    #[serde(with = "humantime_serde")]
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

/// Outbound email configuration for the delivery worker.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmailConfig {
    pub transport: EmailTransportConfig,
    pub from_email: String,
    pub from_name: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            transport: EmailTransportConfig::default(),
            from_email: "noreply@kiddiebus.local".to_string(),
            from_name: "Kiddie Bus".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EmailTransportConfig {
    Smtp {
        host: String,
        port: u16,
        username: String,
        password: String,
        use_tls: bool,
    },
    /// Writes messages to a directory instead of sending; for development and
    /// tests.
    File { path: String },
}

impl Default for EmailTransportConfig {
    fn default() -> Self {
        EmailTransportConfig::File {
            path: "./sent-emails".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from YAML file and environment variables
    pub fn load(args: &Args) -> Result<Self, Error> {
        let mut figment = Figment::new()
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("KIDDIEBUS_").split("__"));

        if let Ok(url) = std::env::var("DATABASE_URL") {
            figment = figment.merge(("database.url", url));
        }

        let config: Config = figment.extract().map_err(|e| Error::Internal {
            operation: format!("load configuration: {e}"),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Error> {
        self.reporting_offset()?;
        if self.identity_header.trim().is_empty() {
            return Err(Error::BadRequest {
                message: "identity_header must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Parse `reporting_timezone` into a chrono offset
    pub fn reporting_offset(&self) -> Result<FixedOffset, Error> {
        parse_utc_offset(&self.reporting_timezone).ok_or_else(|| Error::BadRequest {
            message: format!(
                "invalid reporting_timezone '{}': expected a UTC offset like '-05:00'",
                self.reporting_timezone
            ),
        })
    }
}

fn parse_utc_offset(s: &str) -> Option<FixedOffset> {
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1i32, &s[1..]),
        b'-' => (-1i32, &s[1..]),
        _ => (1i32, s),
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h.parse::<i32>().ok()?, m.parse::<i32>().ok()?),
        None => (rest.parse::<i32>().ok()?, 0),
    };
    if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_negative_offset() {
        let offset = parse_utc_offset("-05:00").unwrap();
        assert_eq!(offset.local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn parses_positive_offset_with_minutes() {
        let offset = parse_utc_offset("+05:30").unwrap();
        assert_eq!(offset.local_minus_utc(), 5 * 3600 + 30 * 60);
    }

    #[test]
    fn parses_bare_hours() {
        let offset = parse_utc_offset("2").unwrap();
        assert_eq!(offset.local_minus_utc(), 2 * 3600);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_utc_offset("not-a-zone").is_none());
        assert!(parse_utc_offset("-25:00").is_none());
    }

    #[test]
    fn default_config_validates() {
        Config::default().validate().unwrap();
    }
}
