//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Reads a `.env` file into the process environment, if present
//! 2. Loads from `DOCKETSYNC_*` environment variables when
//!    `DOCKETSYNC_DB_PATH` is set
//! 3. Otherwise falls back to a config file (TOML or JSON)
//! 4. Secrets from the environment always override file values
//!
//! ## Environment Variables
//! - `DOCKETSYNC_DB_PATH` (required for env loading), `DOCKETSYNC_DB_POOL_SIZE`
//! - `DOCKETSYNC_BIND_ADDRESS`, `DOCKETSYNC_CRON_SECRET`
//! - `DOCKETSYNC_TRIGGER_RATE_LIMIT_MAX`, `DOCKETSYNC_TRIGGER_RATE_LIMIT_WINDOW_SECS`,
//!   `DOCKETSYNC_TRUST_FORWARDED_FOR`
//! - `DOCKETSYNC_CRON_EXPRESSION`, `DOCKETSYNC_SCHEDULER_ENABLED`
//! - `DOCKETSYNC_RATE_LIMIT_MAX_REQUESTS`, `DOCKETSYNC_RATE_LIMIT_WINDOW_SECS`
//! - `DOCKETSYNC_INTER_ITEM_DELAY_MS`, `DOCKETSYNC_MAX_RATE_LIMIT_WAIT_SECS`
//! - `DOCKETSYNC_LOOKBACK_DAYS`, `DOCKETSYNC_REQUEST_TIMEOUT_SECS`,
//!   `DOCKETSYNC_JOB_TIMEOUT_SECS`, `DOCKETSYNC_DEDUPE_BEFORE_CREATE`
//! - `DOCKETSYNC_GOOGLE_CLIENT_ID`, `DOCKETSYNC_GOOGLE_CLIENT_SECRET`
//! - `DOCKETSYNC_GOOGLE_TOKEN_URL`, `DOCKETSYNC_GOOGLE_CALENDAR_BASE_URL`,
//!   `DOCKETSYNC_GOOGLE_DRIVE_BASE_URL`, `DOCKETSYNC_GOOGLE_UPLOAD_BASE_URL`
//! - `DOCKETSYNC_ROOT_FOLDER_ID`
//!
//! ## File Locations
//! `docketsync.toml`, `docketsync.json`, `config.toml` and `config.json`
//! in the working directory, its parent, then next to the executable.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use docketsync_domain::{Config, DocketError, Result};
use tracing::{debug, info};

const FILE_NAMES: [&str; 4] = ["docketsync.toml", "docketsync.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `DocketError::Config` if neither source yields a valid
/// configuration.
pub fn load() -> Result<Config> {
    if let Ok(path) = dotenvy::dotenv() {
        debug!(path = %path.display(), "loaded .env file");
    }

    let mut config = match load_from_env() {
        Ok(config) => {
            info!("configuration loaded from environment variables");
            config
        }
        Err(err) => {
            debug!(error = %err, "environment incomplete, trying config file");
            load_from_file(None)?
        }
    };

    apply_secret_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

/// Load configuration from `DOCKETSYNC_*` environment variables
///
/// Only `DOCKETSYNC_DB_PATH` is required; everything else falls back to
/// the defaults in [`Config::default`].
///
/// # Errors
/// Returns `DocketError::Config` if the database path is missing or a
/// value fails to parse.
pub fn load_from_env() -> Result<Config> {
    let defaults = Config::default();
    let mut config = Config::default();

    config.database.path = env_var("DOCKETSYNC_DB_PATH")?;
    config.database.pool_size = env_parse("DOCKETSYNC_DB_POOL_SIZE", defaults.database.pool_size)?;

    config.server.bind_address = env_or("DOCKETSYNC_BIND_ADDRESS", defaults.server.bind_address);
    config.server.trigger_rate_limit_max =
        env_parse("DOCKETSYNC_TRIGGER_RATE_LIMIT_MAX", defaults.server.trigger_rate_limit_max)?;
    config.server.trigger_rate_limit_window_secs = env_parse(
        "DOCKETSYNC_TRIGGER_RATE_LIMIT_WINDOW_SECS",
        defaults.server.trigger_rate_limit_window_secs,
    )?;
    config.server.trust_forwarded_for =
        env_bool("DOCKETSYNC_TRUST_FORWARDED_FOR", defaults.server.trust_forwarded_for);

    let sync = &mut config.sync;
    sync.cron_expression = env_or("DOCKETSYNC_CRON_EXPRESSION", defaults.sync.cron_expression);
    sync.scheduler_enabled =
        env_bool("DOCKETSYNC_SCHEDULER_ENABLED", defaults.sync.scheduler_enabled);
    sync.rate_limit_max_requests =
        env_parse("DOCKETSYNC_RATE_LIMIT_MAX_REQUESTS", defaults.sync.rate_limit_max_requests)?;
    sync.rate_limit_window_secs =
        env_parse("DOCKETSYNC_RATE_LIMIT_WINDOW_SECS", defaults.sync.rate_limit_window_secs)?;
    sync.inter_item_delay_ms =
        env_parse("DOCKETSYNC_INTER_ITEM_DELAY_MS", defaults.sync.inter_item_delay_ms)?;
    sync.max_rate_limit_wait_secs =
        env_parse("DOCKETSYNC_MAX_RATE_LIMIT_WAIT_SECS", defaults.sync.max_rate_limit_wait_secs)?;
    sync.lookback_days = env_parse("DOCKETSYNC_LOOKBACK_DAYS", defaults.sync.lookback_days)?;
    sync.request_timeout_secs =
        env_parse("DOCKETSYNC_REQUEST_TIMEOUT_SECS", defaults.sync.request_timeout_secs)?;
    sync.job_timeout_secs =
        env_parse("DOCKETSYNC_JOB_TIMEOUT_SECS", defaults.sync.job_timeout_secs)?;
    sync.dedupe_before_create =
        env_bool("DOCKETSYNC_DEDUPE_BEFORE_CREATE", defaults.sync.dedupe_before_create);

    let google = &mut config.google;
    google.client_id = env_or("DOCKETSYNC_GOOGLE_CLIENT_ID", defaults.google.client_id);
    google.token_url = env_or("DOCKETSYNC_GOOGLE_TOKEN_URL", defaults.google.token_url);
    google.calendar_base_url =
        env_or("DOCKETSYNC_GOOGLE_CALENDAR_BASE_URL", defaults.google.calendar_base_url);
    google.drive_base_url =
        env_or("DOCKETSYNC_GOOGLE_DRIVE_BASE_URL", defaults.google.drive_base_url);
    google.upload_base_url =
        env_or("DOCKETSYNC_GOOGLE_UPLOAD_BASE_URL", defaults.google.upload_base_url);
    google.root_folder_id = env_opt("DOCKETSYNC_ROOT_FOLDER_ID");

    apply_secret_overrides(&mut config);
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations via
/// [`probe_config_paths`]. Format is chosen by extension.
///
/// # Errors
/// Returns `DocketError::Config` if the file is missing or malformed.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(DocketError::Config(format!("config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            DocketError::Config("no config file found in any of the standard locations".to_string())
        })?,
    };

    info!(path = %config_path.display(), "loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| DocketError::Config(format!("failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| DocketError::Config(format!("invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| DocketError::Config(format!("invalid JSON format: {e}"))),
        _ => Err(DocketError::Config(format!("unsupported config format: {extension}"))),
    }
}

/// First existing config file among the standard locations.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd.join(".."));
        dirs.insert(0, cwd);
    }
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        dirs.push(exe_dir);
    }

    dirs.iter()
        .flat_map(|dir| FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// Secrets never need to live in a config file.
fn apply_secret_overrides(config: &mut Config) {
    if let Some(secret) = env_opt("DOCKETSYNC_CRON_SECRET") {
        config.server.cron_secret = Some(secret);
    }
    if let Some(secret) = env_opt("DOCKETSYNC_GOOGLE_CLIENT_SECRET") {
        config.google.client_secret = secret;
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| DocketError::Config(format!("missing required environment variable: {key}")))
}

/// Set, non-empty variable.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: String) -> String {
    env_opt(key).unwrap_or(default)
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env_opt(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| DocketError::Config(format!("invalid value for {key}: {e}"))),
        None => Ok(default),
    }
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    env_opt(key)
        .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
