//! Driver settings read from the environment.

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use fairies_session::SessionConfig;

use crate::error::AppError;

/// How the driver runs one session.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Optional YAML session configuration (`FAIRIES_CONFIG`).
    pub config_path: Option<PathBuf>,
    /// Root of the cue asset tree (`FAIRIES_ASSETS`).
    pub asset_root: PathBuf,
    /// Simulated time per tick (`FAIRIES_TICK_MS`).
    pub tick: Duration,
    /// Seed for the simulated player (`FAIRIES_SEED`).
    pub seed: u64,
    /// Pace ticks against the wall clock (`FAIRIES_REALTIME=1`).
    pub realtime: bool,
    /// Simulated-time cap (`FAIRIES_MAX_SECS`).
    pub max_duration: Duration,
    /// How long each simulated clip plays (`FAIRIES_CLIP_SECS`).
    pub clip_length: Duration,
}

impl Settings {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` naming the first invalid variable.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` naming the first invalid variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let tick_ms: u64 = parse(&lookup, "FAIRIES_TICK_MS", 20)?;
        if tick_ms == 0 {
            return Err(AppError::Config("FAIRIES_TICK_MS must be positive".to_owned()));
        }
        let clip_secs: f64 = parse(&lookup, "FAIRIES_CLIP_SECS", 2.0)?;
        let clip_length = Duration::try_from_secs_f64(clip_secs)
            .map_err(|e| AppError::Config(format!("FAIRIES_CLIP_SECS is out of range: {e}")))?;

        Ok(Self {
            config_path: lookup("FAIRIES_CONFIG").map(PathBuf::from),
            asset_root: lookup("FAIRIES_ASSETS").map_or_else(|| PathBuf::from("assets"), PathBuf::from),
            tick: Duration::from_millis(tick_ms),
            seed: parse(&lookup, "FAIRIES_SEED", 7)?,
            realtime: lookup("FAIRIES_REALTIME").is_some_and(|value| value == "1"),
            max_duration: Duration::from_secs(parse(&lookup, "FAIRIES_MAX_SECS", 1800)?),
            clip_length,
        })
    }

    /// Loads the session configuration file, or the defaults if none is set.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the file cannot be read and
    /// `AppError::Session` if it does not parse.
    pub fn session_config(&self) -> Result<SessionConfig, AppError> {
        let Some(path) = &self.config_path else {
            return Ok(SessionConfig::default());
        };
        let yaml = std::fs::read_to_string(path)?;
        Ok(SessionConfig::from_yaml_str(&yaml)?)
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key} must be valid: {e}"))),
        None => Ok(default),
    }
}
