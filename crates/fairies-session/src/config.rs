//! Session configuration.

use std::time::Duration;

use fairies_narrative::application::sequencer::{DeploymentMode, SequencerTiming};
use fairies_narrative::domain::phase::PhaseKey;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Tunables for one session. Every duration is in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Silence required before a queued cue may play.
    pub min_time_between_speaking_secs: f64,
    /// Pause after each blocking story line.
    pub inter_line_pause_secs: f64,
    /// Pause between the story lines and the first request.
    pub lines_to_requests_pause_secs: f64,
    /// Pause after each announced request.
    pub inter_request_pause_secs: f64,
    /// Pause between phases.
    pub inter_phase_pause_secs: f64,
    /// Wall-clock pause length after which the reset hook fires.
    pub pause_reset_threshold_secs: f64,
    /// What happens after the last phase.
    pub deployment_mode: DeploymentMode,
    /// Phase to start from; earlier phases are skipped.
    pub start_phase: Option<PhaseKey>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_time_between_speaking_secs: 1.0,
            inter_line_pause_secs: 0.5,
            lines_to_requests_pause_secs: 0.0,
            inter_request_pause_secs: 2.0,
            inter_phase_pause_secs: 0.0,
            pause_reset_threshold_secs: 60.0,
            deployment_mode: DeploymentMode::Terminate,
            start_phase: None,
        }
    }
}

impl SessionConfig {
    /// Parses and validates a YAML document. Missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidConfig` if the document does not parse
    /// or a duration is negative or not finite.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SessionError> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| SessionError::InvalidConfig(format!("yaml: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every duration.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidConfig` naming the first bad field.
    pub fn validate(&self) -> Result<(), SessionError> {
        let fields = [
            ("min_time_between_speaking_secs", self.min_time_between_speaking_secs),
            ("inter_line_pause_secs", self.inter_line_pause_secs),
            ("lines_to_requests_pause_secs", self.lines_to_requests_pause_secs),
            ("inter_request_pause_secs", self.inter_request_pause_secs),
            ("inter_phase_pause_secs", self.inter_phase_pause_secs),
            ("pause_reset_threshold_secs", self.pause_reset_threshold_secs),
        ];
        for (name, value) in fields {
            if Duration::try_from_secs_f64(value).is_err() {
                return Err(SessionError::InvalidConfig(format!(
                    "{name} must be a non-negative, representable number of seconds, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Sequencer pauses.
    #[must_use]
    pub fn timing(&self) -> SequencerTiming {
        SequencerTiming {
            inter_line_pause: secs(self.inter_line_pause_secs),
            lines_to_requests_pause: secs(self.lines_to_requests_pause_secs),
            inter_request_pause: secs(self.inter_request_pause_secs),
            inter_phase_pause: secs(self.inter_phase_pause_secs),
        }
    }

    /// Silence required before a queued cue may play.
    #[must_use]
    pub fn min_time_between_speaking(&self) -> Duration {
        secs(self.min_time_between_speaking_secs)
    }

    /// Wall-clock pause length after which the reset hook fires.
    #[must_use]
    pub fn pause_reset_threshold(&self) -> Duration {
        secs(self.pause_reset_threshold_secs)
    }
}

// Unrepresentable values are rejected by `validate`.
fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = SessionConfig::from_yaml_str("{}").unwrap();

        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.timing(), SequencerTiming::default());
        assert_eq!(config.min_time_between_speaking(), Duration::from_secs(1));
    }

    #[test]
    fn test_overrides_are_applied() {
        let yaml = "
inter_request_pause_secs: 0.25
deployment_mode: loop
start_phase: delirium
";

        let config = SessionConfig::from_yaml_str(yaml).unwrap();

        assert_eq!(config.timing().inter_request_pause, Duration::from_millis(250));
        assert_eq!(config.deployment_mode, DeploymentMode::Loop);
        assert_eq!(config.start_phase, Some(PhaseKey::Delirium));
    }

    #[test]
    fn test_negative_duration_is_rejected() {
        let result = SessionConfig::from_yaml_str("inter_line_pause_secs: -1.0");

        match result {
            Err(SessionError::InvalidConfig(message)) => {
                assert!(message.contains("inter_line_pause_secs"));
            }
            other => panic!("expected InvalidConfig, got {other:?}"),
        }
    }

    #[test]
    fn test_unrepresentable_duration_is_rejected() {
        // Arrange
        let yaml = "min_time_between_speaking_secs: 1.0e30";

        // Act
        let result = SessionConfig::from_yaml_str(yaml);

        // Assert
        match result {
            Err(SessionError::InvalidConfig(message)) => {
                assert!(message.contains("min_time_between_speaking_secs"));
            }
            other => panic!("expected InvalidConfig, got {other:?}"),
        }
        assert!(SessionConfig::from_yaml_str("pause_reset_threshold_secs: 1.0e25").is_err());
    }

    #[test]
    fn test_unknown_key_and_phase_are_rejected() {
        assert!(SessionConfig::from_yaml_str("tick_rate: 3").is_err());
        assert!(SessionConfig::from_yaml_str("start_phase: epilogue").is_err());
    }
}
