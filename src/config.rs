use std::time::Duration;

use tracing::warn;

const DEFAULT_LOG_FILE_PATH: &str = "logs/cgpa_rater.log";
const DEFAULT_RECALC_DELAY_MS: u64 = 600;

/// Runtime settings sourced from the environment (and `.env` via dotenvy).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// `LOG_FILE_PATH`: JSON log destination, rotated daily.
    pub log_file_path: String,
    /// `CGPA_RECALC_DELAY_MS`: delay before a requested recalculate runs.
    pub recalc_delay: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_file_path: DEFAULT_LOG_FILE_PATH.to_string(),
            recalc_delay: Duration::from_millis(DEFAULT_RECALC_DELAY_MS),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup. Malformed values fall
    /// back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let log_file_path = lookup("LOG_FILE_PATH").unwrap_or(defaults.log_file_path);

        let recalc_delay = match lookup("CGPA_RECALC_DELAY_MS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) => Duration::from_millis(ms),
                Err(e) => {
                    warn!(value = %raw, error = %e, "Ignoring malformed CGPA_RECALC_DELAY_MS");
                    defaults.recalc_delay
                }
            },
            None => defaults.recalc_delay,
        };

        Self {
            log_file_path,
            recalc_delay,
        }
    }
}
