//! Configuration access port trait.

use crate::domain::error::RuletraderError;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    /// Keys present in `section`; ordering is up to the adapter.
    fn keys(&self, section: &str) -> Vec<String>;

    fn require_string(&self, section: &str, key: &str) -> Result<String, RuletraderError> {
        self.get_string(section, key)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| RuletraderError::ConfigMissing {
                section: section.to_string(),
                key: key.to_string(),
            })
    }

    /// Parsed number, `None` when absent; present but non-numeric is an error.
    fn get_f64_opt(&self, section: &str, key: &str) -> Result<Option<f64>, RuletraderError> {
        match self.get_string(section, key) {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => raw.trim().parse::<f64>().map(Some).map_err(|e| {
                RuletraderError::ConfigInvalid {
                    section: section.to_string(),
                    key: key.to_string(),
                    reason: format!("'{raw}' is not a number: {e}"),
                }
            }),
        }
    }

    fn require_f64(&self, section: &str, key: &str) -> Result<f64, RuletraderError> {
        self.get_f64_opt(section, key)?
            .ok_or_else(|| RuletraderError::ConfigMissing {
                section: section.to_string(),
                key: key.to_string(),
            })
    }
}
