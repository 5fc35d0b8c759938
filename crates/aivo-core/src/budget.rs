use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Spending ceilings for one run. Read-only while a run executes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Budget {
    /// Hard ceiling for the whole run; crossing it cancels remaining work.
    pub max_per_run_usd: f64,
    /// Hard ceiling for a single intent across all runners and operations.
    pub max_per_intent_usd: f64,
    /// Soft threshold; crossing it logs a warning once.
    pub warn_threshold_usd: f64,
}

impl Budget {
    /// Validate threshold relationships.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any ceiling is non-positive or
    /// the warn threshold exceeds the run ceiling.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_per_run_usd <= 0.0 {
            return Err(ConfigError::Validation(
                "budget max_per_run_usd must be positive".to_string(),
            ));
        }
        if self.max_per_intent_usd <= 0.0 {
            return Err(ConfigError::Validation(
                "budget max_per_intent_usd must be positive".to_string(),
            ));
        }
        if self.warn_threshold_usd <= 0.0 {
            return Err(ConfigError::Validation(
                "budget warn_threshold_usd must be positive".to_string(),
            ));
        }
        if self.warn_threshold_usd > self.max_per_run_usd {
            return Err(ConfigError::Validation(format!(
                "budget warn_threshold_usd ({}) exceeds max_per_run_usd ({})",
                self.warn_threshold_usd, self.max_per_run_usd
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensible_budget_validates() {
        let b = Budget {
            max_per_run_usd: 5.0,
            max_per_intent_usd: 1.0,
            warn_threshold_usd: 4.0,
        };
        assert!(b.validate().is_ok());
    }

    #[test]
    fn zero_run_ceiling_is_rejected() {
        let b = Budget {
            max_per_run_usd: 0.0,
            max_per_intent_usd: 1.0,
            warn_threshold_usd: 0.5,
        };
        assert!(b.validate().is_err());
    }

    #[test]
    fn warn_above_run_ceiling_is_rejected() {
        let b = Budget {
            max_per_run_usd: 2.0,
            max_per_intent_usd: 1.0,
            warn_threshold_usd: 3.0,
        };
        assert!(b.validate().is_err());
    }
}
