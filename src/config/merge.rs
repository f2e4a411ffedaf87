use super::schema::{AppConfig, DEFAULT_RUN_NAME_LIMIT, PartialConfig, default_delays};
use crate::error::ConfigError;

impl PartialConfig {
    /// Merge self with a lower-priority fallback.
    /// Self's non-None values take precedence.
    /// For completion_delays_ms: REPLACE semantics (if self has Some, use it entirely).
    pub fn with_fallback(self, fallback: PartialConfig) -> PartialConfig {
        PartialConfig {
            approval_required: self.approval_required.or(fallback.approval_required),
            run_name_limit: self.run_name_limit.or(fallback.run_name_limit),
            completion_delays_ms: self.completion_delays_ms.or(fallback.completion_delays_ms),
            audit_log_path: self.audit_log_path.or(fallback.audit_log_path),
        }
    }

    /// Convert to AppConfig, filling any remaining gaps with defaults.
    pub fn finalize(self) -> AppConfig {
        AppConfig {
            approval_required: self.approval_required.unwrap_or(true),
            run_name_limit: self.run_name_limit.unwrap_or(DEFAULT_RUN_NAME_LIMIT),
            completion_delays_ms: self.completion_delays_ms.unwrap_or_else(default_delays),
            audit_log_path: self.audit_log_path,
        }
    }
}

impl AppConfig {
    /// Reject values the orchestration core cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.run_name_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "orchestration.run_name_limit".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.completion_delays_ms.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "agents.completion_delays_ms".into(),
                message: "must list at least one delay".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn higher_priority_values_win() {
        let cli = PartialConfig {
            approval_required: Some(false),
            ..Default::default()
        };
        let file = PartialConfig {
            approval_required: Some(true),
            run_name_limit: Some(20),
            audit_log_path: Some(PathBuf::from("audit.jsonl")),
            ..Default::default()
        };

        let config = cli.with_fallback(file).finalize();
        assert!(!config.approval_required);
        assert_eq!(config.run_name_limit, 20);
        assert_eq!(config.audit_log_path, Some(PathBuf::from("audit.jsonl")));
    }

    #[test]
    fn delays_are_replaced_not_merged() {
        let local = PartialConfig {
            completion_delays_ms: Some(vec![5]),
            ..Default::default()
        };
        let global = PartialConfig {
            completion_delays_ms: Some(vec![100, 200, 300]),
            ..Default::default()
        };
        assert_eq!(local.with_fallback(global).finalize().completion_delays_ms, vec![5]);
    }

    #[test]
    fn defaults_fill_gaps() {
        let config = PartialConfig::default().finalize();
        assert!(config.approval_required);
        assert_eq!(config.run_name_limit, 60);
        assert_eq!(config.completion_delays_ms, vec![400, 600, 800]);
        assert!(config.audit_log_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_delays() {
        let config = PartialConfig {
            completion_delays_ms: Some(Vec::new()),
            ..Default::default()
        }
        .finalize();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
