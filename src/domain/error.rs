//! Domain error types.

/// Rejected backtest configuration or input shape, raised before a run starts.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {key}: {reason}")]
    Invalid { key: String, reason: String },

    #[error("features has {features} rows but features_sum has {features_sum}")]
    FeatureLengthMismatch { features: usize, features_sum: usize },

    #[error("features_num is {features_num} but only {available} feature rows were provided")]
    FeaturesNumOutOfRange { features_num: usize, available: usize },
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, reason: &str) -> Self {
        ConfigError::Invalid {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Top-level error type for plutus.
#[derive(Debug, thiserror::Error)]
pub enum PlutusError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Backtest(#[from] ConfigError),

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&PlutusError> for std::process::ExitCode {
    fn from(err: &PlutusError) -> Self {
        let code: u8 = match err {
            PlutusError::Io(_) => 1,
            PlutusError::ConfigParse { .. }
            | PlutusError::ConfigMissing { .. }
            | PlutusError::ConfigInvalid { .. } => 2,
            PlutusError::Backtest(_) => 3,
            PlutusError::Data { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_messages() {
        let err = ConfigError::invalid("leverage", "leverage must be positive");
        assert_eq!(err.to_string(), "invalid leverage: leverage must be positive");

        let err = ConfigError::FeatureLengthMismatch {
            features: 10,
            features_sum: 9,
        };
        assert_eq!(
            err.to_string(),
            "features has 10 rows but features_sum has 9"
        );
    }

    #[test]
    fn backtest_error_converts_transparently() {
        let err: PlutusError = ConfigError::invalid("position_size", "must be positive").into();
        assert_eq!(err.to_string(), "invalid position_size: must be positive");
        assert!(matches!(err, PlutusError::Backtest(_)));
    }
}
