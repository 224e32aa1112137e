//! Domain error types.

/// Top-level error type for hourcross.
#[derive(Debug, thiserror::Error)]
pub enum HourcrossError {
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

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("invalid input at bar {index}: {reason}")]
    InvalidInput { index: usize, reason: String },

    #[error("invalid parameter: {reason}")]
    InvalidParameter { reason: String },

    #[error("no {timeframe} data for {symbol}")]
    NoData { symbol: String, timeframe: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl HourcrossError {
    pub(crate) fn invalid_config(section: &str, key: &str, reason: impl Into<String>) -> Self {
        HourcrossError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&HourcrossError> for std::process::ExitCode {
    fn from(err: &HourcrossError) -> Self {
        let code: u8 = match err {
            HourcrossError::Io(_) => 1,
            HourcrossError::ConfigParse { .. }
            | HourcrossError::ConfigMissing { .. }
            | HourcrossError::ConfigInvalid { .. } => 2,
            HourcrossError::Data { .. } => 3,
            HourcrossError::InvalidInput { .. } | HourcrossError::InvalidParameter { .. } => 4,
            HourcrossError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_input() {
        let err = HourcrossError::InvalidInput {
            index: 3,
            reason: "timestamp not after previous bar".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid input at bar 3: timestamp not after previous bar"
        );
    }

    #[test]
    fn display_invalid_parameter() {
        let err = HourcrossError::InvalidParameter {
            reason: "initial_capital must be positive, got 0".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid parameter: initial_capital must be positive, got 0"
        );
        assert_eq!(
            format!("{:?}", std::process::ExitCode::from(&err)),
            format!("{:?}", std::process::ExitCode::from(4))
        );
    }

    #[test]
    fn display_config_invalid() {
        let err = HourcrossError::invalid_config("strategy", "stop_loss", "must be non-negative");
        assert_eq!(
            err.to_string(),
            "invalid config value [strategy] stop_loss: must be non-negative"
        );
    }

    #[test]
    fn display_no_data() {
        let err = HourcrossError::NoData {
            symbol: "APT/USDC".into(),
            timeframe: "1m".into(),
        };
        assert_eq!(err.to_string(), "no 1m data for APT/USDC");
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: HourcrossError = io.into();
        assert!(matches!(err, HourcrossError::Io(_)));
    }
}
