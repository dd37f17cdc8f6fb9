use thiserror::Error;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Precondition failures of the lagged MAD detector.
///
/// All variants are raised before any output is produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectError {
    #[error("insufficient data: series has {len} observations, need more than the window size {window}")]
    InsufficientData { len: usize, window: usize },

    #[error("invalid input at position {index}: value {value} is not finite")]
    InvalidInput { index: usize, value: f64 },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl From<DetectError> for AppError {
    fn from(err: DetectError) -> Self {
        let exit_code = match err {
            DetectError::InvalidParameter(_) => 2,
            DetectError::InsufficientData { .. } | DetectError::InvalidInput { .. } => 3,
        };
        AppError::new(exit_code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_errors_map_to_exit_codes() {
        let e: AppError = DetectError::InvalidParameter("window must be >= 1".into()).into();
        assert_eq!(e.exit_code(), 2);

        let e: AppError = DetectError::InsufficientData { len: 20, window: 20 }.into();
        assert_eq!(e.exit_code(), 3);
        assert!(e.message().contains("20 observations"));

        let e: AppError = DetectError::InvalidInput { index: 7, value: f64::NAN }.into();
        assert_eq!(e.exit_code(), 3);
        assert!(e.message().contains("position 7"));
    }
}
