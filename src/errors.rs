use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Network Error: {0}")]
    Network(String),

    #[error("Authentication Failed for hub {host}: {details}")]
    Authentication { host: String, details: String },

    #[error("Device Error: method '{method}' returned error code {code}")]
    Device { method: String, code: i64 },

    #[error("Unexpected Device Response: {0}")]
    Response(String),

    #[error("Media Stream Error: {0}")]
    Stream(String),

    #[error("Conversion Error: {0}")]
    Conversion(String),

    #[error("File I/O Error: {0}")]
    Io(String),
}

// Allow conversion from std::io::Error to AppError::Io
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Network(err.to_string())
    }
}
