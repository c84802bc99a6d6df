use thiserror::Error;

/// Main error type for roadbench core operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    #[error("parameter '{key}' has unexpected type: {message}")]
    ParamType { key: String, message: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("runtime has not been reset")]
    NotReset,

    #[error("benchmark run cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl CoreError {
    /// Short machine-readable code for reports
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::InvalidParam(_) => "invalid_param",
            CoreError::ParamType { .. } => "invalid_param",
            CoreError::NotFound(_) => "not_found",
            CoreError::InvalidConfig(_) => "invalid_config",
            CoreError::NotReset => "not_reset",
            CoreError::Cancelled => "cancelled",
            CoreError::Io(_) => "io_error",
            CoreError::Json(_) => "invalid_json",
            CoreError::TomlParse(_) => "invalid_config",
            CoreError::TomlSerialize(_) => "internal_error",
        }
    }

    /// Process exit code for the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            CoreError::InvalidParam(_) | CoreError::ParamType { .. } => 2,
            CoreError::InvalidConfig(_) | CoreError::TomlParse(_) => 2,
            CoreError::NotFound(_) => 3,
            CoreError::Cancelled => 130,
            CoreError::Io(_) => 5,
            _ => 1,
        }
    }

    /// Create a NotFound error for a missing file
    pub fn file_not_found(path: &std::path::Path) -> Self {
        CoreError::NotFound(format!("File '{}' not found", path.display()))
    }
}
