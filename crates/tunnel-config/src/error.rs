use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("CONFIG_INVALID: {0}")]
    Invalid(String),
    #[error("CONFIG_INVALID: missing required key '{0}' in section '{1}'")]
    MissingKey(&'static str, String),
    #[error("CONFIG_INVALID: key '{0}' in section '{1}' is not valid: {2}")]
    BadValue(&'static str, String, String),
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse INI: {0}")]
    Ini(#[from] ini::Error),
}
