use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Config file not found at {0}")]
    NotFound(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// A collaborator refused a change pushed by the controller.
///
/// Never fatal: the controller logs it and relies on the next feedback or tick
/// to correct the stream.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("Encoder rejected configuration: {0}")]
    Encoder(String),

    #[error("Source rejected framerate: {0}")]
    Source(String),

    #[error("Capture pipeline restart failed: {0}")]
    Capture(String),
}
