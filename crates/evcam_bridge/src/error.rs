/// Bridge error types.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Sensor error: {0}")]
    Sensor(String),

    #[error("Unknown bias '{0}'")]
    UnknownBias(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Bias file error: {0}")]
    BiasFile(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
