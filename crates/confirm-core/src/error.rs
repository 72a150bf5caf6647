use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfirmError {
    #[error("invalid operation payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),

    #[error("invalid qos {0}: must be 0, 1 or 2")]
    InvalidQos(u8),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("publisher client not found: {name}")]
    ClientNotFound {
        name: String,
        #[source]
        source: which::Error,
    },

    #[error("failed to spawn publisher client '{client}': {source}")]
    ClientSpawnFailed {
        client: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfirmError>;
