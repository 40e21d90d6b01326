use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Bridge(#[from] gpredict_bridge::Error),

    #[error("mqtt error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    #[error("failed to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
