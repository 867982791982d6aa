use rumqttc::ConnectReturnCode;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Could not connect to MQTT broker at {broker}: {source}")]
    Connection {
        broker: String,
        #[source]
        source: rumqttc::ConnectionError,
    },

    #[error("Failed to connect, return code {0:?}")]
    ConnectionRefused(ConnectReturnCode),

    #[error("MQTT client error: {0}")]
    Client(#[from] rumqttc::ClientError),

    #[error("Failed to read CA file '{}': {source}", path.display())]
    CaFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
