use crate::error::{Error, Result};
use crate::tls;
use clap::Parser;
use rumqttc::{MqttOptions, Transport};
use std::path::PathBuf;
use std::time::Duration;

/// Largest packet accepted from or sent to the broker.
const MAX_PACKET_SIZE: usize = 1024 * 1024;

/// Configuration for the MQTT source.
#[derive(Debug, Clone, Parser)]
pub struct Config {
    /// MQTT broker host
    #[arg(long, default_value = "hydros.link9.net")]
    pub host: String,

    /// MQTT broker port
    #[arg(long, default_value_t = 8183)]
    pub port: u16,

    /// Base MQTT topic
    #[arg(long, default_value = "lora_aprs")]
    pub topic: String,

    /// MQTT username if required
    #[arg(long, env = "LORA_MQTT_USERNAME")]
    pub username: Option<String>,

    /// MQTT password if required
    #[arg(long, env = "LORA_MQTT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Websocket path on the broker
    #[arg(long, default_value = "/mqtt")]
    pub ws_path: String,

    /// PEM file with the CA certificate(s) to validate the broker against.
    /// Without it the broker's certificate is NOT validated, which accepts
    /// self-signed certificates but also any man-in-the-middle.
    #[arg(long, value_name = "PATH")]
    pub ca_file: Option<PathBuf>,

    /// MQTT client id (default: lora-to-csv-<random uuid>)
    #[arg(long)]
    pub client_id: Option<String>,

    /// Keep-alive interval in seconds
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    pub keep_alive_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "hydros.link9.net".to_string(),
            port: 8183,
            topic: "lora_aprs".to_string(),
            username: None,
            password: None,
            ws_path: "/mqtt".to_string(),
            ca_file: None,
            client_id: None,
            keep_alive_secs: 60,
        }
    }
}

impl Config {
    /// Websocket URL of the broker.
    pub fn broker_url(&self) -> String {
        let path = self.ws_path.trim_start_matches('/');
        format!("wss://{}:{}/{path}", self.host, self.port)
    }

    /// Topic filter matching every transmitter heard by `callsign`.
    pub fn subscription_filter(&self, callsign: &str) -> String {
        format!("{}/{callsign}/+/json_message", self.topic)
    }

    /// Username and password, only when both are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some((username, password)),
            _ => None,
        }
    }

    fn resolve_client_id(&self) -> Result<String> {
        match &self.client_id {
            Some(id) if id.is_empty() || id.starts_with(' ') => Err(Error::InvalidConfig(
                format!("client id must be non-empty and not start with a space: {id:?}"),
            )),
            Some(id) => Ok(id.clone()),
            None => Ok(format!("lora-to-csv-{}", uuid::Uuid::new_v4().simple())),
        }
    }

    /// Build the client options: websocket over TLS, credentials and keep-alive.
    pub fn mqtt_options(&self) -> Result<MqttOptions> {
        if self.host.is_empty() {
            return Err(Error::InvalidConfig("broker host is empty".to_string()));
        }

        let mut options = MqttOptions::new(self.resolve_client_id()?, self.broker_url(), self.port);
        options.set_keep_alive(Duration::from_secs(self.keep_alive_secs));
        options.set_max_packet_size(MAX_PACKET_SIZE, MAX_PACKET_SIZE);
        if let Some((username, password)) = self.credentials() {
            options.set_credentials(username, password);
        }
        options.set_transport(Transport::Wss(tls::configuration(self.ca_file.as_deref())?));
        Ok(options)
    }
}
