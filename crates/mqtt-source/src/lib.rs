//! MQTT subscriber feeding LoRa APRS messages to `lora-to-csv`.
//!
//! Features:
//!
//! - Websocket transport over TLS, optionally validating the broker against a CA file
//! - Optional username/password authentication
//! - Subscription to `<topic>/<callsign>/+/json_message`, renewed on reconnect
//! - Clean DISCONNECT on Ctrl+C, immediate exit on a second Ctrl+C

/// Connection lifecycle and the receive loop
///
/// Connects, subscribes and hands every publish to a caller-supplied handler
/// until shutdown is requested.
pub mod client;
pub mod config;
pub mod error;
pub mod shutdown;
pub mod tls;

// Re-export main types for easy access
pub use client::{Client, Message};
pub use config::Config;
pub use error::{Error, Result};
pub use shutdown::setup_shutdown_handler;
