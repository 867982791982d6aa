//! Decoded message records.

use crate::error::{Error, Result};
use crate::topic;
use crate::value::CsvValue;
use serde_json::{Map, Value};

/// Field holding the transmitting station's callsign, taken from the topic.
pub const TX_CALLSIGN: &str = "tx_callsign";
/// Field holding the receiving station's callsign, taken from the command line.
pub const RX_CALLSIGN: &str = "rx_callsign";
/// Timestamp field reported by the gateway.
pub const TIMESTAMP: &str = "timestamp";

/// A JSON object decoded from a message payload, in document key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    /// Parse a payload as a JSON object.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(payload)
            .map_err(|e| Error::MalformedPayload(format!("payload is not valid UTF-8: {e}")))?;

        match serde_json::from_str::<Value>(text)? {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(Error::Processing(format!(
                "expected a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Decode a message and stamp it with the sender (from the topic) and
    /// receiver callsigns. Existing `tx_callsign`/`rx_callsign` keys are
    /// overwritten in place.
    pub fn from_message(topic: &str, payload: &[u8], receiver_id: &str) -> Result<Self> {
        let mut record = Self::decode(payload)?;
        let sender_id = topic::sender_id(topic);
        record.insert(TX_CALLSIGN, Value::String(sender_id.to_string()));
        record.insert(RX_CALLSIGN, Value::String(receiver_id.to_string()));
        Ok(record)
    }

    pub fn insert(&mut self, key: &str, value: Value) {
        self.fields.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Cell text for `key`, empty when the key is absent.
    pub fn cell(&self, key: &str) -> CsvValue {
        CsvValue::from(self.get(key))
    }

    /// Field names in document order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
