//! Transcoding of LoRa APRS JSON messages into CSV rows.
//!
//! Features:
//!
//! - Topic parsing: the transmitting callsign is read from `<base>/<rx>/<tx>/<suffix>` topics
//! - Header inference: the first message fixes the column layout for the whole run
//! - Dual output: every record goes to stdout and a file, flushed per record
//! - Shared state: [`Bridge`] serializes header inference and writes behind one lock

pub mod bridge;
pub mod error;
pub mod record;
pub mod sink;
pub mod topic;
pub mod transcoder;
pub mod value;

// Re-export main types for easy access
pub use bridge::Bridge;
pub use error::{Error, Result, SinkKind};
pub use record::Record;
pub use sink::{DualSink, DEFAULT_OUTPUT_FILE};
pub use topic::sender_id;
pub use transcoder::{HeaderSchema, Row, Transcoded, Transcoder, FIXED_COLUMNS};
pub use value::CsvValue;
