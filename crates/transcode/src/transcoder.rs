//! Message → row transcoding with header inference.
//!
//! The first record decoded fixes the column layout for the rest of the run:
//! the three fixed columns come first, followed by every other key of that
//! record in document order. Later records are projected onto that layout;
//! keys it does not know are dropped and keys it expects but are missing
//! become empty cells.

use crate::error::Result;
use crate::record::{Record, RX_CALLSIGN, TIMESTAMP, TX_CALLSIGN};
use tracing::{debug, info};

/// Columns that always lead the header, in this order.
pub const FIXED_COLUMNS: [&str; 3] = [TIMESTAMP, RX_CALLSIGN, TX_CALLSIGN];

/// An ordered sequence of cell texts.
pub type Row = Vec<String>;

/// Column layout inferred from the first record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderSchema {
    columns: Vec<String>,
}

impl HeaderSchema {
    /// Infer the layout from a record's keys.
    pub fn infer(record: &Record) -> Self {
        let mut columns: Vec<String> = FIXED_COLUMNS.iter().map(|c| c.to_string()).collect();
        columns.extend(
            record
                .keys()
                .filter(|key| !FIXED_COLUMNS.iter().any(|fixed| fixed == key))
                .map(str::to_string),
        );
        Self { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The header row itself.
    pub fn header_row(&self) -> Row {
        self.columns.clone()
    }

    /// Project a record onto this layout.
    pub fn row(&self, record: &Record) -> Row {
        self.columns
            .iter()
            .map(|column| record.cell(column).into_inner())
            .collect()
    }
}

/// Result of transcoding a single message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcoded {
    /// Set only for the message that established the header.
    pub header: Option<Row>,
    pub row: Row,
}

/// Turns messages heard by one receiving station into CSV rows.
///
/// Not synchronized on its own; callers sharing a transcoder across
/// threads must serialize access (see [`crate::Bridge`]).
#[derive(Debug)]
pub struct Transcoder {
    receiver_id: String,
    schema: Option<HeaderSchema>,
}

impl Transcoder {
    pub fn new(receiver_id: impl Into<String>) -> Self {
        Self {
            receiver_id: receiver_id.into(),
            schema: None,
        }
    }

    /// The header layout, once the first message has been seen.
    pub fn schema(&self) -> Option<&HeaderSchema> {
        self.schema.as_ref()
    }

    /// Decode `payload` and turn it into a row.
    pub fn transcode(&mut self, topic: &str, payload: &[u8]) -> Result<Transcoded> {
        let record = Record::from_message(topic, payload, &self.receiver_id)?;
        Ok(self.transcode_record(&record))
    }

    /// Fix the header from `record` if this is the first one, then project it.
    fn transcode_record(&mut self, record: &Record) -> Transcoded {
        let mut header = None;
        let schema = self.schema.get_or_insert_with(|| {
            let schema = HeaderSchema::infer(record);
            info!("CSV columns: {}", schema.columns().join(","));
            header = Some(schema.header_row());
            schema
        });

        let row = schema.row(record);
        debug!("Transcoded row with {} cells", row.len());
        Transcoded { header, row }
    }
}
