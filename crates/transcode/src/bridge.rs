//! Shared state between the message handler and the CSV sinks.
//!
//! Decoding, header inference and both sink writes happen under one lock, so
//! the header is written exactly once and rows never interleave between the
//! console and the file even if messages are handled concurrently.

use crate::error::{Error, Result};
use crate::sink::DualSink;
use crate::transcoder::{Row, Transcoder};
use std::io::Write;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error};

struct State<C: Write, F: Write> {
    transcoder: Transcoder,
    sink: DualSink<C, F>,
}

pub struct Bridge<C: Write, F: Write> {
    state: Mutex<State<C, F>>,
}

impl<C: Write, F: Write> Bridge<C, F> {
    pub fn new(transcoder: Transcoder, sink: DualSink<C, F>) -> Self {
        Self {
            state: Mutex::new(State { transcoder, sink }),
        }
    }

    /// Transcode one message and write it to both sinks.
    ///
    /// Errors are returned after being logged; they never leave the bridge
    /// in a state that affects later messages.
    pub fn handle(&self, topic: &str, payload: &[u8]) -> Result<Row> {
        let result = self.process(topic, payload);
        match &result {
            Ok(_) => {}
            Err(e @ Error::Write { .. }) => error!("Console and file diverged on {topic}: {e}"),
            Err(e) => error!("Dropping message on {topic}: {e}"),
        }
        result
    }

    fn process(&self, topic: &str, payload: &[u8]) -> Result<Row> {
        let mut state = self.lock();
        let State { transcoder, sink } = &mut *state;
        let transcoded = transcoder.transcode(topic, payload)?;
        if let Some(header) = &transcoded.header {
            if let Err(e) = sink.emit(header) {
                error!("Header row not fully written: {e}");
            }
        }
        sink.emit(&transcoded.row)?;

        debug!("Wrote row for message on {topic}");
        Ok(transcoded.row)
    }

    /// Column layout, once established.
    pub fn columns(&self) -> Option<Vec<String>> {
        self.lock()
            .transcoder
            .schema()
            .map(|schema| schema.columns().to_vec())
    }

    /// Flush both sinks and release them.
    pub fn close(self) -> Result<(C, F)> {
        let state = self
            .state
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.sink.close()
    }

    fn lock(&self) -> MutexGuard<'_, State<C, F>> {
        // The header is fixed before any write, so state behind a poisoned lock is consistent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<C: Write, F: Write> std::fmt::Debug for Bridge<C, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.state.try_lock() {
            Ok(state) => f
                .debug_struct("Bridge")
                .field("transcoder", &state.transcoder)
                .finish_non_exhaustive(),
            Err(_) => f.debug_struct("Bridge").finish_non_exhaustive(),
        }
    }
}
