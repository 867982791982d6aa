//! CSV output to the console and a file at the same time.

use crate::error::{Error, Result, SinkKind};
use csv::{Writer, WriterBuilder};
use std::fs::File;
use std::io::{Stdout, Write};
use std::path::Path;
use tracing::{error, info};

/// Default output file, created in the working directory.
pub const DEFAULT_OUTPUT_FILE: &str = "lora-syslog.csv";

/// Writes every record to two CSV streams, flushing both after each record.
pub struct DualSink<C: Write, F: Write> {
    console: Writer<C>,
    file: Writer<F>,
}

impl DualSink<Stdout, File> {
    /// Truncate (or create) `path` and pair it with stdout.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| Error::OpenOutput {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Writing CSV to {} and stdout", path.display());
        Ok(Self::new(std::io::stdout(), file))
    }
}

impl<C: Write, F: Write> DualSink<C, F> {
    pub fn new(console: C, file: F) -> Self {
        Self {
            console: csv_writer(console),
            file: csv_writer(file),
        }
    }

    /// Write one record to both sinks.
    ///
    /// Both sinks are always attempted. When only one fails the streams have
    /// diverged and the error names the failing sink.
    pub fn emit<I, T>(&mut self, cells: I) -> Result<()>
    where
        I: IntoIterator<Item = T> + Clone,
        T: AsRef<[u8]>,
    {
        let console = write_record(&mut self.console, cells.clone());
        let file = write_record(&mut self.file, cells);

        match (console, file) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(source), Ok(())) => Err(Error::Write {
                sink: SinkKind::Console,
                source,
            }),
            (Ok(()), Err(source)) => Err(Error::Write {
                sink: SinkKind::File,
                source,
            }),
            (Err(console_err), Err(source)) => {
                error!("Failed to write record to console: {console_err}");
                Err(Error::Write {
                    sink: SinkKind::File,
                    source,
                })
            }
        }
    }

    /// Flush both sinks and hand back the underlying streams.
    pub fn close(self) -> Result<(C, F)> {
        let console = self.console.into_inner().map_err(|e| Error::Write {
            sink: SinkKind::Console,
            source: e.into_error().into(),
        })?;
        let file = self.file.into_inner().map_err(|e| Error::Write {
            sink: SinkKind::File,
            source: e.into_error().into(),
        })?;
        Ok((console, file))
    }
}

/// Comma-delimited, minimally quoted, CRLF-terminated.
fn csv_writer<W: Write>(inner: W) -> Writer<W> {
    WriterBuilder::new().from_writer(inner)
}

fn write_record<W, I, T>(writer: &mut Writer<W>, cells: I) -> std::result::Result<(), csv::Error>
where
    W: Write,
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    writer.write_record(cells)?;
    writer.flush()?;
    Ok(())
}
