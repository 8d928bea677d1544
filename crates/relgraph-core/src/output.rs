//! JSON and JSON Lines serialization for artifacts and record dumps.

use serde::Serialize;
use std::io::{self, Write};

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Single JSON value or array
    Json,
    /// One JSON value per line (newline-delimited JSON)
    JsonLines,
}

/// A writer that serializes items to JSON or JSONL format.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    items_written: usize,
}

impl<W: Write> OutputWriter<W> {
    /// Create a new output writer.
    ///
    /// `pretty` only affects the JSON format; JSONL is always one line per item.
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            items_written: 0,
        }
    }

    /// Write a single item followed by a newline.
    pub fn write<T: Serialize + ?Sized>(&mut self, item: &T) -> io::Result<()> {
        self.write_value(item)?;
        self.items_written += 1;
        Ok(())
    }

    fn write_value<T: Serialize + ?Sized>(&mut self, value: &T) -> io::Result<()> {
        if self.pretty && self.format == OutputFormat::Json {
            serde_json::to_writer_pretty(&mut self.writer, value).map_err(io::Error::other)?;
        } else {
            serde_json::to_writer(&mut self.writer, value).map_err(io::Error::other)?;
        }
        writeln!(self.writer)
    }

    /// Write multiple items: a JSON array, or one line per item for JSONL.
    pub fn write_all<T: Serialize>(&mut self, items: &[T]) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                self.write_value(items)?;
                self.items_written += items.len();
            }
            OutputFormat::JsonLines => {
                for item in items {
                    self.write(item)?;
                }
            }
        }
        Ok(())
    }

    /// Get the number of items written.
    pub fn items_written(&self) -> usize {
        self.items_written
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
