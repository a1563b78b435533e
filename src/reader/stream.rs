//! Streaming JSON array reader
//!
//! Walks the array delimiters by hand and hands each element to
//! `serde_json`, so only one record is materialized at a time.

use super::types::CityRecord;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// A JSON array file that can be streamed any number of times
#[derive(Debug, Clone)]
pub struct RecordSource {
    path: PathBuf,
}

impl RecordSource {
    /// Point at an input file; nothing is opened yet
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Input path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a fresh stream positioned at the first record
    pub fn records(&self) -> Result<RecordStream<BufReader<File>>> {
        RecordStream::open(&self.path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    BeforeArray,
    FirstElement,
    AfterElement,
    Finished,
}

/// Lazy iterator over the records of a JSON array
///
/// The underlying reader is dropped as soon as the array ends or an error is
/// returned; after that the iterator only yields `None`.
pub struct RecordStream<R: BufRead> {
    reader: Option<R>,
    position: Position,
    records_read: usize,
}

impl RecordStream<BufReader<File>> {
    /// Open a file for streaming
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                Error::Io(e)
            }
        })?;
        tracing::debug!(path = %path.display(), "opened input");
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<R: BufRead> RecordStream<R> {
    /// Stream records from any buffered reader
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader: Some(reader),
            position: Position::BeforeArray,
            records_read: 0,
        }
    }

    /// Records yielded so far
    pub fn records_read(&self) -> usize {
        self.records_read
    }

    /// Whether the underlying reader is still held
    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    /// Drop the reader without consuming the rest of the array
    pub fn close(&mut self) {
        self.reader = None;
        self.position = Position::Finished;
    }

    fn advance(&mut self) -> Result<Option<CityRecord>> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };

        if self.position == Position::BeforeArray {
            skip_bom(reader)?;
            skip_whitespace(reader)?;
            match peek(reader)? {
                Some(b'[') => {
                    reader.consume(1);
                    self.position = Position::FirstElement;
                }
                Some(other) => {
                    return Err(Error::parse(format!(
                        "top-level value must be an array, found '{}'",
                        char::from(other)
                    )))
                }
                None => return Err(Error::parse("input is empty, expected a JSON array")),
            }
        }

        skip_whitespace(reader)?;
        match (self.position, peek(reader)?) {
            (Position::FirstElement | Position::AfterElement, Some(b']')) => {
                reader.consume(1);
                expect_end(reader)?;
                self.position = Position::Finished;
                return Ok(None);
            }
            (Position::AfterElement, Some(b',')) => {
                reader.consume(1);
            }
            (Position::AfterElement, found) => {
                return Err(Error::parse(format!(
                    "expected ',' or ']' after record {}, found {}",
                    self.records_read,
                    describe(found)
                )))
            }
            (Position::FirstElement, None) => {
                return Err(Error::parse("array is not terminated"));
            }
            _ => {}
        }

        let index = self.records_read;
        skip_whitespace(reader)?;
        match peek(reader)? {
            Some(b'{') => {}
            found => {
                return Err(Error::parse(format!(
                    "record {index}: expected an object, found {}",
                    describe(found)
                )))
            }
        }

        let mut deserializer = serde_json::Deserializer::from_reader(&mut *reader);
        let record = CityRecord::deserialize(&mut deserializer)
            .map_err(|e| Error::parse(format!("record {index}: {e}")))?;

        self.position = Position::AfterElement;
        self.records_read += 1;
        Ok(Some(record))
    }
}

impl<R: BufRead> Iterator for RecordStream<R> {
    type Item = Result<CityRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.advance() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.close();
                None
            }
            Err(e) => {
                self.close();
                Some(Err(e))
            }
        }
    }
}

fn peek<R: BufRead>(reader: &mut R) -> Result<Option<u8>> {
    Ok(reader.fill_buf()?.first().copied())
}

fn skip_whitespace<R: BufRead>(reader: &mut R) -> Result<()> {
    loop {
        let (skipped, available) = {
            let buf = reader.fill_buf()?;
            let skipped = buf.iter().take_while(|b| b.is_ascii_whitespace()).count();
            (skipped, buf.len())
        };
        if available == 0 {
            return Ok(());
        }
        reader.consume(skipped);
        if skipped < available {
            return Ok(());
        }
    }
}

fn skip_bom<R: BufRead>(reader: &mut R) -> Result<()> {
    if reader.fill_buf()?.starts_with(UTF8_BOM) {
        reader.consume(UTF8_BOM.len());
    }
    Ok(())
}

fn expect_end<R: BufRead>(reader: &mut R) -> Result<()> {
    skip_whitespace(reader)?;
    match peek(reader)? {
        None => Ok(()),
        Some(b) => Err(Error::parse(format!(
            "unexpected '{}' after the end of the array",
            char::from(b)
        ))),
    }
}

fn describe(byte: Option<u8>) -> String {
    byte.map_or_else(
        || "end of input".to_string(),
        |b| format!("'{}'", char::from(b)),
    )
}
