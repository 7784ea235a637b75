//! Log Reader
//!
//! Handles reading entries back from a log file during replay.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::error::{EmberError, Result};

use super::entry::{decode_log_header, RecordHeader, HEADER_SIZE, LOG_HEADER_SIZE};
use super::LogEntry;

/// Outcome of reading one record
#[derive(Debug, PartialEq, Eq)]
pub enum ReadEntry {
    /// A complete, checksummed record
    Entry(LogEntry),

    /// Clean end of file on a record boundary
    End,

    /// The file ends partway through a record starting at `offset`
    TornTail { offset: u64 },
}

/// Reads entries from one log file
pub struct LogReader {
    reader: BufReader<File>,
    generation: u64,
    /// Byte offset just past the last complete record
    position: u64,
}

impl LogReader {
    /// Open a log file and validate its header
    ///
    /// A file shorter than the header is reported as `Ok(None)`: the
    /// header itself was torn.
    pub fn open(path: &Path) -> Result<Option<Self>> {
        let mut reader = BufReader::new(File::open(path)?);

        let mut header = [0u8; LOG_HEADER_SIZE];
        if read_full(&mut reader, &mut header)? < LOG_HEADER_SIZE {
            return Ok(None);
        }
        let generation = decode_log_header(&header)?;

        Ok(Some(Self {
            reader,
            generation,
            position: LOG_HEADER_SIZE as u64,
        }))
    }

    /// Read the next record
    pub fn read_next(&mut self) -> Result<ReadEntry> {
        let offset = self.position;

        let mut header = [0u8; HEADER_SIZE];
        match read_full(&mut self.reader, &mut header)? {
            0 => return Ok(ReadEntry::End),
            n if n < HEADER_SIZE => return Ok(ReadEntry::TornTail { offset }),
            _ => {}
        }
        let header = RecordHeader::parse(&header)?;

        let mut payload = vec![0u8; header.len as usize];
        if read_full(&mut self.reader, &mut payload)? < payload.len() {
            return Ok(ReadEntry::TornTail { offset });
        }

        let entry = LogEntry::from_parts(&header, &payload)?;
        self.position += (HEADER_SIZE + payload.len()) as u64;
        Ok(ReadEntry::Entry(entry))
    }

    /// Collect every entry, treating a torn tail as corruption
    pub fn read_all(mut self) -> Result<Vec<LogEntry>> {
        let mut entries = Vec::new();
        loop {
            match self.read_next()? {
                ReadEntry::Entry(entry) => entries.push(entry),
                ReadEntry::End => return Ok(entries),
                ReadEntry::TornTail { offset } => {
                    return Err(EmberError::Corruption(format!(
                        "Truncated record at offset {}",
                        offset
                    )))
                }
            }
        }
    }

    /// Generation recorded in the file header
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Byte offset just past the last complete record read so far
    pub fn position(&self) -> u64 {
        self.position
    }
}

/// Fill `buf` as far as the file allows, returning the bytes read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
