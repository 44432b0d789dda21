//! Durable replay-position persistence.
//!
//! The checkpoint is a single text record, `<source_name>,<offset>`,
//! rewritten in place on every flush. The store keeps one file handle open
//! for the owning instance's lifetime; all reads and writes go through it.
//!
//! The flush order is write → data-sync → truncate, which bounds the
//! corruption window to "new record rejected entirely" rather than "old and
//! new content mixed": a crash before the sync leaves the old record intact
//! up to its original length, a crash after it leaves a fully synced new
//! record plus stale trailing bytes that the next successful flush removes.

#[cfg(test)]
mod checkpoint_test;

//---
use std::fmt;
use std::fs::File;
use std::fs::OpenOptions;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use parking_lot::Mutex;
use tracing::info;

use crate::constants::SOURCE_NAME_MAX;
use crate::CheckpointError;

/// The durable (source name, byte offset) pair marking replay progress:
/// the next byte to replay starts at `offset` within `source_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    /// Upstream source file name; non-empty, no embedded comma,
    /// at most `SOURCE_NAME_MAX` bytes.
    pub source_name: String,
    /// Byte offset within `source_name`.
    pub offset: u32,
}

impl Checkpoint {
    /// Parses the on-disk record format.
    ///
    /// Everything before the first comma is the source name (truncated to
    /// `SOURCE_NAME_MAX` bytes); the remainder is parsed as a permissive
    /// base-10 u32: the leading digit run counts, trailing non-numeric
    /// content is ignored. A record without a comma is a bare source name
    /// with offset 0.
    pub fn parse(bytes: &[u8]) -> std::result::Result<Self, CheckpointError> {
        if bytes.is_empty() {
            return Err(CheckpointError::Empty);
        }

        let content = String::from_utf8_lossy(bytes);
        let content = content.trim_end_matches(['\n', '\r']);

        let (name, rest) = match content.find(',') {
            Some(at) => (&content[..at], &content[at + 1..]),
            None => (content, ""),
        };

        if name.is_empty() {
            return Err(CheckpointError::Malformed);
        }

        let source_name = truncate_to_bytes(name, SOURCE_NAME_MAX).to_string();
        let offset = parse_offset(rest);

        Ok(Checkpoint { source_name, offset })
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{},{}", self.source_name, self.offset)
    }
}

/// Permissive numeric parse: leading ASCII digits, saturating at u32::MAX.
fn parse_offset(s: &str) -> u32 {
    let mut offset: u32 = 0;
    for b in s.bytes() {
        if !b.is_ascii_digit() {
            break;
        }
        offset = offset
            .saturating_mul(10)
            .saturating_add(u32::from(b - b'0'));
    }
    offset
}

/// Truncates to at most `max` bytes without splitting a UTF-8 sequence.
fn truncate_to_bytes(
    s: &str,
    max: usize,
) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Handle-based store for the replay position record.
///
/// The file is opened once (created if absent) and the handle is reused for
/// every load and flush until the owning instance is torn down.
#[derive(Debug)]
pub struct CheckpointStore {
    path: PathBuf,
    file: Mutex<File>,
}

impl CheckpointStore {
    /// Opens (creating if absent) the record file at `path` for read/write.
    pub fn open(path: impl Into<PathBuf>) -> std::result::Result<Self, CheckpointError> {
        let path = path.into();
        let file = OpenOptions::new().read(true).write(true).create(true).open(&path)?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and parses the entire current record.
    pub fn load(&self) -> std::result::Result<Checkpoint, CheckpointError> {
        let mut buf = Vec::new();
        {
            let mut file = self.file.lock();
            file.seek(SeekFrom::Start(0))?;
            file.read_to_end(&mut buf)?;
        }

        let checkpoint = Checkpoint::parse(&buf)?;
        info!(
            "parsed checkpoint: source = {}, offset = {}",
            checkpoint.source_name, checkpoint.offset
        );
        Ok(checkpoint)
    }

    /// Rewrites the record in place and makes it durable.
    ///
    /// Seeks to 0, writes the full serialized record, forces a data-sync,
    /// then truncates the file to exactly the written length so no stale
    /// trailing bytes survive a shrink.
    pub fn flush(
        &self,
        checkpoint: &Checkpoint,
    ) -> std::result::Result<(), CheckpointError> {
        let record = checkpoint.to_string();

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(0))?;
        file.write_all(record.as_bytes())?;
        file.sync_data()?;
        file.set_len(record.len() as u64)?;

        Ok(())
    }
}
