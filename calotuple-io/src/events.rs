//! Event input: one JSON-encoded [`MemoryEventStore`] per line.

use crate::{Error, Result};
use calotuple_core::MemoryEventStore;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::{Path, PathBuf};

/// Streams events from a JSON Lines file.
///
/// Blank lines are skipped. Each remaining line must decode as one event;
/// a malformed line is reported with its line number.
pub struct EventFileReader {
    lines: Lines<BufReader<File>>,
    path: PathBuf,
    line: usize,
}

impl EventFileReader {
    /// Opens an event file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            path: path.as_ref().to_path_buf(),
            line: 0,
        })
    }

    /// Path of the file being read.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Iterator for EventFileReader {
    type Item = Result<MemoryEventStore>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line += 1;
            if line.trim().is_empty() {
                continue;
            }
            return Some(serde_json::from_str(&line).map_err(|e| {
                Error::InvalidFormat(format!("{}:{}: {e}", self.path.display(), self.line))
            }));
        }
    }
}

/// Reads every event of a JSON Lines file.
///
/// # Errors
/// Returns the first I/O or decoding error.
pub fn read_events<P: AsRef<Path>>(path: P) -> Result<Vec<MemoryEventStore>> {
    EventFileReader::open(path)?.collect()
}

/// Writes events as JSON Lines, one event per line.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_events<'a, P, I>(path: P, events: I) -> Result<usize>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = &'a MemoryEventStore>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    let mut count = 0;
    for event in events {
        serde_json::to_writer(&mut writer, event)?;
        writer.write_all(b"\n")?;
        count += 1;
    }
    writer.flush()?;
    Ok(count)
}
