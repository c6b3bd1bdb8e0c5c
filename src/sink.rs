use std::fs::{File, OpenOptions, create_dir_all};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::schema::{DataKind, Record};

// ------------------------------------------------------------
// Stream sink
// ------------------------------------------------------------
//
// Durable append-only writer for exactly one stream, i.e. one
// (pair, data kind) combination on one exchange.
//
// Layout on disk:
//     <base_dir>/<pair>/<exchange>/<data_kind>.jsonl
//
// One record per line, self-delimited by the newline.
//
// CONCURRENCY:
// - A sink is owned by exactly one polling task for the task's
//   lifetime. There is no locking in here; write isolation
//   comes from that ownership, which the supervisor enforces
//   by spawning one task per job.
//
pub struct StreamSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl StreamSink {
    /// Creates the stream directory and opens the stream file in
    /// append mode, so an interrupted run can be resumed without
    /// clobbering earlier records.
    pub fn open(
        base_dir: &Path,
        pair: &str,
        exchange: &str,
        kind: DataKind,
    ) -> io::Result<Self> {
        let dir = base_dir.join(pair).join(exchange);
        create_dir_all(&dir)?;

        let path = dir.join(format!("{}.jsonl", kind.as_str()));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;

        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    /// Appends one record as a single JSON line.
    ///
    /// A failed append leaves the record with the caller; the
    /// owning task decides whether to retry or abandon the
    /// stream. The sink never drops a record silently.
    pub fn append(&mut self, record: &Record) -> io::Result<()> {
        let line = serde_json::to_string(record)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    /// Flushes buffered records to the file.
    ///
    /// Called by the owning task when it reaches a terminal
    /// state, so long user-space buffers never outlive the run.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
