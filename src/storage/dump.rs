//! JSON-lines backup for the memory backend: one serialized
//! [`DumpRecord`] per line, loaded at startup and written back on
//! graceful shutdown.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use crate::models::DumpRecord;

/// Read all records from `path`. A missing file is an empty store, not
/// an error; malformed lines are skipped with a warning.
pub fn load(path: &Path) -> Result<Vec<DumpRecord>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(err).with_context(|| format!("opening dump file {}", path.display()))
        }
    };

    let mut records = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("reading dump file {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<DumpRecord>(&line) {
            Ok(record) => records.push(record),
            Err(err) => {
                warn!(line = number + 1, error = %err, "skipping malformed dump line");
            }
        }
    }
    Ok(records)
}

/// Write `records` to `path`, replacing any previous contents.
pub fn save(path: &Path, records: &[DumpRecord]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("creating dump file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
