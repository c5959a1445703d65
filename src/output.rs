//! Newline-delimited JSON output files.
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{error, info};

pub const GENRES_FILE: &str = "genres.jsonl";
pub const MOVIE_DETAILS_FILE: &str = "moviedetails.jsonl";

/// Truncates `path` and writes one JSON document per line, in order.
///
/// Stops at the first record that fails to encode or write; lines already
/// written stay in the file.
pub fn write_jsonl<'a, T, I>(path: &Path, records: I) -> Result<usize>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    let mut written = 0usize;

    for record in records {
        let line = match serde_json::to_vec(record) {
            Ok(line) => line,
            Err(e) => {
                error!("Error encoding JSON for {}: {}", path.display(), e);
                flush_partial(&mut out, path);
                return Err(e).with_context(|| format!("Failed to encode record {}", written));
            }
        };
        if let Err(e) = out.write_all(&line).and_then(|_| out.write_all(b"\n")) {
            error!("Error writing to {}: {}", path.display(), e);
            return Err(e).with_context(|| format!("Failed to write {}", path.display()));
        }
        written += 1;
    }

    out.flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    info!("Wrote {} records to {}", written, path.display());
    Ok(written)
}

fn flush_partial(out: &mut BufWriter<File>, path: &Path) {
    if let Err(e) = out.flush() {
        error!("Error flushing partial {}: {}", path.display(), e);
    }
}

/// Reads back a file produced by [`write_jsonl`]. Blank lines are skipped.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut records = Vec::new();
    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line)
            .with_context(|| format!("Invalid JSON on line {} of {}", n + 1, path.display()))?;
        records.push(record);
    }
    Ok(records)
}
