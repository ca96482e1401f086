//! Merge of staged partitions into the destination file
//!
//! The destination is a multi-member gzip stream: an optional header member
//! followed by each partition's bytes verbatim, in list order. Partitions are
//! copied through a fixed-size buffer so memory use does not depend on
//! partition size.

use crate::error::{Error, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWriteExt, BufReader};
use tracing::debug;

/// Gzip member holding `columns` joined by `delimiter`, newline-terminated
pub fn encode_header(columns: &[String], delimiter: char) -> Result<Vec<u8>> {
    let mut line = columns.join(delimiter.encode_utf8(&mut [0u8; 4]));
    line.push('\n');

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(line.as_bytes())?;
    Ok(encoder.finish()?)
}

/// Write `header` (if any) then every file of `parts` in order to `destination`
///
/// The destination is created or truncated. Returns the number of bytes written.
pub async fn merge_partitions(
    destination: &Path,
    header: Option<&[u8]>,
    parts: &[PathBuf],
    buffer_size: usize,
) -> Result<u64> {
    let mut out = tokio::fs::File::create(destination)
        .await
        .map_err(|e| Error::local_io(destination, e))?;
    let mut written = 0u64;

    if let Some(header) = header {
        out.write_all(header)
            .await
            .map_err(|e| Error::local_io(destination, e))?;
        written += header.len() as u64;
    }

    for part in parts {
        debug!(?part, ?destination, "merging partition into result file");

        let file = tokio::fs::File::open(part)
            .await
            .map_err(|e| Error::local_io(part, e))?;
        let mut reader = BufReader::with_capacity(buffer_size, file);
        written += tokio::io::copy_buf(&mut reader, &mut out)
            .await
            .map_err(|e| Error::local_io(destination, e))?;
    }

    out.flush()
        .await
        .map_err(|e| Error::local_io(destination, e))?;

    Ok(written)
}
