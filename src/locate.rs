//! Backward Locator: finds where the last N lines of a remote file start.
//!
//! Walks the file from the end one chunk at a time. Each chunk is split
//! with [`Transform::Reverse`], so lines come out nearest-EOF first and
//! their spans give the terminator positions directly; no chunk is fetched
//! twice. Only terminated lines count: bytes after the file's last
//! terminator are a line still being written, which a cursor holds back.

use tracing::{debug, info};

use crate::error::FetchError;
use crate::fetch::Fetcher;
use crate::split::{Transform, split};
use crate::util::format_bytes;

/// Byte offset of the first of the last `lines` terminated lines. Zero when
/// the file holds `lines` terminated lines or fewer.
pub async fn locate_tail(
    fetcher: &Fetcher,
    lines: usize,
    chunk_size: usize,
) -> Result<u64, FetchError> {
    let size = fetcher.file_size().await?;
    if lines == 0 {
        return Ok(size);
    }

    let mut end = size;
    let mut found = 0usize;
    let mut last_terminator_seen = false;
    while end > 0 {
        let start = end.saturating_sub(chunk_size as u64);
        let chunk = fetcher.fetch(start, (end - start) as usize).await?;
        let reversed = split(&chunk.data, 0, Transform::Reverse);
        debug!(
            start,
            end,
            lines = reversed.lines.len(),
            found,
            "scanned chunk backwards"
        );

        // Position of the terminator ending each reversed line, moving toward the head.
        // The endpoint may have moved the window start to a character boundary.
        let mut terminator = chunk.offset + chunk.data.len() as u64;
        for line in &reversed.lines {
            terminator -= line.span();
            // The last terminator ends the last line; it starts none.
            if !last_terminator_seen {
                last_terminator_seen = true;
                continue;
            }
            found += 1;
            if found == lines {
                let offset = terminator + 1;
                info!(
                    path = fetcher.path(),
                    offset,
                    size = %format_bytes(size),
                    "located last {} lines",
                    lines
                );
                return Ok(offset);
            }
        }
        end = start;
    }

    info!(
        path = fetcher.path(),
        found, "file shorter than requested tail, reading from start"
    );
    Ok(0)
}
