//! In-memory read endpoint for unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::error::FetchError;
use crate::fetch::{ReadEndpoint, ReadRange, ReadRequest, RemoteChunk};

/// Serves one growing byte buffer the way the remote endpoint does: reads
/// past the end return empty data, size reads return the length.
pub struct MemoryEndpoint {
    content: Mutex<Vec<u8>>,
    calls: AtomicUsize,
    failing: Mutex<Option<StatusCode>>,
    char_aligned: bool,
}

impl MemoryEndpoint {
    pub fn new(content: impl Into<Vec<u8>>) -> Self {
        Self {
            content: Mutex::new(content.into()),
            calls: AtomicUsize::new(0),
            failing: Mutex::new(None),
            char_aligned: false,
        }
    }

    /// Keeps every window on UTF-8 character boundaries the way an endpoint
    /// returning `data` as a JSON string must: the start moves forward and is
    /// reported in `offset`, the end moves back.
    pub fn char_aligned(content: impl Into<Vec<u8>>) -> Self {
        Self {
            char_aligned: true,
            ..Self::new(content)
        }
    }

    pub fn append(&self, more: &[u8]) {
        self.content.lock().unwrap().extend_from_slice(more);
    }

    /// Every following read answers with `status`.
    pub fn fail_with(&self, status: StatusCode) {
        *self.failing.lock().unwrap() = Some(status);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReadEndpoint for MemoryEndpoint {
    async fn read(&self, request: &ReadRequest<'_>) -> Result<RemoteChunk, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = *self.failing.lock().unwrap() {
            return Err(FetchError::Status(status));
        }
        let content = self.content.lock().unwrap();
        match request.range {
            ReadRange::Size => Ok(RemoteChunk {
                data: Vec::new(),
                offset: content.len() as u64,
            }),
            ReadRange::Bytes { offset, length } => {
                let mut start = (offset as usize).min(content.len());
                let mut end = start.saturating_add(length).min(content.len());
                if !self.char_aligned {
                    return Ok(RemoteChunk {
                        data: content[start..end].to_vec(),
                        offset,
                    });
                }
                while !is_char_boundary(&content, start) {
                    start += 1;
                }
                while end > start && !is_char_boundary(&content, end) {
                    end -= 1;
                }
                Ok(RemoteChunk {
                    data: content[start..end.max(start)].to_vec(),
                    offset: start as u64,
                })
            }
        }
    }
}

fn is_char_boundary(content: &[u8], index: usize) -> bool {
    content.get(index).is_none_or(|&b| (b as i8) >= -0x40)
}
