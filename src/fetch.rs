//! Chunk Fetcher: one GET per call against the remote byte-range read API.
//!
//! The endpoint answers `GET <base>?path=<file>&offset=<n>&length=<n>` with
//! `{"data": "...", "offset": n}`. An offset of `-1` asks for the file size
//! instead, returned in the `offset` field.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use crate::error::FetchError;

/// Wire value of `offset` that turns a read into a size query.
pub const SIZE_OFFSET: i64 = -1;

/// What a single read call asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadRange {
    /// Total file size only; no data.
    Size,
    Bytes { offset: u64, length: usize },
}

#[derive(Debug, Clone)]
pub struct ReadRequest<'a> {
    pub path: &'a str,
    pub range: ReadRange,
    pub headers: &'a HeaderMap,
}

impl ReadRequest<'_> {
    /// Query parameters in wire order. Size reads carry no `length`.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![("path", self.path.to_string())];
        match self.range {
            ReadRange::Size => query.push(("offset", SIZE_OFFSET.to_string())),
            ReadRange::Bytes { offset, length } => {
                query.push(("offset", offset.to_string()));
                query.push(("length", length.to_string()));
            }
        }
        query
    }
}

/// Decoded read response. For a size read, `offset` is the file size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteChunk {
    pub data: Vec<u8>,
    pub offset: u64,
}

#[derive(Deserialize)]
struct ReadResponse {
    data: String,
    offset: i64,
}

/// Decodes a 200 response body. `data` is taken as the UTF-8 bytes of the
/// JSON string, so the endpoint must not cut a window inside a character.
/// It may move the start forward, reporting it in `offset`, and end early.
pub fn decode(body: &[u8]) -> Result<RemoteChunk, FetchError> {
    let response: ReadResponse = serde_json::from_slice(body)?;
    let offset = u64::try_from(response.offset)
        .map_err(|_| FetchError::InvalidOffset(response.offset))?;
    Ok(RemoteChunk {
        data: response.data.into_bytes(),
        offset,
    })
}

/// A remote read endpoint.
///
/// Implementations must be `Send + Sync`: one endpoint is shared by every
/// cursor tailing through it.
#[async_trait]
pub trait ReadEndpoint: Send + Sync {
    async fn read(&self, request: &ReadRequest<'_>) -> Result<RemoteChunk, FetchError>;
}

/// `ReadEndpoint` over HTTP. No retries; any failure is returned as-is.
#[derive(Debug, Clone)]
pub struct HttpEndpoint {
    client: reqwest::Client,
    url: Url,
}

impl HttpEndpoint {
    pub fn new(client: reqwest::Client, url: Url) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl ReadEndpoint for HttpEndpoint {
    async fn read(&self, request: &ReadRequest<'_>) -> Result<RemoteChunk, FetchError> {
        debug!(url = %self.url, path = request.path, range = ?request.range, "read");
        let response = self
            .client
            .get(self.url.clone())
            .query(&request.query())
            .headers(request.headers.clone())
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status));
        }
        let body = response.bytes().await?;
        decode(&body)
    }
}

/// Binds an endpoint to one file and one set of request headers.
#[derive(Clone)]
pub struct Fetcher {
    endpoint: Arc<dyn ReadEndpoint>,
    path: String,
    headers: HeaderMap,
}

impl Fetcher {
    pub fn new(endpoint: Arc<dyn ReadEndpoint>, path: impl Into<String>, headers: HeaderMap) -> Self {
        Self {
            endpoint,
            path: path.into(),
            headers,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Reads up to `length` bytes starting at `offset`.
    pub async fn fetch(&self, offset: u64, length: usize) -> Result<RemoteChunk, FetchError> {
        self.endpoint
            .read(&ReadRequest {
                path: &self.path,
                range: ReadRange::Bytes { offset, length },
                headers: &self.headers,
            })
            .await
    }

    /// Current size of the file in bytes.
    pub async fn file_size(&self) -> Result<u64, FetchError> {
        let chunk = self
            .endpoint
            .read(&ReadRequest {
                path: &self.path,
                range: ReadRange::Size,
                headers: &self.headers,
            })
            .await?;
        Ok(chunk.offset)
    }
}
