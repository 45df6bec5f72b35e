//! Stream Cursor: the pull interface over a remote file.
//!
//! A cursor owns its offset, the lines of the most recent chunk and the
//! count of lines handed out. Each [`Cursor::pull`] issues at most one
//! fetch and never waits for new content; [`Cursor::follow`] is the poll
//! loop for callers that want `tail -f`.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use crate::constants::CHUNK_SIZE;
use crate::coordinates::TaskCoordinates;
use crate::error::Error;
use crate::fetch::{Fetcher, ReadEndpoint};
use crate::format::Formatter;
use crate::locate::locate_tail;
use crate::split::{Line, Transform, split};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    /// Start at the first byte.
    #[default]
    TopToBottom,
    /// Start at the last `max_lines` lines.
    BottomToTop,
}

/// How a cursor reads. Fixed once the cursor is built.
#[derive(Debug, Clone)]
pub struct ReadConfig {
    direction: Direction,
    max_lines: usize,
    stream: bool,
    headers: HeaderMap,
    chunk_size: usize,
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self {
            direction: Direction::TopToBottom,
            max_lines: usize::MAX,
            stream: false,
            headers: HeaderMap::new(),
            chunk_size: CHUNK_SIZE,
        }
    }
}

impl ReadConfig {
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Line limit, and the tail length for [`Direction::BottomToTop`].
    pub fn max_lines(mut self, max_lines: usize) -> Self {
        self.max_lines = max_lines;
        self
    }

    /// In stream mode the line limit never ends the read.
    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    fn validate(&self) -> Result<(), Error> {
        if self.max_lines == 0 {
            return Err(Error::InvalidMaxLines);
        }
        if self.chunk_size == 0 {
            return Err(Error::InvalidChunkSize);
        }
        Ok(())
    }
}

pub struct Cursor {
    fetcher: Fetcher,
    formatter: Box<dyn Formatter>,
    config: ReadConfig,
    offset: u64,
    buffer: VecDeque<Line>,
    emitted: usize,
}

impl Cursor {
    /// Builds a cursor on `file` in the sandbox at `coordinates`. In
    /// [`Direction::BottomToTop`] this searches for the tail offset first.
    pub async fn new(
        endpoint: Arc<dyn ReadEndpoint>,
        coordinates: &TaskCoordinates,
        file: &str,
        formatter: Box<dyn Formatter>,
        config: ReadConfig,
    ) -> Result<Self, Error> {
        coordinates.validate()?;
        if file.is_empty() {
            return Err(Error::EmptyCoordinate("file"));
        }
        config.validate()?;

        let fetcher = Fetcher::new(
            endpoint,
            coordinates.file_path(file),
            config.headers.clone(),
        );
        let offset = match config.direction {
            Direction::TopToBottom => 0,
            Direction::BottomToTop => {
                locate_tail(&fetcher, config.max_lines, config.chunk_size).await?
            }
        };
        debug!(path = fetcher.path(), offset, direction = ?config.direction, "cursor ready");

        Ok(Self {
            fetcher,
            formatter,
            config,
            offset,
            buffer: VecDeque::new(),
            emitted: 0,
        })
    }

    /// Next encoded line, or `None` at end of data.
    ///
    /// Outside stream mode `None` is final once `max_lines` lines were
    /// returned. In stream mode `None` means the last fetch found no
    /// complete line; pulling again later picks up appended content.
    pub async fn pull(&mut self) -> Result<Option<Vec<u8>>, Error> {
        if !self.config.stream && self.emitted >= self.config.max_lines {
            return Ok(None);
        }
        if self.buffer.is_empty() {
            self.refill().await?;
        }
        let Some(line) = self.buffer.pop_front() else {
            return Ok(None);
        };
        // Pieces of an oversized line count once, with the piece that ends it.
        if line.is_terminated() {
            self.emitted += 1;
        }
        Ok(Some(self.formatter.format_line(&line)?))
    }

    /// [`Cursor::pull`], abandoned with [`Error::Cancelled`] if `cancel`
    /// completes first. The cursor is unchanged by an abandoned pull.
    pub async fn pull_until<F>(&mut self, cancel: F) -> Result<Option<Vec<u8>>, Error>
    where
        F: Future,
    {
        tokio::select! {
            result = self.pull() => result,
            _ = cancel => Err(Error::Cancelled),
        }
    }

    async fn refill(&mut self) -> Result<(), Error> {
        let chunk = self
            .fetcher
            .fetch(self.offset, self.config.chunk_size)
            .await?;
        let mut split = split(&chunk.data, self.offset, Transform::Identity);
        if split.lines.is_empty() && fills_window(chunk.data.len(), self.config.chunk_size) {
            // A line longer than a whole chunk goes out in chunk-sized pieces.
            split.partial = 0;
            split.lines.push(Line::fragment(chunk.data, self.offset));
        }
        let consumed = split.consumed();

        debug!(
            path = self.fetcher.path(),
            offset = self.offset,
            consumed,
            held_back = split.partial,
            lines = split.lines.len(),
            "fetched chunk"
        );
        self.offset += consumed;
        self.buffer.extend(split.lines);
        Ok(())
    }

    /// Byte position of the next fetch.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn emitted(&self) -> usize {
        self.emitted
    }

    pub fn is_stream(&self) -> bool {
        self.config.stream
    }

    pub fn content_type(&self) -> &'static str {
        self.formatter.content_type()
    }

    /// Encoded lines until end of data, e.g. for a response body.
    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<u8>, Error>> {
        futures::stream::try_unfold(self, Self::pull_owned)
    }

    /// Like [`Cursor::into_stream`], but in stream mode end of data waits
    /// `interval` and pulls again instead of ending.
    pub fn follow(self, interval: Duration) -> impl Stream<Item = Result<Vec<u8>, Error>> {
        futures::stream::try_unfold(self, move |cursor| cursor.follow_next(interval))
    }

    async fn pull_owned(mut self) -> Result<Option<(Vec<u8>, Self)>, Error> {
        Ok(self.pull().await?.map(|block| (block, self)))
    }

    async fn follow_next(mut self, interval: Duration) -> Result<Option<(Vec<u8>, Self)>, Error> {
        loop {
            if let Some(block) = self.pull().await? {
                return Ok(Some((block, self)));
            }
            if !self.config.stream {
                return Ok(None);
            }
            tokio::time::sleep(interval).await;
        }
    }
}

/// Most bytes an endpoint drops from a window's end to keep a character whole.
const MAX_CHAR_TRIM: usize = 3;

/// Whether `len` bytes are a full window, allowing for a trimmed character.
fn fills_window(len: usize, chunk_size: usize) -> bool {
    len >= chunk_size || (len > MAX_CHAR_TRIM && len + MAX_CHAR_TRIM >= chunk_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::fetch::{ReadRequest, RemoteChunk};
    use crate::format::{JsonFormat, TextFormat};
    use crate::testing::MemoryEndpoint;
    use async_trait::async_trait;
    use futures::StreamExt;
    use reqwest::StatusCode;

    fn coords() -> TaskCoordinates {
        TaskCoordinates::new("agent", "framework", "executor", "container")
    }

    async fn cursor(endpoint: &Arc<MemoryEndpoint>, config: ReadConfig) -> Cursor {
        Cursor::new(
            endpoint.clone(),
            &coords(),
            "stdout",
            Box::new(TextFormat),
            config,
        )
        .await
        .unwrap()
    }

    async fn drain(cursor: &mut Cursor) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(block) = cursor.pull().await.unwrap() {
            out.push(String::from_utf8(block).unwrap());
        }
        out
    }

    fn numbered(k: usize) -> String {
        (0..k).map(|i| format!("line {}\n", i)).collect()
    }

    #[tokio::test]
    async fn test_reads_whole_file_in_order() {
        let content = numbered(30);
        for chunk_size in [9, 10, 17, 64, CHUNK_SIZE] {
            let endpoint = Arc::new(MemoryEndpoint::new(content.clone()));
            let mut c = cursor(&endpoint, ReadConfig::default().chunk_size(chunk_size)).await;
            let out = drain(&mut c).await;
            assert_eq!(out.len(), 30, "chunk={}", chunk_size);
            assert_eq!(out.concat(), content);
            assert_eq!(c.offset(), content.len() as u64);
        }
    }

    #[tokio::test]
    async fn test_tail_example() {
        let endpoint = Arc::new(MemoryEndpoint::new("a\nb\nc\nd\n"));
        let config = ReadConfig::default()
            .direction(Direction::BottomToTop)
            .max_lines(2)
            .chunk_size(3);
        let mut c = cursor(&endpoint, config).await;
        assert_eq!(c.offset(), 4);
        assert_eq!(drain(&mut c).await, vec!["c\n", "d\n"]);
    }

    #[tokio::test]
    async fn test_tail_yields_exactly_last_lines() {
        let content = numbered(40);
        let endpoint = Arc::new(MemoryEndpoint::new(content));
        for n in [1, 7, 39, 40, 41] {
            let config = ReadConfig::default()
                .direction(Direction::BottomToTop)
                .max_lines(n)
                .chunk_size(16);
            let mut c = cursor(&endpoint, config).await;
            let out = drain(&mut c).await;
            let first = 40usize.saturating_sub(n);
            let expected: Vec<String> = (first..40).map(|i| format!("line {}\n", i)).collect();
            assert_eq!(out, expected, "n={}", n);
        }
    }

    #[tokio::test]
    async fn test_limit_ends_read_with_more_content() {
        let endpoint = Arc::new(MemoryEndpoint::new(numbered(10)));
        let mut c = cursor(&endpoint, ReadConfig::default().max_lines(3)).await;
        assert_eq!(drain(&mut c).await.len(), 3);
        let calls = endpoint.calls();
        assert_eq!(c.pull().await.unwrap(), None);
        assert_eq!(endpoint.calls(), calls);
        assert_eq!(c.emitted(), 3);
    }

    #[tokio::test]
    async fn test_stream_ignores_limit_and_resumes() {
        let endpoint = Arc::new(MemoryEndpoint::new("a\nb\npar"));
        let config = ReadConfig::default().max_lines(1).stream(true);
        let mut c = cursor(&endpoint, config).await;
        assert_eq!(drain(&mut c).await, vec!["a\n", "b\n"]);
        assert_eq!(c.offset(), 4);

        endpoint.append(b"tial\nz\n");
        assert_eq!(drain(&mut c).await, vec!["partial\n", "z\n"]);
        assert_eq!(c.pull().await.unwrap(), None);
        assert_eq!(c.emitted(), 4);
    }

    #[tokio::test]
    async fn test_blank_lines_are_content() {
        let endpoint = Arc::new(MemoryEndpoint::new("a\n\nb\n"));
        let mut c = cursor(&endpoint, ReadConfig::default()).await;
        assert_eq!(drain(&mut c).await, vec!["a\n", "\n", "b\n"]);
    }

    #[tokio::test]
    async fn test_at_most_one_fetch_per_pull() {
        let endpoint = Arc::new(MemoryEndpoint::new(numbered(20)));
        let mut c = cursor(&endpoint, ReadConfig::default().chunk_size(20)).await;
        loop {
            let before = endpoint.calls();
            let pulled = c.pull().await.unwrap();
            assert!(endpoint.calls() - before <= 1);
            if pulled.is_none() {
                break;
            }
        }
    }

    #[tokio::test]
    async fn test_oversized_line_makes_progress() {
        let endpoint = Arc::new(MemoryEndpoint::new("abcdefghij\nk\n"));
        let mut c = cursor(&endpoint, ReadConfig::default().chunk_size(4)).await;
        let out = drain(&mut c).await;
        assert_eq!(out, vec!["abcd", "efgh", "ij\n", "k\n"]);
        assert_eq!(out.concat(), "abcdefghij\nk\n");
        assert_eq!(c.emitted(), 2);
    }

    #[tokio::test]
    async fn test_oversized_multibyte_line_with_trimmed_windows() {
        let content = "✓✓✓✓✓✓\nok\n";
        let endpoint = Arc::new(MemoryEndpoint::char_aligned(content));
        let mut c = cursor(&endpoint, ReadConfig::default().chunk_size(8)).await;
        let out = drain(&mut c).await;
        assert_eq!(out, vec!["✓✓", "✓✓", "✓✓\n", "ok\n"]);
        assert_eq!(c.offset(), content.len() as u64);
    }

    #[tokio::test]
    async fn test_oversized_line_counts_once_against_limit() {
        let content = format!("{}\nx\n", "z".repeat(10));
        let endpoint = Arc::new(MemoryEndpoint::new(content.clone()));
        let config = ReadConfig::default()
            .direction(Direction::BottomToTop)
            .max_lines(2)
            .chunk_size(4);
        let mut c = cursor(&endpoint, config).await;
        assert_eq!(c.offset(), 0);
        assert_eq!(drain(&mut c).await.concat(), content);
        assert_eq!(c.emitted(), 2);

        let mut c = cursor(&endpoint, ReadConfig::default().max_lines(1).chunk_size(4)).await;
        assert_eq!(drain(&mut c).await.concat(), format!("{}\n", "z".repeat(10)));
    }

    #[tokio::test]
    async fn test_tail_skips_unterminated_last_line() {
        let endpoint = Arc::new(MemoryEndpoint::new("a\nb\nc"));
        let tail = |n| {
            ReadConfig::default()
                .direction(Direction::BottomToTop)
                .max_lines(n)
        };
        let mut c = cursor(&endpoint, tail(1)).await;
        assert_eq!(drain(&mut c).await, vec!["b\n"]);
        let mut c = cursor(&endpoint, tail(2).chunk_size(2)).await;
        assert_eq!(drain(&mut c).await, vec!["a\n", "b\n"]);
    }

    #[tokio::test]
    async fn test_json_lines_carry_offsets() {
        let endpoint = Arc::new(MemoryEndpoint::new("x\nyy\n"));
        let mut c = Cursor::new(
            endpoint.clone(),
            &coords(),
            "stdout",
            Box::new(JsonFormat),
            ReadConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(c.content_type(), "application/json");
        c.pull().await.unwrap();
        let second = c.pull().await.unwrap().unwrap();
        let v: serde_json::Value = serde_json::from_slice(&second).unwrap();
        assert_eq!(v["message"], "yy");
        assert_eq!(v["offset"], 2);
        assert_eq!(v["size"], 2);
    }

    #[tokio::test]
    async fn test_construction_errors() {
        let endpoint: Arc<dyn ReadEndpoint> = Arc::new(MemoryEndpoint::new("a\n"));
        let empty = TaskCoordinates::new("agent", "", "executor", "container");
        let err = Cursor::new(
            endpoint.clone(),
            &empty,
            "stdout",
            Box::new(TextFormat),
            ReadConfig::default(),
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, Error::EmptyCoordinate("framework id")));

        let err = Cursor::new(
            endpoint.clone(),
            &coords(),
            "stdout",
            Box::new(TextFormat),
            ReadConfig::default().max_lines(0),
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, Error::InvalidMaxLines));

        let err = Cursor::new(
            endpoint,
            &coords(),
            "stdout",
            Box::new(TextFormat),
            ReadConfig::default().chunk_size(0),
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(err, Error::InvalidChunkSize));
    }

    #[tokio::test]
    async fn test_tail_search_failure_fails_construction() {
        let endpoint = Arc::new(MemoryEndpoint::new("a\n"));
        endpoint.fail_with(StatusCode::SERVICE_UNAVAILABLE);
        let err = Cursor::new(
            endpoint.clone(),
            &coords(),
            "stdout",
            Box::new(TextFormat),
            ReadConfig::default().direction(Direction::BottomToTop),
        )
        .await
        .err()
        .unwrap();
        assert!(err.is_fetch());
    }

    #[tokio::test]
    async fn test_fetch_error_is_not_end_of_data() {
        let endpoint = Arc::new(MemoryEndpoint::new("a\nb\n"));
        let mut c = cursor(&endpoint, ReadConfig::default().chunk_size(2)).await;
        assert_eq!(c.pull().await.unwrap(), Some(b"a\n".to_vec()));
        endpoint.fail_with(StatusCode::INTERNAL_SERVER_ERROR);
        let err = c.pull().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Fetch(FetchError::Status(StatusCode::INTERNAL_SERVER_ERROR))
        ));
        assert_eq!(c.offset(), 2);
    }

    struct PendingEndpoint;

    #[async_trait]
    impl ReadEndpoint for PendingEndpoint {
        async fn read(&self, _request: &ReadRequest<'_>) -> Result<RemoteChunk, FetchError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_pull_until_cancels_in_flight_fetch() {
        let mut c = Cursor::new(
            Arc::new(PendingEndpoint),
            &coords(),
            "stdout",
            Box::new(TextFormat),
            ReadConfig::default(),
        )
        .await
        .unwrap();
        let err = c.pull_until(async {}).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(c.offset(), 0);
        assert_eq!(c.emitted(), 0);
    }

    #[tokio::test]
    async fn test_into_stream_collects_all() {
        let endpoint = Arc::new(MemoryEndpoint::new("1\n2\n3\n"));
        let c = cursor(&endpoint, ReadConfig::default()).await;
        let blocks: Vec<Vec<u8>> = c
            .into_stream()
            .map(|block| block.unwrap())
            .collect()
            .await;
        assert_eq!(blocks.concat(), b"1\n2\n3\n");
    }

    #[tokio::test]
    async fn test_follow_waits_for_appended_content() {
        let endpoint = Arc::new(MemoryEndpoint::new("first\n"));
        let c = cursor(&endpoint, ReadConfig::default().stream(true)).await;
        let mut blocks = Box::pin(c.follow(Duration::from_millis(5)));
        assert_eq!(blocks.next().await.unwrap().unwrap(), b"first\n");

        let writer = endpoint.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            writer.append(b"second\n");
        });
        assert_eq!(blocks.next().await.unwrap().unwrap(), b"second\n");
    }

    #[tokio::test]
    async fn test_follow_ends_without_stream() {
        let endpoint = Arc::new(MemoryEndpoint::new("only\n"));
        let c = cursor(&endpoint, ReadConfig::default()).await;
        let blocks: Vec<_> = c.follow(Duration::from_millis(5)).collect().await;
        assert_eq!(blocks.len(), 1);
    }
}
