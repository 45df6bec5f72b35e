//! Tail files in remote task sandboxes.
//!
//! The remote side only offers forward byte-range reads
//! (`?path=..&offset=..&length=..` answered with `{"data", "offset"}`).
//! On top of that this crate provides reading from the start, the last N
//! lines without transferring the whole file, line limits, and following
//! appended content, each line encoded as text, JSON or server-sent events.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sandtail::{Cursor, Direction, HttpEndpoint, ReadConfig, TaskCoordinates, TextFormat};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let url = "http://agent:5051/files/read".parse()?;
//! let endpoint = Arc::new(HttpEndpoint::new(reqwest::Client::new(), url));
//! let coordinates = TaskCoordinates::new("agent", "framework", "executor", "container");
//! let config = ReadConfig::default()
//!     .direction(Direction::BottomToTop)
//!     .max_lines(20);
//! let mut cursor = Cursor::new(endpoint, &coordinates, "stdout", Box::new(TextFormat), config).await?;
//! while let Some(block) = cursor.pull().await? {
//!     print!("{}", String::from_utf8_lossy(&block));
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod constants;
pub mod coordinates;
pub mod cursor;
pub mod error;
pub mod fetch;
pub mod format;
pub mod locate;
pub mod settings;
pub mod split;
pub mod util;

#[cfg(test)]
mod testing;

pub use coordinates::TaskCoordinates;
pub use cursor::{Cursor, Direction, ReadConfig};
pub use error::{Error, FetchError, FormatError};
pub use fetch::{Fetcher, HttpEndpoint, ReadEndpoint, ReadRange, ReadRequest, RemoteChunk};
pub use format::{Formatter, JournalEntry, JsonFormat, OutputFormat, SseFormat, TextFormat};
pub use split::{Line, Split, Transform};
