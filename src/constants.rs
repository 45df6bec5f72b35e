//! Crate-wide constants for fetch windows and defaults.

use std::time::Duration;

/// Bytes requested per read call.
pub const CHUNK_SIZE: usize = 64 * 1024; // 64 KiB

/// Lines returned when no count is given in tail mode.
pub const DEFAULT_LINES: usize = 10;

/// Delay between pulls once a followed file has no new content.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Root of every agent's sandbox directories.
pub const SANDBOX_ROOT: &str = "/var/lib/mesos/slave/slaves";

/// File read when none is named.
pub const DEFAULT_FILE: &str = "stdout";
