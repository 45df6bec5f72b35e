//! CLI: version and argument parsing.

use clap::Parser;

use crate::constants::{DEFAULT_FILE, DEFAULT_LINES};
use crate::coordinates::TaskCoordinates;
use crate::cursor::{Direction, ReadConfig};
use crate::format::OutputFormat;
use crate::settings::{ENDPOINT_ENV, parse_header};

pub const VERSION: &str = match option_env!("SANDTAIL_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};

/// Tail a file in a remote task sandbox.
#[derive(Debug, Parser)]
#[command(name = "sandtail", version = VERSION)]
pub struct Cli {
    pub agent_id: String,
    pub framework_id: String,
    pub executor_id: String,
    pub container_id: String,

    /// Nested task directory for tasks inside a pod
    #[arg(long)]
    pub task_path: Option<String>,

    /// Sandbox file to read
    #[arg(long, default_value = DEFAULT_FILE)]
    pub file: String,

    /// Number of lines to print (default: all, or 10 with --tail)
    #[arg(short = 'n', long)]
    pub lines: Option<usize>,

    /// Start from the last lines instead of the beginning
    #[arg(short, long)]
    pub tail: bool,

    /// Keep polling for appended content
    #[arg(short, long)]
    pub follow: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Extra request header, NAME: VALUE (repeatable)
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Read endpoint URL
    #[arg(long, env = ENDPOINT_ENV)]
    pub endpoint: Option<String>,

    /// Bytes per read request
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Delay between polls with --follow
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,
}

impl Cli {
    pub fn coordinates(&self) -> TaskCoordinates {
        let coordinates = TaskCoordinates::new(
            &self.agent_id,
            &self.framework_id,
            &self.executor_id,
            &self.container_id,
        );
        match &self.task_path {
            Some(task_path) => coordinates.with_task_path(task_path),
            None => coordinates,
        }
    }

    /// Direction, limit and stream mode from the flags. Headers and chunk
    /// size are layered on by the caller.
    pub fn read_config(&self) -> ReadConfig {
        let (direction, max_lines) = if self.tail {
            (Direction::BottomToTop, self.lines.unwrap_or(DEFAULT_LINES))
        } else {
            (Direction::TopToBottom, self.lines.unwrap_or(usize::MAX))
        };
        ReadConfig::default()
            .direction(direction)
            .max_lines(max_lines)
            .stream(self.follow)
    }
}
