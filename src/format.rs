//! Output encoders for tailed lines and journal entries.

use std::borrow::Cow;
use std::collections::BTreeMap;

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::error::FormatError;
use crate::split::Line;

pub const CONTENT_TYPE_PLAIN_TEXT: &str = "text/plain";
pub const CONTENT_TYPE_APPLICATION_JSON: &str = "application/json";
pub const CONTENT_TYPE_EVENT_STREAM: &str = "text/event-stream";

/// ANSI C `asctime` layout, e.g. `Mon Jan  2 15:04:05 2006`.
const TEXT_TIME_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// A journal record. Only the parts the encoders touch are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub fields: BTreeMap<String, String>,
    pub cursor: String,
    pub monotonic_timestamp: u64,
    /// Microseconds since the Unix epoch.
    pub realtime_timestamp: u64,
}

#[derive(Serialize)]
struct LineRecord<'a> {
    message: Cow<'a, str>,
    offset: u64,
    size: usize,
    /// Set on a fragment of a line longer than one chunk.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    partial: bool,
}

impl<'a> From<&'a Line> for LineRecord<'a> {
    fn from(line: &'a Line) -> Self {
        Self {
            message: String::from_utf8_lossy(line.message()),
            offset: line.offset(),
            size: line.size(),
            partial: !line.is_terminated(),
        }
    }
}

/// Encodes lines and entries for one output content type.
pub trait Formatter: Send + Sync {
    fn content_type(&self) -> &'static str;

    fn format_line(&self, line: &Line) -> Result<Vec<u8>, FormatError>;

    fn format_entry(&self, entry: &JournalEntry) -> Result<Vec<u8>, FormatError>;
}

/// Plain text, one line per record.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextFormat;

/// One JSON object per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

/// Server-sent events: `data: {json}\n\n`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SseFormat;

impl Formatter for TextFormat {
    fn content_type(&self) -> &'static str {
        CONTENT_TYPE_PLAIN_TEXT
    }

    fn format_line(&self, line: &Line) -> Result<Vec<u8>, FormatError> {
        let mut out = Vec::with_capacity(line.size() + 1);
        out.extend_from_slice(line.message());
        if line.is_terminated() {
            out.push(b'\n');
        }
        Ok(out)
    }

    /// `date _HOSTNAME SYSLOG_IDENTIFIER [_PID] MESSAGE`, skipping absent
    /// fields. Entries without a message encode to nothing.
    fn format_entry(&self, entry: &JournalEntry) -> Result<Vec<u8>, FormatError> {
        let Some(message) = entry.fields.get("MESSAGE") else {
            return Ok(Vec::new());
        };

        let mut parts = vec![format_realtime(entry.realtime_timestamp)];
        if let Some(hostname) = entry.fields.get("_HOSTNAME") {
            parts.push(hostname.clone());
        }
        if let Some(identifier) = entry.fields.get("SYSLOG_IDENTIFIER") {
            parts.push(identifier.clone());
        }
        if let Some(pid) = entry.fields.get("_PID") {
            parts.push(format!("[{}]", pid));
        }
        parts.push(message.clone());
        Ok(format!("{}\n", parts.join(" ")).into_bytes())
    }
}

impl Formatter for JsonFormat {
    fn content_type(&self) -> &'static str {
        CONTENT_TYPE_APPLICATION_JSON
    }

    fn format_line(&self, line: &Line) -> Result<Vec<u8>, FormatError> {
        let mut out = serde_json::to_vec(&LineRecord::from(line))?;
        out.push(b'\n');
        Ok(out)
    }

    fn format_entry(&self, entry: &JournalEntry) -> Result<Vec<u8>, FormatError> {
        let mut out = serde_json::to_vec(entry)?;
        out.push(b'\n');
        Ok(out)
    }
}

impl Formatter for SseFormat {
    fn content_type(&self) -> &'static str {
        CONTENT_TYPE_EVENT_STREAM
    }

    fn format_line(&self, line: &Line) -> Result<Vec<u8>, FormatError> {
        Ok(event(&serde_json::to_vec(&LineRecord::from(line))?))
    }

    fn format_entry(&self, entry: &JournalEntry) -> Result<Vec<u8>, FormatError> {
        Ok(event(&serde_json::to_vec(entry)?))
    }
}

fn event(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 8);
    out.extend_from_slice(b"data: ");
    out.extend_from_slice(payload);
    out.extend_from_slice(b"\n\n");
    out
}

fn format_realtime(micros: u64) -> String {
    let secs = (micros / 1_000_000) as i64;
    match DateTime::from_timestamp(secs, 0) {
        Some(t) => t.format(TEXT_TIME_FORMAT).to_string(),
        None => micros.to_string(),
    }
}

/// Output encodings selectable by name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Sse,
}

impl OutputFormat {
    pub fn formatter(&self) -> Box<dyn Formatter> {
        match self {
            OutputFormat::Text => Box::new(TextFormat),
            OutputFormat::Json => Box::new(JsonFormat),
            OutputFormat::Sse => Box::new(SseFormat),
        }
    }
}
