//! Line splitting with byte-accurate offsets.

use std::borrow::Cow;

pub const TERMINATOR: u8 = b'\n';

/// One line of the remote file, without its terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    message: Vec<u8>,
    offset: u64,
    terminated: bool,
}

impl Line {
    pub fn new(message: impl Into<Vec<u8>>, offset: u64) -> Self {
        Self {
            message: message.into(),
            offset,
            terminated: true,
        }
    }

    /// Leading piece of a line too long for one chunk; the rest follows.
    pub fn fragment(message: impl Into<Vec<u8>>, offset: u64) -> Self {
        Self {
            message: message.into(),
            offset,
            terminated: false,
        }
    }

    pub fn message(&self) -> &[u8] {
        &self.message
    }

    /// Byte position of the first message byte in the source file.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Message length in bytes, terminator excluded.
    pub fn size(&self) -> usize {
        self.message.len()
    }

    /// False for a fragment of a longer line.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Bytes this line occupies in the file, terminator included.
    pub fn span(&self) -> u64 {
        self.message.len() as u64 + u64::from(self.terminated)
    }
}

/// Rewrites chunk bytes before they are split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Transform {
    #[default]
    Identity,
    /// Byte order reversed, so the first split line is the chunk's last.
    Reverse,
}

impl Transform {
    pub fn apply<'a>(&self, raw: &'a [u8]) -> Cow<'a, [u8]> {
        match self {
            Transform::Identity => Cow::Borrowed(raw),
            Transform::Reverse => {
                let mut bytes = raw.to_vec();
                bytes.reverse();
                Cow::Owned(bytes)
            }
        }
    }
}

/// Result of splitting one chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Split {
    pub lines: Vec<Line>,
    /// Length of the unterminated fragment withheld from `lines`.
    pub partial: usize,
}

impl Split {
    /// Bytes covered by `lines`, terminators included.
    pub fn consumed(&self) -> u64 {
        self.lines.iter().map(Line::span).sum()
    }
}

/// Splits `raw` (after `transform`) on terminators. Line offsets count from
/// `base_offset` in transformed byte order.
pub fn split(raw: &[u8], base_offset: u64, transform: Transform) -> Split {
    let data = transform.apply(raw);
    let mut lines = Vec::new();
    let mut start = 0usize;
    while let Some(pos) = data[start..].iter().position(|&b| b == TERMINATOR) {
        let end = start + pos;
        lines.push(Line::new(&data[start..end], base_offset + start as u64));
        start = end + 1;
    }
    Split {
        lines,
        partial: data.len() - start,
    }
}
