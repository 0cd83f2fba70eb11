//! Bounded output capture

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Default per-stream capture limit: 64 KiB.
pub const DEFAULT_MAX_CAPTURE_BYTES: usize = 64 * 1024;

/// Marker emitted in place of output that fell out of the buffer.
pub const TRUNCATION_MARKER: &str = "[... output truncated ...]";

/// Which process stream a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputStream::Stdout => "stdout",
            OutputStream::Stderr => "stderr",
        }
    }
}

/// Line buffer with a byte limit. When full it drops the oldest lines,
/// so what survives is the tail of the stream. The limit holds no matter
/// how much the process prints.
#[derive(Debug)]
pub struct OutputBuffer {
    lines: VecDeque<String>,
    bytes: usize,
    limit: usize,
    truncated: bool,
}

impl OutputBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            bytes: 0,
            limit,
            truncated: false,
        }
    }

    /// Append one line, evicting from the front until it fits. A single
    /// line longer than the whole limit is kept alone, cut to the limit.
    pub fn push_line(&mut self, line: String) {
        let mut line = line;
        if line.len() > self.limit {
            let mut cut = self.limit;
            while !line.is_char_boundary(cut) {
                cut -= 1;
            }
            line.truncate(cut);
            self.truncated = true;
        }

        // +1 accounts for the newline restored when rendering
        while self.bytes + line.len() + 1 > self.limit && !self.lines.is_empty() {
            if let Some(evicted) = self.lines.pop_front() {
                self.bytes -= evicted.len() + 1;
                self.truncated = true;
            }
        }

        self.bytes += line.len() + 1;
        self.lines.push_back(line);
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn into_captured(self) -> CapturedOutput {
        let mut text = String::with_capacity(self.bytes);
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                text.push('\n');
            }
            text.push_str(line);
        }
        CapturedOutput {
            text,
            truncated: self.truncated,
        }
    }
}

/// Final captured form of one stream: the retained tail plus a flag
/// saying whether older output was dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedOutput {
    /// Retained text, newest lines last
    pub text: String,
    /// True when older output was dropped to stay within the limit
    pub truncated: bool,
}

impl CapturedOutput {
    /// Rendering for summaries and logs: prepends the truncation marker
    /// when part of the stream was dropped.
    pub fn render(&self) -> String {
        if self.truncated {
            format!("{}\n{}", TRUNCATION_MARKER, self.text)
        } else {
            self.text.clone()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && !self.truncated
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.text.contains(needle)
    }
}
