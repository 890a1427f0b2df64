//! Incremental scanner for delimited reports.
//!
//! The parser is fed output chunks in arrival order. A chunk boundary may
//! fall anywhere: inside a delimiter token, inside a report body, or in the
//! middle of stray text. The parser only carries over what it cannot yet
//! classify:
//!
//! - outside a report, the longest suffix that could be the start of the open
//!   token (at most `open.len() - 1` bytes), and the trailing whitespace of the
//!   stray text, which is dropped if an open token follows it;
//! - inside a report, the body received so far.
//!
//! Stray text loses only the whitespace touching a delimiter or either end of
//! the stream. Everything else is kept verbatim, so the concatenated stray
//! segments do not depend on where chunks were split. When a report is left
//! open, the whitespace before its open token stays with the
//! [`ScanEvent::Unterminated`] text.
//!
//! A close token appearing inside a report's JSON string content ends the
//! report early. Producers must not emit it inside payloads.

use super::{Report, ReportDelimiters, ReportParseError, ScanEvent};

/// Stateful scanner turning output chunks into [`ScanEvent`]s.
#[derive(Debug, Clone)]
pub struct ReportParser {
    delimiters: ReportDelimiters,
    /// Unconsumed text carried between chunks.
    pending: String,
    /// Whether an open token has been seen without its close token.
    in_report: bool,
    /// Bytes of `pending` already known not to contain the start of a close
    /// token. Avoids rescanning long report bodies on every chunk.
    searched: usize,
    /// Trailing whitespace of the stray text, not yet emitted.
    stray_tail: String,
    /// Drop leading whitespace of the next stray text. Set at stream start
    /// and after a close token.
    at_boundary: bool,
    /// Whitespace that preceded the open token of the current report.
    open_prefix: String,
}

impl Default for ReportParser {
    fn default() -> Self {
        Self::new(ReportDelimiters::default())
    }
}

impl ReportParser {
    /// Create a parser for the given delimiters.
    #[must_use]
    pub fn new(delimiters: ReportDelimiters) -> Self {
        Self {
            delimiters,
            pending: String::new(),
            in_report: false,
            searched: 0,
            stray_tail: String::new(),
            at_boundary: true,
            open_prefix: String::new(),
        }
    }

    /// Delimiters this parser scans for.
    #[must_use]
    pub fn delimiters(&self) -> &ReportDelimiters {
        &self.delimiters
    }

    /// Returns true while an open token is waiting for its close token.
    #[must_use]
    pub fn is_report_open(&self) -> bool {
        self.in_report
    }

    /// Number of bytes carried over to the next chunk.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len() + self.stray_tail.len()
    }

    /// Feed one chunk and collect everything it resolves, in document order.
    pub fn feed(&mut self, chunk: &str) -> Vec<ScanEvent> {
        let mut events = Vec::new();
        if chunk.is_empty() {
            return events;
        }

        self.pending.push_str(chunk);
        let buf = std::mem::take(&mut self.pending);
        let mut cursor = 0;

        loop {
            let rest = &buf[cursor..];
            if rest.is_empty() {
                break;
            }

            if self.in_report {
                let close_len = self.delimiters.close.len();
                let from = self.searched.min(rest.len());
                let found = rest[from..].find(self.delimiters.close.as_str());
                if let Some(pos) = found {
                    let end = from + pos;
                    self.resolve_body(&rest[..end], &mut events);
                    cursor += end + close_len;
                    self.in_report = false;
                    self.searched = 0;
                    self.open_prefix.clear();
                    self.at_boundary = true;
                } else {
                    let keep = partial_suffix_len(rest, &self.delimiters.close);
                    self.searched = rest.len() - keep;
                    break;
                }
            } else {
                let found = rest.find(self.delimiters.open.as_str());
                if let Some(pos) = found {
                    self.push_stray(&rest[..pos], &mut events);
                    self.open_prefix = std::mem::take(&mut self.stray_tail);
                    cursor += pos + self.delimiters.open.len();
                    self.in_report = true;
                    self.searched = 0;
                } else {
                    let keep = partial_suffix_len(rest, &self.delimiters.open);
                    self.push_stray(&rest[..rest.len() - keep], &mut events);
                    cursor += rest.len() - keep;
                    break;
                }
            }
        }

        self.pending = buf[cursor..].to_string();
        events
    }

    /// End the stream and flush any carried-over state.
    ///
    /// Outside a report the carried suffix is emitted as stray text and
    /// trailing whitespace is dropped. Inside a report the whitespace before
    /// the open token, the token and the partial body are returned verbatim
    /// as [`ScanEvent::Unterminated`]. The parser is reset afterwards.
    pub fn finish(&mut self) -> Vec<ScanEvent> {
        let mut events = Vec::new();
        let pending = std::mem::take(&mut self.pending);

        if self.in_report {
            events.push(ScanEvent::Unterminated(format!(
                "{}{}{pending}",
                self.open_prefix, self.delimiters.open
            )));
        } else {
            self.push_stray(&pending, &mut events);
        }

        self.reset();
        events
    }

    /// Drop all carried-over state.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.in_report = false;
        self.searched = 0;
        self.stray_tail.clear();
        self.at_boundary = true;
        self.open_prefix.clear();
    }

    fn resolve_body(&self, body: &str, events: &mut Vec<ScanEvent>) {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            tracing::debug!("Skipping empty report");
            return;
        }

        match serde_json::from_str::<serde_json::Value>(trimmed) {
            Ok(value) => events.push(ScanEvent::Report(Report::new(value))),
            Err(e) => events.push(ScanEvent::Invalid(ReportParseError::new(trimmed, &e))),
        }
    }

    /// Emit stray text except its trailing whitespace, which is held until
    /// later text shows whether it touches an open token.
    fn push_stray(&mut self, text: &str, events: &mut Vec<ScanEvent>) {
        let text = if self.at_boundary {
            let stripped = text.trim_start();
            if stripped.is_empty() {
                return;
            }
            self.at_boundary = false;
            stripped
        } else {
            text
        };

        let body = text.trim_end();
        if body.is_empty() {
            self.stray_tail.push_str(text);
            return;
        }

        let mut segment = std::mem::take(&mut self.stray_tail);
        segment.push_str(body);
        events.push(ScanEvent::Stray(segment));
        self.stray_tail.push_str(&text[body.len()..]);
    }
}

/// Length of the longest proper prefix of `token` that `text` ends with.
fn partial_suffix_len(text: &str, token: &str) -> usize {
    let max = token.len().saturating_sub(1).min(text.len());
    (1..=max)
        .rev()
        .find(|&len| {
            token.is_char_boundary(len)
                && text.is_char_boundary(text.len() - len)
                && text.ends_with(&token[..len])
        })
        .unwrap_or(0)
}
