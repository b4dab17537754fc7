//! JSON-lines replay feed
//!
//! One `FeedEvent` per line, in the order the host delivered them. Blank
//! lines are ignored; malformed lines are logged and skipped so a single bad
//! record never ends a replay.

use berg_core::FeedEvent;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Failed to read feed: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Line {line}: {source}")]
    ParseError {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Iterator over the events of a JSON-lines source
pub struct JsonLinesFeed<R: BufRead> {
    lines: Lines<R>,
    line: usize,
    skipped: usize,
}

impl JsonLinesFeed<BufReader<File>> {
    /// Open a JSON-lines file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FeedError> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> JsonLinesFeed<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
            skipped: 0,
        }
    }

    /// Parse the next line, including failures
    pub fn next_event(&mut self) -> Option<Result<FeedEvent, FeedError>> {
        loop {
            let text = match self.lines.next()? {
                Ok(text) => text,
                Err(e) => return Some(Err(FeedError::IoError(e))),
            };
            self.line += 1;
            let trimmed = text.trim();
            if trimmed.is_empty() {
                continue;
            }
            return Some(serde_json::from_str(trimmed).map_err(|source| {
                FeedError::ParseError {
                    line: self.line,
                    source,
                }
            }));
        }
    }

    /// Lines that failed to parse so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl<R: BufRead> Iterator for JsonLinesFeed<R> {
    type Item = FeedEvent;

    /// Next well-formed event; bad lines are logged and skipped
    fn next(&mut self) -> Option<FeedEvent> {
        loop {
            match self.next_event()? {
                Ok(event) => return Some(event),
                Err(e) => {
                    self.skipped += 1;
                    log::warn!("[Feed] Skipping record: {}", e);
                }
            }
        }
    }
}

/// Render events as JSON lines
pub fn to_json_lines(events: &[FeedEvent]) -> serde_json::Result<String> {
    let mut out = String::new();
    for event in events {
        out.push_str(&serde_json::to_string(event)?);
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use berg_core::{Order, Trade};
    use chrono::{TimeZone, Utc};
    use std::io::Cursor;

    #[test]
    fn test_reads_events_and_skips_bad_lines() {
        let _ = env_logger::try_init();
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 0).unwrap();
        let mut text = to_json_lines(&[
            FeedEvent::add(Order::bid(1, 1000, 5, ts)),
            FeedEvent::trade(Trade::buy(1001, 2, ts)),
        ])
        .unwrap();
        text.push_str("\n{ \"type\": \"bogus\" }\n");
        text.push_str(&to_json_lines(&[FeedEvent::book_update(ts)]).unwrap());

        let mut feed = JsonLinesFeed::new(Cursor::new(text));
        let events: Vec<FeedEvent> = feed.by_ref().collect();

        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], FeedEvent::OrderAdd { .. }));
        assert!(matches!(events[2], FeedEvent::BookUpdate { .. }));
        assert_eq!(feed.skipped(), 1);
    }

    #[test]
    fn test_parse_error_carries_line_number() {
        let mut feed = JsonLinesFeed::new(Cursor::new("\n\nnot json\n"));
        match feed.next_event() {
            Some(Err(FeedError::ParseError { line, .. })) => assert_eq!(line, 3),
            other => panic!("expected parse error, got {:?}", other.map(|r| r.is_ok())),
        }
        assert!(feed.next_event().is_none());
    }
}
