//! Lazy line tokenizer over an in-memory text blob.

use std::iter::FusedIterator;

const BREAKS: [char; 2] = ['\r', '\n'];

/// Iterator over the non-empty lines of a text.
///
/// `\r` and `\n` are both terminators, so `\r\n` and runs of blank lines
/// collapse into a single boundary. Calling [`scan_lines`] again on the
/// same text restarts the sequence.
#[derive(Debug, Clone)]
pub struct Lines<'a> {
    rest: &'a str,
}

/// Scan `text` into its non-empty lines.
pub fn scan_lines(text: &str) -> Lines<'_> {
    Lines { rest: text }
}

impl<'a> Iterator for Lines<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.rest.trim_start_matches(BREAKS);
        if start.is_empty() {
            self.rest = start;
            return None;
        }

        let end = start.find(BREAKS).unwrap_or(start.len());
        let (line, rest) = start.split_at(end);
        self.rest = rest;
        Some(line)
    }
}

impl FusedIterator for Lines<'_> {}
