//! Safe rendering of message text.
//!
//! Text is sanitized first, then only two constructs are interpreted:
//! `**bold**` spans and blank-line paragraph breaks. Everything else is shown
//! literally.

use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub bold: bool,
}

impl Segment {
    fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            bold: false,
        }
    }

    fn bold(text: &str) -> Self {
        Self {
            text: text.to_string(),
            bold: true,
        }
    }
}

pub type FormattedLine = Vec<Segment>;

fn bold_pattern() -> &'static Regex {
    static BOLD: OnceLock<Regex> = OnceLock::new();
    BOLD.get_or_init(|| Regex::new(r"\*\*(.*?)\*\*").expect("bold pattern is valid"))
}

/// Drop control characters that a terminal would interpret (escape
/// sequences, carriage returns, bells). Newlines and tabs are kept.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|&c| c == '\n' || c == '\t' || !c.is_control())
        .collect()
}

fn format_line(line: &str) -> FormattedLine {
    let mut segments = Vec::new();
    let mut last = 0;

    for caps in bold_pattern().captures_iter(line) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            segments.push(Segment::plain(&line[last..whole.start()]));
        }
        if !inner.as_str().is_empty() {
            segments.push(Segment::bold(inner.as_str()));
        }
        last = whole.end();
    }

    if last < line.len() {
        segments.push(Segment::plain(&line[last..]));
    }
    segments
}

/// Sanitize `text` and split it into display lines. Paragraphs (separated
/// by a blank line) are rendered with one empty line between them.
pub fn format_message(text: &str) -> Vec<FormattedLine> {
    let clean = sanitize(text);
    let mut lines = Vec::new();

    for (i, paragraph) in clean.split("\n\n").enumerate() {
        if i > 0 {
            lines.push(Vec::new());
        }
        for line in paragraph.split('\n') {
            lines.push(format_line(line));
        }
    }
    lines
}

/// Plain-text rendering of [`format_message`], bold markers removed.
pub fn to_plain_text(text: &str) -> String {
    format_message(text)
        .iter()
        .map(|line| line.iter().map(|s| s.text.as_str()).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}
