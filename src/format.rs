// format.rs: Turns free-text analysis into typed display blocks.
//
// Remote text is never treated as markup. `**bold**` and `- ` list markers are
// parsed into spans and bullet flags; everything else stays literal text.

use serde::Serialize;
use std::borrow::Cow;

/// Bullet glyph used when rendering list lines.
pub const BULLET: &str = "•";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "camelCase")]
pub enum Span {
    Plain(String),
    Emphasis(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Line {
    pub bullet: bool,
    pub spans: Vec<Span>,
}

/// A paragraph, delimited in the source by blank lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    pub lines: Vec<Line>,
}

/// Split on blank-line boundaries and parse each block.
pub fn format_analysis(text: &str) -> Vec<Block> {
    split_blocks(text)
        .into_iter()
        .map(|lines| Block {
            lines: lines.into_iter().map(parse_line).collect(),
        })
        .collect()
}

/// Group lines into blocks; one or more whitespace-only lines separate them.
fn split_blocks(text: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for raw in text.split('\n') {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

fn parse_line(line: &str) -> Line {
    match line.strip_prefix("- ") {
        Some(rest) => Line {
            bullet: true,
            spans: parse_spans(rest),
        },
        None => Line {
            bullet: false,
            spans: parse_spans(line),
        },
    }
}

/// `**x**` pairs become emphasis, matched left to right, shortest first.
/// An unpaired `**` is kept as literal text.
fn parse_spans(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut plain = String::new();
    let mut rest = text;

    while let Some(open) = rest.find("**") {
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("**") else {
            break;
        };
        plain.push_str(&rest[..open]);
        let inner = &after_open[..close];
        if !inner.is_empty() {
            if !plain.is_empty() {
                spans.push(Span::Plain(std::mem::take(&mut plain)));
            }
            spans.push(Span::Emphasis(inner.to_string()));
        }
        rest = &after_open[close + 2..];
    }
    plain.push_str(rest);
    if !plain.is_empty() {
        spans.push(Span::Plain(plain));
    }
    spans
}

/// Drop control characters (C0, DEL, C1) so remote text cannot drive the
/// terminal. Tabs and newlines are kept.
pub fn sanitize_terminal(text: &str) -> Cow<'_, str> {
    let keep = |c: char| !c.is_control() || c == '\t' || c == '\n';
    if text.chars().all(keep) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|&c| keep(c)).collect())
    }
}

/// Render blocks as terminal text. `ansi` wraps emphasis in bold escapes;
/// span text is sanitized first, so the only escapes emitted are our own.
pub fn render_text(blocks: &[Block], ansi: bool) -> String {
    let mut out = String::new();
    for (i, block) in blocks.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        for line in &block.lines {
            if line.bullet {
                out.push_str(BULLET);
                out.push(' ');
            }
            for span in &line.spans {
                match span {
                    Span::Plain(t) => out.push_str(&sanitize_terminal(t)),
                    Span::Emphasis(t) if ansi => {
                        out.push_str("\x1b[1m");
                        out.push_str(&sanitize_terminal(t));
                        out.push_str("\x1b[0m");
                    }
                    Span::Emphasis(t) => out.push_str(&sanitize_terminal(t)),
                }
            }
            out.push('\n');
        }
    }
    out
}
