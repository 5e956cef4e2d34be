use serde::Serialize;

pub const LINK_SEPARATOR: char = '|';

/// A description line after link parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BodyLine<'a> {
    Plain { text: &'a str },
    Link { target: &'a str, display: &'a str },
}

/// Parse `target|display`. Anything other than exactly one separator stays plain text.
pub fn parse_line(line: &str) -> BodyLine<'_> {
    match line.split_once(LINK_SEPARATOR) {
        Some((target, display)) if !display.contains(LINK_SEPARATOR) => {
            BodyLine::Link { target, display }
        }
        _ => BodyLine::Plain { text: line },
    }
}
