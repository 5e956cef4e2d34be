//! Styled text handed to the message-delivery collaborator.
//!
//! Span text carries legacy `&x` formatting codes untouched; interpreting them
//! is the delivery side's job. [`strip_formatting`] flattens them for plain
//! terminals.

use serde::Serialize;

use crate::config::FORMATTING_MARKER;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "command", rename_all = "snake_case")]
pub enum ClickAction {
    RunCommand(String),
    SuggestCommand(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Span {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub click: Option<ClickAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hover: Option<String>,
}

impl Span {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn on_click(mut self, action: ClickAction) -> Self {
        self.click = Some(action);
        self
    }

    pub fn on_hover(mut self, hover: impl Into<String>) -> Self {
        self.hover = Some(hover.into());
        self
    }

    pub fn is_interactive(&self) -> bool {
        self.click.is_some() || self.hover.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Line {
    pub spans: Vec<Span>,
}

impl Line {
    pub fn new(spans: Vec<Span>) -> Self {
        Self { spans }
    }

    pub fn plain(&self) -> String {
        self.spans
            .iter()
            .map(|span| strip_formatting(&span.text))
            .collect()
    }
}

impl From<Span> for Line {
    fn from(span: Span) -> Self {
        Self { spans: vec![span] }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Message {
    pub lines: Vec<Line>,
}

impl Message {
    pub fn push(&mut self, line: impl Into<Line>) {
        self.lines.push(line.into());
    }

    pub fn plain(&self) -> String {
        self.lines
            .iter()
            .map(Line::plain)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn spans(&self) -> impl Iterator<Item = &Span> {
        self.lines.iter().flat_map(|line| line.spans.iter())
    }
}

impl From<Line> for Message {
    fn from(line: Line) -> Self {
        Self { lines: vec![line] }
    }
}

/// Remove `&x` color and format codes.
pub fn strip_formatting(value: &str) -> String {
    let mut output = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == FORMATTING_MARKER
            && let Some(&code) = chars.peek()
            && is_format_code(code)
        {
            chars.next();
            continue;
        }
        output.push(ch);
    }
    output
}

fn is_format_code(code: char) -> bool {
    matches!(code.to_ascii_lowercase(), '0'..='9' | 'a'..='f' | 'k'..='o' | 'r')
}
