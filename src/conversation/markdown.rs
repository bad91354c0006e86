//! Markdown to styled lines
//!
//! Assistant messages are rendered into a small line/span model that any
//! front end can paint. Only the subset a chat reply uses is styled; unknown
//! constructs fall through as text.

use pulldown_cmark::{Event, Parser, Tag, TagEnd};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpanStyle {
    pub bold: bool,
    pub italic: bool,
    pub code: bool,
    pub link: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub style: SpanStyle,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: SpanStyle::default(),
        }
    }
}

/// One visual line of a message body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RichLine {
    pub spans: Vec<Span>,
}

impl RichLine {
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.iter().all(|s| s.text.is_empty())
    }
}

/// Raw text lines, one unstyled span each
pub fn plain(text: &str) -> Vec<RichLine> {
    text.split('\n')
        .map(|line| RichLine {
            spans: if line.is_empty() {
                vec![]
            } else {
                vec![Span::plain(line)]
            },
        })
        .collect()
}

/// Render markdown into styled lines. Blocks are separated by one blank line.
pub fn render(text: &str) -> Vec<RichLine> {
    let mut out = LineBuilder::default();

    for event in Parser::new(text) {
        match event {
            Event::Start(tag) => match tag {
                Tag::Paragraph => {
                    if out.lists.is_empty() {
                        out.separate_block();
                    }
                }
                Tag::Heading { .. } => {
                    out.separate_block();
                    out.bold += 1;
                }
                Tag::Strong => out.bold += 1,
                Tag::Emphasis => out.italic += 1,
                Tag::CodeBlock(_) => {
                    out.separate_block();
                    out.code_block = true;
                }
                Tag::List(start) => {
                    if out.lists.is_empty() {
                        out.separate_block();
                    } else {
                        out.flush();
                    }
                    out.lists.push(start);
                }
                Tag::Item => out.start_item(),
                Tag::Link { dest_url, .. } => out.link = Some(dest_url.to_string()),
                _ => {}
            },
            Event::End(tag) => match tag {
                TagEnd::Paragraph | TagEnd::Item => out.flush(),
                TagEnd::Heading(_) => {
                    out.bold = out.bold.saturating_sub(1);
                    out.flush();
                }
                TagEnd::Strong => out.bold = out.bold.saturating_sub(1),
                TagEnd::Emphasis => out.italic = out.italic.saturating_sub(1),
                TagEnd::CodeBlock => {
                    out.code_block = false;
                    out.flush();
                }
                TagEnd::List(_) => {
                    out.lists.pop();
                    out.flush();
                }
                TagEnd::Link => {
                    if let Some(url) = out.link.take() {
                        out.push(&format!(" ({url})"), SpanStyle::default());
                    }
                }
                _ => {}
            },
            Event::Text(text) => {
                let style = out.style();
                out.push_text(&text, style);
            }
            Event::Code(code) => {
                let style = SpanStyle {
                    code: true,
                    ..out.style()
                };
                out.push(&code, style);
            }
            Event::SoftBreak => out.push(" ", out.style()),
            Event::HardBreak => out.break_line(),
            Event::Rule => {
                out.separate_block();
                out.push("───", SpanStyle::default());
                out.flush();
            }
            _ => {}
        }
    }

    out.finish()
}

#[derive(Default)]
struct LineBuilder {
    lines: Vec<RichLine>,
    current: Vec<Span>,
    bold: usize,
    italic: usize,
    code_block: bool,
    link: Option<String>,
    /// Open lists, innermost last; `Some(n)` is the next ordered number
    lists: Vec<Option<u64>>,
}

impl LineBuilder {
    fn style(&self) -> SpanStyle {
        SpanStyle {
            bold: self.bold > 0,
            italic: self.italic > 0,
            code: self.code_block,
            link: self.link.is_some(),
        }
    }

    fn push(&mut self, text: &str, style: SpanStyle) {
        if text.is_empty() {
            return;
        }
        // Merge with the previous span when the style is unchanged
        if let Some(last) = self.current.last_mut() {
            if last.style == style {
                last.text.push_str(text);
                return;
            }
        }
        self.current.push(Span {
            text: text.to_string(),
            style,
        });
    }

    /// Text may carry newlines inside code blocks
    fn push_text(&mut self, text: &str, style: SpanStyle) {
        let mut segments = text.split('\n').peekable();
        while let Some(segment) = segments.next() {
            self.push(segment, style);
            if segments.peek().is_some() {
                self.break_line();
            }
        }
    }

    fn break_line(&mut self) {
        let spans = std::mem::take(&mut self.current);
        self.lines.push(RichLine { spans });
    }

    /// End the current line if anything is on it
    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.break_line();
        }
    }

    fn separate_block(&mut self) {
        self.flush();
        if self.lines.last().is_some_and(|line| !line.is_empty()) {
            self.lines.push(RichLine::default());
        }
    }

    fn start_item(&mut self) {
        self.flush();
        let depth = self.lists.len().saturating_sub(1);
        let marker = match self.lists.last_mut() {
            Some(Some(n)) => {
                let marker = format!("{n}. ");
                *n += 1;
                marker
            }
            _ => "• ".to_string(),
        };
        let indent = "  ".repeat(depth);
        self.push(&format!("{indent}{marker}"), SpanStyle::default());
    }

    fn finish(mut self) -> Vec<RichLine> {
        self.flush();
        while self.lines.last().is_some_and(RichLine::is_empty) {
            self.lines.pop();
        }
        self.lines
    }
}
