//! Renderer for the small markdown dialect the model is asked to write.
//!
//! Supported: `# `, `## `, `### ` headings, `* ` / `- ` bullet lists, `**bold**`
//! spans and paragraphs. Anything else is a paragraph. Rendering never fails.
//!
//! Classification runs once, in [`render`], and drives a [`BlockSink`]. The
//! structured tree ([`DocumentSink`], [`parse`]) and the export markup
//! ([`HtmlSink`], [`to_html`]) are two sinks over the same state machine, so what
//! is shown on screen and what is exported cannot diverge.
//!
//! # Bold spans
//!
//! A line is split on the literal `**` and odd-indexed segments are bold. With an
//! odd number of delimiters the rest of the line after the last one is bold:
//! `a **b` renders `a ` plain and `b` bold. This is kept as is.

mod html;

pub use html::{escape_html, HtmlSink};

/// Inline run of text inside a heading, list item or paragraph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Bold(String),
}

impl Inline {
    pub fn text(&self) -> &str {
        match self {
            Inline::Text(s) | Inline::Bold(s) => s,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
}

impl HeadingLevel {
    pub fn as_u8(self) -> u8 {
        match self {
            HeadingLevel::H1 => 1,
            HeadingLevel::H2 => 2,
            HeadingLevel::H3 => 3,
        }
    }
}

/// Block element of a rendered document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    Heading {
        level: HeadingLevel,
        content: Vec<Inline>,
    },
    /// Unordered list; one `Vec<Inline>` per item.
    List(Vec<Vec<Inline>>),
    Paragraph(Vec<Inline>),
}

/// Structured document: the blocks in source order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Receives classified blocks from [`render`].
pub trait BlockSink {
    fn heading(&mut self, level: HeadingLevel, content: Vec<Inline>);
    fn list(&mut self, items: Vec<Vec<Inline>>);
    fn paragraph(&mut self, content: Vec<Inline>);
}

/// Classification of one trimmed line.
#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Heading(HeadingLevel, &'a str),
    Item(&'a str),
    Text(&'a str),
    Blank,
}

fn classify(line: &str) -> Line<'_> {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix("### ") {
        Line::Heading(HeadingLevel::H3, rest)
    } else if let Some(rest) = line.strip_prefix("## ") {
        Line::Heading(HeadingLevel::H2, rest)
    } else if let Some(rest) = line.strip_prefix("# ") {
        Line::Heading(HeadingLevel::H1, rest)
    } else if let Some(rest) = line.strip_prefix("* ").or_else(|| line.strip_prefix("- ")) {
        Line::Item(rest)
    } else if line.is_empty() {
        Line::Blank
    } else {
        Line::Text(line)
    }
}

/// Splits `line` on `**`; odd-indexed segments are bold, empty segments are dropped.
pub fn split_bold(line: &str) -> Vec<Inline> {
    line.split("**")
        .enumerate()
        .filter(|(_, part)| !part.is_empty())
        .map(|(i, part)| {
            if i % 2 == 1 {
                Inline::Bold(part.to_string())
            } else {
                Inline::Text(part.to_string())
            }
        })
        .collect()
}

enum State {
    Idle,
    InList(Vec<Vec<Inline>>),
}

impl State {
    /// Emits the open list, if any, and returns to `Idle`.
    fn flush<S: BlockSink + ?Sized>(&mut self, sink: &mut S) {
        if let State::InList(items) = std::mem::replace(self, State::Idle) {
            sink.list(items);
        }
    }
}

/// Classifies `text` line by line and feeds the blocks to `sink`.
///
/// A heading, paragraph or blank line closes an open list, so two runs of items
/// separated by a blank line become two lists.
pub fn render<S: BlockSink + ?Sized>(text: &str, sink: &mut S) {
    let mut state = State::Idle;
    for line in text.split('\n') {
        match classify(line) {
            Line::Heading(level, rest) => {
                state.flush(sink);
                sink.heading(level, split_bold(rest));
            }
            Line::Item(rest) => match &mut state {
                State::InList(items) => items.push(split_bold(rest)),
                State::Idle => state = State::InList(vec![split_bold(rest)]),
            },
            Line::Text(rest) => {
                state.flush(sink);
                sink.paragraph(split_bold(rest));
            }
            Line::Blank => state.flush(sink),
        }
    }
    state.flush(sink);
}

/// Collects blocks into a [`Document`].
#[derive(Debug, Default)]
pub struct DocumentSink {
    document: Document,
}

impl DocumentSink {
    pub fn into_document(self) -> Document {
        self.document
    }
}

impl BlockSink for DocumentSink {
    fn heading(&mut self, level: HeadingLevel, content: Vec<Inline>) {
        self.document.blocks.push(Block::Heading { level, content });
    }

    fn list(&mut self, items: Vec<Vec<Inline>>) {
        self.document.blocks.push(Block::List(items));
    }

    fn paragraph(&mut self, content: Vec<Inline>) {
        self.document.blocks.push(Block::Paragraph(content));
    }
}

/// Renders `text` into a structured document for interactive display.
pub fn parse(text: &str) -> Document {
    let mut sink = DocumentSink::default();
    render(text, &mut sink);
    sink.into_document()
}

/// Renders `text` into an HTML fragment for static export.
pub fn to_html(text: &str) -> String {
    let mut sink = HtmlSink::default();
    render(text, &mut sink);
    sink.finish()
}
