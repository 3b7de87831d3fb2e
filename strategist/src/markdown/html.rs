//! HTML sink for document export.

use std::fmt::Write;

use super::{BlockSink, HeadingLevel, Inline};

/// Escapes text for use inside HTML element content or a double-quoted attribute.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Writes blocks as `<h1>`..`<h3>`, `<ul><li>`, `<p>` with `<strong>` for bold runs.
#[derive(Debug, Default)]
pub struct HtmlSink {
    out: String,
}

impl HtmlSink {
    pub fn finish(self) -> String {
        self.out
    }

    fn inlines(&mut self, content: &[Inline]) {
        for inline in content {
            match inline {
                Inline::Text(s) => self.out.push_str(&escape_html(s)),
                Inline::Bold(s) => {
                    let _ = write!(self.out, "<strong>{}</strong>", escape_html(s));
                }
            }
        }
    }
}

impl BlockSink for HtmlSink {
    fn heading(&mut self, level: HeadingLevel, content: Vec<Inline>) {
        let n = level.as_u8();
        let _ = write!(self.out, "<h{}>", n);
        self.inlines(&content);
        let _ = write!(self.out, "</h{}>", n);
    }

    fn list(&mut self, items: Vec<Vec<Inline>>) {
        self.out.push_str("<ul>");
        for item in &items {
            self.out.push_str("<li>");
            self.inlines(item);
            self.out.push_str("</li>");
        }
        self.out.push_str("</ul>");
    }

    fn paragraph(&mut self, content: Vec<Inline>) {
        self.out.push_str("<p>");
        self.inlines(&content);
        self.out.push_str("</p>");
    }
}
