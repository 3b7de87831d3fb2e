//! Terminal rendering of an analysis report.
//!
//! Narrative sections go through the same markdown state machine as the HTML
//! export, with [`TerminalSink`] as the sink. Citations are listed under the
//! section they support.

use std::fmt::Write;

use strategist::markdown::{render, BlockSink, HeadingLevel, Inline};
use strategist::{AnalysisResult, GroundingChunk, Labels};

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";
const INDENT: &str = "  ";

/// Writes blocks as plain text; bold runs use ANSI bold when `styled`.
pub struct TerminalSink {
    out: String,
    styled: bool,
}

impl TerminalSink {
    pub fn new(styled: bool) -> Self {
        Self {
            out: String::new(),
            styled,
        }
    }

    pub fn finish(self) -> String {
        self.out
    }

    fn inlines(&mut self, content: &[Inline]) {
        for inline in content {
            match inline {
                Inline::Text(s) => self.out.push_str(s),
                Inline::Bold(s) => self.bold(s),
            }
        }
    }

    fn bold(&mut self, s: &str) {
        if self.styled {
            let _ = write!(self.out, "{}{}{}", BOLD, s, RESET);
        } else {
            self.out.push_str(s);
        }
    }

    fn separate(&mut self) {
        if !self.out.is_empty() {
            self.out.push('\n');
        }
    }
}

impl BlockSink for TerminalSink {
    fn heading(&mut self, level: HeadingLevel, content: Vec<Inline>) {
        self.separate();
        let text: String = content.iter().map(Inline::text).collect();
        match level {
            HeadingLevel::H1 => self.bold(&text.to_uppercase()),
            HeadingLevel::H2 => self.bold(&text),
            HeadingLevel::H3 => self.inlines(&content),
        }
        self.out.push('\n');
    }

    fn list(&mut self, items: Vec<Vec<Inline>>) {
        self.separate();
        for item in &items {
            self.out.push_str(INDENT);
            self.out.push_str("• ");
            self.inlines(item);
            self.out.push('\n');
        }
    }

    fn paragraph(&mut self, content: Vec<Inline>) {
        self.separate();
        self.inlines(&content);
        self.out.push('\n');
    }
}

/// Renders markdown `text` for the terminal.
pub fn render_markdown(text: &str, styled: bool) -> String {
    let mut sink = TerminalSink::new(styled);
    render(text, &mut sink);
    sink.finish()
}

/// Full report: title, executive summary, the narrative sections with their
/// citations, then the numbered follow-up questions.
pub fn format_report(
    result: &AnalysisResult,
    business_name: &str,
    labels: &Labels,
    styled: bool,
) -> String {
    let mut out = String::new();
    let title = format!("{} {}", labels.report_title, business_name);
    let rule = "=".repeat(title.chars().count());
    let _ = writeln!(out, "{}\n{}\n", title, rule);

    section_title(&mut out, &labels.executive_summary, styled);
    let summary = &result.executive_summary;
    let mut entries = vec![
        (&labels.swot, summary.swot.as_str()),
        (&labels.target_audience, summary.target_audience.as_str()),
        (&labels.market_trends, summary.market_trends.as_str()),
    ];
    if let Some(local) = summary.local_opportunities.as_deref() {
        entries.push((&labels.local_opportunities, local));
    }
    entries.push((&labels.marketing_strategy, summary.marketing_strategy.as_str()));
    for (label, text) in entries {
        let _ = writeln!(out, "{}{}: {}", INDENT, label, text);
    }
    out.push('\n');

    let mut sections = vec![
        (&labels.swot, result.swot_analysis.as_str(), None),
        (&labels.target_audience, result.target_audience_profile.as_str(), None),
        (
            &labels.market_trends,
            result.market_trends.as_str(),
            result.market_trends_sources.as_deref(),
        ),
    ];
    if let Some(local) = result.local_opportunities.as_deref().filter(|t| !t.is_empty()) {
        sections.push((
            &labels.local_opportunities,
            local,
            result.local_opportunities_sources.as_deref(),
        ));
    }
    sections.push((&labels.marketing_strategy, result.marketing_strategy.as_str(), None));

    for (heading, text, sources) in sections {
        section_title(&mut out, heading, styled);
        out.push_str(&render_markdown(text, styled));
        if let Some(sources) = sources {
            out.push_str(&format_sources(sources, &labels.sources));
        }
        out.push('\n');
    }

    if let Some(questions) = &result.suggested_questions {
        section_title(&mut out, &labels.suggested_questions, styled);
        out.push_str(&format_suggestions(questions));
    }
    out
}

fn section_title(out: &mut String, title: &str, styled: bool) {
    if styled {
        let _ = writeln!(out, "{}{}{}", BOLD, title, RESET);
    } else {
        let _ = writeln!(out, "{}", title);
    }
    let _ = writeln!(out, "{}", "-".repeat(title.chars().count()));
}

/// `Sumber:` followed by one `[n] title (uri)` line per citation.
pub fn format_sources(sources: &[GroundingChunk], heading: &str) -> String {
    if sources.is_empty() {
        return String::new();
    }
    let mut out = format!("\n{}\n", heading);
    for (i, chunk) in sources.iter().enumerate() {
        let title = if chunk.title().is_empty() {
            chunk.uri()
        } else {
            chunk.title()
        };
        let _ = writeln!(out, "{}[{}] {} ({})", INDENT, i + 1, title, chunk.uri());
    }
    out
}

/// Questions numbered from 1, matching the `/N` shortcut in the chat prompt.
pub fn format_suggestions(questions: &[String]) -> String {
    questions
        .iter()
        .enumerate()
        .map(|(i, q)| format!("{}/{} {}\n", INDENT, i + 1, q))
        .collect()
}
