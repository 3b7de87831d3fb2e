//! Standalone HTML report for export to word processors.

use std::fmt::Write;

use crate::markdown::{escape_html, to_html};
use crate::model::AnalysisResult;
use crate::prompts::Labels;

const STYLESHEET: &str = "\
body { font-family: Calibri, sans-serif; font-size: 11pt; }
h1 { color: #2E74B5; }
h2 { color: #365F91; }
h3 { color: #4F81BD; }
strong { font-weight: bold; }
ul { list-style-type: disc; margin-left: 20px; }";

/// Builds a full HTML document: title heading, then one section per narrative
/// field in display order. The local section is present only when there is
/// local-opportunity text.
pub fn render_report_html(result: &AnalysisResult, business_name: &str, labels: &Labels) -> String {
    let title = escape_html(&format!("{} {}", labels.document_title, business_name));
    let heading = escape_html(&format!("{} {}", labels.report_title, business_name));

    let mut sections = vec![
        (&labels.swot, result.swot_analysis.as_str()),
        (&labels.target_audience, result.target_audience_profile.as_str()),
        (&labels.market_trends, result.market_trends.as_str()),
    ];
    if let Some(local) = result.local_opportunities.as_deref().filter(|t| !t.is_empty()) {
        sections.push((&labels.local_opportunities, local));
    }
    sections.push((&labels.marketing_strategy, result.marketing_strategy.as_str()));

    let mut body = format!("<h1>{}</h1>\n", heading);
    for (heading, text) in sections {
        let _ = writeln!(body, "<h2>{}</h2>{}", escape_html(heading), to_html(text));
    }

    format!(
        "<!DOCTYPE html>\n<html lang=\"{lang}\">\n<head>\n<meta charset=\"UTF-8\">\n\
         <title>{title}</title>\n<style>\n{style}\n</style>\n</head>\n<body>\n{body}</body>\n</html>\n",
        lang = escape_html(&labels.document_lang),
        title = title,
        style = STYLESHEET,
        body = body,
    )
}
