use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::debug;

use crate::data::report::ReportDocument;
use crate::render::dashboard::html_escape;

/// The literal flag the scan format uses to mark an issue line.
pub const WARNING_MARKER: &str = "[WARNING]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportView {
    /// No warnings survived filtering; the caller must not display any
    /// report container.
    Hidden,
    Rendered(RenderedReport),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport {
    /// Warning markers counted in the filtered text, not the original
    pub warning_count: usize,
    pub html: String,
}

/// Filters the raw report, counts warnings, and renders the collapsible
/// section view. Pure; rendering the same text twice is identical.
pub fn render_report(raw_text: &str, ignored_patterns: &[String]) -> ReportView {
    let filtered = filter_lines(raw_text, ignored_patterns);
    let warning_count = filtered.matches(WARNING_MARKER).count();
    if warning_count == 0 {
        return ReportView::Hidden;
    }

    let document = ReportDocument::parse(&filtered);
    ReportView::Rendered(RenderedReport {
        warning_count,
        html: render_document(&document, warning_count),
    })
}

/// Drops every line containing any ignored pattern, case-insensitively,
/// then rejoins and trims. Empty patterns are skipped so they cannot wipe
/// the whole report.
pub fn filter_lines(text: &str, ignored_patterns: &[String]) -> String {
    let patterns: Vec<String> = ignored_patterns
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| p.to_lowercase())
        .collect();

    text.lines()
        .filter(|line| {
            let lower = line.to_lowercase();
            !patterns.iter().any(|p| lower.contains(p))
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn render_document(document: &ReportDocument, warning_count: usize) -> String {
    let label = if warning_count == 1 {
        "warning"
    } else {
        "warnings"
    };
    let mut s = String::new();
    s.push_str(&format!(
        "<details open class=\"report-summary\"><summary>{warning_count} {label}</summary>"
    ));
    s.push_str(&markdown_to_html(&document.introduction));
    s.push_str("</details>");
    for section in &document.sections {
        s.push_str(&format!(
            "<details class=\"report-section\"><summary>{}</summary>",
            inline(&section.title)
        ));
        s.push_str(&markdown_to_html(&section.body));
        s.push_str("</details>");
    }
    s
}

/// The minimal markdown subset the scan reports use: first and third level
/// headers, fenced code blocks, bullet runs, and the warning marker.
fn markdown_to_html(text: &str) -> String {
    let mut out = String::new();
    let mut in_fence = false;
    let mut in_list = false;

    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            if in_fence {
                out.push_str("</code></pre>");
            } else {
                if in_list {
                    out.push_str("</ul>");
                    in_list = false;
                }
                out.push_str("<pre><code>");
            }
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            out.push_str(&html_escape(line));
            out.push('\n');
            continue;
        }
        if let Some(item) = line.strip_prefix("- ") {
            // Contiguous bullet lines collect into a single list.
            if !in_list {
                out.push_str("<ul>");
                in_list = true;
            }
            out.push_str(&format!("<li>{}</li>", inline(item)));
            continue;
        }
        if in_list {
            out.push_str("</ul>");
            in_list = false;
        }
        if let Some(heading) = line.strip_prefix("### ") {
            out.push_str(&format!("<h3>{}</h3>", inline(heading)));
        } else if let Some(heading) = line.strip_prefix("# ") {
            out.push_str(&format!("<h1>{}</h1>", inline(heading)));
        } else if !line.trim().is_empty() {
            out.push_str(&format!("<p>{}</p>", inline(line)));
        }
    }

    if in_list {
        out.push_str("</ul>");
    }
    if in_fence {
        out.push_str("</code></pre>");
    }
    out
}

/// Escapes a text line, then wraps warning markers for styling. The marker
/// contains no characters the escape rewrites, so the order is safe.
fn inline(text: &str) -> String {
    html_escape(text).replace(
        WARNING_MARKER,
        "<span class=\"warning-marker\">[WARNING]</span>",
    )
}

/// A local error panel for a report that could not be loaded; distinct from
/// the silent hide when there are simply no warnings.
pub fn render_error_panel(message: &str) -> String {
    format!(
        "<div class=\"report-error\">Security report unavailable: {}</div>",
        html_escape(message)
    )
}

/// Tries each candidate path in order; the first readable file wins.
pub async fn load_report_text(candidates: &[PathBuf]) -> Result<String, std::io::Error> {
    for path in candidates {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => return Ok(text),
            Err(err) => debug!(path = %path.display(), %err, "report candidate unavailable"),
        }
    }
    Err(std::io::Error::new(
        ErrorKind::NotFound,
        "no report source available",
    ))
}
