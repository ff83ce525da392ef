//! Renderers for a completed [`ScanRun`].
//!
//! Renderers read only the run's public shape: rule columns in order plus
//! records of named booleans. None of them reach back into the scanner.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CheckError, CheckResult};
use crate::model::{ScanRun, ValidationRecord};

const REPO_NAME_HEADER: &str = "RepoName";

/// Placeholders substituted in HTML templates.
pub const PLACEHOLDER_TITLE: &str = "{{title}}";
pub const PLACEHOLDER_SUMMARY: &str = "{{summary}}";
pub const PLACEHOLDER_TABLE: &str = "{{table}}";
pub const PLACEHOLDER_GENERATED_AT: &str = "{{generated_at}}";

/// Built-in HTML template used when none is supplied.
pub const DEFAULT_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{title}}</title>
<style>
body { font-family: sans-serif; margin: 2rem; }
table { border-collapse: collapse; }
th, td { border: 1px solid #ccc; padding: 0.3rem 0.6rem; text-align: left; }
td.pass { color: #1a7f37; }
td.fail { color: #cf222e; }
</style>
</head>
<body>
<h1>{{title}}</h1>
<p>{{summary}}</p>
{{table}}
<p><small>Generated at {{generated_at}}</small></p>
</body>
</html>
"#;

/// Output format for file reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    Table,
    #[default]
    Json,
    Csv,
    Html,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Table => "table",
            ReportFormat::Json => "json",
            ReportFormat::Csv => "csv",
            ReportFormat::Html => "html",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "table" | "text" => Ok(ReportFormat::Table),
            "json" => Ok(ReportFormat::Json),
            "csv" => Ok(ReportFormat::Csv),
            "html" => Ok(ReportFormat::Html),
            other => Err(format!(
                "unknown report format '{other}' (expected json, html, csv or table)"
            )),
        }
    }
}

fn cell(record: &ValidationRecord, rule_id: &str) -> String {
    record
        .result(rule_id)
        .map(|v| v.to_string())
        .unwrap_or_default()
}

fn header_row(run: &ScanRun) -> Vec<String> {
    std::iter::once(REPO_NAME_HEADER.to_string())
        .chain(run.rules.iter().map(|c| c.label.clone()))
        .collect()
}

fn record_row(run: &ScanRun, record: &ValidationRecord) -> Vec<String> {
    std::iter::once(record.repo_name.clone())
        .chain(run.rules.iter().map(|c| cell(record, &c.id)))
        .collect()
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Fixed-column text table: header, dashed separator, one row per record.
/// Columns are padded to their widest cell and terminated with `|`.
pub fn render_table(run: &ScanRun) -> String {
    let header = header_row(run);
    let separator: Vec<String> = header.iter().map(|h| "-".repeat(h.len())).collect();
    let mut rows = vec![header, separator];
    rows.extend(run.records.iter().map(|r| record_row(run, r)));

    let widths: Vec<usize> = (0..rows[0].len())
        .map(|col| rows.iter().map(|row| row[col].len()).max().unwrap_or(0))
        .collect();

    let mut out = String::new();
    for row in &rows {
        for (value, width) in row.iter().zip(&widths) {
            out.push_str(&format!("{value:<width$}  |"));
        }
        out.push('\n');
    }
    out
}

// ---------------------------------------------------------------------------
// JSON / CSV
// ---------------------------------------------------------------------------

/// Pretty JSON of the whole run.
pub fn render_json(run: &ScanRun) -> CheckResult<String> {
    Ok(serde_json::to_string_pretty(run)?)
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// CSV with a header row, quoting fields per RFC 4180.
pub fn render_csv(run: &ScanRun) -> String {
    let mut out = String::new();
    let rows =
        std::iter::once(header_row(run)).chain(run.records.iter().map(|r| record_row(run, r)));
    for row in rows {
        let line: Vec<String> = row.iter().map(|v| csv_field(v)).collect();
        out.push_str(&line.join(","));
        out.push_str("\r\n");
    }
    out
}

// ---------------------------------------------------------------------------
// HTML
// ---------------------------------------------------------------------------

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn html_table(run: &ScanRun) -> String {
    let mut out = String::from("<table>\n<thead><tr>");
    for h in header_row(run) {
        out.push_str(&format!("<th>{}</th>", escape_html(&h)));
    }
    out.push_str("</tr></thead>\n<tbody>\n");
    for record in &run.records {
        out.push_str(&format!("<tr><td>{}</td>", escape_html(&record.repo_name)));
        for column in &run.rules {
            let class = match record.result(&column.id) {
                Some(true) => "pass",
                Some(false) => "fail",
                None => "unknown",
            };
            out.push_str(&format!(
                "<td class=\"{class}\">{}</td>",
                cell(record, &column.id)
            ));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</tbody>\n</table>");
    out
}

/// Render `run` through `template`, or the built-in template when `None`.
///
/// The template must contain `{{table}}`; the other placeholders are
/// optional.
pub fn render_html(run: &ScanRun, template: Option<&str>) -> CheckResult<String> {
    let template = template.unwrap_or(DEFAULT_HTML_TEMPLATE);
    if !template.contains(PLACEHOLDER_TABLE) {
        return Err(CheckError::Template(format!(
            "template has no {PLACEHOLDER_TABLE} placeholder"
        )));
    }
    let title = format!("Repository compliance: {}", run.organization);
    Ok(template
        .replace(PLACEHOLDER_TITLE, &escape_html(&title))
        .replace(PLACEHOLDER_SUMMARY, &escape_html(&run.summary_line()))
        .replace(PLACEHOLDER_GENERATED_AT, &run.finished_at.to_rfc3339())
        .replace(PLACEHOLDER_TABLE, &html_table(run)))
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Render `run` in `format`. `template` is used only by HTML.
pub fn render(run: &ScanRun, format: ReportFormat, template: Option<&str>) -> CheckResult<String> {
    match format {
        ReportFormat::Table => Ok(render_table(run)),
        ReportFormat::Json => render_json(run),
        ReportFormat::Csv => Ok(render_csv(run)),
        ReportFormat::Html => render_html(run, template),
    }
}

/// Render and write to `path`, reading the HTML template from
/// `template_path` when given.
pub fn write_report(
    path: &Path,
    format: ReportFormat,
    run: &ScanRun,
    template_path: Option<&Path>,
) -> CheckResult<()> {
    let template = template_path.map(std::fs::read_to_string).transpose()?;
    let content = render(run, format, template.as_deref())?;
    std::fs::write(path, content)?;
    Ok(())
}
