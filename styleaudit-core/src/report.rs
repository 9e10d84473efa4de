//! Report rendering: `ComparisonReport` → self-contained HTML or JSON.
//!
//! Rendering is a pure function of the report; nothing here touches the
//! documents again or performs any I/O except `save_report`.

use crate::config::{ReportConfig, ReportFormat};
use crate::similarity::content_key;
use crate::types::*;
use anyhow::{Context, Result};
use quick_xml::escape::escape;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

const STYLE_SHEET: &str = r#"
body { font-family: "Segoe UI", "Microsoft JhengHei", sans-serif; margin: 2em; color: #222; }
h1 { border-bottom: 2px solid #444; padding-bottom: .3em; }
.summary table, .pair table { border-collapse: collapse; width: 100%; margin-bottom: 1em; }
th, td { border: 1px solid #ccc; padding: 6px 8px; vertical-align: top; text-align: left; }
th { background: #f0f0f0; }
.pair { margin-bottom: 2.5em; }
.pair h2 { font-size: 1.15em; background: #eef3f8; padding: .4em .6em; }
.score { color: #666; font-weight: normal; font-size: .9em; }
.flagged { background: #ffe3e3; }
.flagged.info { background: #fff6d6; }
.banner { background: #fff0c2; border-left: 4px solid #e0a800; padding: .6em .8em; margin: 1em 0; }
.empty { color: #999; font-style: italic; }
.warnings li { margin-bottom: .3em; }
button.copy { float: right; font-size: .75em; margin-left: .5em; cursor: pointer; }
"#;

const SCRIPT: &str = r#"
const contexts = JSON.parse(document.getElementById('contexts').textContent);
document.querySelectorAll('button.copy').forEach(function (btn) {
  btn.addEventListener('click', function () {
    const text = contexts[Number(btn.dataset.ctx)];
    navigator.clipboard.writeText(text).then(function () {
      btn.textContent = 'Copied';
      setTimeout(function () { btn.textContent = 'Copy context'; }, 1500);
    });
  });
});
"#;

fn esc(text: &str) -> String {
    escape(text).into_owned()
}

/// Serialize to pretty JSON
pub fn render_json(report: &ComparisonReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("serializing report")
}

pub fn render(report: &ComparisonReport, config: &ReportConfig, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Html => Ok(render_html(report, config)),
        ReportFormat::Json => render_json(report),
    }
}

pub fn save_report(report: &ComparisonReport, config: &ReportConfig, format: ReportFormat, path: &Path) -> Result<()> {
    let content = render(report, config, format)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("writing report to {}", path.display()))?;
    log::info!("Report written to {}", path.display());
    Ok(())
}

pub fn render_html(report: &ComparisonReport, config: &ReportConfig) -> String {
    HtmlRenderer::new(report, config).render()
}

struct HtmlRenderer<'a> {
    report: &'a ComparisonReport,
    config: &'a ReportConfig,
    out: String,
    /// Paragraph texts behind the "copy context" buttons
    contexts: Vec<String>,
}

impl<'a> HtmlRenderer<'a> {
    fn new(report: &'a ComparisonReport, config: &'a ReportConfig) -> Self {
        Self {
            report,
            config,
            out: String::new(),
            contexts: Vec::new(),
        }
    }

    fn render(mut self) -> String {
        let title = esc(&self.config.title);
        self.out.push_str(&format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n<style>{STYLE_SHEET}</style>\n</head>\n<body>\n<h1>{title}</h1>\n"
        ));

        self.summary();
        self.warnings();

        let report = self.report;
        for alignment in &report.alignment.alignments {
            let Some(src) = report.source.sections.get(alignment.source) else {
                continue;
            };
            match alignment.target.and_then(|j| report.target.sections.get(j)) {
                Some(tgt) => self.section_pair(src, tgt, alignment.score),
                None => self.unmatched(Language::Source, src, alignment.score),
            }
        }
        for warning in report.alignment.warnings.iter().filter(|w| w.language == Language::Target) {
            if let Some(tgt) = report.target.sections.get(warning.section) {
                self.unmatched(Language::Target, tgt, warning.best_score);
            }
        }

        // A raw '<' could close the script element early
        let contexts = serde_json::to_string(&self.contexts)
            .unwrap_or_else(|_| "[]".to_string())
            .replace('<', "\\u003c");
        self.out.push_str(&format!(
            "<script type=\"application/json\" id=\"contexts\">{contexts}</script>\n<script>{SCRIPT}</script>\n</body>\n</html>\n"
        ));
        self.out
    }

    fn side_label(&self, language: Language) -> &str {
        match language {
            Language::Source => &self.config.source_label,
            Language::Target => &self.config.target_label,
        }
    }

    fn summary(&mut self) {
        let report = self.report;
        let src = DocumentSummary::from_document(&report.source);
        let tgt = DocumentSummary::from_document(&report.target);
        let info = report.discrepancies.len() - report.warning_count();

        let row = |name: &str, a: String, b: String| format!("<tr><th>{name}</th><td>{a}</td><td>{b}</td></tr>\n");
        let mut rows = String::new();
        rows.push_str(&row("File", esc(&src.name), esc(&tgt.name)));
        rows.push_str(&row(
            "Title",
            esc(src.title.as_deref().unwrap_or("")),
            esc(tgt.title.as_deref().unwrap_or("")),
        ));
        rows.push_str(&row("SHA-256", format!("<code>{}</code>", src.digest), format!("<code>{}</code>", tgt.digest)));
        rows.push_str(&row("Paragraphs", src.paragraphs.to_string(), tgt.paragraphs.to_string()));
        rows.push_str(&row("Sections", src.sections.to_string(), tgt.sections.to_string()));
        if report.styles.contains(&StyleKind::Bold) {
            rows.push_str(&row("Bold spans", src.bold_spans.to_string(), tgt.bold_spans.to_string()));
        }
        if report.styles.contains(&StyleKind::Underline) {
            rows.push_str(&row(
                "Underline spans",
                src.underline_spans.to_string(),
                tgt.underline_spans.to_string(),
            ));
        }

        self.out.push_str(&format!(
            "<div class=\"summary\">\n<p>Generated {} &middot; {} matched section pairs &middot; {} warnings, {} info</p>\n<table>\n<tr><th></th><th>{}</th><th>{}</th></tr>\n{rows}</table>\n</div>\n",
            report.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            report.alignment.matched().count(),
            report.warning_count(),
            info,
            esc(&self.config.source_label),
            esc(&self.config.target_label),
        ));
    }

    fn warnings(&mut self) {
        let warnings = &self.report.alignment.warnings;
        if warnings.is_empty() {
            return;
        }
        self.out.push_str("<div class=\"warnings\">\n<h2>Alignment warnings</h2>\n<ul>\n");
        for w in warnings {
            self.out.push_str(&format!(
                "<li>{} section &ldquo;{}&rdquo; has no counterpart (best score {:.2})</li>\n",
                esc(self.side_label(w.language)),
                esc(&w.label),
                w.best_score
            ));
        }
        self.out.push_str("</ul>\n</div>\n");
    }

    fn unmatched(&mut self, language: Language, section: &Section, best_score: f64) {
        let other = esc(self.side_label(language.other()));
        self.out.push_str(&format!(
            "<div class=\"pair\">\n<h2>{}: {} <span class=\"score\">(best score {best_score:.2})</span></h2>\n<div class=\"banner\">No counterpart found in the {other} document</div>\n</div>\n",
            esc(self.side_label(language)),
            esc(&section.label),
        ));
    }

    fn section_pair(&mut self, src: &Section, tgt: &Section, score: f64) {
        let report = self.report;
        self.out.push_str(&format!(
            "<div class=\"pair\">\n<h2>{} &harr; {} <span class=\"score\">(similarity {score:.2})</span></h2>\n",
            esc(&src.label),
            esc(&tgt.label),
        ));

        for &style in &report.styles {
            let flagged = |kind: DiscrepancyKind| -> HashSet<(String, Severity)> {
                report
                    .discrepancies
                    .iter()
                    .filter(|d| d.source_section == Some(src.ordinal) && d.target_section == Some(tgt.ordinal))
                    .filter(|d| d.style == Some(style) && d.kind == kind)
                    .filter_map(|d| d.text.as_deref().map(|t| (content_key(t), d.severity)))
                    .collect()
            };
            let src_flags = flagged(DiscrepancyKind::MissingInTarget);
            let tgt_flags = flagged(DiscrepancyKind::MissingInSource);

            let src_cells = self.cells(&report.source, src, style, &src_flags);
            let tgt_cells = self.cells(&report.target, tgt, style, &tgt_flags);

            self.out.push_str(&format!(
                "<table>\n<tr><th colspan=\"2\">{style}</th></tr>\n<tr><th>{}</th><th>{}</th></tr>\n",
                esc(&self.config.source_label),
                esc(&self.config.target_label),
            ));
            let rows = src_cells.len().max(tgt_cells.len());
            if rows == 0 {
                self.out.push_str("<tr><td class=\"empty\" colspan=\"2\">No styled text</td></tr>\n");
            }
            let blank = "<td></td>".to_string();
            for i in 0..rows {
                self.out.push_str(&format!(
                    "<tr>{}{}</tr>\n",
                    src_cells.get(i).unwrap_or(&blank),
                    tgt_cells.get(i).unwrap_or(&blank)
                ));
            }
            self.out.push_str("</table>\n");
        }
        self.out.push_str("</div>\n");
    }

    /// One `<td>` per distinct span, in document order
    fn cells(
        &mut self,
        document: &Document,
        section: &Section,
        style: StyleKind,
        flags: &HashSet<(String, Severity)>,
    ) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut cells = Vec::new();
        for span in document.section_spans(section, style) {
            let key = content_key(&span.text);
            if !seen.insert(key.clone()) {
                continue;
            }
            let class = if flags.contains(&(key.clone(), Severity::Warning)) {
                " class=\"flagged\""
            } else if flags.contains(&(key, Severity::Info)) {
                " class=\"flagged info\""
            } else {
                ""
            };
            let context = document
                .paragraphs
                .get(span.paragraph)
                .map(|p| p.text.clone())
                .unwrap_or_default();
            self.contexts.push(context);
            cells.push(format!(
                "<td{class}>{}<button class=\"copy\" data-ctx=\"{}\">Copy context</button></td>",
                esc(&span.text),
                self.contexts.len() - 1
            ));
        }
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(language: Language, label: &str, text: &str, bold: &[(usize, usize)]) -> Document {
        let chars: Vec<char> = text.chars().collect();
        let spans = bold
            .iter()
            .map(|&(start, end)| Span {
                paragraph: 0,
                start,
                end,
                style: StyleKind::Bold,
                text: chars[start..end].iter().collect(),
            })
            .collect();
        Document {
            name: format!("{language}.docx"),
            language,
            digest: "abc123".to_string(),
            metadata: DocumentMetadata::default(),
            paragraphs: vec![Paragraph {
                index: 0,
                text: text.to_string(),
                style_id: None,
                heading_level: None,
                origin: ParagraphOrigin::Body,
                spans,
            }],
            sections: vec![Section {
                label: label.to_string(),
                ordinal: 0,
                level: None,
                is_preamble: false,
                paragraphs: 0..1,
            }],
        }
    }

    fn report() -> ComparisonReport {
        let source = document(Language::Source, "甲部：價格", "付款 <30日> 內", &[(3, 8)]);
        let target = document(Language::Target, "Part A: Pricing", "Pay within 30 days", &[(11, 18)]);
        let alignment = AlignmentResult {
            alignments: vec![Alignment {
                source: 0,
                target: Some(0),
                score: 0.71,
            }],
            ..AlignmentResult::default()
        };
        let discrepancies = crate::comparator::Comparator::new(vec![StyleKind::Bold]).compare(&source, &target, &alignment);
        ComparisonReport::new(source, target, alignment, discrepancies, vec![StyleKind::Bold])
    }

    #[test]
    fn test_html_is_self_contained_and_escaped() {
        let html = render_html(&report(), &ReportConfig::default());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(!html.contains("src=\"http"));
        assert!(!html.contains("href="));
        assert!(html.contains("&lt;30日&gt;"));
        assert!(!html.contains("<30日>"));
        assert!(html.contains("Chinese-English Document Comparison Report"));
        assert!(html.contains("similarity 0.71"));
    }

    #[test]
    fn test_flagged_rows_and_copy_buttons() {
        let report = report();
        assert_eq!(report.discrepancies.len(), 2);
        let html = render_html(&report, &ReportConfig::default());
        // One span per side, counts agree: both flagged as info
        assert_eq!(html.matches("class=\"flagged info\"").count(), 2);
        assert_eq!(html.matches("button class=\"copy\"").count(), 2);
        assert!(html.contains("Pay within 30 days"));
    }

    #[test]
    fn test_unmatched_banner() {
        let mut report = report();
        report.alignment.alignments[0].target = None;
        report.alignment.unmatched_source = vec![0];
        report.alignment.warnings.push(AlignmentWarning {
            language: Language::Source,
            section: 0,
            label: "甲部：價格".to_string(),
            best_score: 0.3,
        });
        let html = render_html(&report, &ReportConfig::default());
        assert!(html.contains("No counterpart found in the English document"));
        assert!(html.contains("Alignment warnings"));
    }

    #[test]
    fn test_json_and_save() {
        let report = report();
        let json = render_json(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["schema_version"], SCHEMA_VERSION);
        assert_eq!(value["discrepancies"].as_array().unwrap().len(), 2);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/report.html");
        save_report(&report, &ReportConfig::default(), ReportFormat::Html, &path).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("</html>"));
    }
}
