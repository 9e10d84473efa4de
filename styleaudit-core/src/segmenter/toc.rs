//! Table-of-contents discovery.
//!
//! A TOC is the first table whose leading rows mention the TOC keyword
//! (e.g. "頁碼" / "Page"). Its first column lists section titles, which may
//! wrap over several lines inside one cell.

use crate::types::RawTable;
use regex::Regex;

/// Rows inspected when looking for the keyword
const HEADER_ROWS: usize = 5;
/// Continuation lines longer than this end a multi-line title
const MAX_CONTINUATION_CHARS: usize = 80;

#[derive(Debug, Clone, PartialEq)]
pub struct TableOfContents {
    /// Index of the TOC table in the document's table list
    pub table: usize,
    pub titles: Vec<String>,
}

/// Find the TOC table and read its titles. `None` when no table mentions the
/// keyword or the table yields no titles.
pub fn find_toc(tables: &[RawTable], keyword: &str, title_pattern: &Regex) -> Option<TableOfContents> {
    let table = tables.iter().find(|t| {
        let header: String = t
            .rows
            .iter()
            .take(HEADER_ROWS)
            .flat_map(|row| row.iter().map(|c| c.trim()))
            .collect();
        header.contains(keyword)
    })?;

    let titles: Vec<String> = table
        .rows
        .iter()
        .filter_map(|row| row.first())
        .filter_map(|cell| title_from_cell(cell, title_pattern))
        .collect();

    if titles.is_empty() {
        log::warn!("TOC table {} matched the keyword but held no titles", table.index);
        return None;
    }

    Some(TableOfContents {
        table: table.index,
        titles,
    })
}

/// Capture starts at the first line matching the title pattern and keeps
/// following short lines; lines before the first match are ignored.
fn title_from_cell(cell: &str, title_pattern: &Regex) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    let mut capturing = false;

    for line in cell.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if title_pattern.is_match(line) {
            capturing = true;
            parts.push(line);
        } else if capturing {
            if line.chars().count() > MAX_CONTINUATION_CHARS {
                break;
            }
            parts.push(line);
        }
    }

    (!parts.is_empty()).then(|| parts.join(" "))
}
