//! `word/document.xml` reader: paragraphs, runs and tables in reading order.
//!
//! Tables are flattened: every cell paragraph becomes a paragraph of its own,
//! tagged with its table/row/cell position. Text boxes and alternate-content
//! fallbacks are skipped so their text is not counted twice. Tracked-change
//! records (`w:rPrChange`, `w:pPrChange`, ...) describe the formatting before
//! a revision and are skipped as well.

use super::styles::StyleSheet;
use super::xml::{attr_val, heading_from_outline, is_revision_record, on_off, underline_on};
use crate::types::*;
use anyhow::Result;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

#[derive(Debug)]
struct TableCursor {
    index: usize,
    row: Option<usize>,
    cell: Option<usize>,
    rows: Vec<Vec<String>>,
}

#[derive(Debug)]
struct ParagraphBuilder {
    runs: Vec<Run>,
    style_id: Option<String>,
    outline_level: Option<u32>,
    origin: ParagraphOrigin,
}

#[derive(Debug, Default)]
struct RunBuilder {
    text: String,
    bold: Option<bool>,
    underline: Option<bool>,
    char_style: Option<String>,
}

pub struct BodyReader<'s> {
    styles: &'s StyleSheet,
    paragraphs: Vec<RawParagraph>,
    tables: Vec<RawTable>,
    table_stack: Vec<TableCursor>,
    table_count: usize,
    paragraph: Option<ParagraphBuilder>,
    run: Option<RunBuilder>,
    in_ppr: bool,
    in_rpr: bool,
    in_text: bool,
    skip_depth: usize,
}

impl<'s> BodyReader<'s> {
    pub fn new(styles: &'s StyleSheet) -> Self {
        Self {
            styles,
            paragraphs: Vec::new(),
            tables: Vec::new(),
            table_stack: Vec::new(),
            table_count: 0,
            paragraph: None,
            run: None,
            in_ppr: false,
            in_rpr: false,
            in_text: false,
            skip_depth: 0,
        }
    }

    pub fn read(mut self, xml: &str) -> Result<(Vec<RawParagraph>, Vec<RawTable>)> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(false);

        loop {
            let event = reader.read_event()?;

            if self.skip_depth > 0 {
                match event {
                    Event::Start(_) => self.skip_depth += 1,
                    Event::End(_) => self.skip_depth -= 1,
                    Event::Eof => break,
                    _ => {}
                }
                continue;
            }

            match event {
                Event::Start(e) => self.open(&e, false),
                Event::Empty(e) => self.open(&e, true),
                Event::End(e) => self.close(e.local_name().as_ref()),
                Event::Text(t) => {
                    if self.in_text {
                        if let Some(run) = self.run.as_mut() {
                            run.text.push_str(&t.unescape()?);
                        }
                    }
                }
                Event::CData(c) => {
                    if self.in_text {
                        if let Some(run) = self.run.as_mut() {
                            run.text.push_str(&String::from_utf8_lossy(&c));
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        self.tables.sort_by_key(|t| t.index);
        Ok((self.paragraphs, self.tables))
    }

    fn origin(&self) -> ParagraphOrigin {
        match self.table_stack.last() {
            Some(cursor) => ParagraphOrigin::TableCell {
                table: cursor.index,
                row: cursor.row.unwrap_or(0),
                cell: cursor.cell.unwrap_or(0),
            },
            None => ParagraphOrigin::Body,
        }
    }

    fn open(&mut self, e: &BytesStart<'_>, empty: bool) {
        match e.local_name().as_ref() {
            b"txbxContent" | b"Fallback" if !empty => self.skip_depth = 1,
            local if !empty && is_revision_record(local) => self.skip_depth = 1,
            b"tbl" if !empty => {
                self.table_stack.push(TableCursor {
                    index: self.table_count,
                    row: None,
                    cell: None,
                    rows: Vec::new(),
                });
                self.table_count += 1;
            }
            b"tr" if !empty => {
                if let Some(cursor) = self.table_stack.last_mut() {
                    cursor.row = Some(cursor.row.map_or(0, |r| r + 1));
                    cursor.cell = None;
                    cursor.rows.push(Vec::new());
                }
            }
            b"tc" if !empty => {
                if let Some(cursor) = self.table_stack.last_mut() {
                    cursor.cell = Some(cursor.cell.map_or(0, |c| c + 1));
                    if let Some(row) = cursor.rows.last_mut() {
                        row.push(String::new());
                    }
                }
            }
            b"p" => {
                let builder = ParagraphBuilder {
                    runs: Vec::new(),
                    style_id: None,
                    outline_level: None,
                    origin: self.origin(),
                };
                if empty {
                    self.finish_paragraph(builder);
                } else {
                    self.paragraph = Some(builder);
                }
            }
            b"pPr" if !empty && self.run.is_none() => self.in_ppr = true,
            b"pStyle" if self.in_ppr => {
                if let Some(p) = self.paragraph.as_mut() {
                    p.style_id = attr_val(e, b"val");
                }
            }
            b"outlineLvl" if self.in_ppr => {
                if let Some(p) = self.paragraph.as_mut() {
                    p.outline_level = attr_val(e, b"val").and_then(|v| v.parse().ok());
                }
            }
            b"r" if !empty && self.paragraph.is_some() => self.run = Some(RunBuilder::default()),
            b"rPr" if !empty && self.run.is_some() => self.in_rpr = true,
            b"b" if self.in_rpr => {
                if let Some(run) = self.run.as_mut() {
                    run.bold = Some(on_off(attr_val(e, b"val").as_deref()));
                }
            }
            b"u" if self.in_rpr => {
                if let Some(run) = self.run.as_mut() {
                    run.underline = Some(underline_on(attr_val(e, b"val").as_deref()));
                }
            }
            b"rStyle" if self.in_rpr => {
                if let Some(run) = self.run.as_mut() {
                    run.char_style = attr_val(e, b"val");
                }
            }
            b"t" if !empty && self.run.is_some() => self.in_text = true,
            b"tab" if !self.in_rpr => self.push_run_char('\t'),
            b"br" | b"cr" if !self.in_rpr => self.push_run_char('\n'),
            _ => {}
        }
    }

    fn close(&mut self, local: &[u8]) {
        match local {
            b"t" => self.in_text = false,
            b"rPr" => self.in_rpr = false,
            b"pPr" => self.in_ppr = false,
            b"r" => {
                self.in_rpr = false;
                self.in_text = false;
                if let Some(run) = self.run.take() {
                    self.finish_run(run);
                }
            }
            b"p" => {
                self.in_ppr = false;
                if let Some(builder) = self.paragraph.take() {
                    self.finish_paragraph(builder);
                }
            }
            b"tbl" => {
                if let Some(cursor) = self.table_stack.pop() {
                    self.tables.push(RawTable {
                        index: cursor.index,
                        rows: cursor.rows,
                    });
                }
            }
            _ => {}
        }
    }

    fn push_run_char(&mut self, c: char) {
        if let Some(run) = self.run.as_mut() {
            run.text.push(c);
        }
    }

    fn finish_run(&mut self, run: RunBuilder) {
        if run.text.is_empty() {
            return;
        }
        // Direct formatting wins; otherwise fall back to the character style
        let char_style = run.char_style.as_deref();
        let bold = run
            .bold
            .or_else(|| char_style.and_then(|s| self.styles.bold(s)))
            .unwrap_or(false);
        let underline = run
            .underline
            .or_else(|| char_style.and_then(|s| self.styles.underline(s)))
            .unwrap_or(false);

        if let Some(p) = self.paragraph.as_mut() {
            p.runs.push(Run::new(run.text, RunFormat { bold, underline }));
        }
    }

    fn finish_paragraph(&mut self, builder: ParagraphBuilder) {
        let heading_level = builder.outline_level.and_then(heading_from_outline).or_else(|| {
            builder
                .style_id
                .as_deref()
                .and_then(|id| self.styles.heading_level(id))
        });

        let raw = RawParagraph {
            runs: builder.runs,
            style_id: builder.style_id,
            heading_level,
            origin: builder.origin,
        };

        if let ParagraphOrigin::TableCell { .. } = raw.origin {
            if let Some(cell) = self
                .table_stack
                .last_mut()
                .and_then(|c| c.rows.last_mut())
                .and_then(|r| r.last_mut())
            {
                let text = raw.text();
                if !cell.is_empty() {
                    cell.push('\n');
                }
                cell.push_str(&text);
            }
        }

        self.paragraphs.push(raw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
        )
    }

    fn read(body: &str) -> (Vec<RawParagraph>, Vec<RawTable>) {
        let styles = StyleSheet::default();
        BodyReader::new(&styles).read(&wrap(body)).unwrap()
    }

    #[test]
    fn test_runs_and_direct_formatting() {
        let (paragraphs, _) = read(
            r#"<w:p>
                 <w:r><w:rPr><w:b/></w:rPr><w:t>Total</w:t></w:r>
                 <w:r><w:t xml:space="preserve"> </w:t></w:r>
                 <w:r><w:rPr><w:b w:val="1"/><w:u w:val="single"/></w:rPr><w:t>Amount</w:t></w:r>
                 <w:r><w:rPr><w:b w:val="0"/><w:u w:val="none"/></w:rPr><w:t xml:space="preserve"> due &amp; payable</w:t></w:r>
               </w:p>"#,
        );
        assert_eq!(paragraphs.len(), 1);
        let p = &paragraphs[0];
        assert_eq!(p.text(), "Total Amount due & payable");
        assert_eq!(p.runs.len(), 4);
        assert!(p.runs[0].format.bold);
        assert!(!p.runs[1].format.bold);
        assert!(p.runs[2].format.bold && p.runs[2].format.underline);
        assert!(!p.runs[3].format.bold && !p.runs[3].format.underline);
    }

    #[test]
    fn test_hyperlink_runs_tabs_and_deleted_text() {
        let (paragraphs, _) = read(
            r#"<w:p>
                 <w:r><w:t>See</w:t><w:tab/></w:r>
                 <w:hyperlink r:id="rId4" xmlns:r="x"><w:r><w:rPr><w:u w:val="single"/></w:rPr><w:t>Annex</w:t></w:r></w:hyperlink>
                 <w:del><w:r><w:delText>removed</w:delText></w:r></w:del>
               </w:p>"#,
        );
        let p = &paragraphs[0];
        assert_eq!(p.text(), "See\tAnnex");
        assert!(p.runs[1].format.underline);
    }

    #[test]
    fn test_paragraph_mark_formatting_is_not_run_formatting() {
        let (paragraphs, _) = read(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading2"/><w:rPr><w:b/></w:rPr></w:pPr>
                 <w:r><w:t>Plain heading text</w:t></w:r></w:p>"#,
        );
        let p = &paragraphs[0];
        assert_eq!(p.style_id.as_deref(), Some("Heading2"));
        assert_eq!(p.heading_level, Some(2));
        assert!(!p.runs[0].format.bold);
    }

    #[test]
    fn test_tracked_formatting_change_keeps_current_run_format() {
        let (paragraphs, _) = read(
            r#"<w:p>
                 <w:r><w:rPr><w:rPrChange w:id="1" w:author="A"><w:rPr><w:b/><w:u w:val="single"/></w:rPr></w:rPrChange></w:rPr><w:t>Not bold now</w:t></w:r>
                 <w:r><w:rPr><w:b/><w:rPrChange w:id="2" w:author="A"><w:rPr/></w:rPrChange></w:rPr><w:t> bold now</w:t></w:r>
               </w:p>"#,
        );
        let p = &paragraphs[0];
        assert_eq!(p.text(), "Not bold now bold now");
        assert!(!p.runs[0].format.bold);
        assert!(!p.runs[0].format.underline);
        assert!(p.runs[1].format.bold);
    }

    #[test]
    fn test_tracked_paragraph_style_change_keeps_current_style() {
        let (paragraphs, _) = read(
            r#"<w:p><w:pPr><w:pStyle w:val="Normal"/>
                 <w:pPrChange w:id="3" w:author="A"><w:pPr><w:pStyle w:val="Heading1"/><w:outlineLvl w:val="0"/></w:pPr></w:pPrChange>
               </w:pPr><w:r><w:t>Former heading</w:t></w:r></w:p>"#,
        );
        let p = &paragraphs[0];
        assert_eq!(p.style_id.as_deref(), Some("Normal"));
        assert_eq!(p.heading_level, None);
        assert_eq!(p.text(), "Former heading");
    }

    #[test]
    fn test_body_text_outline_level_is_not_a_heading() {
        let (paragraphs, _) = read(
            r#"<w:p><w:pPr><w:outlineLvl w:val="9"/></w:pPr><w:r><w:t>Body text</w:t></w:r></w:p>
               <w:p><w:pPr><w:outlineLvl w:val="1"/></w:pPr><w:r><w:t>Level two</w:t></w:r></w:p>"#,
        );
        assert_eq!(paragraphs[0].heading_level, None);
        assert_eq!(paragraphs[1].heading_level, Some(2));
    }

    #[test]
    fn test_tables_are_flattened_with_origin() {
        let (paragraphs, tables) = read(
            r#"<w:p><w:r><w:t>Before</w:t></w:r></w:p>
               <w:tbl>
                 <w:tr>
                   <w:tc><w:p><w:r><w:t>Contents</w:t></w:r></w:p></w:tc>
                   <w:tc><w:p><w:r><w:t>Page</w:t></w:r></w:p></w:tc>
                 </w:tr>
                 <w:tr>
                   <w:tc><w:p><w:r><w:t>Part 1: General</w:t></w:r></w:p><w:p><w:r><w:t>Conditions</w:t></w:r></w:p></w:tc>
                   <w:tc><w:p><w:r><w:t>3</w:t></w:r></w:p></w:tc>
                 </w:tr>
               </w:tbl>
               <w:p/>"#,
        );
        assert_eq!(paragraphs.len(), 7);
        assert_eq!(paragraphs[0].origin, ParagraphOrigin::Body);
        assert_eq!(
            paragraphs[4].origin,
            ParagraphOrigin::TableCell { table: 0, row: 1, cell: 0 }
        );
        assert_eq!(paragraphs[6].origin, ParagraphOrigin::Body);
        assert!(paragraphs[6].runs.is_empty());

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows[0], vec!["Contents", "Page"]);
        assert_eq!(tables[0].rows[1][0], "Part 1: General\nConditions");
    }

    #[test]
    fn test_text_boxes_are_skipped() {
        let (paragraphs, _) = read(
            r#"<w:p><w:r><w:t>Outer</w:t></w:r>
                 <w:r><w:pict><v:textbox xmlns:v="v"><w:txbxContent>
                   <w:p><w:r><w:t>Inner</w:t></w:r></w:p>
                 </w:txbxContent></v:textbox></w:pict></w:r>
               </w:p>"#,
        );
        assert_eq!(paragraphs.len(), 1);
        assert_eq!(paragraphs[0].text(), "Outer");
    }

    #[test]
    fn test_character_style_inheritance() {
        let styles = StyleSheet::parse(
            r#"<w:styles xmlns:w="w"><w:style w:type="character" w:styleId="Strong"><w:rPr><w:b/></w:rPr></w:style></w:styles>"#,
        )
        .unwrap();
        let xml = wrap(
            r#"<w:p><w:r><w:rPr><w:rStyle w:val="Strong"/></w:rPr><w:t>Key</w:t></w:r>
                    <w:r><w:rPr><w:rStyle w:val="Strong"/><w:b w:val="false"/></w:rPr><w:t>term</w:t></w:r></w:p>"#,
        );
        let (paragraphs, _) = BodyReader::new(&styles).read(&xml).unwrap();
        assert!(paragraphs[0].runs[0].format.bold);
        assert!(!paragraphs[0].runs[1].format.bold);
    }
}
