//! DOCX Preprocessor
//!
//! Unpacks the OOXML container and reads WordprocessingML into
//! `PreprocessorOutput`:
//! 1. Container extraction: `.docx` zip → `word/document.xml`,
//!    `word/styles.xml`, `docProps/core.xml`
//! 2. Markup parsing: paragraphs (body + table cells), runs with resolved
//!    bold/underline, tables, core properties

pub mod body;
pub mod styles;
pub mod xml;

use crate::preprocessors::traits::{DocumentMarkup, Preprocessor};
use crate::types::*;
use anyhow::{anyhow, Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use std::path::Path;
use zip::ZipArchive;

use body::BodyReader;
use styles::StyleSheet;

const DOCUMENT_PART: &str = "word/document.xml";
const STYLES_PART: &str = "word/styles.xml";
const CORE_PROPERTIES_PART: &str = "docProps/core.xml";

#[derive(Debug, Default, Clone)]
pub struct DocxPreprocessor;

impl DocxPreprocessor {
    pub fn new() -> Self {
        Self
    }
}

fn read_part(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<Option<String>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut content = String::new();
    file.read_to_string(&mut content)
        .with_context(|| format!("reading {name}"))?;
    Ok(Some(content))
}

impl Preprocessor for DocxPreprocessor {
    fn extract_markup(&self, bytes: &[u8]) -> Result<DocumentMarkup> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).context("not a DOCX (zip) container")?;

        let body = read_part(&mut archive, DOCUMENT_PART)?
            .ok_or_else(|| anyhow!("container has no {DOCUMENT_PART}"))?;
        let styles = read_part(&mut archive, STYLES_PART)?;
        let properties = read_part(&mut archive, CORE_PROPERTIES_PART)?;

        Ok(DocumentMarkup {
            body,
            styles,
            properties,
        })
    }

    fn parse_markup(&self, markup: &DocumentMarkup) -> Result<PreprocessorOutput> {
        let styles = match markup.styles.as_deref() {
            Some(xml) => StyleSheet::parse(xml).context("parsing styles.xml")?,
            None => StyleSheet::default(),
        };

        let (paragraphs, tables) = BodyReader::new(&styles)
            .read(&markup.body)
            .context("parsing document.xml")?;

        let metadata = match markup.properties.as_deref() {
            Some(xml) => parse_core_properties(xml).unwrap_or_else(|e| {
                log::warn!("Ignoring unreadable core properties: {e}");
                DocumentMetadata::default()
            }),
            None => DocumentMetadata::default(),
        };

        log::debug!(
            "DOCX parsing complete: {} paragraphs, {} tables, {} styles",
            paragraphs.len(),
            tables.len(),
            styles.len()
        );

        Ok(PreprocessorOutput {
            paragraphs,
            metadata,
            tables,
        })
    }

    fn name(&self) -> &str {
        "docx"
    }

    fn supports_file_type(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("docx"))
            .unwrap_or(false)
    }
}

/// Read dc:title, dc:creator, cp:lastModifiedBy and dcterms:modified
pub fn parse_core_properties(xml: &str) -> Result<DocumentMetadata> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut metadata = DocumentMetadata::default();
    let mut current: Option<Vec<u8>> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => current = Some(e.local_name().as_ref().to_vec()),
            Event::End(_) => current = None,
            Event::Text(t) => {
                let value = t.unescape()?.trim().to_string();
                if value.is_empty() {
                    continue;
                }
                match current.as_deref() {
                    Some(b"title") => metadata.title = Some(value),
                    Some(b"creator") => metadata.creator = Some(value),
                    Some(b"lastModifiedBy") => metadata.last_modified_by = Some(value),
                    Some(b"modified") => metadata.modified = Some(value),
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn build_docx(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in parts {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_process_minimal_docx() {
        let bytes = build_docx(&[
            (
                DOCUMENT_PART,
                r#"<w:document xmlns:w="w"><w:body><w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Hello</w:t></w:r></w:p></w:body></w:document>"#,
            ),
            (
                CORE_PROPERTIES_PART,
                r#"<cp:coreProperties xmlns:cp="cp" xmlns:dc="dc"><dc:title>Tender 42</dc:title><dc:creator>Procurement</dc:creator></cp:coreProperties>"#,
            ),
        ]);

        let output = DocxPreprocessor::new().process(&bytes).unwrap();
        assert_eq!(output.paragraphs.len(), 1);
        assert!(output.paragraphs[0].runs[0].format.bold);
        assert_eq!(output.metadata.title.as_deref(), Some("Tender 42"));
        assert_eq!(output.metadata.creator.as_deref(), Some("Procurement"));
    }

    #[test]
    fn test_missing_document_part_is_an_error() {
        let bytes = build_docx(&[(STYLES_PART, "<w:styles/>")]);
        let err = DocxPreprocessor::new().process(&bytes).unwrap_err();
        assert!(err.to_string().contains(DOCUMENT_PART));
    }

    #[test]
    fn test_not_a_zip_is_an_error() {
        assert!(DocxPreprocessor::new().process(b"plain text").is_err());
    }

    #[test]
    fn test_supports_file_type() {
        let pre = DocxPreprocessor::new();
        assert!(pre.supports_file_type(Path::new("a/b/chi_input.DOCX")));
        assert!(!pre.supports_file_type(Path::new("report.pdf")));
    }
}
