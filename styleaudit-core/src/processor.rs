use crate::aligner::SectionAligner;
use crate::comparator::Comparator;
use crate::config::{AuditConfig, MissingHeadingsPolicy};
use crate::error::{AuditError, Stage};
use crate::extractor::RunExtractor;
use crate::preprocessors::{DocumentMarkup, DocxPreprocessor, Preprocessor};
use crate::segmenter::{build_detector, segment, whole_document};
use crate::types::*;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::{Duration, Instant};

/// Captured intermediate outputs of one document
/// Used for `--dump-stages` and tests that inspect stage boundaries
#[derive(Debug, Clone, serde::Serialize)]
pub struct DocumentStages {
    pub markup: DocumentMarkup,
    pub preprocessed: PreprocessorOutput,
    pub document: Document,
}

/// Captured intermediate outputs of a whole audit run
#[derive(Debug, Clone, serde::Serialize)]
pub struct PipelineStages {
    pub source: DocumentStages,
    pub target: DocumentStages,
    pub alignment: AlignmentResult,
    pub discrepancies: Vec<Discrepancy>,
}

/// Simple profiler that collects timings for pipeline steps
pub struct StepProfiler {
    enabled: bool,
    timings: Vec<(String, Duration)>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timings: Vec::new(),
        }
    }

    pub fn time_step<F, R>(&mut self, step_name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.enabled {
            return f();
        }

        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        self.timings.push((step_name.to_string(), elapsed));
        println!("⏱️  {}: {:.0}ms", step_name, elapsed.as_millis());

        result
    }

    pub fn timings(&self) -> &[(String, Duration)] {
        &self.timings
    }

    pub fn print_summary(&self) {
        if !self.enabled || self.timings.is_empty() {
            return;
        }

        println!("\n📊 Performance Summary:");
        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();

        for (step, duration) in &self.timings {
            let percentage = if total.is_zero() {
                0.0
            } else {
                (duration.as_secs_f64() / total.as_secs_f64()) * 100.0
            };
            println!(
                "   {:.<35} {:.0}ms ({:.1}%)",
                step,
                duration.as_millis(),
                percentage
            );
        }
        println!("   {:.<35} {:.0}ms", "Total", total.as_millis());
    }
}

/// Hex SHA-256 of the input bytes
pub fn document_digest(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Runs the whole audit: both documents through preprocessing, extraction
/// and segmentation (in parallel), then alignment and comparison.
pub struct AuditProcessor {
    preprocessor: Box<dyn Preprocessor>,
    config: AuditConfig,
}

impl AuditProcessor {
    /// Create AuditProcessor with an injected preprocessor
    pub fn new_with_preprocessor(preprocessor: Box<dyn Preprocessor>, config: AuditConfig) -> Self {
        Self { preprocessor, config }
    }

    /// DOCX preprocessor, given config
    pub fn new(config: AuditConfig) -> Self {
        Self::new_with_preprocessor(Box::new(DocxPreprocessor::new()), config)
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Read one document from disk and run it through every per-document stage
    pub fn load_document(&self, path: &Path, language: Language) -> Result<DocumentStages, AuditError> {
        let name = display_name(path);
        let bytes = std::fs::read(path).map_err(|e| AuditError::input(&name, Stage::Read, e))?;
        self.build_document(&name, language, &bytes)
    }

    /// Per-document pipeline on in-memory bytes
    pub fn build_document(&self, name: &str, language: Language, bytes: &[u8]) -> Result<DocumentStages, AuditError> {
        let start = Instant::now();
        log::info!("{language}: processing {name} ({} bytes)", bytes.len());

        let digest = document_digest(bytes);

        let markup = self
            .preprocessor
            .extract_markup(bytes)
            .map_err(|e| AuditError::input(name, Stage::Unzip, format!("{e:#}")))?;
        let preprocessed = self
            .preprocessor
            .parse_markup(&markup)
            .map_err(|e| AuditError::input(name, Stage::Parse, format!("{e:#}")))?;

        let paragraphs = RunExtractor::from_config(&self.config.extraction).extract(&preprocessed.paragraphs);

        let mut detector = build_detector(&self.config.segmentation, language, &preprocessed.tables)?;
        let sections = match segment(&paragraphs, &mut detector) {
            Ok(sections) => sections,
            Err(e) => match self.config.segmentation.on_missing_headings {
                MissingHeadingsPolicy::Fail => return Err(e.for_document(name)),
                MissingHeadingsPolicy::WholeDocument => {
                    log::warn!("{name}: no headings detected, treating the whole document as one section");
                    whole_document(name, paragraphs.len())
                }
            },
        };

        let document = Document {
            name: name.to_string(),
            language,
            digest,
            metadata: preprocessed.metadata.clone(),
            paragraphs,
            sections,
        };
        log::info!(
            "{language}: {} paragraphs, {} sections, {} bold / {} underline spans in {:.0}ms",
            document.paragraphs.len(),
            document.sections.len(),
            document.span_count(StyleKind::Bold),
            document.span_count(StyleKind::Underline),
            start.elapsed().as_millis()
        );

        Ok(DocumentStages {
            markup,
            preprocessed,
            document,
        })
    }

    /// Load both documents in parallel. The source error wins when both fail.
    fn load_pair(&self, source: &Path, target: &Path) -> Result<(DocumentStages, DocumentStages), AuditError> {
        let (source, target) = rayon::join(
            || self.load_document(source, Language::Source),
            || self.load_document(target, Language::Target),
        );
        Ok((source?, target?))
    }

    /// Align and compare two finished documents
    pub fn compare_documents(&self, source: Document, target: Document) -> ComparisonReport {
        let (alignment, discrepancies) = self.align_and_compare(&source, &target);
        ComparisonReport::new(source, target, alignment, discrepancies, self.config.audited_styles())
    }

    fn align_and_compare(&self, source: &Document, target: &Document) -> (AlignmentResult, Vec<Discrepancy>) {
        let alignment = SectionAligner::from_config(&self.config.alignment).align(&source.sections, &target.sections);
        let discrepancies = Comparator::new(self.config.audited_styles()).compare(source, target, &alignment);
        (alignment, discrepancies)
    }

    /// Main entry point: two DOCX paths → report data
    pub fn audit(&self, source: &Path, target: &Path) -> Result<ComparisonReport, AuditError> {
        self.audit_with_profiling(source, target, false)
    }

    pub fn audit_with_profiling(
        &self,
        source: &Path,
        target: &Path,
        enable_profiling: bool,
    ) -> Result<ComparisonReport, AuditError> {
        let mut profiler = StepProfiler::new(enable_profiling);
        let start_time = Instant::now();

        let (source, target) = profiler.time_step("1. Extract documents (parallel)", || self.load_pair(source, target))?;

        let alignment = profiler.time_step("2. Section alignment", || {
            SectionAligner::from_config(&self.config.alignment)
                .align(&source.document.sections, &target.document.sections)
        });

        let discrepancies = profiler.time_step("3. Span comparison", || {
            Comparator::new(self.config.audited_styles()).compare(&source.document, &target.document, &alignment)
        });

        profiler.print_summary();
        log::info!(
            "Audit finished in {:.3}s: {} matched pairs, {} discrepancies",
            start_time.elapsed().as_secs_f64(),
            alignment.matched().count(),
            discrepancies.len()
        );

        Ok(ComparisonReport::new(
            source.document,
            target.document,
            alignment,
            discrepancies,
            self.config.audited_styles(),
        ))
    }

    /// Run the audit and keep every intermediate stage output
    pub fn audit_capture_stages(&self, source: &Path, target: &Path) -> Result<PipelineStages, AuditError> {
        let (source, target) = self.load_pair(source, target)?;
        let (alignment, discrepancies) = self.align_and_compare(&source.document, &target.document);
        Ok(PipelineStages {
            source,
            target,
            alignment,
            discrepancies,
        })
    }
}

impl PipelineStages {
    pub fn into_report(self, styles: Vec<StyleKind>) -> ComparisonReport {
        ComparisonReport::new(
            self.source.document,
            self.target.document,
            self.alignment,
            self.discrepancies,
            styles,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AlignmentMode;
    use anyhow::Result as AnyResult;

    /// Preprocessor stub: one paragraph per line, "# " marks a heading
    /// and `*word*` marks bold.
    struct LinePreprocessor;

    impl Preprocessor for LinePreprocessor {
        fn extract_markup(&self, bytes: &[u8]) -> AnyResult<DocumentMarkup> {
            let body = String::from_utf8(bytes.to_vec())?;
            Ok(DocumentMarkup {
                body,
                ..DocumentMarkup::default()
            })
        }

        fn parse_markup(&self, markup: &DocumentMarkup) -> AnyResult<PreprocessorOutput> {
            let paragraphs = markup
                .body
                .lines()
                .map(|line| {
                    let (heading_level, line) = match line.strip_prefix("# ") {
                        Some(rest) => (Some(1), rest),
                        None => (None, line),
                    };
                    let runs = line
                        .split('*')
                        .enumerate()
                        .filter(|(_, t)| !t.is_empty())
                        .map(|(i, t)| if i % 2 == 1 { Run::bold(t) } else { Run::plain(t) })
                        .collect();
                    RawParagraph {
                        runs,
                        style_id: None,
                        heading_level,
                        origin: ParagraphOrigin::Body,
                    }
                })
                .collect();
            Ok(PreprocessorOutput {
                paragraphs,
                metadata: DocumentMetadata::default(),
                tables: Vec::new(),
            })
        }

        fn name(&self) -> &str {
            "lines"
        }

        fn supports_file_type(&self, _path: &Path) -> bool {
            true
        }
    }

    fn processor(config: AuditConfig) -> AuditProcessor {
        AuditProcessor::new_with_preprocessor(Box::new(LinePreprocessor), config)
    }

    #[test]
    fn test_build_document() {
        let stages = processor(AuditConfig::default())
            .build_document("a.txt", Language::Source, b"Cover\n# Scope\nPay *30 days*\n# Pricing\n*Total* *Amount*")
            .unwrap();
        let doc = &stages.document;
        assert_eq!(doc.sections.len(), 3);
        assert!(doc.sections[0].is_preamble);
        assert_eq!(doc.digest, document_digest(b"Cover\n# Scope\nPay *30 days*\n# Pricing\n*Total* *Amount*"));
        let pricing: Vec<_> = doc
            .section_spans(&doc.sections[2], StyleKind::Bold)
            .iter()
            .map(|s| s.text.clone())
            .collect();
        assert_eq!(pricing, vec!["Total Amount"]);
    }

    #[test]
    fn test_missing_headings_policy() {
        let err = processor(AuditConfig::default())
            .build_document("flat.txt", Language::Target, b"no\nheadings")
            .unwrap_err();
        assert_eq!(err.stage(), Stage::Segment);
        assert_eq!(err.document(), Some("flat.txt"));

        let mut config = AuditConfig::default();
        config.segmentation.on_missing_headings = MissingHeadingsPolicy::WholeDocument;
        let stages = processor(config)
            .build_document("flat.txt", Language::Target, b"no\nheadings")
            .unwrap();
        assert_eq!(stages.document.sections[0].label, "Whole Document (flat.txt)");
    }

    #[test]
    fn test_parse_failure_names_stage() {
        let err = processor(AuditConfig::default())
            .build_document("bin.txt", Language::Source, &[0xff, 0xfe])
            .unwrap_err();
        assert_eq!(err.stage(), Stage::Unzip);
    }

    #[test]
    fn test_compare_documents_end_to_end() {
        let mut config = AuditConfig::default();
        config.alignment.similarity_threshold = 0.5;
        let p = processor(config);
        let source = p
            .build_document("s", Language::Source, b"# Introduction\n*Note*\n# Pricing Terms\n*30 days*\n# Appendix A\n")
            .unwrap()
            .document;
        let target = p
            .build_document("t", Language::Target, b"# Intro\n*note*\n# Pricing Terms\n*thirty days*\n# Appendix B\n")
            .unwrap()
            .document;

        let report = p.compare_documents(source, target);
        assert_eq!(report.alignment.matched().count(), 3);
        assert_eq!(report.discrepancies.len(), 2);
        assert!(report.discrepancies.iter().all(|d| d.section_ordinal == 1));
        assert!(report.discrepancies.iter().all(|d| d.severity == Severity::Info));
    }

    #[test]
    fn test_audit_reads_files_in_parallel() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("chi.txt");
        let target = dir.path().join("eng.txt");
        std::fs::write(&source, "# 甲部\n*總額*\n# 乙部\n").unwrap();
        std::fs::write(&target, "# Part A\n*Total*\n").unwrap();

        let mut config = AuditConfig::default();
        config.alignment.mode = AlignmentMode::Ordinal;
        let p = processor(config);
        let report = p.audit(&source, &target).unwrap();
        assert_eq!(report.source.name, "chi.txt");
        assert_eq!(report.alignment.unmatched_source, vec![1]);

        let missing = dir.path().join("missing.txt");
        let err = p.audit(&missing, &target).unwrap_err();
        assert_eq!(err.stage(), Stage::Read);
        assert_eq!(err.document(), Some("missing.txt"));

        let stages = p.audit_capture_stages(&source, &target).unwrap();
        assert_eq!(stages.source.preprocessed.paragraphs.len(), 3);
        assert!(serde_json::to_string(&stages).is_ok());
    }

    #[test]
    fn test_profiler_records_only_when_enabled() {
        let mut off = StepProfiler::new(false);
        assert_eq!(off.time_step("x", || 1 + 1), 2);
        assert!(off.timings().is_empty());

        let mut on = StepProfiler::new(true);
        on.time_step("x", || ());
        assert_eq!(on.timings().len(), 1);
    }
}
