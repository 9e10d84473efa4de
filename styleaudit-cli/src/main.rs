use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};

use styleaudit_core::config::{parse_styles, AlignmentMode, MissingHeadingsPolicy, ReportFormat};
use styleaudit_core::{save_report, AuditConfig, AuditError, AuditProcessor, ComparisonReport, PipelineStages, Severity};

/// Picked up from the working directory when no --config is given
const LOCAL_CONFIG: &str = "styleaudit.yaml";

#[derive(Parser)]
#[command(name = "styleaudit")]
#[command(about = "Compare bold and underline emphasis between two language versions of a DOCX document")]
struct Args {
    /// Source-language document (e.g. the Chinese version)
    #[arg(short, long, required_unless_present = "show_configs")]
    source: Option<PathBuf>,

    /// Target-language document (e.g. the English version)
    #[arg(short, long, required_unless_present = "show_configs")]
    target: Option<PathBuf>,

    /// Path to custom config file (YAML format)
    #[arg(short, long)]
    config: Option<String>,

    /// Built-in config preset: default, tender or lenient
    #[arg(long)]
    preset: Option<String>,

    /// Report file path (default from config: report.html)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Report format: html or json
    #[arg(long)]
    format: Option<String>,

    /// Minimum label similarity (0.0-1.0) for two sections to align
    #[arg(long)]
    threshold: Option<f64>,

    /// Alignment mode: fuzzy or ordinal
    #[arg(long)]
    alignment: Option<String>,

    /// Styles to audit, comma separated (bold,underline)
    #[arg(long)]
    styles: Option<String>,

    /// Max whitespace/punctuation chars between same-style runs that still merge
    #[arg(long)]
    merge_gap: Option<usize>,

    /// Keyword identifying the TOC table in the source document
    #[arg(long)]
    source_toc_keyword: Option<String>,

    /// Keyword identifying the TOC table in the target document
    #[arg(long)]
    target_toc_keyword: Option<String>,

    /// Treat a document without headings as one section instead of failing
    #[arg(long)]
    whole_document: bool,

    /// Enable detailed profiling of all pipeline steps
    #[arg(long)]
    profile: bool,

    /// Dump all intermediate pipeline stage outputs to this directory
    #[arg(long)]
    dump_stages: Option<PathBuf>,

    /// Show available config options and exit
    #[arg(long)]
    show_configs: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = run() {
        // AuditError messages already name the document and the stage
        eprintln!("❌ Audit failed: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    println!("🦀 Styleaudit Emphasis Checker");

    if args.show_configs {
        show_help();
        return Ok(());
    }

    let config = build_config(&args, Path::new(LOCAL_CONFIG))?;
    let (Some(source), Some(target)) = (args.source.as_deref(), args.target.as_deref()) else {
        anyhow::bail!("both --source and --target are required");
    };

    let format = match &args.format {
        Some(f) => f.parse::<ReportFormat>()?,
        None => config.report.format,
    };
    let output = output_path(&args, &config, format);

    println!("📄 Source: {}", source.display());
    println!("📄 Target: {}", target.display());

    let processor = AuditProcessor::new(config);

    let report = match &args.dump_stages {
        Some(dir) => {
            println!("\n🔬 Pipeline stage dump mode");
            let stages = processor.audit_capture_stages(source, target)?;
            save_stages(&stages, dir)?;
            println!("✅ All stages dumped to: {}", dir.display());
            stages.into_report(processor.config().audited_styles())
        }
        None => processor.audit_with_profiling(source, target, args.profile)?,
    };

    print_summary(&report);
    save_report(&report, &processor.config().report, format, &output)?;
    println!("💾 Report saved to: {}", output.display());

    Ok(())
}

/// Preset or config file, then CLI overrides on top
fn build_config(args: &Args, local_config: &Path) -> Result<AuditConfig> {
    let mut config = if let Some(path) = &args.config {
        load_config_file(path)?
    } else if let Some(name) = &args.preset {
        let config = AuditConfig::preset(name).ok_or_else(|| {
            AuditError::Config(format!(
                "unknown preset '{name}' (available: {})",
                AuditConfig::preset_names().join(", ")
            ))
        })?;
        println!("📋 Using preset: {}", name);
        config
    } else if local_config.exists() {
        load_config_file(&local_config.to_string_lossy())?
    } else {
        println!("📋 Using default config");
        AuditConfig::default()
    };

    // Apply CLI overrides to config
    if let Some(threshold) = args.threshold {
        config.alignment.similarity_threshold = threshold;
    }
    if let Some(mode) = &args.alignment {
        config.alignment.mode = mode.parse::<AlignmentMode>()?;
    }
    if let Some(styles) = &args.styles {
        config.extraction.styles = parse_styles(styles)?;
    }
    if let Some(gap) = args.merge_gap {
        config.extraction.merge_gap = gap;
    }
    if let Some(keyword) = &args.source_toc_keyword {
        config.segmentation.source.toc_keyword = keyword.clone();
    }
    if let Some(keyword) = &args.target_toc_keyword {
        config.segmentation.target.toc_keyword = keyword.clone();
    }
    if args.whole_document {
        config.segmentation.on_missing_headings = MissingHeadingsPolicy::WholeDocument;
    }

    config.validate()?;
    log::debug!("Effective config: {:?}", config);
    Ok(config)
}

/// A config file that exists but does not parse or validate is fatal
fn load_config_file(path: &str) -> Result<AuditConfig> {
    let config = AuditConfig::load_from_file(path)
        .map_err(|e| AuditError::Config(format!("{path}: {e}")))?;
    println!("📋 Loaded config from: {}", path);
    Ok(config)
}

fn output_path(args: &Args, config: &AuditConfig, format: ReportFormat) -> PathBuf {
    if let Some(output) = &args.output {
        return output.clone();
    }
    let path = PathBuf::from(&config.report.output_path);
    match format {
        ReportFormat::Json => path.with_extension("json"),
        ReportFormat::Html => path,
    }
}

fn print_summary(report: &ComparisonReport) {
    let alignment = &report.alignment;
    let warnings = report.warning_count();

    println!("✅ Comparison complete");
    println!("📊 Summary:");
    println!(
        "   - Sections: {} source / {} target",
        report.source.sections.len(),
        report.target.sections.len()
    );
    println!("   - Matched pairs: {}", alignment.matched().count());
    if !alignment.unmatched_source.is_empty() || !alignment.unmatched_target.is_empty() {
        println!(
            "   ⚠️  Unmatched: {} source / {} target",
            alignment.unmatched_source.len(),
            alignment.unmatched_target.len()
        );
    }
    println!(
        "   - Discrepancies: {} ({} warnings, {} info)",
        report.discrepancies.len(),
        warnings,
        report
            .discrepancies
            .iter()
            .filter(|d| d.severity == Severity::Info)
            .count()
    );
}

fn show_help() {
    println!("\n📋 Available Configuration Options:");
    println!("  --source <path>             Source-language DOCX (e.g. Chinese)");
    println!("  --target <path>             Target-language DOCX (e.g. English)");
    println!("  --config <path>             Load custom config file (YAML)");
    println!("  --preset <name>             Built-in preset: {}", AuditConfig::preset_names().join(", "));
    println!("  --output <path>             Report path (default: report.html)");
    println!("  --format <fmt>              Report format: html or json");
    println!("  --threshold <0.0-1.0>       Section label similarity needed to align (default 0.6)");
    println!("  --alignment <mode>          fuzzy (best label match) or ordinal (by position)");
    println!("  --styles <list>             Styles to audit: bold,underline");
    println!("  --merge-gap <n>             Gap chars tolerated between same-style runs (default 1)");
    println!("  --source-toc-keyword <kw>   TOC table keyword in the source (default 頁碼)");
    println!("  --target-toc-keyword <kw>   TOC table keyword in the target (default Page)");
    println!("  --whole-document            Fall back to one section when no headings are found");
    println!("  --profile                   Print step timings");
    println!("  --dump-stages <dir>         Write every intermediate stage as JSON");

    println!("\n📁 Config file ({} in the working directory is used automatically):", LOCAL_CONFIG);
    println!("  alignment:     mode, similarity_threshold, metric");
    println!("  segmentation:  source/target {{toc_keyword, title_pattern}}, use_toc, use_styles,");
    println!("                 heading_styles, heading_patterns, max_heading_chars, on_missing_headings");
    println!("  extraction:    styles, merge_gap, include_tables");
    println!("  report:        title, source_label, target_label, format, output_path");

    println!("\n📝 Usage Examples:");
    println!("  styleaudit -s chi_input.docx -t eng_input.docx");
    println!("  styleaudit -s chi.docx -t eng.docx --preset tender -o out/report.html");
    println!("  styleaudit -s chi.docx -t eng.docx --format json --threshold 0.5");
    println!("  RUST_LOG=debug styleaudit -s chi.docx -t eng.docx --profile");
}

fn save_stages(stages: &PipelineStages, output_dir: &Path) -> Result<()> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;

    for (prefix, doc) in [("source", &stages.source), ("target", &stages.target)] {
        // Stage 1a: Raw WordprocessingML
        let markup_path = output_dir.join(format!("{prefix}_stage1a_document.xml"));
        fs::write(&markup_path, &doc.markup.body)?;
        println!("  💾 {}", markup_path.display());

        // Stage 1b: Paragraphs with runs
        let raw_path = output_dir.join(format!("{prefix}_stage1b_paragraphs.json"));
        fs::write(&raw_path, serde_json::to_string_pretty(&doc.preprocessed)?)?;
        println!("  💾 {} ({} paragraphs)", raw_path.display(), doc.preprocessed.paragraphs.len());

        // Stage 2: Spans and sections
        let doc_path = output_dir.join(format!("{prefix}_stage2_document.json"));
        fs::write(&doc_path, serde_json::to_string_pretty(&doc.document)?)?;
        println!("  💾 {} ({} sections)", doc_path.display(), doc.document.sections.len());
    }

    // Stage 3: Alignment
    let alignment_path = output_dir.join("stage3_alignment.json");
    fs::write(&alignment_path, serde_json::to_string_pretty(&stages.alignment)?)?;
    println!("  💾 {}", alignment_path.display());

    // Stage 4: Discrepancies
    let discrepancies_path = output_dir.join("stage4_discrepancies.json");
    fs::write(&discrepancies_path, serde_json::to_string_pretty(&stages.discrepancies)?)?;
    println!("  💾 {} ({} discrepancies)", discrepancies_path.display(), stages.discrepancies.len());

    // Summary file: quick reference for validation scripts
    let summary = serde_json::json!({
        "source": stages.source.document.name,
        "target": stages.target.document.name,
        "captured_at": chrono::Utc::now().to_rfc3339(),
        "stage_counts": {
            "source_paragraphs": stages.source.document.paragraphs.len(),
            "target_paragraphs": stages.target.document.paragraphs.len(),
            "source_sections": stages.source.document.sections.len(),
            "target_sections": stages.target.document.sections.len(),
            "matched_pairs": stages.alignment.matched().count(),
            "discrepancies": stages.discrepancies.len(),
        }
    });
    let summary_path = output_dir.join("summary.json");
    fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;
    println!("  💾 {}", summary_path.display());

    Ok(())
}
