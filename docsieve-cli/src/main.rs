use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

// Import from docsieve-core
use docsieve_core::processor::AnalysisSummary;
use docsieve_core::{
    compute_ranges, BatchReport, DocumentSieve, FileReportStore, LopdfSource, PageDecision,
    ScanOutcome, SieveConfig, SieveError, SplitReport, StepProfiler,
};

// Import CLI utilities
use docsieve::{logging, settings};

#[derive(Parser)]
#[command(name = "docsieve")]
#[command(about = "Split compiled administrative PDFs into documents and check their mandatory fields")]
struct Args {
    /// Path to custom config file (YAML format)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Validation report file (overrides report.path)
    #[arg(short, long, global = true)]
    report: Option<PathBuf>,

    /// Print a machine-readable JSON summary instead of the text one
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect document boundaries and print them
    Scan {
        /// Compiled PDF
        input: PathBuf,
    },
    /// Detect boundaries and write one PDF per document
    Split {
        input: PathBuf,
        /// Output directory (default: documentos_separados next to the input)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Extract and validate every .txt file in a directory
    Analyze {
        /// Directory of pre-extracted document texts
        dir: PathBuf,
    },
    /// Scan, split, extract and validate one or more compiled PDFs
    Run {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Skip the text cache even when enabled in config
        #[arg(long)]
        skip_cache: bool,
        /// Print per-stage timings
        #[arg(long)]
        profile: bool,
    },
    /// Print the effective configuration as YAML
    ShowConfig,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let (mut config, config_path) = settings::resolve_config(args.config.as_deref())?;
    if let Some(report) = &args.report {
        config.report.path = report.clone();
    }

    if !args.json {
        println!("📑 docsieve");
        match &config_path {
            Some(path) => println!("📋 Loaded config from: {}", path.display()),
            None => println!("📋 Using default config"),
        }
    }

    match args.command {
        Command::ShowConfig => {
            print!("{}", config.to_yaml()?);
            Ok(())
        }
        Command::Scan { input } => {
            let sieve = build_sieve(config)?;
            let outcome = match sieve.scan(&input) {
                Ok(outcome) => outcome,
                Err(e) => fail(&e),
            };
            if args.json {
                print_json(&outcome)
            } else {
                print_scan(&input, &outcome);
                Ok(())
            }
        }
        Command::Split { input, output_dir } => {
            if output_dir.is_some() {
                config.splitter.output_dir = output_dir;
            }
            config.splitter.enabled = true;
            let sieve = build_sieve(config)?;

            let source = match LopdfSource::open(&input) {
                Ok(source) => source,
                Err(e) => fail(&e),
            };
            let outcome = sieve.scan_source(&source);
            let split = sieve
                .split(&source, &outcome)
                .with_context(|| format!("splitting {}", input.display()))?;

            if args.json {
                print_json(&split)
            } else {
                print_scan(&input, &outcome);
                print_split(&split);
                Ok(())
            }
        }
        Command::Analyze { dir } => {
            let sieve = build_sieve(config)?;
            let mut store = FileReportStore::new(&sieve.config().report.path);
            let summary = sieve.analyze_directory(&dir, &mut store)?;

            if args.json {
                print_json(&summary)
            } else {
                print_analysis(&summary);
                println!("💾 Report appended to: {}", store.path().display());
                Ok(())
            }
        }
        Command::Run {
            inputs,
            output_dir,
            skip_cache,
            profile,
        } => {
            if output_dir.is_some() {
                config.splitter.output_dir = output_dir;
            }
            if skip_cache {
                config.cache.enabled = false;
            }
            let sieve = build_sieve(config)?;
            let mut store = FileReportStore::new(&sieve.config().report.path);

            let mut reports: Vec<BatchReport> = Vec::new();
            for input in &inputs {
                let mut profiler = StepProfiler::new(profile);
                match sieve.run_with_profiler(input, &mut store, &mut profiler) {
                    Ok(report) => {
                        if !args.json {
                            print_batch(&report);
                            profiler.print_summary();
                        }
                        reports.push(report);
                    }
                    Err(e) if is_missing_input(&e) => {
                        eprintln!("⚠️  Skipping {}: {e:#}", input.display());
                    }
                    Err(e) => return Err(e),
                }
            }

            if args.json {
                print_json(&reports)
            } else {
                println!("\n💾 Report appended to: {}", store.path().display());
                Ok(())
            }
        }
    }
}

/// Fatal startup errors (bad rule, bad pattern) end the process here.
fn build_sieve(config: SieveConfig) -> Result<DocumentSieve> {
    DocumentSieve::from_config(config).context("building pipeline")
}

fn is_missing_input(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<SieveError>(),
        Some(SieveError::MissingInput { .. })
    )
}

fn fail(error: &SieveError) -> ! {
    eprintln!("❌ {error}");
    std::process::exit(1);
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_scan(input: &Path, outcome: &ScanOutcome) {
    println!("📄 {} ({} pages)", input.display(), outcome.total_pages);
    for (page, decision) in outcome.decisions.iter().enumerate() {
        match decision {
            PageDecision::NewDocument { label, line } => {
                println!("   p{:<4} ▶ {label}  \"{line}\"", page + 1)
            }
            PageDecision::ForcedStart { label } => println!("   p{:<4} ▶ {label} (first page)", page + 1),
            _ => {}
        }
    }
    let ranges = compute_ranges(&outcome.records, outcome.total_pages);
    println!("🔎 {} documents detected", ranges.len());
    for range in &ranges {
        println!(
            "   {:02} {:<40} pages {}-{}",
            range.sequence,
            range.label,
            range.start + 1,
            range.end
        );
    }
}

fn print_split(split: &SplitReport) {
    println!("✂️  Artifacts in {}", split.output_dir.display());
    for artifact in &split.artifacts {
        match (&artifact.path, &artifact.error) {
            (Some(path), _) => {
                let file = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
                let mut notes = Vec::new();
                if artifact.rasterized > 0 {
                    notes.push(format!("{} rasterized", artifact.rasterized));
                }
                if artifact.placeholders > 0 {
                    notes.push(format!("{} placeholders", artifact.placeholders));
                }
                if notes.is_empty() {
                    println!("   ✅ {file} ({} pages)", artifact.page_count());
                } else {
                    println!("   ⚠️  {file} ({} pages, {})", artifact.page_count(), notes.join(", "));
                }
            }
            (None, Some(error)) => println!("   ❌ {:02} {}: {error}", artifact.range.sequence, artifact.range.label),
            (None, None) => {}
        }
    }
}

fn print_analysis(summary: &AnalysisSummary) {
    println!(
        "🧾 {} documents validated, {} complete",
        summary.documents.len(),
        summary.complete()
    );
    for document in &summary.documents {
        if document.validation.overall {
            println!("   ✅ {}", document.document);
        } else {
            let missing: Vec<&str> = document.validation.missing().collect();
            println!("   ❌ {} missing: {}", document.document, missing.join(", "));
        }
    }
    for skipped in &summary.skipped {
        println!("   ⚠️  {} skipped: {}", skipped.document, skipped.reason);
    }
}

fn print_batch(report: &BatchReport) {
    print_scan(&report.source, &report.scan);
    match &report.split {
        Some(split) => {
            print_split(split);
            print_analysis(&report.analysis);
        }
        None => println!("⏭️  Splitting disabled, nothing written"),
    }
}
