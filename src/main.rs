use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use garde_parser::{
    parse_bulletin_text, parse_web_page, validate_structure, ParseError, Parsed, Settings,
};

#[derive(Parser)]
#[command(name = "garde_parser", about = "On-duty pharmacy listings parser (annuaireci.com page, UNPPCI bulletin)")]
struct Cli {
    /// Settings file, layered over ./garde.toml and under GARDE_* variables
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a saved annuaireci.com week page
    Web {
        file: PathBuf,
        /// Write JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Parse the extracted text of a UNPPCI bulletin
    Bulletin {
        file: PathBuf,
        /// URL the bulletin was downloaded from
        #[arg(long)]
        source_url: Option<String>,
        /// Original document name (default: the text file's name)
        #[arg(long)]
        source_file: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check a saved page for the markers the web parser relies on
    Validate { file: PathBuf },
    /// Parse many files in parallel: .html/.htm as web pages, anything else as bulletin text
    Batch {
        files: Vec<PathBuf>,
        #[arg(long, default_value = "out")]
        out_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;

    let result = match cli.command {
        Commands::Web { file, output } => {
            let html = read(&file)?;
            if validate_structure(&html, &settings.web).is_empty() {
                info!("HTML structure OK");
            }
            let parsed = parse_web_page(
                &html,
                &settings.web,
                &settings.month_table(),
                settings.web_source(),
            )
            .with_context(|| format!("Failed to parse {}", file.display()))?;
            write_output(&parsed, output.as_deref())
        }
        Commands::Bulletin {
            file,
            source_url,
            source_file,
            output,
        } => {
            let text = read(&file)?;
            let source_file = source_file.or_else(|| file_name(&file));
            let parsed = parse_bulletin_text(
                &text,
                &settings.month_table(),
                settings.bulletin_source(source_file, source_url),
            )
            .with_context(|| format!("Failed to parse {}", file.display()))?;
            write_output(&parsed, output.as_deref())
        }
        Commands::Validate { file } => {
            let html = read(&file)?;
            let alerts = validate_structure(&html, &settings.web);
            if !alerts.is_empty() {
                bail!("{} structure alert(s) on {}", alerts.len(), file.display());
            }
            info!("HTML structure OK: {}", file.display());
            Ok(())
        }
        Commands::Batch { files, out_dir } => {
            if files.is_empty() {
                println!("No input files.");
                return Ok(());
            }
            println!("Parsing {} files...", files.len());
            let counts = process_files(&files, &out_dir, &settings)?;
            counts.print();
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

fn is_web_page(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"))
}

fn to_json(parsed: &Parsed) -> Result<String> {
    serde_json::to_string_pretty(&parsed.document).context("Failed to serialize document")
}

fn write_output(parsed: &Parsed, output: Option<&Path>) -> Result<()> {
    let json = to_json(parsed)?;
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            info!("JSON written: {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn parse_path(path: &Path, settings: &Settings) -> Result<Parsed> {
    let content = read(path)?;
    let months = settings.month_table();
    let parsed = if is_web_page(path) {
        parse_web_page(&content, &settings.web, &months, settings.web_source())?
    } else {
        parse_bulletin_text(&content, &months, settings.bulletin_source(file_name(path), None))?
    };
    Ok(parsed)
}

#[derive(Default)]
struct BatchCounts {
    parsed: usize,
    failed: usize,
    weeks: usize,
    areas: usize,
    pharmacies: usize,
    anomalies: usize,
}

impl BatchCounts {
    fn print(&self) {
        println!(
            "Parsed {} files ({} failed): {} weeks, {} areas, {} pharmacies, {} anomalies.",
            self.parsed, self.failed, self.weeks, self.areas, self.pharmacies, self.anomalies,
        );
    }
}

fn process_files(files: &[PathBuf], out_dir: &Path, settings: &Settings) -> Result<BatchCounts> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    fs::create_dir_all(out_dir).with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let results: Vec<_> = files
        .par_iter()
        .map(|file| {
            let result = parse_path(file, settings).and_then(|parsed| {
                let stem = file.file_stem().map_or_else(|| "document".into(), |s| s.to_string_lossy());
                let target = out_dir.join(format!("{stem}.json"));
                fs::write(&target, to_json(&parsed)?)
                    .with_context(|| format!("Failed to write {}", target.display()))?;
                Ok(parsed)
            });
            pb.inc(1);
            (file, result)
        })
        .collect();

    pb.finish_and_clear();

    let mut counts = BatchCounts::default();
    for (file, result) in results {
        match result {
            Ok(parsed) => {
                counts.parsed += 1;
                counts.weeks += parsed.document.periods().len();
                counts.areas += parsed.document.area_count();
                counts.pharmacies += parsed.document.pharmacy_count();
                counts.anomalies += parsed.report.anomalies.len();
            }
            Err(err) => {
                match err.downcast_ref::<ParseError>() {
                    Some(e) if e.is_structural() => {
                        warn!("{}: {e} - page layout changed? try `validate`", file.display())
                    }
                    _ => warn!("{}: {err:#}", file.display()),
                }
                counts.failed += 1;
            }
        }
    }
    Ok(counts)
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
