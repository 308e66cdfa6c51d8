//! Main entry point for the memzip CLI application.
//!
//! Loads an archive from the local filesystem or an HTTP URL into memory,
//! then lists it, prints one entry, or extracts it.

use anyhow::{Result, bail};
use clap::Parser;
use tokio::io::AsyncWriteExt;
use tracing_subscriber::EnvFilter;

use memzip::zip::format_size;
use memzip::{
    ArchiveSource, Cli, ExtractedEntry, Extraction, ExtractionReport, HttpSource, LocalFileSource,
    ZipExtractor,
};

/// Application entry point.
///
/// Parses command-line arguments, loads the archive and dispatches to the
/// handler for the requested mode.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let data = if cli.is_http_url() {
        let source = HttpSource::new(cli.file.clone()).await?;
        let data = load(&source).await?;
        if !cli.is_quiet() {
            eprintln!(
                "Downloaded {} from {}",
                format_size(source.transferred_bytes()),
                source.describe()
            );
        }
        data
    } else {
        load(&LocalFileSource::new(&cli.file)).await?
    };

    process_zip(&data, &cli).await
}

fn init_tracing(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn load(source: &dyn ArchiveSource) -> Result<Vec<u8>> {
    let data = source.load().await?;
    tracing::info!(source = source.describe(), size = data.len(), "Loaded archive");
    Ok(data)
}

/// Run the request described by the CLI against an in-memory archive.
async fn process_zip(data: &[u8], cli: &Cli) -> Result<()> {
    let extractor = ZipExtractor::with_config(data, cli.reader_config());

    match extractor.run(&cli.request())? {
        Extraction::Listing(report) => {
            let comment = if cli.verbose {
                extractor.comment()?
            } else {
                String::new()
            };
            list_files(&extractor, &report, cli.verbose, &comment)
        }
        Extraction::File(content) => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&content).await?;
            stdout.flush().await?;
            Ok(())
        }
        Extraction::Extracted(report) => summarize(&report, cli),
    }
}

/// Print the archive listing.
///
/// Supports two output formats:
/// - Simple format (`-l`): Just file names, one per line
/// - Verbose format (`-v`): Detailed table with sizes, ratio, timestamps and CRC status
fn list_files(
    extractor: &ZipExtractor<'_>,
    report: &ExtractionReport,
    verbose: bool,
    comment: &str,
) -> Result<()> {
    if !verbose {
        for result in report.entries() {
            match result {
                Ok(entry) => println!("{}", entry.name),
                Err(failure) => println!("{}", failure.name),
            }
        }
        return Ok(());
    }

    if !comment.is_empty() {
        println!("Archive comment: {}", comment);
    }
    println!(
        "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  {:>8}  Name",
        "Length", "Size", "Cmpr", "Date", "Time", "CRC-32"
    );
    println!("{}", "-".repeat(80));

    let entries = extractor.entries()?;
    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    for cd in entries.iter().filter(|e| !e.is_directory) {
        let (year, month, day) = cd.mod_date();
        let (hour, minute, _second) = cd.mod_time();

        let ratio = if cd.uncompressed_size > 0 {
            format!(
                "{:>4}%",
                100 - (cd.compressed_size.min(cd.uncompressed_size) * 100 / cd.uncompressed_size)
            )
        } else {
            "  0%".to_string()
        };

        let status = match report.get(&cd.file_name) {
            Some(entry) if entry.encrypted => "encrypted".to_string(),
            Some(entry) if entry.crc_ok => entry.content_hash.clone(),
            Some(_) => "BAD".to_string(),
            None => "unreadable".to_string(),
        };

        println!(
            "{:>10}  {:>10}  {}  {:04}-{:02}-{:02}  {:02}:{:02}  {:>8}  {}",
            cd.uncompressed_size,
            cd.compressed_size,
            ratio,
            year,
            month,
            day,
            hour,
            minute,
            status,
            cd.file_name
        );
        if let Some(entry) = report.get(&cd.file_name) {
            if !entry.preview.is_empty() {
                println!("{:>12}{:?}", "", String::from_utf8_lossy(&entry.preview));
            }
        }

        total_uncompressed += cd.uncompressed_size;
        total_compressed += cd.compressed_size;
        file_count += 1;
    }

    println!("{}", "-".repeat(80));
    let total_ratio = if total_uncompressed > 0 {
        format!(
            "{:>4}%",
            100 - (total_compressed.min(total_uncompressed) * 100 / total_uncompressed)
        )
    } else {
        "  0%".to_string()
    };
    println!(
        "{:>10}  {:>10}  {}  {:>31}  {} files",
        total_uncompressed, total_compressed, total_ratio, "", file_count
    );

    Ok(())
}

/// Report what happened to each entry and fail if any entry failed.
fn summarize(report: &ExtractionReport, cli: &Cli) -> Result<()> {
    for result in report.entries() {
        match result {
            Ok(entry) if entry.written => {
                if !cli.is_quiet() {
                    let flag = if entry.crc_ok { "" } else { " (CRC mismatch)" };
                    println!("  extracting: {}{}", entry.name, flag);
                }
            }
            Ok(ExtractedEntry {
                name,
                skip_reason: Some(reason),
                ..
            }) => {
                if !cli.is_quiet() {
                    eprintln!("Skipping: {} ({})", name, reason);
                }
            }
            Ok(entry) => {
                if !cli.is_very_quiet() {
                    eprintln!("Not written: {} (CRC mismatch)", entry.name);
                }
            }
            Err(failure) => {
                if !cli.is_very_quiet() {
                    eprintln!("Failed: {}", failure);
                }
            }
        }
    }

    for failure in report.directory_failures() {
        if !cli.is_very_quiet() {
            eprintln!("Failed: {}", failure);
        }
    }

    let failed = report.failures().count();
    let dirs_failed = report.directory_failures().len();
    if failed > 0 || dirs_failed > 0 {
        bail!(
            "{} of {} entries and {} directories failed",
            failed,
            report.len(),
            dirs_failed
        );
    }
    Ok(())
}
