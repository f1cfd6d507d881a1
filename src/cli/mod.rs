//! # CLI Module
//!
//! Command-line interface for the big key scanner.
//!
//! ## Usage
//! ```bash
//! # Scan the local server with default thresholds
//! bigkey-scan scan
//!
//! # Authenticate and pick a database
//! bigkey-scan scan --password 123456 --db 2
//!
//! # Only look at some keys, with a stricter string threshold
//! bigkey-scan scan --match 'session:*' --string-threshold 1024
//!
//! # JSON output
//! bigkey-scan scan --output json
//! ```

use bigkey_scanner::core::bigkey::{BigKeyScanner, Finding, ThresholdTable};
use bigkey_scanner::core::keyspace::{ConnectionSettings, KeyType, RedisStore};
use bigkey_scanner::core::reporter::{export, ExportFormat, ScanReport};
use bigkey_scanner::error::{ReportError, Result};
use bigkey_scanner::events::{Event, EventChannel, ScanEvent};
use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

/// Redis Big Key Scanner - find oversized keys without blocking the server
#[derive(Parser, Debug)]
#[command(name = "bigkey-scan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan a Redis keyspace for big keys
    Scan(ScanArgs),
}

#[derive(clap::Args, Debug)]
struct ScanArgs {
    /// Server host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short, long, default_value = "6379")]
    port: u16,

    /// Full server URL (overrides --host and --port)
    #[arg(long)]
    url: Option<String>,

    /// ACL user name
    #[arg(long)]
    user: Option<String>,

    /// Password for AUTH
    #[arg(short = 'a', long)]
    password: Option<String>,

    /// Logical database index
    #[arg(short = 'n', long, default_value = "0")]
    db: i64,

    /// Connect/read/write timeout in milliseconds
    #[arg(long, default_value = "5000")]
    timeout_ms: u64,

    /// Only scan keys matching this glob
    #[arg(short = 'm', long = "match", default_value = "*")]
    pattern: String,

    /// SCAN COUNT hint (keys per batch)
    #[arg(short, long, default_value = "100")]
    count: usize,

    /// String length in bytes at which a key is flagged
    #[arg(long, default_value = "5120")]
    string_threshold: u64,

    /// Element count at which a hash, list, set or zset is flagged
    #[arg(long, default_value = "500")]
    container_threshold: u64,

    /// Override the container threshold for hashes
    #[arg(long)]
    hash_threshold: Option<u64>,

    /// Override the container threshold for lists
    #[arg(long)]
    list_threshold: Option<u64>,

    /// Override the container threshold for sets
    #[arg(long)]
    set_threshold: Option<u64>,

    /// Override the container threshold for sorted sets
    #[arg(long)]
    zset_threshold: Option<u64>,

    /// JSON file of thresholds (replaces all threshold flags)
    #[arg(long)]
    thresholds: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "pretty")]
    output: OutputFormat,

    /// Maximum number of keys listed in pretty output
    #[arg(short, long, default_value = "50")]
    limit: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON report for scripting
    Json,
    /// CSV, one row per big key
    Csv,
    /// Key names only
    Minimal,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan(args) => {
            bigkey_scanner::init_tracing(if args.verbose { "info" } else { "warn" });
            run_scan(args)
        }
    }
}

impl ScanArgs {
    fn threshold_table(&self) -> Result<ThresholdTable> {
        if let Some(ref path) = self.thresholds {
            return Ok(ThresholdTable::from_json_file(path)?);
        }

        let mut builder = ThresholdTable::builder()
            .string(self.string_threshold)
            .containers(self.container_threshold);
        let overrides = [
            (KeyType::Hash, self.hash_threshold),
            (KeyType::List, self.list_threshold),
            (KeyType::Set, self.set_threshold),
            (KeyType::ZSet, self.zset_threshold),
        ];
        for (key_type, threshold) in overrides {
            if let Some(threshold) = threshold {
                builder = builder.set(key_type, threshold);
            }
        }
        Ok(builder.build()?)
    }

    fn connection_settings(&self) -> ConnectionSettings {
        let base = match self.url {
            Some(ref url) => ConnectionSettings {
                url: url.clone(),
                ..ConnectionSettings::default()
            },
            None => ConnectionSettings::for_host(&self.host, self.port),
        };
        ConnectionSettings {
            username: self.user.clone(),
            password: self.password.clone(),
            db: self.db,
            timeout: Some(Duration::from_millis(self.timeout_ms)),
            ..base
        }
    }
}

fn run_scan(args: ScanArgs) -> Result<()> {
    let term = Term::stderr();
    let pretty = matches!(args.output, OutputFormat::Pretty);

    // Everything that can be rejected is rejected before connecting
    let scanner = BigKeyScanner::builder()
        .thresholds(args.threshold_table()?)
        .pattern(args.pattern.clone())
        .count(args.count)
        .build()?;
    let settings = args.connection_settings();
    settings.validate()?;

    if pretty {
        term.write_line(&format!(
            "{} {}",
            style("Redis Big Key Scanner").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    // Released when this function returns, on success or error
    let mut store = RedisStore::connect(&settings)?;
    store.ping()?;

    let (sender, receiver) = EventChannel::new();

    let progress = if pretty {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {elapsed_precise} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();
    let verbose = args.verbose;

    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(ref pb) = progress_clone else {
                continue;
            };
            match event {
                Event::Scan(ScanEvent::BatchFetched(p)) => {
                    pb.set_message(format!(
                        "{} keys scanned, {} big keys, {} batches",
                        p.keys_scanned, p.findings, p.batches
                    ));
                }
                Event::Scan(ScanEvent::BigKeyFound(finding)) if verbose => {
                    pb.println(format!("  {} {}", style("!").yellow(), finding));
                }
                Event::Scan(ScanEvent::Completed(_)) | Event::Scan(ScanEvent::Failed { .. }) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    let result = ScanReport::collect(scanner.scan_with_events(&mut store, sender));

    // The scan (and its sender) is gone, so the event thread ends
    event_thread.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let report = result?;

    match args.output {
        OutputFormat::Pretty => print_pretty_results(&term, &report, args.limit),
        OutputFormat::Json => export(&report, ExportFormat::Json, std::io::stdout().lock())?,
        OutputFormat::Csv => export(&report, ExportFormat::Csv, std::io::stdout().lock())?,
        OutputFormat::Minimal => print_minimal_results(&report)?,
    }

    Ok(())
}

fn print_pretty_results(term: &Term, report: &ScanReport, limit: usize) {
    term.write_line(&format!("{} Scan Complete", style("✓").green().bold()))
        .ok();
    term.write_line("").ok();

    // Summary
    term.write_line(&format!(
        "  {} keys scanned in {:.1}s ({} batches)",
        style(report.stats.keys_scanned).cyan(),
        report.duration_ms as f64 / 1000.0,
        report.stats.batches
    ))
    .ok();

    term.write_line(&format!(
        "  {} big keys found",
        style(report.total_findings()).cyan()
    ))
    .ok();

    if report.stats.keys_skipped > 0 {
        term.write_line(&format!(
            "  {} keys skipped (vanished or failed lookup)",
            style(report.stats.keys_skipped).yellow()
        ))
        .ok();
    }

    if report.stats.keys_unrecognized > 0 {
        term.write_line(&format!(
            "  {} keys of types without a size metric",
            style(report.stats.keys_unrecognized).dim()
        ))
        .ok();
    }

    term.write_line("").ok();

    if report.is_clean() {
        term.write_line(&format!("  {} No big keys found!", style("✓").green()))
            .ok();
        return;
    }

    term.write_line(&format!("{}", style("Big Keys:").bold().underlined()))
        .ok();
    term.write_line("").ok();

    for finding in report.largest(limit) {
        term.write_line(&format!(
            "  {:<6} {}  {}",
            style(finding.key_type.tag()).yellow(),
            finding.key,
            style(format_size(finding)).dim()
        ))
        .ok();
    }

    let hidden = report.total_findings().saturating_sub(limit);
    if hidden > 0 {
        term.write_line("").ok();
        term.write_line(&format!(
            "  {}",
            style(format!("... and {} more (use --limit or --output json)", hidden)).dim()
        ))
        .ok();
    }
}

fn print_minimal_results(report: &ScanReport) -> std::result::Result<(), ReportError> {
    use std::io::Write;

    let mut out = std::io::stdout().lock();
    for finding in &report.findings {
        writeln!(out, "{}", finding.key)?;
    }
    Ok(())
}

fn format_size(finding: &Finding) -> String {
    let ratio = finding.ratio();
    match finding.key_type {
        KeyType::String => format!("{} ({:.1}x limit)", format_bytes(finding.size), ratio),
        _ => format!("{} elements ({:.1}x limit)", finding.size, ratio),
    }
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ScanArgs {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Scan(args) => args,
        }
    }

    #[test]
    fn defaults_match_reference_thresholds() {
        let args = parse(&["bigkey-scan", "scan"]);
        let table = args.threshold_table().unwrap();

        assert_eq!(table, ThresholdTable::default());
        assert_eq!(args.pattern, "*");
        assert_eq!(args.count, 100);
    }

    #[test]
    fn per_type_override_wins() {
        let args = parse(&["bigkey-scan", "scan", "--hash-threshold", "1000"]);
        let table = args.threshold_table().unwrap();

        assert_eq!(table.get(&KeyType::Hash), Some(1000));
        assert_eq!(table.get(&KeyType::List), Some(500));
    }

    #[test]
    fn zero_threshold_fails_before_connecting() {
        let args = parse(&["bigkey-scan", "scan", "--string-threshold", "0"]);
        assert!(args.threshold_table().is_err());
    }

    #[test]
    fn connection_settings_from_flags() {
        let args = parse(&[
            "bigkey-scan", "scan", "--host", "10.0.0.5", "-p", "6380", "-a", "123456", "-n", "3",
        ]);
        let settings = args.connection_settings();

        assert_eq!(settings.url, "redis://10.0.0.5:6380/");
        assert_eq!(settings.password.as_deref(), Some("123456"));
        assert_eq!(settings.db, 3);
    }

    #[test]
    fn url_overrides_host() {
        let args = parse(&["bigkey-scan", "scan", "--url", "redis://cache:7000/"]);
        assert_eq!(args.connection_settings().url, "redis://cache:7000/");
    }

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(512), "512 bytes");
        assert_eq!(format_bytes(6000), "5.9 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
