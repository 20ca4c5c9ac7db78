//! CLI command definitions for tuneforge.
//!
//! This module provides the command-line interface for importing
//! generation batches, labeling results, and exporting fine-tuning
//! datasets.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use clap::Parser;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ForgeConfig;
use crate::curation::CurationService;
use crate::error::PipelineError;
use crate::export::DatasetExporter;
use crate::model::{Conversation, GenerationBatch, GenerationResult};
use crate::storage::{BatchRepository, Database, DateWindow};

/// Labeling and dataset-export pipeline for generated documents.
#[derive(Parser)]
#[command(name = "tuneforge")]
#[command(about = "Label generation batches and export fine-tuning datasets")]
#[command(version)]
#[command(
    long_about = "tuneforge persists generation batches, labels their results, and exports\nSFT/DPO JSONL datasets for fine-tuning.\n\nExample usage:\n  tuneforge export sft --user 6e4f73aa-1f0e-4b0b-9c40-1f2f2f4c2ab1 --start 2026-01-01"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Apply database schema migrations.
    Migrate,

    /// Import a generation batch file and persist it as one unit.
    Import(ImportArgs),

    /// Label a generation result; a positive label promotes it to a document.
    Label(LabelArgs),

    /// Export labeled results as a fine-tuning dataset.
    #[command(alias = "dump")]
    Export(ExportArgs),

    /// List a user's generation batches.
    Batches(BatchesArgs),
}

/// Arguments for `tuneforge import`.
#[derive(Parser, Debug)]
pub struct ImportArgs {
    /// JSON file holding a batch with its results and conversations.
    #[arg(short, long)]
    pub file: PathBuf,
}

/// Arguments for `tuneforge label`.
#[derive(Parser, Debug)]
pub struct LabelArgs {
    /// User acting on the result.
    #[arg(short, long)]
    pub user: Uuid,

    /// Result to label.
    #[arg(short, long)]
    pub result: String,

    /// Label value: 1 accepts, -1 rejects, 0 clears.
    #[arg(long, allow_negative_numbers = true)]
    pub label: i16,
}

/// Which dataset flavor to export.
#[derive(Clone, Copy, Debug, PartialEq, clap::ValueEnum)]
pub enum ExportFormat {
    /// Supervised fine-tuning records, one transcript per line.
    Sft,
    /// Preference pairs contrasting accepted and rejected generations.
    Dpo,
}

/// Arguments for `tuneforge export`.
#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Dataset flavor to export.
    #[arg(value_enum)]
    pub format: ExportFormat,

    /// User whose labeled results are exported.
    #[arg(short, long)]
    pub user: Uuid,

    /// Inclusive start date (YYYY-MM-DD) on result creation time.
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Inclusive end date (YYYY-MM-DD) on result creation time.
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Output file path (default: a timestamped file under the export directory).
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for `tuneforge batches`.
#[derive(Parser, Debug)]
pub struct BatchesArgs {
    /// User whose batches are listed.
    #[arg(short, long)]
    pub user: Uuid,

    /// 1-based page to fetch.
    #[arg(short, long, default_value = "1")]
    pub page: u32,

    /// Batches per page (default: the configured page size).
    #[arg(long)]
    pub page_size: Option<u32>,
}

/// On-disk shape of an imported batch file: one batch, its generation
/// results, and the conversations those results reference.
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchEnvelope {
    pub batch: GenerationBatch,
    #[serde(default)]
    pub results: Vec<GenerationResult>,
    #[serde(default)]
    pub conversations: Vec<Conversation>,
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before
/// running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
///
/// This is the main entry point for the tuneforge CLI.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    let config = ForgeConfig::from_env()?;

    match cli.command {
        Commands::Migrate => run_migrate_command(&config).await,
        Commands::Import(args) => run_import_command(&config, args).await,
        Commands::Label(args) => run_label_command(&config, args).await,
        Commands::Export(args) => run_export_command(&config, args).await,
        Commands::Batches(args) => run_batches_command(&config, args).await,
    }
}

async fn run_migrate_command(config: &ForgeConfig) -> anyhow::Result<()> {
    let db = Database::connect(&config.database_url).await?;
    db.run_migrations().await?;
    println!("✓ Migrations applied");
    Ok(())
}

async fn run_import_command(config: &ForgeConfig, args: ImportArgs) -> anyhow::Result<()> {
    if !args.file.exists() {
        return Err(anyhow::anyhow!(
            "Batch file does not exist: {}",
            args.file.display()
        ));
    }

    let raw = fs::read_to_string(&args.file)?;
    let envelope: BatchEnvelope = serde_json::from_str(&raw)?;

    let db = Arc::new(Database::connect(&config.database_url).await?);
    let service = CurationService::new(db.clone(), db);
    service
        .save_batch(&envelope.batch, &envelope.results, &envelope.conversations)
        .await?;

    println!("✓ Imported batch {}", envelope.batch.batch_id);
    println!("  Results:       {}", envelope.results.len());
    println!("  Conversations: {}", envelope.conversations.len());
    Ok(())
}

async fn run_label_command(config: &ForgeConfig, args: LabelArgs) -> anyhow::Result<()> {
    let db = Arc::new(Database::connect(&config.database_url).await?);
    let service = CurationService::new(db.clone(), db);

    let document = service
        .label_result(args.user, &args.result, args.label)
        .await?;

    println!("✓ Result {} labeled {}", args.result, args.label);
    if let Some(document_id) = document {
        println!("  Promoted document: {}", document_id);
    }
    Ok(())
}

async fn run_export_command(config: &ForgeConfig, args: ExportArgs) -> anyhow::Result<()> {
    let window = window_from_dates(args.start, args.end)?;

    let db = Arc::new(Database::connect(&config.database_url).await?);
    let exporter = DatasetExporter::new(db.clone(), db);

    let (content, flavor) = match args.format {
        ExportFormat::Sft => (exporter.export_sft(args.user, &window).await?, "sft"),
        ExportFormat::Dpo => (exporter.export_dpo(args.user, &window).await?, "dpo"),
    };

    if content.is_empty() {
        println!("No labeled results to export; nothing written.");
        return Ok(());
    }

    let output = args
        .output
        .unwrap_or_else(|| default_output_path(config, flavor, args.user));
    write_jsonl(&output, &content)?;

    println!("✓ Exported {} records", content.lines().count());
    println!("  Output: {}", output.display());
    Ok(())
}

async fn run_batches_command(config: &ForgeConfig, args: BatchesArgs) -> anyhow::Result<()> {
    let db = Database::connect(&config.database_url).await?;

    let page_size = args
        .page_size
        .unwrap_or(config.default_page_size)
        .min(config.max_page_size);
    let (batches, total) = db.list_batches(args.user, args.page, page_size).await?;

    if batches.is_empty() {
        println!("No batches on page {} ({} total).", args.page, total);
        return Ok(());
    }

    println!(
        "Batches for user {} (page {}, {} total):",
        args.user, args.page, total
    );
    for batch in &batches {
        println!(
            "  {}  {}  count={} strategy={}  {}",
            batch.batch_id,
            batch.created_at.format("%Y-%m-%d %H:%M"),
            batch.generation_count,
            batch.generation_strategy.as_i16(),
            summarize_input(&batch.input_text),
        );
    }
    Ok(())
}

/// Maps inclusive calendar dates onto a timestamp window covering the
/// start day's first second through the end day's last second.
fn window_from_dates(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<DateWindow, PipelineError> {
    let start = start.map(|d| Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN)));
    let end = end.map(|d| {
        Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN)) + Duration::days(1)
            - Duration::seconds(1)
    });

    let window = DateWindow { start, end };
    window.validate()?;
    Ok(window)
}

fn default_output_path(config: &ForgeConfig, flavor: &str, user: Uuid) -> PathBuf {
    let stamp = Utc::now().format("%Y%m%d-%H%M%S");
    config
        .export_dir
        .join(format!("{}-{}-{}.jsonl", flavor, user, stamp))
}

/// Writes JSONL content with a trailing newline, creating the parent
/// directory when needed.
fn write_jsonl(path: &Path, content: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut file = fs::File::create(path)?;
    writeln!(file, "{}", content)?;
    Ok(())
}

/// First line of the batch input, shortened for listing output.
fn summarize_input(text: &str) -> String {
    const MAX_CHARS: usize = 48;

    let first_line = text.lines().next().unwrap_or("").trim();
    if first_line.chars().count() <= MAX_CHARS {
        return first_line.to_string();
    }
    let head: String = first_line.chars().take(MAX_CHARS).collect();
    format!("{}...", head.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GenerationStrategy;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_cli_parses_import() {
        let args = vec!["tuneforge", "import", "--file", "batch.json"];
        let cli = Cli::try_parse_from(args).expect("should parse");

        match cli.command {
            Commands::Import(args) => assert_eq!(args.file, PathBuf::from("batch.json")),
            _ => panic!("expected import command"),
        }
    }

    #[test]
    fn test_cli_parses_label_with_negative_value() {
        let user = Uuid::new_v4().to_string();
        let args = vec![
            "tuneforge", "label", "--user", &user, "--result", "r-1", "--label", "-1",
        ];
        let cli = Cli::try_parse_from(args).expect("should parse");

        match cli.command {
            Commands::Label(args) => {
                assert_eq!(args.result, "r-1");
                assert_eq!(args.label, -1);
            }
            _ => panic!("expected label command"),
        }
    }

    #[test]
    fn test_cli_parses_export_with_dates() {
        let user = Uuid::new_v4().to_string();
        let args = vec![
            "tuneforge",
            "export",
            "dpo",
            "--user",
            &user,
            "--start",
            "2026-01-01",
            "--end",
            "2026-01-31",
        ];
        let cli = Cli::try_parse_from(args).expect("should parse");

        match cli.command {
            Commands::Export(args) => {
                assert_eq!(args.format, ExportFormat::Dpo);
                assert_eq!(args.start, NaiveDate::from_ymd_opt(2026, 1, 1));
                assert_eq!(args.end, NaiveDate::from_ymd_opt(2026, 1, 31));
                assert!(args.output.is_none());
            }
            _ => panic!("expected export command"),
        }
    }

    #[test]
    fn test_cli_parses_batches_defaults() {
        let user = Uuid::new_v4().to_string();
        let args = vec!["tuneforge", "batches", "--user", &user];
        let cli = Cli::try_parse_from(args).expect("should parse");

        match cli.command {
            Commands::Batches(args) => {
                assert_eq!(args.page, 1);
                assert!(args.page_size.is_none());
            }
            _ => panic!("expected batches command"),
        }
    }

    #[test]
    fn test_window_from_dates_covers_whole_days() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 2);
        let end = NaiveDate::from_ymd_opt(2026, 1, 3);
        let window = window_from_dates(start, end).unwrap();

        assert_eq!(
            window.start.unwrap().to_rfc3339(),
            "2026-01-02T00:00:00+00:00"
        );
        assert_eq!(
            window.end.unwrap().to_rfc3339(),
            "2026-01-03T23:59:59+00:00"
        );
    }

    #[test]
    fn test_window_from_dates_rejects_inverted_range() {
        let start = NaiveDate::from_ymd_opt(2026, 2, 1);
        let end = NaiveDate::from_ymd_opt(2026, 1, 1);
        let err = window_from_dates(start, end).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidDateRange { .. }));
    }

    #[test]
    fn test_window_from_dates_allows_open_ends() {
        let window = window_from_dates(None, None).unwrap();
        assert!(window.start.is_none());
        assert!(window.end.is_none());
    }

    #[test]
    fn test_default_output_path_lands_in_export_dir() {
        let config = ForgeConfig::default().with_export_dir("/data/exports");
        let user = Uuid::new_v4();
        let path = default_output_path(&config, "sft", user);

        assert!(path.starts_with("/data/exports"));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(&format!("sft-{}", user)));
        assert!(name.ends_with(".jsonl"));
    }

    #[test]
    fn test_write_jsonl_appends_trailing_newline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("out.jsonl");

        write_jsonl(&path, "{\"a\":1}\n{\"a\":2}").unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, "{\"a\":1}\n{\"a\":2}\n");
    }

    #[test]
    fn test_batch_envelope_round_trips() {
        let user = Uuid::new_v4();
        let batch = GenerationBatch::new(user, "draft a memo", 3, GenerationStrategy::ParallelDiversified);
        let conversation = Conversation::new(user);
        let result = GenerationResult::new(
            &batch.batch_id,
            &conversation.conversation_id,
            json!({"root": {"text": "memo"}}),
        );

        let envelope = BatchEnvelope {
            batch,
            results: vec![result],
            conversations: vec![conversation],
        };
        let raw = serde_json::to_string(&envelope).unwrap();
        let parsed: BatchEnvelope = serde_json::from_str(&raw).unwrap();

        assert_eq!(parsed.batch.batch_id, envelope.batch.batch_id);
        assert_eq!(parsed.results.len(), 1);
        assert_eq!(parsed.conversations.len(), 1);
    }

    #[test]
    fn test_batch_envelope_defaults_missing_sections() {
        let user = Uuid::new_v4();
        let batch = GenerationBatch::new(user, "input", 4, GenerationStrategy::SingleCallDiverse);
        let raw = json!({"batch": batch}).to_string();

        let parsed: BatchEnvelope = serde_json::from_str(&raw).unwrap();
        assert!(parsed.results.is_empty());
        assert!(parsed.conversations.is_empty());
    }

    #[test]
    fn test_summarize_input_truncates_long_first_line() {
        let short = summarize_input("write a plan\nwith details");
        assert_eq!(short, "write a plan");

        let long = summarize_input(&"x".repeat(100));
        assert!(long.ends_with("..."));
        assert!(long.chars().count() <= 51);
    }
}
