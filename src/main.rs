mod cli;

use anyhow::Context;
use clap::Parser;
use cli::{AnalyzeArgs, ApiArgs, Cli, Commands, ImportArgs, SaveArgs, ValidateArgs};
use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use txt_import::{
    ApiConfig, AutoConfirm, ChapterSegmenter, ChapterStore, Confirm, Credential, DocumentLoader,
    ExistingChapter, HttpChapterStore, ImportConfig, ImportError, ImportOrchestrator,
    ImportOutcome, ManuscriptPipeline, RemoteError, Result, SegmentationResult, SegmenterConfig,
    StagedDraft, TextDecoder,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let result = match &cli.command {
        Commands::Analyze(args) => handle_analyze_command(args).await.map(|_| 0),
        Commands::Import(args) => handle_import_command(args, &cli.output)
            .await
            .map(|outcome| exit_code(&outcome)),
        Commands::Save(args) => handle_save_command(args).await.map(|_| 0),
        Commands::Validate(args) => handle_validate_command(args).await.map(|_| 0),
    };

    match result {
        Ok(0) => Ok(()),
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("Operation failed: {}", e);
            if matches!(e, ImportError::Remote(RemoteError::Unauthorized { .. })) {
                error!("The author token was rejected; sign in again and update CONTENT_API_TOKEN");
            }
            std::process::exit(1);
        }
    }
}

fn exit_code(outcome: &ImportOutcome) -> i32 {
    match outcome {
        ImportOutcome::Staged { .. } | ImportOutcome::Completed { .. } => 0,
        ImportOutcome::Aborted(_) => 2,
        ImportOutcome::PartiallyFailed(_) => 3,
    }
}

/// Asks on the terminal; anything but "y"/"yes" declines.
struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        eprint!("{} [y/N] ", prompt);
        if std::io::stderr().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        match std::io::stdin().lock().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}

fn build_pipeline(deny: &[String]) -> Result<ManuscriptPipeline> {
    let config = SegmenterConfig::default().with_extra_denied(deny.iter().cloned());
    Ok(ManuscriptPipeline::new(
        TextDecoder::default(),
        ChapterSegmenter::new(config)?,
    ))
}

fn build_store(api: &ApiArgs) -> Result<HttpChapterStore> {
    let config = ApiConfig::new(&api.api_url)?
        .with_token(api.token.clone())
        .with_timeout(Duration::from_secs(api.timeout));
    info!("Using content API at {}", config.base_url());
    HttpChapterStore::new(config)
}

fn print_segmentation(source: &str, segmentation: &SegmentationResult, detailed: bool) {
    println!("\n=== Manuscript '{}' ===", source);
    println!(
        "Detected title: {}",
        segmentation.detected_title.as_deref().unwrap_or("(none)")
    );
    println!("Chapters: {}", segmentation.chapters.len());

    if detailed {
        for chapter in &segmentation.chapters {
            println!(
                "  {:>4}. {} ({} characters)",
                chapter.chapter_number,
                chapter.title,
                chapter.content_data.text.chars().count()
            );
        }
    }
}

fn print_chapters(book_id: i64, chapters: &[ExistingChapter]) {
    println!("\nBook {} now lists {} chapters:", book_id, chapters.len());
    for chapter in chapters {
        println!("  {:>4}. {}", chapter.chapter_number, chapter.title);
    }
}

async fn handle_analyze_command(args: &AnalyzeArgs) -> Result<()> {
    let sources = DocumentLoader::collect_sources(&args.sources)?;
    info!("Analyzing {} manuscripts", sources.len());

    let pipeline = build_pipeline(&args.deny)?;
    let mut all_analyses = HashMap::new();

    for source in sources {
        let document = DocumentLoader::load(&source).await?;
        let segmentation = match pipeline.prepare(document) {
            Ok(segmentation) => segmentation,
            Err(ImportError::EmptyDocument { name }) => {
                warn!("Skipping '{}': no text to import", name);
                continue;
            }
            Err(e) => return Err(e),
        };
        let stats = pipeline.segmenter().segmentation_stats(&segmentation);

        print_segmentation(&source, &segmentation, args.detailed);
        if let Some(avg) = stats.get("avg_chars_per_chapter") {
            println!("Average characters per chapter: {:.1}", avg.as_f64().unwrap_or(0.0));
        }
        if let Some(synthesized) = stats.get("synthesized_titles") {
            println!("Chapters without a heading: {}", synthesized.as_u64().unwrap_or(0));
        }

        all_analyses.insert(
            source.clone(),
            serde_json::json!({
                "segmentation": segmentation,
                "stats": stats
            }),
        );
    }

    if let Some(json_path) = &args.json_output {
        let report = serde_json::json!({
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "manuscripts": all_analyses,
        });
        let json_content = serde_json::to_string_pretty(&report)
            .context("Failed to serialize analysis results")?;

        tokio::fs::write(json_path, json_content)
            .await
            .context("Failed to write JSON analysis file")?;

        info!("Analysis results written to: {}", json_path.display());
    }

    Ok(())
}

/// Location of the pending single-chapter edit for a source.
fn staged_path(output_dir: &Path, source_stem: &str) -> PathBuf {
    output_dir.join(format!("{}_staged.json", source_stem))
}

/// Cleanup after a successful replace. The chapters are already written, so
/// failures here are logged and never change the outcome.
async fn refresh_after_replace<S: ChapterStore>(
    store: &S,
    book_id: i64,
    staged_path: &Path,
) -> Option<Vec<ExistingChapter>> {
    if staged_path.exists() {
        match tokio::fs::remove_file(staged_path).await {
            Ok(()) => info!("Discarded pending draft {}", staged_path.display()),
            Err(e) => warn!(
                "Could not remove pending draft {}: {}",
                staged_path.display(),
                e
            ),
        }
    }

    match store.list_chapters(book_id).await {
        Ok(chapters) => Some(chapters),
        Err(e) => {
            warn!("Could not reload chapters of book {}: {}", book_id, e);
            None
        }
    }
}

async fn handle_import_command(args: &ImportArgs, output_dir: &Path) -> Result<ImportOutcome> {
    let document = DocumentLoader::load(&args.source).await?;
    let stem = document.stem().to_string();

    let segmentation = build_pipeline(&args.deny)?.prepare(document)?;
    print_segmentation(&args.source, &segmentation, true);

    let store = build_store(&args.api)?;
    let existing = if segmentation.chapters.len() > 1 {
        store.list_chapters(args.book).await?
    } else {
        Vec::new()
    };

    let config = ImportConfig {
        book_id: args.book,
        current_title: args.book_title.clone(),
        credential: args.admin_password.clone().and_then(Credential::new),
    };
    let confirm: Box<dyn Confirm> = if args.yes {
        Box::new(AutoConfirm(true))
    } else {
        Box::new(TerminalConfirm)
    };

    let mut orchestrator = ImportOrchestrator::new(store);
    let outcome = orchestrator
        .run(segmentation, &existing, &config, confirm.as_ref())
        .await?;

    let draft_path = staged_path(output_dir, &stem);
    match &outcome {
        ImportOutcome::Staged {
            draft,
            proposed_title,
        } => {
            let staged = StagedDraft {
                source: args.source.clone(),
                book_id: config.book_id,
                proposed_title: proposed_title.clone(),
                draft: draft.clone(),
                staged_at: chrono::Utc::now(),
            };
            tokio::fs::create_dir_all(output_dir).await?;
            tokio::fs::write(&draft_path, serde_json::to_string_pretty(&staged)?).await?;

            info!("{}", outcome);
            info!("Staged draft written to: {}", draft_path.display());
            if let Some(title) = proposed_title {
                info!("Suggested book title: {}", title);
            }
        }
        ImportOutcome::Completed { .. } => {
            info!("{}", outcome);
            if let Some(refreshed) =
                refresh_after_replace(orchestrator.store(), config.book_id, &draft_path).await
            {
                print_chapters(config.book_id, &refreshed);
            }
        }
        ImportOutcome::Aborted(_) => warn!("{}", outcome),
        ImportOutcome::PartiallyFailed(_) => error!("{}", outcome),
    }

    Ok(outcome)
}

async fn handle_save_command(args: &SaveArgs) -> Result<()> {
    let content = tokio::fs::read_to_string(&args.staged).await?;
    let staged: StagedDraft = serde_json::from_str(&content)?;

    let book_id = args.book.unwrap_or(staged.book_id);
    let mut draft = staged.draft;
    if let Some(number) = args.chapter_number {
        draft.chapter_number = number;
    }

    let store = build_store(&args.api)?;
    let saved = match args.chapter_id {
        Some(chapter_id) => {
            info!("Updating chapter {} of book {}", chapter_id, book_id);
            store.update_chapter(book_id, chapter_id, &draft).await?
        }
        None => {
            info!("Creating chapter {} in book {}", draft.chapter_number, book_id);
            store.create_chapter(book_id, &draft).await?
        }
    };

    tokio::fs::remove_file(&args.staged).await?;
    info!(
        "Saved chapter {} \"{}\" (id {})",
        saved.chapter_number, saved.title, saved.id
    );
    Ok(())
}

async fn handle_validate_command(args: &ValidateArgs) -> Result<()> {
    info!("Validating {} sources", args.sources.len());

    let mut valid_sources = Vec::new();
    let mut invalid_sources = Vec::new();

    for source in &args.sources {
        match DocumentLoader::collect_sources(&[source.clone()]) {
            Ok(found) => {
                info!("✓ Valid: {} ({} manuscripts)", source, found.len());
                valid_sources.push(source);

                if args.check_access {
                    for file in found {
                        match DocumentLoader::load(&file).await {
                            Ok(document) => {
                                info!("  {} readable, {} bytes", file, document.bytes.len());
                            }
                            Err(e) => {
                                error!("  Cannot read {}: {}", file, e);
                                invalid_sources.push((file, format!("Access error: {}", e)));
                            }
                        }
                    }
                }
            }
            Err(e) => {
                error!("✗ Invalid: {} - {}", source, e);
                invalid_sources.push((source.clone(), e.to_string()));
            }
        }
    }

    println!("\n=== Validation Summary ===");
    println!("Valid sources: {}/{}", valid_sources.len(), args.sources.len());

    if !invalid_sources.is_empty() {
        println!("Invalid sources:");
        let invalid_count = invalid_sources.len();
        for (source, error) in invalid_sources {
            println!("  - {}: {}", source, error);
        }
        return Err(ImportError::Config {
            reason: format!("{} sources failed validation", invalid_count),
        });
    }

    println!("All sources are valid!");
    Ok(())
}
