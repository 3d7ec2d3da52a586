use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "txt-import")]
#[command(about = "Import plain-text manuscripts into a book as chapters")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory for staged drafts and reports
    #[arg(short, long, global = true, default_value = "./output")]
    pub output: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decode and segment manuscripts without touching the API
    Analyze(AnalyzeArgs),

    /// Import one manuscript into a book
    Import(ImportArgs),

    /// Save a staged single-chapter draft
    Save(SaveArgs),

    /// Validate input sources
    Validate(ValidateArgs),
}

#[derive(Args, Clone)]
pub struct ApiArgs {
    /// Content API base URL ("/api" is appended when missing)
    #[arg(long, env = "CONTENT_API_URL", default_value = txt_import::config::DEFAULT_API_URL)]
    pub api_url: String,

    /// Author token sent as a bearer token
    #[arg(long, env = "CONTENT_API_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = txt_import::config::DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Input sources (.txt files, directories or URLs)
    #[arg(required = true, value_name = "SOURCE")]
    pub sources: Vec<String>,

    /// Extra boilerplate substrings to ignore during title detection
    #[arg(long = "deny", value_name = "TEXT")]
    pub deny: Vec<String>,

    /// Output analysis to JSON file
    #[arg(long, value_name = "FILE")]
    pub json_output: Option<PathBuf>,

    /// Show per-chapter details
    #[arg(long)]
    pub detailed: bool,
}

#[derive(Args)]
pub struct ImportArgs {
    /// Input source (.txt file or URL)
    #[arg(value_name = "SOURCE")]
    pub source: String,

    /// Book (content) id to import into
    #[arg(long, value_name = "ID")]
    pub book: i64,

    /// Title the book already has; suppresses the detected title proposal
    #[arg(long, value_name = "TITLE")]
    pub book_title: Option<String>,

    /// Admin password required to delete existing chapters
    #[arg(long, env = "CONTENT_ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    /// Confirm the irreversible replace without prompting
    #[arg(short, long)]
    pub yes: bool,

    /// Extra boilerplate substrings to ignore during title detection
    #[arg(long = "deny", value_name = "TEXT")]
    pub deny: Vec<String>,

    #[command(flatten)]
    pub api: ApiArgs,
}

#[derive(Args)]
pub struct SaveArgs {
    /// Staged draft written by `import`
    #[arg(value_name = "FILE")]
    pub staged: PathBuf,

    /// Book (content) id; defaults to the one recorded in the staged draft
    #[arg(long, value_name = "ID")]
    pub book: Option<i64>,

    /// Update this chapter instead of creating a new one
    #[arg(long, value_name = "ID")]
    pub chapter_id: Option<i64>,

    /// Override the staged chapter number
    #[arg(long, value_name = "N")]
    pub chapter_number: Option<u32>,

    #[command(flatten)]
    pub api: ApiArgs,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Input sources (.txt files, directories or URLs)
    #[arg(required = true, value_name = "SOURCE")]
    pub sources: Vec<String>,

    /// Check that sources can actually be read
    #[arg(long)]
    pub check_access: bool,
}
