//! CLI argument parsing for the split/link/enrich pipeline.
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "alu",
    version,
    about = "Split legal documents into linked, enriched article units",
    after_help = "Commands:\n  split --input <dir> --output <dir>   Segment every source document into unit files\n  link --output <dir>                  Recompute prev/next links of split documents\n  enrich --input <dir> --output <dir>  Link and analyze every split document\n  run --input <dir> --output <dir>     Split, then enrich\n\nExamples:\n  alu split --input sources --output out\n  alu link --output out --doc وثيقة-نظام_العمل\n  GEMINI_API_KEY=... alu enrich --input sources --output out\n  alu run --input sources --output out --analysis-command 'ollama run qwen2.5'",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Pipeline stages.
#[derive(Subcommand, Debug)]
pub enum Command {
    Split(SplitArgs),
    Link(LinkArgs),
    Enrich(EnrichArgs),
    Run(EnrichArgs),
}

impl Command {
    pub fn verbose(&self) -> bool {
        match self {
            Command::Split(args) => args.verbose,
            Command::Link(args) => args.verbose,
            Command::Enrich(args) | Command::Run(args) => args.settings.verbose,
        }
    }
}

#[derive(Parser, Debug)]
#[command(about = "Segment source documents into parent and unit records")]
pub struct SplitArgs {
    /// Folder holding the source `.md` documents
    #[arg(long, value_name = "DIR")]
    pub input: PathBuf,

    /// Output root; one folder per document is created inside
    #[arg(long, value_name = "DIR")]
    pub output: PathBuf,

    /// JSON pipeline config
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Emit debug logs
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Recompute prev/next links of already split documents")]
pub struct LinkArgs {
    /// Output root holding document folders
    #[arg(long, value_name = "DIR")]
    pub output: PathBuf,

    /// Only relink this document slug
    #[arg(long, value_name = "SLUG")]
    pub doc: Option<String>,

    /// Emit debug logs
    #[arg(long)]
    pub verbose: bool,
}

/// Shared inputs of `enrich` and `run`.
#[derive(Parser, Debug)]
#[command(about = "Link and enrich split documents")]
pub struct EnrichArgs {
    /// Folder holding the source `.md` documents (used for context)
    #[arg(long, value_name = "DIR")]
    pub input: PathBuf,

    /// Output root holding document folders
    #[arg(long, value_name = "DIR")]
    pub output: PathBuf,

    #[command(flatten)]
    pub settings: SettingsArgs,
}

/// Overrides applied on top of the config file.
#[derive(Args, Debug, Default)]
pub struct SettingsArgs {
    /// JSON pipeline config
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Attempts per unit before degrading
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u32>,

    /// Seconds to wait between attempts
    #[arg(long, value_name = "SECS")]
    pub retry_delay_secs: Option<u64>,

    /// Gemini model name
    #[arg(long, value_name = "NAME")]
    pub model: Option<String>,

    /// Use a local command instead of Gemini (prompt on stdin, JSON on stdout)
    #[arg(long, value_name = "CMD")]
    pub analysis_command: Option<String>,

    /// Emit debug logs
    #[arg(long)]
    pub verbose: bool,
}
