use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, builder::BoolishValueParser};

use crate::domain::types::RecordKind;

/// Command-line arguments for the collegium operator binary.
#[derive(Debug, Parser)]
#[command(
    name = "collegium",
    version,
    about = "Institution and cutoff catalog with a cache-aside read path"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "COLLEGIUM_CONFIG_FILE",
        value_name = "PATH",
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args, Default, Clone)]
pub struct Overrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Override the document store backend (memory|postgres).
    #[arg(long = "store-backend", value_name = "BACKEND", global = true)]
    pub store_backend: Option<String>,

    /// Override the document store connection URL.
    #[arg(long = "store-url", value_name = "URL", global = true)]
    pub store_url: Option<String>,

    /// Override the cache backend (memory|redis|disabled).
    #[arg(long = "cache-backend", value_name = "BACKEND", global = true)]
    pub cache_backend: Option<String>,

    /// Override the cache connection URL.
    #[arg(long = "cache-url", value_name = "URL", global = true)]
    pub cache_url: Option<String>,

    /// Override the list/search invalidation strategy (auto|prefix|generation).
    #[arg(long = "cache-invalidation", value_name = "MODE", global = true)]
    pub cache_invalidation: Option<String>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Operate on institutions.
    Institutions {
        #[command(subcommand)]
        command: InstitutionCommand,
    },
    /// Operate on admission cutoffs.
    Cutoffs {
        #[command(subcommand)]
        command: CutoffCommand,
    },
    /// Print the current update-feed version of a record kind.
    Version {
        #[arg(value_enum)]
        kind: KindArg,
    },
    /// Print update-feed entries in a version range.
    Updates(UpdatesArgs),
    /// Apply pending database migrations.
    Migrate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Institutions,
    Cutoffs,
}

impl From<KindArg> for RecordKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Institutions => RecordKind::Institution,
            KindArg::Cutoffs => RecordKind::Cutoff,
        }
    }
}

/// Operations shared by every record kind.
#[derive(Debug, Subcommand, Clone)]
pub enum RecordCommand {
    /// Fetch a single record by id.
    Get { id: String },
    /// List records in their natural order.
    List(ListArgs),
    /// Create a record from a JSON object; an `id` field selects the id.
    Create {
        #[arg(value_name = "JSON")]
        payload: String,
    },
    /// Merge a JSON object into an existing record.
    Update {
        id: String,
        #[arg(value_name = "JSON")]
        patch: String,
    },
    /// Delete a record by id.
    Delete { id: String },
}

#[derive(Debug, Subcommand, Clone)]
pub enum InstitutionCommand {
    #[command(flatten)]
    Record(RecordCommand),
    /// Search institutions by attribute and name.
    Search(InstitutionSearchArgs),
}

#[derive(Debug, Subcommand, Clone)]
pub enum CutoffCommand {
    #[command(flatten)]
    Record(RecordCommand),
    /// Search cutoffs by attribute.
    Search(CutoffSearchArgs),
    /// List every cutoff published for an institute code.
    ByInstitute {
        #[arg(value_name = "CODE")]
        code: String,
    },
}

#[derive(Debug, Args, Default, Clone)]
pub struct ListArgs {
    #[arg(long)]
    pub page: Option<u32>,
    #[arg(long)]
    pub limit: Option<u32>,
    /// Cursor returned as `nextCursor` by a previous page.
    #[arg(long)]
    pub cursor: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct InstitutionSearchArgs {
    #[arg(long)]
    pub year: Option<i32>,
    #[arg(long = "institute-code")]
    pub institute_code: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long = "branch-name")]
    pub branch_name: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    /// Nested status state (active|inactive|archived).
    #[arg(long)]
    pub status: Option<String>,
    /// Free-text name query matched against names and keywords.
    #[arg(long = "name")]
    pub institute_name: Option<String>,
    #[arg(long)]
    pub page: Option<u32>,
    #[arg(long)]
    pub limit: Option<u32>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CutoffSearchArgs {
    #[arg(long = "college-id")]
    pub college_id: Option<String>,
    #[arg(long = "institute-code")]
    pub institute_code: Option<String>,
    #[arg(long)]
    pub year: Option<i32>,
    #[arg(long)]
    pub round: Option<u32>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long = "branch-name")]
    pub branch_name: Option<String>,
    #[arg(long)]
    pub page: Option<u32>,
    #[arg(long)]
    pub limit: Option<u32>,
}

#[derive(Debug, Args, Clone)]
pub struct UpdatesArgs {
    #[arg(value_enum)]
    pub kind: KindArg,
    /// Exclusive lower bound; defaults to the start of the feed.
    #[arg(long = "from")]
    pub from_version: Option<u64>,
    /// Inclusive upper bound.
    #[arg(long = "to")]
    pub to_version: Option<u64>,
}
