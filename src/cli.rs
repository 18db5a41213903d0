use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "lpa",
    version,
    about = "Leadership pipeline assessment capture and results tooling"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Store one form submission as an assessment.
    Submit(SubmitArgs),
    /// Assemble the results view for an assessment.
    Results(ResultsArgs),
    /// Manage the recommendation catalog.
    Recommend(RecommendArgs),
    /// Print and validate the active field-index schema.
    Fields(FieldsArgs),
    /// Report store counts, orphaned assessments and duplicated entry ids.
    Status(StatusArgs),
}

/// Location of the local store, shared by every command that touches it.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    #[arg(long, default_value = ".cache/lpa")]
    pub data_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,
}

impl StoreArgs {
    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.data_root.join("lpa.sqlite"))
    }
}

#[derive(Args, Debug, Clone)]
pub struct SubmitArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// JSON entry file, or `-` for stdin.
    #[arg(long)]
    pub entry: PathBuf,

    #[arg(long)]
    pub field_map_path: Option<PathBuf>,

    #[arg(long)]
    pub handoff_path: Option<PathBuf>,

    #[arg(long, default_value = "/lpa-results/")]
    pub results_url: String,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Html,
}

#[derive(Args, Debug, Clone)]
pub struct ResultsArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Assessment identifier as received from the request; parsed leniently.
    #[arg(long)]
    pub assessment: Option<String>,

    /// Fallback identifier used when `--assessment` is absent.
    #[arg(long)]
    pub id: Option<String>,

    #[arg(long, conflicts_with_all = ["assessment", "id"])]
    pub entry_id: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Args, Debug, Clone)]
pub struct RecommendArgs {
    #[command(subcommand)]
    pub command: RecommendCommands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum RecommendCommands {
    Add(RecommendAddArgs),
    Attach(RecommendAttachArgs),
    List(RecommendListArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RecommendAddArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub text: String,

    #[arg(long, default_value = "")]
    pub impact: String,

    #[arg(long = "step")]
    pub steps: Vec<String>,

    #[arg(long, default_value = "medium")]
    pub priority: String,
}

#[derive(Args, Debug, Clone)]
pub struct RecommendAttachArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub assessment: i64,

    #[arg(long = "recommendation", required = true)]
    pub recommendations: Vec<i64>,
}

#[derive(Args, Debug, Clone)]
pub struct RecommendListArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct FieldsArgs {
    #[arg(long)]
    pub field_map_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}
