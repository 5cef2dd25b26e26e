use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "pbm",
    about = "pbmanager: import ordering, binary sections and build targets for PowerBuilder libraries",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Encode a sidecar file into its textual binary section
    Binsec(BinsecArgs),
    /// Show the import order of a container's source directory
    Order(OrderArgs),
    /// Sort library names into build order
    SortLibs(SortLibsArgs),
    /// Render a target descriptor
    Target(TargetArgs),
    /// Show what an import plan would do, without contacting the compiler
    Plan(PlanArgs),
}

#[derive(Args)]
pub struct BinsecArgs {
    pub sidecar: PathBuf,
    /// Write the section to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct OrderArgs {
    pub dir: PathBuf,
    #[arg(long, default_value = "bin")]
    pub sidecar_ext: String,
}

#[derive(Args)]
pub struct SortLibsArgs {
    #[arg(required = true)]
    pub names: Vec<String>,
}

#[derive(Args)]
pub struct TargetArgs {
    #[arg(long)]
    pub app: String,
    #[arg(long)]
    pub app_lib: String,
    pub libs: Vec<String>,
    /// Write the descriptor to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct PlanArgs {
    pub plan: PathBuf,
}
