use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bsync", about = concat!("bsync v", env!("CARGO_PKG_VERSION"), " - drag, drop, and keep the board in sync"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different board directory
    #[arg(short = 'C', long = "board-dir", global = true)]
    pub board_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create board.json and boardsync.toml in the board directory
    Init(InitArgs),
    /// List containers and their items in order
    Show(ShowArgs),
    /// Move an item to a position in a container
    Mv(MvArgs),
    /// Replay a drag-end event given as JSON
    Drop(DropArgs),
    /// Validate ordering invariants
    Check,
}

#[derive(Args)]
pub struct InitArgs {
    /// Parent id the containers belong to (defaults to the directory name)
    #[arg(long)]
    pub parent: Option<String>,
    /// Create a container: --container <ID> <TITLE> (repeatable)
    #[arg(long = "container", num_args = 2, value_names = ["ID", "TITLE"])]
    pub container: Vec<String>,
    /// Overwrite an existing board.json
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Only show this container
    pub container: Option<String>,
}

#[derive(Args)]
pub struct MvArgs {
    /// Item ID
    pub item: String,
    /// Destination container ID
    pub container: String,
    /// Destination index (0 = top; past the end appends)
    pub index: usize,
}

#[derive(Args)]
pub struct DropArgs {
    /// Event JSON, e.g. {"draggedItemId":"T1","source":{...},"destination":{...}}
    pub event: String,
}
