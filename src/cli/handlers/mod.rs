mod init;
pub use init::cmd_init;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::board_io;
use crate::io::config_io;
use crate::io::file_remote::FileRemote;
use crate::model::item::{ContainerId, ItemId};
use crate::ops::check;
use crate::sync::controller::{Outcome, SyncController};
use crate::sync::drag::{DragAdapter, DragEndEvent, DragLocation, DragResponse};
use crate::sync::handle::CollectionHandle;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub async fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let json = cli.json;
    let board_dir = resolve_board_dir(cli.board_dir.as_deref())?;

    match cli.command {
        Commands::Init(args) => cmd_init(args, &board_dir),
        Commands::Show(args) => cmd_show(args, &board_dir, json),
        Commands::Check => cmd_check(&board_dir, json),
        Commands::Mv(args) => cmd_mv(args, &board_dir, json).await,
        Commands::Drop(args) => cmd_drop(args, &board_dir, json).await,
    }
}

/// The board directory: `-C` if given, else the current directory.
pub fn resolve_board_dir(dir: Option<&str>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match dir {
        Some(dir) => Ok(PathBuf::from(dir)),
        None => Ok(std::env::current_dir()?),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Mount the board: local copy in a handle, `board.json` as the remote.
fn open_board(board_dir: &Path) -> Result<DragAdapter, Box<dyn std::error::Error>> {
    let config = config_io::read_config(board_dir)?;
    let collection = board_io::read_board(board_dir)?;
    debug!(
        parent = collection.parent_id(),
        containers = collection.container_count(),
        items = collection.item_count(),
        "board loaded"
    );
    let controller = SyncController::new(
        CollectionHandle::new(collection),
        Arc::new(FileRemote::new(board_dir)),
        config.sync,
    );
    Ok(DragAdapter::new(controller))
}

/// Route one drag-end event, wait for confirmation, and report it.
async fn run_drag(
    adapter: &DragAdapter,
    event: DragEndEvent,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let item = event.dragged_item_id.clone();
    let dest = event.destination.as_ref().map(|d| d.container_id.clone());

    let outcome = match adapter.on_drag_end(event) {
        DragResponse::Cancelled => None,
        DragResponse::NoOp => Some(Outcome::Unchanged),
        DragResponse::Rejected(e) => return Err(e.into()),
        DragResponse::Dispatched(task) => Some(task.await?),
    };
    let notices = adapter.controller().handle().take_notices();

    if json {
        let out = MoveJson {
            item: item.as_str(),
            outcome: outcome.as_ref().map(outcome_label).unwrap_or("cancelled"),
            error: match &outcome {
                Some(Outcome::RolledBack { error }) => Some(error.to_string()),
                _ => None,
            },
            notices,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for notice in &notices {
            eprintln!("{}", notice.message);
        }
        match &outcome {
            None => println!("{}: cancelled", item),
            Some(Outcome::Committed) => {
                println!("{}: committed", item);
                if let Some(dest) = &dest {
                    adapter.controller().handle().read(|c| {
                        if let Some(container) = c.container(dest) {
                            println!("{}", format_container(container));
                        }
                    });
                }
            }
            Some(other) => println!("{}: {}", item, outcome_label(other).replace('_', " ")),
        }
    }

    match outcome {
        Some(Outcome::RolledBack { error }) => {
            Err(format!("move of {} was rolled back: {}", item, error).into())
        }
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Read command handlers
// ---------------------------------------------------------------------------

fn cmd_show(args: ShowArgs, board_dir: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let collection = board_io::read_board(board_dir)?;

    let containers: Vec<_> = match &args.container {
        Some(id) => {
            let container = collection
                .container(&ContainerId::new(id.as_str()))
                .ok_or_else(|| format!("container not found: {}", id))?;
            vec![container]
        }
        None => collection.containers().collect(),
    };

    if json {
        let out: Vec<ContainerJson> = containers.into_iter().map(container_to_json).collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        let blocks: Vec<String> = containers.into_iter().map(format_container).collect();
        println!("{}", blocks.join("\n\n"));
    }
    Ok(())
}

fn cmd_check(board_dir: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let collection = board_io::read_board(board_dir)?;
    let result = check::check_collection(&collection);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", format_check(&result));
    }

    if !result.valid {
        return Err(format!("{} ordering error(s)", result.errors.len()).into());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write command handlers
// ---------------------------------------------------------------------------

async fn cmd_mv(args: MvArgs, board_dir: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let adapter = open_board(board_dir)?;
    let item_id = ItemId::new(args.item.as_str());

    let source = adapter
        .controller()
        .handle()
        .read(|c| {
            c.locate(&item_id).map(|(container_id, index)| DragLocation {
                container_id: container_id.clone(),
                index,
            })
        })
        .ok_or_else(|| format!("item not found: {}", args.item))?;

    let event = DragEndEvent {
        dragged_item_id: item_id,
        source,
        destination: Some(DragLocation {
            container_id: ContainerId::new(args.container),
            index: args.index,
        }),
    };
    run_drag(&adapter, event, json).await
}

async fn cmd_drop(args: DropArgs, board_dir: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let event: DragEndEvent = serde_json::from_str(&args.event)
        .map_err(|e| format!("invalid drag event: {}", e))?;
    let adapter = open_board(board_dir)?;
    run_drag(&adapter, event, json).await
}
