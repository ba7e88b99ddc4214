use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::cli::commands::InitArgs;
use crate::io::{board_io, config_io};
use crate::model::collection::Collection;
use crate::model::container::Container;

const CONFIG_TEMPLATE: &str = r##"[sync]
# Upper bound for each remote call, in milliseconds. A call that does not
# answer in time is treated as a failure and the move is rolled back.
remote_timeout_ms = 10000

[log]
# tracing filter directive; BOARDSYNC_LOG overrides it.
filter = "warn"
"##;

/// Validate that a container ID is lowercase alphanumeric with hyphens or
/// underscores.
fn validate_container_id(id: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err("container id cannot be empty".to_string());
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err(format!(
            "invalid container id \"{}\": use lowercase with hyphens (e.g. \"in-progress\")",
            id
        ));
    }
    Ok(())
}

/// Infer a parent id from a directory name: lowercase, spaces become hyphens.
fn infer_parent_id(dir_name: &str) -> String {
    dir_name
        .split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

/// Parse --container pairs from the flat Vec<String> produced by clap.
/// Each pair is (id, title).
fn parse_container_pairs(args: &[String]) -> Vec<(&str, &str)> {
    args.chunks(2)
        .filter_map(|chunk| {
            if chunk.len() == 2 {
                Some((chunk[0].as_str(), chunk[1].as_str()))
            } else {
                None
            }
        })
        .collect()
}

pub fn cmd_init(args: InitArgs, board_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if board_io::board_path(board_dir).exists() && !args.force {
        return Err(format!(
            "board already exists in {} (use --force to overwrite)",
            board_dir.display()
        )
        .into());
    }

    let pairs = parse_container_pairs(&args.container);
    for (id, _) in &pairs {
        validate_container_id(id)?;
    }

    let mut seen_ids = HashSet::new();
    for (id, _) in &pairs {
        if !seen_ids.insert(*id) {
            return Err(format!("duplicate container id \"{}\"", id).into());
        }
    }

    let parent_id = args.parent.unwrap_or_else(|| {
        board_dir
            .canonicalize()
            .ok()
            .as_deref()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .map(infer_parent_id)
            .unwrap_or_else(|| "board".to_string())
    });

    let collection = pairs.iter().fold(Collection::new(parent_id), |c, (id, title)| {
        c.with_container(Container::new(*id, *title))
    });

    fs::create_dir_all(board_dir)?;
    board_io::write_board(board_dir, &collection)?;

    let config_path = board_dir.join(config_io::CONFIG_FILE);
    if !config_path.exists() {
        fs::write(&config_path, CONFIG_TEMPLATE)?;
    }

    println!("Initialized board: {}", collection.parent_id());
    for container in collection.containers() {
        println!("  container: {} ({})", container.title, container.id);
    }

    Ok(())
}
