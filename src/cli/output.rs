use serde::Serialize;

use crate::model::container::Container;
use crate::ops::check::{CheckError, CheckResult, CheckWarning};
use crate::sync::controller::Outcome;
use crate::sync::handle::Notice;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ContainerJson<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub items: Vec<ItemJson<'a>>,
}

#[derive(Serialize)]
pub struct ItemJson<'a> {
    pub id: &'a str,
    pub order: usize,
    pub title: &'a str,
}

#[derive(Serialize)]
pub struct MoveJson<'a> {
    pub item: &'a str,
    /// "committed", "unchanged", "rolled_back", "discarded", "cancelled"
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<Notice>,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn container_to_json(container: &Container) -> ContainerJson<'_> {
    ContainerJson {
        id: container.id.as_str(),
        title: &container.title,
        items: container
            .items
            .iter()
            .map(|item| ItemJson {
                id: item.id.as_str(),
                order: item.order,
                title: &item.title,
            })
            .collect(),
    }
}

pub fn outcome_label(outcome: &Outcome) -> &'static str {
    match outcome {
        Outcome::Unchanged => "unchanged",
        Outcome::Committed => "committed",
        Outcome::RolledBack { .. } => "rolled_back",
        Outcome::Discarded => "discarded",
    }
}

// ---------------------------------------------------------------------------
// Text formatting
// ---------------------------------------------------------------------------

/// Format a container as a header line followed by one line per item.
pub fn format_container(container: &Container) -> String {
    let mut out = format!("{} ({}) [{}]", container.title, container.id, container.len());
    if container.is_empty() {
        out.push_str("\n  (empty)");
    }
    for item in &container.items {
        out.push_str(&format!("\n  {:>3}  {}  {}", item.order, item.id, item.title));
    }
    out
}

pub fn format_check(result: &CheckResult) -> String {
    let mut lines = Vec::new();
    if !result.errors.is_empty() {
        lines.push("Errors:".to_string());
        for err in &result.errors {
            lines.push(match err {
                CheckError::OrderGap {
                    container_id,
                    item_id,
                    index,
                    order,
                } => format!(
                    "  [{}] {} is at position {} but has order {}",
                    container_id, item_id, index, order
                ),
                CheckError::BacklinkMismatch {
                    container_id,
                    item_id,
                    claimed,
                } => format!(
                    "  [{}] {} claims to belong to {}",
                    container_id, item_id, claimed
                ),
                CheckError::DuplicateItem {
                    item_id,
                    container_ids,
                } => {
                    let ids: Vec<&str> = container_ids.iter().map(|c| c.as_str()).collect();
                    format!("  {} is listed more than once: {}", item_id, ids.join(", "))
                }
            });
        }
    }
    if !result.warnings.is_empty() {
        if !result.errors.is_empty() {
            lines.push(String::new());
        }
        lines.push("Warnings:".to_string());
        for warn in &result.warnings {
            match warn {
                CheckWarning::UntitledItem {
                    container_id,
                    item_id,
                } => lines.push(format!("  [{}] {} has no title", container_id, item_id)),
            }
        }
    }
    lines.push(if result.valid {
        "✓ board is valid".to_string()
    } else {
        "✗ board has errors".to_string()
    });
    lines.join("\n")
}
