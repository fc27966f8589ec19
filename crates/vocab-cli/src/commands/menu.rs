//! Offline menu filtering.

use std::path::PathBuf;

use clap::Args;
use serde::Deserialize;

use vocab_auth::{RbacEnforcer, Role};
use vocab_core::error::{AppError, ErrorKind};
use vocab_sync::{MenuEntry, MenuNode, MenuTree};

use crate::output::{self, OutputFormat};

/// Arguments for `menu`
#[derive(Debug, Args)]
pub struct MenuArgs {
    /// Role to filter for
    #[arg(short, long)]
    pub role: Role,
    /// JSON file holding a list of menu entries
    #[arg(long)]
    pub file: PathBuf,
    /// Menu position label
    #[arg(long, default_value = "sidebar")]
    pub position: String,
}

/// Menu files hold either a bare list or `{"entries": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum MenuFile {
    List(Vec<MenuEntry>),
    Wrapped {
        #[serde(alias = "items", alias = "menus")]
        entries: Vec<MenuEntry>,
    },
}

/// Execute `menu`
pub async fn execute(args: &MenuArgs, config_path: &str, format: OutputFormat) -> Result<(), AppError> {
    let enforcer = super::load_enforcer(config_path)?;
    let raw = tokio::fs::read_to_string(&args.file).await.map_err(|e| {
        AppError::with_source(
            ErrorKind::Storage,
            format!("Failed to read menu file '{}'", args.file.display()),
            e,
        )
    })?;
    let visible = visible_menu(&enforcer, args.role, &args.position, &raw)?;

    match format {
        OutputFormat::Json => output::print_json(&visible),
        OutputFormat::Table => {
            if visible.is_empty() {
                println!("No visible entries.");
            }
            let mut lines = Vec::new();
            render(&visible, 0, &mut lines);
            for line in lines {
                println!("{line}");
            }
        }
    }
    Ok(())
}

/// Parse `raw` and keep what `role` may see.
pub fn visible_menu(
    enforcer: &RbacEnforcer,
    role: Role,
    position: &str,
    raw: &str,
) -> Result<Vec<MenuNode>, AppError> {
    let file: MenuFile = serde_json::from_str(raw)?;
    let entries = match file {
        MenuFile::List(entries) | MenuFile::Wrapped { entries } => entries,
    };
    let tree = MenuTree::from_entries(position, entries, None);
    Ok(tree.visible(&enforcer.resolve_permissions(role)))
}

/// Indented outline, two spaces per level.
pub fn render(nodes: &[MenuNode], depth: usize, lines: &mut Vec<String>) {
    for node in nodes {
        let path = node.entry.path.as_deref().unwrap_or("");
        lines.push(
            format!("{}{} {}", "  ".repeat(depth), node.entry.title, path)
                .trim_end()
                .to_string(),
        );
        render(&node.children, depth + 1, lines);
    }
}
