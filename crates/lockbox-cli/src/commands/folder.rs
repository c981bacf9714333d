//! Folder inspection commands.

use clap::{Args, Subcommand};

use lockbox_core::config::AppConfig;
use lockbox_core::result::AppResult;
use lockbox_entity::folder::FolderNode;

use crate::output::{self, OutputFormat};

/// Arguments for folder commands
#[derive(Debug, Args)]
pub struct FolderArgs {
    /// Folder subcommand
    #[command(subcommand)]
    pub command: FolderCommand,
}

/// Folder subcommands
#[derive(Debug, Subcommand)]
pub enum FolderCommand {
    /// Show the folder tree a user can see
    Tree {
        /// User ID
        #[arg(short, long)]
        user: String,
    },
    /// Show a user's effective permissions on a folder
    Perms {
        /// User ID
        #[arg(short, long)]
        user: String,
        /// Folder ID
        folder: String,
    },
}

/// Execute folder commands
pub async fn execute(
    args: &FolderArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> AppResult<()> {
    let lockbox = super::connect(config).await?;

    match &args.command {
        FolderCommand::Tree { user } => {
            let ctx = super::impersonate(&lockbox, user).await?;
            let tree = lockbox.folders.tree(&ctx).await?;
            match format {
                OutputFormat::Json => output::print_json(&tree),
                OutputFormat::Table => {
                    for root in &tree.roots {
                        print_node(root, 0);
                    }
                    println!("{} folder(s)", tree.total_folders);
                }
            }
        }
        FolderCommand::Perms { user, folder } => {
            let ctx = super::impersonate(&lockbox, user).await?;
            let perms = lockbox.folders.permissions(&ctx, folder).await?;
            match format {
                OutputFormat::Json => output::print_json(&perms),
                OutputFormat::Table => {
                    output::print_kv("read", &perms.read.to_string());
                    output::print_kv("write", &perms.write.to_string());
                }
            }
        }
    }

    Ok(())
}

fn print_node(node: &FolderNode, depth: usize) {
    let marker = if node.readable { "" } else { " (no access)" };
    println!("{}{} [{}]{}", "  ".repeat(depth), node.description, node.id, marker);
    for child in &node.children {
        print_node(child, depth + 1);
    }
}
