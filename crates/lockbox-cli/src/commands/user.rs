//! User management CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use lockbox_core::config::AppConfig;
use lockbox_core::result::AppResult;
use lockbox_entity::user::User;
use lockbox_service::RequestContext;
use lockbox_service::user::CreateUserRequest;

use crate::output::{self, OutputFormat};

/// Arguments for user commands
#[derive(Debug, Args)]
pub struct UserArgs {
    /// User subcommand
    #[command(subcommand)]
    pub command: UserCommand,
}

/// User subcommands
#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// List all users
    List,
    /// Create a user with a personal folder
    Create {
        /// Login name
        #[arg(short, long)]
        login: String,
        /// Email address
        #[arg(short, long)]
        email: String,
        /// Initial password
        #[arg(short, long, env = "LOCKBOX_PASSWORD", hide_env_values = true)]
        password: String,
        /// Add the user to Admins
        #[arg(long)]
        admin: bool,
    },
    /// Delete a user with their personal folders and API keys
    Delete {
        /// User ID
        id: String,
    },
}

/// User display row for table output
#[derive(Debug, Serialize, Tabled)]
struct UserRow {
    /// User ID
    id: String,
    /// Login
    login: String,
    /// Email
    email: String,
    /// Status
    active: bool,
    /// Created at
    created_at: String,
}

impl From<&User> for UserRow {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            login: user.login.clone(),
            email: user.email.clone(),
            active: user.active,
            created_at: user.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Execute user commands
pub async fn execute(args: &UserArgs, config: &AppConfig, format: OutputFormat) -> AppResult<()> {
    let lockbox = super::connect(config).await?;
    let ctx = RequestContext::system();

    match &args.command {
        UserCommand::List => {
            let users = lockbox.users.list_users(&ctx).await?;
            let rows: Vec<UserRow> = users.iter().map(UserRow::from).collect();
            output::print_list(&rows, format);
        }
        UserCommand::Create {
            login,
            email,
            password,
            admin,
        } => {
            let user = lockbox
                .users
                .create_user(
                    &ctx,
                    CreateUserRequest {
                        login: login.clone(),
                        email: email.clone(),
                        password: password.clone(),
                        admin: *admin,
                    },
                )
                .await?;
            output::print_success(&format!("User '{}' created with ID {}", user.login, user.id));
        }
        UserCommand::Delete { id } => {
            lockbox.users.delete_user(&ctx, id).await?;
            output::print_success(&format!("User '{id}' deleted"));
        }
    }

    Ok(())
}
