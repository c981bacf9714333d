//! CLI command definitions and dispatch.

pub mod apikey;
pub mod folder;
pub mod kms;
pub mod migrate;
pub mod user;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use lockbox_cache::CacheManager;
use lockbox_core::config::AppConfig;
use lockbox_core::error::AppError;
use lockbox_core::result::AppResult;
use lockbox_core::traits::{CounterMetrics, TracingAudit};
use lockbox_database::{DatabasePool, PgStore};
use lockbox_entity::group::ADMINS_GROUP_ID;
use lockbox_kms::HttpClientFactory;
use lockbox_service::{Collaborators, Lockbox, RequestContext};

use crate::output::OutputFormat;

/// Lockbox: collaborative secrets management
#[derive(Debug, Parser)]
#[command(name = "lockbox", version, about, long_about = None)]
pub struct Cli {
    /// Path to the base configuration file
    #[arg(short, long, env = "LOCKBOX_CONFIG", default_value = "config/default.toml")]
    pub config: String,

    /// Environment overlay, read from config/<env>.toml
    #[arg(short, long, env = "LOCKBOX_ENV", default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Key management services
    Kms(kms::KmsArgs),
    /// Folder inspection
    Folder(folder::FolderArgs),
    /// API key whitelist checks
    Apikey(apikey::ApiKeyArgs),
    /// User management
    User(user::UserArgs),
}

impl Cli {
    /// Execute the CLI command. Commands that touch storage need a loaded
    /// configuration; the whitelist checks run without one.
    pub async fn execute(&self, config: AppResult<AppConfig>) -> AppResult<()> {
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, &config?).await,
            Commands::Kms(args) => kms::execute(args, &config?, self.format).await,
            Commands::Folder(args) => folder::execute(args, &config?, self.format).await,
            Commands::Apikey(args) => apikey::execute(args, self.format),
            Commands::User(args) => user::execute(args, &config?, self.format).await,
        }
    }
}

/// Helper: connect to the database and wire every service over it.
pub async fn connect(config: &AppConfig) -> AppResult<Lockbox> {
    let pool = DatabasePool::connect(&config.database).await?;
    let store = Arc::new(PgStore::new(pool.pool().clone()));
    let cache = CacheManager::new(&config.cache).await?;

    Ok(Lockbox::new(
        store,
        cache,
        config.kms.clone(),
        &config.auth,
        Collaborators {
            clients: Arc::new(HttpClientFactory),
            audit: Arc::new(TracingAudit),
            metrics: Arc::new(CounterMetrics::new()),
        },
    ))
}

/// Helper: context for an operator acting as `user_id`, with personal
/// folders unlocked.
pub async fn impersonate(lockbox: &Lockbox, user_id: &str) -> AppResult<RequestContext> {
    let system = RequestContext::system();
    let user = lockbox
        .users
        .get_user(&system, user_id)
        .await
        .map_err(|e| AppError::not_found(format!("Cannot act as '{user_id}': {}", e.message)))?;
    let admin = lockbox
        .group_hierarchy
        .user_groups(&user.id)
        .await?
        .iter()
        .any(|g| g == ADMINS_GROUP_ID);
    Ok(RequestContext::new(user.id, admin, true))
}
