//! KMS administration commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use lockbox_core::config::AppConfig;
use lockbox_core::result::AppResult;
use lockbox_entity::kms::{KmsRecord, KmsType};
use lockbox_service::RequestContext;
use lockbox_service::kms::CreateKmsRequest;

use crate::output::{self, OutputFormat};

/// Arguments for KMS commands
#[derive(Debug, Args)]
pub struct KmsArgs {
    /// KMS subcommand
    #[command(subcommand)]
    pub command: KmsCommand,
}

/// KMS subcommands
#[derive(Debug, Subcommand)]
pub enum KmsCommand {
    /// List configured KMS records
    List,
    /// Register a KMS; its key material is checked before it is stored
    Create {
        /// Provider type: no_dek, local_file, or cloud
        #[arg(short = 't', long = "type")]
        kms_type: KmsType,
        /// Display name
        #[arg(short, long)]
        description: String,
        /// Provider settings as JSON
        #[arg(short, long, default_value = "{}")]
        config: String,
        /// Make it the active KMS right away
        #[arg(long)]
        activate: bool,
    },
    /// Make a KMS the one that encrypts new data
    Activate {
        /// KMS ID
        id: String,
    },
    /// Delete an inactive, unreferenced KMS
    Delete {
        /// KMS ID
        id: String,
    },
}

/// KMS display row
#[derive(Debug, Serialize, Tabled)]
struct KmsRow {
    /// KMS ID
    id: String,
    /// Provider type
    kms_type: String,
    /// Description
    description: String,
    /// Active flag
    active: bool,
    /// Created at
    created_at: String,
}

impl From<&KmsRecord> for KmsRow {
    fn from(record: &KmsRecord) -> Self {
        Self {
            id: record.id.clone(),
            kms_type: record.kms_type.to_string(),
            description: record.description.clone(),
            active: record.active,
            created_at: record.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Execute KMS commands
pub async fn execute(args: &KmsArgs, config: &AppConfig, format: OutputFormat) -> AppResult<()> {
    let lockbox = super::connect(config).await?;
    let ctx = RequestContext::system();

    match &args.command {
        KmsCommand::List => {
            let records = lockbox.kms.list_kms(&ctx).await?;
            let rows: Vec<KmsRow> = records.iter().map(KmsRow::from).collect();
            output::print_list(&rows, format);
        }
        KmsCommand::Create {
            kms_type,
            description,
            config,
            activate,
        } => {
            let mut record = lockbox
                .kms
                .create_kms(
                    &ctx,
                    CreateKmsRequest {
                        kms_type: *kms_type,
                        description: description.clone(),
                        config: config.clone(),
                    },
                )
                .await?;
            if *activate {
                record = lockbox.kms.activate_kms(&ctx, &record.id).await?;
            }
            output::print_list(&[KmsRow::from(&record)], format);
        }
        KmsCommand::Activate { id } => {
            let record = lockbox.kms.activate_kms(&ctx, id).await?;
            output::print_success(&format!("KMS '{}' is now active", record.description));
        }
        KmsCommand::Delete { id } => {
            lockbox.kms.delete_kms(&ctx, id).await?;
            output::print_success(&format!("KMS '{id}' deleted"));
        }
    }

    Ok(())
}
