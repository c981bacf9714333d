//! API key whitelist checks. These run offline, without a database.

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;

use lockbox_auth::whitelist::{
    check_ip_whitelist, check_time_whitelist, validate_cidr_list, validate_time_whitelist,
};
use lockbox_core::error::AppError;
use lockbox_core::result::AppResult;

use crate::output::{self, OutputFormat};

/// Arguments for API key commands
#[derive(Debug, Args)]
pub struct ApiKeyArgs {
    /// API key subcommand
    #[command(subcommand)]
    pub command: ApiKeyCommand,
}

/// API key subcommands
#[derive(Debug, Subcommand)]
pub enum ApiKeyCommand {
    /// Check an address against a comma-separated CIDR list
    CheckIp {
        /// Whitelist, e.g. "10.0.0.0/8,192.168.1.5"
        list: String,
        /// Address to check
        ip: String,
    },
    /// Check a time against a comma-separated DOW:HHMM-HHMM list
    CheckTime {
        /// Whitelist, e.g. "MON:0900-1700,ANY:2200-2359"
        list: String,
        /// Time to check (RFC 3339); defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
}

#[derive(Debug, Serialize)]
struct Verdict<'a> {
    list: &'a str,
    subject: String,
    allowed: bool,
}

/// Execute API key commands
pub fn execute(args: &ApiKeyArgs, format: OutputFormat) -> AppResult<()> {
    let verdict = match &args.command {
        ApiKeyCommand::CheckIp { list, ip } => {
            if !validate_cidr_list(list) {
                return Err(AppError::unprocessable(format!("Invalid IP whitelist: '{list}'")));
            }
            Verdict {
                list,
                subject: ip.clone(),
                allowed: check_ip_whitelist(list, ip),
            }
        }
        ApiKeyCommand::CheckTime { list, at } => {
            if !validate_time_whitelist(list) {
                return Err(AppError::unprocessable(format!(
                    "Invalid time whitelist: '{list}'"
                )));
            }
            let at = at.unwrap_or_else(Utc::now);
            Verdict {
                list,
                subject: at.to_rfc3339(),
                allowed: check_time_whitelist(list, at.naive_utc()),
            }
        }
    };

    match format {
        OutputFormat::Json => output::print_json(&verdict),
        OutputFormat::Table => {
            let word = if verdict.allowed { "allowed" } else { "denied" };
            println!("{} is {word} by '{}'", verdict.subject, verdict.list);
        }
    }
    Ok(())
}
