//! PostgreSQL implementations of the store traits.
//!
//! One file per table; each adds its trait impl to [`PgStore`].

pub mod apikey;
pub mod folder;
pub mod group;
pub mod item;
pub mod kms;
pub mod membership;
pub mod permission;
pub mod user;

use sqlx::PgPool;

use lockbox_core::error::{AppError, ErrorKind};

/// Store backed by a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map a sqlx error into an [`AppError`], reporting unique violations as
/// conflicts.
pub(crate) fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| {
        let kind = match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => ErrorKind::Conflict,
            _ => ErrorKind::Database,
        };
        AppError::with_source(kind, context, e)
    }
}
