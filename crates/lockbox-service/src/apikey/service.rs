//! API key issuance and authorization.
//!
//! The secret is shown once at creation. It is stored twice: as an Argon2id
//! hash for verification and envelope-encrypted so its owner can reveal it
//! again later.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use lockbox_auth::whitelist::{
    check_ip_whitelist, check_time_whitelist, validate_cidr_list, validate_time_whitelist,
};
use lockbox_auth::{Identity, PasswordHasher};
use lockbox_core::config::AuthConfig;
use lockbox_core::error::AppError;
use lockbox_core::result::AppResult;
use lockbox_core::traits::{AuditAction, AuditEntity, AuditSink};
use lockbox_core::types::new_id;
use lockbox_crypto::random;
use lockbox_database::{ApiKeyStore, MembershipStore, UserStore};
use lockbox_entity::apikey::ApiKey;
use lockbox_entity::group::ADMINS_GROUP_ID;
use lockbox_kms::KmsWallet;

use crate::context::RequestContext;

/// Manages API keys.
#[derive(Clone)]
pub struct ApiKeyService {
    store: Arc<dyn ApiKeyStore>,
    users: Arc<dyn UserStore>,
    memberships: Arc<dyn MembershipStore>,
    wallet: Arc<KmsWallet>,
    hasher: PasswordHasher,
    secret_length: usize,
    audit: Arc<dyn AuditSink>,
}

impl std::fmt::Debug for ApiKeyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyService")
            .field("secret_length", &self.secret_length)
            .finish()
    }
}

/// Request to issue an API key.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateApiKeyRequest {
    /// What the key is for.
    #[validate(length(min = 1, max = 255))]
    pub description: String,
    /// Last day the key is valid.
    pub expires_at: NaiveDate,
    /// Comma-separated addresses or CIDR blocks; empty allows any address.
    #[serde(default)]
    pub ip_whitelist: String,
    /// Comma-separated `DOW:HHMM-HHMM` windows; empty allows any time.
    #[serde(default)]
    pub time_whitelist: String,
}

/// A freshly issued key together with its one-time secret.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedApiKey {
    /// Stored key.
    pub key: ApiKey,
    /// Plain secret. Not retrievable from the listing endpoints.
    pub secret: String,
}

impl ApiKeyService {
    /// Creates a new API key service.
    pub fn new(
        store: Arc<dyn ApiKeyStore>,
        users: Arc<dyn UserStore>,
        memberships: Arc<dyn MembershipStore>,
        wallet: Arc<KmsWallet>,
        config: &AuthConfig,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            store,
            users,
            memberships,
            wallet,
            hasher: PasswordHasher::new(),
            secret_length: config.api_key_length as usize,
            audit,
        }
    }

    /// Issues a key for the caller.
    pub async fn create_api_key(
        &self,
        ctx: &RequestContext,
        req: CreateApiKeyRequest,
    ) -> AppResult<CreatedApiKey> {
        req.validate()?;
        if req.expires_at < ctx.request_time.date_naive() {
            return Err(AppError::validation("Expiry date is in the past"));
        }
        if !validate_cidr_list(&req.ip_whitelist) {
            return Err(AppError::unprocessable(format!(
                "Invalid IP whitelist: '{}'",
                req.ip_whitelist
            )));
        }
        if !validate_time_whitelist(&req.time_whitelist) {
            return Err(AppError::unprocessable(format!(
                "Invalid time whitelist: '{}'",
                req.time_whitelist
            )));
        }

        let secret = random::alphanumeric(self.secret_length);
        let secret_hash = self.hasher.hash_password(&secret)?;
        let envelope = self.wallet.encrypt_str(&secret).await?;

        let now = Utc::now();
        let key = ApiKey {
            id: new_id(),
            description: req.description,
            user_id: ctx.user_id.clone(),
            secret_hash,
            kms_id: envelope.kms_id.clone(),
            secret: envelope,
            expires_at: req.expires_at,
            active: true,
            ip_whitelist: req.ip_whitelist,
            time_whitelist: req.time_whitelist,
            last_used_at: None,
            created_at: now,
            updated_at: now,
        };
        let key = self.store.create_api_key(&key).await?;

        self.audit
            .log(&ctx.user_id, AuditAction::Create, AuditEntity::ApiKey, &key.id);
        info!(
            user_id = %ctx.user_id,
            key_id = %key.id,
            expires_at = %key.expires_at,
            "API key created"
        );

        Ok(CreatedApiKey { key, secret })
    }

    /// Checks a presented key and returns the identity it stands for.
    ///
    /// Every failure is reported as the same authentication error so the
    /// caller cannot tell which check failed. Empty whitelists allow
    /// everything.
    pub async fn authorize(
        &self,
        key_id: &str,
        secret: &str,
        ip: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Identity> {
        let denied = |reason: &str| {
            warn!(key_id, ip, reason, "API key rejected");
            AppError::authentication("Invalid API key")
        };

        let Some(key) = self.store.find_api_key(key_id).await? else {
            return Err(denied("unknown key"));
        };
        if !key.active {
            return Err(denied("inactive"));
        }
        if key.expires_at < now.date_naive() {
            return Err(denied("expired"));
        }
        if !self.hasher.verify_password(secret, &key.secret_hash)? {
            return Err(denied("bad secret"));
        }
        if !key.ip_whitelist.trim().is_empty() && !check_ip_whitelist(&key.ip_whitelist, ip) {
            return Err(denied("address not whitelisted"));
        }
        if !check_time_whitelist(&key.time_whitelist, now.naive_utc()) {
            return Err(denied("outside time whitelist"));
        }
        match self.users.find_user(&key.user_id).await? {
            Some(user) if user.active => {}
            _ => return Err(denied("owner inactive")),
        }

        if let Err(e) = self.store.touch_api_key(key_id).await {
            warn!(key_id, error = %e, "Failed to record API key use");
        }

        let admin = self
            .memberships
            .is_member(ADMINS_GROUP_ID, &key.user_id)
            .await?;
        Ok(Identity::new(key.user_id, admin, false))
    }

    /// Decrypts the stored secret of one of the caller's keys.
    pub async fn reveal_secret(&self, ctx: &RequestContext, id: &str) -> AppResult<String> {
        let key = self.find(id).await?;
        if key.user_id != ctx.user_id {
            return Err(AppError::forbidden("Only the owner can reveal an API key"));
        }
        let secret = self.wallet.decrypt_string(&key.secret).await?;
        self.audit
            .log(&ctx.user_id, AuditAction::Read, AuditEntity::ApiKey, id);
        Ok(secret)
    }

    /// The caller's keys, or every key for an admin.
    pub async fn list_api_keys(&self, ctx: &RequestContext) -> AppResult<Vec<ApiKey>> {
        let owner = if ctx.is_admin() {
            None
        } else {
            Some(ctx.user_id.as_str())
        };
        self.store.list_api_keys(owner).await
    }

    /// Deletes a key owned by the caller; admins may delete any key.
    pub async fn delete_api_key(&self, ctx: &RequestContext, id: &str) -> AppResult<()> {
        let key = self.find(id).await?;
        if key.user_id != ctx.user_id && !ctx.is_admin() {
            return Err(AppError::forbidden("Not allowed to delete this API key"));
        }

        self.store.delete_api_key(id).await?;

        self.audit
            .log(&ctx.user_id, AuditAction::Delete, AuditEntity::ApiKey, id);
        info!(user_id = %ctx.user_id, key_id = %id, "API key deleted");

        Ok(())
    }

    async fn find(&self, id: &str) -> AppResult<ApiKey> {
        self.store
            .find_api_key(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("API key '{id}' not found")))
    }
}
