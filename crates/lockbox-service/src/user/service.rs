//! User creation, deletion, and password checks.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use lockbox_auth::{Identity, PasswordHasher, PasswordValidator};
use lockbox_cache::CacheManager;
use lockbox_core::config::AuthConfig;
use lockbox_core::error::AppError;
use lockbox_core::result::AppResult;
use lockbox_core::traits::{AuditAction, AuditEntity, AuditSink};
use lockbox_core::types::new_id;
use lockbox_database::{MembershipStore, UserStore};
use lockbox_entity::folder::{Folder, PERSONAL_ROOT_ID};
use lockbox_entity::group::{ADMINS_GROUP_ID, EVERYONE_GROUP_ID};
use lockbox_entity::user::User;

use crate::context::RequestContext;

/// Manages user accounts.
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
    memberships: Arc<dyn MembershipStore>,
    hasher: PasswordHasher,
    validator: PasswordValidator,
    cache: CacheManager,
    audit: Arc<dyn AuditSink>,
}

impl std::fmt::Debug for UserService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserService").finish()
    }
}

/// Request to create a user.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateUserRequest {
    /// Login name, also the name of the personal folder.
    #[validate(length(min = 1, max = 64))]
    pub login: String,
    /// Contact address.
    #[validate(email)]
    pub email: String,
    /// Initial password.
    pub password: String,
    /// Whether the user joins Admins.
    #[serde(default)]
    pub admin: bool,
}

impl UserService {
    /// Creates a new user service.
    pub fn new(
        users: Arc<dyn UserStore>,
        memberships: Arc<dyn MembershipStore>,
        config: &AuthConfig,
        cache: CacheManager,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            users,
            memberships,
            hasher: PasswordHasher::new(),
            validator: PasswordValidator::new(config),
            cache,
            audit,
        }
    }

    /// Gets a user by ID. Admins can see anyone, users only themselves.
    pub async fn get_user(&self, ctx: &RequestContext, id: &str) -> AppResult<User> {
        if id != ctx.user_id {
            ctx.require_admin()?;
        }
        self.find(id).await
    }

    /// Lists all users.
    pub async fn list_users(&self, ctx: &RequestContext) -> AppResult<Vec<User>> {
        ctx.require_admin()?;
        self.users.list_users().await
    }

    /// Creates a user with a personal folder under the personal root and
    /// membership in Everyone (plus Admins when requested), all at once.
    pub async fn create_user(
        &self,
        ctx: &RequestContext,
        req: CreateUserRequest,
    ) -> AppResult<User> {
        ctx.require_admin()?;
        req.validate()?;
        self.validator.validate(&req.password)?;

        if self.users.find_user_by_login(&req.login).await?.is_some() {
            return Err(AppError::conflict(format!(
                "Login '{}' is already taken",
                req.login
            )));
        }

        let now = Utc::now();
        let user = User {
            id: new_id(),
            login: req.login.clone(),
            email: req.email,
            secret: self.hasher.hash_password(&req.password)?,
            active: true,
            created_at: now,
            updated_at: now,
        };
        let folder = Folder::new_personal(
            new_id(),
            req.login,
            PERSONAL_ROOT_ID.to_string(),
            user.id.clone(),
        );
        let mut groups = vec![EVERYONE_GROUP_ID];
        if req.admin {
            groups.push(ADMINS_GROUP_ID);
        }

        let user = self
            .users
            .create_user_with_personal_folder(&user, &folder, &groups)
            .await?;

        self.cache.invalidate_user_groups(&user.id).await;
        self.audit
            .log(&ctx.user_id, AuditAction::Create, AuditEntity::User, &user.id);
        info!(
            user_id = %ctx.user_id,
            new_user_id = %user.id,
            login = %user.login,
            admin = req.admin,
            "User created"
        );

        Ok(user)
    }

    /// Deletes a user with their memberships, API keys, and personal
    /// folders. Admin only; nobody can delete themselves or the last admin.
    pub async fn delete_user(&self, ctx: &RequestContext, id: &str) -> AppResult<()> {
        ctx.require_admin()?;
        if id == ctx.user_id {
            return Err(AppError::unprocessable("Users cannot delete themselves"));
        }
        self.find(id).await?;

        if self.memberships.is_member(ADMINS_GROUP_ID, id).await?
            && self.memberships.list_group_members(ADMINS_GROUP_ID).await?.len() <= 1
        {
            return Err(AppError::unprocessable(
                "The last administrator cannot be deleted",
            ));
        }

        self.users.delete_user(id).await?;

        self.cache.invalidate_user_groups(id).await;
        self.cache.invalidate_folders(Some(id)).await;
        self.audit
            .log(&ctx.user_id, AuditAction::Delete, AuditEntity::User, id);
        info!(user_id = %ctx.user_id, deleted_user_id = %id, "User deleted");

        Ok(())
    }

    /// Checks a login and password and returns the identity for token
    /// issuance. Personal folders start locked.
    pub async fn authenticate(&self, login: &str, password: &str) -> AppResult<Identity> {
        let denied = || AppError::authentication("Invalid login or password");

        let Some(user) = self.users.find_user_by_login(login).await? else {
            return Err(denied());
        };
        if !user.active {
            warn!(login, "Login attempt for inactive user");
            return Err(denied());
        }
        if !self.hasher.verify_password(password, &user.secret)? {
            warn!(login, "Login attempt with wrong password");
            return Err(denied());
        }

        let admin = self.memberships.is_member(ADMINS_GROUP_ID, &user.id).await?;
        Ok(Identity::new(user.id, admin, false))
    }

    async fn find(&self, id: &str) -> AppResult<User> {
        self.users
            .find_user(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User '{id}' not found")))
    }
}
