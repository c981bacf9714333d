//! Group CRUD and membership management.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use lockbox_cache::CacheManager;
use lockbox_core::error::AppError;
use lockbox_core::result::AppResult;
use lockbox_core::traits::{AuditAction, AuditEntity, AuditSink};
use lockbox_core::types::new_id;
use lockbox_database::{GroupStore, MembershipStore, UserStore};
use lockbox_entity::group::{ADMINS_GROUP_ID, EVERYONE_GROUP_ID, Group, GroupNode, ROOT_GROUP_ID};

use crate::context::RequestContext;

use super::hierarchy::GroupHierarchy;

/// Manages groups and their members. Every mutation is admin-only.
#[derive(Clone)]
pub struct GroupService {
    hierarchy: Arc<GroupHierarchy>,
    groups: Arc<dyn GroupStore>,
    memberships: Arc<dyn MembershipStore>,
    users: Arc<dyn UserStore>,
    cache: CacheManager,
    audit: Arc<dyn AuditSink>,
}

impl std::fmt::Debug for GroupService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupService").finish()
    }
}

/// Request to create a group.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateGroupRequest {
    /// Display name.
    #[validate(length(min = 1, max = 255))]
    pub description: String,
    /// Parent group; `None` places it under the root group.
    pub parent: Option<String>,
}

/// Request to update a group.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateGroupRequest {
    /// New display name.
    #[validate(length(min = 1, max = 255))]
    pub description: Option<String>,
    /// New parent group.
    pub parent: Option<String>,
}

impl GroupService {
    /// Creates a new group service.
    pub fn new(
        hierarchy: Arc<GroupHierarchy>,
        groups: Arc<dyn GroupStore>,
        memberships: Arc<dyn MembershipStore>,
        users: Arc<dyn UserStore>,
        cache: CacheManager,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            hierarchy,
            groups,
            memberships,
            users,
            cache,
            audit,
        }
    }

    /// Gets a group by ID.
    pub async fn get_group(&self, id: &str) -> AppResult<Group> {
        self.groups
            .find_group(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Group '{id}' not found")))
    }

    /// The full group catalogue.
    pub async fn tree(&self, _ctx: &RequestContext) -> AppResult<Vec<GroupNode>> {
        self.hierarchy.tree().await
    }

    /// Creates a new group.
    pub async fn create_group(
        &self,
        ctx: &RequestContext,
        req: CreateGroupRequest,
    ) -> AppResult<Group> {
        ctx.require_admin()?;
        req.validate()?;

        let parent = match req.parent {
            Some(parent) => self.get_group(&parent).await?.id,
            None => ROOT_GROUP_ID.to_string(),
        };

        let group = self
            .groups
            .create_group(&Group::new(new_id(), req.description, Some(parent)))
            .await?;

        self.cache.invalidate_groups().await;
        self.audit
            .log(&ctx.user_id, AuditAction::Create, AuditEntity::Group, &group.id);
        info!(user_id = %ctx.user_id, group_id = %group.id, "Group created");

        Ok(group)
    }

    /// Renames or moves a group. Fixed groups are immutable.
    pub async fn update_group(
        &self,
        ctx: &RequestContext,
        id: &str,
        req: UpdateGroupRequest,
    ) -> AppResult<Group> {
        ctx.require_admin()?;
        req.validate()?;

        let mut group = self.get_group(id).await?;
        if group.is_fixed() {
            return Err(AppError::unprocessable(format!(
                "Group '{}' cannot be modified",
                group.description
            )));
        }

        if let Some(parent) = req.parent
            && group.parent.as_deref() != Some(parent.as_str())
        {
            let index = self.hierarchy.load().await?;
            if !index.contains(&parent) {
                return Err(AppError::not_found(format!("Group '{parent}' not found")));
            }
            if index.is_within(&parent, id)? {
                return Err(AppError::unprocessable(
                    "Cannot move a group into its own subtree",
                ));
            }
            group.parent = Some(parent);
        }
        if let Some(description) = req.description {
            group.description = description;
        }
        group.updated_at = Utc::now();

        let group = self.groups.update_group(&group).await?;

        self.cache.invalidate_groups().await;
        self.audit
            .log(&ctx.user_id, AuditAction::Update, AuditEntity::Group, id);
        info!(user_id = %ctx.user_id, group_id = %id, "Group updated");

        Ok(group)
    }

    /// Deletes an empty group together with its permission rows.
    pub async fn delete_group(&self, ctx: &RequestContext, id: &str) -> AppResult<()> {
        ctx.require_admin()?;

        let group = self.get_group(id).await?;
        if group.is_fixed() {
            return Err(AppError::unprocessable(format!(
                "Group '{}' cannot be deleted",
                group.description
            )));
        }
        if !self.memberships.list_group_members(id).await?.is_empty() {
            return Err(AppError::unprocessable("Group still has members"));
        }
        if !self.groups.list_child_groups(id).await?.is_empty() {
            return Err(AppError::unprocessable("Group still has child groups"));
        }

        self.groups.delete_group(id).await?;

        self.cache.invalidate_groups().await;
        self.cache.invalidate_folders(None).await;
        self.audit
            .log(&ctx.user_id, AuditAction::Delete, AuditEntity::Group, id);
        info!(user_id = %ctx.user_id, group_id = %id, "Group deleted");

        Ok(())
    }

    /// Members of a group.
    pub async fn list_members(&self, ctx: &RequestContext, id: &str) -> AppResult<Vec<String>> {
        ctx.require_admin()?;
        self.get_group(id).await?;
        self.memberships.list_group_members(id).await
    }

    /// Adds a user to a group. Adding an existing member is a conflict.
    pub async fn add_member(
        &self,
        ctx: &RequestContext,
        group_id: &str,
        user_id: &str,
    ) -> AppResult<()> {
        ctx.require_admin()?;
        self.get_group(group_id).await?;
        if self.users.find_user(user_id).await?.is_none() {
            return Err(AppError::not_found(format!("User '{user_id}' not found")));
        }

        self.memberships.add_member(group_id, user_id).await?;

        self.invalidate_member(user_id).await;
        self.audit
            .log(&ctx.user_id, AuditAction::Grant, AuditEntity::Group, group_id);
        info!(user_id = %ctx.user_id, group_id, member_id = user_id, "Member added");

        Ok(())
    }

    /// Removes a user from a group.
    ///
    /// Everyone membership is permanent and Admins can never become empty.
    pub async fn remove_member(
        &self,
        ctx: &RequestContext,
        group_id: &str,
        user_id: &str,
    ) -> AppResult<()> {
        ctx.require_admin()?;
        self.get_group(group_id).await?;

        if group_id == EVERYONE_GROUP_ID {
            return Err(AppError::unprocessable(
                "Users cannot be removed from Everyone",
            ));
        }
        if !self.memberships.is_member(group_id, user_id).await? {
            return Err(AppError::not_found(format!(
                "User '{user_id}' is not a member of group '{group_id}'"
            )));
        }
        if group_id == ADMINS_GROUP_ID
            && self.memberships.list_group_members(group_id).await?.len() <= 1
        {
            return Err(AppError::unprocessable(
                "The last administrator cannot leave Admins",
            ));
        }

        self.memberships.remove_member(group_id, user_id).await?;

        self.invalidate_member(user_id).await;
        self.audit
            .log(&ctx.user_id, AuditAction::Revoke, AuditEntity::Group, group_id);
        info!(user_id = %ctx.user_id, group_id, member_id = user_id, "Member removed");

        Ok(())
    }

    async fn invalidate_member(&self, user_id: &str) {
        self.cache.invalidate_user_groups(user_id).await;
        self.cache.invalidate_folders(Some(user_id)).await;
    }
}
