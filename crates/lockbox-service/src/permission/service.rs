//! Group grants on folders: list, set, revoke.

use std::sync::Arc;

use tracing::info;

use lockbox_cache::CacheManager;
use lockbox_core::error::AppError;
use lockbox_core::result::AppResult;
use lockbox_core::traits::{AuditAction, AuditEntity, AuditSink};
use lockbox_database::{FolderStore, GroupStore, PermissionStore};
use lockbox_entity::permission::{FolderGroupPermission, Permissions};

use crate::context::RequestContext;
use crate::folder::FolderHierarchy;

/// Manages folder-group permission rows.
#[derive(Clone)]
pub struct PermissionService {
    hierarchy: Arc<FolderHierarchy>,
    folders: Arc<dyn FolderStore>,
    groups: Arc<dyn GroupStore>,
    permissions: Arc<dyn PermissionStore>,
    cache: CacheManager,
    audit: Arc<dyn AuditSink>,
}

impl std::fmt::Debug for PermissionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionService").finish()
    }
}

impl PermissionService {
    /// Creates a new permission service.
    pub fn new(
        hierarchy: Arc<FolderHierarchy>,
        folders: Arc<dyn FolderStore>,
        groups: Arc<dyn GroupStore>,
        permissions: Arc<dyn PermissionStore>,
        cache: CacheManager,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            hierarchy,
            folders,
            groups,
            permissions,
            cache,
            audit,
        }
    }

    /// Grants recorded directly on a folder. Admins, or anyone who can read
    /// the folder.
    pub async fn list_permissions(
        &self,
        ctx: &RequestContext,
        folder_id: &str,
    ) -> AppResult<Vec<FolderGroupPermission>> {
        if ctx.is_admin() {
            if self.folders.find_folder(folder_id).await?.is_none() {
                return Err(AppError::not_found(format!("Folder '{folder_id}' not found")));
            }
        } else {
            self.hierarchy.require_read(ctx, folder_id, None).await?;
        }
        self.permissions.list_folder_permissions(folder_id).await
    }

    /// Sets the grant of one group on one folder. Granting neither read nor
    /// write removes the row. Returns the stored row, if any.
    pub async fn set_permission(
        &self,
        ctx: &RequestContext,
        folder_id: &str,
        group_id: &str,
        perms: Permissions,
    ) -> AppResult<Option<FolderGroupPermission>> {
        ctx.require_admin()?;

        if perms.write && !perms.read {
            return Err(AppError::unprocessable("Write access requires read access"));
        }
        let folder = self
            .folders
            .find_folder(folder_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Folder '{folder_id}' not found")))?;
        if folder.personal {
            return Err(AppError::unprocessable(
                "Personal folders do not take group permissions",
            ));
        }
        if self.groups.find_group(group_id).await?.is_none() {
            return Err(AppError::not_found(format!("Group '{group_id}' not found")));
        }

        let stored = if perms == Permissions::NONE {
            self.permissions.delete_permission(folder_id, group_id).await?;
            None
        } else {
            let row = FolderGroupPermission {
                folder_id: folder_id.to_string(),
                group_id: group_id.to_string(),
                read: perms.read,
                write: perms.write,
            };
            self.permissions.upsert_permission(&row).await?;
            Some(row)
        };

        self.cache.invalidate_folders(None).await;
        let action = if stored.is_some() {
            AuditAction::Grant
        } else {
            AuditAction::Revoke
        };
        self.audit
            .log(&ctx.user_id, action, AuditEntity::Folder, folder_id);
        info!(
            user_id = %ctx.user_id,
            folder_id,
            group_id,
            read = perms.read,
            write = perms.write,
            "Folder permission set"
        );

        Ok(stored)
    }
}
