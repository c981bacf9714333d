//! Folder CRUD operations with permission enforcement.

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
use lockbox_database::{FolderStore, ItemStore};
use lockbox_entity::folder::{Folder, FolderTree, PERSONAL_ROOT_ID};
use lockbox_entity::permission::Permissions;

use crate::context::RequestContext;

use super::hierarchy::FolderHierarchy;

/// Manages folder CRUD operations.
#[derive(Clone)]
pub struct FolderService {
    hierarchy: Arc<FolderHierarchy>,
    folders: Arc<dyn FolderStore>,
    items: Arc<dyn ItemStore>,
    cache: CacheManager,
    audit: Arc<dyn AuditSink>,
}

impl std::fmt::Debug for FolderService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FolderService").finish()
    }
}

/// Request to create a folder.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateFolderRequest {
    /// Parent folder ID.
    pub parent: String,
    /// Folder name.
    #[validate(length(min = 1, max = 255))]
    pub description: String,
}

/// Request to rename and/or move a folder.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateFolderRequest {
    /// New folder name.
    #[validate(length(min = 1, max = 255))]
    pub description: Option<String>,
    /// New parent folder ID.
    pub parent: Option<String>,
}

impl FolderService {
    /// Creates a new folder service.
    pub fn new(
        hierarchy: Arc<FolderHierarchy>,
        folders: Arc<dyn FolderStore>,
        items: Arc<dyn ItemStore>,
        cache: CacheManager,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            hierarchy,
            folders,
            items,
            cache,
            audit,
        }
    }

    /// Gets a folder the caller can read.
    pub async fn get_folder(&self, ctx: &RequestContext, id: &str) -> AppResult<Folder> {
        self.hierarchy.require_read(ctx, id, None).await
    }

    /// The caller's effective permissions on a folder.
    pub async fn permissions(&self, ctx: &RequestContext, id: &str) -> AppResult<Permissions> {
        self.hierarchy.permissions(ctx, id, None).await
    }

    /// Every folder visible to the caller.
    pub async fn tree(&self, ctx: &RequestContext) -> AppResult<FolderTree> {
        self.hierarchy.tree(ctx).await
    }

    /// Creates a folder. Subfolders of a personal folder stay personal and
    /// keep its owner.
    pub async fn create_folder(
        &self,
        ctx: &RequestContext,
        req: CreateFolderRequest,
    ) -> AppResult<Folder> {
        req.validate()?;

        if req.parent == PERSONAL_ROOT_ID {
            return Err(AppError::unprocessable(
                "Personal folders are created together with their owner",
            ));
        }
        let parent = self.hierarchy.require_write(ctx, &req.parent, None).await?;

        let folder = if parent.personal {
            let owner = parent.user_id.clone().ok_or_else(|| {
                AppError::internal(format!("Personal folder '{}' has no owner", parent.id))
            })?;
            Folder::new_personal(new_id(), req.description, parent.id, owner)
        } else {
            Folder::new(new_id(), req.description, parent.id)
        };

        let folder = self.folders.create_folder(&folder).await?;

        self.cache.invalidate_folders(None).await;
        self.audit
            .log(&ctx.user_id, AuditAction::Create, AuditEntity::Folder, &folder.id);
        info!(
            user_id = %ctx.user_id,
            folder_id = %folder.id,
            parent = ?folder.parent,
            "Folder created"
        );

        Ok(folder)
    }

    /// Renames and/or moves a folder.
    ///
    /// Moving needs write on the folder, its current parent, and the
    /// destination. A folder cannot move into its own subtree or across the
    /// boundary between shared and personal folders.
    pub async fn update_folder(
        &self,
        ctx: &RequestContext,
        id: &str,
        req: UpdateFolderRequest,
    ) -> AppResult<Folder> {
        req.validate()?;

        let index = self.hierarchy.load().await?;
        let mut folder = index
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Folder '{id}' not found")))?;
        if folder.is_fixed() {
            return Err(AppError::unprocessable(format!(
                "Folder '{}' cannot be modified",
                folder.description
            )));
        }
        self.hierarchy.require_write(ctx, id, Some(&index)).await?;

        let mut moved = false;
        if let Some(dest_id) = req.parent
            && folder.parent.as_deref() != Some(dest_id.as_str())
        {
            if dest_id == PERSONAL_ROOT_ID {
                return Err(AppError::unprocessable(
                    "Folders cannot be moved into the personal root",
                ));
            }
            if !index.contains(&dest_id) {
                return Err(AppError::not_found(format!("Folder '{dest_id}' not found")));
            }
            if index.is_within(&dest_id, id)? {
                return Err(AppError::unprocessable(
                    "Cannot move a folder into its own subtree",
                ));
            }
            if let Some(source_id) = folder.parent.as_deref() {
                self.hierarchy
                    .require_write(ctx, source_id, Some(&index))
                    .await?;
            }
            let dest = self
                .hierarchy
                .require_write(ctx, &dest_id, Some(&index))
                .await?;
            if dest.personal != folder.personal || dest.user_id != folder.user_id {
                return Err(AppError::unprocessable(
                    "Folders cannot move between personal and shared areas",
                ));
            }
            folder.parent = Some(dest_id);
            moved = true;
        }
        if let Some(description) = req.description {
            folder.description = description;
        }
        folder.updated_at = Utc::now();

        let folder = self.folders.update_folder(&folder).await?;

        self.cache.invalidate_folders(None).await;
        let action = if moved {
            AuditAction::Move
        } else {
            AuditAction::Update
        };
        self.audit
            .log(&ctx.user_id, action, AuditEntity::Folder, id);
        info!(user_id = %ctx.user_id, folder_id = %id, moved, "Folder updated");

        Ok(folder)
    }

    /// Deletes an empty folder together with its permission rows.
    pub async fn delete_folder(&self, ctx: &RequestContext, id: &str) -> AppResult<()> {
        let index = self.hierarchy.load().await?;
        let folder = index
            .get(id)
            .ok_or_else(|| AppError::not_found(format!("Folder '{id}' not found")))?;
        if folder.is_fixed() {
            return Err(AppError::unprocessable(format!(
                "Folder '{}' cannot be deleted",
                folder.description
            )));
        }
        if folder.parent.as_deref() == Some(PERSONAL_ROOT_ID) {
            return Err(AppError::unprocessable(
                "Personal folders are removed together with their owner",
            ));
        }
        self.hierarchy.require_write(ctx, id, Some(&index)).await?;

        if !index.children(id).is_empty() {
            return Err(AppError::unprocessable("Folder still has subfolders"));
        }
        let items = self.items.count_items(id).await?;
        if items > 0 {
            return Err(AppError::unprocessable(format!(
                "Folder still contains {items} item(s)"
            )));
        }

        self.folders.delete_folder(id).await?;

        self.cache.invalidate_folders(None).await;
        self.audit
            .log(&ctx.user_id, AuditAction::Delete, AuditEntity::Folder, id);
        info!(user_id = %ctx.user_id, folder_id = %id, "Folder deleted");

        Ok(())
    }
}
