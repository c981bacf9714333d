//! Folder tree walks, inherited permission resolution, and the per-user
//! visible tree.
//!
//! Permissions are OR-combined over every group the user belongs to and
//! every folder on the path from the target up to the root. Grants only
//! ever add access going down the tree, so the walk stops as soon as both
//! read and write are granted.
//!
//! Personal folders sit outside that scheme: the owner (and any admin) has
//! full access and nobody else has any, whatever the group grants say.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use lockbox_cache::{CacheManager, keys};
use lockbox_core::error::AppError;
use lockbox_core::result::AppResult;
use lockbox_database::{FolderStore, PermissionStore};
use lockbox_entity::folder::{Folder, FolderNode, FolderTree, PERSONAL_ROOT_ID};
use lockbox_entity::permission::Permissions;

use crate::cached;
use crate::context::RequestContext;
use crate::group::GroupHierarchy;
use crate::hierarchy::Hierarchy;

/// Flat readable-folder list cached next to each user's tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReadableSet {
    ids: Vec<String>,
}

/// Resolves folder ancestry, permissions, and visibility.
#[derive(Clone)]
pub struct FolderHierarchy {
    folders: Arc<dyn FolderStore>,
    permissions: Arc<dyn PermissionStore>,
    groups: Arc<GroupHierarchy>,
    cache: CacheManager,
}

impl std::fmt::Debug for FolderHierarchy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FolderHierarchy").finish()
    }
}

impl FolderHierarchy {
    /// Creates a new folder hierarchy.
    pub fn new(
        folders: Arc<dyn FolderStore>,
        permissions: Arc<dyn PermissionStore>,
        groups: Arc<GroupHierarchy>,
        cache: CacheManager,
    ) -> Self {
        Self {
            folders,
            permissions,
            groups,
            cache,
        }
    }

    /// Index every folder.
    pub async fn load(&self) -> AppResult<Hierarchy<Folder>> {
        Ok(Hierarchy::new(self.folders.list_folders().await?))
    }

    /// Whether the folder exists. Store failures count as absent.
    pub async fn exists(&self, id: &str) -> bool {
        match self.folders.find_folder(id).await {
            Ok(found) => found.is_some(),
            Err(e) => {
                warn!(folder_id = id, error = %e, "Folder existence probe failed");
                false
            }
        }
    }

    /// Ancestors of a folder, nearest first and ending at the root. With
    /// `include_self` the folder itself comes first.
    pub async fn parents(
        &self,
        id: &str,
        include_self: bool,
        preloaded: Option<&Hierarchy<Folder>>,
    ) -> AppResult<Vec<Folder>> {
        let loaded;
        let index = match preloaded {
            Some(index) => index,
            None => {
                loaded = self.load().await?;
                &loaded
            }
        };
        index.parents(id, include_self)
    }

    /// Every descendant of a folder.
    pub async fn children(
        &self,
        id: &str,
        preloaded: Option<&Hierarchy<Folder>>,
    ) -> AppResult<Vec<Folder>> {
        let loaded;
        let index = match preloaded {
            Some(index) => index,
            None => {
                loaded = self.load().await?;
                &loaded
            }
        };
        Ok(index.children(id))
    }

    /// The immediate parent of a folder.
    pub async fn parent(&self, id: &str) -> AppResult<Option<Folder>> {
        let Some(folder) = self.folders.find_folder(id).await? else {
            return Ok(None);
        };
        match folder.parent {
            Some(parent) => self.folders.find_folder(&parent).await,
            None => Ok(None),
        }
    }

    /// Whether the folder is the personal root or lies beneath it.
    pub async fn is_personal(
        &self,
        id: &str,
        preloaded: Option<&Hierarchy<Folder>>,
    ) -> AppResult<bool> {
        Ok(self
            .parents(id, true, preloaded)
            .await?
            .iter()
            .any(|f| f.id == PERSONAL_ROOT_ID))
    }

    /// Effective permissions of the caller on a folder.
    pub async fn permissions(
        &self,
        ctx: &RequestContext,
        id: &str,
        preloaded: Option<&Hierarchy<Folder>>,
    ) -> AppResult<Permissions> {
        let key = keys::folder_permission(&ctx.user_id, id);
        if let Some(perms) = cached::read::<Permissions>(&self.cache, &key).await {
            return Ok(perms);
        }

        let chain = self.parents(id, true, preloaded).await?;
        let perms = match chain.first() {
            Some(folder) if folder.personal => {
                if folder.is_owned_by(&ctx.user_id) || ctx.is_admin() {
                    Permissions::FULL
                } else {
                    Permissions::NONE
                }
            }
            _ => self.inherited(&ctx.user_id, &chain).await?,
        };

        debug!(user_id = %ctx.user_id, folder_id = id, ?perms, "Resolved folder permissions");
        cached::write(&self.cache, &key, &perms).await;
        Ok(perms)
    }

    async fn inherited(&self, user_id: &str, chain: &[Folder]) -> AppResult<Permissions> {
        let groups = self.groups.user_groups(user_id).await?;
        if groups.is_empty() {
            return Ok(Permissions::NONE);
        }

        let mut perms = Permissions::NONE;
        for folder in chain {
            for row in self
                .permissions
                .permissions_for_groups(&folder.id, &groups)
                .await?
            {
                perms = perms.merge(row.permissions());
            }
            if perms.is_full() {
                break;
            }
        }
        Ok(perms)
    }

    /// Loads a folder the caller may read.
    pub async fn require_read(
        &self,
        ctx: &RequestContext,
        id: &str,
        preloaded: Option<&Hierarchy<Folder>>,
    ) -> AppResult<Folder> {
        self.require(ctx, id, false, preloaded).await
    }

    /// Loads a folder the caller may write.
    pub async fn require_write(
        &self,
        ctx: &RequestContext,
        id: &str,
        preloaded: Option<&Hierarchy<Folder>>,
    ) -> AppResult<Folder> {
        self.require(ctx, id, true, preloaded).await
    }

    async fn require(
        &self,
        ctx: &RequestContext,
        id: &str,
        write: bool,
        preloaded: Option<&Hierarchy<Folder>>,
    ) -> AppResult<Folder> {
        let folder = match preloaded {
            Some(index) => index.get(id).cloned(),
            None => self.folders.find_folder(id).await?,
        }
        .ok_or_else(|| AppError::not_found(format!("Folder '{id}' not found")))?;

        if folder.personal && !ctx.personal_unlocked {
            return Err(AppError::forbidden("Personal folders are locked"));
        }

        let perms = self.permissions(ctx, id, preloaded).await?;
        let granted = if write { perms.write } else { perms.read };
        if !granted {
            let access = if write { "write" } else { "read" };
            return Err(AppError::forbidden(format!(
                "No {access} access to folder '{id}'"
            )));
        }
        Ok(folder)
    }

    /// Every folder the caller can see, nested.
    ///
    /// A folder is readable when one of the caller's groups has `read` on it
    /// or on any ancestor, or when it is one of the caller's own personal
    /// folders. Ancestors of readable folders are included for structure
    /// and flagged unreadable. Other users' personal folders never appear,
    /// not even for admins: the tree is the caller's own catalogue. Admins
    /// still reach a personal folder by id through
    /// [`permissions`](Self::permissions).
    pub async fn tree(&self, ctx: &RequestContext) -> AppResult<FolderTree> {
        let key = keys::folder_tree(&ctx.user_id);
        if let Some(tree) = cached::read::<FolderTree>(&self.cache, &key).await {
            return Ok(tree);
        }
        Ok(self.build_tree(ctx).await?.0)
    }

    /// Ids of every folder the caller can read.
    pub async fn readable_ids(&self, ctx: &RequestContext) -> AppResult<Vec<String>> {
        let key = keys::folder_readable(&ctx.user_id);
        if let Some(set) = cached::read::<ReadableSet>(&self.cache, &key).await {
            return Ok(set.ids);
        }
        Ok(self.build_tree(ctx).await?.1)
    }

    async fn build_tree(&self, ctx: &RequestContext) -> AppResult<(FolderTree, Vec<String>)> {
        let user_id = ctx.user_id.as_str();
        let index = self.load().await?;
        let groups = self.groups.user_groups(user_id).await?;

        let mut seeds = if groups.is_empty() {
            Vec::new()
        } else {
            self.permissions.readable_folder_ids(&groups).await?
        };
        seeds.extend(
            index
                .rows()
                .into_iter()
                .filter(|f| f.is_owned_by(user_id))
                .map(|f| f.id.clone()),
        );

        let foreign = |f: &Folder| f.personal && !f.is_owned_by(user_id);

        let mut readable: HashSet<String> = HashSet::new();
        for seed in &seeds {
            let Some(folder) = index.get(seed) else {
                continue;
            };
            if !foreign(folder) {
                readable.insert(folder.id.clone());
            }
            for child in index.children(seed) {
                if !foreign(&child) {
                    readable.insert(child.id);
                }
            }
        }

        let mut visible = readable.clone();
        for id in &readable {
            for ancestor in index.parents(id, false)? {
                visible.insert(ancestor.id);
            }
        }

        let build = |folder: &Folder, children: Vec<FolderNode>| FolderNode {
            id: folder.id.clone(),
            description: folder.description.clone(),
            parent: folder.parent.clone(),
            personal: folder.personal,
            readable: readable.contains(&folder.id),
            children,
        };
        let tree = FolderTree {
            roots: index.nest(&visible, &build)?,
            total_folders: visible.len() as u64,
        };

        let mut ids: Vec<String> = readable.iter().cloned().collect();
        ids.sort();

        debug!(
            user_id,
            visible = visible.len(),
            readable = ids.len(),
            "Built folder tree"
        );
        cached::write(&self.cache, &keys::folder_tree(user_id), &tree).await;
        cached::write(
            &self.cache,
            &keys::folder_readable(user_id),
            &ReadableSet { ids: ids.clone() },
        )
        .await;

        Ok((tree, ids))
    }
}
