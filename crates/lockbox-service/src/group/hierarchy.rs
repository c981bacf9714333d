//! Group tree walks and per-user group resolution.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use lockbox_cache::{CacheManager, keys};
use lockbox_core::result::AppResult;
use lockbox_database::{GroupStore, MembershipStore};
use lockbox_entity::group::{Group, GroupNode};

use crate::cached;
use crate::hierarchy::Hierarchy;

/// Walks the group tree.
///
/// Groups are permission subjects only, so there is no inheritance step:
/// the tree is the full catalogue, the same for every caller.
#[derive(Clone)]
pub struct GroupHierarchy {
    groups: Arc<dyn GroupStore>,
    memberships: Arc<dyn MembershipStore>,
    cache: CacheManager,
}

impl std::fmt::Debug for GroupHierarchy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupHierarchy").finish()
    }
}

impl GroupHierarchy {
    /// Creates a new group hierarchy.
    pub fn new(
        groups: Arc<dyn GroupStore>,
        memberships: Arc<dyn MembershipStore>,
        cache: CacheManager,
    ) -> Self {
        Self {
            groups,
            memberships,
            cache,
        }
    }

    /// Index every group.
    pub async fn load(&self) -> AppResult<Hierarchy<Group>> {
        Ok(Hierarchy::new(self.groups.list_groups().await?))
    }

    /// Whether the group exists. Store failures count as absent.
    pub async fn exists(&self, id: &str) -> bool {
        match self.groups.find_group(id).await {
            Ok(found) => found.is_some(),
            Err(e) => {
                warn!(group_id = id, error = %e, "Group existence probe failed");
                false
            }
        }
    }

    /// Ancestors of a group, nearest first.
    pub async fn parents(
        &self,
        id: &str,
        include_self: bool,
        preloaded: Option<&Hierarchy<Group>>,
    ) -> AppResult<Vec<Group>> {
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

    /// Every descendant of a group.
    pub async fn children(
        &self,
        id: &str,
        preloaded: Option<&Hierarchy<Group>>,
    ) -> AppResult<Vec<Group>> {
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

    /// The immediate parent of a group.
    pub async fn parent(&self, id: &str) -> AppResult<Option<Group>> {
        let Some(group) = self.groups.find_group(id).await? else {
            return Ok(None);
        };
        match group.parent {
            Some(parent) => self.groups.find_group(&parent).await,
            None => Ok(None),
        }
    }

    /// The full group catalogue as a nested tree.
    pub async fn tree(&self) -> AppResult<Vec<GroupNode>> {
        let key = keys::group_tree();
        if let Some(tree) = cached::read::<Vec<GroupNode>>(&self.cache, &key).await {
            return Ok(tree);
        }

        let index = self.load().await?;
        let visible: HashSet<String> = index.rows().iter().map(|g| g.id.clone()).collect();
        let build = |group: &Group, children: Vec<GroupNode>| GroupNode {
            id: group.id.clone(),
            description: group.description.clone(),
            parent: group.parent.clone(),
            children,
        };
        let tree = index.nest(&visible, &build)?;

        debug!(groups = index.len(), "Built group tree");
        cached::write(&self.cache, &key, &tree).await;
        Ok(tree)
    }

    /// Ids of the groups a user belongs to.
    pub async fn user_groups(&self, user_id: &str) -> AppResult<Vec<String>> {
        let key = keys::user_groups(user_id);
        if let Some(groups) = cached::read::<Vec<String>>(&self.cache, &key).await {
            return Ok(groups);
        }

        let groups = self.memberships.list_user_groups(user_id).await?;
        cached::write(&self.cache, &key, &groups).await;
        Ok(groups)
    }
}
