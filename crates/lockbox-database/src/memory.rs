//! In-process store for single-node deployments, development, and tests.
//!
//! All tables live behind one `RwLock`, so compound operations run under a
//! single write guard and are atomic with respect to every other caller.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use lockbox_core::error::AppError;
use lockbox_core::result::AppResult;
use lockbox_entity::apikey::ApiKey;
use lockbox_entity::folder::{Folder, ROOT_FOLDER_ID};
use lockbox_entity::group::{ADMINS_GROUP_ID, Group};
use lockbox_entity::item::Item;
use lockbox_entity::kms::KmsRecord;
use lockbox_entity::permission::FolderGroupPermission;
use lockbox_entity::user::User;

use crate::store::{
    ApiKeyStore, FolderStore, GroupStore, ItemStore, KmsStore, MembershipStore, PermissionStore,
    UserStore,
};

#[derive(Debug, Default)]
struct Tables {
    folders: BTreeMap<String, Folder>,
    groups: BTreeMap<String, Group>,
    /// (group id, user id)
    memberships: BTreeSet<(String, String)>,
    /// Keyed by (folder id, group id).
    permissions: BTreeMap<(String, String), FolderGroupPermission>,
    items: BTreeMap<String, Item>,
    kms: BTreeMap<String, KmsRecord>,
    api_keys: BTreeMap<String, ApiKey>,
    users: BTreeMap<String, User>,
}

/// Store backed by process memory.
#[derive(Debug)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create a store holding only the fixed folders and groups, with
    /// Admins granted read and write on the root folder.
    pub fn new() -> Self {
        let mut tables = Tables::default();
        for folder in [Folder::root(), Folder::personal_root()] {
            tables.folders.insert(folder.id.clone(), folder);
        }
        for group in [Group::root(), Group::admins(), Group::everyone()] {
            tables.groups.insert(group.id.clone(), group);
        }
        let admins_on_root = FolderGroupPermission {
            folder_id: ROOT_FOLDER_ID.to_string(),
            group_id: ADMINS_GROUP_ID.to_string(),
            read: true,
            write: true,
        };
        tables.permissions.insert(
            (ROOT_FOLDER_ID.to_string(), ADMINS_GROUP_ID.to_string()),
            admins_on_root,
        );
        Self {
            tables: RwLock::new(tables),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn sorted_by<T, K: Ord>(mut rows: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    rows.sort_by_key(|r| key(r));
    rows
}

#[async_trait]
impl FolderStore for MemoryStore {
    async fn find_folder(&self, id: &str) -> AppResult<Option<Folder>> {
        Ok(self.tables.read().await.folders.get(id).cloned())
    }

    async fn list_folders(&self) -> AppResult<Vec<Folder>> {
        Ok(self.tables.read().await.folders.values().cloned().collect())
    }

    async fn list_child_folders(&self, parent_id: &str) -> AppResult<Vec<Folder>> {
        let tables = self.tables.read().await;
        let rows = tables
            .folders
            .values()
            .filter(|f| f.parent.as_deref() == Some(parent_id))
            .cloned()
            .collect();
        Ok(sorted_by(rows, |f: &Folder| f.description.clone()))
    }

    async fn create_folder(&self, folder: &Folder) -> AppResult<Folder> {
        let mut tables = self.tables.write().await;
        if tables.folders.contains_key(&folder.id) {
            return Err(AppError::conflict(format!(
                "Folder '{}' already exists",
                folder.id
            )));
        }
        tables.folders.insert(folder.id.clone(), folder.clone());
        Ok(folder.clone())
    }

    async fn update_folder(&self, folder: &Folder) -> AppResult<Folder> {
        let mut tables = self.tables.write().await;
        let row = tables
            .folders
            .get_mut(&folder.id)
            .ok_or_else(|| AppError::not_found(format!("Folder '{}' not found", folder.id)))?;
        row.description = folder.description.clone();
        row.parent = folder.parent.clone();
        row.personal = folder.personal;
        row.user_id = folder.user_id.clone();
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete_folder(&self, id: &str) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables.permissions.retain(|(folder_id, _), _| folder_id != id);
        tables.folders.remove(id);
        debug!(folder_id = %id, "Deleted folder and its permission rows");
        Ok(())
    }
}

#[async_trait]
impl GroupStore for MemoryStore {
    async fn find_group(&self, id: &str) -> AppResult<Option<Group>> {
        Ok(self.tables.read().await.groups.get(id).cloned())
    }

    async fn list_groups(&self) -> AppResult<Vec<Group>> {
        Ok(self.tables.read().await.groups.values().cloned().collect())
    }

    async fn list_child_groups(&self, parent_id: &str) -> AppResult<Vec<Group>> {
        let tables = self.tables.read().await;
        let rows = tables
            .groups
            .values()
            .filter(|g| g.parent.as_deref() == Some(parent_id))
            .cloned()
            .collect();
        Ok(sorted_by(rows, |g: &Group| g.description.clone()))
    }

    async fn create_group(&self, group: &Group) -> AppResult<Group> {
        let mut tables = self.tables.write().await;
        if tables.groups.contains_key(&group.id) {
            return Err(AppError::conflict(format!(
                "Group '{}' already exists",
                group.id
            )));
        }
        tables.groups.insert(group.id.clone(), group.clone());
        Ok(group.clone())
    }

    async fn update_group(&self, group: &Group) -> AppResult<Group> {
        let mut tables = self.tables.write().await;
        let row = tables
            .groups
            .get_mut(&group.id)
            .ok_or_else(|| AppError::not_found(format!("Group '{}' not found", group.id)))?;
        row.description = group.description.clone();
        row.parent = group.parent.clone();
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete_group(&self, id: &str) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables.permissions.retain(|(_, group_id), _| group_id != id);
        tables.groups.remove(id);
        Ok(())
    }
}

#[async_trait]
impl MembershipStore for MemoryStore {
    async fn list_user_groups(&self, user_id: &str) -> AppResult<Vec<String>> {
        let tables = self.tables.read().await;
        Ok(tables
            .memberships
            .iter()
            .filter(|(_, u)| u == user_id)
            .map(|(g, _)| g.clone())
            .collect())
    }

    async fn list_group_members(&self, group_id: &str) -> AppResult<Vec<String>> {
        let tables = self.tables.read().await;
        Ok(tables
            .memberships
            .iter()
            .filter(|(g, _)| g == group_id)
            .map(|(_, u)| u.clone())
            .collect())
    }

    async fn is_member(&self, group_id: &str, user_id: &str) -> AppResult<bool> {
        let key = (group_id.to_string(), user_id.to_string());
        Ok(self.tables.read().await.memberships.contains(&key))
    }

    async fn add_member(&self, group_id: &str, user_id: &str) -> AppResult<()> {
        let inserted = self
            .tables
            .write()
            .await
            .memberships
            .insert((group_id.to_string(), user_id.to_string()));
        if !inserted {
            return Err(AppError::conflict(format!(
                "User '{user_id}' is already a member of group '{group_id}'"
            )));
        }
        Ok(())
    }

    async fn remove_member(&self, group_id: &str, user_id: &str) -> AppResult<bool> {
        let key = (group_id.to_string(), user_id.to_string());
        Ok(self.tables.write().await.memberships.remove(&key))
    }
}

#[async_trait]
impl PermissionStore for MemoryStore {
    async fn list_folder_permissions(
        &self,
        folder_id: &str,
    ) -> AppResult<Vec<FolderGroupPermission>> {
        let tables = self.tables.read().await;
        Ok(tables
            .permissions
            .values()
            .filter(|p| p.folder_id == folder_id)
            .cloned()
            .collect())
    }

    async fn permissions_for_groups(
        &self,
        folder_id: &str,
        group_ids: &[String],
    ) -> AppResult<Vec<FolderGroupPermission>> {
        let tables = self.tables.read().await;
        Ok(tables
            .permissions
            .values()
            .filter(|p| p.folder_id == folder_id && group_ids.contains(&p.group_id))
            .cloned()
            .collect())
    }

    async fn upsert_permission(&self, permission: &FolderGroupPermission) -> AppResult<()> {
        let key = (permission.folder_id.clone(), permission.group_id.clone());
        self.tables
            .write()
            .await
            .permissions
            .insert(key, permission.clone());
        Ok(())
    }

    async fn delete_permission(&self, folder_id: &str, group_id: &str) -> AppResult<bool> {
        let key = (folder_id.to_string(), group_id.to_string());
        Ok(self.tables.write().await.permissions.remove(&key).is_some())
    }

    async fn readable_folder_ids(&self, group_ids: &[String]) -> AppResult<Vec<String>> {
        let tables = self.tables.read().await;
        let ids: BTreeSet<String> = tables
            .permissions
            .values()
            .filter(|p| p.read && group_ids.contains(&p.group_id))
            .filter(|p| tables.folders.contains_key(&p.folder_id))
            .map(|p| p.folder_id.clone())
            .collect();
        Ok(ids.into_iter().collect())
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn find_item(&self, id: &str) -> AppResult<Option<Item>> {
        Ok(self.tables.read().await.items.get(id).cloned())
    }

    async fn list_items(&self, folder_id: &str) -> AppResult<Vec<Item>> {
        let tables = self.tables.read().await;
        let rows = tables
            .items
            .values()
            .filter(|i| i.folder_id == folder_id)
            .cloned()
            .collect();
        Ok(sorted_by(rows, |i: &Item| i.title.clone()))
    }

    async fn count_items(&self, folder_id: &str) -> AppResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables.items.values().filter(|i| i.folder_id == folder_id).count() as i64)
    }

    async fn count_items_by_kms(&self, kms_id: &str) -> AppResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .items
            .values()
            .filter(|i| i.kms_id.as_deref() == Some(kms_id))
            .count() as i64)
    }

    async fn create_item(&self, item: &Item) -> AppResult<Item> {
        let mut tables = self.tables.write().await;
        if !tables.folders.contains_key(&item.folder_id) {
            return Err(AppError::not_found(format!(
                "Folder '{}' not found",
                item.folder_id
            )));
        }
        tables.items.insert(item.id.clone(), item.clone());
        Ok(item.clone())
    }

    async fn update_item(&self, item: &Item) -> AppResult<Item> {
        let mut tables = self.tables.write().await;
        let row = tables
            .items
            .get_mut(&item.id)
            .ok_or_else(|| AppError::not_found(format!("Item '{}' not found", item.id)))?;
        *row = Item {
            created_at: row.created_at,
            updated_at: Utc::now(),
            ..item.clone()
        };
        Ok(row.clone())
    }

    async fn delete_item(&self, id: &str) -> AppResult<bool> {
        Ok(self.tables.write().await.items.remove(id).is_some())
    }
}

#[async_trait]
impl KmsStore for MemoryStore {
    async fn find_kms(&self, id: &str) -> AppResult<Option<KmsRecord>> {
        Ok(self.tables.read().await.kms.get(id).cloned())
    }

    async fn find_active_kms(&self) -> AppResult<Option<KmsRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.kms.values().find(|k| k.active).cloned())
    }

    async fn list_kms(&self) -> AppResult<Vec<KmsRecord>> {
        let rows = self.tables.read().await.kms.values().cloned().collect();
        Ok(sorted_by(rows, |k: &KmsRecord| k.description.clone()))
    }

    async fn create_kms(&self, record: &KmsRecord) -> AppResult<KmsRecord> {
        let mut tables = self.tables.write().await;
        if tables.kms.contains_key(&record.id) {
            return Err(AppError::conflict(format!(
                "KMS '{}' already exists",
                record.id
            )));
        }
        let row = KmsRecord {
            active: false,
            ..record.clone()
        };
        tables.kms.insert(row.id.clone(), row.clone());
        Ok(row)
    }

    async fn update_kms(&self, record: &KmsRecord) -> AppResult<KmsRecord> {
        let mut tables = self.tables.write().await;
        let row = tables
            .kms
            .get_mut(&record.id)
            .ok_or_else(|| AppError::not_found(format!("KMS '{}' not found", record.id)))?;
        row.description = record.description.clone();
        row.config = record.config.clone();
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn activate_kms(&self, id: &str) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.kms.contains_key(id) {
            return Err(AppError::not_found(format!("KMS '{id}' not found")));
        }
        for (key, row) in tables.kms.iter_mut() {
            row.active = key == id;
        }
        Ok(())
    }

    async fn delete_kms(&self, id: &str) -> AppResult<()> {
        self.tables.write().await.kms.remove(id);
        Ok(())
    }
}

#[async_trait]
impl ApiKeyStore for MemoryStore {
    async fn find_api_key(&self, id: &str) -> AppResult<Option<ApiKey>> {
        Ok(self.tables.read().await.api_keys.get(id).cloned())
    }

    async fn list_api_keys(&self, user_id: Option<&str>) -> AppResult<Vec<ApiKey>> {
        let tables = self.tables.read().await;
        let rows = tables
            .api_keys
            .values()
            .filter(|k| user_id.is_none_or(|u| k.user_id == u))
            .cloned()
            .collect();
        Ok(sorted_by(rows, |k: &ApiKey| k.description.clone()))
    }

    async fn count_api_keys_by_kms(&self, kms_id: &str) -> AppResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .api_keys
            .values()
            .filter(|k| k.kms_id.as_deref() == Some(kms_id))
            .count() as i64)
    }

    async fn create_api_key(&self, key: &ApiKey) -> AppResult<ApiKey> {
        self.tables
            .write()
            .await
            .api_keys
            .insert(key.id.clone(), key.clone());
        Ok(key.clone())
    }

    async fn touch_api_key(&self, id: &str) -> AppResult<()> {
        if let Some(key) = self.tables.write().await.api_keys.get_mut(id) {
            key.last_used_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn delete_api_key(&self, id: &str) -> AppResult<bool> {
        Ok(self.tables.write().await.api_keys.remove(id).is_some())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: &str) -> AppResult<Option<User>> {
        Ok(self.tables.read().await.users.get(id).cloned())
    }

    async fn find_user_by_login(&self, login: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.login == login).cloned())
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let rows = self.tables.read().await.users.values().cloned().collect();
        Ok(sorted_by(rows, |u: &User| u.login.clone()))
    }

    async fn create_user_with_personal_folder(
        &self,
        user: &User,
        folder: &Folder,
        group_ids: &[&str],
    ) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.contains_key(&user.id) || tables.users.values().any(|u| u.login == user.login)
        {
            return Err(AppError::conflict(format!(
                "User '{}' already exists",
                user.login
            )));
        }
        if tables.folders.contains_key(&folder.id) {
            return Err(AppError::conflict(format!(
                "Folder '{}' already exists",
                folder.id
            )));
        }
        if let Some(missing) = group_ids.iter().find(|g| !tables.groups.contains_key(**g)) {
            return Err(AppError::not_found(format!("Group '{missing}' not found")));
        }

        tables.users.insert(user.id.clone(), user.clone());
        tables.folders.insert(folder.id.clone(), folder.clone());
        for group_id in group_ids {
            tables
                .memberships
                .insert((group_id.to_string(), user.id.clone()));
        }
        Ok(user.clone())
    }

    async fn delete_user(&self, id: &str) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let personal: BTreeSet<String> = tables
            .folders
            .values()
            .filter(|f| f.is_owned_by(id))
            .map(|f| f.id.clone())
            .collect();

        tables.memberships.retain(|(_, user_id)| user_id != id);
        tables.api_keys.retain(|_, k| k.user_id != id);
        tables.items.retain(|_, i| !personal.contains(&i.folder_id));
        tables
            .permissions
            .retain(|(folder_id, _), _| !personal.contains(folder_id));
        tables.folders.retain(|folder_id, _| !personal.contains(folder_id));
        tables.users.remove(id);

        debug!(user_id = %id, folders = personal.len(), "Deleted user and personal data");
        Ok(())
    }
}
