//! Storage traits consumed by the service layer.
//!
//! Compound operations that must not be observed half-done (deleting a
//! folder together with its permission rows, creating a user together with
//! their personal folder) are single trait methods so each backend can run
//! them atomically.

use async_trait::async_trait;

use lockbox_core::result::AppResult;
use lockbox_entity::apikey::ApiKey;
use lockbox_entity::folder::Folder;
use lockbox_entity::group::Group;
use lockbox_entity::item::Item;
use lockbox_entity::kms::KmsRecord;
use lockbox_entity::permission::FolderGroupPermission;
use lockbox_entity::user::User;

/// Folder rows.
#[async_trait]
pub trait FolderStore: Send + Sync {
    /// Find a folder by id.
    async fn find_folder(&self, id: &str) -> AppResult<Option<Folder>>;

    /// Every folder, root included.
    async fn list_folders(&self) -> AppResult<Vec<Folder>>;

    /// Direct children of a folder.
    async fn list_child_folders(&self, parent_id: &str) -> AppResult<Vec<Folder>>;

    /// Insert a folder.
    async fn create_folder(&self, folder: &Folder) -> AppResult<Folder>;

    /// Update description, parent, and ownership of a folder.
    async fn update_folder(&self, folder: &Folder) -> AppResult<Folder>;

    /// Delete a folder and every permission row attached to it.
    async fn delete_folder(&self, id: &str) -> AppResult<()>;
}

/// Group rows.
#[async_trait]
pub trait GroupStore: Send + Sync {
    /// Find a group by id.
    async fn find_group(&self, id: &str) -> AppResult<Option<Group>>;

    /// Every group, root included.
    async fn list_groups(&self) -> AppResult<Vec<Group>>;

    /// Direct children of a group.
    async fn list_child_groups(&self, parent_id: &str) -> AppResult<Vec<Group>>;

    /// Insert a group.
    async fn create_group(&self, group: &Group) -> AppResult<Group>;

    /// Update description and parent of a group.
    async fn update_group(&self, group: &Group) -> AppResult<Group>;

    /// Delete a group and every permission row granted to it.
    async fn delete_group(&self, id: &str) -> AppResult<()>;
}

/// Group membership rows.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Ids of the groups `user_id` belongs to.
    async fn list_user_groups(&self, user_id: &str) -> AppResult<Vec<String>>;

    /// Ids of the users in `group_id`.
    async fn list_group_members(&self, group_id: &str) -> AppResult<Vec<String>>;

    /// Whether `user_id` is in `group_id`.
    async fn is_member(&self, group_id: &str, user_id: &str) -> AppResult<bool>;

    /// Add a membership row.
    async fn add_member(&self, group_id: &str, user_id: &str) -> AppResult<()>;

    /// Remove a membership row. Returns `false` if none existed.
    async fn remove_member(&self, group_id: &str, user_id: &str) -> AppResult<bool>;
}

/// Folder-group permission rows.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// All grants on one folder.
    async fn list_folder_permissions(&self, folder_id: &str)
    -> AppResult<Vec<FolderGroupPermission>>;

    /// Grants on one folder to any of `group_ids`.
    async fn permissions_for_groups(
        &self,
        folder_id: &str,
        group_ids: &[String],
    ) -> AppResult<Vec<FolderGroupPermission>>;

    /// Insert or replace the grant for (folder, group).
    async fn upsert_permission(&self, permission: &FolderGroupPermission) -> AppResult<()>;

    /// Remove the grant for (folder, group). Returns `false` if none existed.
    async fn delete_permission(&self, folder_id: &str, group_id: &str) -> AppResult<bool>;

    /// Folders granted `read` to any of `group_ids`, without duplicates.
    async fn readable_folder_ids(&self, group_ids: &[String]) -> AppResult<Vec<String>>;
}

/// Encrypted item rows.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Find an item by id.
    async fn find_item(&self, id: &str) -> AppResult<Option<Item>>;

    /// Items in one folder, ordered by title.
    async fn list_items(&self, folder_id: &str) -> AppResult<Vec<Item>>;

    /// Number of items in one folder.
    async fn count_items(&self, folder_id: &str) -> AppResult<i64>;

    /// Number of items encrypted by a KMS.
    async fn count_items_by_kms(&self, kms_id: &str) -> AppResult<i64>;

    /// Insert an item.
    async fn create_item(&self, item: &Item) -> AppResult<Item>;

    /// Replace an item's folder, title, envelopes, and metadata.
    async fn update_item(&self, item: &Item) -> AppResult<Item>;

    /// Delete an item. Returns `false` if it did not exist.
    async fn delete_item(&self, id: &str) -> AppResult<bool>;
}

/// KMS records.
#[async_trait]
pub trait KmsStore: Send + Sync {
    /// Find a KMS record by id.
    async fn find_kms(&self, id: &str) -> AppResult<Option<KmsRecord>>;

    /// The single record flagged active, if any.
    async fn find_active_kms(&self) -> AppResult<Option<KmsRecord>>;

    /// All records, ordered by description.
    async fn list_kms(&self) -> AppResult<Vec<KmsRecord>>;

    /// Insert a record (always inactive).
    async fn create_kms(&self, record: &KmsRecord) -> AppResult<KmsRecord>;

    /// Update description and config of a record.
    async fn update_kms(&self, record: &KmsRecord) -> AppResult<KmsRecord>;

    /// Flag `id` active and every other record inactive.
    async fn activate_kms(&self, id: &str) -> AppResult<()>;

    /// Delete a record.
    async fn delete_kms(&self, id: &str) -> AppResult<()>;
}

/// API key rows.
#[async_trait]
pub trait ApiKeyStore: Send + Sync {
    /// Find an API key by id.
    async fn find_api_key(&self, id: &str) -> AppResult<Option<ApiKey>>;

    /// Keys owned by `user_id`, or every key when `None`.
    async fn list_api_keys(&self, user_id: Option<&str>) -> AppResult<Vec<ApiKey>>;

    /// Number of keys whose secret was encrypted by a KMS.
    async fn count_api_keys_by_kms(&self, kms_id: &str) -> AppResult<i64>;

    /// Insert a key.
    async fn create_api_key(&self, key: &ApiKey) -> AppResult<ApiKey>;

    /// Record a successful use.
    async fn touch_api_key(&self, id: &str) -> AppResult<()>;

    /// Delete a key. Returns `false` if it did not exist.
    async fn delete_api_key(&self, id: &str) -> AppResult<bool>;
}

/// User accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by id.
    async fn find_user(&self, id: &str) -> AppResult<Option<User>>;

    /// Find a user by login name.
    async fn find_user_by_login(&self, login: &str) -> AppResult<Option<User>>;

    /// All users, ordered by login.
    async fn list_users(&self) -> AppResult<Vec<User>>;

    /// Insert a user, their personal folder, and their memberships together.
    async fn create_user_with_personal_folder(
        &self,
        user: &User,
        folder: &Folder,
        group_ids: &[&str],
    ) -> AppResult<User>;

    /// Delete a user with their memberships, API keys, personal folders, and
    /// the items in those folders, all together.
    async fn delete_user(&self, id: &str) -> AppResult<()>;
}

/// Everything the service layer needs from persistent storage.
pub trait Store:
    FolderStore
    + GroupStore
    + MembershipStore
    + PermissionStore
    + ItemStore
    + KmsStore
    + ApiKeyStore
    + UserStore
    + std::fmt::Debug
    + 'static
{
}

impl<T> Store for T where
    T: FolderStore
        + GroupStore
        + MembershipStore
        + PermissionStore
        + ItemStore
        + KmsStore
        + ApiKeyStore
        + UserStore
        + std::fmt::Debug
        + 'static
{
}
