//! First-start initialization

use crate::config::BootstrapConfig;
use crate::storage::{Storage, StorageResult, UserStorage};
use gea_types::{Role, User};
use gea_workflow::password::hash_password;

/// Create the configured GEA administrator when no user exists yet.
///
/// Returns the created user, or `None` if users were already present.
pub async fn ensure_admin(
    storage: &dyn Storage,
    config: &BootstrapConfig,
) -> StorageResult<Option<User>> {
    if storage.count_users().await? > 0 {
        return Ok(None);
    }

    let admin = User::new(
        &config.admin_username,
        &config.admin_email,
        hash_password(&config.admin_password),
        Role::GeaAdmin,
    )
    .with_full_name("GEA Administrator");

    storage.insert_user(admin.clone()).await?;
    tracing::warn!(
        username = %admin.username,
        "Created default GEA administrator; change its password"
    );
    Ok(Some(admin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;
    use gea_workflow::password::verify_password;

    #[tokio::test]
    async fn test_admin_created_once() {
        let storage = InMemoryStorage::new();
        let config = BootstrapConfig::default();

        let admin = ensure_admin(&storage, &config).await.unwrap().unwrap();
        assert_eq!(admin.role, Role::GeaAdmin);
        assert!(verify_password(&config.admin_password, &admin.password_hash).unwrap());

        assert!(ensure_admin(&storage, &config).await.unwrap().is_none());
        assert_eq!(storage.count_users().await.unwrap(), 1);
    }
}
