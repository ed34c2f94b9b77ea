use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::db::{with_timeout, RoleStore};
use crate::types::{AppError, Result};
use crate::users::{Permission, Role, RoleName};

/// Maps roles to permission sets and answers capability checks.
///
/// Reads straight through to the role store on every call, so grants made
/// by the seed path are visible immediately.
#[derive(Clone)]
pub struct AuthorizationResolver {
    roles: Arc<dyn RoleStore>,
    store_timeout: Duration,
}

impl AuthorizationResolver {
    pub fn new(roles: Arc<dyn RoleStore>, store_timeout: Duration) -> Self {
        Self {
            roles,
            store_timeout,
        }
    }

    /// Distinct permissions granted to a role, ordered by name.
    pub async fn permissions_for_role(&self, role_id: &str) -> Result<Vec<Permission>> {
        let permissions = with_timeout(
            self.store_timeout,
            "permissions_for_role",
            self.roles.permissions_for_role(role_id),
        )
        .await?;

        let by_id: BTreeMap<String, Permission> = permissions
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        let mut unique: Vec<Permission> = by_id.into_values().collect();
        unique.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(unique)
    }

    /// Whether `name` parses to a permitted role that exists in the store.
    pub async fn role_exists(&self, name: &str) -> Result<bool> {
        let Ok(role_name) = name.parse::<RoleName>() else {
            return Ok(false);
        };
        Ok(self.resolve_role(role_name).await?.is_some())
    }

    /// All roles ordered by name.
    pub async fn list_roles(&self) -> Result<Vec<Role>> {
        with_timeout(self.store_timeout, "list_roles", self.roles.list_roles()).await
    }

    pub async fn list_permissions(&self) -> Result<Vec<Permission>> {
        with_timeout(
            self.store_timeout,
            "list_permissions",
            self.roles.list_permissions(),
        )
        .await
    }

    pub async fn role(&self, role_id: &str) -> Result<Option<Role>> {
        with_timeout(
            self.store_timeout,
            "find_role_by_id",
            self.roles.find_role_by_id(role_id),
        )
        .await
    }

    pub async fn resolve_role(&self, name: RoleName) -> Result<Option<Role>> {
        with_timeout(
            self.store_timeout,
            "find_role_by_name",
            self.roles.find_role_by_name(name),
        )
        .await
    }

    pub async fn has_permission(&self, role_id: &str, permission: &str) -> Result<bool> {
        Ok(self
            .permissions_for_role(role_id)
            .await?
            .iter()
            .any(|p| p.name == permission))
    }

    /// `Forbidden` unless the role holds `permission`.
    pub async fn require_permission(&self, role_id: &str, permission: &str) -> Result<()> {
        if self.has_permission(role_id, permission).await? {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Missing required permission: {}",
                permission
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::TursoClient;

    async fn resolver() -> (AuthorizationResolver, Arc<TursoClient>) {
        let db = Arc::new(TursoClient::new_memory().await.unwrap());
        (
            AuthorizationResolver::new(db.clone(), Duration::from_secs(5)),
            db,
        )
    }

    #[tokio::test]
    async fn grant_is_visible_once_even_if_repeated() {
        let (resolver, db) = resolver().await;
        let employee = db.find_role_by_name(RoleName::Employee).await.unwrap().unwrap();
        let permission = db
            .create_permission("manage-inventory", Some("Track stock"))
            .await
            .unwrap();

        assert!(db.grant_permission(&employee.id, &permission.id).await.unwrap());
        assert!(!db.grant_permission(&employee.id, &permission.id).await.unwrap());

        let granted = resolver.permissions_for_role(&employee.id).await.unwrap();
        assert_eq!(granted, vec![permission]);
    }

    #[tokio::test]
    async fn role_exists_checks_name_and_store() {
        let (resolver, _db) = resolver().await;
        assert!(resolver.role_exists("Admin").await.unwrap());
        assert!(resolver.role_exists("waiter").await.unwrap());
        assert!(!resolver.role_exists("chef").await.unwrap());
    }

    #[tokio::test]
    async fn roles_are_listed_by_name() {
        let (resolver, _db) = resolver().await;
        let names: Vec<&str> = resolver
            .list_roles()
            .await
            .unwrap()
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["admin", "employee", "waiter"]);
    }

    #[tokio::test]
    async fn require_permission_forbids_missing_grant() {
        let (resolver, db) = resolver().await;
        db.seed_default_permissions().await.unwrap();
        let waiter = db.find_role_by_name(RoleName::Waiter).await.unwrap().unwrap();

        assert!(resolver.require_permission(&waiter.id, "take-orders").await.is_ok());
        assert!(matches!(
            resolver.require_permission(&waiter.id, "manage-users").await,
            Err(AppError::Forbidden(_))
        ));
    }
}
