use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::auth::password::CredentialHasher;
use crate::db::{with_timeout, AccountStore, RoleStore};
use crate::types::{AppError, RegisterRequest, Result};
use crate::users::{Account, PasswordPolicy, RoleName};

/// Registration and role-change use cases.
#[derive(Clone)]
pub struct AccountService {
    accounts: Arc<dyn AccountStore>,
    roles: Arc<dyn RoleStore>,
    hasher: CredentialHasher,
    password_policy: PasswordPolicy,
    store_timeout: Duration,
}

impl AccountService {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        roles: Arc<dyn RoleStore>,
        hasher: CredentialHasher,
        store_timeout: Duration,
    ) -> Self {
        Self {
            accounts,
            roles,
            hasher,
            password_policy: PasswordPolicy::default(),
            store_timeout,
        }
    }

    pub fn with_password_policy(mut self, policy: PasswordPolicy) -> Self {
        self.password_policy = policy;
        self
    }

    /// Creates an account with a zero failure counter and no lockout.
    ///
    /// Checks run in order: field shape, email uniqueness (case-insensitive),
    /// role existence, password strength. Every rejection is a validation
    /// error.
    pub async fn register(&self, request: RegisterRequest) -> Result<Account> {
        let input = request.validate()?;

        let existing = with_timeout(
            self.store_timeout,
            "find_by_email",
            self.accounts.find_by_email(&input.email),
        )
        .await?;
        if existing.is_some() {
            return Err(AppError::Validation(format!(
                "Email {} is already registered",
                input.email
            )));
        }

        let role = with_timeout(
            self.store_timeout,
            "find_role_by_name",
            self.roles.find_role_by_name(input.role),
        )
        .await?
        .ok_or_else(|| AppError::Validation(format!("Role '{}' does not exist", input.role)))?;

        self.password_policy.validate(&input.password)?;

        let password_hash = self.hasher.hash_blocking(input.password).await?;
        let account = Account::new(
            input.name,
            input.email,
            input.phone,
            password_hash,
            role.id,
            Utc::now(),
        );

        with_timeout(
            self.store_timeout,
            "insert_account",
            self.accounts.insert_account(&account),
        )
        .await?;

        tracing::info!(account_id = %account.id, role = %input.role, "account registered");
        Ok(account)
    }

    /// Reassigns an account's role. Tokens already issued keep the old role
    /// until they expire.
    ///
    /// Only the role column is written, so a lockout recorded by a
    /// concurrent login is never overwritten with a stale counter.
    pub async fn change_role(&self, account_id: &str, new_role: &str) -> Result<Account> {
        let account = with_timeout(
            self.store_timeout,
            "find_by_id",
            self.accounts.find_by_id(account_id),
        )
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", account_id)))?;

        let role_name: RoleName = new_role.parse()?;
        let role = with_timeout(
            self.store_timeout,
            "find_role_by_name",
            self.roles.find_role_by_name(role_name),
        )
        .await?
        .ok_or_else(|| AppError::Validation(format!("Role '{}' does not exist", role_name)))?;

        with_timeout(
            self.store_timeout,
            "update_role",
            self.accounts.update_role(&account.id, &role.id, Utc::now()),
        )
        .await?;

        let updated = with_timeout(
            self.store_timeout,
            "find_by_id",
            self.accounts.find_by_id(&account.id),
        )
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", account.id)))?;

        tracing::info!(account_id = %updated.id, role = %role_name, "account role changed");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::TursoClient;

    async fn service() -> (AccountService, Arc<TursoClient>) {
        let db = Arc::new(TursoClient::new_memory().await.unwrap());
        let service = AccountService::new(
            db.clone(),
            db.clone(),
            CredentialHasher::with_params(1024, 1, 1).unwrap(),
            Duration::from_secs(5),
        );
        (service, db)
    }

    fn request(email: &str, password: &str, role: Option<&str>) -> RegisterRequest {
        RegisterRequest {
            name: "  ana   DIAZ ".to_string(),
            email: email.to_string(),
            phone: Some("+1 (829) 555-1234".to_string()),
            password: password.to_string(),
            role: role.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn register_normalises_and_hashes() {
        let (service, db) = service().await;
        let account = service
            .register(request("ana@x.com", "Secure123!", None))
            .await
            .unwrap();

        assert_eq!(account.name, "Ana Diaz");
        assert_eq!(account.phone.as_deref(), Some("+18295551234"));
        assert_eq!(account.failed_login_attempts, 0);
        assert!(account.locked_until.is_none());
        assert_ne!(account.password_hash, "Secure123!");

        let waiter = db.find_role_by_name(RoleName::Waiter).await.unwrap().unwrap();
        assert_eq!(account.role_id, waiter.id);
    }

    #[tokio::test]
    async fn register_rejects_email_differing_only_in_case() {
        let (service, _db) = service().await;
        service
            .register(request("ana@x.com", "Secure123!", None))
            .await
            .unwrap();

        let err = service
            .register(request("ANA@X.com", "Secure123!", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn register_rejects_weak_password() {
        let (service, _db) = service().await;
        let err = service
            .register(request("ana@x.com", "password", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn change_role_reassigns_and_persists() {
        let (service, db) = service().await;
        let account = service
            .register(request("ana@x.com", "Secure123!", Some("waiter")))
            .await
            .unwrap();

        let updated = service.change_role(&account.id, "Employee").await.unwrap();
        let employee = db.find_role_by_name(RoleName::Employee).await.unwrap().unwrap();
        assert_eq!(updated.role_id, employee.id);

        let stored = db.find_by_id(&account.id).await.unwrap().unwrap();
        assert_eq!(stored.role_id, employee.id);
    }

    #[tokio::test]
    async fn change_role_preserves_lockout() {
        let (service, db) = service().await;
        let account = service
            .register(request("ana@x.com", "Secure123!", None))
            .await
            .unwrap();

        let mut locked = db.find_by_id(&account.id).await.unwrap().unwrap();
        locked.failed_login_attempts = 5;
        locked.locked_until = Some(Utc::now() + chrono::Duration::minutes(15));
        db.update_account(&locked).await.unwrap();

        let updated = service.change_role(&account.id, "admin").await.unwrap();
        assert_eq!(updated.failed_login_attempts, 5);

        let stored = db.find_by_id(&account.id).await.unwrap().unwrap();
        assert_eq!(stored.failed_login_attempts, 5);
        assert!(stored.is_locked(Utc::now()));
        let admin = db.find_role_by_name(RoleName::Admin).await.unwrap().unwrap();
        assert_eq!(stored.role_id, admin.id);
    }

    #[tokio::test]
    async fn change_role_errors() {
        let (service, _db) = service().await;
        let missing = service.change_role("no-such-id", "admin").await.unwrap_err();
        assert!(matches!(missing, AppError::NotFound(_)));

        let account = service
            .register(request("ana@x.com", "Secure123!", None))
            .await
            .unwrap();
        let bad_role = service.change_role(&account.id, "chef").await.unwrap_err();
        assert!(matches!(bad_role, AppError::Validation(_)));
    }
}
