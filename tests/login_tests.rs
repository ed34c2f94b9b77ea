//! Login engine tests against substituted stores.

mod common;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{create_test_db, fast_hasher, STRONG_PASSWORD};
use kitchai::auth::{AuthEngine, AuthOutcome, LoginRejection};
use kitchai::db::{AccountStore, AttemptLedger, RoleStore, TursoClient};
use kitchai::types::{AppError, Result};
use kitchai::users::{Account, AccountService, LockoutPolicy, LoginAttempt, RoleName};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Ledger whose writes always fail.
struct BrokenLedger;

#[async_trait]
impl AttemptLedger for BrokenLedger {
    async fn record_attempt(&self, _attempt: &LoginAttempt) -> Result<()> {
        Err(AppError::Database("ledger disk full".to_string()))
    }

    async fn attempts_for_email(&self, _email: &str, _limit: u32) -> Result<Vec<LoginAttempt>> {
        Ok(vec![])
    }
}

/// Account store that never answers within the engine's timeout.
struct StalledAccounts {
    inner: Arc<TursoClient>,
    delay: Duration,
}

#[async_trait]
impl AccountStore for StalledAccounts {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        tokio::time::sleep(self.delay).await;
        self.inner.find_by_email(email).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>> {
        self.inner.find_by_id(id).await
    }

    async fn insert_account(&self, account: &Account) -> Result<()> {
        self.inner.insert_account(account).await
    }

    async fn update_account(&self, account: &Account) -> Result<()> {
        self.inner.update_account(account).await
    }

    async fn update_role(&self, id: &str, role_id: &str, updated_at: DateTime<Utc>) -> Result<()> {
        self.inner.update_role(id, role_id, updated_at).await
    }
}

/// Account store that reads fine but cannot persist account changes.
struct ReadOnlyAccounts {
    inner: Arc<TursoClient>,
}

#[async_trait]
impl AccountStore for ReadOnlyAccounts {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        self.inner.find_by_email(email).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>> {
        self.inner.find_by_id(id).await
    }

    async fn insert_account(&self, account: &Account) -> Result<()> {
        self.inner.insert_account(account).await
    }

    async fn update_account(&self, _account: &Account) -> Result<()> {
        Err(AppError::Database("database is read-only".to_string()))
    }

    async fn update_role(&self, _id: &str, _role_id: &str, _updated_at: DateTime<Utc>) -> Result<()> {
        Err(AppError::Database("database is read-only".to_string()))
    }
}

/// Account store whose id lookups hand back their row only after a delay,
/// so the row is stale by the time the caller sees it.
struct LaggingReads {
    inner: Arc<TursoClient>,
    lag: Duration,
}

#[async_trait]
impl AccountStore for LaggingReads {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        self.inner.find_by_email(email).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>> {
        let found = self.inner.find_by_id(id).await;
        tokio::time::sleep(self.lag).await;
        found
    }

    async fn insert_account(&self, account: &Account) -> Result<()> {
        self.inner.insert_account(account).await
    }

    async fn update_account(&self, account: &Account) -> Result<()> {
        self.inner.update_account(account).await
    }

    async fn update_role(&self, id: &str, role_id: &str, updated_at: DateTime<Utc>) -> Result<()> {
        self.inner.update_role(id, role_id, updated_at).await
    }
}

async fn seed_account(db: &TursoClient, email: &str) -> Account {
    let waiter = db
        .find_role_by_name(RoleName::Waiter)
        .await
        .unwrap()
        .unwrap();
    let account = Account::new(
        "Ana Diaz".to_string(),
        email.to_string(),
        None,
        fast_hasher().hash(STRONG_PASSWORD).unwrap(),
        waiter.id,
        Utc::now(),
    );
    db.insert_account(&account).await.unwrap();
    account
}

fn engine_over(
    accounts: Arc<dyn AccountStore>,
    ledger: Arc<dyn AttemptLedger>,
    store_timeout: Duration,
) -> AuthEngine {
    AuthEngine::new(
        accounts,
        ledger,
        fast_hasher(),
        LockoutPolicy::default(),
        store_timeout,
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_failures_cannot_exceed_threshold() {
    let db = create_test_db().await;
    let account = seed_account(&db, "ana@x.com").await;
    let engine = engine_over(db.clone(), db.clone(), Duration::from_secs(5));

    let mut tasks = JoinSet::new();
    for _ in 0..10 {
        let engine = engine.clone();
        tasks.spawn(async move { engine.authenticate("ana@x.com", "Wrong123!", None).await });
    }

    let mut triggered = 0;
    let mut invalid = 0;
    let mut locked = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined.unwrap().unwrap() {
            AuthOutcome::Rejected(LoginRejection::LockTriggered { .. }) => triggered += 1,
            AuthOutcome::Rejected(LoginRejection::InvalidCredentials { .. }) => invalid += 1,
            AuthOutcome::Rejected(LoginRejection::Locked { .. }) => locked += 1,
            AuthOutcome::Authenticated(_) => panic!("wrong password authenticated"),
        }
    }

    assert_eq!(triggered, 1);
    assert_eq!(invalid, 4);
    assert_eq!(locked, 5);

    let stored = db.find_by_id(&account.id).await.unwrap().unwrap();
    assert_eq!(stored.failed_login_attempts, 5);
    assert!(stored.is_locked(Utc::now()));
    assert!(engine.locks().is_empty());

    let audit = db.attempts_for_email("ana@x.com", 100).await.unwrap();
    assert_eq!(audit.len(), 10);
}

#[tokio::test]
async fn ledger_failure_does_not_block_login() {
    let db = create_test_db().await;
    seed_account(&db, "ana@x.com").await;
    let engine = engine_over(db.clone(), Arc::new(BrokenLedger), Duration::from_secs(5));

    let outcome = engine
        .authenticate("ana@x.com", STRONG_PASSWORD, Some("10.1.1.1".to_string()))
        .await
        .unwrap();
    assert!(matches!(outcome, AuthOutcome::Authenticated(_)));

    let outcome = engine
        .authenticate("ana@x.com", "Wrong123!", None)
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        AuthOutcome::Rejected(LoginRejection::InvalidCredentials {
            attempts_remaining: Some(4)
        })
    ));
}

#[tokio::test]
async fn stalled_store_is_unavailable() {
    let db = create_test_db().await;
    seed_account(&db, "ana@x.com").await;
    let stalled = Arc::new(StalledAccounts {
        inner: db.clone(),
        delay: Duration::from_millis(500),
    });
    let engine = engine_over(stalled, db.clone(), Duration::from_millis(50));

    let err = engine
        .authenticate("ana@x.com", STRONG_PASSWORD, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::StoreUnavailable(_)));
}

#[tokio::test]
async fn success_resets_counter() {
    let db = create_test_db().await;
    let account = seed_account(&db, "ana@x.com").await;
    let engine = engine_over(db.clone(), db.clone(), Duration::from_secs(5));

    for _ in 0..3 {
        engine
            .authenticate("ana@x.com", "Wrong123!", None)
            .await
            .unwrap();
    }
    assert_eq!(
        db.find_by_id(&account.id)
            .await
            .unwrap()
            .unwrap()
            .failed_login_attempts,
        3
    );

    let outcome = engine
        .authenticate("ana@x.com", STRONG_PASSWORD, None)
        .await
        .unwrap();
    let authenticated = outcome.into_result().unwrap();
    assert_eq!(authenticated.failed_login_attempts, 0);

    let stored = db.find_by_id(&account.id).await.unwrap().unwrap();
    assert_eq!(stored.failed_login_attempts, 0);
    assert!(stored.locked_until.is_none());
}

#[tokio::test]
async fn every_call_is_audited() {
    let db = create_test_db().await;
    seed_account(&db, "ana@x.com").await;
    let engine = engine_over(db.clone(), db.clone(), Duration::from_secs(5));

    engine
        .authenticate("ana@x.com", "Wrong123!", Some("192.168.1.20".to_string()))
        .await
        .unwrap();
    engine
        .authenticate("ana@x.com", STRONG_PASSWORD, Some("192.168.1.20".to_string()))
        .await
        .unwrap();
    engine
        .authenticate("ghost@x.com", STRONG_PASSWORD, None)
        .await
        .unwrap();

    let ana = db.attempts_for_email("ana@x.com", 10).await.unwrap();
    assert_eq!(ana.len(), 2);
    assert!(ana[0].success);
    assert!(!ana[1].success);
    assert!(ana
        .iter()
        .all(|a| a.ip_address.as_deref() == Some("192.168.1.20")));

    let ghost = db.attempts_for_email("ghost@x.com", 10).await.unwrap();
    assert_eq!(ghost.len(), 1);
    assert!(!ghost[0].success);
}

#[tokio::test]
async fn failure_after_expired_lock_relocks() {
    let db = create_test_db().await;
    let account = seed_account(&db, "ana@x.com").await;
    let engine = engine_over(db.clone(), db.clone(), Duration::from_secs(5));

    for _ in 0..5 {
        engine
            .authenticate("ana@x.com", "Wrong123!", None)
            .await
            .unwrap();
    }

    let mut stored = db.find_by_id(&account.id).await.unwrap().unwrap();
    stored.locked_until = Some(Utc::now() - chrono::Duration::seconds(1));
    db.update_account(&stored).await.unwrap();

    let outcome = engine
        .authenticate("ana@x.com", "Wrong123!", None)
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        AuthOutcome::Rejected(LoginRejection::LockTriggered { .. })
    ));

    let stored = db.find_by_id(&account.id).await.unwrap().unwrap();
    assert_eq!(stored.failed_login_attempts, 6);
    assert!(stored.is_locked(Utc::now()));
}

#[tokio::test]
async fn failed_account_write_is_an_error_but_audited() {
    let db = create_test_db().await;
    seed_account(&db, "ana@x.com").await;
    let accounts = Arc::new(ReadOnlyAccounts { inner: db.clone() });
    let engine = engine_over(accounts, db.clone(), Duration::from_secs(5));

    let err = engine
        .authenticate("ana@x.com", "Wrong123!", Some("10.2.2.2".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Database(_)));

    let audit = db.attempts_for_email("ana@x.com", 10).await.unwrap();
    assert_eq!(audit.len(), 1);
    assert!(!audit[0].success);
    assert_eq!(audit[0].ip_address.as_deref(), Some("10.2.2.2"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn role_change_does_not_erase_concurrent_lockout() {
    let db = create_test_db().await;
    let account = seed_account(&db, "ana@x.com").await;
    let engine = engine_over(db.clone(), db.clone(), Duration::from_secs(5));

    let lagging = Arc::new(LaggingReads {
        inner: db.clone(),
        lag: Duration::from_millis(750),
    });
    let service = AccountService::new(lagging, db.clone(), fast_hasher(), Duration::from_secs(5));

    let account_id = account.id.clone();
    let role_change = tokio::spawn(async move { service.change_role(&account_id, "admin").await });

    // The role change has read the unlocked row and is holding it.
    tokio::time::sleep(Duration::from_millis(50)).await;
    for _ in 0..5 {
        engine
            .authenticate("ana@x.com", "Wrong123!", None)
            .await
            .unwrap();
    }
    let before = db.find_by_id(&account.id).await.unwrap().unwrap();
    assert!(before.is_locked(Utc::now()));

    let updated = role_change.await.unwrap().unwrap();
    let admin = db
        .find_role_by_name(RoleName::Admin)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.role_id, admin.id);

    let stored = db.find_by_id(&account.id).await.unwrap().unwrap();
    assert_eq!(stored.role_id, admin.id);
    assert_eq!(stored.failed_login_attempts, 5);
    assert!(stored.is_locked(Utc::now()));
}
