//! Login decisions with brute-force protection.
//!
//! [`AuthEngine::authenticate`] answers whether a login is allowed and
//! applies its consequences: failure counting, time-boxed lockout, and one
//! audit row per call. The read-modify-write of an account's counter is
//! serialized per account by [`AccountLocks`], and the whole decision runs
//! in a spawned task so a dropped request still finishes its writes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::OwnedMutexGuard;

use crate::auth::password::CredentialHasher;
use crate::db::{with_timeout, AccountStore, AttemptLedger};
use crate::types::{AppError, Result};
use crate::users::{Account, FailedLogin, LockoutPolicy, LoginAttempt};

/// Why a login was refused. None of these reveal whether the email exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginRejection {
    /// Wrong email or password. `attempts_remaining` is only known for a
    /// registered email.
    InvalidCredentials { attempts_remaining: Option<u32> },
    /// This failure reached the threshold and locked the account.
    LockTriggered { max_attempts: u32, lockout_minutes: i64 },
    /// The account was already locked; the password was not checked.
    Locked { minutes_remaining: i64 },
}

impl LoginRejection {
    /// Minutes the caller should wait before retrying, if any.
    pub fn retry_after_minutes(&self) -> Option<i64> {
        match self {
            LoginRejection::InvalidCredentials { .. } => None,
            LoginRejection::LockTriggered {
                lockout_minutes, ..
            } => Some(*lockout_minutes),
            LoginRejection::Locked { minutes_remaining } => Some(*minutes_remaining),
        }
    }
}

impl From<LoginRejection> for AppError {
    fn from(rejection: LoginRejection) -> Self {
        match rejection {
            LoginRejection::InvalidCredentials {
                attempts_remaining: None,
            } => AppError::InvalidCredentials {
                message: "Invalid credentials".to_string(),
                attempts_remaining: None,
            },
            LoginRejection::InvalidCredentials {
                attempts_remaining: Some(left),
            } => AppError::InvalidCredentials {
                message: format!(
                    "Invalid credentials. {} attempt(s) remaining before the account is locked.",
                    left
                ),
                attempts_remaining: Some(left),
            },
            LoginRejection::LockTriggered {
                max_attempts,
                lockout_minutes,
            } => AppError::AccountLocked {
                message: format!(
                    "Invalid credentials. You have exceeded the limit of {} attempts. \
                     Your account has been locked for {} minutes.",
                    max_attempts, lockout_minutes
                ),
                minutes_remaining: lockout_minutes,
            },
            LoginRejection::Locked { minutes_remaining } => AppError::AccountLocked {
                message: format!("Account locked. Try again in {} minutes.", minutes_remaining),
                minutes_remaining,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub enum AuthOutcome {
    Authenticated(Account),
    Rejected(LoginRejection),
}

impl AuthOutcome {
    /// The authenticated account, or the rejection as an [`AppError`].
    pub fn into_result(self) -> Result<Account> {
        match self {
            AuthOutcome::Authenticated(account) => Ok(account),
            AuthOutcome::Rejected(rejection) => Err(rejection.into()),
        }
    }
}

/// Per-account async mutexes, created on demand and dropped when the last
/// holder or waiter releases.
#[derive(Default)]
pub struct AccountLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

pub struct AccountGuard {
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<AccountLocks>,
    account_id: String,
}

impl AccountLocks {
    pub async fn acquire(self: &Arc<Self>, account_id: &str) -> AccountGuard {
        let mutex = {
            let mut map = self.inner.lock();
            map.entry(account_id.to_string()).or_default().clone()
        };
        let guard = mutex.lock_owned().await;

        AccountGuard {
            guard: Some(guard),
            locks: Arc::clone(self),
            account_id: account_id.to_string(),
        }
    }

    /// Number of accounts with a live lock entry.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for AccountGuard {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut map = self.locks.inner.lock();
        // Only the map's own reference left: nobody holds or awaits it.
        if map
            .get(&self.account_id)
            .is_some_and(|m| Arc::strong_count(m) == 1)
        {
            map.remove(&self.account_id);
        }
    }
}

/// Orchestrates account lookup, lockout, password check, counter updates
/// and the audit trail for a single login.
#[derive(Clone)]
pub struct AuthEngine {
    accounts: Arc<dyn AccountStore>,
    ledger: Arc<dyn AttemptLedger>,
    hasher: CredentialHasher,
    policy: LockoutPolicy,
    store_timeout: Duration,
    locks: Arc<AccountLocks>,
}

impl AuthEngine {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        ledger: Arc<dyn AttemptLedger>,
        hasher: CredentialHasher,
        policy: LockoutPolicy,
        store_timeout: Duration,
    ) -> Self {
        Self {
            accounts,
            ledger,
            hasher,
            policy,
            store_timeout,
            locks: Arc::new(AccountLocks::default()),
        }
    }

    pub fn policy(&self) -> &LockoutPolicy {
        &self.policy
    }

    pub fn locks(&self) -> &Arc<AccountLocks> {
        &self.locks
    }

    /// Decides a login attempt.
    ///
    /// Rejections are `Ok(AuthOutcome::Rejected(..))`. `Err` means the
    /// decision could not be made or its account update could not be
    /// persisted: a timeout is [`AppError::StoreUnavailable`], a failed write
    /// is [`AppError::Database`]. Audit-ledger failures are logged and do
    /// not change the outcome.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
        client_address: Option<String>,
    ) -> Result<AuthOutcome> {
        let engine = self.clone();
        let email = email.trim().to_string();
        let password = password.to_string();

        tokio::spawn(async move { engine.decide(email, password, client_address).await })
            .await
            .map_err(|e| AppError::Internal(format!("Login task failed: {}", e)))?
    }

    async fn decide(
        &self,
        email: String,
        password: String,
        client_address: Option<String>,
    ) -> Result<AuthOutcome> {
        let client_address = client_address.as_deref();

        let found = with_timeout(
            self.store_timeout,
            "find_by_email",
            self.accounts.find_by_email(&email),
        )
        .await?;
        let Some(found) = found else {
            return Ok(self.reject_unknown(&email, password, client_address).await);
        };

        let _guard = self.locks.acquire(&found.id).await;

        // Re-read under the lock; the first read may be stale.
        let current = with_timeout(
            self.store_timeout,
            "find_by_id",
            self.accounts.find_by_id(&found.id),
        )
        .await?;
        let Some(mut account) = current else {
            return Ok(self.reject_unknown(&email, password, client_address).await);
        };

        if let Some(minutes_remaining) = account.lockout_minutes_remaining(Utc::now()) {
            self.record(&email, false, client_address).await;
            tracing::warn!(
                account_id = %account.id,
                client_address = client_address.unwrap_or("-"),
                minutes_remaining,
                "login refused: account locked"
            );
            return Ok(AuthOutcome::Rejected(LoginRejection::Locked { minutes_remaining }));
        }

        let verified = self
            .hasher
            .verify_blocking(password, account.password_hash.clone())
            .await;
        let now = Utc::now();

        if !verified {
            let outcome = account.record_failed_login(&self.policy, now);
            let persisted = with_timeout(
                self.store_timeout,
                "update_account",
                self.accounts.update_account(&account),
            )
            .await;
            self.record(&email, false, client_address).await;
            persisted?;

            let rejection = match outcome {
                FailedLogin::Locked { until } => {
                    tracing::warn!(
                        account_id = %account.id,
                        client_address = client_address.unwrap_or("-"),
                        locked_until = %until,
                        "account locked after repeated failures"
                    );
                    LoginRejection::LockTriggered {
                        max_attempts: self.policy.max_failed_attempts,
                        lockout_minutes: self.policy.lockout_minutes(),
                    }
                }
                FailedLogin::AttemptsRemaining(left) => {
                    tracing::info!(
                        account_id = %account.id,
                        client_address = client_address.unwrap_or("-"),
                        attempts_remaining = left,
                        "login failed: wrong password"
                    );
                    LoginRejection::InvalidCredentials {
                        attempts_remaining: Some(left),
                    }
                }
            };
            return Ok(AuthOutcome::Rejected(rejection));
        }

        if account.record_successful_login(now) {
            with_timeout(
                self.store_timeout,
                "update_account",
                self.accounts.update_account(&account),
            )
            .await?;
        }
        self.record(&email, true, client_address).await;

        tracing::info!(account_id = %account.id, "login succeeded");
        Ok(AuthOutcome::Authenticated(account))
    }

    async fn reject_unknown(
        &self,
        email: &str,
        password: String,
        client_address: Option<&str>,
    ) -> AuthOutcome {
        // Same KDF cost as a real account, so timing does not reveal the miss.
        self.hasher.verify_decoy_blocking(password).await;
        self.record(email, false, client_address).await;

        tracing::info!(
            client_address = client_address.unwrap_or("-"),
            "login failed: unknown email"
        );
        AuthOutcome::Rejected(LoginRejection::InvalidCredentials {
            attempts_remaining: None,
        })
    }

    async fn record(&self, email: &str, success: bool, client_address: Option<&str>) {
        let attempt = LoginAttempt::new(email, success, client_address, Utc::now());
        let written = with_timeout(
            self.store_timeout,
            "record_attempt",
            self.ledger.record_attempt(&attempt),
        )
        .await;

        if let Err(e) = written {
            tracing::warn!(error = %e, success, "failed to write login attempt to audit ledger");
        }
    }
}
