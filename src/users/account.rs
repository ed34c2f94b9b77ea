//! The account record and its lockout state machine.
//!
//! An account owns its failed-attempt counter and lockout expiry. Nothing
//! outside this module mutates them directly; the login flow drives them
//! through [`Account::record_failed_login`] and
//! [`Account::record_successful_login`].
//!
//! Lockout is evaluated lazily: once `locked_until` is in the past the
//! account behaves as unlocked, no background sweep is needed.

use chrono::{DateTime, Duration, Utc};

/// Brute-force protection thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    /// Consecutive failures that trigger a lockout.
    pub max_failed_attempts: u32,
    /// How long a triggered lockout lasts.
    pub lockout_duration: Duration,
}

impl Default for LockoutPolicy {
    /// 5 failed attempts, 15 minute lockout.
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            lockout_duration: Duration::minutes(15),
        }
    }
}

impl LockoutPolicy {
    pub fn new(max_failed_attempts: u32, lockout_duration_minutes: i64) -> Self {
        Self {
            max_failed_attempts,
            lockout_duration: Duration::minutes(lockout_duration_minutes),
        }
    }

    pub fn lockout_minutes(&self) -> i64 {
        self.lockout_duration.num_minutes()
    }
}

/// Result of counting a failed login against an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedLogin {
    /// The threshold was reached by this failure and the account is now locked.
    Locked { until: DateTime<Utc> },
    /// Still below the threshold.
    AttemptsRemaining(u32),
}

/// A staff account with its credential and lockout state.
///
/// Remaining lockout time is reported in whole minutes rounded up rather
/// than floored (see [`Account::lockout_minutes_remaining`]): 30 seconds
/// left reads as 1 minute, never 0.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub role_id: String,
    pub failed_login_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Hand-written so the hash never reaches a log line.
impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("password_hash", &"<redacted>")
            .field("role_id", &self.role_id)
            .field("failed_login_attempts", &self.failed_login_attempts)
            .field("locked_until", &self.locked_until)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl Account {
    /// A freshly registered account: counter at zero, never locked.
    pub fn new(
        name: String,
        email: String,
        phone: Option<String>,
        password_hash: String,
        role_id: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            email,
            phone,
            password_hash,
            role_id,
            failed_login_attempts: 0,
            locked_until: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        matches!(self.locked_until, Some(until) if now < until)
    }

    /// Time left on an active lockout, `None` when unlocked.
    pub fn lockout_remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.locked_until
            .filter(|until| now < *until)
            .map(|until| until - now)
    }

    /// Whole minutes left on an active lockout, rounded up so a live lock
    /// never reports zero.
    pub fn lockout_minutes_remaining(&self, now: DateTime<Utc>) -> Option<i64> {
        self.lockout_remaining(now).map(|left| {
            let secs = left.num_seconds().max(1);
            (secs + 59) / 60
        })
    }

    pub fn lock(&mut self, duration: Duration, now: DateTime<Utc>) {
        self.locked_until = Some(now + duration);
        self.updated_at = now;
    }

    /// Clears lockout and the failure counter.
    pub fn unlock(&mut self, now: DateTime<Utc>) {
        self.locked_until = None;
        self.failed_login_attempts = 0;
        self.updated_at = now;
    }

    /// Counts one failed password check.
    ///
    /// Only a successful login resets the counter. Once an elapsed lockout
    /// has left the counter at or above the threshold, the next failure
    /// locks again immediately.
    pub fn record_failed_login(&mut self, policy: &LockoutPolicy, now: DateTime<Utc>) -> FailedLogin {
        self.failed_login_attempts = self.failed_login_attempts.saturating_add(1);
        self.updated_at = now;

        if self.failed_login_attempts >= policy.max_failed_attempts {
            self.lock(policy.lockout_duration, now);
            FailedLogin::Locked {
                until: now + policy.lockout_duration,
            }
        } else {
            FailedLogin::AttemptsRemaining(policy.max_failed_attempts - self.failed_login_attempts)
        }
    }

    /// Resets counter and lockout after a verified password. Returns whether
    /// anything changed, so callers can skip a redundant write.
    pub fn record_successful_login(&mut self, now: DateTime<Utc>) -> bool {
        if self.failed_login_attempts == 0 && self.locked_until.is_none() {
            return false;
        }
        self.unlock(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> Account {
        Account::new(
            "Ana Diaz".to_string(),
            "ana@x.com".to_string(),
            None,
            "$argon2id$stub".to_string(),
            "role-waiter".to_string(),
            Utc::now(),
        )
    }

    #[test]
    fn new_account_is_unlocked_with_zero_counter() {
        let acc = account();
        assert_eq!(acc.failed_login_attempts, 0);
        assert!(acc.locked_until.is_none());
        assert!(!acc.is_locked(Utc::now()));
    }

    #[test]
    fn locks_exactly_at_threshold() {
        let policy = LockoutPolicy::default();
        let mut acc = account();
        let now = Utc::now();

        for expected_left in (1..5).rev() {
            assert_eq!(
                acc.record_failed_login(&policy, now),
                FailedLogin::AttemptsRemaining(expected_left)
            );
            assert!(!acc.is_locked(now));
        }

        let outcome = acc.record_failed_login(&policy, now);
        assert_eq!(
            outcome,
            FailedLogin::Locked {
                until: now + Duration::minutes(15)
            }
        );
        assert!(acc.is_locked(now));
        assert_eq!(acc.lockout_minutes_remaining(now), Some(15));
    }

    #[test]
    fn lock_expires_lazily() {
        let policy = LockoutPolicy::new(1, 15);
        let mut acc = account();
        let now = Utc::now();
        acc.record_failed_login(&policy, now);

        assert!(acc.is_locked(now + Duration::minutes(14)));
        assert!(!acc.is_locked(now + Duration::minutes(15)));
        assert_eq!(acc.lockout_remaining(now + Duration::minutes(16)), None);
    }

    #[test]
    fn remaining_minutes_round_up() {
        let mut acc = account();
        let now = Utc::now();
        acc.lock(Duration::seconds(61), now);
        assert_eq!(acc.lockout_minutes_remaining(now), Some(2));
        assert_eq!(
            acc.lockout_minutes_remaining(now + Duration::seconds(60)),
            Some(1)
        );
    }

    #[test]
    fn failure_after_expired_lock_relocks_immediately() {
        let policy = LockoutPolicy::default();
        let mut acc = account();
        let now = Utc::now();
        for _ in 0..5 {
            acc.record_failed_login(&policy, now);
        }
        let later = now + Duration::minutes(16);
        assert!(!acc.is_locked(later));

        assert_eq!(
            acc.record_failed_login(&policy, later),
            FailedLogin::Locked {
                until: later + Duration::minutes(15)
            }
        );
        assert_eq!(acc.failed_login_attempts, 6);
        assert!(acc.is_locked(later));
    }

    #[test]
    fn success_resets_counter_and_lock() {
        let policy = LockoutPolicy::default();
        let mut acc = account();
        let now = Utc::now();
        acc.record_failed_login(&policy, now);
        acc.record_failed_login(&policy, now);

        assert!(acc.record_successful_login(now));
        assert_eq!(acc.failed_login_attempts, 0);
        assert!(acc.locked_until.is_none());

        // Nothing left to reset.
        assert!(!acc.record_successful_login(now));
    }

    #[test]
    fn debug_redacts_password_hash() {
        let rendered = format!("{:?}", account());
        assert!(!rendered.contains("$argon2id$stub"));
        assert!(rendered.contains("<redacted>"));
    }
}
