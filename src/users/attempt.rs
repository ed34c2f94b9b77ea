use chrono::{DateTime, Utc};

/// One row of the append-only login audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginAttempt {
    pub id: String,
    /// The email exactly as submitted; not linked to an account.
    pub email: String,
    pub success: bool,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LoginAttempt {
    pub fn new(email: &str, success: bool, ip_address: Option<&str>, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            success,
            ip_address: ip_address.map(str::to_string),
            created_at: now,
        }
    }
}
