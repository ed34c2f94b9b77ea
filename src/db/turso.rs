use crate::db::traits::{AccountStore, AttemptLedger, RoleStore};
use crate::types::{AppError, Result};
use crate::users::{Account, LoginAttempt, Permission, Role, RoleName};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{params, Builder, Connection, Database, Row};

/// Default permission catalogue: (name, description, roles granted).
const DEFAULT_PERMISSIONS: &[(&str, &str, &[RoleName])] = &[
    (
        "manage-users",
        "Create accounts, change roles and review login attempts",
        &[RoleName::Admin],
    ),
    ("manage-roles", "Edit roles and their permissions", &[RoleName::Admin]),
    (
        "manage-inventory",
        "Track stock and suppliers",
        &[RoleName::Admin, RoleName::Employee],
    ),
    (
        "manage-menu",
        "Edit dishes, prices and availability",
        &[RoleName::Admin, RoleName::Employee],
    ),
    (
        "view-reports",
        "Read sales and operations reports",
        &[RoleName::Admin, RoleName::Employee],
    ),
    (
        "take-orders",
        "Open and update table orders",
        &[RoleName::Admin, RoleName::Waiter],
    ),
    (
        "manage-tables",
        "Seat guests and change table status",
        &[RoleName::Admin, RoleName::Waiter],
    ),
];

const ACCOUNT_COLUMNS: &str = "id, name, email, phone, password_hash, role_id, \
     failed_login_attempts, locked_until, created_at, updated_at";

/// libSQL-backed store for accounts, roles, permissions and login attempts.
///
/// Holds one connection for its whole life. For `:memory:` databases this is
/// required: every new connection would open a separate, empty database.
pub struct TursoClient {
    _db: Database,
    conn: Connection,
}

impl TursoClient {
    /// Ephemeral in-memory database, schema initialised.
    pub async fn new_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| AppError::Database(format!("Failed to open in-memory database: {}", e)))?;
        Self::from_database(db).await
    }

    /// File-backed SQLite database. Parent directories are created.
    pub async fn new_local(path: &str) -> Result<Self> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AppError::Database(format!("Failed to create database directory: {}", e))
                })?;
            }
        }

        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| AppError::Database(format!("Failed to open database {}: {}", path, e)))?;
        Self::from_database(db).await
    }

    #[cfg(feature = "turso")]
    pub async fn new_remote(url: String, auth_token: String) -> Result<Self> {
        let db = Builder::new_remote(url, auth_token)
            .build()
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Turso: {}", e)))?;
        Self::from_database(db).await
    }

    async fn from_database(db: Database) -> Result<Self> {
        let conn = db
            .connect()
            .map_err(|e| AppError::Database(format!("Failed to get connection: {}", e)))?;

        let client = Self { _db: db, conn };
        client.initialize_schema().await?;

        Ok(client)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    async fn initialize_schema(&self) -> Result<()> {
        let conn = self.connection();

        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| AppError::Database(format!("Failed to enable foreign keys: {}", e)))?;

        // Roles table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS roles (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                description TEXT,
                created_at INTEGER NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create roles table: {}", e)))?;

        // Permissions table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS permissions (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                description TEXT,
                created_at INTEGER NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create permissions table: {}", e)))?;

        // Role/permission grants, one row per pair
        conn.execute(
            "CREATE TABLE IF NOT EXISTS role_permissions (
                role_id TEXT NOT NULL,
                permission_id TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (role_id, permission_id),
                FOREIGN KEY (role_id) REFERENCES roles(id),
                FOREIGN KEY (permission_id) REFERENCES permissions(id)
            )",
            (),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to create role_permissions table: {}", e))
        })?;

        // Users table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                phone TEXT,
                password_hash TEXT NOT NULL,
                role_id TEXT NOT NULL,
                failed_login_attempts INTEGER NOT NULL DEFAULT 0,
                locked_until INTEGER,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                FOREIGN KEY (role_id) REFERENCES roles(id)
            )",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create users table: {}", e)))?;

        // Login attempts (append-only)
        conn.execute(
            "CREATE TABLE IF NOT EXISTS login_attempts (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                success INTEGER NOT NULL,
                ip_address TEXT,
                created_at INTEGER NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create login_attempts table: {}", e)))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_login_attempts_email
             ON login_attempts (email COLLATE NOCASE, created_at)",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create login_attempts index: {}", e)))?;

        self.seed_roles().await
    }

    async fn seed_roles(&self) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        for role in RoleName::ALL {
            self.conn
                .execute(
                    "INSERT OR IGNORE INTO roles (id, name, description, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        uuid::Uuid::new_v4().to_string(),
                        role.as_str(),
                        role.default_description(),
                        now
                    ],
                )
                .await
                .map_err(|e| AppError::Database(format!("Failed to seed role {}: {}", role, e)))?;
        }
        Ok(())
    }

    /// Creates the default permission catalogue and grants. Idempotent.
    pub async fn seed_default_permissions(&self) -> Result<()> {
        for (name, description, roles) in DEFAULT_PERMISSIONS {
            let permission = self.create_permission(name, Some(description)).await?;
            for role_name in *roles {
                let role = self.find_role_by_name(*role_name).await?.ok_or_else(|| {
                    AppError::Database(format!("Seeded role {} is missing", role_name))
                })?;
                self.grant_permission(&role.id, &permission.id).await?;
            }
        }
        tracing::debug!(count = DEFAULT_PERMISSIONS.len(), "default permissions seeded");
        Ok(())
    }

    /// Creates a permission, or returns the existing one with that name.
    pub async fn create_permission(&self, name: &str, description: Option<&str>) -> Result<Permission> {
        self.conn
            .execute(
                "INSERT OR IGNORE INTO permissions (id, name, description, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    uuid::Uuid::new_v4().to_string(),
                    name,
                    description.map(str::to_string),
                    Utc::now().timestamp_millis()
                ],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to create permission: {}", e)))?;

        let mut rows = self
            .conn
            .query(
                "SELECT id, name, description, created_at FROM permissions WHERE name = ?1",
                params![name],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query permission: {}", e)))?;

        match next_row(&mut rows).await? {
            Some(row) => permission_from_row(&row),
            None => Err(AppError::Database(format!(
                "Permission {} vanished after insert",
                name
            ))),
        }
    }

    /// Grants a permission to a role. Returns `false` if it was already granted.
    pub async fn grant_permission(&self, role_id: &str, permission_id: &str) -> Result<bool> {
        let inserted = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO role_permissions (role_id, permission_id, created_at)
                 VALUES (?1, ?2, ?3)",
                params![role_id, permission_id, Utc::now().timestamp_millis()],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to grant permission: {}", e)))?;

        Ok(inserted > 0)
    }

    /// Cheap connectivity check for health endpoints.
    pub async fn ping(&self) -> Result<()> {
        let mut rows = self
            .conn
            .query("SELECT 1", ())
            .await
            .map_err(|e| AppError::Database(format!("Health query failed: {}", e)))?;
        next_row(&mut rows).await?;
        Ok(())
    }

    async fn query_roles(&self, sql: &str, args: impl libsql::params::IntoParams) -> Result<Vec<Role>> {
        let mut rows = self
            .conn
            .query(sql, args)
            .await
            .map_err(|e| AppError::Database(format!("Failed to query roles: {}", e)))?;

        let mut roles = Vec::new();
        while let Some(row) = next_row(&mut rows).await? {
            roles.push(role_from_row(&row)?);
        }
        Ok(roles)
    }

    async fn query_permissions(
        &self,
        sql: &str,
        args: impl libsql::params::IntoParams,
    ) -> Result<Vec<Permission>> {
        let mut rows = self
            .conn
            .query(sql, args)
            .await
            .map_err(|e| AppError::Database(format!("Failed to query permissions: {}", e)))?;

        let mut permissions = Vec::new();
        while let Some(row) = next_row(&mut rows).await? {
            permissions.push(permission_from_row(&row)?);
        }
        Ok(permissions)
    }

    async fn query_account(&self, sql: &str, key: &str) -> Result<Option<Account>> {
        let mut rows = self
            .conn
            .query(sql, params![key])
            .await
            .map_err(|e| AppError::Database(format!("Failed to query user: {}", e)))?;

        match next_row(&mut rows).await? {
            Some(row) => account_from_row(&row).map(Some),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl AccountStore for TursoClient {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE email = ?1 COLLATE NOCASE");
        self.query_account(&sql, email.trim()).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = ?1");
        self.query_account(&sql, id).await
    }

    async fn insert_account(&self, account: &Account) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO users (id, name, email, phone, password_hash, role_id,
                    failed_login_attempts, locked_until, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    account.id.as_str(),
                    account.name.as_str(),
                    account.email.as_str(),
                    account.phone.clone(),
                    account.password_hash.as_str(),
                    account.role_id.as_str(),
                    i64::from(account.failed_login_attempts),
                    account.locked_until.map(|t| t.timestamp_millis()),
                    account.created_at.timestamp_millis(),
                    account.updated_at.timestamp_millis()
                ],
            )
            .await
            .map_err(|e| {
                let message = e.to_string();
                if message.contains("UNIQUE constraint failed") {
                    AppError::Validation(format!("Email {} is already registered", account.email))
                } else {
                    AppError::Database(format!("Failed to create user: {}", message))
                }
            })?;

        Ok(())
    }

    async fn update_account(&self, account: &Account) -> Result<()> {
        let updated = self
            .conn
            .execute(
                "UPDATE users SET name = ?2, phone = ?3, role_id = ?4,
                    failed_login_attempts = ?5, locked_until = ?6, updated_at = ?7
                 WHERE id = ?1",
                params![
                    account.id.as_str(),
                    account.name.as_str(),
                    account.phone.clone(),
                    account.role_id.as_str(),
                    i64::from(account.failed_login_attempts),
                    account.locked_until.map(|t| t.timestamp_millis()),
                    account.updated_at.timestamp_millis()
                ],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to update user: {}", e)))?;

        if updated == 0 {
            return Err(AppError::NotFound(format!("User {} not found", account.id)));
        }
        Ok(())
    }

    async fn update_role(&self, id: &str, role_id: &str, updated_at: DateTime<Utc>) -> Result<()> {
        let updated = self
            .conn
            .execute(
                "UPDATE users SET role_id = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, role_id, updated_at.timestamp_millis()],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to update user role: {}", e)))?;

        if updated == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl RoleStore for TursoClient {
    async fn list_roles(&self) -> Result<Vec<Role>> {
        self.query_roles(
            "SELECT id, name, description, created_at FROM roles ORDER BY name",
            (),
        )
        .await
    }

    async fn find_role_by_id(&self, id: &str) -> Result<Option<Role>> {
        let mut roles = self
            .query_roles(
                "SELECT id, name, description, created_at FROM roles WHERE id = ?1",
                params![id],
            )
            .await?;
        Ok(roles.pop())
    }

    async fn find_role_by_name(&self, name: RoleName) -> Result<Option<Role>> {
        let mut roles = self
            .query_roles(
                "SELECT id, name, description, created_at FROM roles WHERE name = ?1",
                params![name.as_str()],
            )
            .await?;
        Ok(roles.pop())
    }

    async fn list_permissions(&self) -> Result<Vec<Permission>> {
        self.query_permissions(
            "SELECT id, name, description, created_at FROM permissions ORDER BY name",
            (),
        )
        .await
    }

    async fn permissions_for_role(&self, role_id: &str) -> Result<Vec<Permission>> {
        self.query_permissions(
            "SELECT DISTINCT p.id, p.name, p.description, p.created_at
             FROM permissions p
             JOIN role_permissions rp ON rp.permission_id = p.id
             WHERE rp.role_id = ?1
             ORDER BY p.name",
            params![role_id],
        )
        .await
    }
}

#[async_trait]
impl AttemptLedger for TursoClient {
    async fn record_attempt(&self, attempt: &LoginAttempt) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO login_attempts (id, email, success, ip_address, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    attempt.id.as_str(),
                    attempt.email.as_str(),
                    i64::from(attempt.success),
                    attempt.ip_address.clone(),
                    attempt.created_at.timestamp_millis()
                ],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to record login attempt: {}", e)))?;

        Ok(())
    }

    async fn attempts_for_email(&self, email: &str, limit: u32) -> Result<Vec<LoginAttempt>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, email, success, ip_address, created_at
                 FROM login_attempts
                 WHERE email = ?1 COLLATE NOCASE
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
                params![email.trim(), i64::from(limit)],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query login attempts: {}", e)))?;

        let mut attempts = Vec::new();
        while let Some(row) = next_row(&mut rows).await? {
            attempts.push(LoginAttempt {
                id: row.get(0).map_err(|e| AppError::Database(e.to_string()))?,
                email: row.get(1).map_err(|e| AppError::Database(e.to_string()))?,
                success: row
                    .get::<i64>(2)
                    .map_err(|e| AppError::Database(e.to_string()))?
                    != 0,
                ip_address: row.get(3).map_err(|e| AppError::Database(e.to_string()))?,
                created_at: millis_to_datetime(
                    row.get::<i64>(4)
                        .map_err(|e| AppError::Database(e.to_string()))?,
                )?,
            });
        }
        Ok(attempts)
    }
}

async fn next_row(rows: &mut libsql::Rows) -> Result<Option<Row>> {
    rows.next()
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

fn millis_to_datetime(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| AppError::Database(format!("Timestamp {} out of range", millis)))
}

fn account_from_row(row: &Row) -> Result<Account> {
    let failed: i64 = row.get(6).map_err(|e| AppError::Database(e.to_string()))?;
    let locked_until: Option<i64> = row.get(7).map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Account {
        id: row.get(0).map_err(|e| AppError::Database(e.to_string()))?,
        name: row.get(1).map_err(|e| AppError::Database(e.to_string()))?,
        email: row.get(2).map_err(|e| AppError::Database(e.to_string()))?,
        phone: row.get(3).map_err(|e| AppError::Database(e.to_string()))?,
        password_hash: row.get(4).map_err(|e| AppError::Database(e.to_string()))?,
        role_id: row.get(5).map_err(|e| AppError::Database(e.to_string()))?,
        failed_login_attempts: u32::try_from(failed).unwrap_or(0),
        locked_until: locked_until.map(millis_to_datetime).transpose()?,
        created_at: millis_to_datetime(
            row.get::<i64>(8)
                .map_err(|e| AppError::Database(e.to_string()))?,
        )?,
        updated_at: millis_to_datetime(
            row.get::<i64>(9)
                .map_err(|e| AppError::Database(e.to_string()))?,
        )?,
    })
}

fn role_from_row(row: &Row) -> Result<Role> {
    let name: String = row.get(1).map_err(|e| AppError::Database(e.to_string()))?;
    Role::from_parts(
        row.get(0).map_err(|e| AppError::Database(e.to_string()))?,
        &name,
        row.get(2).map_err(|e| AppError::Database(e.to_string()))?,
        millis_to_datetime(
            row.get::<i64>(3)
                .map_err(|e| AppError::Database(e.to_string()))?,
        )?,
    )
    .map_err(|e| AppError::Database(format!("Stored role '{}' is invalid: {}", name, e)))
}

fn permission_from_row(row: &Row) -> Result<Permission> {
    Ok(Permission {
        id: row.get(0).map_err(|e| AppError::Database(e.to_string()))?,
        name: row.get(1).map_err(|e| AppError::Database(e.to_string()))?,
        description: row.get(2).map_err(|e| AppError::Database(e.to_string()))?,
        created_at: millis_to_datetime(
            row.get::<i64>(3)
                .map_err(|e| AppError::Database(e.to_string()))?,
        )?,
    })
}
