//! SQLite-backed account storage.
//!
//! One row per local user. Upstream passwords arrive already encrypted; the
//! store never handles plaintext secrets.

use super::{Account, StoreError};
use crate::credentials::EncryptedSecret;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Account storage backed by SQLite.
///
/// # Schema
/// ```sql
/// CREATE TABLE users (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     username TEXT NOT NULL,
///     password_hash TEXT NOT NULL,          -- Argon2id PHC string
///     bitbucket_username TEXT,
///     bitbucket_password TEXT,              -- Encrypted (optional)
///     bitbucket_password_nonce TEXT,        -- Nonce for bitbucket_password
///     created_at TEXT NOT NULL,             -- ISO 8601 timestamp
///     updated_at TEXT NOT NULL,             -- ISO 8601 timestamp
///     CONSTRAINT username_unique UNIQUE(username)
/// );
/// ```
///
/// # Thread Safety
/// - Connection is wrapped in Mutex for safe concurrent access
/// - Every mutation is a single statement, so each update is atomic
pub struct AccountStore {
    conn: Mutex<Connection>,
}

const SELECT_ACCOUNT: &str = r#"
    SELECT id, username, password_hash,
           bitbucket_username, bitbucket_password, bitbucket_password_nonce,
           created_at, updated_at
    FROM users
"#;

impl AccountStore {
    /// Creates or opens an account store.
    ///
    /// # Arguments
    /// * `db_path` - Path to SQLite database file (":memory:" for tests)
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)
            .map_err(|e| StoreError::Database(format!("Failed to open database: {}", e)))?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                bitbucket_username TEXT,
                bitbucket_password TEXT,
                bitbucket_password_nonce TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                CONSTRAINT username_unique UNIQUE(username)
            )
            "#,
            [],
        )
        .map_err(|e| StoreError::Database(format!("Failed to create users table: {}", e)))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("Account store lock poisoned".to_string()))
    }

    /// Inserts a new account.
    ///
    /// # Returns
    /// * `Ok(Account)` - The created row, upstream fields empty
    /// * `Err(StoreError::UsernameTaken)` - Uniqueness constraint violated
    pub fn create(&self, username: &str, password_hash: &str) -> Result<Account, StoreError> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO users (username, password_hash, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![username, password_hash, now, now],
        )
        .map_err(|e| match e.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => StoreError::UsernameTaken,
            _ => StoreError::Database(format!("Failed to insert account: {}", e)),
        })?;

        let id = conn.last_insert_rowid();
        query_one(&conn, "WHERE id = ?1", params![id])?
            .ok_or_else(|| StoreError::Database("Inserted account not found".to_string()))
    }

    /// Looks up an account by id.
    pub fn find_by_id(&self, id: i64) -> Result<Option<Account>, StoreError> {
        let conn = self.conn()?;
        query_one(&conn, "WHERE id = ?1", params![id])
    }

    /// Looks up an account by username (exact match).
    pub fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let conn = self.conn()?;
        query_one(&conn, "WHERE username = ?1", params![username])
    }

    /// Overwrites the local password hash.
    ///
    /// # Returns
    /// * `Ok(true)` - Account updated
    /// * `Ok(false)` - No account with that id
    pub fn update_password_hash(&self, id: i64, password_hash: &str) -> Result<bool, StoreError> {
        let now = Utc::now().to_rfc3339();
        let rows_affected = self
            .conn()?
            .execute(
                "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
                params![password_hash, now, id],
            )
            .map_err(|e| StoreError::Database(format!("Failed to update password: {}", e)))?;

        Ok(rows_affected > 0)
    }

    /// Overwrites both upstream credential fields in one statement.
    ///
    /// # Returns
    /// * `Ok(true)` - Account updated
    /// * `Ok(false)` - No account with that id
    pub fn set_upstream_credentials(
        &self,
        id: i64,
        upstream_username: &str,
        upstream_password: &EncryptedSecret,
    ) -> Result<bool, StoreError> {
        let now = Utc::now().to_rfc3339();
        let rows_affected = self
            .conn()?
            .execute(
                r#"
                UPDATE users SET
                    bitbucket_username = ?1,
                    bitbucket_password = ?2,
                    bitbucket_password_nonce = ?3,
                    updated_at = ?4
                WHERE id = ?5
                "#,
                params![
                    upstream_username,
                    upstream_password.ciphertext,
                    upstream_password.nonce,
                    now,
                    id,
                ],
            )
            .map_err(|e| {
                StoreError::Database(format!("Failed to update upstream credentials: {}", e))
            })?;

        Ok(rows_affected > 0)
    }

    /// Number of stored accounts
    pub fn count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .map_err(|e| StoreError::Database(format!("Failed to count accounts: {}", e)))?;

        Ok(usize::try_from(count).unwrap_or(0))
    }
}

fn query_one(
    conn: &Connection,
    filter: &str,
    params: impl rusqlite::Params,
) -> Result<Option<Account>, StoreError> {
    let sql = format!("{} {}", SELECT_ACCOUNT, filter);

    conn.query_row(&sql, params, row_to_account)
        .optional()
        .map_err(|e| StoreError::Database(format!("Failed to read account: {}", e)))?
        .transpose()
}

/// Maps a row to an Account; timestamp parse errors surface as StoreError.
fn row_to_account(row: &Row<'_>) -> rusqlite::Result<Result<Account, StoreError>> {
    let ciphertext: Option<String> = row.get(4)?;
    let nonce: Option<String> = row.get(5)?;
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;

    let timestamps = parse_timestamp(&created_at)
        .and_then(|created| Ok((created, parse_timestamp(&updated_at)?)));
    let (created_at, updated_at) = match timestamps {
        Ok(parsed) => parsed,
        Err(e) => return Ok(Err(e)),
    };

    Ok(Ok(Account {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        upstream_username: row.get(3)?,
        upstream_password: match (ciphertext, nonce) {
            (Some(ciphertext), Some(nonce)) => Some(EncryptedSecret { ciphertext, nonce }),
            _ => None,
        },
        created_at,
        updated_at,
    }))
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Database(format!("Failed to parse timestamp '{}': {}", value, e)))
}
