//! SQLite database operations for users and OAuth accounts

use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use super::models::{OAuthAccount, User};

const USER_COLUMNS: &str = "id, email, hashed_password, is_active, is_superuser, is_verified";

/// Database connection wrapper
#[derive(Clone)]
pub struct AuthDatabase {
    conn: Arc<Mutex<Connection>>,
}

impl AuthDatabase {
    /// Open (or create) a database file and initialize tables
    pub fn new(path: &str) -> SqliteResult<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Create in-memory database (for testing)
    pub fn in_memory() -> SqliteResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> SqliteResult<Self> {
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_tables()?;
        Ok(db)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock leaves SQLite itself consistent.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn init_tables(&self) -> SqliteResult<()> {
        let conn = self.conn();

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                hashed_password TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                is_superuser INTEGER NOT NULL DEFAULT 0,
                is_verified INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS oauth_accounts (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                oauth_name TEXT NOT NULL,
                access_token TEXT NOT NULL,
                expires_at INTEGER,
                refresh_token TEXT,
                account_id TEXT NOT NULL,
                account_email TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                UNIQUE(oauth_name, account_id)
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON users(lower(email));
            CREATE INDEX IF NOT EXISTS idx_oauth_user ON oauth_accounts(user_id);
            "#,
        )?;

        Ok(())
    }

    // ==================== User Operations ====================

    pub fn create_user(&self, user: &User) -> SqliteResult<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO users (id, email, hashed_password, is_active, is_superuser, is_verified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.id.to_string(),
                user.email,
                user.hashed_password,
                user.is_active,
                user.is_superuser,
                user.is_verified,
            ],
        )?;
        Ok(())
    }

    pub fn get_user(&self, id: Uuid) -> SqliteResult<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
            params![id.to_string()],
            user_from_row,
        )
        .optional()
    }

    /// Email lookup is case-insensitive
    pub fn get_user_by_email(&self, email: &str) -> SqliteResult<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {} FROM users WHERE lower(email) = lower(?1)",
                USER_COLUMNS
            ),
            params![email],
            user_from_row,
        )
        .optional()
    }

    /// Overwrite every mutable column of a user; returns false when no row matched
    pub fn update_user(&self, user: &User) -> SqliteResult<bool> {
        let conn = self.conn();
        let updated = conn.execute(
            "UPDATE users SET email = ?1, hashed_password = ?2, is_active = ?3,
                 is_superuser = ?4, is_verified = ?5
             WHERE id = ?6",
            params![
                user.email,
                user.hashed_password,
                user.is_active,
                user.is_superuser,
                user.is_verified,
                user.id.to_string(),
            ],
        )?;
        Ok(updated > 0)
    }

    pub fn delete_user(&self, id: Uuid) -> SqliteResult<bool> {
        let conn = self.conn();
        let deleted = conn.execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])?;
        Ok(deleted > 0)
    }

    // ==================== OAuth Operations ====================

    pub fn get_user_by_oauth_account(
        &self,
        oauth_name: &str,
        account_id: &str,
    ) -> SqliteResult<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT u.id, u.email, u.hashed_password, u.is_active, u.is_superuser, u.is_verified
             FROM users u JOIN oauth_accounts o ON o.user_id = u.id
             WHERE o.oauth_name = ?1 AND o.account_id = ?2",
            params![oauth_name, account_id],
            user_from_row,
        )
        .optional()
    }

    pub fn add_oauth_account(&self, account: &OAuthAccount) -> SqliteResult<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO oauth_accounts (id, user_id, oauth_name, access_token, expires_at,
                 refresh_token, account_id, account_email)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                account.id.to_string(),
                account.user_id.to_string(),
                account.oauth_name,
                account.access_token,
                account.expires_at,
                account.refresh_token,
                account.account_id,
                account.account_email,
            ],
        )?;
        Ok(())
    }

    /// Refresh the tokens stored for an existing link
    pub fn update_oauth_account(&self, account: &OAuthAccount) -> SqliteResult<bool> {
        let conn = self.conn();
        let updated = conn.execute(
            "UPDATE oauth_accounts SET access_token = ?1, expires_at = ?2, refresh_token = ?3,
                 account_email = ?4
             WHERE oauth_name = ?5 AND account_id = ?6",
            params![
                account.access_token,
                account.expires_at,
                account.refresh_token,
                account.account_email,
                account.oauth_name,
                account.account_id,
            ],
        )?;
        Ok(updated > 0)
    }

    pub fn oauth_accounts_for_user(&self, user_id: Uuid) -> SqliteResult<Vec<OAuthAccount>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, oauth_name, access_token, expires_at, refresh_token,
                 account_id, account_email
             FROM oauth_accounts WHERE user_id = ?1 ORDER BY oauth_name",
        )?;

        let rows = stmt.query_map(params![user_id.to_string()], |row| {
            Ok(OAuthAccount {
                id: uuid_column(row, 0)?,
                user_id: uuid_column(row, 1)?,
                oauth_name: row.get(2)?,
                access_token: row.get(3)?,
                expires_at: row.get(4)?,
                refresh_token: row.get(5)?,
                account_id: row.get(6)?,
                account_email: row.get(7)?,
            })
        })?;
        let accounts = rows.collect::<SqliteResult<Vec<_>>>()?;
        Ok(accounts)
    }
}

fn uuid_column(row: &Row<'_>, idx: usize) -> SqliteResult<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn user_from_row(row: &Row<'_>) -> SqliteResult<User> {
    Ok(User {
        id: uuid_column(row, 0)?,
        email: row.get(1)?,
        hashed_password: row.get(2)?,
        is_active: row.get(3)?,
        is_superuser: row.get(4)?,
        is_verified: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user(email: &str) -> User {
        User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            hashed_password: "hash123".to_string(),
            is_active: true,
            is_superuser: false,
            is_verified: false,
        }
    }

    fn test_account(user_id: Uuid, account_id: &str) -> OAuthAccount {
        OAuthAccount {
            id: Uuid::new_v4(),
            user_id,
            oauth_name: "google".to_string(),
            access_token: "access-1".to_string(),
            expires_at: Some(1_700_000_000),
            refresh_token: None,
            account_id: account_id.to_string(),
            account_email: "oauth@example.com".to_string(),
        }
    }

    #[test]
    fn test_create_and_find_user() {
        let db = AuthDatabase::in_memory().unwrap();
        let user = test_user("test@example.com");
        db.create_user(&user).unwrap();

        let found = db.get_user_by_email("TEST@example.com").unwrap().unwrap();
        assert_eq!(found, user);
        assert_eq!(db.get_user(user.id).unwrap(), Some(user));
        assert!(db.get_user(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_email_unique_ignoring_case() {
        let db = AuthDatabase::in_memory().unwrap();
        db.create_user(&test_user("dup@example.com")).unwrap();
        assert!(db.create_user(&test_user("DUP@example.com")).is_err());
    }

    #[test]
    fn test_update_and_delete_user() {
        let db = AuthDatabase::in_memory().unwrap();
        let mut user = test_user("verify@example.com");
        db.create_user(&user).unwrap();

        user.is_verified = true;
        user.email = "new@example.com".to_string();
        assert!(db.update_user(&user).unwrap());

        let found = db.get_user(user.id).unwrap().unwrap();
        assert!(found.is_verified);
        assert_eq!(found.email, "new@example.com");

        assert!(db.delete_user(user.id).unwrap());
        assert!(!db.delete_user(user.id).unwrap());
        assert!(db.get_user(user.id).unwrap().is_none());
    }

    #[test]
    fn test_oauth_account_lookup_and_refresh() {
        let db = AuthDatabase::in_memory().unwrap();
        let user = test_user("oauth@example.com");
        db.create_user(&user).unwrap();

        let mut account = test_account(user.id, "google-42");
        db.add_oauth_account(&account).unwrap();

        let found = db.get_user_by_oauth_account("google", "google-42").unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
        assert!(db.get_user_by_oauth_account("google", "other").unwrap().is_none());

        account.access_token = "access-2".to_string();
        account.refresh_token = Some("refresh".to_string());
        assert!(db.update_oauth_account(&account).unwrap());

        let accounts = db.oauth_accounts_for_user(user.id).unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].access_token, "access-2");
        assert_eq!(accounts[0].refresh_token.as_deref(), Some("refresh"));
    }

    #[test]
    fn test_deleting_user_removes_oauth_accounts() {
        let db = AuthDatabase::in_memory().unwrap();
        let user = test_user("gone@example.com");
        db.create_user(&user).unwrap();
        db.add_oauth_account(&test_account(user.id, "google-7")).unwrap();

        db.delete_user(user.id).unwrap();
        assert!(db.oauth_accounts_for_user(user.id).unwrap().is_empty());
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.db");
        let path = path.to_str().unwrap();

        let user = test_user("disk@example.com");
        AuthDatabase::new(path).unwrap().create_user(&user).unwrap();

        let reopened = AuthDatabase::new(path).unwrap();
        assert_eq!(reopened.get_user(user.id).unwrap(), Some(user));
    }
}
