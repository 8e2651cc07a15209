//! Authentication and user profiles
//!
//! Handles signup, login, session tokens, and the persisted user records,
//! including the online/offline status column written by the presence
//! tracker. All user data lives in the SQLite database.

use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{PresenceStatus, Session, UserInfo};

pub mod middleware;

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 30;
const PASSWORD_MIN: usize = 6;

type UserRow = (String, String, String, String, String, String);

fn user_info_from_row(
    (id, email, username, profile_pic, status, created_at): UserRow,
) -> UserInfo {
    UserInfo {
        id,
        email,
        username,
        profile_pic,
        status: PresenceStatus::from_db(&status),
        created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
    }
}

/// Auth manager: credential checks, session tokens, profile records.
pub struct AuthManager {
    pool: SqlitePool,
    session_ttl: chrono::Duration,
    /// In-memory session cache
    sessions: RwLock<HashMap<String, Session>>,
}

impl AuthManager {
    /// Create a new auth manager over an existing pool.
    pub async fn new(pool: SqlitePool, session_ttl_days: i64) -> Result<Self> {
        let manager = Self {
            pool,
            session_ttl: chrono::Duration::days(session_ttl_days),
            sessions: RwLock::new(HashMap::new()),
        };

        manager.init_db().await?;

        info!("[Auth] Initialized");

        Ok(manager)
    }

    async fn init_db(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                username TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                profile_pic TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'offline',
                created_at TEXT NOT NULL,
                last_login TEXT,
                is_active INTEGER DEFAULT 1
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn validate_signup(email: &str, username: &str, password: &str) -> Result<()> {
        if username.len() < USERNAME_MIN || username.len() > USERNAME_MAX {
            return Err(anyhow!("Username must be 3-30 characters"));
        }
        if !email.contains('@') || !email.contains('.') {
            return Err(anyhow!("Please enter a valid email address"));
        }
        if password.len() < PASSWORD_MIN {
            return Err(anyhow!("Password must be at least 6 characters"));
        }
        Ok(())
    }

    /// Register a new user and open their first session.
    pub async fn signup(
        &self,
        email: String,
        username: String,
        password: String,
    ) -> Result<(UserInfo, Session)> {
        let email = email.trim().to_lowercase();
        let username = username.trim().to_string();
        Self::validate_signup(&email, &username, &password)?;

        let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(anyhow!("Email already exists"));
        }

        let existing: Option<(String,)> =
            sqlx::query_as("SELECT id FROM users WHERE username = ?")
                .bind(&username)
                .fetch_optional(&self.pool)
                .await?;
        if existing.is_some() {
            return Err(anyhow!("Username already exists"));
        }

        let password_hash = hash(&password, DEFAULT_COST).context("Failed to hash password")?;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        // New users land straight in the app, so they start online.
        sqlx::query(
            "INSERT INTO users (id, email, username, password_hash, profile_pic, status, created_at, is_active) \
             VALUES (?, ?, ?, ?, '', 'online', ?, 1)",
        )
        .bind(&id)
        .bind(&email)
        .bind(&username)
        .bind(&password_hash)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        let session = self.create_session(&id).await?;

        info!("[Auth] User registered: {} ({})", username, email);

        Ok((
            UserInfo {
                id,
                email,
                username,
                profile_pic: String::new(),
                status: PresenceStatus::Online,
                created_at: now,
            },
            session,
        ))
    }

    /// Login with email + password; opens a new session.
    pub async fn login(&self, email: String, password: String) -> Result<(UserInfo, Session)> {
        let email = email.trim().to_lowercase();

        let row: Option<(String, String, String, String, String, String)> = sqlx::query_as(
            "SELECT id, email, username, password_hash, profile_pic, created_at \
             FROM users WHERE email = ? AND is_active = 1",
        )
        .bind(&email)
        .fetch_optional(&self.pool)
        .await?;

        let (id, email, username, password_hash, profile_pic, created_at) =
            row.ok_or_else(|| anyhow!("Invalid email or password"))?;

        let valid = verify(&password, &password_hash).context("Failed to verify password")?;
        if !valid {
            warn!("[Auth] Failed login attempt for {}", email);
            return Err(anyhow!("Invalid email or password"));
        }

        let now = Utc::now();
        sqlx::query("UPDATE users SET last_login = ?, status = 'online' WHERE id = ?")
            .bind(now.to_rfc3339())
            .bind(&id)
            .execute(&self.pool)
            .await?;

        let session = self.create_session(&id).await?;

        info!("[Auth] User logged in: {}", username);

        Ok((
            UserInfo {
                id,
                email,
                username,
                profile_pic,
                status: PresenceStatus::Online,
                created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
            },
            session,
        ))
    }

    async fn create_session(&self, user_id: &str) -> Result<Session> {
        let session = Session {
            token: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            created_at: Utc::now(),
            expires_at: Utc::now() + self.session_ttl,
        };

        sqlx::query(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&session.token)
        .bind(&session.user_id)
        .bind(session.created_at.to_rfc3339())
        .bind(session.expires_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        // Cache session
        self.sessions
            .write()
            .await
            .insert(session.token.clone(), session.clone());

        Ok(session)
    }

    /// Validate a session token and resolve the identity behind it.
    ///
    /// This is the connection-time credential check: the WebSocket endpoint
    /// calls it once per connection, before the upgrade.
    pub async fn validate_session(&self, token: &str) -> Result<UserInfo> {
        // Check cache first
        let cached_user_id = {
            let sessions = self.sessions.read().await;
            sessions
                .get(token)
                .filter(|s| s.expires_at > Utc::now())
                .map(|s| s.user_id.clone())
        };
        if let Some(user_id) = cached_user_id {
            return self.get_user(&user_id).await;
        }

        // Fall back to the database
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT user_id, expires_at FROM sessions WHERE token = ?")
                .bind(token)
                .fetch_optional(&self.pool)
                .await?;

        let (user_id, expires_at) = row.ok_or_else(|| anyhow!("Invalid or expired session"))?;
        let expires: DateTime<Utc> = expires_at
            .parse()
            .map_err(|_| anyhow!("Invalid session expiry"))?;
        if expires <= Utc::now() {
            return Err(anyhow!("Invalid or expired session"));
        }

        self.get_user(&user_id).await
    }

    /// Logout: invalidate the session and mark the user offline.
    pub async fn logout(&self, token: &str) -> Result<()> {
        self.sessions.write().await.remove(token);

        let row: Option<(String,)> =
            sqlx::query_as("SELECT user_id FROM sessions WHERE token = ?")
                .bind(token)
                .fetch_optional(&self.pool)
                .await?;

        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;

        if let Some((user_id,)) = row {
            self.set_status(&user_id, PresenceStatus::Offline).await?;
        }

        info!("[Auth] Session invalidated");

        Ok(())
    }

    /// Get user by ID
    pub async fn get_user(&self, user_id: &str) -> Result<UserInfo> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, email, username, profile_pic, status, created_at \
             FROM users WHERE id = ? AND is_active = 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(user_info_from_row)
            .ok_or_else(|| anyhow!("User not found"))
    }

    /// List all other active users, for contact discovery.
    pub async fn list_users(&self, exclude_id: &str) -> Result<Vec<UserInfo>> {
        let rows: Vec<UserRow> = sqlx::query_as(
            "SELECT id, email, username, profile_pic, status, created_at \
             FROM users WHERE is_active = 1 AND id != ? ORDER BY username",
        )
        .bind(exclude_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(user_info_from_row).collect())
    }

    /// Update profile fields; status is never client-writable.
    pub async fn update_profile(
        &self,
        user_id: &str,
        username: Option<String>,
        email: Option<String>,
        profile_pic: Option<String>,
    ) -> Result<UserInfo> {
        let current = self.get_user(user_id).await?;

        let username = username.map(|u| u.trim().to_string()).unwrap_or(current.username);
        let email = email.map(|e| e.trim().to_lowercase()).unwrap_or(current.email);
        let profile_pic = profile_pic.unwrap_or(current.profile_pic);

        if username.len() < USERNAME_MIN || username.len() > USERNAME_MAX {
            return Err(anyhow!("Username must be 3-30 characters"));
        }

        let conflict: Option<(String,)> =
            sqlx::query_as("SELECT id FROM users WHERE username = ? AND id != ?")
                .bind(&username)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        if conflict.is_some() {
            return Err(anyhow!("Username already exists"));
        }

        let conflict: Option<(String,)> =
            sqlx::query_as("SELECT id FROM users WHERE email = ? AND id != ?")
                .bind(&email)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        if conflict.is_some() {
            return Err(anyhow!("Email already exists"));
        }

        sqlx::query("UPDATE users SET username = ?, email = ?, profile_pic = ? WHERE id = ?")
            .bind(&username)
            .bind(&email)
            .bind(&profile_pic)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        self.get_user(user_id).await
    }

    /// Persist a presence transition. Single writer: the presence tracker.
    pub async fn set_status(&self, user_id: &str, status: PresenceStatus) -> Result<()> {
        sqlx::query("UPDATE users SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use tempfile::tempdir;

    async fn test_auth(dir: &std::path::Path) -> AuthManager {
        let pool = db::connect(&dir.join("test.sqlite")).await.unwrap();
        AuthManager::new(pool, 30).await.unwrap()
    }

    #[tokio::test]
    async fn test_signup_login_roundtrip() {
        let dir = tempdir().unwrap();
        let auth = test_auth(dir.path()).await;

        let (user, session) = auth
            .signup("alice@example.com".into(), "alice".into(), "secret123".into())
            .await
            .unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.status, PresenceStatus::Online);

        let resolved = auth.validate_session(&session.token).await.unwrap();
        assert_eq!(resolved.id, user.id);

        auth.logout(&session.token).await.unwrap();
        assert!(auth.validate_session(&session.token).await.is_err());
        assert_eq!(
            auth.get_user(&user.id).await.unwrap().status,
            PresenceStatus::Offline
        );

        let (user2, _) = auth
            .login("alice@example.com".into(), "secret123".into())
            .await
            .unwrap();
        assert_eq!(user2.id, user.id);
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let dir = tempdir().unwrap();
        let auth = test_auth(dir.path()).await;

        auth.signup("alice@example.com".into(), "alice".into(), "secret123".into())
            .await
            .unwrap();

        assert!(auth
            .login("alice@example.com".into(), "wrong".into())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_duplicate_email_and_username_rejected() {
        let dir = tempdir().unwrap();
        let auth = test_auth(dir.path()).await;

        auth.signup("alice@example.com".into(), "alice".into(), "secret123".into())
            .await
            .unwrap();

        assert!(auth
            .signup("alice@example.com".into(), "alice2".into(), "secret123".into())
            .await
            .is_err());
        assert!(auth
            .signup("other@example.com".into(), "alice".into(), "secret123".into())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_signup_validation() {
        let dir = tempdir().unwrap();
        let auth = test_auth(dir.path()).await;

        assert!(auth
            .signup("alice@example.com".into(), "al".into(), "secret123".into())
            .await
            .is_err());
        assert!(auth
            .signup("not-an-email".into(), "alice".into(), "secret123".into())
            .await
            .is_err());
        assert!(auth
            .signup("alice@example.com".into(), "alice".into(), "short".into())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_update_profile_conflicts() {
        let dir = tempdir().unwrap();
        let auth = test_auth(dir.path()).await;

        let (alice, _) = auth
            .signup("alice@example.com".into(), "alice".into(), "secret123".into())
            .await
            .unwrap();
        auth.signup("bob@example.com".into(), "bob".into(), "secret123".into())
            .await
            .unwrap();

        assert!(auth
            .update_profile(&alice.id, Some("bob".into()), None, None)
            .await
            .is_err());

        let updated = auth
            .update_profile(&alice.id, Some("alice2".into()), None, Some("pic.png".into()))
            .await
            .unwrap();
        assert_eq!(updated.username, "alice2");
        assert_eq!(updated.profile_pic, "pic.png");
    }
}
