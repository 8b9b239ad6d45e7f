//! User model and CRUD operations.

use anyhow::{Context, Result};
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Role assigned to every account at registration.
pub const ROLE_READER: &str = "reader";
/// Role for accounts allowed to author editorial content. Stored but not
/// yet consulted by any route; post authorship is open to all accounts.
#[allow(dead_code)]
pub const ROLE_WRITER: &str = "writer";
/// Role for site administrators. Stored but not yet consulted.
#[allow(dead_code)]
pub const ROLE_ADMIN: &str = "admin";

/// User record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub bio: String,
    pub avatar: String,
    pub created: DateTime<Utc>,
    pub login: Option<DateTime<Utc>>,
}

/// Input for creating a new user.
#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub avatar: Option<String>,
}

impl User {
    /// Check if this user is an administrator.
    #[allow(dead_code)]
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    /// Check if this user holds the writer role.
    #[allow(dead_code)]
    pub fn is_writer(&self) -> bool {
        self.role == ROLE_WRITER
    }

    /// Find a user by ID.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch user by id")?;

        Ok(user)
    }

    /// Find a user by username.
    pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(pool)
            .await
            .context("failed to fetch user by username")?;

        Ok(user)
    }

    /// Find a user by email.
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await
            .context("failed to fetch user by email")?;

        Ok(user)
    }

    /// Find a user by login credential: matches either email or username.
    pub async fn find_by_credential(pool: &PgPool, credential: &str) -> Result<Option<Self>> {
        let user =
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1 OR username = $1")
                .bind(credential)
                .fetch_optional(pool)
                .await
                .context("failed to fetch user by credential")?;

        Ok(user)
    }

    /// Create a new user. Only the Argon2 hash of the password is stored.
    pub async fn create(pool: &PgPool, input: CreateUser) -> Result<Self> {
        let id = Uuid::now_v7();
        let password_hash = hash_password(&input.password)?;
        let avatar = input.avatar.unwrap_or_default();

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, password_hash, role, avatar)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.username)
        .bind(&input.email)
        .bind(&password_hash)
        .bind(ROLE_READER)
        .bind(&avatar)
        .fetch_one(pool)
        .await
        .context("failed to create user")?;

        Ok(user)
    }

    /// Update the user's last login time.
    pub async fn touch_login(pool: &PgPool, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE users SET login = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .context("failed to update login time")?;

        Ok(())
    }

    /// Verify a password against this user's hash.
    pub fn verify_password(&self, password: &str) -> bool {
        if self.password_hash.is_empty() {
            return false;
        }

        let Ok(parsed_hash) = PasswordHash::new(&self.password_hash) else {
            return false;
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?;

    Ok(hash.to_string())
}
