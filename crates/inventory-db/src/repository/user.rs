//! # User Repository
//!
//! Staff accounts and the login log. Passwords arrive already hashed; this
//! layer stores the hash and never returns it through serde.

use chrono::Utc;
use inventory_core::validation::{clamp_limit, validate_new_user, validate_user_update};
use inventory_core::{LoginLog, NewUser, User, UserUpdate, ValidationError};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Creates an account. A taken email is a constraint violation.
    pub async fn create(&self, user: &NewUser) -> DbResult<User> {
        validate_new_user(user)?;
        let now = Utc::now();

        let created: User = sqlx::query_as(
            r#"
            INSERT INTO users (first_name, last_name, email, password_hash, role, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            RETURNING *
            "#,
        )
        .bind(user.first_name.trim())
        .bind(user.last_name.as_deref())
        .bind(normalized_email(&user.email))
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        info!(user_id = created.id, role = ?created.role, "User created");
        Ok(created)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<User>> {
        let user = sqlx::query_as("SELECT * FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Email lookup, case-insensitive.
    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as("SELECT * FROM users WHERE email = ?1")
            .bind(normalized_email(email))
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn list(&self) -> DbResult<Vec<User>> {
        let users = sqlx::query_as("SELECT * FROM users ORDER BY first_name, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    pub async fn update(&self, id: i64, user: &UserUpdate) -> DbResult<User> {
        validate_user_update(user)?;

        let updated: Option<User> = sqlx::query_as(
            r#"
            UPDATE users
            SET first_name = ?2,
                last_name = ?3,
                email = ?4,
                role = ?5,
                updated_at = ?6
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user.first_name.trim())
        .bind(user.last_name.as_deref())
        .bind(normalized_email(&user.email))
        .bind(user.role)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| DbError::not_found("User", id))
    }

    pub async fn update_password(&self, id: i64, password_hash: &str) -> DbResult<()> {
        if password_hash.is_empty() {
            return Err(ValidationError::required("password_hash").into());
        }

        let result = sqlx::query("UPDATE users SET password_hash = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(password_hash)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        info!(user_id = id, "Password updated");
        Ok(())
    }

    /// Deletes an account. Documents keep their rows with the user cleared;
    /// the login log goes with the account.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        info!(user_id = id, "User deleted");
        Ok(())
    }

    pub async fn log_login(&self, user_id: i64, email: &str) -> DbResult<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO login_logs (user_id, email, login_date) VALUES (?1, ?2, ?3) RETURNING id",
        )
        .bind(user_id)
        .bind(normalized_email(email))
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        debug!(user_id, "Login recorded");
        Ok(id)
    }

    /// Most recent logins first.
    pub async fn login_logs(&self, limit: i64) -> DbResult<Vec<LoginLog>> {
        let logs = sqlx::query_as("SELECT * FROM login_logs ORDER BY login_date DESC, id DESC LIMIT ?1")
            .bind(clamp_limit(limit))
            .fetch_all(&self.pool)
            .await?;
        Ok(logs)
    }
}

fn normalized_email(email: &str) -> String {
    email.trim().to_lowercase()
}
