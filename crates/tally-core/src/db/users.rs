//! User operations

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::RngCore;
use rusqlite::{params, OptionalExtension};
use sha2::{Digest, Sha256};
use tracing::info;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::User;

/// Derive the stable user id for an email address
///
/// The first 32 hex chars of SHA-256 over the trimmed, lowercased email.
pub fn user_id_for_email(email: &str) -> String {
    let normalized = email.trim().to_lowercase();
    let digest = Sha256::digest(normalized.as_bytes());
    hex::encode(digest)[..32].to_string()
}

fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| Error::Auth(format!("Failed to create salt: {}", e)))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| Error::Auth(format!("Failed to hash password: {}", e)))
}

impl Database {
    /// Create a user and their default settings
    ///
    /// Fails with `Error::Conflict` if the email is already registered.
    pub fn create_user(&self, email: &str, password: &str, name: &str) -> Result<User> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(Error::InvalidData(format!("Invalid email: {}", email)));
        }
        if password.is_empty() {
            return Err(Error::InvalidData("Password must not be empty".into()));
        }

        if self.get_user_by_email(&email)?.is_some() {
            return Err(Error::Conflict(format!("User {} already exists", email)));
        }

        let id = user_id_for_email(&email);
        let password_hash = hash_password(password)?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO users (id, email, password_hash, name) VALUES (?, ?, ?, ?)",
            params![id, email, password_hash, name.trim()],
        )?;
        tx.execute("INSERT INTO user_settings (user_id) VALUES (?)", params![id])?;
        tx.commit()?;

        info!(user_id = %id, "Created user");

        self.get_user(&id)?
            .ok_or_else(|| Error::NotFound(format!("User {}", id)))
    }

    /// Get a user by ID
    pub fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT id, email, password_hash, name, created_at FROM users WHERE id = ?",
                params![id],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Get a user by email (case-insensitive)
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT id, email, password_hash, name, created_at FROM users WHERE email = ?",
                params![email.trim().to_lowercase()],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// List all users
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, email, password_hash, name, created_at FROM users ORDER BY created_at, email",
        )?;
        let users = stmt
            .query_map([], Self::row_to_user)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// Check a password against a user's stored hash
    pub fn verify_password(&self, user: &User, password: &str) -> bool {
        match PasswordHash::new(&user.password_hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    /// Look up a user and verify the password in one step
    pub fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>> {
        Ok(self
            .get_user_by_email(email)?
            .filter(|user| self.verify_password(user, password)))
    }

    fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
        let created_at: String = row.get(4)?;
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            password_hash: row.get(2)?,
            name: row.get(3)?,
            created_at: parse_datetime(&created_at),
        })
    }
}
