//! Credential store: user records behind a pluggable trait plus the
//! argon2 password hashing helpers.

use std::collections::HashMap;
use std::sync::RwLock;

use argon2::{
    password_hash::{
        Error as PasswordHashError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    },
    Argon2,
};
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use thiserror::Error;
use uuid::Uuid;

/// A registered user. Owned exclusively by the credential store; only
/// summaries without the hash cross the API boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum UserStoreError {
    #[error("Username already registered")]
    DuplicateUsername,
}

/// Backing store for user records.
///
/// Constructed at startup and injected into the app state, so the storage
/// technology stays swappable and testable.
pub trait UserStore: Send + Sync {
    /// Insert a new user. The uniqueness check and the insert are one
    /// atomic operation; concurrent registrations of the same username
    /// cannot both succeed.
    fn insert(&self, user: NewUser) -> Result<User, UserStoreError>;

    fn find(&self, username: &str) -> Option<User>;
}

/// In-process store keyed by username.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for MemoryUserStore {
    fn insert(&self, user: NewUser) -> Result<User, UserStoreError> {
        let mut users = self.users.write().unwrap();
        if users.contains_key(&user.username) {
            return Err(UserStoreError::DuplicateUsername);
        }
        let record = User {
            id: Uuid::new_v4(),
            username: user.username.clone(),
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        users.insert(user.username, record.clone());
        Ok(record)
    }

    fn find(&self, username: &str) -> Option<User> {
        self.users.read().unwrap().get(username).cloned()
    }
}

pub fn hash_password(password: &str) -> Result<String, PasswordHashError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Check a candidate password against a stored hash. `Ok(false)` means the
/// password did not match; `Err` means the stored hash is unusable.
pub fn verify_password(candidate: &str, stored_hash: &str) -> Result<bool, PasswordHashError> {
    let parsed = PasswordHash::new(stored_hash)?;
    match Argon2::default().verify_password(candidate.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(PasswordHashError::Password) => Ok(false),
        Err(other) => Err(other),
    }
}
