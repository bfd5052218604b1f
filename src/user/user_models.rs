//! User data models

use serde::Serialize;
use std::time::SystemTime;

use super::auth::CredentialsHasher;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: usize,
    pub email: String,
    pub name: Option<String>,
    #[serde(skip)]
    pub created: SystemTime,
}

/// Everything needed to create a user together with its password credentials.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Already normalized, see [`normalize_email`].
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub hasher: CredentialsHasher,
}

/// Emails are unique regardless of case and surrounding whitespace.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
