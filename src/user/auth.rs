//! Password credentials and hashing

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

mod podcast_argon2 {
    use anyhow::{anyhow, Result};
    use argon2::{
        password_hash::{
            rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        },
        Argon2,
    };

    /// Argon2id with the crate defaults (m=19456 KiB, t=2, p=1) and a fresh
    /// random salt. The returned PHC string embeds the salt and parameters.
    pub fn hash(plain: &[u8]) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash_string = Argon2::default()
            .hash_password(plain, &salt)
            .map_err(|err| anyhow!("{}", err))?
            .to_string();
        Ok(hash_string)
    }

    pub fn verify<T: AsRef<str>>(plain_pw: &[u8], target_hash: T) -> Result<bool> {
        let password_hash =
            PasswordHash::new(target_hash.as_ref()).map_err(|err| anyhow!("{}", err))?;
        Ok(Argon2::default()
            .verify_password(plain_pw, &password_hash)
            .is_ok())
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub enum CredentialsHasher {
    Argon2,
}

impl FromStr for CredentialsHasher {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "argon2" => Ok(CredentialsHasher::Argon2),
            _ => bail!("Unknown hasher {}", s),
        }
    }
}

impl fmt::Display for CredentialsHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialsHasher::Argon2 => write!(f, "argon2"),
        }
    }
}

impl CredentialsHasher {
    pub fn hash<T: AsRef<str>>(&self, plain: T) -> Result<String> {
        match self {
            CredentialsHasher::Argon2 => podcast_argon2::hash(plain.as_ref().as_bytes()),
        }
    }

    pub fn verify<T: AsRef<str>>(&self, plain_pw: T, target_hash: T) -> Result<bool> {
        match self {
            CredentialsHasher::Argon2 => {
                podcast_argon2::verify(plain_pw.as_ref().as_bytes(), target_hash)
            }
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct PasswordCredentials {
    pub user_id: usize,
    pub hash: String,
    pub hasher: CredentialsHasher,

    pub created: SystemTime,
    pub last_used: Option<SystemTime>,
}

impl PasswordCredentials {
    pub fn verify(&self, plain_pw: &str) -> Result<bool> {
        self.hasher.verify(plain_pw, self.hash.as_str())
    }
}
