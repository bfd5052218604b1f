use crate::sqlite_column;
use crate::sqlite_persistence::{
    open_versioned_db, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
    DEFAULT_TIMESTAMP,
};
use crate::user::auth::{CredentialsHasher, PasswordCredentials};
use crate::user::user_models::{NewUser, User};
use crate::user::user_store::{UserAuthCredentialsStore, UserFavouritesStore, UserStore};
use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tracing::debug;

/// V 0
const USER_TABLE_V_0: Table = Table {
    name: "user",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_unique = true
        ),
        sqlite_column!("email", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("name", &SqlType::Text),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[&["email"]],
    indices: &[],
};
const USER_PASSWORD_CREDENTIALS_V_0: Table = Table {
    name: "user_password_credentials",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            is_unique = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "user",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("hash", &SqlType::Text, non_null = true),
        sqlite_column!("hasher", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("last_used", &SqlType::Integer),
    ],
    unique_constraints: &[&["user_id"]],
    indices: &[],
};
const FAVOURITE_TABLE_V_0: Table = Table {
    name: "favourite",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            non_null = true,
            is_unique = true
        ),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "user",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("podcast_id", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[&["user_id", "podcast_id"]],
    indices: &[("idx_favourite_user_id", "user_id")],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        USER_TABLE_V_0,
        USER_PASSWORD_CREDENTIALS_V_0,
        FAVOURITE_TABLE_V_0,
    ],
    migration: None,
}];

fn system_time_from_column_result(value: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(value.max(0) as u64)
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get::<_, i64>(0)? as usize,
        email: row.get(1)?,
        name: row.get(2)?,
        created: system_time_from_column_result(row.get(3)?),
    })
}

#[derive(Clone)]
pub struct SqliteUserStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUserStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = open_versioned_db(db_path.as_ref(), VERSIONED_SCHEMAS)?;
        Ok(SqliteUserStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("User store connection lock poisoned"))
    }
}

impl UserStore for SqliteUserStore {
    fn create_user(&self, new_user: &NewUser) -> Result<Option<usize>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        // The unique email column makes concurrent signups race safely: the
        // loser inserts nothing and sees zero affected rows.
        let inserted = tx
            .execute(
                "INSERT INTO user (email, name) VALUES (?1, ?2) ON CONFLICT(email) DO NOTHING",
                params![new_user.email, new_user.name],
            )
            .with_context(|| format!("Failed to create user {}", new_user.email))?;
        if inserted == 0 {
            debug!("Email {} already registered", new_user.email);
            return Ok(None);
        }
        let user_id = tx.last_insert_rowid() as usize;

        tx.execute(
            "INSERT INTO user_password_credentials (user_id, hash, hasher) VALUES (?1, ?2, ?3)",
            params![
                user_id as i64,
                new_user.password_hash,
                new_user.hasher.to_string()
            ],
        )?;
        tx.commit()?;

        Ok(Some(user_id))
    }

    fn get_user(&self, user_id: usize) -> Result<Option<User>> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                "SELECT id, email, name, created FROM user WHERE id = ?1",
                params![user_id as i64],
                user_from_row,
            )
            .optional()?)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                "SELECT id, email, name, created FROM user WHERE email = ?1",
                params![email],
                user_from_row,
            )
            .optional()?)
    }
}

impl UserAuthCredentialsStore for SqliteUserStore {
    fn get_user_auth_credentials(&self, email: &str) -> Result<Option<PasswordCredentials>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT c.user_id, c.hash, c.hasher, c.created, c.last_used \
                 FROM user_password_credentials c JOIN user u ON u.id = c.user_id \
                 WHERE u.email = ?1",
                params![email],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, Option<i64>>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((user_id, hash, hasher, created, last_used)) = row else {
            return Ok(None);
        };
        Ok(Some(PasswordCredentials {
            user_id: user_id as usize,
            hash,
            hasher: hasher.parse::<CredentialsHasher>()?,
            created: system_time_from_column_result(created),
            last_used: last_used.map(system_time_from_column_result),
        }))
    }

    fn update_user_auth_credentials_last_used(&self, user_id: usize) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE user_password_credentials SET last_used = ?1 WHERE user_id = ?2",
            params![unix_now(), user_id as i64],
        )?;
        Ok(())
    }
}

impl UserFavouritesStore for SqliteUserStore {
    fn add_user_favourite(&self, user_id: usize, podcast_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO favourite (user_id, podcast_id) VALUES (?1, ?2)",
                params![user_id as i64, podcast_id],
            )
            .with_context(|| {
                format!(
                    "Failed to add favourite {} for user {}",
                    podcast_id, user_id
                )
            })?;
        Ok(inserted > 0)
    }

    fn remove_user_favourite(&self, user_id: usize, podcast_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM favourite WHERE user_id = ?1 AND podcast_id = ?2",
            params![user_id as i64, podcast_id],
        )?;
        Ok(removed > 0)
    }

    fn get_user_favourites(&self, user_id: usize) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT podcast_id FROM favourite WHERE user_id = ?1 ORDER BY id ASC")?;
        let ids = stmt
            .query_map(params![user_id as i64], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use tempfile::TempDir;

    fn create_tmp_store() -> (SqliteUserStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let temp_file_path = temp_dir.path().join("test.db");
        let store = SqliteUserStore::new(&temp_file_path).unwrap();
        (store, temp_dir)
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            name: Some("Test".to_string()),
            password_hash: "$argon2id$fake".to_string(),
            hasher: CredentialsHasher::Argon2,
        }
    }

    #[test]
    fn test_create_user() {
        let (store, _temp_dir) = create_tmp_store();

        let user_id = store.create_user(&new_user("a@x.com")).unwrap();
        assert_eq!(user_id, Some(1));

        let duplicate = store.create_user(&new_user("a@x.com")).unwrap();
        assert_eq!(duplicate, None);

        let user = store.get_user(1).unwrap().unwrap();
        assert_eq!(user.email, "a@x.com");
        assert_eq!(user.name.as_deref(), Some("Test"));
        assert_eq!(store.get_user_by_email("a@x.com").unwrap(), Some(user));
        assert!(store.get_user_by_email("b@x.com").unwrap().is_none());
    }

    #[test]
    fn stores_credentials_with_user() {
        let (store, _temp_dir) = create_tmp_store();
        let user_id = store.create_user(&new_user("a@x.com")).unwrap().unwrap();

        let credentials = store.get_user_auth_credentials("a@x.com").unwrap().unwrap();
        assert_eq!(credentials.user_id, user_id);
        assert_eq!(credentials.hash, "$argon2id$fake");
        assert_eq!(credentials.hasher, CredentialsHasher::Argon2);
        assert!(credentials.last_used.is_none());

        store.update_user_auth_credentials_last_used(user_id).unwrap();
        let credentials = store.get_user_auth_credentials("a@x.com").unwrap().unwrap();
        assert!(credentials.last_used.is_some());

        assert!(store.get_user_auth_credentials("nobody@x.com").unwrap().is_none());
    }

    #[test]
    fn test_cannot_add_favourite_without_user() {
        let (store, _temp_dir) = create_tmp_store();

        let result = store.add_user_favourite(1, "podcast");
        assert!(result.is_err());
    }

    #[test]
    fn favourites_are_a_set() {
        let (store, _temp_dir) = create_tmp_store();
        let user_id = store.create_user(&new_user("a@x.com")).unwrap().unwrap();

        assert!(store.add_user_favourite(user_id, "p1").unwrap());
        assert!(!store.add_user_favourite(user_id, "p1").unwrap());
        assert!(store.add_user_favourite(user_id, "p2").unwrap());
        assert_eq!(store.get_user_favourites(user_id).unwrap(), vec!["p1", "p2"]);

        assert!(!store.remove_user_favourite(user_id, "missing").unwrap());
        assert!(store.remove_user_favourite(user_id, "p1").unwrap());
        assert!(!store.remove_user_favourite(user_id, "p1").unwrap());
        assert_eq!(store.get_user_favourites(user_id).unwrap(), vec!["p2"]);
    }

    #[test]
    fn favourites_are_per_user() {
        let (store, _temp_dir) = create_tmp_store();
        let alice = store.create_user(&new_user("a@x.com")).unwrap().unwrap();
        let bob = store.create_user(&new_user("b@x.com")).unwrap().unwrap();

        store.add_user_favourite(alice, "p1").unwrap();
        store.add_user_favourite(bob, "p1").unwrap();
        store.remove_user_favourite(bob, "p1").unwrap();

        assert_eq!(store.get_user_favourites(alice).unwrap(), vec!["p1"]);
        assert!(store.get_user_favourites(bob).unwrap().is_empty());
    }

    #[test]
    fn concurrent_adds_keep_a_single_entry() {
        let (store, _temp_dir) = create_tmp_store();
        let user_id = store.create_user(&new_user("a@x.com")).unwrap().unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.add_user_favourite(user_id, "p1").unwrap())
            })
            .collect();
        let inserted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|inserted| *inserted)
            .count();

        assert_eq!(inserted, 1);
        assert_eq!(store.get_user_favourites(user_id).unwrap(), vec!["p1"]);
    }

    #[test]
    fn reopens_existing_database() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.db");
        {
            let store = SqliteUserStore::new(&path).unwrap();
            store.create_user(&new_user("a@x.com")).unwrap();
        }
        let store = SqliteUserStore::new(&path).unwrap();
        assert!(store.get_user_by_email("a@x.com").unwrap().is_some());
    }
}
