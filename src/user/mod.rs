pub mod auth;
mod sqlite_user_store;
pub mod token;
mod user_manager;
pub mod user_models;
mod user_store;

pub use auth::{CredentialsHasher, PasswordCredentials};
pub use sqlite_user_store::SqliteUserStore;
pub use token::{generate_secret, IssuedToken, TokenService};
pub use user_manager::{LoginSession, UserManager};
pub use user_models::User;
pub use user_store::{UserAuthCredentialsStore, UserFavouritesStore, UserStore};
