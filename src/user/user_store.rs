use super::auth::PasswordCredentials;
use super::user_models::{NewUser, User};
use anyhow::Result;

pub trait UserAuthCredentialsStore: Send + Sync {
    /// Returns the password credentials of the user with the given (normalized) email.
    /// Returns Ok(None) if the user does not exist.
    /// Returns Err if there is a database error.
    fn get_user_auth_credentials(&self, email: &str) -> Result<Option<PasswordCredentials>>;

    /// Records a successful login.
    fn update_user_auth_credentials_last_used(&self, user_id: usize) -> Result<()>;
}

pub trait UserFavouritesStore: Send + Sync {
    /// Adds a podcast to the user's favourites.
    /// Returns Ok(false) if it was already there, the set is left untouched.
    fn add_user_favourite(&self, user_id: usize, podcast_id: &str) -> Result<bool>;

    /// Removes a podcast from the user's favourites.
    /// Returns Ok(false) if it was not there.
    fn remove_user_favourite(&self, user_id: usize, podcast_id: &str) -> Result<bool>;

    /// Returns the ids of the user's favourites, oldest first.
    fn get_user_favourites(&self, user_id: usize) -> Result<Vec<String>>;
}

pub trait UserStore: UserAuthCredentialsStore + UserFavouritesStore + Send + Sync {
    /// Creates a new user along with its password credentials and returns the user id.
    /// Returns Ok(None) if the email is already taken.
    fn create_user(&self, new_user: &NewUser) -> Result<Option<usize>>;

    /// Returns Ok(None) if the user does not exist.
    fn get_user(&self, user_id: usize) -> Result<Option<User>>;

    /// Returns Ok(None) if no user has the given (normalized) email.
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
}
