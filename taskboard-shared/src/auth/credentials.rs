/// Username/password checks for login
///
/// The checks run in a fixed order: the user must exist, then be active, then
/// the password must match. Login handlers map each outcome to its own status.

use tracing::debug;

use super::password::{verify_password_blocking, PasswordError};
use crate::models::user::User;
use crate::store::{StoreError, UserRepository};

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("This user does not exist!!")]
    UserNotFound,

    #[error("This account is not active!!")]
    AccountInactive,

    #[error("Invalid username or password.")]
    InvalidCredentials,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Returns the matching active user
///
/// Password verification runs on the blocking pool. On success the user's
/// last login time is recorded.
pub async fn validate_credentials<R>(
    users: &R,
    username: &str,
    password: &str,
) -> Result<User, CredentialError>
where
    R: UserRepository + ?Sized,
{
    let user = users
        .find_user_by_username(username)
        .await?
        .ok_or(CredentialError::UserNotFound)?;

    if !user.is_active {
        debug!(user_id = %user.id, "Login attempt on inactive account");
        return Err(CredentialError::AccountInactive);
    }

    if !verify_password_blocking(password.to_string(), user.password_hash.clone()).await? {
        debug!(user_id = %user.id, "Login attempt with wrong password");
        return Err(CredentialError::InvalidCredentials);
    }

    users.touch_last_login(user.id).await?;

    Ok(user)
}
