/// Admin bootstrap
///
/// Creates one active superuser at startup from `ADMIN_USERNAME`,
/// `ADMIN_EMAIL`, and `ADMIN_PASSWORD`. Nothing happens when no password is
/// configured or a superuser already exists.

use anyhow::Context;
use taskboard_shared::{
    auth::password,
    models::user::{NewUser, User},
    store::Store,
};

use crate::config::AdminConfig;

/// Ensures a superuser exists
///
/// Returns the user that was created, or `None` if nothing was done.
pub async fn ensure_admin(store: &dyn Store, admin: &AdminConfig) -> anyhow::Result<Option<User>> {
    let Some(admin_password) = admin.password.clone() else {
        tracing::debug!("ADMIN_PASSWORD not set, skipping admin bootstrap");
        return Ok(None);
    };

    if store
        .superuser_exists()
        .await
        .context("Failed to check for an existing superuser")?
    {
        tracing::info!("Superuser already exists, skipping admin bootstrap");
        return Ok(None);
    }

    let password_hash = password::hash_password_blocking(admin_password)
        .await
        .context("Failed to hash admin password")?;

    let user = store
        .create_user(NewUser::superuser(
            admin.username.clone(),
            admin.email.clone(),
            password_hash,
        ))
        .await
        .with_context(|| format!("Failed to create superuser {:?}", admin.username))?;

    tracing::info!(user_id = %user.id, username = %user.username, "Superuser created");
    Ok(Some(user))
}
