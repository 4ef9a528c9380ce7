/// Account activation tokens
///
/// Activation tokens are not stored. A token is derived from the user's
/// current state and the time it was minted:
///
/// ```text
/// <unix seconds, base36>-<first 16 bytes of HMAC-SHA256, hex>
/// ```
///
/// The HMAC covers the user id, password hash, email, `is_active`, and the
/// timestamp. Activating the account flips `is_active`, so the same link stops
/// verifying afterwards. Changing the password or email also invalidates
/// outstanding links.
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::activation::{check_token, make_token};
/// use taskboard_shared::models::user::User;
/// use chrono::{Duration, Utc};
/// # fn example(user: &User) -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "an-example-secret-that-is-32-bytes!";
/// let now = Utc::now();
///
/// let token = make_token(user, secret, now)?;
/// assert!(check_token(user, &token, secret, Duration::days(3), now));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::user::User;
use crate::store::{StoreError, UserRepository};

type HmacSha256 = Hmac<Sha256>;

const DOMAIN: &[u8] = b"taskboard.activation";
const SIGNATURE_LEN: usize = 16;

/// Default link lifetime
pub fn default_timeout() -> Duration {
    Duration::days(3)
}

#[derive(Debug, thiserror::Error)]
pub enum ActivationError {
    #[error("User Does Not Exist.")]
    UserNotFound,

    #[error("Invalid activation link.")]
    InvalidOrExpiredToken,

    #[error("Failed to initialise activation signer: {0}")]
    Key(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

fn from_base36(s: &str) -> Option<u64> {
    // Bounded to keep the parse from overflowing
    if s.is_empty() || s.len() > 12 {
        return None;
    }
    u64::from_str_radix(s, 36).ok()
}

fn signer(user: &User, timestamp: u64, secret: &str) -> Result<HmacSha256, ActivationError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ActivationError::Key(e.to_string()))?;
    mac.update(DOMAIN);
    mac.update(user.id.as_bytes());
    mac.update(b"\x00");
    mac.update(user.password_hash.as_bytes());
    mac.update(b"\x00");
    mac.update(user.email.as_bytes());
    mac.update(if user.is_active { b"\x00\x01" } else { b"\x00\x00" });
    mac.update(&timestamp.to_be_bytes());
    Ok(mac)
}

/// Mints an activation token for the user's current state
pub fn make_token(user: &User, secret: &str, now: DateTime<Utc>) -> Result<String, ActivationError> {
    let timestamp = now.timestamp().max(0) as u64;
    let digest = signer(user, timestamp, secret)?.finalize().into_bytes();

    Ok(format!(
        "{}-{}",
        to_base36(timestamp),
        hex::encode(&digest[..SIGNATURE_LEN])
    ))
}

/// Checks a token against the user's current state
///
/// Fails when the token is malformed, was minted for a different state, was
/// minted in the future, or is older than `timeout`.
pub fn check_token(
    user: &User,
    token: &str,
    secret: &str,
    timeout: Duration,
    now: DateTime<Utc>,
) -> bool {
    let Some((ts_part, sig_part)) = token.split_once('-') else {
        return false;
    };
    let Some(timestamp) = from_base36(ts_part) else {
        return false;
    };
    let Ok(signature) = hex::decode(sig_part) else {
        return false;
    };
    if signature.len() != SIGNATURE_LEN {
        return false;
    }

    let Ok(mac) = signer(user, timestamp, secret) else {
        return false;
    };
    if mac.verify_truncated_left(&signature).is_err() {
        return false;
    }

    let age = now.timestamp() - timestamp as i64;
    age >= 0 && age <= timeout.num_seconds()
}

/// Verifies a token and activates the account
///
/// Only one caller can succeed for a given account: the final write is a
/// conditional false → true flip, and a caller that loses the race gets
/// [`ActivationError::InvalidOrExpiredToken`].
pub async fn activate_account<R>(
    users: &R,
    user_id: Uuid,
    token: &str,
    secret: &str,
    timeout: Duration,
) -> Result<User, ActivationError>
where
    R: UserRepository + ?Sized,
{
    let user = users
        .find_user_by_id(user_id)
        .await?
        .ok_or(ActivationError::UserNotFound)?;

    if !check_token(&user, token, secret, timeout, Utc::now()) {
        debug!(user_id = %user_id, "Activation token rejected");
        return Err(ActivationError::InvalidOrExpiredToken);
    }

    if !users.activate_user(user_id).await? {
        debug!(user_id = %user_id, "Account was activated concurrently");
        return Err(ActivationError::InvalidOrExpiredToken);
    }

    info!(user_id = %user_id, username = %user.username, "Account activated");

    Ok(User {
        is_active: true,
        ..user
    })
}
