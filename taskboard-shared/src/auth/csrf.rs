/// CSRF tokens for cookie-authenticated sessions
///
/// A CSRF token is `<nonce hex>.<signature hex>`, where the nonce is 32 random
/// bytes and the signature is HMAC-SHA256 over the user id and the nonce. The
/// token is handed out at login and refresh, stored by the client in a
/// readable cookie, and echoed back in a request header on unsafe requests.
///
/// Two checks run on every guarded request:
/// - the header value equals the cookie value (double submit)
/// - the signature binds the token to the authenticated user
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::csrf::{check_double_submit, generate_csrf_token};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let user_id = Uuid::new_v4();
/// let secret = "an-example-secret-that-is-32-bytes!";
///
/// let token = generate_csrf_token(user_id, secret)?;
/// check_double_submit(Some(&token), Some(&token), user_id, secret)?;
/// # Ok(())
/// # }
/// ```

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 32;
const SIGNATURE_LEN: usize = 32;
const DOMAIN: &[u8] = b"taskboard.csrf";

/// CSRF check failures
///
/// The display strings are what clients see after the "CSRF Failed: " prefix.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CsrfError {
    #[error("CSRF cookie not set.")]
    MissingCookie,

    #[error("CSRF token missing.")]
    MissingHeader,

    #[error("CSRF token incorrect.")]
    Mismatch,

    #[error("CSRF token has an invalid format.")]
    Malformed,

    #[error("CSRF token was not issued for this session.")]
    InvalidSignature,

    #[error("Failed to initialise CSRF signer: {0}")]
    Key(String),
}

fn signer(user_id: Uuid, nonce: &[u8], secret: &str) -> Result<HmacSha256, CsrfError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| CsrfError::Key(e.to_string()))?;
    mac.update(DOMAIN);
    mac.update(user_id.as_bytes());
    mac.update(nonce);
    Ok(mac)
}

/// Generates a fresh CSRF token bound to `user_id`
pub fn generate_csrf_token(user_id: Uuid, secret: &str) -> Result<String, CsrfError> {
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);

    let signature = signer(user_id, &nonce, secret)?.finalize().into_bytes();

    Ok(format!("{}.{}", hex::encode(nonce), hex::encode(signature)))
}

/// Verifies that `token` was issued for `user_id`
pub fn verify_csrf_token(token: &str, user_id: Uuid, secret: &str) -> Result<(), CsrfError> {
    let (nonce_hex, signature_hex) = token.split_once('.').ok_or(CsrfError::Malformed)?;

    let nonce = hex::decode(nonce_hex).map_err(|_| CsrfError::Malformed)?;
    let signature = hex::decode(signature_hex).map_err(|_| CsrfError::Malformed)?;
    if nonce.len() != NONCE_LEN || signature.len() != SIGNATURE_LEN {
        return Err(CsrfError::Malformed);
    }

    signer(user_id, &nonce, secret)?
        .verify_slice(&signature)
        .map_err(|_| CsrfError::InvalidSignature)
}

/// Runs the double-submit check followed by the signature check
///
/// `cookie` is the CSRF cookie value and `header` the CSRF header value, as
/// found on the request.
pub fn check_double_submit(
    cookie: Option<&str>,
    header: Option<&str>,
    user_id: Uuid,
    secret: &str,
) -> Result<(), CsrfError> {
    let cookie = cookie.filter(|c| !c.is_empty()).ok_or(CsrfError::MissingCookie)?;
    let header = header.filter(|h| !h.is_empty()).ok_or(CsrfError::MissingHeader)?;

    if !bool::from(cookie.as_bytes().ct_eq(header.as_bytes())) {
        return Err(CsrfError::Mismatch);
    }

    verify_csrf_token(header, user_id, secret)
}
