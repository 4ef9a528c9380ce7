/// Authentication primitives
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and the password policy
/// - [`jwt`]: access/refresh token minting and validation
/// - [`csrf`]: signed double-submit CSRF tokens
/// - [`activation`]: stateless account activation tokens
/// - [`credentials`]: username/password checks for login
/// - [`middleware`]: request authentication and the [`middleware::AuthContext`] extractor
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::auth::password::{hash_password, verify_password};
/// use taskboard_shared::auth::jwt::{issue_token_pair, TokenSettings};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("p@ss1234")?;
/// assert!(verify_password("p@ss1234", &hash)?);
///
/// let pair = issue_token_pair(Uuid::new_v4(), &TokenSettings::default(), "secret")?;
/// # Ok(())
/// # }
/// ```

pub mod activation;
pub mod credentials;
pub mod csrf;
pub mod jwt;
pub mod middleware;
pub mod password;
