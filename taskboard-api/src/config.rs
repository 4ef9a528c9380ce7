/// Configuration management for the API server
///
/// Configuration is read once at startup into an immutable [`Config`] and
/// shared through the application state.
///
/// # Environment Variables
///
/// Server:
/// - `API_HOST` (default `0.0.0.0`), `API_PORT` (default `8080`)
/// - `CORS_ORIGINS`: comma-separated origins, `*` for permissive (default `*`)
/// - `PRODUCTION`: `true`/`false` (default `false`)
/// - `PUBLIC_BASE_URL`: prefix for links in emails (default `http://localhost:8080`)
///
/// Database:
/// - `DATABASE_URL` (required), `DATABASE_MAX_CONNECTIONS` (default 10)
///
/// Tokens:
/// - `JWT_SECRET` (required, at least 32 characters)
/// - `ACCESS_TOKEN_LIFETIME_SECS` (default 5 days)
/// - `REFRESH_TOKEN_LIFETIME_SECS` (default 28 days)
/// - `REFRESH_TOKEN_LIFETIME_REMEMBER_ME_SECS` (default 90 days)
/// - `CSRF_TOKEN_LIFETIME_SECS` (default: the access token lifetime)
/// - `ACTIVATION_TOKEN_TIMEOUT_SECS` (default 3 days)
///
/// Cookies:
/// - `ACCESS_TOKEN_COOKIE` (`access_token`), `REFRESH_TOKEN_COOKIE` (`refresh_token`)
/// - `CSRF_COOKIE` (`csrftoken`), `CSRF_HEADER` (`X-CSRFToken`)
/// - `AUTH_COOKIE_SECURE` (default: the value of `PRODUCTION`)
/// - `AUTH_COOKIE_SAMESITE`: `Strict`, `Lax`, or `None` (default `Lax`)
///
/// Mail:
/// - `MAIL_TRANSPORT`: `log`, `file`, or `smtp` (default `log`)
/// - `MAIL_FROM` (default `Taskboard <noreply@localhost>`)
/// - `MAIL_FILE_DIR` (default `./mail`)
/// - `SMTP_HOST`, `SMTP_PORT` (587), `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_TLS` (`true`)
///
/// Admin bootstrap:
/// - `ADMIN_USERNAME` (`admin`), `ADMIN_EMAIL` (`admin@example.com`), `ADMIN_PASSWORD`
///
/// # Example
///
/// ```no_run
/// use taskboard_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use chrono::Duration;
use taskboard_shared::auth::jwt::TokenSettings;
use taskboard_shared::mail::MailTransportConfig;

use crate::cookies::SameSite;

const DAY: i64 = 24 * 60 * 60;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,

    pub database: DatabaseConfig,

    pub jwt: JwtConfig,

    pub cookies: CookieConfig,

    pub mail: MailConfig,

    pub admin: AdminConfig,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins; `*` means any
    pub cors_origins: Vec<String>,

    pub production: bool,

    /// Scheme, host, and optional port that emailed links start with
    pub public_base_url: String,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// Token signing and lifetimes
#[derive(Clone)]
pub struct JwtConfig {
    /// Signs JWTs, CSRF tokens, and activation tokens.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    pub access_lifetime: Duration,

    pub refresh_lifetime: Duration,

    /// Refresh cookie max-age when the user asked to be remembered
    pub remember_me_lifetime: Duration,

    /// CSRF cookie max-age when the user did not ask to be remembered
    pub csrf_lifetime: Duration,

    pub activation_timeout: Duration,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("access_lifetime", &self.access_lifetime)
            .field("refresh_lifetime", &self.refresh_lifetime)
            .field("remember_me_lifetime", &self.remember_me_lifetime)
            .field("csrf_lifetime", &self.csrf_lifetime)
            .field("activation_timeout", &self.activation_timeout)
            .finish()
    }
}

impl JwtConfig {
    pub fn token_settings(&self) -> TokenSettings {
        TokenSettings {
            access_lifetime: self.access_lifetime,
            refresh_lifetime: self.refresh_lifetime,
        }
    }
}

/// Auth cookie names and attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieConfig {
    pub access_name: String,

    pub refresh_name: String,

    pub csrf_name: String,

    /// Request header carrying the CSRF token
    pub csrf_header: String,

    pub secure: bool,

    pub same_site: SameSite,
}

/// Outbound mail configuration
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub transport: MailTransportConfig,

    pub from: String,
}

/// Credentials for the superuser created at startup
#[derive(Clone)]
pub struct AdminConfig {
    pub username: String,

    pub email: String,

    /// No admin is created when unset
    pub password: Option<String>,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        None => Ok(default),
    }
}

/// Ten years
const MAX_LIFETIME_SECS: i64 = 10 * 365 * 24 * 60 * 60;

fn seconds_or(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: i64,
) -> anyhow::Result<Duration> {
    let secs: i64 = parse_or(lookup, key, default)?;
    if secs <= 0 {
        anyhow::bail!("{} must be a positive number of seconds", key);
    }
    if secs > MAX_LIFETIME_SECS {
        anyhow::bail!("{} must be at most {} seconds", key, MAX_LIFETIME_SECS);
    }
    Ok(Duration::seconds(secs))
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// A `.env` file in the working directory is read first if present.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or any variable has
    /// an invalid value.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let production: bool = parse_or(&lookup, "PRODUCTION", false)?;

        let api = ApiConfig {
            host: get("API_HOST", "0.0.0.0"),
            port: parse_or(&lookup, "API_PORT", 8080)?,
            cors_origins: get("CORS_ORIGINS", "*")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            production,
            public_base_url: get("PUBLIC_BASE_URL", "http://localhost:8080")
                .trim_end_matches('/')
                .to_string(),
        };

        let database = DatabaseConfig {
            url: lookup("DATABASE_URL")
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
        };

        let secret = lookup("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;
        if secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let access_lifetime = seconds_or(&lookup, "ACCESS_TOKEN_LIFETIME_SECS", 5 * DAY)?;
        let jwt = JwtConfig {
            secret,
            access_lifetime,
            refresh_lifetime: seconds_or(&lookup, "REFRESH_TOKEN_LIFETIME_SECS", 28 * DAY)?,
            remember_me_lifetime: seconds_or(
                &lookup,
                "REFRESH_TOKEN_LIFETIME_REMEMBER_ME_SECS",
                90 * DAY,
            )?,
            csrf_lifetime: seconds_or(
                &lookup,
                "CSRF_TOKEN_LIFETIME_SECS",
                access_lifetime.num_seconds(),
            )?,
            activation_timeout: seconds_or(&lookup, "ACTIVATION_TOKEN_TIMEOUT_SECS", 3 * DAY)?,
        };

        let cookies = CookieConfig {
            access_name: get("ACCESS_TOKEN_COOKIE", "access_token"),
            refresh_name: get("REFRESH_TOKEN_COOKIE", "refresh_token"),
            csrf_name: get("CSRF_COOKIE", "csrftoken"),
            csrf_header: get("CSRF_HEADER", "X-CSRFToken"),
            secure: parse_or(&lookup, "AUTH_COOKIE_SECURE", production)?,
            same_site: parse_or(&lookup, "AUTH_COOKIE_SAMESITE", SameSite::Lax)?,
        };
        if cookies.same_site == SameSite::None && !cookies.secure {
            tracing::warn!("SameSite=None cookies without Secure are rejected by most browsers");
        }

        let transport = match get("MAIL_TRANSPORT", "log").to_ascii_lowercase().as_str() {
            "log" => MailTransportConfig::Log,
            "file" => MailTransportConfig::File {
                path: PathBuf::from(get("MAIL_FILE_DIR", "./mail")),
            },
            "smtp" => MailTransportConfig::Smtp {
                host: lookup("SMTP_HOST").ok_or_else(|| {
                    anyhow::anyhow!("SMTP_HOST is required when MAIL_TRANSPORT=smtp")
                })?,
                port: parse_or(&lookup, "SMTP_PORT", 587)?,
                username: lookup("SMTP_USERNAME"),
                password: lookup("SMTP_PASSWORD"),
                use_tls: parse_or(&lookup, "SMTP_TLS", true)?,
            },
            other => anyhow::bail!("MAIL_TRANSPORT must be log, file, or smtp, got {:?}", other),
        };
        let mail = MailConfig {
            transport,
            from: get("MAIL_FROM", "Taskboard <noreply@localhost>"),
        };

        let admin = AdminConfig {
            username: get("ADMIN_USERNAME", "admin"),
            email: get("ADMIN_EMAIL", "admin@example.com"),
            password: lookup("ADMIN_PASSWORD").filter(|p| !p.is_empty()),
        };

        Ok(Self {
            api,
            database,
            jwt,
            cookies,
            mail,
            admin,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn minimal() -> Vec<(&'static str, &'static str)> {
        vec![
            ("DATABASE_URL", "postgresql://localhost/test"),
            ("JWT_SECRET", SECRET),
        ]
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&minimal())).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.api.cors_origins, vec!["*".to_string()]);
        assert!(!config.api.production);
        assert_eq!(config.jwt.access_lifetime, Duration::days(5));
        assert_eq!(config.jwt.refresh_lifetime, Duration::days(28));
        assert_eq!(config.jwt.remember_me_lifetime, Duration::days(90));
        assert_eq!(config.jwt.csrf_lifetime, Duration::days(5));
        assert_eq!(config.jwt.activation_timeout, Duration::days(3));
        assert_eq!(config.cookies.access_name, "access_token");
        assert_eq!(config.cookies.refresh_name, "refresh_token");
        assert_eq!(config.cookies.csrf_name, "csrftoken");
        assert_eq!(config.cookies.csrf_header, "X-CSRFToken");
        assert!(!config.cookies.secure);
        assert_eq!(config.cookies.same_site, SameSite::Lax);
        assert_eq!(config.mail.transport, MailTransportConfig::Log);
        assert!(config.admin.password.is_none());
    }

    #[test]
    fn test_secure_cookies_follow_production() {
        let mut pairs = minimal();
        pairs.push(("PRODUCTION", "true"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert!(config.cookies.secure);

        pairs.push(("AUTH_COOKIE_SECURE", "false"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert!(!config.cookies.secure);
    }

    #[test]
    fn test_csrf_lifetime_follows_access_lifetime() {
        let mut pairs = minimal();
        pairs.push(("ACCESS_TOKEN_LIFETIME_SECS", "600"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();

        assert_eq!(config.jwt.access_lifetime, Duration::minutes(10));
        assert_eq!(config.jwt.csrf_lifetime, Duration::minutes(10));
    }

    #[test]
    fn test_missing_required_values() {
        let no_db = Config::from_lookup(lookup_from(&[("JWT_SECRET", SECRET)]));
        assert!(no_db.is_err());

        let no_secret =
            Config::from_lookup(lookup_from(&[("DATABASE_URL", "postgresql://localhost/test")]));
        assert!(no_secret.is_err());
    }

    #[test]
    fn test_lifetime_bounds() {
        for value in ["0", "-5", "1000000000000000", "99999999999999999"] {
            let mut pairs = minimal();
            pairs.push(("ACCESS_TOKEN_LIFETIME_SECS", value));
            assert!(
                Config::from_lookup(lookup_from(&pairs)).is_err(),
                "{} should be rejected",
                value
            );
        }

        let mut pairs = minimal();
        pairs.push(("REFRESH_TOKEN_LIFETIME_SECS", "315360000"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.jwt.refresh_lifetime, Duration::days(3650));
    }

    #[test]
    fn test_short_secret_rejected() {
        let result = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgresql://localhost/test"),
            ("JWT_SECRET", "too-short"),
        ]));

        let err = result.unwrap_err().to_string();
        assert!(err.contains("at least 32 characters"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        for (key, value) in [
            ("API_PORT", "not-a-port"),
            ("AUTH_COOKIE_SAMESITE", "Sometimes"),
            ("ACCESS_TOKEN_LIFETIME_SECS", "0"),
            ("MAIL_TRANSPORT", "pigeon"),
        ] {
            let mut pairs = minimal();
            pairs.push((key, value));
            assert!(
                Config::from_lookup(lookup_from(&pairs)).is_err(),
                "{}={} should be rejected",
                key,
                value
            );
        }
    }

    #[test]
    fn test_smtp_transport() {
        let mut pairs = minimal();
        pairs.extend([
            ("MAIL_TRANSPORT", "smtp"),
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_USERNAME", "mailer"),
            ("SMTP_PASSWORD", "hunter2"),
        ]);
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();

        assert_eq!(
            config.mail.transport,
            MailTransportConfig::Smtp {
                host: "smtp.example.com".to_string(),
                port: 587,
                username: Some("mailer".to_string()),
                password: Some("hunter2".to_string()),
                use_tls: true,
            }
        );
    }

    #[test]
    fn test_secrets_are_redacted_in_debug() {
        let mut pairs = minimal();
        pairs.push(("ADMIN_PASSWORD", "admin-password"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();

        let debug = format!("{:?}", config);
        assert!(!debug.contains(SECRET));
        assert!(!debug.contains("admin-password"));
    }
}
