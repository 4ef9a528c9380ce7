/// Auth cookies
///
/// Login sets three cookies: the access token and refresh token (both
/// `HttpOnly`) and the CSRF token (readable by scripts so the client can echo
/// it in the CSRF header). Refresh resets only the access and CSRF cookies.
///
/// All three carry `Path=/`, `SameSite`, and `Secure` when configured.

use std::fmt;
use std::str::FromStr;

use axum::http::{header, HeaderMap, HeaderValue};
use chrono::Duration;

use crate::config::{CookieConfig, JwtConfig};
use crate::error::ApiError;

/// `SameSite` cookie attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSameSiteError(String);

impl fmt::Display for ParseSameSiteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected Strict, Lax, or None, got {:?}", self.0)
    }
}

impl std::error::Error for ParseSameSiteError {}

impl FromStr for SameSite {
    type Err = ParseSameSiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(SameSite::Strict),
            "lax" => Ok(SameSite::Lax),
            "none" => Ok(SameSite::None),
            _ => Err(ParseSameSiteError(s.to_string())),
        }
    }
}

/// Formats one `Set-Cookie` value
pub fn build_cookie(
    config: &CookieConfig,
    name: &str,
    value: &str,
    max_age: Duration,
    http_only: bool,
) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; SameSite={}",
        name,
        value,
        max_age.num_seconds(),
        config.same_site.as_str()
    );
    if http_only {
        cookie.push_str("; HttpOnly");
    }
    if config.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Cookie values set by a successful login or refresh
#[derive(Debug, Clone, Default)]
pub struct AuthCookies {
    values: Vec<String>,
}

impl AuthCookies {
    /// Access, refresh, and CSRF cookies for a login
    ///
    /// With `remember_me`, the refresh cookie lives for the remember-me
    /// lifetime and the CSRF cookie for the access token lifetime.
    pub fn for_login(
        cookies: &CookieConfig,
        lifetimes: &JwtConfig,
        access_token: &str,
        refresh_token: &str,
        csrf_token: &str,
        remember_me: bool,
    ) -> Self {
        let (refresh_max_age, csrf_max_age) = if remember_me {
            (lifetimes.remember_me_lifetime, lifetimes.access_lifetime)
        } else {
            (lifetimes.refresh_lifetime, lifetimes.csrf_lifetime)
        };

        Self {
            values: vec![
                build_cookie(
                    cookies,
                    &cookies.access_name,
                    access_token,
                    lifetimes.access_lifetime,
                    true,
                ),
                build_cookie(
                    cookies,
                    &cookies.refresh_name,
                    refresh_token,
                    refresh_max_age,
                    true,
                ),
                build_cookie(cookies, &cookies.csrf_name, csrf_token, csrf_max_age, false),
            ],
        }
    }

    /// Access and CSRF cookies for a refresh; the refresh cookie is untouched
    pub fn for_refresh(
        cookies: &CookieConfig,
        lifetimes: &JwtConfig,
        access_token: &str,
        csrf_token: &str,
    ) -> Self {
        Self {
            values: vec![
                build_cookie(
                    cookies,
                    &cookies.access_name,
                    access_token,
                    lifetimes.access_lifetime,
                    true,
                ),
                build_cookie(
                    cookies,
                    &cookies.csrf_name,
                    csrf_token,
                    lifetimes.csrf_lifetime,
                    false,
                ),
            ],
        }
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// `Set-Cookie` headers, one per cookie
    pub fn into_headers(self) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        for value in self.values {
            let value = HeaderValue::from_str(&value)
                .map_err(|e| ApiError::InternalError(format!("Invalid cookie value: {}", e)))?;
            headers.append(header::SET_COOKIE, value);
        }
        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let mut all = vec![
            ("DATABASE_URL".to_string(), "postgresql://localhost/test".to_string()),
            (
                "JWT_SECRET".to_string(),
                "test-secret-key-at-least-32-bytes-long".to_string(),
            ),
        ];
        all.extend(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        Config::from_lookup(move |key| {
            all.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
        })
        .unwrap()
    }

    #[test]
    fn test_same_site_parse() {
        assert_eq!("strict".parse::<SameSite>().unwrap(), SameSite::Strict);
        assert_eq!("Lax".parse::<SameSite>().unwrap(), SameSite::Lax);
        assert_eq!("NONE".parse::<SameSite>().unwrap(), SameSite::None);
        assert!("sometimes".parse::<SameSite>().is_err());
    }

    #[test]
    fn test_build_cookie_attributes() {
        let config = config(&[("AUTH_COOKIE_SECURE", "true"), ("AUTH_COOKIE_SAMESITE", "Strict")]);

        let cookie = build_cookie(&config.cookies, "access_token", "abc", Duration::seconds(60), true);
        assert_eq!(
            cookie,
            "access_token=abc; Path=/; Max-Age=60; SameSite=Strict; HttpOnly; Secure"
        );

        let cookie = build_cookie(&config.cookies, "csrftoken", "xyz", Duration::seconds(60), false);
        assert!(!cookie.contains("HttpOnly"));
    }

    #[test]
    fn test_login_cookies_without_remember_me() {
        let config = config(&[("CSRF_TOKEN_LIFETIME_SECS", "1234")]);
        let cookies = AuthCookies::for_login(&config.cookies, &config.jwt, "a", "r", "c", false);
        let values = cookies.values();

        assert_eq!(values.len(), 3);
        assert!(values[0].starts_with("access_token=a;"));
        assert!(values[0].contains(&format!("Max-Age={}", 5 * 24 * 3600)));
        assert!(values[0].contains("HttpOnly"));
        assert!(values[1].starts_with("refresh_token=r;"));
        assert!(values[1].contains(&format!("Max-Age={}", 28 * 24 * 3600)));
        assert!(values[1].contains("HttpOnly"));
        assert!(values[2].starts_with("csrftoken=c;"));
        assert!(values[2].contains("Max-Age=1234"));
        assert!(!values[2].contains("HttpOnly"));
    }

    #[test]
    fn test_login_cookies_with_remember_me() {
        let config = config(&[("CSRF_TOKEN_LIFETIME_SECS", "1234")]);
        let cookies = AuthCookies::for_login(&config.cookies, &config.jwt, "a", "r", "c", true);
        let values = cookies.values();

        assert!(values[1].contains(&format!("Max-Age={}", 90 * 24 * 3600)));
        assert!(values[2].contains(&format!("Max-Age={}", 5 * 24 * 3600)));
    }

    #[test]
    fn test_refresh_cookies() {
        let config = config(&[]);
        let headers = AuthCookies::for_refresh(&config.cookies, &config.jwt, "a2", "c2")
            .into_headers()
            .unwrap();

        let values: Vec<&str> = headers
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(values.len(), 2);
        assert!(values[0].starts_with("access_token=a2;"));
        assert!(values[1].starts_with("csrftoken=c2;"));
    }
}
