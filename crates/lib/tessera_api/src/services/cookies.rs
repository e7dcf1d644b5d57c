//! Cookie service: set/get/clear httpOnly auth cookies.
//!
//! The access cookie is sent on every API path; the refresh cookie only to the
//! refresh endpoint.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

/// Cookie name for the access token.
pub const ACCESS_COOKIE: &str = "tessera_access";
/// Cookie name for the refresh token.
pub const REFRESH_COOKIE: &str = "tessera_refresh";

/// Path the access cookie is scoped to.
pub const ACCESS_COOKIE_PATH: &str = "/";
/// Path the refresh cookie is scoped to: the refresh endpoint only.
pub const REFRESH_COOKIE_PATH: &str = "/auth/refresh-token";

/// Cookie attributes that depend on the deployment.
#[derive(Debug, Clone, Copy)]
pub struct CookiePolicy {
    pub secure: bool,
    pub same_site: SameSite,
}

impl CookiePolicy {
    /// `Secure` + `SameSite=Strict` in production, `Lax` over plain HTTP otherwise.
    pub fn for_env(production: bool) -> Self {
        if production {
            Self {
                secure: true,
                same_site: SameSite::Strict,
            }
        } else {
            Self {
                secure: false,
                same_site: SameSite::Lax,
            }
        }
    }

    fn build(&self, name: &str, value: String, path: &str, max_age: Duration) -> Cookie<'static> {
        Cookie::build((name.to_string(), value))
            .http_only(true)
            .secure(self.secure)
            .same_site(self.same_site)
            .path(path.to_string())
            .max_age(max_age)
            .build()
    }

    /// Build a httpOnly cookie for the access token.
    pub fn access_cookie(&self, token: &str, max_age_secs: i64) -> Cookie<'static> {
        self.build(
            ACCESS_COOKIE,
            token.to_string(),
            ACCESS_COOKIE_PATH,
            Duration::seconds(max_age_secs),
        )
    }

    /// Build a httpOnly cookie for the refresh token.
    pub fn refresh_cookie(&self, token: &str, max_age_secs: i64) -> Cookie<'static> {
        self.build(
            REFRESH_COOKIE,
            token.to_string(),
            REFRESH_COOKIE_PATH,
            Duration::seconds(max_age_secs),
        )
    }

    /// Add both token cookies to `jar`.
    pub fn set_tokens(
        &self,
        jar: CookieJar,
        access_token: &str,
        refresh_token: &str,
        access_ttl_secs: i64,
        refresh_ttl_secs: i64,
    ) -> CookieJar {
        jar.add(self.access_cookie(access_token, access_ttl_secs))
            .add(self.refresh_cookie(refresh_token, refresh_ttl_secs))
    }

    /// Overwrite both token cookies with expired, empty ones.
    pub fn clear_tokens(&self, jar: CookieJar) -> CookieJar {
        jar.add(self.build(ACCESS_COOKIE, String::new(), ACCESS_COOKIE_PATH, Duration::ZERO))
            .add(self.build(REFRESH_COOKIE, String::new(), REFRESH_COOKIE_PATH, Duration::ZERO))
    }
}

/// Access token from the cookie jar, if present.
pub fn access_token(jar: &CookieJar) -> Option<String> {
    non_empty(jar, ACCESS_COOKIE)
}

/// Refresh token from the cookie jar, if present.
pub fn refresh_token(jar: &CookieJar) -> Option<String> {
    non_empty(jar, REFRESH_COOKIE)
}

fn non_empty(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_cookies_are_strict_and_secure() {
        let c = CookiePolicy::for_env(true).refresh_cookie("tok", 60);
        assert_eq!(c.secure(), Some(true));
        assert_eq!(c.same_site(), Some(SameSite::Strict));
        assert_eq!(c.http_only(), Some(true));
        assert_eq!(c.path(), Some(REFRESH_COOKIE_PATH));
    }

    #[test]
    fn development_cookies_are_lax() {
        let c = CookiePolicy::for_env(false).access_cookie("tok", 60);
        assert_eq!(c.secure(), Some(false));
        assert_eq!(c.same_site(), Some(SameSite::Lax));
        assert_eq!(c.path(), Some(ACCESS_COOKIE_PATH));
        assert_eq!(c.max_age(), Some(Duration::seconds(60)));
    }

    #[test]
    fn cleared_cookies_read_as_absent() {
        let policy = CookiePolicy::for_env(false);
        let jar = policy.set_tokens(CookieJar::new(), "a", "r", 60, 60);
        assert_eq!(access_token(&jar).as_deref(), Some("a"));
        assert_eq!(refresh_token(&jar).as_deref(), Some("r"));

        let jar = policy.clear_tokens(jar);
        assert!(access_token(&jar).is_none());
        assert!(refresh_token(&jar).is_none());
    }
}
