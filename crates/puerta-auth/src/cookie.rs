//! `Set-Cookie` values for the session cookie.

use puerta_core::constants::SESSION_COOKIE;

/// Cookie carrying `token` for `max_age` seconds.
pub fn session_cookie(token: &str, max_age: u64, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!("{SESSION_COOKIE}={token}; Max-Age={max_age}; Path=/; HttpOnly; SameSite=Lax{secure}")
}

/// Cookie that makes the browser drop the session cookie.
///
/// Browsers match on name, domain and path only, so this also removes a
/// cookie that was set with `Secure`.
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Max-Age=-1; Path=/; HttpOnly; SameSite=Lax")
}

/// Value of the session cookie in a `Cookie` request header, if present.
pub fn session_token(cookie_header: &str) -> Option<&str> {
    cookie_header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_session_cookie() {
        assert_eq!(
            session_cookie("abc", 604800, false),
            "_puerta=abc; Max-Age=604800; Path=/; HttpOnly; SameSite=Lax"
        );
        assert!(session_cookie("abc", 1, true).ends_with("; Secure"));
    }

    #[test]
    fn test_clear_cookie() {
        assert!(clear_session_cookie().starts_with("_puerta=; Max-Age=-1; Path=/"));
    }

    #[rstest]
    #[case("_puerta=abc", Some("abc"))]
    #[case("theme=dark; _puerta=abc; lang=es", Some("abc"))]
    #[case("theme=dark", None)]
    #[case("_puerta=", None)]
    #[case("x_puerta=abc", None)]
    fn test_session_token(#[case] header: &str, #[case] expected: Option<&str>) {
        assert_eq!(session_token(header), expected);
    }
}
