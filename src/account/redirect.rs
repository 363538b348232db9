//! Return-url handling. Only same-origin relative paths are followed.

pub const HOME: &str = "/";

/// `/path` or `~/path`, but not `//host` or `/\host` (browsers treat both as
/// protocol-relative).
#[must_use]
pub fn is_local_url(url: &str) -> bool {
    let bytes = url.as_bytes();
    match bytes {
        [b'/'] => true,
        [b'/', second, ..] => *second != b'/' && *second != b'\\',
        [b'~', b'/'] => true,
        [b'~', b'/', third, ..] => *third != b'/' && *third != b'\\',
        _ => false,
    }
}

/// Where to send the caller after a successful login or registration.
#[must_use]
pub fn redirect_to_local(return_url: Option<&str>) -> String {
    match return_url {
        Some(url) if is_local_url(url) => url.strip_prefix('~').unwrap_or(url).to_string(),
        _ => HOME.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_relative_paths() {
        for url in ["/", "/Home/About", "/a?b=c", "~/", "~/Manage/Index"] {
            assert!(is_local_url(url), "{url} should be local");
        }
    }

    #[test]
    fn rejects_external_and_protocol_relative() {
        for url in [
            "",
            "http://evil.example.com",
            "https://evil.example.com/path",
            "//evil.example.com",
            "/\\evil.example.com",
            "~//evil.example.com",
            "~/\\evil.example.com",
            "evil.example.com",
            "javascript:alert(1)",
            "~",
        ] {
            assert!(!is_local_url(url), "{url} should not be local");
        }
    }

    #[test]
    fn redirect_defaults_to_home() {
        assert_eq!(redirect_to_local(None), HOME);
        assert_eq!(redirect_to_local(Some("https://evil.example.com")), HOME);
        assert_eq!(redirect_to_local(Some("//evil.example.com")), HOME);
    }

    #[test]
    fn redirect_strips_app_relative_marker() {
        assert_eq!(redirect_to_local(Some("~/Manage")), "/Manage");
        assert_eq!(redirect_to_local(Some("/Manage?tab=1")), "/Manage?tab=1");
    }
}
