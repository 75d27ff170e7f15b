//! Anti-forgery token handling for state-changing requests.

use percent_encoding::percent_decode_str;

pub const COOKIE_NAME: &str = "csrftoken";
pub const HEADER_NAME: &str = "X-CSRFToken";

/// Looks up `name` in a `document.cookie` style string and URI-decodes it.
pub fn cookie_value(cookie_header: &str, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    cookie_header
        .split(';')
        .map(str::trim)
        .find_map(|cookie| cookie.strip_prefix(prefix.as_str()))
        .map(|raw| percent_decode_str(raw).decode_utf8_lossy().into_owned())
}

/// Methods that never change server state go out without a token.
pub fn requires_token(method: &str) -> bool {
    !["GET", "HEAD", "OPTIONS", "TRACE"]
        .iter()
        .any(|safe| safe.eq_ignore_ascii_case(method))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken(String);

impl CsrfToken {
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    pub fn from_cookies(cookie_header: &str) -> Option<Self> {
        cookie_value(cookie_header, COOKIE_NAME).and_then(Self::new)
    }

    pub fn value(&self) -> &str {
        &self.0
    }

    /// Header to attach, if any. Cross-domain requests never carry the token.
    pub fn header_for(&self, method: &str, cross_domain: bool) -> Option<(&'static str, &str)> {
        if !cross_domain && requires_token(method) {
            Some((HEADER_NAME, self.value()))
        } else {
            None
        }
    }
}
