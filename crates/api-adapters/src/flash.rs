//! One-shot messages carried across a redirect in a cookie.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

pub const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    /// Bootstrap alert class used by the layout.
    pub fn css_class(&self) -> &'static str {
        match self.kind {
            FlashKind::Success => "alert-success",
            FlashKind::Error => "alert-danger",
        }
    }

    fn encode(&self) -> String {
        // Serializing a struct of two strings cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    fn decode(value: &str) -> Option<Self> {
        let json = URL_SAFE_NO_PAD.decode(value).ok()?;
        serde_json::from_slice(&json).ok()
    }
}

/// Queues `flash` for the next rendered page.
pub fn set(jar: CookieJar, flash: &Flash) -> CookieJar {
    jar.add(
        Cookie::build((FLASH_COOKIE, flash.encode()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax),
    )
}

/// Reads and clears the pending flash, if any.
pub fn take(jar: CookieJar) -> (CookieJar, Option<Flash>) {
    let Some(cookie) = jar.get(FLASH_COOKIE) else {
        return (jar, None);
    };
    let flash = Flash::decode(cookie.value());
    (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), flash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flash_survives_the_cookie() {
        let jar = set(CookieJar::new(), &Flash::success("Successfully Updated!"));

        let (_, flash) = take(jar);

        assert_eq!(flash, Some(Flash::success("Successfully Updated!")));
    }

    #[test]
    fn taking_removes_the_cookie() {
        let jar = set(CookieJar::new(), &Flash::error("nope"));

        let (jar, _) = take(jar);

        assert!(jar.get(FLASH_COOKIE).is_none());
    }

    #[test]
    fn tampered_cookie_yields_nothing() {
        let jar = CookieJar::new().add(Cookie::new(FLASH_COOKIE, "%%%"));

        let (_, flash) = take(jar);

        assert_eq!(flash, None);
    }

    #[test]
    fn kinds_map_to_alert_classes() {
        assert_eq!(Flash::success("ok").css_class(), "alert-success");
        assert_eq!(Flash::error("no").css_class(), "alert-danger");
    }
}
