//! # ApiError
//!
//! Every failure in a page handler ends up as a redirect carrying an error
//! flash. Only a template that cannot render produces an error page.

use axum::http::header::REFERER;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use domains::DomainError;
use thiserror::Error;
use tracing::{error, warn};

use crate::flash::{self, Flash};

pub const INDEX_PATH: &str = "/campgrounds";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{error}")]
    Redirect { error: DomainError, to: String },

    #[error("template rendering failed: {0}")]
    Render(#[from] askama::Error),
}

impl ApiError {
    pub fn redirect(error: DomainError, to: impl Into<String>) -> Self {
        Self::Redirect {
            error,
            to: to.into(),
        }
    }

    /// Sends the user back to the page the request came from.
    pub fn back(error: DomainError, headers: &HeaderMap) -> Self {
        Self::redirect(error, back_path(headers))
    }

    fn flash_message(error: &DomainError) -> String {
        match error {
            DomainError::Internal(_) => "Something went wrong".into(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Redirect { error, to } => {
                match &error {
                    err if err.is_upstream() => error!(error = %err, "upstream failure"),
                    DomainError::Internal(msg) => error!(error = %msg, "internal failure"),
                    err => warn!(error = %err, "request refused"),
                }
                let jar = flash::set(CookieJar::new(), &Flash::error(Self::flash_message(&error)));
                (jar, Redirect::to(&to)).into_response()
            }
            Self::Render(err) => {
                error!(error = %err, "template rendering failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}

/// Path and query of the `Referer`, restricted to this site.
pub fn back_path(headers: &HeaderMap) -> String {
    headers
        .get(REFERER)
        .and_then(|value| value.to_str().ok())
        .and_then(local_path)
        .unwrap_or_else(|| INDEX_PATH.to_owned())
}

fn local_path(referer: &str) -> Option<String> {
    let path = match referer.split_once("://") {
        Some((_, rest)) => &rest[rest.find('/')?..],
        None => referer,
    };
    // `//host` would be read by browsers as another origin.
    (path.starts_with('/') && !path.starts_with("//")).then(|| path.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::{LOCATION, SET_COOKIE};
    use axum::http::HeaderValue;

    fn referer(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn back_uses_referer_path() {
        let headers = referer("http://localhost:3000/campgrounds/abc/edit?x=1");
        assert_eq!(back_path(&headers), "/campgrounds/abc/edit?x=1");
    }

    #[test]
    fn back_without_referer_goes_to_index() {
        assert_eq!(back_path(&HeaderMap::new()), INDEX_PATH);
    }

    #[test]
    fn back_ignores_protocol_relative_paths() {
        assert_eq!(back_path(&referer("//evil.example/x")), INDEX_PATH);
        assert_eq!(back_path(&referer("https://evil.example")), INDEX_PATH);
    }

    #[test]
    fn redirect_sets_location_and_flash_cookie() {
        let response = ApiError::redirect(DomainError::Forbidden, "/campgrounds/1").into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/campgrounds/1");
        let cookie = response.headers()[SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("flash="));
    }

    #[test]
    fn upstream_messages_are_shown_verbatim() {
        let msg = ApiError::flash_message(&DomainError::MediaStore("Invalid Signature".into()));
        assert_eq!(msg, "Invalid Signature");
    }

    #[test]
    fn internal_details_are_hidden() {
        let msg = ApiError::flash_message(&DomainError::Internal("pool exhausted".into()));
        assert_eq!(msg, "Something went wrong");
    }
}
