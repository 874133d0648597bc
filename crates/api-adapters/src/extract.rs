//! Request extractors resolving who is asking and for which campground.

use std::convert::Infallible;

use axum::extract::{FromRequestParts, Path};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;
use domains::{Campground, CampgroundId, DomainError, Identity};
use tracing::debug;

use crate::error::{back_path, ApiError, INDEX_PATH};
use crate::state::AppState;

/// Bearer token from the auth cookie, else from `Authorization: Bearer`.
fn bearer_token(parts: &Parts, cookie_name: &str) -> Option<String> {
    let jar = CookieJar::from_headers(&parts.headers);
    if let Some(cookie) = jar.get(cookie_name) {
        return Some(cookie.value().to_owned());
    }

    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_owned())
}

fn resolve(parts: &Parts, state: &AppState) -> Option<Identity> {
    let token = bearer_token(parts, &state.settings.auth_cookie)?;
    match state.identities.verify(&token) {
        Ok(identity) => Some(identity),
        Err(err) => {
            debug!(error = %err, "ignoring unusable token");
            None
        }
    }
}

/// The identity of a logged-in user. Anonymous requests are sent to login.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        resolve(parts, state).map(CurrentUser).ok_or_else(|| {
            ApiError::redirect(DomainError::Unauthenticated, state.settings.login_path.clone())
        })
    }
}

/// Whoever is looking at a page, logged in or not.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<Identity>);

impl FromRequestParts<AppState> for Viewer {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Viewer(resolve(parts, state)))
    }
}

/// `{id}` path segment; malformed ids read as a missing campground.
#[derive(Debug, Clone, Copy)]
pub struct CampgroundPath(pub CampgroundId);

impl FromRequestParts<AppState> for CampgroundPath {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match Path::<String>::from_request_parts(parts, state).await {
            Ok(Path(raw)) => raw
                .parse::<CampgroundId>()
                .map(CampgroundPath)
                .map_err(|_| ApiError::redirect(DomainError::not_found("Campground", raw), INDEX_PATH)),
            Err(rejection) => Err(ApiError::redirect(
                DomainError::not_found("Campground", rejection.body_text()),
                INDEX_PATH,
            )),
        }
    }
}

/// A logged-in user who owns the campground named in the path.
#[derive(Debug, Clone)]
pub struct Owner {
    pub identity: Identity,
    pub campground: Campground,
}

impl FromRequestParts<AppState> for Owner {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(identity) = CurrentUser::from_request_parts(parts, state).await?;
        let CampgroundPath(id) = CampgroundPath::from_request_parts(parts, state).await?;

        match state.guard.authorize(&identity, id).await {
            Ok(campground) => Ok(Owner {
                identity,
                campground,
            }),
            Err(err @ DomainError::NotFound { .. }) => Err(ApiError::redirect(err, INDEX_PATH)),
            Err(err) => Err(ApiError::redirect(err, back_path(&parts.headers))),
        }
    }
}
