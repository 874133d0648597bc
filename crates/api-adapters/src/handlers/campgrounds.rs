//! # Campground handlers
//!
//! Translate HTTP into service calls. Reads render pages; writes always answer
//! with a 303 redirect and a flash message.

use axum::extract::{Multipart, State};
use axum::http::HeaderMap;
use axum::response::{Html, Redirect};
use axum_extra::extract::cookie::CookieJar;
use domains::DomainError;
use tracing::error;

use crate::error::{ApiError, INDEX_PATH};
use crate::extract::{CampgroundPath, CurrentUser, Owner, Viewer};
use crate::flash::{self, Flash};
use crate::state::AppState;
use crate::templates::{render, EditTemplate, IndexTemplate, Layout, NewTemplate, ShowTemplate};
use crate::upload::CampgroundSubmission;

type Page = Result<(CookieJar, Html<String>), ApiError>;
type Action = Result<(CookieJar, Redirect), ApiError>;

fn detail_path(id: impl std::fmt::Display) -> String {
    format!("/campgrounds/{id}")
}

pub async fn root() -> Redirect {
    Redirect::to(INDEX_PATH)
}

/// GET /campgrounds
pub async fn index(State(state): State<AppState>, Viewer(viewer): Viewer, jar: CookieJar) -> Page {
    let (jar, mut flash) = flash::take(jar);
    // The index is where failed redirects land, so it cannot redirect itself.
    let campgrounds = match state.campgrounds.list().await {
        Ok(campgrounds) => campgrounds,
        Err(err) => {
            error!(error = %err, "could not list campgrounds");
            flash = Some(Flash::error(err.to_string()));
            Vec::new()
        }
    };

    let page = render(&IndexTemplate {
        layout: Layout::new(flash, viewer, &state.settings),
        campgrounds,
    })?;
    Ok((jar, page))
}

/// GET /campgrounds/new
pub async fn new_form(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    jar: CookieJar,
) -> Page {
    let (jar, flash) = flash::take(jar);
    let page = render(&NewTemplate {
        layout: Layout::new(flash, Some(identity), &state.settings),
    })?;
    Ok((jar, page))
}

/// POST /campgrounds
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    headers: HeaderMap,
    jar: CookieJar,
    multipart: Multipart,
) -> Action {
    let submission = CampgroundSubmission::read(multipart)
        .await
        .map_err(|err| ApiError::back(err, &headers))?;

    let campground = state
        .campgrounds
        .create(&identity, submission.fields, submission.image)
        .await
        .map_err(|err| ApiError::back(err, &headers))?;

    let jar = flash::set(jar, &Flash::success("Successfully created campground!"));
    Ok((jar, Redirect::to(&detail_path(campground.id))))
}

/// GET /campgrounds/{id}
pub async fn show(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    CampgroundPath(id): CampgroundPath,
    jar: CookieJar,
) -> Page {
    let (jar, flash) = flash::take(jar);
    let detail = state
        .campgrounds
        .show(id)
        .await
        .map_err(|err| ApiError::redirect(err, INDEX_PATH))?;

    let page = render(&ShowTemplate::new(
        Layout::new(flash, viewer, &state.settings),
        detail,
    ))?;
    Ok((jar, page))
}

/// GET /campgrounds/{id}/edit
pub async fn edit_form(State(state): State<AppState>, owner: Owner, jar: CookieJar) -> Page {
    let (jar, flash) = flash::take(jar);
    let page = render(&EditTemplate {
        layout: Layout::new(flash, Some(owner.identity), &state.settings),
        campground: owner.campground,
    })?;
    Ok((jar, page))
}

/// PUT /campgrounds/{id}
pub async fn update(
    State(state): State<AppState>,
    owner: Owner,
    headers: HeaderMap,
    jar: CookieJar,
    multipart: Multipart,
) -> Action {
    let submission = CampgroundSubmission::read(multipart)
        .await
        .map_err(|err| ApiError::back(err, &headers))?;

    let id = owner.campground.id;
    state
        .campgrounds
        .update(&owner.identity, id, submission.fields, submission.image)
        .await
        .map_err(|err| ApiError::back(err, &headers))?;

    let jar = flash::set(jar, &Flash::success("Successfully Updated!"));
    Ok((jar, Redirect::to(&detail_path(id))))
}

/// DELETE /campgrounds/{id}
pub async fn destroy(
    State(state): State<AppState>,
    owner: Owner,
    headers: HeaderMap,
    jar: CookieJar,
) -> Action {
    state
        .campgrounds
        .delete(&owner.identity, owner.campground.id)
        .await
        .map_err(|err| match err {
            // The media is already gone by then; the detail page is no place to land.
            err @ DomainError::Repository(_) => ApiError::redirect(err, INDEX_PATH),
            err => ApiError::back(err, &headers),
        })?;

    let jar = flash::set(jar, &Flash::success("Campground deleted successfully!"));
    Ok((jar, Redirect::to(INDEX_PATH)))
}

/// POST /campgrounds/{id}/like
pub async fn like(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    CampgroundPath(id): CampgroundPath,
    headers: HeaderMap,
    jar: CookieJar,
) -> Action {
    let campground = state
        .campgrounds
        .toggle_like(&identity, id)
        .await
        .map_err(|err| ApiError::back(err, &headers))?;

    Ok((jar, Redirect::to(&detail_path(campground.id))))
}
