//! # api-adapters
//!
//! Server-rendered HTTP surface for campgrounds, built on axum.
//! Handlers only translate between HTTP and `services`; they never touch
//! the repository or the media store directly.

#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod extract;
#[cfg(feature = "web-axum")]
pub mod flash;
#[cfg(feature = "web-axum")]
pub mod handlers;
#[cfg(feature = "web-axum")]
pub mod middleware;
#[cfg(feature = "web-axum")]
pub mod state;
#[cfg(feature = "web-axum")]
pub mod templates;
#[cfg(feature = "web-axum")]
pub mod upload;

#[cfg(feature = "web-axum")]
pub use web::{app, method_override, router, App};
#[cfg(feature = "web-axum")]
pub use state::{AppState, LocalMediaMount, WebSettings};

#[cfg(feature = "web-axum")]
mod web {
    use axum::extract::Request;
    use axum::http::Method;
    use axum::routing::{get, post};
    use axum::Router;
    use tower::util::MapRequest;
    use tower_http::services::ServeDir;

    use crate::handlers::campgrounds;
    use crate::middleware;
    use crate::state::AppState;

    /// The router wrapped in the method-override rewrite.
    pub type App = MapRequest<Router, fn(Request) -> Request>;

    pub fn router(state: AppState) -> Router {
        let settings = state.settings.clone();

        let mut router = Router::new()
            .route("/", get(campgrounds::root))
            .route("/campgrounds", get(campgrounds::index).post(campgrounds::create))
            .route("/campgrounds/new", get(campgrounds::new_form))
            .route(
                "/campgrounds/{id}",
                get(campgrounds::show)
                    .put(campgrounds::update)
                    .patch(campgrounds::update)
                    .delete(campgrounds::destroy),
            )
            .route("/campgrounds/{id}/edit", get(campgrounds::edit_form))
            .route("/campgrounds/{id}/like", post(campgrounds::like));

        if let Some(mount) = &settings.local_media {
            router = router.nest_service(&mount.url_prefix, ServeDir::new(&mount.root));
        }

        middleware::apply(router.with_state(state), &settings)
    }

    /// Routing happens after the rewrite, so it must wrap the whole router.
    pub fn app(state: AppState) -> App {
        MapRequest::new(router(state), method_override as fn(Request) -> Request)
    }

    /// Lets HTML forms reach PUT/PATCH/DELETE routes via `POST ?_method=VERB`.
    pub fn method_override(mut request: Request) -> Request {
        if request.method() != Method::POST {
            return request;
        }

        let target = request.uri().query().and_then(|query| {
            query
                .split('&')
                .find_map(|pair| pair.strip_prefix("_method="))
                .and_then(|verb| match verb.to_ascii_uppercase().as_str() {
                    "PUT" => Some(Method::PUT),
                    "PATCH" => Some(Method::PATCH),
                    "DELETE" => Some(Method::DELETE),
                    _ => None,
                })
        });

        if let Some(method) = target {
            *request.method_mut() = method;
        }
        request
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use axum::body::Body;

        fn post(uri: &str) -> Request {
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .body(Body::empty())
                .unwrap()
        }

        #[test]
        fn post_with_method_param_is_rewritten() {
            assert_eq!(method_override(post("/campgrounds/1?_method=DELETE")).method(), Method::DELETE);
            assert_eq!(method_override(post("/campgrounds/1?x=1&_method=put")).method(), Method::PUT);
        }

        #[test]
        fn unknown_verbs_are_left_alone() {
            assert_eq!(method_override(post("/campgrounds?_method=TRACE")).method(), Method::POST);
            assert_eq!(method_override(post("/campgrounds")).method(), Method::POST);
        }

        #[test]
        fn only_post_is_overridden() {
            let request = Request::builder()
                .method(Method::GET)
                .uri("/campgrounds/1?_method=DELETE")
                .body(Body::empty())
                .unwrap();
            assert_eq!(method_override(request).method(), Method::GET);
        }
    }
}
