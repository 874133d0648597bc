use std::path::PathBuf;
use std::sync::Arc;

use domains::IdentityVerifier;
use services::{CampgroundService, OwnershipGuard};

/// HTTP-only knobs, resolved from configuration by the binary.
#[derive(Debug, Clone)]
pub struct WebSettings {
    /// Cookie carrying the bearer token
    pub auth_cookie: String,
    pub login_path: String,
    pub max_upload_bytes: usize,
    /// Directory served under `url_prefix` when media is stored locally
    pub local_media: Option<LocalMediaMount>,
}

#[derive(Debug, Clone)]
pub struct LocalMediaMount {
    pub url_prefix: String,
    pub root: PathBuf,
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            auth_cookie: "token".into(),
            login_path: "/login".into(),
            max_upload_bytes: 10 * 1024 * 1024,
            local_media: None,
        }
    }
}

/// Shared across every request handler.
#[derive(Clone)]
pub struct AppState {
    pub campgrounds: Arc<CampgroundService>,
    pub guard: Arc<OwnershipGuard>,
    pub identities: Arc<dyn IdentityVerifier>,
    pub settings: Arc<WebSettings>,
}
