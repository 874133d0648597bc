//! Shared fixtures for the integration test binaries.

use std::sync::Arc;

use api_adapters::{App, AppState, WebSettings};
use auth_adapters::{JwtIdentityVerifier, DEFAULT_TOKEN_TTL};
use bytes::Bytes;
use domains::{
    Author, Campground, CampgroundFields, CampgroundRepository, Identity, MediaStore, MediaUpload,
    UserId,
};
use secrecy::SecretString;
use services::{CampgroundService, OwnershipGuard};
use storage_adapters::{MemoryCampgroundRepository, MemoryMediaStore};

pub const JWT_SECRET: &str = "integration-secret";
pub const BOUNDARY: &str = "yelpcamp-test-boundary";

/// Smallest byte prefix `image::guess_format` recognises as JPEG.
pub const JPEG_BYTES: &[u8] = b"\xFF\xD8\xFF\xE0\0\x10JFIF\0\x01";

pub fn identity(name: &str) -> Identity {
    Identity {
        id: UserId::generate(),
        username: name.into(),
    }
}

pub fn fields(name: &str) -> CampgroundFields {
    CampgroundFields {
        name: name.into(),
        price: "20".into(),
        description: "quiet".into(),
    }
}

pub fn jpeg_upload(file_name: &str) -> MediaUpload {
    MediaUpload {
        file_name: file_name.into(),
        content_type: mime::IMAGE_JPEG,
        bytes: Bytes::from_static(JPEG_BYTES),
    }
}

/// Service over in-memory adapters, keeping handles on both for assertions.
pub struct Backends {
    pub repo: Arc<MemoryCampgroundRepository>,
    pub media: Arc<MemoryMediaStore>,
}

impl Backends {
    pub fn new() -> Self {
        Self {
            repo: Arc::new(MemoryCampgroundRepository::new()),
            media: Arc::new(MemoryMediaStore::new()),
        }
    }

    pub fn service(&self) -> CampgroundService {
        CampgroundService::new(self.repo.clone(), self.media.clone())
    }

    /// Service whose media calls go to `media` instead of the in-memory store.
    pub fn service_with_media(&self, media: Arc<dyn MediaStore>) -> CampgroundService {
        CampgroundService::new(self.repo.clone(), media)
    }

    pub async fn stored(&self, campground: &Campground) -> Option<Campground> {
        self.repo.find(campground.id).await.ok().flatten()
    }
}

impl Default for Backends {
    fn default() -> Self {
        Self::new()
    }
}

/// The full HTTP application over in-memory adapters.
pub struct TestApp {
    pub app: App,
    pub backends: Backends,
    verifier: Arc<JwtIdentityVerifier>,
}

impl TestApp {
    pub fn new() -> Self {
        let backends = Backends::new();
        let repo: Arc<dyn CampgroundRepository> = backends.repo.clone();
        Self::assemble(backends, repo)
    }

    /// App whose service and guard read and write through `repo` instead of
    /// the in-memory repository in `backends`.
    pub fn with_repository(repo: Arc<dyn CampgroundRepository>) -> Self {
        Self::assemble(Backends::new(), repo)
    }

    fn assemble(backends: Backends, repo: Arc<dyn CampgroundRepository>) -> Self {
        let verifier = Arc::new(JwtIdentityVerifier::new(&SecretString::from(JWT_SECRET)));
        let media: Arc<dyn MediaStore> = backends.media.clone();

        let state = AppState {
            campgrounds: Arc::new(CampgroundService::new(repo.clone(), media)),
            guard: Arc::new(OwnershipGuard::new(repo)),
            identities: verifier.clone(),
            settings: Arc::new(WebSettings::default()),
        };

        Self {
            app: api_adapters::app(state),
            backends,
            verifier,
        }
    }

    /// `Cookie` header value authenticating as `identity`.
    pub fn cookie_for(&self, identity: &Identity) -> String {
        let token = self
            .verifier
            .issue(identity, DEFAULT_TOKEN_TTL)
            .expect("token issues");
        format!("token={token}")
    }

    pub async fn seed(&self, owner: &Identity, name: &str) -> Campground {
        let campground = Campground::new(Author::from(owner), fields(name), None);
        self.backends
            .repo
            .insert(&campground)
            .await
            .expect("seed insert");
        campground
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// A `multipart/form-data` body using [`BOUNDARY`].
pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}
