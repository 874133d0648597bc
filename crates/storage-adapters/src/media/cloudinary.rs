//! # Cloudinary media store
//!
//! Signed upload/destroy calls against Cloudinary's REST API. Requests are
//! signed with SHA-256, so the account must have SHA-256 signatures enabled.
//! Upstream error messages are surfaced unchanged.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use domains::{DomainError, Image, MediaHandle, MediaStore, MediaUpload, Result};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

const DEFAULT_API_BASE: &str = "https://api.cloudinary.com/v1_1";

pub struct CloudinaryMediaStore {
    client: Client,
    api_base: String,
    cloud_name: String,
    api_key: String,
    api_secret: SecretString,
    /// Optional folder every upload is placed in
    folder: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: String,
}

impl CloudinaryMediaStore {
    pub fn new(
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: SecretString,
        folder: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| DomainError::Internal(err.to_string()))?;

        Ok(Self {
            client,
            api_base: DEFAULT_API_BASE.to_owned(),
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret,
            folder,
        })
    }

    /// Points the client at a different API root (e.g. a local stub).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_owned();
        self
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}/image/{action}", self.api_base, self.cloud_name)
    }

    /// Signature over the sorted `key=value` pairs followed by the API secret.
    fn sign(&self, params: &[(&str, &str)]) -> String {
        let mut sorted: Vec<_> = params
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .collect();
        sorted.sort_by_key(|(key, _)| *key);

        let to_sign = sorted
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha256::new();
        hasher.update(to_sign.as_bytes());
        hasher.update(self.api_secret.expose_secret().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Extracts Cloudinary's own error message from a failed response.
    async fn upstream_error(response: reqwest::Response) -> DomainError {
        let status = response.status();
        match response.json::<ErrorResponse>().await {
            Ok(body) => DomainError::MediaStore(body.error.message),
            Err(_) => DomainError::MediaStore(format!("media host responded with {status}")),
        }
    }
}

fn transport_error(err: reqwest::Error) -> DomainError {
    DomainError::MediaStore(err.to_string())
}

#[async_trait]
impl MediaStore for CloudinaryMediaStore {
    async fn upload(&self, upload: MediaUpload) -> Result<Image> {
        let timestamp = Utc::now().timestamp().to_string();
        let folder = self.folder.clone().unwrap_or_default();
        let signature = self.sign(&[("folder", &folder), ("timestamp", &timestamp)]);

        let file = Part::bytes(upload.bytes.to_vec())
            .file_name(upload.file_name)
            .mime_str(upload.content_type.as_ref())
            .map_err(transport_error)?;

        let mut form = Form::new()
            .part("file", file)
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature);
        if !folder.is_empty() {
            form = form.text("folder", folder);
        }

        let response = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(Self::upstream_error(response).await);
        }

        let body: UploadResponse = response.json().await.map_err(transport_error)?;
        debug!(public_id = %body.public_id, "uploaded to cloudinary");

        Ok(Image {
            url: body.secure_url,
            handle: MediaHandle::new(body.public_id),
        })
    }

    async fn delete(&self, handle: &MediaHandle) -> Result<()> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.sign(&[("public_id", handle.as_str()), ("timestamp", &timestamp)]);

        let response = self
            .client
            .post(self.endpoint("destroy"))
            .form(&[
                ("public_id", handle.as_str()),
                ("timestamp", timestamp.as_str()),
                ("api_key", self.api_key.as_str()),
                ("signature", signature.as_str()),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(Self::upstream_error(response).await);
        }

        let body: DestroyResponse = response.json().await.map_err(transport_error)?;
        match body.result.as_str() {
            "ok" => Ok(()),
            "not found" => {
                warn!(%handle, "media already gone upstream");
                Ok(())
            }
            other => Err(DomainError::MediaStore(format!(
                "media deletion failed: {other}"
            ))),
        }
    }
}
