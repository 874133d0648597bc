//! Multipart campground forms.
//!
//! Everything rejected here is rejected before any service call, so a bad
//! upload never reaches the media store.

use axum::extract::multipart::{Field, Multipart, MultipartError};
use bytes::Bytes;
use domains::{CampgroundFields, DomainError, MediaUpload};
use image::ImageFormat;
use mime::Mime;

pub const IMAGE_FIELD: &str = "image";
pub const IMAGE_ONLY: &str = "Only image files are allowed!";

const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

/// The parsed body of a create or update form.
#[derive(Debug)]
pub struct CampgroundSubmission {
    pub fields: CampgroundFields,
    pub image: Option<MediaUpload>,
}

impl CampgroundSubmission {
    pub async fn read(mut multipart: Multipart) -> Result<Self, DomainError> {
        let mut name = None;
        let mut price = None;
        let mut description = None;
        let mut image = None;

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let Some(key) = field.name().map(field_key) else {
                continue;
            };
            match key.as_str() {
                IMAGE_FIELD => image = read_image(field).await?,
                "name" => name = Some(text(field).await?),
                "price" => price = Some(text(field).await?),
                "description" => description = Some(text(field).await?),
                _ => {}
            }
        }

        Ok(Self {
            fields: CampgroundFields {
                name: required("name", name)?,
                price: required("price", price)?,
                description: required("description", description)?,
            },
            image,
        })
    }
}

/// `campground[name]` and `name` address the same field.
fn field_key(raw: &str) -> String {
    raw.strip_prefix("campground[")
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(raw)
        .to_owned()
}

fn required(label: &str, value: Option<String>) -> Result<String, DomainError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_owned()),
        _ => Err(DomainError::Validation(format!("Campground {label} is required"))),
    }
}

async fn text(field: Field<'_>) -> Result<String, DomainError> {
    field.text().await.map_err(multipart_error)
}

async fn read_image(field: Field<'_>) -> Result<Option<MediaUpload>, DomainError> {
    // Browsers send an empty, unnamed part when no file was chosen.
    let file_name = field.file_name().unwrap_or_default().to_owned();
    let bytes = field.bytes().await.map_err(multipart_error)?;
    if file_name.is_empty() && bytes.is_empty() {
        return Ok(None);
    }

    validate_image(file_name, bytes).map(Some)
}

/// Accepts jpg/jpeg/png/gif by extension whose bytes really are that kind of image.
pub fn validate_image(file_name: String, bytes: Bytes) -> Result<MediaUpload, DomainError> {
    let rejected = || DomainError::Validation(IMAGE_ONLY.into());

    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .ok_or_else(rejected)?;

    let format = image::guess_format(&bytes).map_err(|_| rejected())?;
    if !matches!(format, ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Gif) {
        return Err(rejected());
    }

    let content_type: Mime = mime_guess::from_ext(&extension)
        .first()
        .filter(|mime| mime.type_() == mime::IMAGE)
        .ok_or_else(rejected)?;

    Ok(MediaUpload {
        file_name,
        content_type,
        bytes,
    })
}

fn multipart_error(err: MultipartError) -> DomainError {
    DomainError::Validation(err.body_text())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG: &[u8] = b"\xFF\xD8\xFF\xE0\0\x10JFIF\0";

    #[test]
    fn bracketed_names_are_unwrapped() {
        assert_eq!(field_key("campground[price]"), "price");
        assert_eq!(field_key("price"), "price");
        assert_eq!(field_key("campground[price"), "campground[price");
    }

    #[test]
    fn png_with_png_extension_is_accepted() {
        let upload = validate_image("tent.PNG".into(), Bytes::from_static(PNG)).unwrap();
        assert_eq!(upload.content_type, mime::IMAGE_PNG);
        assert_eq!(upload.file_name, "tent.PNG");
    }

    #[test]
    fn jpeg_bytes_are_accepted_under_jpg() {
        let upload = validate_image("valid.jpg".into(), Bytes::from_static(JPEG)).unwrap();
        assert_eq!(upload.content_type, mime::IMAGE_JPEG);
    }

    #[test]
    fn wrong_extension_is_rejected() {
        let err = validate_image("notes.txt".into(), Bytes::from_static(PNG)).unwrap_err();
        assert_eq!(err, DomainError::Validation(IMAGE_ONLY.into()));
    }

    #[test]
    fn disguised_file_is_rejected() {
        let err = validate_image("evil.jpg".into(), Bytes::from_static(b"#!/bin/sh")).unwrap_err();
        assert_eq!(err, DomainError::Validation(IMAGE_ONLY.into()));
    }

    #[test]
    fn blank_fields_are_rejected() {
        assert!(required("name", Some("  ".into())).is_err());
        assert!(required("name", None).is_err());
        assert_eq!(required("name", Some(" Pine ".into())).unwrap(), "Pine");
    }
}
