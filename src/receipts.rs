//! Receipt images: shrink before upload, then hand them to the image host.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};
use serde::Deserialize;
use uuid::Uuid;

use crate::config::{AppConfig, CloudinaryConfig, ReceiptLimits};
use crate::error::AppError;

const UPLOAD_TIMEOUT_SECS: u64 = 60;
const START_QUALITY: u8 = 90;
const MIN_QUALITY: u8 = 40;
const QUALITY_STEP: u8 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedImage {
    pub bytes: Vec<u8>,
    pub extension: &'static str,
    pub mime: &'static str,
}

/// Downscales to `max_dimension` on the longer side and re-encodes as JPEG
/// until the result fits `max_bytes` or the quality floor is reached. Images
/// already within both limits pass through untouched.
pub fn compress(bytes: &[u8], limits: ReceiptLimits) -> Result<CompressedImage, AppError> {
    let format = image::guess_format(bytes)?;
    let decoded = image::load_from_memory_with_format(bytes, format)?;
    let (width, height) = decoded.dimensions();
    let oversized = width.max(height) > limits.max_dimension;

    if !oversized && bytes.len() <= limits.max_bytes {
        return Ok(CompressedImage {
            bytes: bytes.to_vec(),
            extension: format.extensions_str().first().copied().unwrap_or("img"),
            mime: format.to_mime_type(),
        });
    }

    let resized = if oversized {
        decoded.resize(limits.max_dimension, limits.max_dimension, FilterType::Triangle)
    } else {
        decoded
    };

    let mut quality = START_QUALITY;
    loop {
        let encoded = encode_jpeg(&resized, quality)?;
        if encoded.len() <= limits.max_bytes || quality <= MIN_QUALITY {
            return Ok(CompressedImage {
                bytes: encoded,
                extension: "jpg",
                mime: ImageFormat::Jpeg.to_mime_type(),
            });
        }
        quality = quality.saturating_sub(QUALITY_STEP).max(MIN_QUALITY);
    }
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, AppError> {
    let rgb = image.to_rgb8();
    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, quality).encode_image(&rgb)?;
    Ok(out.into_inner())
}

pub enum ImageHost {
    Cloudinary {
        http: reqwest::Client,
        upload_url: String,
        upload_preset: String,
    },
    Local {
        dir: PathBuf,
    },
}

#[derive(Deserialize)]
struct CloudinaryResponse {
    secure_url: Option<String>,
    error: Option<CloudinaryError>,
}

#[derive(Deserialize)]
struct CloudinaryError {
    message: String,
}

impl ImageHost {
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        match &config.cloudinary {
            Some(cloudinary) => Self::cloudinary(cloudinary),
            None => {
                let dir = config.receipts_dir();
                std::fs::create_dir_all(&dir)?;
                Ok(ImageHost::Local { dir })
            }
        }
    }

    fn cloudinary(config: &CloudinaryConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(UPLOAD_TIMEOUT_SECS))
            .build()?;
        Ok(ImageHost::Cloudinary {
            http,
            upload_url: cloudinary_upload_url(&config.cloud_name),
            upload_preset: config.upload_preset.trim().to_string(),
        })
    }

    /// Directory served at `/receipts` when images are kept on disk.
    pub fn local_dir(&self) -> Option<&Path> {
        match self {
            ImageHost::Local { dir } => Some(dir),
            ImageHost::Cloudinary { .. } => None,
        }
    }

    /// Stores the image and returns its public URL.
    pub async fn upload(&self, image: CompressedImage) -> Result<String, AppError> {
        let filename = format!(
            "receipt-{}-{}.{}",
            Utc::now().timestamp_millis(),
            &Uuid::new_v4().simple().to_string()[..8],
            image.extension
        );
        match self {
            ImageHost::Local { dir } => {
                rocket::tokio::fs::write(dir.join(&filename), &image.bytes).await?;
                Ok(format!("/receipts/{filename}"))
            }
            ImageHost::Cloudinary {
                http,
                upload_url,
                upload_preset,
            } => {
                let part = reqwest::multipart::Part::bytes(image.bytes)
                    .file_name(filename)
                    .mime_str(image.mime)?;
                let form = reqwest::multipart::Form::new()
                    .part("file", part)
                    .text("upload_preset", upload_preset.clone());
                let response = http.post(upload_url).multipart(form).send().await?;
                let body: CloudinaryResponse = response.json().await?;
                secure_url(body)
            }
        }
    }
}

fn cloudinary_upload_url(cloud_name: &str) -> String {
    format!(
        "https://api.cloudinary.com/v1_1/{}/image/upload",
        cloud_name.trim()
    )
}

fn secure_url(body: CloudinaryResponse) -> Result<String, AppError> {
    match (body.secure_url, body.error) {
        (Some(url), _) => Ok(url),
        (None, Some(error)) => Err(AppError::Upload(error.message)),
        (None, None) => Err(AppError::Upload("Gagal upload ke Cloudinary".into())),
    }
}

#[cfg(test)]
#[path = "receipts_test.rs"]
mod tests;
