//! Application settings extracted from Rocket's figment (`Rocket.toml` plus
//! `ROCKET_*` environment overrides).

use std::path::{Path, PathBuf};

use rocket::figment::Figment;
use serde::Deserialize;

use crate::error::AppError;

pub const DEFAULT_RECEIPT_MAX_BYTES: usize = 512 * 1024;
pub const DEFAULT_RECEIPT_MAX_DIMENSION: u32 = 800;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Local,
    Supabase,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub upload_preset: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptLimits {
    pub max_bytes: usize,
    pub max_dimension: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub supabase: Option<SupabaseConfig>,
    #[serde(default)]
    pub cloudinary: Option<CloudinaryConfig>,
    #[serde(default = "default_receipt_max_bytes")]
    pub receipt_max_bytes: usize,
    #[serde(default = "default_receipt_max_dimension")]
    pub receipt_max_dimension: u32,
}

impl AppConfig {
    pub fn from_figment(figment: &Figment) -> Result<Self, AppError> {
        let config: AppConfig = figment
            .extract()
            .map_err(|err| AppError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.backend == BackendKind::Supabase {
            let Some(supabase) = &self.supabase else {
                return Err(AppError::Config(
                    "backend = \"supabase\" requires a [supabase] table with url and anon_key".into(),
                ));
            };
            if supabase.url.trim().is_empty() || supabase.anon_key.trim().is_empty() {
                return Err(AppError::Config("supabase url and anon_key must not be empty".into()));
            }
        }
        if let Some(cloudinary) = &self.cloudinary {
            if cloudinary.cloud_name.trim().is_empty() || cloudinary.upload_preset.trim().is_empty() {
                return Err(AppError::Config(
                    "cloudinary cloud_name and upload_preset must not be empty".into(),
                ));
            }
        }
        if self.receipt_max_bytes == 0 || self.receipt_max_dimension == 0 {
            return Err(AppError::Config("receipt limits must be positive".into()));
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("uang_sakti.sqlite")
    }

    pub fn receipts_dir(&self) -> PathBuf {
        receipts_dir(&self.data_dir)
    }

    pub fn receipt_limits(&self) -> ReceiptLimits {
        ReceiptLimits {
            max_bytes: self.receipt_max_bytes,
            max_dimension: self.receipt_max_dimension,
        }
    }
}

fn receipts_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("receipts")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_receipt_max_bytes() -> usize {
    DEFAULT_RECEIPT_MAX_BYTES
}

fn default_receipt_max_dimension() -> u32 {
    DEFAULT_RECEIPT_MAX_DIMENSION
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
