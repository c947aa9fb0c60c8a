use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::GenericImageView;
use shared::{
    domain::SelectedScan,
    error::{ScanError, ScanErrorKind},
};
use thiserror::Error;

pub const PREVIEW_MAX_EDGE: u32 = 512;

/// Decoded RGBA preview of a selected scan, downscaled so the longest edge
/// fits [`PREVIEW_MAX_EDGE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPreview {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct LoadedPreview {
    pub file: SelectedScan,
    pub preview: ScanPreview,
}

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },
}

impl From<PreviewError> for ScanError {
    fn from(err: PreviewError) -> Self {
        let kind = match err {
            PreviewError::Read { .. } => ScanErrorKind::FileRead,
            PreviewError::Decode { .. } => ScanErrorKind::ImageDecode,
        };
        ScanError::new(kind, err.to_string())
    }
}

#[async_trait]
pub trait PreviewLoader: Send + Sync {
    async fn load_preview(&self, path: &Path) -> Result<LoadedPreview, PreviewError>;
}

/// Reads and decodes the image behind a selection. Any decodable raster
/// format passes; anything else surfaces as a decode failure. There is no
/// size or type validation beyond that.
#[derive(Debug, Default)]
pub struct ImagePreviewLoader;

#[async_trait]
impl PreviewLoader for ImagePreviewLoader {
    async fn load_preview(&self, path: &Path) -> Result<LoadedPreview, PreviewError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| PreviewError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let size_bytes = bytes.len() as u64;

        let decoded = image::load_from_memory(&bytes).map_err(|source| PreviewError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

        let (orig_w, orig_h) = decoded.dimensions();
        let resized = if orig_w.max(orig_h) > PREVIEW_MAX_EDGE {
            decoded.resize(
                PREVIEW_MAX_EDGE,
                PREVIEW_MAX_EDGE,
                image::imageops::FilterType::Triangle,
            )
        } else {
            decoded
        };
        let rgba = resized.to_rgba8();
        let (width, height) = rgba.dimensions();

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = mime_guess::from_path(path)
            .first()
            .map(|mime| mime.essence_str().to_string());

        Ok(LoadedPreview {
            file: SelectedScan {
                path: path.to_path_buf(),
                file_name,
                size_bytes,
                mime_type,
            },
            preview: ScanPreview {
                width,
                height,
                rgba: rgba.into_raw(),
            },
        })
    }
}
