use image::{DynamicImage, RgbaImage};
use log::info;
use std::path::Path;

use crate::error::MapError;

/// Persists a rendered map
pub trait ImageExporter: Send + Sync {
    fn export(&self, image: &RgbaImage, path: &Path) -> Result<(), MapError>;
}

/// Writes maps to disk, picking the format from the file extension.
/// Formats without an alpha channel get the map flattened to RGB first.
pub struct FileExporter;

impl ImageExporter for FileExporter {
    fn export(&self, image: &RgbaImage, path: &Path) -> Result<(), MapError> {
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(|extension| extension.to_ascii_lowercase());
        match extension.as_deref() {
            Some("jpg") | Some("jpeg") | Some("bmp") => {
                DynamicImage::ImageRgba8(image.clone()).to_rgb8().save(path)?
            }
            _ => image.save(path)?,
        }
        info!("Saved map to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn sample() -> RgbaImage {
        RgbaImage::from_pixel(40, 30, Rgba([10, 200, 30, 255]))
    }

    #[test]
    fn test_export_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.png");
        FileExporter.export(&sample(), &path).expect("Failed to export");

        let saved = image::open(&path).unwrap().to_rgba8();
        assert_eq!(saved, sample());
    }

    #[test]
    fn test_export_jpeg_drops_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.JPG");
        FileExporter.export(&sample(), &path).expect("Failed to export");

        let saved = image::open(&path).unwrap();
        assert_eq!((saved.width(), saved.height()), (40, 30));
        assert!(!saved.color().has_alpha());
    }

    #[test]
    fn test_export_unknown_extension_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = FileExporter.export(&sample(), &dir.path().join("map.xyz"));
        assert!(matches!(result, Err(MapError::Export(_))));
    }

    #[test]
    fn test_export_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("map.png");
        assert!(FileExporter.export(&sample(), &path).is_err());
    }
}
