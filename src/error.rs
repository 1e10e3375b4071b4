use mapdraw::DrawError;
use thiserror::Error;

/// Errors reported to callers of the map providers
#[derive(Error, Debug)]
pub enum MapError {
    #[error("Trip has no points")]
    EmptyTrip,

    #[error("Invalid map dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Invalid coordinate: lat {lat}, lng {lng}")]
    InvalidCoordinate { lat: f64, lng: f64 },

    #[error("Failed to export map: {0}")]
    Export(#[from] image::ImageError),
}

impl From<DrawError> for MapError {
    fn from(error: DrawError) -> Self {
        match error {
            DrawError::InvalidDimensions { width, height } => {
                MapError::InvalidDimensions { width, height }
            }
        }
    }
}
