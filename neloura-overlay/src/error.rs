use neloura_wcs::WcsError;
use thiserror::Error;

pub type OverlayResult<T> = Result<T, OverlayError>;

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("No usable WCS for the current header")]
    MissingWcs,

    #[error("No viewer attached")]
    ViewerUnavailable,

    #[error("Degenerate viewport {width}x{height}")]
    DegenerateViewport { width: f64, height: f64 },

    #[error("Invalid preview buffer: {message}")]
    InvalidPreview { message: String },

    #[error("Settings error: {source}")]
    Settings {
        #[from]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Wcs(#[from] WcsError),
}

impl OverlayError {
    pub fn degenerate_viewport(width: f64, height: f64) -> Self {
        Self::DegenerateViewport { width, height }
    }

    pub fn invalid_preview(message: impl Into<String>) -> Self {
        Self::InvalidPreview {
            message: message.into(),
        }
    }
}
