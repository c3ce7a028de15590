//! Error type shared by the facade and the renderers.

use qrcode::types::QrError;
use thiserror::Error;

/// Errors produced while building, rendering or exporting a QR code.
///
/// The facade itself never fails; everything here originates in a renderer
/// (or in the I/O around its output) and is passed through unchanged.
#[derive(Debug, Error)]
pub enum Error {
    /// The encoder rejected the payload (too long, bad character for the mode, ...).
    #[error("QR encoding failed: {0}")]
    Encode(QrError),

    #[error("invalid color {0:?}")]
    InvalidColor(String),

    #[error("unsupported {group} type {value:?}")]
    UnsupportedStyle { group: &'static str, value: String },

    #[error("invalid option {key}: {reason}")]
    InvalidOption { key: &'static str, reason: String },

    #[error("canvas {width}x{height} is too small for {modules} modules")]
    CanvasTooSmall { width: u32, height: u32, modules: usize },

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The blocking task that paints and encodes a raster did not complete.
    #[error("render task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Escape hatch for renderers other than [`crate::StyledQr`].
    #[error("renderer error: {0}")]
    Renderer(Box<dyn std::error::Error + Send + Sync>),
}

impl From<QrError> for Error {
    fn from(err: QrError) -> Self {
        Error::Encode(err)
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
