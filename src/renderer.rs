//! The renderer seam.
//!
//! The facade only shapes a [`QrConfig`]; encoding, drawing and writing files
//! is the job of a [`QrRenderer`]. [`crate::StyledQr`] is the bundled one.

use crate::config::QrConfig;
use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;

/// Output format for raw image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RawFormat {
    #[default]
    Png,
    Jpeg,
    Svg,
}

impl RawFormat {
    pub fn extension(self) -> &'static str {
        match self {
            RawFormat::Png => "png",
            RawFormat::Jpeg => "jpeg",
            RawFormat::Svg => "svg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            RawFormat::Png => "image/png",
            RawFormat::Jpeg => "image/jpeg",
            RawFormat::Svg => "image/svg+xml",
        }
    }
}

impl fmt::Display for RawFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Where and how a rendered code is saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    /// File name without extension.
    pub name: String,
    pub extension: RawFormat,
    pub directory: PathBuf,
}

impl DownloadOptions {
    pub fn new(name: impl Into<String>, extension: RawFormat) -> Self {
        Self {
            name: name.into(),
            extension,
            directory: PathBuf::from("."),
        }
    }

    pub fn in_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    /// `<directory>/<name>.<extension>`
    pub fn path(&self) -> PathBuf {
        self.directory.join(format!("{}.{}", self.name, self.extension))
    }
}

/// A QR renderer constructed from a resolved configuration.
#[async_trait]
pub trait QrRenderer: Sized + Send + Sync {
    /// Validates `config` and prepares the symbol.
    fn new(config: QrConfig) -> Result<Self>;

    fn config(&self) -> &QrConfig;

    /// Encoded image bytes in `format`.
    async fn get_raw_data(&self, format: RawFormat) -> Result<Vec<u8>>;

    /// Saves the image and returns the path written.
    async fn download(&self, options: DownloadOptions) -> Result<PathBuf>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_path() {
        let options = DownloadOptions::new("telegram-qr", RawFormat::Png).in_directory("out");
        assert_eq!(options.path(), PathBuf::from("out").join("telegram-qr.png"));
        assert_eq!(RawFormat::Svg.mime_type(), "image/svg+xml");
    }
}
