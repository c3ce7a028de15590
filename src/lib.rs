//! # tgqr
//!
//! Telegram-styled QR codes in Rust.
//!
//! `tgqr` keeps one canonical Telegram style (rounded dots, extra-rounded
//! finder squares, black on white, 240px) and lets every call override just
//! the parts it cares about. Overrides are merged into the preset without
//! touching it, and the result is handed to a renderer that draws and exports
//! the code.
//!
//! ## Features
//!
//! - Default preset [`TELEGRAM_QR_CONFIG`], inspectable and serializable.
//! - Shallow top-level merge with a key-wise merge for the five style groups
//!   (dots, corner squares, corner dots, background, image).
//! - Brand-blue and logo variants.
//! - Scaling for high-density displays via an explicit pixel ratio.
//! - PNG, JPEG and SVG export, base64 data URIs and save-to-file.
//! - Pluggable renderers through [`QrRenderer`]; [`StyledQr`] is bundled.
//!
//! ## Installation
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! tgqr = "0.1" # Replace with the latest version
//! ```
//!
//! ## Example
//!
//! Raster output from [`StyledQr`] is painted on Tokio's blocking pool and
//! downloads use `tokio::fs`, so the async calls below need a Tokio runtime.
//!
//! Render a brand-blue code and read it back as PNG bytes:
//!
//! ```rust
//! use tgqr::{create_telegram_blue_qr, QrOptions, QrRenderer, RawFormat, StyleGroup};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> tgqr::Result<()> {
//! let options = QrOptions::new().set(StyleGroup::Dots, "type", "dots");
//! let qr = create_telegram_blue_qr("https://t.me/telegram", &options)?;
//! let png = qr.get_raw_data(RawFormat::Png).await?;
//! assert_eq!(&png[1..4], b"PNG");
//! # Ok(())
//! # }
//! ```
//!
//! Save a code with a logo next to the binary:
//!
//! ```rust,no_run
//! use tgqr::{create_telegram_qr_with_logo, DownloadOptions, QrOptions, QrRenderer, RawFormat};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> tgqr::Result<()> {
//! let qr = create_telegram_qr_with_logo("https://t.me/telegram", "logo.png", &QrOptions::new())?;
//! qr.download(DownloadOptions::new("invite", RawFormat::Svg)).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration and override records.
//! - [`merge`]: Option merging.
//! - [`preset`]: The built-in Telegram style.
//! - [`facade`]: [`TelegramQr`], the configurable entry point.
//! - [`renderer`]: The [`QrRenderer`] trait.
//! - [`styled`]: [`StyledQr`], the bundled renderer.
//! - [`helper`]: Color, shape, encoding and file utilities.

pub mod config;
pub mod error;
pub mod facade;
pub mod helper;
pub mod merge;
pub mod preset;
pub mod renderer;
pub mod styled;

pub use config::{
    DrawType, ErrorCorrectionLevel, Mode, OptionGroup, OptionValue, QrConfig, QrOptions,
    QrPayloadOptions, StyleGroup,
};
pub use error::{Error, Result};
pub use facade::TelegramQr;
pub use merge::DEEP_MERGED_GROUPS;
pub use preset::{DEFAULT_FILENAME, TELEGRAM_BLUE, TELEGRAM_QR_CONFIG};
pub use renderer::{DownloadOptions, QrRenderer, RawFormat};
pub use styled::StyledQr;

use std::path::PathBuf;

/// Default-styled code. See [`TelegramQr::create`].
pub fn create_telegram_qr(data: &str, options: &QrOptions) -> Result<StyledQr> {
    TelegramQr::new().create(data, options)
}

/// Brand-blue code. See [`TelegramQr::create_blue`].
pub fn create_telegram_blue_qr(data: &str, options: &QrOptions) -> Result<StyledQr> {
    TelegramQr::new().create_blue(data, options)
}

/// Code with a centred logo. See [`TelegramQr::create_with_logo`].
pub fn create_telegram_qr_with_logo(data: &str, logo: &str, options: &QrOptions) -> Result<StyledQr> {
    TelegramQr::new().create_with_logo(data, logo, options)
}

/// `data:image/png;base64,...` URI of the default-styled code. Needs a Tokio
/// runtime.
pub async fn get_telegram_qr_data_url(data: &str, options: &QrOptions) -> Result<String> {
    TelegramQr::new().data_url::<StyledQr>(data, options).await
}

/// Saves the default-styled code as `<filename>.png` (default
/// `telegram-qr.png`) in the current directory. Needs a Tokio runtime.
pub async fn download_telegram_qr(data: &str, filename: Option<&str>, options: &QrOptions) -> Result<PathBuf> {
    TelegramQr::new().download::<StyledQr>(data, filename, options).await
}
