//! The Telegram configuration facade.
//!
//! [`TelegramQr`] owns the preset, the display's pixel density and the
//! directory downloads go to. Each call resolves a fresh [`QrConfig`] and
//! hands it to a freshly constructed renderer; nothing is shared between calls.

use crate::config::{QrConfig, QrOptions, StyleGroup};
use crate::error::Result;
use crate::helper::to_data_url;
use crate::merge::{merge_group, resolve};
use crate::preset::{logo_image_options, DEFAULT_FILENAME, TELEGRAM_BLUE, TELEGRAM_QR_CONFIG};
use crate::renderer::{DownloadOptions, QrRenderer, RawFormat};

use std::path::PathBuf;

/// Sub-groups whose `color` is forced to brand blue.
const BRAND_COLORED_GROUPS: [StyleGroup; 3] =
    [StyleGroup::Dots, StyleGroup::CornersSquare, StyleGroup::CornersDot];

/// Builds Telegram-styled QR renderers.
///
/// # Example
///
/// ```rust
/// use tgqr::{QrOptions, StyledQr, TelegramQr};
///
/// let factory = TelegramQr::new().with_device_pixel_ratio(Some(2.0));
/// let config = factory.resolve("https://t.me/telegram", &QrOptions::new());
/// assert_eq!(config.width, 480.0);
///
/// let qr: StyledQr = factory.create_blue("https://t.me/telegram", &QrOptions::new()).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct TelegramQr {
    preset: QrConfig,
    device_pixel_ratio: f64,
    download_dir: PathBuf,
}

impl Default for TelegramQr {
    fn default() -> Self {
        Self {
            preset: TELEGRAM_QR_CONFIG.clone(),
            device_pixel_ratio: 1.0,
            download_dir: PathBuf::from("."),
        }
    }
}

impl TelegramQr {
    /// Facade over [`TELEGRAM_QR_CONFIG`] at a pixel ratio of 1, downloading
    /// into the current directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the preset overrides are merged into.
    pub fn with_preset(mut self, preset: QrConfig) -> Self {
        self.preset = preset;
        self
    }

    /// Sets the display's pixel density. Missing, zero, negative or
    /// non-finite ratios fall back to 1.
    pub fn with_device_pixel_ratio(mut self, ratio: Option<f64>) -> Self {
        self.device_pixel_ratio = ratio.filter(|r| r.is_finite() && *r > 0.0).unwrap_or(1.0);
        self
    }

    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    pub fn preset(&self) -> &QrConfig {
        &self.preset
    }

    pub fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
    }

    /// Resolves `options` against the preset for `data`.
    pub fn resolve(&self, data: &str, options: &QrOptions) -> QrConfig {
        resolve(&self.preset, data, options, self.device_pixel_ratio)
    }

    /// Like [`resolve`](Self::resolve), with dot and corner colors forced to
    /// [`TELEGRAM_BLUE`]. Other keys in those groups are kept.
    pub fn resolve_blue(&self, data: &str, options: &QrOptions) -> QrConfig {
        let mut branded = options.clone();
        for group in BRAND_COLORED_GROUPS {
            branded
                .group_mut(group)
                .get_or_insert_with(Default::default)
                .insert("color", TELEGRAM_BLUE);
        }
        self.resolve(data, &branded)
    }

    /// Like [`resolve`](Self::resolve), embedding `logo` with the logo
    /// `imageOptions` under any caller `imageOptions`.
    pub fn resolve_with_logo(&self, data: &str, logo: &str, options: &QrOptions) -> QrConfig {
        let image_options = match &options.image_options {
            Some(over) => merge_group(&logo_image_options(), over),
            None => logo_image_options(),
        };
        let with_logo = QrOptions {
            image: Some(logo.to_string()),
            image_options: Some(image_options),
            ..options.clone()
        };
        self.resolve(data, &with_logo)
    }

    /// Renderer for the default Telegram style.
    ///
    /// # Errors
    ///
    /// Whatever the renderer's constructor rejects; the facade adds none.
    pub fn create<R: QrRenderer>(&self, data: &str, options: &QrOptions) -> Result<R> {
        R::new(self.resolve(data, options))
    }

    /// Renderer in Telegram blue.
    pub fn create_blue<R: QrRenderer>(&self, data: &str, options: &QrOptions) -> Result<R> {
        R::new(self.resolve_blue(data, options))
    }

    /// Renderer with `logo` embedded in the centre.
    pub fn create_with_logo<R: QrRenderer>(&self, data: &str, logo: &str, options: &QrOptions) -> Result<R> {
        R::new(self.resolve_with_logo(data, logo, options))
    }

    /// PNG of the default-styled code as a `data:image/png;base64,...` URI.
    ///
    /// # Errors
    ///
    /// Whatever the renderer's constructor or `get_raw_data` returns.
    ///
    /// The conversion itself runs inline; [`crate::StyledQr`] needs a Tokio
    /// runtime for its raw data, other renderers may not.
    pub async fn data_url<R: QrRenderer>(&self, data: &str, options: &QrOptions) -> Result<String> {
        let qr: R = self.create(data, options)?;
        let bytes = qr.get_raw_data(RawFormat::Png).await?;
        Ok(to_data_url(&bytes, RawFormat::Png.mime_type()))
    }

    /// Saves the default-styled code as `<filename>.png` in the download
    /// directory. `filename` defaults to [`DEFAULT_FILENAME`].
    pub async fn download<R: QrRenderer>(
        &self,
        data: &str,
        filename: Option<&str>,
        options: &QrOptions,
    ) -> Result<PathBuf> {
        let qr: R = self.create(data, options)?;
        let target = DownloadOptions::new(filename.unwrap_or(DEFAULT_FILENAME), RawFormat::Png)
            .in_directory(&self.download_dir);
        qr.download(target).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OptionValue;
    use crate::Error;
    use async_trait::async_trait;
    use once_cell::sync::Lazy;
    use std::future::Future;
    use std::pin::pin;
    use std::sync::{Arc, Mutex};
    use std::task::{Context, Poll, Wake, Waker};

    /// Every download any `RecordingRenderer` was asked for, with its payload.
    static DOWNLOADS: Lazy<Mutex<Vec<(String, DownloadOptions)>>> =
        Lazy::new(|| Mutex::new(Vec::new()));

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn downloads_for(data: &str) -> Vec<DownloadOptions> {
        DOWNLOADS
            .lock()
            .unwrap()
            .iter()
            .filter(|(payload, _)| payload == data)
            .map(|(_, options)| options.clone())
            .collect()
    }

    struct NoopWake;

    impl Wake for NoopWake {
        fn wake(self: Arc<Self>) {}
    }

    /// Polls `future` once, outside of any runtime.
    fn poll_once<F: Future>(future: F) -> Poll<F::Output> {
        let waker = Waker::from(Arc::new(NoopWake));
        pin!(future).poll(&mut Context::from_waker(&waker))
    }

    /// Records what the facade asks of it instead of drawing anything.
    struct RecordingRenderer {
        config: QrConfig,
        bytes: Vec<u8>,
    }

    #[async_trait]
    impl QrRenderer for RecordingRenderer {
        fn new(config: QrConfig) -> Result<Self> {
            if config.data.is_empty() {
                return Err(Error::Renderer("empty payload".into()));
            }
            Ok(Self {
                config,
                bytes: b"\x89PNG\r\n\x1a\nfake".to_vec(),
            })
        }

        fn config(&self) -> &QrConfig {
            &self.config
        }

        async fn get_raw_data(&self, _format: RawFormat) -> Result<Vec<u8>> {
            Ok(self.bytes.clone())
        }

        async fn download(&self, options: DownloadOptions) -> Result<PathBuf> {
            let path = options.path();
            DOWNLOADS.lock().unwrap().push((self.config.data.clone(), options));
            Ok(path)
        }
    }

    #[test]
    fn test_dimensions_follow_pixel_ratio() {
        init();
        let options = QrOptions { height: Some(100.0), ..QrOptions::new() };

        let config = TelegramQr::new().resolve("x", &options);
        assert_eq!((config.width, config.height), (240.0, 100.0));

        let config = TelegramQr::new().with_device_pixel_ratio(Some(3.0)).resolve("x", &options);
        assert_eq!((config.width, config.height), (720.0, 300.0));

        for unusable in [None, Some(0.0), Some(-2.0), Some(f64::NAN), Some(f64::INFINITY)] {
            let factory = TelegramQr::new().with_device_pixel_ratio(unusable);
            assert_eq!(factory.device_pixel_ratio(), 1.0);
        }
    }

    #[test]
    fn test_blue_overrides_caller_colors_only() {
        let options = QrOptions::new()
            .set(StyleGroup::Dots, "color", "#ff0000")
            .set(StyleGroup::Dots, "type", "dots")
            .set(StyleGroup::CornersSquare, "color", "#00ff00")
            .set(StyleGroup::Background, "color", "#eeeeee");

        let config = TelegramQr::new().resolve_blue("x", &options);

        for group in BRAND_COLORED_GROUPS {
            assert_eq!(config.group(group).get_str("color"), Some(TELEGRAM_BLUE));
        }
        assert_eq!(config.dots_options.get_str("type"), Some("dots"));
        assert_eq!(config.corners_square_options.get_str("type"), Some("extra-rounded"));
        assert_eq!(config.background_options.get_str("color"), Some("#eeeeee"));
    }

    #[test]
    fn test_logo_defaults() {
        let config = TelegramQr::new().resolve_with_logo("x", "logo.png", &QrOptions::new());
        assert_eq!(config.image.as_deref(), Some("logo.png"));
        assert_eq!(config.image_options, logo_image_options());
        assert_eq!(config.image_options.get_bool("hideBackgroundDots"), Some(true));
        assert_eq!(config.image_options.get_f64("imageSize"), Some(1.0));
        assert_eq!(config.image_options.get_f64("margin"), Some(5.0));
        assert_eq!(config.image_options.len(), 3);
    }

    #[test]
    fn test_logo_margin_override() {
        let options = QrOptions::new().set(StyleGroup::Image, "margin", 10);
        let config = TelegramQr::new().resolve_with_logo("x", "logo.png", &options);
        assert_eq!(config.image_options.get("margin"), Some(&OptionValue::Number(10.0)));
        assert_eq!(config.image_options.get_bool("hideBackgroundDots"), Some(true));
        assert_eq!(config.image_options.get_f64("imageSize"), Some(1.0));
    }

    #[test]
    fn test_logo_replaces_caller_image() {
        let options = QrOptions { image: Some("other.png".to_string()), ..QrOptions::new() };
        let config = TelegramQr::new().resolve_with_logo("x", "logo.png", &options);
        assert_eq!(config.image.as_deref(), Some("logo.png"));
    }

    #[test]
    fn test_create_hands_resolved_config_to_renderer() {
        let factory = TelegramQr::new().with_device_pixel_ratio(Some(2.0));
        let qr: RecordingRenderer = factory.create("payload", &QrOptions::new()).unwrap();
        assert_eq!(*qr.config(), factory.resolve("payload", &QrOptions::new()));
        assert_eq!(qr.config().width, 480.0);

        let blue: RecordingRenderer = factory.create_blue("payload", &QrOptions::new()).unwrap();
        assert_eq!(blue.config().corners_dot_options.get_str("color"), Some(TELEGRAM_BLUE));

        let logo: RecordingRenderer =
            factory.create_with_logo("payload", "logo.png", &QrOptions::new()).unwrap();
        assert_eq!(logo.config().image.as_deref(), Some("logo.png"));
    }

    #[test]
    fn test_renderer_errors_pass_through() {
        let result = TelegramQr::new().create::<RecordingRenderer>("", &QrOptions::new());
        assert!(matches!(result, Err(Error::Renderer(_))));
    }

    #[tokio::test]
    async fn test_data_url_prefix() {
        let url = TelegramQr::new()
            .data_url::<RecordingRenderer>("payload", &QrOptions::new())
            .await
            .unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
        assert_eq!(url, to_data_url(b"\x89PNG\r\n\x1a\nfake", "image/png"));
    }

    #[test]
    fn test_data_url_needs_no_runtime() {
        let factory = TelegramQr::new();
        let url = match poll_once(factory.data_url::<RecordingRenderer>("payload", &QrOptions::new())) {
            Poll::Ready(url) => url.unwrap(),
            Poll::Pending => panic!("data_url suspended without the renderer suspending"),
        };
        assert_eq!(url, to_data_url(b"\x89PNG\r\n\x1a\nfake", "image/png"));
    }

    #[tokio::test]
    async fn test_data_url_propagates_renderer_error() {
        let result = TelegramQr::new()
            .data_url::<RecordingRenderer>("", &QrOptions::new())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_download_default_name() {
        let factory = TelegramQr::new().with_download_dir("out");
        let path = factory
            .download::<RecordingRenderer>("default-name", None, &QrOptions::new())
            .await
            .unwrap();
        assert_eq!(path, PathBuf::from("out").join("telegram-qr.png"));

        let recorded = downloads_for("default-name");
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].name, "telegram-qr");
        assert_eq!(recorded[0].extension, RawFormat::Png);
        assert_eq!(recorded[0].directory, PathBuf::from("out"));
    }

    #[tokio::test]
    async fn test_download_named() {
        let path = TelegramQr::new()
            .download::<RecordingRenderer>("named", Some("invite"), &QrOptions::new())
            .await
            .unwrap();
        assert_eq!(path, PathBuf::from(".").join("invite.png"));

        let recorded = downloads_for("named");
        assert_eq!(recorded, vec![DownloadOptions::new("invite", RawFormat::Png)]);
    }

    #[test]
    fn test_custom_preset() {
        let preset = QrConfig {
            width: 100.0,
            height: 120.0,
            ..TELEGRAM_QR_CONFIG.clone()
        };
        let factory = TelegramQr::new()
            .with_preset(preset.clone())
            .with_device_pixel_ratio(Some(2.0));
        assert_eq!(*factory.preset(), preset);

        let options = QrOptions::new().set(StyleGroup::Dots, "type", "dots");
        let config = factory.resolve("x", &options);
        assert_eq!((config.width, config.height), (200.0, 240.0));
        assert_eq!(config.dots_options.get_str("type"), Some("dots"));
        assert_eq!(config.dots_options.get_str("color"), Some("#000000"));
        assert_eq!(TELEGRAM_QR_CONFIG.width, 240.0);
    }
}
