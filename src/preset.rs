//! The built-in Telegram style.

use crate::config::{
    DrawType, ErrorCorrectionLevel, Mode, OptionGroup, QrConfig, QrPayloadOptions,
};
use once_cell::sync::Lazy;

/// Telegram brand blue.
pub const TELEGRAM_BLUE: &str = "#0088cc";

/// File name (without extension) used when a download is not given one.
pub const DEFAULT_FILENAME: &str = "telegram-qr";

/// Default preset: 240px square, rounded black dots on white.
pub static TELEGRAM_QR_CONFIG: Lazy<QrConfig> = Lazy::new(|| QrConfig {
    width: 240.0,
    height: 240.0,
    draw_type: DrawType::Canvas,
    data: String::new(),
    image: None,
    qr_options: QrPayloadOptions {
        type_number: 0,
        mode: Mode::Byte,
        error_correction_level: ErrorCorrectionLevel::Low,
    },
    dots_options: OptionGroup::new().with("type", "rounded").with("color", "#000000"),
    corners_square_options: OptionGroup::new()
        .with("type", "extra-rounded")
        .with("color", "#000000"),
    corners_dot_options: OptionGroup::new().with("color", "#000000"),
    background_options: OptionGroup::new().with("color", "#ffffff"),
    image_options: logo_image_options(),
});

/// `imageOptions` applied when a logo is embedded.
pub fn logo_image_options() -> OptionGroup {
    OptionGroup::new()
        .with("hideBackgroundDots", true)
        .with("imageSize", 1.0)
        .with("margin", 5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_serializes_with_wire_names() {
        let json = serde_json::to_value(&*TELEGRAM_QR_CONFIG).unwrap();
        assert_eq!(json["type"], "canvas");
        assert_eq!(json["qrOptions"]["errorCorrectionLevel"], "L");
        assert_eq!(json["qrOptions"]["mode"], "Byte");
        assert_eq!(json["cornersSquareOptions"]["type"], "extra-rounded");
        assert_eq!(json["imageOptions"]["margin"], 5.0);
        assert!(json.get("image").is_none());
    }
}
