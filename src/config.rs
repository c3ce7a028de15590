//! Configuration records handed to a renderer.
//!
//! [`QrConfig`] is the fully resolved record a renderer is constructed from.
//! [`QrOptions`] is the partial override a caller supplies; every field is
//! optional and absent fields fall back to the preset. Both serialize with the
//! camelCase key names used by browser-side QR styling libraries, so an
//! override can be read straight from JSON:
//!
//! ```rust
//! use tgqr::config::QrOptions;
//!
//! let options: QrOptions =
//!     serde_json::from_str(r##"{"width": 300, "dotsOptions": {"color": "#ff0000"}}"##).unwrap();
//! assert_eq!(options.width, Some(300.0));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Render target hint carried in the `type` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawType {
    #[default]
    Canvas,
    Svg,
}

/// Segment mode the payload is encoded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mode {
    Numeric,
    Alphanumeric,
    #[default]
    Byte,
    /// Expects Shift JIS bytes; UTF-8 text will be rejected by the encoder.
    Kanji,
}

/// Error correction level, serialized as its single-letter name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ErrorCorrectionLevel {
    #[default]
    #[serde(rename = "L")]
    Low,
    #[serde(rename = "M")]
    Medium,
    #[serde(rename = "Q")]
    Quartile,
    #[serde(rename = "H")]
    High,
}

impl ErrorCorrectionLevel {
    /// Share of the symbol that can be lost and still be recovered.
    pub fn recovery_fraction(self) -> f64 {
        match self {
            ErrorCorrectionLevel::Low => 0.07,
            ErrorCorrectionLevel::Medium => 0.15,
            ErrorCorrectionLevel::Quartile => 0.25,
            ErrorCorrectionLevel::High => 0.30,
        }
    }
}

/// Payload options (`qrOptions`). Replaced wholesale when overridden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayloadOptions {
    /// QR version 1..=40, or 0 to pick the smallest version the payload fits in.
    pub type_number: u8,
    pub mode: Mode,
    pub error_correction_level: ErrorCorrectionLevel,
}

/// A primitive value inside a style sub-group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{}", b),
            OptionValue::Number(n) => write!(f, "{}", n),
            OptionValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        OptionValue::Number(value)
    }
}

impl From<i32> for OptionValue {
    fn from(value: i32) -> Self {
        OptionValue::Number(f64::from(value))
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Text(value)
    }
}

/// One style sub-group: a flat mapping of option names to primitive values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionGroup(BTreeMap<String, OptionValue>);

impl OptionGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Option<OptionValue> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Text value of `key`, if present and textual.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(OptionValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        match self.0.get(key) {
            Some(OptionValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.0.get(key) {
            Some(OptionValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<OptionValue>> FromIterator<(K, V)> for OptionGroup {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        OptionGroup(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// The five style sub-groups that receive a key-wise merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleGroup {
    Dots,
    CornersSquare,
    CornersDot,
    Background,
    Image,
}

impl StyleGroup {
    pub const ALL: [StyleGroup; 5] = [
        StyleGroup::Dots,
        StyleGroup::CornersSquare,
        StyleGroup::CornersDot,
        StyleGroup::Background,
        StyleGroup::Image,
    ];

    /// Key name in the serialized record.
    pub fn key(self) -> &'static str {
        match self {
            StyleGroup::Dots => "dotsOptions",
            StyleGroup::CornersSquare => "cornersSquareOptions",
            StyleGroup::CornersDot => "cornersDotOptions",
            StyleGroup::Background => "backgroundOptions",
            StyleGroup::Image => "imageOptions",
        }
    }
}

/// A fully resolved rendering configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrConfig {
    pub width: f64,
    pub height: f64,
    #[serde(rename = "type")]
    pub draw_type: DrawType,
    #[serde(default)]
    pub data: String,
    /// Logo reference; a file path for [`crate::StyledQr`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub qr_options: QrPayloadOptions,
    #[serde(default)]
    pub dots_options: OptionGroup,
    #[serde(default)]
    pub corners_square_options: OptionGroup,
    #[serde(default)]
    pub corners_dot_options: OptionGroup,
    #[serde(default)]
    pub background_options: OptionGroup,
    #[serde(default)]
    pub image_options: OptionGroup,
}

impl QrConfig {
    pub fn group(&self, group: StyleGroup) -> &OptionGroup {
        match group {
            StyleGroup::Dots => &self.dots_options,
            StyleGroup::CornersSquare => &self.corners_square_options,
            StyleGroup::CornersDot => &self.corners_dot_options,
            StyleGroup::Background => &self.background_options,
            StyleGroup::Image => &self.image_options,
        }
    }

    pub fn group_mut(&mut self, group: StyleGroup) -> &mut OptionGroup {
        match group {
            StyleGroup::Dots => &mut self.dots_options,
            StyleGroup::CornersSquare => &mut self.corners_square_options,
            StyleGroup::CornersDot => &mut self.corners_dot_options,
            StyleGroup::Background => &mut self.background_options,
            StyleGroup::Image => &mut self.image_options,
        }
    }
}

/// Caller overrides. `None` keeps the preset's value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QrOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub draw_type: Option<DrawType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_options: Option<QrPayloadOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dots_options: Option<OptionGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corners_square_options: Option<OptionGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corners_dot_options: Option<OptionGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_options: Option<OptionGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_options: Option<OptionGroup>,
}

impl QrOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group(&self, group: StyleGroup) -> Option<&OptionGroup> {
        self.group_slot(group).as_ref()
    }

    pub fn group_mut(&mut self, group: StyleGroup) -> &mut Option<OptionGroup> {
        match group {
            StyleGroup::Dots => &mut self.dots_options,
            StyleGroup::CornersSquare => &mut self.corners_square_options,
            StyleGroup::CornersDot => &mut self.corners_dot_options,
            StyleGroup::Background => &mut self.background_options,
            StyleGroup::Image => &mut self.image_options,
        }
    }

    fn group_slot(&self, group: StyleGroup) -> &Option<OptionGroup> {
        match group {
            StyleGroup::Dots => &self.dots_options,
            StyleGroup::CornersSquare => &self.corners_square_options,
            StyleGroup::CornersDot => &self.corners_dot_options,
            StyleGroup::Background => &self.background_options,
            StyleGroup::Image => &self.image_options,
        }
    }

    /// Sets a single key inside a sub-group, creating the group if needed.
    pub fn set(mut self, group: StyleGroup, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.group_mut(group)
            .get_or_insert_with(OptionGroup::new)
            .insert(key, value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_json() {
        let options: QrOptions = serde_json::from_str(
            r#"{"type": "svg", "qrOptions": {"typeNumber": 4, "mode": "Alphanumeric", "errorCorrectionLevel": "H"},
                "imageOptions": {"hideBackgroundDots": false, "margin": 10}}"#,
        )
        .unwrap();

        assert_eq!(options.draw_type, Some(DrawType::Svg));
        let qr = options.qr_options.unwrap();
        assert_eq!(qr.type_number, 4);
        assert_eq!(qr.mode, Mode::Alphanumeric);
        assert_eq!(qr.error_correction_level, ErrorCorrectionLevel::High);

        let image = options.image_options.unwrap();
        assert_eq!(image.get_bool("hideBackgroundDots"), Some(false));
        assert_eq!(image.get_f64("margin"), Some(10.0));
        assert!(options.dots_options.is_none());
    }

    #[test]
    fn test_empty_options_serialize_to_empty_object() {
        let json = serde_json::to_string(&QrOptions::new()).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn test_typed_getters_ignore_other_kinds() {
        let group = OptionGroup::new().with("color", "#000000").with("margin", 5);
        assert_eq!(group.get_str("color"), Some("#000000"));
        assert_eq!(group.get_f64("color"), None);
        assert_eq!(group.get_f64("margin"), Some(5.0));
        assert_eq!(group.get_bool("margin"), None);
        assert!(group.contains_key("margin"));
        assert!(!group.contains_key("type"));
    }

    #[test]
    fn test_set_creates_group() {
        let options = QrOptions::new().set(StyleGroup::Background, "color", "#eeeeee");
        assert_eq!(
            options.group(StyleGroup::Background).and_then(|g| g.get_str("color")),
            Some("#eeeeee")
        );
    }
}
