//! The bundled renderer.
//!
//! [`StyledQr`] hands symbol encoding and error correction to the `qrcode`
//! crate and paints the resulting module matrix itself: shaped dots, styled
//! finder patterns, an optional centred logo. The same list of shapes feeds
//! both the raster (PNG/JPEG) and the SVG output.

use crate::config::{DrawType, ErrorCorrectionLevel, Mode, OptionGroup, QrConfig, QrPayloadOptions};
use crate::error::{Error, Result};
use crate::helper::{
    encode_raster, in_rounded_square, parse_color, rounded_square_path, save_bytes, svg_fill,
    xml_escape,
};
use crate::renderer::{DownloadOptions, QrRenderer, RawFormat};

use async_trait::async_trait;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Pixel, Rgba, RgbaImage};
use qrcode::bits::Bits;
use qrcode::types::QrError;
use qrcode::{Color, EcLevel, QrCode, Version};
use std::path::PathBuf;

/// Side of a finder pattern, in modules.
const FINDER: usize = 7;

/// Largest canvas side accepted, in pixels.
const MAX_CANVAS: f64 = 16384.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DotKind {
    Square,
    Dots,
    Rounded,
    ExtraRounded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CornerSquareKind {
    Square,
    Dot,
    ExtraRounded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CornerDotKind {
    Square,
    Dot,
}

fn style_type(group: &OptionGroup) -> Option<String> {
    group.get("type").map(|v| v.to_string())
}

fn unsupported(group: &'static str, value: String) -> Error {
    Error::UnsupportedStyle { group, value }
}

impl DotKind {
    fn parse(group: &OptionGroup) -> Result<Self> {
        match style_type(group).as_deref() {
            None | Some("square") => Ok(DotKind::Square),
            Some("dots") => Ok(DotKind::Dots),
            Some("rounded") => Ok(DotKind::Rounded),
            Some("extra-rounded") => Ok(DotKind::ExtraRounded),
            Some(other) => Err(unsupported("dotsOptions", other.to_string())),
        }
    }

    /// Corner radii (top-left, top-right, bottom-right, bottom-left) of one
    /// module of side `d` given which of its four neighbours are drawn.
    fn radii(self, n: Neighbors, d: f64) -> [f64; 4] {
        let half = d / 2.0;
        match self {
            DotKind::Square => [0.0; 4],
            DotKind::Dots => [half; 4],
            DotKind::Rounded | DotKind::ExtraRounded => {
                // (side a, side b, opposite a, opposite b) per corner
                let corners = [
                    (n.top, n.left, n.bottom, n.right),
                    (n.top, n.right, n.bottom, n.left),
                    (n.bottom, n.right, n.top, n.left),
                    (n.bottom, n.left, n.top, n.right),
                ];
                corners.map(|(a, b, oa, ob)| {
                    if a || b {
                        0.0
                    } else if self == DotKind::ExtraRounded && oa && ob {
                        d
                    } else {
                        half
                    }
                })
            }
        }
    }
}

impl CornerSquareKind {
    fn parse(group: &OptionGroup) -> Result<Option<Self>> {
        match style_type(group).as_deref() {
            None => Ok(None),
            Some("square") => Ok(Some(CornerSquareKind::Square)),
            Some("dot") => Ok(Some(CornerSquareKind::Dot)),
            Some("extra-rounded") => Ok(Some(CornerSquareKind::ExtraRounded)),
            Some(other) => Err(unsupported("cornersSquareOptions", other.to_string())),
        }
    }

    fn ring(self, x: f64, y: f64, d: f64, color: Rgba<u8>) -> Shape {
        let (outer, inner) = match self {
            CornerSquareKind::Square => (0.0, 0.0),
            CornerSquareKind::Dot => (3.5 * d, 2.5 * d),
            CornerSquareKind::ExtraRounded => (2.5 * d, 1.5 * d),
        };
        Shape::Ring {
            outer: Square { x, y, size: 7.0 * d, radii: [outer; 4] },
            inner: Square { x: x + d, y: y + d, size: 5.0 * d, radii: [inner; 4] },
            color,
        }
    }
}

impl CornerDotKind {
    fn parse(group: &OptionGroup) -> Result<Option<Self>> {
        match style_type(group).as_deref() {
            None => Ok(None),
            Some("square") => Ok(Some(CornerDotKind::Square)),
            Some("dot") => Ok(Some(CornerDotKind::Dot)),
            Some(other) => Err(unsupported("cornersDotOptions", other.to_string())),
        }
    }

    fn eye(self, x: f64, y: f64, d: f64, color: Rgba<u8>) -> Shape {
        let radius = match self {
            CornerDotKind::Square => 0.0,
            CornerDotKind::Dot => 1.5 * d,
        };
        Shape::Solid(Square { x, y, size: 3.0 * d, radii: [radius; 4] }, color)
    }
}

fn group_color(group: &OptionGroup, fallback: Rgba<u8>) -> Result<Rgba<u8>> {
    match group.get("color") {
        Some(value) => parse_color(&value.to_string()),
        None => Ok(fallback),
    }
}

/// Style resolved out of the option groups.
#[derive(Debug, Clone)]
struct Style {
    dots: DotKind,
    dots_color: Rgba<u8>,
    corner_square: Option<CornerSquareKind>,
    corner_square_color: Rgba<u8>,
    corner_dot: Option<CornerDotKind>,
    corner_dot_color: Rgba<u8>,
    background: Rgba<u8>,
    hide_background_dots: bool,
    image_size: f64,
    image_margin: f64,
}

impl Style {
    fn from_config(config: &QrConfig) -> Result<Self> {
        let dots_color = group_color(&config.dots_options, Rgba([0, 0, 0, 255]))?;
        let image = &config.image_options;
        Ok(Style {
            dots: DotKind::parse(&config.dots_options)?,
            dots_color,
            corner_square: CornerSquareKind::parse(&config.corners_square_options)?,
            corner_square_color: group_color(&config.corners_square_options, dots_color)?,
            corner_dot: CornerDotKind::parse(&config.corners_dot_options)?,
            corner_dot_color: group_color(&config.corners_dot_options, dots_color)?,
            background: group_color(&config.background_options, Rgba([255, 255, 255, 255]))?,
            hide_background_dots: image.get_bool("hideBackgroundDots").unwrap_or(true),
            image_size: image.get_f64("imageSize").unwrap_or(0.4).max(0.0),
            image_margin: image.get_f64("margin").unwrap_or(0.0).max(0.0),
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Neighbors {
    top: bool,
    right: bool,
    bottom: bool,
    left: bool,
}

/// Which part of the symbol a module belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zone {
    Data,
    /// Outer ring of the finder pattern with the given index.
    Ring(usize),
    /// 3x3 centre of the finder pattern with the given index.
    Eye(usize),
}

/// A square run of modules reserved for the logo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ModuleArea {
    start: usize,
    len: usize,
}

impl ModuleArea {
    fn contains(&self, x: usize, y: usize) -> bool {
        let range = self.start..self.start + self.len;
        range.contains(&x) && range.contains(&y)
    }
}

/// Pixel geometry of the symbol on the canvas.
#[derive(Debug, Clone, Copy)]
struct Layout {
    width: u32,
    height: u32,
    /// Module side in pixels.
    dot: u32,
    x0: u32,
    y0: u32,
    logo: Option<ModuleArea>,
}

#[derive(Debug, Clone, Copy)]
struct Square {
    x: f64,
    y: f64,
    size: f64,
    radii: [f64; 4],
}

impl Square {
    fn contains(&self, px: f64, py: f64) -> bool {
        in_rounded_square(px - self.x, py - self.y, self.size, self.radii)
    }

    fn path(&self) -> String {
        rounded_square_path(self.x, self.y, self.size, self.radii)
    }
}

#[derive(Debug, Clone, Copy)]
enum Shape {
    Solid(Square, Rgba<u8>),
    Ring { outer: Square, inner: Square, color: Rgba<u8> },
}

impl Shape {
    fn bounds(&self) -> Square {
        match self {
            Shape::Solid(square, _) => *square,
            Shape::Ring { outer, .. } => *outer,
        }
    }

    fn color(&self) -> Rgba<u8> {
        match self {
            Shape::Solid(_, color) | Shape::Ring { color, .. } => *color,
        }
    }

    fn contains(&self, px: f64, py: f64) -> bool {
        match self {
            Shape::Solid(square, _) => square.contains(px, py),
            Shape::Ring { outer, inner, .. } => outer.contains(px, py) && !inner.contains(px, py),
        }
    }
}

fn ec_level(level: ErrorCorrectionLevel) -> EcLevel {
    match level {
        ErrorCorrectionLevel::Low => EcLevel::L,
        ErrorCorrectionLevel::Medium => EcLevel::M,
        ErrorCorrectionLevel::Quartile => EcLevel::Q,
        ErrorCorrectionLevel::High => EcLevel::H,
    }
}

const ALPHANUMERIC: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

/// Whether `bytes` can be pushed in `mode` at all.
fn fits_mode(bytes: &[u8], mode: Mode) -> bool {
    match mode {
        Mode::Numeric => bytes.iter().all(u8::is_ascii_digit),
        Mode::Alphanumeric => bytes.iter().all(|b| ALPHANUMERIC.contains(b)),
        Mode::Byte => true,
        // Shift JIS double-byte ranges
        Mode::Kanji => {
            bytes.len() % 2 == 0
                && bytes.chunks(2).all(|pair| {
                    let cp = u16::from(pair[0]) << 8 | u16::from(pair[1]);
                    (0x8140..=0x9ffc).contains(&cp) || (0xe040..=0xebbf).contains(&cp)
                })
        }
    }
}

fn encode_with_version(data: &str, mode: Mode, version: Version, ec: EcLevel) -> Result<QrCode, QrError> {
    let bytes = data.as_bytes();
    if !fits_mode(bytes, mode) {
        return Err(QrError::InvalidCharacter);
    }
    let mut bits = Bits::new(version);
    match mode {
        Mode::Numeric => bits.push_numeric_data(bytes)?,
        Mode::Alphanumeric => bits.push_alphanumeric_data(bytes)?,
        Mode::Byte => bits.push_byte_data(bytes)?,
        Mode::Kanji => bits.push_kanji_data(bytes)?,
    }
    bits.push_terminator(ec)?;
    QrCode::with_bits(bits, ec)
}

/// Encodes `data` in the requested mode, picking the smallest version that
/// fits when `type_number` is 0.
fn encode(data: &str, options: &QrPayloadOptions) -> Result<QrCode> {
    let ec = ec_level(options.error_correction_level);
    match options.type_number {
        0 => {
            for version in 1..=40 {
                match encode_with_version(data, options.mode, Version::Normal(version), ec) {
                    Err(QrError::DataTooLong) => continue,
                    other => return other.map_err(Error::from),
                }
            }
            Err(Error::Encode(QrError::DataTooLong))
        }
        n if n <= 40 => Ok(encode_with_version(
            data,
            options.mode,
            Version::Normal(i16::from(n)),
            ec,
        )?),
        n => Err(Error::InvalidOption {
            key: "qrOptions.typeNumber",
            reason: format!("{} is outside 0..=40", n),
        }),
    }
}

fn canvas_side(key: &'static str, value: f64) -> Result<u32> {
    if !value.is_finite() || value < 1.0 || value > MAX_CANVAS {
        return Err(Error::InvalidOption {
            key,
            reason: format!("{} is outside 1..={}", value, MAX_CANVAS),
        });
    }
    Ok(value.round() as u32)
}

/// A styled QR code ready to be exported.
///
/// # Example
///
/// ```rust
/// use tgqr::{QrRenderer, StyledQr, TELEGRAM_QR_CONFIG};
///
/// let mut config = TELEGRAM_QR_CONFIG.clone();
/// config.data = "https://t.me/telegram".to_string();
/// let qr = StyledQr::new(config).unwrap();
/// let img = qr.render().unwrap();
/// assert_eq!(img.dimensions(), (240, 240));
/// ```
#[derive(Debug, Clone)]
pub struct StyledQr {
    config: QrConfig,
    style: Style,
    /// Row-major, `true` for dark.
    modules: Vec<bool>,
    count: usize,
    layout: Layout,
}

impl StyledQr {
    /// Width and height of the symbol in modules.
    pub fn module_count(&self) -> usize {
        self.count
    }

    /// Module side in pixels.
    pub fn dot_size(&self) -> u32 {
        self.layout.dot
    }

    /// Format matching the configured render target.
    pub fn native_format(&self) -> RawFormat {
        match self.config.draw_type {
            DrawType::Canvas => RawFormat::Png,
            DrawType::Svg => RawFormat::Svg,
        }
    }

    fn is_dark(&self, x: usize, y: usize) -> bool {
        self.modules[y * self.count + x]
    }

    fn finder_origins(&self) -> [(usize, usize); 3] {
        let far = self.count - FINDER;
        [(0, 0), (far, 0), (0, far)]
    }

    fn zone(&self, x: usize, y: usize) -> Zone {
        for (index, (fx, fy)) in self.finder_origins().into_iter().enumerate() {
            if (fx..fx + FINDER).contains(&x) && (fy..fy + FINDER).contains(&y) {
                let (lx, ly) = (x - fx, y - fy);
                return if (2..=4).contains(&lx) && (2..=4).contains(&ly) {
                    Zone::Eye(index)
                } else {
                    Zone::Ring(index)
                };
            }
        }
        Zone::Data
    }

    fn is_hidden(&self, x: usize, y: usize) -> bool {
        self.style.hide_background_dots
            && self.zone(x, y) == Zone::Data
            && self.layout.logo.map_or(false, |area| area.contains(x, y))
    }

    /// Whether the module at (`x`, `y`), offset by (`dx`, `dy`), is drawn as
    /// part of the same zone.
    fn joins(&self, x: usize, y: usize, dx: isize, dy: isize) -> bool {
        let (Some(nx), Some(ny)) = (x.checked_add_signed(dx), y.checked_add_signed(dy)) else {
            return false;
        };
        nx < self.count
            && ny < self.count
            && self.is_dark(nx, ny)
            && !self.is_hidden(nx, ny)
            && self.zone(nx, ny) == self.zone(x, y)
    }

    fn neighbors(&self, x: usize, y: usize) -> Neighbors {
        Neighbors {
            top: self.joins(x, y, 0, -1),
            right: self.joins(x, y, 1, 0),
            bottom: self.joins(x, y, 0, 1),
            left: self.joins(x, y, -1, 0),
        }
    }

    fn logo_area(&self) -> Option<ModuleArea> {
        self.config.image.as_ref()?;
        let n = self.count;
        let fraction = self.config.qr_options.error_correction_level.recovery_fraction();
        let max_hidden = (self.style.image_size * (n * n) as f64 * fraction).floor();
        let mut len = (max_hidden.sqrt().floor() as usize).min(n.saturating_sub(2 * (FINDER + 1)));
        if (n - len) % 2 == 1 {
            len = len.saturating_sub(1);
        }
        if len == 0 {
            log::warn!("logo area collapsed to zero modules; drawing without logo");
            return None;
        }
        let margin = self.style.image_margin.round() as u32;
        if len as u32 * self.layout.dot <= margin.saturating_mul(2) {
            log::warn!("logo margin {} leaves no room for the logo; drawing without logo", margin);
            return None;
        }
        Some(ModuleArea { start: (n - len) / 2, len })
    }

    fn shapes(&self) -> Vec<Shape> {
        let layout = &self.layout;
        let d = f64::from(layout.dot);
        let px = |module: usize, base: u32| f64::from(base) + module as f64 * d;
        let mut shapes = Vec::new();

        for y in 0..self.count {
            for x in 0..self.count {
                if !self.is_dark(x, y) {
                    continue;
                }
                let color = match self.zone(x, y) {
                    Zone::Data if self.is_hidden(x, y) => continue,
                    Zone::Data => self.style.dots_color,
                    Zone::Ring(_) if self.style.corner_square.is_some() => continue,
                    Zone::Ring(_) => self.style.corner_square_color,
                    Zone::Eye(_) if self.style.corner_dot.is_some() => continue,
                    Zone::Eye(_) => self.style.corner_dot_color,
                };
                let square = Square {
                    x: px(x, layout.x0),
                    y: px(y, layout.y0),
                    size: d,
                    radii: self.style.dots.radii(self.neighbors(x, y), d),
                };
                shapes.push(Shape::Solid(square, color));
            }
        }

        for (fx, fy) in self.finder_origins() {
            let (x, y) = (px(fx, layout.x0), px(fy, layout.y0));
            if let Some(kind) = self.style.corner_square {
                shapes.push(kind.ring(x, y, d, self.style.corner_square_color));
            }
            if let Some(kind) = self.style.corner_dot {
                shapes.push(kind.eye(x + 2.0 * d, y + 2.0 * d, d, self.style.corner_dot_color));
            }
        }
        shapes
    }

    /// Pixel box (left, top, side) the logo is fitted into, margin applied.
    /// The area is only reserved when this box is non-empty.
    fn logo_box(&self) -> Option<(u32, u32, u32)> {
        let area = self.layout.logo?;
        let dot = self.layout.dot;
        let margin = self.style.image_margin.round() as u32;
        let inner = (area.len as u32 * dot).saturating_sub(margin.saturating_mul(2));
        let left = self.layout.x0 + area.start as u32 * dot + margin;
        let top = self.layout.y0 + area.start as u32 * dot + margin;
        Some((left, top, inner))
    }

    /// Paints the code onto an RGBA canvas of the configured size.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Image`] if the configured logo cannot be opened or decoded.
    pub fn render(&self) -> Result<RgbaImage> {
        let logo = match (&self.config.image, self.logo_box()) {
            (Some(path), Some(_)) => Some(image::open(path)?),
            _ => None,
        };
        Ok(self.paint(logo.as_ref()))
    }

    fn paint(&self, logo: Option<&DynamicImage>) -> RgbaImage {
        let layout = &self.layout;
        let mut img = RgbaImage::from_pixel(layout.width, layout.height, self.style.background);

        for shape in self.shapes() {
            let bounds = shape.bounds();
            let color = shape.color();
            let x_end = ((bounds.x + bounds.size).ceil() as u32).min(layout.width);
            let y_end = ((bounds.y + bounds.size).ceil() as u32).min(layout.height);
            for py in bounds.y.floor() as u32..y_end {
                for px in bounds.x.floor() as u32..x_end {
                    if !shape.contains(f64::from(px) + 0.5, f64::from(py) + 0.5) {
                        continue;
                    }
                    let pixel = img.get_pixel_mut(px, py);
                    if color.0[3] == 255 {
                        *pixel = color;
                    } else {
                        pixel.blend(&color);
                    }
                }
            }
        }

        if let (Some(logo), Some((left, top, side))) = (logo, self.logo_box()) {
            let fitted = logo.resize(side, side, FilterType::Lanczos3).to_rgba8();
            let x = left + (side - fitted.width()) / 2;
            let y = top + (side - fitted.height()) / 2;
            imageops::overlay(&mut img, &fitted, i64::from(x), i64::from(y));
        }
        img
    }

    /// Returns a string of SVG code depicting the code with the configured style.
    /// The string always uses Unix newlines (\n), regardless of the platform.
    pub fn to_svg_string(&self) -> String {
        let layout = &self.layout;
        let mut result = String::new();
        result += "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
        result += "<!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\" \"http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd\">\n";
        result += &format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\" width=\"{0}\" height=\"{1}\" viewBox=\"0 0 {0} {1}\" stroke=\"none\">\n",
            layout.width, layout.height
        );
        result += &format!("\t<rect width=\"100%\" height=\"100%\" {}/>\n", svg_fill(self.style.background));

        // one path per colour for plain modules
        let mut solids: Vec<(Rgba<u8>, String)> = Vec::new();
        let mut rings = String::new();
        for shape in self.shapes() {
            match shape {
                Shape::Solid(square, color) => {
                    match solids.iter_mut().find(|(c, _)| *c == color) {
                        Some((_, path)) => {
                            path.push(' ');
                            path.push_str(&square.path());
                        }
                        None => solids.push((color, square.path())),
                    }
                }
                Shape::Ring { outer, inner, color } => {
                    rings += &format!(
                        "\t<path d=\"{} {}\" fill-rule=\"evenodd\" {}/>\n",
                        outer.path(),
                        inner.path(),
                        svg_fill(color)
                    );
                }
            }
        }
        for (color, path) in solids {
            result += &format!("\t<path d=\"{}\" {}/>\n", path, svg_fill(color));
        }
        result += &rings;

        if let (Some(href), Some((left, top, side))) = (&self.config.image, self.logo_box()) {
            result += &format!(
                "\t<image href=\"{}\" x=\"{}\" y=\"{}\" width=\"{3}\" height=\"{3}\" preserveAspectRatio=\"xMidYMid meet\"/>\n",
                xml_escape(href),
                left,
                top,
                side
            );
        }
        result += "</svg>\n";
        result
    }
}

#[async_trait]
impl QrRenderer for StyledQr {
    fn new(config: QrConfig) -> Result<Self> {
        let style = Style::from_config(&config)?;
        let width = canvas_side("width", config.width)?;
        let height = canvas_side("height", config.height)?;

        let code = encode(&config.data, &config.qr_options)?;
        let count = code.width();
        let modules = code.to_colors().into_iter().map(|c| c == Color::Dark).collect();
        log::debug!("encoded {} bytes as {:?} ({} modules)", config.data.len(), code.version(), count);

        let dot = width.min(height) / count as u32;
        if dot == 0 {
            return Err(Error::CanvasTooSmall { width, height, modules: count });
        }
        let span = dot * count as u32;
        let layout = Layout {
            width,
            height,
            dot,
            x0: (width - span) / 2,
            y0: (height - span) / 2,
            logo: None,
        };

        let mut qr = StyledQr { config, style, modules, count, layout };
        qr.layout.logo = qr.logo_area();
        Ok(qr)
    }

    fn config(&self) -> &QrConfig {
        &self.config
    }

    /// Raster output is painted and encoded on Tokio's blocking pool, so this
    /// must be awaited inside a Tokio runtime.
    async fn get_raw_data(&self, format: RawFormat) -> Result<Vec<u8>> {
        if format == RawFormat::Svg {
            return Ok(self.to_svg_string().into_bytes());
        }
        let logo = match (&self.config.image, self.logo_box()) {
            (Some(path), Some(_)) => Some(tokio::fs::read(path).await?),
            _ => None,
        };
        let qr = self.clone();
        tokio::task::spawn_blocking(move || {
            let logo = logo.map(|bytes| image::load_from_memory(&bytes)).transpose()?;
            encode_raster(&qr.paint(logo.as_ref()), format)
        })
        .await?
    }

    async fn download(&self, options: DownloadOptions) -> Result<PathBuf> {
        let bytes = self.get_raw_data(options.extension).await?;
        let path = options.path();
        save_bytes(&path, &bytes).await?;
        log::info!("saved QR code to {}", path.display());
        Ok(path)
    }
}
