use crate::error::{Error, Result};
use crate::renderer::RawFormat;

use base64::{engine::general_purpose, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage, Rgba, RgbaImage};
use std::path::Path;

/*---- Colors ----*/

/// Parses a CSS-style color: `#rgb`, `#rrggbb`, `#rrggbbaa` or `transparent`.
///
/// # Errors
///
/// Returns [`Error::InvalidColor`] for anything else.
///
/// # Example
///
/// ```rust
/// use tgqr::helper::parse_color;
///
/// assert_eq!(parse_color("#0088cc").unwrap().0, [0x00, 0x88, 0xcc, 0xff]);
/// assert_eq!(parse_color("#fff").unwrap().0, [0xff, 0xff, 0xff, 0xff]);
/// ```
pub fn parse_color(value: &str) -> Result<Rgba<u8>> {
    let invalid = || Error::InvalidColor(value.to_string());
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("transparent") {
        return Ok(Rgba([0, 0, 0, 0]));
    }

    let hex = trimmed.strip_prefix('#').ok_or_else(invalid)?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 | 8 => hex.to_string(),
        _ => return Err(invalid()),
    };

    let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).map_err(|_| invalid());
    let alpha = if expanded.len() == 8 { channel(6)? } else { 255 };
    Ok(Rgba([channel(0)?, channel(2)?, channel(4)?, alpha]))
}

/// SVG fill attributes for `color`.
pub fn svg_fill(color: Rgba<u8>) -> String {
    let [r, g, b, a] = color.0;
    if a == 255 {
        format!("fill=\"#{:02x}{:02x}{:02x}\"", r, g, b)
    } else {
        format!(
            "fill=\"#{:02x}{:02x}{:02x}\" fill-opacity=\"{:.3}\"",
            r,
            g,
            b,
            f64::from(a) / 255.0
        )
    }
}

/*---- Shapes ----*/

/// Whether the local point (`u`, `v`) lies inside a square of side `size`
/// whose corners are rounded with `radii` (top-left, top-right, bottom-right,
/// bottom-left). Each radius is at most `size`, and adjacent radii must not
/// overlap along a side.
pub fn in_rounded_square(u: f64, v: f64, size: f64, radii: [f64; 4]) -> bool {
    if u < 0.0 || v < 0.0 || u > size || v > size {
        return false;
    }
    let [tl, tr, br, bl] = radii;
    let within = |cx: f64, cy: f64, r: f64| {
        let (dx, dy) = (u - cx, v - cy);
        dx * dx + dy * dy <= r * r
    };
    if u < tl && v < tl {
        return within(tl, tl, tl);
    }
    if u > size - tr && v < tr {
        return within(size - tr, tr, tr);
    }
    if u > size - br && v > size - br {
        return within(size - br, size - br, br);
    }
    if u < bl && v > size - bl {
        return within(bl, size - bl, bl);
    }
    true
}

/// SVG path data for the same shape as [`in_rounded_square`], placed at (`x`, `y`).
pub fn rounded_square_path(x: f64, y: f64, size: f64, radii: [f64; 4]) -> String {
    let [tl, tr, br, bl] = radii;
    let (right, bottom) = (x + size, y + size);
    if radii.iter().all(|r| *r == 0.0) {
        return format!("M{},{}h{}v{}h{}z", x, y, size, size, -size);
    }
    format!(
        "M{},{}H{}A{tr},{tr} 0 0 1 {},{}V{}A{br},{br} 0 0 1 {},{}H{}A{bl},{bl} 0 0 1 {},{}V{}A{tl},{tl} 0 0 1 {},{}Z",
        x + tl,
        y,
        right - tr,
        right,
        y + tr,
        bottom - br,
        right - br,
        bottom,
        x + bl,
        x,
        bottom - bl,
        y + tl,
        x + tl,
        y,
    )
}

/// Escapes text for use inside an XML attribute.
pub fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/*---- Encoding ----*/

/// Encodes a painted canvas as PNG or JPEG bytes.
///
/// JPEG has no alpha channel, so the canvas is flattened onto white first.
pub fn encode_raster(img: &RgbaImage, format: RawFormat) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    match format {
        RawFormat::Png => {
            PngEncoder::new(&mut bytes).write_image(
                img.as_raw(),
                img.width(),
                img.height(),
                ExtendedColorType::Rgba8,
            )?;
        }
        RawFormat::Jpeg => {
            let flat = flatten_on_white(img);
            JpegEncoder::new(&mut bytes).write_image(
                flat.as_raw(),
                flat.width(),
                flat.height(),
                ExtendedColorType::Rgb8,
            )?;
        }
        RawFormat::Svg => {
            return Err(Error::InvalidOption {
                key: "format",
                reason: "svg is not a raster format".to_string(),
            })
        }
    }
    Ok(bytes)
}

fn flatten_on_white(img: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(img.width(), img.height(), |x, y| {
        let [r, g, b, a] = img.get_pixel(x, y).0;
        let blend = |c: u8| {
            let alpha = u16::from(a);
            ((u16::from(c) * alpha + 255 * (255 - alpha)) / 255) as u8
        };
        Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Wraps `bytes` in a base64 data URI.
///
/// # Example
///
/// ```rust
/// use tgqr::helper::to_data_url;
///
/// assert_eq!(to_data_url(b"hi", "text/plain"), "data:text/plain;base64,aGk=");
/// ```
pub fn to_data_url(bytes: &[u8], mime_type: &str) -> String {
    format!("data:{};base64,{}", mime_type, general_purpose::STANDARD.encode(bytes))
}

/*---- Files ----*/

/// Writes `bytes` to `path`, creating the parent directory if it doesn't exist.
///
/// # Errors
///
/// Returns [`Error::Io`] if the directory or file cannot be written.
pub async fn save_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !tokio::fs::try_exists(dir).await? {
            tokio::fs::create_dir_all(dir).await?;
        }
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

// Tests
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("#000000").unwrap(), Rgba([0, 0, 0, 255]));
        assert_eq!(parse_color(" #FFFFFF ").unwrap(), Rgba([255, 255, 255, 255]));
        assert_eq!(parse_color("#0088cc80").unwrap(), Rgba([0, 0x88, 0xcc, 0x80]));
        assert_eq!(parse_color("transparent").unwrap().0[3], 0);
        assert!(matches!(parse_color("blue"), Err(Error::InvalidColor(_))));
        assert!(matches!(parse_color("#12345"), Err(Error::InvalidColor(_))));
        assert!(matches!(parse_color("#gg0000"), Err(Error::InvalidColor(_))));
    }

    #[test]
    fn test_svg_fill() {
        assert_eq!(svg_fill(Rgba([0, 0x88, 0xcc, 255])), "fill=\"#0088cc\"");
        assert!(svg_fill(Rgba([0, 0, 0, 0])).contains("fill-opacity=\"0.000\""));
    }

    #[test]
    fn test_in_rounded_square() {
        // plain square
        assert!(in_rounded_square(0.1, 0.1, 10.0, [0.0; 4]));
        assert!(!in_rounded_square(11.0, 5.0, 10.0, [0.0; 4]));
        // circle: corners cut away, centre and edge midpoints kept
        assert!(!in_rounded_square(0.1, 0.1, 10.0, [5.0; 4]));
        assert!(!in_rounded_square(9.9, 9.9, 10.0, [5.0; 4]));
        assert!(in_rounded_square(5.0, 5.0, 10.0, [5.0; 4]));
        assert!(in_rounded_square(5.0, 0.1, 10.0, [5.0; 4]));
        // only the top-left corner rounded
        assert!(!in_rounded_square(0.1, 0.1, 10.0, [5.0, 0.0, 0.0, 0.0]));
        assert!(in_rounded_square(9.9, 0.1, 10.0, [5.0, 0.0, 0.0, 0.0]));
    }

    #[test]
    fn test_rounded_square_path() {
        assert_eq!(rounded_square_path(1.0, 2.0, 3.0, [0.0; 4]), "M1,2h3v3h-3z");
        let path = rounded_square_path(0.0, 0.0, 10.0, [5.0; 4]);
        assert!(path.starts_with("M5,0H5A5,5 0 0 1 10,5"));
        assert!(path.ends_with('Z'));
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape("a&b<\"c\">"), "a&amp;b&lt;&quot;c&quot;&gt;");
    }

    #[test]
    fn test_encode_raster_png_signature() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([0, 0x88, 0xcc, 255]));
        let bytes = encode_raster(&img, RawFormat::Png).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");

        let jpeg = encode_raster(&img, RawFormat::Jpeg).unwrap();
        assert_eq!(&jpeg[..2], &[0xff, 0xd8]);

        assert!(encode_raster(&img, RawFormat::Svg).is_err());
    }

    #[tokio::test]
    async fn test_save_bytes_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.png");
        save_bytes(&path, b"png").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"png");
    }
}
