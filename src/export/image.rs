// Chart rasters travel as `data:image/png;base64,...` URLs between the
// chart renderer and the exporters. This is the only place they are
// decoded; pixels are never regenerated here.
use crate::error::ExportError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use serde::Serialize;

const PNG_PREFIX: &str = "data:image/png;base64,";

/// A rendered chart as handed over by the chart renderer.
#[derive(Debug, Clone)]
pub struct ChartImage {
    pub key: String,
    pub data_url: String,
}

/// A validated PNG ready to be positioned in a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddedImage {
    pub key: String,
    #[serde(skip)]
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

pub fn encode_data_url(png: &[u8]) -> String {
    format!("{}{}", PNG_PREFIX, STANDARD.encode(png))
}

pub fn decode_data_url(key: &str, data_url: &str) -> Result<EmbeddedImage, ExportError> {
    let fail = |reason: String| ExportError::ImageDecode {
        name: key.to_string(),
        reason,
    };

    let (header, payload) = data_url
        .split_once(',')
        .ok_or_else(|| fail("not a data URL".to_string()))?;
    if !header.starts_with("data:image/png") || !header.ends_with(";base64") {
        return Err(fail(format!("unexpected header '{}'", header)));
    }
    let png = STANDARD
        .decode(payload.trim())
        .map_err(|e| fail(e.to_string()))?;
    let decoded = image::load_from_memory_with_format(&png, ImageFormat::Png)
        .map_err(|e| fail(e.to_string()))?;

    Ok(EmbeddedImage {
        key: key.to_string(),
        width: decoded.width(),
        height: decoded.height(),
        png,
    })
}

/// Shrink (never enlarge) to fit inside the box, keeping the aspect ratio.
pub fn scale_to_fit(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (0, 0);
    }
    let scale = (max_width as f64 / width as f64)
        .min(max_height as f64 / height as f64)
        .min(1.0);
    (
        (width as f64 * scale).round() as u32,
        (height as f64 * scale).round() as u32,
    )
}

#[cfg(test)]
pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut out = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut out), ImageFormat::Png)
        .unwrap();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_urls_decode_to_validated_pngs() {
        let png = sample_png(30, 16);
        let url = encode_data_url(&png);
        let img = decode_data_url("poblacion", &url).unwrap();
        assert_eq!((img.width, img.height), (30, 16));
        assert_eq!(img.png, png);
    }

    #[test]
    fn broken_data_urls_are_decode_failures() {
        for bad in [
            "no comma here",
            "data:image/jpeg;base64,AAAA",
            "data:image/png;base64,!!!",
            "data:image/png;base64,aGVsbG8=",
        ] {
            let err = decode_data_url("densidad", bad).unwrap_err();
            assert!(matches!(err, ExportError::ImageDecode { .. }), "{}", bad);
        }
    }

    #[test]
    fn scaling_keeps_aspect_and_never_enlarges() {
        assert_eq!(scale_to_fit(1200, 640, 600, 600), (600, 320));
        assert_eq!(scale_to_fit(300, 1200, 600, 600), (150, 600));
        assert_eq!(scale_to_fit(200, 100, 600, 600), (200, 100));
        assert_eq!(scale_to_fit(0, 100, 600, 600), (0, 0));
    }
}
