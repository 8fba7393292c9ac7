//! Image handling for PDF documents
//!
//! Every image drawn onto a page is normalized to JPEG first so it can be
//! embedded with the `DCTDecode` filter without re-encoding pixel data.

use crate::text::fmt_num;
use crate::{PdfError, Result};
use image::{DynamicImage, ImageFormat as Codec, RgbImage};
use lopdf::{Dictionary, Stream};
use std::io::Cursor;

impl From<image::ImageError> for PdfError {
    fn from(err: image::ImageError) -> Self {
        PdfError::ImageError(err.to_string())
    }
}

/// Detected image format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

/// Size of an image fitted into a `box_width` x `box_height` box
///
/// The aspect ratio is kept; an image with a zero dimension fills the box.
pub fn fit_dimensions(
    pixel_width: u32,
    pixel_height: u32,
    box_width: f64,
    box_height: f64,
) -> (f64, f64) {
    if pixel_width == 0 || pixel_height == 0 {
        return (box_width, box_height);
    }
    let scale = (box_width / pixel_width as f64).min(box_height / pixel_height as f64);
    (pixel_width as f64 * scale, pixel_height as f64 * scale)
}

/// Detect image format from magic bytes
pub fn detect_format(data: &[u8]) -> Option<ImageFormat> {
    if data.len() >= 3 && data[..3] == [0xFF, 0xD8, 0xFF] {
        return Some(ImageFormat::Jpeg);
    }
    if data.len() >= 8 && data[..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A] {
        return Some(ImageFormat::Png);
    }
    None
}

/// JPEG info including dimensions and color components
#[derive(Debug, Clone, Copy)]
struct JpegInfo {
    width: u32,
    height: u32,
    num_components: u8,
}

/// Read the frame header (SOFn) of a JPEG stream
fn get_jpeg_info(data: &[u8]) -> Result<JpegInfo> {
    let mut i = 2;
    while i + 9 < data.len() {
        if data[i] != 0xFF {
            i += 1;
            continue;
        }

        let marker = data[i + 1];

        // SOF0..SOF15 except DHT (C4), JPG (C8) and DAC (CC)
        if (0xC0..=0xCF).contains(&marker) && marker != 0xC4 && marker != 0xC8 && marker != 0xCC {
            let height = u16::from_be_bytes([data[i + 5], data[i + 6]]) as u32;
            let width = u16::from_be_bytes([data[i + 7], data[i + 8]]) as u32;
            let num_components = data[i + 9];
            return Ok(JpegInfo {
                width,
                height,
                num_components,
            });
        }

        let length = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        if length < 2 {
            break;
        }
        i += 2 + length;
    }

    Err(PdfError::ImageError("Could not parse JPEG info".to_string()))
}

/// Convert any decodable image to JPEG bytes
///
/// JPEG input is passed through untouched. Other formats are decoded and
/// re-encoded; transparent pixels are blended onto a white background since
/// JPEG has no alpha channel.
pub fn any_image_to_jpg(data: &[u8]) -> Result<Vec<u8>> {
    if detect_format(data) == Some(ImageFormat::Jpeg) && get_jpeg_info(data).is_ok() {
        return Ok(data.to_vec());
    }

    let decoded = image::load_from_memory(data)?;
    let rgba = decoded.to_rgba8();
    let mut rgb = RgbImage::new(rgba.width(), rgba.height());
    for (src, dst) in rgba.pixels().zip(rgb.pixels_mut()) {
        let alpha = src[3] as f32 / 255.0;
        for c in 0..3 {
            dst[c] = (src[c] as f32 * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        }
    }

    let mut out = Vec::new();
    DynamicImage::ImageRgb8(rgb).write_to(&mut Cursor::new(&mut out), Codec::Jpeg)?;
    Ok(out)
}

/// Image XObject for PDF embedding
#[derive(Debug, Clone)]
pub struct ImageXObject {
    /// Image width
    pub width: u32,
    /// Image height
    pub height: u32,
    /// Color space ("DeviceRGB", "DeviceGray", "DeviceCMYK")
    pub color_space: String,
    /// Bits per component
    pub bits_per_component: u8,
    /// Raw JPEG data
    pub data: Vec<u8>,
}

impl ImageXObject {
    /// Create XObject from JPEG data
    ///
    /// JPEG images can be embedded directly with DCTDecode filter.
    pub fn from_jpeg(data: &[u8]) -> Result<Self> {
        let info = get_jpeg_info(data)?;

        let color_space = match info.num_components {
            1 => "DeviceGray",
            4 => "DeviceCMYK",
            _ => "DeviceRGB",
        };

        Ok(Self {
            width: info.width,
            height: info.height,
            color_space: color_space.to_string(),
            bits_per_component: 8,
            data: data.to_vec(),
        })
    }

    /// Convert to lopdf Stream object
    pub fn to_pdf_stream(&self) -> Stream {
        let mut dict = Dictionary::new();

        dict.set("Type", lopdf::Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", lopdf::Object::Name(b"Image".to_vec()));
        dict.set("Width", self.width as i64);
        dict.set("Height", self.height as i64);
        dict.set(
            "ColorSpace",
            lopdf::Object::Name(self.color_space.as_bytes().to_vec()),
        );
        dict.set("BitsPerComponent", self.bits_per_component as i64);
        dict.set("Filter", lopdf::Object::Name(b"DCTDecode".to_vec()));
        if self.color_space == "DeviceCMYK" {
            // Adobe-style CMYK JPEGs store inverted samples
            let decode: Vec<lopdf::Object> = [1, 0, 1, 0, 1, 0, 1, 0]
                .into_iter()
                .map(lopdf::Object::Integer)
                .collect();
            dict.set("Decode", decode);
        }

        // Already DCT-compressed, keep lopdf from deflating it again
        Stream::new(dict, self.data.clone()).with_compression(false)
    }
}

/// Generate operators to draw image at position
///
/// # Arguments
/// * `image_name` - Image resource name (e.g., "Im1")
/// * `x` - X coordinate in points
/// * `y` - Y coordinate in points (from bottom, PDF coordinates)
/// * `width` - Image width in points
/// * `height` - Image height in points
pub fn generate_image_operators(
    image_name: &str,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
) -> Vec<u8> {
    format!(
        "q\n{} 0 0 {} {} {} cm\n/{image_name} Do\nQ\n",
        fmt_num(width),
        fmt_num(height),
        fmt_num(x),
        fmt_num(y)
    )
    .into_bytes()
}
