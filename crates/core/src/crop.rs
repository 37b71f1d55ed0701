//! Deterministic 9:16 center crop.
//!
//! The crop keeps the full height and trims symmetric margins off the
//! left and right edges. Images already at or narrower than 9:16 are
//! passed through untouched.

use std::io::Cursor;

use image::ImageFormat;

/// Target width-to-height ratio numerator.
pub const TARGET_RATIO_W: u64 = 9;
/// Target width-to-height ratio denominator.
pub const TARGET_RATIO_H: u64 = 16;

/// Columns to keep from the source image. Rows are always `[0, height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub left: u32,
    pub width: u32,
    pub height: u32,
}

impl CropWindow {
    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.left + self.width
    }
}

/// Width a `height`-pixel-tall 9:16 image has: `floor(height * 9 / 16)`.
pub fn target_width(height: u32) -> u32 {
    (u64::from(height) * TARGET_RATIO_W / TARGET_RATIO_H) as u32
}

/// Compute the crop for a `width` x `height` image.
///
/// Returns `None` when `width <= target_width(height)`, meaning the image
/// is used unmodified.
pub fn crop_window(width: u32, height: u32) -> Option<CropWindow> {
    let target = target_width(height);
    if width <= target {
        return None;
    }
    Some(CropWindow {
        left: (width - target) / 2,
        width: target,
        height,
    })
}

/// Output of [`crop_to_portrait`].
#[derive(Debug, Clone)]
pub struct CroppedImage {
    /// Image bytes: re-encoded PNG when cropped, the original bytes otherwise.
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// The applied window, or `None` if the source was passed through.
    pub window: Option<CropWindow>,
}

#[derive(Debug, thiserror::Error)]
pub enum CropError {
    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Failed to encode cropped image: {0}")]
    Encode(#[source] image::ImageError),
}

/// Decode `bytes`, apply [`crop_window`], and re-encode as PNG.
pub fn crop_to_portrait(bytes: &[u8]) -> Result<CroppedImage, CropError> {
    let img = image::load_from_memory(bytes).map_err(CropError::Decode)?;
    let (width, height) = (img.width(), img.height());

    let Some(window) = crop_window(width, height) else {
        return Ok(CroppedImage {
            bytes: bytes.to_vec(),
            width,
            height,
            window: None,
        });
    };

    let cropped = img.crop_imm(window.left, 0, window.width, window.height);
    let mut out = Cursor::new(Vec::new());
    cropped
        .write_to(&mut out, ImageFormat::Png)
        .map_err(CropError::Encode)?;

    Ok(CroppedImage {
        bytes: out.into_inner(),
        width: window.width,
        height: window.height,
        window: Some(window),
    })
}

/// Return `bytes` as PNG, transcoding other formats.
pub fn to_png(bytes: &[u8]) -> Result<Vec<u8>, CropError> {
    if matches!(image::guess_format(bytes), Ok(ImageFormat::Png)) {
        return Ok(bytes.to_vec());
    }
    let img = image::load_from_memory(bytes).map_err(CropError::Decode)?;
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .map_err(CropError::Encode)?;
    Ok(out.into_inner())
}

/// MIME type of an encoded image, sniffed from its magic bytes.
///
/// Falls back to `image/png`, the format every stored artifact is expected
/// to be in.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Jpeg) => "image/jpeg",
        Ok(ImageFormat::WebP) => "image/webp",
        _ => "image/png",
    }
}
