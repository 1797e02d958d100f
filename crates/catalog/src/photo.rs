//! Photo checks, compression and thumbnails, run before anything is uploaded.

use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, RgbImage};

use crate::UploadError;

pub const MAX_PHOTOS: usize = 10;
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const TARGET_UPLOAD_BYTES: usize = 2 * 1024 * 1024;
pub const MAX_EDGE_PX: u32 = 1920;
pub const THUMBNAIL_PX: u32 = 300;
pub const THUMBNAIL_QUALITY: u8 = 70;

// Tried in order until the encoded photo fits the target size.
const QUALITY_STEPS: [u8; 6] = [90, 80, 70, 60, 50, 40];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoKind {
    Jpeg,
    Png,
    Heic,
}

impl PhotoKind {
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(PhotoKind::Jpeg),
            "image/png" => Some(PhotoKind::Png),
            "image/heic" => Some(PhotoKind::Heic),
            _ => None,
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            PhotoKind::Jpeg => "image/jpeg",
            PhotoKind::Png => "image/png",
            PhotoKind::Heic => "image/heic",
        }
    }
}

/// A file picked by the user.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// A photo that passed checks and is ready for storage.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedPhoto {
    pub file_name: String,
    pub kind: PhotoKind,
    pub bytes: Vec<u8>,
    /// `(width, height)` after resizing; `None` when the format was not decoded.
    pub dimensions: Option<(u32, u32)>,
    /// JPEG data URL of the square thumbnail.
    pub thumbnail: Option<String>,
}

/// Size and type checks shared by the client pipeline and stores.
pub fn check_photo(
    file_name: &str,
    content_type: &str,
    size: usize,
) -> Result<PhotoKind, UploadError> {
    if size > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge {
            file_name: file_name.to_string(),
            size,
            max: MAX_UPLOAD_BYTES,
        });
    }
    PhotoKind::from_mime(content_type).ok_or_else(|| UploadError::UnsupportedType {
        file_name: file_name.to_string(),
        content_type: content_type.to_string(),
    })
}

/// Checks, downsizes and re-encodes a photo and renders its thumbnail.
///
/// JPEG and PNG input is decoded, fitted inside [`MAX_EDGE_PX`] and re-encoded
/// as JPEG at the highest quality step that fits [`TARGET_UPLOAD_BYTES`]. HEIC
/// is passed through untouched and gets no thumbnail.
pub fn prepare_photo(file: &PhotoFile) -> Result<PreparedPhoto, UploadError> {
    let kind = check_photo(&file.file_name, &file.content_type, file.bytes.len())?;
    if kind == PhotoKind::Heic {
        tracing::debug!(file = %file.file_name, "heic photo passed through without thumbnail");
        return Ok(PreparedPhoto {
            file_name: file.file_name.clone(),
            kind,
            bytes: file.bytes.clone(),
            dimensions: None,
            thumbnail: None,
        });
    }

    let decoded = image::load_from_memory(&file.bytes).map_err(|err| UploadError::Decode {
        file_name: file.file_name.clone(),
        reason: err.to_string(),
    })?;

    let fitted = fit_within(decoded, MAX_EDGE_PX);
    let rgb = fitted.to_rgb8();
    let bytes = compress(&rgb, &file.file_name)?;
    let thumbnail = thumbnail_data_url(&fitted, &file.file_name)?;

    tracing::debug!(
        file = %file.file_name,
        original = file.bytes.len(),
        compressed = bytes.len(),
        "photo prepared"
    );
    Ok(PreparedPhoto {
        file_name: file.file_name.clone(),
        kind: PhotoKind::Jpeg,
        bytes,
        dimensions: Some(rgb.dimensions()),
        thumbnail: Some(thumbnail),
    })
}

fn fit_within(img: DynamicImage, max_edge: u32) -> DynamicImage {
    let (w, h) = img.dimensions();
    if w.max(h) <= max_edge {
        return img;
    }
    img.resize(max_edge, max_edge, FilterType::Triangle)
}

fn encode_jpeg(rgb: &RgbImage, quality: u8, file_name: &str) -> Result<Vec<u8>, UploadError> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality)
        .encode_image(rgb)
        .map_err(|err| UploadError::Encode {
            file_name: file_name.to_string(),
            reason: err.to_string(),
        })?;
    Ok(buffer)
}

fn compress(rgb: &RgbImage, file_name: &str) -> Result<Vec<u8>, UploadError> {
    let mut smallest = Vec::new();
    for quality in QUALITY_STEPS {
        let encoded = encode_jpeg(rgb, quality, file_name)?;
        if encoded.len() <= TARGET_UPLOAD_BYTES {
            return Ok(encoded);
        }
        smallest = encoded;
    }
    tracing::warn!(file = file_name, bytes = smallest.len(), "photo still above target size");
    Ok(smallest)
}

/// Centre-cropped square thumbnail as a `data:image/jpeg;base64,` URL.
pub fn thumbnail_data_url(img: &DynamicImage, file_name: &str) -> Result<String, UploadError> {
    let (w, h) = img.dimensions();
    let side = w.min(h).max(1);
    let x = (w.saturating_sub(side)) / 2;
    let y = (h.saturating_sub(side)) / 2;

    let square = img
        .crop_imm(x, y, side, side)
        .resize_exact(THUMBNAIL_PX, THUMBNAIL_PX, FilterType::Triangle)
        .to_rgb8();
    let jpeg = encode_jpeg(&square, THUMBNAIL_QUALITY, file_name)?;
    Ok(format!(
        "data:image/jpeg;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(jpeg)
    ))
}

/// Keeps ASCII letters, digits, dots and hyphens; other runs become one `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let keep = c.is_ascii_alphanumeric() || c == '.' || c == '-';
        if keep {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "photo".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Content hash used to keep object keys unique per upload.
pub fn content_id(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Storage key `<owner>/<hash prefix>_<sanitized name>`.
pub fn object_key(owner_id: &str, bytes: &[u8], file_name: &str) -> String {
    let hash = content_id(bytes);
    format!("{owner_id}/{}_{}", &hash[..16], sanitize_file_name(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn file(name: &str, mime: &str, bytes: Vec<u8>) -> PhotoFile {
        PhotoFile {
            file_name: name.to_string(),
            content_type: mime.to_string(),
            bytes,
        }
    }

    #[test]
    fn accepts_known_types() {
        assert_eq!(PhotoKind::from_mime("IMAGE/JPG"), Some(PhotoKind::Jpeg));
        assert_eq!(PhotoKind::from_mime("image/heic"), Some(PhotoKind::Heic));
        assert_eq!(PhotoKind::from_mime("image/gif"), None);
    }

    #[test]
    fn rejects_oversized_and_unknown_files() {
        assert!(matches!(
            check_photo("big.jpg", "image/jpeg", MAX_UPLOAD_BYTES + 1),
            Err(UploadError::TooLarge { .. })
        ));
        assert_eq!(
            check_photo("anim.gif", "image/gif", 10),
            Err(UploadError::UnsupportedType {
                file_name: "anim.gif".to_string(),
                content_type: "image/gif".to_string(),
            })
        );
    }

    #[test]
    fn large_png_is_fitted_and_thumbnailed() {
        let prepared = prepare_photo(&file("wide.png", "image/png", png(2400, 1200))).unwrap();

        assert_eq!(prepared.kind, PhotoKind::Jpeg);
        assert_eq!(prepared.dimensions, Some((1920, 960)));
        assert!(prepared.bytes.len() <= TARGET_UPLOAD_BYTES);
        let thumb = prepared.thumbnail.unwrap();
        assert!(thumb.starts_with("data:image/jpeg;base64,"));

        let payload = thumb.trim_start_matches("data:image/jpeg;base64,");
        let jpeg = base64::engine::general_purpose::STANDARD.decode(payload).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (THUMBNAIL_PX, THUMBNAIL_PX));
    }

    #[test]
    fn small_photo_keeps_its_size() {
        let prepared = prepare_photo(&file("small.png", "image/png", png(64, 48))).unwrap();
        assert_eq!(prepared.dimensions, Some((64, 48)));
    }

    #[test]
    fn heic_passes_through() {
        let bytes = vec![0u8, 1, 2, 3];
        let prepared = prepare_photo(&file("IMG_1.HEIC", "image/heic", bytes.clone())).unwrap();
        assert_eq!(prepared.kind, PhotoKind::Heic);
        assert_eq!(prepared.bytes, bytes);
        assert_eq!(prepared.thumbnail, None);
    }

    #[test]
    fn corrupt_jpeg_fails_to_decode() {
        let err =
            prepare_photo(&file("bad.jpg", "image/jpeg", vec![0xFF, 0xD8, 0x00])).unwrap_err();
        assert!(matches!(err, UploadError::Decode { .. }));
    }

    #[test]
    fn sanitizes_names() {
        assert_eq!(sanitize_file_name("My Photo (1).JPG"), "My_Photo_1_.JPG");
        assert_eq!(sanitize_file_name("été à Bruxelles.png"), "t_Bruxelles.png");
        assert_eq!(sanitize_file_name("__a__b__"), "a_b");
        assert_eq!(sanitize_file_name("###"), "photo");
    }

    #[test]
    fn object_keys_are_scoped_to_owner() {
        let key = object_key("user-7", b"abc", "beach day.jpg");
        let (owner, rest) = key.split_once('/').unwrap();
        assert_eq!(owner, "user-7");
        assert!(rest.ends_with("_beach_day.jpg"));
        assert_eq!(rest.len(), 16 + "_beach_day.jpg".len());
    }
}
