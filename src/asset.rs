//! Image assets: decode, resample, encode, and background decode jobs
//!
//! Every asset is a decoded RGBA8 buffer plus dimensions. Decoding happens on
//! a background thread and is polled once per frame; each load carries a
//! generation token so a superseded decode can be recognized and dropped
//! instead of clobbering newer state.

use std::fmt;
use std::io::Cursor;

use base64::Engine as _;
use image::imageops::FilterType;
use image::{ImageFormat, RgbaImage};

/// Errors from asset ingestion and export
#[derive(Debug, Clone, PartialEq)]
pub enum AssetError {
    /// Malformed or unreadable image bytes
    Decode(String),
    /// PNG serialization failed
    Encode(String),
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::Decode(msg) => write!(f, "failed to decode image: {}", msg),
            AssetError::Encode(msg) => write!(f, "failed to encode image: {}", msg),
        }
    }
}

impl std::error::Error for AssetError {}

/// A decoded raster asset
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAsset {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// RGBA8, row-major, 4 bytes per pixel
    pub pixels: Vec<u8>,
}

impl ImageAsset {
    /// Decode an encoded image (PNG/JPEG/BMP) into RGBA8
    pub fn from_encoded(bytes: &[u8], name: &str) -> Result<Self, AssetError> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| AssetError::Decode(e.to_string()))?;
        let rgba = decoded.to_rgba8();
        Ok(Self {
            name: name.to_string(),
            width: rgba.width(),
            height: rgba.height(),
            pixels: rgba.into_raw(),
        })
    }

    pub fn from_rgba(name: &str, width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), (width * height * 4) as usize);
        Self {
            name: name.to_string(),
            width,
            height,
            pixels,
        }
    }

    pub fn dims(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Resample a rectangle of this asset into a new one (crop commit)
    pub fn crop_resampled(&self, x: u32, y: u32, width: u32, height: u32) -> ImageAsset {
        let img = RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
            .expect("asset buffer matches its dimensions");
        let cropped = image::imageops::crop_imm(&img, x, y, width, height).to_image();
        ImageAsset {
            name: format!("{} (cropped)", self.name),
            width: cropped.width(),
            height: cropped.height(),
            pixels: cropped.into_raw(),
        }
    }

    /// Scaled copy of the pixel buffer (triangle filter - this feeds the
    /// shape analyzer, not the display path)
    pub fn scaled_rgba(&self, width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
            .expect("asset buffer matches its dimensions");
        image::imageops::resize(&img, width.max(1), height.max(1), FilterType::Triangle).into_raw()
    }

    /// Lossless PNG encoding of this asset
    pub fn encode_png(&self) -> Result<Vec<u8>, AssetError> {
        encode_png(&self.pixels, self.width, self.height)
    }
}

/// Encode an RGBA8 buffer as PNG bytes
pub fn encode_png(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>, AssetError> {
    let img = RgbaImage::from_raw(width, height, pixels.to_vec())
        .ok_or_else(|| AssetError::Encode("buffer does not match dimensions".to_string()))?;
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .map_err(|e| AssetError::Encode(e.to_string()))?;
    Ok(out.into_inner())
}

/// PNG data-URL for the marketplace-upload handoff
pub fn png_data_url(png_bytes: &[u8]) -> String {
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png_bytes)
    )
}

/// Which session slot a decode feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetSlot {
    Source,
    Cutout,
    Background,
}

/// A decode running on a background thread, polled each frame
#[cfg(not(target_arch = "wasm32"))]
pub struct PendingDecode {
    pub slot: AssetSlot,
    /// Load generation this decode belongs to; stale generations are dropped
    pub generation: u64,
    receiver: std::sync::mpsc::Receiver<Result<ImageAsset, AssetError>>,
}

#[cfg(not(target_arch = "wasm32"))]
impl PendingDecode {
    /// Spawn a decode job for `bytes`
    pub fn spawn(bytes: Vec<u8>, name: String, slot: AssetSlot, generation: u64) -> Self {
        let (sender, receiver) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let result = ImageAsset::from_encoded(&bytes, &name);
            // Receiver may be gone if the app shut down; nothing to do then
            let _ = sender.send(result);
        });
        Self {
            slot,
            generation,
            receiver,
        }
    }

    /// Non-blocking poll; `Some` exactly once when the decode finishes
    pub fn poll(&mut self) -> Option<Result<ImageAsset, AssetError>> {
        use std::sync::mpsc::TryRecvError;
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                Some(Err(AssetError::Decode("decode thread died".to_string())))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker_asset(width: u32, height: u32) -> ImageAsset {
        let mut pixels = vec![0u8; (width * height * 4) as usize];
        for y in 0..height {
            for x in 0..width {
                let idx = ((y * width + x) * 4) as usize;
                let v = if (x + y) % 2 == 0 { 255 } else { 0 };
                pixels[idx] = v;
                pixels[idx + 1] = v;
                pixels[idx + 2] = v;
                pixels[idx + 3] = 255;
            }
        }
        ImageAsset::from_rgba("checker", width, height, pixels)
    }

    #[test]
    fn test_png_roundtrip() {
        let asset = checker_asset(8, 6);
        let png = asset.encode_png().unwrap();
        let back = ImageAsset::from_encoded(&png, "roundtrip").unwrap();
        assert_eq!(back.width, 8);
        assert_eq!(back.height, 6);
        assert_eq!(back.pixels, asset.pixels);
    }

    #[test]
    fn test_decode_failure_reported() {
        let err = ImageAsset::from_encoded(b"definitely not an image", "junk");
        assert!(matches!(err, Err(AssetError::Decode(_))));
    }

    #[test]
    fn test_crop_resampled_dims() {
        let asset = checker_asset(20, 10);
        let cropped = asset.crop_resampled(5, 2, 10, 6);
        assert_eq!(cropped.dims(), (10, 6));
        assert_eq!(cropped.pixels.len(), 10 * 6 * 4);
    }

    #[test]
    fn test_data_url_prefix() {
        let asset = checker_asset(2, 2);
        let url = png_data_url(&asset.encode_png().unwrap());
        assert!(url.starts_with("data:image/png;base64,"));
        assert!(url.len() > 30);
    }

    #[test]
    fn test_decode_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.png");
        let asset = checker_asset(4, 4);
        std::fs::write(&path, asset.encode_png().unwrap()).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let loaded = ImageAsset::from_encoded(&bytes, "sample.png").unwrap();
        assert_eq!(loaded.dims(), (4, 4));
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_pending_decode_completes() {
        let asset = checker_asset(4, 4);
        let png = asset.encode_png().unwrap();
        let mut pending = PendingDecode::spawn(png, "bg".to_string(), AssetSlot::Background, 7);
        let result = loop {
            if let Some(r) = pending.poll() {
                break r;
            }
            std::thread::yield_now();
        };
        assert_eq!(pending.generation, 7);
        assert_eq!(result.unwrap().dims(), (4, 4));
    }
}
