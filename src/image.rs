use serde::{Deserialize, Serialize};

/// Container format of an encoded preview image, detected from its magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    WebP,
    Bmp,
    Tiff,
    Unknown,
}

impl ImageFormat {
    pub fn detect(data: &[u8]) -> Self {
        match data {
            [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => ImageFormat::Png,
            [0xFF, 0xD8, 0xFF, ..] => ImageFormat::Jpeg,
            [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => ImageFormat::Gif,
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => ImageFormat::WebP,
            [b'B', b'M', ..] => ImageFormat::Bmp,
            [b'I', b'I', 0x2A, 0x00, ..] | [b'M', b'M', 0x00, 0x2A, ..] => ImageFormat::Tiff,
            _ => ImageFormat::Unknown,
        }
    }

    /// Uniform type identifier, as used when requesting a representation
    /// from an image provider.
    pub fn type_identifier(&self) -> &'static str {
        match self {
            ImageFormat::Png => "public.png",
            ImageFormat::Jpeg => "public.jpeg",
            ImageFormat::Gif => "com.compuserve.gif",
            ImageFormat::WebP => "org.webmproject.webp",
            ImageFormat::Bmp => "com.microsoft.bmp",
            ImageFormat::Tiff => "public.tiff",
            ImageFormat::Unknown => "public.data",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::WebP => "image/webp",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Tiff => "image/tiff",
            ImageFormat::Unknown => "application/octet-stream",
        }
    }
}

/// Encoded image bytes attached to a link preview.
///
/// Decoding into something displayable is left to the UI layer; this type
/// only exposes what can be read cheaply from the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewImage {
    data: Vec<u8>,
}

impl PreviewImage {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn format(&self) -> ImageFormat {
        ImageFormat::detect(&self.data)
    }

    /// Pixel dimensions for formats that store them at a fixed header offset.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self.format() {
            ImageFormat::Png => {
                // IHDR is always the first chunk: width and height are
                // big-endian u32 at offsets 16 and 20.
                let width = u32::from_be_bytes(self.data.get(16..20)?.try_into().ok()?);
                let height = u32::from_be_bytes(self.data.get(20..24)?.try_into().ok()?);
                Some((width, height))
            }
            ImageFormat::Gif => {
                let width = u16::from_le_bytes(self.data.get(6..8)?.try_into().ok()?);
                let height = u16::from_le_bytes(self.data.get(8..10)?.try_into().ok()?);
                Some((width as u32, height as u32))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_header(width: u32, height: u32) -> Vec<u8> {
        let mut data = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        data.extend_from_slice(&13u32.to_be_bytes());
        data.extend_from_slice(b"IHDR");
        data.extend_from_slice(&width.to_be_bytes());
        data.extend_from_slice(&height.to_be_bytes());
        data.extend_from_slice(&[8, 6, 0, 0, 0]);
        data
    }

    #[test]
    fn test_detect_formats() {
        assert_eq!(ImageFormat::detect(&png_header(1, 1)), ImageFormat::Png);
        assert_eq!(ImageFormat::detect(&[0xFF, 0xD8, 0xFF, 0xE0]), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::detect(b"GIF89a\x01\x00\x01\x00"), ImageFormat::Gif);
        assert_eq!(ImageFormat::detect(b"RIFF\0\0\0\0WEBPVP8 "), ImageFormat::WebP);
        assert_eq!(ImageFormat::detect(b"<html>"), ImageFormat::Unknown);
        assert_eq!(ImageFormat::detect(b""), ImageFormat::Unknown);
    }

    #[test]
    fn test_png_dimensions() {
        let image = PreviewImage::new(png_header(640, 480));
        assert_eq!(image.format(), ImageFormat::Png);
        assert_eq!(image.dimensions(), Some((640, 480)));
    }

    #[test]
    fn test_gif_dimensions() {
        let image = PreviewImage::new(b"GIF89a\x20\x00\x10\x00".to_vec());
        assert_eq!(image.dimensions(), Some((32, 16)));
    }

    #[test]
    fn test_truncated_header() {
        let image = PreviewImage::new(vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
        assert_eq!(image.format(), ImageFormat::Png);
        assert_eq!(image.dimensions(), None);
    }
}
