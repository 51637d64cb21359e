use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageReader};

use crate::error::Result;

/// JPEG quality used when converting WebP sources.
pub const WEBP_JPEG_QUALITY: u8 = 90;

/// Decode `source` and re-encode it as JPEG through a temp file named after
/// the source. The temp file is gone by the time this returns.
pub fn transcode_to_jpeg(source: &Path, quality: u8) -> Result<Vec<u8>> {
    let img = ImageReader::open(source)?.with_guessed_format()?.decode()?;
    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let prefix = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let mut tmp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".jpg")
        .tempfile()?;
    log::debug!("Transcoding {:?} via {:?}", source, tmp.path());

    {
        let mut out = BufWriter::new(tmp.as_file_mut());
        rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))?;
        out.flush()?;
    }

    let bytes = fs::read(tmp.path())?;
    tmp.close()?;
    Ok(bytes)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::codecs::webp::WebPEncoder;
    use image::{Rgba, RgbaImage};
    use tempfile::tempdir;

    pub(crate) fn webp_bytes() -> Vec<u8> {
        let img = RgbaImage::from_pixel(8, 8, Rgba([200, 40, 40, 255]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_with_encoder(WebPEncoder::new_lossless(&mut buf))
            .unwrap();
        buf
    }

    #[test]
    fn test_webp_to_jpeg() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("red.webp");
        fs::write(&src, webp_bytes()).unwrap();

        let jpeg = transcode_to_jpeg(&src, WEBP_JPEG_QUALITY).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(image::guess_format(&jpeg).unwrap(), image::ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 8));
    }

    #[test]
    fn test_undecodable_source_fails() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("broken.webp");
        fs::write(&src, b"RIFF\x10\0\0\0WEBPgarbage").unwrap();
        assert!(transcode_to_jpeg(&src, WEBP_JPEG_QUALITY).is_err());
    }
}
