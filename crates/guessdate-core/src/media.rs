use std::fs::File;
use std::io::Read;
use std::path::Path;

use image::ImageFormat;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Number of header bytes read for content sniffing.
const SNIFF_LEN: u64 = 64;

/// How a file's format is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ClassifyMode {
    /// Sniff magic bytes
    #[default]
    Content,
    /// Trust the file extension
    Extension,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaKind {
    /// Processed as-is.
    Jpeg,
    /// Transcoded to JPEG before patching.
    Webp,
    Unsupported { mime: String },
}

impl MediaKind {
    fn from_mime(mime: &str) -> Self {
        match mime {
            "image/jpeg" | "image/jpg" => MediaKind::Jpeg,
            "image/webp" => MediaKind::Webp,
            other => MediaKind::Unsupported {
                mime: other.to_string(),
            },
        }
    }
}

pub fn detect_media_kind(path: &Path, mode: ClassifyMode) -> Result<MediaKind> {
    match mode {
        ClassifyMode::Content => {
            let mut header = Vec::with_capacity(SNIFF_LEN as usize);
            File::open(path)?.take(SNIFF_LEN).read_to_end(&mut header)?;
            Ok(classify_bytes(&header, path))
        }
        ClassifyMode::Extension => Ok(classify_extension(path)),
    }
}

/// Classify by magic bytes. `path` is only used to label unknown content.
pub fn classify_bytes(header: &[u8], path: &Path) -> MediaKind {
    match image::guess_format(header) {
        Ok(ImageFormat::Jpeg) => MediaKind::Jpeg,
        Ok(ImageFormat::WebP) => MediaKind::Webp,
        Ok(format) => MediaKind::Unsupported {
            mime: format.to_mime_type().to_string(),
        },
        Err(_) => MediaKind::Unsupported {
            mime: mime_guess::from_path(path)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
        },
    }
}

/// Files without a recognised extension are assumed to be JPEG.
pub fn classify_extension(path: &Path) -> MediaKind {
    match mime_guess::from_path(path).first() {
        Some(mime) if mime.type_() == mime_guess::mime::IMAGE => {
            MediaKind::from_mime(mime.essence_str())
        }
        Some(mime) => MediaKind::Unsupported {
            mime: mime.essence_str().to_string(),
        },
        None => MediaKind::Jpeg,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0];
    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const WEBP_MAGIC: &[u8] = b"RIFF\x24\0\0\0WEBPVP8 ";

    #[test]
    fn test_classify_by_content() {
        let p = PathBuf::from("photo.png");
        assert_eq!(classify_bytes(JPEG_MAGIC, &p), MediaKind::Jpeg);
        assert_eq!(classify_bytes(WEBP_MAGIC, &p), MediaKind::Webp);
        assert_eq!(
            classify_bytes(PNG_MAGIC, Path::new("photo.jpg")),
            MediaKind::Unsupported {
                mime: "image/png".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_content_labelled_by_extension() {
        assert_eq!(
            classify_bytes(b"hello world", Path::new("notes.txt")),
            MediaKind::Unsupported {
                mime: "text/plain".to_string()
            }
        );
        assert_eq!(
            classify_bytes(b"hello world", Path::new("blob")),
            MediaKind::Unsupported {
                mime: "application/octet-stream".to_string()
            }
        );
    }

    #[test]
    fn test_classify_by_extension() {
        assert_eq!(classify_extension(Path::new("a.JPG")), MediaKind::Jpeg);
        assert_eq!(classify_extension(Path::new("a.jpeg")), MediaKind::Jpeg);
        assert_eq!(classify_extension(Path::new("a.webp")), MediaKind::Webp);
        assert!(matches!(
            classify_extension(Path::new("a.png")),
            MediaKind::Unsupported { .. }
        ));
        assert_eq!(classify_extension(Path::new("no_extension")), MediaKind::Jpeg);
    }
}
