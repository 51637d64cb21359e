use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("failed to parse EXIF: {0}")]
    ExifParse(String),

    #[error("failed to serialize EXIF: {0}")]
    ExifWrite(String),

    #[error("not a JPEG stream: {0}")]
    Jpeg(#[from] img_parts::Error),

    #[error("no valid timestamp source")]
    NoValidTimestamp,

    #[error("output already exists: {}", .0.display())]
    OutputExists(PathBuf),

    #[error("invalid root directory: {}", .0.display())]
    InvalidRoot(PathBuf),
}

impl From<exif::Error> for Error {
    fn from(e: exif::Error) -> Self {
        Error::ExifParse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
