//! Image fixtures built in memory.

use std::io::Cursor;

use exif::experimental::Writer;
use exif::{Field, In};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgb, RgbImage};

use crate::exif_block::splice_exif;

pub(crate) fn plain_jpeg() -> Vec<u8> {
    let img = RgbImage::from_pixel(8, 8, Rgb([30, 120, 200]));
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_with_encoder(JpegEncoder::new_with_quality(&mut buf, 90))
        .unwrap();
    buf
}

pub(crate) fn exif_jpeg(fields: Vec<Field>) -> Vec<u8> {
    exif_jpeg_with_thumbnail(fields, None)
}

/// `thumbnail` is stored as the IFD1 JPEG.
pub(crate) fn exif_jpeg_with_thumbnail(fields: Vec<Field>, thumbnail: Option<&[u8]>) -> Vec<u8> {
    let mut writer = Writer::new();
    for field in &fields {
        writer.push_field(field);
    }
    if let Some(thumb) = thumbnail {
        writer.set_jpeg(thumb, In::THUMBNAIL);
    }
    let mut tiff = Cursor::new(Vec::new());
    writer.write(&mut tiff, false).unwrap();
    splice_exif(&plain_jpeg(), tiff.into_inner()).unwrap()
}
