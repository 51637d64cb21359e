use std::io::Cursor;

use exif::experimental::Writer;
use exif::{Context, Field, In, Reader, Tag, Value};
use img_parts::jpeg::Jpeg;
use img_parts::{Bytes, ImageEXIF};

use crate::error::{Error, Result};

/// Top-level EXIF sections, named after the IFDs they live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    /// IFD0 of the primary image.
    Zeroth,
    Exif,
    Gps,
    Interop,
    /// IFD1, describing the thumbnail.
    First,
}

impl Section {
    pub fn of(field: &Field) -> Self {
        match field.tag.0 {
            Context::Exif => Section::Exif,
            Context::Gps => Section::Gps,
            Context::Interop => Section::Interop,
            _ if field.ifd_num == In::THUMBNAIL => Section::First,
            _ => Section::Zeroth,
        }
    }

    fn ifd(self) -> In {
        match self {
            Section::First => In::THUMBNAIL,
            _ => In::PRIMARY,
        }
    }
}

/// Owned, editable EXIF block.
///
/// Fields are kept in source order. The embedded JPEG thumbnail is held
/// separately because its offset fields are regenerated on write.
#[derive(Debug, Default)]
pub struct ExifDocument {
    fields: Vec<Field>,
    thumbnail: Option<Vec<u8>>,
    little_endian: bool,
}

impl Clone for ExifDocument {
    fn clone(&self) -> Self {
        Self {
            fields: self.fields.iter().map(clone_field).collect(),
            thumbnail: self.thumbnail.clone(),
            little_endian: self.little_endian,
        }
    }
}

impl ExifDocument {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Read the APP1 EXIF block of a JPEG. A JPEG without one yields an
    /// empty document.
    pub fn from_jpeg(bytes: &[u8]) -> Result<Self> {
        let jpeg = Jpeg::from_bytes(Bytes::copy_from_slice(bytes))?;
        match jpeg.exif() {
            Some(tiff) => Self::from_tiff(tiff.to_vec()),
            None => Ok(Self::empty()),
        }
    }

    /// Parse a bare TIFF-structured EXIF payload.
    pub fn from_tiff(tiff: Vec<u8>) -> Result<Self> {
        let parsed = Reader::new().read_raw(tiff)?;
        let thumbnail = thumbnail_slice(&parsed).map(<[u8]>::to_vec);
        let fields = parsed
            .fields()
            .filter(|f| !is_structural(f.tag))
            .map(clone_field)
            .collect();
        Ok(Self {
            fields,
            thumbnail,
            little_endian: parsed.little_endian(),
        })
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    pub fn fields_in(&self, section: Section) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(move |f| Section::of(f) == section)
    }

    pub fn thumbnail(&self) -> Option<&[u8]> {
        self.thumbnail.as_deref()
    }

    pub fn get(&self, section: Section, tag: Tag) -> Option<&Field> {
        self.fields
            .iter()
            .find(|f| f.tag == tag && Section::of(f) == section)
    }

    /// First ASCII component of a field, without trailing NULs.
    pub fn ascii(&self, section: Section, tag: Tag) -> Option<String> {
        match &self.get(section, tag)?.value {
            Value::Ascii(parts) => parts.first().map(|p| {
                let end = p.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
                String::from_utf8_lossy(&p[..end]).into_owned()
            }),
            _ => None,
        }
    }

    /// Replace the field in place, or append it if absent.
    pub fn set_ascii(&mut self, section: Section, tag: Tag, text: &str) {
        let value = Value::Ascii(vec![text.as_bytes().to_vec()]);
        match self
            .fields
            .iter_mut()
            .find(|f| f.tag == tag && Section::of(f) == section)
        {
            Some(field) => field.value = value,
            None => self.fields.push(Field {
                tag,
                ifd_num: section.ifd(),
                value,
            }),
        }
    }

    /// Whether the image already records when it was taken.
    pub fn is_dated(&self) -> bool {
        [
            (Section::Zeroth, Tag::DateTime),
            (Section::Exif, Tag::DateTimeOriginal),
            (Section::Exif, Tag::SubSecTimeOriginal),
        ]
        .into_iter()
        .any(|(section, tag)| self.get(section, tag).is_some_and(|f| is_truthy(&f.value)))
    }

    /// Serialize to a TIFF-structured payload in the source byte order.
    pub fn to_tiff(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new();
        for field in &self.fields {
            writer.push_field(field);
        }
        if let Some(thumb) = &self.thumbnail {
            writer.set_jpeg(thumb, In::THUMBNAIL);
        }
        let mut buf = Cursor::new(Vec::new());
        writer
            .write(&mut buf, self.little_endian)
            .map_err(|e| Error::ExifWrite(e.to_string()))?;
        Ok(buf.into_inner())
    }
}

/// Replace (or insert) the APP1 EXIF segment of a JPEG, leaving every other
/// segment and the scan data untouched.
pub fn splice_exif(jpeg_bytes: &[u8], tiff: Vec<u8>) -> Result<Vec<u8>> {
    let mut jpeg = Jpeg::from_bytes(Bytes::copy_from_slice(jpeg_bytes))?;
    jpeg.set_exif(Some(Bytes::from(tiff)));
    Ok(jpeg.encoder().bytes().to_vec())
}

fn clone_field(f: &Field) -> Field {
    Field {
        tag: f.tag,
        ifd_num: f.ifd_num,
        value: f.value.clone(),
    }
}

/// Pointer and offset tags are rebuilt by the writer from the data itself.
fn is_structural(tag: Tag) -> bool {
    matches!(
        tag,
        Tag::ExifIFDPointer
            | Tag::GPSInfoIFDPointer
            | Tag::InteropIFDPointer
            | Tag::JPEGInterchangeFormat
            | Tag::JPEGInterchangeFormatLength
    )
}

fn thumbnail_slice(parsed: &exif::Exif) -> Option<&[u8]> {
    let offset = parsed
        .get_field(Tag::JPEGInterchangeFormat, In::THUMBNAIL)?
        .value
        .get_uint(0)? as usize;
    let len = parsed
        .get_field(Tag::JPEGInterchangeFormatLength, In::THUMBNAIL)?
        .value
        .get_uint(0)? as usize;
    parsed.buf().get(offset..offset.checked_add(len)?)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Ascii(parts) => parts.iter().any(|p| p.iter().any(|&b| b != 0)),
        Value::Undefined(bytes, _) | Value::Byte(bytes) => !bytes.is_empty(),
        Value::Unknown(..) => false,
        _ => true,
    }
}
