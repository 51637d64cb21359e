use chrono::NaiveDateTime;
use exif::Tag;

use crate::date::format_exif_datetime;
use crate::exif_block::{ExifDocument, Section};

pub const SOFTWARE_MARKER: &str = "guess-image-creation-date 03 13 2022";
pub const DESCRIPTION_MARKER: &str = "with manually added creation dates";
const MARKER_SEPARATOR: &str = " _ ";

/// `"<prior> _ <marker>"` when there is a non-empty prior value, otherwise
/// just the marker.
pub fn append_marker(prior: Option<&str>, marker: &str) -> String {
    match prior {
        Some(p) if !p.is_empty() => format!("{p}{MARKER_SEPARATOR}{marker}"),
        _ => marker.to_string(),
    }
}

/// Build a copy of `source` carrying the estimated capture time and the
/// tool markers. `source` itself is left untouched.
pub fn patch_document(source: &ExifDocument, taken: &NaiveDateTime) -> ExifDocument {
    let mut doc = source.clone();
    let stamp = format_exif_datetime(taken);

    doc.set_ascii(Section::Zeroth, Tag::DateTime, &stamp);
    doc.set_ascii(Section::Exif, Tag::DateTimeDigitized, &stamp);

    for (tag, marker) in [
        (Tag::Software, SOFTWARE_MARKER),
        (Tag::ImageDescription, DESCRIPTION_MARKER),
    ] {
        let prior = doc.ascii(Section::Zeroth, tag);
        let value = append_marker(prior.as_deref(), marker);
        doc.set_ascii(Section::Zeroth, tag, &value);
    }

    doc
}
