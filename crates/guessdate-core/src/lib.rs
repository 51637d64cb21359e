pub mod cancel;
pub mod date;
pub mod error;
pub mod exif_block;
pub mod media;
pub mod patch;
pub mod transcode;
pub mod walker;
pub mod writer;

#[cfg(test)]
mod test_util;

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::date::{earliest_record, FileTimes};
use crate::exif_block::{splice_exif, ExifDocument};
use crate::media::MediaKind;
use crate::transcode::WEBP_JPEG_QUALITY;

pub use cancel::{CancellationToken, CancelledError};
pub use error::Error;
pub use media::ClassifyMode;
pub use writer::OutputLayout;

fn default_jobs() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOptions {
    /// Directory to scan.
    pub root: PathBuf,
    /// Overrides `<parent>/adjusted_<root-name>`.
    #[serde(default)]
    pub output: Option<PathBuf>,
    /// Write `adjusted_<name>` next to each source instead.
    #[serde(default)]
    pub in_place: bool,
    #[serde(default)]
    pub classify: ClassifyMode,
    /// Worker threads. 1 processes files strictly one after another.
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

impl ProcessOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            output: None,
            in_place: false,
            classify: ClassifyMode::default(),
            jobs: default_jobs(),
        }
    }
}

/// Control options for process execution.
#[derive(Debug, Clone, Default)]
pub struct ProcessControl {
    pub cancel_token: Option<CancellationToken>,
}

impl ProcessControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    fn check(&self) -> Result<(), CancelledError> {
        match &self.cancel_token {
            Some(token) => token.check(),
            None => Ok(()),
        }
    }
}

/// What happened to one file. Every file gets exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Written { output: PathBuf },
    SkippedUnsupported { mime: String },
    SkippedAlreadyDated,
    Failed { reason: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessResult {
    pub files_written: u64,
    pub skipped_unsupported: u64,
    pub skipped_already_dated: u64,
    pub files_failed: u64,
}

impl ProcessResult {
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Written { .. } => self.files_written += 1,
            Outcome::SkippedUnsupported { .. } => self.skipped_unsupported += 1,
            Outcome::SkippedAlreadyDated => self.skipped_already_dated += 1,
            Outcome::Failed { .. } => self.files_failed += 1,
        }
    }

    pub fn merge(self, other: Self) -> Self {
        Self {
            files_written: self.files_written + other.files_written,
            skipped_unsupported: self.skipped_unsupported + other.skipped_unsupported,
            skipped_already_dated: self.skipped_already_dated + other.skipped_already_dated,
            files_failed: self.files_failed + other.files_failed,
        }
    }

    pub fn files_skipped(&self) -> u64 {
        self.skipped_unsupported + self.skipped_already_dated
    }
}

impl FromIterator<Outcome> for ProcessResult {
    fn from_iter<I: IntoIterator<Item = Outcome>>(iter: I) -> Self {
        let mut result = Self::default();
        for outcome in iter {
            result.record(&outcome);
        }
        result
    }
}

/// Run the whole directory.
pub fn process(options: &ProcessOptions) -> anyhow::Result<ProcessResult> {
    process_with_control(options, &ProcessControl::default())
}

pub fn process_with_control(
    options: &ProcessOptions,
    control: &ProcessControl,
) -> anyhow::Result<ProcessResult> {
    if !options.root.is_dir() {
        return Err(Error::InvalidRoot(options.root.clone()).into());
    }
    control.check()?;

    // Walker paths and the output dir are compared as absolute paths.
    let root = options.root.canonicalize()?;
    let layout = prepare_layout(options)?;
    let walker = walker::Walker::new(&root)?;

    let result = if options.jobs <= 1 {
        let mut result = ProcessResult::default();
        for path in walker {
            if control.check().is_err() {
                log::warn!(
                    "Cancelled after {} written, {} skipped, {} failed",
                    result.files_written,
                    result.files_skipped(),
                    result.files_failed
                );
                return Err(CancelledError.into());
            }
            let path = path?;
            if layout.owns(&path) {
                continue;
            }
            let outcome = process_file(&path, &layout, options.classify)?;
            result.record(&outcome);
        }
        result
    } else {
        let paths = walker
            .filter(|p| !p.as_ref().is_ok_and(|p| layout.owns(p)))
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!("Processing {} files on {} threads", paths.len(), options.jobs);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.jobs)
            .build()?;
        pool.install(|| {
            paths
                .par_iter()
                .map(|path| -> anyhow::Result<Outcome> {
                    control.check()?;
                    Ok(process_file(path, &layout, options.classify)?)
                })
                .try_fold(ProcessResult::default, |mut acc, outcome| {
                    acc.record(&outcome?);
                    anyhow::Ok(acc)
                })
                .try_reduce(ProcessResult::default, |a, b| Ok(a.merge(b)))
        })?
    };

    log::debug!("Finished: {:?}", result);
    Ok(result)
}

fn prepare_layout(options: &ProcessOptions) -> error::Result<OutputLayout> {
    if options.in_place {
        return Ok(OutputLayout::InPlace);
    }
    let dir = match &options.output {
        Some(dir) => dir.clone(),
        None => writer::default_output_dir(&options.root)?,
    };
    writer::create_output_dir(&dir)?;
    let dir = dir.canonicalize()?;
    log::info!("Writing to {}", dir.display());
    Ok(OutputLayout::Sibling { dir })
}

/// Process one file end to end.
///
/// Problems with the file itself (undecodable image, bad EXIF, no usable
/// timestamp, name collision in the output) become `Outcome::Failed`.
/// Filesystem errors on stat, read or write are returned and end the run.
pub fn process_file(path: &Path, layout: &OutputLayout, mode: ClassifyMode) -> error::Result<Outcome> {
    // Stat before anything reads the file and bumps its atime.
    let times = FileTimes::from_metadata(&fs::metadata(path)?);

    let bytes = match media::detect_media_kind(path, mode)? {
        MediaKind::Jpeg => fs::read(path)?,
        MediaKind::Webp => match transcode::transcode_to_jpeg(path, WEBP_JPEG_QUALITY) {
            Ok(bytes) => bytes,
            Err(e) => return Ok(failed(path, e)),
        },
        MediaKind::Unsupported { mime } => {
            log::debug!("Skipping {:?}: unsupported type {}", path, mime);
            return Ok(Outcome::SkippedUnsupported { mime });
        }
    };

    let patched = match patch_bytes(&bytes, &times) {
        Ok(Some(patched)) => patched,
        Ok(None) => {
            log::debug!("Skipping {:?}: already dated", path);
            return Ok(Outcome::SkippedAlreadyDated);
        }
        Err(e) => return Ok(failed(path, e)),
    };

    let dest = layout.output_path(path);
    match writer::write_output(&dest, &patched) {
        Ok(()) => {}
        Err(e @ Error::OutputExists(_)) => return Ok(failed(path, e)),
        Err(e) => return Err(e),
    }
    writer::restore_file_times(&dest, &times)?;

    log::info!("Wrote {:?}", dest);
    Ok(Outcome::Written { output: dest })
}

/// Patched JPEG bytes, or `None` when the image already carries a date.
fn patch_bytes(bytes: &[u8], times: &FileTimes) -> error::Result<Option<Vec<u8>>> {
    let doc = ExifDocument::from_jpeg(bytes)?;
    if doc.is_dated() {
        return Ok(None);
    }
    let millis = earliest_record(times)?;
    let taken = date::local_datetime(millis).ok_or(Error::NoValidTimestamp)?;
    let patched = patch::patch_document(&doc, &taken);
    Ok(Some(splice_exif(bytes, patched.to_tiff()?)?))
}

fn failed(path: &Path, e: Error) -> Outcome {
    log::error!("Failed to process {:?}: {}", path, e);
    Outcome::Failed {
        reason: e.to_string(),
    }
}
