use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use filetime::FileTime;
use serde::{Deserialize, Serialize};

use crate::date::FileTimes;
use crate::error::{Error, Result};

/// Prefix for output directories and files.
pub const OUTPUT_PREFIX: &str = "adjusted_";

/// Where patched copies are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputLayout {
    /// Flat directory of `adjusted_<name>` files.
    Sibling { dir: PathBuf },
    /// `adjusted_<name>` next to each source file.
    InPlace,
}

impl OutputLayout {
    pub fn output_path(&self, source: &Path) -> PathBuf {
        let name = source
            .file_name()
            .map(|n| format!("{}{}", OUTPUT_PREFIX, n.to_string_lossy()))
            .unwrap_or_else(|| OUTPUT_PREFIX.to_string());
        match self {
            OutputLayout::Sibling { dir } => dir.join(name),
            OutputLayout::InPlace => source.with_file_name(name),
        }
    }

    /// Whether `path` lies inside the output directory.
    pub fn owns(&self, path: &Path) -> bool {
        match self {
            OutputLayout::Sibling { dir } => path.starts_with(dir),
            OutputLayout::InPlace => false,
        }
    }
}

/// `<parent-of-root>/adjusted_<root-basename>`.
pub fn default_output_dir(root: &Path) -> Result<PathBuf> {
    let root = root.canonicalize()?;
    let (Some(parent), Some(name)) = (root.parent(), root.file_name()) else {
        return Err(Error::InvalidRoot(root));
    };
    Ok(parent.join(format!("{}{}", OUTPUT_PREFIX, name.to_string_lossy())))
}

/// Create the output directory. An existing directory is an error: runs never
/// merge into earlier output.
pub fn create_output_dir(dir: &Path) -> Result<()> {
    match fs::create_dir(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            Err(Error::OutputExists(dir.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Write `bytes` to a new file at `dest`. Never overwrites.
pub fn write_output(dest: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = match OpenOptions::new().write(true).create_new(true).open(dest) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(Error::OutputExists(dest.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

/// Mirror the source's access and modification times onto `dest`. Missing
/// values fall back to the epoch.
pub fn restore_file_times(dest: &Path, times: &FileTimes) -> Result<()> {
    let atime = file_time(times.accessed);
    let mtime = file_time(times.modified);
    filetime::set_file_times(dest, atime, mtime)?;
    if times.created.is_some() {
        log::debug!("Birth time of {:?} left as assigned by the OS", dest);
    }
    Ok(())
}

fn file_time(millis: Option<i64>) -> FileTime {
    let millis = millis.unwrap_or(0);
    FileTime::from_unix_time(
        millis.div_euclid(1000),
        (millis.rem_euclid(1000) * 1_000_000) as u32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_output_paths() {
        let sibling = OutputLayout::Sibling {
            dir: PathBuf::from("/out/adjusted_photos"),
        };
        assert_eq!(
            sibling.output_path(Path::new("photos/2020/img.jpg")),
            PathBuf::from("/out/adjusted_photos/adjusted_img.jpg")
        );
        assert_eq!(
            OutputLayout::InPlace.output_path(Path::new("photos/2020/img.jpg")),
            PathBuf::from("photos/2020/adjusted_img.jpg")
        );
    }

    #[test]
    fn test_default_output_dir_is_sibling() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("holiday");
        fs::create_dir(&root).unwrap();

        let out = default_output_dir(&root).unwrap();
        assert_eq!(out, dir.path().canonicalize().unwrap().join("adjusted_holiday"));
    }

    #[test]
    fn test_existing_output_dir_is_fatal() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("adjusted_x");
        create_output_dir(&out).unwrap();
        assert!(matches!(create_output_dir(&out), Err(Error::OutputExists(_))));
    }

    #[test]
    fn test_write_never_overwrites() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("adjusted_a.jpg");
        write_output(&dest, b"first").unwrap();
        assert!(matches!(write_output(&dest, b"second"), Err(Error::OutputExists(_))));
        assert_eq!(fs::read(&dest).unwrap(), b"first");
    }

    #[test]
    fn test_restore_file_times() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("adjusted_a.jpg");
        write_output(&dest, b"x").unwrap();

        let times = FileTimes {
            accessed: None,
            modified: Some(1_700_000_000_000),
            changed: None,
            created: None,
        };
        restore_file_times(&dest, &times).unwrap();

        let meta = fs::metadata(&dest).unwrap();
        assert_eq!(
            FileTime::from_last_modification_time(&meta),
            FileTime::from_unix_time(1_700_000_000, 0)
        );
        assert_eq!(
            FileTime::from_last_access_time(&meta),
            FileTime::from_unix_time(0, 0)
        );
    }
}
