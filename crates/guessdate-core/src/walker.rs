use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Breadth-first file walker over a work queue.
///
/// The queue starts with the root's direct entries. Directories are expanded
/// by appending their children to the tail, so files are yielded level by
/// level in listing order. Children of one directory are sorted by name.
pub struct Walker {
    queue: VecDeque<PathBuf>,
}

impl Walker {
    pub fn new(root: &Path) -> Result<Self> {
        let mut queue = VecDeque::new();
        queue.extend(list_dir(root)?);
        Ok(Self { queue })
    }
}

impl Iterator for Walker {
    type Item = Result<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(path) = self.queue.pop_front() {
            let meta = match fs::metadata(&path) {
                Ok(meta) => meta,
                Err(source) => return Some(Err(Error::Walk { path, source })),
            };
            if meta.is_dir() {
                log::trace!("Expanding directory: {:?}", path);
                match list_dir(&path) {
                    Ok(children) => self.queue.extend(children),
                    Err(e) => return Some(Err(e)),
                }
            } else {
                log::trace!("Discovered file: {:?}", path);
                return Some(Ok(path));
            }
        }
        None
    }
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let walk_err = |source| Error::Walk {
        path: dir.to_path_buf(),
        source,
    };
    let mut children = Vec::new();
    for entry in fs::read_dir(dir).map_err(walk_err)? {
        children.push(entry.map_err(walk_err)?.path());
    }
    children.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(children)
}
