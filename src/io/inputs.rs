//! Turning an input descriptor into a stream of volumes
//!
//! A descriptor is a volume file, a directory of volume files, a directory of
//! 2D slices (when slice stacking is requested) or a manifest listing any of
//! these one per line. Volumes are read only when the iterator reaches them,
//! so memory holds one volume at a time however long the batch is.

use crate::io::configuration::{MANIFEST_COMMENT_PREFIX, MANIFEST_EXTENSION};
use crate::io::error::{PipelineError, Result, file_system_error};
use crate::io::slices::read_slice_stack;
use crate::io::volume_file::{VolumeFormat, read_volume};
use crate::spatial::Volume;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// One unit of work: where a volume came from and its voxels
#[derive(Debug, Clone, PartialEq)]
pub struct InputItem {
    /// File or slice directory the volume was read from
    pub identifier: PathBuf,
    /// The loaded volume
    pub volume: Volume,
}

#[derive(Debug)]
enum Pending {
    /// A manifest line or the top-level descriptor, not yet classified
    Entry(PathBuf),
    /// A volume file found while listing a directory
    VolumeFile(PathBuf),
}

/// Lazy, finite sequence of input volumes
///
/// Not restartable; build a new one to read the inputs again. The first
/// error ends the sequence.
#[derive(Debug)]
pub struct InferenceInputs {
    two_d_images: bool,
    pending: VecDeque<Pending>,
}

impl InferenceInputs {
    /// Resolve the top-level descriptor
    ///
    /// A manifest is read here; the paths it lists are checked as the
    /// iterator reaches them.
    ///
    /// # Errors
    ///
    /// Returns an error if `input` does not exist or a manifest cannot be read
    pub fn new(input: &Path, two_d_images: bool) -> Result<Self> {
        if !input.exists() {
            return Err(PipelineError::InputNotFound {
                path: input.to_path_buf(),
            });
        }

        let entries = if input.is_file() && is_manifest(input) {
            manifest_entries(input)?
        } else {
            vec![input.to_path_buf()]
        };

        Ok(Self {
            two_d_images,
            pending: entries.into_iter().map(Pending::Entry).collect(),
        })
    }

    /// Whether directories are read as stacks of 2D slices
    pub const fn two_d_images(&self) -> bool {
        self.two_d_images
    }

    fn resolve(&mut self, entry: Pending) -> Result<Option<InputItem>> {
        let path = match entry {
            Pending::VolumeFile(path) => return load(path, read_volume).map(Some),
            Pending::Entry(path) => path,
        };

        if !path.exists() {
            return Err(PipelineError::InputNotFound { path });
        }

        if path.is_file() {
            if self.two_d_images {
                return Err(PipelineError::SliceFlagWithFile { path });
            }
            return load(path, read_volume).map(Some);
        }

        if self.two_d_images {
            return load(path, read_slice_stack).map(Some);
        }

        let files = volume_files(&path)?;
        log::debug!("Found {} volumes in {}", files.len(), path.display());
        for file in files.into_iter().rev() {
            self.pending.push_front(Pending::VolumeFile(file));
        }
        Ok(None)
    }
}

impl Iterator for InferenceInputs {
    type Item = Result<InputItem>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = self.pending.pop_front()?;
            match self.resolve(entry) {
                Ok(Some(item)) => return Some(Ok(item)),
                Ok(None) => {}
                Err(e) => {
                    self.pending.clear();
                    return Some(Err(e));
                }
            }
        }
    }
}

fn load(path: PathBuf, read: impl FnOnce(&Path) -> Result<Volume>) -> Result<InputItem> {
    let volume = read(&path)?;
    log::debug!(
        "Loaded {} with shape {:?} ({})",
        path.display(),
        volume.shape(),
        volume.sample_type()
    );
    Ok(InputItem {
        identifier: path,
        volume,
    })
}

/// Whether `path` names a manifest (by extension)
pub fn is_manifest(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(MANIFEST_EXTENSION))
}

/// Paths listed in a manifest, in order
///
/// Lines whose first character is `#` and lines holding only whitespace are
/// skipped. Remaining lines are trimmed and a leading `~` expands to the home
/// directory. Relative paths stay relative to the working directory.
///
/// # Errors
///
/// Returns an error if the manifest cannot be read
pub fn manifest_entries(path: &Path) -> Result<Vec<PathBuf>> {
    let text = std::fs::read_to_string(path).map_err(file_system_error(path, "read manifest"))?;
    Ok(text
        .lines()
        .filter(|line| !line.starts_with(MANIFEST_COMMENT_PREFIX))
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(expand_home)
        .collect())
}

/// Replace a leading `~` with the home directory when one is known
pub fn expand_home(line: &str) -> PathBuf {
    let rest = match line.strip_prefix('~') {
        Some("") => Some(""),
        Some(rest) => rest.strip_prefix('/'),
        None => None,
    };
    match (rest, dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(line),
    }
}

/// Volume files directly inside `dir`, sorted by name
///
/// # Errors
///
/// Returns an error if the directory cannot be listed or holds no volume files
pub fn volume_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(file_system_error(dir, "list volume directory"))? {
        let path = entry
            .map_err(file_system_error(dir, "list volume directory"))?
            .path();
        if path.is_file() && VolumeFormat::from_path(&path).is_some() {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(PipelineError::NoVolumeFiles {
            path: dir.to_path_buf(),
        });
    }
    files.sort();
    Ok(files)
}
