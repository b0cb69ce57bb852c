//! The backup snapshot: originals of every file a patch overwrites or
//! deletes, kept for manual recovery.
//!
//! By default the snapshot is a sibling of the target directory named
//! `<target>.backup-<YYYYMMDDThhmmssZ>`, with a `-N` suffix when that name
//! is taken. Keeping it outside the target means a later scan of the
//! installed tree never picks it up.

use super::error::{ApplyError, io_error};
use crate::patch::patch_path::PatchPath;
use crate::timestamp;
use log::{debug, info};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Directory receiving copies of replaced and deleted files.
#[derive(Debug)]
pub(crate) struct BackupSnapshot {
    root: PathBuf,
    saved: usize,
}

impl BackupSnapshot {
    /// Create the snapshot directory, at `requested` when given.
    pub(crate) fn create(requested: Option<&Path>, target_dir: &Path) -> Result<Self, ApplyError> {
        let root = match requested {
            Some(dir) => {
                fs::create_dir_all(dir).map_err(io_error(format!(
                    "failed to create backup directory {}",
                    dir.display()
                )))?;
                dir.to_path_buf()
            }
            None => create_sibling(target_dir)?,
        };
        info!("backing up originals to {}", root.display());
        Ok(Self { root, saved: 0 })
    }

    /// Copy `source` into the snapshot at `relative`.
    pub(crate) fn save(&mut self, relative: &PatchPath, source: &Path) -> Result<(), ApplyError> {
        let dest = relative.resolve_under(&self.root);
        let context = || format!("failed to back up \"{relative}\" to {}", dest.display());
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(io_error(context()))?;
        }
        fs::copy(source, &dest).map_err(io_error(context()))?;
        self.saved += 1;
        debug!("backed up {relative}");
        Ok(())
    }

    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    pub(crate) fn into_root(self) -> PathBuf {
        debug!("backup snapshot holds {} files", self.saved);
        self.root
    }
}

/// Claim a fresh `<target>.backup-<stamp>[-N]` directory next to the target.
fn create_sibling(target_dir: &Path) -> Result<PathBuf, ApplyError> {
    let absolute = std::path::absolute(target_dir).map_err(io_error(format!(
        "failed to resolve target directory {}",
        target_dir.display()
    )))?;
    let stamp = timestamp::now_compact().map_err(|err| ApplyError::Io {
        context: "failed to read the system clock".to_owned(),
        source: io::Error::other(err),
    })?;
    let name = absolute
        .file_name()
        .map_or_else(|| "install".into(), |name| name.to_string_lossy().into_owned());
    let parent = absolute
        .parent()
        .map_or_else(std::env::temp_dir, Path::to_path_buf);

    let base = format!("{name}.backup-{stamp}");
    let mut attempt = 0u32;
    loop {
        let candidate = if attempt == 0 {
            parent.join(&base)
        } else {
            parent.join(format!("{base}-{attempt}"))
        };
        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(err) => {
                return Err(ApplyError::Io {
                    context: format!("failed to create backup directory {}", candidate.display()),
                    source: err,
                });
            }
        }
    }
}
