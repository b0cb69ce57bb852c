//! Extraction of new file content into a private staging directory.
//!
//! Every member is copied out and hashed before the live tree is touched,
//! so a corrupt or truncated archive fails here rather than half way
//! through the replace phase.

use super::archive::{PatchArchive, invalid};
use super::error::{ApplyError, io_error};
use super::preflight::PlannedFile;
use log::debug;
use std::fs::File;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Staged content for one planned file.
#[derive(Debug)]
pub(crate) struct StagedFile {
    pub(crate) path: PathBuf,
    pub(crate) unix_mode: Option<u32>,
}

/// The staging directory and its files, in plan order. Removed on drop.
#[derive(Debug)]
pub(crate) struct StagingArea {
    _dir: TempDir,
    pub(crate) files: Vec<StagedFile>,
}

/// Extract the content of every planned file and verify it.
pub(crate) fn stage(
    archive: &mut PatchArchive,
    files: &[PlannedFile<'_>],
) -> Result<StagingArea, ApplyError> {
    let dir = tempfile::Builder::new()
        .prefix("treepatch-staging-")
        .tempdir()
        .map_err(io_error("failed to create staging directory"))?;

    let mut staged = Vec::with_capacity(files.len());
    for (index, file) in files.iter().enumerate() {
        let path = dir.path().join(format!("{index:06}"));
        staged.push(stage_one(archive, file, &path)?);
    }
    debug!("staged {} files in {}", staged.len(), dir.path().display());
    Ok(StagingArea {
        _dir: dir,
        files: staged,
    })
}

fn stage_one(
    archive: &mut PatchArchive,
    file: &PlannedFile<'_>,
    path: &Path,
) -> Result<StagedFile, ApplyError> {
    let mut out = File::create(path).map_err(io_error(format!(
        "failed to create staging file for \"{}\"",
        file.path
    )))?;
    let member = archive.extract(file.entry, &mut out)?;
    out.sync_all()
        .map_err(io_error(format!("failed to flush staged \"{}\"", file.path)))?;

    if member.digest != file.entry.new_hash {
        return Err(invalid(
            archive.path(),
            format!(
                "member \"{}\" does not match its manifest digest (expected {}, found {})",
                file.path, file.entry.new_hash, member.digest
            ),
        ));
    }
    Ok(StagedFile {
        path: path.to_path_buf(),
        unix_mode: member.unix_mode,
    })
}
