//! Per-file atomic replacement and deletion in the live tree.
//!
//! New content is written to a temporary file in the destination's own
//! directory, flushed to disk, and renamed over the destination. A reader
//! therefore sees either the old bytes or the complete new bytes, never a
//! mix.

use log::debug;
use std::fs::{self, File};
use std::io;
use std::path::Path;

/// Replace `dest` with the content of `staged`.
///
/// When `unix_mode` is given it is applied to the new file; otherwise an
/// existing destination's permissions are carried over.
pub(crate) fn atomic_replace(staged: &Path, dest: &Path, unix_mode: Option<u32>) -> io::Result<()> {
    let parent = dest.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no parent directory", dest.display()),
        )
    })?;
    fs::create_dir_all(parent)?;

    let mut source = File::open(staged)?;
    let mut temp = tempfile::Builder::new()
        .prefix(".treepatch-")
        .suffix(".tmp")
        .tempfile_in(parent)?;
    io::copy(&mut source, temp.as_file_mut())?;
    temp.as_file().sync_all()?;
    apply_permissions(temp.path(), dest, unix_mode)?;

    temp.persist(dest).map_err(|err| err.error)?;
    debug!("replaced {}", dest.display());
    Ok(())
}

/// Remove `dest`, then prune directories it leaves empty up to, but not
/// including, `root`. A missing `dest` is not an error.
///
/// Returns whether a file was removed.
pub(crate) fn remove_and_prune(dest: &Path, root: &Path) -> io::Result<bool> {
    match fs::remove_file(dest) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    }
    let mut dir = dest.parent();
    while let Some(current) = dir {
        if current == root || !current.starts_with(root) || !is_empty_dir(current) {
            break;
        }
        if fs::remove_dir(current).is_err() {
            break;
        }
        debug!("pruned empty directory {}", current.display());
        dir = current.parent();
    }
    Ok(true)
}

fn is_empty_dir(dir: &Path) -> bool {
    fs::read_dir(dir).is_ok_and(|mut entries| entries.next().is_none())
}

#[cfg(unix)]
fn apply_permissions(temp: &Path, dest: &Path, unix_mode: Option<u32>) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    match unix_mode {
        Some(mode) => fs::set_permissions(temp, fs::Permissions::from_mode(mode & 0o7777)),
        None => match fs::metadata(dest) {
            Ok(existing) => fs::set_permissions(temp, existing.permissions()),
            Err(_) => Ok(()),
        },
    }
}

#[cfg(not(unix))]
fn apply_permissions(_temp: &Path, _dest: &Path, _unix_mode: Option<u32>) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn temp_dir() -> TempDir {
        TempDir::new().expect("temp dir creation succeeds")
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .expect("read dir")
            .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[rstest]
    fn replaces_existing_file(temp_dir: TempDir) {
        let staged = temp_dir.path().join("staged");
        let live = temp_dir.path().join("live");
        fs::create_dir(&live).expect("mkdir");
        fs::write(&staged, b"v2").expect("write");
        fs::write(live.join("app.exe"), b"v1").expect("write");

        atomic_replace(&staged, &live.join("app.exe"), None).expect("replace");

        assert_eq!(fs::read(live.join("app.exe")).expect("read"), b"v2");
        assert_eq!(entries(&live), ["app.exe"]);
    }

    #[rstest]
    fn creates_missing_parent_directories(temp_dir: TempDir) {
        let staged = temp_dir.path().join("staged");
        fs::write(&staged, b"y").expect("write");
        let dest = temp_dir.path().join("live").join("plugins").join("new.dll");

        atomic_replace(&staged, &dest, None).expect("replace");

        assert_eq!(fs::read(dest).expect("read"), b"y");
    }

    #[cfg(unix)]
    #[rstest]
    fn failed_copy_leaves_destination_and_no_temp_files(temp_dir: TempDir) {
        // A directory opens on unix but fails on read.
        let staged = temp_dir.path().join("staged-dir");
        fs::create_dir(&staged).expect("mkdir");
        let live = temp_dir.path().join("live");
        fs::create_dir(&live).expect("mkdir");
        fs::write(live.join("app.exe"), b"v1").expect("write");

        atomic_replace(&staged, &live.join("app.exe"), None).expect_err("must fail");

        assert_eq!(fs::read(live.join("app.exe")).expect("read"), b"v1");
        assert_eq!(entries(&live), ["app.exe"]);
    }

    #[cfg(unix)]
    #[rstest]
    fn archive_mode_is_applied(temp_dir: TempDir) {
        use std::os::unix::fs::PermissionsExt;

        let staged = temp_dir.path().join("staged");
        fs::write(&staged, b"#!/bin/sh").expect("write");
        let dest = temp_dir.path().join("run.sh");

        atomic_replace(&staged, &dest, Some(0o100_755)).expect("replace");

        let mode = fs::metadata(&dest).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[rstest]
    fn remove_prunes_emptied_directories_but_not_root(temp_dir: TempDir) {
        let root = temp_dir.path().join("live");
        let dest = root.join("a").join("b").join("old.dll");
        fs::create_dir_all(dest.parent().expect("parent")).expect("mkdir");
        fs::write(&dest, b"old").expect("write");

        assert!(remove_and_prune(&dest, &root).expect("remove"));

        assert!(!root.join("a").exists());
        assert!(root.is_dir());
    }

    #[rstest]
    fn remove_keeps_non_empty_directories(temp_dir: TempDir) {
        let root = temp_dir.path().join("live");
        fs::create_dir_all(root.join("lib")).expect("mkdir");
        fs::write(root.join("lib/keep.dll"), b"keep").expect("write");
        fs::write(root.join("lib/old.dll"), b"old").expect("write");

        remove_and_prune(&root.join("lib/old.dll"), &root).expect("remove");

        assert_eq!(entries(&root.join("lib")), ["keep.dll"]);
    }

    #[rstest]
    fn removing_absent_file_is_a_no_op(temp_dir: TempDir) {
        let removed = remove_and_prune(&temp_dir.path().join("gone"), temp_dir.path()).expect("no-op");
        assert!(!removed);
    }
}
