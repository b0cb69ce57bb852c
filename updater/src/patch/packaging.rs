//! Patch archive creation.
//!
//! Turns a [`ChangeSet`] into a zip archive holding `manifest.json` as its
//! first member followed by one deflate-compressed member per changed file,
//! named by its manifest path. The archive is assembled in a temporary file
//! beside the destination and renamed into place only once it is complete,
//! so a failed run never leaves a partial archive behind.

use super::differ::ChangeSet;
use super::hasher::{HashingReader, hash_file};
use super::manifest::{FileEntry, MANIFEST_MEMBER, Manifest, PatchMetadata};
use super::manifest_codec::{encode, validate};
use super::packaging_error::PackagingError;
use super::patch_path::PatchPath;
use super::sha256_digest::Sha256Digest;
use log::{debug, info};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Output produced by [`package`].
#[derive(Debug)]
pub struct PackageOutput {
    /// Path to the created archive.
    pub archive_path: PathBuf,
    /// The manifest embedded in the archive.
    pub manifest: Manifest,
    /// SHA-256 of the whole archive, for the update descriptor.
    pub sha256: Sha256Digest,
}

/// A validated file entry paired with its content on disk.
struct SourceFile<'a> {
    entry: &'a FileEntry,
    path: PathBuf,
}

/// Package `change_set` into a patch archive at `out_archive`.
///
/// Every file entry is read from `source_root` (normally the new tree the
/// change set was computed from). Missing parent directories of
/// `out_archive` are created. An existing file at `out_archive` is replaced
/// atomically.
///
/// # Errors
///
/// Returns [`PackagingError::Format`] when a path repeats or appears in
/// both `files` and `deletes`, [`PackagingError::UnsafePath`] when any
/// entry path is not a safe relative path, and
/// [`PackagingError::MissingSourceFile`] when a source file is absent; all
/// three are detected before any output is created.
/// Returns [`PackagingError::SourceChanged`] when a source file no longer
/// matches the digest in the change set, and [`PackagingError::Io`] or
/// [`PackagingError::Archive`] on write failures.
///
/// # Examples
///
/// ```
/// use treepatch_updater::patch::differ::diff;
/// use treepatch_updater::patch::manifest::{CreatedUtc, PatchMetadata, PatchSource};
/// use treepatch_updater::patch::packaging::package;
///
/// let dir = tempfile::tempdir().expect("temp dir");
/// let new = dir.path().join("new");
/// std::fs::create_dir_all(&new).expect("mkdir");
/// std::fs::write(new.join("app.exe"), b"v1").expect("write");
///
/// let change_set = diff(None, &new).expect("diff");
/// let metadata = PatchMetadata {
///     from_version: String::new(),
///     to_version: "1.0.0".to_owned(),
///     created_utc: CreatedUtc::new("2026-02-03T00:00:00Z"),
///     source: PatchSource::default(),
/// };
/// let out = dir.path().join("dist/patch.zip");
/// let output = package(change_set, metadata, &new, &out).expect("package");
/// assert_eq!(output.manifest.files().len(), 1);
/// assert!(out.is_file());
/// ```
pub fn package(
    change_set: ChangeSet,
    metadata: PatchMetadata,
    source_root: &Path,
    out_archive: &Path,
) -> Result<PackageOutput, PackagingError> {
    let manifest = Manifest::new(metadata, change_set);
    validate(&manifest)?;
    validate_delete_paths(&manifest)?;
    let sources = resolve_sources(&manifest, source_root)?;
    let manifest_json = encode(&manifest)?;

    let parent = archive_parent(out_archive);
    fs::create_dir_all(parent)?;
    let mut temp = tempfile::Builder::new()
        .prefix(".treepatch-")
        .suffix(".zip.tmp")
        .tempfile_in(parent)?;

    write_archive(temp.as_file_mut(), &manifest_json, &sources)?;
    temp.as_file().sync_all()?;
    let sha256 = hash_file(temp.path())?;
    temp.persist(out_archive).map_err(|err| err.error)?;

    info!(
        "packaged {} files and {} deletions into {} ({sha256})",
        manifest.files().len(),
        manifest.deletes().len(),
        out_archive.display()
    );
    Ok(PackageOutput {
        archive_path: out_archive.to_path_buf(),
        manifest,
        sha256,
    })
}

fn validate_delete_paths(manifest: &Manifest) -> Result<(), PackagingError> {
    for entry in manifest.deletes() {
        PatchPath::parse(&entry.path)?;
    }
    Ok(())
}

/// Validate every file entry path and confirm its source exists.
fn resolve_sources<'a>(
    manifest: &'a Manifest,
    source_root: &Path,
) -> Result<Vec<SourceFile<'a>>, PackagingError> {
    manifest
        .files()
        .iter()
        .map(|entry| {
            let path = PatchPath::parse(&entry.path)?.resolve_under(source_root);
            if !path.is_file() {
                return Err(PackagingError::MissingSourceFile {
                    path: entry.path.clone(),
                    source_path: path,
                });
            }
            Ok(SourceFile { entry, path })
        })
        .collect()
}

fn archive_parent(out_archive: &Path) -> &Path {
    match out_archive.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Write the manifest and every source file into a zip on `file`.
fn write_archive(
    file: &mut File,
    manifest_json: &[u8],
    sources: &[SourceFile<'_>],
) -> Result<(), PackagingError> {
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file(MANIFEST_MEMBER, options)?;
    zip.write_all(manifest_json)?;

    for source in sources {
        let metadata = fs::metadata(&source.path)?;
        let member_options = member_options(options, &metadata);
        zip.start_file(source.entry.path.as_str(), member_options)?;

        let mut reader = HashingReader::new(File::open(&source.path)?);
        io::copy(&mut reader, &mut zip)?;
        let (_, actual, _) = reader.finish();
        if actual != source.entry.new_hash {
            return Err(PackagingError::SourceChanged {
                path: source.entry.path.clone(),
                expected: source.entry.new_hash.clone(),
                actual,
            });
        }
        debug!("added {} to archive", source.entry.path);
    }

    zip.finish()?;
    Ok(())
}

/// Carry the source file's permissions and size class into its member.
fn member_options(options: SimpleFileOptions, metadata: &fs::Metadata) -> SimpleFileOptions {
    let options = options.large_file(metadata.len() >= u64::from(u32::MAX));
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        options.unix_permissions(metadata.permissions().mode())
    }
    #[cfg(not(unix))]
    {
        options
    }
}

#[cfg(test)]
#[path = "packaging_tests.rs"]
mod tests;
