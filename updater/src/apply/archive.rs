//! Opening a patch archive and reading its manifest.

use super::error::{ApplyError, io_error};
use crate::patch::hasher::HashingReader;
use crate::patch::manifest::{FileEntry, MANIFEST_MEMBER, Manifest};
use crate::patch::manifest_codec::decode;
use crate::patch::sha256_digest::Sha256Digest;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use zip::ZipArchive;
use zip::result::ZipError;

const COPY_BUFFER: usize = 64 * 1024;

/// An opened patch archive with its decoded manifest.
pub(crate) struct PatchArchive {
    path: PathBuf,
    zip: ZipArchive<File>,
    manifest: Manifest,
}

/// Content of one archive member after it has been copied out.
pub(crate) struct ExtractedMember {
    pub(crate) digest: Sha256Digest,
    pub(crate) unix_mode: Option<u32>,
}

impl PatchArchive {
    /// Open `path` and decode its embedded manifest.
    pub(crate) fn open(path: &Path) -> Result<Self, ApplyError> {
        let file = File::open(path).map_err(io_error(format!(
            "failed to open patch archive {}",
            path.display()
        )))?;
        let mut zip = ZipArchive::new(file).map_err(|err| invalid(path, err.to_string()))?;

        let mut bytes = Vec::new();
        match zip.by_name(MANIFEST_MEMBER) {
            Ok(mut member) => member
                .read_to_end(&mut bytes)
                .map_err(|err| invalid(path, format!("unreadable {MANIFEST_MEMBER}: {err}")))?,
            Err(ZipError::FileNotFound) => {
                return Err(invalid(path, format!("{MANIFEST_MEMBER} is missing")));
            }
            Err(err) => return Err(invalid(path, err.to_string())),
        };
        let manifest = decode(&bytes).map_err(|err| invalid(path, err.to_string()))?;

        Ok(Self {
            path: path.to_path_buf(),
            zip,
            manifest,
        })
    }

    pub(crate) fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Copy the member for `entry` into `dest`, hashing it on the way.
    ///
    /// Failures reading the member are reported as
    /// [`ApplyError::InvalidArchive`]; failures writing `dest` as
    /// [`ApplyError::Io`].
    pub(crate) fn extract(
        &mut self,
        entry: &FileEntry,
        dest: &mut dyn Write,
    ) -> Result<ExtractedMember, ApplyError> {
        let archive = self.path.clone();
        let member = match self.zip.by_name(&entry.path) {
            Ok(member) => member,
            Err(ZipError::FileNotFound) => {
                return Err(invalid(&archive, format!("member \"{}\" is missing", entry.path)));
            }
            Err(err) => return Err(invalid(&archive, err.to_string())),
        };
        let unix_mode = member.unix_mode();
        let mut reader = HashingReader::new(member);
        copy_member(&mut reader, dest).map_err(|failure| match failure {
            CopyFailure::Read(err) => invalid(
                &archive,
                format!("member \"{}\" is unreadable: {err}", entry.path),
            ),
            CopyFailure::Write(err) => ApplyError::Io {
                context: format!("failed to stage \"{}\"", entry.path),
                source: err,
            },
        })?;
        let (_, digest, _) = reader.finish();
        Ok(ExtractedMember { digest, unix_mode })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

enum CopyFailure {
    Read(io::Error),
    Write(io::Error),
}

fn copy_member(reader: &mut dyn Read, writer: &mut dyn Write) -> Result<(), CopyFailure> {
    let mut buffer = vec![0u8; COPY_BUFFER];
    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(CopyFailure::Read(err)),
        };
        writer.write_all(&buffer[..n]).map_err(CopyFailure::Write)?;
    }
    writer.flush().map_err(CopyFailure::Write)
}

pub(crate) fn invalid(archive: &Path, reason: impl Into<String>) -> ApplyError {
    ApplyError::InvalidArchive {
        archive: archive.to_path_buf(),
        reason: reason.into(),
    }
}
