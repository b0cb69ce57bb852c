//! Streaming SHA-256 computation.
//!
//! Files are read through a fixed 1 MiB buffer so hashing never holds a
//! whole file in memory. [`HashingReader`] lets callers hash content while
//! copying it elsewhere, which the packager and the apply staging step use
//! to avoid a second pass over each file.

use super::sha256_digest::Sha256Digest;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Read buffer size for file hashing.
const BUFFER_SIZE: usize = 1024 * 1024;

/// Compute the SHA-256 digest of the file at `path`.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be opened or a read fails part
/// way through. No partial digest is ever returned.
///
/// # Examples
///
/// ```
/// use treepatch_updater::patch::hasher::hash_file;
///
/// let dir = tempfile::tempdir().expect("temp dir");
/// let path = dir.path().join("empty.bin");
/// std::fs::write(&path, b"").expect("write");
/// let digest = hash_file(&path).expect("hash");
/// assert!(digest.as_str().starts_with("e3b0c442"));
/// ```
pub fn hash_file(path: &Path) -> io::Result<Sha256Digest> {
    let mut file = File::open(path)?;
    hash_reader(&mut file)
}

/// Compute the SHA-256 digest of everything `reader` yields.
///
/// # Errors
///
/// Returns the first non-interrupt I/O error raised by `reader`.
pub fn hash_reader<R: Read + ?Sized>(reader: &mut R) -> io::Result<Sha256Digest> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];
    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(Sha256Digest::from_hasher(hasher))
}

/// Compute the SHA-256 digest of an in-memory byte slice.
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> Sha256Digest {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    Sha256Digest::from_hasher(hasher)
}

/// A reader adapter that hashes every byte passing through it.
///
/// # Examples
///
/// ```
/// use std::io::Read;
/// use treepatch_updater::patch::hasher::{HashingReader, hash_bytes};
///
/// let mut reader = HashingReader::new(&b"payload"[..]);
/// let mut sink = Vec::new();
/// reader.read_to_end(&mut sink).expect("read");
/// let (_, digest, len) = reader.finish();
/// assert_eq!(digest, hash_bytes(b"payload"));
/// assert_eq!(len, 7);
/// ```
pub struct HashingReader<R> {
    inner: R,
    hasher: Sha256,
    bytes_read: u64,
}

impl<R: Read> HashingReader<R> {
    /// Wrap `inner` with a fresh SHA-256 accumulator.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            bytes_read: 0,
        }
    }

    /// Return the inner reader, the digest, and the number of bytes read.
    pub fn finish(self) -> (R, Sha256Digest, u64) {
        (
            self.inner,
            Sha256Digest::from_hasher(self.hasher),
            self.bytes_read,
        )
    }
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        self.bytes_read = self.bytes_read.saturating_add(n as u64);
        Ok(n)
    }
}
