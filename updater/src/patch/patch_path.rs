//! Relative path newtype for manifest entries.
//!
//! Manifest paths are POSIX-style (`/` separated), relative, and free of
//! any segment that could make them resolve outside the tree they are
//! joined onto. The same rules apply when packaging and when applying, and
//! mirror the zip-slip guard used for archive extraction.

use super::error::{PatchError, Result};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// A validated relative path inside an installed tree.
///
/// # Examples
///
/// ```
/// use treepatch_updater::patch::patch_path::PatchPath;
///
/// let path = PatchPath::parse("plugins/extra.dll").expect("safe path");
/// assert_eq!(path.as_str(), "plugins/extra.dll");
/// assert!(PatchPath::parse("../../evil").is_err());
/// assert!(PatchPath::parse("C:\\evil").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatchPath(String);

impl PatchPath {
    /// Validate a manifest path string.
    ///
    /// # Errors
    ///
    /// Returns [`PatchError::UnsafePath`] when the path is empty, absolute,
    /// carries a drive prefix, backslash, or colon, names a DOS device
    /// (`CON`, `NUL`, `COM1`, and so on), contains `..`, `.`, or empty
    /// segments, or contains a NUL byte.
    pub fn parse(value: &str) -> Result<Self> {
        validate_patch_path(value)?;
        Ok(Self(value.to_owned()))
    }

    /// Build a patch path from a path relative to a scanned root.
    ///
    /// Returns `None` when `relative` is empty, contains anything other
    /// than normal components, or is not valid UTF-8.
    #[must_use]
    pub fn from_relative(relative: &Path) -> Option<Self> {
        let mut segments = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(segment) => segments.push(segment.to_str()?),
                _ => return None,
            }
        }
        if segments.is_empty() {
            return None;
        }
        Self::parse(&segments.join("/")).ok()
    }

    /// Return the path as written in the manifest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve this path beneath `root` using native separators.
    #[must_use]
    pub fn resolve_under(&self, root: &Path) -> PathBuf {
        self.0
            .split('/')
            .fold(root.to_path_buf(), |path, segment| path.join(segment))
    }
}

impl AsRef<str> for PatchPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validate that `value` cannot escape the root it is resolved under.
fn validate_patch_path(value: &str) -> Result<()> {
    let reject = |reason: &str| {
        Err(PatchError::UnsafePath {
            path: value.to_owned(),
            reason: reason.to_owned(),
        })
    };

    if value.is_empty() {
        return reject("path is empty");
    }
    if value.contains('\0') {
        return reject("path contains a NUL byte");
    }
    if value.contains('\\') {
        return reject("path contains a backslash");
    }
    if value.starts_with('/') {
        return reject("path is absolute");
    }
    for segment in value.split('/') {
        match segment {
            ".." => return reject("path contains a parent-directory segment"),
            "." | "" => return reject("path is not normalised"),
            // Windows reads `C:x` in any segment as a drive-relative path
            // that replaces everything joined before it.
            _ if segment.contains(':') => return reject("path carries a drive prefix"),
            _ if is_reserved_device_name(segment) => {
                return reject("path names a reserved device");
            }
            _ => {}
        }
    }
    Ok(())
}

/// Return true for DOS device names, which Windows resolves outside the tree
/// whatever directory they are joined onto.
fn is_reserved_device_name(segment: &str) -> bool {
    const DEVICES: [&str; 4] = ["CON", "PRN", "AUX", "NUL"];
    let stem = segment
        .split('.')
        .next()
        .unwrap_or(segment)
        .trim_end_matches(' ');
    if DEVICES.iter().any(|device| stem.eq_ignore_ascii_case(device)) {
        return true;
    }
    let upper = stem.to_ascii_uppercase();
    ["COM", "LPT"].iter().any(|prefix| {
        upper
            .strip_prefix(prefix)
            .is_some_and(|digit| matches!(digit.as_bytes(), [b'1'..=b'9']))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::plain("app.exe")]
    #[case::nested("lib/plugins/extra.dll")]
    #[case::dotted_name("config/.hidden")]
    #[case::double_dot_in_name("notes..txt")]
    #[case::device_lookalike("console.log")]
    #[case::com_without_digit("com.dll")]
    fn accepts_normal_paths(#[case] value: &str) {
        let path = PatchPath::parse(value).expect("safe path");
        assert_eq!(path.as_str(), value);
    }

    #[rstest]
    #[case::parent_dir("../escape.txt")]
    #[case::nested_parent("foo/../../escape.txt")]
    #[case::absolute("/etc/passwd")]
    #[case::drive_backslash("C:\\evil")]
    #[case::drive_slash("C:/evil")]
    #[case::backslash_traversal("..\\evil")]
    #[case::current_dir("./app.exe")]
    #[case::empty_segment("lib//app.exe")]
    #[case::trailing_slash("lib/")]
    #[case::inner_drive("lib/C:evil")]
    #[case::inner_drive_file("x/D:payload.dll")]
    #[case::alternate_stream("app.exe:hidden")]
    #[case::device("lib/NUL")]
    #[case::device_with_extension("con.txt")]
    #[case::numbered_device("logs/com1.log")]
    #[case::empty("")]
    fn rejects_unsafe_paths(#[case] value: &str) {
        let result = PatchPath::parse(value);
        assert!(
            matches!(result, Err(PatchError::UnsafePath { .. })),
            "expected UnsafePath for {value}"
        );
    }

    #[test]
    fn from_relative_uses_forward_slashes() {
        let relative = Path::new("lib").join("plugins").join("a.dll");
        let path = PatchPath::from_relative(&relative).expect("normal components");
        assert_eq!(path.as_str(), "lib/plugins/a.dll");
    }

    #[test]
    fn from_relative_rejects_empty_path() {
        assert!(PatchPath::from_relative(Path::new("")).is_none());
    }

    #[test]
    fn resolve_under_joins_each_segment() {
        let path = PatchPath::parse("lib/a.dll").expect("safe");
        let root = Path::new("install");
        assert_eq!(
            path.resolve_under(root),
            root.join("lib").join("a.dll")
        );
    }
}
