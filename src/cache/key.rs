//! Cache key derivation
//!
//! A key is the FNV-1a 32-bit hash of the command text followed by the
//! working directory, rendered as 8 lowercase hex digits. The hash state
//! carries over from the command into the directory, so this is one hash
//! over `command || cwd`.

use std::fmt;
use std::path::Path;

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// Fingerprint of a (command, working directory) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key as its 8-hex-digit string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the committed entry (`<key>.txt`)
    pub fn entry_file_name(&self) -> String {
        format!("{}.txt", self.0)
    }

    /// File name of the in-progress write (`<key>.txt.wip`)
    pub fn wip_file_name(&self) -> String {
        format!("{}.txt.wip", self.0)
    }

    /// File name of the per-key writer lock (`<key>.txt.lock`)
    pub fn lock_file_name(&self) -> String {
        format!("{}.txt.lock", self.0)
    }

    /// Parse a key back out of an entry file name such as `0a1b2c3d.txt`
    pub fn from_entry_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(".txt")?;
        let valid = stem.len() == 8
            && stem
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| Self(stem.to_string()))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// Fold `bytes` into an FNV-1a 32-bit hash state
pub fn fnv1a(bytes: &[u8], mut hash: u32) -> u32 {
    for &b in bytes {
        hash ^= u32::from(b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Derive the cache key for `command` run inside `cwd`.
///
/// No normalization is applied: `/tmp` and `/tmp/` give different keys.
/// An empty `cwd` is allowed and is what callers pass when the working
/// directory could not be determined.
pub fn fingerprint(command: &str, cwd: &Path) -> CacheKey {
    let hash = fnv1a(command.as_bytes(), FNV_OFFSET_BASIS);
    let hash = fnv1a(&path_bytes(cwd), hash);
    CacheKey(format!("{:08x}", hash))
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> std::borrow::Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    std::borrow::Cow::Borrowed(path.as_os_str().as_bytes())
}

#[cfg(not(unix))]
fn path_bytes(path: &Path) -> std::borrow::Cow<'_, [u8]> {
    match path.to_string_lossy() {
        std::borrow::Cow::Borrowed(s) => std::borrow::Cow::Borrowed(s.as_bytes()),
        std::borrow::Cow::Owned(s) => std::borrow::Cow::Owned(s.into_bytes()),
    }
}
