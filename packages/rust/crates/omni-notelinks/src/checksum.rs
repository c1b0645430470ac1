//! Content checksums used to detect edits made outside the tool.

use sha2::{Digest, Sha256};
use std::path::Path;

/// Hex sha256 of `content`.
#[must_use]
pub fn sha256_hex(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Hex sha256 of the file at `path`.
///
/// # Errors
///
/// Propagates the read error.
pub fn sha256_file(path: &Path) -> std::io::Result<String> {
    std::fs::read(path).map(|content| sha256_hex(&content))
}
