//! Configuration change detection by content hash.

use crate::{CaptureError, CoreResult};

use std::{fmt, fs, panic::Location, path::Path};

use error_location::ErrorLocation;
use sha2::{Digest, Sha256};

/// Opaque SHA-256 digest of a configuration file's bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigFingerprint([u8; 32]);

impl ConfigFingerprint {
    /// Fingerprint raw configuration bytes.
    pub fn of_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }
}

impl fmt::Display for ConfigFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First 8 bytes are plenty to tell edits apart in logs.
        for byte in &self.0[..8] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Read `path` and fingerprint its contents.
///
/// # Errors
///
/// Returns [`CaptureError::ConfigRead`] if the file cannot be read.
#[track_caller]
pub fn fingerprint<P: AsRef<Path>>(path: P) -> CoreResult<ConfigFingerprint> {
    let path = path.as_ref();
    let data = fs::read(path).map_err(|source| CaptureError::ConfigRead {
        path: path.to_path_buf(),
        source,
        location: ErrorLocation::from(Location::caller()),
    })?;
    Ok(ConfigFingerprint::of_bytes(&data))
}

/// True when the two fingerprints differ.
pub fn changed(a: &ConfigFingerprint, b: &ConfigFingerprint) -> bool {
    a != b
}
