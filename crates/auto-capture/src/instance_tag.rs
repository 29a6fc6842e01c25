//! Stable per-installation tag embedded in recording metadata.

use std::path::Path;

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// 32-bit FNV-1a hash.
pub(crate) fn fnv1a32(data: &str) -> u32 {
    data.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Derive `<app>-<serial>-<home>` as three 8-digit hex hashes.
///
/// `serial` is `None` when the device is auto-selected. `home` is made
/// absolute first so relative and absolute spellings agree.
pub(crate) fn derive_instance_tag(app_name: &str, serial: Option<&str>, home: &Path) -> String {
    let home = std::path::absolute(home).unwrap_or_else(|_| home.to_path_buf());
    format!(
        "{:08x}-{:08x}-{:08x}",
        fnv1a32(app_name),
        fnv1a32(serial.unwrap_or("auto")),
        fnv1a32(&home.to_string_lossy())
    )
}
