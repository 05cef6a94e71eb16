//! Helpers shared by application modules.

/// Page-relative path of `subdir` below the static prefix, e.g. `s/data/covers`.
pub fn asset_dir(static_prefix: &str, subdir: &str) -> String {
    let prefix = static_prefix.trim_matches('/');
    let subdir = subdir.trim_matches('/');

    match (prefix.is_empty(), subdir.is_empty()) {
        (true, _) => subdir.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{}/{}", prefix, subdir),
    }
}
