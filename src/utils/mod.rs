//! Utility functions and helpers

use std::path::Path;

use sha2::{Digest, Sha256};

/// Short content hash used in output file names
pub fn hash_content(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let result = hasher.finalize();
    hex::encode(&result[..4])
}

/// Generate an output filename, hashed when `hash` is set
pub fn output_filename(base: &str, content: &[u8], ext: &str, hash: bool) -> String {
    if hash {
        format!("{}.{}.{}", base, hash_content(content), ext)
    } else {
        format!("{}.{}", base, ext)
    }
}

/// Check whether `path` is `base` or lies under it, without touching the filesystem
pub fn is_within(path: &Path, base: &Path) -> bool {
    let path = clean_path(&path_to_module_id(path));
    let base = clean_path(&path_to_module_id(base));
    Path::new(&path).starts_with(Path::new(&base))
}

/// Module identifier of `path` relative to the project root.
///
/// Identifiers are `/`-separated with a leading `/`, e.g. `/src/main.js` or
/// `/node_modules/mdui/mdui.esm.js`. Paths outside the root keep their
/// `..` components so they stay distinct.
pub fn module_id(root: &Path, path: &Path) -> String {
    let relative = pathdiff::diff_paths(path, root).unwrap_or_else(|| path.to_path_buf());
    let id = path_to_module_id(&relative);
    if id.starts_with('/') {
        id
    } else {
        format!("/{}", id)
    }
}

/// Clean a path by removing . and .. components
pub fn clean_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();

    for part in path.split('/') {
        match part {
            "" | "." => continue,
            ".." => {
                parts.pop();
            }
            _ => parts.push(part),
        }
    }

    if path.starts_with('/') {
        format!("/{}", parts.join("/"))
    } else {
        parts.join("/")
    }
}

/// Convert a file path to `/`-separated form
pub fn path_to_module_id(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}

/// Format bytes as human-readable size
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;
    const GB: usize = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format duration as human-readable string
pub fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs_f64();

    if secs >= 60.0 {
        let mins = (secs / 60.0).floor() as u64;
        let remaining_secs = secs - (mins as f64 * 60.0);
        format!("{}m {:.2}s", mins, remaining_secs)
    } else if secs >= 1.0 {
        format!("{:.2}s", secs)
    } else {
        format!("{:.0}ms", secs * 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_content() {
        let hash = hash_content(b"hello world");
        assert_eq!(hash.len(), 8);
        assert_eq!(hash, hash_content(b"hello world"));
        assert_ne!(hash, hash_content(b"hello world!"));
    }

    #[test]
    fn test_output_filename() {
        assert_eq!(output_filename("vendor", b"x", "js", false), "vendor.js");
        let hashed = output_filename("vendor", b"x", "js", true);
        assert!(hashed.starts_with("vendor."));
        assert!(hashed.ends_with(".js"));
        assert_eq!(hashed.len(), "vendor.12345678.js".len());
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path("./foo/bar"), "foo/bar");
        assert_eq!(clean_path("foo/../bar"), "bar");
        assert_eq!(clean_path("/foo/./bar/../baz"), "/foo/baz");
        assert_eq!(clean_path("/app/webui/../module/webroot"), "/app/module/webroot");
    }

    #[test]
    fn test_is_within() {
        assert!(is_within(Path::new("/app/dist"), Path::new("/app")));
        assert!(is_within(Path::new("/app"), Path::new("/app")));
        assert!(!is_within(Path::new("/app/../module/webroot"), Path::new("/app")));
        assert!(!is_within(Path::new("/application"), Path::new("/app")));
    }

    #[test]
    fn test_module_id() {
        let root = Path::new("/work/webui");
        assert_eq!(
            module_id(root, Path::new("/work/webui/src/main.js")),
            "/src/main.js"
        );
        assert_eq!(
            module_id(root, Path::new("/work/webui/node_modules/mdui/mdui.esm.js")),
            "/node_modules/mdui/mdui.esm.js"
        );
        assert_eq!(
            module_id(root, Path::new("/work/shared/util.js")),
            "/../shared/util.js"
        );
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(1048576), "1.00 MB");
    }

    #[test]
    fn test_format_duration() {
        use std::time::Duration;

        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(format_duration(Duration::from_secs_f64(1.5)), "1.50s");
        assert_eq!(format_duration(Duration::from_secs(65)), "1m 5.00s");
    }
}
