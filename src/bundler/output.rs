//! Output directory handling

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::BuildError;
use crate::utils::is_within;

/// Create `out_dir` and, when allowed, remove its previous contents.
///
/// `empty` is the configured `empty_out_dir`. Unset means "empty only when
/// `out_dir` lies inside the project root". A `.git` entry is always kept.
pub fn prepare_out_dir(out_dir: &Path, root: &Path, empty: Option<bool>) -> Result<()> {
    anyhow::ensure!(
        out_dir.is_absolute() && root.is_absolute(),
        "Output directory and project root must be absolute: {} / {}",
        out_dir.display(),
        root.display()
    );

    let resolved_out = resolve_existing(out_dir);
    let resolved_root = resolve_existing(root);
    let inside_root = is_within(&resolved_out, &resolved_root);
    let should_empty = empty.unwrap_or(inside_root);

    if empty.is_none() && !inside_root {
        warn!(
            "{} is outside the project root and will not be emptied; set build.empty_out_dir = true to clear it",
            out_dir.display()
        );
    }

    if should_empty && is_within(&resolved_root, &resolved_out) {
        return Err(BuildError::UnsafeOutDir {
            out_dir: out_dir.to_path_buf(),
            root: root.to_path_buf(),
        }
        .into());
    }

    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;

    if should_empty {
        empty_dir(out_dir)?;
    }

    Ok(())
}

/// Follow symlinks when the path exists, otherwise keep it as given
fn resolve_existing(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn empty_dir(dir: &Path) -> Result<()> {
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Failed to read output directory: {}", dir.display()))?
    {
        let entry = entry?;
        if entry.file_name() == ".git" {
            continue;
        }

        let path = entry.path();
        let result = if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        result.with_context(|| format!("Failed to remove {}", path.display()))?;
        debug!("Removed {}", path.display());
    }

    Ok(())
}

/// Copy `public_dir` into `out_dir`, returning the number of files copied
pub fn copy_public_dir(public_dir: &Path, out_dir: &Path) -> Result<usize> {
    if !public_dir.is_dir() {
        return Ok(0);
    }

    let mut copied = 0;

    for entry in WalkDir::new(public_dir).min_depth(1) {
        let entry = entry
            .with_context(|| format!("Failed to walk {}", public_dir.display()))?;
        let relative = entry
            .path()
            .strip_prefix(public_dir)
            .context("Walked outside of the public directory")?;
        let target = out_dir.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)
                .with_context(|| format!("Failed to copy {}", entry.path().display()))?;
            copied += 1;
        }
    }

    debug!("Copied {} public file(s)", copied);

    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_out_dir_inside_root_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let out = root.join("dist");
        fs::create_dir_all(out.join("assets")).unwrap();
        fs::write(out.join("assets/stale.js"), "old").unwrap();
        fs::write(out.join("index.html"), "old").unwrap();
        fs::create_dir_all(out.join(".git")).unwrap();

        prepare_out_dir(&out, root, None).unwrap();

        assert!(out.is_dir());
        assert!(!out.join("assets").exists());
        assert!(!out.join("index.html").exists());
        assert!(out.join(".git").exists());
    }

    #[test]
    fn test_outside_root_needs_explicit_opt_in() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("webui");
        let out = dir.path().join("module/webroot");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("stale.js"), "old").unwrap();

        prepare_out_dir(&out, &root, None).unwrap();
        assert!(out.join("stale.js").exists());

        prepare_out_dir(&out, &root, Some(true)).unwrap();
        assert!(!out.join("stale.js").exists());
    }

    #[test]
    fn test_explicit_false_keeps_contents() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("dist");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("keep.txt"), "x").unwrap();

        prepare_out_dir(&out, dir.path(), Some(false)).unwrap();
        assert!(out.join("keep.txt").exists());
    }

    #[test]
    fn test_refuses_to_empty_root_or_ancestor() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("webui");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("webroot.toml"), "").unwrap();

        let err = prepare_out_dir(&root, &root, Some(true)).unwrap_err();
        assert!(err.downcast_ref::<BuildError>().is_some());

        let err = prepare_out_dir(dir.path(), &root, Some(true)).unwrap_err();
        assert!(err.downcast_ref::<BuildError>().is_some());
        assert!(root.join("webroot.toml").exists());
    }

    #[test]
    fn test_copy_public_dir() {
        let dir = tempfile::tempdir().unwrap();
        let public = dir.path().join("public");
        let out = dir.path().join("dist");
        fs::create_dir_all(public.join("icons")).unwrap();
        fs::write(public.join("favicon.ico"), "ico").unwrap();
        fs::write(public.join("icons/app.svg"), "<svg/>").unwrap();

        assert_eq!(copy_public_dir(&public, &out).unwrap(), 2);
        assert_eq!(fs::read_to_string(out.join("icons/app.svg")).unwrap(), "<svg/>");
        assert_eq!(copy_public_dir(&dir.path().join("missing"), &out).unwrap(), 0);
    }
}
