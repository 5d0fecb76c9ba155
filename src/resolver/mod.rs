//! Module resolution
//!
//! Handles resolving import specifiers to actual file paths, including bare
//! specifiers that live in `node_modules`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::bundler::ModuleType;

/// Regex patterns for extracting imports
static IMPORT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:import|export)\s+(?:(?:\{[^}]*\}|\*\s+as\s+\w+|\w+(?:\s*,\s*\{[^}]*\})?)\s+from\s+)?["']([^"']+)["']|require\s*\(\s*["']([^"']+)["']\s*\)"#).unwrap()
});

static DYNAMIC_IMPORT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"import\s*\(\s*["']([^"']+)["']\s*\)"#).unwrap()
});

/// File extensions probed when a specifier omits one
const EXTENSIONS: [&str; 8] = ["js", "mjs", "cjs", "ts", "jsx", "tsx", "json", "css"];

/// Module resolver
#[derive(Debug, Default)]
pub struct Resolver;

impl Resolver {
    pub fn new() -> Self {
        Self
    }

    /// Extract import/require dependencies from source code
    pub fn extract_dependencies(&self, source: &str, module_type: &ModuleType) -> Vec<String> {
        if !module_type.is_js_like() {
            return Vec::new();
        }

        let mut dependencies = Vec::new();

        let static_specs = IMPORT_REGEX
            .captures_iter(source)
            .filter_map(|cap| cap.get(1).or_else(|| cap.get(2)));
        let dynamic_specs = DYNAMIC_IMPORT_REGEX
            .captures_iter(source)
            .filter_map(|cap| cap.get(1));

        for specifier in static_specs.chain(dynamic_specs) {
            let spec = specifier.as_str().to_string();
            if !dependencies.contains(&spec) {
                dependencies.push(spec);
            }
        }

        debug!("Found {} dependencies", dependencies.len());

        dependencies
    }

    /// Resolve an import specifier to an absolute file path.
    ///
    /// Returns `Ok(None)` for specifiers that cannot be found; those are left
    /// to the runtime as externals.
    pub fn resolve(&self, specifier: &str, from: &Path) -> Result<Option<PathBuf>> {
        let base_dir = from.parent().unwrap_or(Path::new("."));

        let resolved = if specifier.starts_with('.') || specifier.starts_with('/') {
            self.resolve_relative(specifier, base_dir)
        } else {
            self.resolve_bare(specifier, base_dir)?
        };

        match &resolved {
            Some(path) => debug!("Resolved '{}' to {}", specifier, path.display()),
            None => debug!("Leaving '{}' unresolved (from {})", specifier, from.display()),
        }

        Ok(resolved)
    }

    /// Resolve a relative import
    fn resolve_relative(&self, specifier: &str, base_dir: &Path) -> Option<PathBuf> {
        let target = base_dir.join(specifier);

        if target.is_file() {
            return Some(target);
        }

        // `./button` -> `./button.js`, keeping any dots already in the name
        for ext in EXTENSIONS {
            let mut with_ext = target.clone().into_os_string();
            with_ext.push(".");
            with_ext.push(ext);
            let with_ext = PathBuf::from(with_ext);
            if with_ext.is_file() {
                return Some(with_ext);
            }
        }

        if target.is_dir() {
            for ext in EXTENSIONS {
                let index = target.join(format!("index.{}", ext));
                if index.is_file() {
                    return Some(index);
                }
            }
        }

        None
    }

    /// Resolve a bare import by walking up to the nearest `node_modules`
    fn resolve_bare(&self, specifier: &str, from_dir: &Path) -> Result<Option<PathBuf>> {
        let mut current = from_dir.to_path_buf();

        loop {
            let node_modules = current.join("node_modules");

            if node_modules.is_dir() {
                if let Some(resolved) = self.resolve_in_node_modules(&node_modules, specifier)? {
                    return Ok(Some(resolved));
                }
            }

            if !current.pop() {
                break;
            }
        }

        Ok(None)
    }

    /// Resolve a module within a node_modules directory
    fn resolve_in_node_modules(
        &self,
        node_modules: &Path,
        specifier: &str,
    ) -> Result<Option<PathBuf>> {
        let (package_name, subpath) = split_package_specifier(specifier);
        let Some(package_name) = package_name else {
            return Ok(None);
        };

        let package_dir = node_modules.join(package_name);

        if !package_dir.is_dir() {
            return Ok(None);
        }

        if let Some(sub) = subpath {
            return Ok(self.resolve_relative(sub, &package_dir));
        }

        let package_json = package_dir.join("package.json");

        if package_json.is_file() {
            let content = fs::read_to_string(&package_json)
                .with_context(|| format!("Failed to read {}", package_json.display()))?;
            let pkg: serde_json::Value = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", package_json.display()))?;

            // Modules run inside CommonJS factories, so `module` is only a fallback
            for field in ["main", "module"] {
                if let Some(entry) = pkg.get(field).and_then(|v| v.as_str()) {
                    if let Some(resolved) = self.resolve_relative(entry, &package_dir) {
                        return Ok(Some(resolved));
                    }
                }
            }
        }

        Ok(self.resolve_relative("index.js", &package_dir))
    }
}

/// Split `@scope/name/sub/path` or `name/sub/path` into package name and subpath
fn split_package_specifier(specifier: &str) -> (Option<&str>, Option<&str>) {
    let name_len = if specifier.starts_with('@') {
        match specifier.match_indices('/').nth(1) {
            Some((idx, _)) => idx,
            None if specifier.contains('/') => specifier.len(),
            None => return (None, None),
        }
    } else {
        specifier.find('/').unwrap_or(specifier.len())
    };

    let name = &specifier[..name_len];
    let subpath = specifier
        .get(name_len + 1..)
        .filter(|sub| !sub.is_empty());

    (Some(name), subpath)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_imports() {
        let source = r#"
            import foo from './foo';
            import { bar } from './bar.js';
            import * as baz from '../baz';
            import React, { useState } from 'react';
            export { qux } from './qux';
            import 'mdui/mdui.css';
            const x = require('./x');
        "#;

        let deps = Resolver::new().extract_dependencies(source, &ModuleType::JavaScript);

        assert!(deps.contains(&"./foo".to_string()));
        assert!(deps.contains(&"./bar.js".to_string()));
        assert!(deps.contains(&"../baz".to_string()));
        assert!(deps.contains(&"react".to_string()));
        assert!(deps.contains(&"./qux".to_string()));
        assert!(deps.contains(&"mdui/mdui.css".to_string()));
        assert!(deps.contains(&"./x".to_string()));
    }

    #[test]
    fn test_extract_dynamic_imports() {
        let source = r#"
            const module = import('./dynamic');
            const other = import("./other");
        "#;

        let deps = Resolver::new().extract_dependencies(source, &ModuleType::JavaScript);

        assert!(deps.contains(&"./dynamic".to_string()));
        assert!(deps.contains(&"./other".to_string()));
    }

    #[test]
    fn test_css_has_no_dependencies() {
        let deps = Resolver::new().extract_dependencies("@import './x.css';", &ModuleType::Css);
        assert!(deps.is_empty());
    }

    #[test]
    fn test_split_package_specifier() {
        assert_eq!(split_package_specifier("mdui"), (Some("mdui"), None));
        assert_eq!(
            split_package_specifier("mdui/mdui.css"),
            (Some("mdui"), Some("mdui.css"))
        );
        assert_eq!(
            split_package_specifier("@mdui/icons/home.js"),
            (Some("@mdui/icons"), Some("home.js"))
        );
        assert_eq!(split_package_specifier("@mdui/icons"), (Some("@mdui/icons"), None));
        assert_eq!(split_package_specifier("@mdui"), (None, None));
    }

    #[test]
    fn test_resolve_bare_and_relative() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let src = root.join("src");
        let mdui = root.join("node_modules/mdui");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(mdui.join("dist")).unwrap();
        fs::write(src.join("main.js"), "").unwrap();
        fs::write(src.join("app.component.js"), "").unwrap();
        fs::write(mdui.join("package.json"), r#"{"module": "dist/mdui.esm.js"}"#).unwrap();
        fs::write(mdui.join("dist/mdui.esm.js"), "").unwrap();
        fs::write(mdui.join("mdui.css"), "").unwrap();

        let resolver = Resolver::new();
        let from = src.join("main.js");

        assert_eq!(
            resolver.resolve("mdui", &from).unwrap(),
            Some(mdui.join("dist/mdui.esm.js"))
        );
        assert_eq!(
            resolver.resolve("mdui/mdui.css", &from).unwrap(),
            Some(mdui.join("mdui.css"))
        );
        assert_eq!(
            resolver.resolve("./app.component", &from).unwrap(),
            Some(src.join("./app.component.js"))
        );
        assert_eq!(resolver.resolve("left-pad", &from).unwrap(), None);
    }

    #[test]
    fn test_main_takes_precedence_over_module() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let mdui = root.join("node_modules/mdui");
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(&mdui).unwrap();
        fs::write(root.join("src/main.js"), "").unwrap();
        fs::write(
            mdui.join("package.json"),
            r#"{"main": "mdui.cjs.js", "module": "mdui.esm.js"}"#,
        )
        .unwrap();
        fs::write(mdui.join("mdui.cjs.js"), "module.exports = 1;").unwrap();
        fs::write(mdui.join("mdui.esm.js"), "export default 1;").unwrap();

        let resolver = Resolver::new();
        let from = root.join("src/main.js");
        assert_eq!(
            resolver.resolve("mdui", &from).unwrap(),
            Some(mdui.join("mdui.cjs.js"))
        );

        // A `main` that points nowhere falls back to `module`
        fs::remove_file(mdui.join("mdui.cjs.js")).unwrap();
        assert_eq!(
            resolver.resolve("mdui", &from).unwrap(),
            Some(mdui.join("mdui.esm.js"))
        );
    }
}
