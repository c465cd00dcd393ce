//! Manifest packaging
//!
//! Collects every directory under a source root that carries a `SKILL.md`
//! manifest and copies it, flattened, into one output directory keyed by the
//! manifest's `name`. The output directory is rebuilt from scratch each time
//! and gets a generated `README.md` index. It may sit inside the source root
//! but never be the root itself or one of its ancestors.
//!
//! Manifest directories are copied as they are; shared reference files are
//! not distributed into other packaged directories.
//!
//! A manifest starts with YAML front matter:
//!
//! ```text
//! ---
//! name: data-engineering-core
//! description: Staged ETL building blocks
//! ---
//! ```

use crate::domain::errors::EtlError;
use crate::domain::result::Result;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File name that marks a packageable directory
pub const MANIFEST_FILE: &str = "SKILL.md";

const SKIPPED_DIRS: &[&str] = &[".git", ".ruff_cache"];

/// A discovered manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub name: String,
    /// Directory containing the manifest file
    pub dir: PathBuf,
}

/// Outcome of a packaging pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageReport {
    pub output_dir: PathBuf,
    /// Packaged names in ascending order
    pub names: Vec<String>,
    pub files_copied: usize,
}

/// Finds manifests under `root`, first occurrence per name
///
/// The walk visits entries sorted by file name and never descends into
/// `.git`, `.ruff_cache`, or `output_dir`. Manifests without front matter,
/// without a `name`, or with unreadable YAML are skipped.
pub fn discover(root: &Path, output_dir: &Path) -> Result<Vec<Manifest>> {
    let front_matter = front_matter_pattern()?;
    let mut seen: BTreeMap<String, PathBuf> = BTreeMap::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            if !entry.file_type().is_dir() {
                return true;
            }
            !SKIPPED_DIRS.contains(&name.as_ref()) && !is_same_path(entry.path(), output_dir)
        });

    for entry in walker.filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() || entry.file_name() != MANIFEST_FILE {
            continue;
        }

        let path = entry.path();
        let content = match fs::read(path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable manifest");
                continue;
            }
        };

        let Some(name) = manifest_name(&front_matter, &content, path) else {
            continue;
        };

        if let Some(dir) = path.parent() {
            seen.entry(name).or_insert_with(|| dir.to_path_buf());
        }
    }

    Ok(seen
        .into_iter()
        .map(|(name, dir)| Manifest { name, dir })
        .collect())
}

/// Rebuilds `output_dir` from the manifests found under `root`
///
/// # Errors
///
/// Returns [`EtlError::Packaging`] if `root` is not a directory, if
/// `output_dir` is `root` or one of its ancestors, or if any filesystem
/// operation fails.
pub fn package(root: impl AsRef<Path>, output_dir: impl AsRef<Path>) -> Result<PackageReport> {
    let root = root.as_ref();
    let output_dir = output_dir.as_ref();

    if !root.is_dir() {
        return Err(EtlError::Packaging(format!(
            "Source root is not a directory: {}",
            root.display()
        )));
    }

    guard_source_tree(root, output_dir)?;
    let manifests = discover(root, output_dir)?;

    if output_dir.exists() {
        fs::remove_dir_all(output_dir).map_err(|e| io_error(output_dir, e))?;
    }
    fs::create_dir_all(output_dir).map_err(|e| io_error(output_dir, e))?;

    let mut files_copied = 0;
    for manifest in &manifests {
        let target = output_dir.join(&manifest.name);
        files_copied += copy_manifest_dir(&manifest.dir, &target, output_dir)?;
        tracing::debug!(
            name = %manifest.name,
            source = %manifest.dir.display(),
            "Packaged manifest"
        );
    }

    let names: Vec<String> = manifests.into_iter().map(|m| m.name).collect();
    let readme = output_dir.join("README.md");
    fs::write(&readme, render_readme(&names)).map_err(|e| io_error(&readme, e))?;

    tracing::info!(
        count = names.len(),
        files_copied,
        output_dir = %output_dir.display(),
        "Packaging complete"
    );

    Ok(PackageReport {
        output_dir: output_dir.to_path_buf(),
        names,
        files_copied,
    })
}

/// Rejects an output directory that is the source root or contains it,
/// since rebuilding it would delete the sources
fn guard_source_tree(root: &Path, output_dir: &Path) -> Result<()> {
    if !output_dir.exists() {
        return Ok(());
    }
    let root = fs::canonicalize(root).map_err(|e| io_error(root, e))?;
    let output = fs::canonicalize(output_dir).map_err(|e| io_error(output_dir, e))?;
    if root.starts_with(&output) {
        return Err(EtlError::Packaging(format!(
            "Output directory {} contains the source root {}",
            output.display(),
            root.display()
        )));
    }
    Ok(())
}

/// Index file listing every packaged name
pub fn render_readme(names: &[String]) -> String {
    let mut out = String::from("# Generated Skills Directory\n\n");
    out.push_str("This directory is auto-generated from source. Do not edit manually.\n\n");
    out.push_str(&format!("## {} Skills\n\n", names.len()));
    for name in names {
        out.push_str(&format!("- `{name}`\n"));
    }
    out
}

fn front_matter_pattern() -> Result<Regex> {
    Regex::new(r"(?s)^---\n(.*?)\n---\n")
        .map_err(|e| EtlError::Packaging(format!("Invalid front matter pattern: {e}")))
}

fn manifest_name(pattern: &Regex, content: &str, path: &Path) -> Option<String> {
    let captures = pattern.captures(content)?;
    let yaml: serde_yaml::Value = match serde_yaml::from_str(&captures[1]) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Skipping manifest with invalid front matter"
            );
            return None;
        }
    };

    let name = yaml.get("name")?.as_str()?.trim();
    if name.is_empty() {
        return None;
    }
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        tracing::warn!(path = %path.display(), name, "Skipping manifest with unsafe name");
        return None;
    }
    Some(name.to_string())
}

/// Copies files and subdirectories, leaving out VCS/cache entries and
/// nested manifest directories
fn copy_manifest_dir(src: &Path, dst: &Path, output_dir: &Path) -> Result<usize> {
    fs::create_dir_all(dst).map_err(|e| io_error(dst, e))?;

    let mut children: Vec<_> = fs::read_dir(src)
        .map_err(|e| io_error(src, e))?
        .filter_map(|e| e.ok())
        .collect();
    children.sort_by_key(|e| e.file_name());

    let mut copied = 0;
    for child in children {
        let name = child.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(".git") || name == ".ruff_cache" {
            continue;
        }

        let path = child.path();
        let target = dst.join(child.file_name());
        if path.is_file() {
            fs::copy(&path, &target).map_err(|e| io_error(&path, e))?;
            copied += 1;
        } else if path.is_dir() {
            if is_same_path(&path, output_dir) || contains_manifest(&path) {
                continue;
            }
            copied += copy_tree(&path, &target)?;
        }
    }

    Ok(copied)
}

fn copy_tree(src: &Path, dst: &Path) -> Result<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry.map_err(|e| EtlError::Packaging(format!("{}: {e}", src.display())))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| EtlError::Packaging(e.to_string()))?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| io_error(&target, e))?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| io_error(entry.path(), e))?;
            copied += 1;
        }
    }
    Ok(copied)
}

fn contains_manifest(dir: &Path) -> bool {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .any(|e| e.file_type().is_file() && e.file_name() == MANIFEST_FILE)
}

fn is_same_path(path: &Path, other: &Path) -> bool {
    match (fs::canonicalize(path), fs::canonicalize(other)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn io_error(path: &Path, err: std::io::Error) -> EtlError {
    EtlError::Packaging(format!("{}: {}", path.display(), err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn manifest(name: &str) -> String {
        format!("---\nname: {name}\ndescription: test\n---\n\n# {name}\n")
    }

    #[test]
    fn test_manifest_name_parsing() {
        let pattern = front_matter_pattern().unwrap();
        let path = Path::new("SKILL.md");
        assert_eq!(
            manifest_name(&pattern, &manifest("etl-core"), path).as_deref(),
            Some("etl-core")
        );
        assert_eq!(manifest_name(&pattern, "# no front matter\n", path), None);
        assert_eq!(manifest_name(&pattern, "---\ndescription: x\n---\n", path), None);
        assert_eq!(manifest_name(&pattern, "---\nname: ../escape\n---\n", path), None);
    }

    #[test]
    fn test_discover_first_occurrence_wins() {
        let root = TempDir::new().unwrap();
        write(&root.path().join("a/SKILL.md"), &manifest("dup"));
        write(&root.path().join("b/SKILL.md"), &manifest("dup"));
        write(&root.path().join(".git/x/SKILL.md"), &manifest("hidden"));

        let found = discover(root.path(), &root.path().join("skills")).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "dup");
        assert!(found[0].dir.ends_with("a"));
    }

    #[test]
    fn test_package_copies_and_indexes() {
        let root = TempDir::new().unwrap();
        let src = root.path().join("src");
        write(&src.join("beta/SKILL.md"), &manifest("beta"));
        write(&src.join("beta/templates/pipeline.py"), "print('hi')\n");
        write(&src.join("beta/.gitignore"), "*.pyc\n");
        write(&src.join("beta/.ruff_cache/cache"), "x");
        write(&src.join("beta/nested/SKILL.md"), &manifest("alpha"));

        let out = root.path().join("skills");
        write(&out.join("stale.txt"), "old");

        let report = package(&src, &out).unwrap();
        assert_eq!(report.names, vec!["alpha".to_string(), "beta".to_string()]);
        assert_eq!(report.files_copied, 3);

        assert!(!out.join("stale.txt").exists());
        assert!(out.join("beta/templates/pipeline.py").exists());
        assert!(!out.join("beta/.gitignore").exists());
        assert!(!out.join("beta/.ruff_cache").exists());
        assert!(!out.join("beta/nested").exists());
        assert!(out.join("alpha/SKILL.md").exists());

        let readme = fs::read_to_string(out.join("README.md")).unwrap();
        assert!(readme.contains("## 2 Skills"));
        assert!(readme.ends_with("- `alpha`\n- `beta`\n"));
    }

    #[test]
    fn test_package_refuses_to_overwrite_sources() {
        let root = TempDir::new().unwrap();
        let src = root.path().join("src");
        write(&src.join("etl/SKILL.md"), &manifest("etl"));
        write(&src.join("keep.txt"), "keep");

        let same = package(&src, &src).unwrap_err();
        assert!(matches!(
            same,
            EtlError::Packaging(msg) if msg.contains("contains the source root")
        ));

        let parent = package(&src, root.path()).unwrap_err();
        assert!(matches!(parent, EtlError::Packaging(_)));

        assert!(src.join("keep.txt").exists());
        assert!(src.join("etl/SKILL.md").exists());
    }

    #[test]
    fn test_package_missing_root() {
        let root = TempDir::new().unwrap();
        let err = package(root.path().join("absent"), root.path().join("out")).unwrap_err();
        assert!(matches!(err, EtlError::Packaging(_)));
    }
}
