//! Integration tests for manifest packaging

use std::fs;
use std::path::Path;
use strata::packaging::{discover, package, MANIFEST_FILE};
use tempfile::TempDir;

fn manifest(dir: &Path, name: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(
        dir.join(MANIFEST_FILE),
        format!("---\nname: {name}\ndescription: fixture\n---\n\nBody\n"),
    )
    .unwrap();
}

#[test]
fn test_package_tree() {
    let root = TempDir::new().unwrap();
    let src = root.path();

    manifest(&src.join("data-engineering/core"), "data-engineering-core");
    fs::create_dir_all(src.join("data-engineering/core/templates")).unwrap();
    fs::write(
        src.join("data-engineering/core/templates/complete_etl_pipeline.py"),
        "# template\n",
    )
    .unwrap();

    manifest(&src.join("analytics/reporting"), "reporting");
    // Later duplicate of an existing name is ignored
    manifest(&src.join("zz-copy/reporting"), "reporting");
    // Manifest without a name is ignored
    fs::create_dir_all(src.join("drafts")).unwrap();
    fs::write(src.join("drafts").join(MANIFEST_FILE), "---\ntitle: draft\n---\n").unwrap();

    let out = src.join("skills");
    let report = package(src, &out).unwrap();

    assert_eq!(
        report.names,
        vec!["data-engineering-core".to_string(), "reporting".to_string()]
    );
    assert!(out
        .join("data-engineering-core/templates/complete_etl_pipeline.py")
        .exists());
    assert!(out.join("reporting").join(MANIFEST_FILE).exists());

    let readme = fs::read_to_string(out.join("README.md")).unwrap();
    assert_eq!(
        readme,
        "# Generated Skills Directory\n\n\
         This directory is auto-generated from source. Do not edit manually.\n\n\
         ## 2 Skills\n\n\
         - `data-engineering-core`\n\
         - `reporting`\n"
    );

    // A second pass skips its own output and produces the same result
    let again = package(src, &out).unwrap();
    assert_eq!(again.names, report.names);
    assert_eq!(again.files_copied, report.files_copied);
}

#[test]
fn test_discover_skips_output_directory() {
    let root = TempDir::new().unwrap();
    manifest(&root.path().join("skills/stale"), "stale");
    manifest(&root.path().join("src/fresh"), "fresh");

    let found = discover(root.path(), &root.path().join("skills")).unwrap();
    let names: Vec<_> = found.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["fresh"]);
}
