//! Integration tests for working-tree materialization.

use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tmdl_migrate::materialize::{copy_model_dirs, discover_model_dirs};

fn touch(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn test_copy_preserves_relative_layout() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("workspace");
    let output = temp.path().join("PBIP");
    touch(&input.join("Sales.SemanticModel/definition/model.tmdl"), "model Model\n");
    touch(
        &input.join("finance/Budget.SemanticModel/definition/tables/Plan.tmdl"),
        "table Plan\n",
    );
    touch(&input.join("finance/notes.txt"), "not a model");

    let copied = copy_model_dirs(&input, &output).unwrap();

    assert_eq!(copied.len(), 2);
    assert_eq!(
        fs::read_to_string(output.join("Sales.SemanticModel/definition/model.tmdl")).unwrap(),
        "model Model\n"
    );
    assert!(output
        .join("finance/Budget.SemanticModel/definition/tables/Plan.tmdl")
        .is_file());
    assert!(!output.join("finance/notes.txt").exists());
}

#[test]
fn test_second_copy_merges_into_existing_output() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("in");
    let output = temp.path().join("out");
    touch(&input.join("A.SemanticModel/definition/model.tmdl"), "v1");
    copy_model_dirs(&input, &output).unwrap();

    touch(&input.join("A.SemanticModel/definition/model.tmdl"), "v2");
    touch(&output.join("A.SemanticModel/extra.txt"), "kept");
    copy_model_dirs(&input, &output).unwrap();

    assert_eq!(
        fs::read_to_string(output.join("A.SemanticModel/definition/model.tmdl")).unwrap(),
        "v2"
    );
    assert!(output.join("A.SemanticModel/extra.txt").is_file());
}

#[test]
fn test_output_inside_input_not_rediscovered() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().to_path_buf();
    let output = input.join("out");
    touch(&input.join("A.SemanticModel/definition/model.tmdl"), "model");

    copy_model_dirs(&input, &output).unwrap();
    let copied = copy_model_dirs(&input, &output).unwrap();

    assert_eq!(copied, vec![output.join("A.SemanticModel")]);
    assert!(!output.join("out").exists());
}

#[test]
fn test_source_bytes_unchanged() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("in");
    let source = input.join("A.SemanticModel/definition/database.tmdl");
    touch(&source, "database\n\tcompatibilityLevel: 1500\n");

    let output = temp.path().join("out");
    copy_model_dirs(&input, &output).unwrap();
    fs::write(output.join("A.SemanticModel/definition/database.tmdl"), "changed").unwrap();

    assert_eq!(
        fs::read_to_string(&source).unwrap(),
        "database\n\tcompatibilityLevel: 1500\n"
    );
}

#[test]
fn test_discovery_ignores_files_with_suffix() {
    let temp = TempDir::new().unwrap();
    touch(&temp.path().join("Fake.SemanticModel"), "file, not dir");

    assert!(discover_model_dirs(temp.path(), None).is_empty());
}
