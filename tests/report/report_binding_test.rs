//! Integration tests for binding cloned report shells to their models.

use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tmdl_migrate::materialize::clone_reports;
use tmdl_migrate::report::{patch_reports, DocumentStatus};

const DEFINITION_PBIR: &str = r#"{
  "version": "4.0",
  "datasetReference": {
    "byPath": {
      "path": "../Default.SemanticModel"
    },
    "byConnection": null
  }
}"#;

const PLATFORM: &str = r#"{
  "$schema": "https://developer.microsoft.com/json-schemas/fabric/gitIntegration/platformProperties/2.0.0/schema.json",
  "metadata": {
    "type": "Report",
    "displayName": "Default"
  },
  "config": {
    "version": "2.0",
    "logicalId": "00000000-0000-0000-0000-000000000000"
  }
}"#;

fn write_template(root: &Path) -> std::path::PathBuf {
    let template = root.join("Default.Report");
    fs::create_dir_all(&template).unwrap();
    fs::write(template.join("definition.pbir"), DEFINITION_PBIR).unwrap();
    fs::write(template.join(".platform"), PLATFORM).unwrap();
    template
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

// ============================================================================
// Binding Tests
// ============================================================================

#[test]
fn test_reports_bound_per_model() {
    let temp = TempDir::new().unwrap();
    let template = write_template(temp.path());
    let out = temp.path().join("out");
    fs::create_dir_all(out.join("Sales.SemanticModel")).unwrap();
    fs::create_dir_all(out.join("Finance.SemanticModel")).unwrap();

    let created = clone_reports(&out, &template).unwrap();
    assert_eq!(created, vec!["Finance".to_string(), "Sales".to_string()]);

    let patches = patch_reports(&out).unwrap();
    assert_eq!(patches.len(), 2);
    assert!(patches
        .iter()
        .all(|p| p.definition == DocumentStatus::Patched && p.platform == DocumentStatus::Patched));

    let pbir = read_json(&out.join("Sales.Report/definition.pbir"));
    assert_eq!(pbir["datasetReference"]["byPath"]["path"], "../Sales.SemanticModel");

    let platform = read_json(&out.join("Finance.Report/.platform"));
    assert_eq!(platform["metadata"]["displayName"], "Finance");
}

#[test]
fn test_unrelated_keys_preserved_in_order() {
    let temp = TempDir::new().unwrap();
    let template = write_template(temp.path());
    let out = temp.path().join("out");
    fs::create_dir_all(out.join("Sales.SemanticModel")).unwrap();

    clone_reports(&out, &template).unwrap();
    patch_reports(&out).unwrap();

    let platform = read_json(&out.join("Sales.Report/.platform"));
    let keys: Vec<_> = platform.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, vec!["$schema", "metadata", "config"]);
    assert_eq!(platform["config"]["logicalId"], "00000000-0000-0000-0000-000000000000");

    let pbir = read_json(&out.join("Sales.Report/definition.pbir"));
    assert_eq!(pbir["version"], "4.0");
    assert!(pbir["datasetReference"]["byConnection"].is_null());
}

#[test]
fn test_template_left_untouched() {
    let temp = TempDir::new().unwrap();
    let template = write_template(temp.path());
    let out = temp.path().join("out");
    fs::create_dir_all(out.join("Sales.SemanticModel")).unwrap();

    clone_reports(&out, &template).unwrap();
    patch_reports(&out).unwrap();

    assert_eq!(
        fs::read_to_string(template.join("definition.pbir")).unwrap(),
        DEFINITION_PBIR
    );
    assert_eq!(fs::read_to_string(template.join(".platform")).unwrap(), PLATFORM);
}

// ============================================================================
// Degraded Input Tests
// ============================================================================

#[test]
fn test_missing_key_path_reported() {
    let temp = TempDir::new().unwrap();
    let report = temp.path().join("Sales.Report");
    fs::create_dir_all(&report).unwrap();
    fs::write(report.join("definition.pbir"), r#"{"version": "4.0"}"#).unwrap();
    fs::write(report.join(".platform"), PLATFORM).unwrap();

    let patches = patch_reports(temp.path()).unwrap();
    assert_eq!(patches[0].definition, DocumentStatus::KeyPathMissing);
    assert_eq!(patches[0].platform, DocumentStatus::Patched);

    // Still re-serialized, without gaining the missing keys.
    let pbir = read_json(&report.join("definition.pbir"));
    assert!(pbir.get("datasetReference").is_none());
}

#[test]
fn test_missing_platform_does_not_block_definition() {
    let temp = TempDir::new().unwrap();
    let report = temp.path().join("Sales.Report");
    fs::create_dir_all(&report).unwrap();
    fs::write(report.join("definition.pbir"), DEFINITION_PBIR).unwrap();

    let patches = patch_reports(temp.path()).unwrap();
    assert_eq!(patches[0].definition, DocumentStatus::Patched);
    assert_eq!(patches[0].platform, DocumentStatus::Missing);
}

#[test]
fn test_non_report_directories_ignored() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("Sales.SemanticModel")).unwrap();
    fs::create_dir_all(temp.path().join(".Report")).unwrap();

    assert!(patch_reports(temp.path()).unwrap().is_empty());
}
