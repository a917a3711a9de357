//! End-to-end tests for a full migration run.
//!
//! Each test builds a small export tree in a temp directory, runs the whole
//! pipeline, and inspects the output tree.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tmdl_migrate::config::MigrateConfig;
use tmdl_migrate::migrate::run;
use tmdl_migrate::tmdl::{BindingStrategy, Fallback};
use tmdl_migrate::rewrite::RewriteError;
use tmdl_migrate::MigrateError;

const SALES_DATABASE: &str = "database Sales\n\tcompatibilityLevel: 1500\n";

const SALES_MODEL: &str = "model Model\n\
    \tculture: en-US\n\
    \tdefaultPowerBIDataSourceVersion: powerBI_V3\n\
    \tdiscourageImplicitMeasures\n\
    \tsourceQueryCulture: en-US\n\
    \tdataAccessOptions\n\
    \t\tlegacyRedirects\n\
    \n\
    ref table Orders\n\
    \n\
    annotation __PBI_TimeIntelligenceEnabled = 0\n";

const ORDERS_1500: &str = "table Orders\n\
    \tlineageTag: 6f1d\n\
    \n\
    \tcolumn OrderId\n\
    \t\tdataType: int64\n\
    \t\tsourceProviderType: int\n\
    \t\tsourceColumn: orderid\n\
    \n\
    \tcolumn Amount\n\
    \t\tdataType: decimal\n\
    \t\tsourceColumn: amt\n\
    \n\
    \tpartition Orders-1 = query\n\
    \t\tdataSource: 'SQLHOST SalesDB'\n\
    \t\tquery: SELECT * FROM dbo.Orders\n\
    \n\
    \tannotation TabularEditor_TableSchema = {\"Name\":\"Orders\",\"Schema\":\"dbo\",\"Database\":\"SalesDB\"}\n";

const BROKEN_1500: &str = "table Broken\n\
    \tpartition Broken = query\n\
    \t\tdataSource: 'SQLHOST'\n";

struct Fixture {
    _temp: TempDir,
    input: PathBuf,
    output: PathBuf,
    template: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("workspace");
        let output = temp.path().join("PBIP");
        let template = temp.path().join("src/Default.Report");

        write(
            &template.join("definition.pbir"),
            r#"{"version": "4.0", "datasetReference": {"byPath": {"path": "../Default.SemanticModel"}}}"#,
        );
        write(
            &template.join(".platform"),
            r#"{"metadata": {"type": "Report", "displayName": "Default"}}"#,
        );

        Self {
            _temp: temp,
            input,
            output,
            template,
        }
    }

    fn model(&self, name: &str, database: &str, model: &str) -> PathBuf {
        let definition = self
            .input
            .join(format!("{}.SemanticModel", name))
            .join("definition");
        write(&definition.join("database.tmdl"), database);
        write(&definition.join("model.tmdl"), model);
        fs::create_dir_all(definition.join("tables")).unwrap();
        definition
    }

    fn config(&self) -> MigrateConfig {
        MigrateConfig::new(&self.input, &self.output, &self.template)
    }

    fn out(&self, relative: &str) -> String {
        fs::read_to_string(self.output.join(relative)).unwrap()
    }
}

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

// ============================================================================
// Full Pipeline Tests
// ============================================================================

#[test]
fn test_sales_model_migrated() {
    let fx = Fixture::new();
    let definition = fx.model("Sales", SALES_DATABASE, SALES_MODEL);
    write(&definition.join("tables/Orders.tmdl"), ORDERS_1500);

    let summary = run(&fx.config()).unwrap();

    assert_eq!(summary.models.len(), 1);
    let sales = &summary.models[0];
    assert_eq!(sales.name, "Sales");
    assert_eq!(sales.level, Some(1500));
    assert_eq!(sales.strategy, Some(BindingStrategy::LegacyV1));
    assert_eq!(sales.tables_rewritten, 1);
    assert!(sales.is_clean(), "unexpected errors: {:?}", sales);

    let orders = fx.out("Sales.SemanticModel/definition/tables/Orders.tmdl");
    assert!(orders.contains(
        "Source = Sql.Database(\"SQLHOST\", \"SalesDB\", [Query = \"SELECT [orderid] AS [OrderId], [amt] AS [Amount] FROM [dbo].[Orders]\", CreateNavigationProperties=false])"
    ));
    assert!(!orders.contains("sourceProviderType"));

    assert_eq!(
        fx.out("Sales.SemanticModel/definition/database.tmdl"),
        "database Sales\n\tcompatibilityLevel: 1605\n"
    );
    assert_eq!(
        fx.out("Sales.SemanticModel/definition/model.tmdl"),
        "model Model\n\
         \tculture: en-US\n\
         \tdefaultPowerBIDataSourceVersion: powerBI_V3\n\
         \tdiscourageImplicitMeasures\n\
         ref table Orders\n"
    );

    let pbir: Value = serde_json::from_str(&fx.out("Sales.Report/definition.pbir")).unwrap();
    assert_eq!(pbir["datasetReference"]["byPath"]["path"], "../Sales.SemanticModel");
    let platform: Value = serde_json::from_str(&fx.out("Sales.Report/.platform")).unwrap();
    assert_eq!(platform["metadata"]["displayName"], "Sales");
}

#[test]
fn test_source_tree_untouched() {
    let fx = Fixture::new();
    let definition = fx.model("Sales", SALES_DATABASE, SALES_MODEL);
    write(&definition.join("tables/Orders.tmdl"), ORDERS_1500);
    write(&definition.join("dataSources.tmdl"), "dataSource X = provider\n");

    run(&fx.config()).unwrap();

    assert_eq!(
        fs::read_to_string(definition.join("tables/Orders.tmdl")).unwrap(),
        ORDERS_1500
    );
    assert_eq!(
        fs::read_to_string(definition.join("database.tmdl")).unwrap(),
        SALES_DATABASE
    );
    assert_eq!(
        fs::read_to_string(definition.join("model.tmdl")).unwrap(),
        SALES_MODEL
    );
    assert!(definition.join("dataSources.tmdl").is_file());
    assert!(!fx.input.join("Sales.Report").exists());
}

#[test]
fn test_failing_table_does_not_stop_siblings() {
    let fx = Fixture::new();
    let definition = fx.model("Sales", SALES_DATABASE, SALES_MODEL);
    write(&definition.join("tables/Broken.tmdl"), BROKEN_1500);
    write(&definition.join("tables/Orders.tmdl"), ORDERS_1500);

    let summary = run(&fx.config()).unwrap();
    let sales = &summary.models[0];

    assert_eq!(sales.tables_rewritten, 1);
    assert_eq!(sales.table_failures.len(), 1);
    assert!(sales.table_failures[0].path.ends_with("Broken.tmdl"));
    assert!(matches!(
        sales.table_failures[0].error,
        MigrateError::Rewrite(RewriteError::IncompleteBinding { .. })
    ));
    assert_eq!(
        fx.out("Sales.SemanticModel/definition/tables/Broken.tmdl"),
        BROKEN_1500
    );
    assert_eq!(
        fx.out("Sales.SemanticModel/definition/database.tmdl"),
        "database Sales\n\tcompatibilityLevel: 1605\n"
    );
}

// ============================================================================
// Referenced (1600) Models
// ============================================================================

const INVENTORY_1600: &str = "table Stock\n\
    \tcolumn Qty\n\
    \t\tsourceColumn: qty\n\
    \n\
    \tpartition Stock = m\n\
    \t\tmode: import\n\
    \t\tdataSource: Warehouse\n\
    \t\tsource = Value.NativeQuery(Source, \"SELECT * FROM [inv].[stock]\")\n";

#[test]
fn test_referenced_model_resolves_then_deletes_datasources() {
    let fx = Fixture::new();
    let definition = fx.model(
        "Inventory",
        "database\n\tcompatibilityLevel: 1600\n",
        "model Model\n",
    );
    write(&definition.join("tables/Stock.tmdl"), INVENTORY_1600);
    write(
        &definition.join("dataSources.tmdl"),
        "dataSource Warehouse = provider\n\tconnectionString: Data Source=DW01;Initial Catalog=Inventory\n",
    );

    let summary = run(&fx.config()).unwrap();
    let inventory = &summary.models[0];

    assert_eq!(inventory.strategy, Some(BindingStrategy::LegacyV2));
    assert!(inventory.fallbacks.is_empty());
    assert!(fx
        .out("Inventory.SemanticModel/definition/tables/Stock.tmdl")
        .contains("Sql.Database(\"DW01\", \"Inventory\", [Query = \"SELECT [qty] AS [Qty] FROM [inv].[Stock]\""));
    assert!(!fx
        .output
        .join("Inventory.SemanticModel/definition/dataSources.tmdl")
        .exists());
}

#[test]
fn test_referenced_model_without_datasources_continues() {
    let fx = Fixture::new();
    let definition = fx.model(
        "Inventory",
        "database\n\tcompatibilityLevel: 1600\n",
        "model Model\n",
    );
    write(&definition.join("tables/Stock.tmdl"), INVENTORY_1600);

    let mut config = fx.config();
    config.default_database = Some("Fallback".to_string());
    let summary = run(&config).unwrap();
    let inventory = &summary.models[0];

    assert_eq!(inventory.tables_rewritten, 1);
    assert!(inventory.step_errors.is_empty());
    let fallbacks: Vec<_> = inventory.fallbacks.iter().map(|f| &f.fallback).collect();
    assert_eq!(
        fallbacks,
        vec![
            &Fallback::ServerUnresolved {
                data_source: Some("Warehouse".to_string())
            },
            &Fallback::DatabaseFromDefault,
        ]
    );
    assert!(fx
        .out("Inventory.SemanticModel/definition/tables/Stock.tmdl")
        .contains("Sql.Database(\"\", \"Fallback\", "));
    assert_eq!(
        fx.out("Inventory.SemanticModel/definition/database.tmdl"),
        "database\n\tcompatibilityLevel: 1605\n"
    );
}

// ============================================================================
// Degraded Models
// ============================================================================

#[test]
fn test_unknown_level_still_patched_and_filtered() {
    let fx = Fixture::new();
    let definition = fx.model(
        "Modern",
        "database\n\tcompatibilityLevel: 1550\n",
        "model Model\n\tculture: en-US\n\tsourceQueryCulture: en-US\nref table X\n",
    );
    let table = "table X\n\tpartition X = m\n\t\tsource = 1\n";
    write(&definition.join("tables/X.tmdl"), table);
    write(&definition.join("datasources.tmdl"), "dataSource A = provider\n");

    let summary = run(&fx.config()).unwrap();
    let modern = &summary.models[0];

    assert_eq!(modern.level, Some(1550));
    assert!(modern.strategy.is_none());
    assert_eq!(modern.tables_rewritten, 0);
    assert_eq!(fx.out("Modern.SemanticModel/definition/tables/X.tmdl"), table);
    assert_eq!(
        fx.out("Modern.SemanticModel/definition/database.tmdl"),
        "database\n\tcompatibilityLevel: 1550\n"
    );
    assert_eq!(
        fx.out("Modern.SemanticModel/definition/model.tmdl"),
        "model Model\n\tculture: en-US\nref table X\n"
    );
    assert!(!fx
        .output
        .join("Modern.SemanticModel/definition/datasources.tmdl")
        .exists());
}

#[test]
fn test_missing_template_skips_reports() {
    let fx = Fixture::new();
    let definition = fx.model("Sales", SALES_DATABASE, SALES_MODEL);
    write(&definition.join("tables/Orders.tmdl"), ORDERS_1500);

    let mut config = fx.config();
    config.template_report = fx.input.join("missing.Report");
    let summary = run(&config).unwrap();

    assert!(summary.reports_created.is_empty());
    assert!(summary.reports.is_empty());
    assert!(!fx.output.join("Sales.Report").exists());
    assert_eq!(summary.models[0].tables_rewritten, 1);
}

#[test]
fn test_custom_target_level() {
    let fx = Fixture::new();
    fx.model("Sales", SALES_DATABASE, SALES_MODEL);

    let mut config = fx.config();
    config.target_level = 1604;
    run(&config).unwrap();

    assert_eq!(
        fx.out("Sales.SemanticModel/definition/database.tmdl"),
        "database Sales\n\tcompatibilityLevel: 1604\n"
    );
}

// ============================================================================
// Fatal Configuration Tests
// ============================================================================

#[test]
fn test_missing_input_is_fatal() {
    let fx = Fixture::new();
    assert!(matches!(
        run(&fx.config()),
        Err(MigrateError::InputNotFound(_))
    ));
}

#[test]
fn test_output_equal_to_input_is_fatal() {
    let fx = Fixture::new();
    fx.model("Sales", SALES_DATABASE, SALES_MODEL);

    let config = MigrateConfig::new(&fx.input, &fx.input, &fx.template);
    assert!(matches!(
        run(&config),
        Err(MigrateError::OverlappingRoots { .. })
    ));
    assert_eq!(
        fs::read_to_string(fx.input.join("Sales.SemanticModel/definition/database.tmdl")).unwrap(),
        SALES_DATABASE
    );
}

#[test]
fn test_output_nested_in_input_is_allowed() {
    let fx = Fixture::new();
    fx.model("Sales", SALES_DATABASE, SALES_MODEL);

    let nested = fx.input.join("PBIP");
    let config = MigrateConfig::new(&fx.input, &nested, &fx.template);
    let first = run(&config).unwrap();
    let second = run(&config).unwrap();

    assert_eq!(first.copied.len(), 1);
    assert_eq!(second.copied.len(), 1);
    assert!(!nested.join("PBIP").exists());
    assert_eq!(
        fs::read_to_string(fx.input.join("Sales.SemanticModel/definition/database.tmdl")).unwrap(),
        SALES_DATABASE
    );
}
