//! Integration tests for data-source declarations and connection strings.

use tmdl_migrate::config::ConnectionDescriptor;
use tmdl_migrate::tmdl::DataSourceCatalog;

const DATA_SOURCES: &str = "\
dataSource 'SQL Warehouse' = provider
\tconnectionString: Provider=SQLNCLI11;Data Source=DW01;Initial Catalog=Warehouse;Integrated Security=SSPI
\timpersonationMode: impersonateServiceAccount

dataSource Staging = provider
\tconnectionString: Server=\"STG02\";Database=Landing
\tconnectionString: Server=IGNORED;Database=IGNORED

dataSource NoConnection = provider
\tdescription: declared without a connection string
";

// ============================================================================
// Catalog Tests
// ============================================================================

#[test]
fn test_catalog_entries_in_declaration_order() {
    let catalog = DataSourceCatalog::parse(DATA_SOURCES);
    let names: Vec<_> = catalog.entries().iter().map(|e| e.name.as_str()).collect();

    assert_eq!(names, vec!["SQL Warehouse", "Staging", "NoConnection"]);
}

#[test]
fn test_lookup_quoted_identifier() {
    let catalog = DataSourceCatalog::parse(DATA_SOURCES);
    let conn = catalog.lookup("SQL Warehouse").unwrap();

    assert_eq!(conn.server.as_deref(), Some("DW01"));
    assert_eq!(conn.database.as_deref(), Some("Warehouse"));
    assert!(conn.is_complete());
}

#[test]
fn test_lookup_is_case_insensitive() {
    let catalog = DataSourceCatalog::parse(DATA_SOURCES);
    assert_eq!(
        catalog.lookup("sql warehouse"),
        catalog.lookup("SQL Warehouse")
    );
}

#[test]
fn test_first_connection_string_wins() {
    let catalog = DataSourceCatalog::parse(DATA_SOURCES);
    let conn = catalog.lookup("Staging").unwrap();

    assert_eq!(conn.server.as_deref(), Some("STG02"));
    assert_eq!(conn.database.as_deref(), Some("Landing"));
}

#[test]
fn test_declaration_without_connection() {
    let catalog = DataSourceCatalog::parse(DATA_SOURCES);

    assert!(catalog.lookup("NoConnection").is_none());
    assert!(catalog.lookup("Missing").is_none());
}

#[test]
fn test_empty_document() {
    assert!(DataSourceCatalog::parse("").is_empty());
}

// ============================================================================
// Connection String Tests
// ============================================================================

#[test]
fn test_partial_connection_string() {
    let conn = ConnectionDescriptor::parse("Data Source=HOST;Integrated Security=SSPI");

    assert_eq!(conn.server.as_deref(), Some("HOST"));
    assert_eq!(conn.database, None);
    assert!(!conn.is_complete());
}

#[test]
fn test_connection_keys_case_insensitive() {
    let conn = ConnectionDescriptor::parse("SERVER=a; initial catalog=b");

    assert_eq!(conn.server.as_deref(), Some("a"));
    assert_eq!(conn.database.as_deref(), Some("b"));
}
