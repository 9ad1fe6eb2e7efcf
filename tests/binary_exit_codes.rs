//! The process-level contract: the orchestrator sees only exit codes.

use std::path::Path;
use std::process::{Command, Output};

use tablenode::{
    DATABASE_PATH_VAR, ErrorKind, INPUT_TABLES_VAR, MODEL_NAME_VAR, OUTPUT_TABLE_VAR, SCHEMA_VAR,
    SharedDatabase, TRACE_PATH_VAR, TableName,
};

fn run(vars: &[(&str, &str)]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tablenode"));
    for key in [
        DATABASE_PATH_VAR,
        INPUT_TABLES_VAR,
        OUTPUT_TABLE_VAR,
        MODEL_NAME_VAR,
        SCHEMA_VAR,
        TRACE_PATH_VAR,
        "RUST_LOG",
    ] {
        cmd.env_remove(key);
    }
    cmd.envs(vars.iter().copied());
    cmd.output().unwrap()
}

fn seed(path: &Path, sql: &str) {
    let db = SharedDatabase::open(path.to_str().unwrap()).unwrap();
    db.execute_batch(sql).unwrap();
    db.close().unwrap();
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn test_success_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("pipeline.duckdb");
    seed(&db_path, "CREATE TABLE orders AS SELECT * FROM (VALUES (10), (20)) t(amount);");

    let output = run(&[
        (DATABASE_PATH_VAR, db_path.to_str().unwrap()),
        (INPUT_TABLES_VAR, r#"["orders"]"#),
        (OUTPUT_TABLE_VAR, "orders_scored"),
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let db = SharedDatabase::open(db_path.to_str().unwrap()).unwrap();
    let name = TableName::new("orders_scored").unwrap();
    assert_eq!(db.count_rows(&name).unwrap(), 2);
}

#[test]
fn test_missing_output_variable_never_connects() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("never-created.duckdb");

    let output = run(&[
        (DATABASE_PATH_VAR, db_path.to_str().unwrap()),
        (INPUT_TABLES_VAR, r#"["orders"]"#),
    ]);
    assert_eq!(output.status.code(), Some(ErrorKind::Configuration.exit_code()));
    assert!(stderr(&output).contains(OUTPUT_TABLE_VAR));
    assert!(!db_path.exists());
}

#[test]
fn test_missing_database_variable() {
    let output = run(&[
        (INPUT_TABLES_VAR, r#"["orders"]"#),
        (OUTPUT_TABLE_VAR, "orders_scored"),
    ]);
    assert_eq!(output.status.code(), Some(ErrorKind::Configuration.exit_code()));
    assert!(stderr(&output).contains("ConfigurationError"));
    assert!(stderr(&output).contains(DATABASE_PATH_VAR));
}

#[test]
fn test_malformed_input_tables() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("pipeline.duckdb");

    let output = run(&[
        (DATABASE_PATH_VAR, db_path.to_str().unwrap()),
        (INPUT_TABLES_VAR, "orders"),
        (OUTPUT_TABLE_VAR, "orders_scored"),
    ]);
    assert_eq!(output.status.code(), Some(ErrorKind::Configuration.exit_code()));
    assert!(!db_path.exists());
}

#[test]
fn test_missing_table_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("pipeline.duckdb");
    seed(&db_path, "CREATE TABLE unrelated (x INTEGER);");

    let output = run(&[
        (DATABASE_PATH_VAR, db_path.to_str().unwrap()),
        (INPUT_TABLES_VAR, r#"["orders"]"#),
        (OUTPUT_TABLE_VAR, "orders_scored"),
    ]);
    assert_eq!(output.status.code(), Some(ErrorKind::MissingTable.exit_code()));
    assert!(stderr(&output).contains("MissingTableError"));
    assert!(stderr(&output).contains("orders"));
}

#[test]
fn test_schema_error_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("pipeline.duckdb");
    seed(&db_path, "CREATE TABLE orders (price DOUBLE);");

    let output = run(&[
        (DATABASE_PATH_VAR, db_path.to_str().unwrap()),
        (INPUT_TABLES_VAR, r#"["orders"]"#),
        (OUTPUT_TABLE_VAR, "orders_scored"),
    ]);
    assert_eq!(output.status.code(), Some(ErrorKind::Schema.exit_code()));
    assert!(stderr(&output).contains("amount"));
}

#[test]
fn test_declared_schema_mismatch_blocks_write() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("pipeline.duckdb");
    seed(&db_path, "CREATE TABLE orders AS SELECT 10 AS amount;");

    let output = run(&[
        (DATABASE_PATH_VAR, db_path.to_str().unwrap()),
        (INPUT_TABLES_VAR, r#"["orders"]"#),
        (OUTPUT_TABLE_VAR, "orders_scored"),
        (SCHEMA_VAR, r#"[{"name": "amount"}, {"name": "rank", "type": "INTEGER"}]"#),
    ]);
    assert_eq!(output.status.code(), Some(ErrorKind::Schema.exit_code()));

    let db = SharedDatabase::open(db_path.to_str().unwrap()).unwrap();
    let name = TableName::new("orders_scored").unwrap();
    assert!(!db.relation_exists(&name).unwrap());
}

#[test]
fn test_unreachable_database_exit_code() {
    let output = run(&[
        (DATABASE_PATH_VAR, "/no/such/directory/pipeline.duckdb"),
        (INPUT_TABLES_VAR, r#"["orders"]"#),
        (OUTPUT_TABLE_VAR, "orders_scored"),
    ]);
    assert_eq!(output.status.code(), Some(ErrorKind::Connection.exit_code()));
    assert!(stderr(&output).contains("ConnectionError"));
}
