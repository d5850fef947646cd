//! SQLite-backed warehouse and NDJSON bulk loads.

use crate::schema::{ColumnDef, infer_schema, quote_ident, to_sql_value};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use filings_core::{FilingsError, ObjectStore, Result, WarehouseConfig};
use filings_stage::decode_ndjson;
use polars::prelude::*;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, params_from_iter};
use serde_json::{Map, Value};
use std::fmt::Display;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};

fn warehouse_error(e: impl Display) -> FilingsError {
    FilingsError::Warehouse(e.to_string())
}

/// Options for one load job.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Date or timestamp column the destination table is partitioned on.
    pub partition_field: Option<String>,
}

impl LoadOptions {
    /// Partition the destination on `field`.
    #[must_use]
    pub fn with_partition_field(mut self, field: impl Into<String>) -> Self {
        self.partition_field = Some(field.into());
        self
    }
}

/// Outcome of a completed load job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadJob {
    /// Fully qualified destination, `project.dataset.table`.
    pub destination: String,
    /// URIs of every object appended, in key order.
    pub source_uris: Vec<String>,
    /// Rows appended by this job.
    pub rows_loaded: usize,
    /// Region label of the warehouse.
    pub location: String,
}

/// Warehouse stored in SQLite.
///
/// The project is the main database file and every dataset is an attached
/// schema, so tables are addressed as `dataset.table`. On disk the layout is
/// `<root>/<project>.sqlite` plus `<root>/<project>/<dataset>.sqlite`.
#[derive(Debug)]
pub struct SqliteWarehouse {
    conn: Mutex<Connection>,
    config: WarehouseConfig,
}

impl SqliteWarehouse {
    /// Open (or create) the warehouse described by `config`.
    ///
    /// # Errors
    /// Returns an error if a name is not usable as a file name or a database
    /// cannot be opened.
    pub fn open(config: WarehouseConfig) -> Result<Self> {
        validate_name("project", &config.project)?;
        let dataset_dir = config.root.join(&config.project);
        std::fs::create_dir_all(&dataset_dir)?;

        let conn = Connection::open(config.root.join(format!("{}.sqlite", config.project)))
            .map_err(warehouse_error)?;
        let warehouse = Self {
            conn: Mutex::new(conn),
            config,
        };
        warehouse.attach_datasets(Some(&dataset_dir))?;
        Ok(warehouse)
    }

    /// Create a warehouse held entirely in memory.
    ///
    /// Useful for testing; data is lost when the warehouse is dropped.
    ///
    /// # Errors
    /// Returns an error if a dataset cannot be attached.
    pub fn in_memory(config: WarehouseConfig) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(warehouse_error)?;
        let warehouse = Self {
            conn: Mutex::new(conn),
            config,
        };
        warehouse.attach_datasets(None)?;
        Ok(warehouse)
    }

    /// Warehouse settings this instance was opened with.
    #[must_use]
    pub const fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    /// `project.dataset.table` name of a table.
    #[must_use]
    pub fn destination(&self, dataset: &str, table: &str) -> String {
        format!("{}.{dataset}.{table}", self.config.project)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(warehouse_error)
    }

    fn attach_datasets(&self, dir: Option<&Path>) -> Result<()> {
        let conn = self.lock()?;
        for dataset in [&self.config.raw_dataset, &self.config.curated_dataset] {
            validate_name("dataset", dataset)?;
            let attached: bool = conn
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM pragma_database_list WHERE name = ?1)",
                    [dataset],
                    |row| row.get(0),
                )
                .map_err(warehouse_error)?;
            if attached {
                continue;
            }

            let location = match dir {
                Some(dir) => dir.join(format!("{dataset}.sqlite")).display().to_string(),
                None => ":memory:".to_string(),
            };
            conn.execute(
                &format!("ATTACH DATABASE ?1 AS {}", quote_ident(dataset)),
                [&location],
            )
            .map_err(warehouse_error)?;
            debug!(dataset = %dataset, %location, "Attached dataset");
        }
        Ok(())
    }

    /// Run one or more SQL statements against the warehouse.
    ///
    /// # Errors
    /// Returns an error if any statement fails.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.lock()?.execute_batch(sql).map_err(warehouse_error)
    }

    /// Number of rows in `dataset.table`.
    ///
    /// # Errors
    /// Returns an error if the table does not exist.
    pub fn row_count(&self, dataset: &str, table: &str) -> Result<usize> {
        let sql = format!(
            "SELECT COUNT(*) FROM {}.{}",
            quote_ident(dataset),
            quote_ident(table)
        );
        let count: i64 = self
            .lock()?
            .query_row(&sql, [], |row| row.get(0))
            .map_err(warehouse_error)?;
        usize::try_from(count).map_err(warehouse_error)
    }

    /// Column names of `dataset.table` in declaration order; empty if the
    /// table does not exist.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be read.
    pub fn columns(&self, dataset: &str, table: &str) -> Result<Vec<String>> {
        existing_columns(&*self.lock()?, dataset, table).map_err(warehouse_error)
    }

    /// Runs a query and collects the result into a `DataFrame`.
    ///
    /// Each column becomes `Int64` when it only holds integers, `String` when
    /// it holds any text, and `Float64` otherwise.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn query_frame<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<DataFrame> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql).map_err(warehouse_error)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut values: Vec<Vec<SqlValue>> = vec![Vec::new(); names.len()];

        let mut rows = stmt.query(params).map_err(warehouse_error)?;
        while let Some(row) = rows.next().map_err(warehouse_error)? {
            for (index, column) in values.iter_mut().enumerate() {
                column.push(row.get(index).map_err(warehouse_error)?);
            }
        }

        let columns = names
            .iter()
            .zip(&values)
            .map(|(name, column)| frame_column(name, column))
            .collect();
        DataFrame::new(columns).map_err(warehouse_error)
    }

    /// Appends every staged object matching `pattern` to the raw table `table`.
    ///
    /// `pattern` is an object key in which `*` matches any run of characters
    /// within one `/`-separated segment, e.g. `raw/*/companyfacts.ndjson`.
    /// Columns are detected from the data; the table is created on first load
    /// and widened with columns that appear later. Existing rows are never
    /// touched.
    ///
    /// # Errors
    /// Returns an error if no object matches, an object is not NDJSON of JSON
    /// objects, the partition field is missing or not date-valued, or the
    /// write fails. A failed job appends nothing.
    #[instrument(skip(self, store, options), fields(dataset = %self.config.raw_dataset))]
    pub async fn load_ndjson(
        &self,
        store: &dyn ObjectStore,
        table: &str,
        pattern: &str,
        options: &LoadOptions,
    ) -> Result<LoadJob> {
        if table.is_empty() {
            return Err(FilingsError::InvalidParameter(
                "Destination table name is empty".to_string(),
            ));
        }

        let prefix = pattern.split('*').next().unwrap_or_default();
        let keys: Vec<String> = store
            .list(prefix)
            .await?
            .into_iter()
            .filter(|key| key_matches(pattern, key))
            .collect();
        if keys.is_empty() {
            return Err(FilingsError::Storage(format!(
                "No objects match {}",
                store.uri(pattern)
            )));
        }

        let mut records = Vec::new();
        let mut source_uris = Vec::with_capacity(keys.len());
        for key in &keys {
            let uri = store.uri(key);
            let lines: Vec<Value> = decode_ndjson(&store.get(key).await?)
                .map_err(|e| FilingsError::Parse(format!("{uri}: {e}")))?;
            for line in lines {
                match line {
                    Value::Object(record) => records.push(record),
                    other => {
                        return Err(FilingsError::Parse(format!(
                            "{uri}: expected a JSON object per line, found {other}"
                        )));
                    }
                }
            }
            source_uris.push(uri);
        }

        let dataset = self.config.raw_dataset.clone();
        let rows_loaded = self.append(&dataset, table, &records, options)?;
        let destination = self.destination(&dataset, table);
        info!(%destination, files = source_uris.len(), rows = rows_loaded, "Load job complete");

        Ok(LoadJob {
            destination,
            source_uris,
            rows_loaded,
            location: self.config.location.clone(),
        })
    }

    fn append(
        &self,
        dataset: &str,
        table: &str,
        records: &[Map<String, Value>],
        options: &LoadOptions,
    ) -> Result<usize> {
        let schema = infer_schema(records);
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(warehouse_error)?;

        let existing = existing_columns(&tx, dataset, table).map_err(warehouse_error)?;
        if let Some(field) = &options.partition_field {
            check_partition_field(field, &schema, &existing, records)?;
        }
        if schema.is_empty() {
            warn!(table, "Nothing to load");
            return Ok(0);
        }

        let dataset_q = quote_ident(dataset);
        let table_q = quote_ident(table);
        if existing.is_empty() {
            let columns: Vec<String> = schema.iter().map(column_ddl).collect();
            tx.execute(
                &format!("CREATE TABLE {dataset_q}.{table_q} ({})", columns.join(", ")),
                [],
            )
            .map_err(warehouse_error)?;
            debug!(table, columns = schema.len(), "Created table");
        } else {
            for column in schema.iter().filter(|c| !existing.contains(&c.name)) {
                tx.execute(
                    &format!("ALTER TABLE {dataset_q}.{table_q} ADD COLUMN {}", column_ddl(column)),
                    [],
                )
                .map_err(warehouse_error)?;
                debug!(table, column = %column.name, "Added column");
            }
        }

        {
            let names: Vec<String> = schema.iter().map(|c| quote_ident(&c.name)).collect();
            let placeholders: Vec<String> = (1..=schema.len()).map(|i| format!("?{i}")).collect();
            let mut stmt = tx
                .prepare(&format!(
                    "INSERT INTO {dataset_q}.{table_q} ({}) VALUES ({})",
                    names.join(", "),
                    placeholders.join(", ")
                ))
                .map_err(warehouse_error)?;

            for record in records {
                let values = schema.iter().map(|column| {
                    record.get(&column.name).map_or(SqlValue::Null, to_sql_value)
                });
                stmt.execute(params_from_iter(values)).map_err(warehouse_error)?;
            }
        }

        if let Some(field) = &options.partition_field {
            let index = quote_ident(&format!("idx_{table}_{field}"));
            tx.execute(
                &format!(
                    "CREATE INDEX IF NOT EXISTS {dataset_q}.{index} ON {table_q} ({})",
                    quote_ident(field)
                ),
                [],
            )
            .map_err(warehouse_error)?;
        }

        tx.commit().map_err(warehouse_error)?;
        Ok(records.len())
    }
}

fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(FilingsError::Config(format!("Invalid {kind} name: {name:?}")));
    }
    Ok(())
}

fn column_ddl(column: &ColumnDef) -> String {
    format!("{} {}", quote_ident(&column.name), column.column_type.sql())
}

fn existing_columns(conn: &Connection, dataset: &str, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!(
        "PRAGMA {}.table_info({})",
        quote_ident(dataset),
        quote_ident(table)
    ))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
    names.collect()
}

fn check_partition_field(
    field: &str,
    schema: &[ColumnDef],
    existing: &[String],
    records: &[Map<String, Value>],
) -> Result<()> {
    if !schema.iter().any(|c| c.name == field) && !existing.iter().any(|c| c == field) {
        return Err(FilingsError::InvalidParameter(format!(
            "Partition field {field} is not a column of the load"
        )));
    }
    if let Some(bad) = records
        .iter()
        .filter_map(|record| record.get(field))
        .find(|value| !is_temporal(value))
    {
        return Err(FilingsError::InvalidParameter(format!(
            "Partition field {field} holds a non-date value: {bad}"
        )));
    }
    Ok(())
}

fn is_temporal(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
                || DateTime::parse_from_rfc3339(s).is_ok()
                || NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").is_ok()
                || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").is_ok()
        }
        _ => false,
    }
}

/// Whether `key` matches `pattern`, segment by segment.
fn key_matches(pattern: &str, key: &str) -> bool {
    let patterns: Vec<&str> = pattern.split('/').collect();
    let segments: Vec<&str> = key.split('/').collect();
    patterns.len() == segments.len()
        && patterns
            .iter()
            .zip(&segments)
            .all(|(p, s)| segment_matches(p.as_bytes(), s.as_bytes()))
}

fn segment_matches(pattern: &[u8], text: &[u8]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some((b'*', rest)) => (0..=text.len()).any(|skip| segment_matches(rest, &text[skip..])),
        Some((c, rest)) => text.first() == Some(c) && segment_matches(rest, &text[1..]),
    }
}

fn frame_column(name: &str, values: &[SqlValue]) -> Column {
    let has = |f: fn(&SqlValue) -> bool| values.iter().any(f);

    if has(|v| matches!(v, SqlValue::Text(_) | SqlValue::Blob(_))) {
        let strings: Vec<Option<String>> = values
            .iter()
            .map(|v| match v {
                SqlValue::Null => None,
                SqlValue::Integer(i) => Some(i.to_string()),
                SqlValue::Real(f) => Some(f.to_string()),
                SqlValue::Text(s) => Some(s.clone()),
                SqlValue::Blob(b) => Some(String::from_utf8_lossy(b).into_owned()),
            })
            .collect();
        Column::new(name.into(), strings)
    } else if has(|v| matches!(v, SqlValue::Integer(_))) && !has(|v| matches!(v, SqlValue::Real(_))) {
        let ints: Vec<Option<i64>> = values
            .iter()
            .map(|v| match v {
                SqlValue::Integer(i) => Some(*i),
                _ => None,
            })
            .collect();
        Column::new(name.into(), ints)
    } else {
        let floats: Vec<Option<f64>> = values
            .iter()
            .map(|v| match v {
                SqlValue::Integer(i) => Some(*i as f64),
                SqlValue::Real(f) => Some(*f),
                _ => None,
            })
            .collect();
        Column::new(name.into(), floats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filings_core::BatchPurpose;
    use filings_stage::InMemoryObjectStore;

    fn warehouse() -> SqliteWarehouse {
        SqliteWarehouse::in_memory(WarehouseConfig::default()).unwrap()
    }

    async fn staged_store() -> InMemoryObjectStore {
        let store = InMemoryObjectStore::new("staging");
        store
            .put(
                "raw/20240101/companyfacts.ndjson",
                br#"{"cik":"0000320193","ticker":"AAPL","concept":"us-gaap:Revenues","period_end_date":"2023-12-30","val":119575000000}
{"cik":"0000320193","ticker":"AAPL","concept":"us-gaap:EarningsPerShareBasic","period_end_date":"2023-12-30","val":2.19}
"#
                .to_vec(),
            )
            .await
            .unwrap();
        store
            .put(
                "raw/20240102/companyfacts.ndjson",
                br#"{"cik":"0000789019","ticker":"MSFT","concept":"us-gaap:Revenues","period_end_date":"2023-12-31","val":62020000000,"fy":2024}
"#
                .to_vec(),
            )
            .await
            .unwrap();
        store
            .put(
                "raw/20240102/submissions.ndjson",
                br#"{"cik":"0000789019","form":"10-Q"}
"#
                .to_vec(),
            )
            .await
            .unwrap();
        store
    }

    #[test]
    fn test_key_matching() {
        let pattern = BatchPurpose::CompanyFacts.all_dates_pattern();
        assert!(key_matches(&pattern, "raw/20240101/companyfacts.ndjson"));
        assert!(!key_matches(&pattern, "raw/20240101/submissions.ndjson"));
        assert!(!key_matches(&pattern, "raw/a/b/companyfacts.ndjson"));
        assert!(key_matches("raw/2024*/c*.ndjson", "raw/20240101/companyfacts.ndjson"));
        assert!(key_matches("raw/*", "raw/"));
        assert!(!key_matches("raw/2023*/x", "raw/20240101/x"));
    }

    #[tokio::test]
    async fn test_load_appends_all_matching_dates() {
        let warehouse = warehouse();
        let store = staged_store().await;
        let table = BatchPurpose::CompanyFacts.raw_table();

        let job = warehouse
            .load_ndjson(
                &store,
                table,
                &BatchPurpose::CompanyFacts.all_dates_pattern(),
                &LoadOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(job.rows_loaded, 3);
        assert_eq!(job.location, "US");
        assert_eq!(
            job.destination,
            "sec-edgar-financials-warehouse.sec_raw.raw_companyfacts"
        );
        assert_eq!(
            job.source_uris,
            vec![
                "mem://staging/raw/20240101/companyfacts.ndjson".to_string(),
                "mem://staging/raw/20240102/companyfacts.ndjson".to_string(),
            ]
        );
        assert_eq!(warehouse.row_count("sec_raw", table).unwrap(), 3);
        assert_eq!(
            warehouse.columns("sec_raw", table).unwrap(),
            vec!["cik", "ticker", "concept", "period_end_date", "val", "fy"]
        );

        // Append mode: loading again duplicates rather than replaces.
        warehouse
            .load_ndjson(&store, table, "raw/20240102/companyfacts.ndjson", &LoadOptions::default())
            .await
            .unwrap();
        assert_eq!(warehouse.row_count("sec_raw", table).unwrap(), 4);
    }

    #[tokio::test]
    async fn test_later_loads_add_columns() {
        let warehouse = warehouse();
        let store = InMemoryObjectStore::new("staging");
        store
            .put("raw/20240101/submissions.ndjson", b"{\"cik\":\"1\"}\n".to_vec())
            .await
            .unwrap();
        store
            .put(
                "raw/20240102/submissions.ndjson",
                b"{\"cik\":\"2\",\"form\":\"10-K\"}\n".to_vec(),
            )
            .await
            .unwrap();

        for key in ["raw/20240101/submissions.ndjson", "raw/20240102/submissions.ndjson"] {
            warehouse
                .load_ndjson(&store, "raw_submissions", key, &LoadOptions::default())
                .await
                .unwrap();
        }

        assert_eq!(
            warehouse.columns("sec_raw", "raw_submissions").unwrap(),
            vec!["cik", "form"]
        );
        let df = warehouse
            .query_frame("SELECT cik, form FROM sec_raw.raw_submissions ORDER BY cik", [])
            .unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("form").unwrap().null_count(), 1);
    }

    #[tokio::test]
    async fn test_no_matching_objects_is_an_error() {
        let warehouse = warehouse();
        let store = InMemoryObjectStore::new("staging");
        let err = warehouse
            .load_ndjson(&store, "raw_companyfacts", "raw/*/companyfacts.ndjson", &LoadOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FilingsError::Storage(_)));
    }

    #[tokio::test]
    async fn test_non_object_lines_are_rejected() {
        let warehouse = warehouse();
        let store = InMemoryObjectStore::new("staging");
        store.put("raw/1/x.ndjson", b"[1,2]\n".to_vec()).await.unwrap();
        let err = warehouse
            .load_ndjson(&store, "t", "raw/1/x.ndjson", &LoadOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FilingsError::Parse(_)));
        assert!(warehouse.columns("sec_raw", "t").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_partition_field_creates_index() {
        let warehouse = warehouse();
        let store = staged_store().await;
        let options = LoadOptions::default().with_partition_field("period_end_date");

        warehouse
            .load_ndjson(&store, "raw_companyfacts", "raw/*/companyfacts.ndjson", &options)
            .await
            .unwrap();

        let df = warehouse
            .query_frame(
                "SELECT name FROM sec_raw.sqlite_master WHERE type = 'index'",
                [],
            )
            .unwrap();
        assert_eq!(df.height(), 1);
    }

    #[tokio::test]
    async fn test_partition_field_must_exist_and_hold_dates() {
        let warehouse = warehouse();
        let store = staged_store().await;

        let missing = warehouse
            .load_ndjson(
                &store,
                "raw_companyfacts",
                "raw/*/companyfacts.ndjson",
                &LoadOptions::default().with_partition_field("load_date"),
            )
            .await
            .unwrap_err();
        assert!(matches!(missing, FilingsError::InvalidParameter(_)));

        let not_dates = warehouse
            .load_ndjson(
                &store,
                "raw_companyfacts",
                "raw/*/companyfacts.ndjson",
                &LoadOptions::default().with_partition_field("ticker"),
            )
            .await
            .unwrap_err();
        assert!(matches!(not_dates, FilingsError::InvalidParameter(_)));
        assert!(warehouse.columns("sec_raw", "raw_companyfacts").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_on_disk_warehouse_persists() {
        let dir = tempfile::tempdir().unwrap();
        let config = WarehouseConfig {
            root: dir.path().to_path_buf(),
            ..WarehouseConfig::default()
        };
        let store = staged_store().await;

        {
            let warehouse = SqliteWarehouse::open(config.clone()).unwrap();
            warehouse
                .load_ndjson(&store, "raw_submissions", "raw/*/submissions.ndjson", &LoadOptions::default())
                .await
                .unwrap();
        }

        assert!(dir.path().join("sec-edgar-financials-warehouse.sqlite").exists());
        assert!(
            dir.path()
                .join("sec-edgar-financials-warehouse")
                .join("sec_raw.sqlite")
                .exists()
        );

        let reopened = SqliteWarehouse::open(config).unwrap();
        assert_eq!(reopened.row_count("sec_raw", "raw_submissions").unwrap(), 1);
    }

    #[test]
    fn test_query_frame_column_types() {
        let warehouse = warehouse();
        warehouse
            .execute_batch(
                "CREATE TABLE sec_raw.t (i INTEGER, r REAL, mixed REAL, s TEXT);
                 INSERT INTO sec_raw.t VALUES (1, 1.5, 2, 'a'), (NULL, 2.5, 2.5, NULL);",
            )
            .unwrap();

        let df = warehouse.query_frame("SELECT * FROM sec_raw.t", []).unwrap();
        assert_eq!(df.column("i").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("r").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("mixed").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("s").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("i").unwrap().null_count(), 1);
    }

    #[test]
    fn test_rejects_path_like_names() {
        let config = WarehouseConfig {
            raw_dataset: "../escape".to_string(),
            ..WarehouseConfig::default()
        };
        assert!(matches!(
            SqliteWarehouse::in_memory(config),
            Err(FilingsError::Config(_))
        ));
    }
}
