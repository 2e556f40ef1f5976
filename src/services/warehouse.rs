//! Warehouse Loader
//!
//! Writes shaped records into a `dataset.table` of the warehouse. The table
//! schema is inferred from the record type's columns and the table is created
//! when missing. The dataset (a Postgres schema) is never created here.

use async_trait::async_trait;
use sea_orm::sea_query::{Alias, ColumnDef, Query, SimpleExpr, Table, TableCreateStatement};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Value};
use std::fmt;
use tokio::sync::OnceCell;

use crate::credentials::ServiceAccount;
use crate::error::{PipelineError, PipelineResult};

/// Rows per INSERT statement; keeps the bind count under the Postgres limit.
const INSERT_CHUNK_ROWS: usize = 1000;

/// Fully qualified destination, `dataset.table`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub dataset: String,
    pub table: String,
}

impl TableRef {
    pub fn new(dataset: impl Into<String>, table: impl Into<String>) -> PipelineResult<Self> {
        let dataset = dataset.into();
        let table = table.into();

        for part in [&dataset, &table] {
            if !is_identifier(part) {
                return Err(PipelineError::Configuration(format!(
                    "Invalid warehouse identifier '{}'",
                    part
                )));
            }
        }

        Ok(Self { dataset, table })
    }

    pub fn parse(qualified: &str) -> PipelineResult<Self> {
        match qualified.trim().split_once('.') {
            Some((dataset, table)) => Self::new(dataset, table),
            None => Err(PipelineError::Configuration(format!(
                "Destination '{}' must look like dataset.table",
                qualified
            ))),
        }
    }

    fn iden(&self) -> (Alias, Alias) {
        (Alias::new(&self.dataset), Alias::new(&self.table))
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.dataset, self.table)
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !s.starts_with(|c: char| c.is_ascii_digit())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Double,
    TimestampTz,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self { name, kind }
    }
}

/// A row type the loader knows how to write.
pub trait WarehouseRecord {
    fn columns() -> Vec<ColumnSpec>;
    /// One value per column, in [`WarehouseRecord::columns`] order.
    fn values(&self) -> Vec<Value>;
}

/// Column-typed rows ready to be written.
#[derive(Debug, Clone)]
pub struct RecordBatch {
    columns: Vec<ColumnSpec>,
    rows: Vec<Vec<Value>>,
}

impl RecordBatch {
    pub fn from_records<R: WarehouseRecord>(records: &[R]) -> Self {
        Self {
            columns: R::columns(),
            rows: records.iter().map(WarehouseRecord::values).collect(),
        }
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Keep existing rows, create the table if it is missing.
    Append,
    /// Drop and re-create the table before writing.
    Replace,
}

#[async_trait]
pub trait WarehouseSink: Send + Sync {
    /// Write the batch and return the number of rows inserted.
    async fn write_batch(
        &self,
        destination: &TableRef,
        batch: RecordBatch,
        mode: LoadMode,
    ) -> PipelineResult<u64>;
}

/// Warehouse backed by a Postgres database reached through SeaORM.
#[derive(Clone)]
pub struct PostgresWarehouse {
    db: DatabaseConnection,
    identity: String,
}

impl PostgresWarehouse {
    /// Connect using the warehouse URL from the service account.
    pub async fn connect(account: &ServiceAccount) -> PipelineResult<Self> {
        tracing::info!(identity = account.identity(), "Connecting to warehouse...");

        let db = Database::connect(account.warehouse_url.as_str())
            .await
            .map_err(|e| {
                PipelineError::Persistence(format!(
                    "Failed to connect to warehouse as {}: {}",
                    account.identity(),
                    e
                ))
            })?;

        Ok(Self {
            db,
            identity: account.identity().to_string(),
        })
    }

    async fn execute<S>(&self, stmt: &S, destination: &TableRef) -> PipelineResult<u64>
    where
        S: sea_orm::StatementBuilder,
    {
        let backend = self.db.get_database_backend();
        let result = self.db.execute(backend.build(stmt)).await.map_err(|e| {
            PipelineError::Persistence(format!("Write to {} failed: {}", destination, e))
        })?;
        Ok(result.rows_affected())
    }
}

/// Warehouse that connects on its first write.
///
/// Jobs hold one of these while they extract, so an unreachable warehouse
/// only matters once there is something to load.
pub struct DeferredWarehouse {
    account: ServiceAccount,
    warehouse: OnceCell<PostgresWarehouse>,
}

impl DeferredWarehouse {
    pub fn new(account: ServiceAccount) -> Self {
        Self {
            account,
            warehouse: OnceCell::new(),
        }
    }

    pub fn identity(&self) -> &str {
        self.account.identity()
    }

    pub fn is_connected(&self) -> bool {
        self.warehouse.initialized()
    }
}

#[async_trait]
impl WarehouseSink for DeferredWarehouse {
    async fn write_batch(
        &self,
        destination: &TableRef,
        batch: RecordBatch,
        mode: LoadMode,
    ) -> PipelineResult<u64> {
        let warehouse = self
            .warehouse
            .get_or_try_init(|| PostgresWarehouse::connect(&self.account))
            .await?;
        warehouse.write_batch(destination, batch, mode).await
    }
}

/// CREATE TABLE for the batch's columns.
pub fn create_table_statement(
    destination: &TableRef,
    columns: &[ColumnSpec],
    if_not_exists: bool,
) -> TableCreateStatement {
    let mut stmt = Table::create();
    stmt.table(destination.iden());
    if if_not_exists {
        stmt.if_not_exists();
    }

    for column in columns {
        let mut def = ColumnDef::new(Alias::new(column.name));
        match column.kind {
            ColumnKind::Text => def.text(),
            ColumnKind::Double => def.double(),
            ColumnKind::TimestampTz => def.timestamp_with_time_zone(),
        };
        stmt.col(&mut def);
    }

    stmt
}

#[async_trait]
impl WarehouseSink for PostgresWarehouse {
    async fn write_batch(
        &self,
        destination: &TableRef,
        batch: RecordBatch,
        mode: LoadMode,
    ) -> PipelineResult<u64> {
        tracing::info!(
            destination = %destination,
            rows = batch.len(),
            mode = ?mode,
            identity = %self.identity,
            "Writing batch to warehouse"
        );

        if mode == LoadMode::Replace {
            let drop = Table::drop()
                .table(destination.iden())
                .if_exists()
                .to_owned();
            self.execute(&drop, destination).await?;
        }

        let create = create_table_statement(destination, batch.columns(), mode == LoadMode::Append);
        self.execute(&create, destination).await?;

        let mut inserted = 0u64;
        for chunk in batch.rows().chunks(INSERT_CHUNK_ROWS) {
            let mut insert = Query::insert();
            insert
                .into_table(destination.iden())
                .columns(batch.columns().iter().map(|c| Alias::new(c.name)));

            for row in chunk {
                insert
                    .values(row.iter().cloned().map(SimpleExpr::Value))
                    .map_err(|e| {
                        PipelineError::Persistence(format!(
                            "Row does not match the columns of {}: {}",
                            destination, e
                        ))
                    })?;
            }

            // earlier chunks stay written if this one fails
            inserted += self.execute(&insert, destination).await?;
            tracing::debug!(destination = %destination, inserted, "Chunk written");
        }

        tracing::info!(destination = %destination, inserted, "Warehouse write complete");

        Ok(inserted)
    }
}
