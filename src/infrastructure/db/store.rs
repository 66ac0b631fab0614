use chrono::NaiveDate;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{Sqlite, SqlitePool, SqliteRow};
use sqlx::{Connection, Row};

use crate::application::use_cases::normalizer::{self, DatePolicy, StoreRow};
use crate::application::use_cases::schema_registry;
use crate::domain::epidemic::{CanonicalTable, CountField};
use crate::domain::error::{AppError, Result};
use crate::domain::schema::{quote_identifier, Column, TableDescriptor, DATE_COLUMN};

/// Persistence for canonical tables, one SQLite table per source file.
///
/// Every operation takes its own connection from the pool and returns it on
/// drop, including on error paths.
pub struct StoreGateway {
    pool: SqlitePool,
    date_policy: DatePolicy,
}

impl StoreGateway {
    pub fn new(pool: SqlitePool, date_policy: DatePolicy) -> Self {
        Self { pool, date_policy }
    }

    async fn acquire(&self) -> Result<PoolConnection<Sqlite>> {
        self.pool
            .acquire()
            .await
            .map_err(|e| AppError::StoreError(format!("Failed to acquire connection: {}", e)))
    }

    /// Create the table for `filename` if absent and return its descriptor.
    ///
    /// An existing table keeps the schema it was created with.
    pub async fn ensure_table(&self, filename: &str) -> Result<TableDescriptor> {
        let wanted = schema_registry::descriptor_for(filename)?;
        {
            let mut conn = self.acquire().await?;
            let sql = format!(
                "CREATE TABLE IF NOT EXISTS {} ({})",
                wanted.quoted(),
                wanted.schema.ddl()
            );
            sqlx::query(&sql).execute(&mut *conn).await.map_err(|e| {
                AppError::StoreError(format!(
                    "Failed to create table {}: {}",
                    wanted.identifier, e
                ))
            })?;
        }

        let actual = self.describe(&wanted.identifier).await?;
        if actual.schema != wanted.schema {
            tracing::warn!(
                table = %actual.identifier,
                existing = ?actual.schema.dimension,
                requested = ?wanted.schema.dimension,
                "Table already exists with a different dimension; keeping existing schema"
            );
        }
        Ok(actual)
    }

    /// Inspect an existing table's columns.
    pub async fn describe(&self, identifier: &str) -> Result<TableDescriptor> {
        if identifier.is_empty() {
            return Err(AppError::ValidationError(
                "Table identifier must not be empty".to_string(),
            ));
        }

        let mut conn = self.acquire().await?;
        let pragma = format!("PRAGMA table_info({})", quote_identifier(identifier));
        let rows = sqlx::query(&pragma)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| AppError::StoreError(format!("Failed to inspect {}: {}", identifier, e)))?;

        let mut names = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.try_get("name").map_err(|e| {
                AppError::StoreError(format!("Failed to read {} schema: {}", identifier, e))
            })?;
            names.push(name);
        }

        if names.is_empty() {
            return Err(AppError::StoreError(format!(
                "Table '{}' does not exist",
                identifier
            )));
        }
        if !names.iter().any(|n| n == DATE_COLUMN) {
            return Err(AppError::StoreError(format!(
                "Table '{}' has no {} column",
                identifier, DATE_COLUMN
            )));
        }

        let schema = schema_registry::dimension_from_columns(names.iter().map(String::as_str));
        Ok(TableDescriptor::new(identifier.to_string(), schema))
    }

    /// Truncate the table and insert every row of `table`.
    ///
    /// Only columns declared by the descriptor's schema are written. The
    /// delete and the inserts share one transaction.
    pub async fn replace_all(
        &self,
        descriptor: &TableDescriptor,
        table: &CanonicalTable,
    ) -> Result<u64> {
        let columns = descriptor.schema.columns();
        let column_list = columns
            .iter()
            .map(|c| quote_identifier(c.name()))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; columns.len()].join(", ");
        let insert_sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            descriptor.quoted(),
            column_list,
            placeholders
        );

        let mut conn = self.acquire().await?;
        let mut tx = conn
            .begin()
            .await
            .map_err(|e| AppError::StoreError(format!("Failed to begin transaction: {}", e)))?;

        sqlx::query(&format!("DELETE FROM {}", descriptor.quoted()))
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::StoreError(format!(
                    "Failed to truncate {}: {}",
                    descriptor.identifier, e
                ))
            })?;

        // Restart the surrogate key like TRUNCATE would.
        sqlx::query("DELETE FROM sqlite_sequence WHERE name = ?")
            .bind(&descriptor.identifier)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::StoreError(format!(
                    "Failed to reset id sequence for {}: {}",
                    descriptor.identifier, e
                ))
            })?;

        let mut affected: u64 = 0;
        for row in table.rows() {
            let mut query = sqlx::query(&insert_sql);
            for column in &columns {
                query = match column {
                    Column::Count(field) => query.bind(row.count(*field)),
                    Column::Date => query.bind(row.date.as_date()),
                    Column::Dimension(dimension) => {
                        query.bind(row.dimension_value(*dimension).map(str::to_string))
                    }
                };
            }
            let res = query.execute(&mut *tx).await.map_err(|e| {
                AppError::StoreError(format!(
                    "Failed to insert into {}: {}",
                    descriptor.identifier, e
                ))
            })?;
            affected += res.rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| AppError::StoreError(format!("Failed to commit transaction: {}", e)))?;

        tracing::info!(table = %descriptor.identifier, rows = affected, "Replaced table contents");
        Ok(affected)
    }

    /// All rows of `identifier`, optionally within an inclusive date range,
    /// ascending by date.
    pub async fn fetch(
        &self,
        identifier: &str,
        date_range: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<CanonicalTable> {
        let descriptor = self.describe(identifier).await?;
        let dimension = descriptor.schema.dimension;

        let mut select = CountField::ALL
            .iter()
            .map(|f| quote_identifier(f.column_name()))
            .collect::<Vec<_>>();
        select.push(format!(
            "CAST({col} AS TEXT) AS {col}",
            col = quote_identifier(DATE_COLUMN)
        ));
        if let Some(dimension) = dimension {
            select.push(quote_identifier(dimension.column_name()));
        }

        let mut sql = format!("SELECT {} FROM {}", select.join(", "), descriptor.quoted());
        if date_range.is_some() {
            sql.push_str(&format!(
                " WHERE {} BETWEEN ? AND ?",
                quote_identifier(DATE_COLUMN)
            ));
        }
        sql.push_str(&format!(" ORDER BY {}", quote_identifier(DATE_COLUMN)));

        let mut query = sqlx::query(&sql);
        if let Some((start, end)) = date_range {
            query = query.bind(start).bind(end);
        }

        let rows = {
            let mut conn = self.acquire().await?;
            query.fetch_all(&mut *conn).await.map_err(|e| {
                AppError::StoreError(format!("Failed to query {}: {}", identifier, e))
            })?
        };

        let store_rows = rows
            .iter()
            .map(|row| read_store_row(row, dimension.map(|d| d.column_name())))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(table = %identifier, rows = store_rows.len(), "Fetched table");
        normalizer::from_store_rows(store_rows, dimension, self.date_policy)
    }

    /// User tables in the store, ordered by name.
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        let mut conn = self.acquire().await?;
        sqlx::query_scalar::<_, String>(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| AppError::StoreError(format!("Failed to list tables: {}", e)))
    }
}

fn read_store_row(row: &SqliteRow, label_column: Option<&str>) -> Result<StoreRow> {
    let read_err = |e: sqlx::Error| AppError::StoreError(format!("Failed to read row: {}", e));

    let mut counts = [None; 10];
    for (slot, field) in counts.iter_mut().zip(CountField::ALL) {
        *slot = row
            .try_get::<Option<i64>, _>(field.column_name())
            .map_err(read_err)?;
    }
    let date = row.try_get::<Option<String>, _>(DATE_COLUMN).map_err(read_err)?;
    let label = match label_column {
        Some(column) => row.try_get::<Option<String>, _>(column).map_err(read_err)?,
        None => None,
    };

    Ok(StoreRow {
        date,
        counts,
        label,
    })
}
