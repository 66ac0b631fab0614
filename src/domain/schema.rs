use serde::Serialize;

use super::epidemic::{CountField, Dimension};

pub const ID_COLUMN: &str = "id";
pub const DATE_COLUMN: &str = "dateId";

/// One persisted column, excluding the surrogate `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Count(CountField),
    Date,
    Dimension(Dimension),
}

impl Column {
    pub fn name(&self) -> &'static str {
        match self {
            Column::Count(field) => field.column_name(),
            Column::Date => DATE_COLUMN,
            Column::Dimension(dimension) => dimension.column_name(),
        }
    }

    pub fn sql_type(&self) -> &'static str {
        match self {
            Column::Count(_) => "INTEGER",
            Column::Date => "DATE",
            Column::Dimension(dimension) => dimension.sql_type(),
        }
    }
}

/// Typed storage schema: the base columns plus an optional dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnSchema {
    pub dimension: Option<Dimension>,
}

impl ColumnSchema {
    pub const BASE: ColumnSchema = ColumnSchema { dimension: None };

    pub fn with_dimension(dimension: Dimension) -> Self {
        Self {
            dimension: Some(dimension),
        }
    }

    /// Insertable columns in declaration order.
    pub fn columns(&self) -> Vec<Column> {
        let mut columns: Vec<Column> = CountField::ALL[..6]
            .iter()
            .map(|f| Column::Count(*f))
            .collect();
        columns.push(Column::Date);
        columns.extend(CountField::ALL[6..].iter().map(|f| Column::Count(*f)));
        if let Some(dimension) = self.dimension {
            columns.push(Column::Dimension(dimension));
        }
        columns
    }

    /// Column definitions for `CREATE TABLE`.
    pub fn ddl(&self) -> String {
        let mut defs = vec![format!("\"{}\" INTEGER PRIMARY KEY AUTOINCREMENT", ID_COLUMN)];
        defs.extend(
            self.columns()
                .iter()
                .map(|c| format!("\"{}\" {}", c.name(), c.sql_type())),
        );
        defs.join(", ")
    }
}

/// A sanitized table identifier and the schema it was created with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDescriptor {
    pub identifier: String,
    pub schema: ColumnSchema,
}

impl TableDescriptor {
    pub fn new(identifier: String, schema: ColumnSchema) -> Self {
        Self { identifier, schema }
    }

    /// Identifier quoted for use in SQL text.
    pub fn quoted(&self) -> String {
        quote_identifier(&self.identifier)
    }
}

pub fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}
