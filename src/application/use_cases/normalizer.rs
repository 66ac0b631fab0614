//! Raw input → [`CanonicalTable`].
//!
//! Two entry points: CSV upload bytes, and rows read back from the store.
//! Counts are coerced best-effort (integer, then truncated finite float,
//! otherwise 0).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::epidemic::{CanonicalRow, CanonicalTable, CountField, Dimension, RowDate};
use crate::domain::error::{AppError, Result};
use crate::domain::schema::DATE_COLUMN;
use crate::infrastructure::csv::CsvParser;

/// What to do with a store date that cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatePolicy {
    /// Keep the row with an unparseable marker.
    #[default]
    Lenient,
    /// Fail the whole read with `ParseError`.
    Strict,
}

/// A row as the store hands it back, before date normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreRow {
    pub date: Option<String>,
    /// Indexed like [`CountField::ALL`]; `None` for SQL NULL.
    pub counts: [Option<i64>; 10],
    pub label: Option<String>,
}

/// Parse an 8-digit `YYYYMMDD` date.
pub fn parse_date_id(value: &str) -> Result<NaiveDate> {
    let value = value.trim();
    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::ParseError(format!(
            "dateId '{}' is not an 8-digit YYYYMMDD date",
            value
        )));
    }
    NaiveDate::parse_from_str(value, "%Y%m%d")
        .map_err(|e| AppError::ParseError(format!("dateId '{}' is not a valid date: {}", value, e)))
}

pub fn format_date_id(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Accepts `YYYY-MM-DD` or `YYYYMMDD`.
pub fn parse_store_date(value: &str) -> Result<NaiveDate> {
    parse_date_id(&value.trim().replace('-', ""))
}

pub fn coerce_count(value: Option<&str>) -> i64 {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return 0;
    };
    if let Ok(n) = raw.parse::<i64>() {
        return n;
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() => f.trunc() as i64,
        _ => 0,
    }
}

/// Parse uploaded CSV bytes. `dateId` is required and must be `YYYYMMDD`.
pub fn from_upload(bytes: &[u8]) -> Result<CanonicalTable> {
    let doc = CsvParser::auto_detect(bytes).parse_bytes(bytes)?;

    if !doc.has_column(DATE_COLUMN) {
        return Err(AppError::ParseError(format!(
            "CSV is missing the '{}' column",
            DATE_COLUMN
        )));
    }

    let dimension = [Dimension::Province, Dimension::Country]
        .into_iter()
        .find(|d| doc.has_column(d.column_name()));

    let mut rows = Vec::with_capacity(doc.records().len());
    for (idx, record) in doc.records().iter().enumerate() {
        let raw_date = doc.field(record, DATE_COLUMN).unwrap_or("");
        let date = parse_date_id(raw_date)
            .map_err(|e| AppError::ParseError(format!("row {}: {}", idx + 1, e)))?;

        let mut row = CanonicalRow::new(RowDate::Valid(date));
        for field in CountField::ALL {
            row.set_count(field, coerce_count(doc.field(record, field.column_name())));
        }
        if let Some(dimension) = dimension {
            let label = doc
                .field(record, dimension.column_name())
                .filter(|v| !v.is_empty())
                .map(str::to_string);
            row.set_dimension_value(dimension, label);
        }
        rows.push(row);
    }

    tracing::debug!(rows = rows.len(), ?dimension, "Parsed CSV upload");
    Ok(CanonicalTable::new(rows, dimension))
}

/// Normalize rows read from the store.
pub fn from_store_rows(
    rows: Vec<StoreRow>,
    dimension: Option<Dimension>,
    policy: DatePolicy,
) -> Result<CanonicalTable> {
    let mut out = Vec::with_capacity(rows.len());
    let mut unparseable = 0usize;

    for store_row in rows {
        let raw = store_row.date.unwrap_or_default();
        let date = match parse_store_date(&raw) {
            Ok(date) => RowDate::Valid(date),
            Err(e) => match policy {
                DatePolicy::Strict => return Err(e),
                DatePolicy::Lenient => {
                    unparseable += 1;
                    RowDate::Unparseable(raw)
                }
            },
        };

        let mut row = CanonicalRow::new(date);
        for (field, value) in CountField::ALL.iter().zip(store_row.counts) {
            row.set_count(*field, value.unwrap_or(0));
        }
        if let Some(dimension) = dimension {
            row.set_dimension_value(dimension, store_row.label);
        }
        out.push(row);
    }

    if unparseable > 0 {
        tracing::warn!(unparseable, "Store rows with unparseable dates kept as sentinel");
    }

    Ok(CanonicalTable::new(out, dimension))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_date_id_round_trip() {
        for raw in ["20200101", "20201231", "19991231", "20240229"] {
            let date = parse_date_id(raw).unwrap();
            assert_eq!(format_date_id(date), raw);
        }
    }

    #[test]
    fn test_date_id_rejects_bad_shapes() {
        for raw in ["2020-01-01", "2020011", "202001011", "20201301", "abcdefgh", ""] {
            assert!(matches!(parse_date_id(raw), Err(AppError::ParseError(_))), "{}", raw);
        }
    }

    #[test]
    fn test_store_date_accepts_both_forms() {
        assert_eq!(parse_store_date("2020-01-02").unwrap(), ymd(2020, 1, 2));
        assert_eq!(parse_store_date("20200102").unwrap(), ymd(2020, 1, 2));
    }

    #[test]
    fn test_coerce_count() {
        assert_eq!(coerce_count(Some("42")), 42);
        assert_eq!(coerce_count(Some(" 7 ")), 7);
        assert_eq!(coerce_count(Some("12.9")), 12);
        assert_eq!(coerce_count(Some("-3")), -3);
        assert_eq!(coerce_count(Some("n/a")), 0);
        assert_eq!(coerce_count(Some("NaN")), 0);
        assert_eq!(coerce_count(Some("")), 0);
        assert_eq!(coerce_count(None), 0);
    }

    #[test]
    fn test_from_upload_sorts_and_coerces() {
        let csv = "dateId,confirmedCount,currentConfirmedCount,deadCount,confirmedIncr\n\
                   20200102,15,12,1,5\n\
                   20200101,10,8,,10\n";
        let table = from_upload(csv.as_bytes()).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.dimension(), None);
        let first = &table.rows()[0];
        assert_eq!(first.date, RowDate::Valid(ymd(2020, 1, 1)));
        assert_eq!(first.confirmed_count, 10);
        assert_eq!(first.dead_count, 0);
        assert_eq!(first.cured_count, 0);
        assert_eq!(table.rows()[1].current_confirmed_count, 12);
    }

    #[test]
    fn test_from_upload_keeps_province() {
        let csv = "provinceName,province,dateId,confirmedCount\nHubei Province,Hubei,20200101,5\n";
        let table = from_upload(csv.as_bytes()).unwrap();
        assert_eq!(table.dimension(), Some(Dimension::Province));
        assert_eq!(table.rows()[0].province.as_deref(), Some("Hubei"));
    }

    #[test]
    fn test_from_upload_errors() {
        assert!(matches!(
            from_upload(b"confirmedCount\n1\n"),
            Err(AppError::ParseError(_))
        ));
        assert!(matches!(
            from_upload(b"dateId,confirmedCount\n2020-01-01,1\n"),
            Err(AppError::ParseError(_))
        ));
        assert!(from_upload(b"dateId,confirmedCount\n").unwrap().is_empty());
    }

    #[test]
    fn test_from_store_rows_lenient_keeps_sentinel_last() {
        let rows = vec![
            StoreRow {
                date: Some("garbage".to_string()),
                ..Default::default()
            },
            StoreRow {
                date: Some("2020-01-02".to_string()),
                counts: [Some(15), None, None, None, Some(12), None, Some(1), None, None, None],
                label: None,
            },
            StoreRow {
                date: None,
                ..Default::default()
            },
            StoreRow {
                date: Some("20200101".to_string()),
                ..Default::default()
            },
        ];
        let table = from_store_rows(rows, None, DatePolicy::Lenient).unwrap();

        assert_eq!(table.len(), 4);
        assert_eq!(table.rows()[0].date, RowDate::Valid(ymd(2020, 1, 1)));
        assert_eq!(table.rows()[1].confirmed_count, 15);
        assert_eq!(table.rows()[1].current_confirmed_count, 12);
        assert_eq!(table.rows()[2].date, RowDate::Unparseable("garbage".to_string()));
        assert_eq!(table.rows()[3].date, RowDate::Unparseable(String::new()));
    }

    #[test]
    fn test_from_store_rows_strict_fails() {
        let rows = vec![StoreRow {
            date: Some("01/02/2020".to_string()),
            ..Default::default()
        }];
        assert!(matches!(
            from_store_rows(rows, None, DatePolicy::Strict),
            Err(AppError::ParseError(_))
        ));
    }

    #[test]
    fn test_from_store_rows_assigns_label_to_dimension() {
        let rows = vec![StoreRow {
            date: Some("2020-03-01".to_string()),
            label: Some("Italy".to_string()),
            ..Default::default()
        }];
        let table = from_store_rows(rows, Some(Dimension::Country), DatePolicy::Lenient).unwrap();
        assert_eq!(table.rows()[0].country.as_deref(), Some("Italy"));
        assert_eq!(table.rows()[0].province, None);
    }
}
