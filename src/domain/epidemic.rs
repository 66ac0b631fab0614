// ============================================================
// EPIDEMIC TIME SERIES
// ============================================================
// Canonical in-memory representation of one data source

use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// The ten integer count columns, in storage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountField {
    ConfirmedCount,
    ConfirmedIncr,
    CuredCount,
    CuredIncr,
    CurrentConfirmedCount,
    CurrentConfirmedIncr,
    DeadCount,
    DeadIncr,
    SuspectedCount,
    SuspectedCountIncr,
}

impl CountField {
    pub const ALL: [CountField; 10] = [
        CountField::ConfirmedCount,
        CountField::ConfirmedIncr,
        CountField::CuredCount,
        CountField::CuredIncr,
        CountField::CurrentConfirmedCount,
        CountField::CurrentConfirmedIncr,
        CountField::DeadCount,
        CountField::DeadIncr,
        CountField::SuspectedCount,
        CountField::SuspectedCountIncr,
    ];

    /// Column / CSV header name.
    pub fn column_name(&self) -> &'static str {
        match self {
            CountField::ConfirmedCount => "confirmedCount",
            CountField::ConfirmedIncr => "confirmedIncr",
            CountField::CuredCount => "curedCount",
            CountField::CuredIncr => "curedIncr",
            CountField::CurrentConfirmedCount => "currentConfirmedCount",
            CountField::CurrentConfirmedIncr => "currentConfirmedIncr",
            CountField::DeadCount => "deadCount",
            CountField::DeadIncr => "deadIncr",
            CountField::SuspectedCount => "suspectedCount",
            CountField::SuspectedCountIncr => "suspectedCountIncr",
        }
    }
}

/// Optional scoping dimension carried by provincial / country tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Province,
    Country,
}

impl Dimension {
    pub fn column_name(&self) -> &'static str {
        match self {
            Dimension::Province => "province",
            Dimension::Country => "country",
        }
    }

    pub fn sql_type(&self) -> &'static str {
        match self {
            Dimension::Province => "VARCHAR(50)",
            Dimension::Country => "VARCHAR(100)",
        }
    }
}

/// Date of an observation.
///
/// Rows read back from the store may carry text that is not a date; under the
/// lenient policy those keep their raw text and sort after every valid date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowDate {
    Valid(NaiveDate),
    Unparseable(String),
}

impl RowDate {
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            RowDate::Valid(date) => Some(*date),
            RowDate::Unparseable(_) => None,
        }
    }

    /// Ordering used by the table sort: valid dates ascending, unparseable last.
    /// Unparseable entries compare equal so a stable sort keeps their input order.
    pub fn sort_cmp(&self, other: &RowDate) -> Ordering {
        match (self, other) {
            (RowDate::Valid(a), RowDate::Valid(b)) => a.cmp(b),
            (RowDate::Valid(_), RowDate::Unparseable(_)) => Ordering::Less,
            (RowDate::Unparseable(_), RowDate::Valid(_)) => Ordering::Greater,
            (RowDate::Unparseable(_), RowDate::Unparseable(_)) => Ordering::Equal,
        }
    }
}

impl fmt::Display for RowDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowDate::Valid(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            RowDate::Unparseable(_) => Ok(()),
        }
    }
}

impl Serialize for RowDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RowDate::Valid(date) => serializer.serialize_str(&date.format("%Y-%m-%d").to_string()),
            RowDate::Unparseable(_) => serializer.serialize_none(),
        }
    }
}

/// One observation for one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRow {
    #[serde(rename = "dateId")]
    pub date: RowDate,
    pub confirmed_count: i64,
    pub confirmed_incr: i64,
    pub cured_count: i64,
    pub cured_incr: i64,
    pub current_confirmed_count: i64,
    pub current_confirmed_incr: i64,
    pub dead_count: i64,
    pub dead_incr: i64,
    pub suspected_count: i64,
    pub suspected_count_incr: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl CanonicalRow {
    /// Row with every count zero-filled.
    pub fn new(date: RowDate) -> Self {
        Self {
            date,
            confirmed_count: 0,
            confirmed_incr: 0,
            cured_count: 0,
            cured_incr: 0,
            current_confirmed_count: 0,
            current_confirmed_incr: 0,
            dead_count: 0,
            dead_incr: 0,
            suspected_count: 0,
            suspected_count_incr: 0,
            province: None,
            country: None,
        }
    }

    pub fn count(&self, field: CountField) -> i64 {
        match field {
            CountField::ConfirmedCount => self.confirmed_count,
            CountField::ConfirmedIncr => self.confirmed_incr,
            CountField::CuredCount => self.cured_count,
            CountField::CuredIncr => self.cured_incr,
            CountField::CurrentConfirmedCount => self.current_confirmed_count,
            CountField::CurrentConfirmedIncr => self.current_confirmed_incr,
            CountField::DeadCount => self.dead_count,
            CountField::DeadIncr => self.dead_incr,
            CountField::SuspectedCount => self.suspected_count,
            CountField::SuspectedCountIncr => self.suspected_count_incr,
        }
    }

    pub fn set_count(&mut self, field: CountField, value: i64) {
        let slot = match field {
            CountField::ConfirmedCount => &mut self.confirmed_count,
            CountField::ConfirmedIncr => &mut self.confirmed_incr,
            CountField::CuredCount => &mut self.cured_count,
            CountField::CuredIncr => &mut self.cured_incr,
            CountField::CurrentConfirmedCount => &mut self.current_confirmed_count,
            CountField::CurrentConfirmedIncr => &mut self.current_confirmed_incr,
            CountField::DeadCount => &mut self.dead_count,
            CountField::DeadIncr => &mut self.dead_incr,
            CountField::SuspectedCount => &mut self.suspected_count,
            CountField::SuspectedCountIncr => &mut self.suspected_count_incr,
        };
        *slot = value;
    }

    pub fn dimension_value(&self, dimension: Dimension) -> Option<&str> {
        match dimension {
            Dimension::Province => self.province.as_deref(),
            Dimension::Country => self.country.as_deref(),
        }
    }

    pub fn set_dimension_value(&mut self, dimension: Dimension, value: Option<String>) {
        match dimension {
            Dimension::Province => self.province = value,
            Dimension::Country => self.country = value,
        }
    }
}

/// Rows of one source, sorted ascending by date.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CanonicalTable {
    rows: Vec<CanonicalRow>,
    dimension: Option<Dimension>,
}

impl CanonicalTable {
    /// Build a table, sorting the rows. Duplicate dates are kept.
    pub fn new(mut rows: Vec<CanonicalRow>, dimension: Option<Dimension>) -> Self {
        rows.sort_by(|a, b| a.date.sort_cmp(&b.date));
        Self { rows, dimension }
    }

    pub fn empty(dimension: Option<Dimension>) -> Self {
        Self {
            rows: Vec::new(),
            dimension,
        }
    }

    pub fn rows(&self) -> &[CanonicalRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<CanonicalRow> {
        self.rows
    }

    pub fn dimension(&self) -> Option<Dimension> {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Latest valid date, if any.
    pub fn max_date(&self) -> Option<NaiveDate> {
        self.rows.iter().filter_map(|r| r.date.as_date()).max()
    }

    /// Keep rows matching `predicate`, preserving order.
    pub fn retain_rows<F>(&self, mut predicate: F) -> CanonicalTable
    where
        F: FnMut(&CanonicalRow) -> bool,
    {
        CanonicalTable {
            rows: self.rows.iter().filter(|r| predicate(r)).cloned().collect(),
            dimension: self.dimension,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> RowDate {
        RowDate::Valid(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_new_sorts_with_unparseable_last() {
        let rows = vec![
            CanonicalRow::new(RowDate::Unparseable("bad-1".to_string())),
            CanonicalRow::new(date(2020, 1, 3)),
            CanonicalRow::new(RowDate::Unparseable("bad-2".to_string())),
            CanonicalRow::new(date(2020, 1, 1)),
        ];
        let table = CanonicalTable::new(rows, None);
        let dates: Vec<_> = table.rows().iter().map(|r| r.date.clone()).collect();
        assert_eq!(
            dates,
            vec![
                date(2020, 1, 1),
                date(2020, 1, 3),
                RowDate::Unparseable("bad-1".to_string()),
                RowDate::Unparseable("bad-2".to_string()),
            ]
        );
        assert_eq!(table.max_date(), NaiveDate::from_ymd_opt(2020, 1, 3));
    }

    #[test]
    fn test_count_accessors_cover_every_field() {
        let mut row = CanonicalRow::new(date(2020, 1, 1));
        for (i, field) in CountField::ALL.iter().enumerate() {
            row.set_count(*field, i as i64 + 1);
        }
        for (i, field) in CountField::ALL.iter().enumerate() {
            assert_eq!(row.count(*field), i as i64 + 1);
        }
    }

    #[test]
    fn test_row_serializes_with_column_names() {
        let mut row = CanonicalRow::new(date(2020, 1, 2));
        row.current_confirmed_count = 12;
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["dateId"], "2020-01-02");
        assert_eq!(json["currentConfirmedCount"], 12);
        assert!(json.get("province").is_none());

        let bad = CanonicalRow::new(RowDate::Unparseable("x".to_string()));
        let json = serde_json::to_value(&bad).unwrap();
        assert!(json["dateId"].is_null());
    }
}
