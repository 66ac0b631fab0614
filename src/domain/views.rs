use chrono::NaiveDate;
use serde::Serialize;

use super::epidemic::{CanonicalRow, RowDate};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    #[serde(rename = "dateId")]
    pub date: RowDate,
    pub confirmed_count: i64,
    pub current_confirmed_count: i64,
    pub dead_count: i64,
}

/// Cumulative confirmed, current confirmed and deaths, aligned by date.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Trend {
    pub points: Vec<TrendPoint>,
}

impl Trend {
    pub fn confirmed(&self) -> Vec<i64> {
        self.points.iter().map(|p| p.confirmed_count).collect()
    }

    pub fn dates(&self) -> Vec<RowDate> {
        self.points.iter().map(|p| p.date.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyIncreasePoint {
    #[serde(rename = "dateId")]
    pub date: RowDate,
    pub confirmed_incr: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DailyIncrease {
    pub points: Vec<DailyIncreasePoint>,
}

/// Rows above a current-confirmed threshold, ascending by that count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskAreas {
    pub threshold: u64,
    pub rows: Vec<CanonicalRow>,
}

impl RiskAreas {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Request-scoped filter chosen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FilterParams {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub threshold: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    HorizontalBar,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesStyle {
    pub field: &'static str,
    pub label: &'static str,
    pub color: &'static str,
    /// Fill down to the previous trace.
    pub fill_to_next: bool,
}

/// Style config handed to the chart renderer next to a tidy table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x_title: &'static str,
    pub y_title: &'static str,
    pub series: Vec<SeriesStyle>,
    pub height: u32,
}
