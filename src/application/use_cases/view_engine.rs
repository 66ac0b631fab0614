use chrono::{Duration, NaiveDate};

use crate::domain::epidemic::CanonicalTable;
use crate::domain::views::{
    ChartKind, ChartSpec, DailyIncrease, DailyIncreasePoint, FilterParams, RiskAreas,
    SeriesStyle, Trend, TrendPoint,
};

pub const DEFAULT_WINDOW_DAYS: i64 = 30;
pub const DEFAULT_THRESHOLD: u64 = 1000;

const RISK_ROW_HEIGHT: u32 = 30;
const MIN_CHART_HEIGHT: u32 = 400;

pub fn trend(table: &CanonicalTable) -> Trend {
    Trend {
        points: table
            .rows()
            .iter()
            .map(|row| TrendPoint {
                date: row.date.clone(),
                confirmed_count: row.confirmed_count,
                current_confirmed_count: row.current_confirmed_count,
                dead_count: row.dead_count,
            })
            .collect(),
    }
}

pub fn daily_increase(table: &CanonicalTable) -> DailyIncrease {
    DailyIncrease {
        points: table
            .rows()
            .iter()
            .map(|row| DailyIncreasePoint {
                date: row.date.clone(),
                confirmed_incr: row.confirmed_incr,
            })
            .collect(),
    }
}

/// Rows with `currentConfirmedCount > threshold`, ascending by that count.
pub fn risk_areas(table: &CanonicalTable, threshold: u64) -> RiskAreas {
    let mut rows: Vec<_> = table
        .rows()
        .iter()
        .filter(|row| i128::from(row.current_confirmed_count) > i128::from(threshold))
        .cloned()
        .collect();
    rows.sort_by_key(|row| row.current_confirmed_count);
    RiskAreas { threshold, rows }
}

/// Inclusive on both ends; `start > end` gives an empty table.
pub fn filter_by_date_range(
    table: &CanonicalTable,
    start: NaiveDate,
    end: NaiveDate,
) -> CanonicalTable {
    if start > end {
        return CanonicalTable::empty(table.dimension());
    }
    table.retain_rows(|row| {
        row.date
            .as_date()
            .map(|date| date >= start && date <= end)
            .unwrap_or(false)
    })
}

/// Last 30 days up to the newest date, threshold 1000 capped at the table max.
/// `None` when the table has no valid date.
pub fn default_filter(table: &CanonicalTable) -> Option<FilterParams> {
    let end = table.max_date()?;
    let start = end - Duration::days(DEFAULT_WINDOW_DAYS);
    let max_current = table
        .rows()
        .iter()
        .map(|row| row.current_confirmed_count.max(0) as u64)
        .max()
        .unwrap_or(0);
    Some(FilterParams {
        start,
        end,
        threshold: DEFAULT_THRESHOLD.min(max_current),
    })
}

pub fn trend_chart() -> ChartSpec {
    ChartSpec {
        kind: ChartKind::Line,
        title: "Epidemic Trend".to_string(),
        x_title: "Date",
        y_title: "Cases",
        series: vec![
            SeriesStyle {
                field: "confirmedCount",
                label: "Cumulative confirmed",
                color: "#FF4B4B",
                fill_to_next: false,
            },
            SeriesStyle {
                field: "currentConfirmedCount",
                label: "Current confirmed",
                color: "#36A2EB",
                fill_to_next: true,
            },
            SeriesStyle {
                field: "deadCount",
                label: "Cumulative deaths",
                color: "#4B4B4B",
                fill_to_next: false,
            },
        ],
        height: MIN_CHART_HEIGHT,
    }
}

pub fn daily_increase_chart() -> ChartSpec {
    ChartSpec {
        kind: ChartKind::Bar,
        title: "Daily New Cases".to_string(),
        x_title: "Date",
        y_title: "New cases",
        series: vec![SeriesStyle {
            field: "confirmedIncr",
            label: "New confirmed",
            color: "#FF4B4B",
            fill_to_next: false,
        }],
        height: MIN_CHART_HEIGHT,
    }
}

/// Horizontal bars; `None` when there is nothing to draw.
pub fn risk_chart(risk: &RiskAreas) -> Option<ChartSpec> {
    if risk.is_empty() {
        return None;
    }
    let rows = u32::try_from(risk.rows.len()).unwrap_or(u32::MAX);
    Some(ChartSpec {
        kind: ChartKind::HorizontalBar,
        title: format!("High-risk dates (current confirmed > {})", risk.threshold),
        x_title: "Current confirmed",
        y_title: "Date",
        series: vec![SeriesStyle {
            field: "currentConfirmedCount",
            label: "Current confirmed",
            color: "#FF4B4B",
            fill_to_next: false,
        }],
        height: MIN_CHART_HEIGHT.max(rows.saturating_mul(RISK_ROW_HEIGHT)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::epidemic::{CanonicalRow, RowDate};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(date: NaiveDate, confirmed: i64, current: i64, dead: i64, incr: i64) -> CanonicalRow {
        let mut row = CanonicalRow::new(RowDate::Valid(date));
        row.confirmed_count = confirmed;
        row.current_confirmed_count = current;
        row.dead_count = dead;
        row.confirmed_incr = incr;
        row
    }

    fn scenario() -> CanonicalTable {
        CanonicalTable::new(
            vec![
                row(ymd(2020, 1, 1), 10, 8, 0, 10),
                row(ymd(2020, 1, 2), 15, 12, 1, 5),
            ],
            None,
        )
    }

    #[test]
    fn test_trend_series() {
        let trend = trend(&scenario());
        assert_eq!(trend.confirmed(), vec![10, 15]);
        assert_eq!(
            trend.dates(),
            vec![RowDate::Valid(ymd(2020, 1, 1)), RowDate::Valid(ymd(2020, 1, 2))]
        );
        assert_eq!(trend.points[1].current_confirmed_count, 12);
        assert_eq!(trend.points[1].dead_count, 1);
    }

    #[test]
    fn test_daily_increase_series() {
        let daily = daily_increase(&scenario());
        let incr: Vec<_> = daily.points.iter().map(|p| p.confirmed_incr).collect();
        assert_eq!(incr, vec![10, 5]);
    }

    #[test]
    fn test_risk_areas_strict_threshold() {
        let table = scenario();
        let risk = risk_areas(&table, 10);
        assert_eq!(risk.rows.len(), 1);
        assert_eq!(risk.rows[0].date, RowDate::Valid(ymd(2020, 1, 2)));

        let none = risk_areas(&table, 12);
        assert!(none.is_empty());
        assert_eq!(none.threshold, 12);
    }

    #[test]
    fn test_risk_areas_sorted_ascending() {
        let table = CanonicalTable::new(
            vec![
                row(ymd(2020, 1, 1), 0, 50, 0, 0),
                row(ymd(2020, 1, 2), 0, 20, 0, 0),
                row(ymd(2020, 1, 3), 0, 5, 0, 0),
                row(ymd(2020, 1, 4), 0, 35, 0, 0),
            ],
            None,
        );
        let risk = risk_areas(&table, 5);
        let counts: Vec<_> = risk.rows.iter().map(|r| r.current_confirmed_count).collect();
        assert_eq!(counts, vec![20, 35, 50]);
        assert!(risk.rows.iter().all(|r| r.current_confirmed_count > 5));
    }

    #[test]
    fn test_filter_by_date_range_edges() {
        let table = scenario();
        assert!(filter_by_date_range(&table, ymd(2020, 1, 2), ymd(2020, 1, 1)).is_empty());

        let single = filter_by_date_range(&table, ymd(2020, 1, 2), ymd(2020, 1, 2));
        assert_eq!(single.len(), 1);
        assert_eq!(single.rows()[0].confirmed_count, 15);

        let all = filter_by_date_range(&table, ymd(2019, 12, 1), ymd(2020, 2, 1));
        assert_eq!(all, table);
    }

    #[test]
    fn test_filter_skips_unparseable_dates() {
        let mut rows = scenario().into_rows();
        rows.push(CanonicalRow::new(RowDate::Unparseable("bad".to_string())));
        let table = CanonicalTable::new(rows, None);
        let filtered = filter_by_date_range(&table, ymd(2000, 1, 1), ymd(2100, 1, 1));
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_default_filter() {
        let params = default_filter(&scenario()).unwrap();
        assert_eq!(params.end, ymd(2020, 1, 2));
        assert_eq!(params.start, ymd(2019, 12, 3));
        assert_eq!(params.threshold, 12);

        assert!(default_filter(&CanonicalTable::empty(None)).is_none());
    }

    #[test]
    fn test_risk_chart_height() {
        assert!(risk_chart(&risk_areas(&scenario(), 100)).is_none());

        let rows: Vec<_> = (1..=20)
            .map(|d| row(ymd(2020, 1, d), 0, 100 + d as i64, 0, 0))
            .collect();
        let risk = risk_areas(&CanonicalTable::new(rows, None), 0);
        let chart = risk_chart(&risk).unwrap();
        assert_eq!(chart.height, 600);
        assert_eq!(chart.kind, ChartKind::HorizontalBar);
    }
}
