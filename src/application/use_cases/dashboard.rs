use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::application::use_cases::{normalizer, schema_registry, view_engine};
use crate::domain::epidemic::CanonicalTable;
use crate::domain::error::{AppError, Result};
use crate::domain::export::ExportWorkbook;
use crate::domain::schema::TableDescriptor;
use crate::domain::views::{ChartSpec, DailyIncrease, FilterParams, RiskAreas, Trend};
use crate::infrastructure::db::store::StoreGateway;
use crate::infrastructure::export::WorkbookWriter;

/// Filter values as the caller supplied them; gaps are filled from the table.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct FilterRequest {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub threshold: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub table: TableDescriptor,
    pub rows: u64,
    pub default_filter: Option<FilterParams>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub identifier: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardCharts {
    pub trend: ChartSpec,
    pub daily_increase: ChartSpec,
    /// Absent when no row crosses the threshold.
    pub risk_areas: Option<ChartSpec>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardViews {
    pub table: String,
    pub filter: FilterParams,
    pub trend: Trend,
    pub daily_increase: DailyIncrease,
    pub risk_areas: RiskAreas,
    pub charts: DashboardCharts,
}

pub struct DashboardUseCase {
    store: Arc<StoreGateway>,
    exporter: Arc<dyn WorkbookWriter + Send + Sync>,
}

impl DashboardUseCase {
    pub fn new(store: Arc<StoreGateway>, exporter: Arc<dyn WorkbookWriter + Send + Sync>) -> Self {
        Self { store, exporter }
    }

    /// Parse an upload and replace the contents of its table.
    pub async fn ingest_upload(&self, filename: &str, bytes: &[u8]) -> Result<IngestOutcome> {
        let table = normalizer::from_upload(bytes)?;
        let descriptor = self.store.ensure_table(filename).await?;
        let rows = self.store.replace_all(&descriptor, &table).await?;

        tracing::info!(
            filename,
            table = %descriptor.identifier,
            rows,
            "Ingested upload"
        );

        Ok(IngestOutcome {
            table: descriptor,
            rows,
            default_filter: view_engine::default_filter(&table),
        })
    }

    pub async fn list_tables(&self) -> Result<Vec<TableSummary>> {
        let tables = self.store.list_tables().await?;
        Ok(tables
            .into_iter()
            .map(|identifier| TableSummary {
                label: schema_registry::display_label(&identifier),
                identifier,
            })
            .collect())
    }

    pub async fn views(&self, identifier: &str, request: FilterRequest) -> Result<DashboardViews> {
        let table = self.store.fetch(identifier, None).await?;
        let filter = resolve_filter(&table, request)?;
        Ok(compute_views(identifier, &table, filter))
    }

    /// Workbook with the date-filtered rows and the high-risk rows.
    pub async fn export(&self, identifier: &str, request: FilterRequest) -> Result<Vec<u8>> {
        let table = self.store.fetch(identifier, None).await?;
        let filter = resolve_filter(&table, request)?;
        let filtered = view_engine::filter_by_date_range(&table, filter.start, filter.end);
        let risk = view_engine::risk_areas(&filtered, filter.threshold);
        self.exporter.write(&ExportWorkbook::analysis(&filtered, &risk))
    }
}

/// Fill missing filter values from the table defaults and validate the threshold.
///
/// An inverted date range is accepted and simply matches nothing.
pub fn resolve_filter(table: &CanonicalTable, request: FilterRequest) -> Result<FilterParams> {
    let threshold = match request.threshold {
        Some(t) if t < 0 => {
            return Err(AppError::ValidationError(format!(
                "Risk threshold must be non-negative, got {}",
                t
            )))
        }
        Some(t) => Some(t as u64),
        None => None,
    };

    let defaults = view_engine::default_filter(table);
    let pick = |given: Option<NaiveDate>, fallback: Option<NaiveDate>, name: &str| {
        given.or(fallback).ok_or_else(|| {
            AppError::ValidationError(format!(
                "Table has no dated rows; '{}' must be supplied",
                name
            ))
        })
    };

    Ok(FilterParams {
        start: pick(request.start, defaults.map(|d| d.start), "start")?,
        end: pick(request.end, defaults.map(|d| d.end), "end")?,
        threshold: threshold
            .or(defaults.map(|d| d.threshold))
            .unwrap_or(view_engine::DEFAULT_THRESHOLD),
    })
}

pub fn compute_views(
    identifier: &str,
    table: &CanonicalTable,
    filter: FilterParams,
) -> DashboardViews {
    let filtered = view_engine::filter_by_date_range(table, filter.start, filter.end);
    let risk_areas = view_engine::risk_areas(&filtered, filter.threshold);
    let charts = DashboardCharts {
        trend: view_engine::trend_chart(),
        daily_increase: view_engine::daily_increase_chart(),
        risk_areas: view_engine::risk_chart(&risk_areas),
    };

    DashboardViews {
        table: identifier.to_string(),
        filter,
        trend: view_engine::trend(&filtered),
        daily_increase: view_engine::daily_increase(&filtered),
        risk_areas,
        charts,
    }
}
