use super::epidemic::{CanonicalRow, CanonicalTable, CountField, Dimension};
use super::schema::DATE_COLUMN;
use super::views::RiskAreas;

pub const TREND_SHEET: &str = "Trend Analysis";
pub const RISK_SHEET: &str = "High Risk";
pub const EXPORT_FILE_NAME: &str = "covid19_analysis.xlsx";
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// One named tidy table destined for a worksheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSheet {
    pub name: &'static str,
    pub rows: Vec<CanonicalRow>,
    pub dimension: Option<Dimension>,
}

impl ExportSheet {
    /// `dateId`, the ten counts, then the dimension column if any.
    pub fn headers(&self) -> Vec<&'static str> {
        let mut headers = vec![DATE_COLUMN];
        headers.extend(CountField::ALL.iter().map(|f| f.column_name()));
        if let Some(dimension) = self.dimension {
            headers.push(dimension.column_name());
        }
        headers
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportWorkbook {
    pub sheets: Vec<ExportSheet>,
}

impl ExportWorkbook {
    /// The date-filtered rows and the high-risk rows, in that order.
    pub fn analysis(filtered: &CanonicalTable, risk: &RiskAreas) -> Self {
        Self {
            sheets: vec![
                ExportSheet {
                    name: TREND_SHEET,
                    rows: filtered.rows().to_vec(),
                    dimension: filtered.dimension(),
                },
                ExportSheet {
                    name: RISK_SHEET,
                    rows: risk.rows.clone(),
                    dimension: filtered.dimension(),
                },
            ],
        }
    }
}
