use rust_xlsxwriter::{Format, Workbook, XlsxError};

use crate::domain::epidemic::{CountField, RowDate};
use crate::domain::error::{AppError, Result};
use crate::domain::export::{ExportSheet, ExportWorkbook};

/// Serializes an [`ExportWorkbook`] into a downloadable file.
pub trait WorkbookWriter {
    fn write(&self, workbook: &ExportWorkbook) -> Result<Vec<u8>>;
}

pub struct XlsxExporter;

impl WorkbookWriter for XlsxExporter {
    fn write(&self, workbook: &ExportWorkbook) -> Result<Vec<u8>> {
        let bytes = build_xlsx(workbook).map_err(|e| {
            tracing::error!(error = %e, "Failed to build xlsx export");
            AppError::ExportError(format!("Failed to build workbook: {}", e))
        })?;
        tracing::debug!(bytes = bytes.len(), sheets = workbook.sheets.len(), "Built xlsx export");
        Ok(bytes)
    }
}

fn build_xlsx(export: &ExportWorkbook) -> std::result::Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    for sheet in &export.sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet.name)?;
        write_sheet(worksheet, sheet, &header_format)?;
    }

    workbook.save_to_buffer()
}

fn write_sheet(
    worksheet: &mut rust_xlsxwriter::Worksheet,
    sheet: &ExportSheet,
    header_format: &Format,
) -> std::result::Result<(), XlsxError> {
    for (col, name) in sheet.headers().into_iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, name, header_format)?;
    }

    for (idx, row) in sheet.rows.iter().enumerate() {
        let r = idx as u32 + 1;
        // Unparseable dates stay blank.
        if let RowDate::Valid(date) = &row.date {
            worksheet.write_string(r, 0, date.format("%Y-%m-%d").to_string())?;
        }
        for (offset, field) in CountField::ALL.iter().enumerate() {
            worksheet.write_number(r, offset as u16 + 1, row.count(*field) as f64)?;
        }
        if let Some(dimension) = sheet.dimension {
            if let Some(value) = row.dimension_value(dimension) {
                worksheet.write_string(r, CountField::ALL.len() as u16 + 1, value)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::epidemic::{CanonicalRow, CanonicalTable, Dimension};
    use crate::domain::export::{RISK_SHEET, TREND_SHEET};
    use crate::domain::views::RiskAreas;
    use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
    use chrono::NaiveDate;
    use std::io::Cursor;

    fn row(day: u32, confirmed: i64, current: i64) -> CanonicalRow {
        let date = NaiveDate::from_ymd_opt(2020, 1, day).unwrap();
        let mut row = CanonicalRow::new(RowDate::Valid(date));
        row.confirmed_count = confirmed;
        row.current_confirmed_count = current;
        row
    }

    #[test]
    fn test_workbook_has_two_named_sheets() {
        let filtered = CanonicalTable::new(vec![row(1, 10, 8), row(2, 15, 12)], None);
        let risk = RiskAreas {
            threshold: 10,
            rows: vec![row(2, 15, 12)],
        };
        let bytes = XlsxExporter
            .write(&ExportWorkbook::analysis(&filtered, &risk))
            .unwrap();

        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        assert_eq!(workbook.sheet_names(), vec![TREND_SHEET, RISK_SHEET]);

        let trend = workbook.worksheet_range(TREND_SHEET).unwrap();
        assert_eq!(trend.get_size(), (3, 11));
        assert_eq!(trend.get_value((0, 0)), Some(&Data::String("dateId".to_string())));
        assert_eq!(trend.get_value((1, 0)), Some(&Data::String("2020-01-01".to_string())));
        assert_eq!(trend.get_value((2, 1)), Some(&Data::Float(15.0)));

        let high_risk = workbook.worksheet_range(RISK_SHEET).unwrap();
        assert_eq!(high_risk.get_size(), (2, 11));
    }

    #[test]
    fn test_dimension_column_is_exported() {
        let mut labelled = row(1, 3, 3);
        labelled.country = Some("Italy".to_string());
        let filtered = CanonicalTable::new(vec![labelled], Some(Dimension::Country));
        let risk = RiskAreas {
            threshold: 100,
            rows: Vec::new(),
        };
        let bytes = XlsxExporter
            .write(&ExportWorkbook::analysis(&filtered, &risk))
            .unwrap();

        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        let trend = workbook.worksheet_range(TREND_SHEET).unwrap();
        assert_eq!(trend.get_value((0, 11)), Some(&Data::String("country".to_string())));
        assert_eq!(trend.get_value((1, 11)), Some(&Data::String("Italy".to_string())));
    }
}
