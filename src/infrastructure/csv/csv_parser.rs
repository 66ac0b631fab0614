// ============================================================
// CSV PARSER
// ============================================================
// Parse uploaded CSV bytes with encoding fallback and header lookup

use csv::{ReaderBuilder, StringRecord, Trim};
use std::borrow::Cow;
use std::collections::HashMap;

use crate::domain::error::{AppError, Result};

/// A parsed CSV body: headers plus raw string records.
#[derive(Debug, Clone)]
pub struct CsvDocument {
    headers: Vec<String>,
    index: HashMap<String, usize>,
    records: Vec<StringRecord>,
}

impl CsvDocument {
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[StringRecord] {
        &self.records
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Field of `record` under header `name`; `None` if the column or cell is absent.
    pub fn field<'r>(&self, record: &'r StringRecord, name: &str) -> Option<&'r str> {
        self.index.get(name).and_then(|idx| record.get(*idx))
    }
}

/// CSV parser with encoding fallback
pub struct CsvParser {
    /// Delimiter character (default: comma)
    delimiter: u8,
}

impl Default for CsvParser {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvParser {
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Parser whose delimiter is sniffed from the first lines of `bytes`.
    pub fn auto_detect(bytes: &[u8]) -> Self {
        let sample_len = bytes.len().min(4096);
        let sample = String::from_utf8_lossy(&bytes[..sample_len]);
        Self::default().with_delimiter(Self::detect_delimiter(&sample))
    }

    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<CsvDocument> {
        let content = decode(bytes);
        self.parse_content(&content)
    }

    pub fn parse_content(&self, content: &str) -> Result<CsvDocument> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(Trim::All)
            .flexible(true) // Allow rows with different lengths
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| AppError::ParseError(format!("Failed to read CSV headers: {}", e)))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        let index = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();

        let mut records = Vec::new();
        for (row, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                AppError::ParseError(format!("Failed to parse CSV row {}: {}", row + 1, e))
            })?;
            records.push(record);
        }

        Ok(CsvDocument {
            headers,
            index,
            records,
        })
    }

    /// Detect delimiter from content (comma, semicolon, tab, pipe)
    pub fn detect_delimiter(content: &str) -> u8 {
        let candidates = [b',', b';', b'\t', b'|'];
        let sample_lines: Vec<_> = content.lines().take(10).collect();

        let mut best_delimiter = b',';
        let mut best_score = 0.0f32;

        if sample_lines.is_empty() {
            return best_delimiter;
        }

        for &delimiter in &candidates {
            let field_counts: Vec<usize> = sample_lines
                .iter()
                .map(|line| line.bytes().filter(|&b| b == delimiter).count())
                .collect();

            // Score by consistency (low standard deviation) and frequency
            let avg = field_counts.iter().sum::<usize>() as f32 / field_counts.len() as f32;
            let variance = field_counts
                .iter()
                .map(|&x| (x as f32 - avg).powi(2))
                .sum::<f32>()
                / field_counts.len() as f32;

            let score = avg / (1.0 + variance.sqrt());

            if score > best_score {
                best_score = score;
                best_delimiter = delimiter;
            }
        }

        best_delimiter
    }
}

/// UTF-8 first; otherwise GB18030, which covers the GBK exports these files
/// usually come in.
fn decode(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(content) => Cow::Borrowed(content),
        Err(_) => {
            let (content, _, had_errors) = encoding_rs::GB18030.decode(bytes);
            if had_errors {
                tracing::warn!(
                    "CSV body is neither valid UTF-8 nor GB18030; replaced invalid bytes"
                );
            }
            content
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_csv() {
        let content = "dateId,confirmedCount\n20200101, 10\n20200102,15";
        let doc = CsvParser::default().parse_content(content).unwrap();

        assert_eq!(doc.headers(), &["dateId".to_string(), "confirmedCount".to_string()]);
        assert_eq!(doc.records().len(), 2);
        assert_eq!(doc.field(&doc.records()[0], "confirmedCount"), Some("10"));
        assert_eq!(doc.field(&doc.records()[0], "deadCount"), None);
    }

    #[test]
    fn test_short_rows_are_tolerated() {
        let doc = CsvParser::default()
            .parse_content("dateId,confirmedCount,deadCount\n20200101,3")
            .unwrap();
        assert_eq!(doc.field(&doc.records()[0], "deadCount"), None);
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(CsvParser::detect_delimiter("a,b,c\nd,e,f"), b',');
        assert_eq!(CsvParser::detect_delimiter("a;b;c\nd;e;f"), b';');
        assert_eq!(CsvParser::detect_delimiter(""), b',');
    }

    #[test]
    fn test_gbk_body_is_decoded() {
        let (encoded, _, _) = encoding_rs::GBK.encode("provinceName,dateId\n湖北,20200101\n");
        let doc = CsvParser::default().parse_bytes(&encoded).unwrap();
        assert_eq!(doc.field(&doc.records()[0], "provinceName"), Some("湖北"));
    }
}
