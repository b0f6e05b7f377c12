//! Shared decoding and tabular reading of broker statements.

use chardetng::EncodingDetector;
use chrono::NaiveDate;
use csv::{ReaderBuilder, Terminator};
use log::{debug, warn};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

use super::importer_model::MalformedRow;
use super::ImportError;

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Decodes statement bytes: UTF-8 (BOM stripped) when valid, otherwise the
/// legacy encoding the detector settles on (Big5 for Taiwanese brokers).
pub fn decode_statement(content: &[u8]) -> Result<String, ImportError> {
    let content = content.strip_prefix(&UTF8_BOM).unwrap_or(content);
    if content.is_empty() {
        return Err(ImportError::Decode("statement is empty".to_string()));
    }

    if let Ok(text) = std::str::from_utf8(content) {
        return Ok(text.to_string());
    }

    let mut detector = EncodingDetector::new();
    detector.feed(content, true);
    let encoding = detector.guess(Some(b"tw"), false);
    let (text, _, had_errors) = encoding.decode(content);
    if had_errors {
        warn!(
            "Statement decoded as {} with replacement characters",
            encoding.name()
        );
    } else {
        debug!("Statement decoded as {}", encoding.name());
    }
    Ok(text.into_owned())
}

/// One physical CSV record with its 1-based line number.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementRow {
    pub line: usize,
    pub cells: Vec<String>,
}

impl StatementRow {
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.is_empty())
    }

    pub fn contains_all(&self, labels: &[&str]) -> bool {
        labels
            .iter()
            .all(|label| self.cells.iter().any(|c| c == label))
    }
}

/// Splits decoded text into trimmed records. Rows the CSV reader rejects
/// are returned as malformed.
pub fn read_rows(content: &str) -> (Vec<StatementRow>, Vec<MalformedRow>) {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .terminator(Terminator::Any(b'\n'))
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    let mut malformed = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        match result {
            Ok(record) => {
                let line = record
                    .position()
                    .map(|p| p.line() as usize)
                    .unwrap_or(idx + 1);
                let cells = record.iter().map(clean_cell).collect();
                rows.push(StatementRow { line, cells });
            }
            Err(e) => {
                let line = e
                    .position()
                    .map(|p| p.line() as usize)
                    .unwrap_or(idx + 1);
                malformed.push(MalformedRow {
                    line,
                    reason: e.to_string(),
                });
            }
        }
    }
    (rows, malformed)
}

fn clean_cell(raw: &str) -> String {
    raw.replace('\t', "").trim().to_string()
}

/// Column positions of a header row.
#[derive(Debug, Clone)]
pub struct HeaderIndex {
    columns: HashMap<String, usize>,
}

impl HeaderIndex {
    pub fn new(header: &StatementRow) -> Self {
        let columns = header
            .cells
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.is_empty())
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self { columns }
    }

    /// Fails on the first label the header lacks.
    pub fn require(&self, labels: &[&str]) -> Result<(), ImportError> {
        match labels.iter().find(|l| !self.columns.contains_key(**l)) {
            Some(missing) => Err(ImportError::MissingHeader((*missing).to_string())),
            None => Ok(()),
        }
    }

    /// Trimmed cell under `label`; empty when the row is short.
    pub fn cell<'a>(&self, row: &'a StatementRow, label: &str) -> &'a str {
        self.columns
            .get(label)
            .and_then(|i| row.cells.get(*i))
            .map(String::as_str)
            .unwrap_or("")
    }
}

pub fn malformed(row: &StatementRow, reason: impl Into<String>) -> ImportError {
    ImportError::MalformedRow {
        line: row.line,
        reason: reason.into(),
    }
}

/// Parses an amount printed with thousands separators.
pub fn parse_amount(row: &StatementRow, field: &str, raw: &str) -> Result<Decimal, ImportError> {
    let cleaned = raw.replace(',', "");
    if cleaned.is_empty() {
        return Err(malformed(row, format!("{} is empty", field)));
    }
    Decimal::from_str(&cleaned)
        .map_err(|e| malformed(row, format!("{} '{}' is not a number: {}", field, raw, e)))
}

/// Parses a `YYYY/MM/DD` trade date.
pub fn parse_trade_date(row: &StatementRow, raw: &str) -> Result<NaiveDate, ImportError> {
    NaiveDate::parse_from_str(raw, "%Y/%m/%d")
        .map_err(|_| malformed(row, format!("'{}' is not a YYYY/MM/DD date", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_bom_is_stripped() {
        let bytes = [&UTF8_BOM[..], "成交日期,類別".as_bytes()].concat();
        assert_eq!(decode_statement(&bytes).unwrap(), "成交日期,類別");
    }

    #[test]
    fn test_big5_statement_is_detected() {
        let (big5, _, _) = encoding_rs::BIG5.encode("成交日期,類別,股票名稱\n2025/01/02,現股買進,台積電(2330)\n");
        assert!(std::str::from_utf8(&big5).is_err());

        let text = decode_statement(&big5).unwrap();

        assert!(text.contains("現股買進"));
        assert!(text.contains("台積電(2330)"));
    }

    #[test]
    fn test_empty_statement_is_rejected() {
        assert!(matches!(decode_statement(&UTF8_BOM), Err(ImportError::Decode(_))));
    }

    #[test]
    fn test_cells_are_trimmed_and_tab_stripped() {
        let (rows, malformed) = read_rows("\t成交日期,\t類別\n2025/01/02 , 現股買進\n");
        assert!(malformed.is_empty());
        assert_eq!(rows[0].cells, vec!["成交日期", "類別"]);
        assert_eq!(rows[1].cells, vec!["2025/01/02", "現股買進"]);
        assert_eq!(rows[1].line, 2);
    }

    #[test]
    fn test_amount_strips_thousands_separators() {
        let row = StatementRow {
            line: 3,
            cells: vec![],
        };
        assert_eq!(parse_amount(&row, "金額", "1,185.84").unwrap(), Decimal::new(118584, 2));
        assert!(matches!(
            parse_amount(&row, "金額", "n/a"),
            Err(ImportError::MalformedRow { line: 3, .. })
        ));
    }
}
