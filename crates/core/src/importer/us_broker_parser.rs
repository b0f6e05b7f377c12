//! US sub-brokerage statement.
//!
//! The export starts with a holdings section; the trade table begins at the
//! first row carrying 交易日期, 商品代號 and 交易種類. Only buys and sells
//! are imported; dividends and other entries are ignored.

use log::debug;

use super::importer_model::{DateWindow, MalformedRow, ParsedStatement, StatementFormat};
use super::importer_traits::StatementParser;
use super::statement_reader::{
    decode_statement, malformed, parse_amount, parse_trade_date, read_rows, HeaderIndex,
    StatementRow,
};
use super::ImportError;
use crate::assets::AssetClass;
use crate::errors::Result;
use crate::transactions::{NewTransaction, TradeAction};

const DATE: &str = "交易日期";
const SYMBOL: &str = "商品代號";
const NAME: &str = "商品名稱";
const KIND: &str = "交易種類";
const SHARES: &str = "股數";
const PRICE: &str = "價格";
const FEE: &str = "手續費";
const OTHER_FEE: &str = "其他費用";

const TABLE_MARKERS: [&str; 3] = [DATE, SYMBOL, KIND];

#[derive(Debug, Clone, Copy, Default)]
pub struct UsBrokerParser {
    window: Option<DateWindow>,
}

/// Row that parsed but is not a trade to import.
enum RowOutcome {
    Trade(NewTransaction),
    Ignored,
}

impl UsBrokerParser {
    pub fn new() -> Self {
        Self { window: None }
    }

    /// Only imports trades dated inside `window`.
    pub fn with_window(window: DateWindow) -> Self {
        Self {
            window: Some(window),
        }
    }

    fn parse_row(
        &self,
        header: &HeaderIndex,
        row: &StatementRow,
    ) -> std::result::Result<RowOutcome, ImportError> {
        let date = parse_trade_date(row, header.cell(row, DATE))?;
        if let Some(window) = &self.window {
            if !window.contains(date) {
                return Ok(RowOutcome::Ignored);
            }
        }

        let action = match header.cell(row, KIND) {
            "買進" => TradeAction::Buy,
            "賣出" => TradeAction::Sell,
            other => {
                debug!("Line {}: ignoring '{}' entry", row.line, other);
                return Ok(RowOutcome::Ignored);
            }
        };

        let symbol = header.cell(row, SYMBOL);
        if symbol.is_empty() {
            return Err(malformed(row, "symbol is empty"));
        }

        let quantity = parse_amount(row, SHARES, header.cell(row, SHARES))?;
        let price = parse_amount(row, PRICE, header.cell(row, PRICE))?;
        let fee = parse_amount(row, FEE, header.cell(row, FEE))?;
        let other_fee = match header.cell(row, OTHER_FEE) {
            "" => rust_decimal::Decimal::ZERO,
            raw => parse_amount(row, OTHER_FEE, raw)?,
        };

        let mut event =
            NewTransaction::new(date, AssetClass::EquityUs, symbol, action, quantity, price)
                .with_costs(fee + other_fee, rust_decimal::Decimal::ZERO);
        let name = header.cell(row, NAME);
        if !name.is_empty() {
            event.name = Some(name.to_string());
        }
        Ok(RowOutcome::Trade(event))
    }
}

impl StatementParser for UsBrokerParser {
    fn format(&self) -> StatementFormat {
        StatementFormat::UsBroker
    }

    fn parse(&self, content: &[u8]) -> Result<ParsedStatement> {
        let text = decode_statement(content)?;
        let (rows, mut bad_rows) = read_rows(&text);

        let start = rows
            .iter()
            .position(|r| r.contains_all(&TABLE_MARKERS))
            .ok_or_else(|| ImportError::MissingHeader(TABLE_MARKERS.join(", ")))?;
        let header = HeaderIndex::new(&rows[start]);
        header.require(&[DATE, SYMBOL, KIND, SHARES, PRICE, FEE])?;
        // parse errors in the holdings section above the table do not count
        bad_rows.retain(|r| r.line > rows[start].line);

        let mut parsed = ParsedStatement::default();
        for row in rows.iter().skip(start + 1).filter(|r| !r.is_blank()) {
            if row.contains_all(&TABLE_MARKERS) {
                continue;
            }
            match self.parse_row(&header, row) {
                Ok(RowOutcome::Trade(event)) => parsed.events.push(event),
                Ok(RowOutcome::Ignored) => parsed.ignored += 1,
                Err(ImportError::MalformedRow { line, reason }) => {
                    debug!("Skipping line {}: {}", line, reason);
                    bad_rows.push(MalformedRow { line, reason });
                }
                Err(other) => return Err(other.into()),
            }
        }
        bad_rows.sort_by_key(|r| r.line);
        parsed.malformed = bad_rows;
        Ok(parsed)
    }
}
