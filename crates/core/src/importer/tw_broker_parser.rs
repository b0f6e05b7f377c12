//! Taiwan broker trade statement.
//!
//! One header row (成交日期, 類別, 股票名稱, 成交價, 股數, 手續費, 交易稅),
//! one trade per row. The stock column carries the code in parentheses
//! after the name, e.g. `元大美債20正2(00680L)`.

use log::debug;
use regex::Regex;
use std::sync::LazyLock;

use super::importer_model::{MalformedRow, ParsedStatement, StatementFormat};
use super::importer_traits::StatementParser;
use super::statement_reader::{
    decode_statement, malformed, parse_amount, parse_trade_date, read_rows, HeaderIndex,
    StatementRow,
};
use super::ImportError;
use crate::assets::AssetClass;
use crate::errors::Result;
use crate::transactions::{NewTransaction, TradeAction};

const DATE: &str = "成交日期";
const KIND: &str = "類別";
const STOCK: &str = "股票名稱";
const PRICE: &str = "成交價";
const SHARES: &str = "股數";
const FEE: &str = "手續費";
const TAX: &str = "交易稅";

static CODE_IN_PARENS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((.*?)\)").expect("Invalid regex pattern"));

#[derive(Debug, Clone, Copy, Default)]
pub struct TwBrokerParser;

impl TwBrokerParser {
    pub fn new() -> Self {
        Self
    }

    fn parse_row(
        &self,
        header: &HeaderIndex,
        row: &StatementRow,
    ) -> std::result::Result<NewTransaction, ImportError> {
        let date = parse_trade_date(row, header.cell(row, DATE))?;
        let kind = header.cell(row, KIND);
        let action = map_action(kind)
            .ok_or_else(|| malformed(row, format!("unknown trade kind '{}'", kind)))?;
        let raw_stock = header.cell(row, STOCK);
        if raw_stock.is_empty() {
            return Err(malformed(row, "stock name is empty"));
        }
        let symbol = extract_symbol(raw_stock);
        let name = raw_stock
            .split_once('(')
            .map(|(n, _)| n.trim())
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        let quantity = parse_amount(row, SHARES, header.cell(row, SHARES))?;
        let price = parse_amount(row, PRICE, header.cell(row, PRICE))?;
        let fee = parse_amount(row, FEE, header.cell(row, FEE))?;
        let tax = parse_amount(row, TAX, header.cell(row, TAX))?;

        let mut event = NewTransaction::new(date, AssetClass::EquityTw, symbol, action, quantity, price)
            .with_costs(fee, tax);
        event.name = name;
        Ok(event)
    }
}

impl StatementParser for TwBrokerParser {
    fn format(&self) -> StatementFormat {
        StatementFormat::TwBroker
    }

    fn parse(&self, content: &[u8]) -> Result<ParsedStatement> {
        let text = decode_statement(content)?;
        let (rows, mut bad_rows) = read_rows(&text);

        let mut rows = rows.into_iter().filter(|r| !r.is_blank());
        let header_row = rows
            .next()
            .ok_or_else(|| ImportError::MissingHeader(DATE.to_string()))?;
        let header = HeaderIndex::new(&header_row);
        header.require(&[DATE, KIND, STOCK, PRICE, SHARES, FEE, TAX])?;

        let mut parsed = ParsedStatement::default();
        for row in rows {
            // repeated header lines inside the body
            if row.contains_all(&[DATE, KIND]) {
                continue;
            }
            match self.parse_row(&header, &row) {
                Ok(event) => parsed.events.push(event),
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

/// Broker trade kind to ledger action. Unknown kinds yield `None`.
pub fn map_action(kind: &str) -> Option<TradeAction> {
    match kind {
        "現股買進" | "融資買進" => Some(TradeAction::Buy),
        "現股賣出" | "融資賣出" => Some(TradeAction::Sell),
        "現沖買進" => Some(TradeAction::BuyDay),
        "現股沖賣" | "現沖賣出" => Some(TradeAction::SellDay),
        "融券賣出" => Some(TradeAction::SellOpen),
        "融券買進" => Some(TradeAction::BuyClose),
        _ => None,
    }
}

/// Stock code from the statement cell: the text in parentheses if any,
/// otherwise the cell itself, left-padded to six digits when it is a short
/// all-digit code whose leading zeros were lost.
pub fn extract_symbol(raw: &str) -> String {
    let raw = raw.trim();
    let raw = raw.strip_suffix(".0").unwrap_or(raw);
    if let Some(code) = CODE_IN_PARENS
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|c| !c.is_empty())
    {
        return code.to_string();
    }
    if !raw.is_empty() && raw.len() < 6 && raw.chars().all(|c| c.is_ascii_digit()) {
        return format!("{:0>6}", raw);
    }
    raw.to_string()
}
