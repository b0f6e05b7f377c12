use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::pnl_model::{CumulativePnL, RealizedPnLRecord};
use super::pnl_traits::RealizedPnLRepositoryTrait;
use crate::assets::Currency;
use crate::errors::Result;

pub trait PnLServiceTrait: Send + Sync {
    fn get_realized_pnl(
        &self,
        symbol: Option<&str>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<RealizedPnLRecord>>;

    /// Daily sums with running totals, per currency, ordered by date.
    fn get_cumulative_pnl(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<CumulativePnL>>;
}

pub struct PnLService {
    repository: Arc<dyn RealizedPnLRepositoryTrait>,
}

impl PnLService {
    pub fn new(repository: Arc<dyn RealizedPnLRepositoryTrait>) -> Self {
        Self { repository }
    }
}

impl PnLServiceTrait for PnLService {
    fn get_realized_pnl(
        &self,
        symbol: Option<&str>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<RealizedPnLRecord>> {
        self.repository.list(symbol, start_date, end_date)
    }

    fn get_cumulative_pnl(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<CumulativePnL>> {
        let records = self.repository.list(None, start_date, end_date)?;
        Ok(cumulative_pnl(&records))
    }
}

/// Folds records into one row per `(currency, date)`, running totals
/// accumulated per currency.
pub fn cumulative_pnl(records: &[RealizedPnLRecord]) -> Vec<CumulativePnL> {
    let mut daily: BTreeMap<(NaiveDate, Currency), Decimal> = BTreeMap::new();
    for record in records {
        *daily
            .entry((record.date, record.currency))
            .or_insert(Decimal::ZERO) += record.pnl;
    }

    let mut running: BTreeMap<Currency, Decimal> = BTreeMap::new();
    daily
        .into_iter()
        .map(|((date, currency), daily_pnl)| {
            let total = running.entry(currency).or_insert(Decimal::ZERO);
            *total += daily_pnl;
            CumulativePnL {
                date,
                currency,
                daily_pnl,
                cumulative_pnl: *total,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetClass;
    use rust_decimal_macros::dec;

    fn record(id: i64, day: u32, currency: Currency, pnl: Decimal) -> RealizedPnLRecord {
        RealizedPnLRecord {
            id: RealizedPnLRecord::id_for(id),
            transaction_id: id,
            date: NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
            symbol: "X".to_string(),
            contract_qualifier: None,
            asset_class: if currency == Currency::Usd {
                AssetClass::EquityUs
            } else {
                AssetClass::EquityTw
            },
            currency,
            quantity: dec!(1),
            sell_price: dec!(1),
            gross_pnl: pnl,
            matched_buy_fees: Decimal::ZERO,
            sell_fee: Decimal::ZERO,
            sell_tax: Decimal::ZERO,
            pnl,
            notes: String::new(),
        }
    }

    struct MockPnLRepository {
        records: Vec<RealizedPnLRecord>,
    }

    impl RealizedPnLRepositoryTrait for MockPnLRepository {
        fn list(
            &self,
            symbol: Option<&str>,
            start_date: Option<NaiveDate>,
            end_date: Option<NaiveDate>,
        ) -> Result<Vec<RealizedPnLRecord>> {
            Ok(self
                .records
                .iter()
                .filter(|r| symbol.map_or(true, |s| r.symbol == s))
                .filter(|r| start_date.map_or(true, |d| r.date >= d))
                .filter(|r| end_date.map_or(true, |d| r.date <= d))
                .cloned()
                .collect())
        }
    }

    #[test]
    fn test_cumulative_sums_same_day_and_runs_per_currency() {
        let records = vec![
            record(1, 2, Currency::Twd, dec!(100)),
            record(2, 2, Currency::Twd, dec!(-30)),
            record(3, 3, Currency::Usd, dec!(5)),
            record(4, 5, Currency::Twd, dec!(10)),
        ];

        let rows = cumulative_pnl(&records);

        let twd: Vec<_> = rows.iter().filter(|r| r.currency == Currency::Twd).collect();
        assert_eq!(twd.len(), 2);
        assert_eq!(twd[0].daily_pnl, dec!(70));
        assert_eq!(twd[1].cumulative_pnl, dec!(80));
        let usd: Vec<_> = rows.iter().filter(|r| r.currency == Currency::Usd).collect();
        assert_eq!(usd[0].cumulative_pnl, dec!(5));
    }

    #[test]
    fn test_service_applies_date_window() {
        let service = PnLService::new(Arc::new(MockPnLRepository {
            records: vec![
                record(1, 2, Currency::Twd, dec!(100)),
                record(2, 9, Currency::Twd, dec!(50)),
            ],
        }));

        let rows = service
            .get_cumulative_pnl(NaiveDate::from_ymd_opt(2025, 1, 5), None)
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cumulative_pnl, dec!(50));
    }
}
