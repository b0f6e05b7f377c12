use async_trait::async_trait;
use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::*;
use crate::assets::{AssetClass, AssetMetadata, AssetMetadataRepositoryTrait, Currency};
use crate::errors::{Error, Result};
use crate::market_data::MarketDataProviderTrait;
use crate::portfolio::positions::{Position, PositionRepositoryTrait};
use crate::portfolio::valuation::{PriceSource, ValuationService};
use crate::settings::EngineSettings;
use crate::transactions::{
    LedgerCommit, NewTransaction, TradeAction, TransactionEvent, TransactionRepositoryTrait,
};

// ---------------------------------------------------------------------------
// Mocks
// ---------------------------------------------------------------------------

struct MockTransactionRepository {
    events: Vec<TransactionEvent>,
}

#[async_trait]
impl TransactionRepositoryTrait for MockTransactionRepository {
    fn list_all(&self) -> Result<Vec<TransactionEvent>> {
        Ok(self.events.clone())
    }

    fn get(&self, id: i64) -> Result<Option<TransactionEvent>> {
        Ok(self.events.iter().find(|e| e.id == id).cloned())
    }

    fn max_id(&self) -> Result<i64> {
        Ok(self.events.iter().map(|e| e.id).max().unwrap_or(0))
    }

    async fn commit_ledger(&self, _commit: LedgerCommit) -> Result<()> {
        unimplemented!()
    }
}

struct MockMetadataRepository;

#[async_trait]
impl AssetMetadataRepositoryTrait for MockMetadataRepository {
    fn get(&self, _symbol: &str) -> Result<Option<AssetMetadata>> {
        Ok(None)
    }

    fn list(&self) -> Result<Vec<AssetMetadata>> {
        Ok(Vec::new())
    }

    async fn upsert(&self, metadata: AssetMetadata) -> Result<AssetMetadata> {
        Ok(metadata)
    }

    async fn delete(&self, _symbol: &str) -> Result<usize> {
        Ok(0)
    }
}

struct MockPositionRepository {
    cash: Vec<Position>,
    unavailable: bool,
}

#[async_trait]
impl PositionRepositoryTrait for MockPositionRepository {
    fn list(&self) -> Result<Vec<Position>> {
        if self.unavailable {
            return Err(Error::Repository("positions table unavailable".to_string()));
        }
        Ok(self.cash.clone())
    }

    fn get(&self, position_id: &str) -> Result<Option<Position>> {
        Ok(self.cash.iter().find(|p| p.id == position_id).cloned())
    }

    async fn upsert_cash(&self, currency: Currency, balance: Decimal) -> Result<Position> {
        Ok(Position::cash(currency, balance))
    }
}

/// Stores snapshots by date; optionally raises `trip` after `trip_after` writes.
#[derive(Default)]
struct MockSnapshotRepository {
    stored: Mutex<BTreeMap<NaiveDate, NetWorthSnapshot>>,
    trip: Option<(usize, Arc<AtomicBool>)>,
}

impl MockSnapshotRepository {
    fn all(&self) -> Vec<NetWorthSnapshot> {
        self.stored.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl SnapshotRepositoryTrait for MockSnapshotRepository {
    async fn upsert_snapshot(&self, snapshot: NetWorthSnapshot) -> Result<()> {
        let mut stored = self.stored.lock().unwrap();
        stored.insert(snapshot.date, snapshot);
        if let Some((after, flag)) = &self.trip {
            if stored.len() >= *after {
                flag.store(true, Ordering::SeqCst);
            }
        }
        Ok(())
    }

    async fn delete_all(&self) -> Result<usize> {
        let mut stored = self.stored.lock().unwrap();
        let n = stored.len();
        stored.clear();
        Ok(n)
    }

    fn get(&self, date: NaiveDate) -> Result<Option<NetWorthSnapshot>> {
        Ok(self.stored.lock().unwrap().get(&date).cloned())
    }

    fn list_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<NetWorthSnapshot>> {
        Ok(self
            .stored
            .lock()
            .unwrap()
            .range(start..=end)
            .map(|(_, s)| s.clone())
            .collect())
    }

    fn list_recent(&self, skip: i64, limit: i64) -> Result<Vec<NetWorthSnapshot>> {
        Ok(self
            .stored
            .lock()
            .unwrap()
            .values()
            .rev()
            .skip(skip as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct MockMarketData {
    prices: HashMap<(String, NaiveDate), Decimal>,
}

#[async_trait]
impl MarketDataProviderTrait for MockMarketData {
    async fn price_lookup(
        &self,
        symbol: &str,
        _asset_class: AssetClass,
        date: Option<NaiveDate>,
    ) -> Result<Option<Decimal>> {
        Ok(date.and_then(|d| self.prices.get(&(symbol.to_string(), d)).copied()))
    }

    async fn fx_lookup(&self, _pair: &str, _date: Option<NaiveDate>) -> Result<Option<Decimal>> {
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
}

fn event(id: i64, new: NewTransaction) -> TransactionEvent {
    TransactionEvent::from_new(id, new)
}

fn trade(d: u32, symbol: &str, action: TradeAction, qty: Decimal, price: Decimal) -> NewTransaction {
    NewTransaction::new(day(d), AssetClass::EquityTw, symbol, action, qty, price)
}

fn engine(
    events: Vec<TransactionEvent>,
    cash_twd: Decimal,
    prices: HashMap<(String, NaiveDate), Decimal>,
    snapshots: Arc<MockSnapshotRepository>,
) -> HistoricalReplayEngine {
    engine_with_positions(
        events,
        MockPositionRepository {
            cash: vec![Position::cash(Currency::Twd, cash_twd)],
            unavailable: false,
        },
        prices,
        snapshots,
    )
}

fn engine_with_positions(
    events: Vec<TransactionEvent>,
    positions: MockPositionRepository,
    prices: HashMap<(String, NaiveDate), Decimal>,
    snapshots: Arc<MockSnapshotRepository>,
) -> HistoricalReplayEngine {
    let positions = Arc::new(positions);
    let valuation = Arc::new(ValuationService::new(
        positions.clone(),
        Arc::new(MockMarketData { prices }),
        EngineSettings::default(),
    ));
    HistoricalReplayEngine::new(
        Arc::new(MockTransactionRepository { events }),
        Arc::new(MockMetadataRepository),
        positions,
        snapshots,
        valuation,
    )
}

fn cash_twd(snapshot: &NetWorthSnapshot) -> Decimal {
    snapshot
        .details
        .iter()
        .filter(|d| d.asset_class == AssetClass::CashTwd)
        .map(|d| d.value_twd)
        .sum()
}

fn round_trip_ledger() -> Vec<TransactionEvent> {
    vec![
        event(
            1,
            trade(2, "2330", TradeAction::Buy, dec!(1000), dec!(10.5)).with_costs(dec!(20), dec!(0)),
        ),
        event(
            2,
            trade(4, "2330", TradeAction::Sell, dec!(1000), dec!(12.0)).with_costs(dec!(15), dec!(5)),
        ),
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_replay_writes_one_snapshot_per_day() {
    let prices = HashMap::from([
        (("2330".to_string(), day(2)), dec!(11)),
        (("2330".to_string(), day(4)), dec!(12)),
    ]);
    let snapshots = Arc::new(MockSnapshotRepository::default());
    let engine = engine(round_trip_ledger(), dec!(100000), prices, snapshots.clone());

    let report = engine.replay(day(5), &AtomicBool::new(false)).await.unwrap();

    assert_eq!(report.snapshots_written, 4);
    assert_eq!(report.events_applied, 2);
    assert_eq!(report.first_date, Some(day(2)));
    assert_eq!(report.last_date, Some(day(5)));
    assert!(report.anomalies.is_empty());

    let stored = snapshots.all();
    let totals: Vec<Decimal> = stored.iter().map(|s| s.total_value_twd).collect();
    // opening cash 98540; day 2 pays 10520 and holds 1000 @ 11
    assert_eq!(totals, vec![dec!(99020), dec!(99020), dec!(100000), dec!(100000)]);
}

#[tokio::test]
async fn test_replay_ends_on_current_cash_balance() {
    let snapshots = Arc::new(MockSnapshotRepository::default());
    let engine = engine(round_trip_ledger(), dec!(100000), HashMap::new(), snapshots.clone());

    engine.replay(day(5), &AtomicBool::new(false)).await.unwrap();

    let stored = snapshots.all();
    assert_eq!(cash_twd(&stored[0]), dec!(88020));
    assert_eq!(cash_twd(stored.last().unwrap()), dec!(100000));
}

#[tokio::test]
async fn test_missing_day_looks_back_and_is_recorded() {
    let prices = HashMap::from([(("2330".to_string(), day(2)), dec!(11))]);
    let snapshots = Arc::new(MockSnapshotRepository::default());
    let engine = engine(round_trip_ledger(), dec!(100000), prices, snapshots.clone());

    let report = engine.replay(day(5), &AtomicBool::new(false)).await.unwrap();

    let jan3 = snapshots.get(day(3)).unwrap().unwrap();
    let stock = jan3.details.iter().find(|d| d.symbol == "2330").unwrap();
    assert_eq!(stock.price_source, PriceSource::LookBack { observed_on: day(2) });
    assert_eq!(report.price_fallback_days, 1);
    // no FX rate anywhere: every day used the configured rate
    assert_eq!(report.fx_fallback_days, 4);
    assert!(jan3.fx_fallback());
}

#[tokio::test]
async fn test_day_trades_move_cash_but_not_inventory() {
    let ledger = vec![
        event(
            1,
            trade(3, "2603", TradeAction::BuyDay, dec!(1000), dec!(10)).with_costs(dec!(10), dec!(0)),
        ),
        event(
            2,
            trade(3, "2603", TradeAction::SellDay, dec!(1000), dec!(11))
                .with_costs(dec!(10), dec!(16.5)),
        ),
    ];
    let snapshots = Arc::new(MockSnapshotRepository::default());
    let engine = engine(ledger, dec!(50000), HashMap::new(), snapshots.clone());

    engine.replay(day(3), &AtomicBool::new(false)).await.unwrap();

    let jan3 = snapshots.get(day(3)).unwrap().unwrap();
    assert!(jan3.details.iter().all(|d| d.asset_class.is_cash()));
    assert_eq!(jan3.total_value_twd, dec!(50000));
}

#[tokio::test]
async fn test_replay_clears_previous_history() {
    let snapshots = Arc::new(MockSnapshotRepository::default());
    let stale = day(1) - chrono::Duration::days(30);
    snapshots.stored.lock().unwrap().insert(
        stale,
        NetWorthSnapshot {
            date: stale,
            total_value_twd: dec!(1),
            total_value_usd: dec!(0),
            total_exposure_twd: dec!(0),
            leverage_ratio: dec!(0),
            usd_twd_rate: dec!(32),
            fx_source: crate::portfolio::valuation::FxSource::Configured,
            details: vec![],
        },
    );
    let engine = engine(round_trip_ledger(), dec!(100000), HashMap::new(), snapshots.clone());

    engine.replay(day(4), &AtomicBool::new(false)).await.unwrap();

    assert!(snapshots.get(stale).unwrap().is_none());
    assert_eq!(snapshots.all().len(), 3);
}

#[tokio::test]
async fn test_failed_cash_read_keeps_previous_history() {
    let snapshots = Arc::new(MockSnapshotRepository::default());
    engine(round_trip_ledger(), dec!(100000), HashMap::new(), snapshots.clone())
        .replay(day(5), &AtomicBool::new(false))
        .await
        .unwrap();

    let broken = engine_with_positions(
        round_trip_ledger(),
        MockPositionRepository {
            cash: vec![],
            unavailable: true,
        },
        HashMap::new(),
        snapshots.clone(),
    );
    let result = broken.replay(day(5), &AtomicBool::new(false)).await;

    assert!(matches!(result, Err(Error::Repository(_))));
    assert_eq!(snapshots.all().len(), 4);
}

#[tokio::test]
async fn test_empty_ledger_writes_nothing() {
    let snapshots = Arc::new(MockSnapshotRepository::default());
    let engine = engine(vec![], dec!(100000), HashMap::new(), snapshots.clone());

    let report = engine.replay(day(5), &AtomicBool::new(false)).await.unwrap();

    assert_eq!(report, ReplayReport::default());
    assert!(snapshots.all().is_empty());
}

#[tokio::test]
async fn test_cancel_before_start_leaves_history_untouched() {
    let snapshots = Arc::new(MockSnapshotRepository::default());
    let engine = engine(round_trip_ledger(), dec!(100000), HashMap::new(), snapshots.clone());
    engine.replay(day(5), &AtomicBool::new(false)).await.unwrap();

    let result = engine.replay(day(5), &AtomicBool::new(true)).await;

    assert!(matches!(result, Err(Error::Cancelled(_))));
    assert_eq!(snapshots.all().len(), 4);
}

#[tokio::test]
async fn test_cancel_mid_replay_keeps_completed_days_only() {
    let flag = Arc::new(AtomicBool::new(false));
    let snapshots = Arc::new(MockSnapshotRepository {
        trip: Some((2, flag.clone())),
        ..Default::default()
    });
    let engine = engine(round_trip_ledger(), dec!(100000), HashMap::new(), snapshots.clone());

    let result = engine.replay(day(10), &flag).await;

    assert!(matches!(result, Err(Error::Cancelled(_))));
    let stored = snapshots.all();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[1].date, day(3));
}

#[tokio::test]
async fn test_over_sell_is_reported_not_fatal() {
    let ledger = vec![
        event(1, trade(2, "2330", TradeAction::Buy, dec!(1), dec!(100))),
        event(2, trade(3, "2330", TradeAction::Sell, dec!(3), dec!(110))),
    ];
    let snapshots = Arc::new(MockSnapshotRepository::default());
    let engine = engine(ledger, dec!(1000), HashMap::new(), snapshots.clone());

    let report = engine.replay(day(3), &AtomicBool::new(false)).await.unwrap();

    assert_eq!(report.snapshots_written, 2);
    assert_eq!(report.anomalies.len(), 1);
}

fn arb_ledger() -> impl Strategy<Value = Vec<TransactionEvent>> {
    prop::collection::vec(
        (1u32..20, 0usize..2, any::<bool>(), 1u32..50, 5u32..200),
        1..25,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (d, sym, buy, qty, price))| {
                let symbol = ["2330", "0050"][sym];
                let action = if buy { TradeAction::Buy } else { TradeAction::Sell };
                event(
                    i as i64 + 1,
                    trade(d, symbol, action, Decimal::from(qty), Decimal::from(price))
                        .with_costs(dec!(1), dec!(0)),
                )
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_replay_is_deterministic(ledger in arb_ledger()) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let prices: HashMap<(String, NaiveDate), Decimal> = (1..=25)
            .flat_map(|d| {
                [
                    (("2330".to_string(), day(d)), Decimal::from(100 + d)),
                    (("0050".to_string(), day(d)), Decimal::from(50 + d)),
                ]
            })
            .collect();

        let run = |ledger: Vec<TransactionEvent>| {
            let snapshots = Arc::new(MockSnapshotRepository::default());
            let engine = engine(ledger, dec!(100000), prices.clone(), snapshots.clone());
            runtime
                .block_on(engine.replay(day(25), &AtomicBool::new(false)))
                .unwrap();
            snapshots.all()
        };

        let first = run(ledger.clone());
        let second = run(ledger);
        prop_assert_eq!(first, second);
    }
}
