//! End-to-end flows through the public API: statement import, ledger,
//! realized PnL, valuation and the historical replay, all backed by one
//! in-memory store.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use networth_core::assets::{AssetService, AssetServiceTrait};
use networth_core::errors::Result;
use networth_core::importer::{parser_for, ImportService, ImportServiceTrait, StatementFormat};
use networth_core::market_data::{
    CachedMarketData, MarketDataProviderTrait, Quote, QuoteProvider, QuoteRepositoryTrait,
    QuoteService, QuoteServiceTrait, ResilientMarketData, RetryPolicy,
};
use networth_core::net_worth::{
    HistoricalReplayEngine, NetWorthService, NetWorthServiceTrait, NetWorthSnapshot,
    SnapshotRepositoryTrait,
};
use networth_core::pnl::{PnLService, PnLServiceTrait, RealizedPnLRecord, RealizedPnLRepositoryTrait};
use networth_core::positions::{Position, PositionRepositoryTrait};
use networth_core::settings::EngineSettings;
use networth_core::transactions::{
    sort_for_replay, LedgerCommit, LedgerService, LedgerServiceTrait, NewTransaction, TradeAction,
    TransactionEvent, TransactionRepositoryTrait,
};
use networth_core::valuation::{ValuationService, ValuationServiceTrait};
use networth_core::{AssetClass, AssetMetadata, AssetMetadataRepositoryTrait, Currency};

// =============================================================================
// In-memory store
// =============================================================================

#[derive(Default)]
struct MemoryStore {
    events: Mutex<Vec<TransactionEvent>>,
    positions: Mutex<Vec<Position>>,
    cash: Mutex<BTreeMap<Currency, Position>>,
    realized: Mutex<Vec<RealizedPnLRecord>>,
    profiles: Mutex<HashMap<String, AssetMetadata>>,
    snapshots: Mutex<BTreeMap<NaiveDate, NetWorthSnapshot>>,
    quotes: Mutex<BTreeMap<(String, NaiveDate), Quote>>,
}

#[async_trait]
impl TransactionRepositoryTrait for MemoryStore {
    fn list_all(&self) -> Result<Vec<TransactionEvent>> {
        let mut events = self.events.lock().unwrap().clone();
        sort_for_replay(&mut events);
        Ok(events)
    }

    fn get(&self, id: i64) -> Result<Option<TransactionEvent>> {
        Ok(self.events.lock().unwrap().iter().find(|e| e.id == id).cloned())
    }

    fn max_id(&self) -> Result<i64> {
        Ok(self.events.lock().unwrap().iter().map(|e| e.id).max().unwrap_or(0))
    }

    async fn commit_ledger(&self, commit: LedgerCommit) -> Result<()> {
        let mut events = self.events.lock().unwrap();
        events.retain(|e| !commit.deletes.contains(&e.id));
        for update in commit.updates {
            if let Some(slot) = events.iter_mut().find(|e| e.id == update.id) {
                *slot = update;
            }
        }
        events.extend(commit.inserts);
        *self.positions.lock().unwrap() = commit.positions;
        let mut realized = self.realized.lock().unwrap();
        realized.retain(|r| !commit.pnl_symbols.contains(&r.symbol));
        realized.extend(commit.realized_pnl);
        Ok(())
    }
}

#[async_trait]
impl PositionRepositoryTrait for MemoryStore {
    fn list(&self) -> Result<Vec<Position>> {
        let mut all = self.positions.lock().unwrap().clone();
        all.extend(self.cash.lock().unwrap().values().cloned());
        Ok(all)
    }

    fn get(&self, position_id: &str) -> Result<Option<Position>> {
        Ok(PositionRepositoryTrait::list(self)?
            .into_iter()
            .find(|p| p.id == position_id))
    }

    async fn upsert_cash(&self, currency: Currency, balance: Decimal) -> Result<Position> {
        let position = Position::cash(currency, balance);
        self.cash.lock().unwrap().insert(currency, position.clone());
        Ok(position)
    }
}

impl RealizedPnLRepositoryTrait for MemoryStore {
    fn list(
        &self,
        symbol: Option<&str>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<RealizedPnLRecord>> {
        let mut records: Vec<_> = self
            .realized
            .lock()
            .unwrap()
            .iter()
            .filter(|r| symbol.map_or(true, |s| r.symbol == s))
            .filter(|r| start_date.map_or(true, |d| r.date >= d))
            .filter(|r| end_date.map_or(true, |d| r.date <= d))
            .cloned()
            .collect();
        records.sort_by_key(|r| (r.date, r.transaction_id));
        Ok(records)
    }
}

#[async_trait]
impl AssetMetadataRepositoryTrait for MemoryStore {
    fn get(&self, symbol: &str) -> Result<Option<AssetMetadata>> {
        Ok(self.profiles.lock().unwrap().get(symbol).cloned())
    }

    fn list(&self) -> Result<Vec<AssetMetadata>> {
        Ok(self.profiles.lock().unwrap().values().cloned().collect())
    }

    async fn upsert(&self, metadata: AssetMetadata) -> Result<AssetMetadata> {
        self.profiles
            .lock()
            .unwrap()
            .insert(metadata.symbol.clone(), metadata.clone());
        Ok(metadata)
    }

    async fn delete(&self, symbol: &str) -> Result<usize> {
        Ok(self.profiles.lock().unwrap().remove(symbol).map_or(0, |_| 1))
    }
}

#[async_trait]
impl SnapshotRepositoryTrait for MemoryStore {
    async fn upsert_snapshot(&self, snapshot: NetWorthSnapshot) -> Result<()> {
        self.snapshots.lock().unwrap().insert(snapshot.date, snapshot);
        Ok(())
    }

    async fn delete_all(&self) -> Result<usize> {
        let mut snapshots = self.snapshots.lock().unwrap();
        let n = snapshots.len();
        snapshots.clear();
        Ok(n)
    }

    fn get(&self, date: NaiveDate) -> Result<Option<NetWorthSnapshot>> {
        Ok(self.snapshots.lock().unwrap().get(&date).cloned())
    }

    fn list_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<NetWorthSnapshot>> {
        Ok(self
            .snapshots
            .lock()
            .unwrap()
            .range(start..=end)
            .map(|(_, s)| s.clone())
            .collect())
    }

    fn list_recent(&self, skip: i64, limit: i64) -> Result<Vec<NetWorthSnapshot>> {
        Ok(self
            .snapshots
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

#[async_trait]
impl QuoteRepositoryTrait for MemoryStore {
    async fn save_quotes(&self, quotes: Vec<Quote>) -> Result<usize> {
        let mut stored = self.quotes.lock().unwrap();
        let n = quotes.len();
        for quote in quotes {
            stored.insert((quote.symbol.clone(), quote.date), quote);
        }
        Ok(n)
    }

    fn get_quote(&self, symbol: &str, date: NaiveDate) -> Result<Option<Quote>> {
        Ok(self
            .quotes
            .lock()
            .unwrap()
            .get(&(symbol.to_string(), date))
            .cloned())
    }

    fn latest_on_or_before(
        &self,
        symbol: &str,
        date: NaiveDate,
        not_before: NaiveDate,
    ) -> Result<Option<Quote>> {
        Ok(self
            .quotes
            .lock()
            .unwrap()
            .range((symbol.to_string(), not_before)..=(symbol.to_string(), date))
            .next_back()
            .map(|(_, q)| q.clone()))
    }

    fn latest(&self, symbol: &str) -> Result<Option<Quote>> {
        Ok(QuoteRepositoryTrait::list(self, symbol)?.pop())
    }

    fn list(&self, symbol: &str) -> Result<Vec<Quote>> {
        Ok(self
            .quotes
            .lock()
            .unwrap()
            .values()
            .filter(|q| q.symbol == symbol)
            .cloned()
            .collect())
    }

    async fn delete_quote(&self, symbol: &str, date: NaiveDate) -> Result<usize> {
        Ok(self
            .quotes
            .lock()
            .unwrap()
            .remove(&(symbol.to_string(), date))
            .map_or(0, |_| 1))
    }
}

// =============================================================================
// Wiring
// =============================================================================

struct Engine {
    store: Arc<MemoryStore>,
    ledger: Arc<LedgerService>,
    assets: AssetService,
    quotes: QuoteService,
    valuation: Arc<ValuationService>,
    replay: HistoricalReplayEngine,
}

fn engine() -> Engine {
    let store = Arc::new(MemoryStore::default());
    let settings = EngineSettings::default();

    let ledger = Arc::new(LedgerService::new(store.clone(), store.clone()));
    let provider: Arc<dyn MarketDataProviderTrait> = Arc::new(CachedMarketData::new(Arc::new(
        ResilientMarketData::new(
            Arc::new(QuoteProvider::new(store.clone())),
            RetryPolicy::from(&settings.lookup),
        ),
    )));
    let valuation = Arc::new(ValuationService::new(store.clone(), provider, settings));
    let replay = HistoricalReplayEngine::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        valuation.clone(),
    );

    Engine {
        assets: AssetService::new(store.clone(), ledger.clone()),
        quotes: QuoteService::new(store.clone()),
        store,
        ledger,
        valuation,
        replay,
    }
}

fn day(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, m, d).unwrap()
}

const TW_STATEMENT: &str = "成交日期,類別,股票名稱,成交價,股數,手續費,交易稅
2025/01/02,現股買進,元大美債20正2(00680L),10.5,1000,20,0
2025/01/04,現股賣出,元大美債20正2(00680L),12,1000,15,5
";

// =============================================================================
// Flows
// =============================================================================

#[tokio::test]
async fn test_import_replay_and_history() {
    let engine = engine();
    let importer = ImportService::new(engine.ledger.clone());
    let parser = parser_for(StatementFormat::TwBroker, None);

    let summary = importer
        .import_statement(parser.as_ref(), TW_STATEMENT.as_bytes())
        .await
        .unwrap();
    assert_eq!(summary.inserted, 2);

    // re-import of the same file changes nothing
    let again = importer
        .import_statement(parser.as_ref(), TW_STATEMENT.as_bytes())
        .await
        .unwrap();
    assert_eq!(again.inserted, 0);
    assert_eq!(again.skipped_duplicates, 2);

    let pnl = PnLService::new(engine.store.clone());
    let realized = pnl.get_realized_pnl(Some("00680L"), None, None).unwrap();
    assert_eq!(realized.len(), 1);
    assert_eq!(realized[0].pnl, dec!(1460));
    let cumulative = pnl.get_cumulative_pnl(None, None).unwrap();
    assert_eq!(cumulative.len(), 1);
    assert_eq!(cumulative[0].cumulative_pnl, dec!(1460));

    engine.store.upsert_cash(Currency::Twd, dec!(100000)).await.unwrap();
    engine
        .quotes
        .save_quotes(vec![
            Quote::manual("00680L", day(1, 2), dec!(10.0)),
            Quote::manual("00680L", day(1, 3), dec!(11.0)),
            Quote::manual("USDTWD", day(1, 2), dec!(32.5)),
        ])
        .await
        .unwrap();

    let report = engine
        .replay
        .replay(day(1, 5), &AtomicBool::new(false))
        .await
        .unwrap();
    assert_eq!(report.snapshots_written, 4);
    assert_eq!(report.events_applied, 2);
    assert!(report.anomalies.is_empty());

    let history = NetWorthService::new(engine.store.clone());
    let totals: Vec<Decimal> = history
        .get_history(day(1, 1), day(1, 31))
        .unwrap()
        .iter()
        .map(|s| s.total_value_twd)
        .collect();
    // opening cash 98540, buy on the 2nd, sell on the 4th
    assert_eq!(totals, vec![dec!(98020), dec!(99020), dec!(100000), dec!(100000)]);

    let latest = history.get_recent(0, 1).unwrap();
    assert_eq!(latest[0].date, day(1, 5));
}

#[tokio::test]
async fn test_futures_and_us_equity_spot_valuation() {
    let engine = engine();
    engine
        .ledger
        .record_transaction(
            NewTransaction::new(
                day(3, 3),
                AssetClass::FutureTw,
                "MTX",
                TradeAction::BuyOpen,
                dec!(2),
                dec!(20000),
            )
            .with_costs(dec!(50), dec!(0))
            .with_margin(dec!(92000))
            .with_contract(Some("202503".to_string()), Some(dec!(50))),
        )
        .await
        .unwrap();
    engine
        .ledger
        .record_transaction(
            NewTransaction::new(
                day(3, 3),
                AssetClass::EquityUs,
                "QQQ",
                TradeAction::Buy,
                dec!(10),
                dec!(500),
            )
            .with_costs(dec!(3), dec!(0)),
        )
        .await
        .unwrap();

    engine
        .quotes
        .save_quotes(vec![
            Quote::manual("mtx", day(3, 4), dec!(20100)),
            Quote::manual("QQQ", day(3, 4), dec!(510)),
            Quote::manual("USDTWD", day(3, 4), dec!(32)),
        ])
        .await
        .unwrap();

    let valuation = engine.valuation.current_valuation(day(3, 4)).await.unwrap();

    let future = valuation.assets.iter().find(|a| a.symbol == "MTX").unwrap();
    assert_eq!(future.value_twd, dec!(102000));
    assert_eq!(future.exposure_twd, dec!(2010000));
    let qqq = valuation.assets.iter().find(|a| a.symbol == "QQQ").unwrap();
    assert_eq!(qqq.value_twd, dec!(163200));
    assert_eq!(valuation.total_value_twd, dec!(265200));
    assert_eq!(valuation.total_value_usd, dec!(5100));
    assert_eq!(valuation.fallback_count(), 0);
}

#[tokio::test]
async fn test_invalid_quote_is_rejected_before_storage() {
    let engine = engine();

    let result = engine
        .quotes
        .save_quotes(vec![
            Quote::manual("QQQ", day(3, 4), dec!(510)),
            Quote::manual("QQQ", day(3, 5), dec!(0)),
        ])
        .await;

    assert!(result.is_err());
    assert!(engine.quotes.get_quotes("QQQ").unwrap().is_empty());
}

#[tokio::test]
async fn test_asset_profile_overrides_leverage() {
    let engine = engine();
    let mut profile = AssetMetadata::new("00631L");
    profile.leverage = Some(dec!(2));
    engine.store.upsert(profile).await.unwrap();

    engine
        .ledger
        .record_transaction(NewTransaction::new(
            day(1, 2),
            AssetClass::EquityTw,
            "00631L",
            TradeAction::Buy,
            dec!(100),
            dec!(200),
        ))
        .await
        .unwrap();
    engine
        .quotes
        .save_quotes(vec![Quote::manual("00631L", day(1, 2), dec!(200))])
        .await
        .unwrap();

    let valuation = engine.valuation.current_valuation(day(1, 2)).await.unwrap();

    assert_eq!(valuation.total_value_twd, dec!(20000));
    assert_eq!(valuation.total_exposure_twd, dec!(40000));
    assert_eq!(valuation.leverage_ratio, dec!(2));
}

#[tokio::test]
async fn test_profile_edit_after_buy_refreshes_positions() {
    let engine = engine();
    engine
        .ledger
        .record_transaction(NewTransaction::new(
            day(1, 2),
            AssetClass::EquityTw,
            "00631L",
            TradeAction::Buy,
            dec!(100),
            dec!(200),
        ))
        .await
        .unwrap();
    engine
        .quotes
        .save_quotes(vec![Quote::manual("00631L", day(1, 2), dec!(200))])
        .await
        .unwrap();

    let mut profile = AssetMetadata::new("00631L");
    profile.leverage = Some(dec!(2));
    engine.assets.save_metadata(profile).await.unwrap();

    let valuation = engine.valuation.current_valuation(day(1, 2)).await.unwrap();
    assert_eq!(valuation.total_exposure_twd, dec!(40000));
    assert_eq!(valuation.leverage_ratio, dec!(2));

    engine.assets.delete_metadata("00631L").await.unwrap();

    let valuation = engine.valuation.current_valuation(day(1, 2)).await.unwrap();
    assert_eq!(valuation.total_exposure_twd, dec!(20000));
    assert_eq!(valuation.leverage_ratio, dec!(1));
}
