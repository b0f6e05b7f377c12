use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::SqliteConnection;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

use crate::assets::AssetMetadataRepository;
use crate::db::{create_pool, init, run_migrations, spawn_writer, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::market_data::QuoteRepository;
use crate::portfolio::net_worth::NetWorthSnapshotRepository;
use crate::portfolio::pnl::RealizedPnLRepository;
use crate::portfolio::positions::PositionRepository;
use crate::schema::transactions;
use crate::transactions::TransactionRepository;
use networth_core::errors::{Error, ValidationError};
use networth_core::market_data::{Quote, QuoteRepositoryTrait};
use networth_core::net_worth::{NetWorthSnapshot, SnapshotRepositoryTrait};
use networth_core::pnl::RealizedPnLRepositoryTrait;
use networth_core::positions::PositionRepositoryTrait;
use networth_core::transactions::{
    LedgerService, LedgerServiceTrait, NewTransaction, TradeAction, TransactionRepositoryTrait,
};
use networth_core::valuation::FxSource;
use networth_core::{AssetClass, AssetMetadata, AssetMetadataRepositoryTrait, Currency};

async fn setup() -> (Arc<DbPool>, WriteHandle, TempDir) {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("test.db");
    let db_path = init(&db_path.to_string_lossy()).expect("Failed to init database");

    let pool = create_pool(&db_path).expect("Failed to create pool");
    run_migrations(&pool).expect("Failed to run migrations");
    let writer = spawn_writer((*pool).clone());
    (pool, writer, temp_dir)
}

fn day(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, m, d).unwrap()
}

fn ledger(pool: &Arc<DbPool>, writer: &WriteHandle) -> LedgerService {
    LedgerService::new(
        Arc::new(TransactionRepository::new(pool.clone(), writer.clone())),
        Arc::new(AssetMetadataRepository::new(pool.clone(), writer.clone())),
    )
}

fn round_trip() -> Vec<NewTransaction> {
    vec![
        NewTransaction::new(
            day(1, 2),
            AssetClass::EquityTw,
            "2330",
            TradeAction::Buy,
            dec!(1000),
            dec!(10.5),
        )
        .with_costs(dec!(20), dec!(0)),
        NewTransaction::new(
            day(2, 1),
            AssetClass::EquityTw,
            "2330",
            TradeAction::Sell,
            dec!(1000),
            dec!(12.0),
        )
        .with_costs(dec!(15), dec!(5)),
    ]
}

#[tokio::test]
async fn test_ledger_commit_persists_events_and_pnl() {
    let (pool, writer, _dir) = setup().await;
    let service = ledger(&pool, &writer);

    service.ingest_batch(round_trip()).await.unwrap();

    let transactions = TransactionRepository::new(pool.clone(), writer.clone());
    let events = transactions.list_all().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].price, dec!(10.5));
    assert_eq!(events[1].tax, dec!(5));
    assert_eq!(transactions.max_id().unwrap(), 2);

    let realized = RealizedPnLRepository::new(pool.clone())
        .list(Some("2330"), None, None)
        .unwrap();
    assert_eq!(realized.len(), 1);
    assert_eq!(realized[0].pnl, dec!(1460));
    assert_eq!(realized[0].currency, Currency::Twd);

    let positions = PositionRepository::new(pool.clone(), writer.clone());
    assert!(positions.list().unwrap().is_empty());
}

#[tokio::test]
async fn test_reimport_is_idempotent_on_disk() {
    let (pool, writer, _dir) = setup().await;
    let service = ledger(&pool, &writer);

    service.ingest_batch(round_trip()).await.unwrap();
    let second = service.ingest_batch(round_trip()).await.unwrap();

    assert_eq!(second.inserted_count(), 0);
    let transactions = TransactionRepository::new(pool.clone(), writer.clone());
    assert_eq!(transactions.list_all().unwrap().len(), 2);
    let realized = RealizedPnLRepository::new(pool.clone()).list(None, None, None).unwrap();
    assert_eq!(realized.len(), 1);
}

#[tokio::test]
async fn test_commit_keeps_cash_and_replaces_holdings() {
    let (pool, writer, _dir) = setup().await;
    let positions = PositionRepository::new(pool.clone(), writer.clone());
    positions.upsert_cash(Currency::Twd, dec!(100000)).await.unwrap();
    let service = ledger(&pool, &writer);

    service.ingest_batch(vec![round_trip().remove(0)]).await.unwrap();

    let stored = positions.list().unwrap();
    assert_eq!(stored.len(), 2);
    let holding = positions.get("POS-2330").unwrap().unwrap();
    assert_eq!(holding.quantity, dec!(1000));
    assert_eq!(holding.lots.len(), 1);
    assert_eq!(holding.lots[0].unit_price, dec!(10.5));
    assert_eq!(positions.list_cash().unwrap()[0].quantity, dec!(100000));

    // closing the position removes it; cash stays
    service.ingest_batch(vec![round_trip().remove(1)]).await.unwrap();
    let stored = positions.list().unwrap();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].asset_class.is_cash());
}

#[tokio::test]
async fn test_failed_write_job_rolls_back_and_keeps_error() {
    let (pool, writer, _dir) = setup().await;

    let result = writer
        .exec(|conn: &mut SqliteConnection| -> networth_core::Result<()> {
            diesel::sql_query(
                "INSERT INTO transactions (id, date, asset_class, symbol, action, price, quantity, created_at) \
                 VALUES (1, '2025-01-02', 'EQUITY_TW', '2330', 'BUY', '10', '1', '2025-01-02T00:00:00Z')",
            )
            .execute(conn)
            .map_err(StorageError::from)?;
            Err(ValidationError::InvalidInput("rejected".to_string()).into())
        })
        .await;

    assert!(matches!(result, Err(Error::Validation(_))));
    let mut conn = pool.get().unwrap();
    let count: i64 = transactions::table.count().get_result(&mut conn).unwrap();
    assert_eq!(count, 0);
}

fn snapshot(date: NaiveDate, total: rust_decimal::Decimal) -> NetWorthSnapshot {
    NetWorthSnapshot {
        date,
        total_value_twd: total,
        total_value_usd: dec!(0),
        total_exposure_twd: dec!(0),
        leverage_ratio: dec!(0),
        usd_twd_rate: dec!(32.5),
        fx_source: FxSource::LookBack {
            observed_on: day(1, 1),
        },
        details: vec![],
    }
}

#[tokio::test]
async fn test_snapshot_history_queries() {
    let (pool, writer, _dir) = setup().await;
    let repo = NetWorthSnapshotRepository::new(pool.clone(), writer.clone());

    for (d, total) in [(2, dec!(100)), (3, dec!(110)), (4, dec!(120))] {
        repo.upsert_snapshot(snapshot(day(1, d), total)).await.unwrap();
    }
    // same date overwrites
    repo.upsert_snapshot(snapshot(day(1, 3), dec!(115))).await.unwrap();

    let range = repo.list_range(day(1, 3), day(1, 31)).unwrap();
    assert_eq!(range.len(), 2);
    assert_eq!(range[0].total_value_twd, dec!(115));
    assert_eq!(range[0].fx_source, FxSource::LookBack { observed_on: day(1, 1) });

    let recent = repo.list_recent(1, 5).unwrap();
    assert_eq!(
        recent.iter().map(|s| s.date).collect::<Vec<_>>(),
        vec![day(1, 3), day(1, 2)]
    );
    assert_eq!(repo.get(day(1, 4)).unwrap().unwrap().total_value_twd, dec!(120));
    assert!(repo.get(day(1, 5)).unwrap().is_none());

    assert_eq!(repo.delete_all().await.unwrap(), 3);
    assert!(repo.list_recent(0, 10).unwrap().is_empty());
}

#[tokio::test]
async fn test_quote_lookups() {
    let (pool, writer, _dir) = setup().await;
    let repo = QuoteRepository::new(pool.clone(), writer.clone());

    repo.save_quotes(vec![
        Quote::manual("QQQ", day(1, 2), dec!(500)),
        Quote::manual("QQQ", day(1, 6), dec!(505.25)),
        Quote::manual("USDTWD", day(1, 2), dec!(32.8)),
    ])
    .await
    .unwrap();
    // replace on the same (symbol, date)
    repo.save_quotes(vec![Quote::manual("QQQ", day(1, 2), dec!(501))])
        .await
        .unwrap();

    assert_eq!(repo.get_quote("QQQ", day(1, 2)).unwrap().unwrap().close, dec!(501));
    assert!(repo.get_quote("QQQ", day(1, 3)).unwrap().is_none());

    let looked_back = repo.latest_on_or_before("QQQ", day(1, 5), day(1, 1)).unwrap().unwrap();
    assert_eq!(looked_back.date, day(1, 2));
    assert!(repo
        .latest_on_or_before("QQQ", day(1, 5), day(1, 3))
        .unwrap()
        .is_none());

    assert_eq!(repo.latest("QQQ").unwrap().unwrap().close, dec!(505.25));
    assert_eq!(repo.list("QQQ").unwrap().len(), 2);

    assert_eq!(repo.delete_quote("QQQ", day(1, 6)).await.unwrap(), 1);
    assert_eq!(repo.latest("QQQ").unwrap().unwrap().date, day(1, 2));
}

#[tokio::test]
async fn test_asset_profiles() {
    let (pool, writer, _dir) = setup().await;
    let repo = AssetMetadataRepository::new(pool.clone(), writer.clone());

    let mut profile = AssetMetadata::new("MTX");
    profile.contract_size = Some(dec!(50));
    profile.margin = Some(dec!(46000));
    profile.currency = Some(Currency::Twd);
    repo.upsert(profile.clone()).await.unwrap();

    // upsert replaces; cleared fields come back empty
    profile.margin = None;
    repo.upsert(profile.clone()).await.unwrap();

    assert_eq!(repo.get("MTX").unwrap(), Some(profile));
    assert_eq!(repo.load_map().unwrap().len(), 1);
    assert_eq!(repo.delete("MTX").await.unwrap(), 1);
    assert!(repo.list().unwrap().is_empty());
}
