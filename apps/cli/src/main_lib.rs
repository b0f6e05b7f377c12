use std::sync::Arc;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use networth_core::{
    assets::{AssetService, AssetServiceTrait},
    importer::{ImportService, ImportServiceTrait},
    market_data::{
        CachedMarketData, MarketDataProviderTrait, QuoteProvider, QuoteService, QuoteServiceTrait,
        ResilientMarketData, RetryPolicy,
    },
    net_worth::{
        DailySnapshotTask, HistoricalReplayEngine, NetWorthService, NetWorthServiceTrait,
        SystemClock,
    },
    pnl::{PnLService, PnLServiceTrait},
    positions::{PositionService, PositionServiceTrait},
    settings::EngineSettings,
    transactions::{LedgerService, LedgerServiceTrait},
    valuation::{ValuationService, ValuationServiceTrait},
};
use networth_storage_sqlite::{
    assets::AssetMetadataRepository,
    db,
    market_data::QuoteRepository,
    portfolio::{
        net_worth::NetWorthSnapshotRepository, pnl::RealizedPnLRepository,
        positions::PositionRepository,
    },
    transactions::TransactionRepository,
};

pub struct AppState {
    pub settings: EngineSettings,
    pub ledger_service: Arc<dyn LedgerServiceTrait>,
    pub import_service: Arc<dyn ImportServiceTrait>,
    pub position_service: Arc<dyn PositionServiceTrait>,
    pub pnl_service: Arc<dyn PnLServiceTrait>,
    pub asset_service: Arc<dyn AssetServiceTrait>,
    pub quote_service: Arc<dyn QuoteServiceTrait>,
    pub valuation_service: Arc<dyn ValuationServiceTrait>,
    pub net_worth_service: Arc<dyn NetWorthServiceTrait>,
    pub replay_engine: Arc<HistoricalReplayEngine>,
    pub snapshot_task: Arc<DailySnapshotTask>,
    /// Lookup memo shared by the valuation paths; cleared between scheduled runs.
    pub market_data_cache: Arc<CachedMarketData>,
}

/// Installs the global subscriber on stderr so that stdout only carries
/// command output. `log` records from the library crates are forwarded
/// through the `tracing-log` bridge installed by `init`.
pub fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if config.json_logs() {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let db_path = db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let writer = db::spawn_writer((*pool).clone());

    let settings = config.engine_settings();

    let transaction_repo = Arc::new(TransactionRepository::new(pool.clone(), writer.clone()));
    let metadata_repo = Arc::new(AssetMetadataRepository::new(pool.clone(), writer.clone()));
    let position_repo = Arc::new(PositionRepository::new(pool.clone(), writer.clone()));
    let pnl_repo = Arc::new(RealizedPnLRepository::new(pool.clone()));
    let snapshot_repo = Arc::new(NetWorthSnapshotRepository::new(pool.clone(), writer.clone()));
    let quote_repo = Arc::new(QuoteRepository::new(pool.clone(), writer.clone()));

    let ledger_service: Arc<dyn LedgerServiceTrait> = Arc::new(LedgerService::new(
        transaction_repo.clone(),
        metadata_repo.clone(),
    ));
    let import_service = Arc::new(ImportService::new(ledger_service.clone()));

    let stored_quotes: Arc<dyn MarketDataProviderTrait> =
        Arc::new(QuoteProvider::new(quote_repo.clone()));
    let bounded: Arc<dyn MarketDataProviderTrait> = Arc::new(ResilientMarketData::new(
        stored_quotes,
        RetryPolicy::from(&settings.lookup),
    ));
    let market_data_cache = Arc::new(CachedMarketData::new(bounded));

    let valuation_service: Arc<dyn ValuationServiceTrait> = Arc::new(ValuationService::new(
        position_repo.clone(),
        market_data_cache.clone(),
        settings.clone(),
    ));
    let replay_engine = Arc::new(HistoricalReplayEngine::new(
        transaction_repo,
        metadata_repo.clone(),
        position_repo.clone(),
        snapshot_repo.clone(),
        valuation_service.clone(),
    ));
    let snapshot_task = Arc::new(DailySnapshotTask::new(
        snapshot_repo.clone(),
        valuation_service.clone(),
        Arc::new(SystemClock),
        settings.clone(),
    ));

    Ok(Arc::new(AppState {
        settings,
        ledger_service: ledger_service.clone(),
        import_service,
        position_service: Arc::new(PositionService::new(position_repo)),
        pnl_service: Arc::new(PnLService::new(pnl_repo)),
        asset_service: Arc::new(AssetService::new(metadata_repo, ledger_service.clone())),
        quote_service: Arc::new(QuoteService::new(quote_repo)),
        valuation_service,
        net_worth_service: Arc::new(NetWorthService::new(snapshot_repo)),
        replay_engine,
        snapshot_task,
        market_data_cache,
    }))
}
