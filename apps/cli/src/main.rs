mod config;
mod main_lib;
mod scheduler;

use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use config::Config;
use main_lib::{build_state, init_tracing, AppState};
use networth_core::importer::{parser_for, DateWindow, StatementFormat};
use networth_core::market_data::Quote;
use networth_core::transactions::{NewTransaction, TradeAction};
use networth_core::{AssetClass, AssetMetadata, Currency, Error};

#[derive(Parser)]
#[command(name = "networth", version, about = "Position and net worth accounting")]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a broker statement into the ledger.
    Import {
        /// Statement layout: tw or us.
        #[arg(long)]
        format: StatementFormat,
        /// Only keep trades on or after this date (US statements).
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Only keep trades on or before this date (US statements).
        #[arg(long)]
        to: Option<NaiveDate>,
        file: PathBuf,
    },

    /// Record a single hand-entered trade, e.g. a futures open.
    Record(RecordArgs),

    /// Inspect or correct ledger events.
    Transactions {
        #[command(subcommand)]
        cmd: TransactionsCmd,
    },

    /// Regenerate positions and realized PnL from the whole ledger.
    Rebuild,

    /// Show stored positions, cash included.
    Positions,

    /// Value the current positions at spot prices.
    Value,

    /// Regenerate the daily net worth history from the ledger.
    Backfill {
        /// Last day to regenerate; defaults to today.
        #[arg(long)]
        end: Option<NaiveDate>,
    },

    /// Query the net worth history.
    History {
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,
        #[arg(long, default_value_t = 0)]
        skip: i64,
        #[arg(long, default_value_t = 30)]
        limit: i64,
    },

    /// Realized PnL records, or daily and running totals with --cumulative.
    Pnl {
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long)]
        cumulative: bool,
    },

    /// Maintain stored closing prices and USDTWD rates.
    Quote {
        #[command(subcommand)]
        cmd: QuoteCmd,
    },

    /// Maintain cash balances.
    Cash {
        #[command(subcommand)]
        cmd: CashCmd,
    },

    /// Maintain asset profiles (leverage, contract size, margin).
    Asset {
        #[command(subcommand)]
        cmd: AssetCmd,
    },

    /// Write the daily net worth snapshot at the configured time.
    Run {
        /// Write today's snapshot now and exit.
        #[arg(long)]
        once: bool,
    },
}

#[derive(clap::Args)]
struct RecordArgs {
    #[arg(long)]
    date: NaiveDate,
    /// EQUITY_TW, EQUITY_US, FUTURE_TW, CASH_TWD or CASH_USD.
    #[arg(long = "class")]
    asset_class: AssetClass,
    #[arg(long)]
    symbol: String,
    /// BUY, SELL, BUY_OPEN, SELL_CLOSE, BUY_DAY, SELL_DAY, SELL_OPEN or BUY_CLOSE.
    #[arg(long)]
    action: TradeAction,
    #[arg(long)]
    quantity: Decimal,
    #[arg(long)]
    price: Decimal,
    #[arg(long, default_value_t = Decimal::ZERO)]
    fee: Decimal,
    #[arg(long, default_value_t = Decimal::ZERO)]
    tax: Decimal,
    /// Margin posted with a futures open.
    #[arg(long, default_value_t = Decimal::ZERO)]
    margin: Decimal,
    /// Contract month of a futures position.
    #[arg(long)]
    contract: Option<String>,
    #[arg(long)]
    multiplier: Option<Decimal>,
    #[arg(long)]
    name: Option<String>,
    /// Replace the event with this id instead of adding a new one.
    #[arg(long)]
    replace: Option<i64>,
}

impl RecordArgs {
    fn into_transaction(self) -> (Option<i64>, NewTransaction) {
        let mut tx = NewTransaction::new(
            self.date,
            self.asset_class,
            self.symbol,
            self.action,
            self.quantity,
            self.price,
        )
        .with_costs(self.fee, self.tax)
        .with_margin(self.margin)
        .with_contract(self.contract, self.multiplier);
        tx.name = self.name;
        (self.replace, tx)
    }
}

#[derive(Subcommand)]
enum TransactionsCmd {
    List,
    Remove { id: i64 },
}

#[derive(Subcommand)]
enum QuoteCmd {
    Set {
        symbol: String,
        date: NaiveDate,
        close: Decimal,
    },
    List {
        symbol: String,
    },
    Delete {
        symbol: String,
        date: NaiveDate,
    },
}

#[derive(Subcommand)]
enum CashCmd {
    Set { currency: Currency, balance: Decimal },
    Show,
}

#[derive(Subcommand)]
enum AssetCmd {
    Set {
        symbol: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        leverage: Option<Decimal>,
        #[arg(long)]
        contract_size: Option<Decimal>,
        #[arg(long)]
        margin: Option<Decimal>,
        #[arg(long)]
        currency: Option<Currency>,
    },
    List,
    Delete {
        symbol: String,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    init_tracing(&config);
    let state = build_state(&config).await?;
    dispatch(state, cli.cmd).await
}

async fn dispatch(state: Arc<AppState>, cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Import {
            format,
            from,
            to,
            file,
        } => {
            let content = std::fs::read(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let window = (from.is_some() || to.is_some()).then_some(DateWindow {
                start: from,
                end: to,
            });
            let parser = parser_for(format, window);
            let summary = state
                .import_service
                .import_statement(parser.as_ref(), &content)
                .await?;
            print_json(&summary)
        }
        Commands::Record(args) => {
            let result = match args.into_transaction() {
                (Some(id), tx) => state.ledger_service.replace_transaction(id, tx).await?,
                (None, tx) => state.ledger_service.record_transaction(tx).await?,
            };
            print_json(&result)
        }
        Commands::Transactions { cmd } => match cmd {
            TransactionsCmd::List => print_json(&state.ledger_service.list_transactions()?),
            TransactionsCmd::Remove { id } => {
                print_json(&state.ledger_service.remove_transaction(id).await?)
            }
        },
        Commands::Rebuild => print_json(&state.ledger_service.rebuild_derived_state().await?),
        Commands::Positions => print_json(&state.position_service.get_positions()?),
        Commands::Value => {
            let today = state.snapshot_task.today();
            print_json(&state.valuation_service.current_valuation(today).await?)
        }
        Commands::Backfill { end } => backfill(&state, end).await,
        Commands::History {
            from,
            to,
            skip,
            limit,
        } => match (from, to) {
            (Some(start), Some(end)) => print_json(&state.net_worth_service.get_history(start, end)?),
            _ => print_json(&state.net_worth_service.get_recent(skip, limit)?),
        },
        Commands::Pnl {
            symbol,
            from,
            to,
            cumulative,
        } => {
            if cumulative {
                if symbol.is_some() {
                    return Err(anyhow!("--cumulative covers every symbol; drop --symbol"));
                }
                print_json(&state.pnl_service.get_cumulative_pnl(from, to)?)
            } else {
                print_json(&state.pnl_service.get_realized_pnl(symbol.as_deref(), from, to)?)
            }
        }
        Commands::Quote { cmd } => match cmd {
            QuoteCmd::Set {
                symbol,
                date,
                close,
            } => {
                let saved = state
                    .quote_service
                    .save_quotes(vec![Quote::manual(symbol, date, close)])
                    .await?;
                print_json(&serde_json::json!({ "saved": saved }))
            }
            QuoteCmd::List { symbol } => print_json(&state.quote_service.get_quotes(&symbol)?),
            QuoteCmd::Delete { symbol, date } => {
                let deleted = state.quote_service.delete_quote(&symbol, date).await?;
                print_json(&serde_json::json!({ "deleted": deleted }))
            }
        },
        Commands::Cash { cmd } => match cmd {
            CashCmd::Set { currency, balance } => {
                print_json(&state.position_service.set_cash_balance(currency, balance).await?)
            }
            CashCmd::Show => print_json(&state.position_service.get_cash_balances()?),
        },
        Commands::Asset { cmd } => match cmd {
            AssetCmd::Set {
                symbol,
                name,
                leverage,
                contract_size,
                margin,
                currency,
            } => {
                let profile = AssetMetadata {
                    name,
                    leverage,
                    contract_size,
                    margin,
                    currency,
                    ..AssetMetadata::new(symbol)
                };
                print_json(&state.asset_service.save_metadata(profile).await?)
            }
            AssetCmd::List => print_json(&state.asset_service.list_metadata()?),
            AssetCmd::Delete { symbol } => {
                state.asset_service.delete_metadata(&symbol).await?;
                Ok(())
            }
        },
        Commands::Run { once } => {
            if once {
                let snapshot = state.snapshot_task.run_once().await?;
                print_json(&snapshot)
            } else {
                scheduler::run_daily_snapshots(state).await
            }
        }
    }
}

async fn backfill(state: &Arc<AppState>, end: Option<NaiveDate>) -> anyhow::Result<()> {
    let end = end.unwrap_or_else(|| state.snapshot_task.today());
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Cancelling backfill after the current day");
            flag.store(true, Ordering::SeqCst);
        }
    });

    match state.replay_engine.replay(end, &cancel).await {
        Ok(report) => print_json(&report),
        Err(Error::Cancelled(msg)) => Err(anyhow!("Backfill cancelled: {}", msg)),
        Err(e) => Err(e.into()),
    }
}
