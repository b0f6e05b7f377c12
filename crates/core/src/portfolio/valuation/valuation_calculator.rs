use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;

use super::valuation_model::{AssetValuation, FxQuote, PortfolioValuation, PriceSource};
use crate::assets::{AssetClass, Currency};
use crate::portfolio::positions::Position;
use crate::utils::decimal_utils::{percentage_of, ratio_or_zero};

/// Values one position.
///
/// | class  | value                              | exposure             |
/// |--------|------------------------------------|----------------------|
/// | cash   | qty x fx                           | 0                    |
/// | equity | price x qty x fx                   | value x leverage     |
/// | future | margin + (price-cost) x qty x size | price x qty x size   |
///
/// `price` is in the position's currency; for cash it is ignored.
pub fn value_position(
    position: &Position,
    price: Decimal,
    price_source: PriceSource,
    fx: &FxQuote,
) -> AssetValuation {
    let to_twd = fx.to_twd(position.currency);
    let qty = position.quantity;

    let mut valuation = AssetValuation {
        position_id: position.id.clone(),
        symbol: position.symbol.clone(),
        contract_qualifier: position.contract_qualifier.clone(),
        name: position.name.clone(),
        asset_class: position.asset_class,
        currency: position.currency,
        quantity: qty,
        average_cost: position.average_cost,
        price,
        price_source,
        contract_size: position.contract_size,
        margin: position.margin_balance,
        value_twd: Decimal::ZERO,
        exposure_twd: Decimal::ZERO,
        equity_twd: Decimal::ZERO,
        unrealized_pnl_twd: Decimal::ZERO,
        pnl_percentage: Decimal::ZERO,
        leverage: Decimal::ZERO,
        leverage_undefined: false,
    };

    match position.asset_class {
        AssetClass::CashTwd | AssetClass::CashUsd => {
            valuation.price = to_twd;
            valuation.price_source = PriceSource::Unit;
            valuation.value_twd = qty * to_twd;
            valuation.equity_twd = valuation.value_twd;
        }
        AssetClass::EquityTw | AssetClass::EquityUs => {
            let value = price * qty * to_twd;
            let cost = position.average_cost * qty * to_twd;
            let leverage = position.effective_leverage();
            valuation.value_twd = value;
            valuation.equity_twd = value;
            valuation.exposure_twd = value * leverage;
            valuation.unrealized_pnl_twd = value - cost;
            valuation.pnl_percentage = percentage_of(value - cost, cost);
            valuation.leverage = leverage;
        }
        AssetClass::FutureTw => {
            let size = position.contract_size;
            let margin = position.margin_balance * to_twd;
            let pnl = (price - position.average_cost) * qty * size * to_twd;
            let notional = price * qty * size * to_twd;
            valuation.value_twd = margin + pnl;
            valuation.equity_twd = valuation.value_twd;
            valuation.exposure_twd = notional;
            valuation.unrealized_pnl_twd = pnl;
            valuation.pnl_percentage = percentage_of(pnl, margin);
            if margin > Decimal::ZERO {
                valuation.leverage = notional / margin;
            } else {
                debug!(
                    "Position {} has no margin; leverage undefined (cross-margin)",
                    position.id
                );
                valuation.leverage_undefined = true;
            }
        }
    }

    valuation
}

/// Sums per-asset valuations into the portfolio totals.
pub fn aggregate_valuations(
    date: NaiveDate,
    fx: FxQuote,
    assets: Vec<AssetValuation>,
) -> PortfolioValuation {
    let total_value_twd: Decimal = assets.iter().map(|a| a.value_twd).sum();
    let total_exposure_twd: Decimal = assets.iter().map(|a| a.exposure_twd).sum();
    let usd_value_twd: Decimal = assets
        .iter()
        .filter(|a| a.currency == Currency::Usd)
        .map(|a| a.value_twd)
        .sum();
    let total_value_usd = if fx.usd_twd.is_zero() {
        Decimal::ZERO
    } else {
        usd_value_twd / fx.usd_twd
    };

    PortfolioValuation {
        date,
        fx,
        total_value_twd,
        total_value_usd,
        total_exposure_twd,
        leverage_ratio: ratio_or_zero(total_exposure_twd, total_value_twd),
        assets,
    }
}
