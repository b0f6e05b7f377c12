//! Price and FX lookups: the provider capability, stored quotes, and the
//! bounding/caching wrappers every lookup goes through.

mod cached_provider;
mod market_data_errors;
mod market_data_model;
mod market_data_traits;
mod quote_provider;
mod quote_service;
mod resilient_provider;

pub use cached_provider::CachedMarketData;
pub use market_data_errors::MarketDataError;
pub use market_data_model::*;
pub use market_data_traits::{MarketDataProviderTrait, QuoteRepositoryTrait};
pub use quote_provider::QuoteProvider;
pub use quote_service::{QuoteService, QuoteServiceTrait};
pub use resilient_provider::{RetryPolicy, ResilientMarketData};
