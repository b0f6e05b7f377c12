use async_trait::async_trait;
use chrono::NaiveDate;
use log::info;
use std::sync::Arc;

use super::market_data_model::Quote;
use super::market_data_traits::QuoteRepositoryTrait;
use crate::errors::Result;

#[async_trait]
pub trait QuoteServiceTrait: Send + Sync {
    /// Validates and stores quotes, replacing any on the same (symbol, date).
    async fn save_quotes(&self, quotes: Vec<Quote>) -> Result<usize>;

    fn get_quotes(&self, symbol: &str) -> Result<Vec<Quote>>;

    async fn delete_quote(&self, symbol: &str, date: NaiveDate) -> Result<usize>;
}

pub struct QuoteService {
    repository: Arc<dyn QuoteRepositoryTrait>,
}

impl QuoteService {
    pub fn new(repository: Arc<dyn QuoteRepositoryTrait>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl QuoteServiceTrait for QuoteService {
    async fn save_quotes(&self, quotes: Vec<Quote>) -> Result<usize> {
        let quotes = quotes
            .into_iter()
            .map(|mut q| {
                q.symbol = q.symbol.trim().to_uppercase();
                q.validate().map(|_| q)
            })
            .collect::<Result<Vec<_>>>()?;
        let saved = self.repository.save_quotes(quotes).await?;
        info!("Saved {} quotes", saved);
        Ok(saved)
    }

    fn get_quotes(&self, symbol: &str) -> Result<Vec<Quote>> {
        self.repository.list(&symbol.trim().to_uppercase())
    }

    async fn delete_quote(&self, symbol: &str, date: NaiveDate) -> Result<usize> {
        self.repository
            .delete_quote(&symbol.trim().to_uppercase(), date)
            .await
    }
}
