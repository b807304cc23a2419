use std::collections::HashMap;
use std::sync::RwLock;

use super::poisoned;
use crate::error::Result;
use crate::model::ProductPricing;
use crate::ports::PriceSource;

/// In-memory price table keyed by (product, currency)
#[derive(Default)]
pub struct MemoryPriceSource {
    rows: RwLock<HashMap<(u64, String), ProductPricing>>,
}

impl MemoryPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a price row
    pub fn insert(&self, product_id: u64, currency: &str, pricing: ProductPricing) {
        if let Ok(mut rows) = self.rows.write() {
            rows.insert((product_id, currency.to_uppercase()), pricing);
        }
    }
}

impl PriceSource for MemoryPriceSource {
    fn pricing(&self, product_id: u64, currency: &str) -> Result<Option<ProductPricing>> {
        let rows = self.rows.read().map_err(poisoned)?;
        Ok(rows.get(&(product_id, currency.to_uppercase())).cloned())
    }
}
