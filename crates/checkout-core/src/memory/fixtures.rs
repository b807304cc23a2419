use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{MemoryIdentityStore, MemoryPriceSource};
use crate::error::Result;
use crate::model::{ClientId, CustomerIdentity, OrderId, ProductPricing};

/// Seed data for the in-memory stores
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Fixtures {
    #[serde(default)]
    pub customers: Vec<CustomerIdentity>,
    #[serde(default)]
    pub orders: Vec<OrderFixture>,
    #[serde(default)]
    pub prices: Vec<PriceFixture>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderFixture {
    pub id: OrderId,
    pub client_id: ClientId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PriceFixture {
    pub product_id: u64,
    pub currency: String,
    #[serde(flatten)]
    pub pricing: ProductPricing,
}

impl Fixtures {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn apply(&self, identities: &MemoryIdentityStore, prices: &MemoryPriceSource) -> Result<()> {
        for customer in &self.customers {
            identities.add_customer(customer.clone())?;
        }
        for order in &self.orders {
            identities.add_order(order.id, order.client_id)?;
        }
        for row in &self.prices {
            prices.insert(row.product_id, &row.currency, row.pricing.clone());
        }
        tracing::info!(
            customers = self.customers.len(),
            orders = self.orders.len(),
            prices = self.prices.len(),
            "Loaded fixtures"
        );
        Ok(())
    }
}
