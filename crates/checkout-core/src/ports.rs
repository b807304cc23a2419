//! Host Platform Ports
//!
//! Interfaces to the commerce platform this add-on runs inside. The platform
//! owns carts, customers, orders and stored payment methods; these traits are
//! the only way the checkout flow touches them.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{
    CardId, ClientId, CustomerIdentity, MethodId, NewCardDetail, NewPaymentMethod, OrderId,
    ProductPricing, SavedCard,
};

/// Read-only price table
pub trait PriceSource: Send + Sync {
    /// Prices for a product in a currency, `None` if the product has no row
    fn pricing(&self, product_id: u64, currency: &str) -> Result<Option<ProductPricing>>;
}

/// Read-only customer and order lookup
pub trait IdentityStore: Send + Sync {
    fn customer(&self, id: ClientId) -> Result<Option<CustomerIdentity>>;

    /// Owning customer of an order
    fn order_owner(&self, order: OrderId) -> Result<Option<ClientId>>;
}

/// Stored payment methods
pub trait PaymentMethodStore: Send + Sync {
    /// Non-deleted methods for a customer tagged with `gateway`, oldest first
    fn active_methods(&self, client_id: ClientId, gateway: &str) -> Result<Vec<SavedCard>>;

    /// Open a write transaction. Dropping it without `commit` rolls back.
    fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>>;
}

/// Write transaction over the method and card tables
pub trait StoreTransaction {
    fn insert_card(&mut self, card: NewCardDetail) -> Result<CardId>;

    fn insert_method(&mut self, method: NewPaymentMethod) -> Result<MethodId>;

    /// Back-fill the card row's method reference
    fn link_card(&mut self, card: CardId, method: MethodId) -> Result<()>;

    fn commit(self: Box<Self>) -> Result<()>;
}

/// One activity-log line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivityEntry {
    pub at: DateTime<Utc>,
    pub message: String,
    pub user_id: Option<ClientId>,
    pub remote_addr: Option<String>,
}

impl ActivityEntry {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            at: Utc::now(),
            message: message.into(),
            user_id: None,
            remote_addr: None,
        }
    }

    #[must_use]
    pub const fn for_user(mut self, user_id: ClientId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    #[must_use]
    pub fn from_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }
}

/// Write-only, fire-and-forget activity log.
///
/// Implementations swallow their own failures.
pub trait ActivityLog: Send + Sync {
    fn record(&self, entry: ActivityEntry);
}

/// Activity log that forwards to `tracing`
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingActivityLog;

impl ActivityLog for TracingActivityLog {
    fn record(&self, entry: ActivityEntry) {
        tracing::info!(
            target: "activity",
            at = %entry.at,
            user_id = ?entry.user_id.map(|id| id.0),
            remote_addr = ?entry.remote_addr,
            "{}",
            entry.message
        );
    }
}
