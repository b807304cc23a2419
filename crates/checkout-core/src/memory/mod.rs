//! In-Memory Host Adapters
//!
//! Stand-ins for the host platform's tables, for development and tests.

mod activity;
mod fixtures;
mod identity;
mod payment_methods;
mod prices;

pub use activity::MemoryActivityLog;
pub use fixtures::{Fixtures, OrderFixture, PriceFixture};
pub use identity::MemoryIdentityStore;
pub use payment_methods::{FailPoint, MemoryPaymentMethodStore};
pub use prices::MemoryPriceSource;

use crate::error::CheckoutError;

pub(crate) fn poisoned<T>(_: T) -> CheckoutError {
    CheckoutError::Storage("lock poisoned".into())
}
