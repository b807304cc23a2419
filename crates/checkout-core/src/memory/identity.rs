use std::collections::HashMap;
use std::sync::RwLock;

use super::poisoned;
use crate::error::Result;
use crate::model::{ClientId, CustomerIdentity, OrderId};
use crate::ports::IdentityStore;

/// In-memory customers and orders
#[derive(Default)]
pub struct MemoryIdentityStore {
    customers: RwLock<HashMap<ClientId, CustomerIdentity>>,
    orders: RwLock<HashMap<OrderId, ClientId>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_customer(&self, customer: CustomerIdentity) -> Result<()> {
        self.customers
            .write()
            .map_err(poisoned)?
            .insert(customer.id, customer);
        Ok(())
    }

    pub fn add_order(&self, order: OrderId, owner: ClientId) -> Result<()> {
        self.orders.write().map_err(poisoned)?.insert(order, owner);
        Ok(())
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn customer(&self, id: ClientId) -> Result<Option<CustomerIdentity>> {
        Ok(self.customers.read().map_err(poisoned)?.get(&id).cloned())
    }

    fn order_owner(&self, order: OrderId) -> Result<Option<ClientId>> {
        Ok(self.orders.read().map_err(poisoned)?.get(&order).copied())
    }
}
