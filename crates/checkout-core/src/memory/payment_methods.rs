use std::collections::BTreeMap;
use std::sync::{Mutex, RwLock, RwLockWriteGuard};

use chrono::Utc;

use super::poisoned;
use crate::error::{CheckoutError, Result};
use crate::model::{
    CardDetail, CardId, ClientId, MethodId, NewCardDetail, NewPaymentMethod, SavedCard,
    StoredPaymentMethod,
};
use crate::ports::{PaymentMethodStore, StoreTransaction};

/// Transaction step at which an injected failure fires
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailPoint {
    InsertCard,
    InsertMethod,
    LinkCard,
    Commit,
}

#[derive(Clone, Default)]
struct Tables {
    methods: BTreeMap<MethodId, StoredPaymentMethod>,
    cards: BTreeMap<CardId, CardDetail>,
    next_method: u64,
    next_card: u64,
}

/// In-memory method and card tables with whole-table transactions.
///
/// A transaction holds the write lock and works on a staged copy that only
/// replaces the live tables on commit.
#[derive(Default)]
pub struct MemoryPaymentMethodStore {
    tables: RwLock<Tables>,
    fail_at: Mutex<Option<FailPoint>>,
}

impl MemoryPaymentMethodStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next transaction fail at `point`
    pub fn fail_next(&self, point: FailPoint) {
        if let Ok(mut fail_at) = self.fail_at.lock() {
            *fail_at = Some(point);
        }
    }

    pub fn method_count(&self) -> usize {
        self.tables.read().map(|t| t.methods.len()).unwrap_or_default()
    }

    pub fn card_count(&self) -> usize {
        self.tables.read().map(|t| t.cards.len()).unwrap_or_default()
    }

    /// Every row for a customer, deleted ones included
    pub fn all_for(&self, client_id: ClientId) -> Result<Vec<SavedCard>> {
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(joined(&tables, |m| m.client_id == client_id))
    }

    /// Soft-delete, as the host platform does when a customer removes a card
    pub fn soft_delete(&self, method: MethodId) -> Result<()> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        let row = tables
            .methods
            .get_mut(&method)
            .ok_or_else(|| CheckoutError::NotFound(format!("payment method {}", method.0)))?;
        row.deleted_at = Some(Utc::now());
        Ok(())
    }
}

fn joined(tables: &Tables, keep: impl Fn(&StoredPaymentMethod) -> bool) -> Vec<SavedCard> {
    let mut rows: Vec<SavedCard> = tables
        .methods
        .values()
        .filter(|m| keep(m))
        .filter_map(|m| {
            tables.cards.get(&m.card_id).map(|card| SavedCard {
                method: m.clone(),
                card: card.clone(),
            })
        })
        .collect();
    rows.sort_by_key(|row| (row.method.order_preference, row.method.id));
    rows
}

impl PaymentMethodStore for MemoryPaymentMethodStore {
    fn active_methods(&self, client_id: ClientId, gateway: &str) -> Result<Vec<SavedCard>> {
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(joined(&tables, |m| {
            m.client_id == client_id && m.gateway == gateway && m.is_active()
        }))
    }

    fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>> {
        let fail_at = self.fail_at.lock().map_err(poisoned)?.take();
        let guard = self.tables.write().map_err(poisoned)?;
        let staged = guard.clone();
        Ok(Box::new(MemoryTransaction {
            guard,
            staged,
            fail_at,
        }))
    }
}

struct MemoryTransaction<'a> {
    guard: RwLockWriteGuard<'a, Tables>,
    staged: Tables,
    fail_at: Option<FailPoint>,
}

impl MemoryTransaction<'_> {
    fn check(&self, point: FailPoint) -> Result<()> {
        if self.fail_at == Some(point) {
            return Err(CheckoutError::Storage(format!("injected failure at {point:?}")));
        }
        Ok(())
    }
}

impl StoreTransaction for MemoryTransaction<'_> {
    fn insert_card(&mut self, card: NewCardDetail) -> Result<CardId> {
        self.check(FailPoint::InsertCard)?;
        self.staged.next_card += 1;
        let id = CardId(self.staged.next_card);
        let now = Utc::now();
        self.staged.cards.insert(
            id,
            CardDetail {
                id,
                method_id: None,
                brand: card.brand,
                last_four: card.last_four,
                expiry_date: card.expiry_date,
                remote_ref: card.remote_ref,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    fn insert_method(&mut self, method: NewPaymentMethod) -> Result<MethodId> {
        self.check(FailPoint::InsertMethod)?;
        if !self.staged.cards.contains_key(&method.card_id) {
            return Err(CheckoutError::Storage(format!(
                "card {} does not exist",
                method.card_id.0
            )));
        }
        self.staged.next_method += 1;
        let id = MethodId(self.staged.next_method);
        self.staged.methods.insert(
            id,
            StoredPaymentMethod {
                id,
                client_id: method.client_id,
                method_type: method.method_type,
                gateway: method.gateway,
                description: method.description,
                order_preference: method.order_preference,
                card_id: method.card_id,
                created_at: Utc::now(),
                deleted_at: None,
            },
        );
        Ok(id)
    }

    fn link_card(&mut self, card: CardId, method: MethodId) -> Result<()> {
        self.check(FailPoint::LinkCard)?;
        let row = self
            .staged
            .cards
            .get_mut(&card)
            .ok_or_else(|| CheckoutError::Storage(format!("card {} does not exist", card.0)))?;
        row.method_id = Some(method);
        row.updated_at = Utc::now();
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<()> {
        self.check(FailPoint::Commit)?;
        let Self {
            mut guard, staged, ..
        } = *self;
        *guard = staged;
        Ok(())
    }
}
