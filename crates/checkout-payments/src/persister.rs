//! Payment-Method Persister
//!
//! Records a validated provider card as a stored payment method: one card
//! row and one method row, written in a single store transaction.

use std::sync::Arc;

use chrono::NaiveDate;

use checkout_core::model::{
    card_label, title_case_brand, CardId, MethodId, NewCardDetail, NewPaymentMethod, GATEWAY_TAG,
    REMOTE_CARD_TYPE,
};
use checkout_core::{
    ActivityEntry, ActivityLog, CheckoutError, ClientId, PaymentMethodRef, PaymentMethodStore,
    RemoteCustomerId, Result,
};

use crate::provider::RemoteCard;
use crate::settings::ProviderContext;

/// What was written
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistedCard {
    pub method_id: MethodId,
    pub card_id: CardId,
    pub label: String,
}

pub struct PaymentMethodPersister {
    context: Option<ProviderContext>,
    store: Arc<dyn PaymentMethodStore>,
    activity: Arc<dyn ActivityLog>,
}

impl PaymentMethodPersister {
    pub fn new(
        context: Option<ProviderContext>,
        store: Arc<dyn PaymentMethodStore>,
        activity: Arc<dyn ActivityLog>,
    ) -> Self {
        Self {
            context,
            store,
            activity,
        }
    }

    /// Store the card, reporting only success.
    ///
    /// Every failure is logged and swallowed; an unconfigured provider is a
    /// silent `false`.
    pub async fn persist(
        &self,
        client_id: ClientId,
        payment_method: &PaymentMethodRef,
        customer: Option<&RemoteCustomerId>,
    ) -> bool {
        match self.try_persist(client_id, payment_method, customer).await {
            Ok(_) => true,
            Err(CheckoutError::NotConfigured) => false,
            Err(e) => {
                tracing::warn!(
                    client_id = %client_id,
                    payment_method = %payment_method,
                    error = %e,
                    "Validated card was not stored"
                );
                false
            }
        }
    }

    pub async fn try_persist(
        &self,
        client_id: ClientId,
        payment_method: &PaymentMethodRef,
        customer: Option<&RemoteCustomerId>,
    ) -> Result<PersistedCard> {
        let context = self.context.as_ref().ok_or(CheckoutError::NotConfigured)?;

        let remote = context
            .provider
            .retrieve_payment_method(payment_method)
            .await
            .map_err(|e| {
                tracing::error!(payment_method = %payment_method, error = %e, "Failed to retrieve payment method");
                CheckoutError::from(e)
            })?;
        let card = remote.card.ok_or_else(|| {
            tracing::warn!(payment_method = %payment_method, "Payment method has no card details");
            CheckoutError::PersistenceFailed(format!("{payment_method} is not a card"))
        })?;

        let expiry_date = first_of_expiry_month(&card)?;
        let remote_ref = context.cipher.encrypt(payment_method.as_str())?;
        let order_preference = self
            .store
            .active_methods(client_id, GATEWAY_TAG)
            .map(|rows| u32::try_from(rows.len()).unwrap_or(u32::MAX))?;

        let label = card_label(&card.brand, &card.last4);
        let written = self
            .write_pair(client_id, &card, expiry_date, remote_ref, &label, order_preference)
            .map_err(|e| CheckoutError::PersistenceFailed(e.to_string()))?;

        tracing::info!(
            client_id = %client_id,
            customer = ?customer.map(RemoteCustomerId::as_str),
            card = %label,
            method_id = written.method_id.0,
            "Stored validated card"
        );
        self.activity.record(
            ActivityEntry::new(format!("Stored card {label} from zero-total checkout"))
                .for_user(client_id),
        );

        Ok(written)
    }

    /// Card row, method row, back-reference. Dropping the transaction on any
    /// error discards all three.
    fn write_pair(
        &self,
        client_id: ClientId,
        card: &RemoteCard,
        expiry_date: NaiveDate,
        remote_ref: String,
        label: &str,
        order_preference: u32,
    ) -> Result<PersistedCard> {
        let mut tx = self.store.begin()?;
        let card_id = tx.insert_card(NewCardDetail {
            brand: title_case_brand(&card.brand),
            last_four: card.last4.clone(),
            expiry_date,
            remote_ref,
        })?;
        let method_id = tx.insert_method(NewPaymentMethod {
            client_id,
            method_type: REMOTE_CARD_TYPE.to_string(),
            gateway: GATEWAY_TAG.to_string(),
            description: label.to_string(),
            order_preference,
            card_id,
        })?;
        tx.link_card(card_id, method_id)?;
        tx.commit()?;

        Ok(PersistedCard {
            method_id,
            card_id,
            label: label.to_string(),
        })
    }
}

fn first_of_expiry_month(card: &RemoteCard) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(card.exp_year, card.exp_month, 1).ok_or_else(|| {
        CheckoutError::PersistenceFailed(format!(
            "invalid expiry {:02}/{}",
            card.exp_month, card.exp_year
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::ReferenceCipher;
    use crate::provider::{MockProvider, RemoteCard};
    use checkout_core::memory::{FailPoint, MemoryActivityLog, MemoryPaymentMethodStore};

    struct Harness {
        provider: Arc<MockProvider>,
        store: Arc<MemoryPaymentMethodStore>,
        activity: Arc<MemoryActivityLog>,
        cipher: ReferenceCipher,
        persister: PaymentMethodPersister,
    }

    fn harness() -> Harness {
        let provider = Arc::new(MockProvider::new());
        let store = Arc::new(MemoryPaymentMethodStore::new());
        let activity = Arc::new(MemoryActivityLog::new());
        let cipher = ReferenceCipher::ephemeral();
        let context = ProviderContext::new(provider.clone(), cipher.clone(), "pk_test");
        let persister = PaymentMethodPersister::new(Some(context), store.clone(), activity.clone());
        Harness {
            provider,
            store,
            activity,
            cipher,
            persister,
        }
    }

    fn visa(h: &Harness) -> PaymentMethodRef {
        let card = RemoteCard {
            brand: "visa".into(),
            last4: "4242".into(),
            exp_month: 12,
            exp_year: 2030,
        };
        h.provider.add_payment_method(card, None).unwrap()
    }

    #[tokio::test]
    async fn test_persists_linked_pair() {
        let h = harness();
        let pm = visa(&h);

        let written = h.persister.try_persist(ClientId(7), &pm, None).await.unwrap();
        assert_eq!(written.label, "Visa ending in 4242");

        let rows = h.store.active_methods(ClientId(7), GATEWAY_TAG).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.method.method_type, REMOTE_CARD_TYPE);
        assert_eq!(row.method.description, "Visa ending in 4242");
        assert_eq!(row.card.brand, "Visa");
        assert_eq!(row.card.method_id, Some(row.method.id));
        assert_eq!(row.card.expiry_date, NaiveDate::from_ymd_opt(2030, 12, 1).unwrap());
        assert_ne!(row.card.remote_ref, pm.as_str());
        assert_eq!(h.cipher.decrypt(&row.card.remote_ref).unwrap(), pm.as_str());

        assert_eq!(h.activity.matching("Visa ending in 4242").len(), 1);
    }

    #[tokio::test]
    async fn test_ordering_follows_existing_methods() {
        let h = harness();
        let first = visa(&h);
        let second = visa(&h);
        h.persister.try_persist(ClientId(7), &first, None).await.unwrap();
        h.persister.try_persist(ClientId(7), &second, None).await.unwrap();

        let prefs: Vec<u32> = h
            .store
            .active_methods(ClientId(7), GATEWAY_TAG)
            .unwrap()
            .iter()
            .map(|row| row.method.order_preference)
            .collect();
        assert_eq!(prefs, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_failure_after_first_insert_leaves_nothing() {
        for point in [FailPoint::InsertMethod, FailPoint::LinkCard, FailPoint::Commit] {
            let h = harness();
            let pm = visa(&h);
            h.store.fail_next(point);

            assert!(!h.persister.persist(ClientId(7), &pm, None).await);
            assert_eq!(h.store.card_count(), 0, "orphan card after {point:?}");
            assert_eq!(h.store.method_count(), 0, "orphan method after {point:?}");
            assert!(h.activity.entries().is_empty());
        }
    }

    #[tokio::test]
    async fn test_unknown_method_is_not_stored() {
        let h = harness();
        let missing = PaymentMethodRef::new("pm_missing");
        assert!(!h.persister.persist(ClientId(7), &missing, None).await);
        assert_eq!(h.store.method_count(), 0);
    }

    #[tokio::test]
    async fn test_unconfigured_is_silent_false() {
        let store = Arc::new(MemoryPaymentMethodStore::new());
        let persister =
            PaymentMethodPersister::new(None, store.clone(), Arc::new(MemoryActivityLog::new()));
        assert!(!persister.persist(ClientId(7), &PaymentMethodRef::new("pm_1"), None).await);
        assert!(matches!(
            persister.try_persist(ClientId(7), &PaymentMethodRef::new("pm_1"), None).await,
            Err(CheckoutError::NotConfigured)
        ));
    }
}
