//! Customer Resolver
//!
//! Maps a local customer to a provider customer, reusing the one behind a
//! previously stored card when there is one.

use std::collections::BTreeMap;
use std::sync::Arc;

use checkout_core::model::GATEWAY_TAG;
use checkout_core::{
    CheckoutError, ClientId, IdentityStore, PaymentMethodRef, PaymentMethodStore,
    RemoteCustomerId, Result, SavedCard,
};

use crate::provider::NewRemoteCustomer;
use crate::settings::ProviderContext;

/// Metadata key linking a provider customer back to the local id
pub const CLIENT_ID_METADATA: &str = "client_id";

/// Metadata key marking customers created before sign-up
pub const GUEST_METADATA: &str = "guest_checkout";

pub struct CustomerResolver {
    context: Option<ProviderContext>,
    identities: Arc<dyn IdentityStore>,
    methods: Arc<dyn PaymentMethodStore>,
}

impl CustomerResolver {
    pub fn new(
        context: Option<ProviderContext>,
        identities: Arc<dyn IdentityStore>,
        methods: Arc<dyn PaymentMethodStore>,
    ) -> Self {
        Self {
            context,
            identities,
            methods,
        }
    }

    /// Provider customer for a local customer, created on first use
    pub async fn resolve(&self, client_id: ClientId) -> Result<RemoteCustomerId> {
        let context = self.context.as_ref().ok_or(CheckoutError::NotConfigured)?;
        let identity = self
            .identities
            .customer(client_id)?
            .ok_or_else(|| CheckoutError::NotFound(format!("customer {client_id}")))?;

        if let Some(existing) = self.reusable_customer(context, client_id).await {
            tracing::debug!(client_id = %client_id, customer = %existing, "Reusing provider customer");
            return Ok(existing);
        }

        let metadata = BTreeMap::from([(CLIENT_ID_METADATA.to_string(), client_id.to_string())]);
        let created = context
            .provider
            .create_customer(NewRemoteCustomer {
                email: identity.email.clone(),
                name: identity.full_name(),
                metadata,
            })
            .await
            .map_err(|e| {
                tracing::error!(client_id = %client_id, error = %e, "Failed to create provider customer");
                e.into_resolver_failure()
            })?;

        tracing::info!(client_id = %client_id, customer = %created, "Created provider customer");
        Ok(created)
    }

    /// Fresh provider customer for a guest checkout, never reused
    pub async fn resolve_guest(&self, email: &str, name: &str) -> Result<RemoteCustomerId> {
        let context = self.context.as_ref().ok_or(CheckoutError::NotConfigured)?;
        let metadata = BTreeMap::from([(GUEST_METADATA.to_string(), "1".to_string())]);
        let created = context
            .provider
            .create_customer(NewRemoteCustomer {
                email: email.to_string(),
                name: name.to_string(),
                metadata,
            })
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to create guest provider customer");
                e.into_resolver_failure()
            })?;

        tracing::info!(customer = %created, "Created guest provider customer");
        Ok(created)
    }

    /// Customer behind the newest stored card that still points at one.
    ///
    /// Every failure on this path means "nothing reusable".
    async fn reusable_customer(
        &self,
        context: &ProviderContext,
        client_id: ClientId,
    ) -> Option<RemoteCustomerId> {
        let saved = match self.methods.active_methods(client_id, GATEWAY_TAG) {
            Ok(saved) => saved,
            Err(e) => {
                tracing::warn!(client_id = %client_id, error = %e, "Could not list stored methods");
                return None;
            }
        };

        for card in saved.iter().rev() {
            let Some(pm) = stored_reference(context, card) else {
                continue;
            };
            match context.provider.retrieve_payment_method(&pm).await {
                Ok(remote) => {
                    if let Some(customer) = remote.customer {
                        return Some(customer);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        client_id = %client_id,
                        payment_method = %pm,
                        error = %e,
                        "Stored payment method lookup failed"
                    );
                }
            }
        }
        None
    }
}

/// Decrypted reference of a stored card, when it is a payment-method id
fn stored_reference(context: &ProviderContext, saved: &SavedCard) -> Option<PaymentMethodRef> {
    match context.cipher.decrypt(&saved.card.remote_ref) {
        Ok(plain) => PaymentMethodRef::parse(&plain),
        Err(e) => {
            tracing::warn!(card_id = saved.card.id.0, error = %e, "Stored reference did not decrypt");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::ReferenceCipher;
    use crate::provider::{MockOp, MockProvider, PaymentProvider, RemoteCard};
    use checkout_core::memory::{MemoryIdentityStore, MemoryPaymentMethodStore};
    use checkout_core::model::{NewCardDetail, NewPaymentMethod, REMOTE_CARD_TYPE};
    use checkout_core::{CustomerIdentity, StoreTransaction};
    use chrono::NaiveDate;

    struct Harness {
        provider: Arc<MockProvider>,
        store: Arc<MemoryPaymentMethodStore>,
        cipher: ReferenceCipher,
        resolver: CustomerResolver,
    }

    fn harness() -> Harness {
        let provider = Arc::new(MockProvider::new());
        let store = Arc::new(MemoryPaymentMethodStore::new());
        let identities = Arc::new(MemoryIdentityStore::new());
        identities
            .add_customer(CustomerIdentity {
                id: ClientId(7),
                email: "ada@example.com".into(),
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
            })
            .unwrap();
        let cipher = ReferenceCipher::ephemeral();
        let context = ProviderContext::new(provider.clone(), cipher.clone(), "pk_test");
        let resolver = CustomerResolver::new(Some(context), identities, store.clone());
        Harness {
            provider,
            store,
            cipher,
            resolver,
        }
    }

    fn store_reference(h: &Harness, reference: &str) {
        let mut tx = h.store.begin().unwrap();
        let card = tx
            .insert_card(NewCardDetail {
                brand: "Visa".into(),
                last_four: "4242".into(),
                expiry_date: NaiveDate::from_ymd_opt(2030, 12, 1).unwrap(),
                remote_ref: h.cipher.encrypt(reference).unwrap(),
            })
            .unwrap();
        let method = tx
            .insert_method(NewPaymentMethod {
                client_id: ClientId(7),
                method_type: REMOTE_CARD_TYPE.into(),
                gateway: GATEWAY_TAG.into(),
                description: "Visa ending in 4242".into(),
                order_preference: 0,
                card_id: card,
            })
            .unwrap();
        tx.link_card(card, method).unwrap();
        tx.commit().unwrap();
    }

    #[tokio::test]
    async fn test_creates_customer_with_identity() {
        let h = harness();
        let customer = h.resolver.resolve(ClientId(7)).await.unwrap();
        assert_eq!(customer.as_str(), "cus_1");

        let (email, name) = h.provider.customer_profile(&customer).unwrap();
        assert_eq!(email, "ada@example.com");
        assert_eq!(name, "Ada Lovelace");
        let metadata = h.provider.customer_metadata(&customer).unwrap();
        assert_eq!(metadata.get(CLIENT_ID_METADATA).map(String::as_str), Some("7"));
    }

    #[tokio::test]
    async fn test_reuses_customer_behind_stored_card() {
        let h = harness();
        let first = h.resolver.resolve(ClientId(7)).await.unwrap();
        let card = RemoteCard {
            brand: "visa".into(),
            last4: "4242".into(),
            exp_month: 12,
            exp_year: 2030,
        };
        let pm = h.provider.add_payment_method(card, Some(first.clone())).unwrap();
        store_reference(&h, pm.as_str());

        let again = h.resolver.resolve(ClientId(7)).await.unwrap();
        assert_eq!(again, first);
        assert_eq!(h.provider.customer_count(), 1);
    }

    #[tokio::test]
    async fn test_ignores_legacy_references_and_lookup_failures() {
        let h = harness();
        store_reference(&h, "cus_legacy");
        store_reference(&h, "pm_404");

        let customer = h.resolver.resolve(ClientId(7)).await.unwrap();
        assert_eq!(customer.as_str(), "cus_1");
        assert_eq!(h.provider.calls_of(MockOp::RetrievePaymentMethod), 1);
    }

    #[tokio::test]
    async fn test_error_taxonomy() {
        let h = harness();
        assert!(matches!(
            h.resolver.resolve(ClientId(99)).await,
            Err(CheckoutError::NotFound(_))
        ));

        h.provider.fail_on(MockOp::CreateCustomer);
        assert!(matches!(
            h.resolver.resolve(ClientId(7)).await,
            Err(CheckoutError::ResolverFailed(_))
        ));

        let unconfigured = CustomerResolver::new(
            None,
            Arc::new(MemoryIdentityStore::new()),
            Arc::new(MemoryPaymentMethodStore::new()),
        );
        assert!(matches!(
            unconfigured.resolve(ClientId(7)).await,
            Err(CheckoutError::NotConfigured)
        ));
        assert_eq!(h.provider.name(), "mock");
    }
}
