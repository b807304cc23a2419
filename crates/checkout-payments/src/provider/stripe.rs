//! Stripe Provider
//!
//! `PaymentProvider` over `async-stripe`. Setup intents are created for
//! off-session use with card as the only method type.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use stripe::{
    AttachPaymentMethod, Client, CreateCustomer, CreateSetupIntent, Customer, CustomerId,
    CreateSetupIntentUsage, CustomerInvoiceSettings, Expandable, PaymentMethod, PaymentMethodId, SetupIntent,
    SetupIntentId, UpdateCustomer,
};

use checkout_core::{PaymentMethodRef, RemoteCustomerId};

use super::{
    NewRemoteCustomer, NewSetupIntent, PaymentProvider, RemoteCard, RemoteCustomer,
    RemotePaymentMethod, RemoteSetupIntent,
};
use crate::error::{ProviderError, ProviderResult};

/// Stripe client wrapper
pub struct StripeProvider {
    client: Client,
}

impl StripeProvider {
    pub fn new(secret_key: &str) -> Self {
        Self {
            client: Client::new(secret_key),
        }
    }

    /// Get the underlying Stripe client
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

fn customer_id(id: &RemoteCustomerId) -> ProviderResult<CustomerId> {
    id.as_str()
        .parse()
        .map_err(|_| ProviderError::InvalidId(id.to_string()))
}

fn payment_method_id(id: &PaymentMethodRef) -> ProviderResult<PaymentMethodId> {
    id.as_str()
        .parse()
        .map_err(|_| ProviderError::InvalidId(id.to_string()))
}

fn metadata(map: BTreeMap<String, String>) -> HashMap<String, String> {
    map.into_iter().collect()
}

fn remote_intent(intent: SetupIntent) -> RemoteSetupIntent {
    RemoteSetupIntent {
        id: intent.id.to_string(),
        client_secret: intent.client_secret,
        status: intent.status.as_str().to_string(),
        customer: intent
            .customer
            .map(|c| RemoteCustomerId::new(c.id().to_string())),
        payment_method: intent
            .payment_method
            .map(|pm| PaymentMethodRef::new(pm.id().to_string())),
    }
}

/// Card-only intent for later off-session charges
fn setup_intent_params<'a>(intent: NewSetupIntent) -> ProviderResult<CreateSetupIntent<'a>> {
    let mut params = CreateSetupIntent::new();
    params.customer = Some(customer_id(&intent.customer)?);
    params.payment_method_types = Some(vec!["card".to_string()]);
    params.usage = Some(CreateSetupIntentUsage::OffSession);
    params.metadata = Some(metadata(intent.metadata));
    Ok(params)
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    async fn create_customer(&self, customer: NewRemoteCustomer) -> ProviderResult<RemoteCustomerId> {
        let mut params = CreateCustomer::new();
        params.email = Some(&customer.email);
        params.name = Some(&customer.name);
        params.metadata = Some(metadata(customer.metadata));

        let created = Customer::create(&self.client, params).await?;
        Ok(RemoteCustomerId::new(created.id.to_string()))
    }

    async fn retrieve_customer(&self, id: &RemoteCustomerId) -> ProviderResult<RemoteCustomer> {
        let customer = Customer::retrieve(&self.client, &customer_id(id)?, &[]).await?;
        Ok(RemoteCustomer {
            id: RemoteCustomerId::new(customer.id.to_string()),
            metadata: customer.metadata.unwrap_or_default().into_iter().collect(),
        })
    }

    async fn retrieve_payment_method(
        &self,
        id: &PaymentMethodRef,
    ) -> ProviderResult<RemotePaymentMethod> {
        let pm = PaymentMethod::retrieve(&self.client, &payment_method_id(id)?, &[]).await?;

        let card = pm.card.map(|card| RemoteCard {
            brand: card.brand,
            last4: card.last4,
            exp_month: u32::try_from(card.exp_month).unwrap_or_default(),
            exp_year: i32::try_from(card.exp_year).unwrap_or_default(),
        });

        Ok(RemotePaymentMethod {
            id: PaymentMethodRef::new(pm.id.to_string()),
            customer: pm
                .customer
                .as_ref()
                .map(|c: &Expandable<Customer>| RemoteCustomerId::new(c.id().to_string())),
            card,
        })
    }

    async fn create_setup_intent(&self, intent: NewSetupIntent) -> ProviderResult<RemoteSetupIntent> {
        let params = setup_intent_params(intent)?;
        let created = SetupIntent::create(&self.client, params).await?;
        Ok(remote_intent(created))
    }

    async fn retrieve_setup_intent(&self, id: &str) -> ProviderResult<RemoteSetupIntent> {
        let intent_id: SetupIntentId = id
            .parse()
            .map_err(|_| ProviderError::InvalidId(id.to_string()))?;
        let intent = SetupIntent::retrieve(&self.client, &intent_id, &[]).await?;
        Ok(remote_intent(intent))
    }

    async fn attach_payment_method(
        &self,
        id: &PaymentMethodRef,
        customer: &RemoteCustomerId,
    ) -> ProviderResult<()> {
        PaymentMethod::attach(
            &self.client,
            &payment_method_id(id)?,
            AttachPaymentMethod {
                customer: customer_id(customer)?,
            },
        )
        .await?;
        Ok(())
    }

    async fn set_default_payment_method(
        &self,
        customer: &RemoteCustomerId,
        id: &PaymentMethodRef,
    ) -> ProviderResult<()> {
        let params = UpdateCustomer {
            invoice_settings: Some(CustomerInvoiceSettings {
                default_payment_method: Some(id.as_str().to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        Customer::update(&self.client, &customer_id(customer)?, params).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "stripe"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_intent_is_card_only_and_off_session() {
        let params = setup_intent_params(NewSetupIntent {
            customer: RemoteCustomerId::new("cus_123"),
            metadata: BTreeMap::from([("source".to_string(), "checkout".to_string())]),
        })
        .unwrap();

        assert!(matches!(params.usage, Some(CreateSetupIntentUsage::OffSession)));
        assert_eq!(params.payment_method_types, Some(vec!["card".to_string()]));
        assert_eq!(params.customer.map(|c| c.to_string()).as_deref(), Some("cus_123"));
        assert_eq!(
            params.metadata.and_then(|m| m.get("source").cloned()).as_deref(),
            Some("checkout")
        );
    }

    #[test]
    fn test_malformed_customer_id_is_rejected() {
        let result = setup_intent_params(NewSetupIntent {
            customer: RemoteCustomerId::new("not-a-customer"),
            metadata: BTreeMap::new(),
        });
        assert!(matches!(result, Err(ProviderError::InvalidId(_))));
    }
}
