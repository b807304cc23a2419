//! Payment Provider Port
//!
//! The handful of provider operations the validation flow needs, behind a
//! trait so the Stripe SDK can be swapped for the in-memory mock.

mod mock;
mod stripe;

pub use self::mock::{MockCall, MockOp, MockProvider};
pub use self::stripe::StripeProvider;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use checkout_core::{ClientId, PaymentMethodRef, RemoteCustomerId};

use crate::error::ProviderResult;
use crate::resolver::{CLIENT_ID_METADATA, GUEST_METADATA};

/// Customer to create on the provider side
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewRemoteCustomer {
    pub email: String,
    pub name: String,
    pub metadata: BTreeMap<String, String>,
}

/// Provider customer as far as ownership checks need it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteCustomer {
    pub id: RemoteCustomerId,
    pub metadata: BTreeMap<String, String>,
}

impl RemoteCustomer {
    /// Created for this local customer
    pub fn belongs_to(&self, client_id: ClientId) -> bool {
        self.metadata
            .get(CLIENT_ID_METADATA)
            .is_some_and(|v| *v == client_id.to_string())
    }

    /// Created for a checkout before sign-up
    pub fn is_guest(&self) -> bool {
        self.metadata.get(GUEST_METADATA).is_some_and(|v| v == "1")
    }
}

/// Card details of a provider payment method
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCard {
    /// Lowercase brand tag (`visa`, `mastercard`, ...)
    pub brand: String,
    pub last4: String,
    pub exp_month: u32,
    pub exp_year: i32,
}

/// Provider payment method
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemotePaymentMethod {
    pub id: PaymentMethodRef,
    /// Customer the method is attached to, if any
    pub customer: Option<RemoteCustomerId>,
    pub card: Option<RemoteCard>,
}

/// Setup intent to create
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewSetupIntent {
    pub customer: RemoteCustomerId,
    pub metadata: BTreeMap<String, String>,
}

/// Provider setup intent
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteSetupIntent {
    pub id: String,
    pub client_secret: Option<String>,
    /// Provider status string (`requires_payment_method`, `succeeded`, ...)
    pub status: String,
    pub customer: Option<RemoteCustomerId>,
    pub payment_method: Option<PaymentMethodRef>,
}

impl RemoteSetupIntent {
    pub fn succeeded(&self) -> bool {
        self.status == "succeeded"
    }
}

/// Payment provider client (Strategy pattern)
///
/// Single attempt per call; nothing here retries.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_customer(&self, customer: NewRemoteCustomer) -> ProviderResult<RemoteCustomerId>;

    async fn retrieve_customer(&self, id: &RemoteCustomerId) -> ProviderResult<RemoteCustomer>;

    async fn retrieve_payment_method(
        &self,
        id: &PaymentMethodRef,
    ) -> ProviderResult<RemotePaymentMethod>;

    /// Card-only, off-session setup intent
    async fn create_setup_intent(&self, intent: NewSetupIntent) -> ProviderResult<RemoteSetupIntent>;

    async fn retrieve_setup_intent(&self, id: &str) -> ProviderResult<RemoteSetupIntent>;

    async fn attach_payment_method(
        &self,
        id: &PaymentMethodRef,
        customer: &RemoteCustomerId,
    ) -> ProviderResult<()>;

    /// Make the method the customer's default for invoices
    async fn set_default_payment_method(
        &self,
        customer: &RemoteCustomerId,
        id: &PaymentMethodRef,
    ) -> ProviderResult<()>;

    /// Provider name
    fn name(&self) -> &str;
}
