//! Mock Provider
//!
//! In-memory `PaymentProvider` for tests and the fixture-backed dev server.
//! Ids are sequential per kind (`cus_1`, `seti_1`, `pm_1`).

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use checkout_core::{PaymentMethodRef, RemoteCustomerId};

use super::{
    NewRemoteCustomer, NewSetupIntent, PaymentProvider, RemoteCard, RemoteCustomer,
    RemotePaymentMethod, RemoteSetupIntent,
};
use crate::error::{ProviderError, ProviderResult};

/// Provider operation, for failure injection and call inspection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MockOp {
    CreateCustomer,
    RetrieveCustomer,
    RetrievePaymentMethod,
    CreateSetupIntent,
    RetrieveSetupIntent,
    AttachPaymentMethod,
    SetDefaultPaymentMethod,
}

/// One recorded provider call
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockCall {
    pub op: MockOp,
    /// Primary id or email the call was made with
    pub subject: String,
}

#[derive(Clone, Debug)]
struct MockCustomer {
    email: String,
    name: String,
    metadata: BTreeMap<String, String>,
    default_payment_method: Option<PaymentMethodRef>,
}

#[derive(Default)]
struct MockState {
    next_customer: u64,
    next_intent: u64,
    next_method: u64,
    customers: HashMap<String, MockCustomer>,
    intents: HashMap<String, RemoteSetupIntent>,
    intent_metadata: HashMap<String, BTreeMap<String, String>>,
    methods: HashMap<String, RemotePaymentMethod>,
    failing: HashSet<MockOp>,
    calls: Vec<MockCall>,
}

impl MockState {
    fn enter(&mut self, op: MockOp, subject: &str) -> ProviderResult<()> {
        self.calls.push(MockCall {
            op,
            subject: subject.to_string(),
        });
        if self.failing.contains(&op) {
            return Err(ProviderError::Api(format!("injected failure in {op:?}")));
        }
        Ok(())
    }
}

/// Mock payment provider
#[derive(Default)]
pub struct MockProvider {
    state: Mutex<MockState>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> ProviderResult<std::sync::MutexGuard<'_, MockState>> {
        self.state
            .lock()
            .map_err(|_| ProviderError::Api("mock provider state poisoned".into()))
    }

    /// Make every later call of `op` fail
    pub fn fail_on(&self, op: MockOp) {
        if let Ok(mut state) = self.lock() {
            state.failing.insert(op);
        }
    }

    /// Stop failing `op`
    pub fn recover(&self, op: MockOp) {
        if let Ok(mut state) = self.lock() {
            state.failing.remove(&op);
        }
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().map(|s| s.calls.clone()).unwrap_or_default()
    }

    pub fn calls_of(&self, op: MockOp) -> usize {
        self.lock()
            .map(|s| s.calls.iter().filter(|c| c.op == op).count())
            .unwrap_or_default()
    }

    pub fn customer_count(&self) -> usize {
        self.lock().map(|s| s.customers.len()).unwrap_or_default()
    }

    /// Email and name a customer was created with
    pub fn customer_profile(&self, id: &RemoteCustomerId) -> Option<(String, String)> {
        let state = self.lock().ok()?;
        state
            .customers
            .get(id.as_str())
            .map(|c| (c.email.clone(), c.name.clone()))
    }

    pub fn customer_metadata(&self, id: &RemoteCustomerId) -> Option<BTreeMap<String, String>> {
        let state = self.lock().ok()?;
        state.customers.get(id.as_str()).map(|c| c.metadata.clone())
    }

    pub fn default_payment_method(&self, id: &RemoteCustomerId) -> Option<PaymentMethodRef> {
        let state = self.lock().ok()?;
        state
            .customers
            .get(id.as_str())
            .and_then(|c| c.default_payment_method.clone())
    }

    pub fn intent_metadata(&self, id: &str) -> Option<BTreeMap<String, String>> {
        let state = self.lock().ok()?;
        state.intent_metadata.get(id).cloned()
    }

    /// Seed a payment method directly, optionally already attached
    pub fn add_payment_method(
        &self,
        card: RemoteCard,
        customer: Option<RemoteCustomerId>,
    ) -> ProviderResult<PaymentMethodRef> {
        let mut state = self.lock()?;
        state.next_method += 1;
        let id = PaymentMethodRef::new(format!("pm_{}", state.next_method));
        state.methods.insert(
            id.as_str().to_string(),
            RemotePaymentMethod {
                id: id.clone(),
                customer,
                card: Some(card),
            },
        );
        Ok(id)
    }

    /// Play the browser's half: confirm a setup intent by its client secret.
    ///
    /// Creates a card payment method attached to the intent's customer and
    /// marks the intent succeeded.
    pub fn confirm_setup_intent(
        &self,
        client_secret: &str,
        card_number: &str,
        exp_month: u32,
        exp_year: i32,
    ) -> ProviderResult<PaymentMethodRef> {
        let digits: String = card_number.chars().filter(char::is_ascii_digit).collect();
        if digits.len() < 12 {
            return Err(ProviderError::Api("Your card number is incomplete.".into()));
        }

        let mut state = self.lock()?;
        let intent_id = state
            .intents
            .values()
            .find(|i| i.client_secret.as_deref() == Some(client_secret))
            .map(|i| i.id.clone())
            .ok_or_else(|| ProviderError::NotFound {
                kind: "setup_intent",
                id: client_secret.to_string(),
            })?;

        state.next_method += 1;
        let pm = PaymentMethodRef::new(format!("pm_{}", state.next_method));
        let customer = state.intents.get(&intent_id).and_then(|i| i.customer.clone());
        let last4 = digits[digits.len() - 4..].to_string();

        state.methods.insert(
            pm.as_str().to_string(),
            RemotePaymentMethod {
                id: pm.clone(),
                customer,
                card: Some(RemoteCard {
                    brand: brand_for(&digits).to_string(),
                    last4,
                    exp_month,
                    exp_year,
                }),
            },
        );
        if let Some(intent) = state.intents.get_mut(&intent_id) {
            intent.status = "succeeded".into();
            intent.payment_method = Some(pm.clone());
        }
        Ok(pm)
    }
}

/// Card brand from the leading digits
fn brand_for(digits: &str) -> &'static str {
    match digits.as_bytes() {
        [b'4', ..] => "visa",
        [b'3', b'4' | b'7', ..] => "amex",
        [b'5', b'1'..=b'5', ..] | [b'2', ..] => "mastercard",
        [b'6', ..] => "discover",
        _ => "unknown",
    }
}

#[async_trait]
impl PaymentProvider for MockProvider {
    async fn create_customer(&self, customer: NewRemoteCustomer) -> ProviderResult<RemoteCustomerId> {
        let mut state = self.lock()?;
        state.enter(MockOp::CreateCustomer, &customer.email)?;

        state.next_customer += 1;
        let id = RemoteCustomerId::new(format!("cus_{}", state.next_customer));
        state.customers.insert(
            id.as_str().to_string(),
            MockCustomer {
                email: customer.email,
                name: customer.name,
                metadata: customer.metadata,
                default_payment_method: None,
            },
        );
        Ok(id)
    }

    async fn retrieve_customer(&self, id: &RemoteCustomerId) -> ProviderResult<RemoteCustomer> {
        let mut state = self.lock()?;
        state.enter(MockOp::RetrieveCustomer, id.as_str())?;

        state
            .customers
            .get(id.as_str())
            .map(|c| RemoteCustomer {
                id: id.clone(),
                metadata: c.metadata.clone(),
            })
            .ok_or_else(|| ProviderError::NotFound {
                kind: "customer",
                id: id.to_string(),
            })
    }

    async fn retrieve_payment_method(
        &self,
        id: &PaymentMethodRef,
    ) -> ProviderResult<RemotePaymentMethod> {
        let mut state = self.lock()?;
        state.enter(MockOp::RetrievePaymentMethod, id.as_str())?;

        state
            .methods
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| ProviderError::NotFound {
                kind: "payment_method",
                id: id.to_string(),
            })
    }

    async fn create_setup_intent(&self, intent: NewSetupIntent) -> ProviderResult<RemoteSetupIntent> {
        let mut state = self.lock()?;
        state.enter(MockOp::CreateSetupIntent, intent.customer.as_str())?;

        if !state.customers.contains_key(intent.customer.as_str()) {
            return Err(ProviderError::NotFound {
                kind: "customer",
                id: intent.customer.to_string(),
            });
        }

        state.next_intent += 1;
        let id = format!("seti_{}", state.next_intent);
        let created = RemoteSetupIntent {
            id: id.clone(),
            client_secret: Some(format!("{id}_secret_x")),
            status: "requires_payment_method".into(),
            customer: Some(intent.customer),
            payment_method: None,
        };
        state.intents.insert(id.clone(), created.clone());
        state.intent_metadata.insert(id, intent.metadata);
        Ok(created)
    }

    async fn retrieve_setup_intent(&self, id: &str) -> ProviderResult<RemoteSetupIntent> {
        let mut state = self.lock()?;
        state.enter(MockOp::RetrieveSetupIntent, id)?;

        state
            .intents
            .get(id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound {
                kind: "setup_intent",
                id: id.to_string(),
            })
    }

    async fn attach_payment_method(
        &self,
        id: &PaymentMethodRef,
        customer: &RemoteCustomerId,
    ) -> ProviderResult<()> {
        let mut state = self.lock()?;
        state.enter(MockOp::AttachPaymentMethod, id.as_str())?;

        if !state.customers.contains_key(customer.as_str()) {
            return Err(ProviderError::NotFound {
                kind: "customer",
                id: customer.to_string(),
            });
        }
        let method = state
            .methods
            .get_mut(id.as_str())
            .ok_or_else(|| ProviderError::NotFound {
                kind: "payment_method",
                id: id.to_string(),
            })?;

        match &method.customer {
            Some(owner) if owner != customer => Err(ProviderError::Api(format!(
                "The payment method {id} is already attached to another customer."
            ))),
            _ => {
                method.customer = Some(customer.clone());
                Ok(())
            }
        }
    }

    async fn set_default_payment_method(
        &self,
        customer: &RemoteCustomerId,
        id: &PaymentMethodRef,
    ) -> ProviderResult<()> {
        let mut state = self.lock()?;
        state.enter(MockOp::SetDefaultPaymentMethod, customer.as_str())?;

        let record = state
            .customers
            .get_mut(customer.as_str())
            .ok_or_else(|| ProviderError::NotFound {
                kind: "customer",
                id: customer.to_string(),
            })?;
        record.default_payment_method = Some(id.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_customer(email: &str) -> NewRemoteCustomer {
        NewRemoteCustomer {
            email: email.into(),
            name: "Ada Lovelace".into(),
            metadata: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn test_confirm_attaches_card_to_intent_customer() {
        let provider = MockProvider::new();
        let customer = provider.create_customer(new_customer("a@x.io")).await.unwrap();
        let intent = provider
            .create_setup_intent(NewSetupIntent {
                customer: customer.clone(),
                metadata: BTreeMap::new(),
            })
            .await
            .unwrap();
        assert_eq!(intent.id, "seti_1");
        assert_eq!(intent.client_secret.as_deref(), Some("seti_1_secret_x"));

        let pm = provider
            .confirm_setup_intent("seti_1_secret_x", "4242 4242 4242 4242", 12, 2030)
            .unwrap();
        let method = provider.retrieve_payment_method(&pm).await.unwrap();
        assert_eq!(method.customer, Some(customer));
        let card = method.card.unwrap();
        assert_eq!(card.brand, "visa");
        assert_eq!(card.last4, "4242");

        let intent = provider.retrieve_setup_intent("seti_1").await.unwrap();
        assert!(intent.succeeded());
        assert_eq!(intent.payment_method, Some(pm));
    }

    #[tokio::test]
    async fn test_injected_failure_is_recorded() {
        let provider = MockProvider::new();
        provider.fail_on(MockOp::CreateCustomer);

        assert!(provider.create_customer(new_customer("a@x.io")).await.is_err());
        assert_eq!(provider.calls_of(MockOp::CreateCustomer), 1);
        assert_eq!(provider.customer_count(), 0);

        provider.recover(MockOp::CreateCustomer);
        assert!(provider.create_customer(new_customer("a@x.io")).await.is_ok());
    }

    #[tokio::test]
    async fn test_attach_rejects_foreign_customer() {
        let provider = MockProvider::new();
        let first = provider.create_customer(new_customer("a@x.io")).await.unwrap();
        let second = provider.create_customer(new_customer("b@x.io")).await.unwrap();
        let card = RemoteCard {
            brand: "visa".into(),
            last4: "4242".into(),
            exp_month: 1,
            exp_year: 2031,
        };
        let pm = provider.add_payment_method(card, Some(first.clone())).unwrap();

        assert!(provider.attach_payment_method(&pm, &first).await.is_ok());
        assert!(provider.attach_payment_method(&pm, &second).await.is_err());
    }

    #[tokio::test]
    async fn test_retrieved_customer_carries_ownership_tags() {
        use crate::resolver::{CLIENT_ID_METADATA, GUEST_METADATA};
        use checkout_core::ClientId;

        let provider = MockProvider::new();
        let mut owned = new_customer("a@x.io");
        owned.metadata.insert(CLIENT_ID_METADATA.into(), "7".into());
        let owned = provider.create_customer(owned).await.unwrap();
        let mut guest = new_customer("g@x.io");
        guest.metadata.insert(GUEST_METADATA.into(), "1".into());
        let guest = provider.create_customer(guest).await.unwrap();

        let owned = provider.retrieve_customer(&owned).await.unwrap();
        assert!(owned.belongs_to(ClientId(7)));
        assert!(!owned.belongs_to(ClientId(8)));
        assert!(!owned.is_guest());

        let guest = provider.retrieve_customer(&guest).await.unwrap();
        assert!(guest.is_guest());
        assert!(!guest.belongs_to(ClientId(7)));

        assert!(provider
            .retrieve_customer(&RemoteCustomerId::new("cus_404"))
            .await
            .is_err());
        assert_eq!(provider.calls_of(MockOp::RetrieveCustomer), 3);
    }
}
