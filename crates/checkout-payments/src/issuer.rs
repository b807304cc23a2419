//! Setup-Intent Issuer

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use checkout_core::{CheckoutError, RemoteCustomerId, Result};

use crate::error::ProviderError;
use crate::provider::NewSetupIntent;
use crate::settings::ProviderContext;

/// Value of the `source` metadata tag on every intent
pub const INTENT_SOURCE: &str = "zero_order_validation";

/// What the browser needs to confirm a card
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedIntent {
    pub client_secret: String,
    pub intent_id: String,
    pub publishable_key: String,
}

pub struct IntentIssuer {
    context: Option<ProviderContext>,
}

impl IntentIssuer {
    pub fn new(context: Option<ProviderContext>) -> Self {
        Self { context }
    }

    /// Create a card-only, off-session setup intent for `customer`.
    ///
    /// One attempt; the provider message is carried in `IssueFailed`.
    pub async fn issue(&self, customer: &RemoteCustomerId) -> Result<IssuedIntent> {
        let context = self.context.as_ref().ok_or(CheckoutError::NotConfigured)?;

        let metadata = BTreeMap::from([
            ("source".to_string(), INTENT_SOURCE.to_string()),
            ("created_at".to_string(), Utc::now().to_rfc3339()),
            ("attempt".to_string(), Uuid::new_v4().to_string()),
        ]);
        let intent = context
            .provider
            .create_setup_intent(NewSetupIntent {
                customer: customer.clone(),
                metadata,
            })
            .await
            .map_err(|e| {
                tracing::error!(customer = %customer, error = %e, "Failed to create setup intent");
                e.into_issue_failure()
            })?;

        let client_secret = intent
            .client_secret
            .ok_or_else(|| ProviderError::MissingField("client_secret").into_issue_failure())?;

        tracing::info!(customer = %customer, intent = %intent.id, "Issued setup intent");
        Ok(IssuedIntent {
            client_secret,
            intent_id: intent.id,
            publishable_key: context.publishable_key.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::cipher::ReferenceCipher;
    use crate::provider::{MockOp, MockProvider, NewRemoteCustomer, PaymentProvider};

    async fn setup() -> (Arc<MockProvider>, IntentIssuer, RemoteCustomerId) {
        let provider = Arc::new(MockProvider::new());
        let customer = provider
            .create_customer(NewRemoteCustomer {
                email: "ada@example.com".into(),
                name: "Ada".into(),
                metadata: BTreeMap::new(),
            })
            .await
            .unwrap();
        let context = ProviderContext::new(provider.clone(), ReferenceCipher::ephemeral(), "pk_test_1");
        (provider, IntentIssuer::new(Some(context)), customer)
    }

    #[tokio::test]
    async fn test_issue_tags_intent() {
        let (provider, issuer, customer) = setup().await;
        let issued = issuer.issue(&customer).await.unwrap();

        assert_eq!(issued.intent_id, "seti_1");
        assert_eq!(issued.client_secret, "seti_1_secret_x");
        assert_eq!(issued.publishable_key, "pk_test_1");

        let metadata = provider.intent_metadata("seti_1").unwrap();
        assert_eq!(metadata.get("source").map(String::as_str), Some(INTENT_SOURCE));
        assert!(metadata.contains_key("created_at"));
    }

    #[tokio::test]
    async fn test_failure_is_not_retried() {
        let (provider, issuer, customer) = setup().await;
        provider.fail_on(MockOp::CreateSetupIntent);

        let err = issuer.issue(&customer).await.unwrap_err();
        assert!(matches!(err, CheckoutError::IssueFailed(ref msg) if msg.contains("injected")));
        assert_eq!(provider.calls_of(MockOp::CreateSetupIntent), 1);
    }

    #[tokio::test]
    async fn test_not_configured() {
        let issuer = IntentIssuer::new(None);
        let err = issuer.issue(&RemoteCustomerId::new("cus_1")).await.unwrap_err();
        assert!(matches!(err, CheckoutError::NotConfigured));
    }
}
