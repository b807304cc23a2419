//! Zero-Total Checkout Facade
//!
//! Wires the resolver, issuer, persister, gatekeeper and order acceptance
//! over one set of host ports. Every entry point the host platform calls
//! lives here.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use checkout_core::{
    fields, ActivityLog, Cart, CheckoutError, CheckoutForm, ClientId, IdentityStore, OrderId,
    PaymentMethodStore, PriceEvaluator, PriceSource, RemoteCustomerId, Result,
};

use crate::acceptance::{AcceptanceOutcome, OrderAcceptance};
use crate::gatekeeper;
use crate::issuer::IntentIssuer;
use crate::persister::PaymentMethodPersister;
use crate::resolver::CustomerResolver;
use crate::settings::ProviderContext;
use crate::widget::{render_widget, WidgetParams};

/// Host platform adapters
#[derive(Clone)]
pub struct HostPorts {
    pub prices: Arc<dyn PriceSource>,
    pub identities: Arc<dyn IdentityStore>,
    pub methods: Arc<dyn PaymentMethodStore>,
    pub activity: Arc<dyn ActivityLog>,
}

/// Checkout page about to be rendered
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetRequest {
    pub cart: Cart,
    pub currency: String,
    /// Total as the page will display it
    #[serde(default)]
    pub rendered_total: Option<String>,
    /// Logged-in customer, if any
    #[serde(default)]
    pub client_id: Option<ClientId>,
}

/// Intent handed to a guest checkout
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestIntent {
    pub client_secret: String,
    pub customer: RemoteCustomerId,
}

pub struct ZeroCheckout {
    context: Option<ProviderContext>,
    evaluator: PriceEvaluator,
    resolver: Arc<CustomerResolver>,
    issuer: IntentIssuer,
    acceptance: OrderAcceptance,
    asset_base: String,
}

impl ZeroCheckout {
    pub fn new(context: Option<ProviderContext>, ports: HostPorts, asset_base: impl Into<String>) -> Self {
        let resolver = Arc::new(CustomerResolver::new(
            context.clone(),
            ports.identities.clone(),
            ports.methods.clone(),
        ));
        let persister = Arc::new(PaymentMethodPersister::new(
            context.clone(),
            ports.methods,
            ports.activity.clone(),
        ));
        let acceptance = OrderAcceptance::new(
            context.clone(),
            ports.identities,
            resolver.clone(),
            persister,
            ports.activity,
        );

        Self {
            evaluator: PriceEvaluator::new(ports.prices),
            issuer: IntentIssuer::new(context.clone()),
            context,
            resolver,
            acceptance,
            asset_base: asset_base.into(),
        }
    }

    pub const fn is_configured(&self) -> bool {
        self.context.is_some()
    }

    pub const fn context(&self) -> Option<&ProviderContext> {
        self.context.as_ref()
    }

    pub fn evaluator(&self) -> &PriceEvaluator {
        &self.evaluator
    }

    /// Widget markup for a zero-total checkout, `None` when it does not apply.
    ///
    /// Logged-in customers get a pre-issued intent; if that fails the widget
    /// still renders and the browser asks for one on submit.
    pub async fn prepare_widget(&self, request: &WidgetRequest) -> Option<String> {
        let Some(context) = self.context.as_ref() else {
            tracing::debug!("Provider not configured; no card widget");
            return None;
        };
        if !self.evaluator.is_zero_total(
            &request.cart,
            &request.currency,
            request.rendered_total.as_deref(),
        ) {
            return None;
        }

        let mut params = WidgetParams {
            publishable_key: context.publishable_key.clone(),
            asset_base: self.asset_base.clone(),
            strict_receipts: context.strict_receipts,
            ..WidgetParams::default()
        };

        if let Some(client_id) = request.client_id {
            match self.pre_issue(client_id).await {
                Ok((secret, customer)) => {
                    params.client_secret = Some(secret);
                    params.customer = Some(customer.to_string());
                }
                Err(e) => {
                    tracing::warn!(client_id = %client_id, error = %e, "Could not pre-issue setup intent");
                }
            }
        }

        Some(render_widget(&params))
    }

    async fn pre_issue(&self, client_id: ClientId) -> Result<(String, RemoteCustomerId)> {
        let customer = self.resolver.resolve(client_id).await?;
        let issued = self.issuer.issue(&customer).await?;
        Ok((issued.client_secret, customer))
    }

    /// `action=create_setup_intent` for checkouts without a pre-issued intent
    pub async fn create_guest_intent(&self, form: &CheckoutForm) -> Result<GuestIntent> {
        if !self.is_configured() {
            return Err(CheckoutError::NotConfigured);
        }
        let email = form
            .non_empty(fields::EMAIL)
            .ok_or_else(|| CheckoutError::InvalidRequest("Please enter your email address.".into()))?;
        let name = [
            form.non_empty(fields::FIRST_NAME),
            form.non_empty(fields::LAST_NAME),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");

        let customer = self.resolver.resolve_guest(email, &name).await?;
        let issued = self.issuer.issue(&customer).await?;
        Ok(GuestIntent {
            client_secret: issued.client_secret,
            customer,
        })
    }

    /// Gatekeeper point before cart and payment processing
    pub fn pre_checkout(&self, mut form: CheckoutForm) -> CheckoutForm {
        gatekeeper::strip_native_payment_fields(&mut form);
        form
    }

    /// Gatekeeper point before card-field validation
    pub fn validate_card<F>(&self, form: &CheckoutForm, platform_rules: F) -> Vec<String>
    where
        F: FnOnce(&CheckoutForm) -> Vec<String>,
    {
        gatekeeper::card_validation_errors(form, platform_rules)
    }

    pub async fn accept_order(&self, order: OrderId, form: &CheckoutForm) -> AcceptanceOutcome {
        self.acceptance.accept(order, form).await
    }
}
