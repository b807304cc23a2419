//! Order Acceptance
//!
//! The only place a browser validation claim turns into stored data. The
//! claim is re-checked against the provider before anything is written.

use std::sync::Arc;

use serde::Serialize;

use checkout_core::{
    ActivityEntry, ActivityLog, CheckoutError, CheckoutForm, ClientId, IdentityStore, OrderId,
    PaymentMethodRef, RemoteCustomerId, Result, ValidationClaim,
};

use crate::persister::PaymentMethodPersister;
use crate::resolver::CustomerResolver;
use crate::settings::ProviderContext;

/// What order acceptance did with the submitted claim
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AcceptanceOutcome {
    /// No claim on the order, or the provider is not configured
    Skipped,
    /// Card attached, made default and stored locally
    Stored {
        customer: RemoteCustomerId,
        payment_method: PaymentMethodRef,
        label: String,
    },
    /// Something failed; the order stands without a stored card
    Degraded { reason: String },
    /// Claim did not match a confirmed setup intent
    Rejected { reason: String },
}

impl AcceptanceOutcome {
    pub const fn is_stored(&self) -> bool {
        matches!(self, Self::Stored { .. })
    }
}

pub struct OrderAcceptance {
    context: Option<ProviderContext>,
    identities: Arc<dyn IdentityStore>,
    resolver: Arc<CustomerResolver>,
    persister: Arc<PaymentMethodPersister>,
    activity: Arc<dyn ActivityLog>,
}

impl OrderAcceptance {
    pub fn new(
        context: Option<ProviderContext>,
        identities: Arc<dyn IdentityStore>,
        resolver: Arc<CustomerResolver>,
        persister: Arc<PaymentMethodPersister>,
        activity: Arc<dyn ActivityLog>,
    ) -> Self {
        Self {
            context,
            identities,
            resolver,
            persister,
            activity,
        }
    }

    /// Act on an accepted order's submitted fields. Never fails the order.
    pub async fn accept(&self, order: OrderId, form: &CheckoutForm) -> AcceptanceOutcome {
        let Some(claim) = ValidationClaim::from_form(form) else {
            return AcceptanceOutcome::Skipped;
        };
        let Some(context) = self.context.as_ref() else {
            tracing::debug!(order_id = %order, "Provider not configured; ignoring validated card");
            return AcceptanceOutcome::Skipped;
        };

        match self.store_claim(context, order, &claim).await {
            Ok(outcome) => outcome,
            Err(e @ CheckoutError::ValidationBypassAttempt(_)) => {
                tracing::warn!(order_id = %order, payment_method = %claim.payment_method, error = %e, "Rejected validation claim");
                self.activity.record(ActivityEntry::new(format!(
                    "Rejected unverified card validation on order {order}"
                )));
                AcceptanceOutcome::Rejected {
                    reason: e.to_string(),
                }
            }
            Err(e) => {
                tracing::warn!(order_id = %order, error = %e, "Validated card not stored");
                AcceptanceOutcome::Degraded {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn store_claim(
        &self,
        context: &ProviderContext,
        order: OrderId,
        claim: &ValidationClaim,
    ) -> Result<AcceptanceOutcome> {
        let owner = self
            .identities
            .order_owner(order)?
            .ok_or_else(|| CheckoutError::NotFound(format!("order {order}")))?;

        if context.strict_receipts {
            verify_receipt(context, claim).await?;
        }

        let pm = &claim.payment_method;
        let customer = self.owning_customer(context, owner, claim).await?;
        if let Some(claimed) = &claim.customer {
            if claimed != &customer {
                tracing::warn!(order_id = %order, claimed = %claimed, actual = %customer, "Submitted customer differs from provider record");
            }
        }

        if let Err(e) = context.provider.set_default_payment_method(&customer, pm).await {
            tracing::error!(customer = %customer, payment_method = %pm, error = %e, "Failed to set default payment method");
        }

        let written = self.persister.try_persist(owner, pm, Some(&customer)).await?;
        tracing::info!(order_id = %order, client_id = %owner, card = %written.label, "Order card stored");

        Ok(AcceptanceOutcome::Stored {
            customer,
            payment_method: pm.clone(),
            label: written.label,
        })
    }

    /// Customer the claimed method may be stored under for `owner`.
    ///
    /// A loose method is attached to the owner's customer. An attached one is
    /// only accepted when its customer was created for the owner, or is the
    /// guest customer this checkout submitted.
    async fn owning_customer(
        &self,
        context: &ProviderContext,
        owner: ClientId,
        claim: &ValidationClaim,
    ) -> Result<RemoteCustomerId> {
        let pm = &claim.payment_method;
        let remote = context.provider.retrieve_payment_method(pm).await?;
        let Some(attached) = remote.customer else {
            let customer = self.resolver.resolve(owner).await?;
            context
                .provider
                .attach_payment_method(pm, &customer)
                .await?;
            tracing::info!(client_id = %owner, customer = %customer, payment_method = %pm, "Attached payment method");
            return Ok(customer);
        };

        let record = context.provider.retrieve_customer(&attached).await?;
        if record.belongs_to(owner) {
            return Ok(attached);
        }
        if record.is_guest() && claim.customer.as_ref() == Some(&attached) {
            tracing::info!(client_id = %owner, customer = %attached, "Keeping guest checkout customer");
            return Ok(attached);
        }

        tracing::warn!(client_id = %owner, customer = %attached, payment_method = %pm, "Payment method belongs to another customer");
        Err(CheckoutError::InvalidRequest(format!(
            "payment method {pm} is attached to customer {attached}, which is not linked to client {owner}"
        )))
    }
}

/// Require a succeeded setup intent that produced the claimed method
pub async fn verify_receipt(context: &ProviderContext, claim: &ValidationClaim) -> Result<()> {
    let intent_id = claim.setup_intent.as_deref().ok_or_else(|| {
        CheckoutError::ValidationBypassAttempt("no setup intent submitted".into())
    })?;
    let intent = context.provider.retrieve_setup_intent(intent_id).await?;

    if !intent.succeeded() {
        return Err(CheckoutError::ValidationBypassAttempt(format!(
            "setup intent {intent_id} is {}",
            intent.status
        )));
    }
    if intent.payment_method.as_ref() != Some(&claim.payment_method) {
        return Err(CheckoutError::ValidationBypassAttempt(format!(
            "setup intent {intent_id} did not confirm {}",
            claim.payment_method
        )));
    }
    Ok(())
}
