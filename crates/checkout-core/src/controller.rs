//! Validation-Form Controller
//!
//! Client-side state machine that runs the card check before the checkout
//! form is allowed through. It lives on the page's event loop, so all ports
//! are `?Send` and state sits in `Cell`s that are never borrowed across an
//! `.await`; a second submit arriving mid-flight sees the in-flight state
//! and is dropped.
//!
//! ```text
//!            submit (no secret)            intent ok
//!   Idle ───────────────────▶ AwaitingIntent ─────────▶ AwaitingConfirmation
//!    ▲  │                         │                         │          │
//!    │  │ submit (pre-issued)     │ error                   │ error    │ confirmed
//!    │  └─────────────────────────┼────────────────────────▶│          ▼
//!    └────────────────────────────┴─────────────────────────┘      Validated
//! ```

use std::cell::{Cell, RefCell};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::form::fields;
use crate::model::{PaymentMethodRef, RemoteCustomerId};
use crate::pricing::displays_zero_total;

/// Shown when the intent request itself fails
pub const RETRY_MESSAGE: &str =
    "We could not start card verification. Please check your connection and try again.";

/// Controller state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    AwaitingIntent,
    AwaitingConfirmation,
    Validated,
}

/// What the page should do with a submit event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitDecision {
    /// Let the native submission continue untouched
    PassThrough,
    /// Cancel it; a validation is already running
    Suppressed,
    /// Cancel it and run `run_validation`
    Intercepted,
}

/// Postal address for billing details
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingAddress {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

/// Identity and address fields read from the checkout form
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: BillingAddress,
}

impl BillingDetails {
    pub fn name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Client secret plus the customer the intent was created for
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentGrant {
    pub client_secret: String,
    pub customer: RemoteCustomerId,
}

/// Result of a successful client-side confirmation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfirmedSetup {
    pub payment_method: PaymentMethodRef,
    pub setup_intent: Option<String>,
}

/// Guest-path intent request (`action=create_setup_intent`)
#[async_trait(?Send)]
pub trait IntentSource {
    async fn request_intent(&self, billing: &BillingDetails) -> Result<IntentGrant, String>;
}

/// Provider-side card confirmation against the mounted widget
#[async_trait(?Send)]
pub trait CardConfirmer {
    async fn confirm_card_setup(
        &self,
        client_secret: &str,
        billing: &BillingDetails,
    ) -> Result<ConfirmedSetup, String>;
}

/// The checkout page as the controller sees it
pub trait CheckoutSurface {
    /// Text of the visible total element, if there is one
    fn rendered_total(&self) -> Option<String>;
    fn billing_details(&self) -> BillingDetails;
    /// Mount the card widget in place of the native card fields
    fn mount_card_widget(&self) -> Result<(), String>;
    fn deselect_native_methods(&self);
    fn set_submit_enabled(&self, enabled: bool);
    fn show_error(&self, message: &str);
    fn clear_error(&self);
    fn inject_field(&self, name: &str, value: &str);
    fn hide_card_widget(&self);
    fn show_success(&self);
    /// Submit the checkout form again, through the normal submit path
    fn resubmit(&self);
}

/// Outcome of one validation run
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationOutcome {
    Validated(ConfirmedSetup),
    Failed(String),
}

/// Drives one page's card validation
pub struct ValidationController<S, I, C> {
    surface: S,
    intents: I,
    confirmer: C,
    state: Cell<ControllerState>,
    mounted: Cell<bool>,
    grant: RefCell<Option<IntentGrant>>,
    inject_intent_id: bool,
}

impl<S, I, C> ValidationController<S, I, C>
where
    S: CheckoutSurface,
    I: IntentSource,
    C: CardConfirmer,
{
    /// `pre_issued` is the server-rendered secret on the authenticated path
    pub fn new(surface: S, intents: I, confirmer: C, pre_issued: Option<IntentGrant>) -> Self {
        Self {
            surface,
            intents,
            confirmer,
            state: Cell::new(ControllerState::Idle),
            mounted: Cell::new(false),
            grant: RefCell::new(pre_issued),
            inject_intent_id: false,
        }
    }

    /// Also inject the setup-intent id so the server can check the receipt
    #[must_use]
    pub fn with_intent_receipts(mut self, enabled: bool) -> Self {
        self.inject_intent_id = enabled;
        self
    }

    pub fn state(&self) -> ControllerState {
        self.state.get()
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(
            self.state.get(),
            ControllerState::AwaitingIntent | ControllerState::AwaitingConfirmation
        )
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.get()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Page-ready hook. Mounts the widget only if the visible total is zero.
    pub fn on_page_ready(&self) -> bool {
        if !displays_zero_total(self.surface.rendered_total().as_deref()) {
            tracing::debug!("Rendered total is not zero; card widget not mounted");
            return false;
        }

        if let Err(e) = self.surface.mount_card_widget() {
            tracing::warn!(error = %e, "Card widget failed to mount");
            self.surface.show_error(&e);
            return false;
        }
        self.surface.deselect_native_methods();
        self.mounted.set(true);
        true
    }

    /// Synchronous part of the submit handler
    pub fn begin_submit(&self) -> SubmitDecision {
        if !self.mounted.get() {
            return SubmitDecision::PassThrough;
        }

        match self.state.get() {
            ControllerState::Validated => SubmitDecision::PassThrough,
            ControllerState::AwaitingIntent | ControllerState::AwaitingConfirmation => {
                tracing::debug!("Validation already in flight; submit dropped");
                SubmitDecision::Suppressed
            }
            ControllerState::Idle => {
                let next = if self.grant.borrow().is_some() {
                    ControllerState::AwaitingConfirmation
                } else {
                    ControllerState::AwaitingIntent
                };
                self.state.set(next);
                self.surface.clear_error();
                self.surface.set_submit_enabled(false);
                SubmitDecision::Intercepted
            }
        }
    }

    /// Asynchronous part, run after `begin_submit` returned `Intercepted`
    pub async fn run_validation(&self) -> ValidationOutcome {
        let billing = self.surface.billing_details();

        if self.state.get() == ControllerState::AwaitingIntent {
            match self.intents.request_intent(&billing).await {
                Ok(grant) => {
                    self.grant.replace(Some(grant));
                    self.state.set(ControllerState::AwaitingConfirmation);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Setup intent request failed");
                    return self.fail(RETRY_MESSAGE);
                }
            }
        }

        if self.state.get() != ControllerState::AwaitingConfirmation {
            return ValidationOutcome::Failed("No validation in progress".into());
        }

        let Some(grant) = self.grant.borrow().clone() else {
            return self.fail(RETRY_MESSAGE);
        };

        match self
            .confirmer
            .confirm_card_setup(&grant.client_secret, &billing)
            .await
        {
            Ok(confirmed) => {
                self.state.set(ControllerState::Validated);
                self.surface
                    .inject_field(fields::PAYMENT_METHOD_ID, confirmed.payment_method.as_str());
                self.surface
                    .inject_field(fields::CUSTOMER_ID, grant.customer.as_str());
                self.surface.inject_field(fields::VALIDATED_FLAG, "1");
                if self.inject_intent_id {
                    if let Some(intent) = &confirmed.setup_intent {
                        self.surface.inject_field(fields::SETUP_INTENT_ID, intent);
                    }
                }
                self.surface.hide_card_widget();
                self.surface.show_success();
                self.surface.set_submit_enabled(true);
                self.surface.resubmit();
                ValidationOutcome::Validated(confirmed)
            }
            Err(message) => self.fail(&message),
        }
    }

    /// Whole submit handler for callers that can await in place
    pub async fn handle_submit(&self) -> SubmitDecision {
        let decision = self.begin_submit();
        if decision == SubmitDecision::Intercepted {
            self.run_validation().await;
        }
        decision
    }

    fn fail(&self, message: &str) -> ValidationOutcome {
        self.state.set(ControllerState::Idle);
        self.surface.show_error(message);
        self.surface.set_submit_enabled(true);
        ValidationOutcome::Failed(message.to_string())
    }
}
