//! # checkout-payments
//!
//! Server side of zero-total card validation: Stripe customers, setup
//! intents, stored cards and the checkout hooks.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────┐  resolve   ┌──────────────────┐  issue   ┌────────────────┐
//! │ Checkout page│──────────▶│ CustomerResolver │────────▶│  IntentIssuer  │
//! │  (total ≤ 0) │            └──────────────────┘          └───────┬────────┘
//! └──────┬───────┘                                                  │ client_secret
//!        │ confirmCardSetup (browser, Stripe.js)  ◀─────────────────┘
//!        ▼
//! ┌──────────────┐  strip / skip  ┌─────────────┐
//! │ Form submit  │──────────────▶│ gatekeeper  │
//! └──────┬───────┘                └─────────────┘
//!        ▼
//! ┌──────────────┐ attach, default ┌────────────────────────┐
//! │ Order accept │───────────────▶│ PaymentMethodPersister │
//! └──────────────┘                 └────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use checkout_payments::{ProviderSettings, ZeroCheckout};
//!
//! let context = ProviderSettings::from_env()?.map(|s| s.into_context()).transpose()?;
//! let checkout = ZeroCheckout::new(context, ports, "/static");
//!
//! let outcome = checkout.accept_order(order_id, &form).await;
//! ```

mod acceptance;
mod cipher;
mod error;
mod gatekeeper;
mod issuer;
mod persister;
pub mod provider;
mod resolver;
mod service;
mod settings;
mod widget;

pub use acceptance::{verify_receipt, AcceptanceOutcome, OrderAcceptance};
pub use cipher::ReferenceCipher;
pub use error::{ProviderError, ProviderResult};
pub use gatekeeper::{card_validation_errors, native_card_errors, strip_native_payment_fields};
pub use issuer::{IntentIssuer, IssuedIntent, INTENT_SOURCE};
pub use persister::{PaymentMethodPersister, PersistedCard};
pub use provider::{
    MockProvider, PaymentProvider, RemoteCard, RemoteCustomer, RemotePaymentMethod,
    RemoteSetupIntent,
    StripeProvider,
};
pub use resolver::{CustomerResolver, CLIENT_ID_METADATA, GUEST_METADATA};
pub use service::{GuestIntent, HostPorts, WidgetRequest, ZeroCheckout};
pub use settings::{parse_switch, ProviderContext, ProviderSettings};
pub use widget::{escape_html, render_widget, WidgetParams, STRIPE_JS_URL};
