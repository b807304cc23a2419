//! # checkout-core
//!
//! Domain model, host-platform ports and the client-side validation state
//! machine for zero-total checkout card validation.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Host commerce platform                    │
//! │  ┌─────────────┐  ┌───────────────┐  ┌────────────────────┐  │
//! │  │ PriceSource │  │ IdentityStore │  │ PaymentMethodStore │  │
//! │  └──────┬──────┘  └───────┬───────┘  └─────────┬──────────┘  │
//! └─────────┼─────────────────┼────────────────────┼─────────────┘
//!           ▼                 ▼                    ▼
//!    PriceEvaluator     checkout-payments (resolver, issuer, persister)
//!           │
//!           ▼
//!   ValidationController (browser) ── IntentSource / CardConfirmer
//! ```
//!
//! Nothing in this crate talks to the payment provider. The browser widget
//! and the server crate plug adapters into the traits defined here.

pub mod controller;
pub mod error;
pub mod form;
pub mod memory;
pub mod model;
pub mod ports;
pub mod pricing;
pub mod script;

pub use controller::{
    BillingAddress, BillingDetails, CardConfirmer, CheckoutSurface, ConfirmedSetup,
    ControllerState, IntentGrant, IntentSource, SubmitDecision, ValidationController,
    ValidationOutcome,
};
pub use error::{CheckoutError, Result};
pub use form::{dom, fields, CheckoutForm, ValidationClaim};
pub use model::{
    BillingCycle, CardDetail, Cart, ClientId, CustomerIdentity, LineItem, OrderId,
    PaymentMethodRef, ProductPricing, RemoteCustomerId, SavedCard,
};
pub use ports::{
    ActivityEntry, ActivityLog, IdentityStore, PaymentMethodStore, PriceSource,
    StoreTransaction, TracingActivityLog,
};
pub use pricing::{displays_zero_total, PriceEvaluator};
pub use script::{wait_for_provider, PollPolicy, ScriptHost, ScriptReadiness};
