//! Application State

use std::sync::Arc;

use checkout_core::memory::{
    Fixtures, MemoryIdentityStore, MemoryPaymentMethodStore, MemoryPriceSource,
};
use checkout_core::TracingActivityLog;
use checkout_payments::{HostPorts, ProviderSettings, ZeroCheckout};

/// Where the WASM widget bundle is mounted
pub const ASSET_BASE: &str = "/static";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Zero-total checkout hooks (provider optional inside)
    pub checkout: Arc<ZeroCheckout>,
}

impl AppState {
    pub fn new(checkout: ZeroCheckout) -> Self {
        Self {
            checkout: Arc::new(checkout),
        }
    }

    /// State from the environment, with in-memory host stores seeded from
    /// `CHECKOUT_FIXTURES` when set
    pub fn from_env() -> anyhow::Result<Self> {
        let identities = Arc::new(MemoryIdentityStore::new());
        let prices = Arc::new(MemoryPriceSource::new());
        let methods = Arc::new(MemoryPaymentMethodStore::new());

        if let Ok(path) = std::env::var("CHECKOUT_FIXTURES") {
            Fixtures::load(&path)?.apply(&identities, &prices)?;
            tracing::info!(path = %path, "Seeded host stores");
        }

        let context = ProviderSettings::from_env()?
            .map(ProviderSettings::into_context)
            .transpose()?;
        if context.is_some() {
            tracing::info!("✓ Stripe configured");
        } else {
            tracing::warn!("⚠ Stripe not configured - zero-total card validation disabled");
            tracing::warn!("  Set STRIPE_SECRET_KEY and STRIPE_PUBLISHABLE_KEY in .env");
        }

        let ports = HostPorts {
            prices,
            identities,
            methods,
            activity: Arc::new(TracingActivityLog),
        };
        Ok(Self::new(ZeroCheckout::new(context, ports, ASSET_BASE)))
    }
}
