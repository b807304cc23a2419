//! Provider Settings

use std::sync::Arc;

use checkout_core::{CheckoutError, Result};

use crate::cipher::ReferenceCipher;
use crate::provider::{PaymentProvider, StripeProvider};

/// Provider credentials and feature switches
#[derive(Clone)]
pub struct ProviderSettings {
    pub secret_key: String,
    pub publishable_key: String,
    /// Base64 AES-256 key for stored references
    pub encryption_key: Option<String>,
    /// Require a succeeded setup intent before honouring the validation flag
    pub strict_receipts: bool,
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("publishable_key", &self.publishable_key)
            .field("strict_receipts", &self.strict_receipts)
            .finish_non_exhaustive()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `1`, `true`, `yes` and `on` switch a flag on
pub fn parse_switch(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl ProviderSettings {
    /// Read settings from the environment.
    ///
    /// Returns `Ok(None)` when either Stripe key is missing; the feature is
    /// then disabled rather than the process failing.
    pub fn from_env() -> Result<Option<Self>> {
        let (Some(secret_key), Some(publishable_key)) = (
            non_empty_var("STRIPE_SECRET_KEY"),
            non_empty_var("STRIPE_PUBLISHABLE_KEY"),
        ) else {
            return Ok(None);
        };

        if !secret_key.starts_with("sk_") && !secret_key.starts_with("rk_") {
            return Err(CheckoutError::Config(
                "STRIPE_SECRET_KEY must be a secret or restricted key".into(),
            ));
        }

        Ok(Some(Self {
            secret_key,
            publishable_key,
            encryption_key: non_empty_var("CHECKOUT_ENCRYPTION_KEY"),
            strict_receipts: non_empty_var("CHECKOUT_STRICT_RECEIPTS")
                .is_some_and(|v| parse_switch(&v)),
        }))
    }

    /// Cipher for stored references; a throwaway key when none is configured
    pub fn cipher(&self) -> Result<ReferenceCipher> {
        if let Some(key) = &self.encryption_key {
            return ReferenceCipher::new_from_base64(key);
        }
        tracing::warn!(
            "CHECKOUT_ENCRYPTION_KEY not set; stored card references will not survive a restart"
        );
        Ok(ReferenceCipher::ephemeral())
    }

    /// Stripe-backed provider context
    pub fn into_context(self) -> Result<ProviderContext> {
        let cipher = self.cipher()?;
        let provider: Arc<dyn PaymentProvider> = Arc::new(StripeProvider::new(&self.secret_key));
        Ok(ProviderContext {
            provider,
            cipher: Arc::new(cipher),
            publishable_key: self.publishable_key,
            strict_receipts: self.strict_receipts,
        })
    }
}

/// Everything the server-side components need once the provider is configured
#[derive(Clone)]
pub struct ProviderContext {
    pub provider: Arc<dyn PaymentProvider>,
    pub cipher: Arc<ReferenceCipher>,
    pub publishable_key: String,
    pub strict_receipts: bool,
}

impl ProviderContext {
    pub fn new(
        provider: Arc<dyn PaymentProvider>,
        cipher: ReferenceCipher,
        publishable_key: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            cipher: Arc::new(cipher),
            publishable_key: publishable_key.into(),
            strict_receipts: false,
        }
    }

    #[must_use]
    pub fn with_strict_receipts(mut self, strict: bool) -> Self {
        self.strict_receipts = strict;
        self
    }
}

impl std::fmt::Debug for ProviderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderContext")
            .field("provider", &self.provider.name())
            .field("strict_receipts", &self.strict_receipts)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_switch() {
        assert!(parse_switch("1"));
        assert!(parse_switch(" TRUE "));
        assert!(!parse_switch("0"));
        assert!(!parse_switch("nope"));
    }
}
