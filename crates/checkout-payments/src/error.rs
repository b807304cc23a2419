//! Provider Error Types

use checkout_core::CheckoutError;
use thiserror::Error;

/// Result type alias for provider calls
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Errors raised by a payment provider adapter
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider API rejected the call or could not be reached
    #[error("Stripe error: {0}")]
    Api(String),

    /// An id did not parse as the expected object kind
    #[error("Invalid id: {0}")]
    InvalidId(String),

    /// The provider returned an object missing a field we need
    #[error("Missing field in provider response: {0}")]
    MissingField(&'static str),

    /// No such object on the provider side
    #[error("No such {kind}: {id}")]
    NotFound { kind: &'static str, id: String },
}

impl ProviderError {
    /// Map into the resolver's failure
    pub fn into_resolver_failure(self) -> CheckoutError {
        CheckoutError::ResolverFailed(self.to_string())
    }

    /// Map into the issuer's failure
    pub fn into_issue_failure(self) -> CheckoutError {
        CheckoutError::IssueFailed(self.to_string())
    }
}

impl From<ProviderError> for CheckoutError {
    fn from(err: ProviderError) -> Self {
        Self::Provider(err.to_string())
    }
}

impl From<stripe::StripeError> for ProviderError {
    fn from(err: stripe::StripeError) -> Self {
        Self::Api(err.to_string())
    }
}
