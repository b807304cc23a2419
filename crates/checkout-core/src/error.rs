//! Error Types

use thiserror::Error;

/// Result type alias for checkout operations
pub type Result<T> = std::result::Result<T, CheckoutError>;

/// Failure taxonomy for the zero-total validation flow
#[derive(Error, Debug)]
pub enum CheckoutError {
    /// Provider credentials are missing; the feature is switched off
    #[error("Payment provider is not configured")]
    NotConfigured,

    /// Local customer or order does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Creating the remote customer failed
    #[error("Customer resolution failed: {0}")]
    ResolverFailed(String),

    /// Creating the setup intent failed
    #[error("Setup intent could not be issued: {0}")]
    IssueFailed(String),

    /// Local method/card transaction was rolled back
    #[error("Payment method persistence failed: {0}")]
    PersistenceFailed(String),

    /// Validation flag present without a matching confirmed receipt
    #[error("Validation bypass attempt: {0}")]
    ValidationBypassAttempt(String),

    /// Any other payment provider failure
    #[error("Provider error: {0}")]
    Provider(String),

    /// Local storage failure outside a transaction
    #[error("Storage error: {0}")]
    Storage(String),

    /// Encrypting or decrypting a stored reference failed
    #[error("Cipher error: {0}")]
    Cipher(String),

    /// Inbound request is missing required fields
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CheckoutError {
    /// Whether the checkout should carry on without the stored-card feature.
    ///
    /// Everything except a detected bypass attempt degrades silently.
    pub const fn degrades_checkout(&self) -> bool {
        !matches!(self, Self::ValidationBypassAttempt(_))
    }

    /// Text that is safe to show a customer
    pub fn user_message(&self) -> String {
        match self {
            Self::NotConfigured => "Card validation is not available right now.".into(),
            Self::NotFound(_) => "We could not find your account details.".into(),
            Self::IssueFailed(msg) | Self::ResolverFailed(msg) => {
                format!("Unable to prepare card validation: {msg}")
            }
            Self::InvalidRequest(msg) => msg.clone(),
            Self::ValidationBypassAttempt(_) => {
                "Your card could not be verified. Please enter it again.".into()
            }
            _ => "An error occurred. Please try again.".into(),
        }
    }
}
